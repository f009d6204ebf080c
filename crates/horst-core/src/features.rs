//! Capability negotiation and the feature surface handed to plugins.

use crate::error::{Error, Result};
use crate::urid::{Urid, UridMap};

/// Feature and extension URIs understood by the host.
pub mod uris {
    pub const URID_MAP: &str = "http://lv2plug.in/ns/ext/urid#map";
    pub const URID_UNMAP: &str = "http://lv2plug.in/ns/ext/urid#unmap";
    pub const IS_LIVE: &str = "http://lv2plug.in/ns/lv2core#isLive";
    pub const OPTIONS: &str = "http://lv2plug.in/ns/ext/options#options";
    pub const BOUNDED_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#boundedBlockLength";
    pub const FIXED_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#fixedBlockLength";
    pub const COARSE_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#coarseBlockLength";
    pub const POWER_OF_2_BLOCK_LENGTH: &str =
        "http://lv2plug.in/ns/ext/buf-size#powerOf2BlockLength";
    pub const WORKER_SCHEDULE: &str = "http://lv2plug.in/ns/ext/worker#schedule";

    /// Used both as a feature marker and as an option key.
    pub const NOMINAL_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#nominalBlockLength";
    pub const MIN_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#minBlockLength";
    pub const MAX_BLOCK_LENGTH: &str = "http://lv2plug.in/ns/ext/buf-size#maxBlockLength";

    pub const WORKER_INTERFACE: &str = "http://lv2plug.in/ns/ext/worker#interface";
    pub const STATE_INTERFACE: &str = "http://lv2plug.in/ns/ext/state#interface";

    pub const ATOM_INT: &str = "http://lv2plug.in/ns/ext/atom#Int";
}

/// Every feature URI the host can provide.
pub const SUPPORTED_FEATURES: &[&str] = &[
    uris::URID_MAP,
    uris::URID_UNMAP,
    uris::IS_LIVE,
    uris::OPTIONS,
    uris::BOUNDED_BLOCK_LENGTH,
    uris::NOMINAL_BLOCK_LENGTH,
    uris::FIXED_BLOCK_LENGTH,
    uris::COARSE_BLOCK_LENGTH,
    uris::POWER_OF_2_BLOCK_LENGTH,
    uris::WORKER_SCHEDULE,
];

/// What negotiation learned about a plugin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Block length may not change between cycles (fixed or coarse requested).
    pub fixed_block_length: bool,
    /// Block length must be a power of two. Implies `fixed_block_length`.
    pub power_of_two_block_length: bool,
    /// The plugin uses the worker schedule feature.
    pub needs_worker: bool,
    /// The plugin exposes the state interface.
    pub has_state: bool,
}

/// Check a plugin's declared features against [`SUPPORTED_FEATURES`].
///
/// A missing required feature fails; a missing optional one is logged and skipped.
pub fn negotiate(
    required: &[String],
    optional: &[String],
    extension_data: &[String],
) -> Result<Capabilities> {
    let mut caps = Capabilities::default();

    for (declared, is_required) in [(required, true), (optional, false)] {
        for uri in declared {
            if uri == uris::WORKER_SCHEDULE {
                caps.needs_worker = true;
            }

            if !SUPPORTED_FEATURES.contains(&uri.as_str()) {
                if is_required {
                    return Err(Error::UnsupportedFeature(uri.clone()));
                }
                tracing::warn!("Unsupported optional feature: {}", uri);
                continue;
            }

            match uri.as_str() {
                uris::POWER_OF_2_BLOCK_LENGTH => {
                    caps.fixed_block_length = true;
                    caps.power_of_two_block_length = true;
                }
                uris::FIXED_BLOCK_LENGTH | uris::COARSE_BLOCK_LENGTH => {
                    caps.fixed_block_length = true;
                }
                _ => {}
            }
        }
    }

    caps.has_state = extension_data.iter().any(|uri| uri == uris::STATE_INTERFACE);

    tracing::debug!(
        fixed = caps.fixed_block_length,
        power_of_two = caps.power_of_two_block_length,
        worker = caps.needs_worker,
        state = caps.has_state,
        "Negotiated plugin capabilities"
    );

    Ok(caps)
}

/// Block length bounds advertised to a plugin instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockLengths {
    pub min: u32,
    pub max: u32,
    pub nominal: u32,
}

impl BlockLengths {
    /// `min` equals the buffer size only when a fixed block length is required.
    pub fn for_buffer_size(buffer_size: usize, fixed: bool) -> Self {
        let size = buffer_size as u32;
        Self {
            min: if fixed { size } else { 0 },
            max: size,
            nominal: size,
        }
    }
}

/// Typed key/value record passed through the options feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginOption {
    pub key: Urid,
    pub value_type: Urid,
    pub value: i32,
}

/// Everything an instance is given at instantiation.
#[derive(Debug, Clone)]
pub struct FeatureSet {
    urid_map: UridMap,
    options: Vec<PluginOption>,
}

impl FeatureSet {
    pub fn new(urid_map: UridMap, block_lengths: BlockLengths) -> Self {
        let int = urid_map.map(uris::ATOM_INT);
        let option = |key: &str, value: u32| PluginOption {
            key: urid_map.map(key),
            value_type: int,
            value: value as i32,
        };
        let options = vec![
            option(uris::MIN_BLOCK_LENGTH, block_lengths.min),
            option(uris::MAX_BLOCK_LENGTH, block_lengths.max),
            option(uris::NOMINAL_BLOCK_LENGTH, block_lengths.nominal),
        ];

        Self { urid_map, options }
    }

    pub fn supported(&self) -> &'static [&'static str] {
        SUPPORTED_FEATURES
    }

    pub fn is_supported(&self, uri: &str) -> bool {
        SUPPORTED_FEATURES.contains(&uri)
    }

    /// URID map/unmap feature.
    pub fn urid_map(&self) -> &UridMap {
        &self.urid_map
    }

    pub fn options(&self) -> &[PluginOption] {
        &self.options
    }

    /// Integer value of the option keyed by `key_uri`.
    pub fn option(&self, key_uri: &str) -> Option<i32> {
        let key = self.urid_map.find(key_uri)?;
        self.options
            .iter()
            .find(|option| option.key == key)
            .map(|option| option.value)
    }
}
