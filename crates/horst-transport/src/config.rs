//! Adapter configuration.

use serde::{Deserialize, Serialize};

/// How the adapter presents a plugin to the transport, and its initial flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Transport client name. `None` uses the plugin name.
    pub client_name: Option<String>,
    /// Register control ports as transport audio ports instead of driving
    /// them from published values.
    pub expose_control_ports: bool,
    pub enabled: bool,
    pub control_input_updates: bool,
    pub control_output_updates: bool,
    pub audio_input_monitoring: bool,
    pub audio_output_monitoring: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            client_name: None,
            expose_control_ports: false,
            enabled: true,
            control_input_updates: true,
            control_output_updates: false,
            audio_input_monitoring: false,
            audio_output_monitoring: false,
        }
    }
}

impl AdapterConfig {
    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = Some(name.into());
        self
    }

    pub fn with_exposed_control_ports(mut self, expose: bool) -> Self {
        self.expose_control_ports = expose;
        self
    }

    pub fn with_control_output_updates(mut self, enabled: bool) -> Self {
        self.control_output_updates = enabled;
        self
    }

    pub fn with_monitoring(mut self, inputs: bool, outputs: bool) -> Self {
        self.audio_input_monitoring = inputs;
        self.audio_output_monitoring = outputs;
        self
    }

    /// Requested client name for a plugin called `plugin_name`.
    pub fn resolve_client_name<'a>(&'a self, plugin_name: &'a str) -> &'a str {
        self.client_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(plugin_name)
    }
}
