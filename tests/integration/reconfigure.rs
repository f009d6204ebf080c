//! Reinstantiation on sample rate and buffer size changes.

use crate::helpers::*;
use horst::core::{uris, Error};
use horst::transport::TransportError;
use horst::{AdapterConfig, ReconfigState};

#[test]
fn test_buffer_size_change_reinstantiates() {
    let (mut adapter, client, recorder) = gain_adapter();

    adapter.buffer_size_changed(512).unwrap();

    assert_eq!(recorder.count(&recorder.instances), 2);
    assert_eq!(adapter.buffer_size(), 512);
    assert_eq!(adapter.horst().buffer_size(), Some(512));
    assert_eq!(adapter.reconfig_state(), ReconfigState::Stable);

    adapter.process(&MockScope::new(&client, 512));
    assert_eq!(recorder.runs(), vec![(512, 1.0)]);
}

#[test]
fn test_unchanged_parameters_keep_instance() {
    let (mut adapter, _client, recorder) = gain_adapter();

    adapter.buffer_size_changed(TEST_BUFFER_SIZE).unwrap();
    adapter.sample_rate_changed(TEST_SAMPLE_RATE).unwrap();

    assert_eq!(recorder.count(&recorder.instances), 1);
}

#[test]
fn test_sample_rate_change_swaps_instances() {
    let (mut adapter, _client, recorder) = gain_adapter();

    adapter.sample_rate_changed(44100.0).unwrap();

    assert_eq!(adapter.sample_rate(), 44100.0);
    assert_eq!(adapter.horst().sample_rate(), Some(44100.0));
    assert_eq!(
        recorder.calls(),
        vec![Call::Activated(0), Call::Activated(1), Call::Deactivated(0)]
    );
}

#[test]
fn test_control_values_survive_reinstantiation() {
    let (mut adapter, client, recorder) = gain_adapter();
    adapter.controls().set_control_port_value(GAIN, 0.25).unwrap();

    adapter.buffer_size_changed(128).unwrap();
    let scope = MockScope::new(&client, 128);
    scope.fill(client.port_id("in"), 1.0);
    adapter.process(&scope);

    assert_eq!(recorder.runs(), vec![(128, 0.25)]);
    assert!(scope
        .samples(client.port_id("out"))
        .iter()
        .all(|&s| s == 0.25));
}

#[test]
fn test_non_power_of_two_size_fails_and_silences() {
    let descriptor = GainDescriptor::new().with_required(uris::POWER_OF_2_BLOCK_LENGTH);
    let (mut adapter, client, recorder) = adapter_for(descriptor, &AdapterConfig::default());

    let result = adapter.buffer_size_changed(384);
    assert!(matches!(
        result,
        Err(TransportError::Reconfiguration {
            buffer_size: 384,
            source: Error::NonPowerOfTwoBlockLength(384),
            ..
        })
    ));
    assert_eq!(adapter.reconfig_state(), ReconfigState::Failed);
    assert_eq!(adapter.controls().reconfig_state(), ReconfigState::Failed);
    assert_eq!(recorder.count(&recorder.instances), 1);

    let scope = MockScope::new(&client, 384);
    scope.fill(client.port_id("in"), 1.0);
    scope.fill(client.port_id("out"), 1.0);
    adapter.process(&scope);
    assert!(recorder.runs().is_empty());
    assert!(scope
        .samples(client.port_id("out"))
        .iter()
        .all(|&s| s == 0.0));

    // Still failed when retried with the same size.
    assert!(adapter.buffer_size_changed(384).is_err());

    adapter.buffer_size_changed(512).unwrap();
    assert_eq!(adapter.reconfig_state(), ReconfigState::Stable);
    adapter.process(&MockScope::new(&client, 512));
    assert_eq!(recorder.runs(), vec![(512, 1.0)]);
}
