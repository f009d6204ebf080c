//! Batch port (dis)connection.

use crate::helpers::*;
use horst::transport::{PortDirection, PortKind, TransportError};
use horst::{ConnectionManager, TransportClient};

fn manager() -> ConnectionManager<MockClient> {
    let mut client = MockClient::new("gain", TEST_SAMPLE_RATE, TEST_BUFFER_SIZE);
    client
        .register_port("in", PortKind::Audio, PortDirection::Input)
        .unwrap();
    client
        .register_port("out", PortKind::Audio, PortDirection::Output)
        .unwrap();
    ConnectionManager::new(client)
}

fn pair(source: &str, destination: &str) -> (String, String) {
    (source.to_string(), destination.to_string())
}

#[test]
fn test_list_ports_by_pattern() {
    let manager = manager();
    assert_eq!(manager.ports("gain:"), vec!["gain:in", "gain:out"]);
    assert_eq!(manager.ports("system:").len(), 2);
    assert_eq!(manager.ports("").len(), 4);
}

#[test]
fn test_connect_skips_failures_when_lenient() {
    let mut manager = manager();
    let connections = [
        pair("system:capture_1", "gain:in"),
        pair("gain:out", "nowhere:in"),
        pair("gain:out", "system:playback_1"),
    ];

    assert_eq!(manager.connect(&connections, false).unwrap(), 2);
    assert_eq!(manager.client().connections().len(), 2);
}

#[test]
fn test_connect_aborts_on_failure_when_strict() {
    let mut manager = manager();
    let connections = [
        pair("system:capture_1", "gain:in"),
        pair("gain:out", "nowhere:in"),
        pair("gain:out", "system:playback_1"),
    ];

    let result = manager.connect(&connections, true);
    assert!(matches!(
        result,
        Err(TransportError::Connection { ref destination, .. }) if destination == "nowhere:in"
    ));
    assert_eq!(manager.client().connections().len(), 1);
}

#[test]
fn test_disconnect_fails_on_unknown_connection() {
    let mut manager = manager();
    let connected = [pair("system:capture_1", "gain:in")];
    manager.connect(&connected, true).unwrap();

    manager.disconnect(&connected).unwrap();
    assert!(manager.client().connections().is_empty());

    assert!(matches!(
        manager.disconnect(&connected),
        Err(TransportError::Disconnection { .. })
    ));
}

#[test]
fn test_duplicate_port_registration_fails() {
    let manager = manager();
    let mut client = manager.into_client();
    assert!(matches!(
        client.register_port("in", PortKind::Audio, PortDirection::Input),
        Err(TransportError::PortRegistration { .. })
    ));
}
