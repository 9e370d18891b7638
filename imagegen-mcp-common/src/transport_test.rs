//! Unit tests for transport configuration.

use crate::transport::{Transport, TransportArgs, TransportMode};

#[test]
fn transport_default_is_stdio() {
    let transport = Transport::default();
    assert_eq!(transport, Transport::Stdio);
    assert_eq!(transport.port(), None);
    assert_eq!(transport.to_string(), "stdio");
}

#[test]
fn transport_http_carries_port() {
    let transport = Transport::Http { port: 3000 };
    assert_eq!(transport.port(), Some(3000));
    assert_eq!(transport.to_string(), "http (port 3000)");
}

#[test]
fn mode_parser_accepts_stdio_and_http() {
    assert_eq!(TransportMode::parse("stdio"), Ok(TransportMode::Stdio));
    assert_eq!(TransportMode::parse("http"), Ok(TransportMode::Http));
    assert_eq!(TransportMode::parse("HTTP"), Ok(TransportMode::Http));
}

#[test]
fn mode_parser_rejects_unknown_mode_listing_options() {
    let err = TransportMode::parse("sse").unwrap_err();
    assert!(err.contains("'sse'"));
    assert!(err.contains("stdio, http"));
}

#[test]
fn transport_args_default() {
    let args = TransportArgs::default();
    assert_eq!(args.transport, TransportMode::Stdio);
    assert_eq!(args.port, 8080);
}

#[test]
fn into_transport_stdio_ignores_port() {
    let args = TransportArgs {
        transport: TransportMode::Stdio,
        port: 9000,
    };
    assert_eq!(args.into_transport(), Transport::Stdio);
}

#[test]
fn into_transport_http_uses_port() {
    let args = TransportArgs {
        transport: TransportMode::Http,
        port: 9000,
    };
    assert_eq!(args.into_transport(), Transport::Http { port: 9000 });
}
