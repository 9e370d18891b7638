//! Unit tests for the server builder.

use crate::server::{ServerError, shutdown_channel};

#[test]
fn bind_failed_names_port_and_cause() {
    let err = ServerError::BindFailed {
        port: 8080,
        message: "Address already in use".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("8080"));
    assert!(msg.contains("Address already in use"));
}

#[test]
fn transport_error_carries_cause() {
    let err = ServerError::Transport("Connection reset".to_string());
    assert!(err.to_string().contains("Connection reset"));
}

#[test]
fn io_errors_convert() {
    let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
    let err: ServerError = io_err.into();
    assert!(matches!(err, ServerError::Io(_)));
}

#[tokio::test]
async fn shutdown_channel_delivers_signal() {
    let (tx, rx) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        let _ = tx.send(());
    });

    assert!(rx.await.is_ok());
}
