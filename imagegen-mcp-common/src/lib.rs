//! Shared utilities for the imagegen MCP server: configuration, error
//! handling, tracing setup, and transport/server plumbing.

pub mod config;
pub mod error;
pub mod server;
pub mod tracing;
pub mod transport;

#[cfg(test)]
mod server_test;
#[cfg(test)]
mod transport_test;

pub use config::Config;
pub use error::{ConfigError, Error, Result};
pub use server::{McpServerBuilder, ServerError, shutdown_channel};
pub use transport::{Transport, TransportArgs, TransportMode};
