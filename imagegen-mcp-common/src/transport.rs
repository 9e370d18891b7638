//! Transport selection for MCP serving.
//!
//! The server speaks JSON-RPC over stdio (the default, for subprocess
//! clients) or over a streamable HTTP listener on a configurable port.
//! Stdio reserves stdout for the protocol stream, which is why logging
//! writes to stderr (see the tracing module).

use clap::Args;
use std::fmt;

/// Where the MCP byte stream runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// JSON-RPC over stdin/stdout (default).
    #[default]
    Stdio,
    /// Streamable HTTP listener on the given port.
    Http {
        /// Port to listen on
        port: u16,
    },
}

impl Transport {
    /// Port of a network transport; `None` for stdio.
    pub fn port(self) -> Option<u16> {
        match self {
            Transport::Stdio => None,
            Transport::Http { port } => Some(port),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stdio => write!(f, "stdio"),
            Transport::Http { port } => write!(f, "http (port {})", port),
        }
    }
}

/// Transport mode named on the command line. The port is a separate flag, so
/// the mode alone does not make a [`Transport`]; see
/// [`TransportArgs::into_transport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Stdio,
    Http,
}

impl TransportMode {
    pub(crate) fn parse(raw: &str) -> Result<Self, String> {
        match raw.to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            _ => Err(format!(
                "Invalid transport mode '{}'. Valid options: stdio, http",
                raw
            )),
        }
    }
}

/// Transport flags shared by server binaries; `#[command(flatten)]` this into
/// the binary's `Parser` struct.
#[derive(Args, Debug, Clone)]
pub struct TransportArgs {
    /// Transport mode: stdio or http
    #[arg(long, default_value = "stdio", value_parser = TransportMode::parse)]
    pub transport: TransportMode,

    /// Port for the HTTP transport
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
}

impl TransportArgs {
    /// Resolve the flags into a concrete transport. The port flag is ignored
    /// for stdio.
    pub fn into_transport(self) -> Transport {
        match self.transport {
            TransportMode::Stdio => Transport::Stdio,
            TransportMode::Http => Transport::Http { port: self.port },
        }
    }
}

impl Default for TransportArgs {
    fn default() -> Self {
        Self {
            transport: TransportMode::Stdio,
            port: 8080,
        }
    }
}
