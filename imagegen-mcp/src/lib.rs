//! Image generation MCP server.
//!
//! Exposes tools that forward prompts to the laozhang.ai Gemini image API
//! and save the results into an Obsidian vault with derived filenames.

pub mod client;
pub mod handler;
pub mod namer;
pub mod resources;
pub mod server;

pub use handler::{GenerationRequest, ImageHandler, ItemOutcome, SavedImage};
pub use server::ImageServer;
