//! Configuration loaded from environment variables and an optional .env file.

use crate::error::ConfigError;
use std::path::PathBuf;

/// Default API base URL (laozhang.ai OpenAI-compatible gateway).
pub const DEFAULT_API_BASE_URL: &str = "https://api.laozhang.ai";

/// Default Obsidian vault location.
pub const DEFAULT_VAULT_PATH: &str = "~/Obsidian";

/// Default subfolder for generated images inside the vault.
pub const DEFAULT_GRAPHICS_FOLDER: &str = "AI graphics";

/// Application configuration, loaded once at startup and passed by value.
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the image generation gateway (required)
    pub api_key: String,
    /// Base URL of the gateway, without a trailing slash
    pub api_base_url: String,
    /// Path to the Obsidian vault
    pub vault_path: PathBuf,
    /// Subfolder for generated images within the vault
    pub graphics_folder: String,
    /// HTTP server port (network transports only)
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if LAOZHANG_API_KEY is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("LAOZHANG_API_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("LAOZHANG_API_KEY".to_string()))?;

        let api_base_url = std::env::var("IMAGEGEN_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let vault_path = expand_tilde(
            &std::env::var("OBSIDIAN_VAULT_PATH").unwrap_or_else(|_| DEFAULT_VAULT_PATH.to_string()),
        );

        let graphics_folder = std::env::var("AI_GRAPHICS_FOLDER")
            .unwrap_or_else(|_| DEFAULT_GRAPHICS_FOLDER.to_string());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT".to_string(), raw))?,
            Err(_) => 8080,
        };

        Ok(Self {
            api_key,
            api_base_url,
            vault_path,
            graphics_folder,
            port,
        })
    }

    /// Directory where generated images are written.
    pub fn output_dir(&self) -> PathBuf {
        self.vault_path.join(&self.graphics_folder)
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths without a tilde, and tildes with no HOME set, pass through verbatim.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            if path == "~" {
                return PathBuf::from(home);
            }
            return PathBuf::from(home).join(&path[2..]);
        }
    }
    PathBuf::from(path)
}
