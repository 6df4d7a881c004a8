//! Configuration file management.
//!
//! Handles loading and saving TOML configuration files.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{AppConfig, AppError, Result};

/// Default configuration file content.
const DEFAULT_CONFIG: &str = r#"# Channel Export Configuration
# Auto-generated - edit as needed

[export]
# Public channel name, without the leading @
channel = ""

# Directory receiving one <id>.md file per message
output_dir = "channel_export"

# Messages requested per page (default: 100)
page_size = 100

# Which artifacts to produce
write_documents = true
write_index = false
write_stats = false

# Artifact file names inside output_dir
index_file = "index.md"
stats_file = "channel_stats.csv"

[source]
# Local SQLite message archive
# archive_path = "/path/to/archive.db"

[retry]
# Retries for throttled or failed page fetches
max_attempts = 5
initial_delay_ms = 1000
max_delay_ms = 60000
backoff_multiplier = 2.0
jitter = true
"#;

/// Load configuration from `path`, or the default location, or built-in defaults.
///
/// An explicitly given path must exist; the default location may be absent.
///
/// # Errors
/// Returns error if a file exists but cannot be read or parsed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => load_config_from_file(path),
        None => {
            let default_path = AppConfig::default_config_path();
            if default_path.exists() {
                load_config_from_file(&default_path)
            } else {
                Ok(AppConfig::default())
            }
        }
    }
}

/// Load configuration from a specific file.
///
/// # Errors
/// Returns error if file cannot be read or parsed.
pub fn load_config_from_file(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| AppError::io(format!("Failed to read config file: {}", path.display()), e))?;

    toml::from_str(&content).map_err(|e| AppError::Config {
        message: format!("Failed to parse config file: {e}"),
    })
}

/// Render configuration as TOML.
///
/// # Errors
/// Returns error if the configuration cannot be serialized.
pub fn config_to_toml(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| AppError::Config {
        message: format!("Failed to serialize config: {e}"),
    })
}

/// Create the default configuration file if it doesn't exist.
///
/// Returns the path of the configuration file.
///
/// # Errors
/// Returns error if file cannot be created.
pub fn ensure_config_exists(path: Option<&Path>) -> Result<PathBuf> {
    let config_path = path.map_or_else(AppConfig::default_config_path, Path::to_path_buf);

    if !config_path.exists() {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create config directory", e))?;
        }

        fs::write(&config_path, DEFAULT_CONFIG)
            .map_err(|e| AppError::io("Failed to create default config", e))?;

        tracing::info!(path = %config_path.display(), "Created default configuration");
    }

    Ok(config_path)
}
