//! Export configuration models.
//!
//! Contains the settings for the export pipeline, the message archive it
//! reads from, and the retry policy applied to page fetches.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::cursor::DEFAULT_PAGE_SIZE;

/// What to export and where.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Public channel name (without `@`), used for permalinks.
    #[serde(default)]
    pub channel: String,

    /// Directory receiving `{id}.md` documents, the index and the statistics file.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Messages requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Write one Markdown document per message.
    #[serde(default = "default_true")]
    pub write_documents: bool,

    /// Write the index document.
    #[serde(default)]
    pub write_index: bool,

    /// Append rows to the statistics table.
    #[serde(default)]
    pub write_stats: bool,

    /// Index file name inside `output_dir`.
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Statistics file name inside `output_dir`.
    #[serde(default = "default_stats_file")]
    pub stats_file: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            channel: String::new(),
            output_dir: default_output_dir(),
            page_size: default_page_size(),
            write_documents: default_true(),
            write_index: false,
            write_stats: false,
            index_file: default_index_file(),
            stats_file: default_stats_file(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("channel_export")
}

const fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

const fn default_true() -> bool {
    true
}

fn default_index_file() -> String {
    "index.md".into()
}

fn default_stats_file() -> String {
    "channel_stats.csv".into()
}

/// Where messages are read from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Local SQLite message archive.
    #[serde(default)]
    pub archive_path: Option<PathBuf>,
}

/// Backoff policy for transient fetch failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Factor applied to the delay after each retry.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Randomize delays between 1x and 2x.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: default_true(),
        }
    }
}

impl RetryConfig {
    /// Delay before the first retry.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Upper bound for any single delay.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    60_000
}

const fn default_backoff_multiplier() -> f64 {
    2.0
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Export settings.
    #[serde(default)]
    pub export: ExportConfig,

    /// Message source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Fetch retry policy.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".channel-export")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    /// Path of the index document.
    #[must_use]
    pub fn index_path(&self) -> PathBuf {
        self.export.output_dir.join(&self.export.index_file)
    }

    /// Path of the statistics table.
    #[must_use]
    pub fn stats_path(&self) -> PathBuf {
        self.export.output_dir.join(&self.export.stats_file)
    }

    /// Channel name with any leading `@` removed.
    #[must_use]
    pub fn channel(&self) -> &str {
        self.export.channel.trim().trim_start_matches('@')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.page_size, 100);
        assert!(config.export.write_documents);
        assert!(!config.export.write_index);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_channel_strips_at_sign() {
        let mut config = AppConfig::default();
        config.export.channel = " @mychannel ".into();
        assert_eq!(config.channel(), "mychannel");
    }

    #[test]
    fn test_artifact_paths() {
        let mut config = AppConfig::default();
        config.export.output_dir = PathBuf::from("/tmp/out");
        assert_eq!(config.index_path(), PathBuf::from("/tmp/out/index.md"));
        assert_eq!(
            config.stats_path(),
            PathBuf::from("/tmp/out/channel_stats.csv")
        );
    }
}
