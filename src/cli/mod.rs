//! CLI interface using clap.
//!
//! Provides command-line arguments and subcommands for the tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::application::{ExportPlan, SummaryFormat};
use crate::domain::AppConfig;

/// Channel Export - Write every message of a public channel to its own Markdown file.
///
/// Quick start: channel-export export --channel mychannel --archive channel.db --index
#[derive(Parser, Debug)]
#[command(name = "channel-export")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (use multiple times for more verbosity).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (default: ~/.channel-export/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export one Markdown document per message.
    Export {
        #[command(flatten)]
        args: ExportArgs,

        /// Also write the index document.
        #[arg(long)]
        index: bool,

        /// Also append to the statistics table.
        #[arg(long)]
        stats: bool,
    },

    /// Write only the index document.
    Index {
        #[command(flatten)]
        args: ExportArgs,
    },

    /// Append only to the statistics table.
    Stats {
        #[command(flatten)]
        args: ExportArgs,
    },

    /// Manage the configuration file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ConfigAction {
    /// Create the default configuration file if missing.
    Init,
    /// Print the effective configuration.
    Show,
    /// Print the configuration file path.
    Path,
}

/// Options shared by every command that reads the channel.
#[derive(Args, Debug, Clone, Default)]
pub struct ExportArgs {
    /// Channel name, with or without the leading @.
    #[arg(short, long, env = "TELEGRAM_CHANNEL_USERNAME")]
    pub channel: Option<String>,

    /// Message archive database to read from.
    #[arg(short, long, env = "CHANNEL_EXPORT_ARCHIVE")]
    pub archive: Option<PathBuf>,

    /// Output directory for documents, index and statistics.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Messages requested per page.
    #[arg(short, long)]
    pub page_size: Option<usize>,

    /// Summary format: text or json.
    #[arg(short, long, default_value = "text")]
    pub format: String,
}

impl ExportArgs {
    /// Override configuration values with the ones given on the command line.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(channel) = &self.channel {
            config.export.channel.clone_from(channel);
        }
        if let Some(archive) = &self.archive {
            config.source.archive_path = Some(archive.clone());
        }
        if let Some(output) = &self.output {
            config.export.output_dir.clone_from(output);
        }
        if let Some(page_size) = self.page_size {
            config.export.page_size = page_size;
        }
    }

    /// Parse the summary format argument.
    pub fn summary_format(&self) -> Result<SummaryFormat, String> {
        self.format.parse()
    }
}

impl Commands {
    /// Shared export options and the artifacts the command produces.
    ///
    /// `None` for commands that do not export.
    #[must_use]
    pub fn export_request(&self, config: &AppConfig) -> Option<(&ExportArgs, ExportPlan)> {
        match self {
            Self::Export { args, index, stats } => {
                let from_file = ExportPlan::from_config(&config.export);
                Some((
                    args,
                    ExportPlan {
                        documents: from_file.documents,
                        index: *index || from_file.index,
                        stats: *stats || from_file.stats,
                    },
                ))
            }
            Self::Index { args } => Some((
                args,
                ExportPlan {
                    documents: false,
                    index: true,
                    stats: false,
                },
            )),
            Self::Stats { args } => Some((
                args,
                ExportPlan {
                    documents: false,
                    index: false,
                    stats: true,
                },
            )),
            Self::Config { .. } => None,
        }
    }
}
