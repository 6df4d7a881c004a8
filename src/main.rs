//! Channel Export - Write the history of a public channel as Markdown.
//!
//! Every message becomes `<id>.md` in the output directory, with formatting
//! entities turned into Markdown, media captions and alt texts appended, and a
//! footer linking back to the original post. Optional artifacts are an index
//! document and a semicolon-separated statistics table.
//!
//! QUICK START:
//!   channel-export config init                          # Write a default config file
//!   channel-export export -c mychannel -a channel.db    # Export every message
//!   channel-export export --index --stats               # Plus index and statistics
//!   channel-export index                                # Only rebuild the index

mod application;
mod cli;
mod domain;
mod infrastructure;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use application::{
    format_progress, format_summary, format_summary_json, ExportDriver, ExportPlan,
    SummaryFormat,
};
use cli::{Cli, Commands, ConfigAction, ExportArgs};
use domain::{AppConfig, AppError};
use infrastructure::{config_to_toml, ensure_config_exists, load_config, SqliteArchiveSource};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Main application logic.
async fn run(cli: Cli) -> domain::Result<()> {
    if let Commands::Config { action } = cli.command {
        return cmd_config(action, cli.config.as_deref());
    }

    let mut config = load_config(cli.config.as_deref())?;
    let Some((args, plan)) = cli.command.export_request(&config) else {
        return Ok(());
    };
    args.apply(&mut config);

    cmd_export(config, args, plan).await
}

/// Export, index and stats commands.
async fn cmd_export(config: AppConfig, args: &ExportArgs, plan: ExportPlan) -> domain::Result<()> {
    let format = args
        .summary_format()
        .map_err(|e| AppError::Config { message: e })?;

    let archive = config
        .source
        .archive_path
        .clone()
        .ok_or_else(|| AppError::Config {
            message: "No message archive configured (set --archive or CHANNEL_EXPORT_ARCHIVE)"
                .into(),
        })?;
    let source = SqliteArchiveSource::open(&archive)?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            on_signal.cancel();
        }
    });

    let driver = ExportDriver::new(source, config, plan).with_cancellation(cancel);
    let summary = driver
        .run(|progress| {
            if format == SummaryFormat::Text {
                println!("{}", format_progress(progress));
            }
        })
        .await?;

    match format {
        SummaryFormat::Text => {
            println!();
            println!("{}", format_summary(&summary));
        }
        SummaryFormat::Json => {
            println!(
                "{}",
                format_summary_json(&summary).map_err(AppError::json_parse)?
            );
        }
    }

    Ok(())
}

/// Configuration file commands.
fn cmd_config(action: ConfigAction, path: Option<&std::path::Path>) -> domain::Result<()> {
    match action {
        ConfigAction::Init => {
            let path = ensure_config_exists(path)?;
            println!("{} Configuration at {}", "✓".green().bold(), path.display());
        }
        ConfigAction::Show => {
            let config = load_config(path)?;
            println!("{}", config_to_toml(&config)?);
        }
        ConfigAction::Path => {
            let path = path.map_or_else(AppConfig::default_config_path, std::path::Path::to_path_buf);
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Setup tracing/logging based on verbosity level.
fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).without_time().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
