//! Terminal output for export runs.
//!
//! Supports a colored text summary and JSON for programmatic use.

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Table};

use crate::domain::{ExportSummary, SkippedMessage};

use super::exporter::PageProgress;

/// Summary format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SummaryFormat {
    /// Colored text with a table of skipped messages.
    #[default]
    Text,
    /// JSON format for programmatic use.
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {s}. Use: text, json")),
        }
    }
}

/// One progress line per persisted page.
pub fn format_progress(progress: &PageProgress) -> String {
    format!(
        "{} Processed messages {} to {} {}",
        "→".cyan(),
        progress.from.to_string().bold(),
        progress.to.to_string().bold(),
        format!("(ids {}..{})", progress.oldest_id, progress.newest_id).dimmed()
    )
}

/// Formats the end-of-run summary for display.
pub fn format_summary(summary: &ExportSummary) -> String {
    let headline = if summary.cancelled {
        "⚠ Export cancelled".yellow().bold()
    } else {
        "✓ Export complete".green().bold()
    };

    let mut lines = vec![
        headline.to_string(),
        format!("  Pages: {}", summary.pages.to_string().cyan()),
        format!("  Messages processed: {}", summary.processed.to_string().cyan()),
        format!(
            "  Documents written: {}",
            summary.documents_written.to_string().green()
        ),
        format!("  Without content: {}", summary.empty.to_string().yellow()),
        format!("  Skipped: {}", skipped_count(summary.skipped.len())),
    ];

    if summary.index_entries > 0 {
        lines.push(format!(
            "  Index entries: {}",
            summary.index_entries.to_string().cyan()
        ));
    }
    if summary.stats_rows > 0 {
        lines.push(format!(
            "  Statistics rows: {}",
            summary.stats_rows.to_string().cyan()
        ));
    }

    if !summary.skipped.is_empty() {
        lines.push(String::new());
        lines.push(format_skipped_table(&summary.skipped));
    }

    lines.join("\n")
}

/// Formats the summary as JSON.
///
/// # Errors
/// Returns error if serialization fails.
pub fn format_summary_json(summary: &ExportSummary) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(summary)
}

/// Table of messages that were fetched but not exported.
pub fn format_skipped_table(skipped: &[SkippedMessage]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Message", "Reason"]);

    for entry in skipped {
        table.add_row(vec![entry.message_id.to_string(), truncate(&entry.reason, 70)]);
    }

    table.to_string()
}

fn skipped_count(count: usize) -> colored::ColoredString {
    if count == 0 {
        count.to_string().green()
    } else {
        count.to_string().red()
    }
}

/// Truncates to the first line, at most `max_chars` characters, with ellipsis.
fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.lines().next().unwrap_or(s);
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
