//! Index document and statistics table writers.

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::domain::{AppError, RawMessage, RenderedDocument, Result};

use super::document_store::write_atomic;

/// Longest excerpt kept in the index and the statistics table.
pub const EXCERPT_CHARS: usize = 200;

/// Markdown index linking every described message to its document.
///
/// Lines are collected during the run and written in one go by [`finish`](Self::finish),
/// so an interrupted export never leaves a truncated index behind.
#[derive(Debug)]
pub struct IndexWriter {
    path: PathBuf,
    content: String,
    entries: usize,
}

impl IndexWriter {
    /// Starts an index for `channel` that will be written to `path`.
    ///
    /// The parent directory is created right away, so an unusable destination
    /// fails the run before any page is fetched.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn open(path: &Path, channel: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create index directory", e))?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            content: format!("# Index of Telegram Channel: {channel}\n\n"),
            entries: 0,
        })
    }

    /// Adds a message. Returns false when it has nothing to describe it.
    pub fn add(&mut self, message: &RawMessage) -> bool {
        let excerpt = message.excerpt(EXCERPT_CHARS);
        if excerpt.is_empty() {
            return false;
        }

        let written = writeln!(
            self.content,
            "- [{excerpt}]({})",
            RenderedDocument::file_name_for(message.id)
        )
        .is_ok();
        if written {
            self.entries += 1;
        }
        written
    }

    /// Writes the index file.
    ///
    /// # Errors
    /// Returns error if the file cannot be written.
    pub fn finish(self) -> Result<usize> {
        write_atomic(&self.path, self.content.as_bytes())?;
        tracing::info!(path = %self.path.display(), entries = self.entries, "Index written");
        Ok(self.entries)
    }
}

/// One row of the statistics table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatsRow {
    pub id: i64,
    pub link: String,
    pub text: String,
    pub views: Option<u64>,
    pub forwards: Option<u64>,
    pub reactions: u64,
    pub date: String,
}

impl StatsRow {
    /// Builds the row for a message of `channel`.
    #[must_use]
    pub fn from_message(message: &RawMessage, channel: &str) -> Self {
        Self {
            id: message.id,
            link: format!("https://t.me/{channel}/{}", message.id),
            text: message.excerpt(EXCERPT_CHARS),
            views: message.views,
            forwards: message.forwards,
            reactions: message.total_reactions(),
            date: message.date.to_rfc3339(),
        }
    }
}

/// Semicolon-separated statistics table, appended to across runs.
pub struct StatsWriter {
    writer: csv::Writer<fs::File>,
    path: PathBuf,
    rows: usize,
}

impl StatsWriter {
    /// Opens `path` for appending. The header is written only if the file is new or empty.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::io("Failed to create statistics directory", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AppError::io(format!("Failed to open {}", path.display()), e))?;

        let is_empty = file
            .metadata()
            .map_err(|e| AppError::io(format!("Failed to inspect {}", path.display()), e))?
            .len()
            == 0;

        let writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(is_empty)
            .from_writer(file);

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    /// Appends one row.
    ///
    /// # Errors
    /// Returns error if the row cannot be written.
    pub fn append(&mut self, row: &StatsRow) -> Result<()> {
        self.writer.serialize(row).map_err(|e| self.csv_error(e))?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes buffered rows to disk.
    ///
    /// # Errors
    /// Returns error if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| AppError::io(format!("Failed to flush {}", self.path.display()), e))
    }

    /// Rows appended by this writer.
    #[must_use]
    pub const fn rows(&self) -> usize {
        self.rows
    }

    fn csv_error(&self, err: csv::Error) -> AppError {
        let message = format!("Failed to write {}", self.path.display());
        match err.into_kind() {
            csv::ErrorKind::Io(e) => AppError::io(message, e),
            other => AppError::Io {
                message: format!("{message}: {other:?}"),
                source: None,
            },
        }
    }
}
