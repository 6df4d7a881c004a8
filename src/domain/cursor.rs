//! Pagination state for walking a channel history backward in time.

use serde::{Deserialize, Serialize};

use super::models::RawMessage;

/// Default number of messages requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Position of an export in the channel history.
///
/// `last_id == 0` means "start from the newest message". Every page moves the
/// cursor to the smallest id it contained, so the next fetch asks for strictly
/// older messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportCursor {
    pub last_id: i64,
    pub page_size: usize,
}

impl Default for ExportCursor {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

/// What the driver should do after a page was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Fetch the next, older page.
    Continue(ExportCursor),
    /// The history is exhausted.
    Done,
}

/// A page did not move the cursor strictly backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalledCursor {
    pub last_id: i64,
    pub page_min_id: i64,
}

impl ExportCursor {
    /// Cursor positioned at the newest message. A zero page size is bumped to one.
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            last_id: 0,
            page_size: if page_size == 0 { 1 } else { page_size },
        }
    }

    /// Whether this cursor has not fetched anything yet.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        self.last_id == 0
    }

    /// Compute the next step from a fetched page.
    ///
    /// An empty page ends the traversal. A non-empty page continues from its
    /// smallest id, which must be below the current position (unless this is
    /// the first page).
    ///
    /// # Errors
    /// Returns `StalledCursor` when the page would not move the cursor backward.
    pub fn advance(&self, page: &[RawMessage]) -> Result<CursorStep, StalledCursor> {
        let Some(min_id) = page.iter().map(|m| m.id).min() else {
            return Ok(CursorStep::Done);
        };

        if !self.is_start() && min_id >= self.last_id {
            return Err(StalledCursor {
                last_id: self.last_id,
                page_min_id: min_id,
            });
        }

        // Ids at or below zero cannot be expressed as an exclusive upper bound.
        if min_id <= 0 {
            return Ok(CursorStep::Done);
        }

        Ok(CursorStep::Continue(Self {
            last_id: min_id,
            page_size: self.page_size,
        }))
    }
}
