//! Port for reading channel history.

use async_trait::async_trait;

use crate::domain::{RawMessage, Result};

/// A paginated, reverse-chronological message history.
///
/// Implementations map their failures onto `AppError`: throttling and other
/// temporary conditions as `TransientFetch`, everything the caller cannot fix
/// by waiting as a permanent error.
#[async_trait]
pub trait MessageSource: Send {
    /// Up to `limit` messages with an id strictly below `before_id`, newest first.
    ///
    /// `before_id == 0` starts at the newest message.
    async fn fetch_page(&mut self, before_id: i64, limit: usize) -> Result<Vec<RawMessage>>;

    /// Profile URL for a user referenced by id, `None` if the user is unknown.
    async fn resolve_entity_user(&mut self, user_id: i64) -> Result<Option<String>>;

    /// Release the connection. Called exactly once when an export ends.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
