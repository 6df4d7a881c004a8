//! Domain layer - core types for channel export.
//!
//! This layer contains pure domain models, pagination state and error types
//! without any external dependencies (DB, IO, etc.).

pub mod config;
pub mod cursor;
pub mod error;
pub mod models;

pub use config::{AppConfig, ExportConfig, RetryConfig, SourceConfig};
pub use cursor::{CursorStep, ExportCursor, StalledCursor};
pub use error::{AppError, EntityError, Result};
pub use models::{
    Button, ButtonRow, Entity, EntityKind, ExportSummary, Media, MediaAttribute, RawMessage,
    ReactionCount, RenderedDocument, ReplyMarkup, SkippedMessage,
};
