//! Infrastructure layer - external adapters (archive database, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod document_store;
pub mod index_writer;
pub mod source;
pub mod sqlite_source;

pub use config::{config_to_toml, ensure_config_exists, load_config};
pub use document_store::DocumentStore;
pub use index_writer::{IndexWriter, StatsRow, StatsWriter};
pub use source::MessageSource;
pub use sqlite_source::SqliteArchiveSource;
