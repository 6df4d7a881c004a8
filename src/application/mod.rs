//! Application layer - use cases and orchestration.
//!
//! This layer contains the text conversion rules and the export loop that
//! drives a message source into the document store.

pub mod entity_formatter;
pub mod exporter;
pub mod formatter;
pub mod offsets;
pub mod renderer;
pub mod retry;

pub use exporter::{ExportDriver, ExportPlan};
pub use formatter::{format_progress, format_summary, format_summary_json, SummaryFormat};
