//! Application layer - use cases and orchestration.
//!
//! This layer contains the normalization pipeline: raw-row parsing,
//! message construction and the export run itself.

pub mod builder;
pub mod exporter;
pub mod parser;

pub use builder::build_message;
pub use exporter::{collect_threads, load_resolver, run_export, ExportOptions, ExportOutcome};
pub use parser::{normalize_attachments, parse_call_event};
