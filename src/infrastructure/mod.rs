//! Infrastructure layer - external adapters (database, filesystem, network).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod csv_writer;
pub mod media_fetcher;
pub mod sqlite_reader;

pub use config::{load_config, AppConfig};
pub use media_fetcher::{DownloadPolicy, DownloadReport, MediaFetcher};
pub use sqlite_reader::{ContactRow, MessageRow, ThreadsDbReader};
