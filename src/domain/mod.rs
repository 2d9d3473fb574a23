//! Domain layer - core business logic and types.
//!
//! This layer contains pure domain models, the contact resolver and
//! error types without any external dependencies (DB, IO, etc.).

pub mod error;
pub mod image_urls;
pub mod models;
pub mod resolver;

pub use error::{AppError, Result};
pub use image_urls::parse_image_preview_url;
pub use models::{
    AttachmentSet, AudioAttachment, CallRecord, ExportStats, ImageAttachment, Message, Thread,
    ThreadLog, VideoAttachment,
};
pub use resolver::{ContactResolver, CONTACT_KEY_PREFIX, UNKNOWN_CONTACT};
