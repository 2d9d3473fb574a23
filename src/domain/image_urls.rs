//! Image attachment URL resolution.
//!
//! The `urls` field of an image entry is doubly nested: JSON whose
//! `MEDIUM_PREVIEW` value is itself a JSON-encoded string carrying the
//! display `src`. Both the normalizer and the fetcher resolve through
//! this same decode.

use serde::Deserialize;

use super::error::{AppError, Result};

/// Outer layer of the image `urls` field.
#[derive(Debug, Deserialize)]
struct RawUrlEnvelope {
    #[serde(rename = "MEDIUM_PREVIEW")]
    medium_preview: String,
}

/// Inner layer: the preview descriptor, itself JSON-encoded inside the
/// envelope.
#[derive(Debug, Deserialize)]
struct RawPreview {
    src: String,
}

/// Resolves the display URL of an image attachment out of its
/// doubly-nested `urls` field.
///
/// # Errors
/// Returns a decode error if either layer is malformed.
pub fn parse_image_preview_url(raw_urls: &str) -> Result<String> {
    let envelope: RawUrlEnvelope = serde_json::from_str(raw_urls).map_err(AppError::decode)?;
    let preview: RawPreview =
        serde_json::from_str(&envelope.medium_preview).map_err(AppError::decode)?;
    Ok(preview.src)
}
