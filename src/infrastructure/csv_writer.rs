//! Delimited export output.
//!
//! Writes the aggregated threads to a single delimited file, one row per
//! message, threads contiguous in first-seen order. UTF-8 throughout;
//! the default `#` delimiter avoids collision with common message text.

use std::path::Path;

use csv::WriterBuilder;

use crate::domain::{AppError, Message, Result, ThreadLog};

/// Export column order. Fixed; existing consumers depend on it.
const HEADER: [&str; 9] = [
    "Message",
    "Message participants",
    "Sender",
    "Timestamp",
    "Timestamp sent",
    "Attachments",
    "Event type",
    "Is videocall",
    "Call data",
];

/// Writes all threads to a delimited file at `path`.
///
/// # Errors
/// Returns error if the file cannot be written or a field cannot be
/// serialized.
pub fn write_threads(path: &Path, log: &ThreadLog, delimiter: u8) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .map_err(|e| csv_error(path, &e))?;

    writer
        .write_record(HEADER)
        .map_err(|e| csv_error(path, &e))?;

    for thread in log.iter() {
        for message in &thread.messages {
            let record = message_record(message)?;
            writer
                .write_record(&record)
                .map_err(|e| csv_error(path, &e))?;
        }
    }

    writer.flush().map_err(|e| AppError::io("Failed to flush export file", e))?;

    tracing::info!(path = %path.display(), "Export written");

    Ok(())
}

/// Flattens one message into the fixed column layout.
fn message_record(message: &Message) -> Result<[String; 9]> {
    let participants =
        serde_json::to_string(&message.participants).map_err(AppError::decode)?;
    let attachments = serde_json::to_string(&message.attachments).map_err(AppError::decode)?;
    let call = match &message.call {
        Some(call) => serde_json::to_string(call).map_err(AppError::decode)?,
        None => "{}".to_string(),
    };
    let is_video_call = message
        .is_video_call
        .map_or_else(String::new, |v| v.to_string());

    Ok([
        message.text.clone(),
        participants,
        message.sender.clone(),
        message.timestamp.clone().unwrap_or_default(),
        message.timestamp_sent.clone().unwrap_or_default(),
        attachments,
        message.event_type.clone(),
        is_video_call,
        call,
    ])
}

fn csv_error(path: &Path, err: &csv::Error) -> AppError {
    AppError::Io {
        message: format!("Failed to write export {}: {err}", path.display()),
        source: None,
    }
}
