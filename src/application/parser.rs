//! JSON normalization for Messenger message rows.
//!
//! Handles the semi-structured blobs embedded in the `messages` table:
//! attachment batches, call events, sender envelopes and the nested image
//! URL structure. Decoding is typed internally; the public contract for a
//! malformed batch is an empty result plus a log line, never a propagated
//! error.

use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::domain::{
    parse_image_preview_url, AppError, AttachmentSet, AudioAttachment, CallRecord,
    ContactResolver, ImageAttachment, Result, VideoAttachment,
};

/// Filename recorded for video attachments whose source filename is
/// empty. Kept distinct from the fetcher's generated sequence names for
/// compatibility with existing exports.
const NO_FILE_NAME: &str = "No file name";

/// Raw attachment entry as stored in the database. Every field is
/// optional at this layer; required-field checks happen per classified
/// kind.
#[derive(Debug, Default, Deserialize)]
struct RawAttachmentEntry {
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    file_size: Option<u64>,
    #[serde(rename = "setReceivedTimestampMs", default)]
    received_timestamp_ms: Option<i64>,
    /// JSON-encoded URL envelope, present on image entries.
    #[serde(default)]
    urls: Option<String>,
    #[serde(default)]
    video_data_url: Option<String>,
    #[serde(default)]
    video_data_length: Option<u64>,
    #[serde(default)]
    video_data_length_ms: Option<u64>,
    #[serde(default)]
    audio_uri: Option<String>,
    #[serde(default)]
    is_voicemail: Option<bool>,
    #[serde(rename = "durationS", default)]
    duration_seconds: Option<u64>,
    #[serde(rename = "durationMs", default)]
    duration_ms: Option<u64>,
}

/// Raw call event from `generic_admin_message_extensible_data`.
#[derive(Debug, Deserialize)]
struct RawCallEvent {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    caller_id: Option<String>,
    #[serde(default)]
    video: Option<bool>,
    #[serde(default)]
    call_duration: Option<u64>,
}

/// Sender envelope stored in the `sender` column.
#[derive(Debug, Deserialize)]
struct RawSender {
    name: String,
}

fn require<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| AppError::missing_field(field))
}

/// Normalizes one attachment batch into an [`AttachmentSet`].
///
/// All-or-nothing: any entry missing a required field for its classified
/// kind drops the whole batch, yielding an empty set. Entries with an
/// unrecognized mime kind are skipped without affecting the rest.
pub fn normalize_attachments(raw_json: &str) -> AttachmentSet {
    match try_normalize_attachments(raw_json) {
        Ok(set) => set,
        Err(e) => {
            tracing::warn!("Dropping attachment batch: {}", e);
            AttachmentSet::default()
        }
    }
}

fn try_normalize_attachments(raw_json: &str) -> Result<AttachmentSet> {
    let entries: Vec<RawAttachmentEntry> =
        serde_json::from_str(raw_json).map_err(AppError::decode)?;

    let mut set = AttachmentSet::default();

    for entry in entries {
        let mime_type = require(entry.mime_type.clone(), "mime_type")?;

        if mime_type.contains("image/jpeg") {
            let image = normalize_image(entry, mime_type)?;
            set.images.insert(image.file_name.clone(), image);
        } else if mime_type.contains("video") {
            let video = normalize_video(entry, mime_type)?;
            set.videos.insert(video.file_name.clone(), video);
        } else if mime_type.contains("audio") {
            let audio = normalize_audio(entry, mime_type)?;
            set.audio.insert(audio.file_name.clone(), audio);
        } else {
            tracing::debug!("Skipping attachment with mime type '{}'", mime_type);
        }
    }

    Ok(set)
}

fn normalize_image(entry: RawAttachmentEntry, mime_type: String) -> Result<ImageAttachment> {
    let urls = require(entry.urls, "urls")?;
    let received_ms = require(entry.received_timestamp_ms, "setReceivedTimestampMs")?;

    Ok(ImageAttachment {
        file_name: require(entry.filename, "filename")?,
        url: parse_image_preview_url(&urls)?,
        mime_type,
        size_bytes: require(entry.file_size, "file_size")?,
        received_at: format_epoch_ms(received_ms)?,
    })
}

fn normalize_video(entry: RawAttachmentEntry, mime_type: String) -> Result<VideoAttachment> {
    let mut file_name = require(entry.filename, "filename")?;
    if file_name.is_empty() {
        file_name = NO_FILE_NAME.to_string();
    }

    Ok(VideoAttachment {
        file_name,
        url: require(entry.video_data_url, "video_data_url")?,
        mime_type,
        size_bytes: require(entry.file_size, "file_size")?,
        length_seconds: require(entry.video_data_length, "video_data_length")?,
        length_ms: require(entry.video_data_length_ms, "video_data_length_ms")?,
    })
}

fn normalize_audio(entry: RawAttachmentEntry, mime_type: String) -> Result<AudioAttachment> {
    let received_ms = require(entry.received_timestamp_ms, "setReceivedTimestampMs")?;

    Ok(AudioAttachment {
        file_name: require(entry.filename, "filename")?,
        mime_type,
        size_bytes: require(entry.file_size, "file_size")?,
        is_voicemail: require(entry.is_voicemail, "is_voicemail")?,
        duration_seconds: require(entry.duration_seconds, "durationS")?,
        duration_ms: require(entry.duration_ms, "durationMs")?,
        received_at: format_epoch_ms(received_ms)?,
        uri: require(entry.audio_uri, "audio_uri")?,
    })
}

/// Normalizes one call event, resolving the caller name through the
/// contact resolver. Missing any required field yields `None`, logged.
pub fn parse_call_event(raw_json: &str, resolver: &ContactResolver) -> Option<CallRecord> {
    match try_parse_call_event(raw_json, resolver) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::warn!("Dropping call event: {}", e);
            None
        }
    }
}

fn try_parse_call_event(raw_json: &str, resolver: &ContactResolver) -> Result<CallRecord> {
    let raw: RawCallEvent = serde_json::from_str(raw_json).map_err(AppError::decode)?;

    let caller_id = require(raw.caller_id, "caller_id")?;
    let caller_name = resolver.resolve_id(&caller_id).to_string();

    Ok(CallRecord {
        event: require(raw.event, "event")?,
        caller_id,
        caller_name,
        is_video: require(raw.video, "video")?,
        duration_seconds: require(raw.call_duration, "call_duration")?,
    })
}

/// Extracts the sender display name from its JSON envelope. A malformed
/// envelope yields an empty name, logged.
pub fn parse_sender(raw_json: &str) -> String {
    match serde_json::from_str::<RawSender>(raw_json) {
        Ok(sender) => sender.name,
        Err(e) => {
            tracing::warn!("Dropping malformed sender envelope: {}", e);
            String::new()
        }
    }
}

/// Splits a `SCHEME:ID1:ID2` thread key into its two participant IDs.
///
/// Only the `ONE_TO_ONE` scheme carries resolvable IDs; any other scheme
/// (group threads included) yields empty IDs, which resolve to the
/// unknown-contact sentinel downstream.
#[must_use]
pub fn parse_thread_participants(thread_key: &str) -> (String, String) {
    let parts: Vec<&str> = thread_key.split(':').collect();
    if parts.len() >= 3 && parts[0] == "ONE_TO_ONE" {
        (parts[1].to_string(), parts[2].to_string())
    } else {
        (String::new(), String::new())
    }
}

/// Converts an epoch-millisecond timestamp to the export's
/// `DD.MM.YYYY HH:MM:SS` local-time string.
///
/// # Errors
/// Returns an error for timestamps outside the representable range.
pub fn format_epoch_ms(ms: i64) -> Result<String> {
    let utc = DateTime::from_timestamp_millis(ms).ok_or_else(|| AppError::InvalidData {
        message: format!("timestamp out of range: {ms}"),
    })?;
    Ok(utc
        .with_timezone(&Local)
        .format("%d.%m.%Y %H:%M:%S")
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn video_entry_json() -> &'static str {
        r#"[{
            "filename": "clip.mp4",
            "video_data_url": "http://x/1",
            "mime_type": "video/mp4",
            "file_size": 100,
            "video_data_length": 3,
            "video_data_length_ms": 3000
        }]"#
    }

    #[test]
    fn test_video_entry_normalizes() {
        let set = normalize_attachments(video_entry_json());
        let video = set.videos.get("clip.mp4").unwrap();
        assert_eq!(video.file_name, "clip.mp4");
        assert_eq!(video.url, "http://x/1");
        assert_eq!(video.mime_type, "video/mp4");
        assert_eq!(video.size_bytes, 100);
        assert_eq!(video.length_seconds, 3);
        assert_eq!(video.length_ms, 3000);
    }

    #[test]
    fn test_video_empty_filename_gets_placeholder() {
        let raw = r#"[{
            "filename": "",
            "video_data_url": "http://x/1",
            "mime_type": "video/mp4",
            "file_size": 100,
            "video_data_length": 3,
            "video_data_length_ms": 3000
        }]"#;
        let set = normalize_attachments(raw);
        assert!(set.videos.contains_key("No file name"));
    }

    #[test]
    fn test_image_entry_normalizes() {
        let raw = r#"[{
            "filename": "photo.jpg",
            "mime_type": "image/jpeg",
            "file_size": 2048,
            "setReceivedTimestampMs": 1700000000000,
            "urls": "{\"MEDIUM_PREVIEW\": \"{\\\"src\\\":\\\"http://img/2.jpg\\\"}\"}"
        }]"#;
        let set = normalize_attachments(raw);
        let image = set.images.get("photo.jpg").unwrap();
        assert_eq!(image.url, "http://img/2.jpg");
        assert_eq!(image.size_bytes, 2048);
        assert!(!image.received_at.is_empty());
    }

    #[test]
    fn test_audio_entry_normalizes() {
        let raw = r#"[{
            "filename": "voice.mp4",
            "mime_type": "audio/mpeg",
            "file_size": 512,
            "is_voicemail": true,
            "audio_uri": "http://a/1",
            "durationS": 4,
            "durationMs": 4200,
            "setReceivedTimestampMs": 1700000000000
        }]"#;
        let set = normalize_attachments(raw);
        let audio = set.audio.get("voice.mp4").unwrap();
        assert!(audio.is_voicemail);
        assert_eq!(audio.duration_ms, 4200);
        assert_eq!(audio.uri, "http://a/1");
    }

    #[test]
    fn test_unrecognized_mime_is_dropped_silently() {
        let raw = r#"[{"mime_type": "application/pdf", "filename": "doc.pdf"}]"#;
        let set = normalize_attachments(raw);
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_field_empties_whole_batch() {
        // Valid video followed by an audio entry missing audio_uri.
        let raw = r#"[
            {
                "filename": "clip.mp4",
                "video_data_url": "http://x/1",
                "mime_type": "video/mp4",
                "file_size": 100,
                "video_data_length": 3,
                "video_data_length_ms": 3000
            },
            {
                "filename": "voice.mp4",
                "mime_type": "audio/mpeg",
                "file_size": 512,
                "is_voicemail": false,
                "durationS": 4,
                "durationMs": 4200,
                "setReceivedTimestampMs": 1700000000000
            }
        ]"#;
        let set = normalize_attachments(raw);
        assert!(set.is_empty());
    }

    #[test]
    fn test_malformed_batch_json_yields_empty_set() {
        assert!(normalize_attachments("not json").is_empty());
    }

    #[test]
    fn test_call_event_resolves_caller_name() {
        let resolver = ContactResolver::build(vec![(
            "FACEBOOK:42".to_string(),
            "Alice".to_string(),
        )]);
        let raw = r#"{"event": "missed_call", "caller_id": "42", "video": false, "call_duration": 0}"#;
        let record = parse_call_event(raw, &resolver).unwrap();
        assert_eq!(record.caller_name, "Alice");
        assert_eq!(record.event, "missed_call");
        assert!(!record.is_video);
    }

    #[test]
    fn test_call_event_unknown_caller_gets_sentinel() {
        let resolver = ContactResolver::default();
        let raw = r#"{"event": "call_ended", "caller_id": "7", "video": true, "call_duration": 65}"#;
        let record = parse_call_event(raw, &resolver).unwrap();
        assert_eq!(record.caller_name, "unknown");
        assert_eq!(record.duration_seconds, 65);
    }

    #[test]
    fn test_call_event_missing_field_yields_none() {
        let resolver = ContactResolver::default();
        let raw = r#"{"event": "call_ended", "video": true}"#;
        assert!(parse_call_event(raw, &resolver).is_none());
    }

    #[test]
    fn test_parse_sender_name() {
        assert_eq!(parse_sender(r#"{"name": "Alice"}"#), "Alice");
        assert_eq!(parse_sender("garbage"), "");
    }

    #[test]
    fn test_thread_participants_one_to_one() {
        let (a, b) = parse_thread_participants("ONE_TO_ONE:111:222");
        assert_eq!((a.as_str(), b.as_str()), ("111", "222"));
    }

    #[test]
    fn test_thread_participants_group_unsupported() {
        let (a, b) = parse_thread_participants("GROUP:1:2:3");
        assert!(a.is_empty() && b.is_empty());
    }

    #[test]
    fn test_epoch_ms_matches_export_format() {
        let formatted = format_epoch_ms(1_700_000_000_000).unwrap();
        assert!(NaiveDateTime::parse_from_str(&formatted, "%d.%m.%Y %H:%M:%S").is_ok());
    }
}
