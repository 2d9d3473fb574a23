//! Message record construction.
//!
//! Turns one raw `messages` row into a canonical [`Message`], applying
//! the attachment and call normalizers, participant resolution and
//! timestamp conversion.

use crate::domain::{ContactResolver, Message};
use crate::infrastructure::MessageRow;

use super::parser::{
    format_epoch_ms, normalize_attachments, parse_call_event, parse_sender,
    parse_thread_participants,
};

/// Builds a [`Message`] from a raw database row.
///
/// Field defaulting is permissive by contract: absent or zero timestamps
/// become `None` (exported as empty), absent text and event fields become
/// empty strings. Attachment downloads are a separate side effect driven
/// from the same raw payload; this function is pure.
pub fn build_message(row: &MessageRow, resolver: &ContactResolver) -> Message {
    let (id_a, id_b) = parse_thread_participants(&row.thread_key);
    let participants = [
        resolver.resolve_id(&id_a).to_string(),
        resolver.resolve_id(&id_b).to_string(),
    ];

    let sender = row
        .sender
        .as_deref()
        .filter(|s| !s.is_empty())
        .map_or_else(String::new, parse_sender);

    let attachments = row
        .attachments
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(normalize_attachments)
        .unwrap_or_default();

    let call = row
        .admin_extensible_data
        .as_deref()
        .filter(|s| !s.is_empty())
        .and_then(|raw| parse_call_event(raw, resolver));

    Message {
        text: row.text.clone().unwrap_or_default(),
        participants,
        sender,
        timestamp: convert_timestamp(row.timestamp_ms),
        timestamp_sent: convert_timestamp(row.timestamp_sent_ms),
        attachments,
        event_type: row.rtc_event.clone().unwrap_or_default(),
        // Zero is absent, same truthiness contract as the timestamps.
        is_video_call: row.rtc_is_video_call.filter(|v| *v != 0).map(|v| v != 0),
        call,
    }
}

/// Converts an optional epoch-ms field, treating zero as absent.
fn convert_timestamp(ms: Option<i64>) -> Option<String> {
    let ms = ms.filter(|v| *v != 0)?;
    match format_epoch_ms(ms) {
        Ok(formatted) => Some(formatted),
        Err(e) => {
            tracing::warn!("Dropping unrepresentable timestamp: {}", e);
            None
        }
    }
}
