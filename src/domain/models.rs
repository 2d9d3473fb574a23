//! Domain models for Messenger thread data.
//!
//! These models represent the normalized entities extracted from the
//! `threads_db2` `SQLite` database.

use std::collections::BTreeMap;

use serde::Serialize;

/// An image attachment, with its preview URL resolved out of the nested
/// `urls` envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageAttachment {
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Receive time as `DD.MM.YYYY HH:MM:SS` local time.
    pub received_at: String,
}

/// A video attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoAttachment {
    pub file_name: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub length_seconds: u64,
    pub length_ms: u64,
}

/// An audio attachment (voice clips and voicemails).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioAttachment {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub is_voicemail: bool,
    pub duration_seconds: u64,
    pub duration_ms: u64,
    /// Receive time as `DD.MM.YYYY HH:MM:SS` local time.
    pub received_at: String,
    pub uri: String,
}

/// Normalized attachments for one message, grouped by media kind and
/// keyed by filename.
///
/// Filename collisions within a kind overwrite the earlier entry. That
/// matches the historical export format; see the fetcher for the
/// collision-free naming used on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttachmentSet {
    #[serde(rename = "image", skip_serializing_if = "BTreeMap::is_empty")]
    pub images: BTreeMap<String, ImageAttachment>,
    #[serde(rename = "video", skip_serializing_if = "BTreeMap::is_empty")]
    pub videos: BTreeMap<String, VideoAttachment>,
    #[serde(rename = "audio", skip_serializing_if = "BTreeMap::is_empty")]
    pub audio: BTreeMap<String, AudioAttachment>,
}

impl AttachmentSet {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty() && self.videos.is_empty() && self.audio.is_empty()
    }

    /// Total number of attachment records across all kinds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len() + self.videos.len() + self.audio.len()
    }
}

/// A normalized call event attached to a message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRecord {
    pub event: String,
    pub caller_id: String,
    /// Caller display name, "unknown" when the contact is not in the
    /// thread_users table.
    pub caller_name: String,
    pub is_video: bool,
    pub duration_seconds: u64,
}

/// One canonical message, built once per database row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub text: String,
    /// Resolved display names of the two conversation participants.
    /// Non-one-to-one threads yield two "unknown" entries.
    pub participants: [String; 2],
    pub sender: String,
    /// Delivery time, `DD.MM.YYYY HH:MM:SS`; absent serializes as empty.
    pub timestamp: Option<String>,
    /// Send time, same format; absent serializes as empty.
    pub timestamp_sent: Option<String>,
    pub attachments: AttachmentSet,
    pub event_type: String,
    pub is_video_call: Option<bool>,
    pub call: Option<CallRecord>,
}

/// One conversation thread: composite key plus its messages in arrival
/// order.
#[derive(Debug, Clone, Serialize)]
pub struct Thread {
    pub key: String,
    pub messages: Vec<Message>,
}

/// Append-only aggregation of messages by thread key.
///
/// Threads appear in first-seen order; messages keep arrival order within
/// a thread. No deduplication, no timestamp re-sorting.
#[derive(Debug, Default)]
pub struct ThreadLog {
    index: std::collections::HashMap<String, usize>,
    threads: Vec<Thread>,
}

impl ThreadLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to its thread, creating the thread lazily on
    /// first sight of the key.
    pub fn append(&mut self, thread_key: &str, message: Message) {
        let idx = *self.index.entry(thread_key.to_string()).or_insert_with(|| {
            self.threads.push(Thread {
                key: thread_key.to_string(),
                messages: Vec::new(),
            });
            self.threads.len() - 1
        });
        self.threads[idx].messages.push(message);
    }

    /// Threads in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &Thread> {
        self.threads.iter()
    }

    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    #[must_use]
    pub fn message_count(&self) -> usize {
        self.threads.iter().map(|t| t.messages.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

/// Summary statistics for one export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    /// Contacts loaded into the resolver.
    pub contact_count: usize,
    /// Distinct conversation threads seen.
    pub thread_count: usize,
    /// Message rows processed.
    pub message_count: usize,
    /// Normalized attachment records across all messages.
    pub attachment_count: usize,
    /// Messages carrying call data.
    pub call_count: usize,
}
