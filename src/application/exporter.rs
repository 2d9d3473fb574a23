//! Export pipeline orchestration.
//!
//! Wires the database reader, contact resolver, message builder, thread
//! aggregation, attachment downloads and the delimited writer into one
//! synchronous run. Downloads are a per-row side effect driven from the
//! raw attachment payload; normalization never waits on them and a
//! download failure never empties a normalized row.

use std::path::PathBuf;

use crate::domain::{ContactResolver, ExportStats, Result, ThreadLog};
use crate::infrastructure::{
    csv_writer, DownloadPolicy, DownloadReport, MediaFetcher, ThreadsDbReader,
};

use super::builder::build_message;

/// Options for one export run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Path to the `threads_db2` database file.
    pub db_path: PathBuf,
    /// Destination of the delimited export.
    pub output_path: PathBuf,
    /// Directory receiving downloaded attachments.
    pub files_dir: PathBuf,
    /// Whether to download attachments at all.
    pub download: bool,
    /// Failure handling for downloads.
    pub policy: DownloadPolicy,
    /// Export field delimiter.
    pub delimiter: u8,
}

/// Result of a completed export run.
#[derive(Debug)]
pub struct ExportOutcome {
    pub stats: ExportStats,
    pub downloads: DownloadReport,
}

/// Builds the contact resolver from the full `thread_users` table.
///
/// # Errors
/// Returns error if the contacts query fails.
pub fn load_resolver(reader: &ThreadsDbReader) -> Result<ContactResolver> {
    let contacts = reader.fetch_contacts()?;
    Ok(ContactResolver::build(
        contacts.into_iter().map(|c| (c.user_key, c.name)),
    ))
}

/// Reads every message row, builds canonical messages and groups them by
/// thread key in first-seen order. When a fetcher is supplied, each
/// row's raw attachment payload also drives downloads, independently of
/// normalization.
///
/// # Errors
/// Returns error if the messages query fails, or on the first download
/// failure under the fail-fast policy.
pub fn collect_threads(
    reader: &ThreadsDbReader,
    resolver: &ContactResolver,
    fetcher: Option<&MediaFetcher>,
    report: &mut DownloadReport,
) -> Result<(ThreadLog, ExportStats)> {
    let mut log = ThreadLog::new();
    let mut stats = ExportStats {
        contact_count: resolver.len(),
        ..Default::default()
    };

    for row in reader.fetch_messages()? {
        if let Some(fetcher) = fetcher {
            if let Some(raw) = row.attachments.as_deref().filter(|s| !s.is_empty()) {
                fetcher.fetch_batch(raw, report)?;
            }
        }

        let message = build_message(&row, resolver);

        stats.message_count += 1;
        stats.attachment_count += message.attachments.len();
        if message.call.is_some() {
            stats.call_count += 1;
        }

        log.append(&row.thread_key, message);
    }

    stats.thread_count = log.thread_count();

    Ok((log, stats))
}

/// Runs the full export: scan, normalize, download, write.
///
/// # Errors
/// Returns error on database, output or fail-fast download failures.
pub fn run_export(options: &ExportOptions) -> Result<ExportOutcome> {
    tracing::info!(db = %options.db_path.display(), "Starting export");

    let reader = ThreadsDbReader::open(&options.db_path)?;
    let resolver = load_resolver(&reader)?;

    let fetcher = if options.download {
        Some(MediaFetcher::new(&options.files_dir, options.policy)?)
    } else {
        None
    };

    let mut report = DownloadReport::default();
    let (log, stats) = collect_threads(&reader, &resolver, fetcher.as_ref(), &mut report)?;

    csv_writer::write_threads(&options.output_path, &log, options.delimiter)?;

    tracing::info!(
        threads = stats.thread_count,
        messages = stats.message_count,
        "Export complete"
    );

    Ok(ExportOutcome {
        stats,
        downloads: report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal threads_db2 fixture with two contacts and three
    /// messages across two threads.
    fn fixture_db(path: &std::path::Path) {
        let conn = rusqlite::Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE thread_users (user_key TEXT, name TEXT);
             CREATE TABLE messages (
                 thread_key TEXT,
                 sender TEXT,
                 text TEXT,
                 timestamp_ms INTEGER,
                 timestamp_sent_ms INTEGER,
                 attachments TEXT,
                 admin_text_thread_rtc_event TEXT,
                 admin_text_thread_rtc_is_video_call INTEGER,
                 generic_admin_message_extensible_data TEXT
             );",
        )
        .unwrap();

        conn.execute(
            "INSERT INTO thread_users VALUES ('FACEBOOK:111', 'Alice'), ('FACEBOOK:222', 'Bob')",
            [],
        )
        .unwrap();

        let attachments = r#"[{
            "filename": "clip.mp4",
            "video_data_url": "http://x/1",
            "mime_type": "video/mp4",
            "file_size": 100,
            "video_data_length": 3,
            "video_data_length_ms": 3000
        }]"#;
        let call = r#"{"event": "call_ended", "caller_id": "111", "video": false, "call_duration": 30}"#;

        conn.execute(
            "INSERT INTO messages VALUES
                 ('ONE_TO_ONE:111:222', '{\"name\": \"Alice\"}', 'hello',
                  1700000000000, 1700000000000, NULL, NULL, NULL, NULL),
                 ('GROUP:1:2:3', NULL, 'group text', NULL, NULL, NULL, NULL, NULL, NULL),
                 ('ONE_TO_ONE:111:222', '{\"name\": \"Bob\"}', '',
                  1700000100000, NULL, ?1, 'one_on_one_call_ended', 0, ?2)",
            rusqlite::params![attachments, call],
        )
        .unwrap();
    }

    #[test]
    fn test_collect_threads_groups_and_counts() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("threads_db2");
        fixture_db(&db_path);

        let reader = ThreadsDbReader::open(&db_path).unwrap();
        let resolver = load_resolver(&reader).unwrap();
        let mut report = DownloadReport::default();

        let (log, stats) = collect_threads(&reader, &resolver, None, &mut report).unwrap();

        assert_eq!(stats.contact_count, 2);
        assert_eq!(stats.message_count, 3);
        assert_eq!(stats.thread_count, 2);
        assert_eq!(stats.attachment_count, 1);
        assert_eq!(stats.call_count, 1);
        assert_eq!(report.attempted, 0);

        let threads: Vec<&crate::domain::Thread> = log.iter().collect();
        assert_eq!(threads[0].key, "ONE_TO_ONE:111:222");
        assert_eq!(threads[1].key, "GROUP:1:2:3");
        assert_eq!(threads[0].messages.len(), 2);

        let first = &threads[0].messages[0];
        assert_eq!(first.participants, ["Alice", "Bob"]);
        assert_eq!(first.sender, "Alice");
        assert_eq!(first.text, "hello");

        let second = &threads[0].messages[1];
        assert!(second.attachments.videos.contains_key("clip.mp4"));
        assert_eq!(second.call.as_ref().unwrap().caller_name, "Alice");
        // A zero video-call flag is absent, like a zero timestamp.
        assert!(second.is_video_call.is_none());
        assert!(second.timestamp_sent.is_none());

        let group = &threads[1].messages[0];
        assert_eq!(group.participants, ["unknown", "unknown"]);
    }

    #[test]
    fn test_run_export_writes_delimited_file() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("threads_db2");
        fixture_db(&db_path);

        let options = ExportOptions {
            db_path,
            output_path: dir.path().join("out.csv"),
            files_dir: dir.path().join("files"),
            download: false,
            policy: DownloadPolicy::default(),
            delimiter: b'#',
        };

        let outcome = run_export(&options).unwrap();
        assert_eq!(outcome.stats.message_count, 3);
        assert_eq!(outcome.downloads.attempted, 0);

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'#')
            .from_path(&options.output_path)
            .unwrap();

        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "Message");
        assert_eq!(&headers[8], "Call data");

        let rows: Vec<csv::StringRecord> =
            reader.records().map(std::result::Result::unwrap).collect();
        assert_eq!(rows.len(), 3);

        // Thread rows stay contiguous in first-seen order.
        assert_eq!(&rows[0][0], "hello");
        assert_eq!(&rows[1][5], r#"{"video":{"clip.mp4":{"file_name":"clip.mp4","url":"http://x/1","mime_type":"video/mp4","size_bytes":100,"length_seconds":3,"length_ms":3000}}}"#);
        // The fixture's zero video-call flag exports as an empty cell.
        assert_eq!(&rows[1][7], "");
        assert_eq!(&rows[2][0], "group text");
        assert_eq!(&rows[2][1], r#"["unknown","unknown"]"#);
    }

    #[test]
    fn test_missing_database_is_reported() {
        let err = ThreadsDbReader::open(std::path::Path::new("/nonexistent/threads_db2"));
        assert!(matches!(
            err,
            Err(crate::domain::AppError::DatabaseNotFound { .. })
        ));
    }
}
