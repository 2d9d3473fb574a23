//! Attachment downloading.
//!
//! Walks a raw attachment batch, classifies entries by field presence
//! (narrower than the normalizer's mime dispatch, matching the historical
//! export), computes collision-free local filenames and issues blocking
//! HTTP fetches. Per-item outcomes are collected into a
//! [`DownloadReport`]; whether a failure aborts the run is an explicit
//! policy choice rather than accidental propagation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::domain::{parse_image_preview_url, AppError, Result};

/// Run-level handling of download failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownloadPolicy {
    /// Record the failure, keep downloading (default).
    #[default]
    SkipAndContinue,
    /// Abort the run on the first failed fetch.
    FailFast,
}

/// One failed download within a run.
#[derive(Debug)]
pub struct DownloadFailure {
    pub file_name: String,
    pub url: String,
    pub error: String,
}

/// Accumulated download outcomes for a run.
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadReport {
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

/// A single resolved download: where to get it and what to call it.
#[derive(Debug, PartialEq, Eq)]
pub struct PlannedDownload {
    pub url: String,
    pub file_name: String,
}

/// Raw attachment entry, reduced to the fields the fetcher dispatches on.
#[derive(Debug, Deserialize)]
struct RawFetchEntry {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    audio_uri: Option<String>,
    #[serde(default)]
    urls: Option<String>,
    #[serde(default)]
    video_data_url: Option<String>,
}

/// Downloads referenced media into a local files directory.
pub struct MediaFetcher {
    client: reqwest::blocking::Client,
    files_dir: PathBuf,
    policy: DownloadPolicy,
}

impl MediaFetcher {
    /// Creates the fetcher, creating the target directory if absent.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn new(files_dir: &Path, policy: DownloadPolicy) -> Result<Self> {
        fs::create_dir_all(files_dir).map_err(|e| {
            AppError::io(
                format!("Failed to create files directory {}", files_dir.display()),
                e,
            )
        })?;

        Ok(Self {
            client: reqwest::blocking::Client::new(),
            files_dir: files_dir.to_path_buf(),
            policy,
        })
    }

    /// Fetches every downloadable entry of one attachment batch.
    ///
    /// Files are stored under the files directory keyed by the computed
    /// filename, overwriting on conflict.
    ///
    /// # Errors
    /// Under [`DownloadPolicy::FailFast`], returns the first fetch error.
    pub fn fetch_batch(&self, raw_json: &str, report: &mut DownloadReport) -> Result<()> {
        let planned = match plan_batch(raw_json) {
            Ok(planned) => planned,
            Err(e) => {
                // Malformed batches yield nothing to download; the
                // normalizer logs its own drop for the same payload.
                tracing::warn!("Skipping undecodable attachment batch: {}", e);
                return Ok(());
            }
        };

        for item in planned {
            report.attempted += 1;
            match self.download(&item.url, &item.file_name) {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::debug!(file = %item.file_name, "Downloaded attachment");
                }
                Err(e) => {
                    tracing::warn!(file = %item.file_name, "Download failed: {}", e);
                    report.failures.push(DownloadFailure {
                        file_name: item.file_name,
                        url: item.url,
                        error: e.to_string(),
                    });
                    if self.policy == DownloadPolicy::FailFast {
                        return Err(e);
                    }
                }
            }
        }

        Ok(())
    }

    /// One blocking GET, following redirects, written to the local store.
    fn download(&self, url: &str, file_name: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::network(url, e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::network(
                url,
                format!("HTTP status {}", response.status()),
            ));
        }

        let bytes = response
            .bytes()
            .map_err(|e| AppError::network(url, e.to_string()))?;

        let target = self.files_dir.join(file_name);
        fs::write(&target, &bytes)
            .map_err(|e| AppError::io(format!("Failed to write {}", target.display()), e))
    }
}

/// Resolves one raw batch into planned downloads.
///
/// Classification is by field presence, each check independent: an
/// `audio_uri` marks an audio entry, `urls` an image (resolved through
/// the same nested decode as the normalizer), `video_data_url` a video.
/// Nameless entries get `{kind}_{seq}.{ext}` names from a counter scoped
/// to this batch, so generated names never collide within one row.
///
/// # Errors
/// Returns a decode error if the batch itself is not a JSON array.
pub fn plan_batch(raw_json: &str) -> Result<Vec<PlannedDownload>> {
    let entries: Vec<RawFetchEntry> = serde_json::from_str(raw_json).map_err(AppError::decode)?;

    let mut planned = Vec::new();
    let mut sequence = 0usize;

    let mut push = |url: String, file_name: String| {
        planned.push(PlannedDownload { url, file_name });
    };

    // Empty-string fields count as absent, not as downloadable URLs.
    let present = |field: &Option<String>| {
        field
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    for entry in entries {
        let filename = entry.filename.as_deref().unwrap_or_default();

        if let Some(url) = present(&entry.audio_uri) {
            push(url, named_or_generated(filename, "audio", "mp4", &mut sequence));
        }

        if let Some(urls) = present(&entry.urls) {
            match parse_image_preview_url(&urls) {
                Ok(url) => {
                    push(url, named_or_generated(filename, "image", "jpg", &mut sequence));
                }
                Err(e) => {
                    tracing::warn!("Skipping image with undecodable urls field: {}", e);
                }
            }
        }

        if let Some(url) = present(&entry.video_data_url) {
            push(url, named_or_generated(filename, "video", "mp4", &mut sequence));
        }
    }

    Ok(planned)
}

fn named_or_generated(filename: &str, kind: &str, ext: &str, sequence: &mut usize) -> String {
    if filename.is_empty() {
        let generated = format!("{kind}_{sequence}.{ext}");
        *sequence += 1;
        generated
    } else {
        filename.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_uses_entry_filename_when_present() {
        let raw = r#"[{"filename": "clip.mp4", "video_data_url": "http://x/1"}]"#;
        let planned = plan_batch(raw).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].file_name, "clip.mp4");
        assert_eq!(planned[0].url, "http://x/1");
    }

    #[test]
    fn test_plan_generates_distinct_names_for_nameless_entries() {
        let raw = r#"[
            {"filename": "", "audio_uri": "http://a/1"},
            {"audio_uri": "http://a/2"}
        ]"#;
        let planned = plan_batch(raw).unwrap();
        assert_eq!(planned[0].file_name, "audio_0.mp4");
        assert_eq!(planned[1].file_name, "audio_1.mp4");
    }

    #[test]
    fn test_plan_resolves_image_url_through_nested_decode() {
        let raw = r#"[{
            "filename": "",
            "urls": "{\"MEDIUM_PREVIEW\": \"{\\\"src\\\":\\\"http://img/2.jpg\\\"}\"}"
        }]"#;
        let planned = plan_batch(raw).unwrap();
        assert_eq!(planned[0].url, "http://img/2.jpg");
        assert_eq!(planned[0].file_name, "image_0.jpg");
    }

    #[test]
    fn test_plan_kind_extensions() {
        let raw = r#"[
            {"audio_uri": "http://a/1"},
            {"video_data_url": "http://v/1"}
        ]"#;
        let planned = plan_batch(raw).unwrap();
        assert!(planned[0].file_name.ends_with(".mp4"));
        assert_eq!(planned[1].file_name, "video_1.mp4");
    }

    #[test]
    fn test_plan_skips_empty_url_fields() {
        let raw = r#"[
            {"filename": "voice.mp4", "audio_uri": ""},
            {"urls": "", "video_data_url": ""},
            {"audio_uri": "http://a/1"}
        ]"#;
        let planned = plan_batch(raw).unwrap();
        assert_eq!(planned.len(), 1);
        assert_eq!(planned[0].url, "http://a/1");
    }

    #[test]
    fn test_plan_rejects_non_array_batch() {
        assert!(plan_batch("{}").is_err());
    }

    #[test]
    fn test_fetcher_creates_files_dir() {
        let dir = tempfile::tempdir().unwrap();
        let files = dir.path().join("files");
        let _fetcher = MediaFetcher::new(&files, DownloadPolicy::default()).unwrap();
        assert!(files.is_dir());
    }
}
