//! Upload-trigger contract and job-record types.
//!
//! A conversion job begins when a storage event announces a newly created
//! object. Only objects under the configured upload prefix with the
//! configured source extension activate the pipeline; every other event is
//! ignored without side effects. The output artifact location is derived
//! deterministically from the job identifier, and the download locator
//! percent-encodes that object path.

use crate::progress::QualitySummary;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

/// Percent-encode everything except the RFC 3986 unreserved characters,
/// including `/` — the locator embeds the whole object path as one segment.
const LOCATOR_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A storage object-creation event, as delivered by the hosting trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEvent {
    pub bucket: String,
    /// Object path within the bucket, e.g. "pdf_uploads/report.pdf".
    pub path: String,
}

/// Path-shape rules deciding which uploads activate the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRules {
    pub upload_prefix: String,
    pub source_extension: String,
    pub output_prefix: String,
    pub output_extension: String,
}

impl Default for TriggerRules {
    fn default() -> Self {
        Self {
            upload_prefix: "pdf_uploads/".into(),
            source_extension: ".pdf".into(),
            output_prefix: "epub_conversions/".into(),
            output_extension: ".epub".into(),
        }
    }
}

impl TriggerRules {
    /// The job identifier for an accepted event, `None` when the event
    /// should be ignored.
    ///
    /// The identifier is the uploaded file's stem: `pdf_uploads/abc123.pdf`
    /// → `abc123`.
    pub fn job_id(&self, event: &ObjectEvent) -> Option<String> {
        let rest = event.path.strip_prefix(&self.upload_prefix)?;
        let stem = rest.strip_suffix(&self.source_extension)?;
        if stem.is_empty() || stem.contains('/') {
            return None;
        }
        Some(stem.to_string())
    }

    /// Deterministic output object path for a job.
    pub fn output_path(&self, job_id: &str) -> String {
        format!(
            "{}{}{}",
            self.output_prefix, job_id, self.output_extension
        )
    }
}

/// Build the public download locator for a stored artifact.
///
/// The object path is percent-encoded as a single segment (slashes too), the
/// way storage gateways address objects.
pub fn download_locator(base_url: &str, object_path: &str) -> String {
    let encoded = utf8_percent_encode(object_path, LOCATOR_SET);
    format!("{}/{}?alt=media", base_url.trim_end_matches('/'), encoded)
}

/// Terminal and non-terminal states of a conversion job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Error,
}

/// The persisted job record, written by the single conversion actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    /// Monotonically non-decreasing, `[0, 100]`.
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualitySummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    pub fn processing(progress: u8) -> Self {
        Self {
            status: JobStatus::Processing,
            progress: progress.min(100),
            download_url: None,
            quality: None,
            error: None,
        }
    }

    pub fn completed(download_url: String, quality: QualitySummary) -> Self {
        Self {
            status: JobStatus::Completed,
            progress: 100,
            download_url: Some(download_url),
            quality: Some(quality),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: JobStatus::Error,
            progress: 0,
            download_url: None,
            quality: None,
            error: Some(message.into()),
        }
    }
}
