//! Error types for the pdf2epub library.
//!
//! Two kinds of failure exist and they are deliberately kept apart:
//!
//! * [`ConvertError`] — **Fatal**: the conversion cannot proceed at all
//!   (missing input, unreadable layout dump, the publication writer blew up).
//!   Returned as `Err(ConvertError)` from the top-level `convert*` functions.
//!
//! * Stage-local, recoverable faults — a single image that fails to extract,
//!   a page whose OCR call errors, a publication that cannot be read back
//!   during validation. These never surface as `Err`; they are absorbed at
//!   the stage boundary and represented as degraded data (a dropped image,
//!   an empty OCR result, an unscored validation report).
//!
//! The port-level errors ([`SourceError`], [`OcrError`], [`PublishError`])
//! belong to the capability traits in [`crate::ports`]; whether they are
//! fatal depends on where they occur. A failing page fetch kills the run, a
//! failing image extraction does not.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2epub library.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("layout file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a layout dump.
    #[error("File is not a layout dump: '{path}': {detail}")]
    InvalidLayout { path: PathBuf, detail: String },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The document source failed while enumerating a page's content.
    ///
    /// Per-image extraction failures are NOT routed here — they degrade to a
    /// dropped image inside the layout normalizer.
    #[error("Document source failed on page {page}: {detail}")]
    SourceRead { page: usize, detail: String },

    // ── Publication errors ────────────────────────────────────────────────
    /// The publication writer could not serialize the chapter list.
    #[error("Publication assembly failed: {detail}")]
    PublicationWrite { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output artifact file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors produced by a [`crate::ports::DocumentSource`].
///
/// Page-level variants are fatal when returned from `page_blocks`; the
/// image-extraction variant is always recoverable (the image is dropped).
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// A page index beyond the document's page count was requested.
    #[error("page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// A single embedded image could not be extracted.
    #[error("image {index} on page {page} could not be extracted: {detail}")]
    ImageExtraction {
        page: usize,
        index: usize,
        detail: String,
    },

    /// The source could not rasterize a page for OCR input.
    #[error("page {page} could not be rasterized: {detail}")]
    Rasterization { page: usize, detail: String },

    /// Any other source-side failure.
    #[error("{0}")]
    Other(String),
}

/// Errors produced by a [`crate::ports::TextRecognizer`].
///
/// Always recoverable: a failed recognition degrades to an empty result for
/// that page and the run continues.
#[derive(Debug, Clone, Error)]
pub enum OcrError {
    /// The recognition backend is not reachable or not configured.
    #[error("recognizer unavailable: {0}")]
    Unavailable(String),

    /// The backend was reached but recognition failed for this image.
    #[error("recognition failed: {0}")]
    Failed(String),
}

/// Errors produced by a [`crate::ports::PublicationWriter`].
///
/// Fatal when they occur during assembly (the attempt cannot be validated
/// without an artifact).
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("container I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("container serialization failed: {0}")]
    Container(String),
}

impl From<PublishError> for ConvertError {
    fn from(e: PublishError) -> Self {
        ConvertError::PublicationWrite {
            detail: e.to_string(),
        }
    }
}
