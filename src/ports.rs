//! Capability traits for the external collaborators.
//!
//! The document-parsing engine, the OCR service, and the publication-container
//! writer are deliberate library seams: the core pipeline only ever talks to
//! these narrow traits, so it can be exercised end-to-end against in-memory
//! fakes without a real parsing, OCR, or container backend.
//!
//! The shapes mirror what those collaborators actually deliver:
//!
//! * [`DocumentSource`] — per-page enumeration of text blocks and spans,
//!   per-page image enumeration, an optional embedded outline, and page
//!   rasterization (the OCR stage needs a page image to hand to the
//!   recognizer).
//! * [`TextRecognizer`] — rasterized page image in, recognized text out.
//!   Calls are issued serially, one page at a time; there is no internal
//!   parallelism or retry here.
//! * [`PublicationWriter`] — ordered chapter list in, artifact bytes out.
//!   The default implementation is [`crate::epub::EpubWriter`].

use crate::error::{OcrError, PublishError, SourceError};
use crate::pipeline::render::Chapter;
use serde::{Deserialize, Serialize};

/// One text span as delivered by the parsing engine.
///
/// `size` arrives rounded to one decimal; `bold` is pre-derived from the
/// style flags but the raw bitmask travels along so downstream heuristics
/// can consult other style bits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    pub text: String,
    pub size: f32,
    pub bold: bool,
    pub flags: u32,
    pub bbox: [f32; 4],
}

/// Style-flag bit marking a bold span.
pub const FLAG_BOLD: u32 = 16;

/// One layout block on a page.
///
/// Image blocks carry no payload — they only mark the page as image-bearing
/// for scan detection. The actual image bytes come from
/// [`DocumentSource::page_images`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawBlock {
    Image,
    Text(Vec<RawSpan>),
}

/// An embedded image resource extracted from a page.
#[derive(Debug, Clone, PartialEq)]
pub struct RawImage {
    /// Raw image payload, passed through verbatim (no transcoding).
    pub data: Vec<u8>,
    /// Format extension as reported by the source, e.g. "png", "jpg".
    pub ext: String,
    /// 0-indexed page the image came from.
    pub page: usize,
    /// Position of the image within its page's image list.
    pub index: usize,
}

/// One entry of the document's embedded outline (table of contents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Nesting level, 1 = top level.
    pub level: u32,
    pub title: String,
    /// 1-indexed page number, as outlines conventionally store it.
    pub page: usize,
}

/// Read access to a parsed, page-structured document.
pub trait DocumentSource: Send + Sync {
    /// Total number of pages in the document.
    fn page_count(&self) -> usize;

    /// The embedded outline, empty when the document carries none.
    fn outline(&self) -> Vec<OutlineEntry>;

    /// Layout blocks of one page, in reading order.
    ///
    /// A failure here is fatal to the run — without span data the page can
    /// be neither analyzed nor rendered.
    fn page_blocks(&self, index: usize) -> Result<Vec<RawBlock>, SourceError>;

    /// Embedded images of one page.
    ///
    /// Extraction is fallible per image; the layout normalizer drops `Err`
    /// entries and keeps going.
    fn page_images(&self, index: usize) -> Vec<Result<RawImage, SourceError>>;

    /// Rasterize one page for OCR input.
    ///
    /// A failure degrades to an empty OCR result for the page.
    fn rasterize(&self, index: usize) -> Result<Vec<u8>, SourceError>;
}

/// Optical character recognition over a rasterized page image.
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in the given page image.
    ///
    /// An empty string is a valid result (nothing legible on the page).
    fn recognize(&self, page_image: &[u8]) -> Result<String, OcrError>;
}

/// Document-level metadata handed to the publication writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub identifier: String,
    pub title: String,
    /// BCP-47-ish language code, e.g. "en", "es".
    pub language: String,
}

/// Serializes an ordered chapter list into a distributable artifact.
///
/// The produced artifact's internal table of contents and linear reading
/// order must both follow the supplied chapter order.
pub trait PublicationWriter: Send + Sync {
    fn write(
        &self,
        meta: &PublicationMetadata,
        chapters: &[Chapter],
    ) -> Result<Vec<u8>, PublishError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_flag_matches_convention() {
        // 1=superscript, 2=italic, 4=serif, 16=bold
        assert_eq!(FLAG_BOLD, 16);
        assert_ne!(FLAG_BOLD & 2, 2);
    }

    #[test]
    fn outline_entry_round_trips_through_serde() {
        let entry = OutlineEntry {
            level: 2,
            title: "Chapter 1".into(),
            page: 10,
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: OutlineEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
