//! Layout-dump document source.
//!
//! The parsing engine proper lives outside this crate; what crosses the
//! boundary is a JSON *layout dump* — per-page blocks and spans with font
//! metadata, base64 image payloads, the optional embedded outline, and
//! (optionally) pre-rasterized page images for OCR input. This module turns
//! such a dump into a [`DocumentSource`] the pipeline can consume, and is
//! the adapter the CLI binary uses.
//!
//! A dump looks like:
//!
//! ```json
//! {
//!   "pages": [
//!     {
//!       "blocks": [
//!         {"type": "text", "spans": [
//!           {"text": "Chapter 1", "size": 18.0, "bold": true, "flags": 16, "bbox": [72, 80, 300, 104]}
//!         ]},
//!         {"type": "image"}
//!       ],
//!       "images": [{"data": "<base64>", "ext": "jpg"}],
//!       "render": "<base64 PNG of the page, for OCR>"
//!     }
//!   ],
//!   "outline": [{"level": 1, "title": "Chapter 1", "page": 1}]
//! }
//! ```
//!
//! Image payloads that fail to decode surface as per-image extraction
//! failures — the normalizer drops them and keeps the page.

use crate::error::{ConvertError, SourceError};
use crate::ports::{DocumentSource, OutlineEntry, RawBlock, RawImage, RawSpan, FLAG_BOLD};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct LayoutDoc {
    #[serde(default)]
    pages: Vec<LayoutPage>,
    #[serde(default)]
    outline: Vec<OutlineEntry>,
}

#[derive(Debug, Deserialize)]
struct LayoutPage {
    #[serde(default)]
    blocks: Vec<LayoutBlock>,
    #[serde(default)]
    images: Vec<LayoutImage>,
    /// Base64 rasterization of the full page, used as OCR input.
    #[serde(default)]
    render: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum LayoutBlock {
    Image,
    Text {
        #[serde(default)]
        spans: Vec<LayoutSpan>,
    },
}

#[derive(Debug, Deserialize)]
struct LayoutSpan {
    text: String,
    size: f32,
    #[serde(default)]
    bold: Option<bool>,
    #[serde(default)]
    flags: u32,
    #[serde(default)]
    bbox: [f32; 4],
}

#[derive(Debug, Deserialize)]
struct LayoutImage {
    data: String,
    ext: String,
}

struct SourcePage {
    blocks: Vec<RawBlock>,
    images: Vec<Result<RawImage, SourceError>>,
    render: Option<Vec<u8>>,
}

/// A [`DocumentSource`] backed by a decoded layout dump.
pub struct JsonDocumentSource {
    pages: Vec<SourcePage>,
    outline: Vec<OutlineEntry>,
}

impl JsonDocumentSource {
    /// Read and decode a layout dump from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConvertError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ConvertError::Internal(e.to_string()),
        })?;
        Self::from_slice(&bytes).map_err(|detail| ConvertError::InvalidLayout {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Decode a layout dump from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, String> {
        let doc: LayoutDoc = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;
        Ok(Self::from_doc(doc))
    }

    fn from_doc(doc: LayoutDoc) -> Self {
        let pages = doc
            .pages
            .into_iter()
            .enumerate()
            .map(|(page_index, p)| SourcePage {
                blocks: p
                    .blocks
                    .into_iter()
                    .map(|b| match b {
                        LayoutBlock::Image => RawBlock::Image,
                        LayoutBlock::Text { spans } => RawBlock::Text(
                            spans
                                .into_iter()
                                .map(|s| RawSpan {
                                    // Bold may be stated outright or carried
                                    // only in the style bitmask.
                                    bold: s.bold.unwrap_or(s.flags & FLAG_BOLD != 0),
                                    text: s.text,
                                    size: s.size,
                                    flags: s.flags,
                                    bbox: s.bbox,
                                })
                                .collect(),
                        ),
                    })
                    .collect(),
                images: p
                    .images
                    .into_iter()
                    .enumerate()
                    .map(|(index, img)| {
                        BASE64
                            .decode(img.data.as_bytes())
                            .map(|data| RawImage {
                                data,
                                ext: img.ext.clone(),
                                page: page_index,
                                index,
                            })
                            .map_err(|e| SourceError::ImageExtraction {
                                page: page_index,
                                index,
                                detail: e.to_string(),
                            })
                    })
                    .collect(),
                render: p
                    .render
                    .and_then(|data| BASE64.decode(data.as_bytes()).ok()),
            })
            .collect();

        Self {
            pages,
            outline: doc.outline,
        }
    }
}

impl DocumentSource for JsonDocumentSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn outline(&self) -> Vec<OutlineEntry> {
        self.outline.clone()
    }

    fn page_blocks(&self, index: usize) -> Result<Vec<RawBlock>, SourceError> {
        self.pages
            .get(index)
            .map(|p| p.blocks.clone())
            .ok_or(SourceError::PageOutOfRange {
                page: index,
                total: self.pages.len(),
            })
    }

    fn page_images(&self, index: usize) -> Vec<Result<RawImage, SourceError>> {
        self.pages
            .get(index)
            .map(|p| p.images.clone())
            .unwrap_or_default()
    }

    fn rasterize(&self, index: usize) -> Result<Vec<u8>, SourceError> {
        match self.pages.get(index) {
            Some(SourcePage {
                render: Some(data), ..
            }) => Ok(data.clone()),
            Some(_) => Err(SourceError::Rasterization {
                page: index,
                detail: "no page render in layout dump".into(),
            }),
            None => Err(SourceError::PageOutOfRange {
                page: index,
                total: self.pages.len(),
            }),
        }
    }
}
