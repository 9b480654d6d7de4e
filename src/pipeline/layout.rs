//! Layout normalization: raw span data → classified pages + font histogram.
//!
//! This is the only stage that talks to the raw page data. Everything
//! downstream (boundary detection, rendering, validation) works off the
//! [`DocumentAnalysis`] built here, which is computed once per document and
//! never recomputed mid-loop — in particular the body font size, which every
//! heading heuristic is relative to.
//!
//! Scan detection is intentionally crude: a page is scanned iff it bears an
//! image and fewer than 10 extracted words. No image-size, resolution, or
//! DPI signal is consulted — those vary wildly across producers, while
//! "picture plus no text" is what a scanned page actually looks like to a
//! text extractor.

use crate::error::{ConvertError, SourceError};
use crate::ports::{DocumentSource, OutlineEntry, RawBlock, RawImage};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Fewer extracted words than this, on an image-bearing page, means scanned.
pub const SCANNED_PAGE_WORD_LIMIT: usize = 10;

/// Body font size assumed for documents with no text at all.
pub const DEFAULT_BODY_SIZE: f32 = 12.0;

/// One normalized text block (a single span's worth of text).
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Font size rounded to one decimal.
    pub size: f32,
    pub bold: bool,
    pub flags: u32,
    pub bbox: [f32; 4],
}

impl TextBlock {
    /// Whitespace-separated word count of this block.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A fully normalized page. Built once, read-only thereafter.
#[derive(Debug, Clone)]
pub struct Page {
    /// 0-indexed position in the document.
    pub index: usize,
    pub blocks: Vec<TextBlock>,
    pub word_count: usize,
    /// Image-bearing with fewer than [`SCANNED_PAGE_WORD_LIMIT`] words.
    pub is_scanned: bool,
    pub images: Vec<RawImage>,
}

/// Multiset of observed span sizes, keyed by tenths of a point.
#[derive(Debug, Clone, Default)]
pub struct FontHistogram {
    counts: HashMap<i32, usize>,
}

impl FontHistogram {
    pub fn record(&mut self, size: f32) {
        *self.counts.entry(tenths(size)).or_insert(0) += 1;
    }

    /// The most frequent rounded size, or [`DEFAULT_BODY_SIZE`] when no
    /// text was observed. Ties break toward the smaller size so the result
    /// is deterministic and headings (which are rarer AND larger) lose.
    pub fn body_size(&self) -> f32 {
        self.counts
            .iter()
            .max_by_key(|(key, count)| (**count, -**key))
            .map(|(key, _)| *key as f32 / 10.0)
            .unwrap_or(DEFAULT_BODY_SIZE)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

fn tenths(size: f32) -> i32 {
    (size * 10.0).round() as i32
}

/// Round a span size to one decimal, matching what the histogram stores.
pub fn round_size(size: f32) -> f32 {
    tenths(size) as f32 / 10.0
}

/// Document-level result of normalization.
#[derive(Debug, Clone)]
pub struct DocumentAnalysis {
    pub pages: Vec<Page>,
    pub histogram: FontHistogram,
    /// Most frequent span size; the reference for every heading heuristic.
    pub body_size: f32,
    pub outline: Vec<OutlineEntry>,
    /// Aggregate extracted word count — the validation denominator. The OCR
    /// stage merges recognized words into this exactly once, before the
    /// detect/render/validate loop starts.
    pub total_words: usize,
    /// 0-indexed pages flagged as scanned, ascending.
    pub scanned_pages: Vec<usize>,
    pub total_pages: usize,
}

impl DocumentAnalysis {
    /// Total embedded images across all pages.
    pub fn image_count(&self) -> usize {
        self.pages.iter().map(|p| p.images.len()).sum()
    }
}

/// Normalize every page of the document, in order.
///
/// Image blocks mark the page image-bearing and are otherwise ignored for
/// text purposes. Spans with empty trimmed text contribute nothing. A
/// failing image extraction is dropped with a warning and the page keeps
/// going — losing one figure must not lose the book.
pub fn analyze(source: &dyn DocumentSource) -> Result<DocumentAnalysis, ConvertError> {
    let total_pages = source.page_count();
    let mut pages = Vec::with_capacity(total_pages);
    let mut histogram = FontHistogram::default();
    let mut scanned_pages = Vec::new();
    let mut total_words = 0usize;

    for index in 0..total_pages {
        let raw_blocks = source
            .page_blocks(index)
            .map_err(|e| ConvertError::SourceRead {
                page: index,
                detail: e.to_string(),
            })?;

        let mut blocks = Vec::new();
        let mut word_count = 0usize;
        let mut has_images = false;

        for raw in raw_blocks {
            match raw {
                RawBlock::Image => has_images = true,
                RawBlock::Text(spans) => {
                    for span in spans {
                        let text = span.text.trim();
                        if text.is_empty() {
                            continue;
                        }
                        let size = round_size(span.size);
                        histogram.record(size);
                        let block = TextBlock {
                            text: text.to_string(),
                            size,
                            bold: span.bold,
                            flags: span.flags,
                            bbox: span.bbox,
                        };
                        word_count += block.word_count();
                        blocks.push(block);
                    }
                }
            }
        }

        let images = collect_images(source.page_images(index), index);
        total_words += word_count;

        let is_scanned = has_images && word_count < SCANNED_PAGE_WORD_LIMIT;
        if is_scanned {
            scanned_pages.push(index);
        }

        pages.push(Page {
            index,
            blocks,
            word_count,
            is_scanned,
            images,
        });
    }

    let body_size = histogram.body_size();
    debug!(
        pages = total_pages,
        words = total_words,
        body_size,
        scanned = scanned_pages.len(),
        "layout normalization complete"
    );

    Ok(DocumentAnalysis {
        pages,
        body_size,
        histogram,
        outline: source.outline(),
        total_words,
        scanned_pages,
        total_pages,
    })
}

fn collect_images(results: Vec<Result<RawImage, SourceError>>, page: usize) -> Vec<RawImage> {
    results
        .into_iter()
        .filter_map(|r| match r {
            Ok(img) => Some(img),
            Err(e) => {
                warn!("dropping image on page {page}: {e}");
                None
            }
        })
        .collect()
}
