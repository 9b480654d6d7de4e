//! OCR fallback for scanned pages.
//!
//! Pages flagged as scanned carry no usable span data, so their text comes
//! from the injected [`TextRecognizer`] instead. Calls are issued serially,
//! one page at a time — the recognizer is an external service and the
//! hosting environment bounds the whole invocation's wall clock, so there
//! is no internal parallelism or retry here.
//!
//! Every failure on this path is non-fatal: a page that cannot be
//! rasterized or recognized gets an empty entry and the run continues.
//! With no recognizer configured the map stays empty, which downstream
//! means scanned pages fall back to whatever blocks they do have.

use crate::ports::{DocumentSource, TextRecognizer};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Recognize text for every scanned page, in ascending page order.
///
/// Returns a map from page index to recognized text. When a recognizer is
/// available, every scanned page gets an entry — empty on failure — so the
/// renderer can distinguish "OCR ran and found nothing" from "OCR never
/// ran".
pub fn recognize_scanned_pages(
    source: &dyn DocumentSource,
    recognizer: Option<&dyn TextRecognizer>,
    scanned_pages: &[usize],
) -> HashMap<usize, String> {
    let mut results = HashMap::new();
    if scanned_pages.is_empty() {
        return results;
    }

    let Some(recognizer) = recognizer else {
        info!(
            pages = scanned_pages.len(),
            "no recognizer configured, skipping OCR"
        );
        return results;
    };

    for &page in scanned_pages {
        let text = match source.rasterize(page) {
            Ok(image) => match recognizer.recognize(&image) {
                Ok(text) => {
                    debug!(page, chars = text.len(), "OCR extracted text");
                    text
                }
                Err(e) => {
                    warn!(page, "OCR failed: {e}");
                    String::new()
                }
            },
            Err(e) => {
                warn!(page, "rasterization failed: {e}");
                String::new()
            }
        };
        results.insert(page, text);
    }

    results
}

/// Count the words OCR adds to the source total.
///
/// Called exactly once, before the detect/render/validate loop starts, so
/// recognized text enters the validation denominator a single time no
/// matter how many attempts run.
pub fn recognized_word_count(results: &HashMap<usize, String>) -> usize {
    results
        .values()
        .map(|text| text.split_whitespace().count())
        .sum()
}
