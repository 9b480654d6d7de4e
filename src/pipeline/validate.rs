//! Closed-loop validation: score the assembled publication against the source.
//!
//! The validator does not trust the renderer's own word tallies — it reads
//! the artifact back the way a reading system would (open the container,
//! take every document item, strip tags, count words) and compares that
//! against the source word count. One number, the word ratio, drives the
//! whole feedback loop.
//!
//! A readback failure is reported as a failed, *unscored* attempt: no ratio,
//! no failure mode. The adjuster treats that as "no signal" and leaves the
//! parameters untouched, so a corrupt artifact can exhaust the attempt
//! budget without ever crashing the run.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Word ratio at or above which an attempt passes.
pub const PASS_RATIO: f64 = 0.90;

/// Below this ratio a failure counts as severe.
const SEVERE_RATIO: f64 = 0.5;

/// Coarse bucket of a validation shortfall, used to pick the next
/// parameter adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    SevereWordLoss,
    ModerateWordLoss,
    Minor,
}

/// The scored outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub passed: bool,
    /// `None` when the artifact could not be read back at all.
    pub word_ratio: Option<f64>,
    pub source_words: usize,
    pub rendered_words: usize,
    pub chapter_count: usize,
    pub image_count: usize,
    /// `None` when the attempt passed — or when there is no signal.
    pub failure_mode: Option<FailureMode>,
}

static RE_MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Validate an assembled publication against the source word count.
pub fn validate_publication(
    artifact: &[u8],
    source_words: usize,
    chapter_count: usize,
    image_count: usize,
) -> ValidationReport {
    let rendered_words = match count_document_words(artifact) {
        Ok(n) => n,
        Err(detail) => {
            warn!("publication readback failed: {detail}");
            return ValidationReport {
                passed: false,
                word_ratio: None,
                source_words,
                rendered_words: 0,
                chapter_count,
                image_count,
                failure_mode: None,
            };
        }
    };

    // A degenerate all-scanned document with no OCR has nothing to compare;
    // an empty rendering of an empty source is perfect, anything else is a
    // coin toss we score at 0.5.
    let word_ratio = if source_words > 0 {
        round3((rendered_words as f64 / source_words as f64).min(1.0))
    } else if rendered_words == 0 {
        1.0
    } else {
        0.5
    };

    let passed = word_ratio >= PASS_RATIO;
    let failure_mode = if passed {
        None
    } else if word_ratio < SEVERE_RATIO {
        Some(FailureMode::SevereWordLoss)
    } else if word_ratio < PASS_RATIO {
        Some(FailureMode::ModerateWordLoss)
    } else {
        Some(FailureMode::Minor)
    };

    debug!(
        word_ratio,
        source_words, rendered_words, passed, "validation scored"
    );

    ValidationReport {
        passed,
        word_ratio: Some(word_ratio),
        source_words,
        rendered_words,
        chapter_count,
        image_count,
        failure_mode,
    }
}

/// Read back every document-type content item and count its words.
///
/// Any structural failure — not a zip, unreadable entry, non-UTF-8 text —
/// is a readback failure for the whole artifact.
fn count_document_words(artifact: &[u8]) -> Result<usize, String> {
    let mut archive =
        ZipArchive::new(Cursor::new(artifact)).map_err(|e| format!("not a container: {e}"))?;

    let mut words = 0usize;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| format!("entry {i}: {e}"))?;
        if !entry.name().ends_with(".xhtml") {
            continue;
        }
        let mut content = String::new();
        entry
            .read_to_string(&mut content)
            .map_err(|e| format!("entry {}: {e}", i))?;
        let clean = RE_MARKUP_TAG.replace_all(&content, " ");
        words += clean.split_whitespace().count();
    }
    Ok(words)
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
