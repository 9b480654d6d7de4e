//! Conversion entry points and the closed-loop iteration controller.
//!
//! ## Invocation shape
//!
//! One invocation is single-threaded and strictly staged: normalize →
//! (optional OCR) → the bounded detect/render/validate/adjust loop →
//! surface the best attempt. The only async edges are input resolution
//! (URL download) and output file writes; the loop itself is synchronous.
//!
//! ## Best-attempt selection
//!
//! The controller keeps the highest-scoring attempt's *full output* —
//! artifact bytes, chapters, report — not just its metrics. Parameter
//! adjustments are heuristic and can regress (a lowered heading threshold
//! may shatter the book into noise chapters); when a later attempt scores
//! worse, the earlier artifact is what gets surfaced. An unscored attempt
//! (artifact could not be read back) ranks below any scored one.

use crate::config::ConversionConfig;
use crate::epub::EpubWriter;
use crate::error::ConvertError;
use crate::json_source::JsonDocumentSource;
use crate::pipeline::render::Chapter;
use crate::pipeline::structure::DetectionTier;
use crate::pipeline::validate::ValidationReport;
use crate::pipeline::{input, layout, ocr, render, structure, validate};
use crate::ports::{DocumentSource, PublicationMetadata, PublicationWriter};
use crate::progress::{NoopStatusReporter, ProgressTracker, QualitySummary, StatusSink};
use serde::Serialize;
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Everything a caller learns about one converted chapter.
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    pub title: String,
    pub first_page: usize,
    pub page_count: usize,
    pub word_count: usize,
    pub image_count: usize,
}

impl From<&Chapter> for ChapterSummary {
    fn from(c: &Chapter) -> Self {
        Self {
            title: c.title.clone(),
            first_page: c.pages.start,
            page_count: c.pages.len(),
            word_count: c.word_count,
            image_count: c.images.len(),
        }
    }
}

/// Terminal state of the iteration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopOutcome {
    /// A validation report passed within the attempt budget.
    Passed,
    /// The budget ran out; the best-scoring attempt is surfaced.
    Exhausted,
}

/// Run-level statistics for logging and the CLI summary.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionStats {
    pub total_pages: usize,
    pub scanned_pages: usize,
    pub source_words: usize,
    /// Attempts actually executed (≤ the configured budget).
    pub attempts: u32,
    /// Which attempt was surfaced (1-indexed).
    pub surfaced_attempt: u32,
    /// Detection tier of the surfaced attempt.
    pub tier: DetectionTier,
    pub outcome: LoopOutcome,
    pub duration_ms: u64,
}

/// The result of a conversion: the artifact plus everything needed to
/// judge it.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The assembled publication (EPUB bytes unless a custom writer was
    /// injected).
    pub artifact: Vec<u8>,
    /// Validation report of the surfaced attempt.
    pub report: ValidationReport,
    pub chapters: Vec<ChapterSummary>,
    pub stats: ConversionStats,
}

/// One fully materialized attempt, kept around for best-of-N selection.
struct Attempt {
    number: u32,
    artifact: Vec<u8>,
    report: ValidationReport,
    chapters: Vec<Chapter>,
    tier: DetectionTier,
}

impl Attempt {
    /// Comparable fidelity score; unscored attempts lose to any scored one.
    fn score(&self) -> f64 {
        self.report.word_ratio.unwrap_or(-1.0)
    }
}

/// Convert a page-structured document into a chaptered publication.
///
/// This is the primary entry point for the library. The terminal status
/// record (completed with a quality summary, or error with a message) is
/// delivered to the configured status reporter on every exit path.
///
/// # Errors
/// Returns `Err(ConvertError)` only for faults the pipeline cannot absorb:
/// a failing page fetch, a publication writer that errors, an unreadable
/// input. Recoverable degradations (dropped image, empty OCR, unscored
/// validation) never surface here.
pub async fn convert(
    source: &dyn DocumentSource,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let status: StatusSink = config
        .status_reporter
        .clone()
        .unwrap_or_else(|| Arc::new(NoopStatusReporter));

    match run_pipeline(source, config, &status) {
        Ok(output) => {
            status.on_completed(&QualitySummary::from(&output.report));
            Ok(output)
        }
        Err(e) => {
            status.on_error(&e.to_string());
            Err(e)
        }
    }
}

/// Convert a layout dump given as a local path or HTTP(S) URL.
pub async fn convert_file(
    input_str: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let resolved = input::resolve_input(input_str.as_ref(), config.download_timeout_secs).await?;
    let source = JsonDocumentSource::open(resolved.path())?;
    convert(&source, config).await
}

/// Convert a layout dump and write the artifact to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn convert_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    let output = convert_file(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConvertError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("epub.tmp");
    tokio::fs::write(&tmp_path, &output.artifact)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    source: &dyn DocumentSource,
    config: &ConversionConfig,
) -> Result<ConversionOutput, ConvertError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(convert(source, config))
}

// ── The staged pipeline ──────────────────────────────────────────────────

fn run_pipeline(
    source: &dyn DocumentSource,
    config: &ConversionConfig,
    status: &StatusSink,
) -> Result<ConversionOutput, ConvertError> {
    let total_start = Instant::now();
    let mut progress = ProgressTracker::new(Arc::clone(status));
    progress.advance(10);

    // ── Stage 1: layout normalization ────────────────────────────────────
    let mut analysis = layout::analyze(source)?;
    info!(
        pages = analysis.total_pages,
        words = analysis.total_words,
        body_size = analysis.body_size,
        scanned = analysis.scanned_pages.len(),
        images = analysis.image_count(),
        outline_entries = analysis.outline.len(),
        "analysis complete"
    );
    progress.advance(20);

    // ── Stage 2: OCR fallback ────────────────────────────────────────────
    let ocr_text = if analysis.scanned_pages.is_empty() {
        debug!("no scanned pages, skipping OCR");
        Default::default()
    } else {
        progress.advance(25);
        let results = ocr::recognize_scanned_pages(
            source,
            config.recognizer.as_deref(),
            &analysis.scanned_pages,
        );
        // Recognized words join the validation denominator exactly once,
        // here, before any attempt runs.
        let added = ocr::recognized_word_count(&results);
        analysis.total_words += added;
        info!(
            ocr_pages = results.len(),
            added_words = added,
            total_words = analysis.total_words,
            "OCR complete"
        );
        results
    };
    progress.advance(35);

    // ── Stages 3–5: the closed loop ──────────────────────────────────────
    let lexicon = config.effective_lexicon().compile()?;
    let writer: Arc<dyn PublicationWriter> = config
        .writer
        .clone()
        .unwrap_or_else(|| Arc::new(EpubWriter::new()));
    let meta = PublicationMetadata {
        identifier: config.identifier.clone(),
        title: config.title.clone(),
        language: config.language.clone(),
    };

    let mut params = config.params;
    let mut best: Option<Attempt> = None;
    let mut attempts_run = 0u32;

    for attempt_number in 1..=config.max_attempts {
        attempts_run = attempt_number;
        info!(
            attempt = attempt_number,
            max = config.max_attempts,
            heading_threshold = params.heading_threshold,
            chunk_size = params.chunk_size,
            "starting attempt"
        );

        let plan = structure::detect_chapters(&analysis, &params, &lexicon);
        let chapters = render::render_chapters(&plan.spans, &analysis, &ocr_text);

        let progress_base = 35 + (attempt_number - 1) * 15;
        progress.advance((progress_base + 10).min(85) as u8);

        let artifact = writer.write(&meta, &chapters)?;
        progress.advance((progress_base + 15).min(90) as u8);

        let image_count = chapters.iter().map(|c| c.images.len()).sum();
        let report = validate::validate_publication(
            &artifact,
            analysis.total_words,
            chapters.len(),
            image_count,
        );
        info!(
            attempt = attempt_number,
            word_ratio = ?report.word_ratio,
            passed = report.passed,
            "attempt validated"
        );

        let passed = report.passed;
        let failure = report.failure_mode;
        let attempt = Attempt {
            number: attempt_number,
            artifact,
            report,
            chapters,
            tier: plan.tier,
        };
        let improved = best
            .as_ref()
            .map(|b| attempt.score() > b.score())
            .unwrap_or(true);
        if improved {
            best = Some(attempt);
        } else {
            debug!(
                attempt = attempt_number,
                "attempt regressed, keeping earlier best"
            );
        }

        if passed {
            break;
        }
        if attempt_number < config.max_attempts {
            // The adjuster reacts to the attempt just measured, even when an
            // earlier attempt remains the best so far.
            params = params.adjusted(failure);
            info!(
                heading_threshold = params.heading_threshold,
                chunk_size = params.chunk_size,
                min_chapter_words = params.min_chapter_words,
                "adjusted params for next attempt"
            );
        } else {
            warn!("attempt budget exhausted, surfacing best-effort result");
        }
    }

    let best = best.ok_or_else(|| ConvertError::Internal("no attempt executed".into()))?;
    let outcome = if best.report.passed {
        LoopOutcome::Passed
    } else {
        LoopOutcome::Exhausted
    };
    let stats = ConversionStats {
        total_pages: analysis.total_pages,
        scanned_pages: analysis.scanned_pages.len(),
        source_words: analysis.total_words,
        attempts: attempts_run,
        surfaced_attempt: best.number,
        tier: best.tier,
        outcome,
        duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        attempts = stats.attempts,
        surfaced = stats.surfaced_attempt,
        word_ratio = ?best.report.word_ratio,
        "conversion complete"
    );

    Ok(ConversionOutput {
        chapters: best.chapters.iter().map(ChapterSummary::from).collect(),
        artifact: best.artifact,
        report: best.report,
        stats,
    })
}

/// Page ranges of the surfaced chapters, mainly for diagnostics.
pub fn chapter_ranges(output: &ConversionOutput) -> Vec<Range<usize>> {
    output
        .chapters
        .iter()
        .map(|c| c.first_page..c.first_page + c.page_count)
        .collect()
}
