//! Chapter boundary detection: three tiers, first applicable tier wins.
//!
//! The whole document is partitioned by exactly one strategy — tiers never
//! mix within a run:
//!
//! 1. **Outline tier** — the document's embedded outline, when it carries at
//!    least two entries at nesting level ≤ 2. Strongest signal: the author
//!    told us where the chapters are.
//! 2. **Heading-heuristic tier** — bold, oversized, short blocks that look
//!    like chapter openers, at least two distinct pages' worth. The
//!    `heading_threshold` parameter tunes how oversized, which is what the
//!    closed loop adjusts between attempts.
//! 3. **Fixed-chunk tier** — unconditional fallback: consecutive groups of
//!    `chunk_size` pages. Always produces an exact tiling.
//!
//! Tiers 1 and 2 both run through [`build_spans`], so front-matter synthesis
//! and the gap-free/overlap-free cover of `[0, total_pages)` hold for both.

use crate::lexicon::CompiledLexicon;
use crate::params::StructuringParams;
use crate::pipeline::layout::DocumentAnalysis;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;
use tracing::{debug, info};

/// Heading candidates may have at most this many words.
const MAX_HEADING_WORDS: usize = 12;

/// Blocks at or above `body_size *` this are headings regardless of wording.
const LARGE_HEADING_FACTOR: f32 = 1.5;

/// One detected chapter: a title and a contiguous, half-open page range.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSpan {
    pub title: String,
    pub pages: Range<usize>,
}

/// Which tier produced the partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionTier {
    Outline,
    Headings,
    FixedChunks,
}

/// The detector's output for one attempt.
#[derive(Debug, Clone)]
pub struct ChapterPlan {
    pub spans: Vec<ChapterSpan>,
    pub tier: DetectionTier,
}

/// Partition all pages of the document into chapters.
///
/// The returned spans are ordered, non-overlapping, and together cover
/// `[0, total_pages)` exactly (trivially so for an empty document).
pub fn detect_chapters(
    analysis: &DocumentAnalysis,
    params: &StructuringParams,
    lexicon: &CompiledLexicon,
) -> ChapterPlan {
    if let Some(spans) = outline_tier(analysis, lexicon) {
        info!(chapters = spans.len(), "using embedded outline");
        return ChapterPlan {
            spans,
            tier: DetectionTier::Outline,
        };
    }

    if let Some(spans) = heading_tier(analysis, params, lexicon) {
        info!(chapters = spans.len(), "using font-heuristic headings");
        return ChapterPlan {
            spans,
            tier: DetectionTier::Headings,
        };
    }

    let spans = chunk_tier(analysis.total_pages, params.chunk_size, lexicon);
    info!(
        chapters = spans.len(),
        chunk_size = params.chunk_size,
        "no structural signal, using fixed chunks"
    );
    ChapterPlan {
        spans,
        tier: DetectionTier::FixedChunks,
    }
}

// ── Tier 1: embedded outline ─────────────────────────────────────────────

fn outline_tier(analysis: &DocumentAnalysis, lexicon: &CompiledLexicon) -> Option<Vec<ChapterSpan>> {
    // Only top-level and second-level entries mark chapters; deeper levels
    // are subsections.
    let mut boundaries: Vec<(String, usize)> = analysis
        .outline
        .iter()
        .filter(|e| e.level <= 2)
        .map(|e| (e.title.clone(), e.page.saturating_sub(1)))
        .collect();

    if boundaries.len() < 2 {
        return None;
    }

    boundaries.sort_by_key(|(_, page)| *page);
    let spans = build_spans(boundaries, analysis.total_pages, lexicon);
    if spans.is_empty() {
        return None;
    }
    Some(spans)
}

// ── Tier 2: font-heuristic headings ──────────────────────────────────────

#[derive(Debug)]
struct HeadingCandidate {
    title: String,
    page: usize,
    size: f32,
}

fn heading_tier(
    analysis: &DocumentAnalysis,
    params: &StructuringParams,
    lexicon: &CompiledLexicon,
) -> Option<Vec<ChapterSpan>> {
    let body = analysis.body_size;
    let heading_min_size = body * params.heading_threshold;

    let mut candidates = Vec::new();
    for page in &analysis.pages {
        // Scanned pages carry no usable block data.
        if page.is_scanned {
            continue;
        }
        for block in &page.blocks {
            if block.size < heading_min_size || !block.bold {
                continue;
            }
            if block.word_count() > MAX_HEADING_WORDS || block.text.chars().count() <= 2 {
                continue;
            }
            let chapter_like = lexicon.starts_with_keyword(&block.text)
                || lexicon.starts_with_ordinal(&block.text)
                || block.size >= body * LARGE_HEADING_FACTOR;
            if chapter_like {
                candidates.push(HeadingCandidate {
                    title: block.text.clone(),
                    page: page.index,
                    size: block.size,
                });
            }
        }
    }

    // One candidate per page, keeping the largest; two distinct pages
    // required before this tier activates.
    let mut per_page: HashMap<usize, HeadingCandidate> = HashMap::new();
    for c in candidates {
        match per_page.get(&c.page) {
            Some(existing) if existing.size >= c.size => {}
            _ => {
                per_page.insert(c.page, c);
            }
        }
    }
    if per_page.len() < 2 {
        return None;
    }

    let mut boundaries: Vec<(String, usize)> = per_page
        .into_values()
        .map(|c| (c.title, c.page))
        .collect();
    boundaries.sort_by_key(|(_, page)| *page);
    debug!(headings = boundaries.len(), "deduplicated heading candidates");

    let spans = build_spans(boundaries, analysis.total_pages, lexicon);
    if spans.is_empty() {
        return None;
    }
    Some(spans)
}

// ── Tier 3: fixed chunks ─────────────────────────────────────────────────

fn chunk_tier(total_pages: usize, chunk_size: usize, lexicon: &CompiledLexicon) -> Vec<ChapterSpan> {
    let chunk = chunk_size.max(1);
    let mut spans = Vec::new();
    let mut start = 0;
    while start < total_pages {
        let end = (start + chunk).min(total_pages);
        spans.push(ChapterSpan {
            title: lexicon.section_title(spans.len() + 1),
            pages: start..end,
        });
        start = end;
    }
    spans
}

// ── Shared boundary construction ─────────────────────────────────────────

/// Turn sorted (title, start-page) boundaries into contiguous spans.
///
/// Each boundary runs to the next boundary's page (exclusive) or the end of
/// the document. Empty spans (duplicate or out-of-range starts) are skipped.
/// If the first surviving span starts after page 0, a synthetic front-matter
/// chapter covers the gap so the partition stays an exact cover.
fn build_spans(
    boundaries: Vec<(String, usize)>,
    total_pages: usize,
    lexicon: &CompiledLexicon,
) -> Vec<ChapterSpan> {
    let mut spans: Vec<ChapterSpan> = Vec::with_capacity(boundaries.len());

    for (i, (title, start)) in boundaries.iter().enumerate() {
        let start = (*start).min(total_pages);
        let end = match boundaries.get(i + 1) {
            Some((_, next)) => (*next).min(total_pages),
            None => total_pages,
        };
        if start < end {
            spans.push(ChapterSpan {
                title: title.clone(),
                pages: start..end,
            });
        }
    }

    if let Some(first) = spans.first() {
        if first.pages.start > 0 {
            let front = ChapterSpan {
                title: lexicon.front_matter_title().to_string(),
                pages: 0..first.pages.start,
            };
            spans.insert(0, front);
        }
    }

    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::HeadingLexicon;
    use crate::pipeline::layout::{DocumentAnalysis, FontHistogram, Page, TextBlock};
    use crate::ports::OutlineEntry;

    fn lexicon() -> CompiledLexicon {
        HeadingLexicon::builtin("en").compile().unwrap()
    }

    fn block(text: &str, size: f32, bold: bool) -> TextBlock {
        TextBlock {
            text: text.into(),
            size,
            bold,
            flags: if bold { 16 } else { 0 },
            bbox: [0.0; 4],
        }
    }

    fn body_page(index: usize) -> Page {
        Page {
            index,
            blocks: vec![block("plain body text on this page", 12.0, false)],
            word_count: 5,
            is_scanned: false,
            images: Vec::new(),
        }
    }

    fn analysis_with(pages: Vec<Page>, outline: Vec<OutlineEntry>) -> DocumentAnalysis {
        let total_pages = pages.len();
        let total_words = pages.iter().map(|p| p.word_count).sum();
        let scanned_pages = pages
            .iter()
            .filter(|p| p.is_scanned)
            .map(|p| p.index)
            .collect();
        DocumentAnalysis {
            pages,
            histogram: FontHistogram::default(),
            body_size: 12.0,
            outline,
            total_words,
            scanned_pages,
            total_pages,
        }
    }

    fn entry(level: u32, title: &str, page: usize) -> OutlineEntry {
        OutlineEntry {
            level,
            title: title.into(),
            page,
        }
    }

    fn assert_exact_cover(spans: &[ChapterSpan], total: usize) {
        let mut expected = 0;
        for span in spans {
            assert_eq!(span.pages.start, expected, "gap or overlap at {expected}");
            assert!(span.pages.start < span.pages.end, "empty span");
            expected = span.pages.end;
        }
        assert_eq!(expected, total, "partition does not reach document end");
    }

    #[test]
    fn outline_tier_partitions_sixty_pages() {
        // 5 entries starting at page 0 → 5 chapters, no front matter.
        let pages: Vec<Page> = (0..60).map(body_page).collect();
        let outline = vec![
            entry(1, "One", 1),
            entry(1, "Two", 11),
            entry(2, "Three", 26),
            entry(1, "Four", 41),
            entry(1, "Five", 56),
        ];
        let plan = detect_chapters(
            &analysis_with(pages, outline),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::Outline);
        assert_eq!(plan.spans.len(), 5);
        assert_eq!(plan.spans[0].pages, 0..10);
        assert_eq!(plan.spans[4].pages, 55..60);
        assert_exact_cover(&plan.spans, 60);
    }

    #[test]
    fn outline_tier_synthesizes_front_matter() {
        // First entry at page 3 (0-indexed) → 6 chapters, front matter [0,3).
        let pages: Vec<Page> = (0..60).map(body_page).collect();
        let outline = vec![
            entry(1, "One", 4),
            entry(1, "Two", 11),
            entry(1, "Three", 26),
            entry(1, "Four", 41),
            entry(1, "Five", 56),
        ];
        let plan = detect_chapters(
            &analysis_with(pages, outline),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.spans.len(), 6);
        assert_eq!(plan.spans[0].title, "Front Matter");
        assert_eq!(plan.spans[0].pages, 0..3);
        assert_eq!(plan.spans[1].pages, 3..10);
        assert_exact_cover(&plan.spans, 60);
    }

    #[test]
    fn outline_tier_ignores_deep_levels() {
        // Only one entry at level ≤ 2 → tier 1 inapplicable.
        let pages: Vec<Page> = (0..10).map(body_page).collect();
        let outline = vec![
            entry(1, "Only", 1),
            entry(3, "Deep A", 3),
            entry(4, "Deep B", 5),
        ];
        let plan = detect_chapters(
            &analysis_with(pages, outline),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
    }

    #[test]
    fn outline_entries_are_sorted_before_spanning() {
        let pages: Vec<Page> = (0..20).map(body_page).collect();
        let outline = vec![entry(1, "Late", 11), entry(1, "Early", 1)];
        let plan = detect_chapters(
            &analysis_with(pages, outline),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.spans[0].title, "Early");
        assert_eq!(plan.spans[0].pages, 0..10);
        assert_eq!(plan.spans[1].pages, 10..20);
    }

    #[test]
    fn heading_tier_fires_on_bold_oversized_keywords() {
        let mut pages: Vec<Page> = (0..30).map(body_page).collect();
        pages[0].blocks.insert(0, block("Chapter 1", 18.0, true));
        pages[14].blocks.insert(0, block("Chapter 2", 18.0, true));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::Headings);
        assert_eq!(plan.spans.len(), 2);
        assert_eq!(plan.spans[0].title, "Chapter 1");
        assert_eq!(plan.spans[1].pages, 14..30);
        assert_exact_cover(&plan.spans, 30);
    }

    #[test]
    fn heading_tier_requires_boldness() {
        let mut pages: Vec<Page> = (0..30).map(body_page).collect();
        pages[0].blocks.insert(0, block("Chapter 1", 18.0, false));
        pages[14].blocks.insert(0, block("Chapter 2", 18.0, false));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
    }

    #[test]
    fn heading_tier_accepts_very_large_text_without_keyword() {
        let mut pages: Vec<Page> = (0..20).map(body_page).collect();
        // 18pt = 1.5 × body: chapter-like by size alone.
        pages[2].blocks.insert(0, block("The Beginning", 18.0, true));
        pages[11].blocks.insert(0, block("The End", 18.0, true));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::Headings);
        assert_eq!(plan.spans[0].title, "Front Matter");
        assert_eq!(plan.spans[0].pages, 0..2);
    }

    #[test]
    fn heading_tier_rejects_moderately_large_non_chapter_text() {
        // 16pt is above the 1.3 threshold but below 1.5×, and the wording is
        // not chapter-like → no candidate.
        let mut pages: Vec<Page> = (0..20).map(body_page).collect();
        pages[2].blocks.insert(0, block("Important Note", 16.0, true));
        pages[11].blocks.insert(0, block("Another Note", 16.0, true));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
    }

    #[test]
    fn heading_tier_dedupes_per_page_keeping_largest() {
        let mut pages: Vec<Page> = (0..20).map(body_page).collect();
        pages[0].blocks.insert(0, block("Chapter 1", 24.0, true));
        pages[0].blocks.insert(1, block("Section 1.1", 16.0, true));
        pages[9].blocks.insert(0, block("Chapter 2", 24.0, true));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.spans.len(), 2);
        assert_eq!(plan.spans[0].title, "Chapter 1");
    }

    #[test]
    fn heading_tier_needs_two_distinct_pages() {
        let mut pages: Vec<Page> = (0..20).map(body_page).collect();
        pages[4].blocks.insert(0, block("Chapter 1", 24.0, true));
        pages[4].blocks.insert(1, block("Chapter 2", 24.0, true));
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
    }

    #[test]
    fn heading_tier_skips_scanned_pages() {
        let mut pages: Vec<Page> = (0..20).map(body_page).collect();
        pages[0].blocks.insert(0, block("Chapter 1", 24.0, true));
        pages[9].blocks.insert(0, block("Chapter 2", 24.0, true));
        pages[9].is_scanned = true;
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        // Only one usable heading page remains → falls to chunks.
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
    }

    #[test]
    fn chunk_tier_tiles_forty_pages_as_15_15_10() {
        let pages: Vec<Page> = (0..40).map(body_page).collect();
        let plan = detect_chapters(
            &analysis_with(pages, Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert_eq!(plan.tier, DetectionTier::FixedChunks);
        assert_eq!(plan.spans.len(), 3);
        assert_eq!(plan.spans[0].pages, 0..15);
        assert_eq!(plan.spans[1].pages, 15..30);
        assert_eq!(plan.spans[2].pages, 30..40);
        assert_eq!(plan.spans[2].title, "Section 3");
        assert_exact_cover(&plan.spans, 40);
    }

    #[test]
    fn chunk_tier_handles_empty_document() {
        let plan = detect_chapters(
            &analysis_with(Vec::new(), Vec::new()),
            &StructuringParams::default(),
            &lexicon(),
        );
        assert!(plan.spans.is_empty());
    }

    #[test]
    fn chunk_tier_exact_for_any_chunk_size() {
        for chunk in 1..=7 {
            let pages: Vec<Page> = (0..23).map(body_page).collect();
            let params = StructuringParams::default().with_chunk_size(chunk);
            let plan = detect_chapters(&analysis_with(pages, Vec::new()), &params, &lexicon());
            assert_exact_cover(&plan.spans, 23);
        }
    }
}
