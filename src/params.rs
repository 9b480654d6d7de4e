//! Structuring heuristics and their adjustment between attempts.
//!
//! [`StructuringParams`] is an immutable record: the named `with_*` setters
//! clamp their input and return a new instance, and [`StructuringParams::adjusted`]
//! is the pure failure-severity → revised-parameters mapping driving the
//! closed loop. Nothing holds a reference to a params value across attempts —
//! each detector run receives its own copy.

use crate::pipeline::validate::FailureMode;
use serde::{Deserialize, Serialize};

/// Heuristic knobs consumed by the chapter-boundary detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuringParams {
    /// Multiplier of the body font size above which a bold, short block is
    /// considered a heading candidate. Always ≥ 1.0. Default: 1.3.
    pub heading_threshold: f32,
    /// Pages per chapter for the tier-3 fixed-chunk fallback. Always ≥ 1.
    /// Default: 15.
    pub chunk_size: usize,
    /// Minimum word count a chapter is expected to carry. Carried through
    /// the adjustment loop for future use; no tier currently consumes it.
    /// Default: 100.
    pub min_chapter_words: usize,
}

impl Default for StructuringParams {
    fn default() -> Self {
        Self {
            heading_threshold: 1.3,
            chunk_size: 15,
            min_chapter_words: 100,
        }
    }
}

impl StructuringParams {
    /// New instance with `heading_threshold` clamped to ≥ 1.0.
    pub fn with_heading_threshold(self, v: f32) -> Self {
        Self {
            heading_threshold: v.max(1.0),
            ..self
        }
    }

    /// New instance with `chunk_size` clamped to ≥ 1.
    pub fn with_chunk_size(self, v: usize) -> Self {
        Self {
            chunk_size: v.max(1),
            ..self
        }
    }

    /// New instance with the given `min_chapter_words`.
    pub fn with_min_chapter_words(self, v: usize) -> Self {
        Self {
            min_chapter_words: v,
            ..self
        }
    }

    /// The revised parameter set for the next attempt.
    ///
    /// Severe word loss gets the drastic correction, moderate loss a gentler
    /// one; `Minor` and an absent failure mode (including the no-signal case
    /// where the artifact could not be read back) leave the parameters
    /// untouched. Floors and ceilings hold no matter how many rounds run.
    pub fn adjusted(self, failure: Option<FailureMode>) -> Self {
        match failure {
            Some(FailureMode::SevereWordLoss) => self
                .with_heading_threshold((self.heading_threshold - 0.15).max(1.1))
                .with_chunk_size((self.chunk_size + 10).min(30))
                .with_min_chapter_words(self.min_chapter_words.saturating_sub(50).max(25)),
            Some(FailureMode::ModerateWordLoss) => self
                .with_heading_threshold((self.heading_threshold - 0.10).max(1.1))
                .with_chunk_size((self.chunk_size + 5).min(25))
                .with_min_chapter_words(self.min_chapter_words.saturating_sub(25).max(50)),
            Some(FailureMode::Minor) | None => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn defaults() {
        let p = StructuringParams::default();
        assert!(close(p.heading_threshold, 1.3));
        assert_eq!(p.chunk_size, 15);
        assert_eq!(p.min_chapter_words, 100);
    }

    #[test]
    fn moderate_adjustment_from_defaults() {
        let p = StructuringParams::default().adjusted(Some(FailureMode::ModerateWordLoss));
        assert!(close(p.heading_threshold, 1.2), "got {}", p.heading_threshold);
        assert_eq!(p.chunk_size, 20);
        assert_eq!(p.min_chapter_words, 75);
    }

    #[test]
    fn severe_adjustment_from_defaults() {
        let p = StructuringParams::default().adjusted(Some(FailureMode::SevereWordLoss));
        assert!(close(p.heading_threshold, 1.15), "got {}", p.heading_threshold);
        assert_eq!(p.chunk_size, 25);
        assert_eq!(p.min_chapter_words, 50);
    }

    #[test]
    fn floors_and_ceilings_hold_under_repetition() {
        let mut p = StructuringParams::default();
        for _ in 0..20 {
            p = p.adjusted(Some(FailureMode::SevereWordLoss));
        }
        assert!(close(p.heading_threshold, 1.1));
        assert_eq!(p.chunk_size, 30);
        assert_eq!(p.min_chapter_words, 25);

        let mut q = StructuringParams::default();
        for _ in 0..20 {
            q = q.adjusted(Some(FailureMode::ModerateWordLoss));
        }
        assert!(close(q.heading_threshold, 1.1));
        assert_eq!(q.chunk_size, 25);
        assert_eq!(q.min_chapter_words, 50);
    }

    #[test]
    fn minor_and_no_signal_change_nothing() {
        let p = StructuringParams::default();
        assert_eq!(p.adjusted(Some(FailureMode::Minor)), p);
        assert_eq!(p.adjusted(None), p);
    }

    #[test]
    fn setters_clamp() {
        let p = StructuringParams::default()
            .with_heading_threshold(0.4)
            .with_chunk_size(0);
        assert!(close(p.heading_threshold, 1.0));
        assert_eq!(p.chunk_size, 1);
    }
}
