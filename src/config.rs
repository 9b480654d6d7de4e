//! Configuration types for layout-to-EPUB conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across invocations, log them, and diff two
//! runs to understand why their outputs differ.
//!
//! The injected capabilities (recognizer, writer, status reporter) also live
//! here, so the pipeline itself never reaches for ambient state.

use crate::error::ConvertError;
use crate::lexicon::HeadingLexicon;
use crate::params::StructuringParams;
use crate::ports::{PublicationWriter, TextRecognizer};
use crate::progress::StatusReporter;
use std::fmt;
use std::sync::Arc;

/// Configuration for a layout-to-EPUB conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2epub::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .title("My Book")
///     .language("es")
///     .max_attempts(3)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Publication identifier recorded in the artifact metadata.
    /// Default: "unknown".
    pub identifier: String,

    /// Publication title. Default: "Converted Book".
    pub title: String,

    /// Language code for the artifact metadata and the heading lexicon.
    /// Default: "en".
    pub language: String,

    /// Initial structuring heuristics for attempt 1. The closed loop
    /// adjusts a copy between attempts; this value is never mutated.
    pub params: StructuringParams,

    /// Attempt budget for the detect/render/validate loop. Range: ≥ 1.
    /// Default: 3.
    ///
    /// Each attempt fully re-renders and re-assembles the publication, so
    /// the budget bounds both wall clock and peak quality: in practice the
    /// parameter space is coarse enough that improvements flatten out after
    /// two adjustments.
    pub max_attempts: u32,

    /// Heading vocabulary override. When unset, the built-in lexicon for
    /// `language` is used.
    pub lexicon: Option<HeadingLexicon>,

    /// OCR capability for scanned pages. When unset, scanned pages render
    /// from whatever blocks they have.
    pub recognizer: Option<Arc<dyn TextRecognizer>>,

    /// Publication writer. When unset, the built-in EPUB 2 writer is used.
    pub writer: Option<Arc<dyn PublicationWriter>>,

    /// Status sink receiving progress checkpoints and the terminal record.
    pub status_reporter: Option<Arc<dyn StatusReporter>>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            identifier: "unknown".into(),
            title: "Converted Book".into(),
            language: "en".into(),
            params: StructuringParams::default(),
            max_attempts: 3,
            lexicon: None,
            recognizer: None,
            writer: None,
            status_reporter: None,
            download_timeout_secs: 120,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("identifier", &self.identifier)
            .field("title", &self.title)
            .field("language", &self.language)
            .field("params", &self.params)
            .field("max_attempts", &self.max_attempts)
            .field("lexicon", &self.lexicon)
            .field(
                "recognizer",
                &self.recognizer.as_ref().map(|_| "<dyn TextRecognizer>"),
            )
            .field(
                "writer",
                &self.writer.as_ref().map(|_| "<dyn PublicationWriter>"),
            )
            .field(
                "status_reporter",
                &self.status_reporter.as_ref().map(|_| "<dyn StatusReporter>"),
            )
            .field("download_timeout_secs", &self.download_timeout_secs)
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }

    /// The heading lexicon in effect: explicit override or the built-in
    /// vocabulary for `language`.
    pub fn effective_lexicon(&self) -> HeadingLexicon {
        self.lexicon
            .clone()
            .unwrap_or_else(|| HeadingLexicon::builtin(&self.language))
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn identifier(mut self, id: impl Into<String>) -> Self {
        self.config.identifier = id.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.config.title = title.into();
        self
    }

    pub fn language(mut self, lang: impl Into<String>) -> Self {
        self.config.language = lang.into();
        self
    }

    pub fn params(mut self, params: StructuringParams) -> Self {
        self.config.params = params;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n.max(1);
        self
    }

    pub fn lexicon(mut self, lexicon: HeadingLexicon) -> Self {
        self.config.lexicon = Some(lexicon);
        self
    }

    pub fn recognizer(mut self, recognizer: Arc<dyn TextRecognizer>) -> Self {
        self.config.recognizer = Some(recognizer);
        self
    }

    pub fn writer(mut self, writer: Arc<dyn PublicationWriter>) -> Self {
        self.config.writer = Some(writer);
        self
    }

    pub fn status_reporter(mut self, reporter: Arc<dyn StatusReporter>) -> Self {
        self.config.status_reporter = Some(reporter);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConvertError> {
        let c = &self.config;
        if c.max_attempts == 0 {
            return Err(ConvertError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.params.heading_threshold < 1.0 {
            return Err(ConvertError::InvalidConfig(format!(
                "heading_threshold must be ≥ 1.0, got {}",
                c.params.heading_threshold
            )));
        }
        if c.params.chunk_size == 0 {
            return Err(ConvertError::InvalidConfig("chunk_size must be ≥ 1".into()));
        }
        // Compile once here so a broken custom lexicon fails at build time,
        // not three attempts into a conversion.
        c.effective_lexicon().compile()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ConversionConfig::default();
        assert_eq!(c.max_attempts, 3);
        assert_eq!(c.language, "en");
        assert_eq!(c.params, StructuringParams::default());
    }

    #[test]
    fn builder_clamps_attempts() {
        let c = ConversionConfig::builder().max_attempts(0).build().unwrap();
        assert_eq!(c.max_attempts, 1);
    }

    #[test]
    fn language_selects_builtin_lexicon() {
        let c = ConversionConfig::builder().language("es").build().unwrap();
        assert_eq!(c.effective_lexicon().language, "es");
    }

    #[test]
    fn explicit_lexicon_wins_over_language() {
        let c = ConversionConfig::builder()
            .language("es")
            .lexicon(HeadingLexicon::builtin("en"))
            .build()
            .unwrap();
        assert_eq!(c.effective_lexicon().language, "en");
    }

    #[test]
    fn invalid_params_rejected_at_build() {
        let params = StructuringParams {
            heading_threshold: 0.8,
            chunk_size: 15,
            min_chapter_words: 100,
        };
        let err = ConversionConfig::builder().params(params).build();
        assert!(err.is_err());
    }

    #[test]
    fn broken_custom_lexicon_rejected_at_build() {
        let lexicon = HeadingLexicon {
            ordinal_patterns: vec!["(".into()],
            ..HeadingLexicon::default()
        };
        assert!(ConversionConfig::builder().lexicon(lexicon).build().is_err());
    }

    #[test]
    fn debug_omits_capability_internals() {
        let c = ConversionConfig::default();
        let s = format!("{c:?}");
        assert!(s.contains("max_attempts"));
        assert!(!s.contains("panic"));
    }
}
