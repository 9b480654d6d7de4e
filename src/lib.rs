//! # pdf2epub
//!
//! Convert page-structured documents into chaptered EPUBs, with a closed
//! validation loop that measures fidelity and retries with adjusted
//! heuristics.
//!
//! ## Why this crate?
//!
//! Naive page-to-page conversion produces ebooks with no chapters, no
//! reading order for scanned pages, and no way to know how much text was
//! lost along the way. This crate structures the book first — embedded
//! outline if there is one, font heuristics if not, fixed page chunks as a
//! last resort — renders semantic markup, then *reads its own output back*
//! and compares word counts against the source. Attempts that fall short
//! feed a parameter adjuster and the loop tries again, keeping the best
//! attempt it has seen.
//!
//! ## Pipeline Overview
//!
//! ```text
//! layout dump (JSON)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. Layout     classify blocks, font histogram, scan detection
//!  ├─ 3. OCR        recognize scanned pages via injected TextRecognizer
//!  ├─ 4. Structure  3-tier chapter boundaries (outline → headings → chunks)
//!  ├─ 5. Render     semantic XHTML per chapter, escaped, word-counted
//!  ├─ 6. Assemble   EPUB 2 container (zip, OPF, NCX, stylesheet, images)
//!  └─ 7. Validate   read back, word ratio ≥ 0.90 passes; else adjust
//!                   params and loop (≤ 3 attempts, best attempt wins)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2epub::{convert_file, ConversionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .title("My Book")
//!         .language("es")
//!         .build()?;
//!     let output = convert_file("book.layout.json", &config).await?;
//!     std::fs::write("book.epub", &output.artifact)?;
//!     eprintln!(
//!         "word ratio {:?}, {} chapters",
//!         output.report.word_ratio,
//!         output.chapters.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## External collaborators as ports
//!
//! The document parser, the OCR service, and the publication writer are
//! capability traits ([`DocumentSource`], [`TextRecognizer`],
//! [`PublicationWriter`]); the crate ships a JSON layout-dump source and an
//! EPUB 2 writer, and the whole pipeline can run against in-memory fakes in
//! tests. Status/progress reporting is likewise injected via
//! [`StatusReporter`].
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2epub` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2epub = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod epub;
pub mod error;
pub mod job;
pub mod json_source;
pub mod lexicon;
pub mod params;
pub mod pipeline;
pub mod ports;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder};
pub use convert::{
    convert, convert_file, convert_sync, convert_to_file, ChapterSummary, ConversionOutput,
    ConversionStats, LoopOutcome,
};
pub use epub::EpubWriter;
pub use error::{ConvertError, OcrError, PublishError, SourceError};
pub use job::{download_locator, JobRecord, JobStatus, ObjectEvent, TriggerRules};
pub use json_source::JsonDocumentSource;
pub use lexicon::HeadingLexicon;
pub use params::StructuringParams;
pub use pipeline::render::Chapter;
pub use pipeline::structure::DetectionTier;
pub use pipeline::validate::{FailureMode, ValidationReport, PASS_RATIO};
pub use ports::{
    DocumentSource, OutlineEntry, PublicationMetadata, PublicationWriter, RawBlock, RawImage,
    RawSpan, TextRecognizer,
};
pub use progress::{NoopStatusReporter, QualitySummary, StatusReporter};
