//! CLI binary for pdf2epub.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2epub::{
    convert_to_file, ConversionConfig, QualitySummary, StatusReporter, StructuringParams,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI status reporter using indicatif ──────────────────────────────────────

/// Terminal status reporter: renders the pipeline's 0–100 progress
/// checkpoints as a live bar.
struct CliStatusReporter {
    bar: ProgressBar,
}

impl CliStatusReporter {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(100);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl StatusReporter for CliStatusReporter {
    fn on_processing(&self, progress: u8) {
        self.bar.set_position(progress as u64);
    }

    fn on_completed(&self, summary: &QualitySummary) {
        self.bar.set_position(100);
        let mark = if summary.passed {
            green("✓")
        } else {
            red("⚠")
        };
        self.bar.println(format!(
            "  {} {} chapters, {} images, word ratio {}",
            mark,
            summary.chapter_count,
            summary.image_count,
            summary
                .word_ratio
                .map(|r| format!("{r:.3}"))
                .unwrap_or_else(|| "n/a".into()),
        ));
        self.bar.finish_and_clear();
    }

    fn on_error(&self, message: &str) {
        self.bar.println(format!("  {} {}", red("✗"), red(message)));
        self.bar.abandon();
    }
}

// ── CLI definition ───────────────────────────────────────────────────────────

/// Convert a page-structured layout dump into a chaptered EPUB.
#[derive(Parser, Debug)]
#[command(name = "pdf2epub", version, about, long_about = None)]
struct Cli {
    /// Layout dump to convert: local JSON file or HTTP(S) URL.
    input: String,

    /// Output EPUB path. Defaults to the input stem with `.epub`.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Publication title.
    #[arg(long)]
    title: Option<String>,

    /// Publication identifier.
    #[arg(long)]
    identifier: Option<String>,

    /// Language code for metadata and heading keywords.
    #[arg(long, default_value = "en", env = "PDF2EPUB_LANGUAGE")]
    language: String,

    /// Attempt budget for the validation loop.
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Initial heading threshold (multiplier of body font size).
    #[arg(long, default_value_t = 1.3)]
    heading_threshold: f32,

    /// Pages per chapter for the fixed-chunk fallback.
    #[arg(long, default_value_t = 15)]
    chunk_size: usize,

    /// Download timeout for URL inputs, in seconds.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Print the validation report and chapter list as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Suppress the progress bar.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let output_path = cli.output.clone().unwrap_or_else(|| default_output(&cli.input));

    let params = StructuringParams::default()
        .with_heading_threshold(cli.heading_threshold)
        .with_chunk_size(cli.chunk_size);

    let mut builder = ConversionConfig::builder()
        .language(cli.language.as_str())
        .params(params)
        .max_attempts(cli.attempts)
        .download_timeout_secs(cli.download_timeout);
    if let Some(title) = &cli.title {
        builder = builder.title(title.as_str());
    } else {
        builder = builder.title(title_from_input(&cli.input));
    }
    if let Some(id) = &cli.identifier {
        builder = builder.identifier(id.as_str());
    }
    if !cli.quiet {
        builder = builder.status_reporter(CliStatusReporter::new());
    }
    let config = builder.build().context("invalid configuration")?;

    let output = convert_to_file(&cli.input, &output_path, &config)
        .await
        .context("conversion failed")?;

    if cli.json {
        let doc = serde_json::json!({
            "report": output.report,
            "chapters": output.chapters,
            "stats": output.stats,
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        let status = if output.report.passed {
            green("passed")
        } else {
            red("best effort")
        };
        println!(
            "{} {} → {}",
            bold("Done:"),
            cli.input,
            output_path.display()
        );
        println!(
            "  {} chapters, {} images, {} attempt(s), validation {}",
            output.report.chapter_count,
            output.report.image_count,
            output.stats.attempts,
            status,
        );
        println!(
            "  {}",
            dim(&format!(
                "tier {:?}, {} source words, {} rendered, {} ms",
                output.stats.tier,
                output.report.source_words,
                output.report.rendered_words,
                output.stats.duration_ms
            ))
        );
    }

    Ok(())
}

/// `book.layout.json` → `book.epub`, URLs → last path segment.
fn default_output(input: &str) -> PathBuf {
    let name = input
        .rsplit('/')
        .next()
        .unwrap_or(input)
        .split('?')
        .next()
        .unwrap_or("book");
    let stem = name
        .trim_end_matches(".json")
        .trim_end_matches(".layout")
        .trim_end_matches(".pdf");
    PathBuf::from(format!("{stem}.epub"))
}

fn title_from_input(input: &str) -> String {
    default_output(input)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Converted Book".into())
}
