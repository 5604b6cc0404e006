//! glyphbook - scanned-glyph book pipeline

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use glyphbook::{
    BookBuilder, ChromiumRenderer, DirGlyphStore, GlyphBookError, PageGeometry, RunLogger,
    SelectionStrategy, WordGlyphDir, compose_missing, extract_all_numbers, extract_all_word,
};

#[derive(Parser)]
#[command(name = "glyphbook")]
#[command(version, about = "Build printable books from scanned number glyphs", long_about = None)]
#[command(after_help = "EXAMPLES:
    glyphbook extract --raw-dir data/raw --max 50000
    glyphbook compose --max 50000 --seed 7
    glyphbook build --max 50000 --output-dir output
    glyphbook extract-word the && glyphbook build-word the")]
struct Cli {
    /// Directory of per-number glyph folders
    #[arg(long, default_value = "data/numbers", global = true)]
    numbers_dir: PathBuf,

    /// Write a JSON-lines run log to this path
    #[arg(long, global = true)]
    log: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Crop number glyphs out of scanned books using their hOCR files
    Extract {
        /// Directory of scanned book folders
        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Largest number worth keeping
        #[arg(long, default_value_t = 50_000)]
        max: u64,
    },

    /// Crop every occurrence of one word out of the scanned books
    ExtractWord {
        word: String,

        #[arg(long, default_value = "data/raw")]
        raw_dir: PathBuf,

        /// Directory of per-word glyph folders
        #[arg(long, default_value = "data/words")]
        words_dir: PathBuf,
    },

    /// Composite missing numbers from the glyphs already on disk
    Compose {
        #[arg(long, default_value_t = 50_000)]
        max: u64,

        /// Vary component choice deterministically; omit for first-image picks
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Render and assemble the number book PDF
    Build {
        #[arg(long, default_value_t = 1)]
        start: u64,

        #[arg(long, default_value_t = 50_000)]
        max: u64,

        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        /// Override the output file name inside the output directory
        #[arg(long)]
        output_file: Option<String>,

        /// Chromium-family browser binary used for HTML to PDF
        #[arg(long, default_value = "chromium")]
        browser: PathBuf,

        /// Per-page render timeout in seconds
        #[arg(long, default_value_t = 120)]
        render_timeout: u64,

        /// Render glyphs in grayscale
        #[arg(long)]
        bw: bool,

        /// Embed images as data URIs instead of file:// references
        #[arg(long)]
        inline_images: bool,

        /// JPEG quality for recompressed page images (1-100)
        #[arg(long, default_value_t = 70)]
        quality: u8,

        #[arg(long, default_value_t = 5)]
        columns: usize,

        #[arg(long, default_value_t = 75)]
        column_width: u32,

        #[arg(long, default_value_t = 790)]
        column_height: u32,
    },

    /// Render and assemble a word book PDF
    BuildWord {
        word: String,

        #[arg(long, default_value = "data/words")]
        words_dir: PathBuf,

        #[arg(long, default_value = "output")]
        output_dir: PathBuf,

        #[arg(long)]
        output_file: Option<String>,

        #[arg(long, default_value = "chromium")]
        browser: PathBuf,

        #[arg(long, default_value_t = 120)]
        render_timeout: u64,

        #[arg(long)]
        bw: bool,

        #[arg(long)]
        inline_images: bool,

        #[arg(long, default_value_t = 70)]
        quality: u8,

        #[arg(long, default_value_t = 5)]
        columns: usize,

        #[arg(long, default_value_t = 75)]
        column_width: u32,

        #[arg(long, default_value_t = 790)]
        column_height: u32,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), GlyphBookError> {
    let logger = match &cli.log {
        Some(path) => Some(RunLogger::new(path)?),
        None => None,
    };
    let store = DirGlyphStore::new(&cli.numbers_dir);

    match cli.command {
        Command::Extract { raw_dir, max } => {
            let total = extract_all_numbers(&raw_dir, &store, max, logger.as_ref())?;
            println!("extracted {total} glyphs into {}", cli.numbers_dir.display());
        }
        Command::ExtractWord {
            word,
            raw_dir,
            words_dir,
        } => {
            let out = WordGlyphDir::new(words_dir.join(&word));
            let total = extract_all_word(&raw_dir, &out, &word, logger.as_ref())?;
            println!("extracted {total} occurrences of \"{word}\"");
        }
        Command::Compose { max, seed } => {
            let strategy = match seed {
                Some(seed) => SelectionStrategy::Seeded(seed),
                None => SelectionStrategy::First,
            };
            let summary = compose_missing(&store, max, strategy, logger.as_ref())?;
            println!(
                "composed {} of {} missing numbers ({} impossible, {} failed)",
                summary.composed,
                summary.missing,
                summary.impossible.len(),
                summary.failed.len()
            );
            for target in &summary.impossible {
                println!("  no decomposition for {target}");
            }
            for (target, component) in &summary.failed {
                println!("  {target}: component {component} had no image");
            }
        }
        Command::Build {
            start,
            max,
            output_dir,
            output_file,
            browser,
            render_timeout,
            bw,
            inline_images,
            quality,
            columns,
            column_width,
            column_height,
        } => {
            let renderer = ChromiumRenderer::new(browser)
                .with_timeout(Duration::from_secs(render_timeout));
            let mut builder = BookBuilder::new()
                .start(start)
                .max_number(max)
                .geometry(geometry(columns, column_width, column_height))
                .black_and_white(bw)
                .inline_images(inline_images)
                .pdf_quality(quality)
                .output_dir(output_dir);
            if let Some(file) = output_file {
                builder = builder.output_file(file);
            }
            if let Some(logger) = logger {
                builder = builder.logger(logger);
            }
            let final_pdf = builder.build_numbers(&store, &renderer)?;
            println!("wrote {}", final_pdf.display());
        }
        Command::BuildWord {
            word,
            words_dir,
            output_dir,
            output_file,
            browser,
            render_timeout,
            bw,
            inline_images,
            quality,
            columns,
            column_width,
            column_height,
        } => {
            let words = WordGlyphDir::new(words_dir.join(&word));
            let renderer = ChromiumRenderer::new(browser)
                .with_timeout(Duration::from_secs(render_timeout));
            let mut builder = BookBuilder::new()
                .geometry(geometry(columns, column_width, column_height))
                .black_and_white(bw)
                .inline_images(inline_images)
                .pdf_quality(quality)
                .output_dir(output_dir);
            if let Some(file) = output_file {
                builder = builder.output_file(file);
            }
            if let Some(logger) = logger {
                builder = builder.logger(logger);
            }
            let final_pdf = builder.build_word(&words, &word, &renderer)?;
            println!("wrote {}", final_pdf.display());
        }
    }
    Ok(())
}

fn geometry(columns: usize, column_width: u32, column_height: u32) -> PageGeometry {
    PageGeometry {
        columns,
        column_width_px: column_width,
        target_height_px: column_height,
        ..PageGeometry::default()
    }
}
