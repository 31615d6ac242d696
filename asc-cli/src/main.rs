//! ASC log decoder CLI application.
//!
//! Decodes eye-tracker ASC logs into per-record-kind tables.

use anyhow::{Context, Result};
use asc_core::{AscDecoder, DecodeResult, DecodeStats, DecoderConfig};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

mod output;
mod preview;

use output::OutputFormat;

/// Eye-tracker ASC log decoder.
///
/// Decodes samples, fixations, saccades, blinks and messages from one or
/// more .asc files into CSV or JSON tables.
#[derive(Parser, Debug)]
#[command(name = "asc-decode")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input .asc file path(s)
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output directory for decoded tables
    ///
    /// Each input writes `<stem>_samples.csv`, `<stem>_fixations.csv`,
    /// `<stem>_saccades.csv`, `<stem>_blinks.csv` and `<stem>_messages.csv`
    /// (or `<stem>.json`). Without this option nothing is written.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Output format: csv or json
    #[arg(short, long, default_value = "csv")]
    format: String,

    /// Print the first N records of each table
    #[arg(short, long, value_name = "N")]
    preview: Option<usize>,

    /// Number of files to decode in parallel (default: one per core)
    #[arg(short, long, value_name = "N")]
    jobs: Option<usize>,

    /// Exit with an error if any malformed line was dropped
    #[arg(long)]
    strict: bool,

    /// Maximum number of malformed lines reported per file
    #[arg(long, value_name = "COUNT", default_value_t = asc_core::config::DEFAULT_MAX_DIAGNOSTICS)]
    max_diagnostics: usize,

    /// Log every sample with missing gaze coordinates
    #[arg(long)]
    warn_missing_gaze: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let format =
        OutputFormat::from_str(&args.format).context("Invalid output format. Use csv or json")?;

    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure decoder thread pool")?;
    }

    let config = DecoderConfig::new()
        .with_max_diagnostics(args.max_diagnostics)
        .with_missing_gaze_warnings(args.warn_missing_gaze);

    // Setup progress bar
    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        pb
    };
    progress.set_message(format!("Decoding {} file(s)...", args.inputs.len()));

    let start_time = Instant::now();

    let options = FileOptions {
        output: args.output.as_deref(),
        format,
        preview: args.preview,
    };

    // Separate decoder per file; tables are written and dropped on the worker,
    // only the reports come back, in input order
    let reports: Vec<(&PathBuf, Result<FileReport>)> = args
        .inputs
        .par_iter()
        .map(|path| (path, process_file(path, &config, &options)))
        .collect();

    let decode_duration = start_time.elapsed();
    progress.finish_and_clear();

    let mut failed = 0;
    let mut malformed = 0;

    for (path, outcome) in reports {
        let report = match outcome {
            Ok(report) => report,
            Err(e) => {
                log::error!("{:?}: {:#}", path, e);
                failed += 1;
                continue;
            }
        };
        malformed += report.stats.total_malformed();

        for file in &report.written {
            log::info!("Wrote {:?}", file);
        }

        if let Some(preview) = &report.preview {
            print!("{}", preview);
        }

        if !args.quiet {
            eprint!("{}", report.summary);
        }
    }

    if !args.quiet {
        eprintln!(
            "Decoded {} of {} file(s) in {:.3}s",
            args.inputs.len() - failed,
            args.inputs.len(),
            decode_duration.as_secs_f64()
        );
    }

    if failed > 0 {
        anyhow::bail!("Failed to decode {} of {} file(s)", failed, args.inputs.len());
    }
    if args.strict && malformed > 0 {
        anyhow::bail!("Dropped {} malformed line(s) (--strict)", malformed);
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();
}

/// Per-file settings shared by every worker.
struct FileOptions<'a> {
    output: Option<&'a Path>,
    format: OutputFormat,
    preview: Option<usize>,
}

/// What is left of one input once its tables have been written.
struct FileReport {
    stats: DecodeStats,
    written: Vec<PathBuf>,
    preview: Option<String>,
    summary: String,
}

/// Decodes one file, writes its tables and renders its preview and summary.
///
/// The decoded tables are dropped before returning.
fn process_file(
    path: &Path,
    config: &DecoderConfig,
    options: &FileOptions<'_>,
) -> Result<FileReport> {
    let mut decoder = AscDecoder::with_config(config.clone());
    let result = decoder.decode_file(path)?;

    let written = match options.output {
        Some(dir) => output::write_result(dir, &file_stem(path), &result, options.format)
            .with_context(|| format!("Failed to write output for {:?}", path))?,
        None => Vec::new(),
    };

    let preview = match options.preview {
        Some(rows) => {
            let mut buf = Vec::new();
            preview::print_preview(&mut buf, &result, rows).context("Failed to render preview")?;
            Some(String::from_utf8_lossy(&buf).into_owned())
        }
        None => None,
    };

    Ok(FileReport {
        summary: render_summary(path, &result),
        stats: result.stats,
        written,
        preview,
    })
}

/// File name without extension, used to name output tables.
fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "decoded".to_string())
}

fn render_summary(path: &Path, result: &DecodeResult) -> String {
    // Writing into a String cannot fail
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary: {:?}", path);
    let _ = writeln!(out, "  Lines:        {}", result.stats.lines);
    let _ = writeln!(
        out,
        "  Samples:      {} ({} missing gaze)",
        result.samples.len(),
        result.stats.missing_gaze
    );
    let _ = writeln!(out, "  Fixations:    {}", result.fixations.len());
    let _ = writeln!(out, "  Saccades:     {}", result.saccades.len());
    let _ = writeln!(out, "  Blinks:       {}", result.blinks.len());
    let _ = writeln!(out, "  Messages:     {}", result.messages.len());
    let _ = writeln!(out, "  Ignored:      {}", result.stats.unrecognized);

    let dropped = result.stats.total_malformed();
    if dropped > 0 {
        let by_kind: Vec<String> = result
            .stats
            .malformed_counts()
            .filter(|&(_, count)| count > 0)
            .map(|(kind, count)| format!("{} {}", count, kind))
            .collect();
        let _ = writeln!(out, "  Malformed:    {} ({})", dropped, by_kind.join(", "));
        for diag in &result.diagnostics {
            let _ = writeln!(out, "    line {}: {}", diag.line_number, diag.error);
        }
    }
    out
}
