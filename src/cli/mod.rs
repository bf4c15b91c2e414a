//! # CLI Module
//!
//! Command-line interface for the perceptual hashing engine.
//!
//! ## Usage
//! ```bash
//! # pHash of one image
//! img-hash hash photo.jpg
//!
//! # Every algorithm, JSON output
//! img-hash hash a.jpg b.png --algorithm all --output json
//!
//! # Compare two images with a 32-bit dHash
//! img-hash compare a.jpg b.jpg --algorithm dhash --bits 32
//!
//! # Finer colour histogram buckets
//! img-hash compare a.jpg b.jpg --algorithm color --bins 16,8,8
//! ```
//!
//! Backend settings come from `--config`, or from
//! `<config dir>/phash-engine/config.json` when that file exists.

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use phash_engine::core::comparator::{self, MatchType};
use phash_engine::core::hasher::{
    BackendConfig, BitSize, ColorQuantization, FileHashes, HashAlgorithmKind, HashStrategy,
    HashValue, HasherConfig, ImagePreparer, PreparedImage,
};
use phash_engine::error::{FingerprintError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// img-hash - perceptual image fingerprints
#[derive(Parser, Debug)]
#[command(name = "img-hash")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Backend configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fingerprint of one or more images
    Hash {
        /// Images to hash
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Hash algorithm to use
        #[arg(short, long, default_value = "perceptual")]
        algorithm: Algorithm,

        /// Hash width in bits (8, 16, 32 or 64)
        #[arg(short, long, default_value = "64")]
        bits: u32,

        /// Colour histogram buckets as HUE,SATURATION,VALUE
        #[arg(long, value_parser = parse_bins)]
        bins: Option<ColorQuantization>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },

    /// Compare two images
    Compare {
        /// First image
        a: PathBuf,

        /// Second image
        b: PathBuf,

        /// Hash algorithm to use
        #[arg(short, long, default_value = "perceptual")]
        algorithm: Algorithm,

        /// Hash width in bits (8, 16, 32 or 64)
        #[arg(short, long, default_value = "64")]
        bits: u32,

        /// Colour histogram buckets as HUE,SATURATION,VALUE
        #[arg(long, value_parser = parse_bins)]
        bins: Option<ColorQuantization>,

        /// Output format
        #[arg(short, long, default_value = "pretty")]
        output: OutputFormat,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Algorithm {
    /// DCT hash - most robust to edits (default)
    Perceptual,
    /// Difference hash - fast, any width
    Dhash,
    /// HSV colour histogram
    Color,
    /// Packed image statistics
    Mashed,
    /// Every algorithm that supports the requested width
    All,
}

impl Algorithm {
    fn kinds(self) -> Vec<HashAlgorithmKind> {
        match self {
            Algorithm::Perceptual => vec![HashAlgorithmKind::Perceptual],
            Algorithm::Dhash => vec![HashAlgorithmKind::Difference],
            Algorithm::Color => vec![HashAlgorithmKind::ColorHistogram],
            Algorithm::Mashed => vec![HashAlgorithmKind::Mashed],
            Algorithm::All => HashAlgorithmKind::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

fn parse_bins(raw: &str) -> std::result::Result<ColorQuantization, String> {
    let parts = raw
        .split(',')
        .map(|part| part.trim().parse::<u32>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    match parts.as_slice() {
        [h, s, v] => ColorQuantization::new(*h, *s, *v).map_err(|e| e.to_string()),
        _ => Err("expected three comma-separated bin counts".to_string()),
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    phash_engine::init_tracing(if cli.verbose { "debug" } else { "warn" });

    let preparer = ImagePreparer::new(load_backend(cli.config.as_deref())?);

    match cli.command {
        Commands::Hash {
            paths,
            algorithm,
            bits,
            bins,
            output,
        } => {
            let (strategies, bits) = build_strategies(algorithm, bits, bins)?;
            run_hash(&preparer, &paths, &strategies, bits, output)
        }
        Commands::Compare {
            a,
            b,
            algorithm,
            bits,
            bins,
            output,
        } => {
            let (strategies, bits) = build_strategies(algorithm, bits, bins)?;
            run_compare(&preparer, &a, &b, &strategies, bits, output)
        }
    }
}

fn load_backend(explicit: Option<&Path>) -> Result<BackendConfig> {
    if let Some(path) = explicit {
        return BackendConfig::from_json_file(path);
    }

    let default_path = dirs::config_dir().map(|dir| dir.join("phash-engine").join("config.json"));
    match default_path {
        Some(path) if path.is_file() => {
            debug!(path = %path.display(), "loading backend config");
            BackendConfig::from_json_file(&path)
        }
        _ => Ok(BackendConfig::default()),
    }
}

/// One strategy per selected algorithm, checked against the width before
/// any file is read. `all` skips algorithms that cannot produce the width;
/// a single algorithm that cannot is an error.
fn build_strategies(
    algorithm: Algorithm,
    bits: u32,
    bins: Option<ColorQuantization>,
) -> Result<(Vec<Box<dyn HashStrategy>>, BitSize)> {
    let size = BitSize::try_from(bits)?;
    let mut strategies = Vec::new();

    for kind in algorithm.kinds() {
        let strategy = HasherConfig::new()
            .algorithm(kind)
            .quantization(bins.unwrap_or_default())
            .build();

        match strategy.ensure_supported(size) {
            Ok(()) => strategies.push(strategy),
            Err(e) if matches!(algorithm, Algorithm::All) => {
                debug!(algorithm = %kind, error = %e, "skipping algorithm");
            }
            Err(e) => return Err(e.into()),
        }
    }

    if strategies.is_empty() {
        return Err(FingerprintError::Config(format!(
            "no algorithm supports {} bits",
            bits
        )));
    }

    Ok((strategies, size))
}

#[derive(Debug, Serialize)]
struct HashRecord {
    algorithm: String,
    bits: u32,
    value: i64,
    hex: String,
}

impl From<&HashValue> for HashRecord {
    fn from(hash: &HashValue) -> Self {
        Self {
            algorithm: hash.algorithm().to_string(),
            bits: hash.bits(),
            value: hash.value(),
            hex: hash.to_hex(),
        }
    }
}

#[derive(Debug, Serialize)]
struct FileReport {
    path: PathBuf,
    hashes: Vec<HashRecord>,
    errors: Vec<String>,
}

impl FileReport {
    fn new(file: FileHashes, strategies: &[&dyn HashStrategy]) -> Self {
        let mut report = FileReport {
            path: file.path,
            hashes: Vec::new(),
            errors: Vec::new(),
        };

        match file.hashes {
            Ok(results) => {
                for (strategy, result) in strategies.iter().zip(results) {
                    match result {
                        Ok(hash) => report.hashes.push(HashRecord::from(&hash)),
                        Err(e) => report.errors.push(format!("{}: {}", strategy.kind(), e)),
                    }
                }
            }
            Err(e) => report.errors.push(e.to_string()),
        }

        report
    }
}

fn run_hash(
    preparer: &ImagePreparer,
    paths: &[PathBuf],
    strategies: &[Box<dyn HashStrategy>],
    bits: BitSize,
    output: OutputFormat,
) -> Result<()> {
    let strategies: Vec<&dyn HashStrategy> = strategies.iter().map(|strategy| &**strategy).collect();
    let term = Term::stderr();

    let progress = if matches!(output, OutputFormat::Pretty) && paths.len() > 1 {
        let pb = ProgressBar::new(paths.len() as u64);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(bar_style.progress_chars("█▓░"));
        }
        Some(pb)
    } else {
        None
    };

    let files = preparer.hash_files_with(&strategies, paths, bits, |path| {
        if let Some(ref pb) = progress {
            pb.set_message(
                path.file_name()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .into_owned(),
            );
            pb.inc(1);
        }
    });

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let reports: Vec<FileReport> = files
        .into_iter()
        .map(|file| FileReport::new(file, &strategies))
        .collect();

    match output {
        OutputFormat::Pretty => print_pretty_hashes(&term, &reports),
        OutputFormat::Json => print_json(&reports),
    }

    Ok(())
}

fn print_pretty_hashes(term: &Term, reports: &[FileReport]) {
    let out = Term::stdout();

    for report in reports {
        out.write_line(&format!("{}", style(report.path.display()).bold()))
            .ok();

        for hash in &report.hashes {
            out.write_line(&format!(
                "  {:<16} {}",
                style(&hash.algorithm).cyan(),
                hash.hex
            ))
            .ok();
        }

        for error in &report.errors {
            term.write_line(&format!("  {} {}", style("✗").red().bold(), error))
                .ok();
        }
    }
}

#[derive(Debug, Serialize)]
struct ComparisonRecord {
    algorithm: String,
    bits: u32,
    hash_a: String,
    hash_b: String,
    distance: u32,
    similarity_percent: f64,
    match_type: MatchType,
}

fn compare_with(
    strategy: &dyn HashStrategy,
    a: &PreparedImage,
    b: &PreparedImage,
    bits: BitSize,
) -> Result<ComparisonRecord> {
    let hash_a = strategy.hash_prepared(a, bits)?;
    let hash_b = strategy.hash_prepared(b, bits)?;
    let distance = strategy.distance(&hash_a, &hash_b)?;

    Ok(ComparisonRecord {
        algorithm: hash_a.algorithm().to_string(),
        bits: hash_a.bits(),
        hash_a: hash_a.to_hex(),
        hash_b: hash_b.to_hex(),
        distance,
        similarity_percent: comparator::similarity(&hash_a, &hash_b)?,
        match_type: MatchType::from_distance(distance, hash_a.bits()),
    })
}

fn run_compare(
    preparer: &ImagePreparer,
    a: &Path,
    b: &Path,
    strategies: &[Box<dyn HashStrategy>],
    bits: BitSize,
    output: OutputFormat,
) -> Result<()> {
    let image_a = preparer.decode_file(a)?;
    let image_b = preparer.decode_file(b)?;

    let records = strategies
        .iter()
        .map(|strategy| compare_with(strategy.as_ref(), &image_a, &image_b, bits))
        .collect::<Result<Vec<_>>>()?;

    match output {
        OutputFormat::Pretty => {
            let term = Term::stdout();
            term.write_line(&format!(
                "{} {} {}",
                style(a.display()).bold(),
                style("vs").dim(),
                style(b.display()).bold()
            ))
            .ok();

            for record in &records {
                let verdict = if record.match_type.is_duplicate() {
                    style(record.match_type.to_string()).green()
                } else {
                    style(record.match_type.to_string()).yellow()
                };
                term.write_line(&format!(
                    "  {:<16} distance {:>2}/{}  {:>5.1}%  {}",
                    style(&record.algorithm).cyan(),
                    record.distance,
                    record.bits,
                    record.similarity_percent,
                    verdict
                ))
                .ok();
            }
        }
        OutputFormat::Json => print_json(&records),
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            Term::stderr()
                .write_line(&format!("cannot serialize output: {}", e))
                .ok();
        }
    }
}
