//! coselect: ARG/HMRG co-localization analysis for metagenomic assemblies
//!
//! Joins per-sample gene coordinates with ARG and HMRG alignment hits,
//! flags contigs carrying both resistance types, computes pair and HMRG
//! abundance tables, ranks contigs by annotation density, and exports
//! anonymized plot-ready tables for external gene-cluster visualization.

use anyhow::Result;
use clap::Parser;
use log::info;
use std::path::PathBuf;

mod abundance;
mod annotate;
mod colocalization;
mod config;
mod export;
mod gff;
mod hits;
mod output;
mod pipeline;
mod reader;
mod resolve;
mod scoring;

use crate::config::{collect_samples, AnalysisConfig};
use crate::output::{BatchSummary, ExecutionMetadata};
use crate::pipeline::run_batch;
use crate::resolve::AccessionStyle;
use crate::scoring::ScorePolicy;

/// Detect ARG/HMRG co-localization on metagenomic contigs
#[derive(Parser, Debug)]
#[command(name = "coselect")]
#[command(version)]
#[command(about = "Detect ARG/HMRG co-localization and rank co-selection hotspots")]
struct Args {
    /// YAML configuration file (alternative to the individual flags below)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory containing per-sample coordinate and hit tables
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Output directory for reports
    #[arg(short, long, default_value = "colocalization_results")]
    output: PathBuf,

    /// HMRG accession -> gene name map (TSV with header)
    #[arg(long)]
    hmrg_map: Option<PathBuf>,

    /// Optional ARG accession -> gene name map
    #[arg(long)]
    arg_map: Option<PathBuf>,

    /// Analyze only these samples (default: discover from the input dir)
    #[arg(short, long, num_args = 1..)]
    samples: Option<Vec<String>>,

    /// Coordinate table suffix
    #[arg(long, default_value = "_predicted_genes.gff")]
    coord_suffix: String,

    /// ARG hit table suffix
    #[arg(long, default_value = "_card_hits.m8")]
    arg_suffix: String,

    /// HMRG hit table suffix
    #[arg(long, default_value = "_bacmet_hits.tsv")]
    hmrg_suffix: String,

    /// Accession extraction style for ARG subject ids
    #[arg(long, value_enum, default_value_t = AccessionStyle::PipeLast)]
    arg_style: AccessionStyle,

    /// Accession extraction style for HMRG subject ids
    #[arg(long, value_enum, default_value_t = AccessionStyle::NcbiPipe)]
    hmrg_style: AccessionStyle,

    /// Density-score formula for contig ranking
    #[arg(long, value_enum, default_value_t = ScorePolicy::DensityRatio)]
    score_policy: ScorePolicy,

    /// Number of top-ranked contigs to export
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Number of threads for parallel sample processing
    #[arg(short, long, default_value_t = num_cpus::get())]
    threads: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Build the analysis configuration from the YAML file or from flags
    fn into_config(self) -> Result<(AnalysisConfig, Option<Vec<String>>, usize)> {
        let samples = self.samples.clone();
        let threads = self.threads;

        let config = if let Some(config_path) = &self.config {
            AnalysisConfig::from_yaml(config_path)?
        } else {
            let input_dir = self
                .input
                .ok_or_else(|| anyhow::anyhow!("Either --config or --input must be specified"))?;
            let hmrg_map = self.hmrg_map.ok_or_else(|| {
                anyhow::anyhow!("--hmrg-map is required (or provide it via --config)")
            })?;

            let config = AnalysisConfig {
                input_dir,
                output_dir: self.output,
                hmrg_map,
                arg_map: self.arg_map,
                coord_suffix: self.coord_suffix,
                arg_suffix: self.arg_suffix,
                hmrg_suffix: self.hmrg_suffix,
                arg_style: self.arg_style,
                hmrg_style: self.hmrg_style,
                score_policy: self.score_policy,
                top_n: self.top_n,
            };
            config.validate()?;
            config
        };

        Ok((config, samples, threads))
    }
}

fn main() -> Result<()> {
    let start_time = std::time::Instant::now();
    let command_line = std::env::args().collect::<Vec<_>>().join(" ");
    let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();

    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let (config, samples, threads) = args.into_config()?;

    // Set thread pool size
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()?;

    info!("coselect v{}", env!("CARGO_PKG_VERSION"));
    info!("Using {} threads", threads);

    let specs = collect_samples(&config, samples.as_deref())?;
    info!(
        "Analyzing {} samples from {}",
        specs.len(),
        config.input_dir.display()
    );

    let reports = run_batch(&specs, &config)?;

    let metadata = ExecutionMetadata {
        command_line,
        timestamp,
        duration_secs: start_time.elapsed().as_secs_f64(),
        threads,
        input_dir: config.input_dir.display().to_string(),
        output_dir: config.output_dir.display().to_string(),
    };
    let summary = BatchSummary::new(reports, metadata);

    let summary_path = config.output_dir.join("summary.json");
    summary.save(&summary_path)?;
    info!("Batch summary written to: {}", summary_path.display());

    info!(
        "Done: {}/{} samples analyzed, {} skipped, {} failed",
        summary.analyzed_samples, summary.total_samples, summary.skipped_samples,
        summary.failed_samples
    );

    Ok(())
}
