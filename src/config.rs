//! Analysis configuration and sample discovery.
//!
//! All knobs live in one `AnalysisConfig` value, built from CLI flags or a
//! YAML file and passed by value into the per-sample pipeline. There is no
//! process-wide mutable configuration.

use crate::resolve::AccessionStyle;
use crate::scoring::ScorePolicy;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for one batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Directory holding per-sample coordinate and hit tables
    pub input_dir: PathBuf,

    /// Directory for per-sample reports and the batch summary
    pub output_dir: PathBuf,

    /// HMRG accession -> gene name translation map
    pub hmrg_map: PathBuf,

    /// Optional ARG translation map (CARD subject ids already carry names)
    #[serde(default)]
    pub arg_map: Option<PathBuf>,

    /// Coordinate table suffix
    #[serde(default = "default_coord_suffix")]
    pub coord_suffix: String,

    /// ARG hit table suffix
    #[serde(default = "default_arg_suffix")]
    pub arg_suffix: String,

    /// HMRG hit table suffix
    #[serde(default = "default_hmrg_suffix")]
    pub hmrg_suffix: String,

    /// Accession extraction style for ARG subject ids
    #[serde(default = "default_arg_style")]
    pub arg_style: AccessionStyle,

    /// Accession extraction style for HMRG subject ids
    #[serde(default = "default_hmrg_style")]
    pub hmrg_style: AccessionStyle,

    /// Density-score formula
    #[serde(default)]
    pub score_policy: ScorePolicy,

    /// Contigs to keep in the top-ranked plot tables
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_coord_suffix() -> String {
    "_predicted_genes.gff".to_string()
}

fn default_arg_suffix() -> String {
    "_card_hits.m8".to_string()
}

fn default_hmrg_suffix() -> String {
    "_bacmet_hits.tsv".to_string()
}

fn default_arg_style() -> AccessionStyle {
    AccessionStyle::PipeLast
}

fn default_hmrg_style() -> AccessionStyle {
    AccessionStyle::NcbiPipe
}

fn default_top_n() -> usize {
    10
}

impl AnalysisConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AnalysisConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.input_dir.is_dir() {
            bail!("Input directory not found: {}", self.input_dir.display());
        }
        if !self.hmrg_map.is_file() {
            bail!("HMRG annotation map not found: {}", self.hmrg_map.display());
        }
        if let Some(arg_map) = &self.arg_map {
            if !arg_map.is_file() {
                bail!("ARG annotation map not found: {}", arg_map.display());
            }
        }
        if self.top_n == 0 {
            bail!("--top-n must be at least 1");
        }
        if self.coord_suffix.is_empty() || self.arg_suffix.is_empty() || self.hmrg_suffix.is_empty()
        {
            bail!("Input file suffixes must not be empty");
        }
        Ok(())
    }
}

/// The three input paths of one sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSpec {
    pub name: String,
    /// Gene coordinate table (mandatory; absent/empty -> sample skipped)
    pub coord_path: PathBuf,
    /// ARG hit table (absent -> zero ARG hits)
    pub arg_path: PathBuf,
    /// HMRG hit table (absent -> zero HMRG hits)
    pub hmrg_path: PathBuf,
}

impl SampleSpec {
    fn for_sample(name: &str, config: &AnalysisConfig) -> Self {
        SampleSpec {
            name: name.to_string(),
            coord_path: config
                .input_dir
                .join(format!("{}{}", name, config.coord_suffix)),
            arg_path: config
                .input_dir
                .join(format!("{}{}", name, config.arg_suffix)),
            hmrg_path: config
                .input_dir
                .join(format!("{}{}", name, config.hmrg_suffix)),
        }
    }
}

/// Build sample specs for an explicit name list, or discover samples by
/// scanning the input directory for ARG hit tables.
///
/// Names are sorted so batch order (and the summary) is reproducible.
pub fn collect_samples(
    config: &AnalysisConfig,
    explicit: Option<&[String]>,
) -> Result<Vec<SampleSpec>> {
    let mut names: Vec<String> = match explicit {
        Some(list) if !list.is_empty() => list.to_vec(),
        _ => discover_sample_names(&config.input_dir, &config.arg_suffix)?,
    };

    names.sort();
    names.dedup();

    if names.is_empty() {
        bail!(
            "No samples found in {} (looked for *{})",
            config.input_dir.display(),
            config.arg_suffix
        );
    }

    Ok(names
        .iter()
        .map(|name| SampleSpec::for_sample(name, config))
        .collect())
}

fn discover_sample_names(input_dir: &Path, arg_suffix: &str) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(input_dir)
        .with_context(|| format!("Failed to read input directory: {}", input_dir.display()))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if let Some(file_name) = entry.file_name().to_str() {
            if let Some(stem) = file_name.strip_suffix(arg_suffix) {
                if !stem.is_empty() {
                    names.push(stem.to_string());
                }
            }
        }
    }
    Ok(names)
}
