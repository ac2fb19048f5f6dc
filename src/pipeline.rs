//! Per-sample analysis pipeline and batch driver.
//!
//! Each sample is a pure function of its three input tables plus the shared
//! read-only annotation maps: load -> resolve -> annotate -> detect ->
//! {aggregate, rank} -> export. Samples run in parallel; one sample's
//! failure never aborts its siblings.

use crate::abundance::{hmrg_abundance, pair_abundance};
use crate::annotate::annotate_genes;
use crate::colocalization::detect_colocalization;
use crate::config::{AnalysisConfig, SampleSpec};
use crate::export::{anonymized_records, plot_records, top_records};
use crate::gff::load_coordinates;
use crate::hits::load_best_hits;
use crate::output;
use crate::resolve::{AnnotationMap, Resolver};
use crate::scoring::rank_contigs;
use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Outcome state of one sample
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SampleStatus {
    /// Reports were written (possibly empty ones)
    Analyzed,
    /// Mandatory input absent or empty; no output for this sample
    Skipped { reason: String },
    /// I/O or parse failure; no output for this sample
    Failed { error: String },
}

/// Per-sample outcome and counters for the batch summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleReport {
    pub name: String,
    pub status: SampleStatus,
    /// Gene records surviving coordinate parsing
    #[serde(default)]
    pub genes: usize,
    #[serde(default)]
    pub malformed_coord_rows: usize,
    /// Genes with an ARG best hit
    #[serde(default)]
    pub arg_genes: usize,
    /// Genes with an HMRG best hit
    #[serde(default)]
    pub hmrg_genes: usize,
    #[serde(default)]
    pub malformed_arg_rows: usize,
    #[serde(default)]
    pub malformed_hmrg_rows: usize,
    /// Annotations that fell back to a raw accession
    #[serde(default)]
    pub unresolved_annotations: usize,
    /// Contigs satisfying the co-location invariant
    #[serde(default)]
    pub colocalized_contigs: usize,
    /// Distinct (ARG, HMRG) pairs observed
    #[serde(default)]
    pub gene_pairs: usize,
    /// Contigs kept in the top-ranked tables
    #[serde(default)]
    pub top_contigs: usize,
}

impl SampleReport {
    fn new(name: &str, status: SampleStatus) -> Self {
        SampleReport {
            name: name.to_string(),
            status,
            genes: 0,
            malformed_coord_rows: 0,
            arg_genes: 0,
            hmrg_genes: 0,
            malformed_arg_rows: 0,
            malformed_hmrg_rows: 0,
            unresolved_annotations: 0,
            colocalized_contigs: 0,
            gene_pairs: 0,
            top_contigs: 0,
        }
    }

    pub fn is_analyzed(&self) -> bool {
        self.status == SampleStatus::Analyzed
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, SampleStatus::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SampleStatus::Failed { .. })
    }
}

/// Shared read-only resolvers, loaded once for the whole batch
#[derive(Debug, Clone)]
pub struct SharedResolvers {
    pub arg: Resolver,
    pub hmrg: Resolver,
}

impl SharedResolvers {
    pub fn load(config: &AnalysisConfig) -> Result<Self> {
        let hmrg_map = AnnotationMap::from_file(&config.hmrg_map)?;
        let arg_map = config
            .arg_map
            .as_ref()
            .map(|path| AnnotationMap::from_file(path))
            .transpose()?;

        Ok(SharedResolvers {
            arg: Resolver::new(config.arg_style, arg_map),
            hmrg: Resolver::new(config.hmrg_style, Some(hmrg_map)),
        })
    }
}

/// Analyze one sample and write its reports.
///
/// Never returns Err: skip and failure states are folded into the returned
/// report so the batch can continue.
pub fn analyze_sample(
    spec: &SampleSpec,
    resolvers: &SharedResolvers,
    config: &AnalysisConfig,
) -> SampleReport {
    match run_sample(spec, resolvers, config) {
        Ok(report) => report,
        Err(e) => {
            warn!("{}: failed: {:#}", spec.name, e);
            SampleReport::new(
                &spec.name,
                SampleStatus::Failed {
                    error: format!("{:#}", e),
                },
            )
        }
    }
}

fn run_sample(
    spec: &SampleSpec,
    resolvers: &SharedResolvers,
    config: &AnalysisConfig,
) -> Result<SampleReport> {
    // The coordinate table is the only mandatory input
    if !spec.coord_path.exists() {
        warn!(
            "{}: coordinate table missing ({}), sample skipped",
            spec.name,
            spec.coord_path.display()
        );
        return Ok(SampleReport::new(
            &spec.name,
            SampleStatus::Skipped {
                reason: "coordinate table missing".to_string(),
            },
        ));
    }

    let coordinates = load_coordinates(&spec.coord_path)?;
    if coordinates.is_empty() {
        warn!("{}: no usable coordinate records, sample skipped", spec.name);
        return Ok(SampleReport::new(
            &spec.name,
            SampleStatus::Skipped {
                reason: "coordinate table empty".to_string(),
            },
        ));
    }

    // A missing hit table is a legitimate zero-hit outcome
    let arg_hits = load_best_hits(&spec.arg_path)?;
    let hmrg_hits = load_best_hits(&spec.hmrg_path)?;

    let annotated = annotate_genes(
        &coordinates.records,
        &arg_hits,
        &hmrg_hits,
        &resolvers.arg,
        &resolvers.hmrg,
    );

    let mut report = SampleReport::new(&spec.name, SampleStatus::Analyzed);
    report.genes = annotated.genes.len();
    report.malformed_coord_rows = coordinates.malformed_rows;
    report.arg_genes = annotated.genes.iter().filter(|g| g.is_arg()).count();
    report.hmrg_genes = annotated.genes.iter().filter(|g| g.is_hmrg()).count();
    report.malformed_arg_rows = arg_hits.malformed_rows;
    report.malformed_hmrg_rows = hmrg_hits.malformed_rows;
    report.unresolved_annotations = annotated.unresolved_arg + annotated.unresolved_hmrg;

    let groups = detect_colocalization(annotated.genes);
    report.colocalized_contigs = groups.len();

    if groups.is_empty() {
        info!("{}: no co-localized contigs", spec.name);
    }

    // Abundance and ranking are independent consumers of the detection output
    let pairs = pair_abundance(&groups);
    let hmrgs = hmrg_abundance(&groups);
    report.gene_pairs = pairs.len();

    let ranked = rank_contigs(&groups, config.score_policy, config.top_n);
    report.top_contigs = ranked.len();

    let out = |suffix: &str| config.output_dir.join(format!("{}{}", spec.name, suffix));

    output::write_detailed_report(&out("_colocalization_details.tsv"), &groups)
        .with_context(|| format!("{}: writing detailed report", spec.name))?;
    output::write_pair_abundance(&out("_pair_abundance.tsv"), &pairs)?;
    output::write_hmrg_abundance(&out("_hmrg_abundance.tsv"), &hmrgs)?;
    output::write_plot_table(&out("_plot_data.tsv"), &plot_records(&groups))?;
    output::write_plot_table(
        &out(&format!("_top{}_plot_data.tsv", config.top_n)),
        &top_records(&ranked),
    )?;
    output::write_final_table(&out("_final_plot_data.tsv"), &anonymized_records(&ranked))?;

    info!(
        "{}: {} genes, {} co-localized contigs, {} pairs, top {} exported",
        spec.name,
        report.genes,
        report.colocalized_contigs,
        report.gene_pairs,
        report.top_contigs
    );

    Ok(report)
}

/// Run the batch across all samples, in parallel, isolating failures.
///
/// Returns one report per spec, in spec order.
pub fn run_batch(specs: &[SampleSpec], config: &AnalysisConfig) -> Result<Vec<SampleReport>> {
    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let resolvers = SharedResolvers::load(config)?;

    let reports: Vec<SampleReport> = specs
        .par_iter()
        .map(|spec| analyze_sample(spec, &resolvers, config))
        .collect();

    Ok(reports)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::AccessionStyle;
    use crate::scoring::ScorePolicy;
    use std::fs::File;
    use std::io::Write;
    use std::path::Path;

    fn write_file(path: &Path, content: &str) {
        let mut f = File::create(path).unwrap();
        write!(f, "{}", content).unwrap();
    }

    fn setup(dir: &Path) -> (AnalysisConfig, SharedResolvers) {
        let map_path = dir.join("hmrg_map.tsv");
        write_file(
            &map_path,
            "accession\tgene_name\tcategory\nQ5FAM9\tczcA\tcadmium/zinc/cobalt\n",
        );

        let config = AnalysisConfig {
            input_dir: dir.to_path_buf(),
            output_dir: dir.join("out"),
            hmrg_map: map_path,
            arg_map: None,
            coord_suffix: "_predicted_genes.gff".to_string(),
            arg_suffix: "_card_hits.m8".to_string(),
            hmrg_suffix: "_bacmet_hits.tsv".to_string(),
            arg_style: AccessionStyle::PipeLast,
            hmrg_style: AccessionStyle::NcbiPipe,
            score_policy: ScorePolicy::DensityRatio,
            top_n: 10,
        };
        std::fs::create_dir_all(&config.output_dir).unwrap();
        let resolvers = SharedResolvers::load(&config).unwrap();
        (config, resolvers)
    }

    fn spec_for(dir: &Path, name: &str) -> SampleSpec {
        SampleSpec {
            name: name.to_string(),
            coord_path: dir.join(format!("{}_predicted_genes.gff", name)),
            arg_path: dir.join(format!("{}_card_hits.m8", name)),
            hmrg_path: dir.join(format!("{}_bacmet_hits.tsv", name)),
        }
    }

    fn gff_row(contig: &str, start: usize, end: usize, ordinal: usize) -> String {
        format!(
            "{}\tProdigal\tCDS\t{}\t{}\t1.0\t+\t0\tID=1_{};partial=00\n",
            contig, start, end, ordinal
        )
    }

    fn hit_row(query: &str, subject: &str) -> String {
        format!(
            "{}\t{}\t99.0\t250\t1\t0\t1\t250\t1\t250\t1e-40\t180.0\n",
            query, subject
        )
    }

    #[test]
    fn test_sample_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let (config, resolvers) = setup(dir.path());

        // contig_1 carries one ARG gene and one HMRG gene
        write_file(
            &dir.path().join("S1_predicted_genes.gff"),
            &format!(
                "{}{}",
                gff_row("contig_1", 1, 300, 1),
                gff_row("contig_1", 310, 600, 2)
            ),
        );
        write_file(
            &dir.path().join("S1_card_hits.m8"),
            &hit_row("contig_1_1", "gb|X|ARO:3000165|tetA"),
        );
        write_file(
            &dir.path().join("S1_bacmet_hits.tsv"),
            &hit_row("contig_1_2", "BAC0001|czcA|sp|Q5FAM9|CZCA_TAG"),
        );

        let report = analyze_sample(&spec_for(dir.path(), "S1"), &resolvers, &config);
        assert!(report.is_analyzed());
        assert_eq!(report.genes, 2);
        assert_eq!(report.colocalized_contigs, 1);
        assert_eq!(report.gene_pairs, 1);
        assert_eq!(report.top_contigs, 1);

        let pairs = std::fs::read_to_string(config.output_dir.join("S1_pair_abundance.tsv")).unwrap();
        assert!(pairs.contains("tetA\tczcA\t1"));

        let hmrgs = std::fs::read_to_string(config.output_dir.join("S1_hmrg_abundance.tsv")).unwrap();
        assert!(hmrgs.contains("czcA\t1"));

        let final_table =
            std::fs::read_to_string(config.output_dir.join("S1_final_plot_data.tsv")).unwrap();
        let rows: Vec<&str> = final_table.lines().skip(1).collect();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.starts_with("Contig_1\t")));
        assert!(rows[0].contains("\tARG\t"));
        assert!(rows[1].contains("\tHMRG\t"));
    }

    #[test]
    fn test_missing_coordinates_skips_sample() {
        let dir = tempfile::tempdir().unwrap();
        let (config, resolvers) = setup(dir.path());

        let report = analyze_sample(&spec_for(dir.path(), "missing"), &resolvers, &config);
        assert!(report.is_skipped());
        assert!(!config
            .output_dir
            .join("missing_pair_abundance.tsv")
            .exists());
    }

    #[test]
    fn test_missing_hit_tables_still_analyzed() {
        let dir = tempfile::tempdir().unwrap();
        let (config, resolvers) = setup(dir.path());

        write_file(
            &dir.path().join("S2_predicted_genes.gff"),
            &gff_row("contig_1", 1, 300, 1),
        );

        let report = analyze_sample(&spec_for(dir.path(), "S2"), &resolvers, &config);
        assert!(report.is_analyzed());
        assert_eq!(report.colocalized_contigs, 0);

        // Empty result set still produces a well-formed (header-only) report
        let details =
            std::fs::read_to_string(config.output_dir.join("S2_colocalization_details.tsv"))
                .unwrap();
        assert_eq!(details.lines().count(), 1);
    }

    #[test]
    fn test_batch_continues_past_unusable_samples() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = setup(dir.path());

        // S1 is complete; S3 has no inputs at all
        write_file(
            &dir.path().join("S1_predicted_genes.gff"),
            &format!(
                "{}{}",
                gff_row("contig_1", 1, 300, 1),
                gff_row("contig_1", 310, 600, 2)
            ),
        );
        write_file(
            &dir.path().join("S1_card_hits.m8"),
            &hit_row("contig_1_1", "gb|X|ARO:3000165|tetA"),
        );
        write_file(
            &dir.path().join("S1_bacmet_hits.tsv"),
            &hit_row("contig_1_2", "BAC0001|czcA|sp|Q5FAM9|CZCA_TAG"),
        );

        let specs = vec![spec_for(dir.path(), "S1"), spec_for(dir.path(), "S3")];
        let reports = run_batch(&specs, &config).unwrap();

        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_analyzed());
        assert!(reports[1].is_skipped());
    }
}
