//! Report writing.
//!
//! Per-sample TSV reports plus the machine-readable batch summary. Every
//! writer emits its header even when there is nothing to report, so an
//! empty result set still produces well-formed files.

use crate::abundance::{HmrgAbundance, PairAbundance};
use crate::annotate::GeneAnnotation;
use crate::colocalization::ContigGroup;
use crate::export::ExportRecord;
use crate::pipeline::SampleReport;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Execution metadata recorded in the batch summary
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionMetadata {
    /// Command line used
    #[serde(default)]
    pub command_line: String,
    /// Timestamp of execution
    #[serde(default)]
    pub timestamp: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration_secs: f64,
    /// Worker threads used
    #[serde(default)]
    pub threads: usize,
    #[serde(default)]
    pub input_dir: String,
    #[serde(default)]
    pub output_dir: String,
}

/// Batch-level summary written as JSON next to the per-sample reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Version of the tool
    pub version: String,
    #[serde(default)]
    pub metadata: ExecutionMetadata,
    pub total_samples: usize,
    pub analyzed_samples: usize,
    pub skipped_samples: usize,
    pub failed_samples: usize,
    /// Per-sample outcomes, in batch order
    pub samples: Vec<SampleReport>,
}

impl BatchSummary {
    pub fn new(samples: Vec<SampleReport>, metadata: ExecutionMetadata) -> Self {
        let analyzed_samples = samples.iter().filter(|s| s.is_analyzed()).count();
        let skipped_samples = samples.iter().filter(|s| s.is_skipped()).count();
        let failed_samples = samples.iter().filter(|s| s.is_failed()).count();

        BatchSummary {
            version: env!("CARGO_PKG_VERSION").to_string(),
            metadata,
            total_samples: samples.len(),
            analyzed_samples,
            skipped_samples,
            failed_samples,
            samples,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file =
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
        Ok(())
    }
}

fn create_writer(path: &Path) -> Result<BufWriter<File>> {
    let file =
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

fn annotation_columns(annotation: Option<&GeneAnnotation>) -> String {
    match annotation {
        Some(a) => format!("{}\t{:.1}\t{:.2e}\t{:.1}", a.name, a.identity, a.evalue, a.bit_score),
        None => "-\t-\t-\t-".to_string(),
    }
}

/// Write the detailed co-localization report: one row per gene on each
/// qualifying contig.
pub fn write_detailed_report(path: &Path, groups: &[ContigGroup]) -> Result<usize> {
    let mut writer = create_writer(path)?;
    writeln!(
        writer,
        "contig_id\tgene_id\tstart\tend\tstrand\tgene_type\t\
         arg_name\targ_identity\targ_evalue\targ_bitscore\t\
         hmrg_name\thmrg_identity\thmrg_evalue\thmrg_bitscore\thmrg_category"
    )?;

    let mut rows = 0;
    for group in groups {
        for gene in &group.genes {
            let category = gene
                .hmrg
                .as_ref()
                .and_then(|h| h.category.as_deref())
                .unwrap_or("-");
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                group.contig_id,
                gene.gene.gene_id,
                gene.gene.start,
                gene.gene.end,
                gene.gene.strand,
                gene.class(),
                annotation_columns(gene.arg.as_ref()),
                annotation_columns(gene.hmrg.as_ref()),
                category,
            )?;
            rows += 1;
        }
    }
    Ok(rows)
}

/// Write the (ARG, HMRG) pair abundance report, sorted by count descending
pub fn write_pair_abundance(path: &Path, pairs: &[PairAbundance]) -> Result<()> {
    let mut writer = create_writer(path)?;
    writeln!(writer, "arg_name\thmrg_name\tcontig_count")?;
    for pair in pairs {
        writeln!(
            writer,
            "{}\t{}\t{}",
            pair.arg_name, pair.hmrg_name, pair.contig_count
        )?;
    }
    Ok(())
}

/// Write the individual HMRG abundance report, sorted by count descending
pub fn write_hmrg_abundance(path: &Path, table: &[HmrgAbundance]) -> Result<()> {
    let mut writer = create_writer(path)?;
    writeln!(writer, "hmrg_name\tcontig_count")?;
    for row in table {
        writeln!(writer, "{}\t{}", row.hmrg_name, row.contig_count)?;
    }
    Ok(())
}

/// Write a plot table: the five mandatory columns plus the gene_name
/// annotation column
pub fn write_plot_table(path: &Path, records: &[ExportRecord]) -> Result<()> {
    let mut writer = create_writer(path)?;
    writeln!(writer, "id\tsource\tstart\tend\tstrand\tgene_name")?;
    for r in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}",
            r.id, r.source, r.start, r.end, r.strand, r.gene_name
        )?;
    }
    Ok(())
}

/// Write the final externally-formatted table: strictly the five mandatory
/// columns, nothing else
pub fn write_final_table(path: &Path, records: &[ExportRecord]) -> Result<()> {
    let mut writer = create_writer(path)?;
    writeln!(writer, "id\tsource\tstart\tend\tstrand")?;
    for r in records {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            r.id, r.source, r.start, r.end, r.strand
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{AnnotatedGene, GeneAnnotation};
    use crate::colocalization::detect_colocalization;
    use crate::gff::GeneRecord;

    fn annotation(name: &str, category: Option<&str>) -> GeneAnnotation {
        GeneAnnotation {
            name: name.to_string(),
            category: category.map(str::to_string),
            identity: 98.765,
            evalue: 3.2e-45,
            bit_score: 201.4,
            resolved: true,
        }
    }

    fn fixture_groups() -> Vec<ContigGroup> {
        detect_colocalization(vec![
            AnnotatedGene {
                gene: GeneRecord {
                    contig_id: "c1".to_string(),
                    gene_id: "c1_1".to_string(),
                    start: 1,
                    end: 300,
                    strand: '+',
                },
                arg: Some(annotation("tetA", None)),
                hmrg: None,
            },
            AnnotatedGene {
                gene: GeneRecord {
                    contig_id: "c1".to_string(),
                    gene_id: "c1_2".to_string(),
                    start: 310,
                    end: 600,
                    strand: '-',
                },
                arg: None,
                hmrg: Some(annotation("czcA", Some("cadmium/zinc/cobalt"))),
            },
        ])
    }

    #[test]
    fn test_detailed_report_rows_and_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.tsv");
        let rows = write_detailed_report(&path, &fixture_groups()).unwrap();
        assert_eq!(rows, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("contig_id\tgene_id"));
        assert!(lines[1].contains("tetA"));
        assert!(lines[1].contains("3.20e-45"));
        assert!(lines[2].contains("czcA"));
        assert!(lines[2].contains("cadmium/zinc/cobalt"));
    }

    #[test]
    fn test_empty_reports_keep_headers() {
        let dir = tempfile::tempdir().unwrap();

        let details = dir.path().join("details.tsv");
        write_detailed_report(&details, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&details).unwrap().lines().count(),
            1
        );

        let pairs = dir.path().join("pairs.tsv");
        write_pair_abundance(&pairs, &[]).unwrap();
        assert_eq!(
            std::fs::read_to_string(&pairs).unwrap(),
            "arg_name\thmrg_name\tcontig_count\n"
        );
    }

    #[test]
    fn test_final_table_is_strictly_five_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("final.tsv");
        let records = vec![ExportRecord {
            id: "Contig_1".to_string(),
            source: "ARG".to_string(),
            start: 1,
            end: 300,
            strand: '+',
            gene_name: "tetA".to_string(),
        }];
        write_final_table(&path, &records).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        for line in content.lines() {
            assert_eq!(line.split('\t').count(), 5);
        }
        assert!(!content.contains("tetA"));
    }
}
