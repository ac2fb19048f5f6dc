//! Plot-ready table generation.
//!
//! Converts contig groups into the canonical five-column schema expected by
//! external gene-cluster plotters: `id` (contig label), `source` (gene
//! class), `start`, `end`, `strand`, plus a `gene_name` annotation column
//! tolerant plotters can use. The final table rewrites `id` to anonymized
//! sequential labels in rank order so contig names can be shared safely.

use crate::annotate::AnnotatedGene;
use crate::colocalization::ContigGroup;
use crate::scoring::RankedContig;
use serde::{Deserialize, Serialize};

/// One row of a plot table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    /// Contig label (original id, or `Contig_k` after anonymization)
    pub id: String,
    /// Gene class: ARG, HMRG, ARG/HMRG, or other
    pub source: String,
    pub start: usize,
    pub end: usize,
    pub strand: char,
    /// Resolved gene name(s); `-` for unannotated genes
    pub gene_name: String,
}

fn record_for(contig_label: &str, gene: &AnnotatedGene) -> ExportRecord {
    let gene_name = match (&gene.arg, &gene.hmrg) {
        (Some(a), Some(h)) => format!("{} / {}", a.name, h.name),
        (Some(a), None) => a.name.clone(),
        (None, Some(h)) => h.name.clone(),
        (None, None) => "-".to_string(),
    };

    ExportRecord {
        id: contig_label.to_string(),
        source: gene.class().to_string(),
        start: gene.gene.start,
        end: gene.gene.end,
        strand: gene.gene.strand,
        gene_name,
    }
}

/// Plot-ready rows for all qualifying contigs under their original ids.
///
/// Groups arrive ordered by contig id and members by start, so the output
/// is already in (contig, start) order.
pub fn plot_records(groups: &[ContigGroup]) -> Vec<ExportRecord> {
    groups
        .iter()
        .flat_map(|group| {
            group
                .genes
                .iter()
                .map(|gene| record_for(&group.contig_id, gene))
        })
        .collect()
}

/// Plot rows for the ranked contigs, emitted in rank order
pub fn top_records(ranked: &[RankedContig]) -> Vec<ExportRecord> {
    ranked
        .iter()
        .flat_map(|r| {
            r.group
                .genes
                .iter()
                .map(|gene| record_for(&r.group.contig_id, gene))
        })
        .collect()
}

/// Final externally-shareable rows: `id` replaced by `Contig_k` labels
/// assigned in rank order (`Contig_1` = highest-ranked), exact duplicate
/// rows removed.
///
/// The renumbering is a bijection over the ranked contigs and depends only
/// on the ranking, so identical input reproduces identical labels.
pub fn anonymized_records(ranked: &[RankedContig]) -> Vec<ExportRecord> {
    let mut records = Vec::new();

    for (rank, r) in ranked.iter().enumerate() {
        let label = format!("Contig_{}", rank + 1);
        for gene in &r.group.genes {
            let record = record_for(&label, gene);
            // Merged dual genes can still collide when two genes share
            // coordinates; drop exact duplicates only
            if !records.contains(&record) {
                records.push(record);
            }
        }
    }

    records
}
