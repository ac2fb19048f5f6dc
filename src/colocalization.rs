//! Co-localization detection.
//!
//! Groups annotated genes by contig and keeps the contigs carrying at least
//! one ARG-annotated and one HMRG-annotated gene. A dual-annotated gene
//! satisfies both requirements on its own.

use crate::annotate::AnnotatedGene;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// All genes of one contig, with annotation tallies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContigGroup {
    pub contig_id: String,
    /// Member genes ordered by start, then gene id
    pub genes: Vec<AnnotatedGene>,
    /// Genes carrying an ARG annotation (dual genes included)
    pub arg_genes: usize,
    /// Genes carrying an HMRG annotation (dual genes included)
    pub hmrg_genes: usize,
    /// Genes carrying any annotation (dual genes counted once)
    pub annotated_genes: usize,
    /// All predicted genes on the contig
    pub total_genes: usize,
}

impl ContigGroup {
    fn from_genes(contig_id: String, mut genes: Vec<AnnotatedGene>) -> Self {
        genes.sort_by(|a, b| {
            a.gene
                .start
                .cmp(&b.gene.start)
                .then_with(|| a.gene.gene_id.cmp(&b.gene.gene_id))
        });

        let arg_genes = genes.iter().filter(|g| g.is_arg()).count();
        let hmrg_genes = genes.iter().filter(|g| g.is_hmrg()).count();
        let annotated_genes = genes.iter().filter(|g| g.is_annotated()).count();
        let total_genes = genes.len();

        ContigGroup {
            contig_id,
            genes,
            arg_genes,
            hmrg_genes,
            annotated_genes,
            total_genes,
        }
    }

    /// The co-location invariant: >= 1 ARG gene and >= 1 HMRG gene
    pub fn is_colocalized(&self) -> bool {
        self.arg_genes >= 1 && self.hmrg_genes >= 1
    }
}

/// Group genes by contig and keep the co-localized groups, ordered by
/// contig id.
///
/// Contigs with only ARGs, only HMRGs, or no annotations at all are an
/// expected outcome and are silently dropped.
pub fn detect_colocalization(genes: Vec<AnnotatedGene>) -> Vec<ContigGroup> {
    let mut by_contig: BTreeMap<String, Vec<AnnotatedGene>> = BTreeMap::new();
    for gene in genes {
        by_contig
            .entry(gene.gene.contig_id.clone())
            .or_default()
            .push(gene);
    }

    by_contig
        .into_iter()
        .map(|(contig_id, genes)| ContigGroup::from_genes(contig_id, genes))
        .filter(ContigGroup::is_colocalized)
        .collect()
}
