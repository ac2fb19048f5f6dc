//! Contig density scoring and top-N selection.

use crate::colocalization::ContigGroup;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Density-score formula applied to each co-localized contig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Distinct annotated genes (dual counted once) over total predicted
    /// genes on the contig
    #[default]
    DensityRatio,
    /// ARG-annotated gene count times HMRG-annotated gene count (the
    /// formula used by earlier analyses of this data)
    PairProduct,
}

impl ScorePolicy {
    pub fn score(&self, group: &ContigGroup) -> f64 {
        match self {
            ScorePolicy::DensityRatio => {
                if group.total_genes == 0 {
                    0.0
                } else {
                    group.annotated_genes as f64 / group.total_genes as f64
                }
            }
            ScorePolicy::PairProduct => (group.arg_genes * group.hmrg_genes) as f64,
        }
    }
}

/// A contig with its density score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedContig {
    pub score: f64,
    #[serde(flatten)]
    pub group: ContigGroup,
}

/// Total order for ranking: score descending, then raw annotated-gene count
/// descending, then contig id ascending.
fn compare_ranked(a: &RankedContig, b: &RankedContig) -> Ordering {
    b.score
        .partial_cmp(&a.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| b.group.annotated_genes.cmp(&a.group.annotated_genes))
        .then_with(|| a.group.contig_id.cmp(&b.group.contig_id))
}

/// Score and rank contigs, keeping the top N.
///
/// Fewer than N qualifying contigs is not an error; all are returned.
pub fn rank_contigs(groups: &[ContigGroup], policy: ScorePolicy, top_n: usize) -> Vec<RankedContig> {
    let mut ranked: Vec<RankedContig> = groups
        .iter()
        .map(|group| RankedContig {
            score: policy.score(group),
            group: group.clone(),
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked.truncate(top_n);
    ranked
}
