//! Per-sample abundance statistics over co-localized contigs.
//!
//! Both tables count contigs, never genes: a pair (or an HMRG) present many
//! times on one contig still contributes a single increment for that contig.

use crate::colocalization::ContigGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::BTreeSet;

/// Co-occurrence count for one (ARG, HMRG) name pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairAbundance {
    pub arg_name: String,
    pub hmrg_name: String,
    /// Number of distinct contigs where the pair co-occurs
    pub contig_count: usize,
}

/// Contig count for one HMRG, independent of pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HmrgAbundance {
    pub hmrg_name: String,
    /// Number of co-localized contigs carrying the gene
    pub contig_count: usize,
}

/// Distinct ARG and HMRG display names on one contig
fn names_on_contig(group: &ContigGroup) -> (BTreeSet<&str>, BTreeSet<&str>) {
    let mut args = BTreeSet::new();
    let mut hmrgs = BTreeSet::new();
    for gene in &group.genes {
        if let Some(a) = &gene.arg {
            args.insert(a.name.as_str());
        }
        if let Some(h) = &gene.hmrg {
            hmrgs.insert(h.name.as_str());
        }
    }
    (args, hmrgs)
}

/// Count distinct (ARG, HMRG) pairs, one increment per contig per pair.
///
/// Sorted by count descending, then lexicographically on the pair.
pub fn pair_abundance(groups: &[ContigGroup]) -> Vec<PairAbundance> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();

    for group in groups {
        let (args, hmrgs) = names_on_contig(group);
        for arg in &args {
            for hmrg in &hmrgs {
                *counts
                    .entry((arg.to_string(), hmrg.to_string()))
                    .or_insert(0) += 1;
            }
        }
    }

    let mut table: Vec<PairAbundance> = counts
        .into_iter()
        .map(|((arg_name, hmrg_name), contig_count)| PairAbundance {
            arg_name,
            hmrg_name,
            contig_count,
        })
        .collect();

    table.sort_by(|a, b| {
        b.contig_count
            .cmp(&a.contig_count)
            .then_with(|| a.arg_name.cmp(&b.arg_name))
            .then_with(|| a.hmrg_name.cmp(&b.hmrg_name))
    });
    table
}

/// Count co-localized contigs per HMRG name.
///
/// Computed from the contig groups directly, not by summing the pair table:
/// one HMRG paired with several ARGs on a contig still counts once.
pub fn hmrg_abundance(groups: &[ContigGroup]) -> Vec<HmrgAbundance> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for group in groups {
        let (_, hmrgs) = names_on_contig(group);
        for hmrg in &hmrgs {
            *counts.entry(hmrg.to_string()).or_insert(0) += 1;
        }
    }

    let mut table: Vec<HmrgAbundance> = counts
        .into_iter()
        .map(|(hmrg_name, contig_count)| HmrgAbundance {
            hmrg_name,
            contig_count,
        })
        .collect();

    table.sort_by(|a, b| {
        b.contig_count
            .cmp(&a.contig_count)
            .then_with(|| a.hmrg_name.cmp(&b.hmrg_name))
    });
    table
}
