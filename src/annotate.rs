//! Joining gene coordinates with resolved ARG/HMRG annotations.
//!
//! Every gene record becomes exactly one `AnnotatedGene`; a gene hitting both
//! databases carries both annotations on that single record and is never
//! duplicated downstream.

use crate::gff::GeneRecord;
use crate::hits::{AlignmentHit, BestHits};
use crate::resolve::Resolver;
use serde::{Deserialize, Serialize};

/// A resolved annotation from one database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneAnnotation {
    /// Standardized display name
    pub name: String,
    /// Resistance category, when the annotation map provides one
    pub category: Option<String>,
    /// Percent identity of the winning alignment
    pub identity: f64,
    /// E-value of the winning alignment
    pub evalue: f64,
    /// Bit score of the winning alignment
    pub bit_score: f64,
    /// False when the accession missed the map and was used as-is
    pub resolved: bool,
}

impl GeneAnnotation {
    fn from_hit(hit: &AlignmentHit, resolver: &Resolver) -> Self {
        let resolution = resolver.resolve(&hit.target_id);
        GeneAnnotation {
            name: resolution.name,
            category: resolution.category,
            identity: hit.identity,
            evalue: hit.evalue,
            bit_score: hit.bit_score,
            resolved: resolution.resolved,
        }
    }
}

/// Categorical label for a gene's annotation state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeneClass {
    Arg,
    Hmrg,
    /// Matched both databases (merged into one record)
    Dual,
    Other,
}

impl std::fmt::Display for GeneClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeneClass::Arg => write!(f, "ARG"),
            GeneClass::Hmrg => write!(f, "HMRG"),
            GeneClass::Dual => write!(f, "ARG/HMRG"),
            GeneClass::Other => write!(f, "other"),
        }
    }
}

/// A gene record plus whatever annotations its best hits produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotatedGene {
    #[serde(flatten)]
    pub gene: GeneRecord,
    pub arg: Option<GeneAnnotation>,
    pub hmrg: Option<GeneAnnotation>,
}

impl AnnotatedGene {
    pub fn class(&self) -> GeneClass {
        match (&self.arg, &self.hmrg) {
            (Some(_), Some(_)) => GeneClass::Dual,
            (Some(_), None) => GeneClass::Arg,
            (None, Some(_)) => GeneClass::Hmrg,
            (None, None) => GeneClass::Other,
        }
    }

    pub fn is_arg(&self) -> bool {
        self.arg.is_some()
    }

    pub fn is_hmrg(&self) -> bool {
        self.hmrg.is_some()
    }

    pub fn is_annotated(&self) -> bool {
        self.arg.is_some() || self.hmrg.is_some()
    }
}

/// Annotation output for one sample
#[derive(Debug, Clone, Default)]
pub struct AnnotationResult {
    /// One entry per input gene record, input order preserved
    pub genes: Vec<AnnotatedGene>,
    /// ARG accessions that missed the map
    pub unresolved_arg: usize,
    /// HMRG accessions that missed the map
    pub unresolved_hmrg: usize,
}

/// Attach resolved ARG and HMRG best hits to each gene record.
///
/// Pure transformation: no gene is dropped, none is duplicated.
pub fn annotate_genes(
    records: &[GeneRecord],
    arg_hits: &BestHits,
    hmrg_hits: &BestHits,
    arg_resolver: &Resolver,
    hmrg_resolver: &Resolver,
) -> AnnotationResult {
    let mut result = AnnotationResult::default();

    for record in records {
        let arg = arg_hits
            .get(&record.gene_id)
            .map(|hit| GeneAnnotation::from_hit(hit, arg_resolver));
        let hmrg = hmrg_hits
            .get(&record.gene_id)
            .map(|hit| GeneAnnotation::from_hit(hit, hmrg_resolver));

        if arg.as_ref().is_some_and(|a| !a.resolved) {
            result.unresolved_arg += 1;
        }
        if hmrg.as_ref().is_some_and(|a| !a.resolved) {
            result.unresolved_hmrg += 1;
        }

        result.genes.push(AnnotatedGene {
            gene: record.clone(),
            arg,
            hmrg,
        });
    }

    let unresolved = result.unresolved_arg + result.unresolved_hmrg;
    if unresolved > 0 {
        log::warn!("{} annotations fell back to raw accessions", unresolved);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hits::AlignmentHit;
    use crate::resolve::{AccessionStyle, AnnotationMap, Resolver};
    use std::collections::HashSet;
    use std::io::Write;

    fn gene(contig: &str, idx: usize, start: usize, end: usize) -> GeneRecord {
        GeneRecord {
            contig_id: contig.to_string(),
            gene_id: format!("{}_{}", contig, idx),
            start,
            end,
            strand: '+',
        }
    }

    fn hits_for(entries: &[(&str, &str)]) -> BestHits {
        let mut hits = BestHits::default();
        for (query, target) in entries {
            hits.by_query.insert(
                query.to_string(),
                AlignmentHit {
                    query_id: query.to_string(),
                    target_id: target.to_string(),
                    identity: 99.0,
                    evalue: 1e-30,
                    bit_score: 200.0,
                    coverage: None,
                },
            );
        }
        hits
    }

    fn hmrg_resolver() -> Resolver {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "accession\tgene_name\tcategory").unwrap();
        writeln!(tmp, "Q5FAM9\tczcA\tcadmium/zinc/cobalt").unwrap();
        let map = AnnotationMap::from_file(tmp.path()).unwrap();
        Resolver::new(AccessionStyle::NcbiPipe, Some(map))
    }

    fn arg_resolver() -> Resolver {
        Resolver::new(AccessionStyle::PipeLast, None)
    }

    #[test]
    fn test_dual_annotated_gene_is_one_record() {
        let records = vec![gene("c1", 1, 1, 300)];
        let arg_hits = hits_for(&[("c1_1", "gb|X|ARO:1|tetA")]);
        let hmrg_hits = hits_for(&[("c1_1", "BAC1|czcA|tr|Q5FAM9|TAG")]);

        let result = annotate_genes(
            &records,
            &arg_hits,
            &hmrg_hits,
            &arg_resolver(),
            &hmrg_resolver(),
        );

        assert_eq!(result.genes.len(), 1);
        let g = &result.genes[0];
        assert_eq!(g.class(), GeneClass::Dual);
        assert_eq!(g.arg.as_ref().unwrap().name, "tetA");
        assert_eq!(g.hmrg.as_ref().unwrap().name, "czcA");
    }

    #[test]
    fn test_every_gene_id_appears_exactly_once() {
        let records = vec![
            gene("c1", 1, 1, 300),
            gene("c1", 2, 310, 600),
            gene("c2", 1, 5, 200),
        ];
        let arg_hits = hits_for(&[("c1_1", "x|tetA"), ("c2_1", "x|sul1")]);
        let hmrg_hits = hits_for(&[("c1_1", "gi|1|ref|Q5FAM9.1|")]);

        let result = annotate_genes(
            &records,
            &arg_hits,
            &hmrg_hits,
            &arg_resolver(),
            &hmrg_resolver(),
        );

        let ids: HashSet<&str> = result.genes.iter().map(|g| g.gene.gene_id.as_str()).collect();
        assert_eq!(result.genes.len(), records.len());
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn test_unresolved_hmrg_counted_and_falls_back() {
        let records = vec![gene("c1", 1, 1, 300)];
        let arg_hits = BestHits::default();
        let hmrg_hits = hits_for(&[("c1_1", "gi|1|ref|WP_404.1|")]);

        let result = annotate_genes(
            &records,
            &arg_hits,
            &hmrg_hits,
            &arg_resolver(),
            &hmrg_resolver(),
        );

        assert_eq!(result.unresolved_hmrg, 1);
        let annotation = result.genes[0].hmrg.as_ref().unwrap();
        assert!(!annotation.resolved);
        assert_eq!(annotation.name, "WP_404");
    }

    #[test]
    fn test_unannotated_gene_kept_as_other() {
        let records = vec![gene("c1", 1, 1, 300)];
        let result = annotate_genes(
            &records,
            &BestHits::default(),
            &BestHits::default(),
            &arg_resolver(),
            &hmrg_resolver(),
        );
        assert_eq!(result.genes[0].class(), GeneClass::Other);
        assert!(!result.genes[0].is_annotated());
    }
}
