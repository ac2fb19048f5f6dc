//! Alignment hit table parsing and best-hit selection.
//!
//! Reads BLAST/DIAMOND tabular output (outfmt 6: `qseqid sseqid pident length
//! mismatch gapopen qstart qend sstart send evalue bitscore [qcovhsp]`) and
//! reduces it to at most one hit per query gene.

use crate::reader::open_table;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// One alignment of a query gene against a reference database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentHit {
    /// Query gene identifier
    pub query_id: String,
    /// Raw subject identifier (database accession)
    pub target_id: String,
    /// Percent identity
    pub identity: f64,
    /// Alignment e-value
    pub evalue: f64,
    /// Alignment bit score
    pub bit_score: f64,
    /// Query coverage, when the table carries a qcovhsp column
    pub coverage: Option<f64>,
}

/// Best hit per query gene for one database
#[derive(Debug, Clone, Default)]
pub struct BestHits {
    /// query gene id -> winning hit
    pub by_query: HashMap<String, AlignmentHit>,
    /// Total data rows seen
    pub total_rows: usize,
    /// Rows dropped because a numeric field failed to parse
    pub malformed_rows: usize,
}

impl BestHits {
    pub fn get(&self, query_id: &str) -> Option<&AlignmentHit> {
        self.by_query.get(query_id)
    }

    pub fn len(&self) -> usize {
        self.by_query.len()
    }
}

/// Total order used to pick the winning hit per query gene.
///
/// Higher bit score wins; ties go to the lower e-value, then to the
/// lexicographically smallest target id, so the winner does not depend on
/// input row order.
pub fn compare_hits(a: &AlignmentHit, b: &AlignmentHit) -> Ordering {
    b.bit_score
        .partial_cmp(&a.bit_score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.evalue.partial_cmp(&b.evalue).unwrap_or(Ordering::Equal))
        .then_with(|| a.target_id.cmp(&b.target_id))
}

/// Load a hit table and keep the best hit per query gene.
///
/// A missing or empty table is a legitimate zero-hit outcome and yields an
/// empty mapping.
pub fn load_best_hits(path: &Path) -> Result<BestHits> {
    if !path.exists() {
        log::debug!("Hit table not present: {}", path.display());
        return Ok(BestHits::default());
    }

    let reader = open_table(path)?;
    let mut best = BestHits::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        best.total_rows += 1;

        let hit = match parse_hit_line(&line) {
            Some(hit) => hit,
            None => {
                best.malformed_rows += 1;
                continue;
            }
        };

        let replace = match best.by_query.get(&hit.query_id) {
            Some(current) => compare_hits(current, &hit) == Ordering::Greater,
            None => true,
        };
        if replace {
            best.by_query.insert(hit.query_id.clone(), hit);
        }
    }

    if best.malformed_rows > 0 {
        log::warn!(
            "{}: dropped {} malformed hit rows",
            path.display(),
            best.malformed_rows
        );
    }
    log::debug!(
        "{}: {} hits -> {} best hits",
        path.display(),
        best.total_rows,
        best.len()
    );

    Ok(best)
}

fn parse_hit_line(line: &str) -> Option<AlignmentHit> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 12 {
        return None;
    }

    let query_id = fields[0].to_string();
    let target_id = fields[1].to_string();
    if query_id.is_empty() || target_id.is_empty() {
        return None;
    }

    let identity: f64 = fields[2].parse().ok()?;
    let evalue: f64 = fields[10].parse().ok()?;
    let bit_score: f64 = fields[11].parse().ok()?;
    let coverage: Option<f64> = match fields.get(12) {
        Some(v) => Some(v.parse().ok()?),
        None => None,
    };

    Some(AlignmentHit {
        query_id,
        target_id,
        identity,
        evalue,
        bit_score,
        coverage,
    })
}
