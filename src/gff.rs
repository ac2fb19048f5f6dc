//! Gene coordinate table parsing.
//!
//! Reads the GFF-shaped output of the gene predictor and extracts one
//! `GeneRecord` per CDS row. Malformed rows are dropped and counted; only a
//! missing file or an empty record set makes the sample unusable.

use crate::reader::open_table;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;

/// A predicted gene on a contig (1-based inclusive coordinates)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeneRecord {
    /// Contig the gene was predicted on
    pub contig_id: String,
    /// Gene identifier, unique within a sample (`{contig_id}_{index}`)
    pub gene_id: String,
    /// Start position (1-based)
    pub start: usize,
    /// End position (1-based, inclusive)
    pub end: usize,
    /// Strand (+ or -)
    pub strand: char,
}

/// Parsed coordinate table for one sample
#[derive(Debug, Clone, Default)]
pub struct CoordinateTable {
    /// Valid gene records
    pub records: Vec<GeneRecord>,
    /// Rows dropped because they could not be parsed
    pub malformed_rows: usize,
}

impl CoordinateTable {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Load the coordinate table for one sample.
///
/// Returns Err only when the file cannot be opened; per-row problems are
/// counted in `malformed_rows` instead.
pub fn load_coordinates(path: &Path) -> Result<CoordinateTable> {
    let reader = open_table(path)?;

    let mut table = CoordinateTable::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        match parse_coordinate_line(&line) {
            ParsedRow::Gene(record) => table.records.push(record),
            ParsedRow::Malformed => table.malformed_rows += 1,
            ParsedRow::Skipped => {}
        }
    }

    if table.malformed_rows > 0 {
        log::warn!(
            "{}: dropped {} malformed coordinate rows",
            path.display(),
            table.malformed_rows
        );
    }

    Ok(table)
}

enum ParsedRow {
    Gene(GeneRecord),
    /// Row of a feature type we do not analyze (not an error)
    Skipped,
    Malformed,
}

fn parse_coordinate_line(line: &str) -> ParsedRow {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 9 {
        return ParsedRow::Malformed;
    }

    // Only CDS rows carry predicted genes
    if fields[2] != "CDS" {
        return ParsedRow::Skipped;
    }

    let contig_id = fields[0].to_string();

    let (start, end) = match (fields[3].parse::<usize>(), fields[4].parse::<usize>()) {
        (Ok(s), Ok(e)) if s <= e => (s, e),
        _ => return ParsedRow::Malformed,
    };

    let strand = match fields[6].chars().next() {
        Some(c @ ('+' | '-')) => c,
        _ => return ParsedRow::Malformed,
    };

    let gene_id = match gene_id_from_attributes(&contig_id, fields[8]) {
        Some(id) => id,
        None => return ParsedRow::Malformed,
    };

    ParsedRow::Gene(GeneRecord {
        contig_id,
        gene_id,
        start,
        end,
        strand,
    })
}

/// Derive the gene identifier from the GFF attributes field.
///
/// The predictor writes `ID=<k>_<j>` where `j` is the gene's ordinal on its
/// contig; the identifier used by the aligner is `{contig_id}_{j}`.
fn gene_id_from_attributes(contig_id: &str, attributes: &str) -> Option<String> {
    let id_value = extract_attribute(attributes, "ID")?;
    let ordinal = id_value.rsplit('_').next()?;
    if ordinal.is_empty() {
        return None;
    }
    Some(format!("{}_{}", contig_id, ordinal))
}

/// Extract a `key=value` attribute from a GFF3 attributes field
fn extract_attribute(attributes: &str, key: &str) -> Option<String> {
    for attr in attributes.split(';') {
        let attr = attr.trim();
        if let Some(value) = attr.strip_prefix(key) {
            if let Some(value) = value.strip_prefix('=') {
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
