//! Annotation-name standardization.
//!
//! Hit tables carry raw database subject ids; reports need stable biological
//! gene names. This module extracts the accession embedded in a subject id
//! and translates it through an annotation map, falling back to the raw
//! accession when the map has no entry.

use crate::reader::open_table;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

/// How to pull the accession out of a database subject id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AccessionStyle {
    /// `ARO:3000165|...|tetA` -> last pipe-separated field (CARD headers)
    PipeLast,
    /// `gi|...|ref|WP_0123.1|...` -> field after an NCBI db code, version
    /// stripped; BacMet internal headers fall back to the fourth field
    NcbiPipe,
    /// Use the subject id unchanged
    Verbatim,
}

const NCBI_DB_CODES: [&str; 5] = ["ref", "gb", "emb", "sp", "tr"];

/// Extract the accession from a subject id according to `style`
pub fn extract_accession(target_id: &str, style: AccessionStyle) -> String {
    let target_id = target_id.trim();
    match style {
        AccessionStyle::Verbatim => target_id.to_string(),
        AccessionStyle::PipeLast => target_id
            .rsplit('|')
            .next()
            .unwrap_or(target_id)
            .to_string(),
        AccessionStyle::NcbiPipe => {
            let parts: Vec<&str> = target_id.split('|').collect();
            for (i, part) in parts.iter().enumerate() {
                if NCBI_DB_CODES.contains(part) {
                    if let Some(acc) = parts.get(i + 1) {
                        return strip_version(acc).to_string();
                    }
                }
            }
            // BacMet internal format: BAC0001|abeM|tr|Q5FAM9|...
            if parts.len() > 3 {
                return parts[3].to_string();
            }
            target_id.to_string()
        }
    }
}

fn strip_version(accession: &str) -> &str {
    accession.split('.').next().unwrap_or(accession)
}

/// Case- and whitespace-insensitive, version-stripped form used for the
/// second-chance map lookup
fn normalize(accession: &str) -> String {
    strip_version(accession.trim()).to_ascii_lowercase()
}

/// One annotation map entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapEntry {
    /// Standardized display name
    pub name: String,
    /// Resistance category, when the map provides one
    pub category: Option<String>,
}

/// The result of resolving one subject id
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Display name (standardized, or the raw accession on a miss)
    pub name: String,
    pub category: Option<String>,
    /// False when the map had no entry and the accession was used as-is
    pub resolved: bool,
}

/// Accession -> standardized name translation map.
///
/// Resolution is a pure function of the subject id and the map snapshot, so
/// a single loaded map can be shared read-only across sample workers.
#[derive(Debug, Clone, Default)]
pub struct AnnotationMap {
    exact: HashMap<String, MapEntry>,
    normalized: HashMap<String, MapEntry>,
}

impl AnnotationMap {
    /// Load a `accession<TAB>gene_name[<TAB>category]` table with header row
    pub fn from_file(path: &Path) -> Result<Self> {
        let reader = open_table(path)
            .with_context(|| format!("Failed to open annotation map: {}", path.display()))?;

        let mut map = AnnotationMap::default();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            // Header row
            if line_no == 0 && line.to_ascii_lowercase().starts_with("accession") {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 || fields[0].is_empty() || fields[1].is_empty() {
                continue;
            }
            let entry = MapEntry {
                name: fields[1].trim().to_string(),
                category: fields
                    .get(2)
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .map(str::to_string),
            };
            map.insert(fields[0].trim(), entry);
        }

        if map.exact.is_empty() {
            bail!("Annotation map is empty: {}", path.display());
        }
        log::info!(
            "Loaded {} annotation map entries from {}",
            map.exact.len(),
            path.display()
        );
        Ok(map)
    }

    fn insert(&mut self, accession: &str, entry: MapEntry) {
        // First entry wins so re-runs over identical maps stay stable
        self.normalized
            .entry(normalize(accession))
            .or_insert_with(|| entry.clone());
        self.exact.entry(accession.to_string()).or_insert(entry);
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    /// Exact match, then normalized match, then raw-accession fallback
    pub fn resolve(&self, accession: &str) -> Resolution {
        if let Some(entry) = self.exact.get(accession) {
            return Resolution {
                name: entry.name.clone(),
                category: entry.category.clone(),
                resolved: true,
            };
        }
        if let Some(entry) = self.normalized.get(&normalize(accession)) {
            return Resolution {
                name: entry.name.clone(),
                category: entry.category.clone(),
                resolved: true,
            };
        }
        Resolution {
            name: accession.to_string(),
            category: None,
            resolved: false,
        }
    }
}

/// A database's resolver: accession extraction plus an optional map.
///
/// Databases whose subject ids already carry standardized names (CARD) run
/// without a map; the extracted name is used as-is and is not counted as
/// unresolved.
#[derive(Debug, Clone)]
pub struct Resolver {
    style: AccessionStyle,
    map: Option<AnnotationMap>,
}

impl Resolver {
    pub fn new(style: AccessionStyle, map: Option<AnnotationMap>) -> Self {
        Resolver { style, map }
    }

    pub fn resolve(&self, target_id: &str) -> Resolution {
        let accession = extract_accession(target_id, self.style);
        match &self.map {
            Some(map) => map.resolve(&accession),
            None => Resolution {
                name: accession,
                category: None,
                resolved: true,
            },
        }
    }
}
