//! Gene alias lookup tables
//!
//! Built from NCBI `gene_info` files. A table is immutable once loaded;
//! refreshing means loading a new table with [`AliasTable::reload`] and
//! swapping the shared handle.

use crate::adapter::reader::open_source;
use crate::adapter::traits::AdapterError;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Number of columns in an NCBI `gene_info` line
const GENE_INFO_COLUMNS: usize = 16;

/// Which identifier a table is keyed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AliasKey {
    /// NCBI gene id (column 2); synonyms from column 5
    GeneId,
    /// Ensembl and HGNC ids from the `dbXrefs` column; synonyms gathered
    /// from symbols, synonyms, designations and nomenclature names
    CrossReference,
}

/// Identifier → synonyms
#[derive(Debug, Clone)]
pub struct AliasTable {
    path: PathBuf,
    key: AliasKey,
    entries: HashMap<String, Vec<String>>,
    loaded_at: DateTime<Utc>,
}

impl AliasTable {
    /// Load a (possibly gzipped) `gene_info` file. The first line is a header.
    pub fn load(path: &Path, key: AliasKey) -> Result<Self, AdapterError> {
        let reader = open_source(path).map_err(|e| {
            AdapterError::Lookup(format!("cannot open alias file {}: {}", path.display(), e))
        })?;

        let mut entries = HashMap::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if index == 0 {
                continue;
            }
            let columns: Vec<&str> = line.split('\t').collect();
            match key {
                AliasKey::GeneId => add_gene_id_entry(&columns, &mut entries),
                AliasKey::CrossReference => add_cross_reference_entry(&columns, &mut entries),
            }
        }

        info!(path = %path.display(), entries = entries.len(), "Loaded gene alias table");
        Ok(Self {
            path: path.to_path_buf(),
            key,
            entries,
            loaded_at: Utc::now(),
        })
    }

    /// Build a table from ready-made entries.
    pub fn from_entries(key: AliasKey, entries: HashMap<String, Vec<String>>) -> Self {
        Self {
            path: PathBuf::new(),
            key,
            entries,
            loaded_at: Utc::now(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&[String]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn key(&self) -> AliasKey {
        self.key
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    /// Older than `max_age`
    pub fn is_stale(&self, max_age: Duration) -> bool {
        Utc::now() - self.loaded_at > max_age
    }

    /// Load a fresh table from the same file.
    pub fn reload(&self) -> Result<Self, AdapterError> {
        Self::load(&self.path, self.key)
    }
}

/// The shared tables of a run, one per key
#[derive(Debug, Clone, Default)]
pub struct LookupTables {
    tables: HashMap<AliasKey, Arc<AliasTable>>,
}

impl LookupTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: AliasTable) {
        self.tables.insert(table.key(), Arc::new(table));
    }

    pub fn get(&self, key: AliasKey) -> Option<Arc<AliasTable>> {
        self.tables.get(&key).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Reload every table older than `max_age`.
    ///
    /// A failed reload keeps the old table. Adapters already holding the old
    /// handle keep using it until they are dropped.
    pub fn refresh_stale(&mut self, max_age: Duration) -> usize {
        let mut refreshed = 0;
        for table in self.tables.values_mut() {
            if !table.is_stale(max_age) {
                continue;
            }
            match table.reload() {
                Ok(fresh) => {
                    *table = Arc::new(fresh);
                    refreshed += 1;
                }
                Err(e) => warn!(path = %table.path().display(), error = %e, "Alias table reload failed, keeping stale table"),
            }
        }
        refreshed
    }
}

fn add_gene_id_entry(columns: &[&str], entries: &mut HashMap<String, Vec<String>>) {
    if columns.len() <= 4 || columns[4] == "-" {
        return;
    }
    let synonyms: Vec<String> = columns[4]
        .split('|')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if !synonyms.is_empty() {
        entries.insert(columns[1].to_string(), synonyms);
    }
}

fn add_cross_reference_entry(columns: &[&str], entries: &mut HashMap<String, Vec<String>>) {
    if columns.len() < GENE_INFO_COLUMNS {
        debug!(columns = columns.len(), "Skipping short gene_info line");
        return;
    }

    let mut hgnc = None;
    let mut ensembl = None;
    for reference in columns[5].split('|') {
        if let Some(id) = reference.strip_prefix("HGNC:") {
            hgnc = Some(id);
        }
        if let Some(id) = reference.strip_prefix("Ensembl:") {
            ensembl = Some(id);
        }
    }
    if hgnc.is_none() && ensembl.is_none() {
        return;
    }

    let mut synonyms: BTreeSet<&str> = BTreeSet::new();
    synonyms.insert(columns[2]);
    synonyms.extend(columns[4].split('|'));
    synonyms.extend(hgnc);
    synonyms.extend(columns[13].split('|'));
    synonyms.insert(columns[10]);
    synonyms.insert(columns[11]);
    synonyms.remove("-");
    synonyms.remove("");

    let synonyms: Vec<String> = synonyms.into_iter().map(str::to_string).collect();
    if let Some(id) = ensembl {
        entries.insert(id.to_string(), synonyms.clone());
    }
    if let Some(id) = hgnc {
        entries.insert(id.to_string(), synonyms);
    }
}
