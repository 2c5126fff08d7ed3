//! Build configuration
//!
//! Everything a build run needs besides the manifest contents: input paths,
//! the sink to write to, batch size, property/provenance flags and the
//! shared lookup tables.

use crate::adapter::AdapterOptions;
use crate::writer::{WriterOptions, DEFAULT_BATCH_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Shared lookup tables are reloaded once older than this
pub const DEFAULT_LOOKUP_MAX_AGE_SECS: i64 = 24 * 60 * 60;

/// Which sink a build writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    #[default]
    Sqlite,
    Neo4j,
    Metta,
    /// Keep everything in memory and discard it (dry run)
    Memory,
}

impl FromStr for WriterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(WriterKind::Sqlite),
            "neo4j" => Ok(WriterKind::Neo4j),
            "metta" => Ok(WriterKind::Metta),
            "memory" | "dry-run" => Ok(WriterKind::Memory),
            other => Err(format!("unknown writer type: {}", other)),
        }
    }
}

impl fmt::Display for WriterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WriterKind::Sqlite => "sqlite",
            WriterKind::Neo4j => "neo4j",
            WriterKind::Metta => "metta",
            WriterKind::Memory => "memory",
        };
        write!(f, "{}", name)
    }
}

/// Default output directory (`~/.local/share/biokg` on Linux)
pub fn default_output_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"));
    data_dir.join("biokg")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    pub schema_path: PathBuf,
    pub adapters_path: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub writer: WriterKind,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_true")]
    pub write_properties: bool,
    #[serde(default = "default_true")]
    pub add_provenance: bool,
    /// Gene id → alias list table shared by every generic adapter
    #[serde(default)]
    pub gene_alias_file: Option<PathBuf>,
    /// HGNC cross-reference table shared by the GENCODE adapter
    #[serde(default)]
    pub xref_alias_file: Option<PathBuf>,
    #[serde(default = "default_lookup_max_age")]
    pub lookup_max_age_secs: i64,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

fn default_lookup_max_age() -> i64 {
    DEFAULT_LOOKUP_MAX_AGE_SECS
}

impl BuildConfig {
    pub fn new(schema_path: impl Into<PathBuf>, adapters_path: impl Into<PathBuf>) -> Self {
        Self {
            schema_path: schema_path.into(),
            adapters_path: adapters_path.into(),
            output_dir: default_output_dir(),
            writer: WriterKind::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            write_properties: true,
            add_provenance: true,
            gene_alias_file: None,
            xref_alias_file: None,
            lookup_max_age_secs: DEFAULT_LOOKUP_MAX_AGE_SECS,
        }
    }

    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    pub fn with_writer(mut self, writer: WriterKind) -> Self {
        self.writer = writer;
        self
    }

    pub fn writer_options(&self) -> WriterOptions {
        WriterOptions {
            batch_size: self.batch_size.max(1),
            write_properties: self.write_properties,
        }
    }

    pub fn adapter_options(&self) -> AdapterOptions {
        AdapterOptions {
            write_properties: self.write_properties,
            add_provenance: self.add_provenance,
        }
    }

    pub fn lookup_max_age(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.lookup_max_age_secs.max(0))
    }

    /// SQLite database file inside the output directory
    pub fn database_path(&self) -> PathBuf {
        self.output_dir.join("biokg.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_writer_defaults() {
        let config = BuildConfig::new("schema.yaml", "adapters.yaml");
        assert_eq!(config.writer, WriterKind::Sqlite);
        assert_eq!(config.writer_options(), WriterOptions::default());
        assert_eq!(config.adapter_options(), AdapterOptions::default());
        assert!(config.database_path().ends_with("biokg/biokg.db"));
    }

    #[test]
    fn writer_kind_round_trips_through_strings() {
        for kind in [WriterKind::Sqlite, WriterKind::Neo4j, WriterKind::Metta, WriterKind::Memory] {
            assert_eq!(kind.to_string().parse::<WriterKind>().unwrap(), kind);
        }
        assert_eq!("dry-run".parse::<WriterKind>().unwrap(), WriterKind::Memory);
        assert!("mongo".parse::<WriterKind>().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: BuildConfig = serde_yaml::from_str(
            "schema_path: s.yaml\nadapters_path: a.yaml\nwriter: neo4j\nbatch_size: 0\n",
        )
        .unwrap();
        assert_eq!(config.writer, WriterKind::Neo4j);
        assert_eq!(config.writer_options().batch_size, 1);
        assert!(config.write_properties);
        assert_eq!(config.lookup_max_age(), chrono::Duration::hours(24));
    }
}
