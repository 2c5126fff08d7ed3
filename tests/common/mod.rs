//! Shared fixtures for integration tests
//!
//! A [`Workspace`] is a scratch directory holding a schema, source files,
//! mapping files and an adapters manifest.

#![allow(dead_code)]

use biokg::BuildConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const SCHEMA: &str = r#"
Title: integration schema
gene:
  represented_as: node
  input_label: gene
  is_a: biological entity
transcript:
  represented_as: node
  input_label: transcript
  is_a: biological entity
gene ontology term:
  represented_as: node
  input_label: go
  is_a: ontology term
transcribed to:
  represented_as: edge
  input_label: transcribed_to
  source: transcript
  target: gene
gene to go:
  represented_as: edge
  input_label: gene_go
  source: gene
  target: ontology_term
  output_label: belongs_to
"#;

pub const GENES_TSV: &str = "gene_id\tgene_name\tchr\tstart\tend\n\
ENSG00000139618.3\tBRCA2\tchr13\t32315508\t32400268\n\
ENSG00000141510.2\tTP53\tchr17\t7661779\t7687538\n\
\tMISSING\tchr1\t1\t2\n";

pub const GENE_MAPPING: &str = r#"
columns:
  coerce:
    start: int
    end: int
nodes:
  id_column: gene_id
  label_constant: gene
  properties: [gene_name]
  chr_column: chr
  start_column: start
  end_column: end
"#;

pub const TRANSCRIPTS_CSV: &str = "transcript_id,gene_id\n\
ENST00000380152.8,ENSG00000139618.3\n\
ENST00000269305.9,ENSG00000141510.2\n";

pub const TRANSCRIPT_MAPPING: &str = r#"
nodes:
  id_column: transcript_id
  label_constant: transcript
edges:
  source_column: transcript_id
  target_column: gene_id
  label_constant: transcribed_to
"#;

pub const GO_TSV: &str = "gene\tterm\tevidence\n\
ENSG00000139618\t0006281\tIDA\n";

pub const GO_MAPPING: &str = r#"
edges:
  source_column: gene
  target_column: term
  target_prefix: GO
  label_constant: gene_go
  properties: [evidence]
"#;

pub const GENCODE_GTF: &str = "##provider: GENCODE\n\
chr13\tHAVANA\tgene\t32315508\t32400268\t.\t+\t.\tgene_id \"ENSG00000139618.19\"; gene_type \"protein_coding\"; gene_name \"BRCA2\";\n\
chr13\tHAVANA\ttranscript\t32315508\t32400268\t.\t+\t.\tgene_id \"ENSG00000139618.19\"; transcript_id \"ENST00000380152.8\";\n";

pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Gzip `content` into `name`.
    pub fn gz_file(&self, name: &str, content: &str) -> PathBuf {
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use std::io::Write;

        let path = self.dir.path().join(name);
        let mut encoder = GzEncoder::new(std::fs::File::create(&path).unwrap(), Compression::default());
        encoder.write_all(content.as_bytes()).unwrap();
        encoder.finish().unwrap();
        path
    }

    /// Manifest entry for the generic adapter
    pub fn generic_entry(&self, name: &str, data: &Path, format: &str, mapping: &Path) -> String {
        format!(
            "{name}:\n  adapter:\n    name: generic\n    args:\n      filepath: {data}\n      data_format: {format}\n      mapping_config: {mapping}\n      source: test\n",
            name = name,
            data = data.display(),
            format = format,
            mapping = mapping.display()
        )
    }

    /// Schema, gene/transcript/GO sources and a manifest covering all three
    pub fn standard_build(&self) -> BuildConfig {
        let schema = self.file("schema.yaml", SCHEMA);
        let genes = self.file("genes.tsv", GENES_TSV);
        let gene_mapping = self.file("genes.yaml", GENE_MAPPING);
        let transcripts = self.file("transcripts.csv", TRANSCRIPTS_CSV);
        let transcript_mapping = self.file("transcripts.yaml", TRANSCRIPT_MAPPING);
        let go = self.file("go.tsv", GO_TSV);
        let go_mapping = self.file("go.yaml", GO_MAPPING);

        let manifest = [
            self.generic_entry("genes", &genes, "tsv", &gene_mapping),
            self.generic_entry("transcripts", &transcripts, "csv", &transcript_mapping),
            self.generic_entry("gene_go", &go, "tsv", &go_mapping),
        ]
        .concat();
        let adapters = self.file("adapters.yaml", &manifest);

        BuildConfig::new(schema, adapters).with_output_dir(self.path().join("out"))
    }
}
