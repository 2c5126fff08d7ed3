//! GENCODE gene adapter
//!
//! Emits one `gene` node per GTF `gene` feature with an Ensembl id.

use crate::adapter::aliases::{AliasKey, AliasTable};
use crate::adapter::genomic::{Containment, GenomicRegion, LocationPredicate, Locus};
use crate::adapter::reader::{read_format, DataFormat, Row};
use crate::adapter::traits::{Adapter, AdapterOptions, EdgeStream, NodeStream};
use crate::graph::{Node, Properties, PropertyValue};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

const SOURCE: &str = "GENCODE";
const SOURCE_URL: &str = "https://www.gencodegenes.org/human/";
const PAR_Y_SUFFIX: &str = "_PAR_Y";

#[derive(Debug, Clone, Deserialize)]
pub struct GencodeGeneArgs {
    pub filepath: PathBuf,
    pub gene_alias_file_path: Option<PathBuf>,
    pub chr: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
}

pub struct GencodeGeneAdapter {
    id: String,
    args: GencodeGeneArgs,
    options: AdapterOptions,
    aliases: Option<Arc<AliasTable>>,
    bound: GenomicRegion,
}

impl GencodeGeneAdapter {
    pub fn new(args: GencodeGeneArgs, options: AdapterOptions) -> Self {
        let aliases = args.gene_alias_file_path.as_ref().and_then(|path| {
            AliasTable::load(path, AliasKey::CrossReference)
                .map(Arc::new)
                .map_err(|e| warn!(error = %e, "Failed to load gene aliases"))
                .ok()
        });
        let bound = GenomicRegion::new(args.chr.as_deref(), args.start, args.end);

        Self {
            id: "gencode_gene".to_string(),
            args,
            options,
            aliases,
            bound,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_aliases(mut self, aliases: Arc<AliasTable>) -> Self {
        self.aliases = Some(aliases);
        self
    }

    fn synonyms(&self, ensembl_id: &str, row: &Row) -> Option<Vec<String>> {
        let aliases = self.aliases.as_ref()?;
        aliases
            .get(ensembl_id)
            .or_else(|| {
                let hgnc = row.get("hgnc_id")?.as_str()?;
                aliases
                    .get(hgnc)
                    .or_else(|| aliases.get(hgnc.trim_start_matches("HGNC:")))
            })
            .map(<[String]>::to_vec)
    }

    fn build_node(&self, row: &Row) -> Option<Node> {
        if row.get("feature").and_then(PropertyValue::as_str) != Some("gene") {
            return None;
        }

        let gene_id = row.get("gene_id")?.as_str()?;
        let raw_id = gene_id.split('.').next().unwrap_or(gene_id);
        if !raw_id.starts_with("ENSG") {
            return None;
        }
        let id = if gene_id.ends_with(PAR_Y_SUFFIX) && !raw_id.ends_with(PAR_Y_SUFFIX) {
            format!("ENSEMBL:{}{}", raw_id, PAR_Y_SUFFIX)
        } else {
            format!("ENSEMBL:{}", raw_id)
        };

        let chr = row.get("seqname").map(PropertyValue::to_string).unwrap_or_default();
        let coordinate = |key: &str| row.get(key).and_then(PropertyValue::as_str)?.parse::<i64>().ok();
        let (Some(start), Some(end)) = (coordinate("start"), coordinate("end")) else {
            warn!(gene_id, "Skipping gene with unparsable coordinates");
            return None;
        };

        let locus = Locus {
            chr: chr.clone(),
            start,
            end,
        };
        if !Containment.contains(&self.bound, &locus) {
            return None;
        }

        let mut properties = Properties::new();
        if self.options.write_properties {
            for key in ["gene_type", "gene_name"] {
                if let Some(value) = row.get(key) {
                    properties.insert(key.to_string(), value.clone());
                }
            }
            properties.insert("chr".to_string(), chr.into());
            properties.insert("start".to_string(), start.into());
            properties.insert("end".to_string(), end.into());
            if let Some(synonyms) = self.synonyms(raw_id, row) {
                properties.insert("synonyms".to_string(), synonyms.into());
            }
            if self.options.add_provenance {
                properties.insert("source".to_string(), SOURCE.into());
                properties.insert("source_url".to_string(), SOURCE_URL.into());
            }
        }

        Some(Node::new(id, "gene").with_properties(properties))
    }
}

impl Adapter for GencodeGeneAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn get_nodes(&self) -> NodeStream<'_> {
        Box::new(
            read_format(&self.args.filepath, DataFormat::Gtf)
                .filter_map(move |row| self.build_node(&row)),
        )
    }

    fn get_edges(&self) -> EdgeStream<'_> {
        Box::new(std::iter::empty())
    }
}
