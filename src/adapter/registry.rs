//! Adapter registry: adapter name → constructor
//!
//! Manifests name adapters by string (`generic`, `gencode_gene`). The
//! registry turns such a name plus its JSON arguments into a boxed
//! [`Adapter`].

use crate::adapter::aliases::{AliasKey, LookupTables};
use crate::adapter::gencode::{GencodeGeneAdapter, GencodeGeneArgs};
use crate::adapter::generic::{GenericAdapterArgs, GenericDataAdapter};
use crate::adapter::traits::{Adapter, AdapterError, AdapterOptions};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;

/// What a constructor gets besides its own arguments
#[derive(Debug, Clone, Copy)]
pub struct AdapterContext<'a> {
    /// Manifest entry name, used as the adapter id
    pub id: &'a str,
    pub options: AdapterOptions,
    pub lookups: &'a LookupTables,
}

type Constructor =
    Box<dyn Fn(serde_json::Value, &AdapterContext<'_>) -> Result<Box<dyn Adapter>, AdapterError>>;

pub struct AdapterRegistry {
    constructors: BTreeMap<String, Constructor>,
}

fn parse_args<T: DeserializeOwned>(adapter: &str, args: serde_json::Value) -> Result<T, AdapterError> {
    serde_json::from_value(args).map_err(|source| AdapterError::InvalidArgs {
        adapter: adapter.to_string(),
        source,
    })
}

impl AdapterRegistry {
    /// A registry with no adapters
    pub fn new() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }

    /// The built-in adapters
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register("generic", |args, ctx| {
            let args: GenericAdapterArgs = parse_args("generic", args)?;
            let mut adapter = GenericDataAdapter::new(args, ctx.options).with_id(ctx.id);
            if let Some(aliases) = ctx.lookups.get(AliasKey::GeneId) {
                adapter = adapter.with_aliases(aliases);
            }
            Ok(Box::new(adapter) as Box<dyn Adapter>)
        });

        registry.register("gencode_gene", |args, ctx| {
            let args: GencodeGeneArgs = parse_args("gencode_gene", args)?;
            let mut adapter = GencodeGeneAdapter::new(args, ctx.options).with_id(ctx.id);
            if let Some(aliases) = ctx.lookups.get(AliasKey::CrossReference) {
                adapter = adapter.with_aliases(aliases);
            }
            Ok(Box::new(adapter) as Box<dyn Adapter>)
        });

        registry
    }

    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(serde_json::Value, &AdapterContext<'_>) -> Result<Box<dyn Adapter>, AdapterError> + 'static,
    {
        self.constructors.insert(name.to_string(), Box::new(constructor));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// Construct the adapter registered under `name`.
    pub fn build(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &AdapterContext<'_>,
    ) -> Result<Box<dyn Adapter>, AdapterError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| AdapterError::UnknownAdapter(name.to_string()))?;
        constructor(args, ctx)
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(lookups: &LookupTables) -> AdapterContext<'_> {
        AdapterContext {
            id: "genes",
            options: AdapterOptions::default(),
            lookups,
        }
    }

    #[test]
    fn defaults_are_registered() {
        let registry = AdapterRegistry::with_defaults();
        assert_eq!(registry.names(), vec!["gencode_gene", "generic"]);
    }

    #[test]
    fn unknown_name_is_typed_error() {
        let lookups = LookupTables::new();
        let result = AdapterRegistry::with_defaults().build("vcf", json!({}), &ctx(&lookups));
        assert!(matches!(result, Err(AdapterError::UnknownAdapter(name)) if name == "vcf"));
    }

    #[test]
    fn bad_arguments_are_invalid_args() {
        let lookups = LookupTables::new();
        let result = AdapterRegistry::with_defaults().build("generic", json!({"data_format": "tsv"}), &ctx(&lookups));
        assert!(matches!(result, Err(AdapterError::InvalidArgs { adapter, .. }) if adapter == "generic"));
    }

    #[test]
    fn builds_generic_with_manifest_id() {
        let lookups = LookupTables::new();
        let adapter = AdapterRegistry::with_defaults()
            .build("generic", json!({"filepath": "/tmp/none.tsv", "data_format": "tsv"}), &ctx(&lookups))
            .unwrap();
        assert_eq!(adapter.id(), "genes");
        assert_eq!(adapter.get_nodes().count(), 0);
    }
}
