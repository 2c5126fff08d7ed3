//! Serialization tests with fixtures shaped like adapter output

use serde_json::{json, Value};

/// Fixture: a gene node as the generic adapter emits it
fn gene_node_fixture() -> Value {
    json!({
        "id": "ENSEMBL:ENSG00000139618",
        "label": "gene",
        "properties": {
            "gene_name": "BRCA2",
            "start": 32315508,
            "synonyms": ["FACD", "FANCD1"],
            "source": "GENCODE"
        }
    })
}

/// Fixture: an edge without properties
fn edge_fixture() -> Value {
    json!({
        "source": "ENSEMBL:ENST00000380152",
        "target": "ENSEMBL:ENSG00000139618",
        "label": "transcribed_to"
    })
}

#[cfg(test)]
mod serialization_tests {
    use super::*;
    use crate::graph::{Edge, Node, NodeId, PropertyValue};
    use std::collections::BTreeMap;

    #[test]
    fn node_id_serializes_as_string() {
        let id = NodeId::from_string("GO:0001234");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"GO:0001234\"");
    }

    #[test]
    fn node_id_deserializes_from_string() {
        let id: NodeId = serde_json::from_str("\"DBSNP:rs123\"").unwrap();
        assert_eq!(id.as_str(), "DBSNP:rs123");
    }

    #[test]
    fn property_values_deserialize_untagged() {
        let value: PropertyValue = serde_json::from_value(json!({
            "name": "x",
            "count": 3,
            "score": 0.5,
            "flag": true,
            "tags": ["a", "b"],
            "missing": null
        }))
        .unwrap();

        let PropertyValue::Object(map) = value else {
            panic!("expected object");
        };
        assert_eq!(map["name"], PropertyValue::String("x".into()));
        assert_eq!(map["count"], PropertyValue::Int(3));
        assert_eq!(map["score"], PropertyValue::Float(0.5));
        assert_eq!(map["flag"], PropertyValue::Bool(true));
        assert_eq!(
            map["tags"],
            PropertyValue::Array(vec!["a".into(), "b".into()])
        );
        assert_eq!(map["missing"], PropertyValue::Null);
    }

    #[test]
    fn property_value_display_renders_scalars_bare() {
        assert_eq!(PropertyValue::from("BRCA2").to_string(), "BRCA2");
        assert_eq!(PropertyValue::Int(42).to_string(), "42");
        assert_eq!(PropertyValue::Bool(false).to_string(), "false");
        assert_eq!(PropertyValue::Null.to_string(), "");
        assert_eq!(
            PropertyValue::Array(vec!["a".into(), PropertyValue::Int(1)]).to_string(),
            "[\"a\",1]"
        );
    }

    #[test]
    fn loose_eq_compares_numbers_across_variants() {
        assert!(PropertyValue::Int(1).loose_eq(&PropertyValue::Float(1.0)));
        assert!(!PropertyValue::from("1").loose_eq(&PropertyValue::Int(1)));
        assert!(PropertyValue::from("a").loose_eq(&PropertyValue::from("a")));
    }

    #[test]
    fn missing_markers_are_recognized() {
        assert!(PropertyValue::Null.is_missing());
        assert!(PropertyValue::from("NA").is_missing());
        assert!(PropertyValue::from("N/A").is_missing());
        assert!(PropertyValue::from("").is_blank());
        assert!(!PropertyValue::from("NA").is_blank());
        assert!(!PropertyValue::Int(0).is_missing());
    }

    #[test]
    fn can_deserialize_gene_node_fixture() {
        let node: Node = serde_json::from_value(gene_node_fixture()).unwrap();
        assert_eq!(node.id.as_str(), "ENSEMBL:ENSG00000139618");
        assert_eq!(node.label, "gene");
        assert_eq!(node.properties["start"], PropertyValue::Int(32315508));
        assert_eq!(
            node.properties["synonyms"],
            PropertyValue::from(vec!["FACD".to_string(), "FANCD1".to_string()])
        );
    }

    #[test]
    fn edge_without_properties_gets_empty_map() {
        let edge: Edge = serde_json::from_value(edge_fixture()).unwrap();
        assert_eq!(edge.label, "transcribed_to");
        assert!(edge.properties.is_empty());
    }

    #[test]
    fn node_properties_serialize_in_key_order() {
        let node = Node::new("ENSEMBL:ENSG1", "gene")
            .with_property("zeta", "z")
            .with_property("alpha", "a");
        let json = serde_json::to_string(&node.properties).unwrap();
        assert_eq!(json, r#"{"alpha":"a","zeta":"z"}"#);
    }

    #[test]
    fn to_json_maps_nested_objects() {
        let mut inner = BTreeMap::new();
        inner.insert("tissue".to_string(), PropertyValue::from("UBERON:0002107"));
        let value = PropertyValue::Object(inner);
        assert_eq!(value.to_json(), json!({"tissue": "UBERON:0002107"}));
        assert_eq!(PropertyValue::Float(f64::NAN).to_json(), Value::Null);
    }
}
