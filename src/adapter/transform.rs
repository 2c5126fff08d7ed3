//! Transform pipeline: per-row column fixes, filters and fan-out transforms
//!
//! Fixed order: defaults → renames → coercion → filters → row transforms.
//! One input row becomes zero or more output rows.

use crate::adapter::mapping::{
    CoerceType, ColumnConfig, FilterOp, FilterSpec, MappingConfig, TransformSpec,
};
use crate::adapter::reader::Row;
use crate::graph::PropertyValue;
use thiserror::Error;
use tracing::warn;

/// Problems with a single record. Logged, never fatal.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("cannot coerce column {column} value {value:?} to {target:?}")]
    Coercion {
        column: String,
        value: String,
        target: CoerceType,
    },

    #[error("filter on {field} has a non-numeric threshold {value:?}")]
    NonNumericThreshold { field: String, value: String },

    #[error("unparsable coordinate {value:?} in column {column}")]
    Coordinate { column: String, value: String },
}

/// Column fixes, filters and row transforms of one mapping
#[derive(Debug, Clone, Default)]
pub struct TransformPipeline {
    columns: ColumnConfig,
    filters: Vec<FilterSpec>,
    transforms: Vec<TransformSpec>,
}

impl TransformPipeline {
    pub fn new(mapping: &MappingConfig) -> Self {
        Self {
            columns: mapping.columns.clone(),
            filters: mapping.filters.clone(),
            transforms: mapping.transforms.clone(),
        }
    }

    /// Run one row through the pipeline.
    ///
    /// Returns an empty vector when a filter rejects the row.
    pub fn process(&self, mut row: Row) -> Vec<Row> {
        self.apply_columns(&mut row);

        match self.passes_filters(&row) {
            Ok(true) => self.apply_row_transforms(row),
            Ok(false) => Vec::new(),
            Err(e) => {
                warn!(error = %e, "Rejecting record");
                Vec::new()
            }
        }
    }

    fn apply_columns(&self, row: &mut Row) {
        for (column, value) in &self.columns.defaults {
            if row.get(column).map(PropertyValue::is_blank).unwrap_or(true) {
                row.insert(column.clone(), value.clone());
            }
        }

        for (old, new) in &self.columns.rename {
            if let Some(value) = row.remove(old) {
                row.insert(new.clone(), value);
            }
        }

        for (column, target) in &self.columns.coerce {
            let Some(value) = row.get_mut(column) else {
                continue;
            };
            if value.is_missing() {
                continue;
            }
            match coerce(column, value, *target) {
                Ok(coerced) => *value = coerced,
                Err(e) => warn!(error = %e, "Type coercion failed, keeping value"),
            }
        }
    }

    /// AND over every filter; a missing field rejects the row.
    fn passes_filters(&self, row: &Row) -> Result<bool, RecordError> {
        for filter in &self.filters {
            let Some(row_value) = row.get(&filter.field) else {
                return Ok(false);
            };
            if !filter_matches(filter, row_value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply_row_transforms(&self, row: Row) -> Vec<Row> {
        let mut rows = vec![row];

        for transform in &self.transforms {
            match transform {
                TransformSpec::Split { field, delimiter } => {
                    if delimiter.is_empty() {
                        warn!(field = %field, "Skipping split with empty delimiter");
                        continue;
                    }
                    for row in rows.iter_mut() {
                        if let Some(PropertyValue::String(text)) = row.get(field) {
                            let parts = text
                                .split(delimiter.as_str())
                                .map(|part| PropertyValue::String(part.trim().to_string()))
                                .collect();
                            row.insert(field.clone(), PropertyValue::Array(parts));
                        }
                    }
                }
                TransformSpec::Explode { field } => {
                    rows = rows
                        .into_iter()
                        .flat_map(|row| explode(row, field))
                        .collect();
                }
                TransformSpec::Concat { field, parts, sep } => {
                    for row in rows.iter_mut() {
                        let joined = parts
                            .iter()
                            .filter_map(|part| row.get(part))
                            .map(|value| value.to_string())
                            .collect::<Vec<_>>()
                            .join(sep);
                        row.insert(field.clone(), PropertyValue::String(joined));
                    }
                }
                TransformSpec::Map { field, mapping } => {
                    for row in rows.iter_mut() {
                        let replacement = row
                            .get(field)
                            .and_then(|value| mapping.get(&value.to_string()))
                            .cloned();
                        if let Some(replacement) = replacement {
                            row.insert(field.clone(), replacement);
                        }
                    }
                }
                TransformSpec::Format {
                    field,
                    source,
                    template,
                } => {
                    let source = source.as_ref().unwrap_or(field);
                    for row in rows.iter_mut() {
                        if let Some(value) = row.get(source) {
                            let formatted = template.replace("{value}", &value.to_string());
                            row.insert(field.clone(), PropertyValue::String(formatted));
                        }
                    }
                }
            }
        }

        rows
    }
}

fn explode(row: Row, field: &str) -> Vec<Row> {
    match row.get(field) {
        Some(PropertyValue::Array(items)) => items
            .iter()
            .map(|item| {
                let mut copy = row.clone();
                copy.insert(field.to_string(), item.clone());
                copy
            })
            .collect(),
        _ => vec![row],
    }
}

fn filter_matches(filter: &FilterSpec, row_value: &PropertyValue) -> Result<bool, RecordError> {
    match filter.op {
        FilterOp::Equals => Ok(row_value.loose_eq(&filter.value)),
        FilterOp::In => Ok(match &filter.value {
            PropertyValue::Array(items) => items.iter().any(|item| item.loose_eq(row_value)),
            PropertyValue::String(haystack) => row_value
                .as_str()
                .map(|needle| haystack.contains(needle))
                .unwrap_or(false),
            PropertyValue::Object(map) => row_value
                .as_str()
                .map(|key| map.contains_key(key))
                .unwrap_or(false),
            _ => false,
        }),
        FilterOp::Gt | FilterOp::Lt => {
            let threshold = filter.value.as_f64().ok_or_else(|| RecordError::NonNumericThreshold {
                field: filter.field.clone(),
                value: filter.value.to_string(),
            })?;
            Ok(match row_value.as_f64() {
                Some(n) if filter.op == FilterOp::Gt => n > threshold,
                Some(n) => n < threshold,
                None => false,
            })
        }
    }
}

/// Coerce a present, non-missing value.
fn coerce(column: &str, value: &PropertyValue, target: CoerceType) -> Result<PropertyValue, RecordError> {
    let failed = || RecordError::Coercion {
        column: column.to_string(),
        value: value.to_string(),
        target,
    };

    let as_number = || -> Option<f64> {
        match value {
            PropertyValue::String(s) => s.trim().parse::<f64>().ok(),
            PropertyValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            other => other.as_f64(),
        }
    };

    match target {
        CoerceType::Int => match value {
            PropertyValue::Int(n) => Ok(PropertyValue::Int(*n)),
            _ => as_number()
                .filter(|n| n.is_finite())
                .map(|n| PropertyValue::Int(n.trunc() as i64))
                .ok_or_else(failed),
        },
        CoerceType::Float => as_number().map(PropertyValue::Float).ok_or_else(failed),
        CoerceType::Bool => Ok(PropertyValue::Bool(match value {
            PropertyValue::Bool(b) => *b,
            PropertyValue::Int(n) => *n == 1,
            PropertyValue::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
            _ => false,
        })),
    }
}
