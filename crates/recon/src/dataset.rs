//! Build [`Dataset`]s from raw JSON values.
//!
//! Source files come in two shapes: *list-style* (an array of records, the
//! name inside each record) and *dict-style* (an object mapping display name
//! to a payload). The caller declares which shape each input uses; everything
//! downstream is shape-agnostic.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::ReconcileError;
use crate::model::{Dataset, Entity};
use crate::normalize::{strip_markers, strip_suffix_label};

/// Extraction options for one input, as declared by the caller.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// List-style: field holding the display name.
    pub name_field: String,
    /// Dict-style: attribute key the payload lands under.
    pub payload_key: String,
    /// Label removed from raw names before normalization.
    pub strip_suffix: Option<String>,
    /// Record trailing dagger markers as boolean attributes.
    pub markers: bool,
}

/// JSON type name for shape errors.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Build a dataset from a list-style value: an array of objects, each
/// carrying its display name in `opts.name_field`.
pub fn from_list(
    dataset_name: &str,
    value: &Value,
    opts: &ExtractOptions,
) -> Result<Dataset, ReconcileError> {
    let records = value.as_array().ok_or(ReconcileError::Shape {
        dataset: dataset_name.to_string(),
        expected: "array",
        found: kind_of(value),
    })?;

    let mut entities = Vec::with_capacity(records.len());
    for record in records {
        let obj = record.as_object().ok_or(ReconcileError::Shape {
            dataset: dataset_name.to_string(),
            expected: "object",
            found: kind_of(record),
        })?;
        let raw_name = obj
            .get(&opts.name_field)
            .and_then(Value::as_str)
            .ok_or_else(|| ReconcileError::MissingField {
                dataset: dataset_name.to_string(),
                field: opts.name_field.clone(),
            })?;
        entities.push(build_entity(raw_name, obj.clone(), &opts.name_field, opts));
    }

    Ok(Dataset::new(dataset_name, entities))
}

/// Build a dataset from a dict-style value: an object mapping display name
/// to payload. The payload lands under `opts.payload_key`.
pub fn from_dict(
    dataset_name: &str,
    value: &Value,
    opts: &ExtractOptions,
) -> Result<Dataset, ReconcileError> {
    let map = value.as_object().ok_or(ReconcileError::Shape {
        dataset: dataset_name.to_string(),
        expected: "object",
        found: kind_of(value),
    })?;

    let mut entities = Vec::with_capacity(map.len());
    for (raw_name, payload) in map {
        let mut attributes = Map::new();
        attributes.insert(opts.payload_key.clone(), payload.clone());
        entities.push(build_entity(raw_name, attributes, "", opts));
    }

    Ok(Dataset::new(dataset_name, entities))
}

fn build_entity(
    raw_name: &str,
    mut attributes: Map<String, Value>,
    name_field: &str,
    opts: &ExtractOptions,
) -> Entity {
    let labeled = match &opts.strip_suffix {
        Some(suffix) => strip_suffix_label(raw_name, suffix),
        None => raw_name.trim().to_string(),
    };
    let (clean, markers) = strip_markers(&labeled);

    if !name_field.is_empty() {
        attributes.insert(name_field.to_string(), Value::String(clean.clone()));
    }
    if opts.markers {
        attributes.insert("is_county_seat".into(), Value::Bool(markers.county_seat));
        attributes.insert("is_state_capital".into(), Value::Bool(markers.state_capital));
    }

    Entity::new(clean, attributes)
}

/// Display names that collapse to the same normalized key. Keys with a
/// single spelling are omitted.
pub fn find_duplicate_keys(dataset: &Dataset) -> BTreeMap<String, Vec<String>> {
    let mut by_key: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entity in &dataset.entities {
        by_key
            .entry(entity.normalized_key.clone())
            .or_default()
            .push(entity.display_name.clone());
    }
    by_key.retain(|_, names| names.len() > 1);
    by_key
}
