use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

use crate::config::{DatasetConfig, DatasetShape, PipelineConfig, StepConfig};
use crate::dataset::{from_dict, from_list, ExtractOptions};
use crate::error::ReconcileError;
use crate::matcher::{join_with_outcomes, MatchPolicy};
use crate::model::{Dataset, Entity};
use crate::summary::{step_report, StepReport};

/// Pre-parsed JSON values keyed by dataset name. Loading files is the
/// caller's concern; the engine only sees resident values.
pub struct PipelineInput {
    pub datasets: HashMap<String, Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub meta: RunMeta,
    pub steps: Vec<StepReport>,
    pub entities: Vec<Entity>,
}

/// Run the pipeline: build the base dataset, then fold each step's join
/// into it, preserving base-dataset entity order throughout.
pub fn run(config: &PipelineConfig, input: &PipelineInput) -> Result<PipelineResult, ReconcileError> {
    config.validate()?;

    let mut current = build_dataset(&config.base, config, input)?;
    let mut steps: Vec<StepReport> = Vec::with_capacity(config.steps.len());

    for step in &config.steps {
        let right = build_dataset(&step.right, config, input)?;
        let policy = MatchPolicy {
            tiers: step.tiers.clone(),
            attribute_pair: step
                .attribute_pair
                .as_ref()
                .map(|[a, b]| (a.clone(), b.clone())),
        };

        let (result, outcomes) = join_with_outcomes(&current, &right, &policy)?;
        steps.push(step_report(&step.name, &current.name, &right.name, &result));

        let mut entities = Vec::with_capacity(current.entities.len());
        for (l, outcome) in current.entities.iter().zip(&outcomes) {
            match outcome {
                Some((ri, _)) => {
                    let enriched = enrich(l, &right.entities[*ri], step);
                    if step.drop_if_empty && attached_payload_is_empty(&enriched, step) {
                        continue;
                    }
                    entities.push(enriched);
                }
                None => {
                    if !step.drop_if_empty {
                        entities.push(l.clone());
                    }
                }
            }
        }
        current = Dataset::new(current.name.clone(), entities);
    }

    Ok(PipelineResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        steps,
        entities: current.entities,
    })
}

fn build_dataset(
    name: &str,
    config: &PipelineConfig,
    input: &PipelineInput,
) -> Result<Dataset, ReconcileError> {
    let dataset_config: &DatasetConfig = config
        .datasets
        .get(name)
        .ok_or_else(|| ReconcileError::UnknownDataset(name.to_string()))?;
    let value = input
        .datasets
        .get(name)
        .ok_or_else(|| ReconcileError::UnknownDataset(format!("{name} (no data loaded)")))?;

    let opts = ExtractOptions {
        name_field: dataset_config.name_field.clone(),
        payload_key: dataset_config.payload_key.clone(),
        strip_suffix: dataset_config.strip_suffix.clone(),
        markers: dataset_config.markers,
    };

    match dataset_config.shape {
        DatasetShape::List => from_list(name, value, &opts),
        DatasetShape::Dict => from_dict(name, value, &opts),
    }
}

/// Enrichment never mutates: it produces a new entity with either the right
/// record's attributes unioned in (existing values win) or its payload
/// attached under `attach_as`.
fn enrich(left: &Entity, right: &Entity, step: &StepConfig) -> Entity {
    match &step.attach_as {
        None => left.with_merged_attributes(&right.attributes),
        Some(key) => {
            let payload = match &step.attach_field {
                Some(field) => right.attributes.get(field).cloned().unwrap_or(Value::Null),
                None => Value::Object(right.attributes.clone()),
            };
            left.with_attribute(key, payload)
        }
    }
}

fn attached_payload_is_empty(entity: &Entity, step: &StepConfig) -> bool {
    match &step.attach_as {
        Some(key) => entity.attributes.get(key).map(value_is_empty).unwrap_or(true),
        // Union mode has no single payload to inspect.
        None => false,
    }
}

fn value_is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty() || o.values().all(value_is_empty),
        _ => false,
    }
}

/// Convenience for callers assembling input values by hand.
impl PipelineInput {
    pub fn new() -> Self {
        PipelineInput {
            datasets: HashMap::new(),
        }
    }

    pub fn with_dataset(mut self, name: impl Into<String>, value: Value) -> Self {
        self.datasets.insert(name.into(), value);
        self
    }
}

impl Default for PipelineInput {
    fn default() -> Self {
        Self::new()
    }
}
