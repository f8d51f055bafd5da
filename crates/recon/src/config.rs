use std::collections::HashMap;

use serde::Deserialize;

use crate::error::ReconcileError;
use crate::model::MatchTier;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// A merge pipeline: named input datasets, a base dataset, and an ordered
/// list of join steps that enrich the base.
#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    /// Dataset the pipeline starts from; every step joins against the
    /// running result of the previous one.
    pub base: String,
    pub datasets: HashMap<String, DatasetConfig>,
    pub steps: Vec<StepConfig>,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    pub shape: DatasetShape,
    /// Input file path, resolved by the caller (the engine never reads files).
    pub file: String,
    /// List-style: field holding the display name.
    #[serde(default = "default_name_field")]
    pub name_field: String,
    /// Dict-style: attribute key the payload lands under.
    #[serde(default = "default_payload_key")]
    pub payload_key: String,
    /// Label stripped from raw names before normalization.
    #[serde(default)]
    pub strip_suffix: Option<String>,
    /// Record trailing dagger markers as boolean attributes.
    #[serde(default)]
    pub markers: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetShape {
    List,
    Dict,
}

fn default_name_field() -> String {
    "city".into()
}

fn default_payload_key() -> String {
    "payload".into()
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct StepConfig {
    pub name: String,
    /// Right-hand dataset joined against the running result.
    pub right: String,
    #[serde(default = "default_tiers")]
    pub tiers: Vec<MatchTier>,
    /// Attributes compared by the `attribute_pair` tier.
    #[serde(default)]
    pub attribute_pair: Option<[String; 2]>,
    /// Attach the right payload under this key; omit to union attributes
    /// (existing values win).
    #[serde(default)]
    pub attach_as: Option<String>,
    /// Attach only this right attribute instead of the whole record.
    #[serde(default)]
    pub attach_field: Option<String>,
    /// Drop left entities that finish the step unmatched or with an empty
    /// payload. Off by default: incomplete records are retained.
    #[serde(default)]
    pub drop_if_empty: bool,
}

fn default_tiers() -> Vec<MatchTier> {
    vec![MatchTier::ExactKey]
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconcileError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| ReconcileError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if !self.datasets.contains_key(&self.base) {
            return Err(ReconcileError::UnknownDataset(format!(
                "base dataset '{}' not declared",
                self.base
            )));
        }

        if self.steps.is_empty() {
            return Err(ReconcileError::Config("at least one step is required".into()));
        }

        for step in &self.steps {
            if !self.datasets.contains_key(&step.right) {
                return Err(ReconcileError::UnknownDataset(format!(
                    "step '{}': right dataset '{}' not declared",
                    step.name, step.right
                )));
            }
            if step.tiers.is_empty() {
                return Err(ReconcileError::Config(format!(
                    "step '{}': tier list must not be empty",
                    step.name
                )));
            }
            if step.tiers.contains(&MatchTier::AttributePair) && step.attribute_pair.is_none() {
                return Err(ReconcileError::Config(format!(
                    "step '{}': attribute_pair tier requires attribute_pair",
                    step.name
                )));
            }
            if step.attach_field.is_some() && step.attach_as.is_none() {
                return Err(ReconcileError::Config(format!(
                    "step '{}': attach_field requires attach_as",
                    step.name
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "MN city merge"
base = "cities"

[datasets.cities]
shape = "list"
file = "basic_cities.json"
name_field = "city"
markers = true

[datasets.universities]
shape = "dict"
file = "mn_uni_by_city.json"
payload_key = "universities"

[datasets.demographics]
shape = "list"
file = "mn_demo_full.json"
name_field = "city"
strip_suffix = "Demographic Statistics"

[[steps]]
name = "attach_universities"
right = "universities"
tiers = ["exact_key"]
attach_as = "universities"
attach_field = "universities"

[[steps]]
name = "attach_demo"
right = "demographics"
tiers = ["exact_key", "substring"]

[output]
json = "cities_merged.json"
"#;

    #[test]
    fn parse_valid() {
        let config = PipelineConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "MN city merge");
        assert_eq!(config.base, "cities");
        assert_eq!(config.datasets.len(), 3);
        assert_eq!(config.steps.len(), 2);
        assert!(config.datasets["cities"].markers);
        assert_eq!(
            config.datasets["demographics"].strip_suffix.as_deref(),
            Some("Demographic Statistics")
        );
        assert_eq!(config.steps[0].attach_as.as_deref(), Some("universities"));
        assert!(config.steps[1].attach_as.is_none());
        assert_eq!(
            config.steps[1].tiers,
            vec![MatchTier::ExactKey, MatchTier::Substring]
        );
        assert_eq!(config.output.json.as_deref(), Some("cities_merged.json"));
    }

    #[test]
    fn tiers_default_to_exact_key() {
        let input = VALID.replace("tiers = [\"exact_key\", \"substring\"]\n", "");
        let config = PipelineConfig::from_toml(&input).unwrap();
        assert_eq!(config.steps[1].tiers, vec![MatchTier::ExactKey]);
    }

    #[test]
    fn reject_unknown_base() {
        let input = VALID.replace("base = \"cities\"", "base = \"townships\"");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("townships"));
    }

    #[test]
    fn reject_unknown_right_dataset() {
        let input = VALID.replace("right = \"demographics\"", "right = \"census\"");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("census"));
    }

    #[test]
    fn reject_empty_tiers() {
        let input = VALID.replace(
            "tiers = [\"exact_key\", \"substring\"]",
            "tiers = []",
        );
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("tier list must not be empty"));
    }

    #[test]
    fn reject_attribute_pair_tier_without_pair() {
        let input = VALID.replace(
            "tiers = [\"exact_key\", \"substring\"]",
            "tiers = [\"attribute_pair\"]",
        );
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("requires attribute_pair"));
    }

    #[test]
    fn reject_attach_field_without_attach_as() {
        let input = VALID.replace("attach_as = \"universities\"\n", "");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("attach_field requires attach_as"));
    }

    #[test]
    fn reject_bad_tier_name() {
        let input = VALID.replace("\"substring\"", "\"levenshtein\"");
        let err = PipelineConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconcileError::ConfigParse(_)));
    }
}
