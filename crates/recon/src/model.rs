use serde::Serialize;
use serde_json::{Map, Value};

use crate::normalize::normalize_key;

// ---------------------------------------------------------------------------
// Entity + Dataset
// ---------------------------------------------------------------------------

/// A real-world object (city, business, county) identified by a
/// human-entered display name and a derived matching key.
///
/// Entities are immutable snapshots: enrichment produces a new entity,
/// never mutates one in place.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub display_name: String,
    pub normalized_key: String,
    pub attributes: Map<String, Value>,
}

impl Entity {
    /// Build an entity; the matching key is derived from the display name.
    pub fn new(display_name: impl Into<String>, attributes: Map<String, Value>) -> Self {
        let display_name = display_name.into();
        let normalized_key = normalize_key(&display_name);
        Entity {
            display_name,
            normalized_key,
            attributes,
        }
    }

    /// String view of an attribute, empty when missing or non-string.
    pub fn attr_str(&self, name: &str) -> &str {
        self.attributes.get(name).and_then(Value::as_str).unwrap_or("")
    }

    /// Numeric view of an attribute. Accepts JSON numbers and numeric
    /// strings; `None` otherwise.
    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        match self.attributes.get(name) {
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// New entity with one attribute set (replacing any existing value).
    pub fn with_attribute(&self, key: &str, value: Value) -> Entity {
        let mut attributes = self.attributes.clone();
        attributes.insert(key.to_string(), value);
        Entity {
            display_name: self.display_name.clone(),
            normalized_key: self.normalized_key.clone(),
            attributes,
        }
    }

    /// New entity with the other entity's attributes unioned in.
    /// Existing attributes win on collision.
    pub fn with_merged_attributes(&self, other: &Map<String, Value>) -> Entity {
        let mut attributes = self.attributes.clone();
        for (k, v) in other {
            attributes.entry(k.clone()).or_insert_with(|| v.clone());
        }
        Entity {
            display_name: self.display_name.clone(),
            normalized_key: self.normalized_key.clone(),
            attributes,
        }
    }
}

/// A named, ordered sequence of entities sharing a semantic type.
#[derive(Debug, Clone, Serialize)]
pub struct Dataset {
    pub name: String,
    pub entities: Vec<Entity>,
}

impl Dataset {
    pub fn new(name: impl Into<String>, entities: Vec<Entity>) -> Self {
        Dataset {
            name: name.into(),
            entities,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Match outcome
// ---------------------------------------------------------------------------

/// Ordered matching strategies. First tier that yields any candidate for a
/// left entity wins; there is no fallthrough to a lower tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Normalized key equality.
    ExactKey,
    /// One side's non-empty normalized key contains the other's.
    Substring,
    /// Equality on a caller-named pair of attributes.
    AttributePair,
}

impl std::fmt::Display for MatchTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExactKey => write!(f, "exact_key"),
            Self::Substring => write!(f, "substring"),
            Self::AttributePair => write!(f, "attribute_pair"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchedPair {
    pub left: Entity,
    pub right: Entity,
    pub tier: MatchTier,
}

/// Non-fatal metadata: a tier produced several candidates and the first in
/// right-dataset order was chosen.
#[derive(Debug, Clone, Serialize)]
pub struct AmbiguousMatch {
    pub left_name: String,
    pub tier: MatchTier,
    pub candidates: usize,
    pub chosen: String,
}

/// Outcome of reconciling two datasets. Both unmatched sides are retained
/// and reported; missing data is never an error here.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub matched: Vec<MatchedPair>,
    pub unmatched_left: Vec<Entity>,
    pub unmatched_right: Vec<Entity>,
    pub warnings: Vec<AmbiguousMatch>,
}
