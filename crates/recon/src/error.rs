use std::fmt;

#[derive(Debug)]
pub enum ReconcileError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty tier list, bad dataset reference, etc.).
    Config(String),
    /// A referenced dataset has no loaded data.
    UnknownDataset(String),
    /// Input JSON does not conform to its declared shape.
    Shape {
        dataset: String,
        expected: &'static str,
        found: &'static str,
    },
    /// A record is missing the field that names its entity.
    MissingField { dataset: String, field: String },
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::Config(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownDataset(name) => write!(f, "unknown dataset: {name}"),
            Self::Shape { dataset, expected, found } => {
                write!(f, "dataset '{dataset}': expected {expected}, found {found}")
            }
            Self::MissingField { dataset, field } => {
                write!(f, "dataset '{dataset}': record missing field '{field}'")
            }
        }
    }
}

impl std::error::Error for ReconcileError {}
