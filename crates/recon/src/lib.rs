//! `citymerge-recon`: dataset reconciliation engine for municipal data.
//!
//! Pure engine crate: receives pre-loaded JSON values, returns merged
//! entities and per-step reports. No CLI or IO dependencies.
//!
//! Three composable stages: key normalization ([`normalize`]), tiered
//! joining ([`matcher`]), and per-bucket aggregation ([`aggregate`]).
//! The [`engine`] module chains joins under a TOML-declared pipeline.

pub mod aggregate;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod summary;

pub use config::PipelineConfig;
pub use engine::{run, PipelineInput, PipelineResult};
pub use error::ReconcileError;
pub use matcher::{join, join_with_keys, MatchPolicy};
pub use model::{Dataset, Entity, MatchResult, MatchTier};
pub use normalize::normalize_key;
