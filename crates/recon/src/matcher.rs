//! Tiered join of two datasets by normalized identity.
//!
//! Tiers are tried in order for each left entity; the first tier that yields
//! any candidate wins and lower tiers are not consulted for that entity.
//! Ties within a tier resolve to the first candidate in right-dataset order
//! and surface an [`AmbiguousMatch`] warning, never an error. Each right
//! entity is consumed by at most one match, so both sides partition cleanly
//! into matched and unmatched.

use crate::error::ReconcileError;
use crate::model::{AmbiguousMatch, Dataset, Entity, MatchResult, MatchTier, MatchedPair};

/// Caller-supplied matching policy: the ordered tier list plus the optional
/// attribute pair the `attribute_pair` tier compares on.
#[derive(Debug, Clone)]
pub struct MatchPolicy {
    pub tiers: Vec<MatchTier>,
    pub attribute_pair: Option<(String, String)>,
}

impl MatchPolicy {
    /// Exact-key-only policy, the common case.
    pub fn exact() -> Self {
        MatchPolicy {
            tiers: vec![MatchTier::ExactKey],
            attribute_pair: None,
        }
    }

    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.tiers.is_empty() {
            return Err(ReconcileError::Config(
                "match policy requires at least one tier".into(),
            ));
        }
        if self.tiers.contains(&MatchTier::AttributePair) && self.attribute_pair.is_none() {
            return Err(ReconcileError::Config(
                "attribute_pair tier requires an attribute pair".into(),
            ));
        }
        Ok(())
    }
}

/// Join two datasets on their normalized keys under a match policy.
///
/// Purely functional and deterministic: re-running on the same inputs yields
/// identical output.
pub fn join(
    left: &Dataset,
    right: &Dataset,
    policy: &MatchPolicy,
) -> Result<MatchResult, ReconcileError> {
    let (result, _) = join_with_outcomes(left, right, policy)?;
    Ok(result)
}

/// Join with caller-supplied key extraction, for datasets whose matching
/// identity is not the display name. The extracted keys feed the exact and
/// substring tiers in place of `normalized_key`.
pub fn join_with_keys<L, R>(
    left: &Dataset,
    right: &Dataset,
    left_key: L,
    right_key: R,
    policy: &MatchPolicy,
) -> Result<MatchResult, ReconcileError>
where
    L: Fn(&Entity) -> String,
    R: Fn(&Entity) -> String,
{
    let (result, _) = join_inner(left, right, &left_key, &right_key, policy)?;
    Ok(result)
}

/// Per-left outcome: index into the right dataset plus the tier that hit.
pub(crate) type Outcome = Option<(usize, MatchTier)>;

/// Join, also returning the outcome per left entity in left order. The
/// pipeline engine uses the outcomes to enrich entities without disturbing
/// the left dataset's ordering.
pub(crate) fn join_with_outcomes(
    left: &Dataset,
    right: &Dataset,
    policy: &MatchPolicy,
) -> Result<(MatchResult, Vec<Outcome>), ReconcileError> {
    join_inner(
        left,
        right,
        &|e: &Entity| e.normalized_key.clone(),
        &|e: &Entity| e.normalized_key.clone(),
        policy,
    )
}

fn join_inner(
    left: &Dataset,
    right: &Dataset,
    left_key: &dyn Fn(&Entity) -> String,
    right_key: &dyn Fn(&Entity) -> String,
    policy: &MatchPolicy,
) -> Result<(MatchResult, Vec<Outcome>), ReconcileError> {
    policy.validate()?;

    let right_keys: Vec<String> = right.entities.iter().map(|e| right_key(e)).collect();

    let mut right_used = vec![false; right.entities.len()];
    let mut outcomes: Vec<Outcome> = Vec::with_capacity(left.entities.len());
    let mut matched = Vec::new();
    let mut unmatched_left = Vec::new();
    let mut warnings = Vec::new();

    for l in &left.entities {
        let lk = left_key(l);
        let mut hit: Option<(usize, MatchTier, usize)> = None;

        for tier in &policy.tiers {
            let candidates: Vec<usize> = right
                .entities
                .iter()
                .enumerate()
                .filter(|(ri, r)| {
                    !right_used[*ri] && tier_matches(*tier, l, &lk, r, &right_keys[*ri], policy)
                })
                .map(|(ri, _)| ri)
                .collect();

            if !candidates.is_empty() {
                hit = Some((candidates[0], *tier, candidates.len()));
                break;
            }
        }

        match hit {
            Some((ri, tier, candidate_count)) => {
                right_used[ri] = true;
                if candidate_count > 1 {
                    warnings.push(AmbiguousMatch {
                        left_name: l.display_name.clone(),
                        tier,
                        candidates: candidate_count,
                        chosen: right.entities[ri].display_name.clone(),
                    });
                }
                matched.push(MatchedPair {
                    left: l.clone(),
                    right: right.entities[ri].clone(),
                    tier,
                });
                outcomes.push(Some((ri, tier)));
            }
            None => {
                unmatched_left.push(l.clone());
                outcomes.push(None);
            }
        }
    }

    let unmatched_right: Vec<Entity> = right
        .entities
        .iter()
        .enumerate()
        .filter(|(ri, _)| !right_used[*ri])
        .map(|(_, r)| r.clone())
        .collect();

    Ok((
        MatchResult {
            matched,
            unmatched_left,
            unmatched_right,
            warnings,
        },
        outcomes,
    ))
}

fn tier_matches(
    tier: MatchTier,
    left: &Entity,
    left_key: &str,
    right: &Entity,
    right_key: &str,
    policy: &MatchPolicy,
) -> bool {
    match tier {
        MatchTier::ExactKey => !left_key.is_empty() && left_key == right_key,
        MatchTier::Substring => {
            !left_key.is_empty()
                && !right_key.is_empty()
                && (left_key.contains(right_key) || right_key.contains(left_key))
        }
        MatchTier::AttributePair => {
            // Validated upstream; an unset pair matches nothing.
            let Some((first, second)) = &policy.attribute_pair else {
                return false;
            };
            let lf = left.attr_str(first).trim().to_lowercase();
            let ls = left.attr_str(second).trim().to_lowercase();
            if lf.is_empty() && ls.is_empty() {
                return false;
            }
            lf == right.attr_str(first).trim().to_lowercase()
                && ls == right.attr_str(second).trim().to_lowercase()
        }
    }
}
