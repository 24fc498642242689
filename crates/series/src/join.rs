//! Companion join: exactly one auxiliary raster per scene

use cosecha_core::{Companion, Scene};

use crate::config::RetryPolicy;
use crate::error::{Result, SeriesError};
use crate::retry::with_backoff;
use crate::sources::{CompanionKey, CompanionSource};

/// Associate a scene with its single companion cloud-probability
/// raster.
///
/// Lookup is by scene id first, then by exact timestamp when the id
/// yields nothing. Zero or multiple matches are both
/// `MissingCompanion`: an ambiguous join is an error, never a silent
/// pick. Source failures retry within the policy budget and surface as
/// `BackendUnavailable`.
pub fn join_companion(
    scene: &Scene,
    source: &dyn CompanionSource,
    policy: &RetryPolicy,
) -> Result<Companion> {
    let by_id = lookup(source, &CompanionKey::Id(scene.id().to_string()), policy)?;

    let mut candidates = by_id;
    if candidates.is_empty() {
        candidates = lookup(source, &CompanionKey::Timestamp(scene.timestamp()), policy)?;
    }

    match candidates.len() {
        1 => Ok(candidates.remove(0)),
        n => Err(SeriesError::MissingCompanion {
            id: scene.id().to_string(),
            candidates: n,
        }),
    }
}

fn lookup(
    source: &dyn CompanionSource,
    key: &CompanionKey,
    policy: &RetryPolicy,
) -> Result<Vec<Companion>> {
    with_backoff(policy, |_| true, || source.matches(key)).map_err(|err| {
        SeriesError::BackendUnavailable {
            what: "companion source",
            attempts: policy.max_retries + 1,
            reason: err.to_string(),
        }
    })
}
