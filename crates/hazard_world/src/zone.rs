//! Zone membership: capability boundary and matchers built on it.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CapabilityUnavailable;
use crate::geometry::{VerticalBounds, WorldPos};
use crate::types::{immunity_permission, normalize_zone_id, WorldId, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityLocation {
    pub world: WorldId,
    pub pos: WorldPos,
}

/// Host view of connected entities.
pub trait EntityDirectory: Send + Sync {
    fn locate(&self, entity_id: &str) -> Option<EntityLocation>;

    fn display_name(&self, _entity_id: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneQueryResult {
    pub hazardous: bool,
    pub classification: Option<String>,
}

impl ZoneQueryResult {
    pub fn safe() -> Self {
        Self::default()
    }

    pub fn hazardous(classification: Option<&str>) -> Self {
        Self {
            hazardous: true,
            classification: classification.map(str::to_string),
        }
    }
}

pub trait SpatialZoneQuery: Send + Sync {
    fn vertical_bounds(&self, world: &str) -> Result<VerticalBounds, CapabilityUnavailable>;

    fn query(&self, world: &str, pos: WorldPos) -> Result<ZoneQueryResult, CapabilityUnavailable>;
}

pub trait PermissionCheck: Send + Sync {
    fn has_permission(&self, entity_id: &str, node: &str) -> bool;
}

/// Membership test for a single zone, evaluated fresh on every call.
pub trait ZoneMatcher: Send + Sync {
    fn test(&self, entity_id: &str) -> bool;
}

impl<F> ZoneMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn test(&self, entity_id: &str) -> bool {
        self(entity_id)
    }
}

/// What a matcher answers while its spatial capability is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityPolicy {
    /// Treat the entity as outside the zone.
    #[default]
    FailOpen,
    /// Treat the entity as inside the zone.
    FailClosed,
}

impl CapabilityPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityPolicy::FailOpen => "fail_open",
            CapabilityPolicy::FailClosed => "fail_closed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail_open" => Some(CapabilityPolicy::FailOpen),
            "fail_closed" => Some(CapabilityPolicy::FailClosed),
            _ => None,
        }
    }
}

/// Matches entities standing where the spatial query reports a hazard flag
/// whose classification this matcher accepts, unless the entity holds the
/// immunity permission for that classification.
#[derive(Clone)]
pub struct FlagMatcher {
    directory: Arc<dyn EntityDirectory>,
    query: Arc<dyn SpatialZoneQuery>,
    permissions: Arc<dyn PermissionCheck>,
    accepted: BTreeSet<ZoneId>,
    policy: CapabilityPolicy,
}

impl std::fmt::Debug for FlagMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlagMatcher")
            .field("accepted", &self.accepted)
            .field("policy", &self.policy)
            .finish()
    }
}

impl FlagMatcher {
    pub fn new(
        directory: Arc<dyn EntityDirectory>,
        query: Arc<dyn SpatialZoneQuery>,
        permissions: Arc<dyn PermissionCheck>,
        accepted: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        Self {
            directory,
            query,
            permissions,
            accepted: accepted
                .into_iter()
                .map(|id| normalize_zone_id(id.as_ref()))
                .collect(),
            policy: CapabilityPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn accepted(&self) -> &BTreeSet<ZoneId> {
        &self.accepted
    }

    /// The matched classification, `None` when the entity is not affected.
    pub fn evaluate(&self, entity_id: &str) -> Result<Option<ZoneId>, CapabilityUnavailable> {
        let Some(location) = self.directory.locate(entity_id) else {
            return Ok(None);
        };
        let bounds = self.query.vertical_bounds(&location.world)?;
        if !bounds.is_finite() {
            return Err(CapabilityUnavailable::new(
                "spatial zone query",
                format!("non-finite vertical bounds for world {}", location.world),
            ));
        }
        let result = self.query.query(&location.world, bounds.clamp(location.pos))?;
        if !result.hazardous {
            return Ok(None);
        }
        let classification = normalize_zone_id(result.classification.as_deref().unwrap_or(""));
        if !self.accepted.contains(&classification) {
            return Ok(None);
        }
        if self
            .permissions
            .has_permission(entity_id, &immunity_permission(&classification))
        {
            return Ok(None);
        }
        Ok(Some(classification))
    }
}

impl ZoneMatcher for FlagMatcher {
    fn test(&self, entity_id: &str) -> bool {
        match self.evaluate(entity_id) {
            Ok(matched) => matched.is_some(),
            Err(err) => {
                warn!(
                    entity_id,
                    policy = self.policy.as_str(),
                    error = %err,
                    "zone query unavailable"
                );
                self.policy == CapabilityPolicy::FailClosed
            }
        }
    }
}
