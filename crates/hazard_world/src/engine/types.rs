use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::display::DisplayDelta;
use crate::types::{EffectId, EntityId, ZoneId};

/// Per (entity, zone) exposure state, recomputed every evaluation tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneState {
    #[default]
    Safe,
    /// Matched, but a listener cancelled and kept the warning visible.
    Warned,
    Exposed,
}

impl ZoneState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneState::Safe => "safe",
            ZoneState::Warned => "warned",
            ZoneState::Exposed => "exposed",
        }
    }

    pub fn shows_indicator(&self) -> bool {
        !matches!(self, ZoneState::Safe)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearReason {
    Death,
    Cure,
    Resurrection,
}

impl ClearReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClearReason::Death => "death",
            ClearReason::Cure => "cure",
            ClearReason::Resurrection => "resurrection",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTransition {
    pub entity_id: EntityId,
    pub zone_id: ZoneId,
    pub from: ZoneState,
    pub to: ZoneState,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntity {
    pub entity_id: EntityId,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EvaluationReport {
    pub tick: u64,
    pub evaluated: usize,
    /// Only entries whose state changed this tick.
    pub transitions: Vec<ZoneTransition>,
    pub skipped: Vec<SkippedEntity>,
    pub broadcasts: usize,
    pub display: BTreeMap<EntityId, DisplayDelta>,
}

impl EvaluationReport {
    pub fn transitions_for(&self, entity_id: &str) -> Vec<&ZoneTransition> {
        self.transitions
            .iter()
            .filter(|transition| transition.entity_id == entity_id)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiredEffect {
    pub entity_id: EntityId,
    pub effect_id: EffectId,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DecayReport {
    pub tick: u64,
    pub elapsed_ms: i64,
    pub decayed: usize,
    pub expired: Vec<ExpiredEffect>,
    pub skipped: Vec<SkippedEntity>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AdvanceReport {
    pub evaluations: Vec<EvaluationReport>,
    pub decays: Vec<DecayReport>,
}

impl AdvanceReport {
    pub fn is_empty(&self) -> bool {
        self.evaluations.is_empty() && self.decays.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSnapshot {
    pub zone_id: ZoneId,
    pub affected: Vec<EntityId>,
    pub warned: Vec<EntityId>,
}

/// Serializable view of the engine for status output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExposureSnapshot {
    pub evaluation_ticks: u64,
    pub decay_ticks: u64,
    pub connected: Vec<EntityId>,
    pub zones: Vec<ZoneSnapshot>,
    pub live_indicators: usize,
}

impl ExposureSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
