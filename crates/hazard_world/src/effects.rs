use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::EntityId;

/// A named status effect applied to exposed entities each evaluation tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEffect {
    pub name: String,
    pub duration_ms: u64,
    /// Zero-based; level 1 is amplifier 0.
    pub amplifier: u8,
}

impl StatusEffect {
    pub fn from_level(name: impl Into<String>, level: u8, duration_ms: u64) -> Self {
        Self {
            name: name.into(),
            duration_ms,
            amplifier: level.saturating_sub(1),
        }
    }

    pub fn level(&self) -> u16 {
        u16::from(self.amplifier) + 1
    }
}

/// Fire-and-forget application of status effects.
pub trait StatusEffectApplier: Send + Sync {
    fn apply(&self, entity_id: &str, effect: &StatusEffect);
}

#[derive(Debug, Clone, Default)]
pub struct RecordingEffectApplier {
    applied: Arc<Mutex<Vec<(EntityId, StatusEffect)>>>,
}

impl RecordingEffectApplier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<(EntityId, StatusEffect)> {
        self.applied.lock().expect("lock applied effects").clone()
    }

    pub fn applied_to(&self, entity_id: &str) -> Vec<StatusEffect> {
        self.applied()
            .into_iter()
            .filter(|(entity, _)| entity == entity_id)
            .map(|(_, effect)| effect)
            .collect()
    }

    pub fn clear(&self) {
        self.applied.lock().expect("lock applied effects").clear();
    }
}

impl StatusEffectApplier for RecordingEffectApplier {
    fn apply(&self, entity_id: &str, effect: &StatusEffect) {
        self.applied
            .lock()
            .expect("lock applied effects")
            .push((entity_id.to_string(), effect.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_maps_to_zero_based_amplifier() {
        let effect = StatusEffect::from_level("nausea", 2, 5_000);
        assert_eq!(effect.amplifier, 1);
        assert_eq!(effect.level(), 2);
        assert_eq!(StatusEffect::from_level("x", 0, 1).amplifier, 0);
    }

    #[test]
    fn recorder_filters_by_entity() {
        let applier = RecordingEffectApplier::new();
        let effect = StatusEffect::from_level("poison", 1, 5_000);
        applier.apply("p1", &effect);
        applier.apply("p2", &effect);
        assert_eq!(applier.applied_to("p1"), vec![effect]);
        applier.clear();
        assert!(applier.applied().is_empty());
    }
}
