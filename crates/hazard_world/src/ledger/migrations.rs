//! Ordered schema migrations applied to a ledger before it is read.
//!
//! Each step is a pure function over [`LedgerRecord`]; the ledger persists
//! the migrated record once the chain reaches [`LedgerSchema::Current`].

use hazard_world_proto::MitigationEffect;

use super::merge_effect;

pub const LEGACY_EFFECT_ID: &str = "__legacy_effect__";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerSchema {
    /// Single unnamed effect stored as two integer attachments.
    LegacySingleEffect,
    Current,
}

/// Everything stored for one entity's ledger, decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerRecord {
    pub effects: Vec<MitigationEffect>,
    pub legacy_initial_seconds: Option<i32>,
    pub legacy_seconds_left: Option<i32>,
}

impl LedgerRecord {
    pub fn schema(&self) -> LedgerSchema {
        if self.legacy_initial_seconds.is_some() || self.legacy_seconds_left.is_some() {
            LedgerSchema::LegacySingleEffect
        } else {
            LedgerSchema::Current
        }
    }
}

pub trait LedgerMigration: Send + Sync {
    fn name(&self) -> &'static str;

    fn from(&self) -> LedgerSchema;

    /// Must leave the record in a newer schema than [`Self::from`].
    fn apply(&self, record: LedgerRecord) -> LedgerRecord;
}

/// Folds the two legacy integers into a regular effect that applies in
/// every zone. Both values must be present and non-negative for an effect
/// to be synthesized; the legacy fields are dropped either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySingleEffectMigration;

impl LedgerMigration for LegacySingleEffectMigration {
    fn name(&self) -> &'static str {
        "legacy_single_effect"
    }

    fn from(&self) -> LedgerSchema {
        LedgerSchema::LegacySingleEffect
    }

    fn apply(&self, mut record: LedgerRecord) -> LedgerRecord {
        let initial = record.legacy_initial_seconds.take();
        let left = record.legacy_seconds_left.take();
        if let (Some(initial), Some(left)) = (initial, left) {
            if initial >= 0 && left >= 0 {
                let effect = MitigationEffect::restored(
                    LEGACY_EFFECT_ID,
                    i64::from(initial) * 1_000,
                    i64::from(left) * 1_000,
                    None,
                );
                merge_effect(&mut record.effects, effect);
            }
        }
        record
    }
}

#[derive(Clone)]
pub struct MigrationChain {
    steps: Vec<std::sync::Arc<dyn LedgerMigration>>,
}

impl std::fmt::Debug for MigrationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationChain")
            .field("steps", &self.step_names())
            .finish()
    }
}

impl Default for MigrationChain {
    fn default() -> Self {
        Self::new().with_step(LegacySingleEffectMigration)
    }
}

impl MigrationChain {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn with_step(mut self, step: impl LedgerMigration + 'static) -> Self {
        self.steps.push(std::sync::Arc::new(step));
        self
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Runs matching steps in order until the record is current. Returns the
    /// names of the steps that ran; an empty list means nothing changed.
    pub fn migrate(&self, mut record: LedgerRecord) -> (LedgerRecord, Vec<&'static str>) {
        let mut applied = Vec::new();
        for step in &self.steps {
            if record.schema() == LedgerSchema::Current {
                break;
            }
            if step.from() == record.schema() {
                record = step.apply(record);
                applied.push(step.name());
            }
        }
        (record, applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(initial: Option<i32>, left: Option<i32>) -> LedgerRecord {
        LedgerRecord {
            effects: Vec::new(),
            legacy_initial_seconds: initial,
            legacy_seconds_left: left,
        }
    }

    #[test]
    fn legacy_fields_become_one_unscoped_effect() {
        let (record, applied) = MigrationChain::default().migrate(legacy(Some(300), Some(120)));
        assert_eq!(applied, vec!["legacy_single_effect"]);
        assert_eq!(record.schema(), LedgerSchema::Current);
        assert_eq!(
            record.effects,
            vec![MitigationEffect::restored(
                LEGACY_EFFECT_ID,
                300_000,
                120_000,
                None
            )]
        );
    }

    #[test]
    fn migrating_twice_matches_migrating_once() {
        let chain = MigrationChain::default();
        let (once, _) = chain.migrate(legacy(Some(300), Some(120)));
        let (twice, applied) = chain.migrate(once.clone());
        assert_eq!(once, twice);
        assert!(applied.is_empty());
    }

    #[test]
    fn half_present_legacy_fields_are_dropped_without_effect() {
        let (record, applied) = MigrationChain::default().migrate(legacy(Some(300), None));
        assert_eq!(applied.len(), 1);
        assert!(record.effects.is_empty());
        assert_eq!(record.schema(), LedgerSchema::Current);

        let (record, _) = MigrationChain::default().migrate(legacy(Some(300), Some(-1)));
        assert!(record.effects.is_empty());
    }

    #[test]
    fn legacy_effect_merges_with_existing_entry() {
        let mut record = legacy(Some(300), Some(120));
        record.effects.push(MitigationEffect::restored(
            LEGACY_EFFECT_ID,
            600_000,
            200_000,
            None,
        ));
        let (record, _) = MigrationChain::default().migrate(record);
        assert_eq!(record.effects.len(), 1);
        assert_eq!(record.effects[0].initial_duration_ms, 300_000);
        assert_eq!(record.effects[0].remaining_ms, 200_000);
    }

    #[test]
    fn current_record_is_left_alone() {
        let record = LedgerRecord {
            effects: vec![MitigationEffect::new("a", 1_000, None)],
            ..LedgerRecord::default()
        };
        let (migrated, applied) = MigrationChain::default().migrate(record.clone());
        assert_eq!(migrated, record);
        assert!(applied.is_empty());
    }
}
