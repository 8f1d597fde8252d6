//! Durable per-entity list of mitigation effects.

mod migrations;

use std::sync::Arc;

use hazard_world_proto::{decode_effects, encode_effects, EffectId, MitigationEffect};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::store::{AttachmentStore, AttachmentValue};

pub use migrations::{
    LedgerMigration, LedgerRecord, LedgerSchema, LegacySingleEffectMigration, MigrationChain,
    LEGACY_EFFECT_ID,
};

pub const DEFAULT_LEDGER_NAMESPACE: &str = "hazard";

/// Attachment keys the ledger owns, all under one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerKeys {
    pub effect_data: String,
    pub legacy_initial_seconds: String,
    pub legacy_seconds_left: String,
}

impl LedgerKeys {
    pub fn namespaced(namespace: &str) -> Self {
        Self {
            effect_data: format!("{namespace}:effect_data"),
            legacy_initial_seconds: format!("{namespace}:initial_seconds"),
            legacy_seconds_left: format!("{namespace}:seconds_left"),
        }
    }
}

impl Default for LedgerKeys {
    fn default() -> Self {
        Self::namespaced(DEFAULT_LEDGER_NAMESPACE)
    }
}

/// Inserts `effect`, or merges it into the entry with the same id in place.
/// Returns true when an existing entry was replaced.
pub(crate) fn merge_effect(effects: &mut Vec<MitigationEffect>, effect: MitigationEffect) -> bool {
    match effects.iter_mut().find(|existing| existing.id == effect.id) {
        Some(existing) => {
            *existing = existing.merged_with(&effect);
            true
        }
        None => {
            effects.push(MitigationEffect::restored(
                effect.id,
                effect.initial_duration_ms,
                effect.remaining_ms,
                effect.zone_ids,
            ));
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecayOutcome {
    pub remaining: Vec<MitigationEffect>,
    pub expired: Vec<EffectId>,
}

#[derive(Clone)]
pub struct MitigationLedger {
    store: Arc<dyn AttachmentStore + Send + Sync>,
    keys: LedgerKeys,
    migrations: MigrationChain,
}

impl std::fmt::Debug for MitigationLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MitigationLedger")
            .field("keys", &self.keys)
            .field("migrations", &self.migrations)
            .finish()
    }
}

impl MitigationLedger {
    pub fn new(store: Arc<dyn AttachmentStore + Send + Sync>) -> Self {
        Self::with_keys(store, LedgerKeys::default())
    }

    pub fn with_keys(store: Arc<dyn AttachmentStore + Send + Sync>, keys: LedgerKeys) -> Self {
        Self {
            store,
            keys,
            migrations: MigrationChain::default(),
        }
    }

    pub fn with_migrations(mut self, migrations: MigrationChain) -> Self {
        self.migrations = migrations;
        self
    }

    pub fn keys(&self) -> &LedgerKeys {
        &self.keys
    }

    /// Adds an effect, merging with an existing one of the same id. The whole
    /// list is encoded before the single store write, so a failure leaves the
    /// stored ledger untouched.
    pub fn append(&self, entity_id: &str, effect: MitigationEffect) -> Result<(), StorageError> {
        let mut effects = self.read_effects(entity_id)?;
        let replaced = merge_effect(&mut effects, effect);
        self.write_effects(entity_id, &effects)?;
        debug!(entity_id, replaced, count = effects.len(), "mitigation effect appended");
        Ok(())
    }

    /// Live effects in insertion order, after migrating any legacy fields.
    pub fn list(&self, entity_id: &str) -> Result<Vec<MitigationEffect>, StorageError> {
        self.migrate(entity_id)?;
        Ok(self
            .read_effects(entity_id)?
            .into_iter()
            .filter(|effect| !effect.is_expired())
            .collect())
    }

    pub fn clear_all(&self, entity_id: &str) -> Result<(), StorageError> {
        self.store.remove(entity_id, &self.keys.effect_data)?;
        self.store.remove(entity_id, &self.keys.legacy_initial_seconds)?;
        self.store.remove(entity_id, &self.keys.legacy_seconds_left)?;
        Ok(())
    }

    /// Ages every live effect by `elapsed_ms` and persists the survivors. An
    /// emptied ledger is cleared rather than written.
    pub fn decay(&self, entity_id: &str, elapsed_ms: i64) -> Result<DecayOutcome, StorageError> {
        let mut outcome = DecayOutcome::default();
        for effect in self.list(entity_id)? {
            let aged = effect.elapsed(elapsed_ms);
            if aged.is_expired() {
                outcome.expired.push(aged.id);
            } else {
                outcome.remaining.push(aged);
            }
        }
        self.write_effects(entity_id, &outcome.remaining)?;
        Ok(outcome)
    }

    pub fn can_enter(effect: &MitigationEffect, zone_id: &str) -> bool {
        effect.can_enter(zone_id)
    }

    /// Decoded view of everything stored for the entity, expired entries and
    /// legacy fields included.
    pub fn read_record(&self, entity_id: &str) -> Result<LedgerRecord, StorageError> {
        Ok(LedgerRecord {
            effects: self.read_effects(entity_id)?,
            legacy_initial_seconds: self.read_int(entity_id, &self.keys.legacy_initial_seconds)?,
            legacy_seconds_left: self.read_int(entity_id, &self.keys.legacy_seconds_left)?,
        })
    }

    fn migrate(&self, entity_id: &str) -> Result<(), StorageError> {
        let record = self.read_record(entity_id)?;
        if record.schema() == LedgerSchema::Current {
            return Ok(());
        }
        let (record, applied) = self.migrations.migrate(record);
        // Blob first: if removing the legacy keys fails, the next read merges
        // the same effect again, which is a no-op.
        self.write_effects(entity_id, &record.effects)?;
        self.store
            .remove(entity_id, &self.keys.legacy_initial_seconds)?;
        self.store.remove(entity_id, &self.keys.legacy_seconds_left)?;
        info!(entity_id, steps = ?applied, "migrated mitigation ledger");
        Ok(())
    }

    fn read_effects(&self, entity_id: &str) -> Result<Vec<MitigationEffect>, StorageError> {
        match self.store.get(entity_id, &self.keys.effect_data)? {
            None => Ok(Vec::new()),
            Some(AttachmentValue::Bytes(bytes)) => Ok(decode_effects(&bytes)?),
            Some(other) => Err(StorageError::UnexpectedValue {
                key: self.keys.effect_data.clone(),
                expected: "bytes",
                found: other.kind(),
            }),
        }
    }

    fn read_int(&self, entity_id: &str, key: &str) -> Result<Option<i32>, StorageError> {
        match self.store.get(entity_id, key)? {
            None => Ok(None),
            Some(AttachmentValue::Int(value)) => Ok(Some(value)),
            Some(other) => Err(StorageError::UnexpectedValue {
                key: key.to_string(),
                expected: "int",
                found: other.kind(),
            }),
        }
    }

    fn write_effects(
        &self,
        entity_id: &str,
        effects: &[MitigationEffect],
    ) -> Result<(), StorageError> {
        if effects.is_empty() {
            return self.clear_all(entity_id);
        }
        let bytes = encode_effects(effects)?;
        self.store
            .set(entity_id, &self.keys.effect_data, AttachmentValue::Bytes(bytes))
    }
}
