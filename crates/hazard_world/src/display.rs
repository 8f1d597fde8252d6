//! Keeps each entity attached to exactly the indicators it should see.
//!
//! Zone indicators are shared by every entity warned about or exposed to
//! the zone. Mitigation indicators carry per-entity progress, so each entity
//! gets its own. Either kind is destroyed when its last entity detaches.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::indicator::{IndicatorHandle, IndicatorService, IndicatorTemplate, IndicatorTemplates};
use crate::messages::{DARK_RED, GREEN};
use crate::types::{EffectId, EntityId, ZoneId};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum IndicatorKey {
    Zone(ZoneId),
    Effect(EffectId),
}

impl IndicatorKey {
    pub fn label(&self) -> String {
        match self {
            IndicatorKey::Zone(id) => format!("zone:{id}"),
            IndicatorKey::Effect(id) => format!("effect:{id}"),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, IndicatorKey::Zone(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DesiredIndicator {
    pub key: IndicatorKey,
    pub progress: f64,
}

impl DesiredIndicator {
    pub fn zone(zone_id: &str) -> Self {
        Self {
            key: IndicatorKey::Zone(zone_id.to_string()),
            progress: 1.0,
        }
    }

    pub fn effect(effect_id: &str, progress: f64) -> Self {
        Self {
            key: IndicatorKey::Effect(effect_id.to_string()),
            progress: progress.clamp(0.0, 1.0),
        }
    }
}

/// Keys an entity is currently attached to.
pub type DisplayState = BTreeSet<IndicatorKey>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct DisplayDelta {
    pub attached: Vec<IndicatorKey>,
    pub detached: Vec<IndicatorKey>,
    pub created: usize,
    pub destroyed: usize,
}

impl DisplayDelta {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct PoolKey {
    owner: Option<EntityId>,
    key: IndicatorKey,
}

impl PoolKey {
    fn new(entity_id: &str, key: &IndicatorKey) -> Self {
        Self {
            owner: (!key.is_shared()).then(|| entity_id.to_string()),
            key: key.clone(),
        }
    }
}

struct PooledIndicator {
    handle: Box<dyn IndicatorHandle>,
    attached: BTreeSet<EntityId>,
}

pub struct DisplayReconciler {
    service: Arc<dyn IndicatorService>,
    zone_templates: IndicatorTemplates,
    effect_templates: IndicatorTemplates,
    pool: BTreeMap<PoolKey, PooledIndicator>,
    states: BTreeMap<EntityId, DisplayState>,
}

impl std::fmt::Debug for DisplayReconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayReconciler")
            .field("zone_template_count", &self.zone_templates.len())
            .field("effect_template_count", &self.effect_templates.len())
            .field("live_indicator_count", &self.pool.len())
            .field("entity_count", &self.states.len())
            .finish()
    }
}

impl DisplayReconciler {
    pub fn new(service: Arc<dyn IndicatorService>, effect_templates: IndicatorTemplates) -> Self {
        Self {
            service,
            zone_templates: IndicatorTemplates::new(BTreeMap::new(), IndicatorTemplate::default()),
            effect_templates,
            pool: BTreeMap::new(),
            states: BTreeMap::new(),
        }
    }

    pub fn set_zone_template(&mut self, zone_id: &str, template: IndicatorTemplate) {
        self.zone_templates.insert(zone_id, template);
    }

    pub fn state(&self, entity_id: &str) -> Option<&DisplayState> {
        self.states.get(entity_id)
    }

    pub fn live_indicator_count(&self) -> usize {
        self.pool.len()
    }

    /// Entities attached to the indicator `key` resolves to for `entity_id`.
    pub fn attached(&self, entity_id: &str, key: &IndicatorKey) -> Vec<EntityId> {
        self.pool
            .get(&PoolKey::new(entity_id, key))
            .map(|pooled| pooled.attached.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn reconcile(&mut self, entity_id: &str, desired: &[DesiredIndicator]) -> DisplayDelta {
        let mut delta = DisplayDelta::default();
        let wanted: DisplayState = desired.iter().map(|item| item.key.clone()).collect();
        let current = self.states.remove(entity_id).unwrap_or_default();

        for key in current.difference(&wanted) {
            self.detach(entity_id, key, &mut delta);
        }

        for item in desired {
            let pooled = match self.pool.entry(PoolKey::new(entity_id, &item.key)) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let template = match &item.key {
                        IndicatorKey::Zone(id) => self.zone_templates.resolve(id).prefixed(DARK_RED),
                        IndicatorKey::Effect(id) => {
                            self.effect_templates.resolve(id).prefixed(GREEN)
                        }
                    };
                    delta.created += 1;
                    entry.insert(PooledIndicator {
                        handle: self.service.create(&template),
                        attached: BTreeSet::new(),
                    })
                }
            };
            pooled.handle.set_progress(item.progress);
            if pooled.attached.insert(entity_id.to_string()) {
                pooled.handle.attach(entity_id);
                delta.attached.push(item.key.clone());
            }
        }

        if !wanted.is_empty() {
            self.states.insert(entity_id.to_string(), wanted);
        }
        if !delta.is_empty() {
            debug!(
                entity_id,
                attached = delta.attached.len(),
                detached = delta.detached.len(),
                "display reconciled"
            );
        }
        delta
    }

    /// Detaches the entity from everything and forgets its state.
    pub fn disconnect(&mut self, entity_id: &str) -> DisplayDelta {
        let mut delta = DisplayDelta::default();
        if let Some(state) = self.states.remove(entity_id) {
            for key in &state {
                self.detach(entity_id, key, &mut delta);
            }
        }
        delta
    }

    /// Detaches every entity from every indicator and destroys them all.
    pub fn shutdown(&mut self) -> usize {
        let destroyed = self.pool.len();
        for (_, pooled) in std::mem::take(&mut self.pool) {
            pooled.handle.detach_all();
        }
        self.states.clear();
        destroyed
    }

    fn detach(&mut self, entity_id: &str, key: &IndicatorKey, delta: &mut DisplayDelta) {
        let pool_key = PoolKey::new(entity_id, key);
        let Some(pooled) = self.pool.get_mut(&pool_key) else {
            return;
        };
        if pooled.attached.remove(entity_id) {
            pooled.handle.detach(entity_id);
            delta.detached.push(key.clone());
        }
        if pooled.attached.is_empty() {
            if let Some(pooled) = self.pool.remove(&pool_key) {
                pooled.handle.detach_all();
                delta.destroyed += 1;
            }
        }
    }
}
