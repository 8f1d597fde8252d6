//! ExposureEngine: zone evaluation, mitigation decay and indicator upkeep.

mod schedule;
mod types;

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{EngineConfig, HazardConfig, ZoneDescriptor};
use crate::display::{DesiredIndicator, DisplayDelta, DisplayReconciler};
use crate::effects::StatusEffectApplier;
use crate::error::{EngineError, StorageError};
use crate::event::{
    ledger_consult_listener, EvaluationContext, HazardEvaluationEvent, HazardListenerRegistry,
    HazardOutcome, ListenerPriority,
};
use crate::indicator::{IndicatorService, IndicatorTemplates};
use crate::ledger::MitigationLedger;
use crate::messages::{format_template, MessageSink, RED, RESET};
use crate::store::AttachmentStore;
use crate::types::{EntityId, ZoneId};
use crate::zone::{EntityDirectory, FlagMatcher, PermissionCheck, SpatialZoneQuery, ZoneMatcher};

pub use schedule::{TickKind, TickSchedule};
pub use types::{
    AdvanceReport, ClearReason, DecayReport, EvaluationReport, ExpiredEffect, ExposureSnapshot,
    SkippedEntity, ZoneSnapshot, ZoneState, ZoneTransition,
};

pub const LEDGER_CONSULT_LISTENER: &str = "ledger_consult";

/// Host capabilities the engine drives.
#[derive(Clone)]
pub struct ExposureCapabilities {
    pub directory: Arc<dyn EntityDirectory>,
    pub effects: Arc<dyn StatusEffectApplier>,
    pub indicators: Arc<dyn IndicatorService>,
    pub messages: Arc<dyn MessageSink>,
    pub store: Arc<dyn AttachmentStore + Send + Sync>,
}

/// A configured zone plus the entities currently exposed to or warned
/// about it.
pub struct HazardZone {
    descriptor: ZoneDescriptor,
    matcher: Box<dyn ZoneMatcher>,
    affected: BTreeSet<EntityId>,
    warned: BTreeSet<EntityId>,
}

impl HazardZone {
    pub fn new(descriptor: ZoneDescriptor, matcher: impl ZoneMatcher + 'static) -> Self {
        Self {
            descriptor,
            matcher: Box::new(matcher),
            affected: BTreeSet::new(),
            warned: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn descriptor(&self) -> &ZoneDescriptor {
        &self.descriptor
    }

    /// The zone's AffectedSet: entities in the exposed state.
    pub fn affected(&self) -> &BTreeSet<EntityId> {
        &self.affected
    }

    pub fn warned(&self) -> &BTreeSet<EntityId> {
        &self.warned
    }

    pub fn state_of(&self, entity_id: &str) -> ZoneState {
        if self.affected.contains(entity_id) {
            ZoneState::Exposed
        } else if self.warned.contains(entity_id) {
            ZoneState::Warned
        } else {
            ZoneState::Safe
        }
    }

    fn forget(&mut self, entity_id: &str) {
        self.affected.remove(entity_id);
        self.warned.remove(entity_id);
    }
}

pub struct ExposureEngine {
    config: EngineConfig,
    schedule: TickSchedule,
    capabilities: ExposureCapabilities,
    ledger: MitigationLedger,
    listeners: HazardListenerRegistry,
    zones: Vec<HazardZone>,
    display: DisplayReconciler,
    connected: BTreeSet<EntityId>,
    evaluation_ticks: u64,
    decay_ticks: u64,
}

impl std::fmt::Debug for ExposureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExposureEngine")
            .field("config", &self.config)
            .field("zones", &self.zone_ids())
            .field("listeners", &self.listeners)
            .field("connected_len", &self.connected.len())
            .field("display", &self.display)
            .field("evaluation_ticks", &self.evaluation_ticks)
            .field("decay_ticks", &self.decay_ticks)
            .finish()
    }
}

impl ExposureEngine {
    pub fn new(
        config: EngineConfig,
        capabilities: ExposureCapabilities,
        mitigation_indicators: IndicatorTemplates,
    ) -> Self {
        let config = config.sanitized();
        let mut listeners = HazardListenerRegistry::new();
        listeners.register(
            LEDGER_CONSULT_LISTENER,
            ListenerPriority::Lowest,
            ledger_consult_listener,
        );
        Self {
            schedule: TickSchedule::new(config.evaluation_interval_ms, config.decay_interval_ms),
            ledger: MitigationLedger::new(Arc::clone(&capabilities.store)),
            display: DisplayReconciler::new(
                Arc::clone(&capabilities.indicators),
                mitigation_indicators,
            ),
            config,
            capabilities,
            listeners,
            zones: Vec::new(),
            connected: BTreeSet::new(),
            evaluation_ticks: 0,
            decay_ticks: 0,
        }
    }

    /// Builds an engine with one flag matcher per configured zone, each
    /// accepting the classification equal to its zone id.
    pub fn from_config(
        config: &HazardConfig,
        capabilities: ExposureCapabilities,
        query: Arc<dyn SpatialZoneQuery>,
        permissions: Arc<dyn PermissionCheck>,
    ) -> Result<Self, EngineError> {
        let directory = Arc::clone(&capabilities.directory);
        let mut engine = Self::new(
            config.engine,
            capabilities,
            config.mitigation_indicators.clone(),
        );
        for descriptor in &config.zones {
            let matcher = FlagMatcher::new(
                Arc::clone(&directory),
                Arc::clone(&query),
                Arc::clone(&permissions),
                [descriptor.id.as_str()],
            )
            .with_policy(config.engine.capability_policy);
            engine.add_zone(descriptor.clone(), matcher)?;
        }
        Ok(engine)
    }

    pub fn add_zone(
        &mut self,
        descriptor: ZoneDescriptor,
        matcher: impl ZoneMatcher + 'static,
    ) -> Result<(), EngineError> {
        if self.zone(&descriptor.id).is_some() {
            return Err(EngineError::DuplicateZone {
                zone_id: descriptor.id,
            });
        }
        self.display
            .set_zone_template(&descriptor.id, descriptor.indicator.clone());
        self.zones.push(HazardZone::new(descriptor, matcher));
        Ok(())
    }

    pub fn add_listener<F>(&mut self, name: impl Into<String>, priority: ListenerPriority, listener: F)
    where
        F: Fn(&HazardEvaluationEvent, &EvaluationContext<'_>) -> HazardOutcome
            + Send
            + Sync
            + 'static,
    {
        self.listeners.register(name, priority, listener);
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &MitigationLedger {
        &self.ledger
    }

    pub fn display(&self) -> &DisplayReconciler {
        &self.display
    }

    pub fn listeners(&self) -> &HazardListenerRegistry {
        &self.listeners
    }

    pub fn zone(&self, zone_id: &str) -> Option<&HazardZone> {
        self.zones.iter().find(|zone| zone.id() == zone_id)
    }

    pub fn zone_ids(&self) -> Vec<ZoneId> {
        self.zones.iter().map(|zone| zone.id().to_string()).collect()
    }

    pub fn zone_state(&self, entity_id: &str, zone_id: &str) -> Option<ZoneState> {
        self.zone(zone_id).map(|zone| zone.state_of(entity_id))
    }

    pub fn connected(&self) -> &BTreeSet<EntityId> {
        &self.connected
    }

    pub fn connect(&mut self, entity_id: &str) -> bool {
        self.connected.insert(entity_id.to_string())
    }

    /// Drops the entity from every zone and detaches all its indicators.
    pub fn disconnect(&mut self, entity_id: &str) -> DisplayDelta {
        self.connected.remove(entity_id);
        for zone in &mut self.zones {
            zone.forget(entity_id);
        }
        self.display.disconnect(entity_id)
    }

    /// Wipes the entity's ledger after death, a cure or a resurrection.
    pub fn clear_mitigation(&self, entity_id: &str, reason: ClearReason) -> Result<(), StorageError> {
        self.ledger.clear_all(entity_id)?;
        info!(entity_id, reason = reason.as_str(), "mitigation cleared");
        Ok(())
    }

    /// Runs every tick that falls due within `elapsed_ms` of simulated time.
    pub fn advance(&mut self, elapsed_ms: u64) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        for kind in self.schedule.advance(elapsed_ms) {
            match kind {
                TickKind::Evaluation => report.evaluations.push(self.evaluation_tick()),
                TickKind::Decay => report.decays.push(self.decay_tick()),
            }
        }
        report
    }

    pub fn evaluation_tick(&mut self) -> EvaluationReport {
        self.evaluation_ticks += 1;
        let tick = self.evaluation_ticks;
        let mut report = EvaluationReport {
            tick,
            ..EvaluationReport::default()
        };
        let Self {
            capabilities,
            ledger,
            listeners,
            zones,
            display,
            connected,
            ..
        } = self;

        for entity_id in connected.iter() {
            let entity_id = entity_id.as_str();
            let mitigation = match ledger.list(entity_id) {
                Ok(mitigation) => mitigation,
                Err(err) => {
                    error!(
                        entity_id,
                        unsupported_protocol = err.is_unsupported_protocol(),
                        error = %err,
                        "could not read mitigation ledger, skipping entity"
                    );
                    report.skipped.push(SkippedEntity {
                        entity_id: entity_id.to_string(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };
            report.evaluated += 1;
            let context = EvaluationContext {
                mitigation: &mitigation,
                tick,
            };

            let mut desired = Vec::new();
            for zone in zones.iter_mut() {
                let before = zone.state_of(entity_id);
                let after = if zone.matcher.test(entity_id) {
                    let event =
                        listeners.fold(HazardEvaluationEvent::new(entity_id, zone.id()), &context);
                    if !event.cancelled {
                        for effect in &zone.descriptor.effects {
                            capabilities.effects.apply(entity_id, effect);
                        }
                        zone.warned.remove(entity_id);
                        if zone.affected.insert(entity_id.to_string()) {
                            if announce_entry(capabilities, &zone.descriptor, entity_id) {
                                report.broadcasts += 1;
                            }
                        }
                        if event.show_warning {
                            desired.push(DesiredIndicator::zone(zone.id()));
                        }
                        ZoneState::Exposed
                    } else if event.show_warning {
                        zone.affected.remove(entity_id);
                        zone.warned.insert(entity_id.to_string());
                        desired.push(DesiredIndicator::zone(zone.id()));
                        ZoneState::Warned
                    } else {
                        zone.forget(entity_id);
                        ZoneState::Safe
                    }
                } else {
                    zone.forget(entity_id);
                    ZoneState::Safe
                };
                if before != after {
                    report.transitions.push(ZoneTransition {
                        entity_id: entity_id.to_string(),
                        zone_id: zone.id().to_string(),
                        from: before,
                        to: after,
                    });
                }
            }

            for effect in &mitigation {
                desired.push(DesiredIndicator::effect(&effect.id, effect.progress()));
            }
            let delta = display.reconcile(entity_id, &desired);
            if !delta.is_empty() {
                report.display.insert(entity_id.to_string(), delta);
            }
        }

        debug!(
            tick,
            evaluated = report.evaluated,
            skipped = report.skipped.len(),
            transitions = report.transitions.len(),
            "evaluation tick"
        );
        report
    }

    pub fn decay_tick(&mut self) -> DecayReport {
        self.decay_ticks += 1;
        let elapsed_ms = i64::try_from(self.schedule.decay_interval_ms()).unwrap_or(i64::MAX);
        let mut report = DecayReport {
            tick: self.decay_ticks,
            elapsed_ms,
            ..DecayReport::default()
        };
        for entity_id in &self.connected {
            let entity_id = entity_id.as_str();
            match self.ledger.decay(entity_id, elapsed_ms) {
                Ok(outcome) => {
                    report.decayed += 1;
                    report
                        .expired
                        .extend(outcome.expired.into_iter().map(|effect_id| ExpiredEffect {
                            entity_id: entity_id.to_string(),
                            effect_id,
                        }));
                }
                Err(err) => {
                    error!(
                        entity_id,
                        unsupported_protocol = err.is_unsupported_protocol(),
                        error = %err,
                        "could not decay mitigation ledger, skipping entity"
                    );
                    report.skipped.push(SkippedEntity {
                        entity_id: entity_id.to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        debug!(
            tick = report.tick,
            decayed = report.decayed,
            expired = report.expired.len(),
            "decay tick"
        );
        report
    }

    pub fn snapshot(&self) -> ExposureSnapshot {
        ExposureSnapshot {
            evaluation_ticks: self.evaluation_ticks,
            decay_ticks: self.decay_ticks,
            connected: self.connected.iter().cloned().collect(),
            zones: self
                .zones
                .iter()
                .map(|zone| ZoneSnapshot {
                    zone_id: zone.id().to_string(),
                    affected: zone.affected.iter().cloned().collect(),
                    warned: zone.warned.iter().cloned().collect(),
                })
                .collect(),
            live_indicators: self.display.live_indicator_count(),
        }
    }

    /// Destroys every indicator and empties all zone sets. Connected
    /// entities stay connected.
    pub fn shutdown(&mut self) -> usize {
        for zone in &mut self.zones {
            zone.affected.clear();
            zone.warned.clear();
        }
        let destroyed = self.display.shutdown();
        info!(destroyed, "exposure engine shut down");
        destroyed
    }
}

/// Logs the entry and broadcasts the zone's enter message, if it has one.
fn announce_entry(
    capabilities: &ExposureCapabilities,
    descriptor: &ZoneDescriptor,
    entity_id: &str,
) -> bool {
    let location = capabilities.directory.locate(entity_id);
    info!(
        entity_id,
        zone_id = descriptor.id.as_str(),
        location = ?location,
        "entity entered hazard zone"
    );
    let Some(template) = descriptor.enter_message.as_deref() else {
        return false;
    };
    let name = capabilities
        .directory
        .display_name(entity_id)
        .unwrap_or_else(|| entity_id.to_string());
    let subject = format!("{name}{RESET}");
    let message = format!(
        "{RED}{}",
        format_template(template, &[subject.as_str(), descriptor.id.as_str()])
    );
    capabilities.messages.broadcast(entity_id, &message);
    true
}

#[cfg(test)]
mod tests;
