//! Cancellable per-tick hazard decision and its listener registry.

use std::sync::Arc;

use hazard_world_proto::MitigationEffect;
use serde::{Deserialize, Serialize};

use crate::types::{EntityId, ZoneId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerPriority {
    Lowest,
    Low,
    Normal,
    High,
    Highest,
    /// Runs last; meant for listeners that only observe the outcome.
    Monitor,
}

impl ListenerPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerPriority::Lowest => "lowest",
            ListenerPriority::Low => "low",
            ListenerPriority::Normal => "normal",
            ListenerPriority::High => "high",
            ListenerPriority::Highest => "highest",
            ListenerPriority::Monitor => "monitor",
        }
    }
}

/// The two flags a listener may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardOutcome {
    pub cancelled: bool,
    pub show_warning: bool,
}

impl Default for HazardOutcome {
    fn default() -> Self {
        Self {
            cancelled: false,
            show_warning: true,
        }
    }
}

impl HazardOutcome {
    /// Cancelling hides the warning; a later step may turn it back on.
    pub fn set_cancelled(self, cancelled: bool) -> Self {
        if cancelled {
            Self {
                cancelled: true,
                show_warning: false,
            }
        } else {
            Self {
                cancelled: false,
                ..self
            }
        }
    }

    pub fn cancel(self) -> Self {
        self.set_cancelled(true)
    }

    pub fn with_warning(self, show_warning: bool) -> Self {
        Self {
            show_warning,
            ..self
        }
    }
}

/// Raised once per tick for each (entity, zone) pair the zone matcher
/// accepted. Listeners see the flags folded so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardEvaluationEvent {
    pub entity_id: EntityId,
    pub zone_id: ZoneId,
    pub cancelled: bool,
    pub show_warning: bool,
}

impl HazardEvaluationEvent {
    pub fn new(entity_id: &str, zone_id: &str) -> Self {
        let outcome = HazardOutcome::default();
        Self {
            entity_id: entity_id.to_string(),
            zone_id: zone_id.to_string(),
            cancelled: outcome.cancelled,
            show_warning: outcome.show_warning,
        }
    }

    pub fn outcome(&self) -> HazardOutcome {
        HazardOutcome {
            cancelled: self.cancelled,
            show_warning: self.show_warning,
        }
    }

    fn with_outcome(mut self, outcome: HazardOutcome) -> Self {
        self.cancelled = outcome.cancelled;
        self.show_warning = outcome.show_warning;
        self
    }
}

/// Read-only data handed to listeners alongside the event.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub mitigation: &'a [MitigationEffect],
    pub tick: u64,
}

pub type HazardListener =
    Arc<dyn Fn(&HazardEvaluationEvent, &EvaluationContext<'_>) -> HazardOutcome + Send + Sync>;

#[derive(Clone)]
struct RegisteredListener {
    name: String,
    priority: ListenerPriority,
    listener: HazardListener,
}

/// Listeners folded lowest priority first; equal priorities keep
/// registration order.
#[derive(Clone, Default)]
pub struct HazardListenerRegistry {
    listeners: Vec<RegisteredListener>,
}

impl std::fmt::Debug for HazardListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HazardListenerRegistry")
            .field("listener_len", &self.listeners.len())
            .field("order", &self.order())
            .finish()
    }
}

impl HazardListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: impl Into<String>, priority: ListenerPriority, listener: F)
    where
        F: Fn(&HazardEvaluationEvent, &EvaluationContext<'_>) -> HazardOutcome
            + Send
            + Sync
            + 'static,
    {
        let position = self
            .listeners
            .iter()
            .position(|registered| registered.priority > priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(
            position,
            RegisteredListener {
                name: name.into(),
                priority,
                listener: Arc::new(listener),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Listener names in execution order.
    pub fn order(&self) -> Vec<(&str, ListenerPriority)> {
        self.listeners
            .iter()
            .map(|registered| (registered.name.as_str(), registered.priority))
            .collect()
    }

    pub fn fold(
        &self,
        event: HazardEvaluationEvent,
        context: &EvaluationContext<'_>,
    ) -> HazardEvaluationEvent {
        self.listeners.iter().fold(event, |event, registered| {
            let outcome = (registered.listener)(&event, context);
            event.with_outcome(outcome)
        })
    }
}

/// Cancels the event and keeps the warning visible when any live
/// mitigation effect covers the zone.
pub fn ledger_consult_listener(
    event: &HazardEvaluationEvent,
    context: &EvaluationContext<'_>,
) -> HazardOutcome {
    let covered = context
        .mitigation
        .iter()
        .any(|effect| effect.can_enter(&event.zone_id));
    if covered {
        event.outcome().cancel().with_warning(true)
    } else {
        event.outcome()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(mitigation: &[MitigationEffect]) -> EvaluationContext<'_> {
        EvaluationContext {
            mitigation,
            tick: 0,
        }
    }

    #[test]
    fn cancel_hides_warning() {
        let outcome = HazardOutcome::default().cancel();
        assert_eq!(
            outcome,
            HazardOutcome {
                cancelled: true,
                show_warning: false
            }
        );
        let restored = outcome.set_cancelled(false);
        assert!(!restored.cancelled);
        assert!(!restored.show_warning);
    }

    #[test]
    fn listeners_run_by_priority_then_registration() {
        let mut registry = HazardListenerRegistry::new();
        registry.register("monitor", ListenerPriority::Monitor, |event, _| {
            event.outcome()
        });
        registry.register("normal-a", ListenerPriority::Normal, |event, _| {
            event.outcome()
        });
        registry.register("lowest", ListenerPriority::Lowest, |event, _| {
            event.outcome()
        });
        registry.register("normal-b", ListenerPriority::Normal, |event, _| {
            event.outcome()
        });
        let names: Vec<_> = registry.order().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["lowest", "normal-a", "normal-b", "monitor"]);
    }

    #[test]
    fn later_listener_can_reenable_warning_after_cancel() {
        let mut registry = HazardListenerRegistry::new();
        registry.register("warn", ListenerPriority::High, |event, _| {
            event.outcome().with_warning(true)
        });
        registry.register("cancel", ListenerPriority::Low, |event, _| {
            event.outcome().cancel()
        });

        let folded = registry.fold(HazardEvaluationEvent::new("p1", "core"), &context(&[]));
        assert!(folded.cancelled);
        assert!(folded.show_warning);
    }

    #[test]
    fn cancel_after_warning_hides_it_again() {
        let mut registry = HazardListenerRegistry::new();
        registry.register("warn", ListenerPriority::Low, |event, _| {
            event.outcome().with_warning(true)
        });
        registry.register("cancel", ListenerPriority::High, |event, _| {
            event.outcome().cancel()
        });
        let folded = registry.fold(HazardEvaluationEvent::new("p1", "core"), &context(&[]));
        assert!(folded.cancelled);
        assert!(!folded.show_warning);
    }

    #[test]
    fn ledger_listener_cancels_only_for_covering_effect() {
        let scoped = vec![MitigationEffect::new(
            "iodine",
            1_000,
            Some(vec!["core".to_string()]),
        )];
        let event = HazardEvaluationEvent::new("p1", "core");
        let outcome = ledger_consult_listener(&event, &context(&scoped));
        assert!(outcome.cancelled);
        assert!(outcome.show_warning);

        let elsewhere = HazardEvaluationEvent::new("p1", "rim");
        assert_eq!(
            ledger_consult_listener(&elsewhere, &context(&scoped)),
            HazardOutcome::default()
        );
    }

    #[test]
    fn empty_registry_keeps_defaults() {
        let registry = HazardListenerRegistry::new();
        let folded = registry.fold(HazardEvaluationEvent::new("p1", "core"), &context(&[]));
        assert!(!folded.cancelled);
        assert!(folded.show_warning);
    }
}
