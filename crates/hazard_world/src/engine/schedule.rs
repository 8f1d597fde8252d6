//! Two independent fixed-rate schedules over simulated time.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    Evaluation,
    Decay,
}

/// Upper bound on ticks yielded by one `advance`. Larger gaps drop the
/// surplus ticks and keep each schedule's phase.
pub const MAX_TICKS_PER_ADVANCE: usize = 10_000;

/// Accumulates elapsed time and yields due ticks in time order. Ticks due
/// at the same instant run evaluation first. A schedule whose next tick
/// would overflow the clock stops firing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickSchedule {
    evaluation_interval_ms: u64,
    decay_interval_ms: u64,
    now_ms: u64,
    next_evaluation_ms: Option<u64>,
    next_decay_ms: Option<u64>,
}

impl TickSchedule {
    /// Both schedules first fire one interval after start.
    pub fn new(evaluation_interval_ms: u64, decay_interval_ms: u64) -> Self {
        let evaluation_interval_ms = evaluation_interval_ms.max(1);
        let decay_interval_ms = decay_interval_ms.max(1);
        Self {
            evaluation_interval_ms,
            decay_interval_ms,
            now_ms: 0,
            next_evaluation_ms: Some(evaluation_interval_ms),
            next_decay_ms: Some(decay_interval_ms),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn evaluation_interval_ms(&self) -> u64 {
        self.evaluation_interval_ms
    }

    pub fn decay_interval_ms(&self) -> u64 {
        self.decay_interval_ms
    }

    pub fn advance(&mut self, elapsed_ms: u64) -> Vec<TickKind> {
        let target = self.now_ms.saturating_add(elapsed_ms);
        let mut due = Vec::new();
        loop {
            let evaluation = self.next_evaluation_ms.filter(|next| *next <= target);
            let decay = self.next_decay_ms.filter(|next| *next <= target);
            let kind = match (evaluation, decay) {
                (None, None) => break,
                (Some(_), None) => TickKind::Evaluation,
                (None, Some(_)) => TickKind::Decay,
                (Some(evaluation), Some(decay)) if evaluation <= decay => TickKind::Evaluation,
                (Some(_), Some(_)) => TickKind::Decay,
            };
            if due.len() >= MAX_TICKS_PER_ADVANCE {
                let dropped = self.skip_to(target);
                warn!(dropped, target_ms = target, "tick backlog dropped");
                break;
            }
            due.push(kind);
            match kind {
                TickKind::Evaluation => {
                    self.next_evaluation_ms = self
                        .next_evaluation_ms
                        .and_then(|next| next.checked_add(self.evaluation_interval_ms));
                }
                TickKind::Decay => {
                    self.next_decay_ms = self
                        .next_decay_ms
                        .and_then(|next| next.checked_add(self.decay_interval_ms));
                }
            }
        }
        self.now_ms = target;
        due
    }

    /// Moves both schedules to their first tick after `target_ms` and
    /// returns how many ticks were passed over.
    fn skip_to(&mut self, target_ms: u64) -> u64 {
        let (next_evaluation, skipped_evaluations) =
            next_after(self.next_evaluation_ms, self.evaluation_interval_ms, target_ms);
        let (next_decay, skipped_decays) =
            next_after(self.next_decay_ms, self.decay_interval_ms, target_ms);
        self.next_evaluation_ms = next_evaluation;
        self.next_decay_ms = next_decay;
        skipped_evaluations.saturating_add(skipped_decays)
    }
}

fn next_after(next: Option<u64>, interval_ms: u64, target_ms: u64) -> (Option<u64>, u64) {
    match next {
        Some(next) if next <= target_ms => {
            let skipped = (target_ms - next) / interval_ms + 1;
            let last = next + (skipped - 1) * interval_ms;
            (last.checked_add(interval_ms), skipped)
        }
        other => (other, 0),
    }
}
