use serde::{Deserialize, Serialize};

pub type EffectId = String;
pub type ZoneId = String;

/// A time-limited mitigation buff stored in an entity's ledger.
///
/// Durations are kept in milliseconds, matching the blob layout. A
/// `zone_ids` of `None` makes the effect apply in every zone; an empty
/// allowlist is normalized to `None` because the blob cannot tell the two
/// apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationEffect {
    pub id: EffectId,
    pub initial_duration_ms: i64,
    pub remaining_ms: i64,
    #[serde(default)]
    pub zone_ids: Option<Vec<ZoneId>>,
}

impl MitigationEffect {
    /// Fresh effect with the full duration left.
    pub fn new(id: impl Into<String>, duration_ms: i64, zone_ids: Option<Vec<ZoneId>>) -> Self {
        Self::restored(id, duration_ms, duration_ms, zone_ids)
    }

    pub fn restored(
        id: impl Into<String>,
        initial_duration_ms: i64,
        remaining_ms: i64,
        zone_ids: Option<Vec<ZoneId>>,
    ) -> Self {
        Self {
            id: id.into(),
            initial_duration_ms,
            remaining_ms,
            zone_ids: zone_ids.filter(|ids| !ids.is_empty()),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ms <= 0
    }

    /// True when the effect protects against the zone.
    pub fn can_enter(&self, zone_id: &str) -> bool {
        match &self.zone_ids {
            None => true,
            Some(ids) => ids.iter().any(|id| id == zone_id),
        }
    }

    /// Copy with `elapsed_ms` taken off the remaining time, clamped at zero.
    pub fn elapsed(&self, elapsed_ms: i64) -> Self {
        let remaining_ms = self
            .remaining_ms
            .saturating_sub(elapsed_ms.max(0))
            .max(0);
        Self {
            remaining_ms,
            ..self.clone()
        }
    }

    /// Merge-on-add: the replacement wins for initial duration and zone
    /// scope, the longer remaining time wins.
    pub fn merged_with(&self, replacement: &MitigationEffect) -> Self {
        Self::restored(
            self.id.clone(),
            replacement.initial_duration_ms,
            self.remaining_ms.max(replacement.remaining_ms),
            replacement.zone_ids.clone(),
        )
    }

    /// Remaining fraction of the initial duration in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        if self.initial_duration_ms <= 0 {
            return 0.0;
        }
        (self.remaining_ms as f64 / self.initial_duration_ms as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_allowlist_applies_everywhere() {
        let effect = MitigationEffect::new("iodine", 1_000, None);
        for zone in ["core", "default", "", "anything-else"] {
            assert!(effect.can_enter(zone));
        }
    }

    #[test]
    fn empty_allowlist_is_normalized_to_everywhere() {
        let effect = MitigationEffect::new("iodine", 1_000, Some(Vec::new()));
        assert_eq!(effect.zone_ids, None);
        assert!(effect.can_enter("core"));
    }

    #[test]
    fn scoped_effect_only_enters_listed_zones() {
        let effect = MitigationEffect::new("iodine", 1_000, Some(vec!["core".to_string()]));
        assert!(effect.can_enter("core"));
        assert!(!effect.can_enter("rim"));
    }

    #[test]
    fn elapsed_clamps_at_zero() {
        let effect = MitigationEffect::restored("iodine", 1_000, 300, None);
        assert_eq!(effect.elapsed(200).remaining_ms, 100);
        assert_eq!(effect.elapsed(5_000).remaining_ms, 0);
        assert!(effect.elapsed(5_000).is_expired());
        assert_eq!(effect.elapsed(-10).remaining_ms, 300);
    }

    #[test]
    fn merge_normalizes_empty_replacement_scope() {
        let existing =
            MitigationEffect::restored("iodine", 1_000, 800, Some(vec!["core".to_string()]));
        let replacement = MitigationEffect {
            id: "iodine".to_string(),
            initial_duration_ms: 1_000,
            remaining_ms: 1_000,
            zone_ids: Some(Vec::new()),
        };
        let merged = existing.merged_with(&replacement);
        assert_eq!(merged.zone_ids, None);
        assert!(merged.can_enter("rim"));
    }

    #[test]
    fn merge_keeps_longest_remaining_and_latest_scope() {
        let existing = MitigationEffect::restored("iodine", 600_000, 500_000, None);
        let replacement =
            MitigationEffect::restored("iodine", 300_000, 300_000, Some(vec!["core".to_string()]));
        let merged = existing.merged_with(&replacement);
        assert_eq!(merged.initial_duration_ms, 300_000);
        assert_eq!(merged.remaining_ms, 500_000);
        assert_eq!(merged.zone_ids, Some(vec!["core".to_string()]));
    }

    #[test]
    fn progress_handles_degenerate_initial_duration() {
        assert_eq!(MitigationEffect::restored("a", 0, 10, None).progress(), 0.0);
        assert_eq!(MitigationEffect::restored("a", 100, 50, None).progress(), 0.5);
        assert_eq!(MitigationEffect::restored("a", 100, 150, None).progress(), 1.0);
    }
}
