pub use hazard_world_proto::{EffectId, ZoneId};

pub type EntityId = String;
pub type WorldId = String;

/// Zone id used when a configuration or a spatial query leaves it empty.
pub const DEFAULT_ZONE_ID: &str = "default";
pub const DEFAULT_EVALUATION_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_DECAY_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_STATUS_EFFECT_DURATION_MS: u64 = 5_000;
pub const IMMUNITY_PERMISSION_PREFIX: &str = "hazard.immune";

/// Maps an empty classification or zone id to [`DEFAULT_ZONE_ID`].
pub fn normalize_zone_id(raw: &str) -> ZoneId {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_ZONE_ID.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn immunity_permission(classification: &str) -> String {
    format!(
        "{IMMUNITY_PERMISSION_PREFIX}.{}",
        normalize_zone_id(classification)
    )
}
