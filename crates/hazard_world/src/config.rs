//! TOML configuration: engine schedules, zones, mitigation items and
//! mitigation indicator templates.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::effects::StatusEffect;
use crate::error::ConfigError;
use crate::indicator::{
    IndicatorColor, IndicatorFlag, IndicatorStyle, IndicatorTemplate, IndicatorTemplates,
};
use crate::item::{MitigationItem, Rgb, DEFAULT_ITEM_DESCRIPTION, DEFAULT_ITEM_DURATION_S, DEFAULT_ITEM_NAME};
use crate::messages::colorize;
use crate::types::{
    normalize_zone_id, ZoneId, DEFAULT_DECAY_INTERVAL_MS, DEFAULT_EVALUATION_INTERVAL_MS,
    DEFAULT_STATUS_EFFECT_DURATION_MS,
};
use crate::zone::CapabilityPolicy;

pub const DEFAULT_CONFIG_FILE_NAME: &str = "hazard.toml";

pub const DEFAULT_CONFIG_TOML: &str = r##"
[engine]
evaluation_interval_ms = 1000
decay_interval_ms = 1000
capability_policy = "fail_open"

[zones.default]
enter_message = "{0} has entered the {1} radiation zone!"

[zones.default.indicator]
title = "Radiation"
color = "red"
style = "solid"
flags = ["darken_sky"]

[zones.default.effects.nausea]
level = 1

[zones.default.effects.poison]
level = 2

[mitigation_items.default]
duration_s = 600
drink_message = "{0} drank {1}."

[mitigation_indicators.default]
title = "Lugol's Iodine Effect"
color = "green"
style = "segmented_20"
"##;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub evaluation_interval_ms: u64,
    pub decay_interval_ms: u64,
    pub capability_policy: CapabilityPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            evaluation_interval_ms: DEFAULT_EVALUATION_INTERVAL_MS,
            decay_interval_ms: DEFAULT_DECAY_INTERVAL_MS,
            capability_policy: CapabilityPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn sanitized(mut self) -> Self {
        if self.evaluation_interval_ms == 0 {
            self.evaluation_interval_ms = DEFAULT_EVALUATION_INTERVAL_MS;
        }
        if self.decay_interval_ms == 0 {
            self.decay_interval_ms = DEFAULT_DECAY_INTERVAL_MS;
        }
        self
    }
}

/// Static configuration of one hazard zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneDescriptor {
    pub id: ZoneId,
    pub indicator: IndicatorTemplate,
    pub effects: Vec<StatusEffect>,
    /// `{0}` is the entity display name, `{1}` the zone id.
    pub enter_message: Option<String>,
}

impl ZoneDescriptor {
    pub fn new(id: &str, indicator: IndicatorTemplate) -> Self {
        Self {
            id: normalize_zone_id(id),
            indicator,
            effects: Vec::new(),
            enter_message: None,
        }
    }

    pub fn with_effect(mut self, effect: StatusEffect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_enter_message(mut self, message: impl Into<String>) -> Self {
        self.enter_message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HazardConfig {
    pub engine: EngineConfig,
    pub zones: Vec<ZoneDescriptor>,
    pub mitigation_items: Vec<MitigationItem>,
    pub mitigation_indicators: IndicatorTemplates,
}

impl HazardConfig {
    /// `hazard.toml` in the working directory when present, the built-in
    /// defaults otherwise.
    pub fn from_default_sources() -> Result<Self, ConfigError> {
        let config_path = Path::new(DEFAULT_CONFIG_FILE_NAME);
        if config_path.exists() {
            return Self::from_config_file(config_path);
        }
        Self::builtin()
    }

    pub fn builtin() -> Result<Self, ConfigError> {
        Self::parse(DEFAULT_CONFIG_TOML, "<builtin>")
    }

    pub fn from_config_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|err| ConfigError::ReadConfigFile {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Self::parse(content, "<inline>")
    }

    pub fn zone(&self, zone_id: &str) -> Option<&ZoneDescriptor> {
        self.zones.iter().find(|zone| zone.id == zone_id)
    }

    pub fn item(&self, item_id: &str) -> Option<&MitigationItem> {
        self.mitigation_items.iter().find(|item| item.id == item_id)
    }

    fn parse(content: &str, path: &str) -> Result<Self, ConfigError> {
        let raw: RawHazardConfig =
            toml::from_str(content).map_err(|err| ConfigError::ParseConfigFile {
                path: path.to_string(),
                message: err.to_string(),
            })?;
        raw.validate()
    }
}

// ============================================================================
// Raw file layout
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawHazardConfig {
    engine: EngineConfig,
    zones: BTreeMap<String, RawZone>,
    mitigation_items: BTreeMap<String, RawItem>,
    mitigation_indicators: BTreeMap<String, RawIndicator>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawZone {
    indicator: RawIndicator,
    effects: BTreeMap<String, RawStatusEffect>,
    enter_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIndicator {
    title: Option<String>,
    color: Option<String>,
    style: Option<String>,
    flags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStatusEffect {
    level: Option<i64>,
    duration_ms: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawItem {
    name: Option<String>,
    description: Option<String>,
    color: Option<String>,
    duration_s: Option<i64>,
    zone_ids: Vec<String>,
    drink_message: Option<String>,
}

impl RawHazardConfig {
    fn validate(self) -> Result<HazardConfig, ConfigError> {
        let mut seen = BTreeSet::new();
        let mut zones = Vec::with_capacity(self.zones.len());
        for (raw_id, raw) in self.zones {
            let id = normalize_zone_id(&raw_id);
            if !seen.insert(id.clone()) {
                return Err(ConfigError::invalid("zones", &id, "id", raw_id, "duplicate zone id"));
            }
            zones.push(raw.validate(id)?);
        }

        let mut mitigation_items = Vec::with_capacity(self.mitigation_items.len());
        for (raw_id, raw) in self.mitigation_items {
            mitigation_items.push(raw.validate(normalize_zone_id(&raw_id))?);
        }

        let mut templates = BTreeMap::new();
        for (effect_id, raw) in self.mitigation_indicators {
            let template = raw.validate("mitigation_indicators", &effect_id)?;
            templates.insert(effect_id, template);
        }

        Ok(HazardConfig {
            engine: self.engine.sanitized(),
            zones,
            mitigation_items,
            mitigation_indicators: IndicatorTemplates::new(
                templates,
                IndicatorTemplate::mitigation_fallback(),
            ),
        })
    }
}

impl RawZone {
    fn validate(self, id: ZoneId) -> Result<ZoneDescriptor, ConfigError> {
        let indicator = self.indicator.validate("zones", &id)?;
        let mut effects = Vec::with_capacity(self.effects.len());
        for (name, raw) in self.effects {
            if name.trim().is_empty() {
                return Err(ConfigError::invalid("zones", &id, "effects", name, "empty effect name"));
            }
            let level = raw.level.unwrap_or(1);
            if !(1..=i64::from(u8::MAX)).contains(&level) {
                return Err(ConfigError::invalid("zones", &id, "level", level, "must be 1..=255"));
            }
            let duration_ms = raw
                .duration_ms
                .unwrap_or(DEFAULT_STATUS_EFFECT_DURATION_MS as i64);
            if duration_ms <= 0 {
                return Err(ConfigError::invalid(
                    "zones",
                    &id,
                    "duration_ms",
                    duration_ms,
                    "must be positive",
                ));
            }
            effects.push(StatusEffect::from_level(
                name.trim().to_ascii_lowercase(),
                level as u8,
                duration_ms as u64,
            ));
        }
        Ok(ZoneDescriptor {
            id,
            indicator,
            effects,
            enter_message: non_empty_colorized(self.enter_message),
        })
    }
}

impl RawIndicator {
    fn validate(self, section: &'static str, id: &str) -> Result<IndicatorTemplate, ConfigError> {
        let color = match self.color {
            None => IndicatorColor::default(),
            Some(value) => IndicatorColor::parse(&value)
                .ok_or_else(|| ConfigError::invalid(section, id, "color", value, "unknown color"))?,
        };
        let style = match self.style {
            None => IndicatorStyle::default(),
            Some(value) => IndicatorStyle::parse(&value)
                .ok_or_else(|| ConfigError::invalid(section, id, "style", value, "unknown style"))?,
        };
        let flags = self
            .flags
            .into_iter()
            .map(|value| {
                IndicatorFlag::parse(&value)
                    .ok_or_else(|| ConfigError::invalid(section, id, "flags", value, "unknown flag"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(IndicatorTemplate {
            title: colorize(self.title.as_deref().unwrap_or("")),
            color,
            style,
            flags,
        })
    }
}

impl RawItem {
    fn validate(self, id: String) -> Result<MitigationItem, ConfigError> {
        let duration_s = self.duration_s.unwrap_or(i64::from(DEFAULT_ITEM_DURATION_S));
        if duration_s <= 0 {
            return Err(ConfigError::invalid(
                "mitigation_items",
                &id,
                "duration_s",
                duration_s,
                "must be positive",
            ));
        }
        let duration_s = u32::try_from(duration_s).map_err(|_| {
            ConfigError::invalid("mitigation_items", &id, "duration_s", duration_s, "too large")
        })?;
        let color = match self.color.filter(|value| !value.is_empty()) {
            None => None,
            Some(value) => Some(Rgb::parse(&value).ok_or_else(|| {
                ConfigError::invalid("mitigation_items", &id, "color", value, "expected #RRGGBB")
            })?),
        };
        Ok(MitigationItem {
            id,
            name: self.name.unwrap_or_else(|| DEFAULT_ITEM_NAME.to_string()),
            description: self
                .description
                .unwrap_or_else(|| DEFAULT_ITEM_DESCRIPTION.to_string()),
            color,
            duration_s,
            zone_ids: (!self.zone_ids.is_empty()).then(|| {
                self.zone_ids
                    .iter()
                    .map(|zone_id| normalize_zone_id(zone_id))
                    .collect()
            }),
            drink_message: non_empty_colorized(self.drink_message),
        })
    }
}

fn non_empty_colorized(value: Option<String>) -> Option<String> {
    value
        .map(|value| colorize(&value))
        .filter(|value| !value.is_empty())
}
