//! Consumable items that grant a mitigation effect.

use hazard_world_proto::MitigationEffect;
use serde::{Deserialize, Serialize};

use crate::messages::{format_template, AQUA, BLUE, RED, RESET};
use crate::types::ZoneId;

pub const DEFAULT_ITEM_NAME: &str = "Lugol's Iodine";
pub const DEFAULT_ITEM_DESCRIPTION: &str = "Radiation resistance ({0})";
pub const DEFAULT_ITEM_DURATION_S: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Parses `#RRGGBB`.
    pub fn parse(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#')?;
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self {
            r: channel(0..2)?,
            g: channel(2..4)?,
            b: channel(4..6)?,
        })
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MitigationItem {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: Option<Rgb>,
    pub duration_s: u32,
    /// `None` protects in every zone.
    pub zone_ids: Option<Vec<ZoneId>>,
    pub drink_message: Option<String>,
}

impl MitigationItem {
    pub fn new(id: impl Into<String>, duration_s: u32) -> Self {
        Self {
            id: id.into(),
            name: DEFAULT_ITEM_NAME.to_string(),
            description: DEFAULT_ITEM_DESCRIPTION.to_string(),
            color: None,
            duration_s,
            zone_ids: None,
            drink_message: None,
        }
    }

    pub fn with_zone_ids(mut self, zone_ids: Vec<ZoneId>) -> Self {
        self.zone_ids = (!zone_ids.is_empty()).then_some(zone_ids);
        self
    }

    pub fn with_drink_message(mut self, message: impl Into<String>) -> Self {
        self.drink_message = Some(message.into());
        self
    }

    pub fn duration_ms(&self) -> i64 {
        i64::from(self.duration_s) * 1_000
    }

    /// The effect drinking this item appends to the ledger. Its id is the
    /// item id, so drinking the same item again merges.
    pub fn effect(&self) -> MitigationEffect {
        MitigationEffect::new(self.id.clone(), self.duration_ms(), self.zone_ids.clone())
    }

    pub fn display_name(&self) -> String {
        format!("{AQUA}{}", self.name)
    }

    pub fn description_line(&self) -> String {
        format!(
            "{BLUE}{}",
            format_template(
                &self.description,
                &[format_duration(self.duration_ms()).as_str()]
            )
        )
    }

    /// Broadcast announcing that `display_name` drank the item.
    pub fn drink_message(&self, display_name: &str) -> Option<String> {
        let template = self.drink_message.as_deref()?;
        let subject = format!("{display_name}{RESET}");
        Some(format!(
            "{RED}{}",
            format_template(template, &[subject.as_str(), self.name.as_str()])
        ))
    }
}

/// Whole seconds as `mm:ss`; minutes are not capped at 59.
pub fn format_duration(duration_ms: i64) -> String {
    let seconds = duration_ms.max(0) / 1_000;
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
