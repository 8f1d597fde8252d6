//! Shared progress indicators shown to entities, and their templates.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::types::DEFAULT_ZONE_ID;

pub const FALLBACK_MITIGATION_TITLE: &str = "Lugol's Iodine Effect";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColor {
    Pink,
    Blue,
    Red,
    Green,
    Yellow,
    Purple,
    #[default]
    White,
}

impl IndicatorColor {
    pub fn variants() -> &'static [&'static str] {
        &["pink", "blue", "red", "green", "yellow", "purple", "white"]
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pink" => Some(Self::Pink),
            "blue" => Some(Self::Blue),
            "red" => Some(Self::Red),
            "green" => Some(Self::Green),
            "yellow" => Some(Self::Yellow),
            "purple" => Some(Self::Purple),
            "white" => Some(Self::White),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorStyle {
    #[default]
    Solid,
    Segmented6,
    Segmented10,
    Segmented12,
    Segmented20,
}

impl IndicatorStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "solid" => Some(Self::Solid),
            "segmented_6" => Some(Self::Segmented6),
            "segmented_10" => Some(Self::Segmented10),
            "segmented_12" => Some(Self::Segmented12),
            "segmented_20" => Some(Self::Segmented20),
            _ => None,
        }
    }

    pub fn segments(&self) -> u8 {
        match self {
            Self::Solid => 1,
            Self::Segmented6 => 6,
            Self::Segmented10 => 10,
            Self::Segmented12 => 12,
            Self::Segmented20 => 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorFlag {
    DarkenSky,
    PlayBossMusic,
    CreateFog,
}

impl IndicatorFlag {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "darken_sky" => Some(Self::DarkenSky),
            "play_boss_music" => Some(Self::PlayBossMusic),
            "create_fog" => Some(Self::CreateFog),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IndicatorTemplate {
    pub title: String,
    pub color: IndicatorColor,
    pub style: IndicatorStyle,
    pub flags: Vec<IndicatorFlag>,
}

impl IndicatorTemplate {
    pub fn new(title: impl Into<String>, color: IndicatorColor, style: IndicatorStyle) -> Self {
        Self {
            title: title.into(),
            color,
            style,
            flags: Vec::new(),
        }
    }

    pub fn mitigation_fallback() -> Self {
        Self::new(
            FALLBACK_MITIGATION_TITLE,
            IndicatorColor::Green,
            IndicatorStyle::Segmented20,
        )
    }

    /// Copy whose title starts with a color code.
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            title: format!("{prefix}{}", self.title),
            ..self.clone()
        }
    }
}

/// Templates looked up by id, then by `"default"`, then the fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorTemplates {
    templates: BTreeMap<String, IndicatorTemplate>,
    fallback: IndicatorTemplate,
}

impl Default for IndicatorTemplates {
    fn default() -> Self {
        Self::new(BTreeMap::new(), IndicatorTemplate::mitigation_fallback())
    }
}

impl IndicatorTemplates {
    pub fn new(templates: BTreeMap<String, IndicatorTemplate>, fallback: IndicatorTemplate) -> Self {
        Self {
            templates,
            fallback,
        }
    }

    pub fn insert(&mut self, id: impl Into<String>, template: IndicatorTemplate) {
        self.templates.insert(id.into(), template);
    }

    pub fn resolve(&self, id: &str) -> &IndicatorTemplate {
        self.templates
            .get(id)
            .or_else(|| self.templates.get(DEFAULT_ZONE_ID))
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

/// A live indicator. Dropping the handle destroys it.
pub trait IndicatorHandle: Send {
    fn set_progress(&self, progress: f64);

    fn attach(&self, entity_id: &str);

    fn detach(&self, entity_id: &str);

    fn detach_all(&self);
}

pub trait IndicatorService: Send + Sync {
    fn create(&self, template: &IndicatorTemplate) -> Box<dyn IndicatorHandle>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRecord {
    pub id: u64,
    pub title: String,
    pub color: IndicatorColor,
    pub style: IndicatorStyle,
    pub progress: f64,
    pub attached: BTreeSet<String>,
    pub destroyed: bool,
}

#[derive(Debug, Default)]
struct IndicatorBook {
    next_id: u64,
    records: BTreeMap<u64, IndicatorRecord>,
}

/// Records every indicator it creates, for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndicatorService {
    book: Arc<Mutex<IndicatorBook>>,
}

impl InMemoryIndicatorService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(&self) -> Vec<IndicatorRecord> {
        let book = self.book.lock().expect("lock indicators");
        book.records
            .values()
            .filter(|record| !record.destroyed)
            .cloned()
            .collect()
    }

    pub fn created_count(&self) -> usize {
        self.book.lock().expect("lock indicators").records.len()
    }

    pub fn destroyed_count(&self) -> usize {
        let book = self.book.lock().expect("lock indicators");
        book.records.values().filter(|record| record.destroyed).count()
    }

    /// Live indicator with the given title.
    pub fn find(&self, title: &str) -> Option<IndicatorRecord> {
        self.live().into_iter().find(|record| record.title == title)
    }

    /// Titles of live indicators the entity is attached to.
    pub fn titles_for(&self, entity_id: &str) -> Vec<String> {
        self.live()
            .into_iter()
            .filter(|record| record.attached.contains(entity_id))
            .map(|record| record.title)
            .collect()
    }
}

impl IndicatorService for InMemoryIndicatorService {
    fn create(&self, template: &IndicatorTemplate) -> Box<dyn IndicatorHandle> {
        let mut book = self.book.lock().expect("lock indicators");
        let id = book.next_id;
        book.next_id += 1;
        book.records.insert(
            id,
            IndicatorRecord {
                id,
                title: template.title.clone(),
                color: template.color,
                style: template.style,
                progress: 1.0,
                attached: BTreeSet::new(),
                destroyed: false,
            },
        );
        Box::new(InMemoryIndicatorHandle {
            id,
            book: Arc::clone(&self.book),
        })
    }
}

struct InMemoryIndicatorHandle {
    id: u64,
    book: Arc<Mutex<IndicatorBook>>,
}

impl InMemoryIndicatorHandle {
    fn update(&self, apply: impl FnOnce(&mut IndicatorRecord)) {
        let mut book = self.book.lock().expect("lock indicators");
        if let Some(record) = book.records.get_mut(&self.id) {
            apply(record);
        }
    }
}

impl IndicatorHandle for InMemoryIndicatorHandle {
    fn set_progress(&self, progress: f64) {
        self.update(|record| record.progress = progress.clamp(0.0, 1.0));
    }

    fn attach(&self, entity_id: &str) {
        self.update(|record| {
            record.attached.insert(entity_id.to_string());
        });
    }

    fn detach(&self, entity_id: &str) {
        self.update(|record| {
            record.attached.remove(entity_id);
        });
    }

    fn detach_all(&self) {
        self.update(|record| record.attached.clear());
    }
}

impl Drop for InMemoryIndicatorHandle {
    fn drop(&mut self) {
        // Never panic in drop, even on a poisoned lock.
        if let Ok(mut book) = self.book.lock() {
            if let Some(record) = book.records.get_mut(&self.id) {
                record.destroyed = true;
            }
        }
    }
}
