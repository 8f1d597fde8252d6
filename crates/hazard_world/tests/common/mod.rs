#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hazard_world::{
    Cuboid, ExposureCapabilities, ExposureEngine, HazardConfig, InMemoryAttachmentStore,
    InMemoryEntityDirectory, InMemoryIndicatorService, InMemoryPermissions, InMemoryZoneMap,
    RecordingEffectApplier, RecordingMessageSink, WorldPos, ZoneRegion,
};

pub const WORLD: &str = "overworld";

pub fn temp_dir(prefix: &str) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("hazard-world-{prefix}-{unique}"))
}

pub struct TestWorld {
    pub engine: ExposureEngine,
    pub directory: InMemoryEntityDirectory,
    pub zone_map: InMemoryZoneMap,
    pub permissions: InMemoryPermissions,
    pub store: InMemoryAttachmentStore,
    pub indicators: InMemoryIndicatorService,
    pub messages: RecordingMessageSink,
    pub effects: RecordingEffectApplier,
}

impl TestWorld {
    /// One 10x10 column per configured zone, laid out along x every 20 blocks.
    pub fn new(config: &HazardConfig) -> Self {
        let zone_map = InMemoryZoneMap::new();
        for (index, zone) in config.zones.iter().enumerate() {
            let from_x = index as f64 * 20.0;
            zone_map.add_region(ZoneRegion::hazard(
                zone.id.as_str(),
                WORLD,
                Cuboid::new(
                    WorldPos::new(from_x, 0.0, 0.0),
                    WorldPos::new(from_x + 10.0, 256.0, 10.0),
                ),
                Some(zone.id.as_str()),
            ));
        }
        let directory = InMemoryEntityDirectory::new();
        let permissions = InMemoryPermissions::new();
        let store = InMemoryAttachmentStore::new();
        let indicators = InMemoryIndicatorService::new();
        let messages = RecordingMessageSink::new();
        let effects = RecordingEffectApplier::new();
        let capabilities = ExposureCapabilities {
            directory: Arc::new(directory.clone()),
            effects: Arc::new(effects.clone()),
            indicators: Arc::new(indicators.clone()),
            messages: Arc::new(messages.clone()),
            store: Arc::new(store.clone()),
        };
        let engine = ExposureEngine::from_config(
            config,
            capabilities,
            Arc::new(zone_map.clone()),
            Arc::new(permissions.clone()),
        )
        .expect("engine from config");
        Self {
            engine,
            directory,
            zone_map,
            permissions,
            store,
            indicators,
            messages,
            effects,
        }
    }

    /// Centre of the column built for the zone at `index`.
    pub fn zone_pos(index: usize) -> WorldPos {
        WorldPos::new(index as f64 * 20.0 + 5.0, 64.0, 5.0)
    }

    pub fn outside_pos() -> WorldPos {
        WorldPos::new(-50.0, 64.0, -50.0)
    }

    pub fn join(&mut self, entity_id: &str, name: &str, pos: WorldPos) {
        self.directory.place(entity_id, WORLD, pos);
        self.directory.set_display_name(entity_id, name);
        self.engine.connect(entity_id);
    }
}
