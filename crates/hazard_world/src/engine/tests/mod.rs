//! Tests for the exposure engine.

use super::*;
use crate::effects::RecordingEffectApplier;
use crate::geometry::{Cuboid, WorldPos};
use crate::indicator::InMemoryIndicatorService;
use crate::messages::RecordingMessageSink;
use crate::store::InMemoryAttachmentStore;
use crate::zone_map::{InMemoryEntityDirectory, InMemoryPermissions, InMemoryZoneMap, ZoneRegion};
use hazard_world_proto::MitigationEffect;

const WORLD: &str = "overworld";

const TEST_CONFIG: &str = r##"
[engine]
evaluation_interval_ms = 1000
decay_interval_ms = 1000

[zones.core]
enter_message = "{0} entered the {1} zone"

[zones.core.indicator]
title = "Core"
color = "red"

[zones.core.effects.poison]
level = 2

[zones.rim.indicator]
title = "Rim"
color = "yellow"

[zones.rim.effects.nausea]
level = 1

[mitigation_indicators.iodine]
title = "Iodine"
color = "green"
style = "segmented_20"
"##;

fn core_pos() -> WorldPos {
    WorldPos::new(5.0, 5.0, 5.0)
}

fn rim_pos() -> WorldPos {
    WorldPos::new(25.0, 5.0, 5.0)
}

fn outside_pos() -> WorldPos {
    WorldPos::new(50.0, 5.0, 5.0)
}

fn region(id: &str, from_x: f64) -> ZoneRegion {
    ZoneRegion::hazard(
        id,
        WORLD,
        Cuboid::new(
            WorldPos::new(from_x, 0.0, 0.0),
            WorldPos::new(from_x + 10.0, 100.0, 10.0),
        ),
        Some(id),
    )
}

struct Harness {
    engine: ExposureEngine,
    directory: InMemoryEntityDirectory,
    zone_map: InMemoryZoneMap,
    permissions: InMemoryPermissions,
    store: InMemoryAttachmentStore,
    indicators: InMemoryIndicatorService,
    messages: RecordingMessageSink,
    effects: RecordingEffectApplier,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(TEST_CONFIG)
    }

    fn with_config(content: &str) -> Self {
        let config = HazardConfig::from_toml_str(content).expect("test config");
        let directory = InMemoryEntityDirectory::new();
        let zone_map = InMemoryZoneMap::new();
        zone_map.add_region(region("core", 0.0));
        zone_map.add_region(region("rim", 20.0));
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
            &config,
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

    fn join(&mut self, entity_id: &str, pos: WorldPos) {
        self.directory.place(entity_id, WORLD, pos);
        self.engine.connect(entity_id);
    }

    fn move_to(&self, entity_id: &str, pos: WorldPos) {
        self.directory.place(entity_id, WORLD, pos);
    }

    fn grant(&self, entity_id: &str, effect: MitigationEffect) {
        self.engine
            .ledger()
            .append(entity_id, effect)
            .expect("grant mitigation");
    }

    fn state(&self, entity_id: &str, zone_id: &str) -> ZoneState {
        self.engine
            .zone_state(entity_id, zone_id)
            .expect("zone exists")
    }
}

fn core_iodine(duration_ms: i64) -> MitigationEffect {
    MitigationEffect::new("iodine", duration_ms, Some(vec!["core".to_string()]))
}

mod failures;
