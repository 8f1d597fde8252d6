mod common;

use std::fs;

use common::{temp_dir, TestWorld};
use hazard_world::{
    AttachmentStore, AttachmentValue, ClearReason, ExposureSnapshot, HazardConfig,
    IndicatorStyle, MitigationEffect, StatusEffect, ZoneState, LEGACY_EFFECT_ID,
};

const CONFIG: &str = r##"
[engine]
evaluation_interval_ms = 500
decay_interval_ms = 1000

[zones.core]
enter_message = "&e{0} strayed into the {1}"

[zones.core.indicator]
title = "&lReactor Core"
color = "red"
style = "segmented_10"
flags = ["darken_sky", "create_fog"]

[zones.core.effects.poison]
level = 3
duration_ms = 2000

[zones.wastes.indicator]
title = "Wastes"
color = "yellow"

[zones.wastes.effects.hunger]

[mitigation_items.iodine]
name = "Iodine Tablet"
duration_s = 5
zone_ids = ["core"]
drink_message = "{0} swallowed an {1}"

[mitigation_items.hazmat]
name = "Hazmat Flask"
duration_s = 60

[mitigation_indicators.iodine]
title = "Iodine"
color = "green"
style = "segmented_20"
"##;

fn load_config() -> HazardConfig {
    let dir = temp_dir("scenarios");
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join("hazard.toml");
    fs::write(&path, CONFIG).expect("write config");
    let config = HazardConfig::from_config_file(&path).expect("load config");
    let _ = fs::remove_dir_all(&dir);
    config
}

#[test]
fn config_file_drives_zones_items_and_templates() {
    let config = load_config();

    assert_eq!(config.engine.evaluation_interval_ms, 500);
    assert_eq!(
        config.zones.iter().map(|zone| zone.id.as_str()).collect::<Vec<_>>(),
        vec!["core", "wastes"]
    );
    let core = config.zone("core").expect("core");
    assert_eq!(core.indicator.title, "§lReactor Core");
    assert_eq!(core.indicator.style, IndicatorStyle::Segmented10);
    assert_eq!(core.effects, vec![StatusEffect::from_level("poison", 3, 2_000)]);
    let iodine = config.item("iodine").expect("iodine");
    assert_eq!(iodine.duration_ms(), 5_000);
    assert_eq!(
        iodine.effect(),
        MitigationEffect::new("iodine", 5_000, Some(vec!["core".to_string()]))
    );
}

#[test]
fn exposure_lifecycle_from_entry_to_expiry() {
    let config = load_config();
    let mut world = TestWorld::new(&config);
    world.join("p1", "Nova", TestWorld::zone_pos(0));

    // First evaluation at 500 ms: exposed, announced, poisoned.
    world.engine.advance(500);
    assert_eq!(world.engine.zone_state("p1", "core"), Some(ZoneState::Exposed));
    let sent = world.messages.take();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].message, "§c§eNova§r strayed into the core");
    assert_eq!(
        world.indicators.titles_for("p1"),
        vec!["§4§lReactor Core".to_string()]
    );

    // Drinking the scoped item turns the exposure into a warning.
    let iodine = config.item("iodine").expect("iodine");
    world
        .engine
        .ledger()
        .append("p1", iodine.effect())
        .expect("grant iodine");
    assert_eq!(
        iodine.drink_message("Nova").as_deref(),
        Some("§cNova§r swallowed an Iodine Tablet")
    );
    world.effects.clear();
    world.engine.advance(500);
    assert_eq!(world.engine.zone_state("p1", "core"), Some(ZoneState::Warned));
    assert!(world.effects.applied().is_empty());
    let mut titles = world.indicators.titles_for("p1");
    titles.sort();
    assert_eq!(
        titles,
        vec!["§4§lReactor Core".to_string(), "§aIodine".to_string()]
    );

    // Five seconds of decay use the tablet up.
    let report = world.engine.advance(5_000);
    let expired: usize = report.decays.iter().map(|decay| decay.expired.len()).sum();
    assert_eq!(expired, 1);
    assert_eq!(world.engine.zone_state("p1", "core"), Some(ZoneState::Exposed));
    assert!(!world.effects.applied_to("p1").is_empty());
    assert_eq!(world.messages.take().len(), 1);
    assert!(world.indicators.find("§aIodine").is_none());
}

#[test]
fn unscoped_item_protects_in_every_zone() {
    let config = load_config();
    let mut world = TestWorld::new(&config);
    let hazmat = config.item("hazmat").expect("hazmat");
    world
        .engine
        .ledger()
        .append("p1", hazmat.effect())
        .expect("grant hazmat");
    world.join("p1", "Nova", TestWorld::zone_pos(1));

    world.engine.evaluation_tick();

    assert_eq!(world.engine.zone_state("p1", "wastes"), Some(ZoneState::Warned));
    // No template for the flask, so the fallback title is used.
    assert!(world.indicators.find("§aLugol's Iodine Effect").is_some());
}

#[test]
fn death_clears_ledger_and_legacy_fields() {
    let config = load_config();
    let mut world = TestWorld::new(&config);
    let keys = world.engine.ledger().keys().clone();
    world
        .store
        .set("p1", &keys.legacy_initial_seconds, AttachmentValue::Int(300))
        .expect("seed legacy");
    world
        .store
        .set("p1", &keys.legacy_seconds_left, AttachmentValue::Int(120))
        .expect("seed legacy");
    world.join("p1", "Nova", TestWorld::zone_pos(0));

    world.engine.evaluation_tick();
    assert_eq!(world.engine.zone_state("p1", "core"), Some(ZoneState::Warned));
    let listed = world.engine.ledger().list("p1").expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, LEGACY_EFFECT_ID);

    world
        .engine
        .clear_mitigation("p1", ClearReason::Death)
        .expect("clear");
    assert!(world.store.keys_for("p1").is_empty());
    world.engine.evaluation_tick();
    assert_eq!(world.engine.zone_state("p1", "core"), Some(ZoneState::Exposed));
}

#[test]
fn snapshot_round_trips_through_json() {
    let config = load_config();
    let mut world = TestWorld::new(&config);
    world.join("p1", "Nova", TestWorld::zone_pos(0));
    world.join("p2", "Orion", TestWorld::outside_pos());
    world.engine.advance(1_000);

    let snapshot = world.engine.snapshot();
    let json = snapshot.to_json().expect("json");
    let parsed: ExposureSnapshot = serde_json::from_str(&json).expect("parse snapshot");

    assert_eq!(parsed, snapshot);
    assert_eq!(parsed.evaluation_ticks, 2);
    assert_eq!(parsed.decay_ticks, 1);
    assert_eq!(parsed.zones[0].affected, vec!["p1".to_string()]);
    assert_eq!(parsed.live_indicators, 1);
}
