use hazard_world_proto::encode_effects;

use super::*;
use crate::config::ZoneDescriptor;
use crate::geometry::VerticalBounds;
use crate::indicator::IndicatorTemplate;
use crate::store::{AttachmentStore, AttachmentValue};
use crate::types::immunity_permission;

fn future_version_blob() -> Vec<u8> {
    let mut bytes = encode_effects(&[core_iodine(600_000)]).expect("encode");
    bytes[..2].copy_from_slice(&99u16.to_be_bytes());
    bytes
}

#[test]
fn unknown_protocol_version_skips_only_that_entity() {
    let mut harness = Harness::new();
    let key = harness.engine.ledger().keys().effect_data.clone();
    let blob = future_version_blob();
    harness
        .store
        .set("p1", &key, AttachmentValue::Bytes(blob.clone()))
        .expect("seed blob");
    harness.join("p1", core_pos());
    harness.join("p2", core_pos());

    let evaluation = harness.engine.evaluation_tick();
    let decay = harness.engine.decay_tick();

    assert_eq!(evaluation.evaluated, 1);
    assert_eq!(evaluation.skipped.len(), 1);
    assert_eq!(evaluation.skipped[0].entity_id, "p1");
    assert!(evaluation.skipped[0].reason.contains("99"));
    assert_eq!(harness.state("p1", "core"), ZoneState::Safe);
    assert_eq!(harness.state("p2", "core"), ZoneState::Exposed);

    assert_eq!(decay.decayed, 1);
    assert_eq!(decay.skipped.len(), 1);
    assert_eq!(
        harness.store.get("p1", &key).expect("read blob"),
        Some(AttachmentValue::Bytes(blob))
    );
}

#[test]
fn unavailable_store_skips_every_entity() {
    let mut harness = Harness::new();
    harness.join("p1", core_pos());
    harness.engine.evaluation_tick();
    harness.effects.clear();

    harness.store.set_unavailable(true);
    let report = harness.engine.evaluation_tick();

    assert_eq!(report.evaluated, 0);
    assert_eq!(report.skipped.len(), 1);
    assert!(report.transitions.is_empty());
    assert!(harness.effects.applied().is_empty());
    // Skipped entities keep their previous state and indicators.
    assert_eq!(harness.state("p1", "core"), ZoneState::Exposed);
    assert_eq!(harness.indicators.titles_for("p1"), vec!["§4Core".to_string()]);

    harness.store.set_unavailable(false);
    let report = harness.engine.evaluation_tick();
    assert_eq!(report.evaluated, 1);
    assert_eq!(harness.effects.applied_to("p1").len(), 1);
}

#[test]
fn grant_fails_while_store_is_unavailable() {
    let harness = Harness::new();
    harness.store.set_unavailable(true);
    let err = harness
        .engine
        .ledger()
        .append("p1", core_iodine(1_000))
        .expect_err("store off");
    assert!(matches!(err, StorageError::Unavailable { .. }));
    assert!(!err.is_unsupported_protocol());
}

#[test]
fn unavailable_zone_query_fails_open_by_default() {
    let mut harness = Harness::new();
    harness.join("p1", core_pos());
    harness.engine.evaluation_tick();
    assert_eq!(harness.state("p1", "core"), ZoneState::Exposed);

    harness.zone_map.set_available(false);
    let report = harness.engine.evaluation_tick();

    assert_eq!(harness.state("p1", "core"), ZoneState::Safe);
    assert_eq!(report.transitions_for("p1").len(), 1);
    assert!(harness.indicators.live().is_empty());
}

#[test]
fn unavailable_zone_query_can_fail_closed() {
    let content = TEST_CONFIG.replace(
        "decay_interval_ms = 1000\n",
        "decay_interval_ms = 1000\ncapability_policy = \"fail_closed\"\n",
    );
    let mut harness = Harness::with_config(&content);
    harness.join("p1", outside_pos());
    harness.zone_map.set_available(false);

    harness.engine.evaluation_tick();

    assert_eq!(harness.state("p1", "core"), ZoneState::Exposed);
    assert_eq!(harness.state("p1", "rim"), ZoneState::Exposed);
}

#[test]
fn immunity_permission_bypasses_zone() {
    let mut harness = Harness::new();
    harness
        .permissions
        .grant("p1", &immunity_permission("core"));
    harness.join("p1", core_pos());
    harness.join("p2", core_pos());

    harness.engine.evaluation_tick();

    assert_eq!(harness.state("p1", "core"), ZoneState::Safe);
    assert_eq!(harness.state("p2", "core"), ZoneState::Exposed);
}

#[test]
fn duplicate_zone_is_rejected() {
    let mut harness = Harness::new();
    let err = harness
        .engine
        .add_zone(
            ZoneDescriptor::new("core", IndicatorTemplate::default()),
            |_: &str| true,
        )
        .expect_err("duplicate");
    assert!(matches!(err, EngineError::DuplicateZone { zone_id } if zone_id == "core"));
    assert_eq!(harness.engine.zone_ids(), vec!["core", "rim"]);
}

#[test]
fn clearing_mitigation_propagates_store_errors() {
    let harness = Harness::new();
    harness.store.set_unavailable(true);
    assert!(harness
        .engine
        .clear_mitigation("p1", ClearReason::Death)
        .is_err());
}

#[test]
fn inverted_world_bounds_do_not_abort_the_tick() {
    let mut harness = Harness::new();
    harness.zone_map.set_vertical_bounds(
        "overworld",
        VerticalBounds {
            min_y: 320.0,
            max_y: -64.0,
        },
    );
    harness.join("p1", core_pos());
    harness.join("p2", outside_pos());

    let report = harness.engine.evaluation_tick();

    assert_eq!(report.evaluated, 2);
    assert!(report.skipped.is_empty());
    assert_eq!(harness.state("p1", "core"), ZoneState::Exposed);
    assert_eq!(harness.state("p2", "core"), ZoneState::Safe);
}
