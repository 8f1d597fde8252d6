//! In-memory capability implementations backing tests and the demo world.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::error::CapabilityUnavailable;
use crate::geometry::{Cuboid, VerticalBounds, WorldPos};
use crate::types::{EntityId, WorldId};
use crate::zone::{
    EntityDirectory, EntityLocation, PermissionCheck, SpatialZoneQuery, ZoneQueryResult,
};

/// A cuboid region that may set the hazard flag and the classification.
/// Where regions overlap, each flag comes from the highest priority region
/// that sets it; ties go to the region added first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRegion {
    pub id: String,
    pub world: WorldId,
    pub bounds: Cuboid,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub hazardous: Option<bool>,
    #[serde(default)]
    pub classification: Option<String>,
}

impl ZoneRegion {
    pub fn hazard(
        id: impl Into<String>,
        world: impl Into<String>,
        bounds: Cuboid,
        classification: Option<&str>,
    ) -> Self {
        Self {
            id: id.into(),
            world: world.into(),
            bounds,
            priority: 0,
            hazardous: Some(true),
            classification: classification.map(str::to_string),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_hazardous(mut self, hazardous: Option<bool>) -> Self {
        self.hazardous = hazardous;
        self
    }
}

#[derive(Debug, Clone)]
pub struct InMemoryZoneMap {
    regions: Arc<Mutex<Vec<ZoneRegion>>>,
    bounds: Arc<Mutex<BTreeMap<WorldId, VerticalBounds>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryZoneMap {
    fn default() -> Self {
        Self {
            regions: Arc::default(),
            bounds: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }
}

impl InMemoryZoneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&self, region: ZoneRegion) {
        self.regions.lock().expect("lock regions").push(region);
    }

    pub fn remove_region(&self, id: &str) -> bool {
        let mut regions = self.regions.lock().expect("lock regions");
        let before = regions.len();
        regions.retain(|region| region.id != id);
        regions.len() != before
    }

    pub fn set_vertical_bounds(&self, world: &str, bounds: VerticalBounds) {
        self.bounds
            .lock()
            .expect("lock bounds")
            .insert(world.to_string(), bounds);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), CapabilityUnavailable> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(CapabilityUnavailable::new(
                "spatial zone query",
                "zone map not loaded",
            ))
        }
    }
}

impl SpatialZoneQuery for InMemoryZoneMap {
    fn vertical_bounds(&self, world: &str) -> Result<VerticalBounds, CapabilityUnavailable> {
        self.check_available()?;
        Ok(self
            .bounds
            .lock()
            .expect("lock bounds")
            .get(world)
            .copied()
            .unwrap_or_default())
    }

    fn query(&self, world: &str, pos: WorldPos) -> Result<ZoneQueryResult, CapabilityUnavailable> {
        self.check_available()?;
        let regions = self.regions.lock().expect("lock regions");
        let mut hits: Vec<(usize, &ZoneRegion)> = regions
            .iter()
            .enumerate()
            .filter(|(_, region)| region.world == world && region.bounds.contains(pos))
            .collect();
        hits.sort_by(|(ai, a), (bi, b)| b.priority.cmp(&a.priority).then(ai.cmp(bi)));

        let hazardous = hits
            .iter()
            .find_map(|(_, region)| region.hazardous)
            .unwrap_or(false);
        let classification = hits
            .iter()
            .find_map(|(_, region)| region.classification.clone());
        Ok(ZoneQueryResult {
            hazardous,
            classification,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityDirectory {
    entities: Arc<Mutex<BTreeMap<EntityId, (EntityLocation, Option<String>)>>>,
}

impl InMemoryEntityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place(&self, entity_id: &str, world: &str, pos: WorldPos) {
        let mut entities = self.entities.lock().expect("lock entities");
        let location = EntityLocation {
            world: world.to_string(),
            pos,
        };
        entities
            .entry(entity_id.to_string())
            .and_modify(|(current, _)| *current = location.clone())
            .or_insert((location, None));
    }

    pub fn set_display_name(&self, entity_id: &str, name: &str) {
        let mut entities = self.entities.lock().expect("lock entities");
        if let Some((_, display_name)) = entities.get_mut(entity_id) {
            *display_name = Some(name.to_string());
        }
    }

    pub fn remove(&self, entity_id: &str) {
        self.entities
            .lock()
            .expect("lock entities")
            .remove(entity_id);
    }
}

impl EntityDirectory for InMemoryEntityDirectory {
    fn locate(&self, entity_id: &str) -> Option<EntityLocation> {
        self.entities
            .lock()
            .expect("lock entities")
            .get(entity_id)
            .map(|(location, _)| location.clone())
    }

    fn display_name(&self, entity_id: &str) -> Option<String> {
        self.entities
            .lock()
            .expect("lock entities")
            .get(entity_id)
            .and_then(|(_, name)| name.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPermissions {
    granted: Arc<Mutex<BTreeMap<EntityId, BTreeSet<String>>>>,
}

impl InMemoryPermissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(&self, entity_id: &str, node: &str) {
        self.granted
            .lock()
            .expect("lock permissions")
            .entry(entity_id.to_string())
            .or_default()
            .insert(node.to_string());
    }

    pub fn revoke(&self, entity_id: &str, node: &str) {
        if let Some(nodes) = self
            .granted
            .lock()
            .expect("lock permissions")
            .get_mut(entity_id)
        {
            nodes.remove(node);
        }
    }
}

impl PermissionCheck for InMemoryPermissions {
    fn has_permission(&self, entity_id: &str, node: &str) -> bool {
        self.granted
            .lock()
            .expect("lock permissions")
            .get(entity_id)
            .is_some_and(|nodes| nodes.contains(node))
    }
}
