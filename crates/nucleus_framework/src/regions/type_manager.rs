//! R*-tree backed index of the regions of one concrete region type.
//!
//! Each world gets its own tree. The tree narrows a point or chunk query down to
//! candidate envelopes; [`Region::contains`] makes the final decision.

use super::error::RegionError;
use super::region::{PriorityType, Region};
use crate::types::{Location, RegionBounds, RegionId, WorldId};
use rstar::{RTree, RTreeObject, AABB};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Entry stored inside the R-tree.
struct IndexedRegion<R: ?Sized> {
    region: Arc<R>,
    id: RegionId,
    world: WorldId,
    bounds: RegionBounds,
    listener: bool,
    seq: u64,
}

impl<R: ?Sized> Clone for IndexedRegion<R> {
    fn clone(&self) -> Self {
        Self {
            region: self.region.clone(),
            id: self.id,
            world: self.world.clone(),
            bounds: self.bounds,
            listener: self.listener,
            seq: self.seq,
        }
    }
}

impl<R: ?Sized> PartialEq for IndexedRegion<R> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<R: ?Sized> RTreeObject for IndexedRegion<R> {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bounds.min(), self.bounds.max())
    }
}

/// Where a region sat in the index, and whether it counted as a listener.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub world: WorldId,
    pub listener: bool,
}

/// Spatial index for one region type.
pub struct RegionTypeManager<R: Region + ?Sized> {
    worlds: HashMap<WorldId, RTree<IndexedRegion<R>>>,
    regions: HashMap<RegionId, IndexedRegion<R>>,
    next_seq: u64,
}

impl<R: Region + ?Sized> RegionTypeManager<R> {
    pub fn new() -> Self {
        Self {
            worlds: HashMap::new(),
            regions: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Indexes `region`, replacing a previous registration of the same region.
    ///
    /// # Returns
    ///
    /// The previous [`IndexEntry`] when the region was already registered.
    pub fn register(&mut self, region: Arc<R>) -> Result<Option<IndexEntry>, RegionError> {
        let (world, bounds) = match (region.world(), region.bounds()) {
            (Some(world), Some(bounds)) => (world.clone(), bounds),
            _ => {
                return Err(RegionError::Undefined {
                    name: region.name().to_string(),
                })
            }
        };

        let id = region.id();
        let previous = self.remove_entry(id);
        let seq = match &previous {
            Some(entry) => entry.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };

        let entry = IndexedRegion {
            listener: region.is_event_listener(),
            region,
            id,
            world: world.clone(),
            bounds,
            seq,
        };

        self.worlds.entry(world).or_insert_with(RTree::new).insert(entry.clone());
        self.regions.insert(id, entry);

        Ok(previous.map(|e| IndexEntry {
            world: e.world,
            listener: e.listener,
        }))
    }

    pub fn unregister(&mut self, id: RegionId) -> Option<IndexEntry> {
        self.remove_entry(id).map(|e| IndexEntry {
            world: e.world,
            listener: e.listener,
        })
    }

    pub fn get(&self, id: RegionId) -> Option<Arc<R>> {
        self.regions.get(&id).map(|e| e.region.clone())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// All regions, in registration order.
    pub fn regions(&self) -> Vec<Arc<R>> {
        let mut entries: Vec<&IndexedRegion<R>> = self.regions.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.region.clone()).collect()
    }

    pub fn has_region(&self, location: &Location) -> bool {
        self.candidates_at(location)
            .into_iter()
            .any(|e| e.region.contains(location))
    }

    /// Regions containing `location`, in registration order.
    pub fn regions_at(&self, location: &Location) -> Vec<Arc<R>> {
        self.collect_at(location, false, None)
    }

    /// Event-listener regions containing `location`.
    ///
    /// With a [`PriorityType`] the result is sorted by that priority, ties broken
    /// by registration order. Without one it is in registration order.
    pub fn listener_regions_at(&self, location: &Location, order: Option<PriorityType>) -> Vec<Arc<R>> {
        self.collect_at(location, true, order)
    }

    /// Regions intersecting the 16x16 chunk column at `chunk_x`, `chunk_z`.
    pub fn regions_in_chunk(&self, world: &WorldId, chunk_x: i64, chunk_z: i64) -> Vec<Arc<R>> {
        let Some(tree) = self.worlds.get(world) else {
            return Vec::new();
        };

        let min_x = (chunk_x * 16) as f64;
        let min_z = (chunk_z * 16) as f64;
        let envelope = AABB::from_corners(
            [min_x, f64::MIN, min_z],
            [min_x + 16.0 - 1e-9, f64::MAX, min_z + 16.0 - 1e-9],
        );

        let mut entries: Vec<&IndexedRegion<R>> = tree.locate_in_envelope_intersecting(&envelope).collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter().map(|e| e.region.clone()).collect()
    }

    fn candidates_at(&self, location: &Location) -> Vec<&IndexedRegion<R>> {
        let envelope = AABB::from_point(location.position.as_point());
        match self.worlds.get(&location.world) {
            Some(tree) => tree.locate_in_envelope_intersecting(&envelope).collect(),
            None => Vec::new(),
        }
    }

    fn collect_at(&self, location: &Location, listeners_only: bool, order: Option<PriorityType>) -> Vec<Arc<R>> {
        let mut entries: Vec<&IndexedRegion<R>> = self
            .candidates_at(location)
            .into_iter()
            .filter(|e| !listeners_only || e.listener)
            .filter(|e| e.region.contains(location))
            .collect();

        match order {
            Some(kind) => entries.sort_by_key(|e| (e.region.priority(kind).sort_order(), e.seq)),
            None => entries.sort_by_key(|e| e.seq),
        }

        entries.into_iter().map(|e| e.region.clone()).collect()
    }

    fn remove_entry(&mut self, id: RegionId) -> Option<IndexedRegion<R>> {
        let entry = self.regions.remove(&id)?;
        if let Some(tree) = self.worlds.get_mut(&entry.world) {
            tree.remove(&entry);
            if tree.size() == 0 {
                self.worlds.remove(&entry.world);
            }
        }
        Some(entry)
    }
}

impl<R: Region + ?Sized> Default for RegionTypeManager<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased access to a [`RegionTypeManager`], used by the root manager to
/// store one manager per concrete region type.
pub(crate) trait AnyTypeManager: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn unregister_erased(&mut self, id: RegionId) -> Option<IndexEntry>;
}

impl<R: Region> AnyTypeManager for RegionTypeManager<R> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn unregister_erased(&mut self, id: RegionId) -> Option<IndexEntry> {
        self.unregister(id)
    }
}
