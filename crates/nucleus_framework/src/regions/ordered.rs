//! Per-player set of regions that currently contain the player.

use super::region::{PriorityType, Region, RegionHandle, RegionPriority};
use crate::types::RegionId;
use smallvec::SmallVec;
use std::sync::Arc;

/// Anything that can be ordered by region priority.
pub trait PrioritizedRegion: Clone {
    fn region_id(&self) -> RegionId;

    fn region_priority(&self, kind: PriorityType) -> RegionPriority;
}

impl PrioritizedRegion for RegionHandle {
    fn region_id(&self) -> RegionId {
        self.id()
    }

    fn region_priority(&self, kind: PriorityType) -> RegionPriority {
        self.priority(kind)
    }
}

impl<R: Region + ?Sized> PrioritizedRegion for Arc<R> {
    fn region_id(&self) -> RegionId {
        self.id()
    }

    fn region_priority(&self, kind: PriorityType) -> RegionPriority {
        self.priority(kind)
    }
}

#[derive(Debug, Clone)]
struct Entry<R> {
    seq: u64,
    region: R,
}

/// A set of regions with two iteration orders.
///
/// ENTER order sorts by enter priority, ties broken by insertion order.
/// LEAVE order sorts by leave priority, ties broken by reverse insertion
/// order, so the most recently entered region is left first.
#[derive(Debug, Clone)]
pub struct OrderedRegions<R> {
    entries: SmallVec<[Entry<R>; 4]>,
    next_seq: u64,
}

impl<R: PrioritizedRegion> OrderedRegions<R> {
    pub fn new() -> Self {
        Self {
            entries: SmallVec::new(),
            next_seq: 0,
        }
    }

    /// Adds `region`, returning `false` if it was already present.
    pub fn add(&mut self, region: R) -> bool {
        if self.contains(region.region_id()) {
            return false;
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push(Entry { seq, region });
        true
    }

    pub fn remove(&mut self, id: RegionId) -> Option<R> {
        let index = self.entries.iter().position(|e| e.region.region_id() == id)?;
        Some(self.entries.remove(index).region)
    }

    pub fn contains(&self, id: RegionId) -> bool {
        self.entries.iter().any(|e| e.region.region_id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Regions sorted for firing events of the given type.
    pub fn ordered(&self, kind: PriorityType) -> Vec<R> {
        let mut sorted: Vec<&Entry<R>> = self.entries.iter().collect();
        match kind {
            PriorityType::Enter => {
                sorted.sort_by_key(|e| (e.region.region_priority(kind).sort_order(), e.seq));
            }
            PriorityType::Leave => {
                sorted.sort_by_key(|e| (e.region.region_priority(kind).sort_order(), std::cmp::Reverse(e.seq)));
            }
        }
        sorted.into_iter().map(|e| e.region.clone()).collect()
    }

    /// Regions in insertion order.
    pub fn to_vec(&self) -> Vec<R> {
        self.entries.iter().map(|e| e.region.clone()).collect()
    }
}

impl<R: PrioritizedRegion> Default for OrderedRegions<R> {
    fn default() -> Self {
        Self::new()
    }
}
