//! Root region manager: per-type indices, the type-erased index and the
//! per-player tracking state shared with the watcher.

use super::error::RegionError;
use super::ordered::OrderedRegions;
use super::region::{LeaveRegionReason, PriorityType, Region, RegionHandle, RegionReason};
use super::type_manager::{AnyTypeManager, IndexEntry, RegionTypeManager};
use crate::config::RegionConfig;
use crate::host::{TrackedPlayer, WorldQuery};
use crate::scheduler::{Scheduler, TaskHandle};
use crate::types::{Location, PlayerId, RegionId, WorldId};
use crate::utils::ElementCounter;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, trace};

/// A location sample queued between watcher cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedLocation {
    pub location: Location,
    pub reason: RegionReason,
}

/// Type-erased index plus the worlds that contain listener regions.
pub(super) struct RegionIndex {
    pub(super) regions: RegionTypeManager<dyn Region>,
    pub(super) region_types: HashMap<RegionId, TypeId>,
    pub(super) listener_worlds: ElementCounter<WorldId>,
}

/// Everything guarded by the coarse tracking lock.
#[derive(Default)]
pub(super) struct TrackingState {
    pub(super) samples: HashMap<PlayerId, VecDeque<CachedLocation>>,
    pub(super) cache: HashMap<PlayerId, OrderedRegions<RegionHandle>>,
    /// Incremented by every sampler cycle.
    pub(super) epoch: u64,
    /// Epochs of sampled batches the resolver has not finished yet.
    pub(super) in_flight: BTreeSet<u64>,
    /// Epoch at which a player left all regions, kept while an older batch is in flight.
    pub(super) departures: HashMap<PlayerId, u64>,
}

impl TrackingState {
    /// `true` if the player left all regions after samples of `epoch` were taken.
    pub(super) fn departed_since(&self, player: PlayerId, epoch: u64) -> bool {
        self.departures.get(&player).is_some_and(|departed| *departed >= epoch)
    }

    /// Marks `epoch` resolved and forgets departures no pending batch can see.
    pub(super) fn finish_epoch(&mut self, epoch: u64) {
        self.in_flight.remove(&epoch);
        match self.in_flight.first().copied() {
            Some(oldest) => self.departures.retain(|_, departed| *departed >= oldest),
            None => self.departures.clear(),
        }
    }
}

/// Registers regions and tracks which listener regions each player is in.
///
/// Regions are indexed twice: in a [`RegionTypeManager`] for their concrete
/// type, which backs the typed queries, and in a type-erased index of
/// [`RegionHandle`]s, which backs player tracking.
///
/// Player tracking is driven by the watcher (see [`RegionManager::start_watcher`]).
/// Hosts feed it with [`RegionManager::update_player_location`] and
/// [`RegionManager::leave_all_regions`].
///
/// # Lock Order
///
/// The tracking lock is always taken before the index lock, never the other way.
pub struct RegionManager {
    pub(super) config: RegionConfig,
    pub(super) scheduler: Arc<dyn Scheduler>,
    pub(super) worlds: Arc<dyn WorldQuery>,
    managers: DashMap<TypeId, Box<dyn AnyTypeManager>>,
    pub(super) index: RwLock<RegionIndex>,
    pub(super) sync: Mutex<TrackingState>,
    pub(super) watcher: Mutex<Option<TaskHandle>>,
}

impl RegionManager {
    pub fn new(config: RegionConfig, scheduler: Arc<dyn Scheduler>, worlds: Arc<dyn WorldQuery>) -> Self {
        Self {
            config,
            scheduler,
            worlds,
            managers: DashMap::new(),
            index: RwLock::new(RegionIndex {
                regions: RegionTypeManager::new(),
                region_types: HashMap::new(),
                listener_worlds: ElementCounter::new(),
            }),
            sync: Mutex::new(TrackingState::default()),
            watcher: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &RegionConfig {
        &self.config
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Registers a region with its type index and the type-erased index.
    ///
    /// Registering an already registered region refreshes its world, bounds and
    /// listener status.
    ///
    /// # Errors
    ///
    /// [`RegionError::Undefined`] if the region has no world or bounds, and
    /// [`RegionError::WorldNotLoaded`] if the host has not loaded its world.
    pub fn register<R: Region>(&self, region: Arc<R>) -> Result<(), RegionError> {
        if let Err(e) = self.check_registrable(region.as_ref()) {
            debug!("Failed to register region '{}': {}", region.name(), e);
            return Err(e);
        }

        {
            let mut manager = self
                .managers
                .entry(TypeId::of::<R>())
                .or_insert_with(|| Box::new(RegionTypeManager::<R>::new()));
            if let Some(typed) = manager.as_any_mut().downcast_mut::<RegionTypeManager<R>>() {
                typed.register(region.clone())?;
            }
        }

        let erased: Arc<dyn Region> = region.clone();
        let mut index = write(&self.index);
        let previous = index.regions.register(erased)?;
        index.region_types.insert(region.id(), TypeId::of::<R>());

        if let Some(previous) = previous {
            if previous.listener {
                index.listener_worlds.subtract(&previous.world);
            }
        }
        if region.is_event_listener() {
            if let Some(world) = region.world() {
                index.listener_worlds.add(world.clone());
            }
        }

        debug!("Registered region '{}' ({})", region.name(), region.id());
        Ok(())
    }

    /// Removes a region from every index. Returns `false` if it was not registered.
    pub fn unregister(&self, id: RegionId) -> bool {
        let mut index = write(&self.index);
        let Some(type_id) = index.region_types.remove(&id) else {
            return false;
        };

        if let Some(mut manager) = self.managers.get_mut(&type_id) {
            manager.unregister_erased(id);
        }

        if let Some(IndexEntry { world, listener }) = index.regions.unregister(id) {
            if listener {
                index.listener_worlds.subtract(&world);
            }
        }

        debug!("Unregistered region {}", id);
        true
    }

    fn check_registrable(&self, region: &dyn Region) -> Result<(), RegionError> {
        let world = match (region.world(), region.bounds()) {
            (Some(world), Some(_)) => world,
            _ => {
                return Err(RegionError::Undefined {
                    name: region.name().to_string(),
                })
            }
        };

        if !self.worlds.is_world_loaded(world) {
            return Err(RegionError::WorldNotLoaded {
                name: region.name().to_string(),
                world: world.to_string(),
            });
        }

        Ok(())
    }

    // ========================================================================
    // Typed Queries
    // ========================================================================

    pub fn has_region<R: Region>(&self, location: &Location) -> bool {
        self.with_manager::<R, _>(|m| m.has_region(location)).unwrap_or(false)
    }

    pub fn regions_at<R: Region>(&self, location: &Location) -> Vec<Arc<R>> {
        self.with_manager::<R, _>(|m| m.regions_at(location)).unwrap_or_default()
    }

    pub fn listener_regions_at<R: Region>(&self, location: &Location, order: Option<PriorityType>) -> Vec<Arc<R>> {
        self.with_manager::<R, _>(|m| m.listener_regions_at(location, order))
            .unwrap_or_default()
    }

    pub fn regions_in_chunk<R: Region>(&self, world: &WorldId, chunk_x: i64, chunk_z: i64) -> Vec<Arc<R>> {
        self.with_manager::<R, _>(|m| m.regions_in_chunk(world, chunk_x, chunk_z))
            .unwrap_or_default()
    }

    fn with_manager<R: Region, T>(&self, f: impl FnOnce(&RegionTypeManager<R>) -> T) -> Option<T> {
        let manager = self.managers.get(&TypeId::of::<R>())?;
        manager.as_any().downcast_ref::<RegionTypeManager<R>>().map(f)
    }

    // ========================================================================
    // Type-erased Queries
    // ========================================================================

    pub fn handle(&self, id: RegionId) -> Option<RegionHandle> {
        read(&self.index).regions.get(id).map(RegionHandle::new)
    }

    /// Every registered region, in registration order.
    pub fn handles(&self) -> Vec<RegionHandle> {
        read(&self.index).regions.regions().into_iter().map(RegionHandle::new).collect()
    }

    pub fn handles_at(&self, location: &Location) -> Vec<RegionHandle> {
        read(&self.index)
            .regions
            .regions_at(location)
            .into_iter()
            .map(RegionHandle::new)
            .collect()
    }

    pub fn listener_handles_at(&self, location: &Location, order: Option<PriorityType>) -> Vec<RegionHandle> {
        read(&self.index)
            .regions
            .listener_regions_at(location, order)
            .into_iter()
            .map(RegionHandle::new)
            .collect()
    }

    pub fn handles_in_chunk(&self, world: &WorldId, chunk_x: i64, chunk_z: i64) -> Vec<RegionHandle> {
        read(&self.index)
            .regions
            .regions_in_chunk(world, chunk_x, chunk_z)
            .into_iter()
            .map(RegionHandle::new)
            .collect()
    }

    pub fn region_count(&self) -> usize {
        read(&self.index).regions.len()
    }

    pub fn is_listener_world(&self, world: &WorldId) -> bool {
        read(&self.index).listener_worlds.contains(world)
    }

    /// Worlds with at least one listener region, sorted by name.
    pub fn listener_worlds(&self) -> Vec<WorldId> {
        let mut worlds = read(&self.index).listener_worlds.elements();
        worlds.sort();
        worlds
    }

    // ========================================================================
    // Player Tracking
    // ========================================================================

    /// Queues a location sample for the next watcher cycle.
    ///
    /// Dead and synthetic players are ignored. Samples in a world without
    /// listener regions are dropped unless the player is still in a region,
    /// in which case the sample is needed to fire the leave.
    pub fn update_player_location(&self, player: &dyn TrackedPlayer, location: Location, reason: RegionReason) {
        if player.is_dead() || player.is_synthetic() {
            return;
        }

        let listened = self.is_listener_world(&location.world);
        let id = player.id();
        let mut state = lock(&self.sync);
        if !listened && !state.cache.contains_key(&id) {
            trace!("Dropped sample of {} in {}: no listener regions", id, location.world);
            return;
        }

        state
            .samples
            .entry(id)
            .or_default()
            .push_back(CachedLocation { location, reason });
    }

    /// Removes the player from every region immediately, firing leave
    /// callbacks in LEAVE priority order on the calling thread.
    ///
    /// Queued samples for the player are discarded, and so are the results of
    /// a resolver pass already in flight for them. Callbacks run after the
    /// tracking lock is released.
    ///
    /// # Returns
    ///
    /// The number of regions the player left.
    pub fn leave_all_regions(&self, player: PlayerId, reason: LeaveRegionReason) -> usize {
        let regions = {
            let mut state = lock(&self.sync);
            state.samples.remove(&player);
            if !state.in_flight.is_empty() {
                let epoch = state.epoch;
                state.departures.insert(player, epoch);
            }
            match state.cache.remove(&player) {
                Some(cached) => cached.ordered(PriorityType::Leave),
                None => return 0,
            }
        };

        for region in &regions {
            if let Some(listener) = region.event_listener() {
                listener.on_player_leave(region, player, reason);
            }
        }

        regions.len()
    }

    /// Snapshot of the regions the player is currently believed to be in.
    ///
    /// The set is updated as soon as the watcher computes a delta, which can be
    /// before the matching enter or leave callback has run on the main thread.
    pub fn player_regions(&self, player: PlayerId) -> Vec<RegionHandle> {
        lock(&self.sync)
            .cache
            .get(&player)
            .map(|cached| cached.to_vec())
            .unwrap_or_default()
    }

    /// Forgets that the player is in `region`, so the next watcher pass fires
    /// enter again if the player is still inside.
    pub fn reset_player_region(&self, player: PlayerId, region: RegionId) -> bool {
        lock(&self.sync)
            .cache
            .get_mut(&player)
            .map(|cached| cached.remove(region).is_some())
            .unwrap_or(false)
    }

    /// Number of samples queued for the player.
    pub fn queued_samples(&self, player: PlayerId) -> usize {
        lock(&self.sync).samples.get(&player).map(VecDeque::len).unwrap_or(0)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Stops the watcher and drops all tracking state.
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.watcher).take() {
            handle.cancel();
        }
        let mut state = lock(&self.sync);
        state.samples.clear();
        state.cache.clear();
        state.departures.clear();
        info!("🛑 Region tracking stopped");
    }
}

impl std::fmt::Debug for RegionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionManager")
            .field("config", &self.config)
            .field("regions", &self.region_count())
            .finish()
    }
}

// A panicking listener or resolver must not wedge tracking for everyone else,
// so poisoned locks are recovered.
pub(super) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
