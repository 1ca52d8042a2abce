//! # Player Watcher
//!
//! Two-phase containment tracking.
//!
//! 1. **Sampler** (main thread, every `watcher_interval_ticks`): for each world
//!    with a listener region, drain the queued samples of the players present
//!    in it into a [`WorldSamples`] batch. An empty batch ends the cycle.
//! 2. **Resolver** (off the main thread, `resolver_delay_ticks` later): under
//!    the tracking lock, replay each player's samples in FIFO order. Every
//!    sample is diffed against the player's cached region set; newly entered
//!    regions are added and newly left regions removed at once, and the
//!    matching listener callbacks are scheduled back onto the main thread, one
//!    task per region and player.
//!
//! The lock is taken per world batch and is never held while a callback runs.
//!
//! Every batch carries the sampler epoch it was taken in. A player who leaves
//! all regions while an older batch is still being resolved is tombstoned at
//! the current epoch, and the resolver discards their results from that batch.

use super::manager::{lock, CachedLocation, RegionManager};
use super::region::{PriorityType, RegionHandle};
use crate::scheduler::TaskHandle;
use crate::types::{PlayerId, WorldId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Samples drained for one player.
#[derive(Debug, Clone)]
pub struct PlayerSamples {
    pub player: PlayerId,
    pub samples: Vec<CachedLocation>,
}

/// Samples drained for the players of one world.
#[derive(Debug, Clone)]
pub struct WorldSamples {
    pub world: WorldId,
    pub players: Vec<PlayerSamples>,
}

/// Everything one sampler cycle hands to the resolver.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    /// Sampler cycle the samples were taken in.
    pub epoch: u64,
    pub worlds: Vec<WorldSamples>,
}

impl SampleBatch {
    pub fn is_empty(&self) -> bool {
        self.worlds.is_empty()
    }
}

impl RegionManager {
    /// Installs the sampler on the scheduler. Calling it again returns the
    /// existing handle.
    pub fn start_watcher(self: &Arc<Self>) -> TaskHandle {
        let mut watcher = lock(&self.watcher);
        if let Some(handle) = watcher.as_ref() {
            if !handle.is_cancelled() {
                return handle.clone();
            }
        }

        let period = self.config.watcher_interval_ticks;
        let manager = Arc::downgrade(self);
        let handle = self.scheduler.run_repeating(
            period,
            period,
            Box::new(move || {
                if let Some(manager) = manager.upgrade() {
                    manager.run_watcher_cycle();
                }
            }),
        );

        info!("👀 Region watcher started (every {} ticks)", period);
        *watcher = Some(handle.clone());
        handle
    }

    /// One sampler cycle: drain samples and hand them to the resolver.
    pub fn run_watcher_cycle(self: &Arc<Self>) {
        let batch = self.sample_players();
        if batch.is_empty() {
            return;
        }

        trace!("Region watcher queued {} world batch(es)", batch.worlds.len());
        let manager = Arc::clone(self);
        self.scheduler.run_async_later(
            self.config.resolver_delay_ticks,
            Box::new(move || manager.resolve_batch(batch)),
        );
    }

    /// Phase 1. Drains the queued samples of every player present in a world
    /// that has listener regions, plus those of players still in a region who
    /// moved to a world without any.
    ///
    /// Queues left behind by players who are in no region and whose last
    /// sample is outside every listener world are dropped.
    pub fn sample_players(&self) -> SampleBatch {
        let listener_worlds: HashSet<WorldId> = self.listener_worlds().into_iter().collect();
        let present: Vec<(WorldId, Vec<PlayerId>)> = listener_worlds
            .iter()
            .map(|world| (world.clone(), self.worlds.players_in(world)))
            .filter(|(_, players)| !players.is_empty())
            .collect();

        let mut guard = lock(&self.sync);
        let state = &mut *guard;
        state.epoch += 1;
        let epoch = state.epoch;
        let mut drained = HashSet::new();
        let mut worlds = Vec::new();

        for (world, players) in present {
            let players: Vec<PlayerSamples> = players
                .into_iter()
                .filter_map(|player| {
                    drained.insert(player);
                    drain(&mut state.samples, player)
                })
                .collect();

            if !players.is_empty() {
                worlds.push(WorldSamples { world, players });
            }
        }

        let mut strays: HashMap<WorldId, Vec<PlayerSamples>> = HashMap::new();
        let stray_players: Vec<(PlayerId, WorldId)> = state
            .samples
            .iter()
            .filter(|(player, _)| !drained.contains(*player) && state.cache.contains_key(*player))
            .filter_map(|(player, queue)| queue.back().map(|last| (*player, last.location.world.clone())))
            .collect();
        for (player, world) in stray_players {
            if let Some(samples) = drain(&mut state.samples, player) {
                strays.entry(world).or_default().push(samples);
            }
        }
        worlds.extend(strays.into_iter().map(|(world, players)| WorldSamples { world, players }));

        let cache = &state.cache;
        state.samples.retain(|player, queue| match queue.back() {
            Some(last) => cache.contains_key(player) || listener_worlds.contains(&last.location.world),
            None => false,
        });

        if !worlds.is_empty() {
            state.in_flight.insert(epoch);
        }
        SampleBatch { epoch, worlds }
    }

    /// Phase 2. Replays the samples and schedules enter/leave callbacks.
    ///
    /// Players who left all regions after the batch was sampled are skipped.
    ///
    /// # Panics
    ///
    /// Panics when a sample's reason has no enter (or leave) mapping but the
    /// sample enters (or leaves) a region. That is a bug in the caller that
    /// queued the sample.
    pub fn resolve_batch(&self, batch: SampleBatch) {
        let epoch = batch.epoch;
        let _finished = FinishEpoch { manager: self, epoch };
        for world in batch.worlds {
            let mut state = lock(&self.sync);

            for PlayerSamples { player, samples } in world.players {
                if state.departed_since(player, epoch) {
                    debug!("Discarded samples of {}: left all regions during resolve", player);
                    continue;
                }
                let cached = state.cache.entry(player).or_default();

                for sample in samples {
                    let current = self.listener_handles_at(&sample.location, Some(PriorityType::Enter));

                    for region in &current {
                        if cached.add(region.clone()) {
                            let reason = sample.reason.enter_reason().unwrap_or_else(|| {
                                panic!("{:?} has no enter reason but entered region '{}'", sample.reason, region.name())
                            });
                            self.schedule_enter(region.clone(), player, reason);
                        }
                    }

                    for region in cached.ordered(PriorityType::Leave) {
                        if current.contains(&region) {
                            continue;
                        }
                        cached.remove(region.id());
                        let reason = sample.reason.leave_reason().unwrap_or_else(|| {
                            panic!("{:?} has no leave reason but left region '{}'", sample.reason, region.name())
                        });
                        self.schedule_leave(region, player, reason);
                    }
                }

                if cached.is_empty() {
                    state.cache.remove(&player);
                }
            }
        }
    }

    /// Enter callbacks are skipped for players who went offline meanwhile;
    /// their leaves already fired when they quit.
    fn schedule_enter(&self, region: RegionHandle, player: PlayerId, reason: super::EnterRegionReason) {
        debug!("Player {} entered region '{}'", player, region.name());
        let worlds = Arc::clone(&self.worlds);
        self.scheduler.run_on_main(Box::new(move || {
            if !worlds.is_online(player) {
                debug!("Skipped enter of '{}' for offline player {}", region.name(), player);
                return;
            }
            let listener = region
                .event_listener()
                .unwrap_or_else(|| panic!("Region '{}' is an event listener without a listener", region.name()));
            listener.on_player_enter(&region, player, reason);
        }));
    }

    fn schedule_leave(&self, region: RegionHandle, player: PlayerId, reason: super::LeaveRegionReason) {
        debug!("Player {} left region '{}'", player, region.name());
        self.scheduler.run_on_main(Box::new(move || {
            let listener = region
                .event_listener()
                .unwrap_or_else(|| panic!("Region '{}' is an event listener without a listener", region.name()));
            listener.on_player_leave(&region, player, reason);
        }));
    }
}

/// Marks a batch resolved, even when the resolver panics.
struct FinishEpoch<'a> {
    manager: &'a RegionManager,
    epoch: u64,
}

impl Drop for FinishEpoch<'_> {
    fn drop(&mut self) {
        lock(&self.manager.sync).finish_epoch(self.epoch);
    }
}

fn drain(samples: &mut HashMap<PlayerId, VecDeque<CachedLocation>>, player: PlayerId) -> Option<PlayerSamples> {
    let queue = samples.get_mut(&player)?;
    if queue.is_empty() {
        return None;
    }
    Some(PlayerSamples {
        player,
        samples: queue.drain(..).collect(),
    })
}
