//! End-to-end tests for the region tracker: sampler, resolver and callbacks
//! driven through a real [`TickScheduler`].

use super::*;
use crate::config::RegionConfig;
use crate::host::{SimulatedWorld, WorldQuery};
use crate::scheduler::TickScheduler;
use crate::types::{Location, PlayerId, Position, WorldId};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

#[derive(Debug, Clone, PartialEq)]
enum Fired {
    Enter(String, EnterRegionReason),
    Leave(String, LeaveRegionReason),
}

#[derive(Default)]
struct RecordingListener {
    events: Mutex<Vec<Fired>>,
}

impl RecordingListener {
    fn events(&self) -> Vec<Fired> {
        self.events.lock().unwrap().clone()
    }
}

impl RegionEventListener for RecordingListener {
    fn on_player_enter(&self, region: &RegionHandle, _player: PlayerId, reason: EnterRegionReason) {
        self.events.lock().unwrap().push(Fired::Enter(region.name().to_string(), reason));
    }

    fn on_player_leave(&self, region: &RegionHandle, _player: PlayerId, reason: LeaveRegionReason) {
        self.events.lock().unwrap().push(Fired::Leave(region.name().to_string(), reason));
    }
}

struct PanickingListener;

impl RegionEventListener for PanickingListener {
    fn on_player_enter(&self, _: &RegionHandle, _: PlayerId, _: EnterRegionReason) {
        panic!("listener exploded");
    }

    fn on_player_leave(&self, _: &RegionHandle, _: PlayerId, _: LeaveRegionReason) {}
}

struct Harness {
    scheduler: Arc<TickScheduler>,
    world: Arc<SimulatedWorld>,
    manager: Arc<RegionManager>,
    listener: Arc<RecordingListener>,
}

impl Harness {
    fn new() -> Self {
        let scheduler = Arc::new(TickScheduler::new(Handle::current()));
        let world = Arc::new(SimulatedWorld::new());
        let manager = Arc::new(RegionManager::new(
            RegionConfig::default(),
            scheduler.clone(),
            world.clone(),
        ));
        Self {
            scheduler,
            world,
            manager,
            listener: Arc::new(RecordingListener::default()),
        }
    }

    fn zone(&self, name: &str, min: f64, max: f64) -> Arc<BasicRegion> {
        let region = Arc::new(
            BasicRegion::builder(name, "test")
                .world("world")
                .corners(Position::new(min, 0.0, min), Position::new(max, 255.0, max))
                .listener(self.listener.clone())
                .build(),
        );
        self.manager.register(region.clone()).unwrap();
        region
    }

    fn sample(&self, player: PlayerId, x: f64, reason: RegionReason) {
        let location = Location::new("world", x, 64.0, x);
        self.world.move_to(player, location.clone());
        let snapshot = self.world.player(player).unwrap();
        self.manager.update_player_location(&snapshot, location, reason);
    }

    /// Sampler, resolver, then the main-thread callbacks.
    async fn run_cycle(&self) {
        self.manager.run_watcher_cycle();
        self.scheduler.tick();
        self.scheduler.wait_async().await;
        self.scheduler.tick();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_events_follow_traversal_order() {
    let h = Harness::new();
    h.zone("outer", -50.0, 50.0);
    h.zone("inner", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 100.0, 64.0, 100.0));

    h.sample(player, -20.0, RegionReason::Move);
    h.sample(player, 5.0, RegionReason::Move);
    h.sample(player, 100.0, RegionReason::Move);
    h.run_cycle().await;

    assert_eq!(
        h.listener.events(),
        vec![
            Fired::Enter("outer".into(), EnterRegionReason::Move),
            Fired::Enter("inner".into(), EnterRegionReason::Move),
            Fired::Leave("inner".into(), LeaveRegionReason::Move),
            Fired::Leave("outer".into(), LeaveRegionReason::Move),
        ]
    );
    assert!(h.manager.player_regions(player).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fast_move_through_disjoint_regions_fires_every_region() {
    let h = Harness::new();
    h.zone("a", 0.0, 10.0);
    h.zone("b", 20.0, 30.0);
    let player = h.world.join("Alex", Location::new("world", -5.0, 64.0, -5.0));

    h.sample(player, 5.0, RegionReason::Move);
    h.sample(player, 25.0, RegionReason::Teleport);
    h.run_cycle().await;

    assert_eq!(
        h.listener.events(),
        vec![
            Fired::Enter("a".into(), EnterRegionReason::Move),
            Fired::Enter("b".into(), EnterRegionReason::Teleport),
            Fired::Leave("a".into(), LeaveRegionReason::Teleport),
        ]
    );
    let regions: Vec<_> = h.manager.player_regions(player).iter().map(|r| r.name().to_string()).collect();
    assert_eq!(regions, vec!["b"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_leave_all_regions_empties_cache_and_fires_once_each() {
    let h = Harness::new();
    h.zone("outer", -50.0, 50.0);
    h.zone("inner", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));

    h.sample(player, 5.0, RegionReason::JoinServer);
    h.run_cycle().await;
    assert_eq!(h.manager.player_regions(player).len(), 2);

    h.sample(player, 6.0, RegionReason::Move);
    let left = h.manager.leave_all_regions(player, LeaveRegionReason::QuitServer);

    assert_eq!(left, 2);
    assert!(h.manager.player_regions(player).is_empty());
    assert_eq!(h.manager.queued_samples(player), 0);

    let leaves: Vec<_> = h
        .listener
        .events()
        .into_iter()
        .filter(|e| matches!(e, Fired::Leave(..)))
        .collect();
    assert_eq!(
        leaves,
        vec![
            Fired::Leave("inner".into(), LeaveRegionReason::QuitServer),
            Fired::Leave("outer".into(), LeaveRegionReason::QuitServer),
        ]
    );

    assert_eq!(h.manager.leave_all_regions(player, LeaveRegionReason::QuitServer), 0);
}

#[tokio::test]
async fn test_dead_and_synthetic_players_are_ignored() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let npc = h.world.join("Villager", Location::new("world", 5.0, 64.0, 5.0));
    let ghost = h.world.join("Ghost", Location::new("world", 5.0, 64.0, 5.0));
    h.world.set_synthetic(npc, true);
    h.world.set_dead(ghost, true);

    h.sample(npc, 5.0, RegionReason::Move);
    h.sample(ghost, 5.0, RegionReason::Move);

    assert_eq!(h.manager.queued_samples(npc), 0);
    assert_eq!(h.manager.queued_samples(ghost), 0);
}

#[tokio::test]
async fn test_worlds_without_listener_regions_are_not_sampled() {
    let h = Harness::new();
    let plain = Arc::new(
        BasicRegion::builder("plain", "test")
            .world("world")
            .corners(Position::new(0.0, 0.0, 0.0), Position::new(10.0, 10.0, 10.0))
            .build(),
    );
    h.manager.register(plain).unwrap();
    let player = h.world.join("Alex", Location::new("world", 5.0, 5.0, 5.0));
    h.sample(player, 5.0, RegionReason::Move);

    assert!(h.manager.listener_worlds().is_empty());
    assert!(h.manager.sample_players().is_empty());
    assert_eq!(h.manager.queued_samples(player), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_moves_before_a_listener_exists_are_not_replayed() {
    let h = Harness::new();
    let player = h.world.join("Alex", Location::new("world", 0.0, 64.0, 0.0));
    for step in 0..1_000 {
        h.sample(player, (step % 100) as f64, RegionReason::Move);
    }
    assert_eq!(h.manager.queued_samples(player), 0);

    h.zone("zone", 40.0, 60.0);
    h.sample(player, 200.0, RegionReason::Move);
    h.run_cycle().await;

    assert!(h.listener.events().is_empty());
    assert!(h.manager.player_regions(player).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_moving_to_a_world_without_listeners_fires_leave() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));
    h.sample(player, 5.0, RegionReason::Move);
    h.run_cycle().await;

    let nether = Location::new("world_nether", 5.0, 64.0, 5.0);
    h.world.move_to(player, nether.clone());
    let snapshot = h.world.player(player).unwrap();
    h.manager.update_player_location(&snapshot, nether, RegionReason::WorldChange);
    assert_eq!(h.manager.queued_samples(player), 1);
    h.run_cycle().await;

    assert_eq!(
        h.listener.events(),
        vec![
            Fired::Enter("zone".into(), EnterRegionReason::Move),
            Fired::Leave("zone".into(), LeaveRegionReason::Teleport),
        ]
    );
    assert!(h.manager.player_regions(player).is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_quit_while_resolver_is_pending_leaves_no_regions() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 50.0, 64.0, 50.0));

    h.sample(player, 5.0, RegionReason::Move);
    h.manager.run_watcher_cycle();
    assert_eq!(h.manager.leave_all_regions(player, LeaveRegionReason::QuitServer), 0);
    h.world.quit(player);

    h.scheduler.tick();
    h.scheduler.wait_async().await;
    h.scheduler.tick();

    assert!(h.manager.player_regions(player).is_empty());
    assert!(h.listener.events().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_rejoin_after_quit_is_tracked_again() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 50.0, 64.0, 50.0));

    h.sample(player, 5.0, RegionReason::Move);
    h.manager.run_watcher_cycle();
    h.manager.leave_all_regions(player, LeaveRegionReason::QuitServer);
    let offline = h.world.quit(player).unwrap();
    h.scheduler.tick();
    h.scheduler.wait_async().await;
    h.scheduler.tick();

    h.world.rejoin(offline);
    h.sample(player, 5.0, RegionReason::JoinServer);
    h.run_cycle().await;

    assert_eq!(h.listener.events(), vec![Fired::Enter("zone".into(), EnterRegionReason::JoinServer)]);
    assert_eq!(h.manager.player_regions(player).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_reset_player_region_refires_enter() {
    let h = Harness::new();
    let zone = h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));

    h.sample(player, 5.0, RegionReason::Move);
    h.run_cycle().await;
    assert!(h.manager.reset_player_region(player, zone.id()));
    assert!(h.manager.player_regions(player).is_empty());

    h.sample(player, 6.0, RegionReason::Move);
    h.run_cycle().await;

    assert_eq!(
        h.listener.events(),
        vec![
            Fired::Enter("zone".into(), EnterRegionReason::Move),
            Fired::Enter("zone".into(), EnterRegionReason::Move),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cache_updates_before_callbacks_run() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));
    h.sample(player, 5.0, RegionReason::Move);

    h.manager.run_watcher_cycle();
    h.scheduler.tick();
    h.scheduler.wait_async().await;

    assert_eq!(h.manager.player_regions(player).len(), 1);
    assert!(h.listener.events().is_empty());

    h.scheduler.tick();
    assert_eq!(h.listener.events().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_listener_does_not_block_other_regions() {
    let h = Harness::new();
    let bomb = Arc::new(
        BasicRegion::builder("bomb", "test")
            .world("world")
            .corners(Position::new(0.0, 0.0, 0.0), Position::new(10.0, 255.0, 10.0))
            .enter_priority(RegionPriority::First)
            .listener(Arc::new(PanickingListener))
            .build(),
    );
    h.manager.register(bomb).unwrap();
    h.zone("calm", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));

    h.sample(player, 5.0, RegionReason::Move);
    h.run_cycle().await;

    assert_eq!(h.listener.events(), vec![Fired::Enter("calm".into(), EnterRegionReason::Move)]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_runs_on_its_period() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));
    h.sample(player, 5.0, RegionReason::Move);

    let handle = h.manager.start_watcher();
    h.scheduler.tick_n(2);
    assert_eq!(h.manager.queued_samples(player), 1);

    h.scheduler.tick();
    assert_eq!(h.manager.queued_samples(player), 0);

    h.scheduler.tick();
    h.scheduler.wait_async().await;
    h.scheduler.tick();
    assert_eq!(h.listener.events().len(), 1);

    handle.cancel();
    h.manager.shutdown();
}

#[tokio::test]
#[should_panic(expected = "has no enter reason")]
async fn test_unmapped_enter_reason_is_fatal() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));

    h.manager.resolve_batch(SampleBatch {
        epoch: 1,
        worlds: vec![WorldSamples {
            world: WorldId::from("world"),
            players: vec![PlayerSamples {
                player,
                samples: vec![CachedLocation {
                    location: Location::new("world", 5.0, 64.0, 5.0),
                    reason: RegionReason::Dead,
                }],
            }],
        }],
    });
}

#[tokio::test]
async fn test_register_rejects_undefined_and_unloaded() {
    let h = Harness::new();
    let undefined = Arc::new(BasicRegion::builder("undefined", "test").build());
    assert!(matches!(
        h.manager.register(undefined),
        Err(RegionError::Undefined { .. })
    ));

    h.world.load_world("world");
    let elsewhere = Arc::new(
        BasicRegion::builder("elsewhere", "test")
            .world("the_end")
            .corners(Position::new(0.0, 0.0, 0.0), Position::new(1.0, 1.0, 1.0))
            .build(),
    );
    assert!(matches!(
        h.manager.register(elsewhere),
        Err(RegionError::WorldNotLoaded { .. })
    ));
    assert_eq!(h.manager.region_count(), 0);
}

#[tokio::test]
async fn test_listener_world_counter_tracks_registrations() {
    let h = Harness::new();
    let a = h.zone("a", 0.0, 10.0);
    let b = h.zone("b", 20.0, 30.0);
    let world = WorldId::from("world");

    h.manager.register(a.clone()).unwrap();
    assert_eq!(h.manager.listener_worlds(), vec![world.clone()]);

    assert!(h.manager.unregister(a.id()));
    assert_eq!(h.manager.listener_worlds(), vec![world]);

    assert!(h.manager.unregister(b.id()));
    assert!(h.manager.listener_worlds().is_empty());
    assert!(!h.manager.unregister(b.id()));
}

struct ArenaRegion {
    inner: BasicRegion,
}

impl Region for ArenaRegion {
    fn id(&self) -> crate::types::RegionId {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn owner(&self) -> &str {
        self.inner.owner()
    }

    fn world(&self) -> Option<&WorldId> {
        self.inner.world()
    }

    fn bounds(&self) -> Option<crate::types::RegionBounds> {
        self.inner.bounds()
    }
}

#[tokio::test]
async fn test_typed_and_erased_queries() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let arena = Arc::new(ArenaRegion {
        inner: BasicRegion::builder("arena", "games")
            .world("world")
            .corners(Position::new(0.0, 0.0, 0.0), Position::new(10.0, 255.0, 10.0))
            .build(),
    });
    h.manager.register(arena.clone()).unwrap();

    let here = Location::new("world", 5.0, 64.0, 5.0);
    let arenas = h.manager.regions_at::<ArenaRegion>(&here);
    assert_eq!(arenas.len(), 1);
    assert_eq!(arenas[0].name(), "arena");
    assert!(h.manager.has_region::<BasicRegion>(&here));
    assert_eq!(h.manager.handles_at(&here).len(), 2);
    assert_eq!(h.manager.listener_handles_at(&here, Some(PriorityType::Enter)).len(), 1);
    assert_eq!(h.manager.regions_in_chunk::<ArenaRegion>(&WorldId::from("world"), 0, 0).len(), 1);
    assert!(h.manager.handle(arena.id()).is_some());

    assert!(h.manager.unregister(arena.id()));
    assert!(h.manager.regions_at::<ArenaRegion>(&here).is_empty());
    assert_eq!(h.manager.handles().len(), 1);
}

#[tokio::test]
async fn test_world_query_is_used_for_sampling() {
    let h = Harness::new();
    h.zone("zone", 0.0, 10.0);
    let player = h.world.join("Alex", Location::new("world", 5.0, 64.0, 5.0));
    h.sample(player, 5.0, RegionReason::Move);

    h.world.move_to(player, Location::new("world_nether", 5.0, 64.0, 5.0));
    assert!(h.world.players_in(&WorldId::from("world")).is_empty());
    assert!(h.manager.sample_players().is_empty());
}
