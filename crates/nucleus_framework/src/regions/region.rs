//! Region model: the [`Region`] trait, read-only [`RegionHandle`]s, the bundled
//! [`BasicRegion`], priorities and enter/leave reasons.

use crate::types::{Location, PlayerId, Position, RegionBounds, RegionId, WorldId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

// ============================================================================
// Priorities
// ============================================================================

/// Order in which overlapping regions are handled.
///
/// Lower sort order is handled first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionPriority {
    /// Handled first.
    First,
    /// Handled second.
    High,
    #[default]
    Default,
    /// Handled second to last.
    Low,
    /// The last to be handled.
    Last,
}

impl RegionPriority {
    pub fn sort_order(&self) -> u8 {
        match self {
            RegionPriority::First => 0,
            RegionPriority::High => 1,
            RegionPriority::Default => 2,
            RegionPriority::Low => 3,
            RegionPriority::Last => 4,
        }
    }
}

/// Which event a priority applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriorityType {
    Enter,
    Leave,
}

// ============================================================================
// Reasons
// ============================================================================

/// Why a player entered a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnterRegionReason {
    Move,
    Teleport,
    Respawn,
    JoinServer,
}

/// Why a player left a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveRegionReason {
    Move,
    Dead,
    Teleport,
    QuitServer,
}

/// Reason code attached to a location sample.
///
/// Not every reason can cause both an enter and a leave: a player cannot enter
/// a region by dying, nor leave one by joining the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegionReason {
    Move,
    Dead,
    Teleport,
    Respawn,
    JoinServer,
    QuitServer,
    /// Crossing into another world, handled like a teleport.
    WorldChange,
}

impl RegionReason {
    pub fn enter_reason(&self) -> Option<EnterRegionReason> {
        match self {
            RegionReason::Move => Some(EnterRegionReason::Move),
            RegionReason::Dead => None,
            RegionReason::Teleport => Some(EnterRegionReason::Teleport),
            RegionReason::Respawn => Some(EnterRegionReason::Respawn),
            RegionReason::JoinServer => Some(EnterRegionReason::JoinServer),
            RegionReason::QuitServer => None,
            RegionReason::WorldChange => Some(EnterRegionReason::Teleport),
        }
    }

    pub fn leave_reason(&self) -> Option<LeaveRegionReason> {
        match self {
            RegionReason::Move => Some(LeaveRegionReason::Move),
            RegionReason::Dead => Some(LeaveRegionReason::Dead),
            RegionReason::Teleport => Some(LeaveRegionReason::Teleport),
            RegionReason::Respawn => Some(LeaveRegionReason::Dead),
            RegionReason::JoinServer => None,
            RegionReason::QuitServer => Some(LeaveRegionReason::QuitServer),
            RegionReason::WorldChange => Some(LeaveRegionReason::Teleport),
        }
    }
}

// ============================================================================
// Region Contract
// ============================================================================

/// Receives enter and leave notifications for a region.
///
/// Callbacks always run on the main thread.
pub trait RegionEventListener: Send + Sync {
    fn on_player_enter(&self, region: &RegionHandle, player: PlayerId, reason: EnterRegionReason);

    fn on_player_leave(&self, region: &RegionHandle, player: PlayerId, reason: LeaveRegionReason);
}

/// An axis-aligned volume in a named world.
///
/// A region is "defined" once it has both a world and bounds; only defined
/// regions can be registered with the [`RegionManager`](super::RegionManager).
/// The manager snapshots world and bounds at registration time, so a region
/// whose coordinates change must be registered again.
pub trait Region: Send + Sync + 'static {
    fn id(&self) -> RegionId;

    fn name(&self) -> &str;

    /// Name of the extension that owns the region.
    fn owner(&self) -> &str;

    fn world(&self) -> Option<&WorldId>;

    fn bounds(&self) -> Option<RegionBounds>;

    fn is_defined(&self) -> bool {
        self.world().is_some() && self.bounds().is_some()
    }

    /// Precise containment test, run after the spatial index narrowed the candidates.
    fn contains(&self, location: &Location) -> bool {
        match (self.world(), self.bounds()) {
            (Some(world), Some(bounds)) => *world == location.world && bounds.contains(&location.position),
            _ => false,
        }
    }

    fn priority(&self, _kind: PriorityType) -> RegionPriority {
        RegionPriority::Default
    }

    fn event_listener(&self) -> Option<Arc<dyn RegionEventListener>> {
        None
    }

    fn is_event_listener(&self) -> bool {
        self.event_listener().is_some()
    }
}

// ============================================================================
// Read-only Handle
// ============================================================================

/// Type-erased, read-only reference to a registered region.
///
/// Handles compare and hash by region id, so two handles to the same region
/// are interchangeable in sets.
#[derive(Clone)]
pub struct RegionHandle {
    inner: Arc<dyn Region>,
}

impl RegionHandle {
    pub fn new(region: Arc<dyn Region>) -> Self {
        Self { inner: region }
    }
}

impl Deref for RegionHandle {
    type Target = dyn Region;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl PartialEq for RegionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id() == other.inner.id()
    }
}

impl Eq for RegionHandle {}

impl Hash for RegionHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id().hash(state);
    }
}

impl fmt::Debug for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionHandle")
            .field("id", &self.inner.id())
            .field("name", &self.inner.name())
            .finish()
    }
}

// ============================================================================
// Basic Region
// ============================================================================

/// A plain cuboid region, configured with a builder.
///
/// # Examples
///
/// ```rust
/// use nucleus_framework::regions::{BasicRegion, Region, RegionPriority, PriorityType};
/// use nucleus_framework::Position;
///
/// let arena = BasicRegion::builder("arena", "nucleus")
///     .world("world")
///     .corners(Position::new(0.0, 0.0, 0.0), Position::new(50.0, 128.0, 50.0))
///     .enter_priority(RegionPriority::High)
///     .build();
///
/// assert!(arena.is_defined());
/// assert_eq!(arena.priority(PriorityType::Enter), RegionPriority::High);
/// ```
pub struct BasicRegion {
    id: RegionId,
    name: String,
    owner: String,
    world: Option<WorldId>,
    bounds: Option<RegionBounds>,
    enter_priority: RegionPriority,
    leave_priority: RegionPriority,
    listener: Option<Arc<dyn RegionEventListener>>,
}

impl BasicRegion {
    pub fn builder(name: impl Into<String>, owner: impl Into<String>) -> BasicRegionBuilder {
        BasicRegionBuilder {
            region: BasicRegion {
                id: RegionId::new(),
                name: name.into(),
                owner: owner.into(),
                world: None,
                bounds: None,
                enter_priority: RegionPriority::Default,
                leave_priority: RegionPriority::Default,
                listener: None,
            },
        }
    }
}

impl Region for BasicRegion {
    fn id(&self) -> RegionId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn world(&self) -> Option<&WorldId> {
        self.world.as_ref()
    }

    fn bounds(&self) -> Option<RegionBounds> {
        self.bounds
    }

    fn priority(&self, kind: PriorityType) -> RegionPriority {
        match kind {
            PriorityType::Enter => self.enter_priority,
            PriorityType::Leave => self.leave_priority,
        }
    }

    fn event_listener(&self) -> Option<Arc<dyn RegionEventListener>> {
        self.listener.clone()
    }
}

impl fmt::Debug for BasicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicRegion")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("owner", &self.owner)
            .field("world", &self.world)
            .field("bounds", &self.bounds)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Builder for [`BasicRegion`].
pub struct BasicRegionBuilder {
    region: BasicRegion,
}

impl BasicRegionBuilder {
    pub fn world(mut self, world: impl Into<WorldId>) -> Self {
        self.region.world = Some(world.into());
        self
    }

    pub fn corners(mut self, a: Position, b: Position) -> Self {
        self.region.bounds = Some(RegionBounds::from_corners(a, b));
        self
    }

    pub fn bounds(mut self, bounds: RegionBounds) -> Self {
        self.region.bounds = Some(bounds);
        self
    }

    pub fn enter_priority(mut self, priority: RegionPriority) -> Self {
        self.region.enter_priority = priority;
        self
    }

    pub fn leave_priority(mut self, priority: RegionPriority) -> Self {
        self.region.leave_priority = priority;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn RegionEventListener>) -> Self {
        self.region.listener = Some(listener);
        self
    }

    pub fn build(self) -> BasicRegion {
        self.region
    }
}
