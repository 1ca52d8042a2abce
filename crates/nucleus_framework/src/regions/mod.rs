//! # Region Tracking
//!
//! Spatial regions and the player tracker that fires enter/leave callbacks
//! when players move between them.
//!
//! ## Components
//!
//! - [`Region`] / [`BasicRegion`] - axis-aligned volumes in a named world
//! - [`RegionTypeManager`] - R*-tree index for one concrete region type
//! - [`OrderedRegions`] - per-player region set with ENTER and LEAVE orders
//! - [`RegionManager`] - root manager owning the indices and the watcher
//!
//! ## Threading
//!
//! Location samples are queued from the main thread, containment is resolved
//! off the main thread, and listener callbacks always run back on the main
//! thread through the [`Scheduler`](crate::scheduler::Scheduler).

mod error;
mod manager;
mod ordered;
mod region;
mod type_manager;
mod watcher;

#[cfg(test)]
mod tests;

pub use error::RegionError;
pub use manager::{CachedLocation, RegionManager};
pub use ordered::{OrderedRegions, PrioritizedRegion};
pub use region::{
    BasicRegion, BasicRegionBuilder, EnterRegionReason, LeaveRegionReason, PriorityType, Region,
    RegionEventListener, RegionHandle, RegionPriority, RegionReason,
};
pub use type_manager::{IndexEntry, RegionTypeManager};
pub use watcher::{PlayerSamples, SampleBatch, WorldSamples};
