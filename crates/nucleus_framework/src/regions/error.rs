//! Region registration errors.

use thiserror::Error;

/// Errors raised while registering regions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegionError {
    /// The region has no world or no bounds yet.
    #[error("Region '{name}' cannot be registered because its coordinates are undefined")]
    Undefined { name: String },
    /// The region's world is not loaded by the host.
    #[error("Region '{name}' cannot be registered because world '{world}' is not loaded")]
    WorldNotLoaded { name: String, world: String },
}
