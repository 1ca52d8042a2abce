//! Commands that ship with the framework.

mod about;
mod jail;

pub use about::AboutCommand;
pub use jail::{
    AddTeleportCommand, ClearReleaseTeleportCommand, DeleteTeleportCommand, JailCommand, ListTeleportsCommand,
    ReleaseCommand, SetReleaseTeleportCommand,
};
