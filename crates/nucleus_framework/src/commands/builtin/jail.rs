//! `/jail` sub-commands for managing the default jail.

use crate::commands::{
    Command, CommandArguments, CommandContext, CommandError, CommandExecutor, CommandInfo, ParamKind, SubCommands,
};
use crate::jail::{JailError, JailManager};
use crate::messaging::ChatPaginator;

const TELEPORTS_PER_PAGE: usize = 6;

/// Root of the jail commands. Only groups sub-commands.
#[derive(Debug, Default, Clone, Copy)]
pub struct JailCommand;

impl Command for JailCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("jail").description("Manage the default jail.").build()
    }

    fn register_sub_commands(&self, commands: &mut SubCommands) {
        commands
            .add::<AddTeleportCommand>()
            .add::<DeleteTeleportCommand>()
            .add::<ListTeleportsCommand>()
            .add::<SetReleaseTeleportCommand>()
            .add::<ClearReleaseTeleportCommand>()
            .add::<ReleaseCommand>();
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AddTeleportCommand;

impl Command for AddTeleportCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("addtp")
            .parent("jail")
            .description("Add your current location as a jail teleport location.")
            .static_param("name")
            .param_kind("name", ParamKind::Name)
            .param_description("name", "A name for the location.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for AddTeleportCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
        let player = ctx.require_player()?;
        let name = args.name("name")?;
        let jails = ctx.require_service::<JailManager>()?;

        let Some(location) = jails.worlds().player_location(player) else {
            ctx.tell_error("Failed to add location.");
            return Ok(());
        };

        match jails.default_jail().add_teleport(name, location) {
            Ok(()) => {
                ctx.tell_success(&format!(
                    "Your current location has been added to the default jail and is named '{}'.",
                    name.to_lowercase()
                ));
                Ok(())
            }
            Err(error @ JailError::DuplicateTeleport(_)) => {
                ctx.tell_error(&error.to_string());
                Ok(())
            }
            Err(error) => Err(CommandError::Failed(error.to_string())),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteTeleportCommand;

impl Command for DeleteTeleportCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("deltp")
            .parent("jail")
            .description("Remove a jail teleport location.")
            .static_param("name")
            .param_description("name", "The name of the location.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }

    fn on_tab_complete(&self, ctx: &CommandContext<'_>, args: &[String], matches: &mut Vec<String>) {
        let [typing] = args else {
            return;
        };
        let Some(jails) = ctx.service::<JailManager>() else {
            return;
        };
        let typing = typing.to_lowercase();
        matches.extend(
            jails
                .default_jail()
                .teleports()
                .into_iter()
                .map(|teleport| teleport.name)
                .filter(|name| name.starts_with(&typing)),
        );
    }
}

impl CommandExecutor for DeleteTeleportCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
        let name = args.string("name")?;
        let jails = ctx.require_service::<JailManager>()?;

        if jails.default_jail().remove_teleport(name) {
            ctx.tell_success(&format!("Location '{}' removed.", name.to_lowercase()));
        } else {
            ctx.tell_error(&format!("There is no location named '{}'.", name.to_lowercase()));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ListTeleportsCommand;

impl Command for ListTeleportsCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("listtp")
            .parent("jail")
            .description("List jail teleport locations.")
            .static_param("page=1")
            .param_kind("page", ParamKind::Integer)
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for ListTeleportsCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
        let page = args.integer("page")?.max(1) as usize;
        let jails = ctx.require_service::<JailManager>()?;

        let mut pages = ChatPaginator::new("Jail Teleport Locations", TELEPORTS_PER_PAGE);
        for teleport in jails.default_jail().teleports() {
            pages.add_definition(teleport.name, teleport.location.to_string());
        }
        pages.show(ctx.messenger(), ctx.sender(), page);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SetReleaseTeleportCommand;

impl Command for SetReleaseTeleportCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("setreleasetp")
            .parent("jail")
            .description("Set the default jail release location to your current location.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for SetReleaseTeleportCommand {
    fn execute(&self, ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        let player = ctx.require_player()?;
        let jails = ctx.require_service::<JailManager>()?;

        let Some(location) = jails.worlds().player_location(player) else {
            ctx.tell_error("Failed to set release location.");
            return Ok(());
        };

        jails.default_jail().set_release_location(Some(location));
        ctx.tell_success("Default Jail release location set to your current location.");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ClearReleaseTeleportCommand;

impl Command for ClearReleaseTeleportCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("clearreleasetp")
            .parent("jail")
            .description("Clear the default jail release location.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for ClearReleaseTeleportCommand {
    fn execute(&self, ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        ctx.require_player()?;
        let jails = ctx.require_service::<JailManager>()?;

        jails.default_jail().set_release_location(None);
        ctx.tell_success("Default Jail release location cleared.");
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReleaseCommand;

impl Command for ReleaseCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("release")
            .parent("jail")
            .description("Release a player from jail.")
            .static_param("player")
            .param_kind("player", ParamKind::Name)
            .param_description("player", "The name of the player to release.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for ReleaseCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
        let name = args.name("player")?;
        let jails = ctx.require_service::<JailManager>()?;

        let Some(player) = jails.worlds().find_player(name) else {
            return Err(CommandError::invalid_value(
                "player",
                format!("Player '{}' is not online.", name),
            ));
        };

        if jails.release(player) {
            ctx.tell_success(&format!("{} released from jail.", name));
        } else {
            ctx.tell_error(&format!("{} is not in jail.", name));
        }
        Ok(())
    }
}
