use crate::commands::{Command, CommandArguments, CommandContext, CommandError, CommandExecutor, CommandInfo};
use crate::permissions::PermissionDefault;

/// Default root of a plugin's commands. Shows the plugin's manifest.
#[derive(Debug, Default, Clone, Copy)]
pub struct AboutCommand;

impl Command for AboutCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("about")
            .description("Show plugin information.")
            .permission_default(PermissionDefault::True)
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for AboutCommand {
    fn execute(&self, ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        let manifest = ctx.manifest();
        ctx.tell(&format!("{} v{}", manifest.name, manifest.version));
        if !manifest.description.is_empty() {
            ctx.tell(&manifest.description);
        }
        if !manifest.authors.is_empty() {
            ctx.tell(&format!("Authors: {}", manifest.authors.join(", ")));
        }
        ctx.tell(&format!("Type '/{} ?' for a list of commands.", ctx.root_label()));
        Ok(())
    }
}
