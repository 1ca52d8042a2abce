use super::builtin::{AddTeleportCommand, JailCommand};
use super::*;
use crate::config::{CommandConfig, JailConfig};
use crate::context::PluginManifest;
use crate::host::{CommandSender, MemoryMessenger, SimulatedWorld};
use crate::jail::JailManager;
use crate::permissions::MemoryPermissions;
use crate::services::Services;
use crate::types::{Location, PlayerId};
use std::sync::Arc;

// ============================================================================
// Test commands
// ============================================================================

#[derive(Default)]
struct ShopCommand;

impl Command for ShopCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("shop").description("Trade items.").build()
    }

    fn register_sub_commands(&self, commands: &mut SubCommands) {
        commands
            .add::<SellCommand>()
            .add::<AdminCommand>()
            .add::<BuyCommand>()
            .add::<SecretCommand>();
    }
}

#[derive(Default)]
struct BuyCommand;

impl Command for BuyCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("buy")
            .alias("b")
            .parent("shop")
            .description("Buy an item.")
            .static_param("item")
            .floating_param("amount=1")
            .param_kind("amount", ParamKind::Integer)
            .param_description("amount", "How many to buy.")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for BuyCommand {
    fn execute(&self, ctx: &CommandContext<'_>, args: &CommandArguments) -> Result<(), CommandError> {
        ctx.tell(&format!("Bought {} {}.", args.integer("amount")?, args.string("item")?));
        Ok(())
    }
}

#[derive(Default)]
struct SellCommand;

impl Command for SellCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("sell")
            .description("Sell an item.")
            .static_param("item")
            .build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for SellCommand {
    fn execute(&self, _ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        Ok(())
    }
}

#[derive(Default)]
struct SecretCommand;

impl Command for SecretCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("secret").hidden().build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for SecretCommand {
    fn execute(&self, ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        ctx.tell("Found it.");
        Ok(())
    }
}

#[derive(Default)]
struct AdminCommand;

impl Command for AdminCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("admin").description("Shop administration.").build()
    }

    fn register_sub_commands(&self, commands: &mut SubCommands) {
        commands.add::<RestockCommand>();
    }
}

#[derive(Default)]
struct RestockCommand;

impl Command for RestockCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("restock").description("Refill the shelves.").build()
    }

    fn executor(&self) -> Option<&dyn CommandExecutor> {
        Some(self)
    }
}

impl CommandExecutor for RestockCommand {
    fn execute(&self, _ctx: &CommandContext<'_>, _args: &CommandArguments) -> Result<(), CommandError> {
        Ok(())
    }
}

#[derive(Default)]
struct MisplacedCommand;

impl Command for MisplacedCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("misplaced").parent("bank").build()
    }
}

#[derive(Default)]
struct LoopCommand;

impl Command for LoopCommand {
    fn info(&self) -> CommandInfo {
        CommandInfo::builder("loop").build()
    }

    fn register_sub_commands(&self, commands: &mut SubCommands) {
        commands.add::<LoopCommand>();
    }
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    world: Arc<SimulatedWorld>,
    messenger: Arc<MemoryMessenger>,
    permissions: Arc<MemoryPermissions>,
    jails: Arc<JailManager>,
    dispatcher: CommandDispatcher,
}

fn harness(declared: &[&str]) -> Harness {
    let world = Arc::new(SimulatedWorld::new());
    let messenger = Arc::new(MemoryMessenger::new());
    let permissions = Arc::new(MemoryPermissions::new());
    let jails = Arc::new(JailManager::new(
        JailConfig::default(),
        "Nucleus",
        world.clone(),
        messenger.clone(),
    ));

    let mut services = Services::new();
    services.insert(jails.clone());

    let mut manifest = PluginManifest::new("Nucleus", "1.0.0");
    for label in declared {
        manifest = manifest.with_command(*label);
    }

    let dispatcher = CommandDispatcher::new(
        Arc::new(manifest),
        CommandConfig::default(),
        permissions.clone(),
        messenger.clone(),
        Arc::new(services),
    );

    Harness {
        world,
        messenger,
        permissions,
        jails,
        dispatcher,
    }
}

fn player(h: &Harness, name: &str) -> CommandSender {
    let id = h.world.join(name, Location::new("world", 10.0, 64.0, -4.0));
    CommandSender::player(id, name)
}

fn strings(lines: &[&str]) -> Vec<String> {
    lines.iter().map(|line| line.to_string()).collect()
}

// ============================================================================
// Resolution
// ============================================================================

#[test]
fn test_resolution_consumes_matching_children() {
    let mut h = harness(&["jail"]);
    assert!(h.dispatcher.register::<JailCommand>());

    let root = h.dispatcher.command("jail").unwrap();
    let addtp = h.dispatcher.tree().child(root, "addtp").unwrap();

    assert_eq!(
        h.dispatcher.resolve("jail", &["addtp", "home"]),
        Resolution::Found {
            command: addtp,
            args: strings(&["home"]),
        }
    );
    assert_eq!(
        h.dispatcher.resolve("jail", &["nonexistent"]),
        Resolution::Incomplete {
            command: root,
            args: strings(&["nonexistent"]),
        }
    );
}

#[test]
fn test_only_commands_with_an_executor_run() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();
    let shop = h.dispatcher.command("shop").unwrap();
    let buy = h.dispatcher.tree().child(shop, "buy").unwrap();

    assert!(!h.dispatcher.tree().is_executable(shop));
    assert!(h.dispatcher.tree().is_executable(buy));
    assert!(h.dispatcher.tree().command(shop).executor().is_none());
    assert_eq!(
        h.dispatcher.on_command(&CommandSender::Console, "shop", &[]),
        DispatchOutcome::Failed(CommandError::Incomplete { root: "shop".into() })
    );
}

#[test]
fn test_aliases_and_case_resolve_to_the_same_node() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    let Resolution::Found { command: by_alias, .. } = h.dispatcher.resolve("SHOP", &["B", "apple"]) else {
        panic!("alias did not resolve");
    };
    let Resolution::Found { command: by_name, .. } = h.dispatcher.resolve("shop", &["buy", "apple"]) else {
        panic!("name did not resolve");
    };
    assert_eq!(by_alias, by_name);
}

#[test]
fn test_unknown_label_only_opens_default_root_for_its_children() {
    let mut h = harness(&[]);
    h.dispatcher.register::<ShopCommand>();

    let default_root = h.dispatcher.default_root();
    assert!(matches!(
        h.dispatcher.resolve("anything", &[]),
        Resolution::Found { command, .. } if command == default_root
    ));
    assert!(matches!(
        h.dispatcher.resolve("nucleus", &["shop", "buy", "apple"]),
        Resolution::Found { .. }
    ));
    assert_eq!(h.dispatcher.resolve("nucleus", &["warp"]), Resolution::NotFound);
}

// ============================================================================
// Registration
// ============================================================================

#[test]
fn test_duplicate_sub_command_type_is_rejected() {
    let permissions = MemoryPermissions::new();
    let mut tree = CommandTree::new("nucleus");
    let root = tree.insert_root(ShopCommand);
    tree.attach(root, "shop", &permissions);

    assert_eq!(tree.children(root).len(), 4);
    assert_eq!(tree.add_child::<BuyCommand>(root, &permissions), None);
    assert_eq!(tree.add_child::<MisplacedCommand>(root, &permissions), None);
    assert_eq!(tree.children(root).len(), 4);
}

#[test]
fn test_sub_commands_wait_for_attachment() {
    let permissions = MemoryPermissions::new();
    let mut tree = CommandTree::new("nucleus");
    let root = tree.insert_root(ShopCommand);

    assert_eq!(tree.pending_count(root), 4);
    assert!(!tree.has_children(root));

    tree.attach(root, "shop", &permissions);

    assert_eq!(tree.pending_count(root), 0);
    let admin = tree.child(root, "admin").unwrap();
    let restock = tree.child(admin, "restock").unwrap();
    assert_eq!(tree.root_label(restock), Some("shop"));
    assert_eq!(tree.permission(restock), Some("nucleus.commands.shop.admin.restock"));
    assert_eq!(tree.path(restock), vec!["admin", "restock"]);
}

#[test]
#[should_panic(expected = "Cannot register a command as a sub command of itself")]
fn test_self_registration_panics() {
    let permissions = MemoryPermissions::new();
    let mut tree = CommandTree::new("nucleus");
    let root = tree.insert_root(LoopCommand);
    tree.attach(root, "loop", &permissions);
}

#[test]
fn test_permissions_registered_in_one_batch() {
    let mut h = harness(&["jail"]);
    let before = h.permissions.recalculations();

    assert!(h.dispatcher.register::<JailCommand>());
    assert!(!h.dispatcher.register::<JailCommand>());

    assert_eq!(h.permissions.recalculations(), before + 1);
    let registered = h.permissions.registered();
    assert!(registered.contains(&"nucleus.commands.about".to_string()));
    assert!(registered.contains(&"nucleus.commands.jail".to_string()));
    assert!(registered.contains(&"nucleus.commands.jail.addtp".to_string()));
}

#[test]
fn test_default_root_is_left_out_of_permission_names() {
    let mut h = harness(&[]);
    assert!(h.dispatcher.register::<JailCommand>());

    assert!(h.dispatcher.root_labels().is_empty());
    assert!(h
        .permissions
        .registered()
        .contains(&"nucleus.commands.jail.release".to_string()));
}

#[test]
fn test_unregister_detaches_the_root() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let root = h.dispatcher.command("jail").unwrap();
    let addtp = h.dispatcher.tree().child_of_type::<AddTeleportCommand>(root).unwrap();

    assert!(h.dispatcher.unregister::<JailCommand>());

    assert!(h.dispatcher.tree().is_detached(addtp));
    assert_eq!(h.dispatcher.resolve("jail", &["addtp"]), Resolution::NotFound);
    assert!(!h.dispatcher.unregister::<JailCommand>());
}

#[test]
fn test_unregistered_nodes_are_reused() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let stale = h.dispatcher.command("jail").unwrap();
    let live = h.dispatcher.tree().len();
    let capacity = h.dispatcher.tree().capacity();

    for _ in 0..10 {
        assert!(h.dispatcher.unregister::<JailCommand>());
        assert!(h.dispatcher.register::<JailCommand>());
    }

    assert_eq!(h.dispatcher.tree().len(), live);
    assert_eq!(h.dispatcher.tree().capacity(), capacity);
    // The slot is taken again, the old id is not
    let root = h.dispatcher.command("jail").unwrap();
    assert_ne!(root, stale);
    assert!(h.dispatcher.tree().is_detached(stale));
    assert!(!h.dispatcher.tree().is_detached(root));
    assert_eq!(
        h.dispatcher.on_command(&CommandSender::Console, "jail", &["listtp"]),
        DispatchOutcome::Executed
    );
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_executes_with_coerced_arguments() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    let outcome = h
        .dispatcher
        .on_command(&CommandSender::Console, "shop", &["buy", "apple", "--amount", "3"]);

    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(h.messenger.lines(), strings(&["Bought 3 apple."]));
}

#[test]
fn test_errors_are_rendered_to_the_sender() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();
    let console = CommandSender::Console;

    h.dispatcher.on_command(&console, "warp", &["x"]);
    h.dispatcher.on_command(&console, "shop", &["nope"]);
    h.dispatcher.on_command(&console, "shop", &["buy"]);
    h.dispatcher.on_command(&console, "shop", &["buy", "apple", "pear"]);
    let outcome = h.dispatcher.on_command(&console, "shop", &["buy", "apple", "amount=lots"]);

    assert!(matches!(
        outcome,
        DispatchOutcome::Failed(CommandError::InvalidArgumentValue {
            expected: Some(ParamKind::Integer),
            ..
        })
    ));
    assert_eq!(
        h.messenger.lines(),
        strings(&[
            "Command not found. Type '/warp ?' for help.",
            "Command incomplete. Type '/shop ?' for help.",
            "Missing arguments. Type '/shop buy <item> [--amount <amount>]' for help.",
            "Too many arguments. Type '/shop buy <item> [--amount <amount>]' for help.",
            "Invalid value for 'amount', expected a whole number.",
            "Parameter description: How many to buy.",
        ])
    );
    assert_eq!(h.messenger.errors().len(), 5);
}

#[test]
fn test_help_lists_leaves_before_branches() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    let outcome = h.dispatcher.on_command(&CommandSender::Console, "shop", &["?"]);

    assert_eq!(outcome, DispatchOutcome::Help);
    assert_eq!(
        h.messenger.lines(),
        strings(&[
            "--- Commands (1/1) ---",
            "/shop buy <item> [--amount <amount>] - Buy an item.",
            "/shop sell <item> - Sell an item.",
            "/shop admin ? - Shop administration.",
        ])
    );
}

#[test]
fn test_detailed_help_documents_parameters() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    h.dispatcher.on_command(&CommandSender::Console, "shop", &["buy", "??"]);

    assert_eq!(
        h.messenger.lines(),
        strings(&[
            "--- Commands (1/1) ---",
            "/shop buy <item> [--amount <amount>] - Buy an item.",
            "  amount - How many to buy.",
        ])
    );
}

#[test]
fn test_help_page_must_be_a_number() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    let outcome = h.dispatcher.on_command(&CommandSender::Console, "shop", &["?", "two"]);

    assert!(matches!(
        outcome,
        DispatchOutcome::Failed(CommandError::InvalidArgumentValue { ref parameter, .. }) if parameter == "page"
    ));
    assert_eq!(
        h.messenger.errors(),
        strings(&["Invalid value for 'page', expected a whole number."])
    );
    assert_eq!(h.messenger.lines().len(), 1);
}

#[test]
fn test_permission_is_checked_before_help() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();
    let steve = player(&h, "Steve");

    let denied = h.dispatcher.on_command(&steve, "shop", &["?"]);
    assert_eq!(denied, DispatchOutcome::Failed(CommandError::AccessDenied));
    assert_eq!(h.messenger.errors(), strings(&["Access denied."]));

    let id = steve.player_id().unwrap();
    h.permissions.grant(id, "nucleus.commands.shop");
    h.permissions.grant(id, "nucleus.commands.shop.sell");
    h.messenger.clear();

    assert_eq!(h.dispatcher.on_command(&steve, "shop", &["help"]), DispatchOutcome::Help);
    assert_eq!(
        h.messenger.lines(),
        strings(&["--- Commands (1/1) ---", "/shop sell <item> - Sell an item."])
    );
}

#[test]
fn test_hidden_commands_still_execute() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();

    let outcome = h.dispatcher.on_command(&CommandSender::Console, "shop", &["secret"]);

    assert_eq!(outcome, DispatchOutcome::Executed);
    assert_eq!(h.messenger.lines(), strings(&["Found it."]));
}

// ============================================================================
// Tab completion
// ============================================================================

#[test]
fn test_tab_complete_lists_children_and_help() {
    let mut h = harness(&["shop"]);
    h.dispatcher.register::<ShopCommand>();
    let console = CommandSender::Console;

    assert_eq!(
        h.dispatcher.on_tab_complete(&console, "shop", &[""]),
        strings(&["admin", "buy", "sell", "?"])
    );
    assert_eq!(h.dispatcher.on_tab_complete(&console, "shop", &["S"]), strings(&["sell"]));
    assert_eq!(
        h.dispatcher.on_tab_complete(&console, "shop", &["admin", ""]),
        strings(&["restock"])
    );
    assert!(h
        .dispatcher
        .on_tab_complete(&console, "shop", &["buy", "apple", ""])
        .is_empty());
}

#[test]
fn test_tab_complete_asks_the_command() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let cells = h.jails.default_jail();
    cells.add_teleport("north", Location::new("world", 0.0, 0.0, 0.0)).unwrap();
    cells.add_teleport("nest", Location::new("world", 0.0, 0.0, 0.0)).unwrap();

    assert_eq!(
        h.dispatcher.on_tab_complete(&CommandSender::Console, "jail", &["deltp", "n"]),
        strings(&["nest", "north"])
    );
}

// ============================================================================
// Jail commands
// ============================================================================

#[test]
fn test_addtp_adds_unique_locations() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let warden = player(&h, "Warden");
    h.permissions.grant(warden.player_id().unwrap(), "nucleus.commands.jail.addtp");

    h.dispatcher.on_command(&warden, "jail", &["addtp", "Home"]);
    h.dispatcher.on_command(&warden, "jail", &["addtp", "home"]);

    assert_eq!(
        h.messenger.lines(),
        strings(&[
            "Your current location has been added to the default jail and is named 'home'.",
            "There is already a location named 'home'.",
        ])
    );
    let home = h.jails.default_jail().teleport("home").unwrap();
    assert_eq!(home.location.position.x, 10.0);
}

#[test]
fn test_player_only_commands_reject_console() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();

    let outcome = h.dispatcher.on_command(&CommandSender::Console, "jail", &["setreleasetp"]);

    assert!(matches!(
        outcome,
        DispatchOutcome::Failed(CommandError::InvalidSenderType { .. })
    ));
    assert_eq!(
        h.messenger.errors(),
        strings(&["Cannot execute command as console.", "Reason: Console cannot use this command."])
    );
}

#[test]
fn test_release_frees_a_prisoner() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let jail = h.jails.default_jail();
    jail.add_teleport("cell", Location::new("world", 100.0, 64.0, 100.0)).unwrap();
    jail.set_release_location(Some(Location::new("world", 0.0, 64.0, 0.0)));
    let steve: PlayerId = h.world.join("Steve", Location::new("world", 5.0, 64.0, 5.0));
    h.jails.imprison(steve, jail, 30).unwrap();

    let console = CommandSender::Console;
    assert_eq!(
        h.dispatcher.on_command(&console, "jail", &["release", "steve"]),
        DispatchOutcome::Executed
    );
    assert!(!h.jails.is_prisoner(steve));

    let missing = h.dispatcher.on_command(&console, "jail", &["release", "Ghost"]);
    assert!(matches!(
        missing,
        DispatchOutcome::Failed(CommandError::InvalidArgumentValue { ref parameter, .. }) if parameter == "player"
    ));
    assert_eq!(
        h.messenger.lines(),
        strings(&["steve released from jail.", "Player 'Ghost' is not online."])
    );
}

#[test]
fn test_listtp_pages() {
    let mut h = harness(&["jail"]);
    h.dispatcher.register::<JailCommand>();
    let jail = h.jails.default_jail();
    for name in ["a", "b", "c", "d", "e", "f", "g"] {
        jail.add_teleport(name, Location::new("world", 1.0, 2.0, 3.0)).unwrap();
    }

    h.dispatcher.on_command(&CommandSender::Console, "jail", &["listtp", "2"]);

    assert_eq!(
        h.messenger.lines(),
        strings(&["--- Jail Teleport Locations (2/2) ---", "g - world (1.0, 2.0, 3.0)"])
    );
}
