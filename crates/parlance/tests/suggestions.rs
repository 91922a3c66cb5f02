//! Integration tests for completion across dispatchers, aliases and parameters.

mod common;

use common::{MockSource, PLAYER};
use parlance::{
    AliasNode, CommandDescriptor, CommandHandler, CommandNode, CommandTree, FixedCompleter,
    FnHandler, Greed, Invocation, Parameter, PermissionFilter, Settings, SourceTypeFilter,
    ValueType,
};

#[derive(Debug, Clone, Copy, PartialEq)]
enum GameMode {
    Survival,
    Creative,
    Adventure,
    Spectator,
}

parlance::command_enum!(GameMode {
    Survival => "SURVIVAL",
    Creative => "CREATIVE",
    Adventure => "ADVENTURE",
    Spectator => "SPECTATOR",
});

fn noop() -> impl CommandHandler {
    FnHandler::new(|_, _| true)
}

fn build_tree(settings: Settings) -> CommandTree {
    let tree = CommandTree::builder().settings(settings).build();
    let root = tree.root();

    let gamemode = tree
        .insert(
            root,
            CommandNode::dispatcher(
                CommandDescriptor::builder("gamemode")
                    .alias("gm")
                    .build()
                    .unwrap(),
            ),
        )
        .unwrap();
    let set = CommandDescriptor::builder("set")
        .parameter(Parameter::flag("-q", "--quiet"))
        .parameter(Parameter::indexed("mode", ValueType::enumeration::<GameMode>()))
        .parameter(
            Parameter::indexed("player", ValueType::of::<String>())
                .optional()
                .completer(FixedCompleter::new(["Alex", "Steve", "alice"])),
        )
        .build()
        .unwrap();
    tree.insert(gamemode, CommandNode::leaf(set, noop())).unwrap();
    tree.insert(
        gamemode,
        CommandNode::leaf(CommandDescriptor::builder("query").build().unwrap(), noop()),
    )
    .unwrap();

    tree.insert(
        root,
        AliasNode::new(CommandDescriptor::builder("gms").build().unwrap(), gamemode).prefix("set"),
    )
    .unwrap();

    let give = CommandDescriptor::builder("give")
        .parameter(Parameter::indexed("item", ValueType::of::<String>()))
        .filter(SourceTypeFilter::only(PLAYER))
        .build()
        .unwrap();
    tree.insert(root, CommandNode::leaf(give, noop())).unwrap();

    let ban = CommandDescriptor::builder("ban")
        .parameter(Parameter::indexed("reason", ValueType::of::<String>()).greed(Greed::Infinite))
        .filter(PermissionFilter::new("admin.ban"))
        .build()
        .unwrap();
    tree.insert(root, CommandNode::leaf(ban, noop())).unwrap();

    tree
}

fn complete(tree: &CommandTree, line: &str) -> Vec<String> {
    tree.complete_line(MockSource::console(), line)
}

#[test]
fn root_lists_visible_commands_sorted() {
    let tree = build_tree(Settings::default());
    // `give` is player-only; the console holds every permission.
    assert_eq!(complete(&tree, ""), vec!["ban", "gamemode", "gm", "gms"]);
    assert_eq!(complete(&tree, "g"), vec!["gamemode", "gm", "gms"]);
    assert_eq!(complete(&tree, "GA"), vec!["gamemode"]);

    let player = MockSource::player("alex");
    assert_eq!(tree.complete_line(player, ""), vec!["gamemode", "give", "gm", "gms"]);
}

#[test]
fn nested_dispatcher_offers_children() {
    let tree = build_tree(Settings::default());
    assert_eq!(complete(&tree, "gamemode "), vec!["query", "set"]);
    assert_eq!(complete(&tree, "gm s"), vec!["set"]);
    assert!(complete(&tree, "gamemode x").is_empty());
}

#[test]
fn enum_parameter_offers_constants_in_declaration_order() {
    let tree = build_tree(Settings::default());
    assert_eq!(
        complete(&tree, "gamemode set "),
        vec!["SURVIVAL", "CREATIVE", "ADVENTURE", "SPECTATOR"]
    );
    assert_eq!(complete(&tree, "gamemode set -q s"), vec!["SURVIVAL", "SPECTATOR"]);
}

#[test]
fn completer_output_is_filtered_case_insensitively() {
    let tree = build_tree(Settings::default());
    assert_eq!(complete(&tree, "gamemode set creative al"), vec!["Alex", "alice"]);
}

#[test]
fn alias_completes_like_its_target() {
    let tree = build_tree(Settings::default());
    assert_eq!(complete(&tree, "gms c"), vec!["CREATIVE"]);
}

#[test]
fn flag_names_need_a_prefix_unless_configured() {
    let tree = build_tree(Settings::default());
    assert_eq!(complete(&tree, "gamemode set -"), vec!["-q", "--quiet"]);

    let tree = build_tree(Settings {
        suggest_names_on_empty_prefix: true,
        ..Settings::default()
    });
    let offered = complete(&tree, "gamemode set ");
    assert!(offered.contains(&"--quiet".to_string()));
    assert_eq!(offered[0], "SURVIVAL");
}

#[test]
fn max_suggestions_caps_the_list() {
    let tree = build_tree(Settings {
        max_suggestions: Some(2),
        ..Settings::default()
    });
    assert_eq!(complete(&tree, "gamemode set "), vec!["SURVIVAL", "CREATIVE"]);
}

#[test]
fn suggestions_do_not_consume_the_invocation() {
    let tree = build_tree(Settings::default());
    let invocation = Invocation::for_completion(MockSource::console(), "gamemode set c");
    let before = invocation.position();
    assert_eq!(tree.suggestions(&invocation), vec!["CREATIVE"]);
    assert_eq!(invocation.position(), before);
    assert!(invocation.labels().is_empty());
}

#[test]
fn filtered_leaf_offers_no_parameter_values() {
    let tree = build_tree(Settings::default());
    let guest = MockSource::new("guest", PLAYER).shared();
    assert!(tree.complete_line(guest, "ban ").is_empty());
}

#[test]
fn open_quote_keeps_completing_the_quoted_word() {
    let tree = CommandTree::new();
    let say = CommandDescriptor::builder("say")
        .parameter(
            Parameter::indexed("greeting", ValueType::of::<String>())
                .completer(FixedCompleter::new(["hello world", "help"])),
        )
        .parameter(
            Parameter::indexed("target", ValueType::of::<String>())
                .completer(FixedCompleter::new(["second"])),
        )
        .build()
        .unwrap();
    tree.insert(tree.root(), CommandNode::leaf(say, noop())).unwrap();

    assert_eq!(complete(&tree, "say \"hello "), vec!["hello world"]);
    assert_eq!(complete(&tree, "say \"hel"), vec!["hello world", "help"]);
    assert_eq!(complete(&tree, "say \"hello\" "), vec!["second"]);
}
