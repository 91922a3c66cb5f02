//! The demo command tree driven by the shell.
//!
//! Handlers never print. They append lines to the shared [`ShellState`],
//! which the main loop drains after every input line so tests can observe
//! exactly what a line produced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use parlance::{
    AliasNode, CommandDescriptor, CommandNode, CommandSource, CommandTree, FixedCompleter,
    FnExceptionHandler, FnHandler, Greed, Parameter, PermissionFilter, RegistrationError, Settings,
    SourceType, ValueType,
};

pub const CONSOLE: SourceType = SourceType::new("console");

/// Permission required by `shutdown`.
pub const ADMIN_PERMISSION: &str = "shell.admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Normal,
    Quiet,
    Verbose,
}

parlance::command_enum!(Mode {
    Normal => "NORMAL",
    Quiet => "QUIET",
    Verbose => "VERBOSE",
});

/// Errors the demo commands raise on purpose.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("cannot divide {0} by zero")]
    DivideByZero(i64),

    #[error("{0} overflows")]
    Overflow(String),
}

/// Output and mutable state shared by every handler.
#[derive(Debug, Default)]
pub struct ShellState {
    output: Mutex<Vec<String>>,
    mode: Mutex<Mode>,
    stopped: AtomicBool,
}

impl ShellState {
    pub fn say(&self, line: impl Into<String>) {
        self.output
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.into());
    }

    /// Takes every line produced since the last drain.
    pub fn drain(&self) -> Vec<String> {
        std::mem::take(&mut *self.output.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn mode(&self) -> Mode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner) = mode;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// The operator typing into the shell.
#[derive(Debug, Clone)]
pub struct ConsoleSource {
    name: String,
    locale: String,
    permissions: Vec<String>,
}

impl ConsoleSource {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
            permissions: Vec::new(),
        }
    }

    /// Uses `$USER` and the language part of `$LANG`, e.g. `de_DE` for `de_DE.UTF-8`.
    pub fn from_env() -> Self {
        let name = std::env::var("USER").unwrap_or_else(|_| "console".to_string());
        let locale = std::env::var("LANG")
            .ok()
            .and_then(|lang| lang.split('.').next().map(str::to_string))
            .filter(|lang| !lang.is_empty() && lang != "C" && lang != "POSIX")
            .unwrap_or_else(|| "en".to_string());
        Self::new(name, locale)
    }

    pub fn with_permission(mut self, node: impl Into<String>) -> Self {
        self.permissions.push(node.into());
        self
    }
}

impl CommandSource for ConsoleSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn identity(&self) -> &str {
        &self.name
    }

    fn locale(&self) -> &str {
        &self.locale
    }

    fn source_type(&self) -> SourceType {
        CONSOLE
    }

    fn has_permission(&self, node: &str) -> bool {
        self.permissions.iter().any(|p| p == "*" || p == node)
    }
}

/// Builds the demo tree on top of `settings`.
pub fn build_tree(
    settings: Settings,
    state: Arc<ShellState>,
) -> Result<CommandTree, RegistrationError> {
    let recover = Arc::clone(&state);
    let tree = CommandTree::builder()
        .settings(settings)
        .exception_handler(FnExceptionHandler::new(0, move |_inv, command, error| {
            match error.downcast_ref::<DemoError>() {
                Some(demo) => {
                    recover.say(format!("{}: {}", command.name(), demo));
                    true
                }
                None => false,
            }
        }))
        .build();
    let root = tree.root();
    let mut usages = Vec::new();

    let echo = CommandDescriptor::builder("echo")
        .description("Repeat the rest of the line")
        .parameter(Parameter::indexed("text", ValueType::of::<String>()).greed(Greed::Infinite))
        .build()?;
    usages.push(echo.usage());
    let out = Arc::clone(&state);
    tree.insert(
        root,
        CommandNode::leaf(
            echo,
            FnHandler::new(move |_inv, args| -> anyhow::Result<()> {
                out.say(args.get_required::<String>("text")?.as_str());
                Ok(())
            }),
        ),
    )?;

    let greet = CommandDescriptor::builder("greet")
        .description("Greet someone by name")
        .parameter(Parameter::flag("-l", "--loud"))
        .parameter(Parameter::named("--times", ValueType::of::<u32>()).alias("-n"))
        .parameter(
            Parameter::indexed("name", ValueType::of::<String>())
                .completer(FixedCompleter::new(["world", "everyone"])),
        )
        .build()?;
    usages.push(greet.usage());
    let out = Arc::clone(&state);
    let greet = tree.insert(
        root,
        CommandNode::leaf(
            greet,
            FnHandler::new(move |_inv, args| -> anyhow::Result<()> {
                let name = args.get_required::<String>("name")?;
                let times = args.get::<u32>("times").copied().unwrap_or(1);
                let mut line = format!("hello, {}", name);
                if args.flag("loud") {
                    line = line.to_uppercase();
                }
                for _ in 0..times {
                    out.say(line.as_str());
                }
                Ok(())
            }),
        ),
    )?;
    tree.insert(root, AliasNode::new(CommandDescriptor::builder("hi").build()?, greet))?;
    tree.insert(
        root,
        AliasNode::new(CommandDescriptor::builder("shout").build()?, greet).prefix("--loud"),
    )?;

    let out = Arc::clone(&state);
    let mode = tree.insert(
        root,
        CommandNode::dispatcher_with_fallback(
            CommandDescriptor::builder("mode")
                .description("Show or change the output mode")
                .build()?,
            FnHandler::new(move |_inv, _args| {
                out.say(format!("mode is {:?}", out.mode()));
                true
            }),
        ),
    )?;
    let set = CommandDescriptor::builder("set")
        .parameter(Parameter::indexed("mode", ValueType::enumeration::<Mode>()))
        .build()?;
    usages.push(format!("mode {}", set.usage()));
    let out = Arc::clone(&state);
    tree.insert(
        mode,
        CommandNode::leaf(
            set,
            FnHandler::new(move |_inv, args| -> anyhow::Result<()> {
                let next = *args.get_required::<Mode>("mode")?;
                out.set_mode(next);
                if next != Mode::Quiet {
                    out.say(format!("mode set to {:?}", next));
                }
                Ok(())
            }),
        ),
    )?;

    let div = CommandDescriptor::builder("div")
        .description("Integer division")
        .parameter(Parameter::indexed("dividend", ValueType::of::<i64>()))
        .parameter(Parameter::indexed("divisor", ValueType::of::<i64>()))
        .build()?;
    usages.push(div.usage());
    let out = Arc::clone(&state);
    tree.insert(
        root,
        CommandNode::leaf(
            div,
            FnHandler::new(move |_inv, args| -> anyhow::Result<()> {
                let dividend = *args.get_required::<i64>("dividend")?;
                let divisor = *args.get_required::<i64>("divisor")?;
                if divisor == 0 {
                    return Err(DemoError::DivideByZero(dividend).into());
                }
                let quotient = dividend
                    .checked_div(divisor)
                    .ok_or_else(|| DemoError::Overflow(format!("{} / {}", dividend, divisor)))?;
                if out.mode() == Mode::Verbose {
                    out.say(format!("{} / {} = {}", dividend, divisor, quotient));
                } else {
                    out.say(quotient.to_string());
                }
                Ok(())
            }),
        ),
    )?;

    let confirm = CommandDescriptor::builder("confirm")
        .description("Answer yes or no in your own language")
        .parameter(Parameter::indexed("answer", ValueType::of::<bool>()))
        .build()?;
    usages.push(confirm.usage());
    let out = Arc::clone(&state);
    tree.insert(
        root,
        CommandNode::leaf(
            confirm,
            FnHandler::new(move |_inv, args| -> anyhow::Result<()> {
                let answer = *args.get_required::<bool>("answer")?;
                out.say(if answer { "confirmed" } else { "cancelled" });
                Ok(())
            }),
        ),
    )?;

    let shutdown = CommandDescriptor::builder("shutdown")
        .alias("stop")
        .description("Stop the shell")
        .filter(PermissionFilter::new(ADMIN_PERMISSION))
        .build()?;
    usages.push(shutdown.usage());
    let out = Arc::clone(&state);
    tree.insert(
        root,
        CommandNode::leaf(
            shutdown,
            FnHandler::new(move |inv, _args| {
                out.say(format!("stopped by {}", inv.source().name()));
                out.stopped.store(true, Ordering::SeqCst);
                true
            }),
        ),
    )?;

    let help = CommandDescriptor::builder("help")
        .description("List commands")
        .parameter(Parameter::indexed("command", ValueType::of::<String>()).optional())
        .build()?;
    usages.push(help.usage());
    let out = Arc::clone(&state);
    tree.insert(
        root,
        CommandNode::leaf(
            help,
            FnHandler::new(move |_inv, args| {
                let wanted = args.get::<String>("command");
                let mut shown = false;
                for usage in &usages {
                    let name = usage.split(' ').next().unwrap_or_default();
                    if wanted.map_or(true, |w| w == name) {
                        out.say(usage.as_str());
                        shown = true;
                    }
                }
                shown
            }),
        ),
    )?;

    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parlance::{DispatchError, TrailingArguments};

    fn setup() -> (CommandTree, Arc<ShellState>) {
        let state = Arc::new(ShellState::default());
        let tree = build_tree(Settings::default(), Arc::clone(&state)).unwrap();
        (tree, state)
    }

    fn console() -> Arc<dyn CommandSource> {
        Arc::new(ConsoleSource::new("op", "en"))
    }

    fn run(tree: &CommandTree, state: &ShellState, line: &str) -> Vec<String> {
        tree.execute_line(console(), line).unwrap();
        state.drain()
    }

    #[test]
    fn echo_keeps_quoted_text() {
        let (tree, state) = setup();
        assert_eq!(run(&tree, &state, r#"echo one "two  three""#), vec!["one two  three"]);
    }

    #[test]
    fn greet_with_flag_and_named_count() {
        let (tree, state) = setup();
        assert_eq!(
            run(&tree, &state, "greet --times 2 -l bob"),
            vec!["HELLO, BOB", "HELLO, BOB"]
        );
        assert_eq!(run(&tree, &state, "hi alice"), vec!["hello, alice"]);
        assert_eq!(run(&tree, &state, "shout alice"), vec!["HELLO, ALICE"]);
    }

    #[test]
    fn mode_dispatcher_sets_and_reports() {
        let (tree, state) = setup();
        assert_eq!(run(&tree, &state, "mode"), vec!["mode is Normal"]);
        assert_eq!(run(&tree, &state, "mode set verbose"), vec!["mode set to Verbose"]);
        assert_eq!(state.mode(), Mode::Verbose);
        assert_eq!(run(&tree, &state, "div 7 2"), vec!["7 / 2 = 3"]);
        assert!(run(&tree, &state, "mode set quiet").is_empty());
    }

    #[test]
    fn unknown_mode_is_a_parse_error() {
        let (tree, _state) = setup();
        let err = tree.execute_line(console(), "mode set loud").unwrap_err();
        assert!(matches!(err, DispatchError::Parse(_)));
    }

    #[test]
    fn demo_errors_are_recovered() {
        let (tree, state) = setup();
        assert!(tree.execute_line(console(), "div 4 0").unwrap());
        assert_eq!(state.drain(), vec!["div: cannot divide 4 by zero"]);

        assert!(tree.execute_line(console(), &format!("div {} -1", i64::MIN)).unwrap());
        assert_eq!(state.drain().len(), 1);
    }

    #[test]
    fn bool_answers_follow_the_locale() {
        let (tree, state) = setup();
        let german: Arc<dyn CommandSource> = Arc::new(ConsoleSource::new("op", "de_DE"));
        tree.execute_line(german, "confirm ja").unwrap();
        assert_eq!(state.drain(), vec!["confirmed"]);
        assert_eq!(run(&tree, &state, "confirm no"), vec!["cancelled"]);
    }

    #[test]
    fn shutdown_needs_admin() {
        let (tree, state) = setup();
        let err = tree.execute_line(console(), "shutdown").unwrap_err();
        assert!(matches!(err, DispatchError::Filter(_)));
        assert!(!state.is_stopped());

        let admin: Arc<dyn CommandSource> =
            Arc::new(ConsoleSource::new("root", "en").with_permission(ADMIN_PERMISSION));
        tree.execute_line(admin, "stop").unwrap();
        assert!(state.is_stopped());
        assert_eq!(state.drain(), vec!["stopped by root"]);
    }

    #[test]
    fn help_lists_usages() {
        let (tree, state) = setup();
        assert_eq!(run(&tree, &state, "help div"), vec!["div <dividend> <divisor>"]);
        assert!(run(&tree, &state, "help").len() > 5);
        assert!(!tree.execute_line(console(), "help nothing").unwrap());
    }

    #[test]
    fn completion_covers_commands_and_values() {
        let (tree, _state) = setup();
        assert_eq!(tree.complete_line(console(), "gr"), vec!["greet"]);
        assert_eq!(tree.complete_line(console(), "greet w"), vec!["world"]);
        assert_eq!(tree.complete_line(console(), "mode set v"), vec!["VERBOSE"]);
        // shutdown is hidden from a source without the admin permission.
        assert_eq!(tree.complete_line(console(), "s"), vec!["shout"]);
    }

    #[test]
    fn ignore_policy_applies_to_the_demo_tree() {
        let state = Arc::new(ShellState::default());
        let settings = Settings {
            trailing_arguments: TrailingArguments::Ignore,
            ..Settings::default()
        };
        let tree = build_tree(settings, Arc::clone(&state)).unwrap();
        tree.execute_line(console(), "div 9 3 extra").unwrap();
        assert_eq!(state.drain(), vec!["3"]);
    }
}
