//! Error types.
//!
//! Errors fall into three groups:
//!
//! - [`RegistrationError`]: a malformed command definition, rejected when the
//!   descriptor is built or inserted into the tree.
//! - [`DispatchError`]: anything that stops a line from running. Parsing and
//!   filter failures surface here directly.
//! - Handler failures (`anyhow::Error`), which are offered to the
//!   [`ExceptionHandlerChain`](crate::ExceptionHandlerChain) first and only
//!   surface as [`DispatchError::Handler`] when nobody handles them.

use thiserror::Error;

use crate::invocation::SourceType;

/// A reader could not interpret its input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot read `{literal}` as {target}{}", reason_suffix(.reason))]
pub struct ParseError {
    /// The offending input, exactly as typed.
    pub literal: String,
    /// Human-readable name of the expected type.
    pub target: String,
    pub reason: Option<String>,
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(r) => format!(": {}", r),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(literal: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            literal: literal.into(),
            target: target.into(),
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// A filter refused to let the command run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The source type is not in the command's permitted set.
    #[error("{actual} may not use this command (allowed: {})", join_types(.permitted))]
    RestrictedSource {
        actual: SourceType,
        permitted: Vec<SourceType>,
    },

    /// The source lacks a permission node.
    #[error("missing permission `{node}`")]
    MissingPermission { node: String },

    /// A custom filter rejected the invocation.
    #[error("{0}")]
    Rejected(String),
}

fn join_types(types: &[SourceType]) -> String {
    types
        .iter()
        .map(SourceType::name)
        .collect::<Vec<_>>()
        .join(", ")
}

impl FilterError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Errors surfaced by [`CommandTree::execute`](crate::CommandTree::execute).
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No reader is registered for a parameter's type.
    #[error("no reader registered for type `{0}`")]
    UnresolvedType(String),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("missing required parameter `{label}`")]
    MissingRequiredParameter { label: String },

    /// A fixed-greed parameter found fewer tokens than it consumes.
    #[error("parameter `{label}` expects {expected} value(s), found {found}")]
    InsufficientArguments {
        label: String,
        expected: usize,
        found: usize,
    },

    #[error("too many arguments: {}", join_words(.remaining))]
    TooManyArguments { remaining: Vec<String> },

    /// A dispatcher had no child for the next token and no handler of its own.
    #[error("{}", no_match_message(.path, .token))]
    NoMatchingCommand {
        path: String,
        token: Option<String>,
    },

    /// A handler failed and no exception handler dealt with it.
    #[error("command `{command}` failed: {source}")]
    Handler {
        command: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("alias chain exceeded {0} levels")]
    AliasDepthExceeded(usize),

    /// A node id that is not (or no longer) in the tree.
    #[error("unknown command node #{0}")]
    UnknownNode(usize),
}

fn join_words(words: &[String]) -> String {
    words.join(" ")
}

fn no_match_message(path: &str, token: &Option<String>) -> String {
    match (path.is_empty(), token) {
        (true, Some(t)) => format!("unknown command `{}`", t),
        (true, None) => "no command given".to_string(),
        (false, Some(t)) => format!("unknown subcommand `{}` for `{}`", t, path),
        (false, None) => format!("`{}` needs a subcommand", path),
    }
}

/// A command definition was rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("command name must not be empty")]
    EmptyName,

    #[error("name `{0}` must not contain whitespace")]
    InvalidName(String),

    /// Two siblings (or a name and an alias) collide, case-insensitively.
    #[error("duplicate command `{0}`")]
    DuplicateCommand(String),

    #[error("duplicate parameter name `{0}`")]
    DuplicateParameter(String),

    /// An infinite-greed indexed parameter must be the last indexed one.
    #[error("parameter `{0}` consumes all remaining tokens but is not last")]
    GreedyNotLast(String),

    #[error("parameter `{0}` must consume at least one token")]
    ZeroGreed(String),

    #[error("node #{0} is not a dispatcher")]
    NotADispatcher(usize),

    #[error("unknown command node #{0}")]
    UnknownNode(usize),
}

/// Failure loading [`Settings`](crate::Settings).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid YAML settings: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid JSON settings: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = ParseError::new("zz", "Mode");
        assert_eq!(err.to_string(), "cannot read `zz` as Mode");

        let err = ParseError::new("x", "i64").with_reason("invalid digit");
        assert_eq!(err.to_string(), "cannot read `x` as i64: invalid digit");
    }

    #[test]
    fn restricted_source_lists_permitted_types() {
        let err = FilterError::RestrictedSource {
            actual: SourceType::new("console"),
            permitted: vec![SourceType::new("player"), SourceType::new("rcon")],
        };
        assert_eq!(
            err.to_string(),
            "console may not use this command (allowed: player, rcon)"
        );
    }

    #[test]
    fn no_match_messages() {
        let err = DispatchError::NoMatchingCommand {
            path: String::new(),
            token: Some("frob".into()),
        };
        assert_eq!(err.to_string(), "unknown command `frob`");

        let err = DispatchError::NoMatchingCommand {
            path: "mode".into(),
            token: None,
        };
        assert_eq!(err.to_string(), "`mode` needs a subcommand");
    }

    #[test]
    fn dispatch_error_wraps_parse_error() {
        let err: DispatchError = ParseError::new("abc", "u8").into();
        assert!(matches!(err, DispatchError::Parse(ref p) if p.literal == "abc"));
    }
}
