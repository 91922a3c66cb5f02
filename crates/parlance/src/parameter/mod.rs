//! Parameter descriptors and argument binding.
//!
//! A handler declares its arguments as a [`ParameterGroup`] of three kinds of
//! [`Parameter`]:
//!
//! | Kind | Matched by | Consumes |
//! |------|-----------|----------|
//! | Flag | its short or long name | the name token only; binds `true` |
//! | Named | its name or an alias | the name token plus `greed` value tokens |
//! | Indexed | position | `greed` value tokens |
//!
//! ```rust,ignore
//! let group = ParameterGroup::new(vec![
//!     Parameter::flag("-l", "--loud"),
//!     Parameter::named("--times", ValueType::of::<u32>()),
//!     Parameter::indexed("message", ValueType::of::<String>()).greed(Greed::Infinite),
//! ])?;
//! ```
//!
//! Binding rules live in [`bind`]; the handler receives the result as
//! [`ParsedParameters`].

mod bind;
mod group;

use std::fmt;
use std::sync::Arc;

use crate::reader::{ReadContext, Reader};
use crate::types::ValueType;

pub use bind::{bind, ParsedParameters};
pub use group::ParameterGroup;

/// How many value tokens a parameter consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greed {
    Fixed(usize),
    /// Every remaining token on the line.
    Infinite,
}

impl Default for Greed {
    fn default() -> Self {
        Greed::Fixed(1)
    }
}

/// Whether a parameter must be bound.
///
/// `Default` resolves by kind: indexed parameters are required, named ones
/// and flags are optional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Requirement {
    #[default]
    Default,
    Required,
    Optional,
}

/// The matching behavior of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    /// Bound by position among the indexed parameters of its group.
    Indexed { position: usize },
    Named { name: String, aliases: Vec<String> },
    /// A boolean switch. Either name sets it.
    Flag { short: String, long: String },
}

/// Offers completion candidates for a parameter's value.
///
/// Candidates are filtered by the partial token afterward, case-insensitively,
/// so implementations may return their full set.
pub trait Completer: Send + Sync {
    fn complete(&self, ctx: &ReadContext<'_>) -> Vec<String>;
}

/// A completer that always offers the same values.
#[derive(Debug, Clone, Default)]
pub struct FixedCompleter {
    values: Vec<String>,
}

impl FixedCompleter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl Completer for FixedCompleter {
    fn complete(&self, _ctx: &ReadContext<'_>) -> Vec<String> {
        self.values.clone()
    }
}

/// One declared argument of a command.
#[derive(Clone)]
pub struct Parameter {
    kind: ParameterKind,
    value_type: ValueType,
    reader: Option<Arc<dyn Reader>>,
    requirement: Requirement,
    greed: Greed,
    label: String,
    description: Option<String>,
    completer: Option<Arc<dyn Completer>>,
}

impl Parameter {
    fn with_kind(kind: ParameterKind, label: String, value_type: ValueType, greed: Greed) -> Self {
        Self {
            kind,
            value_type,
            reader: None,
            requirement: Requirement::Default,
            greed,
            label,
            description: None,
            completer: None,
        }
    }

    /// A positional parameter. Its position is assigned by the group.
    pub fn indexed(label: impl Into<String>, value_type: ValueType) -> Self {
        Self::with_kind(
            ParameterKind::Indexed { position: 0 },
            label.into(),
            value_type,
            Greed::default(),
        )
    }

    /// A parameter introduced by its name token, e.g. `--times 3`.
    ///
    /// The label is the name without leading dashes.
    pub fn named(name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        let label = name.trim_start_matches('-').to_string();
        Self::with_kind(
            ParameterKind::Named {
                name,
                aliases: Vec::new(),
            },
            label,
            value_type,
            Greed::default(),
        )
    }

    /// A boolean flag, e.g. `Parameter::flag("-f", "--force")`.
    ///
    /// The label is the long name without leading dashes.
    pub fn flag(short: impl Into<String>, long: impl Into<String>) -> Self {
        let long = long.into();
        let label = long.trim_start_matches('-').to_string();
        Self::with_kind(
            ParameterKind::Flag {
                short: short.into(),
                long,
            },
            label,
            ValueType::of::<bool>(),
            Greed::Fixed(0),
        )
    }

    /// Adds an alternate name token to a named parameter. No-op for other kinds.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        if let ParameterKind::Named { aliases, .. } = &mut self.kind {
            aliases.push(alias.into());
        }
        self
    }

    /// Sets how many value tokens are consumed. Ignored for flags.
    pub fn greed(mut self, greed: Greed) -> Self {
        if !self.is_flag() {
            self.greed = greed;
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.requirement = Requirement::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requirement = Requirement::Optional;
        self
    }

    pub fn label_as(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Uses `reader` instead of the registry lookup for this parameter.
    pub fn reader<R: Reader + 'static>(mut self, reader: R) -> Self {
        self.reader = Some(Arc::new(reader));
        self
    }

    pub fn completer<C: Completer + 'static>(mut self, completer: C) -> Self {
        self.completer = Some(Arc::new(completer));
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// How the parameter is selected on the command line.
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// The type the bound value is read as.
    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    /// The reader set with [`reader`](Self::reader), which bypasses the
    /// registry.
    pub fn explicit_reader(&self) -> Option<&Arc<dyn Reader>> {
        self.reader.as_ref()
    }

    /// The requirement as declared; see
    /// [`effective_requirement`](Self::effective_requirement).
    pub fn requirement(&self) -> Requirement {
        self.requirement
    }

    /// The requirement after resolving `Default` by kind. Flags are always
    /// optional since absence binds `false`.
    pub fn effective_requirement(&self) -> Requirement {
        match (&self.kind, self.requirement) {
            (ParameterKind::Flag { .. }, _) => Requirement::Optional,
            (ParameterKind::Indexed { .. }, Requirement::Default) => Requirement::Required,
            (_, Requirement::Default) => Requirement::Optional,
            (_, explicit) => explicit,
        }
    }

    /// True if binding fails when this parameter is absent.
    pub fn is_required(&self) -> bool {
        self.effective_requirement() == Requirement::Required
    }

    /// How many tokens the value consumes. Always `Fixed(0)` for flags.
    pub fn get_greed(&self) -> Greed {
        self.greed
    }

    /// Key used for lookups in [`ParsedParameters`](crate::ParsedParameters)
    /// and in usage text.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Completer that takes precedence over the reader's suggestions.
    pub fn get_completer(&self) -> Option<&Arc<dyn Completer>> {
        self.completer.as_ref()
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, ParameterKind::Flag { .. })
    }

    pub fn is_named(&self) -> bool {
        matches!(self.kind, ParameterKind::Named { .. })
    }

    pub fn is_indexed(&self) -> bool {
        matches!(self.kind, ParameterKind::Indexed { .. })
    }

    /// Tokens that select this parameter: flag short/long names or the named
    /// parameter's name and aliases. Empty for indexed parameters.
    pub fn names(&self) -> Vec<&str> {
        match &self.kind {
            ParameterKind::Indexed { .. } => Vec::new(),
            ParameterKind::Named { name, aliases } => std::iter::once(name.as_str())
                .chain(aliases.iter().map(String::as_str))
                .collect(),
            ParameterKind::Flag { short, long } => [short.as_str(), long.as_str()]
                .into_iter()
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// True when `token` is exactly one of this parameter's names.
    pub fn matches_name(&self, token: &str) -> bool {
        self.names().iter().any(|n| *n == token)
    }

    pub(crate) fn set_position(&mut self, at: usize) {
        if let ParameterKind::Indexed { position } = &mut self.kind {
            *position = at;
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .field("value_type", &self.value_type)
            .field("requirement", &self.requirement)
            .field("greed", &self.greed)
            .field("explicit_reader", &self.reader.is_some())
            .field("completer", &self.completer.is_some())
            .finish()
    }
}
