//! Command descriptors and handlers.
//!
//! A [`CommandDescriptor`] is the static metadata of one command: its name
//! and aliases, help text, parameters, and filters. It is built once with
//! [`CommandDescriptor::builder`], validated, and then shared read-only.
//!
//! ```rust,ignore
//! let greet = CommandDescriptor::builder("greet")
//!     .alias("hello")
//!     .description("Say hello")
//!     .parameter(Parameter::flag("-l", "--loud"))
//!     .parameter(Parameter::indexed("who", ValueType::of::<String>()))
//!     .filter(SourceTypeFilter::only(PLAYER))
//!     .build()?;
//!
//! assert_eq!(greet.usage(), "greet [-l|--loud] <who>");
//! ```
//!
//! # Handlers
//!
//! The code that runs is a [`CommandHandler`]. Closures are wrapped in
//! [`FnHandler`] and may return `Result<bool, E>`, `Result<(), E>` or a bare
//! `bool`, for any `E: Into<anyhow::Error>`. `Ok(false)` means the command
//! did not run; the tree passes it back to the caller without retrying.

use std::fmt;
use std::sync::Arc;

use crate::error::RegistrationError;
use crate::filter::{Filter, FilterChain};
use crate::invocation::Invocation;
use crate::parameter::{Greed, Parameter, ParameterGroup, ParameterKind, ParsedParameters};

type UsageFn = dyn Fn(&CommandDescriptor) -> String + Send + Sync;

/// Immutable metadata for one command.
pub struct CommandDescriptor {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    usage: Option<Arc<UsageFn>>,
    owner: Option<String>,
    parameters: ParameterGroup,
    filters: FilterChain,
}

impl CommandDescriptor {
    pub fn builder(name: impl Into<String>) -> CommandDescriptorBuilder {
        CommandDescriptorBuilder {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            usage: None,
            owner: None,
            parameters: Vec::new(),
            filters: FilterChain::new(),
        }
    }

    /// The nameless descriptor of a tree's root dispatcher.
    pub(crate) fn root() -> Self {
        Self {
            name: String::new(),
            aliases: Vec::new(),
            description: None,
            usage: None,
            owner: None,
            parameters: ParameterGroup::empty(),
            filters: FilterChain::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Name followed by aliases.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Who registered the command (a plugin or module name).
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn parameters(&self) -> &ParameterGroup {
        &self.parameters
    }

    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// One-line usage, either from the override set on the builder or
    /// generated from the parameters.
    pub fn usage(&self) -> String {
        match &self.usage {
            Some(generate) => generate(self),
            None => generated_usage(self),
        }
    }
}

impl fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("owner", &self.owner)
            .field("parameters", &self.parameters.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Generated usage: `name [-f|--force] [--to <to>] <target> [rest...]`.
fn generated_usage(descriptor: &CommandDescriptor) -> String {
    let mut parts = Vec::new();
    if !descriptor.name.is_empty() {
        parts.push(descriptor.name.clone());
    }
    for parameter in descriptor.parameters.parameters() {
        parts.push(usage_fragment(parameter));
    }
    parts.join(" ")
}

fn usage_fragment(parameter: &Parameter) -> String {
    let value = match parameter.get_greed() {
        Greed::Infinite => format!("{}...", parameter.label()),
        Greed::Fixed(n) if n > 1 => vec![parameter.label(); n].join(" "),
        Greed::Fixed(_) => parameter.label().to_string(),
    };
    let body = match parameter.kind() {
        ParameterKind::Flag { .. } => return format!("[{}]", parameter.names().join("|")),
        ParameterKind::Named { name, .. } => format!("{} <{}>", name, value),
        ParameterKind::Indexed { .. } => value,
    };
    match (parameter.kind(), parameter.is_required()) {
        (ParameterKind::Named { .. }, true) => body,
        (ParameterKind::Indexed { .. }, true) => format!("<{}>", body),
        _ => format!("[{}]", body),
    }
}

/// Builder for [`CommandDescriptor`].
pub struct CommandDescriptorBuilder {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    usage: Option<Arc<UsageFn>>,
    owner: Option<String>,
    parameters: Vec<Parameter>,
    filters: FilterChain,
}

impl CommandDescriptorBuilder {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replaces the generated usage line.
    pub fn usage<F>(mut self, usage: F) -> Self
    where
        F: Fn(&CommandDescriptor) -> String + Send + Sync + 'static,
    {
        self.usage = Some(Arc::new(usage));
        self
    }

    pub fn owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn parameters<I: IntoIterator<Item = Parameter>>(mut self, parameters: I) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn filter<F: Filter + 'static>(mut self, filter: F) -> Self {
        self.filters.push(filter);
        self
    }

    /// Validates names and parameters.
    pub fn build(self) -> Result<CommandDescriptor, RegistrationError> {
        let mut seen: Vec<String> = Vec::new();
        for name in std::iter::once(&self.name).chain(&self.aliases) {
            if name.is_empty() {
                return Err(RegistrationError::EmptyName);
            }
            if name.chars().any(char::is_whitespace) {
                return Err(RegistrationError::InvalidName(name.clone()));
            }
            let folded = name.to_lowercase();
            if seen.contains(&folded) {
                return Err(RegistrationError::DuplicateCommand(name.clone()));
            }
            seen.push(folded);
        }

        Ok(CommandDescriptor {
            name: self.name,
            aliases: self.aliases,
            description: self.description,
            usage: self.usage,
            owner: self.owner,
            parameters: ParameterGroup::new(self.parameters)?,
            filters: self.filters,
        })
    }
}

/// The code a command runs once its parameters are bound.
pub trait CommandHandler: Send + Sync {
    /// Returns `Ok(true)` if the command ran, `Ok(false)` if it declined.
    fn handle(
        &self,
        invocation: &mut Invocation,
        parameters: &ParsedParameters,
    ) -> anyhow::Result<bool>;
}

/// Values a handler closure may return.
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> anyhow::Result<bool>;
}

impl<E> IntoHandlerResult for Result<bool, E>
where
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> anyhow::Result<bool> {
        self.map_err(Into::into)
    }
}

/// `Ok(())` counts as having run.
impl<E> IntoHandlerResult for Result<(), E>
where
    E: Into<anyhow::Error>,
{
    fn into_handler_result(self) -> anyhow::Result<bool> {
        self.map(|()| true).map_err(Into::into)
    }
}

impl IntoHandlerResult for bool {
    fn into_handler_result(self) -> anyhow::Result<bool> {
        Ok(self)
    }
}

/// A [`CommandHandler`] backed by a closure.
///
/// ```rust,ignore
/// let handler = FnHandler::new(|_inv, args| {
///     println!("hello {}", args.get_required::<String>("who")?);
///     Ok::<_, anyhow::Error>(())
/// });
/// ```
pub struct FnHandler<F, R> {
    f: F,
    _phantom: std::marker::PhantomData<fn() -> R>,
}

impl<F, R> FnHandler<F, R>
where
    F: Fn(&mut Invocation, &ParsedParameters) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<F, R> CommandHandler for FnHandler<F, R>
where
    F: Fn(&mut Invocation, &ParsedParameters) -> R + Send + Sync,
    R: IntoHandlerResult,
{
    fn handle(
        &self,
        invocation: &mut Invocation,
        parameters: &ParsedParameters,
    ) -> anyhow::Result<bool> {
        (self.f)(invocation, parameters).into_handler_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::test_support::TestSource;
    use crate::types::ValueType;

    #[test]
    fn generated_usage_covers_every_kind() {
        let descriptor = CommandDescriptor::builder("give")
            .parameter(Parameter::flag("-s", "--silent"))
            .parameter(
                Parameter::named("--reason", ValueType::of::<String>()).greed(Greed::Infinite),
            )
            .parameter(Parameter::named("--count", ValueType::of::<u32>()).required())
            .parameter(Parameter::indexed("player", ValueType::of::<String>()))
            .parameter(Parameter::indexed("item", ValueType::of::<String>()).optional())
            .build()
            .unwrap();
        assert_eq!(
            descriptor.usage(),
            "give [-s|--silent] [--reason <reason...>] --count <count> <player> [item]"
        );
    }

    #[test]
    fn usage_override_wins() {
        let descriptor = CommandDescriptor::builder("spawn")
            .usage(|d| format!("{} <x> <y> <z>", d.name()))
            .build()
            .unwrap();
        assert_eq!(descriptor.usage(), "spawn <x> <y> <z>");
    }

    #[test]
    fn build_rejects_bad_names() {
        assert_eq!(
            CommandDescriptor::builder("").build().unwrap_err(),
            RegistrationError::EmptyName
        );
        assert_eq!(
            CommandDescriptor::builder("two words").build().unwrap_err(),
            RegistrationError::InvalidName("two words".into())
        );
        assert_eq!(
            CommandDescriptor::builder("tp").alias("TP").build().unwrap_err(),
            RegistrationError::DuplicateCommand("TP".into())
        );
    }

    #[test]
    fn build_validates_parameters() {
        let err = CommandDescriptor::builder("say")
            .parameter(Parameter::indexed("text", ValueType::of::<String>()).greed(Greed::Infinite))
            .parameter(Parameter::indexed("after", ValueType::of::<String>()))
            .build()
            .unwrap_err();
        assert_eq!(err, RegistrationError::GreedyNotLast("text".into()));
    }

    #[test]
    fn handler_results_convert() {
        let mut invocation = Invocation::new(TestSource::console(), "");
        let parsed = ParsedParameters::default();

        let unit = FnHandler::new(|_, _| Ok::<_, anyhow::Error>(()));
        assert!(unit.handle(&mut invocation, &parsed).unwrap());

        let declined = FnHandler::new(|_, _| false);
        assert!(!declined.handle(&mut invocation, &parsed).unwrap());

        let failing = FnHandler::new(|_, _| Err::<bool, _>(std::fmt::Error));
        assert!(failing.handle(&mut invocation, &parsed).is_err());
    }
}
