//! The binding pass.
//!
//! [`bind`] makes one left-to-right pass over the invocation's remaining
//! tokens. At each position it tries, in order:
//!
//! 1. a flag whose short or long name equals the token;
//! 2. an unbound named parameter whose name or alias equals the token;
//! 3. the next unbound indexed parameter.
//!
//! Only plain tokens select flags and named parameters, so a quoted `"--loud"`
//! is always a value. There is no backtracking: once a parameter takes its
//! tokens they are never reconsidered.

use std::any::Any;
use std::sync::Arc;

use super::{Greed, Parameter, ParameterGroup};
use crate::error::DispatchError;
use crate::invocation::Invocation;
use crate::reader::{ReadContext, ReaderRegistry};
use crate::settings::{Settings, TrailingArguments};
use crate::token::{Token, TokenKind};
use crate::types::{Value, ValueType};

/// The values a handler receives, in declaration order.
///
/// Every flag of the group is present (unseen flags bound to `false`). Named
/// and indexed parameters that were not given are absent.
#[derive(Debug, Clone, Default)]
pub struct ParsedParameters {
    entries: Vec<(Arc<Parameter>, Value)>,
    ignored: Vec<Token>,
}

impl ParsedParameters {
    /// The value bound under `label`, if it is a `T`.
    pub fn get<T: Any>(&self, label: &str) -> Option<&T> {
        self.value(label).and_then(Value::downcast_ref)
    }

    /// Like [`get`](Self::get) but errors when absent, for use with `?` in
    /// handlers.
    pub fn get_required<T: Any>(&self, label: &str) -> Result<&T, anyhow::Error> {
        self.get::<T>(label)
            .ok_or_else(|| anyhow::anyhow!("parameter `{}` is not bound", label))
    }

    pub fn value(&self, label: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(p, _)| p.label() == label)
            .map(|(_, v)| v)
    }

    /// Whether the flag with this label, short or long name was given.
    pub fn flag(&self, name: &str) -> bool {
        self.entries
            .iter()
            .find(|(p, _)| p.is_flag() && (p.label() == name || p.matches_name(name)))
            .and_then(|(_, v)| v.downcast_ref::<bool>())
            .copied()
            .unwrap_or(false)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.value(label).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Parameter, &Value)> {
        self.entries.iter().map(|(p, v)| (p.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Trailing tokens skipped under [`TrailingArguments::Ignore`].
    pub fn ignored(&self) -> &[Token] {
        &self.ignored
    }
}

/// Binds the invocation's remaining tokens against `group`.
///
/// On success every remaining token has been consumed. On failure no
/// partial result is returned.
pub fn bind(
    invocation: &mut Invocation,
    group: &ParameterGroup,
    readers: &ReaderRegistry,
    settings: &Settings,
) -> Result<ParsedParameters, DispatchError> {
    let parameters = group.parameters();
    let mut bound: Vec<Option<Value>> = vec![None; parameters.len()];
    let indexed = group.indexed();
    let mut next_indexed = 0;
    let mut ignored = Vec::new();

    while let Some(token) = invocation.peek().cloned() {
        let selector = (token.kind() == TokenKind::Plain).then(|| token.text());

        if let Some(at) = selector.and_then(|t| group.find_flag(t)) {
            invocation.advance(1);
            bound[at] = Some(Value::new(true));
            continue;
        }

        if let Some(at) = selector
            .and_then(|t| group.find_named(t))
            .filter(|&at| bound[at].is_none())
        {
            invocation.advance(1);
            bound[at] = Some(read_parameter(invocation, &parameters[at], readers)?);
            continue;
        }

        match indexed.get(next_indexed) {
            Some(&at) => {
                next_indexed += 1;
                bound[at] = Some(read_parameter(invocation, &parameters[at], readers)?);
            }
            None => match settings.trailing_arguments {
                TrailingArguments::Reject => {
                    return Err(DispatchError::TooManyArguments {
                        remaining: invocation
                            .remaining()
                            .iter()
                            .map(|t| t.text().to_string())
                            .collect(),
                    });
                }
                TrailingArguments::Ignore => {
                    invocation.advance(1);
                    ignored.push(token);
                }
            },
        }
    }

    let mut entries = Vec::with_capacity(parameters.len());
    for (parameter, value) in parameters.iter().zip(bound) {
        match value {
            Some(value) => entries.push((Arc::clone(parameter), value)),
            None if parameter.is_flag() => entries.push((Arc::clone(parameter), Value::new(false))),
            None if parameter.is_required() => {
                return Err(DispatchError::MissingRequiredParameter {
                    label: parameter.label().to_string(),
                });
            }
            None => {}
        }
    }

    tracing::debug!(bound = entries.len(), ignored = ignored.len(), "bound parameters");
    Ok(ParsedParameters { entries, ignored })
}

/// Takes the parameter's value tokens from the cursor and reads them.
fn read_parameter(
    invocation: &mut Invocation,
    parameter: &Parameter,
    readers: &ReaderRegistry,
) -> Result<Value, DispatchError> {
    let available = invocation.remaining().len();
    let wanted = match parameter.get_greed() {
        Greed::Fixed(n) => n,
        Greed::Infinite => available.max(1),
    };
    if available < wanted {
        return Err(DispatchError::InsufficientArguments {
            label: parameter.label().to_string(),
            expected: wanted,
            found: available,
        });
    }

    let tokens = invocation.take(wanted);
    let source = invocation.source_handle();
    let ctx = ReadContext::new(&tokens, source.as_ref(), parameter.label());
    read_value(parameter.value_type(), parameter, &ctx, readers)
}

pub(crate) fn read_value(
    ty: &ValueType,
    parameter: &Parameter,
    ctx: &ReadContext<'_>,
    readers: &ReaderRegistry,
) -> Result<Value, DispatchError> {
    match parameter.explicit_reader() {
        Some(reader) => Ok(reader.parse(ty, ctx)?),
        None => readers.read(ty, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invocation::test_support::TestSource;
    use crate::parameter::Parameter;

    fn run(group: &ParameterGroup, line: &str) -> Result<ParsedParameters, DispatchError> {
        run_with(group, line, &Settings::default())
    }

    fn run_with(
        group: &ParameterGroup,
        line: &str,
        settings: &Settings,
    ) -> Result<ParsedParameters, DispatchError> {
        let mut invocation = Invocation::new(TestSource::console(), line);
        let readers = ReaderRegistry::with_defaults();
        bind(&mut invocation, group, &readers, settings)
    }

    fn string(label: &str) -> Parameter {
        Parameter::indexed(label, ValueType::of::<String>())
    }

    #[test]
    fn absent_flag_is_false_present_flag_consumes_one_token() {
        let group =
            ParameterGroup::new(vec![Parameter::flag("-l", "--loud"), string("who")]).unwrap();

        let parsed = run(&group, "steve").unwrap();
        assert!(!parsed.flag("loud"));
        assert_eq!(parsed.get::<String>("who").unwrap(), "steve");

        let parsed = run(&group, "steve -l").unwrap();
        assert!(parsed.flag("--loud"));
        assert!(parsed.flag("-l"));
        assert_eq!(parsed.get::<String>("who").unwrap(), "steve");
    }

    #[test]
    fn infinite_greed_binds_rest_of_line() {
        let group = ParameterGroup::new(vec![string("message").greed(Greed::Infinite)]).unwrap();
        let line = "I get matched as one String by this greedy parameter";
        let parsed = run(&group, line).unwrap();
        assert_eq!(parsed.get::<String>("message").unwrap(), line);
    }

    #[test]
    fn infinite_named_takes_rest_of_line() {
        let group = ParameterGroup::new(vec![
            Parameter::flag("-s", "--silent"),
            Parameter::named("--to", ValueType::of::<String>()).greed(Greed::Infinite),
        ])
        .unwrap();

        let parsed = run(&group, "--to a b c").unwrap();
        assert_eq!(parsed.get::<String>("to").unwrap(), "a b c");
        assert!(!parsed.flag("silent"));

        // Everything after the name is a value, flags included.
        let parsed = run(&group, "--to a --silent b").unwrap();
        assert_eq!(parsed.get::<String>("to").unwrap(), "a --silent b");
        assert!(!parsed.flag("silent"));

        let parsed = run(&group, "-s --to a").unwrap();
        assert!(parsed.flag("silent"));
        assert_eq!(parsed.get::<String>("to").unwrap(), "a");
    }

    #[test]
    fn infinite_named_with_no_values_is_insufficient() {
        let group = ParameterGroup::new(vec![
            Parameter::named("--to", ValueType::of::<String>()).greed(Greed::Infinite),
        ])
        .unwrap();
        let err = run(&group, "--to").err().unwrap();
        assert!(matches!(
            err,
            DispatchError::InsufficientArguments { expected: 1, found: 0, .. }
        ));
    }

    #[test]
    fn flags_and_named_interleave_with_positionals() {
        let group = ParameterGroup::new(vec![
            Parameter::flag("-s", "--silent"),
            Parameter::named("--times", ValueType::of::<u32>()).alias("-t"),
            string("from"),
            string("to"),
        ])
        .unwrap();

        let parsed = run(&group, "a -t 3 b --silent").unwrap();
        assert_eq!(parsed.get::<String>("from").unwrap(), "a");
        assert_eq!(parsed.get::<String>("to").unwrap(), "b");
        assert_eq!(parsed.get::<u32>("times"), Some(&3));
        assert!(parsed.flag("silent"));

        let labels: Vec<_> = parsed.iter().map(|(p, _)| p.label().to_string()).collect();
        assert_eq!(labels, vec!["silent", "times", "from", "to"]);
    }

    #[test]
    fn quoted_token_is_never_a_flag() {
        let group =
            ParameterGroup::new(vec![Parameter::flag("-l", "--loud"), string("text")]).unwrap();
        let parsed = run(&group, "\"--loud\"").unwrap();
        assert!(!parsed.flag("loud"));
        assert_eq!(parsed.get::<String>("text").unwrap(), "--loud");
    }

    #[test]
    fn repeated_named_falls_through_to_positional() {
        let group = ParameterGroup::new(vec![
            Parameter::named("--to", ValueType::of::<String>()),
            string("rest"),
        ])
        .unwrap();
        let parsed = run(&group, "--to a --to").unwrap();
        assert_eq!(parsed.get::<String>("to").unwrap(), "a");
        assert_eq!(parsed.get::<String>("rest").unwrap(), "--to");
    }

    #[test]
    fn missing_required_fails_whole_bind() {
        let group = ParameterGroup::new(vec![string("a"), string("b")]).unwrap();
        let err = run(&group, "only").unwrap_err();
        assert!(matches!(err, DispatchError::MissingRequiredParameter { label } if label == "b"));

        let group = ParameterGroup::new(vec![string("a"), string("b").optional()]).unwrap();
        let parsed = run(&group, "only").unwrap();
        assert!(!parsed.contains("b"));
    }

    #[test]
    fn fixed_greed_needs_enough_tokens() {
        let group = ParameterGroup::new(vec![string("pair").greed(Greed::Fixed(2))]).unwrap();
        assert_eq!(run(&group, "x y").unwrap().get::<String>("pair").unwrap(), "x y");

        let err = run(&group, "x").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::InsufficientArguments { expected: 2, found: 1, .. }
        ));
    }

    #[test]
    fn trailing_tokens_follow_policy() {
        let group =
            ParameterGroup::new(vec![Parameter::flag("-v", "--verbose"), string("one")]).unwrap();

        let err = run(&group, "a b c").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::TooManyArguments { remaining } if remaining == ["b", "c"]
        ));

        let settings = Settings {
            trailing_arguments: TrailingArguments::Ignore,
            ..Settings::default()
        };
        let parsed = run_with(&group, "a b -v c", &settings).unwrap();
        assert!(parsed.flag("verbose"));
        let ignored: Vec<_> = parsed.ignored().iter().map(Token::text).collect();
        assert_eq!(ignored, vec!["b", "c"]);
    }

    #[test]
    fn reader_errors_surface_with_literal() {
        let group =
            ParameterGroup::new(vec![Parameter::indexed("n", ValueType::of::<u8>())]).unwrap();
        let err = run(&group, "300").unwrap_err();
        assert!(matches!(err, DispatchError::Parse(p) if p.literal == "300"));
    }

    #[test]
    fn explicit_reader_overrides_registry() {
        use crate::reader::FnReader;

        let group = ParameterGroup::new(vec![string("shout")
            .reader(FnReader::new(|_, ctx| Ok(Value::new(ctx.text().to_uppercase()))))])
        .unwrap();
        let parsed = run(&group, "hey").unwrap();
        assert_eq!(parsed.get::<String>("shout").unwrap(), "HEY");
    }

    #[test]
    fn unresolved_type_is_reported() {
        struct Unknown;
        let group =
            ParameterGroup::new(vec![Parameter::indexed("x", ValueType::of::<Unknown>())])
                .unwrap();
        let err = run(&group, "x").unwrap_err();
        assert!(matches!(err, DispatchError::UnresolvedType(_)));
    }

    #[test]
    fn get_required_reports_label() {
        let parsed = ParsedParameters::default();
        let err = parsed.get_required::<String>("who").unwrap_err();
        assert!(err.to_string().contains("`who`"));
    }
}
