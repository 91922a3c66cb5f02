//! Completion of a command's parameters.
//!
//! Routing through dispatchers and aliases is mirrored in
//! [`CommandNode::suggestions`](crate::CommandNode::suggestions); this module
//! handles what happens once a node's own parameters are reached. The
//! complete tokens are classified with the binder's rules (flag, then named,
//! then indexed) without reading any values, which tells us which parameter
//! the partial token belongs to.

use std::collections::HashSet;

use crate::invocation::CommandSource;
use crate::parameter::{Greed, Parameter, ParameterGroup};
use crate::reader::{ReadContext, ReaderRegistry};
use crate::settings::Settings;
use crate::token::{Token, TokenKind};

/// Candidates for the last token of `tokens`, which are the tokens a node's
/// parameters would bind.
pub(crate) fn parameter_suggestions(
    group: &ParameterGroup,
    tokens: &[Token],
    source: &dyn CommandSource,
    readers: &ReaderRegistry,
    settings: &Settings,
) -> Vec<String> {
    let Some((partial, complete)) = tokens.split_last() else {
        return Vec::new();
    };
    let parameters = group.parameters();
    let indexed = group.indexed();
    let mut next_indexed = 0;
    let mut used = vec![false; parameters.len()];
    let mut at_token = 0;

    while at_token < complete.len() {
        let token = &complete[at_token];
        let selector = (token.kind() == TokenKind::Plain).then(|| token.text());

        if let Some(at) = selector.and_then(|t| group.find_flag(t)) {
            used[at] = true;
            at_token += 1;
            continue;
        }

        let target = match selector
            .and_then(|t| group.find_named(t))
            .filter(|&at| !used[at])
        {
            Some(at) => Some((at, at_token + 1)),
            None => {
                let next = indexed.get(next_indexed).map(|&at| (at, at_token));
                next_indexed += 1;
                next
            }
        };

        let Some((at, value_start)) = target else {
            // Trailing token with nowhere to go.
            at_token += 1;
            continue;
        };
        used[at] = true;
        match value_end(&parameters[at], value_start) {
            Some(end) if end <= complete.len() => at_token = end,
            _ => {
                return value_suggestions(&parameters[at], &tokens[value_start..], source, readers);
            }
        }
    }

    let mut out = Vec::new();
    if let Some(&at) = indexed.get(next_indexed) {
        out.extend(value_suggestions(
            &parameters[at],
            std::slice::from_ref(partial),
            source,
            readers,
        ));
    }

    let offer_names = partial.kind() == TokenKind::Plain
        && (!partial.text().is_empty() || settings.suggest_names_on_empty_prefix);
    if offer_names {
        for (at, parameter) in parameters.iter().enumerate() {
            if used[at] || parameter.is_indexed() {
                continue;
            }
            out.extend(
                parameter
                    .names()
                    .into_iter()
                    .filter(|name| name.starts_with(partial.text()))
                    .map(str::to_string),
            );
        }
    }
    out
}

/// Index one past the parameter's last value token, or `None` when it takes
/// everything (including a fixed greed too large to index).
fn value_end(parameter: &Parameter, start: usize) -> Option<usize> {
    match parameter.get_greed() {
        Greed::Fixed(n) => start.checked_add(n),
        Greed::Infinite => None,
    }
}

/// Completions for a value whose last token is the partial one.
///
/// A parameter's completer wins over its reader. Completer output is
/// filtered here; readers filter their own.
fn value_suggestions(
    parameter: &Parameter,
    value_tokens: &[Token],
    source: &dyn CommandSource,
    readers: &ReaderRegistry,
) -> Vec<String> {
    let ctx = ReadContext::new(value_tokens, source, parameter.label());
    if let Some(completer) = parameter.get_completer() {
        let prefix = ctx.prefix().to_lowercase();
        return completer
            .complete(&ctx)
            .into_iter()
            .filter(|c| c.to_lowercase().starts_with(&prefix))
            .collect();
    }
    parameter
        .explicit_reader()
        .cloned()
        .or_else(|| readers.resolve(parameter.value_type()))
        .map(|reader| reader.suggest(parameter.value_type(), &ctx))
        .unwrap_or_default()
}

/// Drops duplicates (keeping the first) and applies the configured cap.
pub(crate) fn finish(mut suggestions: Vec<String>, settings: &Settings) -> Vec<String> {
    let mut seen = HashSet::new();
    suggestions.retain(|s| seen.insert(s.clone()));
    if let Some(max) = settings.max_suggestions {
        suggestions.truncate(max);
    }
    suggestions
}
