//! Command nodes: leaves, dispatchers, and aliases.
//!
//! ```text
//! (root dispatcher)
//!   ├── foo            Leaf        binds params, runs handler
//!   ├── mode           Dispatcher  routes on the next token
//!   │    └── set       Leaf
//!   └── gm ──────────▶ Alias       injects "set", runs `mode`
//! ```
//!
//! Nodes live in the [`CommandTree`] arena and refer to each other by
//! [`NodeId`], so an alias never holds its target directly.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::command::{CommandDescriptor, CommandHandler};
use crate::error::DispatchError;
use crate::invocation::Invocation;
use crate::parameter::bind;
use crate::suggest;
use crate::token::{tokenize, Token, TokenKind};
use crate::tree::{CommandTree, NodeId};

/// Longest chain of alias redirections followed in one dispatch.
pub const MAX_ALIAS_DEPTH: usize = 16;

/// A command with parameters and a handler.
pub struct LeafNode {
    descriptor: Arc<CommandDescriptor>,
    handler: Arc<dyn CommandHandler>,
}

/// A command that routes to named children.
///
/// Children are keyed by lower-cased name and alias. A dispatcher with a
/// fallback handler runs it, with its own parameters, when the next token
/// names no child.
pub struct DispatcherNode {
    descriptor: Arc<CommandDescriptor>,
    children: DashMap<String, NodeId>,
    fallback: Option<Arc<dyn CommandHandler>>,
}

impl DispatcherNode {
    /// Looks up a child by name or alias, case-insensitively.
    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(&name.to_lowercase()).map(|e| *e.value())
    }

    /// Distinct child ids.
    pub fn child_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.children.iter().map(|e| *e.value()).collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub(crate) fn children(&self) -> &DashMap<String, NodeId> {
        &self.children
    }
}

/// Another name for an existing node, possibly under a different parent.
pub struct AliasNode {
    descriptor: Arc<CommandDescriptor>,
    target: NodeId,
    prefix: Vec<Token>,
    suffix: Vec<Token>,
}

impl AliasNode {
    pub fn new(descriptor: CommandDescriptor, target: NodeId) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            target,
            prefix: Vec::new(),
            suffix: Vec::new(),
        }
    }

    /// Tokens read before whatever the user typed after the alias.
    pub fn prefix(mut self, line: &str) -> Self {
        self.prefix = tokenize(line);
        self
    }

    /// Tokens appended after the rest of the line.
    pub fn suffix(mut self, line: &str) -> Self {
        self.suffix = tokenize(line);
        self
    }

    pub fn target(&self) -> NodeId {
        self.target
    }

    pub fn prefix_tokens(&self) -> &[Token] {
        &self.prefix
    }

    pub fn suffix_tokens(&self) -> &[Token] {
        &self.suffix
    }
}

impl From<AliasNode> for CommandNode {
    fn from(alias: AliasNode) -> Self {
        CommandNode::Alias(alias)
    }
}

pub enum CommandNode {
    Leaf(LeafNode),
    Dispatcher(DispatcherNode),
    Alias(AliasNode),
}

impl CommandNode {
    pub fn leaf<H: CommandHandler + 'static>(descriptor: CommandDescriptor, handler: H) -> Self {
        CommandNode::Leaf(LeafNode {
            descriptor: Arc::new(descriptor),
            handler: Arc::new(handler),
        })
    }

    /// A dispatcher that fails with `NoMatchingCommand` when no child matches.
    pub fn dispatcher(descriptor: CommandDescriptor) -> Self {
        CommandNode::Dispatcher(DispatcherNode {
            descriptor: Arc::new(descriptor),
            children: DashMap::new(),
            fallback: None,
        })
    }

    /// A dispatcher that runs `handler` when no child matches.
    pub fn dispatcher_with_fallback<H: CommandHandler + 'static>(
        descriptor: CommandDescriptor,
        handler: H,
    ) -> Self {
        CommandNode::Dispatcher(DispatcherNode {
            descriptor: Arc::new(descriptor),
            children: DashMap::new(),
            fallback: Some(Arc::new(handler)),
        })
    }

    pub(crate) fn root() -> Self {
        Self::dispatcher(CommandDescriptor::root())
    }

    pub fn alias(descriptor: CommandDescriptor, target: NodeId) -> Self {
        AliasNode::new(descriptor, target).into()
    }

    pub fn descriptor(&self) -> &Arc<CommandDescriptor> {
        match self {
            CommandNode::Leaf(leaf) => &leaf.descriptor,
            CommandNode::Dispatcher(dispatcher) => &dispatcher.descriptor,
            CommandNode::Alias(alias) => &alias.descriptor,
        }
    }

    pub fn as_dispatcher(&self) -> Option<&DispatcherNode> {
        match self {
            CommandNode::Dispatcher(dispatcher) => Some(dispatcher),
            _ => None,
        }
    }

    /// Routes and runs the invocation from this node.
    ///
    /// Returns the handler's result, or `Ok(true)` when a failing handler's
    /// error was dealt with by an exception handler.
    pub fn execute(
        &self,
        tree: &CommandTree,
        invocation: &mut Invocation,
    ) -> Result<bool, DispatchError> {
        self.execute_at(tree, invocation, 0)
    }

    fn execute_at(
        &self,
        tree: &CommandTree,
        invocation: &mut Invocation,
        depth: usize,
    ) -> Result<bool, DispatchError> {
        match self {
            CommandNode::Leaf(leaf) => {
                run_handler(tree, invocation, &leaf.descriptor, leaf.handler.as_ref())
            }

            CommandNode::Dispatcher(dispatcher) => {
                let child = invocation
                    .peek()
                    .filter(|t| t.kind() == TokenKind::Plain)
                    .and_then(|t| dispatcher.child(t.text()));

                if let Some(id) = child {
                    if let Some(label) = invocation.next_token() {
                        invocation.push_label(label.text());
                    }
                    let node = tree.node(id).ok_or(DispatchError::UnknownNode(id.index()))?;
                    tracing::debug!(
                        from = dispatcher.descriptor.name(),
                        to = node.descriptor().name(),
                        "routed to child"
                    );
                    return node.execute_at(tree, invocation, depth);
                }

                match &dispatcher.fallback {
                    Some(handler) => {
                        run_handler(tree, invocation, &dispatcher.descriptor, handler.as_ref())
                    }
                    None => {
                        dispatcher.descriptor.filters().run(invocation)?;
                        Err(DispatchError::NoMatchingCommand {
                            path: invocation.labels().join(" "),
                            token: invocation.peek().map(|t| t.text().to_string()),
                        })
                    }
                }
            }

            CommandNode::Alias(alias) => {
                if depth >= MAX_ALIAS_DEPTH {
                    return Err(DispatchError::AliasDepthExceeded(MAX_ALIAS_DEPTH));
                }
                alias.descriptor.filters().run(invocation)?;
                invocation.report_command(&alias.descriptor);
                invocation.insert_tokens(alias.prefix.iter().cloned());
                invocation.append_tokens(alias.suffix.iter().cloned());

                let target = tree
                    .node(alias.target)
                    .ok_or(DispatchError::UnknownNode(alias.target.index()))?;
                tracing::debug!(
                    alias = alias.descriptor.name(),
                    target = target.descriptor().name(),
                    "following alias"
                );
                target.execute_at(tree, invocation, depth + 1)
            }
        }
    }

    /// Completions for the invocation's last token, routed from this node.
    ///
    /// The invocation is not modified.
    pub fn suggestions(&self, tree: &CommandTree, invocation: &Invocation) -> Vec<String> {
        let collected = self.suggest_at(tree, invocation, invocation.remaining(), 0);
        suggest::finish(collected, tree.settings())
    }

    fn suggest_at(
        &self,
        tree: &CommandTree,
        invocation: &Invocation,
        tokens: &[Token],
        depth: usize,
    ) -> Vec<String> {
        match self {
            CommandNode::Leaf(leaf) => {
                own_parameter_suggestions(tree, invocation, &leaf.descriptor, tokens)
            }

            CommandNode::Dispatcher(dispatcher) => match tokens {
                [] => Vec::new(),
                [partial] => {
                    let mut out = child_names(tree, invocation, dispatcher, partial);
                    if dispatcher.has_fallback() {
                        out.extend(own_parameter_suggestions(
                            tree,
                            invocation,
                            &dispatcher.descriptor,
                            tokens,
                        ));
                    }
                    out
                }
                [first, rest @ ..] => {
                    let child = (first.kind() == TokenKind::Plain)
                        .then(|| dispatcher.child(first.text()))
                        .flatten()
                        .and_then(|id| tree.node(id));
                    match child {
                        Some(node) => node.suggest_at(tree, invocation, rest, depth),
                        None if dispatcher.has_fallback() => own_parameter_suggestions(
                            tree,
                            invocation,
                            &dispatcher.descriptor,
                            tokens,
                        ),
                        None => Vec::new(),
                    }
                }
            },

            CommandNode::Alias(alias) => {
                if depth >= MAX_ALIAS_DEPTH || !alias.descriptor.filters().passes(invocation) {
                    return Vec::new();
                }
                // Suffix tokens come after the partial word, so they never
                // affect what is being completed.
                let redirected: Vec<Token> = alias.prefix.iter().chain(tokens).cloned().collect();
                tree.node(alias.target)
                    .map(|target| target.suggest_at(tree, invocation, &redirected, depth + 1))
                    .unwrap_or_default()
            }
        }
    }
}

impl fmt::Debug for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandNode::Leaf(leaf) => {
                f.debug_tuple("Leaf").field(&leaf.descriptor.name()).finish()
            }
            CommandNode::Dispatcher(dispatcher) => f
                .debug_struct("Dispatcher")
                .field("name", &dispatcher.descriptor.name())
                .field("children", &dispatcher.child_ids().len())
                .field("fallback", &dispatcher.has_fallback())
                .finish(),
            CommandNode::Alias(alias) => f
                .debug_struct("Alias")
                .field("name", &alias.descriptor.name())
                .field("target", &alias.target)
                .finish(),
        }
    }
}

/// Filters, bind, handler, then the exception chain on failure.
fn run_handler(
    tree: &CommandTree,
    invocation: &mut Invocation,
    descriptor: &Arc<CommandDescriptor>,
    handler: &dyn CommandHandler,
) -> Result<bool, DispatchError> {
    descriptor.filters().run(invocation)?;
    invocation.report_command(descriptor);

    let parsed = bind(invocation, descriptor.parameters(), tree.readers(), tree.settings())?;
    invocation.properties_mut().insert(parsed.clone());

    let error = match handler.handle(invocation, &parsed) {
        Ok(ran) => return Ok(ran),
        Err(error) => error,
    };

    let reported = invocation
        .command()
        .cloned()
        .unwrap_or_else(|| Arc::clone(descriptor));
    if tree.exception_handlers().handle(invocation, &reported, &error) {
        tracing::debug!(command = reported.name(), error = %error, "handler error recovered");
        return Ok(true);
    }

    tracing::warn!(command = reported.name(), error = %error, "unhandled command error");
    Err(DispatchError::Handler {
        command: reported.name().to_string(),
        source: error,
    })
}

fn own_parameter_suggestions(
    tree: &CommandTree,
    invocation: &Invocation,
    descriptor: &CommandDescriptor,
    tokens: &[Token],
) -> Vec<String> {
    if !descriptor.filters().passes(invocation) {
        return Vec::new();
    }
    suggest::parameter_suggestions(
        descriptor.parameters(),
        tokens,
        invocation.source(),
        tree.readers(),
        tree.settings(),
    )
}

/// Sorted names and aliases of visible children starting with `partial`.
fn child_names(
    tree: &CommandTree,
    invocation: &Invocation,
    dispatcher: &DispatcherNode,
    partial: &Token,
) -> Vec<String> {
    if partial.kind() != TokenKind::Plain {
        return Vec::new();
    }
    let prefix = partial.text().to_lowercase();
    let keys: Vec<(String, NodeId)> = dispatcher
        .children
        .iter()
        .filter(|entry| entry.key().starts_with(&prefix))
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();

    let mut names: Vec<String> = keys
        .into_iter()
        .filter_map(|(key, id)| {
            let node = tree.node(id)?;
            if !node.descriptor().filters().passes(invocation) {
                return None;
            }
            let name = node
                .descriptor()
                .names()
                .find(|name| name.to_lowercase() == key)
                .map(str::to_string);
            name
        })
        .collect();
    names.sort();
    names
}
