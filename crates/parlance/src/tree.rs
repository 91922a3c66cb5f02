//! The command tree: node arena, registration, and the entry points hosts call.
//!
//! ```rust,ignore
//! let tree = CommandTree::builder()
//!     .exception_handler(FnExceptionHandler::new(0, |_, _, err| { eprintln!("{err}"); true }))
//!     .build();
//!
//! let echo = CommandDescriptor::builder("echo")
//!     .parameter(Parameter::indexed("text", ValueType::of::<String>()).greed(Greed::Infinite))
//!     .build()?;
//! tree.insert(tree.root(), CommandNode::leaf(echo, FnHandler::new(|_, args| {
//!     println!("{}", args.get_required::<String>("text")?);
//!     Ok::<_, anyhow::Error>(())
//! })))?;
//!
//! let mut invocation = Invocation::new(source, "echo hello world");
//! tree.execute(&mut invocation)?;
//! ```
//!
//! # Concurrency
//!
//! The tree is `Send + Sync`. Nodes are handed out as `Arc`s so no map lock
//! is held while a handler runs; registration is serialized internally and
//! may happen while other threads dispatch.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;

use crate::error::{DispatchError, RegistrationError};
use crate::exception::{ExceptionHandler, ExceptionHandlerChain};
use crate::invocation::{CommandSource, Invocation};
use crate::node::CommandNode;
use crate::reader::ReaderRegistry;
use crate::settings::Settings;
use crate::token::tokenize;

/// Handle to a node in a [`CommandTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub struct CommandTree {
    nodes: DashMap<NodeId, Arc<CommandNode>>,
    next_id: AtomicUsize,
    root: NodeId,
    readers: Arc<ReaderRegistry>,
    settings: Settings,
    exceptions: ExceptionHandlerChain,
    registration: Mutex<()>,
}

impl CommandTree {
    pub fn builder() -> CommandTreeBuilder {
        CommandTreeBuilder::default()
    }

    /// A tree with default readers, settings, and no exception handlers.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// The root dispatcher. Top-level commands are inserted under it.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<CommandNode>> {
        self.nodes.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn readers(&self) -> &Arc<ReaderRegistry> {
        &self.readers
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn exception_handlers(&self) -> &ExceptionHandlerChain {
        &self.exceptions
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Registers `node` as a child of the dispatcher `parent`.
    ///
    /// Fails if the parent is missing or not a dispatcher, if an alias
    /// targets a missing node, or if the node's name or any alias collides
    /// case-insensitively with an existing sibling.
    pub fn insert(
        &self,
        parent: NodeId,
        node: impl Into<CommandNode>,
    ) -> Result<NodeId, RegistrationError> {
        let node = node.into();
        let _guard = self.registration.lock().unwrap_or_else(PoisonError::into_inner);

        let parent_node = self
            .node(parent)
            .ok_or(RegistrationError::UnknownNode(parent.index()))?;
        let dispatcher = parent_node
            .as_dispatcher()
            .ok_or(RegistrationError::NotADispatcher(parent.index()))?;

        if let CommandNode::Alias(alias) = &node {
            if !self.nodes.contains_key(&alias.target()) {
                return Err(RegistrationError::UnknownNode(alias.target().index()));
            }
        }

        let names: Vec<(String, String)> = node
            .descriptor()
            .names()
            .map(|name| (name.to_lowercase(), name.to_string()))
            .collect();
        if let Some((_, taken)) = names
            .iter()
            .find(|(key, _)| dispatcher.children().contains_key(key))
        {
            return Err(RegistrationError::DuplicateCommand(taken.clone()));
        }

        let id = NodeId(self.next_id.fetch_add(1, Ordering::SeqCst));
        tracing::debug!(
            parent = %parent,
            id = %id,
            name = node.descriptor().name(),
            "registered command"
        );
        self.nodes.insert(id, Arc::new(node));
        for (key, _) in names {
            dispatcher.children().insert(key, id);
        }
        Ok(id)
    }

    /// Unregisters the child of `parent` called `name` (or having it as an
    /// alias), together with everything beneath it.
    ///
    /// Aliases elsewhere that pointed into the removed subtree fail with
    /// `UnknownNode` when used.
    pub fn remove(&self, parent: NodeId, name: &str) -> Result<Option<NodeId>, RegistrationError> {
        let _guard = self.registration.lock().unwrap_or_else(PoisonError::into_inner);

        let parent_node = self
            .node(parent)
            .ok_or(RegistrationError::UnknownNode(parent.index()))?;
        let dispatcher = parent_node
            .as_dispatcher()
            .ok_or(RegistrationError::NotADispatcher(parent.index()))?;

        let Some(id) = dispatcher.child(name) else {
            return Ok(None);
        };
        dispatcher.children().retain(|_, child| *child != id);
        self.drop_subtree(id);
        tracing::debug!(parent = %parent, id = %id, name, "removed command");
        Ok(Some(id))
    }

    fn drop_subtree(&self, id: NodeId) {
        if let Some((_, node)) = self.nodes.remove(&id) {
            if let Some(dispatcher) = node.as_dispatcher() {
                for child in dispatcher.child_ids() {
                    self.drop_subtree(child);
                }
            }
        }
    }

    /// Follows dispatcher children from the root along a space-separated path.
    pub fn find(&self, path: &str) -> Option<NodeId> {
        tokenize(path).iter().try_fold(self.root, |at, token| {
            self.node(at)?.as_dispatcher()?.child(token.text())
        })
    }

    /// Routes and runs an invocation from the root.
    pub fn execute(&self, invocation: &mut Invocation) -> Result<bool, DispatchError> {
        let root = self
            .node(self.root)
            .ok_or(DispatchError::UnknownNode(self.root.index()))?;
        tracing::debug!(
            source = invocation.source().name(),
            tokens = invocation.remaining().len(),
            "dispatching"
        );
        root.execute(self, invocation)
    }

    /// Tokenizes and runs one line.
    pub fn execute_line(
        &self,
        source: Arc<dyn CommandSource>,
        line: &str,
    ) -> Result<bool, DispatchError> {
        self.execute(&mut Invocation::new(source, line))
    }

    /// Completions for the invocation's last token.
    pub fn suggestions(&self, invocation: &Invocation) -> Vec<String> {
        self.node(self.root)
            .map(|root| root.suggestions(self, invocation))
            .unwrap_or_default()
    }

    /// Completions for a partially typed line.
    pub fn complete_line(&self, source: Arc<dyn CommandSource>, line: &str) -> Vec<String> {
        self.suggestions(&Invocation::for_completion(source, line))
    }
}

impl Default for CommandTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTree")
            .field("nodes", &self.nodes.len())
            .field("readers", &self.readers)
            .field("settings", &self.settings)
            .field("exceptions", &self.exceptions)
            .finish()
    }
}

/// Builder for [`CommandTree`].
#[derive(Default)]
pub struct CommandTreeBuilder {
    readers: Option<Arc<ReaderRegistry>>,
    settings: Settings,
    exception_handlers: Vec<Arc<dyn ExceptionHandler>>,
}

impl CommandTreeBuilder {
    /// Shares an existing registry. Defaults to [`ReaderRegistry::with_defaults`].
    pub fn readers(mut self, readers: Arc<ReaderRegistry>) -> Self {
        self.readers = Some(readers);
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn exception_handler<H: ExceptionHandler + 'static>(mut self, handler: H) -> Self {
        self.exception_handlers.push(Arc::new(handler));
        self
    }

    pub fn build(self) -> CommandTree {
        let root = NodeId(0);
        let nodes = DashMap::new();
        nodes.insert(root, Arc::new(CommandNode::root()));

        CommandTree {
            nodes,
            next_id: AtomicUsize::new(1),
            root,
            readers: self
                .readers
                .unwrap_or_else(|| Arc::new(ReaderRegistry::with_defaults())),
            settings: self.settings,
            exceptions: ExceptionHandlerChain::new(self.exception_handlers),
            registration: Mutex::new(()),
        }
    }
}
