//! The per-line invocation cursor.
//!
//! An [`Invocation`] is created for every submitted line and owns everything
//! request-scoped: the tokens, a cursor into them, the command labels consumed
//! so far, and a typed [`Properties`] bag for cross-cutting state.
//!
//! # Ownership
//!
//! Exactly one execution path mutates an invocation. It is `Send` (it can be
//! handed to another thread) but not `Sync`, and dispatch takes it by
//! `&mut`, so two dispatches can never observe the same cursor.
//!
//! # Properties vs. Source
//!
//! | Field | Lifetime | Purpose |
//! |-------|----------|---------|
//! | `source` | Host-owned, shared (`Arc`) | Who is typing: name, identity, locale |
//! | `properties` | This line only | Scratch state for filters and handlers |

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::command::CommandDescriptor;
use crate::token::{scan, tokenize, Scan, Token};

/// The kind of actor issuing commands (console, player, remote client...).
///
/// Filters compare source types by value; hosts pick the names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceType(&'static str);

impl SourceType {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Whoever submitted the command line.
///
/// Implemented by the host application; the core only reads from it.
pub trait CommandSource: Send + Sync {
    /// Display name of the sender.
    fn name(&self) -> &str;

    /// Stable unique identity (account id, UUID, "console"...).
    fn identity(&self) -> &str;

    /// BCP 47-ish locale tag such as `"en"` or `"de-AT"`.
    fn locale(&self) -> &str {
        "en"
    }

    fn source_type(&self) -> SourceType;

    /// Permission check used by [`PermissionFilter`](crate::PermissionFilter).
    ///
    /// Defaults to allowing everything.
    fn has_permission(&self, _node: &str) -> bool {
        true
    }
}

impl fmt::Debug for dyn CommandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSource")
            .field("name", &self.name())
            .field("type", &self.source_type())
            .finish_non_exhaustive()
    }
}

/// Type-safe container for per-invocation state.
///
/// One value per Rust type. Filters can stash state that handlers read back;
/// the binder stores the finished [`ParsedParameters`](crate::ParsedParameters)
/// here before the handler runs.
#[derive(Default)]
pub struct Properties {
    map: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl Properties {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value, returning the previous value of the same type.
    pub fn insert<T: Send + 'static>(&mut self, val: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(val))
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// Returns a reference to the value of type `T`, if present.
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Returns a mutable reference to the value of type `T`, if present.
    ///
    /// Lets a filter accumulate state (a counter, a permission cache) that a
    /// later filter or the handler updates in place.
    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Like [`get`](Self::get) but errors when absent, naming the missing
    /// type. Convenient inside handlers that return `anyhow::Result`.
    pub fn get_required<T: 'static>(&self) -> Result<&T, anyhow::Error> {
        self.get::<T>().ok_or_else(|| {
            anyhow::anyhow!(
                "Property missing: type {} not found in invocation",
                std::any::type_name::<T>()
            )
        })
    }

    /// Removes and returns the value of type `T`.
    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok().map(|b| *b))
    }

    /// True if a value of type `T` is stored.
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored values (one per type).
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// True if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Properties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Properties")
            .field("len", &self.map.len())
            .finish_non_exhaustive()
    }
}

/// A single command line being dispatched.
pub struct Invocation {
    source: Arc<dyn CommandSource>,
    tokens: Vec<Token>,
    position: usize,
    labels: Vec<String>,
    properties: Properties,
    command: Option<Arc<CommandDescriptor>>,
}

impl Invocation {
    /// Tokenizes `line` for execution.
    pub fn new(source: Arc<dyn CommandSource>, line: &str) -> Self {
        Self::from_tokens(source, tokenize(line))
    }

    /// Tokenizes `line` for completion.
    ///
    /// When the line is empty or ends in whitespace the user is starting a new
    /// token, so an empty plain token is appended as the partial word. Inside
    /// an unclosed quote the trailing whitespace belongs to the quoted token,
    /// which stays the partial word.
    pub fn for_completion(source: Arc<dyn CommandSource>, line: &str) -> Self {
        let Scan { mut tokens, open_quote } = scan(line);
        if !open_quote && (line.is_empty() || line.ends_with(char::is_whitespace)) {
            tokens.push(Token::plain(""));
        }
        Self::from_tokens(source, tokens)
    }

    pub fn from_tokens(source: Arc<dyn CommandSource>, tokens: Vec<Token>) -> Self {
        Self {
            source,
            tokens,
            position: 0,
            labels: Vec::new(),
            properties: Properties::new(),
            command: None,
        }
    }

    /// Who typed the line.
    pub fn source(&self) -> &dyn CommandSource {
        self.source.as_ref()
    }

    /// A shared handle to the source, for work that outlives the borrow.
    pub fn source_handle(&self) -> Arc<dyn CommandSource> {
        Arc::clone(&self.source)
    }

    /// All tokens, consumed or not.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Index of the next unconsumed token.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Tokens not yet consumed.
    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.position..]
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.tokens.len()
    }

    /// The next token, without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Consumes and returns the next token.
    pub fn next_token(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consumes up to `count` tokens and returns them.
    pub fn take(&mut self, count: usize) -> Vec<Token> {
        let end = (self.position + count).min(self.tokens.len());
        let taken = self.tokens[self.position..end].to_vec();
        self.position = end;
        taken
    }

    /// Consumes every remaining token.
    pub fn take_rest(&mut self) -> Vec<Token> {
        self.take(self.tokens.len() - self.position)
    }

    /// Moves the cursor forward without returning tokens.
    pub fn advance(&mut self, count: usize) {
        self.position = (self.position + count).min(self.tokens.len());
    }

    /// Inserts tokens at the cursor so they are read next.
    pub fn insert_tokens<I: IntoIterator<Item = Token>>(&mut self, tokens: I) {
        let at = self.position;
        self.tokens.splice(at..at, tokens);
    }

    /// Appends tokens after everything else on the line.
    pub fn append_tokens<I: IntoIterator<Item = Token>>(&mut self, tokens: I) {
        self.tokens.extend(tokens);
    }

    /// Command names consumed while routing, outermost first.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn push_label(&mut self, label: impl Into<String>) {
        self.labels.push(label.into());
    }

    /// State attached to this invocation by filters and the binder.
    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    /// The command reported for this invocation, once routing reached one.
    ///
    /// When the line came in through an alias this is the alias descriptor.
    pub fn command(&self) -> Option<&Arc<CommandDescriptor>> {
        self.command.as_ref()
    }

    /// Records `descriptor` unless an outer node (an alias) already did.
    pub(crate) fn report_command(&mut self, descriptor: &Arc<CommandDescriptor>) {
        if self.command.is_none() {
            self.command = Some(Arc::clone(descriptor));
        }
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("source", &self.source.name())
            .field("tokens", &self.tokens)
            .field("position", &self.position)
            .field("labels", &self.labels)
            .field("properties", &self.properties)
            .finish()
    }
}
