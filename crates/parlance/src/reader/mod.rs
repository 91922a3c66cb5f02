//! Value readers and the reader registry.
//!
//! A [`Reader`] turns the tokens a parameter consumed into a typed
//! [`Value`]. Readers are registered per [`ValueType`] in a
//! [`ReaderRegistry`], which parameters consult at bind time unless they carry
//! an explicit reader of their own.
//!
//! # Resolution
//!
//! [`ReaderRegistry::resolve`] tries, in order:
//!
//! 1. a reader registered for exactly this type;
//! 2. a previous resolution cached for this type;
//! 3. the type's declared supertypes, nearest first. The first supertype with
//!    a registration wins and is cached under the requested type;
//! 4. for enum types, the shared enum reader (see [`EnumCache`]).
//!
//! Registering or unregistering any reader clears the resolution cache, since a
//! cached supertype match may no longer be the nearest one.
//!
//! # Concurrency
//!
//! The registry is shared through `Arc` and uses concurrent maps internally.
//! Two threads resolving the same type at once may both insert into the cache;
//! both insert the same reader. A resolution that overlaps a `register` or
//! `unregister` is returned to its caller but not cached.

mod builtin;
mod enums;

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{DispatchError, ParseError};
use crate::invocation::CommandSource;
use crate::token::{join_tokens, Token};
use crate::types::{Value, ValueType};

pub use builtin::{BoolReader, FromStrReader, StringReader};
pub use enums::{canonicalize, EnumCache, EnumMetadata, EnumReader};

/// What a reader sees: the tokens its parameter consumed plus the sender.
#[derive(Clone, Copy)]
pub struct ReadContext<'a> {
    tokens: &'a [Token],
    source: &'a dyn CommandSource,
    label: &'a str,
}

impl<'a> ReadContext<'a> {
    pub fn new(tokens: &'a [Token], source: &'a dyn CommandSource, label: &'a str) -> Self {
        Self {
            tokens,
            source,
            label,
        }
    }

    pub fn tokens(&self) -> &'a [Token] {
        self.tokens
    }

    /// All consumed tokens joined with single spaces.
    pub fn text(&self) -> String {
        join_tokens(self.tokens)
    }

    pub fn first(&self) -> Option<&'a Token> {
        self.tokens.first()
    }

    /// The partial word being completed (the last token, or empty).
    pub fn prefix(&self) -> &'a str {
        self.tokens.last().map(Token::text).unwrap_or("")
    }

    pub fn source(&self) -> &'a dyn CommandSource {
        self.source
    }

    /// Label of the parameter being read.
    pub fn label(&self) -> &'a str {
        self.label
    }
}

impl fmt::Debug for ReadContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadContext")
            .field("tokens", &self.tokens)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// Converts consumed tokens into a value of a requested type.
///
/// A reader registered for a supertype also receives requests for its
/// subtypes, which is why the requested [`ValueType`] is passed along.
pub trait Reader: Send + Sync {
    fn parse(&self, ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError>;

    /// Completion candidates for the partial token in `ctx.prefix()`.
    ///
    /// Results should already be filtered by the prefix. Defaults to none.
    fn suggest(&self, _ty: &ValueType, _ctx: &ReadContext<'_>) -> Vec<String> {
        Vec::new()
    }
}

/// A [`Reader`] backed by a closure.
///
/// ```rust,ignore
/// let reader = FnReader::new(|_ty, ctx| {
///     Ok(Value::new(ctx.text().to_uppercase()))
/// });
/// ```
pub struct FnReader<F> {
    f: F,
}

impl<F> FnReader<F>
where
    F: Fn(&ValueType, &ReadContext<'_>) -> Result<Value, ParseError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Reader for FnReader<F>
where
    F: Fn(&ValueType, &ReadContext<'_>) -> Result<Value, ParseError> + Send + Sync,
{
    fn parse(&self, ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError> {
        (self.f)(ty, ctx)
    }
}

/// Type → reader map with supertype fallback and caching.
pub struct ReaderRegistry {
    registered: DashMap<TypeId, Arc<dyn Reader>>,
    resolved: DashMap<TypeId, Arc<dyn Reader>>,
    // Bumped on every change to `registered`; a resolution computed under an
    // older generation is never left in `resolved`.
    generation: AtomicU64,
    enums: Arc<EnumCache>,
    enum_reader: Arc<dyn Reader>,
}

impl ReaderRegistry {
    /// Creates a registry with no readers registered. Enums still resolve
    /// through the fallback.
    ///
    /// This differs from [`Default`], which is [`ReaderRegistry::with_defaults`].
    pub fn new() -> Self {
        let enums = Arc::new(EnumCache::new());
        Self {
            registered: DashMap::new(),
            resolved: DashMap::new(),
            generation: AtomicU64::new(0),
            enum_reader: Arc::new(EnumReader::new(Arc::clone(&enums))),
            enums,
        }
    }

    /// Creates a registry with readers for strings, booleans, numbers and `char`.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(&ValueType::of::<String>(), StringReader);
        registry.register(&ValueType::of::<bool>(), BoolReader);
        registry.register(&ValueType::of::<char>(), FromStrReader::<char>::new());
        registry.register(&ValueType::of::<i8>(), FromStrReader::<i8>::new());
        registry.register(&ValueType::of::<i16>(), FromStrReader::<i16>::new());
        registry.register(&ValueType::of::<i32>(), FromStrReader::<i32>::new());
        registry.register(&ValueType::of::<i64>(), FromStrReader::<i64>::new());
        registry.register(&ValueType::of::<isize>(), FromStrReader::<isize>::new());
        registry.register(&ValueType::of::<u8>(), FromStrReader::<u8>::new());
        registry.register(&ValueType::of::<u16>(), FromStrReader::<u16>::new());
        registry.register(&ValueType::of::<u32>(), FromStrReader::<u32>::new());
        registry.register(&ValueType::of::<u64>(), FromStrReader::<u64>::new());
        registry.register(&ValueType::of::<usize>(), FromStrReader::<usize>::new());
        registry.register(&ValueType::of::<f32>(), FromStrReader::<f32>::new());
        registry.register(&ValueType::of::<f64>(), FromStrReader::<f64>::new());
        registry
    }

    /// Registers `reader` for `ty`, returning the reader it replaced.
    pub fn register<R: Reader + 'static>(
        &self,
        ty: &ValueType,
        reader: R,
    ) -> Option<Arc<dyn Reader>> {
        self.register_shared(ty, Arc::new(reader))
    }

    /// Registers an already shared reader.
    pub fn register_shared(
        &self,
        ty: &ValueType,
        reader: Arc<dyn Reader>,
    ) -> Option<Arc<dyn Reader>> {
        let previous = self.registered.insert(ty.id(), reader);
        self.invalidate();
        tracing::debug!(ty = ty.name(), replaced = previous.is_some(), "registered reader");
        previous
    }

    /// Removes the reader registered for `ty`.
    pub fn unregister(&self, ty: &ValueType) -> Option<Arc<dyn Reader>> {
        let removed = self.registered.remove(&ty.id()).map(|(_, r)| r);
        if removed.is_some() {
            self.invalidate();
            tracing::debug!(ty = ty.name(), "unregistered reader");
        }
        removed
    }

    /// True if a reader is registered for exactly this type.
    pub fn is_registered(&self, ty: &ValueType) -> bool {
        self.registered.contains_key(&ty.id())
    }

    /// Finds the reader for `ty`.
    pub fn resolve(&self, ty: &ValueType) -> Option<Arc<dyn Reader>> {
        if let Some(reader) = self.registered.get(&ty.id()) {
            return Some(Arc::clone(reader.value()));
        }
        if let Some(reader) = self.resolved.get(&ty.id()) {
            return Some(Arc::clone(reader.value()));
        }

        let seen = self.generation.load(Ordering::SeqCst);
        let found = self.lookup(ty)?;
        self.remember(ty, &found, seen);
        Some(found)
    }

    fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.resolved.clear();
    }

    /// Nearest registered supertype, then the enum fallback. Not cached.
    fn lookup(&self, ty: &ValueType) -> Option<Arc<dyn Reader>> {
        ty.supertypes()
            .iter()
            .find_map(|sup| {
                self.registered
                    .get(&sup.id())
                    .map(|r| (sup.name(), Arc::clone(r.value())))
            })
            .map(|(via, reader)| {
                tracing::trace!(ty = ty.name(), via, "cached supertype reader");
                reader
            })
            .or_else(|| {
                ty.is_enum().then(|| {
                    tracing::trace!(ty = ty.name(), "cached enum fallback reader");
                    Arc::clone(&self.enum_reader)
                })
            })
    }

    /// Caches `reader` for `ty` if no registration happened since generation
    /// `seen` was read.
    fn remember(&self, ty: &ValueType, reader: &Arc<dyn Reader>, seen: u64) {
        if self.generation.load(Ordering::SeqCst) != seen {
            return;
        }
        self.resolved.insert(ty.id(), Arc::clone(reader));
        // A registration may have cleared the cache between the check and
        // the insert.
        if self.generation.load(Ordering::SeqCst) != seen {
            self.resolved.remove(&ty.id());
        }
    }

    /// Resolves the reader for `ty` and parses `ctx` with it.
    pub fn read(&self, ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, DispatchError> {
        let reader = self
            .resolve(ty)
            .ok_or_else(|| DispatchError::UnresolvedType(ty.name().to_string()))?;
        Ok(reader.parse(ty, ctx)?)
    }

    /// The enum metadata cache shared with the enum fallback reader.
    pub fn enum_cache(&self) -> &EnumCache {
        &self.enums
    }

    /// Drops cached enum metadata for `ty` (for hosts that unload types).
    pub fn evict_enum(&self, ty: &ValueType) -> bool {
        self.resolved.remove(&ty.id());
        self.enums.evict(ty)
    }
}

/// Same as [`ReaderRegistry::with_defaults`], not [`ReaderRegistry::new`].
impl Default for ReaderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("registered", &self.registered.len())
            .field("resolved", &self.resolved.len())
            .field("enums", &self.enums.len())
            .finish()
    }
}
