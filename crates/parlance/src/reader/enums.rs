//! Generic enum reader and the enum metadata cache.
//!
//! Enum constants are matched in canonical form: upper-cased, with spaces
//! turned into underscores. `"cc dd"`, `"CC_DD"` and `"cc_Dd"` all name the
//! constant `CC_DD`.
//!
//! Metadata (display name, canonical name → constant, declaration order) is
//! built once per enum type on first use and reused for both parsing and
//! suggestions. The enum universe is normally fixed for the life of a process,
//! so entries never expire on their own; hosts that unload command modules
//! call [`EnumCache::evict`].

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::{ReadContext, Reader};
use crate::error::ParseError;
use crate::types::{Value, ValueType};

/// Canonical form used for enum lookups.
pub fn canonicalize(input: &str) -> String {
    input.to_uppercase().replace(' ', "_")
}

/// Constants of one enum type.
pub struct EnumMetadata {
    display_name: &'static str,
    by_name: HashMap<String, Value>,
    names: Vec<&'static str>,
}

impl EnumMetadata {
    /// Builds metadata from `(constant name, value)` pairs in declaration order.
    pub fn new<I>(display_name: &'static str, constants: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, Value)>,
    {
        let mut by_name = HashMap::new();
        let mut names = Vec::new();
        for (name, value) in constants {
            by_name.insert(canonicalize(name), value);
            names.push(name);
        }
        Self {
            display_name,
            by_name,
            names,
        }
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    /// Constant names in declaration order.
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Looks up a constant by any spelling that canonicalizes to its name.
    pub fn lookup(&self, token: &str) -> Option<&Value> {
        self.by_name.get(&canonicalize(token))
    }

    /// Names whose canonical form starts with the canonical `prefix`.
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        let prefix = canonicalize(prefix);
        self.names
            .iter()
            .filter(|name| canonicalize(name).starts_with(&prefix))
            .map(|name| name.to_string())
            .collect()
    }
}

impl fmt::Debug for EnumMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumMetadata")
            .field("display_name", &self.display_name)
            .field("names", &self.names)
            .finish()
    }
}

/// Lazily built, per-type enum metadata.
#[derive(Default)]
pub struct EnumCache {
    entries: DashMap<TypeId, Arc<EnumMetadata>>,
}

impl EnumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns metadata for `ty`, building it on first use.
    ///
    /// Returns `None` for types not declared with
    /// [`ValueType::enumeration`].
    pub fn metadata(&self, ty: &ValueType) -> Option<Arc<EnumMetadata>> {
        if let Some(entry) = self.entries.get(&ty.id()) {
            return Some(Arc::clone(entry.value()));
        }
        let probe = ty.enum_probe()?;
        let metadata = Arc::new(probe());
        tracing::trace!(ty = ty.name(), constants = metadata.names.len(), "built enum metadata");
        self.entries.insert(ty.id(), Arc::clone(&metadata));
        Some(metadata)
    }

    /// Drops the cached entry for `ty`. Returns whether one existed.
    pub fn evict(&self, ty: &ValueType) -> bool {
        self.entries.remove(&ty.id()).is_some()
    }

    pub fn contains(&self, ty: &ValueType) -> bool {
        self.entries.contains_key(&ty.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reads any [`CommandEnum`](crate::CommandEnum) by constant name.
pub struct EnumReader {
    cache: Arc<EnumCache>,
}

impl EnumReader {
    pub fn new(cache: Arc<EnumCache>) -> Self {
        Self { cache }
    }
}

impl Reader for EnumReader {
    fn parse(&self, ty: &ValueType, ctx: &ReadContext<'_>) -> Result<Value, ParseError> {
        let literal = ctx.text();
        let metadata = self
            .cache
            .metadata(ty)
            .ok_or_else(|| ParseError::new(&literal, ty.short_name()).with_reason("not an enum"))?;
        metadata
            .lookup(&literal)
            .cloned()
            .ok_or_else(|| ParseError::new(literal, metadata.display_name()))
    }

    fn suggest(&self, ty: &ValueType, ctx: &ReadContext<'_>) -> Vec<String> {
        self.cache
            .metadata(ty)
            .map(|m| m.matching(ctx.prefix()))
            .unwrap_or_default()
    }
}
