//! Pre-execution filters.
//!
//! A [`Filter`] inspects an invocation before any parameter is bound and may
//! refuse it. Descriptors carry a [`FilterChain`]; filters run in the order
//! they were added and the first failure aborts dispatch.
//!
//! ```text
//! route to node
//!   → FILTERS ← (source type, permissions, custom checks)
//!   → bind parameters
//!   → handler
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::FilterError;
use crate::invocation::{Invocation, SourceType};

/// A guard run before a command binds its parameters.
pub trait Filter: Send + Sync {
    fn check(&self, invocation: &Invocation) -> Result<(), FilterError>;
}

/// An ordered, fail-fast list of filters.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F: Filter + 'static>(&mut self, filter: F) {
        self.filters.push(Arc::new(filter));
    }

    pub fn push_shared(&mut self, filter: Arc<dyn Filter>) {
        self.filters.push(filter);
    }

    /// Runs every filter in order, stopping at the first failure.
    pub fn run(&self, invocation: &Invocation) -> Result<(), FilterError> {
        for filter in &self.filters {
            filter.check(invocation)?;
        }
        Ok(())
    }

    /// True if every filter accepts the invocation.
    pub fn passes(&self, invocation: &Invocation) -> bool {
        self.run(invocation).is_ok()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain")
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// Permits only the listed source types.
#[derive(Debug, Clone)]
pub struct SourceTypeFilter {
    permitted: Vec<SourceType>,
}

impl SourceTypeFilter {
    pub fn new<I: IntoIterator<Item = SourceType>>(permitted: I) -> Self {
        Self {
            permitted: permitted.into_iter().collect(),
        }
    }

    pub fn only(source_type: SourceType) -> Self {
        Self::new([source_type])
    }

    pub fn permitted(&self) -> &[SourceType] {
        &self.permitted
    }
}

impl Filter for SourceTypeFilter {
    fn check(&self, invocation: &Invocation) -> Result<(), FilterError> {
        let actual = invocation.source().source_type();
        if self.permitted.contains(&actual) {
            Ok(())
        } else {
            Err(FilterError::RestrictedSource {
                actual,
                permitted: self.permitted.clone(),
            })
        }
    }
}

/// Requires the source to hold a permission node.
#[derive(Debug, Clone)]
pub struct PermissionFilter {
    node: String,
}

impl PermissionFilter {
    pub fn new(node: impl Into<String>) -> Self {
        Self { node: node.into() }
    }
}

impl Filter for PermissionFilter {
    fn check(&self, invocation: &Invocation) -> Result<(), FilterError> {
        if invocation.source().has_permission(&self.node) {
            Ok(())
        } else {
            Err(FilterError::MissingPermission {
                node: self.node.clone(),
            })
        }
    }
}

/// A [`Filter`] backed by a closure.
///
/// ```rust,ignore
/// let no_empty = FnFilter::new(|inv: &Invocation| {
///     if inv.has_remaining() { Ok(()) } else { Err(FilterError::rejected("nothing to do")) }
/// });
/// ```
pub struct FnFilter<F> {
    f: F,
}

impl<F> FnFilter<F>
where
    F: Fn(&Invocation) -> Result<(), FilterError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Filter for FnFilter<F>
where
    F: Fn(&Invocation) -> Result<(), FilterError> + Send + Sync,
{
    fn check(&self, invocation: &Invocation) -> Result<(), FilterError> {
        (self.f)(invocation)
    }
}
