//! Recovery from handler failures.
//!
//! When a [`CommandHandler`](crate::CommandHandler) returns an error, the
//! tree offers it to each [`ExceptionHandler`] in ascending priority order
//! (ties keep registration order). The first handler that returns `true`
//! ends the chain and the line counts as handled. If none does, the error
//! surfaces as [`DispatchError::Handler`](crate::DispatchError::Handler).
//!
//! Parse, filter, and routing errors never reach this chain.

use std::fmt;
use std::sync::Arc;

use crate::command::CommandDescriptor;
use crate::invocation::Invocation;

pub trait ExceptionHandler: Send + Sync {
    /// Lower runs first.
    fn priority(&self) -> i32 {
        0
    }

    /// Returns `true` if the error was dealt with.
    fn handle(
        &self,
        invocation: &Invocation,
        command: &CommandDescriptor,
        error: &anyhow::Error,
    ) -> bool;
}

/// An [`ExceptionHandler`] backed by a closure.
pub struct FnExceptionHandler<F> {
    priority: i32,
    f: F,
}

impl<F> FnExceptionHandler<F>
where
    F: Fn(&Invocation, &CommandDescriptor, &anyhow::Error) -> bool + Send + Sync,
{
    pub fn new(priority: i32, f: F) -> Self {
        Self { priority, f }
    }
}

impl<F> ExceptionHandler for FnExceptionHandler<F>
where
    F: Fn(&Invocation, &CommandDescriptor, &anyhow::Error) -> bool + Send + Sync,
{
    fn priority(&self) -> i32 {
        self.priority
    }

    fn handle(
        &self,
        invocation: &Invocation,
        command: &CommandDescriptor,
        error: &anyhow::Error,
    ) -> bool {
        (self.f)(invocation, command, error)
    }
}

/// Exception handlers sorted once by `(priority, registration order)`.
#[derive(Clone, Default)]
pub struct ExceptionHandlerChain {
    handlers: Vec<Arc<dyn ExceptionHandler>>,
}

impl ExceptionHandlerChain {
    pub fn new(mut handlers: Vec<Arc<dyn ExceptionHandler>>) -> Self {
        // Stable sort: equal priorities stay in registration order.
        handlers.sort_by_key(|h| h.priority());
        Self { handlers }
    }

    /// Offers `error` to each handler until one handles it.
    pub fn handle(
        &self,
        invocation: &Invocation,
        command: &CommandDescriptor,
        error: &anyhow::Error,
    ) -> bool {
        self.handlers.iter().any(|h| h.handle(invocation, command, error))
    }

    /// Priorities in the order handlers will be tried.
    pub fn priorities(&self) -> Vec<i32> {
        self.handlers.iter().map(|h| h.priority()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for ExceptionHandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionHandlerChain")
            .field("priorities", &self.priorities())
            .finish()
    }
}
