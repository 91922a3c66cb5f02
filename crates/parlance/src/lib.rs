//! Tokenizing, argument binding and dispatch for chat and console command trees.
//!
//! `parlance` turns one line of free-form text, such as a chat command or a
//! console line, into a type-checked call of one handler out of a tree of
//! registered commands. It performs no I/O: the host feeds it lines and a
//! [`CommandSource`] describing who typed them.
//!
//! # Features
//!
//! - **Tokenizer**: whitespace splitting with `"quoted strings"`, never fails
//! - **Parameters**: indexed, named and flag parameters with greedy consumption
//! - **Readers**: type → reader registry with supertype fallback, caching, and
//!   a generic reader for enums
//! - **Dispatch tree**: nested dispatchers, aliases with injected tokens
//! - **Filters and exception handlers**: pre-flight checks, post-failure recovery
//! - **Suggestions**: completion for the last token using the same routing rules
//!
//! # Pipeline
//!
//! ```text
//! line
//!   → tokenize
//!   → Invocation (cursor + properties)
//!   → CommandTree root → dispatchers (consume command names)
//!   → FILTERS (fail fast)
//!   → bind parameters via ReaderRegistry
//!   → handler
//!   → EXCEPTION HANDLERS (only if the handler failed)
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parlance::{
//!     CommandDescriptor, CommandNode, CommandTree, FnHandler, Greed, Invocation, Parameter,
//!     ValueType,
//! };
//!
//! let tree = CommandTree::new();
//! let say = CommandDescriptor::builder("say")
//!     .parameter(Parameter::flag("-l", "--loud"))
//!     .parameter(Parameter::indexed("text", ValueType::of::<String>()).greed(Greed::Infinite))
//!     .build()?;
//!
//! tree.insert(tree.root(), CommandNode::leaf(say, FnHandler::new(|_inv, args| {
//!     let text = args.get_required::<String>("text")?;
//!     if args.flag("loud") {
//!         println!("{}", text.to_uppercase());
//!     } else {
//!         println!("{}", text);
//!     }
//!     Ok::<_, anyhow::Error>(())
//! })))?;
//!
//! tree.execute(&mut Invocation::new(source, "say -l hello there"))?;
//! ```
//!
//! # Logging
//!
//! Routing, alias redirection and binding emit `tracing` events at `debug`
//! level, cache activity at `trace`. Handler errors that no exception handler
//! takes are logged at `warn`. The library never installs a subscriber.

mod command;
mod error;
mod exception;
mod filter;
mod invocation;
mod node;
mod parameter;
mod reader;
mod settings;
mod suggest;
mod token;
mod tree;
mod types;

pub use command::{
    CommandDescriptor, CommandDescriptorBuilder, CommandHandler, FnHandler, IntoHandlerResult,
};
pub use error::{DispatchError, FilterError, ParseError, RegistrationError, SettingsError};
pub use exception::{ExceptionHandler, ExceptionHandlerChain, FnExceptionHandler};
pub use filter::{Filter, FilterChain, FnFilter, PermissionFilter, SourceTypeFilter};
pub use invocation::{CommandSource, Invocation, Properties, SourceType};
pub use node::{AliasNode, CommandNode, DispatcherNode, LeafNode, MAX_ALIAS_DEPTH};
pub use parameter::{
    bind, Completer, FixedCompleter, Greed, Parameter, ParameterGroup, ParameterKind,
    ParsedParameters, Requirement,
};
pub use reader::{
    canonicalize, BoolReader, EnumCache, EnumMetadata, EnumReader, FnReader, FromStrReader,
    ReadContext, Reader, ReaderRegistry, StringReader,
};
pub use settings::{Settings, TrailingArguments};
pub use token::{join_tokens, tokenize, Token, TokenKind};
pub use tree::{CommandTree, CommandTreeBuilder, NodeId};
pub use types::{CommandEnum, Value, ValueType};
