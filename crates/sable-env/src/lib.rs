//! The declaration environment for the sable signature toolchain.
//!
//! This crate holds the in-memory symbol table built from parsed top-level
//! declarations. It provides:
//! - insertion with per-kind collision rules ([`Environment::insert`]),
//! - the lookup surface of predicates and entry accessors,
//! - memoized class/module alias normalization with cycle detection,
//! - lexical [`Context`] computation for declaration sites,
//! - a pure pass rewriting every relative type name to its absolute form
//!   ([`Environment::resolve_type_names`]).
//!
//! Parsing and actual name lookup live elsewhere: declarations arrive
//! through a [`Loader`], and the resolution pass delegates lookup to an
//! injected [`NameResolver`].

pub mod context;
pub mod entry;
pub mod environment;
pub mod error;
pub mod loader;
pub mod resolve;

pub use context::{calculate_context, Context};
pub use entry::{
    AliasEntry, ClassEntry, ConstantEntry, Fragment, GlobalEntry, InterfaceEntry, ModuleClassEntry,
    ModuleEntry, MultiEntry, SingleEntry, TypeAliasEntry,
};
pub use environment::Environment;
pub use error::EnvironmentError;
pub use loader::Loader;
pub use resolve::NameResolver;

/// Result type for environment operations.
pub type Result<T> = std::result::Result<T, EnvironmentError>;
