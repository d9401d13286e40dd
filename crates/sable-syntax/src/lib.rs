//! AST value types for the sable signature language.
//!
//! This crate owns the data the declaration environment operates on:
//! - type names and namespaces (`name`),
//! - type expressions, functions, and type parameters (`ty`),
//! - top-level declarations and their members (`decl`),
//! - source buffers and locations (`source`).
//!
//! Nothing here performs resolution or validation; these are plain values
//! produced by a parser and consumed by the environment.

pub mod decl;
pub mod name;
pub mod source;
pub mod ty;

pub use decl::{Decl, Member};
pub use name::{GlobalName, NameKind, Namespace, TypeName};
pub use source::{Buffer, Location};
pub use ty::{Function, MethodType, Type, TypeParam, Variance};
