//! Errors raised by the declaration environment.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

use sable_syntax::decl::Decl;
use sable_syntax::name::TypeName;

use crate::entry::AliasEntry;

/// Errors that can occur while inserting declarations, validating entries,
/// or normalizing alias names.
#[derive(Debug, Error, Diagnostic, Clone)]
pub enum EnvironmentError {
    /// A declaration collides with one or more existing declarations under
    /// the same fully-qualified name.
    #[error("Duplicated declaration: `{name}` is declared more than once")]
    #[diagnostic(code(sable_env::duplicated_declaration))]
    DuplicatedDeclaration {
        /// The colliding fully-qualified name.
        name: TypeName,
        /// The declaration whose insertion failed.
        new_decl: Decl,
        /// The declarations already occupying the name.
        existing_decls: Vec<Decl>,
        #[label("conflicting declaration here")]
        span: Option<SourceSpan>,
        #[label("previously declared here")]
        previous_span: Option<SourceSpan>,
    },

    /// A class/module fragment disagrees with an earlier fragment of the
    /// same entry on type-parameter arity, variance, or bounds.
    #[error("Generic parameters of `{name}` do not match its earlier declaration")]
    #[diagnostic(code(sable_env::generic_parameter_mismatch))]
    GenericParameterMismatch {
        /// The entry whose fragments disagree.
        name: TypeName,
        /// The fragment that broke compatibility.
        decl: Decl,
        #[label("mismatching declaration here")]
        span: Option<SourceSpan>,
    },

    /// A class/module alias chain loops back on itself.
    #[error("Cyclic class/module alias definition: `{}`", entry.name())]
    #[diagnostic(code(sable_env::cyclic_alias_definition))]
    CyclicAliasDefinition {
        /// The alias entry at which the cycle closed.
        entry: AliasEntry,
        #[label("alias defined here")]
        span: Option<SourceSpan>,
    },

    /// Programmer misuse or a broken internal invariant.
    #[error("Internal environment error: {message}")]
    #[diagnostic(code(sable_env::internal_error))]
    InternalError {
        message: String,
    },
}

impl EnvironmentError {
    pub(crate) fn internal(message: impl Into<String>) -> Self {
        EnvironmentError::InternalError { message: message.into() }
    }
}
