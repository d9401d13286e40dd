//! Lexical nesting contexts.
//!
//! A [`Context`] records the chain of enclosing class/module names at a
//! declaration site, innermost last. It is the value handed to the external
//! name resolver: lookup proceeds from the innermost name outwards to the
//! root. The persistent cons-list shape makes extending a context for a
//! nested declaration an O(1) operation shared across siblings.

use std::fmt;
use std::sync::Arc;

use sable_syntax::decl::ContainerDecl;
use sable_syntax::name::{Namespace, TypeName};

/// The lexical nesting of enclosing class/module names, or the top level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Context {
    /// Top level; no enclosing declaration.
    Root,
    /// One nesting step: everything outside, plus the innermost absolute
    /// class/module name.
    Cons {
        parent: Arc<Context>,
        innermost: TypeName,
    },
}

impl Context {
    /// Extends the context with one more enclosing name.
    pub fn append(&self, innermost: TypeName) -> Context {
        Context::Cons { parent: Arc::new(self.clone()), innermost }
    }

    pub fn is_root(&self) -> bool {
        matches!(self, Context::Root)
    }

    /// The innermost enclosing name, if any.
    pub fn innermost(&self) -> Option<&TypeName> {
        match self {
            Context::Root => None,
            Context::Cons { innermost, .. } => Some(innermost),
        }
    }

    /// The context one nesting level out, if any.
    pub fn parent(&self) -> Option<&Context> {
        match self {
            Context::Root => None,
            Context::Cons { parent, .. } => Some(parent),
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Context::Root => write!(f, "[]"),
            Context::Cons { parent, innermost } => write!(f, "[{} | {}]", parent, innermost),
        }
    }
}

/// Computes the context for a declaration nested under `decls`, outermost
/// first. Each step qualifies the next declaration's name with the running
/// absolute namespace, so the resulting chain holds absolute names even when
/// the declarations themselves were written with relative ones.
pub fn calculate_context(decls: &[ContainerDecl]) -> Context {
    let mut context = Context::Root;
    let mut namespace = Namespace::root();
    for decl in decls {
        let name = decl.name().with_prefix(&namespace);
        namespace = name.to_namespace();
        context = context.append(name);
    }
    context
}
