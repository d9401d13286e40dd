//! Type names and namespaces.
//!
//! A [`TypeName`] is a namespace plus a simple identifier plus a kind tag.
//! Class, module, constant, and class/module-alias names are one syntactic
//! species and share [`NameKind::Class`]; interface and type-alias names have
//! their own kinds. Global names are a separate value type ([`GlobalName`])
//! and never mix with type names.

use std::fmt;

/// The syntactic species of a [`TypeName`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameKind {
    /// Class, module, constant, and class/module-alias names.
    Class,
    /// Interface names.
    Interface,
    /// Type-alias names.
    Alias,
}

/// An ordered sequence of simple identifiers with a distinguished root.
///
/// A namespace is *absolute* when it is rooted at the top of the namespace
/// tree, *relative* otherwise. Equality is structural: `::A::B` and `A::B`
/// are different namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    path: Vec<String>,
    absolute: bool,
}

impl Namespace {
    pub fn new(path: Vec<String>, absolute: bool) -> Self {
        Namespace { path, absolute }
    }

    /// The absolute empty namespace, `::`.
    pub fn root() -> Self {
        Namespace { path: Vec::new(), absolute: true }
    }

    /// The relative empty namespace.
    pub fn empty() -> Self {
        Namespace { path: Vec::new(), absolute: false }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// The same path, rooted at the top.
    pub fn to_absolute(&self) -> Namespace {
        Namespace { path: self.path.clone(), absolute: true }
    }

    /// A new namespace with `name` appended as the innermost identifier.
    pub fn append(&self, name: impl Into<String>) -> Namespace {
        let mut path = self.path.clone();
        path.push(name.into());
        Namespace { path, absolute: self.absolute }
    }

    /// Namespace concatenation. An absolute right operand is already rooted
    /// and wins outright; otherwise the right operand's path is appended to
    /// the left's.
    pub fn concat(&self, other: &Namespace) -> Namespace {
        if other.absolute {
            other.clone()
        } else {
            let mut path = self.path.clone();
            path.extend(other.path.iter().cloned());
            Namespace { path, absolute: self.absolute }
        }
    }

    /// Splits the innermost identifier off, turning `::A::B` into the
    /// class name `::A::B` viewed as a type name (namespace `::A`, name
    /// `B`). Returns `None` for empty namespaces, which name no type.
    pub fn to_type_name(&self) -> Option<TypeName> {
        let (last, parent) = self.path.split_last()?;
        Some(TypeName::new(
            Namespace::new(parent.to_vec(), self.absolute),
            last.clone(),
            NameKind::Class,
        ))
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "::")?;
        }
        for part in &self.path {
            write!(f, "{}::", part)?;
        }
        Ok(())
    }
}

/// A possibly-qualified type name: a namespace, a simple identifier, and a
/// kind tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    namespace: Namespace,
    name: String,
    kind: NameKind,
}

impl TypeName {
    pub fn new(namespace: Namespace, name: impl Into<String>, kind: NameKind) -> Self {
        TypeName { namespace, name: name.into(), kind }
    }

    /// A class/module name.
    pub fn class(namespace: Namespace, name: impl Into<String>) -> Self {
        TypeName::new(namespace, name, NameKind::Class)
    }

    /// An interface name.
    pub fn interface(namespace: Namespace, name: impl Into<String>) -> Self {
        TypeName::new(namespace, name, NameKind::Interface)
    }

    /// A type-alias name.
    pub fn alias(namespace: Namespace, name: impl Into<String>) -> Self {
        TypeName::new(namespace, name, NameKind::Alias)
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> NameKind {
        self.kind
    }

    pub fn is_class(&self) -> bool {
        self.kind == NameKind::Class
    }

    pub fn is_interface(&self) -> bool {
        self.kind == NameKind::Interface
    }

    pub fn is_alias(&self) -> bool {
        self.kind == NameKind::Alias
    }

    pub fn is_absolute(&self) -> bool {
        self.namespace.is_absolute()
    }

    /// The same name coerced to absolute.
    pub fn to_absolute(&self) -> TypeName {
        TypeName {
            namespace: self.namespace.to_absolute(),
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// The name re-qualified under `prefix`. Absolute names are already
    /// fully qualified and come back unchanged.
    pub fn with_prefix(&self, prefix: &Namespace) -> TypeName {
        TypeName {
            namespace: prefix.concat(&self.namespace),
            name: self.name.clone(),
            kind: self.kind,
        }
    }

    /// The namespace this class/module name introduces for its members.
    ///
    /// Only meaningful for class-kind names; interface and type-alias names
    /// introduce no namespace.
    pub fn to_namespace(&self) -> Namespace {
        debug_assert!(self.is_class(), "only class/module names introduce a namespace");
        self.namespace.append(self.name.clone())
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.namespace, self.name)
    }
}

/// A global variable name. The sigil is part of the name (`$stderr`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalName(String);

impl GlobalName {
    pub fn new(name: impl Into<String>) -> Self {
        GlobalName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GlobalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
