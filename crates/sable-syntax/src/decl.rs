//! Top-level declarations and class/module members.
//!
//! Declaration payloads live behind `Arc` so the same node can sit in the
//! environment's declaration list, in an entry's fragment vector, and on the
//! outer-nesting path of a nested declaration without copying.

use std::sync::Arc;

use crate::name::{GlobalName, TypeName};
use crate::source::Location;
use crate::ty::{MethodType, Type, TypeParam};

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Class(Arc<ClassDecl>),
    Module(Arc<ModuleDecl>),
    Interface(Arc<InterfaceDecl>),
    TypeAlias(Arc<TypeAliasDecl>),
    Constant(Arc<ConstantDecl>),
    Global(Arc<GlobalDecl>),
    ClassAlias(Arc<AliasDecl>),
    ModuleAlias(Arc<AliasDecl>),
}

impl Decl {
    /// The declaration's source location, when the parser recorded one.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Decl::Class(decl) => decl.location.as_ref(),
            Decl::Module(decl) => decl.location.as_ref(),
            Decl::Interface(decl) => decl.location.as_ref(),
            Decl::TypeAlias(decl) => decl.location.as_ref(),
            Decl::Constant(decl) => decl.location.as_ref(),
            Decl::Global(decl) => decl.location.as_ref(),
            Decl::ClassAlias(decl) | Decl::ModuleAlias(decl) => decl.location.as_ref(),
        }
    }

    /// Node identity: true when both values wrap the same allocation with
    /// the same declaration kind.
    pub fn ptr_eq(&self, other: &Decl) -> bool {
        match (self, other) {
            (Decl::Class(a), Decl::Class(b)) => Arc::ptr_eq(a, b),
            (Decl::Module(a), Decl::Module(b)) => Arc::ptr_eq(a, b),
            (Decl::Interface(a), Decl::Interface(b)) => Arc::ptr_eq(a, b),
            (Decl::TypeAlias(a), Decl::TypeAlias(b)) => Arc::ptr_eq(a, b),
            (Decl::Constant(a), Decl::Constant(b)) => Arc::ptr_eq(a, b),
            (Decl::Global(a), Decl::Global(b)) => Arc::ptr_eq(a, b),
            (Decl::ClassAlias(a), Decl::ClassAlias(b)) => Arc::ptr_eq(a, b),
            (Decl::ModuleAlias(a), Decl::ModuleAlias(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// A named type application: superclass references, module self constraints,
/// and mixins all share this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeApp {
    pub name: TypeName,
    pub args: Vec<Type>,
}

/// A class declaration fragment. Several fragments may reopen the same
/// fully-qualified class; the environment merges them into one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub superclass: Option<TypeApp>,
    pub members: Vec<Member>,
    pub location: Option<Location>,
    pub comment: Option<String>,
    pub annotations: Vec<String>,
}

/// A module declaration fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub self_types: Vec<TypeApp>,
    pub members: Vec<Member>,
    pub location: Option<Location>,
    pub comment: Option<String>,
    pub annotations: Vec<String>,
}

/// An interface declaration. Members are method definitions and interface
/// mixins; interfaces never nest other declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub members: Vec<Member>,
    pub location: Option<Location>,
    pub comment: Option<String>,
    pub annotations: Vec<String>,
}

/// A type alias declaration: `type list[T] = ...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAliasDecl {
    pub name: TypeName,
    pub type_params: Vec<TypeParam>,
    pub ty: Type,
    pub location: Option<Location>,
    pub comment: Option<String>,
    pub annotations: Vec<String>,
}

/// A constant declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantDecl {
    pub name: TypeName,
    pub ty: Type,
    pub location: Option<Location>,
    pub comment: Option<String>,
}

/// A global variable declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlobalDecl {
    pub name: GlobalName,
    pub ty: Type,
    pub location: Option<Location>,
    pub comment: Option<String>,
}

/// A class or module alias: `class alias New = Old`. The old name is stored
/// verbatim and may be relative; the environment normalizes it on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDecl {
    pub new_name: TypeName,
    pub old_name: TypeName,
    pub location: Option<Location>,
    pub comment: Option<String>,
}

/// A member of a class, module, or interface body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Method(MethodDef),
    AttrReader(AttrDef),
    AttrWriter(AttrDef),
    AttrAccessor(AttrDef),
    InstanceVariable(VarDef),
    ClassVariable(VarDef),
    ClassInstanceVariable(VarDef),
    Include(TypeApp),
    Extend(TypeApp),
    Prepend(TypeApp),
    /// A declaration nested inside a class or module body.
    Decl(Decl),
}

/// Whether a method lives on instances or on the singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Instance,
    Singleton,
}

/// A method definition with one or more overloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub kind: MethodKind,
    pub overloads: Vec<MethodType>,
    pub location: Option<Location>,
    pub comment: Option<String>,
}

/// An attribute definition (reader, writer, or accessor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDef {
    pub name: String,
    pub ty: Type,
    pub location: Option<Location>,
    pub comment: Option<String>,
}

/// An instance, class, or class-instance variable definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarDef {
    pub name: String,
    pub ty: Type,
    pub location: Option<Location>,
}

/// One step of an outer-nesting path: the class or module declaration a
/// nested declaration appeared inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerDecl {
    Class(Arc<ClassDecl>),
    Module(Arc<ModuleDecl>),
}

impl ContainerDecl {
    pub fn name(&self) -> &TypeName {
        match self {
            ContainerDecl::Class(decl) => &decl.name,
            ContainerDecl::Module(decl) => &decl.name,
        }
    }

    pub fn type_params(&self) -> &[TypeParam] {
        match self {
            ContainerDecl::Class(decl) => &decl.type_params,
            ContainerDecl::Module(decl) => &decl.type_params,
        }
    }

    pub fn to_decl(&self) -> Decl {
        match self {
            ContainerDecl::Class(decl) => Decl::Class(decl.clone()),
            ContainerDecl::Module(decl) => Decl::Module(decl.clone()),
        }
    }
}
