//! Entries stored in the environment's kind-keyed tables.
//!
//! Classes and modules are multi-fragment: reopening a class adds another
//! [`Fragment`] to its existing [`MultiEntry`], and all fragments must agree
//! on their type parameters. Every other kind stores exactly one
//! declaration per name ([`SingleEntry`]).

use std::sync::Arc;

use fxhash::FxHashMap;
use once_cell::sync::OnceCell;

use sable_syntax::decl::{
    AliasDecl, ClassDecl, ConstantDecl, ContainerDecl, Decl, GlobalDecl, InterfaceDecl, ModuleDecl,
    TypeAliasDecl,
};
use sable_syntax::name::{GlobalName, TypeName};
use sable_syntax::source::Location;
use sable_syntax::ty::TypeParam;

use crate::context::{calculate_context, Context};
use crate::error::EnvironmentError;
use crate::Result;

/// Implemented by the declarations that can appear as fragments of a
/// multi-fragment entry (classes and modules).
pub trait FragmentDecl: Sized {
    fn type_params(&self) -> &[TypeParam];
    fn location(&self) -> Option<&Location>;
    /// Whether this fragment names a superclass. Drives primary-fragment
    /// selection; always false for modules.
    fn declares_superclass(&self) -> bool;
    fn as_container(decl: &Arc<Self>) -> ContainerDecl;
    fn as_decl(decl: &Arc<Self>) -> Decl;
}

impl FragmentDecl for ClassDecl {
    fn type_params(&self) -> &[TypeParam] {
        &self.type_params
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn declares_superclass(&self) -> bool {
        self.superclass.is_some()
    }

    fn as_container(decl: &Arc<Self>) -> ContainerDecl {
        ContainerDecl::Class(decl.clone())
    }

    fn as_decl(decl: &Arc<Self>) -> Decl {
        Decl::Class(decl.clone())
    }
}

impl FragmentDecl for ModuleDecl {
    fn type_params(&self) -> &[TypeParam] {
        &self.type_params
    }

    fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    fn declares_superclass(&self) -> bool {
        false
    }

    fn as_container(decl: &Arc<Self>) -> ContainerDecl {
        ContainerDecl::Module(decl.clone())
    }

    fn as_decl(decl: &Arc<Self>) -> Decl {
        Decl::Module(decl.clone())
    }
}

/// One declaration occurrence contributing to a multi-fragment entry,
/// together with the enclosing declarations at its appearance site.
#[derive(Debug, Clone)]
pub struct Fragment<D> {
    decl: Arc<D>,
    outer: Vec<ContainerDecl>,
    context: OnceCell<Context>,
}

impl<D: FragmentDecl> Fragment<D> {
    pub fn new(decl: Arc<D>, outer: Vec<ContainerDecl>) -> Self {
        Fragment { decl, outer, context: OnceCell::new() }
    }

    pub fn decl(&self) -> &Arc<D> {
        &self.decl
    }

    pub fn outer(&self) -> &[ContainerDecl] {
        &self.outer
    }

    /// The lexical context of this fragment's body, memoized on first use.
    pub fn context(&self) -> &Context {
        self.context.get_or_init(|| {
            let mut chain = self.outer.clone();
            chain.push(D::as_container(&self.decl));
            calculate_context(&chain)
        })
    }
}

/// A class or module entry: a fully-qualified name and every declaration
/// fragment that contributes to it.
#[derive(Debug, Clone)]
pub struct MultiEntry<D> {
    name: TypeName,
    fragments: Vec<Fragment<D>>,
    primary: OnceCell<usize>,
}

/// A class entry.
pub type ClassEntry = MultiEntry<ClassDecl>;
/// A module entry.
pub type ModuleEntry = MultiEntry<ModuleDecl>;

impl<D: FragmentDecl> MultiEntry<D> {
    pub fn new(name: TypeName, fragment: Fragment<D>) -> Self {
        MultiEntry { name, fragments: vec![fragment], primary: OnceCell::new() }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Every fragment, in insertion order. Never empty.
    pub fn fragments(&self) -> &[Fragment<D>] {
        &self.fragments
    }

    pub(crate) fn append(&mut self, fragment: Fragment<D>) {
        self.fragments.push(fragment);
    }

    /// The representative fragment: the first one declaring a superclass,
    /// else the first inserted. Validates type-parameter compatibility
    /// across all fragments on first call; the successful result is
    /// memoized, so later calls are reads.
    pub fn primary(&self) -> Result<&Fragment<D>> {
        let index = match self.primary.get() {
            Some(index) => *index,
            None => {
                self.validate_fragments()?;
                let index = self
                    .fragments
                    .iter()
                    .position(|fragment| fragment.decl.declares_superclass())
                    .unwrap_or(0);
                let _ = self.primary.set(index);
                index
            }
        };
        Ok(&self.fragments[index])
    }

    /// Forces type-parameter validation without caring which fragment is
    /// primary.
    pub fn validate_type_params(&self) -> Result<()> {
        self.primary().map(|_| ())
    }

    /// Every fragment after the first must match the first fragment's
    /// type parameters: same arity and, after renaming its parameter names
    /// to the first fragment's, the same variance and upper bounds.
    fn validate_fragments(&self) -> Result<()> {
        let expected = self.fragments[0].decl.type_params();
        for fragment in &self.fragments[1..] {
            let params = fragment.decl.type_params();
            if !params_compatible(expected, params) {
                return Err(EnvironmentError::GenericParameterMismatch {
                    name: self.name.clone(),
                    decl: D::as_decl(&fragment.decl),
                    span: fragment.decl.location().map(|location| location.span),
                });
            }
        }
        Ok(())
    }
}

fn params_compatible(expected: &[TypeParam], params: &[TypeParam]) -> bool {
    if expected.len() != params.len() {
        return false;
    }
    let renaming: FxHashMap<String, String> = params
        .iter()
        .zip(expected)
        .map(|(param, target)| (param.name.clone(), target.name.clone()))
        .collect();
    params.iter().zip(expected).all(|(param, target)| {
        param.variance == target.variance
            && param.upper_bound.as_ref().map(|bound| bound.rename_variables(&renaming))
                == target.upper_bound
    })
}

/// A single-declaration entry: interfaces, type aliases, and constants.
#[derive(Debug, Clone)]
pub struct SingleEntry<D> {
    name: TypeName,
    decl: Arc<D>,
    outer: Vec<ContainerDecl>,
}

/// An interface entry.
pub type InterfaceEntry = SingleEntry<InterfaceDecl>;
/// A type-alias entry.
pub type TypeAliasEntry = SingleEntry<TypeAliasDecl>;
/// A constant entry.
pub type ConstantEntry = SingleEntry<ConstantDecl>;

impl<D> SingleEntry<D> {
    pub fn new(name: TypeName, decl: Arc<D>, outer: Vec<ContainerDecl>) -> Self {
        SingleEntry { name, decl, outer }
    }

    pub fn name(&self) -> &TypeName {
        &self.name
    }

    pub fn decl(&self) -> &Arc<D> {
        &self.decl
    }

    pub fn outer(&self) -> &[ContainerDecl] {
        &self.outer
    }
}

/// A global variable entry. Globals live in their own namespace and are
/// keyed by [`GlobalName`], not [`TypeName`].
#[derive(Debug, Clone)]
pub struct GlobalEntry {
    name: GlobalName,
    decl: Arc<GlobalDecl>,
}

impl GlobalEntry {
    pub fn new(name: GlobalName, decl: Arc<GlobalDecl>) -> Self {
        GlobalEntry { name, decl }
    }

    pub fn name(&self) -> &GlobalName {
        &self.name
    }

    pub fn decl(&self) -> &Arc<GlobalDecl> {
        &self.decl
    }
}

/// What occupies a class/module name in the class table.
#[derive(Debug, Clone)]
pub enum ModuleClassEntry {
    Class(ClassEntry),
    Module(ModuleEntry),
}

impl ModuleClassEntry {
    pub fn name(&self) -> &TypeName {
        match self {
            ModuleClassEntry::Class(entry) => entry.name(),
            ModuleClassEntry::Module(entry) => entry.name(),
        }
    }

    pub fn is_class(&self) -> bool {
        matches!(self, ModuleClassEntry::Class(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, ModuleClassEntry::Module(_))
    }

    pub fn validate_type_params(&self) -> Result<()> {
        match self {
            ModuleClassEntry::Class(entry) => entry.validate_type_params(),
            ModuleClassEntry::Module(entry) => entry.validate_type_params(),
        }
    }
}

/// A class or module alias entry.
#[derive(Debug, Clone)]
pub enum AliasEntry {
    Class(SingleEntry<AliasDecl>),
    Module(SingleEntry<AliasDecl>),
}

impl AliasEntry {
    pub fn name(&self) -> &TypeName {
        self.entry().name()
    }

    pub fn decl(&self) -> &Arc<AliasDecl> {
        self.entry().decl()
    }

    pub fn is_class(&self) -> bool {
        matches!(self, AliasEntry::Class(_))
    }

    pub fn is_module(&self) -> bool {
        matches!(self, AliasEntry::Module(_))
    }

    /// The underlying entry regardless of flavor.
    pub fn entry(&self) -> &SingleEntry<AliasDecl> {
        match self {
            AliasEntry::Class(entry) | AliasEntry::Module(entry) => entry,
        }
    }

    pub(crate) fn to_decl(&self) -> Decl {
        match self {
            AliasEntry::Class(entry) => Decl::ClassAlias(entry.decl().clone()),
            AliasEntry::Module(entry) => Decl::ModuleAlias(entry.decl().clone()),
        }
    }
}

/// Borrowed view of whatever occupies a class/module name: the entry itself
/// or an alias standing for one.
#[derive(Debug, Clone, Copy)]
pub enum ModuleClassEntryRef<'a> {
    Class(&'a ClassEntry),
    Module(&'a ModuleEntry),
    ClassAlias(&'a SingleEntry<AliasDecl>),
    ModuleAlias(&'a SingleEntry<AliasDecl>),
}

/// Borrowed view of a class name's occupant: a class entry or a class
/// alias.
#[derive(Debug, Clone, Copy)]
pub enum ClassEntryRef<'a> {
    Class(&'a ClassEntry),
    Alias(&'a SingleEntry<AliasDecl>),
}

/// Borrowed view of a module name's occupant: a module entry or a module
/// alias.
#[derive(Debug, Clone, Copy)]
pub enum ModuleEntryRef<'a> {
    Module(&'a ModuleEntry),
    Alias(&'a SingleEntry<AliasDecl>),
}

/// Borrowed view of anything a constant-position name can denote: a class
/// or module (possibly through an alias) or a constant.
#[derive(Debug, Clone, Copy)]
pub enum ConstantEntryRef<'a> {
    Class(&'a ClassEntry),
    Module(&'a ModuleEntry),
    ClassAlias(&'a SingleEntry<AliasDecl>),
    ModuleAlias(&'a SingleEntry<AliasDecl>),
    Constant(&'a ConstantEntry),
}

impl<'a> From<ModuleClassEntryRef<'a>> for ConstantEntryRef<'a> {
    fn from(entry: ModuleClassEntryRef<'a>) -> Self {
        match entry {
            ModuleClassEntryRef::Class(entry) => ConstantEntryRef::Class(entry),
            ModuleClassEntryRef::Module(entry) => ConstantEntryRef::Module(entry),
            ModuleClassEntryRef::ClassAlias(entry) => ConstantEntryRef::ClassAlias(entry),
            ModuleClassEntryRef::ModuleAlias(entry) => ConstantEntryRef::ModuleAlias(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use sable_syntax::name::{Namespace, TypeName};
    use sable_syntax::ty::{Type, TypeParam, Variance};

    fn class_decl(name: &str, type_params: Vec<TypeParam>, superclass: Option<&str>) -> Arc<ClassDecl> {
        Arc::new(ClassDecl {
            name: TypeName::class(Namespace::empty(), name),
            type_params,
            superclass: superclass.map(|s| sable_syntax::decl::TypeApp {
                name: TypeName::class(Namespace::root(), s),
                args: vec![],
            }),
            members: vec![],
            location: None,
            comment: None,
            annotations: vec![],
        })
    }

    fn entry_with(fragments: Vec<Arc<ClassDecl>>) -> ClassEntry {
        let name = TypeName::class(Namespace::root(), "C");
        let mut iter = fragments.into_iter();
        let first = Fragment::new(iter.next().unwrap(), vec![]);
        let mut entry = ClassEntry::new(name, first);
        for decl in iter {
            entry.append(Fragment::new(decl, vec![]));
        }
        entry
    }

    #[test]
    fn primary_prefers_superclass_fragment() {
        let entry = entry_with(vec![
            class_decl("C", vec![], None),
            class_decl("C", vec![], Some("Base")),
        ]);
        let primary = entry.primary().unwrap();
        assert!(primary.decl().superclass.is_some());
        // Memoized: a second call agrees.
        assert!(entry.primary().unwrap().decl().superclass.is_some());
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let entry = entry_with(vec![
            class_decl("C", vec![TypeParam::invariant("T")], None),
            class_decl("C", vec![TypeParam::invariant("T"), TypeParam::invariant("U")], None),
        ]);
        let err = entry.primary().unwrap_err();
        assert!(matches!(err, EnvironmentError::GenericParameterMismatch { .. }));
    }

    #[test]
    fn renamed_parameters_are_compatible() {
        // [T < _Out[T]] reopened as [U < _Out[U]] agrees after renaming.
        let bound = |var: &str| Type::Interface {
            name: TypeName::interface(Namespace::root(), "_Out"),
            args: vec![Type::Variable(var.to_string())],
        };
        let param = |name: &str| TypeParam {
            name: name.to_string(),
            variance: Variance::Covariant,
            upper_bound: Some(bound(name)),
        };
        let entry = entry_with(vec![
            class_decl("C", vec![param("T")], None),
            class_decl("C", vec![param("U")], None),
        ]);
        assert!(entry.validate_type_params().is_ok());
    }

    #[test]
    fn variance_mismatch_is_rejected() {
        let covariant = TypeParam {
            name: "T".to_string(),
            variance: Variance::Covariant,
            upper_bound: None,
        };
        let entry = entry_with(vec![
            class_decl("C", vec![TypeParam::invariant("T")], None),
            class_decl("C", vec![covariant], None),
        ]);
        assert!(entry.validate_type_params().is_err());
    }
}
