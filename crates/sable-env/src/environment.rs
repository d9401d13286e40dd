//! The declaration environment.
//!
//! Kind-keyed tables over every top-level declaration the loader has pushed
//! in, with per-kind collision rules, the lookup surface, and memoized
//! class/module alias normalization.

use std::collections::hash_map::Entry as TableSlot;
use std::fmt;
use std::sync::Arc;

use fxhash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use sable_syntax::decl::{
    AliasDecl, ClassDecl, ConstantDecl, ContainerDecl, Decl, GlobalDecl, InterfaceDecl, Member,
    ModuleDecl, TypeAliasDecl,
};
use sable_syntax::name::{GlobalName, Namespace, TypeName};
use sable_syntax::source::Buffer;

use crate::entry::{
    AliasEntry, ClassEntry, ClassEntryRef, ConstantEntry, ConstantEntryRef, Fragment, GlobalEntry,
    InterfaceEntry, ModuleClassEntry, ModuleClassEntryRef, ModuleEntry, ModuleEntryRef,
    SingleEntry, TypeAliasEntry,
};
use crate::error::EnvironmentError;
use crate::loader::Loader;
use crate::Result;

/// Memo states of alias normalization. Absence from the memo is the fourth
/// state ("not yet seen").
#[derive(Debug, Clone, PartialEq, Eq)]
enum NormalizeStep {
    /// Previously computed canonical name.
    Resolved(TypeName),
    /// Previously computed: definitively does not resolve.
    Unresolved,
    /// Currently being computed; hitting this marker means a cycle.
    Pending,
}

/// The declaration environment: every loaded declaration, indexed per kind
/// by fully-qualified absolute name.
#[derive(Clone, Default)]
pub struct Environment {
    declarations: Vec<Decl>,
    class_decls: FxHashMap<TypeName, ModuleClassEntry>,
    interface_decls: FxHashMap<TypeName, InterfaceEntry>,
    type_alias_decls: FxHashMap<TypeName, TypeAliasEntry>,
    constant_decls: FxHashMap<TypeName, ConstantEntry>,
    global_decls: FxHashMap<GlobalName, GlobalEntry>,
    class_alias_decls: FxHashMap<TypeName, AliasEntry>,
    normalize_cache: FxHashMap<TypeName, NormalizeStep>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    /// Builds an environment by letting `loader` push declarations into it.
    pub fn from_loader(loader: &mut dyn Loader) -> Result<Environment> {
        let mut env = Environment::new();
        loader.load(&mut env)?;
        debug!(declarations = env.declarations.len(), "environment loaded");
        Ok(env)
    }

    /// Every top-level declaration, in insertion order.
    pub fn declarations(&self) -> &[Decl] {
        &self.declarations
    }

    pub fn class_decls(&self) -> &FxHashMap<TypeName, ModuleClassEntry> {
        &self.class_decls
    }

    pub fn interface_decls(&self) -> &FxHashMap<TypeName, InterfaceEntry> {
        &self.interface_decls
    }

    pub fn type_alias_decls(&self) -> &FxHashMap<TypeName, TypeAliasEntry> {
        &self.type_alias_decls
    }

    pub fn constant_decls(&self) -> &FxHashMap<TypeName, ConstantEntry> {
        &self.constant_decls
    }

    pub fn global_decls(&self) -> &FxHashMap<GlobalName, GlobalEntry> {
        &self.global_decls
    }

    pub fn class_alias_decls(&self) -> &FxHashMap<TypeName, AliasEntry> {
        &self.class_alias_decls
    }

    // --- Insertion -------------------------------------------------------

    /// Appends a top-level declaration and indexes it (and every nested
    /// declaration) into the kind tables.
    ///
    /// On a collision the environment keeps everything inserted before the
    /// failing declaration; callers generally discard it.
    pub fn insert(&mut self, decl: Decl) -> Result<()> {
        self.declarations.push(decl.clone());
        self.insert_decl(&decl, &[], &Namespace::root())
    }

    fn insert_decl(
        &mut self,
        decl: &Decl,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        match decl {
            Decl::Class(class) => self.insert_class(class, outer, namespace),
            Decl::Module(module) => self.insert_module(module, outer, namespace),
            Decl::Interface(interface) => self.insert_interface(interface, outer, namespace),
            Decl::TypeAlias(alias) => self.insert_type_alias(alias, outer, namespace),
            Decl::Constant(constant) => self.insert_constant(constant, outer, namespace),
            Decl::Global(global) => self.insert_global(global),
            Decl::ClassAlias(alias) => self.insert_module_alias(alias, outer, namespace, true),
            Decl::ModuleAlias(alias) => self.insert_module_alias(alias, outer, namespace, false),
        }
    }

    fn insert_class(
        &mut self,
        decl: &Arc<ClassDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        let name = decl.name.with_prefix(namespace);
        if self.constant_decls.contains_key(&name)
            || self.class_alias_decls.contains_key(&name)
            || matches!(self.class_decls.get(&name), Some(ModuleClassEntry::Module(_)))
        {
            return Err(self.duplicated(&name, Decl::Class(decl.clone())));
        }

        let fragment = Fragment::new(decl.clone(), outer.to_vec());
        match self.class_decls.entry(name.clone()) {
            TableSlot::Occupied(mut slot) => {
                if let ModuleClassEntry::Class(entry) = slot.get_mut() {
                    entry.append(fragment);
                }
            }
            TableSlot::Vacant(slot) => {
                slot.insert(ModuleClassEntry::Class(ClassEntry::new(name.clone(), fragment)));
            }
        }
        trace!(name = %name, "inserted class fragment");

        self.insert_members(&decl.members, decl_container_class(decl), outer, &name)
    }

    fn insert_module(
        &mut self,
        decl: &Arc<ModuleDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        let name = decl.name.with_prefix(namespace);
        if self.constant_decls.contains_key(&name)
            || self.class_alias_decls.contains_key(&name)
            || matches!(self.class_decls.get(&name), Some(ModuleClassEntry::Class(_)))
        {
            return Err(self.duplicated(&name, Decl::Module(decl.clone())));
        }

        let fragment = Fragment::new(decl.clone(), outer.to_vec());
        match self.class_decls.entry(name.clone()) {
            TableSlot::Occupied(mut slot) => {
                if let ModuleClassEntry::Module(entry) = slot.get_mut() {
                    entry.append(fragment);
                }
            }
            TableSlot::Vacant(slot) => {
                slot.insert(ModuleClassEntry::Module(ModuleEntry::new(name.clone(), fragment)));
            }
        }
        trace!(name = %name, "inserted module fragment");

        self.insert_members(&decl.members, decl_container_module(decl), outer, &name)
    }

    /// Recurses into the nested declarations of a class/module body.
    fn insert_members(
        &mut self,
        members: &[Member],
        container: ContainerDecl,
        outer: &[ContainerDecl],
        name: &TypeName,
    ) -> Result<()> {
        let mut inner_outer = outer.to_vec();
        inner_outer.push(container);
        let inner_namespace = name.to_namespace();
        for member in members {
            if let Member::Decl(nested) = member {
                self.insert_decl(nested, &inner_outer, &inner_namespace)?;
            }
        }
        Ok(())
    }

    fn insert_interface(
        &mut self,
        decl: &Arc<InterfaceDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        let name = decl.name.with_prefix(namespace);
        if self.interface_decls.contains_key(&name) {
            return Err(self.duplicated(&name, Decl::Interface(decl.clone())));
        }
        trace!(name = %name, "inserted interface");
        self.interface_decls
            .insert(name.clone(), SingleEntry::new(name, decl.clone(), outer.to_vec()));
        Ok(())
    }

    fn insert_type_alias(
        &mut self,
        decl: &Arc<TypeAliasDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        let name = decl.name.with_prefix(namespace);
        if self.type_alias_decls.contains_key(&name) {
            return Err(self.duplicated(&name, Decl::TypeAlias(decl.clone())));
        }
        trace!(name = %name, "inserted type alias");
        self.type_alias_decls
            .insert(name.clone(), SingleEntry::new(name, decl.clone(), outer.to_vec()));
        Ok(())
    }

    fn insert_constant(
        &mut self,
        decl: &Arc<ConstantDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
    ) -> Result<()> {
        let name = decl.name.with_prefix(namespace);
        if self.constant_entry(&name).is_some() {
            return Err(self.duplicated(&name, Decl::Constant(decl.clone())));
        }
        trace!(name = %name, "inserted constant");
        self.constant_decls
            .insert(name.clone(), SingleEntry::new(name, decl.clone(), outer.to_vec()));
        Ok(())
    }

    fn insert_global(&mut self, decl: &Arc<GlobalDecl>) -> Result<()> {
        let name = decl.name.clone();
        if let Some(existing) = self.global_decls.get(&name) {
            let existing_decl = Decl::Global(existing.decl().clone());
            return Err(duplicated_decls(
                // Globals have no type name; report under a root-level
                // stand-in so the error shape stays uniform.
                TypeName::class(Namespace::root(), name.as_str()),
                Decl::Global(decl.clone()),
                vec![existing_decl],
            ));
        }
        trace!(name = %name, "inserted global");
        self.global_decls.insert(name.clone(), GlobalEntry::new(name, decl.clone()));
        Ok(())
    }

    fn insert_module_alias(
        &mut self,
        decl: &Arc<AliasDecl>,
        outer: &[ContainerDecl],
        namespace: &Namespace,
        class_alias: bool,
    ) -> Result<()> {
        let name = decl.new_name.with_prefix(namespace);
        let new_decl = if class_alias {
            Decl::ClassAlias(decl.clone())
        } else {
            Decl::ModuleAlias(decl.clone())
        };
        if self.constant_entry(&name).is_some() {
            return Err(self.duplicated(&name, new_decl));
        }
        trace!(name = %name, class_alias, "inserted alias");
        let entry = SingleEntry::new(name.clone(), decl.clone(), outer.to_vec());
        let entry = if class_alias { AliasEntry::Class(entry) } else { AliasEntry::Module(entry) };
        self.class_alias_decls.insert(name, entry);
        Ok(())
    }

    /// Builds the duplication error for `name`, collecting whatever
    /// declarations already occupy it.
    fn duplicated(&self, name: &TypeName, new_decl: Decl) -> EnvironmentError {
        duplicated_decls(name.clone(), new_decl, self.decls_at(name))
    }

    fn decls_at(&self, name: &TypeName) -> Vec<Decl> {
        let mut decls = Vec::new();
        match self.class_decls.get(name) {
            Some(ModuleClassEntry::Class(entry)) => {
                decls.extend(entry.fragments().iter().map(|f| Decl::Class(f.decl().clone())));
            }
            Some(ModuleClassEntry::Module(entry)) => {
                decls.extend(entry.fragments().iter().map(|f| Decl::Module(f.decl().clone())));
            }
            None => {}
        }
        if let Some(entry) = self.class_alias_decls.get(name) {
            decls.push(entry.to_decl());
        }
        if let Some(entry) = self.interface_decls.get(name) {
            decls.push(Decl::Interface(entry.decl().clone()));
        }
        if let Some(entry) = self.type_alias_decls.get(name) {
            decls.push(Decl::TypeAlias(entry.decl().clone()));
        }
        if let Some(entry) = self.constant_decls.get(name) {
            decls.push(Decl::Constant(entry.decl().clone()));
        }
        decls
    }

    // --- Lookup ----------------------------------------------------------

    /// Is `name` an interface entry?
    pub fn is_interface_name(&self, name: &TypeName) -> bool {
        self.interface_decls.contains_key(name)
    }

    /// Is `name` a type-alias entry?
    pub fn is_type_alias_name(&self, name: &TypeName) -> bool {
        self.type_alias_decls.contains_key(name)
    }

    /// Is `name` a class/module entry or a class/module alias?
    pub fn is_module_name(&self, name: &TypeName) -> bool {
        self.class_decls.contains_key(name) || self.class_alias_decls.contains_key(name)
    }

    /// Is `name` any known type name?
    pub fn is_type_name(&self, name: &TypeName) -> bool {
        self.is_module_name(name) || self.is_interface_name(name) || self.is_type_alias_name(name)
    }

    /// Is `name` usable in constant position: a constant entry or a
    /// class/module (alias included)?
    pub fn is_constant_name(&self, name: &TypeName) -> bool {
        self.is_module_name(name) || self.constant_decls.contains_key(name)
    }

    /// Is the entry at `name` specifically a class entry (not an alias)?
    pub fn is_class_decl(&self, name: &TypeName) -> bool {
        matches!(self.class_decls.get(name), Some(ModuleClassEntry::Class(_)))
    }

    /// Is the entry at `name` specifically a module entry (not an alias)?
    pub fn is_module_decl(&self, name: &TypeName) -> bool {
        matches!(self.class_decls.get(name), Some(ModuleClassEntry::Module(_)))
    }

    pub fn is_class_alias(&self, name: &TypeName) -> bool {
        matches!(self.class_alias_decls.get(name), Some(AliasEntry::Class(_)))
    }

    pub fn is_module_alias(&self, name: &TypeName) -> bool {
        matches!(self.class_alias_decls.get(name), Some(AliasEntry::Module(_)))
    }

    /// The class entry or class alias at `name`.
    pub fn class_entry(&self, name: &TypeName) -> Option<ClassEntryRef<'_>> {
        if let Some(ModuleClassEntry::Class(entry)) = self.class_decls.get(name) {
            return Some(ClassEntryRef::Class(entry));
        }
        match self.class_alias_decls.get(name) {
            Some(AliasEntry::Class(entry)) => Some(ClassEntryRef::Alias(entry)),
            _ => None,
        }
    }

    /// The module entry or module alias at `name`.
    pub fn module_entry(&self, name: &TypeName) -> Option<ModuleEntryRef<'_>> {
        if let Some(ModuleClassEntry::Module(entry)) = self.class_decls.get(name) {
            return Some(ModuleEntryRef::Module(entry));
        }
        match self.class_alias_decls.get(name) {
            Some(AliasEntry::Module(entry)) => Some(ModuleEntryRef::Alias(entry)),
            _ => None,
        }
    }

    /// Whatever class/module-flavored thing occupies `name`.
    pub fn module_class_entry(&self, name: &TypeName) -> Option<ModuleClassEntryRef<'_>> {
        if let Some(entry) = self.class_decls.get(name) {
            return Some(match entry {
                ModuleClassEntry::Class(entry) => ModuleClassEntryRef::Class(entry),
                ModuleClassEntry::Module(entry) => ModuleClassEntryRef::Module(entry),
            });
        }
        match self.class_alias_decls.get(name)? {
            AliasEntry::Class(entry) => Some(ModuleClassEntryRef::ClassAlias(entry)),
            AliasEntry::Module(entry) => Some(ModuleClassEntryRef::ModuleAlias(entry)),
        }
    }

    /// Whatever `name` denotes in constant position.
    pub fn constant_entry(&self, name: &TypeName) -> Option<ConstantEntryRef<'_>> {
        if let Some(entry) = self.module_class_entry(name) {
            return Some(entry.into());
        }
        self.constant_decls.get(name).map(ConstantEntryRef::Constant)
    }

    /// Like [`Environment::module_class_entry`], but normalizes `name`
    /// first. After normalization an alias can no longer surface; if one
    /// does, an internal invariant is broken.
    pub fn normalized_module_class_entry(
        &mut self,
        name: &TypeName,
    ) -> Result<Option<ModuleClassEntryRef<'_>>> {
        let Some(normalized) = self.try_normalize_module_name(name)? else {
            return Ok(None);
        };
        match self.module_class_entry(&normalized) {
            Some(entry @ (ModuleClassEntryRef::Class(_) | ModuleClassEntryRef::Module(_))) => {
                Ok(Some(entry))
            }
            Some(_) => Err(EnvironmentError::internal(format!(
                "alias entry remained after normalization: `{normalized}`"
            ))),
            None => Ok(None),
        }
    }

    /// Like [`Environment::class_entry`], but normalizes `name` first.
    pub fn normalized_class_entry(&mut self, name: &TypeName) -> Result<Option<&ClassEntry>> {
        match self.normalized_module_class_entry(name)? {
            Some(ModuleClassEntryRef::Class(entry)) => Ok(Some(entry)),
            _ => Ok(None),
        }
    }

    /// Like [`Environment::module_entry`], but normalizes `name` first.
    pub fn normalized_module_entry(&mut self, name: &TypeName) -> Result<Option<&ModuleEntry>> {
        match self.normalized_module_class_entry(name)? {
            Some(ModuleClassEntryRef::Module(entry)) => Ok(Some(entry)),
            _ => Ok(None),
        }
    }

    // --- Alias normalization ---------------------------------------------

    /// Total normalization: the canonical name `name` denotes, or `name`
    /// itself when it does not resolve to any class/module.
    pub fn normalize_module_name(&mut self, name: &TypeName) -> Result<TypeName> {
        Ok(self.try_normalize_module_name(name)?.unwrap_or_else(|| name.clone()))
    }

    /// The canonical absolute class/module name that `name` denotes after
    /// chasing aliases, or `None` when `name` does not resolve to any
    /// class/module.
    ///
    /// `name` must be class-kind. Cycles through alias old-names raise
    /// [`EnvironmentError::CyclicAliasDefinition`]; on any error the
    /// in-progress markers this call installed are removed again.
    pub fn try_normalize_module_name(&mut self, name: &TypeName) -> Result<Option<TypeName>> {
        if !name.is_class() {
            return Err(EnvironmentError::internal(format!(
                "class/module name expected in normalization, got `{name}`"
            )));
        }
        let name = name.to_absolute();

        match self.normalize_cache.get(&name) {
            Some(NormalizeStep::Resolved(normalized)) => return Ok(Some(normalized.clone())),
            Some(NormalizeStep::Unresolved) => return Ok(None),
            Some(NormalizeStep::Pending) => {
                // Revisiting an in-progress name: the alias chain loops.
                let entry = match self.class_alias_decls.get(&name) {
                    Some(entry) => entry.clone(),
                    None => {
                        return Err(EnvironmentError::internal(format!(
                            "in-progress normalization marker without an alias entry: `{name}`"
                        )))
                    }
                };
                let span = entry.decl().location.as_ref().map(|location| location.span);
                return Err(EnvironmentError::CyclicAliasDefinition { entry, span });
            }
            None => {}
        }

        self.normalize_cache.insert(name.clone(), NormalizeStep::Pending);

        enum Step {
            Canonical(TypeName),
            Alias(TypeName),
            Constant,
            Missing,
        }

        let step = match self.constant_entry(&name) {
            Some(ConstantEntryRef::Class(entry)) => Step::Canonical(entry.name().clone()),
            Some(ConstantEntryRef::Module(entry)) => Step::Canonical(entry.name().clone()),
            Some(ConstantEntryRef::ClassAlias(entry) | ConstantEntryRef::ModuleAlias(entry)) => {
                Step::Alias(entry.decl().old_name.clone())
            }
            Some(ConstantEntryRef::Constant(_)) => Step::Constant,
            None => Step::Missing,
        };

        let normalized = match step {
            Step::Canonical(canonical) => Ok(Some(canonical)),
            Step::Alias(old_name) => self.normalize_alias_target(&old_name),
            Step::Constant => Err(EnvironmentError::internal(format!(
                "constant name passed where a class/module name was expected: `{name}`"
            ))),
            Step::Missing => {
                // Nothing here yet. Drop the marker so a later insertion of
                // this name can still normalize.
                self.normalize_cache.remove(&name);
                return Ok(None);
            }
        };

        match normalized {
            Ok(Some(normalized)) => {
                self.normalize_cache
                    .insert(name, NormalizeStep::Resolved(normalized.clone()));
                Ok(Some(normalized))
            }
            Ok(None) => {
                self.normalize_cache.insert(name, NormalizeStep::Unresolved);
                Ok(None)
            }
            Err(error) => {
                self.normalize_cache.remove(&name);
                Err(error)
            }
        }
    }

    /// Normalizes an alias's old-name. A qualified old-name may itself be
    /// qualified by an alias, so the qualifier is normalized first.
    fn normalize_alias_target(&mut self, old_name: &TypeName) -> Result<Option<TypeName>> {
        if old_name.namespace().is_empty() {
            return self.try_normalize_module_name(old_name);
        }
        let parent = match old_name.namespace().to_type_name() {
            Some(parent) => parent,
            None => {
                return Err(EnvironmentError::internal(format!(
                    "qualified alias target without a parent name: `{old_name}`"
                )))
            }
        };
        let normalized_parent = self.normalize_module_name(&parent)?;
        if normalized_parent == parent {
            self.try_normalize_module_name(old_name)
        } else {
            let rebuilt = TypeName::new(
                normalized_parent.to_namespace(),
                old_name.name(),
                old_name.kind(),
            );
            self.try_normalize_module_name(&rebuilt)
        }
    }

    // --- Validation and introspection ------------------------------------

    /// Forces every class/module entry to validate type-parameter
    /// compatibility across its fragments.
    pub fn validate_type_params(&self) -> Result<()> {
        for entry in self.class_decls.values() {
            entry.validate_type_params()?;
        }
        Ok(())
    }

    /// Groups declarations by the buffer they were parsed from.
    /// Declarations without a location are dropped.
    pub fn buffers_decls(&self) -> FxHashMap<Buffer, Vec<Decl>> {
        let mut map: FxHashMap<Buffer, Vec<Decl>> = FxHashMap::default();
        for decl in &self.declarations {
            if let Some(location) = decl.location() {
                map.entry(location.buffer.clone()).or_default().push(decl.clone());
            }
        }
        map
    }

    /// The buffers that contributed at least one located declaration.
    pub fn buffers(&self) -> Vec<Buffer> {
        self.buffers_decls().into_keys().collect()
    }

    /// A new environment holding exactly the declarations for which
    /// `predicate` is false. Survivors are re-inserted from scratch, so the
    /// result re-validates every collision and nesting rule.
    pub fn reject<F>(&self, mut predicate: F) -> Result<Environment>
    where
        F: FnMut(&Decl) -> bool,
    {
        let mut env = Environment::new();
        for decl in &self.declarations {
            if !predicate(decl) {
                env.insert(decl.clone())?;
            }
        }
        Ok(env)
    }

    /// A new environment without any declaration that came from one of
    /// `buffers`.
    pub fn unload(&self, buffers: &FxHashSet<Buffer>) -> Result<Environment> {
        debug!(buffers = buffers.len(), "unloading buffers");
        self.reject(|decl| {
            decl.location()
                .is_some_and(|location| buffers.contains(&location.buffer))
        })
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("declarations", &self.declarations.len())
            .field("class_decls", &self.class_decls.len())
            .field("interface_decls", &self.interface_decls.len())
            .field("type_alias_decls", &self.type_alias_decls.len())
            .field("constant_decls", &self.constant_decls.len())
            .field("global_decls", &self.global_decls.len())
            .field("class_alias_decls", &self.class_alias_decls.len())
            .finish()
    }
}

fn decl_container_class(decl: &Arc<ClassDecl>) -> ContainerDecl {
    ContainerDecl::Class(decl.clone())
}

fn decl_container_module(decl: &Arc<ModuleDecl>) -> ContainerDecl {
    ContainerDecl::Module(decl.clone())
}

fn duplicated_decls(name: TypeName, new_decl: Decl, existing_decls: Vec<Decl>) -> EnvironmentError {
    let span = new_decl.location().map(|location| location.span);
    let previous_span = existing_decls
        .iter()
        .find_map(|decl| decl.location())
        .map(|location| location.span);
    EnvironmentError::DuplicatedDeclaration { name, new_decl, existing_decls, span, previous_span }
}

#[cfg(test)]
mod tests {
    use super::*;

    use miette::SourceSpan;
    use sable_syntax::source::Location;
    use sable_syntax::ty::{Type, TypeParam};

    fn relative(name: &str) -> TypeName {
        TypeName::class(Namespace::empty(), name)
    }

    fn absolute(name: &str) -> TypeName {
        TypeName::class(Namespace::root(), name)
    }

    fn class(name: &str) -> Decl {
        class_with(name, vec![], None)
    }

    fn class_with(name: &str, members: Vec<Member>, location: Option<Location>) -> Decl {
        Decl::Class(Arc::new(ClassDecl {
            name: relative(name),
            type_params: vec![],
            superclass: None,
            members,
            location,
            comment: None,
            annotations: vec![],
        }))
    }

    fn module_with(name: &str, members: Vec<Member>) -> Decl {
        Decl::Module(Arc::new(ModuleDecl {
            name: relative(name),
            type_params: vec![],
            self_types: vec![],
            members,
            location: None,
            comment: None,
            annotations: vec![],
        }))
    }

    fn module(name: &str) -> Decl {
        module_with(name, vec![])
    }

    fn class_alias(new_name: &str, old_name: TypeName) -> Decl {
        Decl::ClassAlias(Arc::new(AliasDecl {
            new_name: relative(new_name),
            old_name,
            location: None,
            comment: None,
        }))
    }

    fn module_alias(new_name: &str, old_name: TypeName) -> Decl {
        Decl::ModuleAlias(Arc::new(AliasDecl {
            new_name: relative(new_name),
            old_name,
            location: None,
            comment: None,
        }))
    }

    fn constant(name: &str) -> Decl {
        Decl::Constant(Arc::new(ConstantDecl {
            name: relative(name),
            ty: Type::Base(sable_syntax::ty::BaseType::Untyped),
            location: None,
            comment: None,
        }))
    }

    fn located(name: &str, buffer: &str) -> Decl {
        class_with(name, vec![], Some(Location::new(Buffer::new(buffer), SourceSpan::from((0, 1)))))
    }

    #[test]
    fn class_and_module_fragments_collide() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        let err = env.insert(module("A")).unwrap_err();
        match err {
            EnvironmentError::DuplicatedDeclaration { name, existing_decls, .. } => {
                assert_eq!(name, absolute("A"));
                assert_eq!(existing_decls.len(), 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reopening_merges_fragments() {
        let mut env = Environment::new();
        env.insert(module("M")).unwrap();
        env.insert(module("M")).unwrap();

        match env.class_decls().get(&absolute("M")) {
            Some(ModuleClassEntry::Module(entry)) => {
                assert_eq!(entry.fragments().len(), 2);
                assert!(entry.primary().is_ok());
            }
            other => panic!("expected module entry, got {other:?}"),
        }
    }

    #[test]
    fn reopening_with_mismatched_params_fails_validation() {
        let module_generic = |params: Vec<TypeParam>| {
            Decl::Module(Arc::new(ModuleDecl {
                name: relative("M"),
                type_params: params,
                self_types: vec![],
                members: vec![],
                location: None,
                comment: None,
                annotations: vec![],
            }))
        };

        let mut env = Environment::new();
        env.insert(module_generic(vec![TypeParam::invariant("T")])).unwrap();
        env.insert(module_generic(vec![
            TypeParam::invariant("T"),
            TypeParam::invariant("U"),
        ]))
        .unwrap();

        let err = env.validate_type_params().unwrap_err();
        assert!(matches!(err, EnvironmentError::GenericParameterMismatch { .. }));
    }

    #[test]
    fn constants_collide_with_everything() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        assert!(env.insert(constant("A")).is_err());

        env.insert(constant("B")).unwrap();
        assert!(env.insert(class("B")).is_err());
        assert!(env.insert(constant("B")).is_err());
    }

    #[test]
    fn aliases_collide_with_existing_entries() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        assert!(env.insert(class_alias("A", relative("X"))).is_err());

        env.insert(class_alias("Y", relative("A"))).unwrap();
        assert!(env.insert(class("Y")).is_err());
        assert!(env.insert(module_alias("Y", relative("A"))).is_err());
    }

    #[test]
    fn interface_duplicates_are_raised() {
        let interface = || {
            Decl::Interface(Arc::new(InterfaceDecl {
                name: TypeName::interface(Namespace::empty(), "_Each"),
                type_params: vec![],
                members: vec![],
                location: None,
                comment: None,
                annotations: vec![],
            }))
        };
        let mut env = Environment::new();
        env.insert(interface()).unwrap();
        assert!(env.insert(interface()).is_err());
    }

    #[test]
    fn nested_declarations_are_keyed_under_their_namespace() {
        let mut env = Environment::new();
        env.insert(module_with("A", vec![Member::Decl(class("C"))])).unwrap();

        assert!(env.is_module_decl(&absolute("A")));
        let nested = TypeName::class(Namespace::root().append("A"), "C");
        assert!(env.is_class_decl(&nested));

        // The nested entry remembers its outer nesting.
        match env.class_decls().get(&nested) {
            Some(ModuleClassEntry::Class(entry)) => {
                let fragment = &entry.fragments()[0];
                assert_eq!(fragment.outer().len(), 1);
                assert_eq!(fragment.context().innermost().unwrap(), &nested);
            }
            other => panic!("expected class entry, got {other:?}"),
        }
    }

    #[test]
    fn lookup_predicates_see_aliases() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        env.insert(class_alias("B", relative("A"))).unwrap();

        assert!(env.is_module_name(&absolute("B")));
        assert!(env.is_constant_name(&absolute("B")));
        assert!(env.is_class_alias(&absolute("B")));
        assert!(!env.is_module_alias(&absolute("B")));
        assert!(!env.is_class_decl(&absolute("B")));
        assert!(matches!(env.class_entry(&absolute("B")), Some(ClassEntryRef::Alias(_))));
        assert!(matches!(env.module_entry(&absolute("B")), None));
    }

    #[test]
    fn alias_chain_normalizes_to_terminal_class() {
        let mut env = Environment::new();
        env.insert(class("X")).unwrap();
        env.insert(class_alias("Y", relative("X"))).unwrap();
        env.insert(class_alias("Z", relative("Y"))).unwrap();

        let normalized = env.try_normalize_module_name(&absolute("Z")).unwrap();
        assert_eq!(normalized, Some(absolute("X")));

        // The whole chain is memoized to the terminal name.
        for name in ["X", "Y", "Z"] {
            assert_eq!(
                env.normalize_cache.get(&absolute(name)),
                Some(&NormalizeStep::Resolved(absolute("X"))),
            );
        }
    }

    #[test]
    fn qualified_alias_target_normalizes_its_parent_first() {
        let mut env = Environment::new();
        env.insert(module_with("A", vec![Member::Decl(class("C"))])).unwrap();
        env.insert(module_alias("B", relative("A"))).unwrap();
        env.insert(class_alias("D", TypeName::class(Namespace::empty().append("B"), "C")))
            .unwrap();

        let normalized = env.normalize_module_name(&absolute("D")).unwrap();
        assert_eq!(normalized, TypeName::class(Namespace::root().append("A"), "C"));
    }

    #[test]
    fn cyclic_aliases_are_detected_once() {
        let mut env = Environment::new();
        env.insert(class_alias("A", relative("B"))).unwrap();
        env.insert(class_alias("B", relative("A"))).unwrap();

        let err = env.try_normalize_module_name(&absolute("A")).unwrap_err();
        match err {
            EnvironmentError::CyclicAliasDefinition { entry, .. } => {
                assert_eq!(entry.name(), &absolute("A"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // No in-progress markers survive the failure.
        assert!(env
            .normalize_cache
            .values()
            .all(|step| *step != NormalizeStep::Pending));
    }

    #[test]
    fn unresolved_aliases_are_memoized_missing_names_are_not() {
        let mut env = Environment::new();
        env.insert(class_alias("W", relative("Missing"))).unwrap();

        assert_eq!(env.try_normalize_module_name(&absolute("W")).unwrap(), None);
        assert_eq!(env.normalize_cache.get(&absolute("W")), Some(&NormalizeStep::Unresolved));
        // The missing target left no marker behind, so declaring it later
        // still works.
        assert!(!env.normalize_cache.contains_key(&absolute("Missing")));

        assert_eq!(env.try_normalize_module_name(&absolute("Gone")).unwrap(), None);
        assert!(!env.normalize_cache.contains_key(&absolute("Gone")));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut env = Environment::new();
        env.insert(class("X")).unwrap();
        env.insert(class_alias("Y", relative("X"))).unwrap();

        let once = env.normalize_module_name(&absolute("Y")).unwrap();
        let twice = env.normalize_module_name(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(env.normalize_module_name(&absolute("X")).unwrap(), absolute("X"));
    }

    #[test]
    fn normalization_rejects_non_class_names() {
        let mut env = Environment::new();
        let interface = TypeName::interface(Namespace::root(), "_Each");
        assert!(matches!(
            env.try_normalize_module_name(&interface),
            Err(EnvironmentError::InternalError { .. })
        ));
    }

    #[test]
    fn normalization_rejects_constants_in_module_position() {
        let mut env = Environment::new();
        env.insert(constant("VERSION")).unwrap();
        assert!(matches!(
            env.try_normalize_module_name(&absolute("VERSION")),
            Err(EnvironmentError::InternalError { .. })
        ));
    }

    #[test]
    fn normalized_entry_accessors_chase_aliases() {
        let mut env = Environment::new();
        env.insert(class("X")).unwrap();
        env.insert(class_alias("Y", relative("X"))).unwrap();

        let entry = env.normalized_class_entry(&absolute("Y")).unwrap().unwrap();
        assert_eq!(entry.name(), &absolute("X"));
        assert!(env.normalized_module_entry(&absolute("Y")).unwrap().is_none());
    }

    #[test]
    fn buffers_group_located_declarations() {
        let mut env = Environment::new();
        env.insert(located("A", "a.sig")).unwrap();
        env.insert(located("B", "a.sig")).unwrap();
        env.insert(located("C", "b.sig")).unwrap();
        env.insert(class("NoLocation")).unwrap();

        let grouped = env.buffers_decls();
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped[&Buffer::new("a.sig")].len(), 2);
        assert_eq!(grouped[&Buffer::new("b.sig")].len(), 1);
        assert_eq!(env.buffers().len(), 2);
    }

    #[test]
    fn reject_keeps_survivors_and_revalidates() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        env.insert(class("B")).unwrap();

        let all = env.reject(|_| false).unwrap();
        assert_eq!(all.declarations(), env.declarations());

        let without_a = env
            .reject(|decl| matches!(decl, Decl::Class(c) if c.name.name() == "A"))
            .unwrap();
        assert_eq!(without_a.declarations().len(), 1);
        assert!(!without_a.is_class_decl(&absolute("A")));
        assert!(without_a.is_class_decl(&absolute("B")));
    }

    #[test]
    fn unload_drops_whole_buffers() {
        let mut env = Environment::new();
        env.insert(located("A", "a.sig")).unwrap();
        env.insert(located("B", "b.sig")).unwrap();

        let mut gone = FxHashSet::default();
        gone.insert(Buffer::new("a.sig"));
        let rest = env.unload(&gone).unwrap();
        assert!(!rest.is_class_decl(&absolute("A")));
        assert!(rest.is_class_decl(&absolute("B")));
    }

    #[test]
    fn debug_reports_table_sizes() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        let rendered = format!("{env:?}");
        assert!(rendered.contains("class_decls: 1"));
        assert!(rendered.contains("declarations: 1"));
    }

    #[test]
    fn clone_shares_declarations() {
        let mut env = Environment::new();
        env.insert(class("A")).unwrap();
        let copy = env.clone();
        assert!(copy.declarations()[0].ptr_eq(&env.declarations()[0]));
    }
}
