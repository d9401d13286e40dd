//! The whole-environment pass that rewrites relative type names to their
//! absolute form.
//!
//! The pass is a pure fold over every declaration: it threads the outer
//! nesting, the accumulated namespace prefix, and the lexical [`Context`]
//! through the AST, asking an injected [`NameResolver`] for the absolute
//! form of every type name it encounters. Lookup failures are not errors
//! here — the original name is kept so downstream diagnostics can point at
//! it.

use std::sync::Arc;

use tracing::debug;

use sable_syntax::decl::{
    AliasDecl, AttrDef, ClassDecl, ConstantDecl, ContainerDecl, Decl, GlobalDecl, InterfaceDecl,
    Member, MethodDef, ModuleDecl, TypeAliasDecl, TypeApp, VarDef,
};
use sable_syntax::name::{Namespace, TypeName};
use sable_syntax::ty::{Block, Function, MethodType, Type, TypeParam};

use crate::context::{calculate_context, Context};
use crate::environment::Environment;
use crate::Result;

/// External name lookup. Given a (possibly relative) type name and the
/// lexical context of its occurrence, returns the absolute name it denotes,
/// or `None` when lookup fails.
pub trait NameResolver {
    fn resolve(&mut self, name: &TypeName, context: &Context) -> Option<TypeName>;
}

impl Environment {
    /// Produces a new environment whose declarations are structurally
    /// identical to this one's, with every type-name occurrence rewritten
    /// to its absolute form through `resolver`.
    ///
    /// When `only` is given, declarations outside it (compared by node
    /// identity) are carried over unchanged. The source environment is
    /// never mutated.
    pub fn resolve_type_names(
        &self,
        resolver: &mut dyn NameResolver,
        only: Option<&[Decl]>,
    ) -> Result<Environment> {
        debug!(declarations = self.declarations().len(), "resolving type names");
        let mut pass = ResolutionPass { resolver };
        let mut env = Environment::new();
        for decl in self.declarations() {
            let skip = only.is_some_and(|set| !set.iter().any(|candidate| candidate.ptr_eq(decl)));
            let resolved = if skip {
                decl.clone()
            } else {
                pass.resolve_decl(decl, &[], &Namespace::root())
            };
            env.insert(resolved)?;
        }
        Ok(env)
    }
}

struct ResolutionPass<'a> {
    resolver: &'a mut dyn NameResolver,
}

impl ResolutionPass<'_> {
    fn resolve_decl(&mut self, decl: &Decl, outer: &[ContainerDecl], prefix: &Namespace) -> Decl {
        match decl {
            Decl::Class(class) => Decl::Class(Arc::new(self.resolve_class(class, outer, prefix))),
            Decl::Module(module) => {
                Decl::Module(Arc::new(self.resolve_module(module, outer, prefix)))
            }
            Decl::Interface(interface) => {
                Decl::Interface(Arc::new(self.resolve_interface(interface, outer, prefix)))
            }
            Decl::TypeAlias(alias) => {
                Decl::TypeAlias(Arc::new(self.resolve_type_alias(alias, outer, prefix)))
            }
            Decl::Constant(constant) => {
                Decl::Constant(Arc::new(self.resolve_constant(constant, outer, prefix)))
            }
            Decl::Global(global) => Decl::Global(Arc::new(self.resolve_global(global))),
            Decl::ClassAlias(alias) => {
                Decl::ClassAlias(Arc::new(self.resolve_alias(alias, outer, prefix)))
            }
            Decl::ModuleAlias(alias) => {
                Decl::ModuleAlias(Arc::new(self.resolve_alias(alias, outer, prefix)))
            }
        }
    }

    fn resolve_class(
        &mut self,
        decl: &Arc<ClassDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> ClassDecl {
        let outer_context = calculate_context(outer);
        let name = decl.name.with_prefix(prefix);
        let inner_context = outer_context.append(name.clone());

        let mut inner_outer = outer.to_vec();
        inner_outer.push(ContainerDecl::Class(decl.clone()));
        let inner_prefix = name.to_namespace();

        ClassDecl {
            name,
            type_params: self.resolve_type_params(&decl.type_params, &inner_context),
            // The superclass reference cannot see the class itself.
            superclass: decl
                .superclass
                .as_ref()
                .map(|superclass| self.resolve_type_app(superclass, &outer_context)),
            members: decl
                .members
                .iter()
                .map(|member| {
                    self.resolve_member(member, &inner_context, &inner_outer, &inner_prefix)
                })
                .collect(),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
            annotations: decl.annotations.clone(),
        }
    }

    fn resolve_module(
        &mut self,
        decl: &Arc<ModuleDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> ModuleDecl {
        let outer_context = calculate_context(outer);
        let name = decl.name.with_prefix(prefix);
        let inner_context = outer_context.append(name.clone());

        let mut inner_outer = outer.to_vec();
        inner_outer.push(ContainerDecl::Module(decl.clone()));
        let inner_prefix = name.to_namespace();

        ModuleDecl {
            name,
            type_params: self.resolve_type_params(&decl.type_params, &inner_context),
            self_types: decl
                .self_types
                .iter()
                .map(|self_type| self.resolve_type_app(self_type, &inner_context))
                .collect(),
            members: decl
                .members
                .iter()
                .map(|member| {
                    self.resolve_member(member, &inner_context, &inner_outer, &inner_prefix)
                })
                .collect(),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
            annotations: decl.annotations.clone(),
        }
    }

    fn resolve_interface(
        &mut self,
        decl: &Arc<InterfaceDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> InterfaceDecl {
        let context = calculate_context(outer);
        InterfaceDecl {
            name: decl.name.with_prefix(prefix),
            type_params: self.resolve_type_params(&decl.type_params, &context),
            members: decl
                .members
                .iter()
                .map(|member| match member {
                    // Interfaces never nest declarations; anything that
                    // slipped through is carried over untouched.
                    Member::Decl(_) => member.clone(),
                    other => self.resolve_member(other, &context, outer, prefix),
                })
                .collect(),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
            annotations: decl.annotations.clone(),
        }
    }

    fn resolve_type_alias(
        &mut self,
        decl: &Arc<TypeAliasDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> TypeAliasDecl {
        let context = calculate_context(outer);
        TypeAliasDecl {
            name: decl.name.with_prefix(prefix),
            type_params: self.resolve_type_params(&decl.type_params, &context),
            ty: self.absolute_type(&decl.ty, &context),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
            annotations: decl.annotations.clone(),
        }
    }

    fn resolve_constant(
        &mut self,
        decl: &Arc<ConstantDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> ConstantDecl {
        let context = calculate_context(outer);
        ConstantDecl {
            name: decl.name.with_prefix(prefix),
            ty: self.absolute_type(&decl.ty, &context),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
        }
    }

    fn resolve_global(&mut self, decl: &Arc<GlobalDecl>) -> GlobalDecl {
        // Globals have no lexical context.
        GlobalDecl {
            name: decl.name.clone(),
            ty: self.absolute_type(&decl.ty, &Context::Root),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
        }
    }

    fn resolve_alias(
        &mut self,
        decl: &Arc<AliasDecl>,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> AliasDecl {
        let context = calculate_context(outer);
        AliasDecl {
            new_name: decl.new_name.with_prefix(prefix),
            old_name: self.absolute_type_name(&decl.old_name, &context),
            location: decl.location.clone(),
            comment: decl.comment.clone(),
        }
    }

    fn resolve_member(
        &mut self,
        member: &Member,
        context: &Context,
        outer: &[ContainerDecl],
        prefix: &Namespace,
    ) -> Member {
        match member {
            Member::Method(def) => Member::Method(MethodDef {
                name: def.name.clone(),
                kind: def.kind,
                overloads: def
                    .overloads
                    .iter()
                    .map(|overload| self.resolve_method_type(overload, context))
                    .collect(),
                location: def.location.clone(),
                comment: def.comment.clone(),
            }),
            Member::AttrReader(attr) => Member::AttrReader(self.resolve_attr(attr, context)),
            Member::AttrWriter(attr) => Member::AttrWriter(self.resolve_attr(attr, context)),
            Member::AttrAccessor(attr) => Member::AttrAccessor(self.resolve_attr(attr, context)),
            Member::InstanceVariable(var) => {
                Member::InstanceVariable(self.resolve_var(var, context))
            }
            Member::ClassVariable(var) => Member::ClassVariable(self.resolve_var(var, context)),
            Member::ClassInstanceVariable(var) => {
                Member::ClassInstanceVariable(self.resolve_var(var, context))
            }
            Member::Include(mixin) => Member::Include(self.resolve_type_app(mixin, context)),
            Member::Extend(mixin) => Member::Extend(self.resolve_type_app(mixin, context)),
            Member::Prepend(mixin) => Member::Prepend(self.resolve_type_app(mixin, context)),
            Member::Decl(nested) => Member::Decl(self.resolve_decl(nested, outer, prefix)),
        }
    }

    fn resolve_attr(&mut self, attr: &AttrDef, context: &Context) -> AttrDef {
        AttrDef {
            name: attr.name.clone(),
            ty: self.absolute_type(&attr.ty, context),
            location: attr.location.clone(),
            comment: attr.comment.clone(),
        }
    }

    fn resolve_var(&mut self, var: &VarDef, context: &Context) -> VarDef {
        VarDef {
            name: var.name.clone(),
            ty: self.absolute_type(&var.ty, context),
            location: var.location.clone(),
        }
    }

    fn resolve_method_type(&mut self, method_type: &MethodType, context: &Context) -> MethodType {
        MethodType {
            type_params: self.resolve_type_params(&method_type.type_params, context),
            func: self.resolve_function(&method_type.func, context),
            block: method_type.block.as_ref().map(|block| Block {
                func: self.resolve_function(&block.func, context),
                required: block.required,
            }),
        }
    }

    fn resolve_function(&mut self, func: &Function, context: &Context) -> Function {
        func.map_type(&mut |ty| self.absolute_type(ty, context))
    }

    fn resolve_type_params(&mut self, params: &[TypeParam], context: &Context) -> Vec<TypeParam> {
        params
            .iter()
            .map(|param| TypeParam {
                name: param.name.clone(),
                variance: param.variance,
                upper_bound: param
                    .upper_bound
                    .as_ref()
                    .map(|bound| self.absolute_type(bound, context)),
            })
            .collect()
    }

    fn resolve_type_app(&mut self, app: &TypeApp, context: &Context) -> TypeApp {
        TypeApp {
            name: self.absolute_type_name(&app.name, context),
            args: app.args.iter().map(|arg| self.absolute_type(arg, context)).collect(),
        }
    }

    fn absolute_type(&mut self, ty: &Type, context: &Context) -> Type {
        ty.map_type_name(&mut |name| self.absolute_type_name(name, context))
    }

    fn absolute_type_name(&mut self, name: &TypeName, context: &Context) -> TypeName {
        self.resolver
            .resolve(name, context)
            .unwrap_or_else(|| name.clone())
    }
}
