//! Type expressions.
//!
//! The environment never interprets these semantically; it only needs to
//! walk them, rewrite the type names they embed, and compare them
//! structurally. The two folds at the bottom ([`Type::map_type_name`] and
//! [`Type::rename_variables`]) are the whole interface the resolution pass
//! and the type-parameter compatibility check build on.

use fxhash::FxHashMap;

use crate::name::TypeName;

/// Built-in base types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseType {
    Bool,
    Void,
    Untyped,
    Nil,
    Top,
    Bottom,
    SelfType,
    Instance,
    Class,
}

/// Literal types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Int(i64),
    Bool(bool),
    String(String),
    Symbol(String),
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Base(BaseType),
    /// A type variable bound by an enclosing type-parameter list.
    Variable(String),
    /// An application of a class or module name: `Array[Integer]`.
    ClassInstance { name: TypeName, args: Vec<Type> },
    /// The singleton of a class or module: `singleton(Array)`.
    ClassSingleton { name: TypeName },
    /// An interface reference: `_Each[String]`.
    Interface { name: TypeName, args: Vec<Type> },
    /// A type-alias reference.
    Alias { name: TypeName, args: Vec<Type> },
    Union(Vec<Type>),
    Intersection(Vec<Type>),
    Optional(Box<Type>),
    Tuple(Vec<Type>),
    Record(Vec<(String, Type)>),
    Literal(Literal),
    Proc(Box<Function>),
}

impl Type {
    /// Rebuilds the type with every embedded [`TypeName`] passed through
    /// `f`. Names occur in class-instance, class-singleton, interface, and
    /// alias positions; everything else is structural.
    pub fn map_type_name(&self, f: &mut dyn FnMut(&TypeName) -> TypeName) -> Type {
        match self {
            Type::Base(base) => Type::Base(*base),
            Type::Variable(name) => Type::Variable(name.clone()),
            Type::ClassInstance { name, args } => Type::ClassInstance {
                name: f(name),
                args: args.iter().map(|t| t.map_type_name(f)).collect(),
            },
            Type::ClassSingleton { name } => Type::ClassSingleton { name: f(name) },
            Type::Interface { name, args } => Type::Interface {
                name: f(name),
                args: args.iter().map(|t| t.map_type_name(f)).collect(),
            },
            Type::Alias { name, args } => Type::Alias {
                name: f(name),
                args: args.iter().map(|t| t.map_type_name(f)).collect(),
            },
            Type::Union(types) => Type::Union(types.iter().map(|t| t.map_type_name(f)).collect()),
            Type::Intersection(types) => {
                Type::Intersection(types.iter().map(|t| t.map_type_name(f)).collect())
            }
            Type::Optional(inner) => Type::Optional(Box::new(inner.map_type_name(f))),
            Type::Tuple(types) => Type::Tuple(types.iter().map(|t| t.map_type_name(f)).collect()),
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(key, t)| (key.clone(), t.map_type_name(f)))
                    .collect(),
            ),
            Type::Literal(lit) => Type::Literal(lit.clone()),
            Type::Proc(func) => Type::Proc(Box::new(func.map_type(&mut |t| t.map_type_name(f)))),
        }
    }

    /// Rebuilds the type with every type variable renamed through `mapping`.
    /// Variables absent from the mapping are kept.
    pub fn rename_variables(&self, mapping: &FxHashMap<String, String>) -> Type {
        match self {
            Type::Variable(name) => match mapping.get(name) {
                Some(renamed) => Type::Variable(renamed.clone()),
                None => Type::Variable(name.clone()),
            },
            Type::Base(base) => Type::Base(*base),
            Type::ClassInstance { name, args } => Type::ClassInstance {
                name: name.clone(),
                args: args.iter().map(|t| t.rename_variables(mapping)).collect(),
            },
            Type::ClassSingleton { name } => Type::ClassSingleton { name: name.clone() },
            Type::Interface { name, args } => Type::Interface {
                name: name.clone(),
                args: args.iter().map(|t| t.rename_variables(mapping)).collect(),
            },
            Type::Alias { name, args } => Type::Alias {
                name: name.clone(),
                args: args.iter().map(|t| t.rename_variables(mapping)).collect(),
            },
            Type::Union(types) => {
                Type::Union(types.iter().map(|t| t.rename_variables(mapping)).collect())
            }
            Type::Intersection(types) => {
                Type::Intersection(types.iter().map(|t| t.rename_variables(mapping)).collect())
            }
            Type::Optional(inner) => Type::Optional(Box::new(inner.rename_variables(mapping))),
            Type::Tuple(types) => {
                Type::Tuple(types.iter().map(|t| t.rename_variables(mapping)).collect())
            }
            Type::Record(fields) => Type::Record(
                fields
                    .iter()
                    .map(|(key, t)| (key.clone(), t.rename_variables(mapping)))
                    .collect(),
            ),
            Type::Literal(lit) => Type::Literal(lit.clone()),
            Type::Proc(func) => {
                Type::Proc(Box::new(func.map_type(&mut |t| t.rename_variables(mapping))))
            }
        }
    }
}

/// A parameter-and-return shape shared by methods, procs, and blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub required_positionals: Vec<Type>,
    pub optional_positionals: Vec<Type>,
    pub rest_positional: Option<Box<Type>>,
    pub required_keywords: Vec<(String, Type)>,
    pub optional_keywords: Vec<(String, Type)>,
    pub return_type: Box<Type>,
}

impl Function {
    /// A function with no parameters and the given return type.
    pub fn returning(return_type: Type) -> Function {
        Function {
            required_positionals: Vec::new(),
            optional_positionals: Vec::new(),
            rest_positional: None,
            required_keywords: Vec::new(),
            optional_keywords: Vec::new(),
            return_type: Box::new(return_type),
        }
    }

    /// Rebuilds the function with every contained type passed through `f`.
    pub fn map_type(&self, f: &mut dyn FnMut(&Type) -> Type) -> Function {
        Function {
            required_positionals: self.required_positionals.iter().map(|t| f(t)).collect(),
            optional_positionals: self.optional_positionals.iter().map(|t| f(t)).collect(),
            rest_positional: self.rest_positional.as_ref().map(|t| Box::new(f(t))),
            required_keywords: self
                .required_keywords
                .iter()
                .map(|(key, t)| (key.clone(), f(t)))
                .collect(),
            optional_keywords: self
                .optional_keywords
                .iter()
                .map(|(key, t)| (key.clone(), f(t)))
                .collect(),
            return_type: Box::new(f(&self.return_type)),
        }
    }
}

/// A block attached to a method type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub func: Function,
    pub required: bool,
}

/// One overload of a method: its own type parameters, a function shape, and
/// an optional block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodType {
    pub type_params: Vec<TypeParam>,
    pub func: Function,
    pub block: Option<Block>,
}

/// Declaration-site variance of a type parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variance {
    Invariant,
    Covariant,
    Contravariant,
}

/// A type parameter with its variance and optional upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub variance: Variance,
    pub upper_bound: Option<Type>,
}

impl TypeParam {
    pub fn invariant(name: impl Into<String>) -> TypeParam {
        TypeParam { name: name.into(), variance: Variance::Invariant, upper_bound: None }
    }
}
