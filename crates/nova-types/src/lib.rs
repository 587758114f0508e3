//! Java type model and inference engine for Nova.
//!
//! The crate is organized in layers:
//!
//! - the data model ([`Type`], [`ClassDef`], ...) and the [`TypeEnv`] lookup trait (this module);
//! - [`TypeStore`], the owned class / type-parameter table (plus a minimal JDK model);
//! - subtyping, assignability, substitution, `lub`/`glb`;
//! - capture conversion through [`TyContext`];
//! - overload resolution ([`resolve_method_call`]) and generic method inference
//!   ([`InferenceContext`]).
//!
//! Expression-level typing (lambdas, nested poly calls, `var`) lives in `nova-typeck`, which drives
//! the type-level APIs exposed here.

use std::fmt;

use serde::{Deserialize, Serialize};

mod infer;
pub mod java;
mod lub;
mod minimal_jdk;
mod signature;
mod store;
mod subst;
mod subtyping;

pub use infer::{InferenceContext, InferenceError, OpenedMember, DEFAULT_INFERENCE_STEP_LIMIT};
pub use java::env::{capture_conversion, CaptureEnv, TyContext};
pub use java::format::{format_method_signature, format_type};
pub use java::helpers::{
    instantiate_as_supertype, instantiate_supertype, non_wildcard_parameterization,
    sam_signature, supertype_closure, upward_projection, SamSignature,
};
pub use java::overload::{
    expand_params, resolve_constructor, resolve_constructor_call, resolve_field,
    resolve_method_call, AmbiguousMethods, CandidateSummary, ConstructorCall, InvocationPhase,
    MemberRef, MethodNotFound, MethodResolution, ResolvedMethod,
};
pub use lub::{glb, lub, lub_all, make_intersection};
pub use signature::{SignatureError, SignatureScope};
pub use store::{ClassBuilder, TypeStore};
pub use subst::{class_type_subst, erasure, is_reifiable, substitute};
pub use subtyping::{
    boxed_class, is_assignable, is_loose_compatible, is_same_type, is_strict_compatible,
    is_subtype, unboxed_primitive,
};

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(u32);

impl ClassId {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn to_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

/// A type variable: a declared type parameter or a capture variable.
///
/// Ids are unique for the lifetime of a [`TypeStore`] (or of a [`TyContext`] for context-local
/// capture variables), so substitution never has to rename.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeVarId(pub u32);

impl fmt::Debug for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.context_local_index() {
            Some(idx) => write!(f, "TypeVarId(local {idx})"),
            None => write!(f, "TypeVarId({})", self.0),
        }
    }
}

/// An inference variable, owned by one [`InferenceContext`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InferVarId(u32);

impl InferVarId {
    pub(crate) fn from_idx(idx: usize) -> Self {
        Self(idx as u32)
    }

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for InferVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InferVarId({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 8] = [
        PrimitiveType::Boolean,
        PrimitiveType::Byte,
        PrimitiveType::Short,
        PrimitiveType::Char,
        PrimitiveType::Int,
        PrimitiveType::Long,
        PrimitiveType::Float,
        PrimitiveType::Double,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Short => "short",
            PrimitiveType::Char => "char",
            PrimitiveType::Int => "int",
            PrimitiveType::Long => "long",
            PrimitiveType::Float => "float",
            PrimitiveType::Double => "double",
        }
    }

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.keyword() == keyword)
    }

    /// Binary name of the wrapper class.
    pub fn box_class_name(self) -> &'static str {
        match self {
            PrimitiveType::Boolean => "java.lang.Boolean",
            PrimitiveType::Byte => "java.lang.Byte",
            PrimitiveType::Short => "java.lang.Short",
            PrimitiveType::Char => "java.lang.Character",
            PrimitiveType::Int => "java.lang.Integer",
            PrimitiveType::Long => "java.lang.Long",
            PrimitiveType::Float => "java.lang.Float",
            PrimitiveType::Double => "java.lang.Double",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, PrimitiveType::Boolean)
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveType::Byte
                | PrimitiveType::Short
                | PrimitiveType::Char
                | PrimitiveType::Int
                | PrimitiveType::Long
        )
    }

    /// Primitive widening (JLS 5.1.2), including identity. This is also the subtype relation
    /// between primitive types.
    pub fn widens_to(self, target: PrimitiveType) -> bool {
        use PrimitiveType::*;
        if self == target {
            return true;
        }
        match self {
            Byte => matches!(target, Short | Int | Long | Float | Double),
            Short => matches!(target, Int | Long | Float | Double),
            Char => matches!(target, Int | Long | Float | Double),
            Int => matches!(target, Long | Float | Double),
            Long => matches!(target, Float | Double),
            Float => matches!(target, Double),
            Double | Boolean => false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WildcardBound {
    Unbounded,
    Extends(Box<Type>),
    Super(Box<Type>),
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
    /// Type of the enclosing instance for inner (non-static member) classes.
    pub outer: Option<Box<Type>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(Box<Type>),
    TypeVar(TypeVarId),
    Wildcard(WildcardBound),
    Intersection(Vec<Type>),
    /// Inference variable of an ongoing [`InferenceContext`].
    Infer(InferVarId),
    Null,
    /// A type spelled in source that has not been resolved to a class yet.
    Named(String),
    Unknown,
    Error,
}

impl Type {
    pub fn class(def: ClassId, args: Vec<Type>) -> Type {
        Type::Class(ClassType {
            def,
            args,
            outer: None,
        })
    }

    /// A member type of an inner class, qualified by the type of its enclosing instance.
    pub fn inner_class(outer: Type, def: ClassId, args: Vec<Type>) -> Type {
        Type::Class(ClassType {
            def,
            args,
            outer: Some(Box::new(outer)),
        })
    }

    pub fn array(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }

    pub fn int() -> Type {
        Type::Primitive(PrimitiveType::Int)
    }

    pub fn boolean() -> Type {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn extends(bound: Type) -> Type {
        Type::Wildcard(WildcardBound::Extends(Box::new(bound)))
    }

    pub fn super_of(bound: Type) -> Type {
        Type::Wildcard(WildcardBound::Super(Box::new(bound)))
    }

    pub fn unbounded() -> Type {
        Type::Wildcard(WildcardBound::Unbounded)
    }

    pub fn is_errorish(&self) -> bool {
        matches!(self, Type::Unknown | Type::Error)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Class(_)
                | Type::Array(_)
                | Type::TypeVar(_)
                | Type::Intersection(_)
                | Type::Null
                | Type::Named(_)
                | Type::Infer(_)
        )
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Type::Wildcard(_))
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(ct) => Some(ct),
            _ => None,
        }
    }

    /// `true` when the type mentions no inference variable.
    pub fn is_proper(&self) -> bool {
        !self.any(&mut |t| matches!(t, Type::Infer(_)))
    }

    pub fn mentions_type_var(&self, id: TypeVarId) -> bool {
        self.any(&mut |t| matches!(t, Type::TypeVar(v) if *v == id))
    }

    /// Appends every inference variable mentioned by `self` to `out` (deduplicated).
    pub fn collect_infer_vars(&self, out: &mut Vec<InferVarId>) {
        self.any(&mut |t| {
            if let Type::Infer(v) = t {
                if !out.contains(v) {
                    out.push(*v);
                }
            }
            false
        });
    }

    pub fn infer_vars(&self) -> Vec<InferVarId> {
        let mut out = Vec::new();
        self.collect_infer_vars(&mut out);
        out
    }

    /// Pre-order search over the type tree.
    pub(crate) fn any(&self, pred: &mut dyn FnMut(&Type) -> bool) -> bool {
        if pred(self) {
            return true;
        }
        match self {
            Type::Class(ct) => {
                ct.args.iter().any(|a| a.any(pred))
                    || ct.outer.as_deref().is_some_and(|o| o.any(pred))
            }
            Type::Array(elem) => elem.any(pred),
            Type::Wildcard(WildcardBound::Extends(b) | WildcardBound::Super(b)) => b.any(pred),
            Type::Intersection(parts) => parts.iter().any(|p| p.any(pred)),
            _ => false,
        }
    }

    /// Structural map over the type tree; `f` is tried first at every node.
    pub(crate) fn map(&self, f: &mut dyn FnMut(&Type) -> Option<Type>) -> Type {
        if let Some(ty) = f(self) {
            return ty;
        }
        match self {
            Type::Class(ct) => Type::Class(ClassType {
                def: ct.def,
                args: ct.args.iter().map(|a| a.map(f)).collect(),
                outer: ct.outer.as_deref().map(|o| Box::new(o.map(f))),
            }),
            Type::Array(elem) => Type::Array(Box::new(elem.map(f))),
            Type::Wildcard(WildcardBound::Extends(b)) => {
                Type::Wildcard(WildcardBound::Extends(Box::new(b.map(f))))
            }
            Type::Wildcard(WildcardBound::Super(b)) => {
                Type::Wildcard(WildcardBound::Super(Box::new(b.map(f))))
            }
            Type::Intersection(parts) => Type::Intersection(parts.iter().map(|p| p.map(f)).collect()),
            other => other.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassKind {
    Class,
    Interface,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeParamDef {
    pub name: String,
    pub upper_bounds: Vec<Type>,
    /// Only capture variables of `? super` wildcards have a lower bound.
    pub lower_bound: Option<Type>,
}

impl TypeParamDef {
    pub fn new(name: impl Into<String>, upper_bounds: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            upper_bounds,
            lower_bound: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
    pub is_final: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstructorDef {
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub is_varargs: bool,
    pub is_accessible: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodDef {
    pub name: String,
    pub type_params: Vec<TypeVarId>,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_varargs: bool,
    pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    /// Binary name, e.g. `java.util.Map$Entry`.
    pub name: String,
    pub kind: ClassKind,
    /// Enclosing class of an inner (non-static member) class.
    pub outer: Option<ClassId>,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub fields: Vec<FieldDef>,
    pub constructors: Vec<ConstructorDef>,
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    /// Simple source name: `java.util.Map$Entry` becomes `Entry`.
    pub fn simple_name(&self) -> &str {
        let tail = self.name.rsplit('.').next().unwrap_or(&self.name);
        tail.rsplit('$').next().unwrap_or(tail)
    }
}

/// Classes that the algorithms in this crate need to refer to directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
    pub number: ClassId,
    pub comparable: ClassId,
    pub char_sequence: ClassId,
    pub iterable: ClassId,
    pub boolean: ClassId,
    pub byte: ClassId,
    pub short: ClassId,
    pub character: ClassId,
    pub integer: ClassId,
    pub long: ClassId,
    pub float: ClassId,
    pub double: ClassId,
}

impl WellKnownTypes {
    pub fn boxed(&self, prim: PrimitiveType) -> ClassId {
        match prim {
            PrimitiveType::Boolean => self.boolean,
            PrimitiveType::Byte => self.byte,
            PrimitiveType::Short => self.short,
            PrimitiveType::Char => self.character,
            PrimitiveType::Int => self.integer,
            PrimitiveType::Long => self.long,
            PrimitiveType::Float => self.float,
            PrimitiveType::Double => self.double,
        }
    }

    pub fn unboxed(&self, class: ClassId) -> Option<PrimitiveType> {
        PrimitiveType::ALL
            .into_iter()
            .find(|p| self.boxed(*p) == class)
    }
}

/// Read access to class and type-parameter definitions.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    /// Looks up a class by binary name. Simple names of `java.lang` classes are accepted too.
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Instance,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UncheckedReason {
    /// Variable-arity invocation whose component type is not reifiable.
    UncheckedVarargs,
    /// A raw type converted to a parameterization.
    RawConversion,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeWarning {
    Unchecked(UncheckedReason),
}

/// A method invocation at the type level: argument expressions are already typed.
///
/// Arguments typed [`Type::Unknown`] are treated as not pertinent to applicability (implicitly
/// typed lambdas, method references, poly expressions still waiting for a target).
#[derive(Clone, Debug, PartialEq)]
pub struct MethodCall<'a> {
    pub receiver: Type,
    pub call_kind: CallKind,
    pub name: &'a str,
    pub args: Vec<Type>,
    pub expected_return: Option<Type>,
    pub explicit_type_args: Vec<Type>,
}

/// Canonicalizes [`Type::Named`] to a class type when the name resolves.
pub(crate) fn canonicalize_named(env: &dyn TypeEnv, ty: &Type) -> Type {
    match ty {
        Type::Named(name) => match env.lookup_class(name) {
            Some(id) => Type::class(id, vec![]),
            None => ty.clone(),
        },
        _ => ty.clone(),
    }
}
