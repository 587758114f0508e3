use std::fmt;

use crate::java::helpers::type_var_bounds;
use crate::{
    canonicalize_named, CallKind, ClassId, ClassType, FieldDef, Type, TypeEnv, TypeParamDef,
    TypeStore, TypeVarId, WildcardBound,
};

/// A [`TypeEnv`] that can allocate capture variables.
///
/// Allocation happens in two steps so that a capture variable's bounds can mention itself (and
/// its siblings), as in `EnumLike<CAP#1 extends EnumLike<CAP#1>>`.
pub trait CaptureEnv: TypeEnv {
    fn as_type_env(&self) -> &dyn TypeEnv;
    /// Reserves a fresh `CAP#n` type variable with no bounds yet.
    fn new_capture_var(&mut self) -> TypeVarId;
    fn define_capture_var(
        &mut self,
        id: TypeVarId,
        upper_bounds: Vec<Type>,
        lower_bound: Option<Type>,
    );
}

/// Capture conversion (JLS 5.1.10).
///
/// Every wildcard argument of a parameterized class type becomes a fresh capture variable whose
/// upper bounds are the glb of the wildcard's bound and the formal parameter's declared bounds,
/// normalized and sorted. `? super` wildcards contribute a lower bound. Enclosing instance types
/// are captured too. Other types are returned unchanged.
pub fn capture_conversion<E: CaptureEnv + ?Sized>(env: &mut E, ty: &Type) -> Type {
    let ty = canonicalize_named(env.as_type_env(), ty);
    let Type::Class(ct) = &ty else {
        return ty;
    };
    let outer = ct
        .outer
        .as_deref()
        .map(|o| Box::new(capture_conversion(env, o)));
    if !ct.args.iter().any(Type::is_wildcard) {
        return Type::Class(ClassType {
            def: ct.def,
            args: ct.args.clone(),
            outer,
        });
    }
    let Some(type_params) = env.class(ct.def).map(|d| d.type_params.clone()) else {
        return ty;
    };
    if type_params.len() != ct.args.len() {
        return ty;
    }

    let caps: Vec<Option<TypeVarId>> = ct
        .args
        .iter()
        .map(|arg| arg.is_wildcard().then(|| env.new_capture_var()))
        .collect();
    let captured = ClassType {
        def: ct.def,
        args: ct
            .args
            .iter()
            .zip(&caps)
            .map(|(arg, cap)| match cap {
                Some(cap) => Type::TypeVar(*cap),
                None => arg.clone(),
            })
            .collect(),
        outer,
    };

    let subst = crate::class_type_subst(env.as_type_env(), &captured);
    let object = Type::class(env.well_known().object, vec![]);
    for ((arg, cap), tp) in ct.args.iter().zip(&caps).zip(&type_params) {
        let Some(cap) = cap else {
            continue;
        };
        let mut upper: Vec<Type> = env
            .type_param(*tp)
            .map(|d| d.upper_bounds.clone())
            .unwrap_or_default()
            .iter()
            .map(|b| crate::substitute(b, &subst))
            .collect();
        if upper.is_empty() {
            upper.push(object.clone());
        }
        let mut lower = None;
        match arg {
            Type::Wildcard(WildcardBound::Extends(bound)) => upper.push((**bound).clone()),
            Type::Wildcard(WildcardBound::Super(bound)) => lower = Some((**bound).clone()),
            _ => {}
        }
        let upper = match crate::make_intersection(env.as_type_env(), upper) {
            Type::Intersection(parts) => parts,
            single => vec![single],
        };
        env.define_capture_var(*cap, upper, lower);
    }
    Type::Class(captured)
}

/// Normalizes a receiver before member lookup: type variables are replaced by (the glb of) their
/// non-error bounds, and parameterized types are capture-converted.
pub(crate) fn normalize_receiver<E: CaptureEnv + ?Sized>(env: &mut E, ty: &Type) -> Type {
    match canonicalize_named(env.as_type_env(), ty) {
        Type::TypeVar(id) => {
            let bounds: Vec<Type> = type_var_bounds(env.as_type_env(), id)
                .into_iter()
                .filter(|b| !b.is_errorish())
                .collect();
            let bound = if bounds.is_empty() {
                Type::class(env.well_known().object, vec![])
            } else {
                crate::make_intersection(env.as_type_env(), bounds)
            };
            match bound {
                // A variable bounded by another variable.
                Type::TypeVar(inner) if inner != id => normalize_receiver(env, &bound),
                Type::TypeVar(_) => Type::class(env.well_known().object, vec![]),
                other => normalize_receiver(env, &other),
            }
        }
        Type::Intersection(parts) => Type::Intersection(
            parts
                .iter()
                .map(|p| capture_conversion(env, p))
                .collect(),
        ),
        other => capture_conversion(env, &other),
    }
}

impl CaptureEnv for TypeStore {
    fn as_type_env(&self) -> &dyn TypeEnv {
        self
    }

    fn new_capture_var(&mut self) -> TypeVarId {
        let idx = self.type_param_count();
        self.add_type_param(format!("CAP#{idx}"), vec![])
    }

    fn define_capture_var(
        &mut self,
        id: TypeVarId,
        upper_bounds: Vec<Type>,
        lower_bound: Option<Type>,
    ) {
        let name = self
            .type_param(id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| format!("CAP#{}", id.0));
        self.define_type_param(
            id,
            TypeParamDef {
                name,
                upper_bounds,
                lower_bound,
            },
        );
    }
}

/// Per-body typing context.
///
/// Capture variables allocated here are local to the context; the shared [`TypeStore`] is never
/// mutated, so one store can back many concurrent contexts.
pub struct TyContext<'env> {
    base: &'env dyn TypeEnv,
    locals: Vec<TypeParamDef>,
}

impl fmt::Debug for TyContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TyContext")
            .field("locals", &self.locals)
            .finish_non_exhaustive()
    }
}

impl<'env> TyContext<'env> {
    pub fn new(base: &'env dyn TypeEnv) -> Self {
        Self {
            base,
            locals: Vec::new(),
        }
    }

    /// Rebuilds a context from capture variables taken out of an earlier one with
    /// [`Self::into_captures`], so types recorded against it can still be rendered.
    pub fn with_captures(base: &'env dyn TypeEnv, captures: Vec<TypeParamDef>) -> Self {
        Self {
            base,
            locals: captures,
        }
    }

    pub fn captures(&self) -> &[TypeParamDef] {
        &self.locals
    }

    pub fn into_captures(self) -> Vec<TypeParamDef> {
        self.locals
    }

    /// Drops all context-local capture variables.
    pub fn reset(&mut self) {
        self.locals.clear();
    }

    pub fn base(&self) -> &'env dyn TypeEnv {
        self.base
    }

    pub fn capture_conversion(&mut self, ty: &Type) -> Type {
        capture_conversion(self, ty)
    }

    /// Resolves a field access against `receiver`, applying capture conversion first.
    pub fn resolve_field(
        &mut self,
        receiver: &Type,
        name: &str,
        call_kind: CallKind,
    ) -> Option<FieldDef> {
        let receiver = normalize_receiver(self, receiver);
        crate::resolve_field(&*self, &receiver, name, call_kind)
    }
}

impl CaptureEnv for TyContext<'_> {
    fn as_type_env(&self) -> &dyn TypeEnv {
        self
    }

    fn new_capture_var(&mut self) -> TypeVarId {
        let idx = self.locals.len();
        self.locals.push(TypeParamDef::new(format!("CAP#{}", idx + 1), vec![]));
        TypeVarId::new_context_local(idx as u32)
    }

    fn define_capture_var(
        &mut self,
        id: TypeVarId,
        upper_bounds: Vec<Type>,
        lower_bound: Option<Type>,
    ) {
        let Some(local) = id
            .context_local_index()
            .and_then(|idx| self.locals.get_mut(idx))
        else {
            return;
        };
        local.upper_bounds = upper_bounds;
        local.lower_bound = lower_bound;
    }
}

impl TypeEnv for TyContext<'_> {
    fn class(&self, id: ClassId) -> Option<&crate::ClassDef> {
        self.base.class(id)
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        if let Some(idx) = id.context_local_index() {
            return self.locals.get(idx);
        }
        self.base.type_param(id)
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.base.lookup_class(name)
    }

    fn well_known(&self) -> &crate::WellKnownTypes {
        self.base.well_known()
    }
}

impl TypeVarId {
    const CONTEXT_LOCAL_BIT: u32 = 1 << 31;

    pub(crate) fn new_context_local(index: u32) -> Self {
        Self(Self::CONTEXT_LOCAL_BIT | (index & !Self::CONTEXT_LOCAL_BIT))
    }

    pub(crate) fn context_local_index(self) -> Option<usize> {
        if (self.0 & Self::CONTEXT_LOCAL_BIT) == 0 {
            return None;
        }
        Some((self.0 & !Self::CONTEXT_LOCAL_BIT) as usize)
    }
}
