use std::collections::{HashSet, VecDeque};

use crate::lub::{intersection_component_rank, type_sort_key};
use crate::subst::{class_type_subst, is_raw};
use crate::{
    canonicalize_named, ClassId, ClassKind, ClassType, PrimitiveType, Type, TypeEnv, TypeVarId,
    WildcardBound,
};

/// Return `ty` viewed as `target` by walking the supertype graph and applying type argument
/// substitution (including the enclosing-instance chain of inner classes) along the way.
///
/// Raw types stay raw. Missing class metadata yields `None`.
///
/// Example: `ArrayList<String>` instantiated as `List` returns `List<String>`.
pub fn instantiate_as_supertype(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Type> {
    let mut seen_type_vars = HashSet::new();
    instantiate_inner(env, ty, target, &mut seen_type_vars)
}

/// Type arguments of `ty` viewed as `target`, e.g. `[String]` for `ArrayList<String>` as
/// `Iterable`. Raw views produce an empty list.
pub fn instantiate_supertype(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Vec<Type>> {
    match instantiate_as_supertype(env, ty, target)? {
        Type::Class(ct) => Some(ct.args),
        _ => None,
    }
}

fn instantiate_inner(
    env: &dyn TypeEnv,
    ty: &Type,
    target: ClassId,
    seen_type_vars: &mut HashSet<TypeVarId>,
) -> Option<Type> {
    match ty {
        Type::Array(_) => {
            let wk = env.well_known();
            if target == wk.object || target == wk.cloneable || target == wk.serializable {
                return Some(Type::class(target, vec![]));
            }
            return None;
        }
        Type::Intersection(parts) => {
            let mut sorted: Vec<&Type> = parts.iter().collect();
            sorted.sort_by_cached_key(|ty| {
                (intersection_component_rank(env, ty), type_sort_key(env, ty))
            });
            let mut out: Option<Type> = None;
            for part in sorted {
                let Some(found) = instantiate_inner(env, part, target, seen_type_vars) else {
                    continue;
                };
                out = match out {
                    None => Some(found),
                    Some(existing) => Some(merge_instantiated_supertypes(env, existing, found)?),
                };
            }
            return out;
        }
        Type::TypeVar(id) => {
            if !seen_type_vars.insert(*id) {
                return None;
            }
            let bounds = type_var_bounds(env, *id);
            let mut out: Option<Type> = None;
            for bound in &bounds {
                let Some(found) = instantiate_inner(env, bound, target, seen_type_vars) else {
                    continue;
                };
                out = match out {
                    None => Some(found),
                    Some(existing) => match merge_instantiated_supertypes(env, existing, found) {
                        Some(merged) => Some(merged),
                        None => {
                            seen_type_vars.remove(id);
                            return None;
                        }
                    },
                };
            }
            seen_type_vars.remove(id);
            return out;
        }
        _ => {}
    }

    let start = canonicalize_named(env, ty);
    if !matches!(start, Type::Class(_)) {
        return None;
    }

    let mut queue: VecDeque<Type> = VecDeque::new();
    let mut seen: HashSet<Type> = HashSet::new();
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let Type::Class(ct) = &current else {
            continue;
        };
        if !seen.insert(current.clone()) {
            continue;
        }
        if ct.def == target {
            return Some(current);
        }
        for sup in direct_supertypes(env, ct) {
            queue.push_back(sup);
        }
    }
    None
}

/// Declared bounds of a type variable in deterministic order; `Object` when none are declared.
pub(crate) fn type_var_bounds(env: &dyn TypeEnv, id: TypeVarId) -> Vec<Type> {
    let mut bounds: Vec<Type> = env
        .type_param(id)
        .map(|tp| tp.upper_bounds.clone())
        .unwrap_or_default();
    if bounds.is_empty() {
        bounds.push(Type::class(env.well_known().object, vec![]));
    }
    bounds.sort_by_cached_key(|ty| (intersection_component_rank(env, ty), type_sort_key(env, ty)));
    bounds
}

/// Direct supertypes of a class type with its instantiation applied.
pub(crate) fn direct_supertypes(env: &dyn TypeEnv, ct: &ClassType) -> Vec<Type> {
    let Some(class_def) = env.class(ct.def) else {
        return Vec::new();
    };
    let mut out = Vec::new();

    if is_raw(env, ct) {
        if let Some(sc) = &class_def.super_class {
            out.extend(raw_class_type(env, sc));
        }
        let mut ifaces: Vec<Type> = class_def
            .interfaces
            .iter()
            .filter_map(|iface| raw_class_type(env, iface))
            .collect();
        ifaces.sort_by_cached_key(|ty| type_sort_key(env, ty));
        out.extend(ifaces);
    } else {
        let subst = class_type_subst(env, ct);
        if let Some(sc) = &class_def.super_class {
            out.push(canonicalize_named(env, &crate::substitute(sc, &subst)));
        }
        let mut ifaces: Vec<Type> = class_def
            .interfaces
            .iter()
            .map(|iface| canonicalize_named(env, &crate::substitute(iface, &subst)))
            .collect();
        ifaces.sort_by_cached_key(|ty| type_sort_key(env, ty));
        out.extend(ifaces);
    }

    // Every interface implicitly has `Object` as a supertype (JLS 4.10.2).
    if class_def.kind == ClassKind::Interface {
        out.push(Type::class(env.well_known().object, vec![]));
    }
    out
}

/// All supertypes of `ty` in breadth-first order, each instantiated. A class type comes first.
///
/// Type variables and intersections contribute the closures of their bounds / components;
/// arrays contribute `Object`, `Cloneable` and `Serializable`.
pub fn supertype_closure(env: &dyn TypeEnv, ty: &Type) -> Vec<Type> {
    let mut out: Vec<Type> = Vec::new();
    let mut queue: VecDeque<Type> = VecDeque::new();
    let mut seen_vars = HashSet::new();

    let mut push_roots = |ty: &Type, queue: &mut VecDeque<Type>| {
        let mut stack = vec![canonicalize_named(env, ty)];
        while let Some(ty) = stack.pop() {
            match ty {
                Type::TypeVar(id) => {
                    if seen_vars.insert(id) {
                        stack.extend(type_var_bounds(env, id).into_iter().rev());
                    }
                }
                Type::Intersection(mut parts) => {
                    parts.sort_by_cached_key(|ty| {
                        (intersection_component_rank(env, ty), type_sort_key(env, ty))
                    });
                    stack.extend(parts.into_iter().rev());
                }
                Type::Array(_) => {
                    let wk = env.well_known();
                    queue.push_back(Type::class(wk.object, vec![]));
                    queue.push_back(Type::class(wk.cloneable, vec![]));
                    queue.push_back(Type::class(wk.serializable, vec![]));
                }
                other => queue.push_back(other),
            }
        }
    };
    push_roots(ty, &mut queue);

    let mut seen: HashSet<Type> = HashSet::new();
    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Type::Class(ct) = &current {
            for sup in direct_supertypes(env, ct) {
                queue.push_back(sup);
            }
        }
        out.push(current);
    }
    out
}

fn merge_instantiated_supertypes(env: &dyn TypeEnv, a: Type, b: Type) -> Option<Type> {
    if a == b {
        return Some(a);
    }

    let a_score = placeholder_score(&a);
    let b_score = placeholder_score(&b);
    if a_score != b_score {
        return Some(if a_score < b_score { a } else { b });
    }

    match (crate::is_subtype(env, &a, &b), crate::is_subtype(env, &b, &a)) {
        (true, _) => Some(a),
        (false, true) => Some(b),
        (false, false) => None,
    }
}

fn placeholder_score(ty: &Type) -> usize {
    match ty {
        Type::Unknown | Type::Error => 1,
        Type::Array(elem) => placeholder_score(elem),
        Type::Class(ClassType { args, .. }) => args.iter().map(placeholder_score).sum(),
        Type::Wildcard(WildcardBound::Extends(upper) | WildcardBound::Super(upper)) => {
            placeholder_score(upper)
        }
        Type::Intersection(parts) => parts.iter().map(placeholder_score).sum(),
        _ => 0,
    }
}

fn raw_class_type(env: &dyn TypeEnv, ty: &Type) -> Option<Type> {
    match canonicalize_named(env, ty) {
        Type::Class(ClassType { def, .. }) => Some(Type::class(def, vec![])),
        _ => None,
    }
}

/// The function type of a functional interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamSignature {
    pub name: String,
    /// The interface declaring the abstract method, instantiated.
    pub declaring_type: Type,
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// Extraction of a functional interface's single-abstract-method (SAM) signature.
///
/// Applies type argument substitution so `Function<String, Integer>` yields `(String) -> Integer`.
/// Returns `None` if `ty` is not a functional interface.
pub fn sam_signature(env: &dyn TypeEnv, ty: &Type) -> Option<SamSignature> {
    let mut seen_type_vars = HashSet::new();
    sam_inner(env, ty, &mut seen_type_vars)
}

fn sam_inner(
    env: &dyn TypeEnv,
    ty: &Type,
    seen_type_vars: &mut HashSet<TypeVarId>,
) -> Option<SamSignature> {
    match ty {
        Type::TypeVar(id) => {
            if !seen_type_vars.insert(*id) {
                return None;
            }
            let mut sig: Option<SamSignature> = None;
            let mut conflict = false;
            for bound in type_var_bounds(env, *id) {
                let Some(bound_sig) = sam_inner(env, &bound, seen_type_vars) else {
                    continue;
                };
                match &sig {
                    None => sig = Some(bound_sig),
                    Some(existing) if existing.params == bound_sig.params => {}
                    Some(_) => conflict = true,
                }
            }
            seen_type_vars.remove(id);
            return if conflict { None } else { sig };
        }
        Type::Intersection(parts) => {
            let mut sig: Option<SamSignature> = None;
            for part in parts {
                let Some(part_sig) = sam_inner(env, part, seen_type_vars) else {
                    continue;
                };
                match &sig {
                    None => sig = Some(part_sig),
                    Some(existing) if existing.params == part_sig.params => {}
                    Some(_) => return None,
                }
            }
            return sig;
        }
        _ => {}
    }

    let ty = canonicalize_named(env, ty);
    let Type::Class(root) = &ty else {
        return None;
    };
    if env.class(root.def)?.kind != ClassKind::Interface {
        return None;
    }

    // (name, params) -> (return type, declaring type), in discovery order.
    let mut candidates: Vec<((String, Vec<Type>), (Type, Type))> = Vec::new();
    for current in supertype_closure(env, &ty) {
        let Type::Class(ct) = &current else {
            continue;
        };
        let Some(class_def) = env.class(ct.def) else {
            continue;
        };
        if class_def.kind != ClassKind::Interface {
            continue;
        }
        let subst = class_type_subst(env, ct);
        for m in &class_def.methods {
            if m.is_static || !m.is_abstract {
                continue;
            }
            let params: Vec<Type> = m.params.iter().map(|p| crate::substitute(p, &subst)).collect();
            let return_type = crate::substitute(&m.return_type, &subst);
            if is_object_method(env, &m.name, &params, &return_type) {
                continue;
            }
            let key = (m.name.clone(), params);
            match candidates.iter_mut().find(|(k, _)| *k == key) {
                Some((_, (existing, _))) => {
                    *existing = merge_return_types(env, existing.clone(), return_type)?;
                }
                None => candidates.push((key, (return_type, current.clone()))),
            }
        }
    }

    // A default method in a subinterface may implement an abstract one of a superinterface.
    let defaults: Vec<(String, usize)> = supertype_closure(env, &ty)
        .iter()
        .filter_map(|t| t.as_class())
        .filter_map(|ct| env.class(ct.def))
        .flat_map(|def| {
            def.methods
                .iter()
                .filter(|m| !m.is_abstract && !m.is_static)
                .map(|m| (m.name.clone(), m.params.len()))
        })
        .collect();
    if candidates.len() > 1 {
        candidates.retain(|((name, params), _)| !defaults.contains(&(name.clone(), params.len())));
    }

    if candidates.len() != 1 {
        return None;
    }
    let ((name, params), (return_type, declaring_type)) = candidates.pop()?;
    Some(SamSignature {
        name,
        declaring_type,
        params: params.into_iter().map(|t| canonicalize_named(env, &t)).collect(),
        return_type: canonicalize_named(env, &return_type),
    })
}

fn merge_return_types(env: &dyn TypeEnv, a: Type, b: Type) -> Option<Type> {
    let a = canonicalize_named(env, &a);
    let b = canonicalize_named(env, &b);
    if a == b {
        return Some(a);
    }
    if a.is_errorish() {
        return Some(b);
    }
    if b.is_errorish() {
        return Some(a);
    }
    match (crate::is_subtype(env, &a, &b), crate::is_subtype(env, &b, &a)) {
        (true, _) => Some(a),
        (false, true) => Some(b),
        (false, false) => None,
    }
}

fn is_object_method(env: &dyn TypeEnv, name: &str, params: &[Type], return_type: &Type) -> bool {
    let return_type = canonicalize_named(env, return_type);
    match name {
        "equals" => {
            let object = Type::class(env.well_known().object, vec![]);
            params.len() == 1
                && canonicalize_named(env, &params[0]) == object
                && return_type == Type::Primitive(PrimitiveType::Boolean)
        }
        "hashCode" => params.is_empty() && return_type == Type::Primitive(PrimitiveType::Int),
        "toString" => {
            params.is_empty() && return_type == Type::class(env.well_known().string, vec![])
        }
        _ => false,
    }
}

/// The non-wildcard parameterization of a functional interface type (JLS 9.9), used as the
/// ground target type of implicitly typed lambdas.
///
/// `Function<? super String, ? extends R>` becomes `Function<String, R>`.
pub fn non_wildcard_parameterization(env: &dyn TypeEnv, ty: &Type) -> Option<Type> {
    let ty = canonicalize_named(env, ty);
    let Type::Class(ct) = &ty else {
        return Some(ty);
    };
    if !ct.args.iter().any(Type::is_wildcard) {
        return Some(ty);
    }
    let def = env.class(ct.def)?;
    if def.type_params.len() != ct.args.len() {
        return None;
    }

    let mut args = Vec::with_capacity(ct.args.len());
    for (arg, tp) in ct.args.iter().zip(&def.type_params) {
        let declared: Vec<Type> = env
            .type_param(*tp)
            .map(|d| d.upper_bounds.clone())
            .unwrap_or_default();
        // Bounds mentioning the interface's own parameters have no non-wildcard form.
        let mentions_params = declared
            .iter()
            .any(|b| def.type_params.iter().any(|p| b.mentions_type_var(*p)));
        let declared = if declared.is_empty() || mentions_params {
            Type::class(env.well_known().object, vec![])
        } else {
            crate::make_intersection(env, declared)
        };
        let arg = match arg {
            Type::Wildcard(WildcardBound::Unbounded) => declared,
            Type::Wildcard(WildcardBound::Extends(upper)) => {
                if upper.is_proper() {
                    crate::glb(env, upper, &declared)
                } else {
                    (**upper).clone()
                }
            }
            Type::Wildcard(WildcardBound::Super(lower)) => (**lower).clone(),
            other => other.clone(),
        };
        args.push(arg);
    }
    Some(Type::Class(ClassType {
        def: ct.def,
        args,
        outer: ct.outer.clone(),
    }))
}

/// Capture variables are allocated by capture conversion; their names start with `CAP#`.
pub(crate) fn is_capture_var(env: &dyn TypeEnv, id: TypeVarId) -> bool {
    id.context_local_index().is_some()
        || env
            .type_param(id)
            .is_some_and(|tp| tp.name.starts_with("CAP#"))
}

/// Upward projection (JLS 4.10.5): replaces capture variables by their bounds so the result
/// mentions only declared type variables. Used for the type of `var` declarations.
///
/// `List<CAP#1 extends Number>` becomes `List<? extends Number>`; a top-level `CAP#1` becomes its
/// upper bound.
pub fn upward_projection(env: &dyn TypeEnv, ty: &Type) -> Type {
    let mut active = HashSet::new();
    upward(env, ty, &mut active)
}

fn upward(env: &dyn TypeEnv, ty: &Type, active: &mut HashSet<TypeVarId>) -> Type {
    match ty {
        Type::TypeVar(id) if is_capture_var(env, *id) => {
            if !active.insert(*id) {
                return Type::class(env.well_known().object, vec![]);
            }
            let bounds: Vec<Type> = env
                .type_param(*id)
                .map(|tp| tp.upper_bounds.clone())
                .unwrap_or_default();
            let projected: Vec<Type> = bounds.iter().map(|b| upward(env, b, active)).collect();
            active.remove(id);
            crate::make_intersection(env, projected)
        }
        Type::Class(ct) => Type::Class(ClassType {
            def: ct.def,
            args: ct.args.iter().map(|a| upward_arg(env, a, active)).collect(),
            outer: ct.outer.as_deref().map(|o| Box::new(upward(env, o, active))),
        }),
        Type::Array(elem) => Type::array(upward(env, elem, active)),
        Type::Intersection(parts) => {
            let parts = parts.iter().map(|p| upward(env, p, active)).collect();
            crate::make_intersection(env, parts)
        }
        other => other.clone(),
    }
}

fn upward_arg(env: &dyn TypeEnv, arg: &Type, active: &mut HashSet<TypeVarId>) -> Type {
    let mentions_capture = arg.any(&mut |t| matches!(t, Type::TypeVar(id) if is_capture_var(env, *id)));
    if !mentions_capture {
        return arg.clone();
    }
    match arg {
        Type::TypeVar(id) if is_capture_var(env, *id) => {
            let lower = env.type_param(*id).and_then(|tp| tp.lower_bound.clone());
            if let Some(lower) = lower {
                if !lower.any(&mut |t| matches!(t, Type::TypeVar(v) if is_capture_var(env, *v))) {
                    return Type::super_of(lower);
                }
            }
            let upper = upward(env, arg, active);
            wildcard_extends(env, upper)
        }
        Type::Wildcard(WildcardBound::Extends(bound)) => {
            wildcard_extends(env, upward(env, bound, active))
        }
        Type::Wildcard(_) => Type::unbounded(),
        other => wildcard_extends(env, upward(env, other, active)),
    }
}

fn wildcard_extends(env: &dyn TypeEnv, bound: Type) -> Type {
    if bound == Type::class(env.well_known().object, vec![]) {
        Type::unbounded()
    } else {
        Type::extends(bound)
    }
}
