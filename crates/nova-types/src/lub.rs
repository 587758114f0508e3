//! Least upper bound (JLS 4.10.4), greatest lower bound and intersection normalization.

use crate::java::helpers::{instantiate_as_supertype, supertype_closure};
use crate::{canonicalize_named, ClassId, ClassKind, Type, TypeEnv, WildcardBound};

/// Nesting depth at which `lcta` gives up and answers `?`, which keeps `lub(Integer, Double)`
/// (whose `Comparable` arguments recurse forever) finite.
const LUB_DEPTH_LIMIT: usize = 2;

pub fn lub(env: &dyn TypeEnv, a: &Type, b: &Type) -> Type {
    lub_all(env, &[a.clone(), b.clone()])
}

/// Least upper bound of a set of reference types. The null type is ignored unless it is the only
/// member; an empty set yields `Unknown`.
pub fn lub_all(env: &dyn TypeEnv, types: &[Type]) -> Type {
    lub_with_depth(env, types, 0)
}

fn lub_with_depth(env: &dyn TypeEnv, types: &[Type], depth: usize) -> Type {
    let mut tys: Vec<Type> = Vec::new();
    for ty in types {
        let ty = canonicalize_named(env, ty);
        if matches!(ty, Type::Null) || ty.is_errorish() || tys.contains(&ty) {
            continue;
        }
        tys.push(ty);
    }
    if tys.is_empty() {
        return if types.iter().any(|t| matches!(t, Type::Null)) {
            Type::Null
        } else {
            Type::Unknown
        };
    }
    if tys.len() == 1 {
        return tys.pop().unwrap_or(Type::Unknown);
    }

    // A member that already is a supertype of all others.
    if let Some(top) = tys
        .iter()
        .find(|cand| tys.iter().all(|t| crate::is_subtype(env, t, cand)))
    {
        return top.clone();
    }

    if tys.iter().all(|t| matches!(t, Type::Array(_))) {
        let elems: Vec<Type> = tys
            .iter()
            .filter_map(|t| match t {
                Type::Array(elem) if elem.is_reference() => Some((**elem).clone()),
                _ => None,
            })
            .collect();
        if elems.len() == tys.len() {
            return Type::array(lub_with_depth(env, &elems, depth));
        }
    }

    // Erased candidates: classes every member is a subtype of, in the first member's order.
    let closures: Vec<Vec<ClassId>> = tys.iter().map(|t| erased_supertypes(env, t)).collect();
    let mut ec: Vec<ClassId> = closures[0]
        .iter()
        .copied()
        .filter(|c| closures[1..].iter().all(|other| other.contains(c)))
        .collect();
    ec.dedup();

    // Minimal erased candidates.
    let mec: Vec<ClassId> = ec
        .iter()
        .copied()
        .filter(|c| {
            !ec.iter()
                .any(|d| d != c && is_subclass(env, *d, *c))
        })
        .collect();

    let mut parts = Vec::with_capacity(mec.len());
    for g in mec {
        let generic = env
            .class(g)
            .is_some_and(|def| !def.type_params.is_empty());
        if !generic {
            parts.push(Type::class(g, vec![]));
            continue;
        }
        let params: Vec<Vec<Type>> = tys
            .iter()
            .filter_map(|t| match instantiate_as_supertype(env, t, g) {
                Some(Type::Class(ct)) => Some(ct.args),
                _ => None,
            })
            .collect();
        if params.iter().any(Vec::is_empty) {
            parts.push(Type::class(g, vec![]));
            continue;
        }
        let arity = params[0].len();
        let args = (0..arity)
            .map(|i| {
                params[1..].iter().fold(params[0][i].clone(), |acc, p| {
                    lcta(env, &acc, &p[i], depth)
                })
            })
            .collect();
        parts.push(Type::class(g, args));
    }
    make_intersection(env, parts)
}

/// Least containing type argument.
fn lcta(env: &dyn TypeEnv, a: &Type, b: &Type, depth: usize) -> Type {
    if a == b {
        return a.clone();
    }
    if depth + 1 >= LUB_DEPTH_LIMIT {
        return Type::unbounded();
    }
    let sub = |x: &Type, y: &Type| lub_with_depth(env, &[x.clone(), y.clone()], depth + 1);
    let extends = |bound: Type| {
        if bound == Type::class(env.well_known().object, vec![]) {
            Type::unbounded()
        } else {
            Type::extends(bound)
        }
    };
    use WildcardBound::*;
    match (a, b) {
        (Type::Wildcard(Unbounded), _) | (_, Type::Wildcard(Unbounded)) => Type::unbounded(),
        (Type::Wildcard(Extends(u)), Type::Wildcard(Extends(v))) => extends(sub(u, v)),
        (Type::Wildcard(Super(u)), Type::Wildcard(Super(v))) => Type::super_of(glb(env, u, v)),
        (Type::Wildcard(Extends(u)), Type::Wildcard(Super(v)))
        | (Type::Wildcard(Super(v)), Type::Wildcard(Extends(u))) => {
            if u == v {
                (**u).clone()
            } else {
                Type::unbounded()
            }
        }
        (Type::Wildcard(Extends(v)), u) | (u, Type::Wildcard(Extends(v))) => extends(sub(u, v)),
        (Type::Wildcard(Super(v)), u) | (u, Type::Wildcard(Super(v))) => {
            Type::super_of(glb(env, u, v))
        }
        (u, v) => extends(sub(u, v)),
    }
}

fn erased_supertypes(env: &dyn TypeEnv, ty: &Type) -> Vec<ClassId> {
    let mut out = Vec::new();
    for sup in supertype_closure(env, ty) {
        if let Type::Class(ct) = sup {
            if !out.contains(&ct.def) {
                out.push(ct.def);
            }
        }
    }
    out
}

fn is_subclass(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    instantiate_as_supertype(env, &Type::class(sub, vec![]), sup).is_some()
}

/// Greatest lower bound: the more specific type when one is a subtype of the other, otherwise
/// their intersection.
pub fn glb(env: &dyn TypeEnv, a: &Type, b: &Type) -> Type {
    if a.is_errorish() {
        return b.clone();
    }
    if b.is_errorish() {
        return a.clone();
    }
    if crate::is_subtype(env, a, b) {
        return a.clone();
    }
    if crate::is_subtype(env, b, a) {
        return b.clone();
    }
    make_intersection(env, vec![a.clone(), b.clone()])
}

/// Builds a normalized intersection: nested intersections are flattened, duplicates and
/// components implied by other components are dropped, and the class component (if any) comes
/// first. A single remaining component is returned as-is; an empty one is `Object`.
pub fn make_intersection(env: &dyn TypeEnv, parts: Vec<Type>) -> Type {
    let mut flat: Vec<Type> = Vec::new();
    let mut stack: Vec<Type> = parts.into_iter().rev().collect();
    while let Some(part) = stack.pop() {
        match canonicalize_named(env, &part) {
            Type::Intersection(inner) => stack.extend(inner.into_iter().rev()),
            other => {
                if !flat.contains(&other) {
                    flat.push(other);
                }
            }
        }
    }

    let known: Vec<Type> = flat.iter().filter(|t| !t.is_errorish()).cloned().collect();
    if !known.is_empty() {
        flat = known;
    }

    let snapshot = flat.clone();
    flat.retain(|part| {
        !snapshot.iter().any(|other| {
            other != part
                && crate::is_subtype(env, other, part)
                && !crate::is_subtype(env, part, other)
        })
    });

    flat.sort_by_cached_key(|ty| (intersection_component_rank(env, ty), type_sort_key(env, ty)));
    match flat.len() {
        0 => Type::class(env.well_known().object, vec![]),
        1 => flat.pop().unwrap_or(Type::Unknown),
        _ => Type::Intersection(flat),
    }
}

/// Classes sort before interfaces, which sort before everything else.
pub(crate) fn intersection_component_rank(env: &dyn TypeEnv, ty: &Type) -> u8 {
    match ty {
        Type::Class(ct) => match env.class(ct.def).map(|d| d.kind) {
            Some(ClassKind::Class) => 0,
            Some(ClassKind::Interface) => 1,
            None => 2,
        },
        Type::Array(_) => 0,
        Type::TypeVar(_) => 3,
        _ => 4,
    }
}

/// Deterministic ordering key: fully qualified rendering of the type.
pub(crate) fn type_sort_key(env: &dyn TypeEnv, ty: &Type) -> String {
    crate::java::format::format_type_qualified(env, ty)
}
