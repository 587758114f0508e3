//! Subtyping (JLS 4.10), type identity and the conversions of strict / loose invocation
//! contexts (JLS 5.3).

use crate::java::helpers::instantiate_as_supertype;
use crate::{canonicalize_named, ClassType, PrimitiveType, Type, TypeEnv, WildcardBound};

/// Recursion guard for pathological (F-bounded, self-referential) types.
const MAX_DEPTH: usize = 48;

/// `sub <: sup`.
///
/// `Unknown`/`Error` are compatible with everything so a single unresolved type does not cascade
/// into unrelated errors.
pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    subtype(env, sub, sup, 0)
}

fn subtype(env: &dyn TypeEnv, s: &Type, t: &Type, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    if s.is_errorish() || t.is_errorish() {
        return true;
    }
    let s = canonicalize_named(env, s);
    let t = canonicalize_named(env, t);
    if s == t {
        return true;
    }

    match (&s, &t) {
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Primitive(a), Type::Primitive(b)) => a.widens_to(*b),
        (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
        (Type::Null, _) => t.is_reference(),
        (_, Type::Null) => false,
        (Type::Infer(_), _) | (_, Type::Infer(_)) => false,
        (Type::Wildcard(_), _) | (_, Type::Wildcard(_)) => false,
        (_, Type::Intersection(parts)) => parts.iter().all(|p| subtype(env, &s, p, depth + 1)),
        (Type::Intersection(parts), _) => parts.iter().any(|p| subtype(env, p, &t, depth + 1)),
        (_, Type::TypeVar(b)) => {
            let lower = env.type_param(*b).and_then(|d| d.lower_bound.clone());
            if let Some(lower) = lower {
                if subtype(env, &s, &lower, depth + 1) {
                    return true;
                }
            }
            match &s {
                Type::TypeVar(a) => type_var_upper_subtype(env, *a, &t, depth),
                _ => false,
            }
        }
        (Type::TypeVar(a), _) => type_var_upper_subtype(env, *a, &t, depth),
        (Type::Array(se), Type::Array(te)) => match (se.as_ref(), te.as_ref()) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
            _ => subtype(env, se, te, depth + 1),
        },
        (Type::Array(_), Type::Class(ct)) => {
            let wk = env.well_known();
            ct.args.is_empty()
                && (ct.def == wk.object || ct.def == wk.cloneable || ct.def == wk.serializable)
        }
        (_, Type::Array(_)) => false,
        (Type::Class(_), Type::Class(tc)) => class_subtype(env, &s, tc, depth),
        _ => false,
    }
}

fn type_var_upper_subtype(env: &dyn TypeEnv, var: crate::TypeVarId, t: &Type, depth: usize) -> bool {
    let bounds: Vec<Type> = env
        .type_param(var)
        .map(|d| d.upper_bounds.clone())
        .unwrap_or_default();
    if bounds.is_empty() {
        let object = Type::class(env.well_known().object, vec![]);
        return subtype(env, &object, t, depth + 1);
    }
    bounds.iter().any(|b| subtype(env, b, t, depth + 1))
}

fn class_subtype(env: &dyn TypeEnv, s: &Type, t: &ClassType, depth: usize) -> bool {
    let Some(Type::Class(sup)) = instantiate_as_supertype(env, s, t.def) else {
        return false;
    };
    // A raw or non-generic target accepts every parameterization.
    if t.args.is_empty() {
        return true;
    }
    // Raw to parameterized is an unchecked conversion, not subtyping.
    if sup.args.len() != t.args.len() {
        return false;
    }
    if !sup
        .args
        .iter()
        .zip(&t.args)
        .all(|(a, b)| contains(env, a, b, depth + 1))
    {
        return false;
    }
    match (sup.outer.as_deref(), t.outer.as_deref()) {
        (Some(so), Some(to)) => subtype(env, so, to, depth + 1),
        _ => true,
    }
}

/// Type argument containment `arg <= target` (JLS 4.5.1).
pub(crate) fn is_contained_by(env: &dyn TypeEnv, arg: &Type, target: &Type) -> bool {
    contains(env, arg, target, 0)
}

fn contains(env: &dyn TypeEnv, a: &Type, b: &Type, depth: usize) -> bool {
    if a.is_errorish() || b.is_errorish() {
        return true;
    }
    let object = || Type::class(env.well_known().object, vec![]);
    match b {
        Type::Wildcard(WildcardBound::Unbounded) => true,
        Type::Wildcard(WildcardBound::Extends(bb)) => match a {
            Type::Wildcard(WildcardBound::Extends(ab)) => subtype(env, ab, bb, depth + 1),
            Type::Wildcard(_) => subtype(env, &object(), bb, depth + 1),
            _ => subtype(env, a, bb, depth + 1),
        },
        Type::Wildcard(WildcardBound::Super(bb)) => match a {
            Type::Wildcard(WildcardBound::Super(ab)) => subtype(env, bb, ab, depth + 1),
            Type::Wildcard(_) => false,
            _ => subtype(env, bb, a, depth + 1),
        },
        _ => !a.is_wildcard() && same_type(env, a, b, depth + 1),
    }
}

/// Structural type identity. Intersections compare order-independently and `? extends Object`
/// is the same wildcard as `?`.
pub fn is_same_type(env: &dyn TypeEnv, a: &Type, b: &Type) -> bool {
    same_type(env, a, b, 0)
}

fn same_type(env: &dyn TypeEnv, a: &Type, b: &Type, depth: usize) -> bool {
    if depth > MAX_DEPTH {
        return false;
    }
    if a.is_errorish() || b.is_errorish() {
        return true;
    }
    let a = canonicalize_named(env, a);
    let b = canonicalize_named(env, b);
    if a == b {
        return true;
    }
    match (&a, &b) {
        (Type::Class(x), Type::Class(y)) => {
            x.def == y.def
                && x.args.len() == y.args.len()
                && x.args
                    .iter()
                    .zip(&y.args)
                    .all(|(p, q)| same_type(env, p, q, depth + 1))
                && match (x.outer.as_deref(), y.outer.as_deref()) {
                    (Some(p), Some(q)) => same_type(env, p, q, depth + 1),
                    _ => true,
                }
        }
        (Type::Array(x), Type::Array(y)) => same_type(env, x, y, depth + 1),
        (Type::Wildcard(x), Type::Wildcard(y)) => {
            let object = Type::class(env.well_known().object, vec![]);
            let upper = |w: &WildcardBound| match w {
                WildcardBound::Unbounded => Some(object.clone()),
                WildcardBound::Extends(b) => Some((**b).clone()),
                WildcardBound::Super(_) => None,
            };
            match (x, y) {
                (WildcardBound::Super(p), WildcardBound::Super(q)) => {
                    same_type(env, p, q, depth + 1)
                }
                _ => match (upper(x), upper(y)) {
                    (Some(p), Some(q)) => same_type(env, &p, &q, depth + 1),
                    _ => false,
                },
            }
        }
        (Type::Intersection(xs), Type::Intersection(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|x| ys.iter().any(|y| same_type(env, x, y, depth + 1)))
                && ys
                    .iter()
                    .all(|y| xs.iter().any(|x| same_type(env, x, y, depth + 1)))
        }
        _ => false,
    }
}

/// The wrapper class type of a primitive (boxing, JLS 5.1.7).
pub fn boxed_class(env: &dyn TypeEnv, prim: PrimitiveType) -> Type {
    Type::class(env.well_known().boxed(prim), vec![])
}

/// The primitive a wrapper class type unboxes to (JLS 5.1.8).
pub fn unboxed_primitive(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    match canonicalize_named(env, ty) {
        Type::Class(ct) => env.well_known().unboxed(ct.def),
        _ => None,
    }
}

/// Strict invocation context: identity, primitive widening and reference widening.
pub fn is_strict_compatible(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    is_subtype(env, from, to)
}

/// Loose invocation context: strict conversions plus boxing / unboxing and unchecked conversion
/// of raw types.
pub fn is_loose_compatible(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    if is_strict_compatible(env, from, to) {
        return true;
    }
    match (from, to) {
        (Type::Primitive(p), _) if to.is_reference() => is_subtype(env, &boxed_class(env, *p), to),
        (_, Type::Primitive(q)) => match unboxed_primitive(env, from) {
            Some(p) => p.widens_to(*q),
            None => type_var_unboxes_to(env, from, *q),
        },
        _ => is_unchecked_convertible(env, from, to),
    }
}

fn type_var_unboxes_to(env: &dyn TypeEnv, from: &Type, to: PrimitiveType) -> bool {
    let Type::TypeVar(id) = from else {
        return false;
    };
    env.type_param(*id).is_some_and(|tp| {
        tp.upper_bounds
            .iter()
            .filter_map(|b| unboxed_primitive(env, b))
            .any(|p| p.widens_to(to))
    })
}

/// A raw type converted to a parameterization of one of its supertypes (JLS 5.1.9).
pub(crate) fn is_unchecked_convertible(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    let Type::Class(target) = canonicalize_named(env, to) else {
        return false;
    };
    if target.args.is_empty() {
        return false;
    }
    matches!(
        instantiate_as_supertype(env, from, target.def),
        Some(Type::Class(view)) if view.args.is_empty()
    )
}

/// Assignment context (JLS 5.2), without constant narrowing.
pub fn is_assignable(env: &dyn TypeEnv, from: &Type, to: &Type) -> bool {
    if from.is_errorish() || to.is_errorish() {
        return true;
    }
    if matches!(from, Type::Void) || matches!(to, Type::Void) {
        return false;
    }
    is_loose_compatible(env, from, to)
}
