use std::collections::HashMap;

use crate::{canonicalize_named, ClassType, Type, TypeEnv, TypeVarId, WildcardBound};

/// Replaces type variables according to `subst`.
///
/// Type variable ids are unique per declaration, so substitution never needs to rename.
pub fn substitute(ty: &Type, subst: &HashMap<TypeVarId, Type>) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    ty.map(&mut |t| match t {
        Type::TypeVar(v) => subst.get(v).cloned(),
        _ => None,
    })
}

/// `true` for a generic class used without type arguments.
pub(crate) fn is_raw(env: &dyn TypeEnv, ct: &ClassType) -> bool {
    ct.args.is_empty()
        && env
            .class(ct.def)
            .is_some_and(|def| !def.type_params.is_empty())
}

/// The substitution a parameterized class type induces on its members: its own type parameters
/// plus those of every enclosing instance type.
pub fn class_type_subst(env: &dyn TypeEnv, ct: &ClassType) -> HashMap<TypeVarId, Type> {
    let mut out = HashMap::new();
    let mut current = Some(ct);
    while let Some(ct) = current {
        if let Some(def) = env.class(ct.def) {
            if def.type_params.len() == ct.args.len() {
                for (param, arg) in def.type_params.iter().zip(&ct.args) {
                    out.entry(*param).or_insert_with(|| arg.clone());
                }
            }
        }
        current = match ct.outer.as_deref() {
            Some(Type::Class(outer)) => Some(outer),
            _ => None,
        };
    }
    out
}

/// Type erasure (JLS 4.6).
pub fn erasure(env: &dyn TypeEnv, ty: &Type) -> Type {
    match canonicalize_named(env, ty) {
        Type::Class(ct) => Type::class(ct.def, vec![]),
        Type::Array(elem) => Type::array(erasure(env, &elem)),
        Type::TypeVar(id) => {
            let first = env
                .type_param(id)
                .and_then(|tp| tp.upper_bounds.first().cloned());
            match first {
                // Guard against self-referential bounds such as `T extends T`.
                Some(Type::TypeVar(other)) if other == id => {
                    Type::class(env.well_known().object, vec![])
                }
                Some(bound) => erasure(env, &bound),
                None => Type::class(env.well_known().object, vec![]),
            }
        }
        Type::Intersection(parts) => match parts.first() {
            Some(first) => erasure(env, first),
            None => Type::class(env.well_known().object, vec![]),
        },
        Type::Wildcard(WildcardBound::Extends(bound)) => erasure(env, &bound),
        Type::Wildcard(_) => Type::class(env.well_known().object, vec![]),
        other => other,
    }
}

/// Reifiable types (JLS 4.7) are fully available at run time.
pub fn is_reifiable(env: &dyn TypeEnv, ty: &Type) -> bool {
    match ty {
        Type::Primitive(_) | Type::Void | Type::Null | Type::Unknown | Type::Error => true,
        Type::Named(_) => true,
        Type::Array(elem) => is_reifiable(env, elem),
        Type::Class(ct) => {
            let args_ok = ct.args.is_empty()
                || ct
                    .args
                    .iter()
                    .all(|a| matches!(a, Type::Wildcard(WildcardBound::Unbounded)));
            args_ok && ct.outer.as_deref().map_or(true, |o| is_reifiable(env, o))
        }
        Type::TypeVar(_) | Type::Wildcard(_) | Type::Intersection(_) | Type::Infer(_) => false,
    }
}
