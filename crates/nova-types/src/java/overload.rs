//! Method and constructor overload resolution (JLS 15.12.2) with generic method inference.
//!
//! Resolution runs the three applicability phases in order (strict, loose, variable arity) and
//! picks the most specific method of the first phase with applicable candidates. Candidates that
//! only become applicable in a later phase are reported as fallbacks so callers can explain why a
//! "closer looking" overload was not chosen.

use std::collections::HashMap;

use crate::infer::InferenceContext;
use crate::java::env::{normalize_receiver, CaptureEnv, TyContext};
use crate::java::helpers::{is_capture_var, sam_signature, supertype_closure};
use crate::subst::{class_type_subst, erasure, is_raw, is_reifiable, substitute};
use crate::subtyping::{
    is_loose_compatible, is_same_type, is_strict_compatible, is_subtype, is_unchecked_convertible,
};
use crate::{
    canonicalize_named, CallKind, ClassId, ClassType, FieldDef, MethodCall, PrimitiveType, Type,
    TypeEnv, TypeVarId, TypeWarning, UncheckedReason,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InvocationPhase {
    /// Identity and widening conversions only.
    Strict,
    /// Adds boxing and unboxing.
    Loose,
    /// Variable-arity invocation.
    Varargs,
}

impl InvocationPhase {
    pub const ALL: [InvocationPhase; 3] = [
        InvocationPhase::Strict,
        InvocationPhase::Loose,
        InvocationPhase::Varargs,
    ];
}

/// Identifies a declared member by its position in the owning [`crate::ClassDef`].
///
/// The implicit default constructor of a class without declared constructors is reported as
/// `Constructor { index: 0 }`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemberRef {
    Method { owner: ClassId, index: usize },
    Constructor { owner: ClassId, index: usize },
}

impl MemberRef {
    pub fn owner(self) -> ClassId {
        match self {
            MemberRef::Method { owner, .. } | MemberRef::Constructor { owner, .. } => owner,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CandidateSummary {
    pub decl: MemberRef,
    pub name: String,
    pub declaring_type: Type,
    pub params: Vec<Type>,
    pub is_varargs: bool,
    /// The phase in which the candidate is applicable, if any.
    pub phase: Option<InvocationPhase>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMethod {
    pub decl: MemberRef,
    /// `<init>` for constructors.
    pub name: String,
    /// The receiver viewed as the declaring class (or the constructed class type).
    pub declaring_type: Type,
    pub type_params: Vec<TypeVarId>,
    pub inferred_type_args: Vec<Type>,
    /// Declared parameter types with all substitutions applied.
    pub formals: Vec<Type>,
    /// One parameter type per argument (variable-arity parameters expanded).
    pub params: Vec<Type>,
    pub return_type: Type,
    pub is_static: bool,
    pub is_varargs: bool,
    pub used_varargs: bool,
    pub phase: InvocationPhase,
    /// Candidates applicable only in a later phase than [`Self::phase`].
    pub fallbacks: Vec<CandidateSummary>,
    pub warnings: Vec<TypeWarning>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AmbiguousMethods {
    pub candidates: Vec<CandidateSummary>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MethodNotFound {
    pub receiver: Type,
    pub name: String,
    pub args: Vec<Type>,
    pub candidates: Vec<CandidateSummary>,
    /// A candidate of matching arity was rejected because a parameter mentions a capture
    /// variable the argument cannot be converted to (e.g. `List<?>.add(x)`).
    pub capture_related: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MethodResolution {
    Found(ResolvedMethod),
    Ambiguous(AmbiguousMethods),
    NotFound(MethodNotFound),
}

/// A class instance creation expression at the type level.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstructorCall {
    /// The class to instantiate. Inner classes carry their enclosing instance type in
    /// [`ClassType::outer`].
    pub class: Type,
    pub args: Vec<Type>,
    pub expected: Option<Type>,
    /// `new Foo<>(..)`: the class type arguments are inferred.
    pub diamond: bool,
    pub explicit_type_args: Vec<Type>,
}

#[derive(Clone, Debug)]
struct Candidate {
    decl: MemberRef,
    name: String,
    declaring_type: Type,
    type_params: Vec<TypeVarId>,
    /// Receiver substitution, applied to the declared bounds of `type_params`.
    bound_subst: HashMap<TypeVarId, Type>,
    params: Vec<Type>,
    return_type: Type,
    is_static: bool,
    is_varargs: bool,
    is_abstract: bool,
}

impl Candidate {
    fn summary(&self, params: Vec<Type>, phase: Option<InvocationPhase>) -> CandidateSummary {
        CandidateSummary {
            decl: self.decl,
            name: self.name.clone(),
            declaring_type: self.declaring_type.clone(),
            params,
            is_varargs: self.is_varargs,
            phase,
        }
    }
}

/// Resolves a method invocation.
///
/// The receiver is normalized first: type variables are replaced by their bounds and wildcard
/// parameterizations are capture-converted, allocating capture variables in `env`. Pass a
/// [`TyContext`] to keep those allocations out of a shared store.
pub fn resolve_method_call<E: CaptureEnv + ?Sized>(
    env: &mut E,
    call: &MethodCall<'_>,
) -> MethodResolution {
    let receiver = match call.call_kind {
        CallKind::Static => canonicalize_named(env.as_type_env(), &call.receiver),
        CallKind::Instance => normalize_receiver(env, &call.receiver),
    };
    let env = env.as_type_env();
    let _span = tracing::trace_span!("resolve_method_call", name = call.name).entered();

    let candidates = if receiver.is_errorish() {
        Vec::new()
    } else {
        collect_method_candidates(env, &receiver, call.name, call.call_kind)
    };
    select(
        env,
        &candidates,
        Selection {
            receiver: &receiver,
            name: call.name,
            args: &call.args,
            expected: call.expected_return.as_ref(),
            explicit_type_args: &call.explicit_type_args,
        },
    )
}

/// Resolves a class instance creation.
pub fn resolve_constructor<E: CaptureEnv + ?Sized>(
    env: &mut E,
    call: &ConstructorCall,
) -> MethodResolution {
    let env = env.as_type_env();
    let class_ty = canonicalize_named(env, &call.class);
    let _span = tracing::trace_span!("resolve_constructor", diamond = call.diamond).entered();

    let candidates = match &class_ty {
        Type::Class(ct) => collect_constructor_candidates(env, ct, &class_ty, call.diamond),
        _ => Vec::new(),
    };
    let explicit: &[Type] = if call.diamond {
        &[]
    } else {
        &call.explicit_type_args
    };
    select(
        env,
        &candidates,
        Selection {
            receiver: &class_ty,
            name: "<init>",
            args: &call.args,
            expected: call.expected.as_ref(),
            explicit_type_args: explicit,
        },
    )
}

/// Convenience wrapper around [`resolve_constructor`] for callers without a [`TyContext`].
///
/// A generic class given without type arguments is treated as a diamond (`new Foo<>(..)`).
pub fn resolve_constructor_call(
    env: &dyn TypeEnv,
    class: &Type,
    args: &[Type],
    expected: Option<&Type>,
) -> MethodResolution {
    let diamond = matches!(
        canonicalize_named(env, class),
        Type::Class(ct) if is_raw(env, &ct)
    );
    let mut ctx = TyContext::new(env);
    resolve_constructor(
        &mut ctx,
        &ConstructorCall {
            class: class.clone(),
            args: args.to_vec(),
            expected: expected.cloned(),
            diamond,
            explicit_type_args: Vec::new(),
        },
    )
}

/// Finds a field by name on `receiver` or its supertypes, with the field type instantiated for
/// the receiver. Arrays expose `length`.
pub fn resolve_field(
    env: &dyn TypeEnv,
    receiver: &Type,
    name: &str,
    call_kind: CallKind,
) -> Option<FieldDef> {
    if let Type::Array(_) = receiver {
        if name == "length" && call_kind == CallKind::Instance {
            return Some(FieldDef {
                name: "length".to_string(),
                ty: Type::Primitive(PrimitiveType::Int),
                is_static: false,
                is_final: true,
            });
        }
    }
    for sup in supertype_closure(env, receiver) {
        let Type::Class(ct) = &sup else {
            continue;
        };
        let Some(def) = env.class(ct.def) else {
            continue;
        };
        let Some(field) = def.fields.iter().find(|f| f.name == name) else {
            continue;
        };
        if call_kind == CallKind::Static && !field.is_static {
            return None;
        }
        let ty = if field.is_static {
            field.ty.clone()
        } else if is_raw(env, ct) {
            erasure(env, &field.ty)
        } else {
            substitute(&field.ty, &class_type_subst(env, ct))
        };
        return Some(FieldDef {
            ty,
            ..field.clone()
        });
    }
    None
}

fn collect_method_candidates(
    env: &dyn TypeEnv,
    receiver: &Type,
    name: &str,
    call_kind: CallKind,
) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut seen_erasures: Vec<Vec<Type>> = Vec::new();
    let mut root: Option<ClassId> = None;

    for sup in supertype_closure(env, receiver) {
        let Type::Class(ct) = &sup else {
            continue;
        };
        let root = *root.get_or_insert(ct.def);
        let Some(def) = env.class(ct.def) else {
            continue;
        };
        let raw = is_raw(env, ct);
        let subst = class_type_subst(env, ct);
        for (index, m) in def.methods.iter().enumerate() {
            if m.name != name || (call_kind == CallKind::Static && !m.is_static) {
                continue;
            }
            // Static interface methods are not inherited.
            if m.is_static && def.is_interface() && ct.def != root {
                continue;
            }
            let bound_subst = if m.is_static || raw {
                HashMap::new()
            } else {
                subst.clone()
            };
            let (type_params, params, return_type) = if m.is_static {
                (m.type_params.clone(), m.params.clone(), m.return_type.clone())
            } else if raw {
                (
                    Vec::new(),
                    m.params.iter().map(|p| erasure(env, p)).collect(),
                    erasure(env, &m.return_type),
                )
            } else {
                (
                    m.type_params.clone(),
                    m.params.iter().map(|p| substitute(p, &subst)).collect(),
                    substitute(&m.return_type, &subst),
                )
            };

            // Overridden declarations further up the hierarchy are hidden.
            let erased: Vec<Type> = params.iter().map(|p| erasure(env, p)).collect();
            if seen_erasures.contains(&erased) {
                continue;
            }
            seen_erasures.push(erased);

            out.push(Candidate {
                decl: MemberRef::Method {
                    owner: ct.def,
                    index,
                },
                name: m.name.clone(),
                declaring_type: sup.clone(),
                type_params,
                bound_subst,
                params,
                return_type,
                is_static: m.is_static,
                is_varargs: m.is_varargs,
                is_abstract: m.is_abstract,
            });
        }
    }
    out
}

fn collect_constructor_candidates(
    env: &dyn TypeEnv,
    ct: &ClassType,
    class_ty: &Type,
    diamond: bool,
) -> Vec<Candidate> {
    let Some(def) = env.class(ct.def) else {
        return Vec::new();
    };
    if def.is_interface() {
        return Vec::new();
    }
    let outer_subst = match ct.outer.as_deref() {
        Some(Type::Class(outer)) => class_type_subst(env, outer),
        _ => HashMap::new(),
    };
    let raw = !diamond && is_raw(env, ct);
    let class_subst = class_type_subst(env, ct);
    let generic_self = Type::Class(ClassType {
        def: ct.def,
        args: def.type_params.iter().map(|tp| Type::TypeVar(*tp)).collect(),
        outer: ct.outer.clone(),
    });

    let implicit_default = crate::ConstructorDef {
        type_params: Vec::new(),
        params: Vec::new(),
        is_varargs: false,
        is_accessible: true,
    };
    let declared: Vec<(usize, &crate::ConstructorDef)> = if def.constructors.is_empty() {
        vec![(0, &implicit_default)]
    } else {
        def.constructors.iter().enumerate().collect()
    };

    declared
        .into_iter()
        .filter(|(_, c)| c.is_accessible)
        .map(|(index, c)| {
            let bound_subst = if diamond {
                outer_subst.clone()
            } else if raw {
                HashMap::new()
            } else {
                class_subst.clone()
            };
            let (type_params, params, return_type) = if diamond {
                let mut type_params = def.type_params.clone();
                type_params.extend(c.type_params.iter().copied());
                (
                    type_params,
                    c.params.iter().map(|p| substitute(p, &outer_subst)).collect(),
                    generic_self.clone(),
                )
            } else if raw {
                (
                    Vec::new(),
                    c.params.iter().map(|p| erasure(env, p)).collect(),
                    class_ty.clone(),
                )
            } else {
                (
                    c.type_params.clone(),
                    c.params.iter().map(|p| substitute(p, &class_subst)).collect(),
                    class_ty.clone(),
                )
            };
            Candidate {
                decl: MemberRef::Constructor {
                    owner: ct.def,
                    index,
                },
                name: "<init>".to_string(),
                declaring_type: class_ty.clone(),
                type_params,
                bound_subst,
                params,
                return_type,
                is_static: false,
                is_varargs: c.is_varargs,
                is_abstract: false,
            }
        })
        .collect()
}

#[derive(Clone, Copy)]
struct Selection<'a> {
    receiver: &'a Type,
    name: &'a str,
    args: &'a [Type],
    expected: Option<&'a Type>,
    explicit_type_args: &'a [Type],
}

fn select(env: &dyn TypeEnv, candidates: &[Candidate], sel: Selection<'_>) -> MethodResolution {
    for (phase_idx, phase) in InvocationPhase::ALL.into_iter().enumerate() {
        let applicable: Vec<(usize, ResolvedMethod)> = candidates
            .iter()
            .enumerate()
            .filter_map(|(idx, cand)| try_candidate(env, cand, sel, phase).map(|r| (idx, r)))
            .collect();
        if applicable.is_empty() {
            continue;
        }

        let applicable_now: Vec<usize> = applicable.iter().map(|(idx, _)| *idx).collect();
        return match most_specific(env, candidates, applicable, sel) {
            Ok(mut found) => {
                for later in &InvocationPhase::ALL[phase_idx + 1..] {
                    for (idx, cand) in candidates.iter().enumerate() {
                        if applicable_now.contains(&idx)
                            || found.fallbacks.iter().any(|f| f.decl == cand.decl)
                        {
                            continue;
                        }
                        if let Some(r) = try_candidate(env, cand, sel, *later) {
                            found.fallbacks.push(cand.summary(r.params, Some(*later)));
                        }
                    }
                }
                tracing::trace!(name = sel.name, ?phase, "resolved invocation");
                MethodResolution::Found(found)
            }
            Err(tied) => MethodResolution::Ambiguous(AmbiguousMethods {
                candidates: tied
                    .into_iter()
                    .map(|(idx, r)| candidates[idx].summary(r.params, Some(phase)))
                    .collect(),
            }),
        };
    }

    let capture_related = candidates.iter().any(|cand| {
        cand.params.len() == sel.args.len()
            && cand.params.iter().zip(sel.args).any(|(param, arg)| {
                !arg.is_errorish()
                    && param.any(&mut |t| matches!(t, Type::TypeVar(id) if is_capture_var(env, *id)))
                    && !is_loose_compatible(env, arg, param)
            })
    });
    MethodResolution::NotFound(MethodNotFound {
        receiver: sel.receiver.clone(),
        name: sel.name.to_string(),
        args: sel.args.to_vec(),
        candidates: candidates
            .iter()
            .map(|c| c.summary(c.params.clone(), None))
            .collect(),
        capture_related,
    })
}

/// Per-argument parameter types: in variable-arity form the trailing array parameter is expanded
/// to its component type for every remaining argument.
pub fn expand_params(formals: &[Type], arg_count: usize, varargs: bool) -> Vec<Type> {
    if !varargs {
        return formals.to_vec();
    }
    let Some((last, fixed)) = formals.split_last() else {
        return Vec::new();
    };
    let component = match last {
        Type::Array(elem) => (**elem).clone(),
        other => other.clone(),
    };
    let mut out = fixed.to_vec();
    while out.len() < arg_count {
        out.push(component.clone());
    }
    out
}

fn try_candidate(
    env: &dyn TypeEnv,
    cand: &Candidate,
    sel: Selection<'_>,
    phase: InvocationPhase,
) -> Option<ResolvedMethod> {
    let args = sel.args;
    let varargs = phase == InvocationPhase::Varargs;
    if varargs {
        if !cand.is_varargs || args.len() + 1 < cand.params.len() {
            return None;
        }
    } else if args.len() != cand.params.len() {
        return None;
    }
    let loose = phase != InvocationPhase::Strict;

    let explicit = sel.explicit_type_args;
    let use_explicit = !explicit.is_empty() && explicit.len() == cand.type_params.len();
    if !explicit.is_empty() && !cand.type_params.is_empty() && !use_explicit {
        return None;
    }

    let mut warnings = Vec::new();
    let (inferred_type_args, formals, return_type) = if cand.type_params.is_empty() || use_explicit
    {
        let subst: HashMap<TypeVarId, Type> = if use_explicit {
            cand.type_params
                .iter()
                .copied()
                .zip(explicit.iter().cloned())
                .collect()
        } else {
            HashMap::new()
        };
        let formals: Vec<Type> = cand.params.iter().map(|p| substitute(p, &subst)).collect();
        for (arg, param) in args.iter().zip(expand_params(&formals, args.len(), varargs)) {
            if arg.is_errorish() {
                continue;
            }
            if matches!(arg, Type::Void) {
                return None;
            }
            let strict_ok = is_strict_compatible(env, arg, &param);
            let unchecked = !strict_ok && is_unchecked_convertible(env, arg, &param);
            if !(strict_ok || unchecked || (loose && is_loose_compatible(env, arg, &param))) {
                return None;
            }
            if unchecked {
                let warning = TypeWarning::Unchecked(UncheckedReason::RawConversion);
                if !warnings.contains(&warning) {
                    warnings.push(warning);
                }
            }
        }
        let inferred = if use_explicit {
            explicit.to_vec()
        } else {
            Vec::new()
        };
        (inferred, formals, substitute(&cand.return_type, &subst))
    } else {
        let mut ic = InferenceContext::new();
        let opened = ic.open_member_in(
            env,
            &cand.type_params,
            &cand.params,
            &cand.return_type,
            &cand.bound_subst,
        );
        for (arg, param) in args
            .iter()
            .zip(expand_params(&opened.params, args.len(), varargs))
        {
            if arg.is_errorish() {
                continue;
            }
            if matches!(arg, Type::Void) {
                return None;
            }
            ic.add_compatible(env, arg, &param, loose).ok()?;
        }
        if let Some(expected) = sel
            .expected
            .filter(|t| !t.is_errorish() && !matches!(t, Type::Void))
        {
            if !matches!(opened.return_type, Type::Void) {
                let snapshot = ic.clone();
                let usable = ic
                    .add_compatible(env, &opened.return_type, expected, true)
                    .is_ok()
                    && ic.clone().resolve_all(env).is_ok();
                if !usable {
                    ic = snapshot;
                }
            }
        }
        ic.resolve_all(env).ok()?;

        let inferred = cand
            .type_params
            .iter()
            .map(|tp| {
                opened
                    .subst
                    .get(tp)
                    .map(|t| ic.instantiate_or_unknown(t))
                    .unwrap_or(Type::Unknown)
            })
            .collect();
        let formals = opened
            .params
            .iter()
            .map(|p| ic.instantiate_or_unknown(p))
            .collect();
        (inferred, formals, ic.instantiate_or_unknown(&opened.return_type))
    };

    if varargs {
        let non_reifiable = matches!(
            cand.params.last(),
            Some(Type::Array(elem)) if !is_reifiable(env, elem)
        );
        if non_reifiable {
            warnings.push(TypeWarning::Unchecked(UncheckedReason::UncheckedVarargs));
        }
    }

    let params = expand_params(&formals, args.len(), varargs);
    Some(ResolvedMethod {
        decl: cand.decl,
        name: cand.name.clone(),
        declaring_type: cand.declaring_type.clone(),
        type_params: cand.type_params.clone(),
        inferred_type_args,
        formals,
        params,
        return_type,
        is_static: cand.is_static,
        is_varargs: cand.is_varargs,
        used_varargs: varargs,
        phase,
        fallbacks: Vec::new(),
        warnings,
    })
}

/// Whether `cand` was applied with its own type parameters inferred (as opposed to a
/// non-generic member or one given explicit type arguments).
fn infers_type_params(cand: &Candidate, sel: Selection<'_>) -> bool {
    !cand.type_params.is_empty() && sel.explicit_type_args.is_empty()
}

/// `a` is at least as specific as `b` (JLS 15.12.2.5) for the given arguments.
///
/// The comparison uses the declared formals seen from the receiver. When `b` is generic its type
/// parameters are inferred from `a`'s formals; `a`'s own type parameters stay as type variables.
/// Two variable-arity invocations also compare the component one past the last argument.
fn at_least_as_specific(
    env: &dyn TypeEnv,
    (ca, a): (&Candidate, &ResolvedMethod),
    (cb, b): (&Candidate, &ResolvedMethod),
    sel: Selection<'_>,
) -> bool {
    let count = if a.used_varargs && b.used_varargs {
        sel.args.len() + 1
    } else {
        sel.args.len()
    };
    let formals_a = if infers_type_params(ca, sel) {
        &ca.params
    } else {
        &a.formals
    };
    let declared_a = expand_params(formals_a, count, a.used_varargs);

    let open_b = infers_type_params(cb, sel);
    let mut ic = InferenceContext::new();
    let declared_b = if open_b {
        let opened =
            ic.open_member_in(env, &cb.type_params, &cb.params, &cb.return_type, &cb.bound_subst);
        expand_params(&opened.params, count, b.used_varargs)
    } else {
        expand_params(&b.formals, count, b.used_varargs)
    };

    for (idx, (s, t)) in declared_a.iter().zip(&declared_b).enumerate() {
        if sel.args.get(idx).is_some_and(Type::is_errorish) {
            // Lambdas and method references are typed against both functional interfaces.
            let (Some(pa), Some(pb)) = (a.params.get(idx), b.params.get(idx)) else {
                return false;
            };
            if !(is_subtype(env, pa, pb) || functional_more_specific(env, pa, pb)) {
                return false;
            }
            continue;
        }
        if open_b {
            if ic.add_subtype(env, s, t).is_err() {
                return false;
            }
        } else if !is_subtype(env, s, t) {
            return false;
        }
    }
    !open_b || ic.resolve_all(env).is_ok()
}

fn functional_more_specific(env: &dyn TypeEnv, a: &Type, b: &Type) -> bool {
    let (Some(sa), Some(sb)) = (sam_signature(env, a), sam_signature(env, b)) else {
        return false;
    };
    sa.params.len() == sb.params.len()
        && sa
            .params
            .iter()
            .zip(&sb.params)
            .all(|(x, y)| is_same_type(env, x, y))
        && (matches!(sb.return_type, Type::Void) || is_subtype(env, &sa.return_type, &sb.return_type))
}

/// Same parameter types up to renaming of the members' own type parameters, declared in
/// different classes of the receiver's hierarchy.
fn override_equivalent(env: &dyn TypeEnv, a: &Candidate, b: &Candidate) -> bool {
    if a.decl.owner() == b.decl.owner()
        || a.type_params.len() != b.type_params.len()
        || a.params.len() != b.params.len()
    {
        return false;
    }
    let rename: HashMap<TypeVarId, Type> = b
        .type_params
        .iter()
        .copied()
        .zip(a.type_params.iter().map(|tp| Type::TypeVar(*tp)))
        .collect();
    a.params
        .iter()
        .zip(&b.params)
        .all(|(x, y)| is_same_type(env, x, &substitute(y, &rename)))
}

type Ranked = (usize, ResolvedMethod);

fn most_specific(
    env: &dyn TypeEnv,
    candidates: &[Candidate],
    applicable: Vec<Ranked>,
    sel: Selection<'_>,
) -> Result<ResolvedMethod, Vec<Ranked>> {
    let n = applicable.len();
    let specific: Vec<Vec<bool>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    let (ci, ri) = &applicable[i];
                    let (cj, rj) = &applicable[j];
                    i == j
                        || at_least_as_specific(
                            env,
                            (&candidates[*ci], ri),
                            (&candidates[*cj], rj),
                            sel,
                        )
                })
                .collect()
        })
        .collect();
    let maximal: Vec<usize> = (0..n)
        .filter(|&i| !(0..n).any(|j| specific[j][i] && !specific[i][j]))
        .collect();

    let mut ranked: Vec<Ranked> = applicable;
    if maximal.len() == 1 {
        return Ok(ranked.swap_remove(maximal[0]).1);
    }
    let tied: Vec<Ranked> = maximal.iter().map(|&i| ranked[i].clone()).collect();
    let Some((first, _)) = tied.first() else {
        return Err(ranked);
    };

    // Override-equivalent signatures: prefer a concrete method, then the most derived
    // declaration (candidates are collected subclass first).
    let first = &candidates[*first];
    let equivalent = tied
        .iter()
        .skip(1)
        .all(|(idx, _)| override_equivalent(env, first, &candidates[*idx]));
    if equivalent {
        let pick = tied
            .iter()
            .find(|(idx, _)| !candidates[*idx].is_abstract)
            .unwrap_or(&tied[0]);
        return Ok(pick.1.clone());
    }
    Err(tied)
}
