//! Generic method inference (JLS 18): reduction of compatibility constraints to bounds on
//! inference variables, incorporation of those bounds, and resolution.
//!
//! An [`InferenceContext`] is cheap to clone; callers that want to try a constraint and back out
//! on failure keep a copy and restore it.

use std::collections::HashMap;

use thiserror::Error;

use crate::java::helpers::instantiate_as_supertype;
use crate::lub::{lub_all, make_intersection};
use crate::subst::substitute;
use crate::subtyping::{
    boxed_class, is_loose_compatible, is_same_type, is_strict_compatible, is_subtype,
    is_unchecked_convertible,
};
use crate::{canonicalize_named, InferVarId, Type, TypeEnv, TypeVarId, WildcardBound};

/// Maximum number of reduction steps one context performs before giving up.
pub const DEFAULT_INFERENCE_STEP_LIMIT: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InferenceError {
    #[error("`{from:?}` is not compatible with `{to:?}`")]
    Incompatible { from: Type, to: Type },
    #[error("bounds of inference variable {0:?} cannot be satisfied")]
    Unsatisfiable(InferVarId),
    #[error("type inference exceeded its limit of {0} steps")]
    StepLimit(usize),
}

#[derive(Clone, Debug)]
enum Constraint {
    /// `‹from → to›` in a strict (`loose == false`) or loose invocation context.
    Compatible { from: Type, to: Type, loose: bool },
    Subtype(Type, Type),
    Equal(Type, Type),
    /// Type argument containment `‹S <= T›`.
    Contained(Type, Type),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BoundKind {
    Eq,
    Upper,
    Lower,
}

#[derive(Clone, Debug, Default)]
struct VarState {
    origin: Option<TypeVarId>,
    eq: Vec<Type>,
    upper: Vec<Type>,
    lower: Vec<Type>,
    instantiation: Option<Type>,
}

/// The result of replacing a generic member's type parameters by fresh inference variables.
#[derive(Clone, Debug, PartialEq)]
pub struct OpenedMember {
    pub vars: Vec<InferVarId>,
    pub subst: HashMap<TypeVarId, Type>,
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Clone, Debug)]
pub struct InferenceContext {
    vars: Vec<VarState>,
    pending: Vec<Constraint>,
    steps: usize,
    step_limit: usize,
}

impl Default for InferenceContext {
    fn default() -> Self {
        Self::with_step_limit(DEFAULT_INFERENCE_STEP_LIMIT)
    }
}

impl InferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step_limit(step_limit: usize) -> Self {
        Self {
            vars: Vec::new(),
            pending: Vec::new(),
            steps: 0,
            step_limit,
        }
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    pub fn fresh_var(&mut self, origin: Option<TypeVarId>) -> InferVarId {
        let id = InferVarId::from_idx(self.vars.len());
        self.vars.push(VarState {
            origin,
            ..VarState::default()
        });
        id
    }

    /// The declared type parameter an inference variable stands for.
    pub fn origin(&self, var: InferVarId) -> Option<TypeVarId> {
        self.vars.get(var.idx()).and_then(|v| v.origin)
    }

    /// Allocates one inference variable per type parameter and records the declared bounds
    /// (`T extends B` becomes `α <: B[T:=α]`). Returns the substitution `T -> α`.
    pub fn open_type_params(
        &mut self,
        env: &dyn TypeEnv,
        params: &[TypeVarId],
    ) -> HashMap<TypeVarId, Type> {
        self.open_type_params_in(env, params, &HashMap::new())
    }

    /// Like [`Self::open_type_params`], with `outer` applied to the bounds as well: the
    /// substitution of the receiver type a generic member is viewed through
    /// (`<K extends List<O>>` seen from `Scratch<T>` gets the bound `List<T>`).
    pub fn open_type_params_in(
        &mut self,
        env: &dyn TypeEnv,
        params: &[TypeVarId],
        outer: &HashMap<TypeVarId, Type>,
    ) -> HashMap<TypeVarId, Type> {
        let subst: HashMap<TypeVarId, Type> = params
            .iter()
            .map(|tp| (*tp, Type::Infer(self.fresh_var(Some(*tp)))))
            .collect();
        let mut bound_subst = outer.clone();
        bound_subst.extend(subst.iter().map(|(k, v)| (*k, v.clone())));
        let object = Type::class(env.well_known().object, vec![]);
        for tp in params {
            let Some(Type::Infer(var)) = subst.get(tp) else {
                continue;
            };
            let bounds = env
                .type_param(*tp)
                .map(|d| d.upper_bounds.clone())
                .unwrap_or_default();
            for bound in bounds {
                let bound = canonicalize_named(env, &bound);
                if bound == object {
                    continue;
                }
                let bound = substitute(&bound, &bound_subst);
                let state = &mut self.vars[var.idx()];
                if !state.upper.contains(&bound) {
                    state.upper.push(bound);
                }
            }
        }
        subst
    }

    pub fn open_member(
        &mut self,
        env: &dyn TypeEnv,
        type_params: &[TypeVarId],
        params: &[Type],
        return_type: &Type,
    ) -> OpenedMember {
        self.open_member_in(env, type_params, params, return_type, &HashMap::new())
    }

    /// Opens a member whose `params` and `return_type` are already viewed through the receiver
    /// substitution `outer`; the declared bounds of `type_params` get `outer` applied too.
    pub fn open_member_in(
        &mut self,
        env: &dyn TypeEnv,
        type_params: &[TypeVarId],
        params: &[Type],
        return_type: &Type,
        outer: &HashMap<TypeVarId, Type>,
    ) -> OpenedMember {
        let subst = self.open_type_params_in(env, type_params, outer);
        let vars = type_params
            .iter()
            .filter_map(|tp| match subst.get(tp) {
                Some(Type::Infer(v)) => Some(*v),
                _ => None,
            })
            .collect();
        OpenedMember {
            vars,
            params: params.iter().map(|p| substitute(p, &subst)).collect(),
            return_type: substitute(return_type, &subst),
            subst,
        }
    }

    /// Adds `‹from → to›`. On error the context is left in an unspecified state; keep a clone to
    /// roll back.
    pub fn add_compatible(
        &mut self,
        env: &dyn TypeEnv,
        from: &Type,
        to: &Type,
        loose: bool,
    ) -> Result<(), InferenceError> {
        self.add(
            env,
            Constraint::Compatible {
                from: from.clone(),
                to: to.clone(),
                loose,
            },
        )
    }

    pub fn add_subtype(
        &mut self,
        env: &dyn TypeEnv,
        sub: &Type,
        sup: &Type,
    ) -> Result<(), InferenceError> {
        self.add(env, Constraint::Subtype(sub.clone(), sup.clone()))
    }

    pub fn add_equal(&mut self, env: &dyn TypeEnv, a: &Type, b: &Type) -> Result<(), InferenceError> {
        self.add(env, Constraint::Equal(a.clone(), b.clone()))
    }

    pub fn is_resolved(&self, var: InferVarId) -> bool {
        self.vars
            .get(var.idx())
            .is_some_and(|v| v.instantiation.is_some())
    }

    pub fn instantiation(&self, var: InferVarId) -> Option<&Type> {
        self.vars.get(var.idx())?.instantiation.as_ref()
    }

    /// Resolves `vars` together with every variable they depend on.
    pub fn resolve(&mut self, env: &dyn TypeEnv, vars: &[InferVarId]) -> Result<(), InferenceError> {
        let mut targets: Vec<InferVarId> = Vec::new();
        for var in vars {
            for dep in self.dependency_closure(*var) {
                if !targets.contains(&dep) {
                    targets.push(dep);
                }
            }
        }

        loop {
            let unresolved: Vec<InferVarId> = targets
                .iter()
                .copied()
                .filter(|v| !self.is_resolved(*v))
                .collect();
            if unresolved.is_empty() {
                return Ok(());
            }

            if let Some((var, ty)) = unresolved
                .iter()
                .find_map(|v| self.proper_eq_bound(*v).map(|t| (*v, t)))
            {
                self.vars[var.idx()].instantiation = Some(ty);
                continue;
            }

            // The smallest set of mutually dependent variables is resolved next.
            let batch = unresolved
                .iter()
                .map(|v| self.dependency_closure(*v))
                .min_by_key(Vec::len)
                .unwrap_or_default();
            for var in batch {
                if self.proper_eq_bound(var).is_some() {
                    continue;
                }
                let candidate = self.candidate(env, var);
                tracing::trace!(?var, ?candidate, "resolving inference variable");
                self.add(env, Constraint::Equal(Type::Infer(var), candidate.clone()))
                    .map_err(|err| match err {
                        InferenceError::StepLimit(_) => err,
                        _ => InferenceError::Unsatisfiable(var),
                    })?;
                // Error types satisfy every constraint without producing a bound.
                if self.proper_eq_bound(var).is_none() {
                    self.vars[var.idx()].instantiation = Some(candidate);
                }
            }
        }
    }

    pub fn resolve_all(&mut self, env: &dyn TypeEnv) -> Result<(), InferenceError> {
        let all: Vec<InferVarId> = (0..self.vars.len()).map(InferVarId::from_idx).collect();
        self.resolve(env, &all)
    }

    /// Replaces resolved inference variables by their instantiation; unresolved ones are kept.
    pub fn instantiate(&self, ty: &Type) -> Type {
        if ty.is_proper() {
            return ty.clone();
        }
        ty.map(&mut |t| match t {
            Type::Infer(v) => self.instantiation(*v).cloned(),
            _ => None,
        })
    }

    /// Like [`Self::instantiate`], but unresolved variables become [`Type::Unknown`].
    pub fn instantiate_or_unknown(&self, ty: &Type) -> Type {
        if ty.is_proper() {
            return ty.clone();
        }
        ty.map(&mut |t| match t {
            Type::Infer(v) => Some(self.instantiation(*v).cloned().unwrap_or(Type::Unknown)),
            _ => None,
        })
    }

    fn add(&mut self, env: &dyn TypeEnv, constraint: Constraint) -> Result<(), InferenceError> {
        self.pending.push(constraint);
        while let Some(next) = self.pending.pop() {
            self.steps += 1;
            if self.steps > self.step_limit {
                self.pending.clear();
                tracing::debug!(limit = self.step_limit, "inference step limit exceeded");
                return Err(InferenceError::StepLimit(self.step_limit));
            }
            if let Err(err) = self.reduce(env, next) {
                self.pending.clear();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Tries each alternative on a copy of the context and keeps the first that succeeds.
    fn reduce_any(
        &mut self,
        env: &dyn TypeEnv,
        options: Vec<Constraint>,
        from: &Type,
        to: &Type,
    ) -> Result<(), InferenceError> {
        for option in options {
            let mut trial = self.clone();
            if trial.add(env, option).is_ok() {
                *self = trial;
                return Ok(());
            }
        }
        incompatible(from, to)
    }

    fn reduce(&mut self, env: &dyn TypeEnv, constraint: Constraint) -> Result<(), InferenceError> {
        match constraint {
            Constraint::Compatible { from, to, loose } => {
                let from = self.apply_proper_eqs(&from);
                let to = self.apply_proper_eqs(&to);
                self.reduce_compatible(env, from, to, loose)
            }
            Constraint::Subtype(s, t) => {
                let s = self.apply_proper_eqs(&s);
                let t = self.apply_proper_eqs(&t);
                self.reduce_subtype(env, s, t)
            }
            Constraint::Equal(s, t) => {
                let s = self.apply_proper_eqs(&s);
                let t = self.apply_proper_eqs(&t);
                self.reduce_equal(env, s, t)
            }
            Constraint::Contained(s, t) => {
                let s = self.apply_proper_eqs(&s);
                let t = self.apply_proper_eqs(&t);
                self.reduce_contained(env, s, t)
            }
        }
    }

    fn reduce_compatible(
        &mut self,
        env: &dyn TypeEnv,
        from: Type,
        to: Type,
        loose: bool,
    ) -> Result<(), InferenceError> {
        if from.is_errorish() || to.is_errorish() {
            return Ok(());
        }
        if from.is_proper() && to.is_proper() {
            let ok = if loose {
                is_loose_compatible(env, &from, &to)
            } else {
                is_strict_compatible(env, &from, &to) || is_unchecked_convertible(env, &from, &to)
            };
            return if ok { Ok(()) } else { incompatible(&from, &to) };
        }
        match (&from, &to) {
            (Type::Primitive(p), _) => {
                if !loose {
                    return incompatible(&from, &to);
                }
                self.pending
                    .push(Constraint::Subtype(boxed_class(env, *p), to.clone()));
                Ok(())
            }
            (_, Type::Primitive(p)) => {
                if !loose {
                    return incompatible(&from, &to);
                }
                self.pending
                    .push(Constraint::Equal(from.clone(), boxed_class(env, *p)));
                Ok(())
            }
            _ if is_unchecked_convertible(env, &from, &to) => Ok(()),
            _ => {
                self.pending.push(Constraint::Subtype(from.clone(), to.clone()));
                Ok(())
            }
        }
    }

    fn reduce_subtype(&mut self, env: &dyn TypeEnv, s: Type, t: Type) -> Result<(), InferenceError> {
        if s.is_errorish() || t.is_errorish() || s == t {
            return Ok(());
        }
        let s = canonicalize_named(env, &s);
        let t = canonicalize_named(env, &t);
        if s.is_proper() && t.is_proper() {
            return if is_subtype(env, &s, &t) {
                Ok(())
            } else {
                incompatible(&s, &t)
            };
        }

        match (&s, &t) {
            (Type::Infer(a), Type::Infer(b)) => {
                self.add_bound(*a, BoundKind::Upper, t.clone());
                self.add_bound(*b, BoundKind::Lower, s.clone());
                Ok(())
            }
            (Type::Infer(a), _) => {
                self.add_bound(*a, BoundKind::Upper, t.clone());
                Ok(())
            }
            (_, Type::Infer(b)) => {
                self.add_bound(*b, BoundKind::Lower, s.clone());
                Ok(())
            }
            (Type::Null, _) => Ok(()),
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => incompatible(&s, &t),
            (_, Type::Intersection(parts)) => {
                for part in parts {
                    self.pending.push(Constraint::Subtype(s.clone(), part.clone()));
                }
                Ok(())
            }
            (Type::Intersection(parts), _) => {
                let options = parts
                    .iter()
                    .map(|p| Constraint::Subtype(p.clone(), t.clone()))
                    .collect();
                self.reduce_any(env, options, &s, &t)
            }
            (_, Type::Class(target)) => {
                let Some(Type::Class(view)) = instantiate_as_supertype(env, &s, target.def) else {
                    return incompatible(&s, &t);
                };
                if target.args.is_empty() {
                    return Ok(());
                }
                if view.args.len() != target.args.len() {
                    return incompatible(&s, &t);
                }
                for (arg, formal) in view.args.iter().zip(&target.args) {
                    self.pending
                        .push(Constraint::Contained(arg.clone(), formal.clone()));
                }
                if let (Some(so), Some(to)) = (view.outer.as_deref(), target.outer.as_deref()) {
                    self.pending
                        .push(Constraint::Subtype(so.clone(), to.clone()));
                }
                Ok(())
            }
            (Type::Array(se), Type::Array(te)) => match (se.as_ref(), te.as_ref()) {
                (Type::Primitive(a), Type::Primitive(b)) if a == b => Ok(()),
                (Type::Primitive(_), _) | (_, Type::Primitive(_)) => incompatible(&s, &t),
                _ => {
                    self.pending
                        .push(Constraint::Subtype((**se).clone(), (**te).clone()));
                    Ok(())
                }
            },
            (_, Type::TypeVar(var)) => {
                match env.type_param(*var).and_then(|d| d.lower_bound.clone()) {
                    Some(lower) => {
                        self.pending.push(Constraint::Subtype(s.clone(), lower));
                        Ok(())
                    }
                    None => incompatible(&s, &t),
                }
            }
            _ => incompatible(&s, &t),
        }
    }

    fn reduce_contained(
        &mut self,
        env: &dyn TypeEnv,
        s: Type,
        t: Type,
    ) -> Result<(), InferenceError> {
        let object = || Type::class(env.well_known().object, vec![]);
        let next = match &t {
            Type::Wildcard(WildcardBound::Unbounded) => return Ok(()),
            Type::Wildcard(WildcardBound::Extends(upper)) => match &s {
                Type::Wildcard(WildcardBound::Extends(inner)) => {
                    Constraint::Subtype((**inner).clone(), (**upper).clone())
                }
                Type::Wildcard(WildcardBound::Unbounded) => {
                    Constraint::Subtype(object(), (**upper).clone())
                }
                Type::Wildcard(WildcardBound::Super(_)) => {
                    Constraint::Equal(object(), (**upper).clone())
                }
                _ => Constraint::Subtype(s.clone(), (**upper).clone()),
            },
            Type::Wildcard(WildcardBound::Super(lower)) => match &s {
                Type::Wildcard(WildcardBound::Super(inner)) => {
                    Constraint::Subtype((**lower).clone(), (**inner).clone())
                }
                Type::Wildcard(_) => return incompatible(&s, &t),
                _ => Constraint::Subtype((**lower).clone(), s.clone()),
            },
            _ => {
                if s.is_wildcard() {
                    return incompatible(&s, &t);
                }
                Constraint::Equal(s.clone(), t.clone())
            }
        };
        self.pending.push(next);
        Ok(())
    }

    fn reduce_equal(&mut self, env: &dyn TypeEnv, s: Type, t: Type) -> Result<(), InferenceError> {
        if s.is_errorish() || t.is_errorish() || s == t {
            return Ok(());
        }
        let s = canonicalize_named(env, &s);
        let t = canonicalize_named(env, &t);
        if s.is_proper() && t.is_proper() {
            return if is_same_type(env, &s, &t) {
                Ok(())
            } else {
                incompatible(&s, &t)
            };
        }

        match (&s, &t) {
            (Type::Infer(a), Type::Infer(b)) => {
                self.add_bound(*a, BoundKind::Eq, t.clone());
                self.add_bound(*b, BoundKind::Eq, s.clone());
            }
            (Type::Infer(a), _) => self.add_bound(*a, BoundKind::Eq, t.clone()),
            (_, Type::Infer(b)) => self.add_bound(*b, BoundKind::Eq, s.clone()),
            (Type::Class(x), Type::Class(y))
                if x.def == y.def && x.args.len() == y.args.len() =>
            {
                for (a, b) in x.args.iter().zip(&y.args) {
                    self.pending.push(Constraint::Equal(a.clone(), b.clone()));
                }
                if let (Some(a), Some(b)) = (x.outer.as_deref(), y.outer.as_deref()) {
                    self.pending.push(Constraint::Equal(a.clone(), b.clone()));
                }
            }
            (Type::Array(a), Type::Array(b)) => {
                self.pending
                    .push(Constraint::Equal((**a).clone(), (**b).clone()));
            }
            (Type::Wildcard(a), Type::Wildcard(b)) => {
                let object = Type::class(env.well_known().object, vec![]);
                let next = match (a, b) {
                    (WildcardBound::Extends(p), WildcardBound::Extends(q))
                    | (WildcardBound::Super(p), WildcardBound::Super(q)) => {
                        Constraint::Equal((**p).clone(), (**q).clone())
                    }
                    (WildcardBound::Unbounded, WildcardBound::Extends(q))
                    | (WildcardBound::Extends(q), WildcardBound::Unbounded) => {
                        Constraint::Equal(object, (**q).clone())
                    }
                    _ => return incompatible(&s, &t),
                };
                self.pending.push(next);
            }
            (Type::Intersection(xs), Type::Intersection(ys)) if xs.len() == ys.len() => {
                for (a, b) in xs.iter().zip(ys) {
                    self.pending.push(Constraint::Equal(a.clone(), b.clone()));
                }
            }
            _ => return incompatible(&s, &t),
        }
        Ok(())
    }

    /// Records a bound and queues the constraints implied by combining it with the existing
    /// bounds of the same variable.
    fn add_bound(&mut self, var: InferVarId, kind: BoundKind, ty: Type) {
        if ty == Type::Infer(var) {
            return;
        }
        let state = &self.vars[var.idx()];
        let existing = match kind {
            BoundKind::Eq => &state.eq,
            BoundKind::Upper => &state.upper,
            BoundKind::Lower => &state.lower,
        };
        if existing.contains(&ty) {
            return;
        }

        let mut implied = Vec::new();
        match kind {
            BoundKind::Eq => {
                implied.extend(state.eq.iter().map(|e| Constraint::Equal(ty.clone(), e.clone())));
                implied.extend(
                    state
                        .upper
                        .iter()
                        .map(|u| Constraint::Subtype(ty.clone(), u.clone())),
                );
                implied.extend(
                    state
                        .lower
                        .iter()
                        .map(|l| Constraint::Subtype(l.clone(), ty.clone())),
                );
            }
            BoundKind::Upper => {
                implied.extend(
                    state
                        .eq
                        .iter()
                        .map(|e| Constraint::Subtype(e.clone(), ty.clone())),
                );
                implied.extend(
                    state
                        .lower
                        .iter()
                        .map(|l| Constraint::Subtype(l.clone(), ty.clone())),
                );
                // `α <: G<S>` and `α <: G<T>` with non-wildcard arguments imply `S = T`.
                if let Type::Class(new) = &ty {
                    for other in &state.upper {
                        let Type::Class(other) = other else {
                            continue;
                        };
                        if other.def != new.def
                            || other.args.len() != new.args.len()
                            || other.args.iter().chain(&new.args).any(Type::is_wildcard)
                        {
                            continue;
                        }
                        implied.extend(
                            other
                                .args
                                .iter()
                                .zip(&new.args)
                                .map(|(a, b)| Constraint::Equal(a.clone(), b.clone())),
                        );
                    }
                }
            }
            BoundKind::Lower => {
                implied.extend(
                    state
                        .eq
                        .iter()
                        .map(|e| Constraint::Subtype(ty.clone(), e.clone())),
                );
                implied.extend(
                    state
                        .upper
                        .iter()
                        .map(|u| Constraint::Subtype(ty.clone(), u.clone())),
                );
            }
        }

        if kind == BoundKind::Eq && ty.is_proper() {
            implied.extend(self.substitute_into_other_bounds(var, &ty));
        }

        let state = &mut self.vars[var.idx()];
        match kind {
            BoundKind::Eq => state.eq.push(ty),
            BoundKind::Upper => state.upper.push(ty),
            BoundKind::Lower => state.lower.push(ty),
        }
        self.pending.extend(implied);
    }

    /// `α = T` turns every bound of another variable that mentions `α` into a bound on `T`.
    fn substitute_into_other_bounds(&self, var: InferVarId, with: &Type) -> Vec<Constraint> {
        let mentions = |t: &Type| t.any(&mut |inner| *inner == Type::Infer(var));
        let replace = |t: &Type| {
            t.map(&mut |inner| match inner {
                Type::Infer(v) if *v == var => Some(with.clone()),
                _ => None,
            })
        };
        let mut out = Vec::new();
        for (idx, state) in self.vars.iter().enumerate() {
            if idx == var.idx() {
                continue;
            }
            let other = Type::Infer(InferVarId::from_idx(idx));
            for b in state.eq.iter().filter(|b| mentions(b)) {
                out.push(Constraint::Equal(other.clone(), replace(b)));
            }
            for b in state.upper.iter().filter(|b| mentions(b)) {
                out.push(Constraint::Subtype(other.clone(), replace(b)));
            }
            for b in state.lower.iter().filter(|b| mentions(b)) {
                out.push(Constraint::Subtype(replace(b), other.clone()));
            }
        }
        out
    }

    fn proper_eq_bound(&self, var: InferVarId) -> Option<Type> {
        let state = self.vars.get(var.idx())?;
        state
            .instantiation
            .clone()
            .or_else(|| state.eq.iter().find(|t| t.is_proper()).cloned())
    }

    fn apply_proper_eqs(&self, ty: &Type) -> Type {
        if ty.is_proper() {
            return ty.clone();
        }
        ty.map(&mut |t| match t {
            Type::Infer(v) => self.proper_eq_bound(*v),
            _ => None,
        })
    }

    /// `var` plus every unresolved variable reachable through bounds, in discovery order.
    fn dependency_closure(&self, var: InferVarId) -> Vec<InferVarId> {
        let mut out = vec![var];
        let mut i = 0;
        while i < out.len() {
            let current = out[i];
            i += 1;
            let Some(state) = self.vars.get(current.idx()) else {
                continue;
            };
            if state.instantiation.is_some() {
                continue;
            }
            let mut mentioned = Vec::new();
            for bound in state.eq.iter().chain(&state.upper).chain(&state.lower) {
                bound.collect_infer_vars(&mut mentioned);
            }
            // Bounds are stored on one side only for var/proper pairs; look the other way too.
            for (idx, other) in self.vars.iter().enumerate() {
                let mentions_current = other
                    .eq
                    .iter()
                    .chain(&other.upper)
                    .chain(&other.lower)
                    .any(|b| b.any(&mut |t| *t == Type::Infer(current)));
                if mentions_current {
                    mentioned.push(InferVarId::from_idx(idx));
                }
            }
            for dep in mentioned {
                if !out.contains(&dep) && !self.is_resolved(dep) {
                    out.push(dep);
                }
            }
        }
        out
    }

    /// Resolution candidate from proper bounds: `lub` of the lower bounds, otherwise `glb` of the
    /// upper bounds, otherwise `Object`.
    fn candidate(&self, env: &dyn TypeEnv, var: InferVarId) -> Type {
        let object = Type::class(env.well_known().object, vec![]);
        let Some(state) = self.vars.get(var.idx()) else {
            return object;
        };
        let lowers: Vec<Type> = state
            .lower
            .iter()
            .filter(|t| t.is_proper() && !matches!(t, Type::Null))
            .cloned()
            .collect();
        if !lowers.is_empty() {
            return lub_all(env, &lowers);
        }
        let uppers: Vec<Type> = state
            .upper
            .iter()
            .filter(|t| t.is_proper())
            .cloned()
            .collect();
        if !uppers.is_empty() {
            return make_intersection(env, uppers);
        }
        object
    }
}

fn incompatible(from: &Type, to: &Type) -> Result<(), InferenceError> {
    Err(InferenceError::Incompatible {
        from: from.clone(),
        to: to.clone(),
    })
}
