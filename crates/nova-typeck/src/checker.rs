//! Expression typing for one body.
//!
//! Standalone expressions are typed bottom-up. Poly expressions (generic method calls whose
//! result depends on their type arguments, diamond `new`, lambdas and method references) are
//! typed in an [`InferenceSession`]: the outermost call, every nested poly argument and every
//! deferred functional argument share one [`InferenceContext`], so a `Collectors.toList()` buried
//! in `collect(..)` learns its element type from the stream it is collecting.

use std::collections::HashMap;

use nova_types::{
    class_type_subst, expand_params, format_method_signature, format_type,
    instantiate_as_supertype, is_assignable, is_loose_compatible, lub,
    non_wildcard_parameterization, resolve_constructor, resolve_method_call, sam_signature,
    substitute, unboxed_primitive, upward_projection, CallKind, ClassType, ConstructorCall,
    Diagnostic, InferVarId, InferenceContext, InferenceError, InvocationPhase, MemberRef,
    MethodCall, MethodResolution, PrimitiveType, ResolvedMethod, SamSignature, Severity, Span,
    TyContext, Type, TypeEnv, TypeParamDef, TypeStore, TypeVarId, TypeWarning, UncheckedReason,
    WildcardBound,
};
use rayon::prelude::*;

use crate::config::TypeckConfig;
use crate::hir::{
    BinaryOp, Body, Expr, ExprId, LambdaBody, LiteralKind, LocalId, LocalTy, Stmt, StmtId,
    UnaryOp,
};

/// Everything the checker learned about one body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyTypeckResult {
    pub expr_types: Vec<Type>,
    pub local_types: Vec<Type>,
    /// Per expression: the invoked method or constructor of calls, `new` and method references.
    pub call_resolutions: Vec<Option<ResolvedMethod>>,
    /// Per expression: the function type lambdas and method references were checked against.
    pub functional_methods: Vec<Option<SamSignature>>,
    pub diagnostics: Vec<Diagnostic>,
    /// Capture variables allocated while checking; the types above may mention them.
    pub captures: Vec<TypeParamDef>,
}

static UNKNOWN: Type = Type::Unknown;

impl BodyTypeckResult {
    pub fn type_of(&self, expr: ExprId) -> &Type {
        self.expr_types.get(expr.idx()).unwrap_or(&UNKNOWN)
    }

    pub fn local_type(&self, local: LocalId) -> &Type {
        self.local_types.get(local.idx()).unwrap_or(&UNKNOWN)
    }

    pub fn resolved_call(&self, expr: ExprId) -> Option<&ResolvedMethod> {
        self.call_resolutions.get(expr.idx())?.as_ref()
    }

    pub fn functional_method(&self, expr: ExprId) -> Option<&SamSignature> {
        self.functional_methods.get(expr.idx())?.as_ref()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    /// A typing environment that knows this body's capture variables.
    pub fn env<'a>(&self, base: &'a dyn TypeEnv) -> TyContext<'a> {
        TyContext::with_captures(base, self.captures.clone())
    }

    pub fn display_type(&self, base: &dyn TypeEnv, ty: &Type) -> String {
        format_type(&self.env(base), ty)
    }
}

/// Types one body against `env`.
pub fn check_body(env: &dyn TypeEnv, body: &Body, config: &TypeckConfig) -> BodyTypeckResult {
    let _span = tracing::debug_span!(
        target: "nova.typeck",
        "check_body",
        exprs = body.exprs.len(),
        locals = body.locals.len()
    )
    .entered();
    let mut checker = BodyChecker::new(env, body, config);
    checker.check_params();
    checker.check_stmt(body.root);
    let result = checker.finish();
    tracing::debug!(
        target: "nova.typeck",
        diagnostics = result.diagnostics.len(),
        "checked body"
    );
    result
}

/// Types independent bodies in parallel over one shared store.
pub fn check_bodies(
    store: &TypeStore,
    bodies: &[Body],
    config: &TypeckConfig,
) -> Vec<BodyTypeckResult> {
    bodies
        .par_iter()
        .map(|body| check_body(store, body, config))
        .collect()
}

/// Overload selection for a call or `new`, made once per expression.
#[derive(Debug, Clone)]
struct CallSite {
    method: Option<ResolvedMethod>,
    args: Vec<ExprId>,
    diamond: bool,
    explicit_type_args: bool,
}

/// A generic member with its type parameters still declared: the input to opening it in a
/// session.
struct DeclaredView {
    type_params: Vec<TypeVarId>,
    params: Vec<Type>,
    return_type: Type,
    bound_subst: HashMap<TypeVarId, Type>,
}

struct OpenedSite {
    expr: ExprId,
    method: ResolvedMethod,
    type_args: Vec<Type>,
    formals: Vec<Type>,
    params: Vec<Type>,
    return_type: Type,
}

#[derive(Clone)]
struct Deferred {
    expr: ExprId,
    target: Type,
}

/// One poly expression being inferred.
struct InferenceSession {
    ic: InferenceContext,
    sites: Vec<OpenedSite>,
    deferred: Vec<Deferred>,
    /// Deferred expressions that could not be checked against their target.
    rejected: Vec<ExprId>,
    conditionals: Vec<(ExprId, Type)>,
    failure: Option<InferenceError>,
}

impl InferenceSession {
    fn new(step_limit: usize) -> Self {
        Self {
            ic: InferenceContext::with_step_limit(step_limit),
            sites: Vec::new(),
            deferred: Vec::new(),
            rejected: Vec::new(),
            conditionals: Vec::new(),
            failure: None,
        }
    }

    fn fail(&mut self, err: InferenceError) {
        if self.failure.is_none() {
            tracing::debug!(target: "nova.typeck", %err, "inference session failed");
            self.failure = Some(err);
        }
    }

    fn add_compatible(&mut self, env: &dyn TypeEnv, from: &Type, to: &Type, loose: bool) {
        if self.failure.is_some() {
            return;
        }
        if matches!(from, Type::Void) {
            self.fail(InferenceError::Incompatible {
                from: from.clone(),
                to: to.clone(),
            });
            return;
        }
        if let Err(err) = self.ic.add_compatible(env, from, to, loose) {
            self.fail(err);
        }
    }

    fn instantiate(&self, ty: &Type) -> Type {
        self.ic.instantiate_or_unknown(ty)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ReturnKind {
    Void,
    Value,
    /// The lambda has no usable target; returns are typed but not checked.
    Unchecked,
}

struct LambdaReturns {
    kind: ReturnKind,
    expected: Option<Type>,
    exprs: Vec<ExprId>,
}

struct BodyChecker<'a> {
    body: &'a Body,
    config: &'a TypeckConfig,
    ctx: TyContext<'a>,
    expr_types: Vec<Option<Type>>,
    local_types: Vec<Option<Type>>,
    sites: Vec<Option<CallSite>>,
    call_resolutions: Vec<Option<ResolvedMethod>>,
    functional_methods: Vec<Option<SamSignature>>,
    diagnostics: Vec<Diagnostic>,
    lambda_returns: Vec<LambdaReturns>,
}

impl<'a> BodyChecker<'a> {
    fn new(env: &'a dyn TypeEnv, body: &'a Body, config: &'a TypeckConfig) -> Self {
        let exprs = body.exprs.len();
        Self {
            body,
            config,
            ctx: TyContext::new(env),
            expr_types: vec![None; exprs],
            local_types: vec![None; body.locals.len()],
            sites: vec![None; exprs],
            call_resolutions: vec![None; exprs],
            functional_methods: vec![None; exprs],
            diagnostics: Vec::new(),
            lambda_returns: Vec::new(),
        }
    }

    fn finish(self) -> BodyTypeckResult {
        BodyTypeckResult {
            expr_types: self
                .expr_types
                .into_iter()
                .map(|t| t.unwrap_or(Type::Unknown))
                .collect(),
            local_types: self
                .local_types
                .into_iter()
                .map(|t| t.unwrap_or(Type::Unknown))
                .collect(),
            call_resolutions: self.call_resolutions,
            functional_methods: self.functional_methods,
            diagnostics: self.diagnostics,
            captures: self.ctx.into_captures(),
        }
    }

    fn error(&mut self, code: &'static str, message: String, span: Span) {
        tracing::trace!(target: "nova.typeck", code, %message, "diagnostic");
        self.diagnostics
            .push(Diagnostic::error(code, message, Some(span)));
    }

    fn expr_range(&self, expr: ExprId) -> Span {
        self.body.exprs[expr].range()
    }

    fn fmt(&self, ty: &Type) -> String {
        format_type(&self.ctx, ty)
    }

    fn local_type(&self, local: LocalId) -> Type {
        self.local_types[local.idx()]
            .clone()
            .unwrap_or(Type::Unknown)
    }

    fn capture(&mut self, ty: &Type) -> Type {
        match ty {
            Type::Class(ct) if ct.args.iter().any(Type::is_wildcard) => {
                self.ctx.capture_conversion(ty)
            }
            _ => ty.clone(),
        }
    }

    fn check_params(&mut self) {
        let body = self.body;
        for param in &body.params {
            let ty = match &body.locals[*param].ty {
                LocalTy::Declared(ty) => ty.clone(),
                LocalTy::Var | LocalTy::Implicit => Type::Unknown,
            };
            self.local_types[param.idx()] = Some(ty);
        }
    }

    fn check_assignable(&mut self, from: &Type, to: &Type, span: Span) {
        if from.is_errorish() || to.is_errorish() || is_assignable(&self.ctx, from, to) {
            return;
        }
        let message = format!(
            "incompatible types: `{}` cannot be converted to `{}`",
            self.fmt(from),
            self.fmt(to)
        );
        self.error("incompatible-types", message, span);
    }

    fn check_condition(&mut self, condition: ExprId) {
        let boolean = Type::boolean();
        let ty = self.infer_expr_with_expected(condition, Some(&boolean));
        self.check_assignable(&ty, &boolean, self.expr_range(condition));
    }

    // Statements.

    fn check_stmt(&mut self, stmt: StmtId) {
        let body = self.body;
        match &body.stmts[stmt] {
            Stmt::Block { statements, .. } => {
                for stmt in statements {
                    self.check_stmt(*stmt);
                }
            }
            Stmt::Let {
                local,
                initializer,
                range,
            } => self.check_let(*local, *initializer, *range),
            Stmt::Expr { expr, .. } => {
                self.infer_expr(*expr);
            }
            Stmt::Return { expr, range } => self.check_return(*expr, *range),
            Stmt::ForEach {
                local,
                iterable,
                body: loop_body,
                range,
            } => {
                self.check_foreach(*local, *iterable, *range);
                self.check_stmt(*loop_body);
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.check_condition(*condition);
                self.check_stmt(*then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_stmt(*else_branch);
                }
            }
            Stmt::Empty { .. } => {}
        }
    }

    fn check_let(&mut self, local: LocalId, initializer: Option<ExprId>, range: Span) {
        let body = self.body;
        let ty = match &body.locals[local].ty {
            LocalTy::Declared(declared) => {
                if let Some(init) = initializer {
                    let init_ty = self.infer_expr_with_expected(init, Some(declared));
                    self.check_assignable(&init_ty, declared, self.expr_range(init));
                }
                declared.clone()
            }
            LocalTy::Var => self.infer_var_local(local, initializer, range),
            LocalTy::Implicit => match initializer {
                Some(init) => self.infer_expr(init),
                None => Type::Unknown,
            },
        };
        self.local_types[local.idx()] = Some(ty);
    }

    /// `var x = init;`: the upward projection of the initializer type.
    fn infer_var_local(&mut self, local: LocalId, initializer: Option<ExprId>, range: Span) -> Type {
        let body = self.body;
        let name = &body.locals[local].name;
        if !self.config.var_enabled() {
            if let Some(init) = initializer {
                self.infer_expr(init);
            }
            let message = if self.config.release < 10 {
                format!(
                    "`var` is not supported at release {} (use release 10 or later)",
                    self.config.release
                )
            } else {
                "`var` type inference is disabled".to_owned()
            };
            self.error("var-not-supported", message, range);
            return Type::Error;
        }
        let Some(init) = initializer else {
            self.error(
                "var-without-initializer",
                format!("cannot infer type for local variable `{name}` (cannot use `var` on variable without initializer)"),
                range,
            );
            return Type::Error;
        };
        match &body.exprs[init] {
            Expr::Lambda { .. } => {
                self.type_functional_without_target(init);
                self.error(
                    "var-lambda-initializer",
                    format!("cannot infer type for local variable `{name}` (lambda expression needs an explicit target-type)"),
                    range,
                );
                return Type::Error;
            }
            Expr::MethodRef { .. } => {
                self.type_functional_without_target(init);
                self.error(
                    "var-lambda-initializer",
                    format!("cannot infer type for local variable `{name}` (method reference needs an explicit target-type)"),
                    range,
                );
                return Type::Error;
            }
            _ => {}
        }

        let ty = self.infer_expr(init);
        match ty {
            Type::Null => {
                self.error(
                    "var-null-initializer",
                    format!("cannot infer type for local variable `{name}` (variable initializer is 'null')"),
                    range,
                );
                Type::Error
            }
            Type::Void => {
                self.error(
                    "var-void-initializer",
                    format!("cannot infer type for local variable `{name}` (variable initializer is 'void')"),
                    range,
                );
                Type::Error
            }
            ty if ty.is_errorish() => Type::Unknown,
            ty => upward_projection(&self.ctx, &ty),
        }
    }

    fn check_foreach(&mut self, local: LocalId, iterable: ExprId, range: Span) {
        let body = self.body;
        let iterable_ty = self.infer_expr(iterable);
        let elem = self.foreach_element_type(&iterable_ty, self.expr_range(iterable));
        let ty = match &body.locals[local].ty {
            LocalTy::Declared(declared) => {
                self.check_assignable(&elem, declared, range);
                declared.clone()
            }
            LocalTy::Var if !self.config.var_enabled() => {
                self.error(
                    "var-not-supported",
                    format!("`var` is not supported at release {}", self.config.release),
                    range,
                );
                Type::Error
            }
            LocalTy::Var => upward_projection(&self.ctx, &elem),
            LocalTy::Implicit => elem,
        };
        self.local_types[local.idx()] = Some(ty);
    }

    /// The element type of a for-each iterable, computed on the captured iterable type.
    fn foreach_element_type(&mut self, iterable: &Type, span: Span) -> Type {
        match iterable {
            Type::Array(elem) => return (**elem).clone(),
            ty if ty.is_errorish() => return Type::Unknown,
            _ => {}
        }
        let captured = self.capture(iterable);
        let iterable_id = self.ctx.well_known().iterable;
        match instantiate_as_supertype(&self.ctx, &captured, iterable_id) {
            Some(Type::Class(ct)) => ct
                .args
                .first()
                .cloned()
                .unwrap_or_else(|| Type::class(self.ctx.well_known().object, vec![])),
            _ => {
                let message = format!(
                    "for-each not applicable to expression type `{}`",
                    self.fmt(iterable)
                );
                self.error("foreach-not-iterable", message, span);
                Type::Error
            }
        }
    }

    fn check_return(&mut self, expr: Option<ExprId>, range: Span) {
        let (kind, expected) = match self.lambda_returns.last() {
            Some(frame) => (frame.kind, frame.expected.clone()),
            None => {
                let rt = self.body.return_type.clone();
                if matches!(rt, Type::Void) {
                    (ReturnKind::Void, None)
                } else {
                    (ReturnKind::Value, Some(rt))
                }
            }
        };
        match (expr, kind) {
            (Some(expr), ReturnKind::Void) => {
                self.infer_expr(expr);
                self.error(
                    "unexpected-return-value",
                    "incompatible types: unexpected return value".to_owned(),
                    range,
                );
            }
            (Some(expr), _) => {
                let ty = self.infer_expr_with_expected(expr, expected.as_ref());
                if let Some(expected) = &expected {
                    self.check_assignable(&ty, expected, self.expr_range(expr));
                }
                if let Some(frame) = self.lambda_returns.last_mut() {
                    frame.exprs.push(expr);
                }
            }
            (None, ReturnKind::Value) => {
                self.error(
                    "missing-return-value",
                    "incompatible types: missing return value".to_owned(),
                    range,
                );
            }
            (None, _) => {}
        }
    }

    // Expressions.

    fn infer_expr(&mut self, expr: ExprId) -> Type {
        self.infer_expr_with_expected(expr, None)
    }

    /// Types `expr`, using `expected` as the target of poly expressions. Each expression is typed
    /// once; later requests return the recorded type.
    fn infer_expr_with_expected(&mut self, expr: ExprId, expected: Option<&Type>) -> Type {
        if let Some(ty) = &self.expr_types[expr.idx()] {
            return ty.clone();
        }
        let expected = expected.filter(|t| t.is_proper() && !t.is_errorish());
        let body = self.body;
        let ty = match &body.exprs[expr] {
            Expr::Literal { kind, .. } => self.literal_type(*kind),
            Expr::Null { .. } => Type::Null,
            Expr::Local { local, .. } => self.local_type(*local),
            Expr::This { range } => match &body.this_type {
                Some(ty) => ty.clone(),
                None => {
                    self.error(
                        "this-in-static-context",
                        "non-static variable `this` cannot be referenced from a static context"
                            .to_owned(),
                        *range,
                    );
                    Type::Error
                }
            },
            Expr::TypeRef { ty, .. } => ty.clone(),
            Expr::Name { name, range } => self.infer_name(name, *range),
            Expr::FieldAccess {
                receiver,
                name,
                range,
            } => self.infer_field_access(*receiver, name, *range),
            Expr::Call { .. } | Expr::New { .. } => self.infer_call(expr, expected),
            Expr::NewArray {
                elem,
                dims,
                extra_dims,
                initializer,
                ..
            } => self.infer_new_array(elem, dims, *extra_dims, initializer.as_deref()),
            Expr::ArrayAccess { array, index, range } => {
                self.infer_array_access(*array, *index, *range)
            }
            Expr::Lambda { range, .. } | Expr::MethodRef { range, .. } => match expected {
                Some(target) => self.infer_functional(expr, target),
                None => {
                    self.type_functional_without_target(expr);
                    self.error(
                        "missing-target-type",
                        "lambda expression or method reference is not expected here".to_owned(),
                        *range,
                    );
                    Type::Unknown
                }
            },
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => self.infer_conditional(*condition, *then_expr, *else_expr, expected),
            Expr::Binary { op, lhs, rhs, range } => self.infer_binary(*op, *lhs, *rhs, *range),
            Expr::Unary { op, expr: operand, range } => self.infer_unary(*op, *operand, *range),
            Expr::Assign { lhs, rhs, .. } => {
                let lhs_ty = self.infer_expr(*lhs);
                let target = (!lhs_ty.is_errorish()).then_some(&lhs_ty);
                let rhs_ty = self.infer_expr_with_expected(*rhs, target);
                self.check_assignable(&rhs_ty, &lhs_ty, self.expr_range(*rhs));
                lhs_ty
            }
            Expr::Cast { ty, expr: operand, .. } => {
                if body.exprs[*operand].is_functional() {
                    self.infer_expr_with_expected(*operand, Some(ty));
                } else {
                    self.infer_expr(*operand);
                }
                ty.clone()
            }
            Expr::Missing { .. } => Type::Unknown,
        };
        self.expr_types[expr.idx()] = Some(ty.clone());
        ty
    }

    fn literal_type(&self, kind: LiteralKind) -> Type {
        match kind {
            LiteralKind::Int => Type::Primitive(PrimitiveType::Int),
            LiteralKind::Long => Type::Primitive(PrimitiveType::Long),
            LiteralKind::Float => Type::Primitive(PrimitiveType::Float),
            LiteralKind::Double => Type::Primitive(PrimitiveType::Double),
            LiteralKind::Char => Type::Primitive(PrimitiveType::Char),
            LiteralKind::Bool => Type::Primitive(PrimitiveType::Boolean),
            LiteralKind::String => Type::class(self.ctx.well_known().string, vec![]),
        }
    }

    fn infer_name(&mut self, name: &str, range: Span) -> Type {
        let body = self.body;
        let (owner, kind) = match (&body.this_type, &body.owner) {
            (Some(this), _) => (this.clone(), CallKind::Instance),
            (None, Some(owner)) => (owner.clone(), CallKind::Static),
            (None, None) => {
                self.error(
                    "unresolved-name",
                    format!("cannot find symbol `{name}`"),
                    range,
                );
                return Type::Error;
            }
        };
        match self.ctx.resolve_field(&owner, name, kind) {
            Some(field) => field.ty,
            None => {
                self.error(
                    "unresolved-name",
                    format!("cannot find symbol `{name}`"),
                    range,
                );
                Type::Error
            }
        }
    }

    fn infer_field_access(&mut self, receiver: ExprId, name: &str, range: Span) -> Type {
        let body = self.body;
        let kind = match &body.exprs[receiver] {
            Expr::TypeRef { .. } => CallKind::Static,
            _ => CallKind::Instance,
        };
        let receiver_ty = self.infer_expr(receiver);
        if receiver_ty.is_errorish() {
            return Type::Unknown;
        }
        match self.ctx.resolve_field(&receiver_ty, name, kind) {
            Some(field) => field.ty,
            None => {
                let message = format!(
                    "cannot find field `{name}` in `{}`",
                    self.fmt(&receiver_ty)
                );
                self.error("unresolved-field", message, range);
                Type::Error
            }
        }
    }

    fn infer_new_array(
        &mut self,
        elem: &Type,
        dims: &[ExprId],
        extra_dims: usize,
        initializer: Option<&[ExprId]>,
    ) -> Type {
        let int = Type::int();
        for dim in dims {
            let ty = self.infer_expr_with_expected(*dim, Some(&int));
            if !ty.is_errorish() && !matches!(promote_unary(&self.ctx, &ty), Some(PrimitiveType::Int)) {
                let message = format!(
                    "incompatible types: `{}` cannot be used as an array dimension",
                    self.fmt(&ty)
                );
                self.error("incompatible-types", message, self.expr_range(*dim));
            }
        }
        let depth = (dims.len() + extra_dims).max(1);
        let mut ty = elem.clone();
        for _ in 0..depth {
            ty = Type::array(ty);
        }
        if let (Some(elements), Type::Array(component)) = (initializer, &ty) {
            let component = (**component).clone();
            for element in elements {
                let element_ty = self.infer_expr_with_expected(*element, Some(&component));
                self.check_assignable(&element_ty, &component, self.expr_range(*element));
            }
        }
        ty
    }

    fn infer_array_access(&mut self, array: ExprId, index: ExprId, range: Span) -> Type {
        let array_ty = self.infer_expr(array);
        let int = Type::int();
        let index_ty = self.infer_expr_with_expected(index, Some(&int));
        self.check_assignable(&index_ty, &int, self.expr_range(index));
        match array_ty {
            Type::Array(elem) => *elem,
            ty if ty.is_errorish() => Type::Unknown,
            ty => {
                let message = format!("array required, but `{}` found", self.fmt(&ty));
                self.error("not-an-array", message, range);
                Type::Error
            }
        }
    }

    fn infer_conditional(
        &mut self,
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        expected: Option<&Type>,
    ) -> Type {
        self.check_condition(condition);
        let body = self.body;
        let functional_branch =
            body.exprs[then_expr].is_functional() || body.exprs[else_expr].is_functional();
        // A reference conditional in an assignment or invocation context is a poly expression:
        // both branches are checked against the target.
        if let Some(target) = expected.filter(|t| t.is_reference()) {
            if functional_branch {
                let then_ty = self.infer_expr_with_expected(then_expr, Some(target));
                let else_ty = self.infer_expr_with_expected(else_expr, Some(target));
                self.check_assignable(&then_ty, target, self.expr_range(then_expr));
                self.check_assignable(&else_ty, target, self.expr_range(else_expr));
                return target.clone();
            }
        }
        let then_ty = self.infer_expr_with_expected(then_expr, expected);
        let else_ty = self.infer_expr_with_expected(else_expr, expected);
        self.conditional_type(&then_ty, &else_ty)
    }

    /// JLS 15.25 for standalone conditionals.
    fn conditional_type(&self, a: &Type, b: &Type) -> Type {
        if a.is_errorish() || b.is_errorish() {
            return Type::Unknown;
        }
        if a == b {
            return a.clone();
        }
        let env: &dyn TypeEnv = &self.ctx;
        match (a, b) {
            (Type::Null, Type::Primitive(p)) | (Type::Primitive(p), Type::Null) => {
                return Type::class(env.well_known().boxed(*p), vec![]);
            }
            (Type::Null, other) | (other, Type::Null) => return other.clone(),
            _ => {}
        }
        if let (Some(pa), Some(pb)) = (unboxed(env, a), unboxed(env, b)) {
            if pa == PrimitiveType::Boolean && pb == PrimitiveType::Boolean {
                return Type::boolean();
            }
            if let Some(p) = promote_binary(pa, pb) {
                return Type::Primitive(p);
            }
        }
        let boxed = |ty: &Type| match ty {
            Type::Primitive(p) => Type::class(env.well_known().boxed(*p), vec![]),
            other => other.clone(),
        };
        lub(env, &boxed(a), &boxed(b))
    }

    fn infer_binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId, range: Span) -> Type {
        let lhs_ty = self.infer_expr(lhs);
        let rhs_ty = self.infer_expr(rhs);
        let string = Type::class(self.ctx.well_known().string, vec![]);
        match op {
            BinaryOp::Eq | BinaryOp::Ne => return Type::boolean(),
            _ if lhs_ty.is_errorish() || rhs_ty.is_errorish() => {
                return match op {
                    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::And
                    | BinaryOp::Or => Type::boolean(),
                    _ => Type::Unknown,
                };
            }
            BinaryOp::Add if lhs_ty == string || rhs_ty == string => return string,
            _ => {}
        }

        let env: &dyn TypeEnv = &self.ctx;
        let (lp, rp) = (unboxed(env, &lhs_ty), unboxed(env, &rhs_ty));
        let result = match op {
            BinaryOp::And | BinaryOp::Or => match (lp, rp) {
                (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => {
                    Some(Type::boolean())
                }
                _ => None,
            },
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => lp
                .zip(rp)
                .and_then(|(a, b)| promote_binary(a, b))
                .map(|_| Type::boolean()),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => match (lp, rp) {
                (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => {
                    Some(Type::boolean())
                }
                (Some(a), Some(b)) if a.is_integral() && b.is_integral() => {
                    promote_binary(a, b).map(Type::Primitive)
                }
                _ => None,
            },
            BinaryOp::Shl | BinaryOp::Shr => match (lp, rp) {
                (Some(a), Some(b)) if a.is_integral() && b.is_integral() => {
                    promote_unary(env, &lhs_ty).map(Type::Primitive)
                }
                _ => None,
            },
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => lp
                .zip(rp)
                .and_then(|(a, b)| promote_binary(a, b))
                .map(Type::Primitive),
            BinaryOp::Eq | BinaryOp::Ne => Some(Type::boolean()),
        };
        match result {
            Some(ty) => ty,
            None => {
                let message = format!(
                    "bad operand types for binary operator: `{}` and `{}`",
                    self.fmt(&lhs_ty),
                    self.fmt(&rhs_ty)
                );
                self.error("bad-operand-types", message, range);
                Type::Error
            }
        }
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: ExprId, range: Span) -> Type {
        let ty = self.infer_expr(operand);
        if ty.is_errorish() {
            return if op == UnaryOp::Not {
                Type::boolean()
            } else {
                Type::Unknown
            };
        }
        let result = match op {
            UnaryOp::Not => (unboxed(&self.ctx, &ty) == Some(PrimitiveType::Boolean))
                .then(Type::boolean),
            UnaryOp::Neg | UnaryOp::Plus => promote_unary(&self.ctx, &ty).map(Type::Primitive),
            UnaryOp::BitNot => promote_unary(&self.ctx, &ty)
                .filter(|p| p.is_integral())
                .map(Type::Primitive),
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec => {
                unboxed(&self.ctx, &ty)
                    .filter(|p| p.is_numeric())
                    .map(|_| ty.clone())
            }
        };
        match result {
            Some(ty) => ty,
            None => {
                let message = format!("bad operand type `{}` for unary operator", self.fmt(&ty));
                self.error("bad-operand-types", message, range);
                Type::Error
            }
        }
    }

    // Calls.

    fn infer_call(&mut self, expr: ExprId, expected: Option<&Type>) -> Type {
        let site = self.select_site(expr, expected);
        let Some(method) = site.method else {
            self.type_args_without_target(&site.args);
            return Type::Error;
        };
        if !self.needs_session(&site.args) {
            let ty = method.return_type.clone();
            self.record_call(expr, method);
            return ty;
        }
        self.infer_in_session(expr, expected)
    }

    /// Selects the method or constructor of `expr` (cached). Poly arguments take part with their
    /// standalone type first; when that finds nothing they are retried as not pertinent to
    /// applicability.
    fn select_site(&mut self, expr: ExprId, expected: Option<&Type>) -> CallSite {
        if let Some(site) = &self.sites[expr.idx()] {
            return site.clone();
        }
        let body = self.body;
        let site = match &body.exprs[expr] {
            Expr::Call {
                receiver,
                name,
                explicit_type_args,
                args,
                range,
            } => self.select_method(*receiver, name, explicit_type_args, args, expected, *range),
            Expr::New {
                class,
                diamond,
                outer,
                explicit_type_args,
                args,
                range,
            } => self.select_constructor(
                class,
                *diamond,
                *outer,
                explicit_type_args,
                args,
                expected,
                *range,
            ),
            _ => CallSite {
                method: None,
                args: Vec::new(),
                diamond: false,
                explicit_type_args: false,
            },
        };
        self.sites[expr.idx()] = Some(site.clone());
        site
    }

    fn select_method(
        &mut self,
        receiver: Option<ExprId>,
        name: &str,
        explicit_type_args: &[Type],
        args: &[ExprId],
        expected: Option<&Type>,
        range: Span,
    ) -> CallSite {
        let body = self.body;
        let mut site = CallSite {
            method: None,
            args: args.to_vec(),
            diamond: false,
            explicit_type_args: !explicit_type_args.is_empty(),
        };
        let target = match receiver {
            Some(receiver) => {
                let kind = match &body.exprs[receiver] {
                    Expr::TypeRef { .. } => CallKind::Static,
                    _ => CallKind::Instance,
                };
                Some((self.infer_expr(receiver), kind))
            }
            None => match (&body.this_type, &body.owner) {
                (Some(this), _) => Some((this.clone(), CallKind::Instance)),
                (None, Some(owner)) => Some((owner.clone(), CallKind::Static)),
                (None, None) => None,
            },
        };
        let (provisional, fallback) = self.selection_types(args);
        let Some((receiver_ty, call_kind)) = target else {
            self.error(
                "unresolved-method",
                format!("cannot find symbol: method `{name}`"),
                range,
            );
            return site;
        };
        if receiver_ty.is_errorish() {
            return site;
        }
        if let Type::Primitive(p) = &receiver_ty {
            self.error(
                "unresolved-method",
                format!("{} cannot be dereferenced", p.keyword()),
                range,
            );
            return site;
        }

        let mut call = MethodCall {
            receiver: receiver_ty,
            call_kind,
            name,
            args: provisional,
            expected_return: expected.cloned(),
            explicit_type_args: explicit_type_args.to_vec(),
        };
        let mut resolution = resolve_method_call(&mut self.ctx, &call);
        if matches!(resolution, MethodResolution::NotFound(_)) && call.args != fallback {
            call.args = fallback;
            resolution = resolve_method_call(&mut self.ctx, &call);
        }
        site.method = self.accept_resolution(resolution, range);
        site
    }

    #[allow(clippy::too_many_arguments)]
    fn select_constructor(
        &mut self,
        class: &Type,
        diamond: bool,
        outer: Option<ExprId>,
        explicit_type_args: &[Type],
        args: &[ExprId],
        expected: Option<&Type>,
        range: Span,
    ) -> CallSite {
        let mut site = CallSite {
            method: None,
            args: args.to_vec(),
            diamond,
            explicit_type_args: !explicit_type_args.is_empty(),
        };
        let class_ty = self.qualify_inner_class(class, outer);
        let (provisional, fallback) = self.selection_types(args);
        if class_ty.is_errorish() {
            return site;
        }
        if let Some(def) = class_ty.as_class().and_then(|ct| self.ctx.class(ct.def)) {
            if def.is_interface() {
                let message = format!(
                    "`{}` is an interface and cannot be instantiated",
                    self.fmt(&class_ty)
                );
                self.error("unresolved-method", message, range);
                return site;
            }
        }

        let mut call = ConstructorCall {
            class: class_ty,
            args: provisional,
            expected: expected.cloned(),
            diamond,
            explicit_type_args: explicit_type_args.to_vec(),
        };
        let mut resolution = resolve_constructor(&mut self.ctx, &call);
        if matches!(resolution, MethodResolution::NotFound(_)) && call.args != fallback {
            call.args = fallback;
            resolution = resolve_constructor(&mut self.ctx, &call);
        }
        site.method = self.accept_resolution(resolution, range);
        site
    }

    /// Inner classes are instantiated relative to an enclosing instance: the explicit `outer.new`
    /// qualifier or `this` viewed as the enclosing class.
    fn qualify_inner_class(&mut self, class: &Type, outer: Option<ExprId>) -> Type {
        let outer_ty = outer.map(|outer| self.infer_expr(outer));
        let Type::Class(ct) = class else {
            return class.clone();
        };
        if ct.outer.is_some() {
            return class.clone();
        }
        let Some(enclosing) = self.ctx.class(ct.def).and_then(|def| def.outer) else {
            return class.clone();
        };
        let outer_ty = match outer_ty {
            Some(ty) => Some(ty),
            None => self
                .body
                .this_type
                .as_ref()
                .and_then(|this| instantiate_as_supertype(&self.ctx, this, enclosing)),
        };
        match outer_ty {
            Some(outer_ty) if !outer_ty.is_errorish() => Type::Class(ClassType {
                def: ct.def,
                args: ct.args.clone(),
                outer: Some(Box::new(outer_ty)),
            }),
            _ => class.clone(),
        }
    }

    /// Argument types for overload selection: `(provisional, fallback)`.
    fn selection_types(&mut self, args: &[ExprId]) -> (Vec<Type>, Vec<Type>) {
        let body = self.body;
        let mut provisional = Vec::with_capacity(args.len());
        let mut fallback = Vec::with_capacity(args.len());
        for arg in args {
            match &body.exprs[*arg] {
                Expr::Lambda { .. } => {
                    provisional.push(Type::Unknown);
                    fallback.push(Type::Unknown);
                }
                Expr::MethodRef { receiver, .. } => {
                    if !matches!(body.exprs[*receiver], Expr::TypeRef { .. }) {
                        self.infer_expr(*receiver);
                    }
                    provisional.push(Type::Unknown);
                    fallback.push(Type::Unknown);
                }
                Expr::Conditional { .. } if self.is_poly_arg(*arg) => {
                    provisional.push(Type::Unknown);
                    fallback.push(Type::Unknown);
                }
                Expr::Call { .. } | Expr::New { .. } if self.is_poly_site(*arg) => {
                    let standalone = self
                        .select_site(*arg, None)
                        .method
                        .map(|m| m.return_type)
                        .unwrap_or(Type::Unknown);
                    provisional.push(self.capture(&standalone));
                    fallback.push(Type::Unknown);
                }
                _ => {
                    let ty = self.infer_expr(*arg);
                    let ty = self.capture(&ty);
                    provisional.push(ty.clone());
                    fallback.push(ty);
                }
            }
        }
        (provisional, fallback)
    }

    fn accept_resolution(&mut self, resolution: MethodResolution, range: Span) -> Option<ResolvedMethod> {
        match resolution {
            MethodResolution::Found(method) => Some(method),
            MethodResolution::Ambiguous(ambiguous) => {
                let name = ambiguous
                    .candidates
                    .first()
                    .map(|c| c.name.clone())
                    .unwrap_or_default();
                let candidates: Vec<String> = ambiguous
                    .candidates
                    .iter()
                    .map(|c| format!("`{}`", self.signature(&c.name, &c.params, c.is_varargs)))
                    .collect();
                let message = format!(
                    "reference to `{}` is ambiguous: {} all match",
                    display_name(&name),
                    candidates.join(", ")
                );
                self.error("ambiguous-call", message, range);
                None
            }
            MethodResolution::NotFound(not_found) => {
                let name = display_name(&not_found.name);
                let args: Vec<String> = not_found.args.iter().map(|a| self.fmt(a)).collect();
                let receiver = self.fmt(&not_found.receiver);
                if not_found.capture_related {
                    let message = format!(
                        "`{name}` in `{receiver}` cannot be applied to ({}): an argument is not compatible with a captured wildcard",
                        args.join(", ")
                    );
                    self.error("capture-violation", message, range);
                } else if not_found.candidates.is_empty() {
                    let message = if not_found.name == "<init>" {
                        format!("cannot find a constructor of `{receiver}`")
                    } else {
                        format!("cannot find symbol: method `{name}` in `{receiver}`")
                    };
                    self.error("unresolved-method", message, range);
                } else {
                    let candidates: Vec<String> = not_found
                        .candidates
                        .iter()
                        .map(|c| format!("`{}`", self.signature(&c.name, &c.params, c.is_varargs)))
                        .collect();
                    let message = format!(
                        "no suitable method found for `{name}({})`; candidates: {}",
                        args.join(", "),
                        candidates.join(", ")
                    );
                    self.error("unresolved-method", message, range);
                }
                None
            }
        }
    }

    fn signature(&self, name: &str, params: &[Type], is_varargs: bool) -> String {
        format_method_signature(&self.ctx, display_name(name), params, is_varargs)
    }

    fn record_call(&mut self, expr: ExprId, method: ResolvedMethod) {
        let span = self.expr_range(expr);
        for warning in &method.warnings {
            let message = match warning {
                TypeWarning::Unchecked(UncheckedReason::UncheckedVarargs) => {
                    let component = match method.formals.last() {
                        Some(Type::Array(elem)) => self.fmt(elem),
                        _ => "?".to_owned(),
                    };
                    format!("unchecked generic array creation for varargs parameter of type `{component}[]`")
                }
                TypeWarning::Unchecked(UncheckedReason::RawConversion) => format!(
                    "unchecked method invocation: `{}` is applied to a raw argument",
                    display_name(&method.name)
                ),
            };
            self.diagnostics
                .push(Diagnostic::warning("unchecked", message, Some(span)));
        }
        tracing::trace!(
            target: "nova.typeck",
            name = %method.name,
            phase = ?method.phase,
            "resolved call"
        );
        self.expr_types[expr.idx()] = Some(method.return_type.clone());
        self.call_resolutions[expr.idx()] = Some(method);
    }

    /// Arguments of a call that could not be resolved are still typed, without a target.
    fn type_args_without_target(&mut self, args: &[ExprId]) {
        let body = self.body;
        for arg in args {
            if self.expr_types[arg.idx()].is_some() {
                continue;
            }
            if body.exprs[*arg].is_functional() {
                self.type_functional_without_target(*arg);
            } else {
                self.infer_expr(*arg);
            }
        }
    }

    fn needs_session(&mut self, args: &[ExprId]) -> bool {
        let mut needed = false;
        for arg in args {
            needed |= self.is_poly_arg(*arg);
        }
        needed
    }

    fn is_poly_arg(&mut self, arg: ExprId) -> bool {
        let body = self.body;
        match &body.exprs[arg] {
            Expr::Lambda { .. } | Expr::MethodRef { .. } => self.expr_types[arg.idx()].is_none(),
            Expr::Conditional {
                then_expr,
                else_expr,
                ..
            } => {
                self.expr_types[arg.idx()].is_none()
                    && (self.is_poly_arg(*then_expr) | self.is_poly_arg(*else_expr))
            }
            Expr::Call { .. } | Expr::New { .. } => self.is_poly_site(arg),
            _ => false,
        }
    }

    /// A call whose type depends on its own inferred type arguments, or a diamond `new`.
    fn is_poly_site(&mut self, expr: ExprId) -> bool {
        if self.expr_types[expr.idx()].is_some() {
            return false;
        }
        let site = self.select_site(expr, None);
        let Some(method) = &site.method else {
            return false;
        };
        if site.explicit_type_args {
            return false;
        }
        match declared_view(&self.ctx, method, site.diamond) {
            Some(view) => {
                site.diamond
                    || view
                        .type_params
                        .iter()
                        .any(|tp| view.return_type.mentions_type_var(*tp))
            }
            None => false,
        }
    }

    fn infer_in_session(&mut self, expr: ExprId, expected: Option<&Type>) -> Type {
        let _span =
            tracing::debug_span!(target: "nova.typeck", "poly_expression", expr = expr.idx())
                .entered();
        let mut session = InferenceSession::new(self.config.inference_step_limit);
        let return_type = self.open_site(&mut session, expr);

        if let Some(expected) = expected {
            if session.failure.is_none()
                && !matches!(expected, Type::Void)
                && !matches!(return_type, Type::Void)
            {
                let snapshot = session.ic.clone();
                if session
                    .ic
                    .add_compatible(&self.ctx, &return_type, expected, true)
                    .is_err()
                {
                    tracing::trace!(target: "nova.typeck", "dropping unusable target type");
                    session.ic = snapshot;
                }
            }
        }

        self.process_deferred(&mut session);
        if session.failure.is_none() {
            if let Err(err) = session.ic.resolve_all(&self.ctx) {
                session.fail(err);
            }
        }
        self.finish_session(expr, session)
    }

    /// Adds a call (and, recursively, its poly arguments) to `session`. Returns the call's type
    /// in terms of the session's inference variables.
    fn open_site(&mut self, session: &mut InferenceSession, expr: ExprId) -> Type {
        let site = self.select_site(expr, None);
        let Some(method) = site.method else {
            self.type_args_without_target(&site.args);
            return Type::Unknown;
        };
        let view = if site.explicit_type_args {
            None
        } else {
            declared_view(&self.ctx, &method, site.diamond)
        };
        let (type_args, formals, return_type) = match view {
            Some(view) => {
                let opened = session.ic.open_member_in(
                    &self.ctx,
                    &view.type_params,
                    &view.params,
                    &view.return_type,
                    &view.bound_subst,
                );
                let type_args = view
                    .type_params
                    .iter()
                    .map(|tp| opened.subst.get(tp).cloned().unwrap_or(Type::Unknown))
                    .collect();
                (type_args, opened.params, opened.return_type)
            }
            None => (
                method.inferred_type_args.clone(),
                method.formals.clone(),
                method.return_type.clone(),
            ),
        };
        let params = expand_params(&formals, site.args.len(), method.used_varargs);
        let loose = method.phase != InvocationPhase::Strict;
        for (arg, param) in site.args.iter().zip(&params) {
            self.add_arg(session, *arg, param, loose);
        }
        session.sites.push(OpenedSite {
            expr,
            method,
            type_args,
            formals,
            params,
            return_type: return_type.clone(),
        });
        return_type
    }

    fn add_arg(&mut self, session: &mut InferenceSession, arg: ExprId, param: &Type, loose: bool) {
        let body = self.body;
        match &body.exprs[arg] {
            Expr::Lambda { .. } | Expr::MethodRef { .. } if self.expr_types[arg.idx()].is_none() => {
                session.deferred.push(Deferred {
                    expr: arg,
                    target: param.clone(),
                });
            }
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } if self.is_poly_arg(arg) => {
                self.check_condition(*condition);
                self.add_arg(session, *then_expr, param, loose);
                self.add_arg(session, *else_expr, param, loose);
                session.conditionals.push((arg, param.clone()));
            }
            Expr::Call { .. } | Expr::New { .. } if self.is_poly_site(arg) => {
                let return_type = self.open_site(session, arg);
                let return_type = capture_with_inference_vars(&self.ctx, session, return_type);
                session.add_compatible(&self.ctx, &return_type, param, loose);
            }
            _ => {
                let ty = if param.is_proper() {
                    self.infer_expr_with_expected(arg, Some(param))
                } else {
                    self.infer_expr(arg)
                };
                let ty = self.capture(&ty);
                session.add_compatible(&self.ctx, &ty, param, loose);
            }
        }
    }

    /// Checks lambdas and method references once the inference variables their parameter types
    /// mention are resolved. Bodies may add constraints on the remaining variables.
    fn process_deferred(&mut self, session: &mut InferenceSession) {
        let mut next = 0;
        while next < session.deferred.len() {
            let Deferred { expr, target } = session.deferred[next].clone();
            next += 1;
            if session.failure.is_some() {
                self.type_functional_without_target(expr);
                continue;
            }
            let input_vars = input_vars(&self.ctx, &target);
            if let Err(err) = session.ic.resolve(&self.ctx, &input_vars) {
                session.fail(err);
                self.type_functional_without_target(expr);
                continue;
            }
            let target = session.ic.instantiate(&target);
            if !self.check_functional(expr, &target, Some(session)) {
                session.rejected.push(expr);
            }
        }
    }

    fn finish_session(&mut self, root: ExprId, session: InferenceSession) -> Type {
        let InferenceSession {
            ic,
            sites,
            deferred,
            rejected,
            conditionals,
            failure,
        } = session;

        if let Some(err) = failure {
            let reason = match &err {
                InferenceError::Incompatible { from, to } => {
                    format!("`{}` is not compatible with `{}`", self.fmt(from), self.fmt(to))
                }
                InferenceError::Unsatisfiable(_) => "inferred bounds are contradictory".to_owned(),
                InferenceError::StepLimit(limit) => {
                    format!("inference gave up after {limit} steps")
                }
            };
            let name = sites
                .last()
                .map(|s| display_name(&s.method.name).to_owned())
                .unwrap_or_default();
            self.error(
                "inference-failure",
                format!("cannot infer type arguments for `{name}`: {reason}"),
                self.expr_range(root),
            );
            for site in &sites {
                self.expr_types[site.expr.idx()] = Some(Type::Unknown);
            }
            for d in &deferred {
                if self.expr_types[d.expr.idx()].is_none() {
                    self.expr_types[d.expr.idx()] = Some(Type::Unknown);
                }
            }
            for (expr, _) in &conditionals {
                self.expr_types[expr.idx()] = Some(Type::Unknown);
            }
            return Type::Unknown;
        }

        for site in sites {
            let method = ResolvedMethod {
                inferred_type_args: site.type_args.iter().map(|t| ic.instantiate_or_unknown(t)).collect(),
                formals: site.formals.iter().map(|t| ic.instantiate_or_unknown(t)).collect(),
                params: site.params.iter().map(|t| ic.instantiate_or_unknown(t)).collect(),
                return_type: ic.instantiate_or_unknown(&site.return_type),
                ..site.method
            };
            self.record_call(site.expr, method);
        }
        for d in deferred.iter().filter(|d| !rejected.contains(&d.expr)) {
            let target = ic.instantiate_or_unknown(&d.target);
            self.record_functional(d.expr, &target);
        }
        for (expr, target) in conditionals {
            self.expr_types[expr.idx()] = Some(ic.instantiate_or_unknown(&target));
        }
        self.expr_types[root.idx()].clone().unwrap_or(Type::Unknown)
    }

    // Lambdas and method references.

    /// A lambda or method reference with a proper target type.
    fn infer_functional(&mut self, expr: ExprId, target: &Type) -> Type {
        if self.check_functional(expr, target, None) {
            self.record_functional(expr, target)
        } else {
            Type::Unknown
        }
    }

    fn record_functional(&mut self, expr: ExprId, target: &Type) -> Type {
        let ground = ground_target(&self.ctx, target);
        self.functional_methods[expr.idx()] = sam_signature(&self.ctx, &ground);
        self.expr_types[expr.idx()] = Some(ground.clone());
        ground
    }

    /// Checks a lambda body or method reference against `target`. Within a session, `target`
    /// may still mention inference variables in its return type; the body then contributes
    /// constraints instead of being checked. Returns `false` when `target` has no usable function
    /// type for `expr`.
    fn check_functional(
        &mut self,
        expr: ExprId,
        target: &Type,
        mut session: Option<&mut InferenceSession>,
    ) -> bool {
        let body = self.body;
        let ground = ground_target(&self.ctx, target);
        let Some(sam) = sam_signature(&self.ctx, &ground) else {
            self.type_functional_without_target(expr);
            let message = format!(
                "incompatible types: `{}` is not a functional interface",
                self.fmt(target)
            );
            self.error("not-functional-interface", message, self.expr_range(expr));
            return false;
        };

        match &body.exprs[expr] {
            Expr::Lambda {
                params,
                body: lambda_body,
                range,
            } => {
                if params.len() != sam.params.len() {
                    self.type_functional_without_target(expr);
                    let message = format!(
                        "incompatible parameter types in lambda expression: expected {} parameter(s) but found {}",
                        sam.params.len(),
                        params.len()
                    );
                    self.error("lambda-arity-mismatch", message, *range);
                    return false;
                }
                for (param, sam_param) in params.iter().zip(&sam.params) {
                    let ty = match &body.locals[*param].ty {
                        LocalTy::Declared(ty) => ty.clone(),
                        LocalTy::Var | LocalTy::Implicit => match session.as_deref() {
                            Some(session) => session.instantiate(sam_param),
                            None => sam_param.clone(),
                        },
                    };
                    self.local_types[param.idx()] = Some(ty);
                }
                match lambda_body {
                    LambdaBody::Expr(result) => {
                        self.check_lambda_expr_body(*result, &sam.return_type, session.as_deref_mut())
                    }
                    LambdaBody::Block(block) => {
                        self.check_lambda_block_body(*block, &sam.return_type, session.as_deref_mut())
                    }
                }
                true
            }
            Expr::MethodRef {
                receiver,
                name,
                range,
            } => self.check_method_ref(expr, *receiver, name, *range, &sam, session),
            _ => false,
        }
    }

    fn check_lambda_expr_body(
        &mut self,
        result: ExprId,
        return_type: &Type,
        session: Option<&mut InferenceSession>,
    ) {
        let body = self.body;
        let span = self.expr_range(result);
        if matches!(return_type, Type::Void) {
            self.infer_expr(result);
            if !is_statement_expression(&body.exprs[result]) {
                self.error(
                    "bad-lambda-body",
                    "bad return type in lambda expression: a void lambda body must be a statement expression"
                        .to_owned(),
                    span,
                );
            }
            return;
        }
        match session {
            Some(session) if !return_type.is_proper() => {
                self.add_arg(session, result, return_type, true);
            }
            _ => {
                let ty = self.infer_expr_with_expected(result, Some(return_type));
                if matches!(ty, Type::Void) {
                    self.error(
                        "bad-lambda-body",
                        "bad return type in lambda expression: void cannot be converted to a value"
                            .to_owned(),
                        span,
                    );
                } else if !ty.is_errorish() && !is_loose_compatible(&self.ctx, &ty, return_type) {
                    let message = format!(
                        "bad return type in lambda expression: `{}` cannot be converted to `{}`",
                        self.fmt(&ty),
                        self.fmt(return_type)
                    );
                    self.error("bad-lambda-body", message, span);
                }
            }
        }
    }

    fn check_lambda_block_body(
        &mut self,
        block: StmtId,
        return_type: &Type,
        session: Option<&mut InferenceSession>,
    ) {
        let kind = if matches!(return_type, Type::Void) {
            ReturnKind::Void
        } else {
            ReturnKind::Value
        };
        let expected = (kind == ReturnKind::Value && return_type.is_proper()).then(|| return_type.clone());
        self.lambda_returns.push(LambdaReturns {
            kind,
            expected,
            exprs: Vec::new(),
        });
        self.check_stmt(block);
        let Some(frame) = self.lambda_returns.pop() else {
            return;
        };
        if let Some(session) = session {
            if kind == ReturnKind::Value && !return_type.is_proper() {
                for expr in frame.exprs {
                    let ty = self.infer_expr(expr);
                    let ty = self.capture(&ty);
                    session.add_compatible(&self.ctx, &ty, return_type, true);
                }
            }
        }
    }

    fn check_method_ref(
        &mut self,
        expr: ExprId,
        receiver: ExprId,
        name: &str,
        range: Span,
        sam: &SamSignature,
        session: Option<&mut InferenceSession>,
    ) -> bool {
        let body = self.body;
        let params: Vec<Type> = sam
            .params
            .iter()
            .map(|p| match session.as_deref() {
                Some(session) => session.instantiate(p),
                None => p.clone(),
            })
            .collect();
        let expected_return = Some(&sam.return_type)
            .filter(|t| t.is_proper() && !matches!(t, Type::Void) && !t.is_errorish())
            .cloned();

        let referenced: Option<(Option<ResolvedMethod>, Type)> = match &body.exprs[receiver] {
            Expr::TypeRef { ty, .. } if name == "new" => {
                self.infer_expr(receiver);
                match ty {
                    Type::Array(_) => Some((None, ty.clone())),
                    _ => {
                        let diamond = is_raw_generic(&self.ctx, ty);
                        let call = ConstructorCall {
                            class: ty.clone(),
                            args: params.clone(),
                            expected: expected_return.clone(),
                            diamond,
                            explicit_type_args: Vec::new(),
                        };
                        match resolve_constructor(&mut self.ctx, &call) {
                            MethodResolution::Found(m) => {
                                let ty = m.return_type.clone();
                                Some((Some(m), ty))
                            }
                            _ => None,
                        }
                    }
                }
            }
            Expr::TypeRef { ty, .. } => {
                self.infer_expr(receiver);
                let mut call = MethodCall {
                    receiver: ty.clone(),
                    call_kind: CallKind::Static,
                    name,
                    args: params.clone(),
                    expected_return: expected_return.clone(),
                    explicit_type_args: Vec::new(),
                };
                let mut found = match resolve_method_call(&mut self.ctx, &call) {
                    MethodResolution::Found(m) if m.is_static => Some(m),
                    _ => None,
                };
                // `Type::instanceMethod`: the first function parameter is the receiver.
                if found.is_none() {
                    if let Some((first, rest)) = params.split_first() {
                        call.receiver = unbound_receiver(&self.ctx, ty, first);
                        call.call_kind = CallKind::Instance;
                        call.args = rest.to_vec();
                        found = match resolve_method_call(&mut self.ctx, &call) {
                            MethodResolution::Found(m) if !m.is_static => Some(m),
                            _ => None,
                        };
                    }
                }
                found.map(|m| {
                    let ty = m.return_type.clone();
                    (Some(m), ty)
                })
            }
            _ => {
                let receiver_ty = self.infer_expr(receiver);
                if receiver_ty.is_errorish() {
                    return false;
                }
                let call = MethodCall {
                    receiver: receiver_ty,
                    call_kind: CallKind::Instance,
                    name,
                    args: params.clone(),
                    expected_return: expected_return.clone(),
                    explicit_type_args: Vec::new(),
                };
                match resolve_method_call(&mut self.ctx, &call) {
                    MethodResolution::Found(m) => {
                        let ty = m.return_type.clone();
                        Some((Some(m), ty))
                    }
                    _ => None,
                }
            }
        };

        let Some((method, return_type)) = referenced else {
            let args: Vec<String> = params.iter().map(|p| self.fmt(p)).collect();
            self.error(
                "unresolved-method",
                format!(
                    "invalid method reference: cannot find `{name}` applicable to ({})",
                    args.join(", ")
                ),
                range,
            );
            return false;
        };
        self.call_resolutions[expr.idx()] = method;

        if matches!(sam.return_type, Type::Void) {
            return true;
        }
        if matches!(return_type, Type::Void) {
            self.error(
                "bad-method-ref",
                format!("bad return type in method reference: `{name}` returns void"),
                range,
            );
            return true;
        }
        match session {
            Some(session) if !sam.return_type.is_proper() => {
                let return_type = self.capture(&return_type);
                session.add_compatible(&self.ctx, &return_type, &sam.return_type, true);
            }
            _ => {
                if !return_type.is_errorish()
                    && !sam.return_type.is_errorish()
                    && !is_loose_compatible(&self.ctx, &return_type, &sam.return_type)
                {
                    let message = format!(
                        "bad return type in method reference: `{}` cannot be converted to `{}`",
                        self.fmt(&return_type),
                        self.fmt(&sam.return_type)
                    );
                    self.error("bad-method-ref", message, range);
                }
            }
        }
        true
    }

    /// Types what can be typed inside a lambda or method reference that has no usable target.
    fn type_functional_without_target(&mut self, expr: ExprId) {
        let body = self.body;
        if self.expr_types[expr.idx()].is_some() {
            return;
        }
        self.expr_types[expr.idx()] = Some(Type::Unknown);
        match &body.exprs[expr] {
            Expr::Lambda {
                params,
                body: lambda_body,
                ..
            } => {
                for param in params {
                    let ty = match &body.locals[*param].ty {
                        LocalTy::Declared(ty) => ty.clone(),
                        LocalTy::Var | LocalTy::Implicit => Type::Unknown,
                    };
                    self.local_types[param.idx()] = Some(ty);
                }
                match lambda_body {
                    LambdaBody::Expr(result) => {
                        self.infer_expr(*result);
                    }
                    LambdaBody::Block(block) => {
                        self.lambda_returns.push(LambdaReturns {
                            kind: ReturnKind::Unchecked,
                            expected: None,
                            exprs: Vec::new(),
                        });
                        self.check_stmt(*block);
                        self.lambda_returns.pop();
                    }
                }
            }
            Expr::MethodRef { receiver, .. } => {
                self.infer_expr(*receiver);
            }
            _ => {}
        }
    }
}

fn display_name(name: &str) -> &str {
    if name == "<init>" {
        "new"
    } else {
        name
    }
}

/// The declared signature of `method`, viewed through its receiver but with the member's own
/// type parameters (and, for diamond `new`, the class's) still open. `None` for members with
/// nothing to infer.
fn declared_view(env: &dyn TypeEnv, method: &ResolvedMethod, diamond: bool) -> Option<DeclaredView> {
    if method.type_params.is_empty() {
        return None;
    }
    match method.decl {
        MemberRef::Method { owner, index } => {
            let def = env.class(owner)?.methods.get(index)?;
            let subst = match (&method.declaring_type, def.is_static) {
                (Type::Class(ct), false) => class_type_subst(env, ct),
                _ => HashMap::new(),
            };
            Some(DeclaredView {
                type_params: def.type_params.clone(),
                params: def.params.iter().map(|p| substitute(p, &subst)).collect(),
                return_type: substitute(&def.return_type, &subst),
                bound_subst: subst,
            })
        }
        MemberRef::Constructor { owner, index } => {
            let class = env.class(owner)?;
            let Type::Class(ct) = &method.declaring_type else {
                return None;
            };
            let (ctor_type_params, ctor_params) = class
                .constructors
                .get(index)
                .map(|c| (c.type_params.clone(), c.params.clone()))
                .unwrap_or_default();
            if diamond {
                let outer = match ct.outer.as_deref() {
                    Some(Type::Class(outer)) => class_type_subst(env, outer),
                    _ => HashMap::new(),
                };
                let mut type_params = class.type_params.clone();
                type_params.extend(ctor_type_params);
                let return_type = Type::Class(ClassType {
                    def: owner,
                    args: class
                        .type_params
                        .iter()
                        .map(|tp| Type::TypeVar(*tp))
                        .collect(),
                    outer: ct.outer.clone(),
                });
                Some(DeclaredView {
                    type_params,
                    params: ctor_params.iter().map(|p| substitute(p, &outer)).collect(),
                    return_type,
                    bound_subst: outer,
                })
            } else {
                let subst = class_type_subst(env, ct);
                Some(DeclaredView {
                    type_params: ctor_type_params,
                    params: ctor_params.iter().map(|p| substitute(p, &subst)).collect(),
                    return_type: method.declaring_type.clone(),
                    bound_subst: subst,
                })
            }
        }
    }
}

/// Capture conversion of a nested call's result with inference variables standing in for the
/// wildcards, so that `Collector<T, ?, List<T>>` can meet `Collector<? super T, A, R>`.
fn capture_with_inference_vars(env: &dyn TypeEnv, session: &mut InferenceSession, ty: Type) -> Type {
    let Type::Class(ct) = &ty else {
        return ty;
    };
    if !ct.args.iter().any(Type::is_wildcard) {
        return ty;
    }
    let mut args = Vec::with_capacity(ct.args.len());
    for arg in &ct.args {
        let Type::Wildcard(bound) = arg else {
            args.push(arg.clone());
            continue;
        };
        let var = Type::Infer(session.ic.fresh_var(None));
        let constraint = match bound {
            WildcardBound::Extends(upper) => session.ic.add_subtype(env, &var, upper),
            WildcardBound::Super(lower) => session.ic.add_subtype(env, lower, &var),
            WildcardBound::Unbounded => Ok(()),
        };
        if let Err(err) = constraint {
            session.fail(err);
        }
        args.push(var);
    }
    Type::Class(ClassType {
        def: ct.def,
        args,
        outer: ct.outer.clone(),
    })
}

/// The inference variables a functional target's parameter types mention: they must be resolved
/// before the lambda body can be typed.
fn input_vars(env: &dyn TypeEnv, target: &Type) -> Vec<InferVarId> {
    let ground = ground_target(env, target);
    let mut vars = Vec::new();
    if let Some(sam) = sam_signature(env, &ground) {
        for param in &sam.params {
            param.collect_infer_vars(&mut vars);
        }
    }
    vars
}

fn ground_target(env: &dyn TypeEnv, target: &Type) -> Type {
    non_wildcard_parameterization(env, target).unwrap_or_else(|| target.clone())
}

/// `Type::method` with a raw generic `Type` takes its parameterization from the receiver
/// argument (`List::size` applied to a `List<String>`).
fn unbound_receiver(env: &dyn TypeEnv, ty: &Type, first: &Type) -> Type {
    match ty {
        Type::Class(ct) if is_raw_generic(env, ty) => {
            instantiate_as_supertype(env, first, ct.def).unwrap_or_else(|| ty.clone())
        }
        _ => ty.clone(),
    }
}

fn is_raw_generic(env: &dyn TypeEnv, ty: &Type) -> bool {
    match ty {
        Type::Class(ct) => {
            ct.args.is_empty() && env.class(ct.def).is_some_and(|d| !d.type_params.is_empty())
        }
        _ => false,
    }
}

fn is_statement_expression(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Call { .. }
            | Expr::New { .. }
            | Expr::Assign { .. }
            | Expr::Unary {
                op: UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec,
                ..
            }
    )
}

fn unboxed(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    match ty {
        Type::Primitive(p) => Some(*p),
        _ => unboxed_primitive(env, ty),
    }
}

/// Unary numeric promotion (JLS 5.6).
fn promote_unary(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    let p = unboxed(env, ty)?;
    if !p.is_numeric() {
        return None;
    }
    Some(match p {
        PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Char => PrimitiveType::Int,
        other => other,
    })
}

/// Binary numeric promotion (JLS 5.6).
fn promote_binary(a: PrimitiveType, b: PrimitiveType) -> Option<PrimitiveType> {
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    Some(
        if a == PrimitiveType::Double || b == PrimitiveType::Double {
            PrimitiveType::Double
        } else if a == PrimitiveType::Float || b == PrimitiveType::Float {
            PrimitiveType::Float
        } else if a == PrimitiveType::Long || b == PrimitiveType::Long {
            PrimitiveType::Long
        } else {
            PrimitiveType::Int
        },
    )
}
