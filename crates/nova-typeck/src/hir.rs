//! Lowered method bodies as consumed by the checker.
//!
//! Names are already resolved: locals are [`LocalId`]s, type references carry a [`Type`] and
//! unqualified method calls have no receiver. Spans point back into the source text the body
//! was lowered from.

use nova_types::{Span, Type};
use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        LocalId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = self.data.len() as u32;
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<ExprId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

impl<T> std::ops::Index<StmtId> for Arena<T> {
    type Output = T;

    fn index(&self, index: StmtId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

impl<T> std::ops::Index<LocalId> for Arena<T> {
    type Output = T;

    fn index(&self, index: LocalId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

/// A method, constructor or initializer body.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub root: StmtId,
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    pub locals: Arena<Local>,
    pub params: Vec<LocalId>,
    /// The type of `this`: the enclosing class parameterized by its own type variables. `None` in
    /// a static context.
    pub this_type: Option<Type>,
    /// The class whose members unqualified calls and names refer to.
    pub owner: Option<Type>,
    /// Declared return type; `void` for initializers.
    pub return_type: Type,
}

impl Body {
    #[must_use]
    pub fn empty(range: Span) -> Self {
        let mut stmts = Arena::default();
        let root = StmtId::from_raw(stmts.alloc(Stmt::Block {
            statements: Vec::new(),
            range,
        }));
        Body {
            root,
            stmts,
            exprs: Arena::default(),
            locals: Arena::default(),
            params: Vec::new(),
            this_type: None,
            owner: None,
            return_type: Type::Void,
        }
    }
}

/// How a local's type is given in source.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalTy {
    Declared(Type),
    /// `var`.
    Var,
    /// Parameter of an implicitly typed lambda.
    Implicit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Local {
    pub name: String,
    pub ty: LocalTy,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Block {
        statements: Vec<StmtId>,
        range: Span,
    },
    Let {
        local: LocalId,
        initializer: Option<ExprId>,
        range: Span,
    },
    Expr {
        expr: ExprId,
        range: Span,
    },
    Return {
        expr: Option<ExprId>,
        range: Span,
    },
    ForEach {
        local: LocalId,
        iterable: ExprId,
        body: StmtId,
        range: Span,
    },
    If {
        condition: ExprId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
        range: Span,
    },
    Empty {
        range: Span,
    },
}

impl Stmt {
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Stmt::Block { range, .. }
            | Stmt::Let { range, .. }
            | Stmt::Expr { range, .. }
            | Stmt::Return { range, .. }
            | Stmt::ForEach { range, .. }
            | Stmt::If { range, .. }
            | Stmt::Empty { range } => *range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    Expr(ExprId),
    Block(StmtId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal {
        kind: LiteralKind,
        value: String,
        range: Span,
    },
    Null {
        range: Span,
    },
    Local {
        local: LocalId,
        range: Span,
    },
    This {
        range: Span,
    },
    /// A type used as an expression qualifier: `Collections` in `Collections.emptyList()`.
    TypeRef {
        ty: Type,
        range: Span,
    },
    /// A simple name that did not resolve to a local: a field of the enclosing class, or nothing.
    Name {
        name: String,
        range: Span,
    },
    FieldAccess {
        receiver: ExprId,
        name: String,
        range: Span,
    },
    /// A method invocation. `receiver == None` for unqualified calls.
    Call {
        receiver: Option<ExprId>,
        name: String,
        explicit_type_args: Vec<Type>,
        args: Vec<ExprId>,
        range: Span,
    },
    /// `new C(..)`, `new C<>(..)` or `outer.new Inner(..)`.
    New {
        class: Type,
        diamond: bool,
        outer: Option<ExprId>,
        explicit_type_args: Vec<Type>,
        args: Vec<ExprId>,
        range: Span,
    },
    /// `new T[d0][d1][]..` or `new T[]{..}`; `elem` is the innermost component type.
    NewArray {
        elem: Type,
        dims: Vec<ExprId>,
        extra_dims: usize,
        initializer: Option<Vec<ExprId>>,
        range: Span,
    },
    ArrayAccess {
        array: ExprId,
        index: ExprId,
        range: Span,
    },
    Lambda {
        params: Vec<LocalId>,
        body: LambdaBody,
        range: Span,
    },
    /// `receiver::name`; `name` is `new` for constructor references.
    MethodRef {
        receiver: ExprId,
        name: String,
        range: Span,
    },
    Conditional {
        condition: ExprId,
        then_expr: ExprId,
        else_expr: ExprId,
        range: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        range: Span,
    },
    Unary {
        op: UnaryOp,
        expr: ExprId,
        range: Span,
    },
    Assign {
        lhs: ExprId,
        rhs: ExprId,
        range: Span,
    },
    Cast {
        ty: Type,
        expr: ExprId,
        range: Span,
    },
    Missing {
        range: Span,
    },
}

impl Expr {
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Expr::Literal { range, .. }
            | Expr::Null { range }
            | Expr::Local { range, .. }
            | Expr::This { range }
            | Expr::TypeRef { range, .. }
            | Expr::Name { range, .. }
            | Expr::FieldAccess { range, .. }
            | Expr::Call { range, .. }
            | Expr::New { range, .. }
            | Expr::NewArray { range, .. }
            | Expr::ArrayAccess { range, .. }
            | Expr::Lambda { range, .. }
            | Expr::MethodRef { range, .. }
            | Expr::Conditional { range, .. }
            | Expr::Binary { range, .. }
            | Expr::Unary { range, .. }
            | Expr::Assign { range, .. }
            | Expr::Cast { range, .. }
            | Expr::Missing { range } => *range,
        }
    }

    /// Lambdas and method references: typed only against a target.
    #[must_use]
    pub fn is_functional(&self) -> bool {
        matches!(self, Expr::Lambda { .. } | Expr::MethodRef { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
}

/// Incremental construction of a [`Body`].
///
/// The `alloc_*` methods take explicit spans. The shorthand constructors (`string`, `call`, ...)
/// give every node a fresh one-byte span past the previous one, which is enough to tell nodes
/// apart in diagnostics.
#[derive(Debug, Clone)]
pub struct BodyBuilder {
    body: Body,
    statements: Vec<StmtId>,
    cursor: usize,
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self {
            body: Body::empty(Span::new(0, 0)),
            statements: Vec::new(),
            cursor: 0,
        }
    }

    /// A body with `this` of type `this_type`; unqualified members resolve against it.
    pub fn instance(this_type: Type) -> Self {
        let mut builder = Self::new();
        builder.body.owner = Some(this_type.clone());
        builder.body.this_type = Some(this_type);
        builder
    }

    /// A static body of `owner`.
    pub fn static_in(owner: Type) -> Self {
        let mut builder = Self::new();
        builder.body.owner = Some(owner);
        builder
    }

    pub fn returning(mut self, ty: Type) -> Self {
        self.body.return_type = ty;
        self
    }

    fn next_range(&mut self) -> Span {
        self.cursor += 1;
        Span::new(self.cursor, self.cursor + 1)
    }

    pub fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        ExprId::from_raw(self.body.exprs.alloc(expr))
    }

    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        StmtId::from_raw(self.body.stmts.alloc(stmt))
    }

    pub fn alloc_local(&mut self, local: Local) -> LocalId {
        LocalId::from_raw(self.body.locals.alloc(local))
    }

    pub fn local(&mut self, name: &str, ty: LocalTy) -> LocalId {
        let range = self.next_range();
        self.alloc_local(Local {
            name: name.to_string(),
            ty,
            range,
        })
    }

    pub fn param(&mut self, name: &str, ty: Type) -> LocalId {
        let local = self.local(name, LocalTy::Declared(ty));
        self.body.params.push(local);
        local
    }

    pub fn literal(&mut self, kind: LiteralKind, value: &str) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Literal {
            kind,
            value: value.to_string(),
            range,
        })
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.literal(LiteralKind::String, value)
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.literal(LiteralKind::Int, &value.to_string())
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.literal(LiteralKind::Bool, if value { "true" } else { "false" })
    }

    pub fn null(&mut self) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Null { range })
    }

    pub fn this(&mut self) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::This { range })
    }

    pub fn local_ref(&mut self, local: LocalId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Local { local, range })
    }

    pub fn type_ref(&mut self, ty: Type) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::TypeRef { ty, range })
    }

    pub fn name(&mut self, name: &str) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Name {
            name: name.to_string(),
            range,
        })
    }

    pub fn field(&mut self, receiver: ExprId, name: &str) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::FieldAccess {
            receiver,
            name: name.to_string(),
            range,
        })
    }

    pub fn call(&mut self, receiver: Option<ExprId>, name: &str, args: Vec<ExprId>) -> ExprId {
        self.call_with_type_args(receiver, name, Vec::new(), args)
    }

    pub fn call_with_type_args(
        &mut self,
        receiver: Option<ExprId>,
        name: &str,
        explicit_type_args: Vec<Type>,
        args: Vec<ExprId>,
    ) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Call {
            receiver,
            name: name.to_string(),
            explicit_type_args,
            args,
            range,
        })
    }

    /// `Type.name(args)`.
    pub fn static_call(&mut self, owner: Type, name: &str, args: Vec<ExprId>) -> ExprId {
        let receiver = self.type_ref(owner);
        self.call(Some(receiver), name, args)
    }

    pub fn new_object(&mut self, class: Type, args: Vec<ExprId>) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::New {
            class,
            diamond: false,
            outer: None,
            explicit_type_args: Vec::new(),
            args,
            range,
        })
    }

    /// `new C<>(args)`; `class` is the raw class type.
    pub fn new_diamond(&mut self, class: Type, args: Vec<ExprId>) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::New {
            class,
            diamond: true,
            outer: None,
            explicit_type_args: Vec::new(),
            args,
            range,
        })
    }

    pub fn new_array(&mut self, elem: Type, dims: Vec<ExprId>) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::NewArray {
            elem,
            dims,
            extra_dims: 0,
            initializer: None,
            range,
        })
    }

    pub fn index(&mut self, array: ExprId, index: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::ArrayAccess {
            array,
            index,
            range,
        })
    }

    /// An implicitly typed lambda with an expression body. `params` are created with
    /// [`Self::lambda_param`].
    pub fn lambda(&mut self, params: Vec<LocalId>, body: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Lambda {
            params,
            body: LambdaBody::Expr(body),
            range,
        })
    }

    pub fn block_lambda(&mut self, params: Vec<LocalId>, body: StmtId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Lambda {
            params,
            body: LambdaBody::Block(body),
            range,
        })
    }

    pub fn lambda_param(&mut self, name: &str) -> LocalId {
        self.local(name, LocalTy::Implicit)
    }

    pub fn method_ref(&mut self, receiver: ExprId, name: &str) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::MethodRef {
            receiver,
            name: name.to_string(),
            range,
        })
    }

    pub fn conditional(&mut self, condition: ExprId, then_expr: ExprId, else_expr: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Conditional {
            condition,
            then_expr,
            else_expr,
            range,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: ExprId, rhs: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Binary { op, lhs, rhs, range })
    }

    pub fn unary(&mut self, op: UnaryOp, expr: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Unary { op, expr, range })
    }

    pub fn assign(&mut self, lhs: ExprId, rhs: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Assign { lhs, rhs, range })
    }

    pub fn cast(&mut self, ty: Type, expr: ExprId) -> ExprId {
        let range = self.next_range();
        self.alloc_expr(Expr::Cast { ty, expr, range })
    }

    pub fn block(&mut self, statements: Vec<StmtId>) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::Block { statements, range })
    }

    pub fn let_stmt(&mut self, local: LocalId, initializer: Option<ExprId>) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::Let {
            local,
            initializer,
            range,
        })
    }

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::Expr { expr, range })
    }

    pub fn return_stmt(&mut self, expr: Option<ExprId>) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::Return { expr, range })
    }

    pub fn for_each(&mut self, local: LocalId, iterable: ExprId, body: StmtId) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::ForEach {
            local,
            iterable,
            body,
            range,
        })
    }

    pub fn if_stmt(&mut self, condition: ExprId, then_branch: StmtId, else_branch: Option<StmtId>) -> StmtId {
        let range = self.next_range();
        self.alloc_stmt(Stmt::If {
            condition,
            then_branch,
            else_branch,
            range,
        })
    }

    /// Appends a statement to the root block.
    pub fn push(&mut self, stmt: StmtId) {
        self.statements.push(stmt);
    }

    /// `name = initializer;` as a root statement. Returns the new local.
    pub fn declare(&mut self, name: &str, ty: LocalTy, initializer: Option<ExprId>) -> LocalId {
        let local = self.local(name, ty);
        let stmt = self.let_stmt(local, initializer);
        self.push(stmt);
        local
    }

    /// `expr;` as a root statement.
    pub fn eval(&mut self, expr: ExprId) {
        let stmt = self.expr_stmt(expr);
        self.push(stmt);
    }

    pub fn finish(mut self) -> Body {
        let end = self.cursor + 1;
        let statements = std::mem::take(&mut self.statements);
        let root = self.alloc_stmt(Stmt::Block {
            statements,
            range: Span::new(0, end),
        });
        self.body.root = root;
        self.body
    }
}
