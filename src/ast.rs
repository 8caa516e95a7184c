pub use crate::span::Spanned;

/// A parsed Quack source file: zero or more classes plus loose top-level
/// statements (captured into a synthesized main class by `transform`).
#[derive(Clone, Debug)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub top_level: Vec<Spanned<Stmt>>,
}

#[derive(Clone, Debug)]
pub struct ClassDef {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub superclass: Option<Spanned<String>>,
    pub super_args: Vec<Spanned<Expr>>,
    /// Loose statements in the class body — become `$constructor`'s body.
    pub ctor_body: Vec<Spanned<Stmt>>,
    pub methods: Vec<MethodDef>,
}

#[derive(Clone, Debug)]
pub struct Param {
    pub name: Spanned<String>,
    pub ty: Spanned<String>,
}

#[derive(Clone, Debug)]
pub struct MethodDef {
    pub name: Spanned<String>,
    pub params: Vec<Param>,
    pub return_ty: Option<Spanned<String>>,
    pub body: Vec<Spanned<Stmt>>,
}

/// Statements, pre- and post-transform. `IfRaw` only appears before
/// `transform::flatten_ifs` rewrites it into the right-nested `If` chain.
#[derive(Clone, Debug)]
pub enum Stmt {
    Expr(Spanned<Expr>),
    Assign {
        lvalue: Spanned<LValue>,
        ty: Option<Spanned<String>>,
        value: Spanned<Expr>,
    },
    IfRaw {
        cond: Spanned<Expr>,
        then_body: Vec<Spanned<Stmt>>,
        elifs: Vec<(Spanned<Expr>, Vec<Spanned<Stmt>>)>,
        else_body: Option<Vec<Spanned<Stmt>>>,
    },
    If(IfStmt),
    While {
        cond: Spanned<Expr>,
        body: Vec<Spanned<Stmt>>,
    },
    Return(Option<Spanned<Expr>>),
    Typecase {
        expr: Spanned<Expr>,
        arms: Vec<TypecaseArm>,
    },
}

/// Canonical (post-flattening) if/elif/else: a right-nested chain where
/// `els` holds at most one more `If` or the terminal `else` block.
#[derive(Clone, Debug)]
pub struct IfStmt {
    pub cond: Box<Spanned<Expr>>,
    pub then_body: Vec<Spanned<Stmt>>,
    pub els: Option<Else>,
}

#[derive(Clone, Debug)]
pub enum Else {
    ElseIf(Box<IfStmt>),
    Block(Vec<Spanned<Stmt>>),
}

#[derive(Clone, Debug)]
pub struct TypecaseArm {
    pub var: Spanned<String>,
    pub ty: Spanned<String>,
    pub body: Vec<Spanned<Stmt>>,
}

/// Assignable places.
#[derive(Clone, Debug)]
pub enum LValue {
    Ident(String),
    /// `this.field`
    FieldThis(String),
    /// `recv.field` — only valid when `recv` is `this` after identcheck;
    /// kept general so the parser doesn't need to special-case `this`.
    Field(Box<Spanned<Expr>>, String),
}

/// Expressions, pre-lowering. `BinOp`/`UnaryNeg` are rewritten into
/// `MethodCall` by `transform::lower_operators`.
#[derive(Clone, Debug)]
pub enum Expr {
    IntLit(i64),
    StringLit(String),
    /// Raw triple-quoted string body, pre-canonicalization.
    TripleStringLit(String),
    BoolLit(bool),
    NothingLit,
    This,
    Ident(String),
    FieldAccess(Box<Spanned<Expr>>, Spanned<String>),
    MethodCall {
        recv: Box<Spanned<Expr>>,
        method: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
    BinOp {
        op: BinOp,
        lhs: Box<Spanned<Expr>>,
        rhs: Box<Spanned<Expr>>,
    },
    UnaryNeg(Box<Spanned<Expr>>),
    And(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Or(Box<Spanned<Expr>>, Box<Spanned<Expr>>),
    Not(Box<Spanned<Expr>>),
    New {
        class: Spanned<String>,
        args: Vec<Spanned<Expr>>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,   // +
    Sub,   // -
    Mul,   // *
    Div,   // /
    Eq,    // ==
    Leq,   // <=
    Geq,   // >=
    Lt,    // <
    Gt,    // >
}

impl BinOp {
    /// The builtin method name this operator lowers to (`codegen`/`transform`
    /// ground this exactly on the method names in the builtin class catalog).
    pub fn method_name(&self) -> &'static str {
        match self {
            BinOp::Add => "plus",
            BinOp::Sub => "minus",
            BinOp::Mul => "times",
            BinOp::Div => "divide",
            BinOp::Eq => "equals",
            BinOp::Leq => "atmost",
            BinOp::Geq => "atleast",
            BinOp::Lt => "less",
            BinOp::Gt => "more",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Eq => "==",
            BinOp::Leq => "<=",
            BinOp::Geq => ">=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
        }
    }
}
