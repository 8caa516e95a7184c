//! Desugaring passes, run in a fixed order from `run_all`. Two passes named
//! by the original grammar-based implementation — the method-invocation
//! receiver/argument swap and identifier-wrapper flattening — have no
//! counterpart here: the parser already builds `Expr::MethodCall` and plain
//! `Expr::Ident` directly, so there is nothing left to rewrite.

mod constructor;
mod if_flatten;
mod loose_statements;
mod operators;
mod returns;
mod strings;

use crate::ast::{ClassDef, Expr, Program, Spanned, Stmt};

/// Runs every transform pass over a freshly parsed program and returns the
/// final class list: loose statements captured, constructors synthesized,
/// if/elif/else flattened, operators lowered to method calls, string
/// literals canonicalized, and trailing returns inserted.
pub fn run_all(program: Program, main_class: &str) -> Vec<ClassDef> {
    let mut classes = loose_statements::capture(program, main_class);

    for class in &mut classes {
        constructor::synthesize(class);
    }

    for class in &mut classes {
        for method in &mut class.methods {
            if_flatten::run(&mut method.body);
            operators::run(&mut method.body);
            strings::run(&mut method.body);
        }
    }

    for class in &mut classes {
        for method in &mut class.methods {
            returns::run(method);
        }
    }

    classes
}

/// Applies `f` to every expression reachable from `stmts`, recursing into
/// nested statement blocks (if/elif/else, while, typecase arms).
pub(crate) fn for_each_expr_mut(stmts: &mut [Spanned<Stmt>], f: &mut impl FnMut(&mut Spanned<Expr>)) {
    for stmt in stmts {
        match &mut stmt.node {
            Stmt::Expr(e) => for_each_subexpr_mut(e, f),
            Stmt::Assign { value, .. } => for_each_subexpr_mut(value, f),
            Stmt::IfRaw {
                cond,
                then_body,
                elifs,
                else_body,
            } => {
                for_each_subexpr_mut(cond, f);
                for_each_expr_mut(then_body, f);
                for (econd, ebody) in elifs {
                    for_each_subexpr_mut(econd, f);
                    for_each_expr_mut(ebody, f);
                }
                if let Some(body) = else_body {
                    for_each_expr_mut(body, f);
                }
            }
            Stmt::If(if_stmt) => {
                for_each_subexpr_mut(&mut if_stmt.cond, f);
                for_each_expr_mut(&mut if_stmt.then_body, f);
                if let Some(els) = &mut if_stmt.els {
                    match els {
                        crate::ast::Else::ElseIf(inner) => {
                            for_each_subexpr_mut(&mut inner.cond, f);
                            for_each_expr_mut(&mut inner.then_body, f);
                        }
                        crate::ast::Else::Block(body) => for_each_expr_mut(body, f),
                    }
                }
            }
            Stmt::While { cond, body } => {
                for_each_subexpr_mut(cond, f);
                for_each_expr_mut(body, f);
            }
            Stmt::Return(Some(e)) => for_each_subexpr_mut(e, f),
            Stmt::Return(None) => {}
            Stmt::Typecase { expr, arms } => {
                for_each_subexpr_mut(expr, f);
                for arm in arms {
                    for_each_expr_mut(&mut arm.body, f);
                }
            }
        }
    }
}

/// Applies `f` bottom-up to `expr` and every sub-expression inside it.
pub(crate) fn for_each_subexpr_mut(expr: &mut Spanned<Expr>, f: &mut impl FnMut(&mut Spanned<Expr>)) {
    match &mut expr.node {
        Expr::FieldAccess(recv, _) => for_each_subexpr_mut(recv, f),
        Expr::MethodCall { recv, args, .. } => {
            for_each_subexpr_mut(recv, f);
            for a in args {
                for_each_subexpr_mut(a, f);
            }
        }
        Expr::BinOp { lhs, rhs, .. } => {
            for_each_subexpr_mut(lhs, f);
            for_each_subexpr_mut(rhs, f);
        }
        Expr::UnaryNeg(inner) | Expr::Not(inner) => for_each_subexpr_mut(inner, f),
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            for_each_subexpr_mut(lhs, f);
            for_each_subexpr_mut(rhs, f);
        }
        Expr::New { args, .. } => {
            for a in args {
                for_each_subexpr_mut(a, f);
            }
        }
        Expr::IntLit(_)
        | Expr::StringLit(_)
        | Expr::TripleStringLit(_)
        | Expr::BoolLit(_)
        | Expr::NothingLit
        | Expr::This
        | Expr::Ident(_) => {}
    }
    f(expr);
}
