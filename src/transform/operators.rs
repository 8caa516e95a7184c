use super::for_each_expr_mut;
use crate::ast::{Expr, Spanned, Stmt};
use crate::span::Span;

/// Rewrites `BinOp`/`UnaryNeg` nodes (parsed with ordinary arithmetic
/// precedence) into the `MethodCall`s they desugar to — `a + b` becomes
/// `a.plus(b)`, `-a` becomes `a.negate()`. `and`/`or`/`not` are left alone:
/// they stay special forms so codegen can short-circuit them.
pub(crate) fn run(stmts: &mut Vec<Spanned<Stmt>>) {
    for_each_expr_mut(stmts, &mut lower_one);
}

fn lower_one(expr: &mut Spanned<Expr>) {
    let span = expr.span;
    let placeholder = Spanned::new(Expr::NothingLit, Span::dummy());
    let taken = std::mem::replace(expr, placeholder);
    expr.node = match taken.node {
        Expr::BinOp { op, lhs, rhs } => Expr::MethodCall {
            recv: lhs,
            method: Spanned::new(op.method_name().to_string(), span),
            args: vec![*rhs],
        },
        Expr::UnaryNeg(inner) => Expr::MethodCall {
            recv: inner,
            method: Spanned::new("negate".to_string(), span),
            args: vec![],
        },
        other => other,
    };
    expr.span = span;
}
