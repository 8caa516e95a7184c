use crate::ast::{Else, Expr, MethodDef, Spanned, Stmt};
use crate::span::Span;

/// Rewrites every blank `return;` into `return none;`, then appends a
/// trailing return if the method body is empty or doesn't already end in
/// one — `return this` for `$constructor`, `return none` everywhere else.
pub(crate) fn run(method: &mut MethodDef) {
    rewrite_blank_returns(&mut method.body);

    let ends_in_return = matches!(method.body.last().map(|s| &s.node), Some(Stmt::Return(_)));
    if !ends_in_return {
        let value = if method.name.node == "$constructor" {
            Expr::This
        } else {
            Expr::NothingLit
        };
        method.body.push(Spanned::new(
            Stmt::Return(Some(Spanned::new(value, Span::dummy()))),
            Span::dummy(),
        ));
    }
}

fn rewrite_blank_returns(stmts: &mut [Spanned<Stmt>]) {
    for stmt in stmts {
        match &mut stmt.node {
            Stmt::Return(value @ None) => {
                *value = Some(Spanned::new(Expr::NothingLit, Span::dummy()));
            }
            Stmt::If(if_stmt) => {
                rewrite_blank_returns(&mut if_stmt.then_body);
                if let Some(els) = &mut if_stmt.els {
                    match els {
                        Else::ElseIf(inner) => rewrite_blank_returns_if(inner),
                        Else::Block(body) => rewrite_blank_returns(body),
                    }
                }
            }
            Stmt::While { body, .. } => rewrite_blank_returns(body),
            Stmt::Typecase { arms, .. } => {
                for arm in arms {
                    rewrite_blank_returns(&mut arm.body);
                }
            }
            Stmt::IfRaw { .. } => {
                unreachable!("if_flatten runs before returns")
            }
            Stmt::Expr(_) | Stmt::Assign { .. } | Stmt::Return(Some(_)) => {}
        }
    }
}

fn rewrite_blank_returns_if(if_stmt: &mut crate::ast::IfStmt) {
    rewrite_blank_returns(&mut if_stmt.then_body);
    if let Some(els) = &mut if_stmt.els {
        match els {
            Else::ElseIf(inner) => rewrite_blank_returns_if(inner),
            Else::Block(body) => rewrite_blank_returns(body),
        }
    }
}
