//! Identifier-usage pass (C4): flow-sensitive definedness check for locals
//! and `this`-fields, with branch-intersection for `if` and snapshot/restore
//! for `while`. Also where `typecase` is rejected as unsupported.

use std::collections::HashSet;

use crate::ast::{ClassDef, Else, Expr, IfStmt, LValue, MethodDef, Spanned, Stmt};
use crate::diagnostic::Diagnostic;

struct ClassCtx {
    /// Fields assigned inside the constructor — the only way a field
    /// becomes "declared".
    declared_fields: HashSet<String>,
    /// Every `this.field` ever read or written, across all methods.
    used_fields: HashSet<String>,
}

pub fn check_program(classes: &[ClassDef]) -> Result<(), Diagnostic> {
    for class in classes {
        check_class(class)?;
    }
    Ok(())
}

fn check_class(class: &ClassDef) -> Result<(), Diagnostic> {
    let mut ctx = ClassCtx {
        declared_fields: HashSet::new(),
        used_fields: HashSet::new(),
    };

    for method in &class.methods {
        check_method(method, &mut ctx)?;
    }

    for field in &ctx.used_fields {
        if !ctx.declared_fields.contains(field) {
            return Err(Diagnostic::error(
                format!(
                    "field `{field}` on class `{}` used before being assigned in its constructor",
                    class.name.node
                ),
                class.name.span,
            ));
        }
    }
    Ok(())
}

fn check_method(method: &MethodDef, ctx: &mut ClassCtx) -> Result<(), Diagnostic> {
    let is_ctor = method.name.node == "$constructor";
    let mut locals: HashSet<String> = method.params.iter().map(|p| p.name.node.clone()).collect();
    check_stmts(&method.body, &mut locals, is_ctor, ctx)
}

fn check_stmts(
    stmts: &[Spanned<Stmt>],
    locals: &mut HashSet<String>,
    is_ctor: bool,
    ctx: &mut ClassCtx,
) -> Result<(), Diagnostic> {
    for stmt in stmts {
        check_stmt(stmt, locals, is_ctor, ctx)?;
    }
    Ok(())
}

fn check_stmt(
    stmt: &Spanned<Stmt>,
    locals: &mut HashSet<String>,
    is_ctor: bool,
    ctx: &mut ClassCtx,
) -> Result<(), Diagnostic> {
    match &stmt.node {
        Stmt::Expr(e) => check_expr(e, locals, ctx),
        Stmt::Assign { lvalue, value, .. } => {
            check_expr(value, locals, ctx)?;
            match &lvalue.node {
                LValue::Ident(name) => {
                    locals.insert(name.clone());
                    Ok(())
                }
                LValue::FieldThis(name) => {
                    if is_ctor {
                        ctx.declared_fields.insert(name.clone());
                    }
                    ctx.used_fields.insert(name.clone());
                    Ok(())
                }
                LValue::Field(recv, _) => check_expr(recv, locals, ctx),
            }
        }
        Stmt::If(if_stmt) => check_if(if_stmt, locals, is_ctor, ctx),
        Stmt::While { cond, body } => {
            check_expr(cond, locals, ctx)?;
            let saved_locals = locals.clone();
            let saved_fields = ctx.declared_fields.clone();
            check_stmts(body, locals, is_ctor, ctx)?;
            *locals = saved_locals;
            ctx.declared_fields = saved_fields;
            Ok(())
        }
        Stmt::Return(Some(e)) => check_expr(e, locals, ctx),
        Stmt::Return(None) => Ok(()),
        Stmt::Typecase { .. } => Err(Diagnostic::error(
            "`typecase` is not supported".to_string(),
            stmt.span,
        )),
        Stmt::IfRaw { .. } => unreachable!("if_flatten runs before identcheck"),
    }
}

fn check_if(
    if_stmt: &IfStmt,
    locals: &mut HashSet<String>,
    is_ctor: bool,
    ctx: &mut ClassCtx,
) -> Result<(), Diagnostic> {
    check_expr(&if_stmt.cond, locals, ctx)?;

    let saved_locals = locals.clone();
    let saved_fields = ctx.declared_fields.clone();

    check_stmts(&if_stmt.then_body, locals, is_ctor, ctx)?;
    let branch1_locals = std::mem::replace(locals, saved_locals.clone());
    let branch1_fields = std::mem::replace(&mut ctx.declared_fields, saved_fields.clone());

    let (branch2_locals, branch2_fields) = match &if_stmt.els {
        Some(Else::Block(body)) => {
            check_stmts(body, locals, is_ctor, ctx)?;
            let l = std::mem::replace(locals, saved_locals.clone());
            let f = std::mem::replace(&mut ctx.declared_fields, saved_fields.clone());
            (l, f)
        }
        Some(Else::ElseIf(inner)) => {
            check_if(inner, locals, is_ctor, ctx)?;
            let l = std::mem::replace(locals, saved_locals.clone());
            let f = std::mem::replace(&mut ctx.declared_fields, saved_fields.clone());
            (l, f)
        }
        None => (saved_locals.clone(), saved_fields.clone()),
    };

    *locals = branch1_locals.intersection(&branch2_locals).cloned().collect();
    ctx.declared_fields = branch1_fields
        .intersection(&branch2_fields)
        .cloned()
        .collect();
    Ok(())
}

fn check_expr(
    expr: &Spanned<Expr>,
    locals: &HashSet<String>,
    ctx: &mut ClassCtx,
) -> Result<(), Diagnostic> {
    match &expr.node {
        Expr::IntLit(_)
        | Expr::StringLit(_)
        | Expr::TripleStringLit(_)
        | Expr::BoolLit(_)
        | Expr::NothingLit
        | Expr::This => Ok(()),
        Expr::Ident(name) => {
            if locals.contains(name) {
                Ok(())
            } else {
                Err(Diagnostic::error(
                    format!("identifier `{name}` used before it is assigned"),
                    expr.span,
                ))
            }
        }
        Expr::FieldAccess(recv, field) => {
            if matches!(recv.node, Expr::This) {
                ctx.used_fields.insert(field.node.clone());
                Ok(())
            } else {
                // Cross-class field access: only `recv`'s own identifier
                // usage is checked here; resolving the field itself is
                // `typeinfer`/`checks`'s job.
                check_expr(recv, locals, ctx)
            }
        }
        Expr::MethodCall { recv, args, .. } => {
            check_expr(recv, locals, ctx)?;
            for arg in args {
                check_expr(arg, locals, ctx)?;
            }
            Ok(())
        }
        Expr::BinOp { lhs, rhs, .. } => {
            check_expr(lhs, locals, ctx)?;
            check_expr(rhs, locals, ctx)
        }
        Expr::UnaryNeg(inner) | Expr::Not(inner) => check_expr(inner, locals, ctx),
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            check_expr(lhs, locals, ctx)?;
            check_expr(rhs, locals, ctx)
        }
        Expr::New { args, .. } => {
            for arg in args {
                check_expr(arg, locals, ctx)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::transform;

    fn classes(source: &str) -> Vec<ClassDef> {
        let (tokens, _) = Lexer::new(source, 0).tokenize();
        let program = Parser::new(tokens).parse_program().unwrap();
        transform::run_all(program, "Main")
    }

    #[test]
    fn test_simple_program_passes() {
        let classes = classes("x: Int = 1; y: Int = x + 1;");
        assert!(check_program(&classes).is_ok());
    }

    #[test]
    fn test_use_before_assignment_fails() {
        let classes = classes("y: Int = x + 1;");
        assert!(check_program(&classes).is_err());
    }

    #[test]
    fn test_constructor_field_declared_then_used() {
        let classes = classes("class Point(x: Int) { this.x = x; def get() : Int { return this.x; } }");
        assert!(check_program(&classes).is_ok());
    }

    #[test]
    fn test_field_used_without_constructor_declaration_fails() {
        let classes =
            classes("class Point() { def bump() : Nothing { this.x = 1; } def get() : Int { return this.y; } }");
        assert!(check_program(&classes).is_err());
    }

    #[test]
    fn test_if_else_both_branches_define_intersect() {
        let classes = classes("if true { x = 1; } else { x = 2; } y: Int = x;");
        assert!(check_program(&classes).is_ok());
    }

    #[test]
    fn test_if_without_else_does_not_define_after() {
        let classes = classes("if true { x = 1; } y: Int = x;");
        assert!(check_program(&classes).is_err());
    }

    #[test]
    fn test_while_body_assignment_discarded_after_loop() {
        let classes = classes("while true { x = 1; } y: Int = x;");
        assert!(check_program(&classes).is_err());
    }

    #[test]
    fn test_typecase_rejected() {
        let classes = classes("typecase x { y: Int { z = 1; } }");
        assert!(check_program(&classes).is_err());
    }
}
