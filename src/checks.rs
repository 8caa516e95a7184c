//! Semantic checks (C6), run once `typeinfer` has converged: inheritance
//! cycles, redefinition, identifier/class-name collisions, call-site arity
//! and subtyping, return-type conformance. Grounded on
//! `examples/original_source/hw4/manual_checks.py`.

use std::collections::HashSet;

use crate::ast::{ClassDef, Else, Expr, IfStmt, LValue, MethodDef, Spanned, Stmt};
use crate::classmap::Catalog;
use crate::diagnostic::Diagnostic;
use crate::typeinfer::infer_expr;

pub fn check_program(classes: &[ClassDef], catalog: &Catalog) -> Result<(), Diagnostic> {
    check_cycles(catalog)?;

    let mut uniq_classes: HashSet<String> = HashSet::new();
    for class in classes {
        check_class(class, catalog, &mut uniq_classes)?;
    }
    Ok(())
}

/// Incremental union-find cycle check over every (class, superclass) pair
/// in the final catalog, ported from `manual_checks.py`'s `cycle_check`.
fn check_cycles(catalog: &Catalog) -> Result<(), Diagnostic> {
    use std::collections::HashMap;

    let mut set_of: HashMap<String, String> = HashMap::new();
    for (clazz, record) in &catalog.classes {
        let superclass = &record.superclass;
        let class_set = set_of.get(clazz).cloned().unwrap_or_else(|| clazz.clone());
        let super_set = set_of
            .get(superclass)
            .cloned()
            .unwrap_or_else(|| superclass.clone());

        if class_set != super_set {
            for v in set_of.values_mut() {
                if *v == class_set {
                    *v = super_set.clone();
                }
            }
            set_of.insert(superclass.clone(), super_set.clone());
            set_of.insert(clazz.clone(), super_set);
        } else {
            return Err(Diagnostic::error(
                "cycle detected in the class hierarchy".to_string(),
                crate::span::Span::dummy(),
            ));
        }
    }
    Ok(())
}

fn check_class(
    class: &ClassDef,
    catalog: &Catalog,
    uniq_classes: &mut HashSet<String>,
) -> Result<(), Diagnostic> {
    if uniq_classes.contains(&class.name.node) {
        return Err(Diagnostic::error(
            format!("class `{}` is defined more than once", class.name.node),
            class.name.span,
        ));
    }
    uniq_classes.insert(class.name.node.clone());

    let mut uniq_methods: HashSet<String> = HashSet::new();
    for method in &class.methods {
        check_method(class, method, catalog, uniq_classes, &mut uniq_methods)?;
    }
    Ok(())
}

fn check_method(
    class: &ClassDef,
    method: &MethodDef,
    catalog: &Catalog,
    uniq_classes: &HashSet<String>,
    uniq_methods: &mut HashSet<String>,
) -> Result<(), Diagnostic> {
    if method.name.node != "$constructor" {
        if uniq_methods.contains(&method.name.node) {
            return Err(Diagnostic::error(
                format!(
                    "method `{}` is defined more than once in class `{}`",
                    method.name.node, class.name.node
                ),
                method.name.span,
            ));
        }
        if method.name.node == class.name.node {
            return Err(Diagnostic::error(
                format!(
                    "method `{}` has the same name as its enclosing class",
                    method.name.node
                ),
                method.name.span,
            ));
        }
        uniq_methods.insert(method.name.node.clone());
    }

    check_stmts(class, method, &method.body, catalog, uniq_classes)
}

fn check_stmts(
    class: &ClassDef,
    method: &MethodDef,
    stmts: &[Spanned<Stmt>],
    catalog: &Catalog,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    for stmt in stmts {
        check_stmt(class, method, stmt, catalog, uniq_classes)?;
    }
    Ok(())
}

fn check_stmt(
    class: &ClassDef,
    method: &MethodDef,
    stmt: &Spanned<Stmt>,
    catalog: &Catalog,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    match &stmt.node {
        Stmt::Expr(e) => check_expr(class, method, e, catalog, uniq_classes),
        Stmt::Assign { lvalue, value, .. } => {
            check_expr(class, method, value, catalog, uniq_classes)?;
            check_lvalue_name(&lvalue.node, lvalue.span, uniq_classes)?;
            if let LValue::Field(recv, _) = &lvalue.node {
                check_expr(class, method, recv, catalog, uniq_classes)?;
            }
            Ok(())
        }
        Stmt::If(if_stmt) => check_if(class, method, if_stmt, catalog, uniq_classes),
        Stmt::While { cond, body } => {
            check_expr(class, method, cond, catalog, uniq_classes)?;
            check_stmts(class, method, body, catalog, uniq_classes)
        }
        Stmt::Return(Some(e)) => {
            check_expr(class, method, e, catalog, uniq_classes)?;
            check_return(class, method, e, catalog)
        }
        Stmt::Return(None) => Ok(()),
        Stmt::Typecase { .. } => unreachable!("identcheck rejects typecase before checks"),
        Stmt::IfRaw { .. } => unreachable!("if_flatten runs before checks"),
    }
}

fn check_if(
    class: &ClassDef,
    method: &MethodDef,
    if_stmt: &IfStmt,
    catalog: &Catalog,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    check_expr(class, method, &if_stmt.cond, catalog, uniq_classes)?;
    check_stmts(class, method, &if_stmt.then_body, catalog, uniq_classes)?;
    match &if_stmt.els {
        Some(Else::Block(body)) => check_stmts(class, method, body, catalog, uniq_classes),
        Some(Else::ElseIf(inner)) => check_if(class, method, inner, catalog, uniq_classes),
        None => Ok(()),
    }
}

fn check_lvalue_name(
    lvalue: &LValue,
    span: crate::span::Span,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    let name = match lvalue {
        LValue::Ident(name) | LValue::FieldThis(name) | LValue::Field(_, name) => name,
    };
    check_name_collision(name, span, uniq_classes)
}

fn check_name_collision(
    name: &str,
    span: crate::span::Span,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    if uniq_classes.contains(name) {
        Err(Diagnostic::error(
            format!("identifier `{name}` has a clashing name with an existing class"),
            span,
        ))
    } else {
        Ok(())
    }
}

fn check_expr(
    class: &ClassDef,
    method: &MethodDef,
    expr: &Spanned<Expr>,
    catalog: &Catalog,
    uniq_classes: &HashSet<String>,
) -> Result<(), Diagnostic> {
    match &expr.node {
        Expr::IntLit(_)
        | Expr::StringLit(_)
        | Expr::TripleStringLit(_)
        | Expr::BoolLit(_)
        | Expr::NothingLit
        | Expr::This => Ok(()),
        Expr::Ident(name) => check_name_collision(name, expr.span, uniq_classes),
        Expr::FieldAccess(recv, field) => {
            check_name_collision(&field.node, field.span, uniq_classes)?;
            check_expr(class, method, recv, catalog, uniq_classes)
        }
        Expr::MethodCall { recv, method: m, args } => {
            check_expr(class, method, recv, catalog, uniq_classes)?;
            for arg in args {
                check_expr(class, method, arg, catalog, uniq_classes)?;
            }
            check_call_site(class, method, recv, m, args, catalog)
        }
        Expr::BinOp { lhs, rhs, .. } => {
            check_expr(class, method, lhs, catalog, uniq_classes)?;
            check_expr(class, method, rhs, catalog, uniq_classes)
        }
        Expr::UnaryNeg(inner) | Expr::Not(inner) => {
            check_expr(class, method, inner, catalog, uniq_classes)
        }
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            check_expr(class, method, lhs, catalog, uniq_classes)?;
            check_expr(class, method, rhs, catalog, uniq_classes)
        }
        Expr::New { args, .. } => {
            for arg in args {
                check_expr(class, method, arg, catalog, uniq_classes)?;
            }
            Ok(())
        }
    }
}

fn check_call_site(
    class: &ClassDef,
    method: &MethodDef,
    recv: &Spanned<Expr>,
    called: &Spanned<String>,
    args: &[Spanned<Expr>],
    catalog: &Catalog,
) -> Result<(), Diagnostic> {
    let recv_ty = infer_expr(&class.name.node, &method.name.node, recv, catalog)
        .map_err(|_| call_error(class, method, called, "could not resolve receiver type"))?;
    let Some(recv_class) = recv_ty.as_class() else {
        return Ok(());
    };
    let Some(record) = catalog.get(recv_class) else {
        return Ok(());
    };
    let Some(param_types) = record.method_args.get(&called.node) else {
        return Err(call_error(
            class,
            method,
            called,
            &format!("class `{recv_class}` has no method `{}`", called.node),
        ));
    };

    if args.len() != param_types.len() {
        return Err(call_error(
            class,
            method,
            called,
            &format!(
                "expected {} argument(s), got {}",
                param_types.len(),
                args.len()
            ),
        ));
    }

    for (i, (arg, param_ty)) in args.iter().zip(param_types.iter()).enumerate() {
        let arg_ty = infer_expr(&class.name.node, &method.name.node, arg, catalog)
            .map_err(|_| call_error(class, method, called, "could not resolve argument type"))?;
        if catalog.lca(param_ty, &arg_ty) != *param_ty {
            return Err(call_error(
                class,
                method,
                called,
                &format!(
                    "argument {} to `{}` expected `{param_ty}`, got `{arg_ty}`",
                    i + 1,
                    called.node
                ),
            ));
        }
    }
    Ok(())
}

fn call_error(class: &ClassDef, method: &MethodDef, called: &Spanned<String>, detail: &str) -> Diagnostic {
    Diagnostic::error(
        format!(
            "method invocation of `{}` within `{}.{}`: {detail}",
            called.node, class.name.node, method.name.node
        ),
        called.span,
    )
}

fn check_return(
    class: &ClassDef,
    method: &MethodDef,
    returned: &Spanned<Expr>,
    catalog: &Catalog,
) -> Result<(), Diagnostic> {
    let record = catalog.get(&class.name.node).expect("class in catalog");
    let decl_ty = record
        .method_returns
        .get(&method.name.node)
        .expect("method registered by typeinfer")
        .clone();
    let infr_ty = infer_expr(&class.name.node, &method.name.node, returned, catalog)
        .map_err(|_| returned_error(class, method))?;
    if catalog.lca(&decl_ty, &infr_ty) != decl_ty {
        return Err(Diagnostic::error(
            format!(
                "return in `{}.{}` expected `{decl_ty}`, got `{infr_ty}`",
                class.name.node, method.name.node
            ),
            returned.span,
        ));
    }
    Ok(())
}

fn returned_error(class: &ClassDef, method: &MethodDef) -> Diagnostic {
    Diagnostic::error(
        format!(
            "could not resolve the type of a return expression in `{}.{}`",
            class.name.node, method.name.node
        ),
        class.name.span,
    )
}
