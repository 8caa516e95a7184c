//! Fixed-point type inference (C5): a monotone lattice iteration over
//! assignments, declarations, method-call returns, field accesses, and
//! `this`, grounded line-for-line on
//! `examples/original_source/hw4/type_inf.py`.

use indexmap::IndexMap;

use crate::ast::{ClassDef, Else, Expr, IfStmt, LValue, MethodDef, Spanned, Stmt};
use crate::classmap::{Catalog, ClassRecord, Ty};
use crate::diagnostic::Diagnostic;

/// Runs outer passes until no catalog entry changes, populating `catalog`
/// with every user class and method encountered in `classes`.
pub fn infer(classes: &[ClassDef], catalog: &mut Catalog) -> Result<(), Diagnostic> {
    let mut changed = true;
    while changed {
        changed = false;
        for class in classes {
            infer_class(class, catalog, &mut changed)?;
        }
    }

    for class in classes {
        check_formal_params_stable(class, catalog)?;
    }
    Ok(())
}

fn infer_class(class: &ClassDef, catalog: &mut Catalog, changed: &mut bool) -> Result<(), Diagnostic> {
    let name = &class.name.node;
    let superclass = class
        .superclass
        .as_ref()
        .map(|s| s.node.clone())
        .unwrap_or_else(|| "Obj".to_string());

    if !catalog.contains(name) {
        let parent = catalog.get(&superclass).cloned().ok_or_else(|| {
            Diagnostic::error(
                format!("class `{name}` inherits from unknown superclass `{superclass}`"),
                class.name.span,
            )
        })?;
        let mut record: ClassRecord = parent;
        record.superclass = superclass.clone();
        record.method_locals = IndexMap::new();
        catalog.classes.insert(name.clone(), record);
    }

    for method in &class.methods {
        infer_method(name, method, catalog, changed)?;
    }
    Ok(())
}

fn infer_method(
    class_name: &str,
    method: &MethodDef,
    catalog: &mut Catalog,
    changed: &mut bool,
) -> Result<(), Diagnostic> {
    let method_name = &method.name.node;
    let return_ty = method
        .return_ty
        .as_ref()
        .map(|t| Ty::class(t.node.clone()))
        .unwrap_or_else(|| Ty::class("Nothing"));

    let record = catalog.get_mut(class_name).expect("class registered above");
    record
        .method_returns
        .insert(method_name.clone(), return_ty);

    if !record.method_locals.contains_key(method_name) {
        let mut locals = IndexMap::new();
        let mut arg_types = Vec::new();
        let mut arg_names = Vec::new();
        for param in &method.params {
            let ty = Ty::class(param.ty.node.clone());
            locals.insert(param.name.node.clone(), ty.clone());
            arg_types.push(ty);
            arg_names.push(param.name.node.clone());
        }
        record.method_locals.insert(method_name.clone(), locals);
        record.method_args.insert(method_name.clone(), arg_types);
        record
            .method_arg_names
            .insert(method_name.clone(), arg_names);
    }

    infer_stmts(class_name, method_name, &method.body, catalog, changed)
}

fn infer_stmts(
    class_name: &str,
    method_name: &str,
    stmts: &[Spanned<Stmt>],
    catalog: &mut Catalog,
    changed: &mut bool,
) -> Result<(), Diagnostic> {
    for stmt in stmts {
        infer_stmt(class_name, method_name, stmt, catalog, changed)?;
    }
    Ok(())
}

fn infer_stmt(
    class_name: &str,
    method_name: &str,
    stmt: &Spanned<Stmt>,
    catalog: &mut Catalog,
    changed: &mut bool,
) -> Result<(), Diagnostic> {
    match &stmt.node {
        Stmt::Expr(e) => {
            infer_expr(class_name, method_name, e, catalog)?;
            Ok(())
        }
        Stmt::Assign { lvalue, ty, value } => {
            infer_assign(class_name, method_name, lvalue, ty.as_ref(), value, catalog, changed)
        }
        Stmt::If(if_stmt) => infer_if(class_name, method_name, if_stmt, catalog, changed),
        Stmt::While { cond, body } => {
            let cond_ty = infer_expr(class_name, method_name, cond, catalog)?;
            require_boolean(catalog, &cond_ty, "while", cond.span)?;
            infer_stmts(class_name, method_name, body, catalog, changed)
        }
        Stmt::Return(Some(e)) => {
            infer_expr(class_name, method_name, e, catalog)?;
            Ok(())
        }
        Stmt::Return(None) => Ok(()),
        Stmt::Typecase { .. } => unreachable!("identcheck rejects typecase before typeinfer"),
        Stmt::IfRaw { .. } => unreachable!("if_flatten runs before typeinfer"),
    }
}

fn infer_if(
    class_name: &str,
    method_name: &str,
    if_stmt: &IfStmt,
    catalog: &mut Catalog,
    changed: &mut bool,
) -> Result<(), Diagnostic> {
    let cond_ty = infer_expr(class_name, method_name, &if_stmt.cond, catalog)?;
    require_boolean(catalog, &cond_ty, "if", if_stmt.cond.span)?;
    infer_stmts(class_name, method_name, &if_stmt.then_body, catalog, changed)?;
    match &if_stmt.els {
        Some(Else::Block(body)) => infer_stmts(class_name, method_name, body, catalog, changed),
        Some(Else::ElseIf(inner)) => infer_if(class_name, method_name, inner, catalog, changed),
        None => Ok(()),
    }
}

fn infer_assign(
    class_name: &str,
    method_name: &str,
    lvalue: &Spanned<LValue>,
    declared_ty: Option<&Spanned<String>>,
    value: &Spanned<Expr>,
    catalog: &mut Catalog,
    changed: &mut bool,
) -> Result<(), Diagnostic> {
    let prev0 = lvalue_type(class_name, method_name, &lvalue.node, catalog);

    let prev1 = if let Some(decl) = declared_ty {
        let joined = catalog.lca(&prev0, &Ty::class(decl.node.clone()));
        if joined != prev0 {
            set_lvalue_type(class_name, method_name, &lvalue.node, joined.clone(), catalog);
            *changed = true;
        }
        joined
    } else {
        prev0
    };

    let value_ty = infer_expr(class_name, method_name, value, catalog)?;
    let curr = catalog.lca(&prev1, &value_ty);
    if curr != prev1 {
        set_lvalue_type(class_name, method_name, &lvalue.node, curr, catalog);
        *changed = true;
    }
    Ok(())
}

fn lvalue_type(class_name: &str, method_name: &str, lvalue: &LValue, catalog: &Catalog) -> Ty {
    match lvalue {
        LValue::Ident(name) => catalog
            .get(class_name)
            .and_then(|r| r.method_locals.get(method_name))
            .and_then(|locals| locals.get(name))
            .cloned()
            .unwrap_or(Ty::Bottom),
        LValue::FieldThis(name) => catalog
            .get(class_name)
            .and_then(|r| r.fields.get(name))
            .cloned()
            .unwrap_or(Ty::Bottom),
        LValue::Field(recv, name) => {
            let recv_ty = infer_expr(class_name, method_name, recv, catalog).unwrap_or(Ty::Bottom);
            match recv_ty.as_class() {
                Some(c) => catalog
                    .get(c)
                    .and_then(|r| r.fields.get(name))
                    .cloned()
                    .unwrap_or(Ty::Bottom),
                None => Ty::Bottom,
            }
        }
    }
}

fn set_lvalue_type(
    class_name: &str,
    method_name: &str,
    lvalue: &LValue,
    new_type: Ty,
    catalog: &mut Catalog,
) {
    match lvalue {
        LValue::Ident(name) => {
            if let Some(record) = catalog.get_mut(class_name) {
                if let Some(locals) = record.method_locals.get_mut(method_name) {
                    locals.insert(name.clone(), new_type);
                }
            }
        }
        LValue::FieldThis(name) => {
            if let Some(record) = catalog.get_mut(class_name) {
                record.fields.insert(name.clone(), new_type);
            }
        }
        LValue::Field(recv, name) => {
            let recv_ty = infer_expr(class_name, method_name, recv, catalog).unwrap_or(Ty::Bottom);
            if let Some(c) = recv_ty.as_class() {
                let c = c.to_string();
                if let Some(record) = catalog.get_mut(&c) {
                    record.fields.insert(name.clone(), new_type);
                }
            }
        }
    }
}

/// Re-infers a single expression's type against an already-converged
/// catalog. `checks` reuses this at call sites and return statements rather
/// than duplicating the resolution rules, unlike `manual_checks.py`'s
/// `infer_type`, which re-implements them.
pub(crate) fn infer_expr(
    class_name: &str,
    method_name: &str,
    expr: &Spanned<Expr>,
    catalog: &Catalog,
) -> Result<Ty, Diagnostic> {
    let ty = match &expr.node {
        Expr::IntLit(_) => Ty::class("Int"),
        Expr::StringLit(_) | Expr::TripleStringLit(_) => Ty::class("String"),
        Expr::BoolLit(_) => Ty::class("Boolean"),
        Expr::NothingLit => Ty::class("Nothing"),
        Expr::This => Ty::class(class_name.to_string()),
        Expr::Ident(name) => catalog
            .get(class_name)
            .and_then(|r| r.method_locals.get(method_name))
            .and_then(|locals| locals.get(name))
            .cloned()
            .unwrap_or(Ty::Bottom),
        Expr::FieldAccess(recv, field) => {
            if matches!(recv.node, Expr::This) {
                catalog
                    .get(class_name)
                    .and_then(|r| r.fields.get(&field.node))
                    .cloned()
                    .unwrap_or(Ty::Bottom)
            } else {
                let recv_ty = infer_expr(class_name, method_name, recv, catalog)?;
                match recv_ty.as_class() {
                    Some(c) => catalog
                        .get(c)
                        .and_then(|r| r.fields.get(&field.node))
                        .cloned()
                        .unwrap_or(Ty::Bottom),
                    None => Ty::Bottom,
                }
            }
        }
        Expr::MethodCall { recv, method, args } => {
            let recv_ty = infer_expr(class_name, method_name, recv, catalog)?;
            for arg in args {
                infer_expr(class_name, method_name, arg, catalog)?;
            }
            match recv_ty.as_class() {
                Some(c) => catalog
                    .get(c)
                    .and_then(|r| r.method_returns.get(&method.node))
                    .cloned()
                    .unwrap_or(Ty::Bottom),
                None => Ty::Bottom,
            }
        }
        Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
            let lhs_ty = infer_expr(class_name, method_name, lhs, catalog)?;
            require_boolean(catalog, &lhs_ty, "and/or", lhs.span)?;
            let rhs_ty = infer_expr(class_name, method_name, rhs, catalog)?;
            require_boolean(catalog, &rhs_ty, "and/or", rhs.span)?;
            Ty::class("Boolean")
        }
        Expr::Not(inner) => {
            let inner_ty = infer_expr(class_name, method_name, inner, catalog)?;
            require_boolean(catalog, &inner_ty, "not", inner.span)?;
            Ty::class("Boolean")
        }
        Expr::New { class, args } => {
            for arg in args {
                infer_expr(class_name, method_name, arg, catalog)?;
            }
            Ty::class(class.node.clone())
        }
        Expr::BinOp { .. } | Expr::UnaryNeg(_) => {
            unreachable!("transform::operators lowers BinOp/UnaryNeg before typeinfer")
        }
    };
    Ok(ty)
}

fn require_boolean(catalog: &Catalog, ty: &Ty, context: &str, span: crate::span::Span) -> Result<(), Diagnostic> {
    if catalog.lca(ty, &Ty::class("Boolean")) == Ty::class("Boolean") {
        Ok(())
    } else {
        Err(Diagnostic::error(
            format!("{context} expression does not have a Boolean value (found `{ty}`)"),
            span,
        ))
    }
}

fn check_formal_params_stable(class: &ClassDef, catalog: &Catalog) -> Result<(), Diagnostic> {
    let record = catalog.get(&class.name.node).expect("class registered");
    for method in &class.methods {
        let Some(locals) = record.method_locals.get(&method.name.node) else {
            continue;
        };
        for param in &method.params {
            let inferred = locals.get(&param.name.node).cloned().unwrap_or(Ty::Bottom);
            let declared = Ty::class(param.ty.node.clone());
            if inferred != declared {
                return Err(Diagnostic::error(
                    format!(
                        "formal parameter `{}` of `{}.{}` was declared `{}` but has inferred type `{}`",
                        param.name.node, class.name.node, method.name.node, declared, inferred
                    ),
                    param.name.span,
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::transform;

    fn run(source: &str) -> (Vec<ClassDef>, Catalog) {
        let (tokens, _) = Lexer::new(source, 0).tokenize();
        let program = Parser::new(tokens).parse_program().unwrap();
        let classes = transform::run_all(program, "Main");
        let mut catalog = Catalog::with_builtins();
        infer(&classes, &mut catalog).unwrap();
        (classes, catalog)
    }

    #[test]
    fn test_int_literal_infers_int() {
        let (_, catalog) = run("x = 1;");
        let main = catalog.get("Main").unwrap();
        assert_eq!(
            main.method_locals["$constructor"]["x"],
            Ty::class("Int")
        );
    }

    #[test]
    fn test_declared_type_joins_with_value() {
        let (_, catalog) = run("x: Obj = 1;");
        let main = catalog.get("Main").unwrap();
        assert_eq!(main.method_locals["$constructor"]["x"], Ty::class("Obj"));
    }

    #[test]
    fn test_this_field_infers_from_assignment() {
        let (_, catalog) = run("class Point(x: Int) { this.x = x; }");
        let point = catalog.get("Point").unwrap();
        assert_eq!(point.fields["x"], Ty::class("Int"));
    }

    #[test]
    fn test_method_call_return_type() {
        let (_, catalog) = run("x = 1; y = x.plus(2);");
        let main = catalog.get("Main").unwrap();
        assert_eq!(main.method_locals["$constructor"]["y"], Ty::class("Int"));
    }

    #[test]
    fn test_if_with_non_boolean_condition_errors() {
        let (tokens, _) = Lexer::new("if 1 { x = 1; }", 0).tokenize();
        let program = Parser::new(tokens).parse_program().unwrap();
        let classes = transform::run_all(program, "Main");
        let mut catalog = Catalog::with_builtins();
        assert!(infer(&classes, &mut catalog).is_err());
    }

    #[test]
    fn test_inherited_field_joins_through_subclass() {
        let (_, catalog) = run(
            "class Animal() { this.name = \"rex\"; } class Dog() extends Animal { this.name = \"fido\"; }",
        );
        let dog = catalog.get("Dog").unwrap();
        assert_eq!(dog.fields["name"], Ty::class("String"));
    }

    #[test]
    fn test_unknown_superclass_errors() {
        let (tokens, _) = Lexer::new("class A() extends Ghost {}", 0).tokenize();
        let program = Parser::new(tokens).parse_program().unwrap();
        let classes = transform::run_all(program, "Main");
        let mut catalog = Catalog::with_builtins();
        assert!(infer(&classes, &mut catalog).is_err());
    }
}
