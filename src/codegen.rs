//! Stack-machine code generation (C7): one `Emitter` walks the whole
//! program so label counters and method buffers share state the way
//! `examples/original_source/hw4/code_gen.py`'s single `QuackASMGen`
//! instance does, then renders the per-class assembly text described in
//! spec.md §6.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::ast::{ClassDef, Else, Expr, IfStmt, LValue, MethodDef, Spanned, Stmt};
use crate::classmap::Catalog;
use crate::diagnostic::Diagnostic;
use crate::typeinfer::infer_expr;

enum Line {
    Instr(String),
    Label(String),
}

pub struct Emitter<'a> {
    catalog: &'a Catalog,
    label_counts: HashMap<String, u32>,
    sc_true: Option<String>,
    sc_false: Option<String>,
    sc_stack: Vec<(Option<String>, Option<String>)>,
    current_class: String,
    current_method: String,
    lines: Vec<Line>,
}

/// Generates assembly for every class, in declaration order.
pub fn generate(classes: &[ClassDef], catalog: &Catalog) -> Result<IndexMap<String, String>, Diagnostic> {
    let mut emitter = Emitter::new(catalog);
    let mut out = IndexMap::new();
    for class in classes {
        out.insert(class.name.node.clone(), emitter.emit_class(class)?);
    }
    Ok(out)
}

impl<'a> Emitter<'a> {
    fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            label_counts: HashMap::new(),
            sc_true: None,
            sc_false: None,
            sc_stack: Vec::new(),
            current_class: String::new(),
            current_method: String::new(),
            lines: Vec::new(),
        }
    }

    fn emit_class(&mut self, class: &ClassDef) -> Result<String, Diagnostic> {
        let record = self
            .catalog
            .get(&class.name.node)
            .expect("every class is registered by typeinfer before codegen");

        let mut out = format!(".class {}:{}\n", class.name.node, record.superclass);
        for field in record.fields.keys() {
            out.push_str(&format!(".field {field}\n"));
        }
        for method in &class.methods {
            if method.name.node != "$constructor" {
                out.push_str(&format!(".method {} forward\n", method.name.node));
            }
        }

        for method in &class.methods {
            out.push('\n');
            out.push_str(&self.emit_method(class, method)?);
        }
        Ok(out)
    }

    fn emit_method(&mut self, class: &ClassDef, method: &MethodDef) -> Result<String, Diagnostic> {
        self.current_class = class.name.node.clone();
        self.current_method = method.name.node.clone();
        self.lines.clear();

        self.emit_stmts(&method.body)?;

        let record = self
            .catalog
            .get(&class.name.node)
            .expect("class registered by typeinfer");
        let arg_names: Vec<String> = method.params.iter().map(|p| p.name.node.clone()).collect();
        let local_names: Vec<String> = record
            .method_locals
            .get(&method.name.node)
            .map(|locals| {
                locals
                    .keys()
                    .filter(|name| !arg_names.contains(name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        let mut out = format!(".method {}\n", method.name.node);
        if !arg_names.is_empty() {
            out.push_str(&format!(".args {}\n", arg_names.join(",")));
        }
        if !local_names.is_empty() {
            out.push_str(&format!(".local {}\n", local_names.join(",")));
        }
        for line in &self.lines {
            match line {
                Line::Instr(s) => out.push_str(&format!("\t{s}\n")),
                Line::Label(name) => out.push_str(&format!("{name}:\n")),
            }
        }
        Ok(out)
    }

    fn instr(&mut self, s: impl Into<String>) {
        self.lines.push(Line::Instr(s.into()));
    }

    fn label_def(&mut self, name: &str) {
        self.lines.push(Line::Label(name.to_string()));
    }

    fn gen_label(&mut self, prefix: &str) -> String {
        let counter = self.label_counts.entry(prefix.to_string()).or_insert(0);
        *counter += 1;
        format!("{prefix}_{counter}")
    }

    fn push_sc(&mut self, sc_true: Option<String>, sc_false: Option<String>) {
        self.sc_stack.push((
            std::mem::replace(&mut self.sc_true, sc_true),
            std::mem::replace(&mut self.sc_false, sc_false),
        ));
    }

    fn pop_sc(&mut self) {
        let (t, f) = self.sc_stack.pop().expect("push_sc/pop_sc calls are balanced");
        self.sc_true = t;
        self.sc_false = f;
    }

    fn resolve_class(&self, expr: &Spanned<Expr>) -> Result<String, Diagnostic> {
        let ty = infer_expr(&self.current_class, &self.current_method, expr, self.catalog)?;
        ty.as_class().map(str::to_string).ok_or_else(|| {
            Diagnostic::error(
                "could not resolve a concrete class for this expression".to_string(),
                expr.span,
            )
        })
    }

    fn emit_stmts(&mut self, stmts: &[Spanned<Stmt>]) -> Result<(), Diagnostic> {
        for stmt in stmts {
            self.emit_stmt(stmt)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, stmt: &Spanned<Stmt>) -> Result<(), Diagnostic> {
        match &stmt.node {
            Stmt::Expr(e) => self.emit_expr(e),
            Stmt::Assign { lvalue, value, .. } => {
                self.emit_expr(value)?;
                self.emit_store(&lvalue.node)
            }
            Stmt::If(if_stmt) => self.emit_if(if_stmt),
            Stmt::While { cond, body } => self.emit_while(cond, body),
            Stmt::Return(Some(e)) => {
                self.emit_expr(e)?;
                self.emit_return()
            }
            Stmt::Return(None) => unreachable!("transform::returns rewrites every bare return"),
            Stmt::Typecase { .. } => unreachable!("identcheck rejects typecase before codegen"),
            Stmt::IfRaw { .. } => unreachable!("if_flatten runs before codegen"),
        }
    }

    fn emit_return(&mut self) -> Result<(), Diagnostic> {
        let nargs = self
            .catalog
            .get(&self.current_class)
            .and_then(|r| r.method_args.get(&self.current_method))
            .map(Vec::len)
            .unwrap_or(0);
        self.instr(format!("return {nargs}"));
        Ok(())
    }

    fn emit_store(&mut self, lvalue: &LValue) -> Result<(), Diagnostic> {
        match lvalue {
            LValue::Ident(name) => {
                self.instr(format!("store {name}"));
                Ok(())
            }
            LValue::FieldThis(name) => {
                self.instr("load $");
                self.instr(format!("store_field $:{name}"));
                Ok(())
            }
            LValue::Field(recv, name) => {
                self.emit_expr(recv)?;
                let recv_class = self.resolve_class(recv)?;
                self.instr(format!("store_field {recv_class}:{name}"));
                Ok(())
            }
        }
    }

    fn emit_if(&mut self, if_stmt: &IfStmt) -> Result<(), Diagnostic> {
        match &if_stmt.els {
            None => {
                let branch1 = self.gen_label("ifbranch1");
                let end = self.gen_label("ifend");
                self.push_sc(Some(branch1.clone()), Some(end.clone()));
                self.emit_expr(&if_stmt.cond)?;
                self.pop_sc();
                self.instr(format!("jump_ifnot {end}"));
                self.label_def(&branch1);
                self.emit_stmts(&if_stmt.then_body)?;
                self.label_def(&end);
                Ok(())
            }
            Some(els) => {
                let branch1 = self.gen_label("ifbranch1");
                let branch2 = self.gen_label("ifbranch2");
                let end = self.gen_label("ifend");
                self.push_sc(Some(branch1.clone()), Some(branch2.clone()));
                self.emit_expr(&if_stmt.cond)?;
                self.pop_sc();
                self.instr(format!("jump_ifnot {branch2}"));
                self.label_def(&branch1);
                self.emit_stmts(&if_stmt.then_body)?;
                self.instr(format!("jump {end}"));
                self.label_def(&branch2);
                match els {
                    Else::Block(body) => self.emit_stmts(body)?,
                    Else::ElseIf(inner) => self.emit_if(inner)?,
                }
                self.label_def(&end);
                Ok(())
            }
        }
    }

    fn emit_while(&mut self, cond: &Spanned<Expr>, body: &[Spanned<Stmt>]) -> Result<(), Diagnostic> {
        let loop_label = self.gen_label("whileloop");
        let end_label = self.gen_label("whileend");
        let cond_label = self.gen_label("whilecond");

        self.instr(format!("jump {cond_label}"));
        self.label_def(&loop_label);
        self.emit_stmts(body)?;
        self.label_def(&cond_label);

        self.push_sc(Some(loop_label.clone()), Some(end_label.clone()));
        self.emit_expr(cond)?;
        self.pop_sc();
        self.instr(format!("jump_if {loop_label}"));
        self.label_def(&end_label);
        Ok(())
    }

    fn emit_expr(&mut self, expr: &Spanned<Expr>) -> Result<(), Diagnostic> {
        match &expr.node {
            Expr::IntLit(n) => {
                self.instr(format!("const {n}"));
                Ok(())
            }
            Expr::StringLit(s) => {
                self.instr(format!("const {s:?}"));
                Ok(())
            }
            Expr::TripleStringLit(_) => {
                unreachable!("transform::strings canonicalizes triple strings before codegen")
            }
            Expr::BoolLit(b) => {
                self.instr(format!("const {b}"));
                Ok(())
            }
            Expr::NothingLit => {
                self.instr("const none");
                Ok(())
            }
            Expr::This => {
                self.instr("load $");
                Ok(())
            }
            Expr::Ident(name) => {
                self.instr(format!("load {name}"));
                Ok(())
            }
            Expr::FieldAccess(recv, field) => {
                if matches!(recv.node, Expr::This) {
                    self.instr("load $");
                    self.instr(format!("load_field $:{}", field.node));
                } else {
                    self.emit_expr(recv)?;
                    let recv_class = self.resolve_class(recv)?;
                    self.instr(format!("load_field {recv_class}:{}", field.node));
                }
                Ok(())
            }
            Expr::MethodCall { recv, method, args } => self.emit_call(recv, &method.node, args),
            Expr::And(lhs, rhs) => self.emit_and(lhs, rhs),
            Expr::Or(lhs, rhs) => self.emit_or(lhs, rhs),
            Expr::Not(inner) => self.emit_not(inner),
            Expr::New { class, args } => {
                for arg in args {
                    self.emit_expr(arg)?;
                }
                self.instr(format!("call {}:$constructor", class.node));
                Ok(())
            }
            Expr::BinOp { .. } | Expr::UnaryNeg(_) => {
                unreachable!("transform::operators lowers these before codegen")
            }
        }
    }

    /// Receiver first, then each argument left to right, then the call — the
    /// natural stack-evaluation order spec.md's worked scenarios (§8) show.
    fn emit_call(&mut self, recv: &Spanned<Expr>, method: &str, args: &[Spanned<Expr>]) -> Result<(), Diagnostic> {
        let recv_class = if matches!(recv.node, Expr::This) {
            self.instr("load $");
            self.current_class.clone()
        } else {
            self.emit_expr(recv)?;
            self.resolve_class(recv)?
        };
        for arg in args {
            self.emit_expr(arg)?;
        }
        self.instr(format!("call {recv_class}:{method}"));

        let returns_nothing = self
            .catalog
            .get(&recv_class)
            .and_then(|r| r.method_returns.get(method))
            .map(|ty| ty.as_class() == Some("Nothing"))
            .unwrap_or(false);
        if returns_nothing {
            self.instr("pop");
        }
        Ok(())
    }

    fn emit_and(&mut self, lhs: &Spanned<Expr>, rhs: &Spanned<Expr>) -> Result<(), Diagnostic> {
        let label = self.sc_false.clone().unwrap_or_else(|| self.gen_label("and"));
        self.emit_expr(lhs)?;
        self.instr(format!("jump_ifnot {label}"));
        self.emit_expr(rhs)?;
        self.label_def(&label);
        Ok(())
    }

    fn emit_or(&mut self, lhs: &Spanned<Expr>, rhs: &Spanned<Expr>) -> Result<(), Diagnostic> {
        let label = self.sc_true.clone().unwrap_or_else(|| self.gen_label("or"));
        self.emit_expr(lhs)?;
        self.instr(format!("jump_if {label}"));
        self.emit_expr(rhs)?;
        self.label_def(&label);
        Ok(())
    }

    /// Inside an active conditional context, swap the short-circuit targets
    /// and let the child emit directly into them; otherwise fall back to the
    /// native `Boolean:negate`.
    fn emit_not(&mut self, inner: &Spanned<Expr>) -> Result<(), Diagnostic> {
        if self.sc_true.is_some() || self.sc_false.is_some() {
            std::mem::swap(&mut self.sc_true, &mut self.sc_false);
            self.emit_expr(inner)?;
            std::mem::swap(&mut self.sc_true, &mut self.sc_false);
            Ok(())
        } else {
            self.emit_expr(inner)?;
            self.instr("call Boolean:negate");
            Ok(())
        }
    }
}
