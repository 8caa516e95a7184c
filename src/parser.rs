use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexeme::Lexeme;
use crate::span::{Span, Spanned};

const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) struct Parser {
    tokens: Vec<Spanned<Lexeme>>,
    pos: usize,
    diagnostics: Vec<Diagnostic>,
    depth: u32,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Spanned<Lexeme>>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
            depth: 0,
        }
    }

    fn enter_nesting(&mut self) -> bool {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.error_with_help(
                "nesting depth exceeded (maximum 256 levels)",
                "simplify the program by extracting deeply nested code into methods",
            );
            return false;
        }
        true
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn parse_program(mut self) -> Result<Program, Vec<Diagnostic>> {
        let mut classes = Vec::new();
        while self.at(&Lexeme::Class) {
            classes.push(self.parse_class());
        }

        let mut top_level = Vec::new();
        while !self.at(&Lexeme::Eof) {
            top_level.push(self.parse_statement());
        }

        if !self.diagnostics.is_empty() {
            return Err(self.diagnostics);
        }
        Ok(Program { classes, top_level })
    }

    fn parse_class(&mut self) -> ClassDef {
        self.expect(&Lexeme::Class);
        let name = self.expect_ident();

        let params = if self.eat(&Lexeme::LParen) {
            let p = self.parse_formals();
            self.expect(&Lexeme::RParen);
            p
        } else {
            Vec::new()
        };

        let (superclass, super_args) = if self.eat(&Lexeme::Extends) {
            let sup = self.expect_ident();
            let args = if self.eat(&Lexeme::LParen) {
                let a = self.parse_call_args();
                self.expect(&Lexeme::RParen);
                a
            } else {
                Vec::new()
            };
            (Some(sup), args)
        } else {
            (None, Vec::new())
        };

        self.expect(&Lexeme::LBrace);
        let mut ctor_body = Vec::new();
        let mut methods = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            if self.at(&Lexeme::Def) {
                methods.push(self.parse_method());
            } else {
                ctor_body.push(self.parse_statement());
            }
        }
        self.expect(&Lexeme::RBrace);

        ClassDef {
            name,
            params,
            superclass,
            super_args,
            ctor_body,
            methods,
        }
    }

    fn parse_formals(&mut self) -> Vec<Param> {
        let mut formals = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            let name = self.expect_ident();
            self.expect(&Lexeme::Colon);
            let ty = self.expect_ident();
            formals.push(Param { name, ty });
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        formals
    }

    fn parse_method(&mut self) -> MethodDef {
        self.expect(&Lexeme::Def);
        let name = self.expect_ident();
        self.expect(&Lexeme::LParen);
        let params = self.parse_formals();
        self.expect(&Lexeme::RParen);
        let return_ty = if self.eat(&Lexeme::Colon) {
            Some(self.expect_ident())
        } else {
            None
        };
        self.expect(&Lexeme::LBrace);
        let mut body = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            body.push(self.parse_statement());
        }
        self.expect(&Lexeme::RBrace);
        MethodDef {
            name,
            params,
            return_ty,
            body,
        }
    }

    // --- Statements ---

    fn parse_statement(&mut self) -> Spanned<Stmt> {
        if self.at(&Lexeme::If) {
            self.parse_if_stmt()
        } else if self.at(&Lexeme::While) {
            self.parse_while_stmt()
        } else if self.at(&Lexeme::Return) {
            self.parse_return_stmt()
        } else if self.at(&Lexeme::Typecase) {
            self.parse_typecase_stmt()
        } else {
            self.parse_simple_statement()
        }
    }

    fn parse_if_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::If);
        let cond = self.parse_expr();
        let then_body = self.parse_stmt_block();

        let mut elifs = Vec::new();
        while self.at(&Lexeme::Elif) {
            self.advance();
            let elif_cond = self.parse_expr();
            let elif_body = self.parse_stmt_block();
            elifs.push((elif_cond, elif_body));
        }

        let else_body = if self.eat(&Lexeme::Else) {
            Some(self.parse_stmt_block())
        } else {
            None
        };

        let span = start.merge(self.prev_span());
        Spanned::new(
            Stmt::IfRaw {
                cond,
                then_body,
                elifs,
                else_body,
            },
            span,
        )
    }

    fn parse_while_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::While);
        let cond = self.parse_expr();
        let body = self.parse_stmt_block();
        let span = start.merge(self.prev_span());
        Spanned::new(Stmt::While { cond, body }, span)
    }

    fn parse_return_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::Return);
        let value = if !self.at(&Lexeme::Semicolon) {
            Some(self.parse_expr())
        } else {
            None
        };
        self.expect(&Lexeme::Semicolon);
        let span = start.merge(self.prev_span());
        Spanned::new(Stmt::Return(value), span)
    }

    fn parse_typecase_stmt(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        self.expect(&Lexeme::Typecase);
        let expr = self.parse_expr();
        self.expect(&Lexeme::LBrace);
        let mut arms = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            let var = self.expect_ident();
            self.expect(&Lexeme::Colon);
            let ty = self.expect_ident();
            let body = self.parse_stmt_block();
            arms.push(TypecaseArm { var, ty, body });
        }
        self.expect(&Lexeme::RBrace);
        let span = start.merge(self.prev_span());
        Spanned::new(Stmt::Typecase { expr, arms }, span)
    }

    /// `{ statement* }` used by if/elif/else/while/method/typecase-arm bodies.
    fn parse_stmt_block(&mut self) -> Vec<Spanned<Stmt>> {
        if !self.enter_nesting() {
            while !self.at(&Lexeme::Eof) {
                self.advance();
            }
            return Vec::new();
        }
        self.expect(&Lexeme::LBrace);
        let mut stmts = Vec::new();
        while !self.at(&Lexeme::RBrace) && !self.at(&Lexeme::Eof) {
            stmts.push(self.parse_statement());
        }
        self.expect(&Lexeme::RBrace);
        self.exit_nesting();
        stmts
    }

    /// Assignment or bare expression statement, terminated with `;`.
    fn parse_simple_statement(&mut self) -> Spanned<Stmt> {
        let start = self.current_span();
        let expr = self.parse_expr();

        let stmt = if self.at(&Lexeme::Colon) || self.at(&Lexeme::Eq) {
            let lvalue = self.expr_to_lvalue(&expr);
            let ty = if self.eat(&Lexeme::Colon) {
                Some(self.expect_ident())
            } else {
                None
            };
            self.expect(&Lexeme::Eq);
            let value = self.parse_expr();
            Stmt::Assign { lvalue, ty, value }
        } else {
            Stmt::Expr(expr)
        };

        self.expect(&Lexeme::Semicolon);
        let span = start.merge(self.prev_span());
        Spanned::new(stmt, span)
    }

    fn expr_to_lvalue(&mut self, expr: &Spanned<Expr>) -> Spanned<LValue> {
        match &expr.node {
            Expr::Ident(name) => Spanned::new(LValue::Ident(name.clone()), expr.span),
            Expr::FieldAccess(recv, field) => {
                if matches!(recv.node, Expr::This) {
                    Spanned::new(LValue::FieldThis(field.node.clone()), expr.span)
                } else {
                    Spanned::new(
                        LValue::Field((**recv).clone(), field.node.clone()),
                        expr.span,
                    )
                }
            }
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    "left side of assignment must be a variable or field".to_string(),
                    expr.span,
                ));
                Spanned::new(LValue::Ident("$error".to_string()), expr.span)
            }
        }
    }

    // --- Expressions, following the grammar's precedence hierarchy:
    // c_expr (or) > and_expr (and) > not_expr (not) > cc_expr (comparisons,
    // non-assoc) > r_expr (+ -) > r_expr_prod (* /) > r_expr_access
    // (.method()/.field chains) > r_expr_unary (-) > atom.

    fn parse_expr(&mut self) -> Spanned<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Spanned<Expr> {
        let mut lhs = self.parse_and();
        while self.at(&Lexeme::Or) {
            self.advance();
            let rhs = self.parse_and();
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(Expr::Or(Box::new(lhs), Box::new(rhs)), span);
        }
        lhs
    }

    fn parse_and(&mut self) -> Spanned<Expr> {
        let mut lhs = self.parse_not();
        while self.at(&Lexeme::And) {
            self.advance();
            let rhs = self.parse_not();
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(Expr::And(Box::new(lhs), Box::new(rhs)), span);
        }
        lhs
    }

    fn parse_not(&mut self) -> Spanned<Expr> {
        if self.at(&Lexeme::Not) {
            let start = self.current_span();
            self.advance();
            let inner = self.parse_not();
            let span = start.merge(inner.span);
            Spanned::new(Expr::Not(Box::new(inner)), span)
        } else {
            self.parse_comparison()
        }
    }

    fn parse_comparison(&mut self) -> Spanned<Expr> {
        let lhs = self.parse_additive();
        let op = match self.peek() {
            Lexeme::EqEq => Some(BinOp::Eq),
            Lexeme::Le => Some(BinOp::Leq),
            Lexeme::Ge => Some(BinOp::Geq),
            Lexeme::Lt => Some(BinOp::Lt),
            Lexeme::Gt => Some(BinOp::Gt),
            _ => None,
        };
        match op {
            Some(op) => {
                self.advance();
                let rhs = self.parse_additive();
                let span = lhs.span.merge(rhs.span);
                Spanned::new(
                    Expr::BinOp {
                        op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    },
                    span,
                )
            }
            None => lhs,
        }
    }

    fn parse_additive(&mut self) -> Spanned<Expr> {
        let mut lhs = self.parse_multiplicative();
        loop {
            let op = match self.peek() {
                Lexeme::Plus => BinOp::Add,
                Lexeme::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative();
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn parse_multiplicative(&mut self) -> Spanned<Expr> {
        let mut lhs = self.parse_unary();
        loop {
            let op = match self.peek() {
                Lexeme::Star => BinOp::Mul,
                Lexeme::Slash => BinOp::Div,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary();
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(
                Expr::BinOp {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        lhs
    }

    fn parse_unary(&mut self) -> Spanned<Expr> {
        if self.at(&Lexeme::Minus) {
            let start = self.current_span();
            self.advance();
            let inner = self.parse_unary();
            let span = start.merge(inner.span);
            Spanned::new(Expr::UnaryNeg(Box::new(inner)), span)
        } else {
            self.parse_access()
        }
    }

    /// `expr.field` / `expr.method(args)` chains, left-associative.
    fn parse_access(&mut self) -> Spanned<Expr> {
        let mut expr = self.parse_atom();
        loop {
            if self.eat(&Lexeme::Dot) {
                let name = self.expect_ident();
                if self.eat(&Lexeme::LParen) {
                    let args = self.parse_call_args();
                    self.expect(&Lexeme::RParen);
                    let span = expr.span.merge(self.prev_span());
                    expr = Spanned::new(
                        Expr::MethodCall {
                            recv: Box::new(expr),
                            method: name,
                            args,
                        },
                        span,
                    );
                } else {
                    let span = expr.span.merge(name.span);
                    expr = Spanned::new(Expr::FieldAccess(Box::new(expr), name), span);
                }
            } else {
                break;
            }
        }
        expr
    }

    fn parse_atom(&mut self) -> Spanned<Expr> {
        let start = self.current_span();
        match self.peek().clone() {
            Lexeme::Integer(n) => {
                self.advance();
                Spanned::new(Expr::IntLit(n), start)
            }
            Lexeme::Str(s) => {
                self.advance();
                Spanned::new(Expr::StringLit(s), start)
            }
            Lexeme::TripleStr(s) => {
                self.advance();
                Spanned::new(Expr::TripleStringLit(s), start)
            }
            Lexeme::True => {
                self.advance();
                Spanned::new(Expr::BoolLit(true), start)
            }
            Lexeme::False => {
                self.advance();
                Spanned::new(Expr::BoolLit(false), start)
            }
            Lexeme::None_ => {
                self.advance();
                Spanned::new(Expr::NothingLit, start)
            }
            Lexeme::This => {
                self.advance();
                Spanned::new(Expr::This, start)
            }
            Lexeme::LParen => {
                self.advance();
                let inner = self.parse_expr();
                self.expect(&Lexeme::RParen);
                let span = start.merge(self.prev_span());
                Spanned::new(inner.node, span)
            }
            Lexeme::Ident(name) => {
                self.advance();
                if self.at(&Lexeme::LParen)
                    && name.chars().next().map_or(false, |c| c.is_uppercase())
                {
                    // Object instantiation: `Pair(1, 2)`
                    self.advance();
                    let args = self.parse_call_args();
                    self.expect(&Lexeme::RParen);
                    let span = start.merge(self.prev_span());
                    Spanned::new(
                        Expr::New {
                            class: Spanned::new(name, start),
                            args,
                        },
                        span,
                    )
                } else {
                    Spanned::new(Expr::Ident(name), start)
                }
            }
            _ => {
                self.error_with_help(
                    &format!("expected expression, found {}", self.peek().description()),
                    "expressions include literals, `this`, identifiers, field/method access, and `ClassName(args)`",
                );
                self.advance();
                Spanned::new(Expr::NothingLit, start)
            }
        }
    }

    fn parse_call_args(&mut self) -> Vec<Spanned<Expr>> {
        let mut args = Vec::new();
        while !self.at(&Lexeme::RParen) && !self.at(&Lexeme::Eof) {
            args.push(self.parse_expr());
            if !self.eat(&Lexeme::Comma) {
                break;
            }
        }
        args
    }

    // --- Utility methods ---

    fn peek(&self) -> &Lexeme {
        &self.tokens[self.pos].node
    }

    fn current_span(&self) -> Span {
        self.tokens[self.pos].span
    }

    fn prev_span(&self) -> Span {
        if self.pos > 0 {
            self.tokens[self.pos - 1].span
        } else {
            self.current_span()
        }
    }

    fn advance(&mut self) -> &Spanned<Lexeme> {
        let tok = &self.tokens[self.pos];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&self, token: &Lexeme) -> bool {
        std::mem::discriminant(self.peek()) == std::mem::discriminant(token)
    }

    fn eat(&mut self, token: &Lexeme) -> bool {
        if self.at(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Lexeme) -> Span {
        if self.at(token) {
            let span = self.current_span();
            self.advance();
            span
        } else {
            self.error_at_current(&format!(
                "expected {}, found {}",
                token.description(),
                self.peek().description()
            ));
            self.current_span()
        }
    }

    fn expect_ident(&mut self) -> Spanned<String> {
        if let Lexeme::Ident(name) = self.peek().clone() {
            let span = self.current_span();
            self.advance();
            Spanned::new(name, span)
        } else {
            self.error_at_current(&format!(
                "expected identifier, found {}",
                self.peek().description()
            ));
            Spanned::new("$error".to_string(), self.current_span())
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        self.diagnostics
            .push(Diagnostic::error(msg.to_string(), self.current_span()));
    }

    fn error_with_help(&mut self, msg: &str, help: &str) {
        self.diagnostics.push(
            Diagnostic::error(msg.to_string(), self.current_span()).with_help(help.to_string()),
        );
    }
}
