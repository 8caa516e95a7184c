use crate::ast::{Else, IfStmt, Spanned, Stmt};

/// Flattens `if cond {..} elif cond {..} else {..}` into a right-nested
/// `IfStmt` chain, recursing into every nested statement block.
pub(crate) fn run(stmts: &mut Vec<Spanned<Stmt>>) {
    for stmt in stmts.iter_mut() {
        let span = stmt.span;
        match std::mem::replace(
            &mut stmt.node,
            Stmt::Return(None), // placeholder, overwritten below
        ) {
            Stmt::IfRaw {
                cond,
                mut then_body,
                elifs,
                else_body,
            } => {
                run(&mut then_body);
                let mut tail = else_body.map(|mut body| {
                    run(&mut body);
                    Else::Block(body)
                });
                for (elif_cond, mut elif_body) in elifs.into_iter().rev() {
                    run(&mut elif_body);
                    let inner = IfStmt {
                        cond: Box::new(elif_cond),
                        then_body: elif_body,
                        els: tail,
                    };
                    tail = Some(Else::ElseIf(Box::new(inner)));
                }
                stmt.node = Stmt::If(IfStmt {
                    cond: Box::new(cond),
                    then_body,
                    els: tail,
                });
            }
            Stmt::While { cond, mut body } => {
                run(&mut body);
                stmt.node = Stmt::While { cond, body };
            }
            Stmt::Typecase { expr, mut arms } => {
                for arm in &mut arms {
                    run(&mut arm.body);
                }
                stmt.node = Stmt::Typecase { expr, arms };
            }
            other => stmt.node = other,
        }
        stmt.span = span;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn flatten(source: &str) -> Vec<Spanned<Stmt>> {
        let (tokens, _) = Lexer::new(source, 0).tokenize();
        let mut program = Parser::new(tokens).parse_program().unwrap();
        run(&mut program.top_level);
        program.top_level
    }

    #[test]
    fn test_if_else_flattens() {
        let stmts = flatten("if a < 1 { x = 1; } else { x = 2; }");
        match &stmts[0].node {
            Stmt::If(if_stmt) => {
                assert!(matches!(if_stmt.els, Some(Else::Block(_))));
            }
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_elif_chain_nests() {
        let stmts = flatten("if a < 1 { x = 1; } elif a < 2 { x = 2; } elif a < 3 { x = 3; } else { x = 4; }");
        match &stmts[0].node {
            Stmt::If(outer) => match &outer.els {
                Some(Else::ElseIf(inner)) => match &inner.els {
                    Some(Else::ElseIf(innermost)) => {
                        assert!(matches!(innermost.els, Some(Else::Block(_))));
                    }
                    other => panic!("expected nested ElseIf, got {:?}", other),
                },
                other => panic!("expected ElseIf, got {:?}", other),
            },
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_if_with_no_else() {
        let stmts = flatten("if a < 1 { x = 1; }");
        match &stmts[0].node {
            Stmt::If(if_stmt) => assert!(if_stmt.els.is_none()),
            other => panic!("expected If, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_if_inside_while_body() {
        let stmts = flatten("while a < 1 { if b < 1 { x = 1; } }");
        match &stmts[0].node {
            Stmt::While { body, .. } => {
                assert!(matches!(body[0].node, Stmt::If(_)));
            }
            other => panic!("expected While, got {:?}", other),
        }
    }
}
