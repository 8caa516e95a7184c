use super::for_each_expr_mut;
use crate::ast::{Expr, Spanned, Stmt};

/// Canonicalizes triple-quoted string literals into ordinary single-line
/// string literals. The lexer already unescapes both forms into plain
/// `String`s, so this pass only needs to erase the distinction in the AST.
pub(crate) fn run(stmts: &mut Vec<Spanned<Stmt>>) {
    for_each_expr_mut(stmts, &mut |expr| {
        if let Expr::TripleStringLit(s) = &mut expr.node {
            expr.node = Expr::StringLit(std::mem::take(s));
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    #[test]
    fn test_triple_string_canonicalizes() {
        let (tokens, _) = Lexer::new("z = \"\"\"hi\nthere\"\"\";", 0).tokenize();
        let mut program = Parser::new(tokens).parse_program().unwrap();
        run(&mut program.top_level);
        if let Stmt::Assign { value, .. } = &program.top_level[0].node {
            assert!(matches!(&value.node, Expr::StringLit(s) if s == "hi\nthere"));
        } else {
            panic!("expected assign");
        }
    }
}
