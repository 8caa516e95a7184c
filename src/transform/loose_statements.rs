use crate::ast::{ClassDef, Program};
use crate::span::{Span, Spanned};

/// Captures top-level statements into a synthesized class named after
/// `--main-class`, appended as the last class. A program with no top-level
/// statements gets no synthesized class at all.
pub(crate) fn capture(program: Program, main_class: &str) -> Vec<ClassDef> {
    let mut classes = program.classes;

    if !program.top_level.is_empty() {
        classes.push(ClassDef {
            name: Spanned::new(main_class.to_string(), Span::dummy()),
            params: Vec::new(),
            superclass: None,
            super_args: Vec::new(),
            ctor_body: program.top_level,
            methods: Vec::new(),
        });
    }

    classes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Stmt;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse(source: &str) -> Program {
        let (tokens, _) = Lexer::new(source, 0).tokenize();
        Parser::new(tokens).parse_program().unwrap()
    }

    #[test]
    fn test_loose_statements_become_main_class() {
        let program = parse("x: Int = 1;");
        let classes = capture(program, "Main");
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name.node, "Main");
        assert_eq!(classes[0].ctor_body.len(), 1);
    }

    #[test]
    fn test_empty_program_yields_no_classes() {
        let program = parse("");
        let classes = capture(program, "Main");
        assert!(classes.is_empty());
    }

    #[test]
    fn test_explicit_classes_preserved_and_main_appended_last() {
        let program = parse("class A() {}\nx: Int = 1;");
        let classes = capture(program, "Main");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[0].name.node, "A");
        assert_eq!(classes[1].name.node, "Main");
        assert!(matches!(classes[1].ctor_body[0].node, Stmt::Assign { .. }));
    }
}
