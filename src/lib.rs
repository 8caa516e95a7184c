pub mod ast;
pub mod checks;
pub mod classmap;
pub mod cli;
pub mod codegen;
pub mod diagnostic;
pub mod identcheck;
pub mod lexeme;
pub mod lexer;
pub mod parser;
pub mod span;
pub mod transform;
pub mod typeinfer;

use indexmap::IndexMap;

use classmap::Catalog;
use diagnostic::Diagnostic;
use lexer::Lexer;
use parser::Parser;

/// Runs the full pipeline — lex, parse, transform, identcheck, typeinfer,
/// checks, codegen — on one source file and returns its per-class assembly
/// listings. The first `Diagnostic` returned by any phase aborts the rest
/// (spec.md §7: synchronous detection at first offense, no recovery).
pub fn compile(source: &str, main_class: &str) -> Result<IndexMap<String, String>, Diagnostic> {
    tracing::debug!(target: "quack::lexer", "lexing source ({} bytes)", source.len());
    let (tokens, lex_errors) = Lexer::new(source, 0).tokenize();
    if let Some(first) = lex_errors.into_iter().next() {
        return Err(first);
    }

    tracing::debug!(target: "quack::parser", "parsing token stream");
    let program = Parser::new(tokens)
        .parse_program()
        .map_err(|mut errors| errors.remove(0))?;

    tracing::debug!(target: "quack::transform", "running desugaring passes");
    let classes = transform::run_all(program, main_class);

    tracing::debug!(target: "quack::identcheck", "checking identifier definedness");
    identcheck::check_program(&classes)?;

    tracing::debug!(target: "quack::typeinfer", "running fixpoint type inference");
    let mut catalog = Catalog::with_builtins();
    typeinfer::infer(&classes, &mut catalog)?;

    tracing::debug!(target: "quack::checks", "running structural checks");
    checks::check_program(&classes, &catalog)?;

    tracing::debug!(target: "quack::codegen", "generating assembly");
    codegen::generate(&classes, &catalog)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_simple_program() {
        let asm = compile("x = 1 + 2;", "Main").unwrap();
        assert!(asm.contains_key("Main"));
        assert!(asm["Main"].contains(".class Main:Obj"));
    }

    #[test]
    fn test_compile_rejects_inheritance_cycle() {
        let result = compile("class A() extends B {} class B() extends A {}", "Main");
        assert!(result.is_err());
    }

    #[test]
    fn test_compile_rejects_typecase() {
        let result = compile("typecase x { y: Int { z = 1; } }", "Main");
        assert!(result.is_err());
    }
}
