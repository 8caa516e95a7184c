use crate::ast::{ClassDef, MethodDef};
use crate::span::{Span, Spanned};

/// Synthesizes `$constructor` from a class's header formals and loose
/// statements, and defaults a missing `extends` clause to `Obj`.
///
/// The grammar lets `extends Base(args)` carry constructor arguments, but
/// nothing downstream (catalog construction, codegen) calls a superclass
/// constructor explicitly — inherited fields come from the catalog's
/// deep-copy of the superclass record, not a runtime super-call — so
/// `super_args` is accepted for parsing generality and otherwise unused here.
pub(crate) fn synthesize(class: &mut ClassDef) {
    let ctor_span = class.name.span;
    let ctor = MethodDef {
        name: Spanned::new("$constructor".to_string(), ctor_span),
        params: std::mem::take(&mut class.params),
        return_ty: Some(class.name.clone()),
        body: std::mem::take(&mut class.ctor_body),
    };
    class.methods.insert(0, ctor);

    if class.superclass.is_none() {
        class.superclass = Some(Spanned::new("Obj".to_string(), Span::dummy()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn parse_class(source: &str) -> ClassDef {
        let (tokens, _) = Lexer::new(source, 0).tokenize();
        let mut program = Parser::new(tokens).parse_program().unwrap();
        program.classes.remove(0)
    }

    #[test]
    fn test_constructor_synthesized_from_params_and_body() {
        let mut class = parse_class("class Point(x: Int, y: Int) { this.x = x; this.y = y; }");
        synthesize(&mut class);
        assert_eq!(class.methods[0].name.node, "$constructor");
        assert_eq!(class.methods[0].params.len(), 2);
        assert_eq!(class.methods[0].body.len(), 2);
        assert!(class.params.is_empty());
        assert!(class.ctor_body.is_empty());
    }

    #[test]
    fn test_missing_extends_defaults_to_obj() {
        let mut class = parse_class("class Point() {}");
        synthesize(&mut class);
        assert_eq!(class.superclass.as_ref().unwrap().node, "Obj");
    }

    #[test]
    fn test_explicit_extends_preserved() {
        let mut class = parse_class("class Sub() extends Base {}");
        synthesize(&mut class);
        assert_eq!(class.superclass.as_ref().unwrap().node, "Base");
    }

    #[test]
    fn test_constructor_return_type_is_class_name() {
        let mut class = parse_class("class Point() {}");
        synthesize(&mut class);
        assert_eq!(
            class.methods[0].return_ty.as_ref().unwrap().node,
            "Point"
        );
    }

    #[test]
    fn test_constructor_inserted_before_user_methods() {
        let mut class = parse_class("class Point() { def reset() : Nothing { return; } }");
        synthesize(&mut class);
        assert_eq!(class.methods.len(), 2);
        assert_eq!(class.methods[0].name.node, "$constructor");
        assert_eq!(class.methods[1].name.node, "reset");
    }
}
