//! End-to-end scenarios from spec.md §8, run against the whole pipeline via
//! `quack::compile`. Grounded on `examples/mastercyb-trident/tests/audit_stdlib.rs`'s
//! compile-and-assert-on-the-listing shape.

fn compile_ok(source: &str) -> indexmap::IndexMap<String, String> {
    quack::compile(source, "Main").unwrap_or_else(|diag| {
        panic!("expected {source:?} to compile, got: {}", diag.message);
    })
}

#[test]
fn test_integer_arithmetic_order() {
    let asm = compile_ok("x = 3 + 4 * 2;");
    let main = &asm["Main"];
    let seq = ["const 3", "const 4", "const 2", "call Int:times", "call Int:plus", "store x"];
    let positions: Vec<_> = seq.iter().map(|s| main.find(s).unwrap_or_else(|| panic!("missing {s:?} in:\n{main}"))).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "instructions out of order:\n{main}");
}

#[test]
fn test_string_concatenation() {
    let asm = compile_ok(r#"s = "a" + "b";"#);
    let main = &asm["Main"];
    let seq = ["const \"a\"", "const \"b\"", "call String:plus", "store s"];
    let positions: Vec<_> = seq.iter().map(|s| main.find(s).unwrap_or_else(|| panic!("missing {s:?} in:\n{main}"))).collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "instructions out of order:\n{main}");
}

#[test]
fn test_if_else_short_circuit_and() {
    let asm = compile_ok("a = true; b = true; if a and b { x = 1; } else { x = 2; }");
    let main = &asm["Main"];
    assert!(main.contains("ifbranch1_1"), "missing then label:\n{main}");
    assert!(main.contains("ifbranch2_1"), "missing else label:\n{main}");
    assert!(main.contains("ifend_1"), "missing end label:\n{main}");
    assert!(main.contains("jump_ifnot ifbranch2_1"), "and's false target wrong:\n{main}");
    let store_count = main.matches("store x").count();
    assert_eq!(store_count, 2, "expected one store x per branch:\n{main}");
}

#[test]
fn test_while_loop_shape() {
    let asm = compile_ok("i = 0; while i < 10 { i = i + 1; }");
    let main = &asm["Main"];
    assert!(main.contains("jump whilecond_1"), "missing loop entry jump:\n{main}");
    assert!(main.contains("whileloop_1:"), "missing loop body label:\n{main}");
    assert!(main.contains("load i"), "missing condition load:\n{main}");
    assert!(main.contains("const 10"), "missing condition const:\n{main}");
    assert!(main.contains("call Int:less"), "missing comparison call:\n{main}");
    assert!(main.contains("jump_if whileloop_1"), "missing loop-back jump:\n{main}");
}

#[test]
fn test_class_with_field_constructor() {
    let asm = compile_ok(
        "class Point(x: Int, y: Int) { this.x = x; this.y = y; }\n\
         p = Point(1, 2);",
    );
    let point = &asm["Point"];
    assert!(point.contains(".class Point:Obj"), "wrong class header:\n{point}");
    assert!(point.contains(".field x"), "missing field x:\n{point}");
    assert!(point.contains(".field y"), "missing field y:\n{point}");
    assert!(point.contains(".method $constructor"), "missing constructor:\n{point}");
    assert!(point.contains(".args x,y") || point.contains(".args x, y"), "missing constructor args:\n{point}");
    assert!(point.contains("store_field $:x"), "missing field store for x:\n{point}");
    assert!(point.contains("store_field $:y"), "missing field store for y:\n{point}");
}

#[test]
fn test_inheritance_cycle_is_rejected() {
    let result = quack::compile("class A() extends B {} class B() extends A {}", "Main");
    assert!(result.is_err(), "expected a cycle to be rejected");
}
