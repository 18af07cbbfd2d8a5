use luz::{Engine, ExitCode, Value};

#[test]
fn block_scoped_declarations_vanish_after_the_block() {
    let mut engine = Engine::new();
    engine.eval("x = 1; if (true) { y = 2; x = 3 }").unwrap();
    assert_eq!(engine.eval("x").unwrap(), Value::Num(3.0));
    let code = engine.run("y");
    assert_eq!(code, ExitCode::SemanticError);
}

#[test]
fn const_cannot_be_reassigned() {
    let mut engine = Engine::new();
    engine.eval("const c = 5;").unwrap();
    let code = engine.run("c = 6;");
    assert_eq!(code, ExitCode::SemanticError);
    assert_eq!(engine.eval("c").unwrap(), Value::Num(5.0));
}

#[test]
fn const_is_not_sticky_across_loop_iterations() {
    let mut engine = Engine::new();
    // Each `loop` iteration opens its own frame; a `const` declared inside one
    // iteration does not survive to block the next iteration's redeclaration.
    let v = engine
        .eval("total = 0; loop (i in 0..3) { const c = i; total += c } total")
        .unwrap();
    assert_eq!(v, Value::Num(3.0));
}

#[test]
fn undefined_name_is_a_semantic_error() {
    let mut engine = Engine::new();
    let code = engine.run("nope + 1;");
    assert_eq!(code, ExitCode::SemanticError);
}

#[test]
fn writes_to_a_name_declared_outside_the_block_persist() {
    let mut engine = Engine::new();
    engine.eval("n = 0;").unwrap();
    engine.eval("loop (i in 0..3) { n += 1 }").unwrap();
    assert_eq!(engine.eval("n").unwrap(), Value::Num(3.0));
}
