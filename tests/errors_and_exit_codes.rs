use luz::{Engine, EngineLimits, ExitCode};

#[test]
fn unclosed_bracket_is_a_syntax_error() {
    let mut engine = Engine::new();
    assert_eq!(engine.run("[1 2"), ExitCode::SyntaxError);
}

#[test]
fn undefined_name_is_a_semantic_error() {
    let mut engine = Engine::new();
    assert_eq!(engine.run("missing_name"), ExitCode::SemanticError);
}

#[test]
fn growing_a_fixed_array_is_an_invalid_instruction() {
    let mut engine = Engine::new();
    engine.eval("a = [1 2];").unwrap();
    assert_eq!(engine.run("a += 3;"), ExitCode::InvalidInstruction);
}

#[test]
fn fn_and_return_are_reserved_but_unimplemented() {
    let mut engine = Engine::new();
    assert_eq!(engine.run("fn add(a b) { a + b }"), ExitCode::UnimplementedFeature);
    assert_eq!(engine.run("return 1;"), ExitCode::UnimplementedFeature);
}

#[test]
fn non_numeric_comparison_is_a_semantic_error() {
    let mut engine = Engine::new();
    assert_eq!(engine.run("\"a\" < 1"), ExitCode::SemanticError);
}

#[test]
fn a_successful_script_returns_success() {
    let mut engine = Engine::new();
    assert_eq!(engine.run("1 + 1"), ExitCode::Success);
}

#[test]
fn operation_limit_trips_as_runtime_error() {
    let mut engine = Engine::new().with_limits(EngineLimits {
        max_operations: 3,
        ..EngineLimits::default()
    });
    let code = engine.run("loop { 1 }");
    assert_eq!(code, ExitCode::RuntimeError);
}

#[test]
fn array_size_limit_trips_as_out_of_memory() {
    let mut engine = Engine::new().with_limits(EngineLimits {
        max_array_size: 2,
        ..EngineLimits::default()
    });
    let code = engine.run("v = ![1 2 3];");
    assert_eq!(code, ExitCode::OutOfMemory);
}

#[test]
fn loop_nesting_limit_trips_as_runtime_error() {
    let mut engine = Engine::new().with_limits(EngineLimits {
        max_loop_nesting: 1,
        ..EngineLimits::default()
    });
    let code = engine.run("loop { loop { break } break }");
    assert_eq!(code, ExitCode::RuntimeError);
}
