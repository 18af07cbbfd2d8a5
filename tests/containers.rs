use luz::{Engine, ExitCode, Value};

#[test]
fn vec_grows_and_supports_index_assignment() {
    let mut engine = Engine::new();
    engine.eval("v = ![1 2 3]; v += 4; v[0] = 10;").unwrap();
    let v = engine.eval("v").unwrap();
    assert_eq!(v.format_plain(), "![10 2 3 4]");
}

#[test]
fn arr_is_fixed_size() {
    let mut engine = Engine::new();
    engine.eval("a = [1 2 3];").unwrap();
    let v = engine.eval("a[0] = 9; a[0]").unwrap();
    assert_eq!(v, Value::Num(9.0));
    let code = engine.run("a += 4;");
    assert_eq!(code, ExitCode::InvalidInstruction);
}

#[test]
fn arr_out_of_bounds_write_fails() {
    let mut engine = Engine::new();
    engine.eval("a = [1 2 3];").unwrap();
    let code = engine.run("a[9] = 1;");
    assert_eq!(code, ExitCode::InvalidInstruction);
}

#[test]
fn length_replication_literal_evaluates_each_slot() {
    let mut engine = Engine::new();
    // Each slot re-evaluates the element expression (spec.md §4.4), so a
    // mutating side-effect runs once per index rather than being cloned.
    engine.eval("n = 0;").unwrap();
    let v = engine.eval("[n += 1; 3]").unwrap();
    assert_eq!(v.format_plain(), "[1 2 3]");
    assert_eq!(engine.eval("n").unwrap(), Value::Num(3.0));
}

#[test]
fn set_remembers_last_insertion_and_dedupes() {
    let mut engine = Engine::new();
    // `s + 2` builds a *new* set (spec.md §3/§4.3); it does not mutate `s`,
    // so `s` itself still remembers `3` as its last insertion.
    let v = engine.eval("s = @{1 2 3}; t = s + 2; s").unwrap();
    assert_eq!(v.format_plain(), "@{1 2 3}");
    assert_eq!(engine.eval("lastof s").unwrap(), Value::Num(3.0));
    assert_eq!(engine.eval("t").unwrap().format_plain(), "@{1 2 3}");
    assert_eq!(engine.eval("lastof t").unwrap(), Value::Num(2.0));
}

#[test]
fn vec_plus_minus_are_push_and_remove_last_occurrence() {
    let mut engine = Engine::new();
    engine.eval("v = ![1 2 3 2];").unwrap();
    let v = engine.eval("v - 2").unwrap();
    assert_eq!(v.format_plain(), "![1 2 3]");
}

#[test]
fn has_checks_membership_by_container_kind() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("[1 2 3] has 2").unwrap(), Value::Bool(true));
    assert_eq!(engine.eval("\"hello\" has \"ell\"").unwrap(), Value::Bool(true));
    assert_eq!(engine.eval("(1..5) has 3").unwrap(), Value::Bool(true));
    assert_eq!(engine.eval("(1..5) has 5").unwrap(), Value::Bool(false));
}

#[test]
fn copyof_deep_clones_nested_vecs() {
    let mut engine = Engine::new();
    engine.eval("a = ![1 2 3]; b = copyof a; b += 4;").unwrap();
    assert_eq!(engine.eval("a").unwrap().format_plain(), "![1 2 3]");
    assert_eq!(engine.eval("b").unwrap().format_plain(), "![1 2 3 4]");
}

#[test]
fn aggregate_equality_is_reference_identity() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("[1 2] == [1 2]").unwrap(), Value::Bool(false));
    let v = engine.eval("a = [1 2]; b = a; a == b").unwrap();
    assert_eq!(v, Value::Bool(true));
}

#[test]
fn del_removes_from_vec_and_set_but_not_arr() {
    let mut engine = Engine::new();
    engine.eval("v = ![1 2 3];").unwrap();
    let v = engine.eval("del v[1]; v").unwrap();
    assert_eq!(v.format_plain(), "![1 3]");

    engine.eval("a = [1 2 3];").unwrap();
    let code = engine.run("del a[0];");
    assert_eq!(code, ExitCode::InvalidInstruction);
}
