use luz::{Engine, Value};

#[test]
fn floor_div_and_mod() {
    let mut engine = Engine::new();
    let v = engine.eval("x = 7; y = 2; \"{x ~/ y} {x % y}\"").unwrap();
    assert_eq!(v, Value::Str("3 1".into()));
}

#[test]
fn pow_right_operand_absorbs_the_following_mul_chain() {
    let mut engine = Engine::new();
    // Per spec.md's own precedence chain, `pow` wraps `mulDiv`, not the other
    // way round: the right side of `**` is a whole mulDiv chain, so
    // `3 ** 2 * 2` parses as `3 ** (2 * 2)`, not `(3 ** 2) * 2`.
    let v = engine.eval("3 ** 2 * 2").unwrap();
    assert_eq!(v, Value::Num(81.0));
}

#[test]
fn pow_binds_looser_than_add_at_the_top() {
    let mut engine = Engine::new();
    let v = engine.eval("2 ** 3 + 1").unwrap();
    assert_eq!(v, Value::Num(9.0));
}

#[test]
fn division_by_zero_normalises_to_null() {
    let mut engine = Engine::new();
    let v = engine.eval("0 / 0").unwrap();
    assert_eq!(v, Value::Null);
    let v = engine.eval("1 / 0").unwrap();
    assert_eq!(v, Value::Null);
}

#[test]
fn big_int_arithmetic_promotes() {
    let mut engine = Engine::new();
    let v = engine.eval("1000000000000xl * 2").unwrap();
    assert_eq!(v.format_plain(), "2000000000000");
}

#[test]
fn big_int_division_non_exact_is_null() {
    let mut engine = Engine::new();
    let v = engine.eval("7xl / 2xl").unwrap();
    assert_eq!(v, Value::Null);
    let v = engine.eval("8xl / 2xl").unwrap();
    assert_eq!(v.format_plain(), "4");
}

#[test]
fn compound_assignment_updates_binding() {
    let mut engine = Engine::new();
    engine.eval("x = 10").unwrap();
    let v = engine.eval("x -= 3; x").unwrap();
    assert_eq!(v, Value::Num(7.0));
}

#[test]
fn bitwise_and_shift() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("6 & 3").unwrap(), Value::Num(2.0));
    assert_eq!(engine.eval("1 << 4").unwrap(), Value::Num(16.0));
    assert_eq!(engine.eval("~0").unwrap(), Value::Num(-1.0));
}

#[test]
fn comparison_requires_same_numeric_family() {
    let mut engine = Engine::new();
    assert!(engine.eval("\"a\" < 1").is_err());
    assert_eq!(engine.eval("1 < 2").unwrap(), Value::Bool(true));
}
