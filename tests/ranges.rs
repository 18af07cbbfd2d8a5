use luz::{Engine, Value};

#[test]
fn half_open_vs_closed_range_as_vec() {
    let mut engine = Engine::new();
    // `as` binds tighter than `..` in this grammar (spec.md §4.4's own
    // precedence chain puts `range` above `as`), so the range needs an
    // explicit grouping paren to cast the whole sequence rather than just
    // its right endpoint.
    let v = engine.eval("((0..3) as vec)").unwrap();
    assert_eq!(v.format_plain(), "![0 1 2]");
    let v = engine.eval("((0..=3) as vec)").unwrap();
    assert_eq!(v.format_plain(), "![0 1 2 3]");
}

#[test]
fn descending_range_counts_down() {
    let mut engine = Engine::new();
    let v = engine.eval("((5..0) as arr)").unwrap();
    assert_eq!(v.format_plain(), "[5 4 3 2 1]");
}

#[test]
fn degenerate_range_is_empty_half_open_singleton_closed() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("lenof (2..2)").unwrap(), Value::Num(0.0));
    assert_eq!(engine.eval("lenof (2..=2)").unwrap(), Value::Num(1.0));
}

#[test]
fn firstof_lastof_on_ranges() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("firstof (3..8)").unwrap(), Value::Num(3.0));
    assert_eq!(engine.eval("lastof (3..8)").unwrap(), Value::Num(7.0));
    assert_eq!(engine.eval("lastof (3..=8)").unwrap(), Value::Num(8.0));
}

#[test]
fn ran_to_xran_cast_shifts_endpoint() {
    let mut engine = Engine::new();
    let v = engine.eval("typeof ((0..3) as xran)").unwrap();
    assert_eq!(v, Value::Str("xran".into()));
    let v = engine.eval("(0..3) as xran as vec").unwrap();
    assert_eq!(v.format_plain(), "![0 1 2]");
}

#[test]
fn range_plus_number_shifts_the_end() {
    let mut engine = Engine::new();
    let v = engine.eval("((0..5) + 2) as vec").unwrap();
    assert_eq!(v.format_plain(), "![0 1 2 3 4 5 6]");
}

#[test]
fn number_plus_range_shifts_the_start() {
    let mut engine = Engine::new();
    let v = engine.eval("(2 + (0..5)) as vec").unwrap();
    assert_eq!(v.format_plain(), "![2 3 4]");
}

#[test]
fn range_as_str_joins_with_spaces() {
    let mut engine = Engine::new();
    let v = engine.eval("(1..=3) as str").unwrap();
    assert_eq!(v, Value::Str("1 2 3".into()));
}
