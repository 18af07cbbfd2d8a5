use luz::{Engine, Value};

#[test]
fn lenof_counts_chars_elements_or_range_span() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("lenof \"hello\"").unwrap(), Value::Num(5.0));
    assert_eq!(engine.eval("lenof [1 2 3]").unwrap(), Value::Num(3.0));
    assert_eq!(engine.eval("lenof (1..5)").unwrap(), Value::Num(4.0));
}

#[test]
fn sizeof_is_a_recursive_byte_estimate() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("sizeof true").unwrap(), Value::Num(1.0));
    assert_eq!(engine.eval("sizeof 1.5").unwrap(), Value::Num(8.0));
    let v = engine.eval("sizeof [1 2]").unwrap();
    assert_eq!(v, Value::Num(16.0));
}

#[test]
fn typeof_names_every_value_kind() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("typeof 1").unwrap(), Value::Str("num".into()));
    assert_eq!(engine.eval("typeof 1xl").unwrap(), Value::Str("xl".into()));
    assert_eq!(engine.eval("typeof true").unwrap(), Value::Str("bool".into()));
    assert_eq!(engine.eval("typeof \"a\"").unwrap(), Value::Str("str".into()));
    assert_eq!(engine.eval("typeof null").unwrap(), Value::Str("null".into()));
    assert_eq!(engine.eval("typeof [1]").unwrap(), Value::Str("arr".into()));
    assert_eq!(engine.eval("typeof ![1]").unwrap(), Value::Str("vec".into()));
    assert_eq!(engine.eval("typeof @{1}").unwrap(), Value::Str("set".into()));
    assert_eq!(engine.eval("typeof (1..2)").unwrap(), Value::Str("ran".into()));
    assert_eq!(engine.eval("typeof (1..=2)").unwrap(), Value::Str("xran".into()));
}

#[test]
fn copyof_is_identity_for_scalars() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("copyof 5").unwrap(), Value::Num(5.0));
    assert_eq!(engine.eval("copyof \"hi\"").unwrap(), Value::Str("hi".into()));
}

#[test]
fn firstof_lastof_on_aggregates() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("firstof [7 8 9]").unwrap(), Value::Num(7.0));
    assert_eq!(engine.eval("lastof [7 8 9]").unwrap(), Value::Num(9.0));
    assert_eq!(engine.eval("firstof \"abc\"").unwrap(), Value::Str("a".into()));
}

#[test]
fn as_num_and_as_bool_and_as_str_convert_between_scalars() {
    let mut engine = Engine::new();
    assert_eq!(engine.eval("\"3.5\" as num").unwrap(), Value::Num(3.5));
    assert_eq!(engine.eval("true as num").unwrap(), Value::Num(1.0));
    assert_eq!(engine.eval("0 as bool").unwrap(), Value::Bool(false));
    assert_eq!(engine.eval("5 as str").unwrap(), Value::Str("5".into()));
}

#[test]
fn as_xl_promotes_an_exact_num_to_a_big_integer() {
    let mut engine = Engine::new();
    let v = engine.eval("10 as xl").unwrap();
    assert_eq!(v.format_plain(), "10");
    assert_eq!(v, Value::Xl(10.into()));
}

#[test]
fn as_typeof_expr_casts_to_a_dynamically_named_target() {
    let mut engine = Engine::new();
    engine.eval("model = [1 2];").unwrap();
    let v = engine.eval("\"hi\" as typeof model").unwrap();
    assert_eq!(v.type_tag(), "arr");
    assert_eq!(v.format_debug(), "[\"h\" \"i\"]");
}

#[test]
fn as_set_deduplicates_elements() {
    let mut engine = Engine::new();
    let v = engine.eval("[1 1 2 2 3] as set").unwrap();
    assert_eq!(v.format_plain(), "@{1 2 3}");
}

#[test]
fn string_as_arr_splits_into_one_char_strings() {
    let mut engine = Engine::new();
    let v = engine.eval("\"ab\" as arr").unwrap();
    assert_eq!(v.format_debug(), "[\"a\" \"b\"]");
}

#[test]
fn bad_cast_target_is_a_semantic_error() {
    let mut engine = Engine::new();
    assert!(engine.eval("5 as nonsense").is_err());
}
