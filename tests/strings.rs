use luz::{Engine, Value};

#[test]
fn interpolation_splices_expressions_into_literal_text() {
    let mut engine = Engine::new();
    let v = engine.eval("x = 3; \"x is {x} and x*2 is {x * 2}\"").unwrap();
    assert_eq!(v, Value::Str("x is 3 and x*2 is 6".into()));
}

#[test]
fn nested_braces_reach_their_own_matching_close() {
    let mut engine = Engine::new();
    let v = engine.eval("a = [1 2 3]; \"first is {a[0]}\"").unwrap();
    assert_eq!(v, Value::Str("first is 1".into()));
}

#[test]
fn empty_braces_are_kept_as_literal_text() {
    let mut engine = Engine::new();
    let v = engine.eval("\"a {} b\"").unwrap();
    assert_eq!(v, Value::Str("a {} b".into()));
}

#[test]
fn backslash_escapes_decode_in_plain_and_interpolated_strings() {
    let mut engine = Engine::new();
    let v = engine.eval("\"a\\nb\\tc\"").unwrap();
    assert_eq!(v, Value::Str("a\nb\tc".into()));
    let v = engine.eval("\"quote: \\\"hi\\\"\"").unwrap();
    assert_eq!(v, Value::Str("quote: \"hi\"".into()));
}

#[test]
fn plain_format_is_unquoted_debug_format_is_quoted() {
    let v = Value::Str("hi\nthere".into());
    assert_eq!(v.format_plain(), "hi\nthere");
    assert_eq!(v.format_debug(), "\"hi\\nthere\"");
}

#[test]
fn array_of_strings_formats_each_element_in_debug_style() {
    let mut engine = Engine::new();
    let v = engine.eval("[\"a\" \"b\"]").unwrap();
    assert_eq!(v.format_debug(), "[\"a\" \"b\"]");
    assert_eq!(v.format_plain(), "[a b]");
}
