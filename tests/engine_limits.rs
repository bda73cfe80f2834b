use jsinspect::{JSError, Value, evaluate_script, format_console_value, value_to_string};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(script: &str) -> Result<Value, JSError> {
    evaluate_script(script, None::<&std::path::Path>)
}

fn eval_string(script: &str) -> String {
    value_to_string(&eval(script).unwrap())
}

fn thrown_name(result: Result<Value, JSError>) -> String {
    match result {
        Err(JSError::Throw { value }) => value_to_string(&value.get("name").unwrap()),
        other => panic!("Expected a thrown error, got {:?}", other),
    }
}

const COUNTDOWN: &str = "function f(n) { if (n == 0) { return 0; } return f(n - 1) + 1; }\n";

#[test]
fn deep_recursion_runs_on_a_grown_stack() {
    let result = eval(&format!("{COUNTDOWN}f(500)")).unwrap();
    assert!(matches!(result, Value::Number(n) if n == 500.0));
}

#[test]
fn runaway_recursion_is_a_range_error() {
    match eval(&format!("{COUNTDOWN}f(100000)")) {
        Err(JSError::Throw { value }) => {
            assert_eq!(value_to_string(&value), "RangeError: Maximum call stack size exceeded");
            let stack = value_to_string(&value.get("stack").unwrap());
            assert_eq!(stack.matches("\n    at f (").count(), 10, "{stack}");
        }
        other => panic!("Expected a RangeError, got {:?}", other),
    }

    let caught = format!("{COUNTDOWN}let name; try {{ f(100000); }} catch (e) {{ name = e.name; }} name");
    assert_eq!(eval_string(&caught), "RangeError");
}

#[test]
fn far_index_store_uses_dictionary_elements() {
    let script = "var a = []; a[4294967294] = 1; a.length + ':' + a[4294967294] + ':' + a[7]";
    assert_eq!(eval_string(script), "4294967295:1:undefined");

    let joined = "var b = [1]; b[2000] = 2; var s = '' + b; s.length + ':' + s[0] + ':' + s[2001]";
    assert_eq!(eval_string(joined), "2002:1:2");

    let holey = eval("var c = [1]; c[5000] = 2; c").unwrap();
    assert!(holey.elements_kind().unwrap().is_holey());
}

#[test]
fn huge_array_length_is_not_preallocated() {
    assert_eq!(eval_string("var a = new Array(4294967295); a[10] = 'x'; a.length + ':' + a[10]"), "4294967295:x");
    assert_eq!(thrown_name(eval("new Array(4294967296)")), "RangeError");
    assert_eq!(thrown_name(eval("'' + new Array(4294967295)")), "RangeError");

    let sparse = eval("new Array(4294967295)").unwrap();
    assert_eq!(format_console_value(&sparse), "[<4294967295 empty items>]");
}

#[test]
fn delete_from_dictionary_elements() {
    let script = "var a = []; a[100000] = 'x'; delete a[100000]; a.length + ':' + a[100000]";
    assert_eq!(eval_string(script), "100001:undefined");
}

#[test]
fn cyclic_arrays_join_and_print() {
    assert_eq!(eval_string("var a = [1]; a[0] = a; '' + a"), "");
    assert_eq!(eval_string("var b = [1, 2]; b[2] = b; '' + b"), "1,2,");

    let cyclic = eval("var c = [1]; c[1] = c; c").unwrap();
    assert_eq!(format_console_value(&cyclic), "[1, [Circular]]");

    let deep = eval("[[[[1]]]]").unwrap();
    assert_eq!(format_console_value(&deep), "[[[[Array]]]]");
}

#[test]
fn console_collapses_holes() {
    assert_eq!(format_console_value(&eval("[1, , 3]").unwrap()), "[1, <1 empty item>, 3]");
    assert_eq!(format_console_value(&eval("new Array(3)").unwrap()), "[<3 empty items>]");
}

#[test]
fn declarations_are_not_single_statement_bodies() {
    for script in [
        "if (true) let x = 1;",
        "if (true) {} else const y = 1;",
        "while (false) let z = 1;",
        "for (;;) let w = 1;",
        "function f() { if (true) using r = null; }",
        "async function g() { if (true) await using r = null; }",
    ] {
        assert!(matches!(eval(script), Err(JSError::ParseError { .. })), "{script}");
    }
    assert_eq!(eval_string("if (true) var v = 1; v"), "1");
    assert_eq!(eval_string("let using = 2; if (true) using; using"), "2");
}

#[test]
fn string_index_counts_utf16_units() {
    assert_eq!(eval_string("'a\u{1F600}b'.length"), "4");
    assert_eq!(eval_string("'a\u{1F600}b'[3]"), "b");
    assert_eq!(eval_string("'\u{1F600}'[0]"), "\u{FFFD}");
    assert_eq!(eval_string("'\u{1F600}'[2]"), "undefined");
}
