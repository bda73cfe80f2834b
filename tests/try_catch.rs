use jsinspect::{JSError, Value, evaluate_script, value_to_string};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn eval(script: &str) -> Result<Value, JSError> {
    evaluate_script(script, None::<&std::path::Path>)
}

#[test]
fn catch_preserves_number_throw() {
    for script in ["try { throw 42; } catch (e) { e }", "try { throw 42 } catch (e) { e }"] {
        match eval(script) {
            Ok(Value::Number(n)) => assert_eq!(n, 42.0),
            other => panic!("Expected number 42.0, got {:?}", other),
        }
    }
}

#[test]
fn catch_preserves_string_throw() {
    match eval("try { throw 'boom'; } catch (e) { e }") {
        Ok(Value::String(s)) => assert_eq!(s, "boom"),
        other => panic!("Expected string 'boom', got {:?}", other),
    }
}

#[test]
fn engine_errors_reach_the_catch_clause() {
    let result = eval("let caught; try { let a = 1; a(); } catch (e) { caught = e.name + ': ' + e.message; } caught").unwrap();
    assert_eq!(value_to_string(&result), "TypeError: a is not a function");
}

#[test]
fn finally_runs_on_every_exit() {
    let script = r#"
let log = [];
function f(mode) {
  try {
    if (mode == 1) { return "returned"; }
    if (mode == 2) { throw new Error("thrown"); }
  } catch (e) {
    log[log.length] = "catch";
  } finally {
    log[log.length] = "finally " + mode;
  }
  return "fell through";
}
f(0) + "|" + f(1) + "|" + f(2) + "|" + log.length
"#;
    assert_eq!(value_to_string(&eval(script).unwrap()), "fell through|returned|fell through|4");
}

#[test]
fn catch_without_binding_and_rethrow() {
    let script = r#"
let outer;
try {
  try { throw 1; } catch { throw 2; }
} catch (e) { outer = e; }
outer
"#;
    assert!(matches!(eval(script), Ok(Value::Number(n)) if n == 2.0));
}

#[test]
fn uncaught_throw_surfaces_as_error() {
    match eval("throw new TypeError('bad')") {
        Err(JSError::Throw { value }) => {
            assert_eq!(value.get("message").unwrap().as_str(), Some("bad"));
            assert!(jsinspect::is_error(&value));
        }
        other => panic!("Expected a thrown TypeError, got {:?}", other),
    }
}

#[test]
fn try_without_handler_is_a_parse_error() {
    assert!(matches!(eval("try { 1 }"), Err(JSError::ParseError { .. })));
}
