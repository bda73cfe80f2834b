use jsinspect::{EvaluateOptions, JSError, PauseOnExceptionsMode, PauseReason, PausedContext, PromiseState, Session, Value, promise_state};
use std::cell::RefCell;
use std::rc::Rc;

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn message_of(value: &Value) -> Option<String> {
    value.get("message").and_then(|m| m.as_str().map(String::from))
}

fn strings(value: Value) -> Vec<String> {
    value
        .array_elements()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap_or_default().to_string())
        .collect()
}

const TWO_THROWING: &str = r#"
let order = [];
function twoResources() {
  using a = { [Symbol.dispose]() { order[order.length] = "a"; throw new Error("a failed"); } };
  using b = { [Symbol.dispose]() { order[order.length] = "b"; throw new Error("b failed"); } };
  order[order.length] = "body";
}
let result;
try { twoResources(); } catch (e) { result = e; }
"#;

#[test]
fn disposes_in_reverse_order_and_chains_suppressed_errors() {
    let mut session = Session::new();
    session.run_script(TWO_THROWING, "order.js").unwrap();
    assert_eq!(strings(session.global("order").unwrap()), ["body", "b", "a"]);

    let result = session.global("result").unwrap();
    assert_eq!(result.get("name").unwrap().as_str(), Some("SuppressedError"));
    assert_eq!(message_of(&result.get("error").unwrap()).as_deref(), Some("a failed"));
    assert_eq!(message_of(&result.get("suppressed").unwrap()).as_deref(), Some("b failed"));
}

#[test]
fn each_disposal_failure_is_its_own_pause() {
    let mut session = Session::new();
    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let s = seen.clone();
    session.set_pause_handler(move |ctx: &mut PausedContext<'_>| {
        if let Some(PauseReason::Exception { value, .. }) = ctx.reason() {
            s.borrow_mut().push(message_of(&value).unwrap_or_default());
        }
    });
    session.debugger_enable();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::Caught).unwrap();
    session.run_script(TWO_THROWING, "order.js").unwrap();
    assert_eq!(*seen.borrow(), ["b failed", "a failed"]);
}

#[test]
fn body_exception_becomes_suppressed() {
    let script = r#"
function f() {
  using r = { [Symbol.dispose]() { throw new Error("dispose"); } };
  throw new Error("body");
}
let caught;
try { f(); } catch (e) { caught = e; }
"#;
    let mut session = Session::new();
    session.run_script(script, "body.js").unwrap();
    let caught = session.global("caught").unwrap();
    assert_eq!(message_of(&caught).as_deref(), Some("An error was suppressed during disposal."));
    assert_eq!(message_of(&caught.get("error").unwrap()).as_deref(), Some("dispose"));
    assert_eq!(message_of(&caught.get("suppressed").unwrap()).as_deref(), Some("body"));
}

#[test]
fn disposal_runs_on_return_and_break() {
    let script = r#"
let log = [];
function res(name) { return { [Symbol.dispose]() { log[log.length] = name; } }; }
function early() {
  using r = res("return");
  return 1;
}
early();
for (let i = 0; i < 3; i++) {
  using r = res("iteration");
  if (i == 1) { break; }
}
{
  using skipped = null;
  using kept = res("block");
}
"#;
    let mut session = Session::new();
    session.run_script(script, "exits.js").unwrap();
    assert_eq!(strings(session.global("log").unwrap()), ["return", "iteration", "iteration", "block"]);
}

#[test]
fn non_disposable_value_is_a_type_error() {
    let mut session = Session::new();
    let err = session.run_script("{ using x = 5; }", "bad.js").unwrap_err();
    let JSError::Throw { value } = err else {
        panic!("expected a thrown TypeError, got {err:?}");
    };
    assert_eq!(value.get("name").unwrap().as_str(), Some("TypeError"));
}

#[test]
fn using_is_rejected_at_script_top_level() {
    let mut session = Session::new();
    let err = session.run_script("using x = null;", "top.js").unwrap_err();
    assert!(matches!(err, JSError::ParseError { .. }), "got {err:?}");
    let result = session.evaluate("await 1", EvaluateOptions::default()).unwrap();
    assert!(result.is_exception());
    assert_eq!(result.result.class_name.as_deref(), Some("SyntaxError"));
}

#[test]
fn await_using_disposal_finishes_before_the_promise_settles() {
    let script = r#"
let log = [];
async function work() {
  await using r = {
    [Symbol.asyncDispose]() {
      debugger;
      log[log.length] = "disposed";
      return Promise.resolve(7);
    }
  };
  log[log.length] = "body";
  return "done";
}
let p = work();
log[log.length] = "after call";
"#;
    let mut session = Session::new();
    let paused_log: Rc<RefCell<Option<String>>> = Rc::default();
    let p = paused_log.clone();
    session.set_pause_handler(move |ctx: &mut PausedContext<'_>| {
        let frames = ctx.call_frames();
        let result = ctx.evaluate_on_call_frame(&frames[0].call_frame_id, "log.length").unwrap();
        *p.borrow_mut() = Some(format!("{:?}", result.value));
        ctx.resume().unwrap();
    });
    session.debugger_enable();
    session.run_script(script, "await-using.js").unwrap();

    assert_eq!(paused_log.borrow().as_deref(), Some("1"));
    assert_eq!(strings(session.global("log").unwrap()), ["body", "disposed", "after call"]);
    match promise_state(&session.global("p").unwrap()) {
        Some(PromiseState::Fulfilled(Value::String(s))) => assert_eq!(s, "done"),
        other => panic!("unexpected promise state {other:?}"),
    }
}

#[test]
fn rejected_async_disposal_rejects_the_function_promise() {
    let script = r#"
async function work() {
  await using r = { [Symbol.asyncDispose]() { return Promise.reject(new Error("async dispose")); } };
}
let p = work();
"#;
    let mut session = Session::new();
    session.runtime_enable();
    session.run_script(script, "reject.js").unwrap();
    match promise_state(&session.global("p").unwrap()) {
        Some(PromiseState::Rejected(reason)) => assert_eq!(message_of(&reason).as_deref(), Some("async dispose")),
        other => panic!("unexpected promise state {other:?}"),
    }
    let notifications = session.drain_notifications();
    let thrown = notifications.iter().find(|n| n.method == "Runtime.exceptionThrown").unwrap();
    assert_eq!(thrown.params["exceptionDetails"]["text"], "Uncaught (in promise)");
}
