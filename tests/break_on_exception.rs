use jsinspect::{EvaluateOptions, PauseOnExceptionsMode, PauseReason, PausedContext, Session};
use std::cell::RefCell;
use std::rc::Rc;

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

const DEFINITIONS: &str = r#"
function disposalUncaughtUsingSyntax() {
    using x = {
      value: 1,
      [Symbol.dispose]() {
    throw new Error("fail");
    }
    };
}

async function disposalUncaughtAwaitUsingSyntax() {
    await using y = {
      value: 2,
      [Symbol.asyncDispose]() {
    throw new Error("fail");
    }
    };
}

function disposalCaughtUsingSyntax() {
  try {
    using x = {
      value: 1,
      [Symbol.dispose]() {
    throw new Error("fail");
    }
    };
  } catch (e) {
  }
}

async function disposalCaughtAwaitUsingSyntax() {
  try {
    await using y = {
      value: 2,
      [Symbol.asyncDispose]() {
    throw new Error("fail");
    }
    };
  } catch (e) {
  }
}
"#;

const CALLS: [&str; 4] = [
    "disposalUncaughtUsingSyntax()",
    "disposalUncaughtAwaitUsingSyntax()",
    "disposalCaughtUsingSyntax()",
    "disposalCaughtAwaitUsingSyntax()",
];

/// `(expression, uncaught)` for every pause.
type Pauses = Rc<RefCell<Vec<(String, bool)>>>;

fn session_with_recorder() -> (Session, Pauses, Rc<RefCell<String>>) {
    let mut session = Session::new();
    let pauses: Pauses = Rc::default();
    let current: Rc<RefCell<String>> = Rc::default();
    let (p, c) = (pauses.clone(), current.clone());
    session.set_pause_handler(move |ctx: &mut PausedContext<'_>| {
        if let Some(PauseReason::Exception { value, uncaught }) = ctx.reason() {
            assert_eq!(value.get("message").and_then(|m| m.as_str().map(String::from)).as_deref(), Some("fail"));
            p.borrow_mut().push((c.borrow().clone(), uncaught));
        }
        ctx.resume().unwrap();
    });
    session.debugger_enable();
    session.add_script(DEFINITIONS, "test.js").unwrap();
    (session, pauses, current)
}

fn run_all(session: &mut Session, current: &Rc<RefCell<String>>) {
    for call in CALLS {
        *current.borrow_mut() = call.to_string();
        // Uncaught exceptions surface as errors; only the pauses matter here.
        let _ = session.add_script(call, "");
    }
}

fn paused_calls(pauses: &Pauses) -> Vec<(String, bool)> {
    pauses.borrow_mut().drain(..).collect()
}

#[test]
fn initial_state_never_pauses() {
    let (mut session, pauses, current) = session_with_recorder();
    run_all(&mut session, &current);
    assert!(paused_calls(&pauses).is_empty());
}

#[test]
fn mode_none_never_pauses() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::None).unwrap();
    run_all(&mut session, &current);
    assert!(paused_calls(&pauses).is_empty());
}

#[test]
fn mode_caught_pauses_only_inside_try() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::Caught).unwrap();
    run_all(&mut session, &current);
    assert_eq!(
        paused_calls(&pauses),
        vec![
            ("disposalCaughtUsingSyntax()".to_string(), false),
            ("disposalCaughtAwaitUsingSyntax()".to_string(), false),
        ]
    );
}

#[test]
fn mode_uncaught_skips_caught_disposal_errors() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::Uncaught).unwrap();
    run_all(&mut session, &current);
    assert_eq!(
        paused_calls(&pauses),
        vec![
            ("disposalUncaughtUsingSyntax()".to_string(), true),
            ("disposalUncaughtAwaitUsingSyntax()".to_string(), true),
        ]
    );
}

#[test]
fn mode_all_always_pauses() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::All).unwrap();
    run_all(&mut session, &current);
    let calls: Vec<String> = paused_calls(&pauses).into_iter().map(|(call, _)| call).collect();
    assert_eq!(calls, CALLS.to_vec());
}

#[test]
fn silent_evaluation_never_pauses() {
    let (mut session, pauses, _) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::All).unwrap();
    let silent = EvaluateOptions {
        silent: true,
        ..Default::default()
    };
    let result = session.evaluate("disposalUncaughtUsingSyntax()", silent).unwrap();
    assert!(result.is_exception());
    session.evaluate("disposalUncaughtAwaitUsingSyntax()", silent).unwrap();
    session.evaluate("disposalCaughtUsingSyntax()", silent).unwrap();
    session.evaluate("disposalCaughtAwaitUsingSyntax()", silent).unwrap();
    assert!(paused_calls(&pauses).is_empty());

    // A non-silent evaluation still pauses afterwards.
    session.evaluate("disposalCaughtUsingSyntax()", EvaluateOptions::default()).unwrap();
    assert_eq!(paused_calls(&pauses).len(), 1);
}

#[test]
fn awaited_async_call_is_caught_by_the_caller() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::Uncaught).unwrap();
    *current.borrow_mut() = "awaited".to_string();
    let script = "async function outer() { try { await disposalUncaughtAwaitUsingSyntax(); } catch (e) { return 1; } }\nouter();";
    session.add_script(script, "outer.js").unwrap();
    assert!(paused_calls(&pauses).is_empty());

    session.set_pause_on_exceptions(PauseOnExceptionsMode::Caught).unwrap();
    session.add_script("outer();", "").unwrap();
    assert_eq!(paused_calls(&pauses), vec![("awaited".to_string(), false)]);
}

#[test]
fn paused_notification_carries_exception_data() {
    let (mut session, _pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::All).unwrap();
    session.drain_notifications();
    *current.borrow_mut() = "data".to_string();
    let _ = session.add_script("disposalUncaughtUsingSyntax()", "");

    let notifications = session.drain_notifications();
    let paused = notifications.iter().find(|n| n.method == "Debugger.paused").unwrap();
    assert_eq!(paused.params["reason"], "exception");
    assert_eq!(paused.params["data"]["subtype"], "error");
    assert_eq!(paused.params["data"]["uncaught"], true);
    let frames = paused.params["callFrames"].as_array().unwrap();
    assert_eq!(frames[0]["functionName"], "[Symbol.dispose]");
    assert!(frames.iter().any(|f| f["functionName"] == "disposalUncaughtUsingSyntax"));
    assert!(notifications.iter().any(|n| n.method == "Debugger.resumed"));
}

#[test]
fn no_pause_while_debugger_disabled() {
    let (mut session, pauses, current) = session_with_recorder();
    session.set_pause_on_exceptions(PauseOnExceptionsMode::All).unwrap();
    session.debugger_disable();
    run_all(&mut session, &current);
    assert!(paused_calls(&pauses).is_empty());
    assert!(matches!(
        session.set_pause_on_exceptions(PauseOnExceptionsMode::All),
        Err(jsinspect::JSError::DebuggerNotEnabled)
    ));
}
