use jsinspect::{JSError, PauseReason, PausedContext, Session, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

const FAIL_FUNCTION: &str = r#"
function func() {
  const a = 1;
}
await new Promise(resolve => {
  func();
  resolve()
});
"#;

const SUCCESS_FUNCTION: &str = r#"
return arg1 + arg2;
"#;

#[test]
fn failed_compilation_leaves_nothing_to_break_on() {
    let mut session = Session::new();
    session.debugger_enable();
    let err = session.compile_function(FAIL_FUNCTION, "file1.js", 0, 0, &[]).unwrap_err();
    assert!(matches!(err, JSError::ParseError { .. }), "got {err:?}");

    let breakpoint = session.set_breakpoint_by_url("file1.js", 2, 0).unwrap();
    assert!(breakpoint.locations.is_empty());

    let notifications = session.drain_notifications();
    let failed = notifications.iter().find(|n| n.method == "Debugger.scriptFailedToParse").unwrap();
    assert_eq!(failed.params["url"], "file1.js");
    assert!(!notifications.iter().any(|n| n.method == "Debugger.scriptParsed"));
}

#[test]
fn offsets_place_the_body_in_the_enclosing_file() {
    let mut session = Session::new();
    session.debugger_enable();
    session.compile_function(SUCCESS_FUNCTION, "file2.js", 2, 0, &["arg1", "arg2"]).unwrap();

    let breakpoint = session.set_breakpoint_by_url("file2.js", 2, 0).unwrap();
    assert_eq!(breakpoint.locations.len(), 1);
    assert_eq!(breakpoint.locations[0].line_number, 3);
    assert_eq!(breakpoint.locations[0].column_number, 0);

    let parsed = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Debugger.scriptParsed")
        .unwrap();
    assert_eq!(parsed.params["url"], "file2.js");
    assert_eq!(parsed.params["startLine"], 2);
    assert_eq!(parsed.params["endLine"], 4);
}

#[test]
fn compiled_function_takes_its_parameters() {
    let mut session = Session::new();
    let func = session.compile_function(SUCCESS_FUNCTION, "file2.js", 2, 0, &["arg1", "arg2"]).unwrap();
    let sum = session.call_function(&func, vec![Value::Number(1.0), Value::Number(2.0)]).unwrap();
    assert!(matches!(sum, Value::Number(n) if n == 3.0));

    let concat = session
        .call_function(&func, vec![Value::String("a".into()), Value::String("b".into())])
        .unwrap();
    assert!(matches!(concat, Value::String(ref s) if s == "ab"));
}

#[test]
fn breakpoint_in_compiled_function_pauses_the_call() {
    let mut session = Session::new();
    let hits: Rc<RefCell<Vec<(usize, String)>>> = Rc::default();
    let h = hits.clone();
    session.set_pause_handler(move |ctx: &mut PausedContext<'_>| {
        assert!(matches!(ctx.reason(), Some(PauseReason::Other)));
        let frames = ctx.call_frames();
        let args = ctx.evaluate_on_call_frame(&frames[0].call_frame_id, "arg1 * 10 + arg2").unwrap();
        h.borrow_mut().push((frames[0].location.line_number, format!("{:?}", args.value)));
    });
    session.debugger_enable();
    let func = session.compile_function(SUCCESS_FUNCTION, "file2.js", 2, 0, &["arg1", "arg2"]).unwrap();
    let breakpoint = session.set_breakpoint_by_url("file2.js", 2, 0).unwrap();
    session.drain_notifications();

    session.call_function(&func, vec![Value::Number(4.0), Value::Number(2.0)]).unwrap();
    assert_eq!(*hits.borrow(), [(3, "42".to_string())]);

    let paused = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Debugger.paused")
        .unwrap();
    assert_eq!(paused.params["reason"], "other");
    assert_eq!(paused.params["hitBreakpoints"][0], breakpoint.breakpoint_id.as_str());

    session.remove_breakpoint(&breakpoint.breakpoint_id).unwrap();
    session.call_function(&func, vec![Value::Number(0.0), Value::Number(0.0)]).unwrap();
    assert_eq!(hits.borrow().len(), 1);
}

#[test]
fn pending_breakpoint_resolves_when_the_script_arrives() {
    let mut session = Session::new();
    session.debugger_enable();
    let breakpoint = session.set_breakpoint_by_url("later.js", 1, 0).unwrap();
    assert!(breakpoint.locations.is_empty());

    session.add_script("let a = 1;\nlet b = 2;\n", "later.js").unwrap();
    let resolved = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Debugger.breakpointResolved")
        .unwrap();
    assert_eq!(resolved.params["breakpointId"], breakpoint.breakpoint_id.as_str());
    assert_eq!(resolved.params["location"]["lineNumber"], 1);
}

#[test]
fn breakpoint_bookkeeping_errors() {
    let mut session = Session::new();
    assert!(matches!(session.set_breakpoint_by_url("a.js", 0, 0), Err(JSError::DebuggerNotEnabled)));

    session.debugger_enable();
    let breakpoint = session.set_breakpoint_by_url("a.js", 0, 0).unwrap();
    assert_eq!(breakpoint.breakpoint_id, "1:0:0:a.js");
    assert!(matches!(session.set_breakpoint_by_url("a.js", 0, 0), Err(JSError::BreakpointExists)));

    session.remove_breakpoint(&breakpoint.breakpoint_id).unwrap();
    assert!(matches!(
        session.remove_breakpoint(&breakpoint.breakpoint_id),
        Err(JSError::UnknownBreakpoint { .. })
    ));
}

#[test]
fn enabling_replays_known_scripts() {
    let mut session = Session::new();
    session.add_script("1", "early.js").unwrap();
    assert!(session.drain_notifications().is_empty());

    session.debugger_enable();
    let urls: Vec<String> = session
        .drain_notifications()
        .into_iter()
        .filter(|n| n.method == "Debugger.scriptParsed")
        .map(|n| n.params["url"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(urls, ["early.js"]);
}
