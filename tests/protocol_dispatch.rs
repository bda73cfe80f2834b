use jsinspect::{Session, channel_frontend};
use serde_json::{Value as JsonValue, json};
use std::thread;

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn call(session: &mut Session, id: u64, method: &str, params: JsonValue) -> JsonValue {
    let response = session.dispatch(&json!({ "id": id, "method": method, "params": params }));
    assert_eq!(response["id"], id, "{method}: {response}");
    response
}

#[test]
fn runtime_and_debugger_methods_round_trip() {
    let mut session = Session::new();
    assert_eq!(call(&mut session, 1, "Runtime.enable", json!({}))["result"], json!({}));
    let enabled = call(&mut session, 2, "Debugger.enable", json!({}));
    assert!(enabled["result"]["debuggerId"].is_string());
    assert_eq!(call(&mut session, 3, "Debugger.setPauseOnExceptions", json!({ "state": "uncaught" }))["result"], json!({}));

    let evaluated = call(&mut session, 4, "Runtime.evaluate", json!({ "expression": "let n = 20; n + 22", "replMode": true }));
    assert_eq!(evaluated["result"]["result"], json!({ "type": "number", "value": 42, "description": "42" }));

    let awaited = call(&mut session, 5, "Runtime.evaluate", json!({ "expression": "Promise.resolve('ok')", "awaitPromise": true }));
    assert_eq!(awaited["result"]["result"]["value"], "ok");

    let breakpoint = call(&mut session, 6, "Debugger.setBreakpointByUrl", json!({ "url": "none.js", "lineNumber": 3 }));
    assert_eq!(breakpoint["result"]["breakpointId"], "1:3:0:none.js");
    assert_eq!(breakpoint["result"]["locations"], json!([]));
    assert_eq!(call(&mut session, 7, "Debugger.removeBreakpoint", json!({ "breakpointId": "1:3:0:none.js" }))["result"], json!({}));

    assert_eq!(call(&mut session, 8, "Debugger.disable", json!({}))["result"], json!({}));
}

#[test]
fn errors_carry_protocol_codes() {
    let mut session = Session::new();
    let resume = call(&mut session, 1, "Debugger.resume", JsonValue::Null);
    assert_eq!(resume["error"]["code"], -32000);

    let frame = call(&mut session, 2, "Debugger.evaluateOnCallFrame", json!({ "callFrameId": "1:0", "expression": "1" }));
    assert_eq!(frame["error"]["code"], -32000);

    let missing = call(&mut session, 3, "Debugger.setBreakpointByUrl", json!({ "url": "a.js" }));
    assert_eq!(missing["error"]["code"], -32602);

    let unknown = call(&mut session, 4, "Profiler.start", json!({}));
    assert_eq!(unknown["error"]["code"], -32601);

    let disabled = call(&mut session, 5, "Debugger.setPauseOnExceptions", json!({ "state": "all" }));
    assert_eq!(disabled["error"]["code"], -32000);
}

#[test]
fn uncaught_script_error_is_reported_when_runtime_enabled() {
    let mut session = Session::new();
    call(&mut session, 1, "Runtime.enable", json!({}));
    let _ = session.run_script("\n  null.field;", "crash.js");
    let thrown = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Runtime.exceptionThrown")
        .unwrap();
    let details = &thrown.params["exceptionDetails"];
    assert_eq!(details["text"], "Uncaught");
    assert_eq!(details["lineNumber"], 1);
    assert_eq!(details["exception"]["className"], "TypeError");
}

#[test]
fn frontend_on_another_thread_drives_a_pause() {
    let mut session = Session::new();
    let (frontend, handle) = channel_frontend(session.notifications());
    session.set_pause_handler(frontend);
    session.debugger_enable();

    let client = thread::spawn(move || {
        let paused = handle.wait_for("Debugger.paused").unwrap();
        assert_eq!(paused.params["reason"], "exception");
        assert_eq!(paused.params["data"]["uncaught"], false);
        let frame_id = paused.params["callFrames"][0]["callFrameId"].as_str().unwrap().to_string();

        let local = handle
            .call("Debugger.evaluateOnCallFrame", json!({ "callFrameId": frame_id, "expression": "attempt * 2" }))
            .unwrap();
        let resumed = handle.call("Debugger.resume", json!({})).unwrap();
        (local, resumed)
    });

    session.set_pause_on_exceptions(jsinspect::PauseOnExceptionsMode::Caught).unwrap();
    let script = r#"
function risky(attempt) {
  try {
    throw new Error("attempt " + attempt);
  } catch (e) {
    return e.message;
  }
}
risky(21);
"#;
    let completion = session.run_script(script, "risky.js").unwrap();
    assert_eq!(jsinspect::value_to_string(&completion), "attempt 21");

    let (local, resumed) = client.join().unwrap();
    assert_eq!(local["result"]["result"]["value"], 42);
    assert_eq!(resumed["result"], json!({}));
    assert!(!session.is_paused());
}

#[test]
fn console_log_reaches_the_runtime_domain() {
    let mut session = Session::new();
    session.run_script("console.log('before enable')", "quiet.js").unwrap();
    assert!(session.drain_notifications().is_empty());

    call(&mut session, 1, "Runtime.enable", json!({}));
    session
        .run_script("function report(v) { console.log('value', v, [1, , 3]); }\nreport(7);", "console.js")
        .unwrap();
    let logged = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Runtime.consoleAPICalled")
        .unwrap();
    assert_eq!(logged.params["type"], "log");
    assert_eq!(logged.params["args"][0]["value"], "value");
    assert_eq!(logged.params["args"][1]["value"], 7);
    assert_eq!(logged.params["args"][2]["subtype"], "array");
    assert_eq!(logged.params["stackTrace"]["callFrames"][0]["functionName"], "report");
}
