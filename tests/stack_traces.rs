use jsinspect::*;

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

#[test]
fn nested_method_stack_contains_frames() {
    let script = r#"
        let obj = {};
        obj.a = function a() { obj.b(); };
        obj.b = function b() { throw new Error('boom'); };
        let stack;
        try { obj.a(); } catch (e) { stack = e.stack; }
        stack
    "#;

    let result = value_to_string(&evaluate_script(script, None::<&std::path::Path>).unwrap());
    assert!(result.starts_with("Error: boom"));
    let b = result.find("at b (").unwrap();
    let a = result.find("at a (").unwrap();
    assert!(b < a, "innermost frame first:\n{result}");
}

#[test]
fn throw_stack_includes_statement_positions() {
    let script = "function doThirdThing() { throw new Error('boom'); }\nlet stack;\ntry { doThirdThing(); } catch (e) { stack = e.stack; }\nstack";

    let result = evaluate_script(script, Some(std::path::Path::new("some.js"))).unwrap();
    assert_eq!(
        value_to_string(&result),
        "Error: boom\n    at doThirdThing (some.js:1:27)\n    at <anonymous> (some.js:3:7)"
    );
}

#[test]
fn exception_details_point_at_the_throw() {
    let mut session = Session::new();
    session.runtime_enable();
    let script = "function inner() {\n  throw new Error('deep');\n}\nfunction outer() { inner(); }\nouter();";
    let err = session.run_script(script, "deep.js").unwrap_err();
    assert!(matches!(err, JSError::Throw { .. }));

    let thrown = session
        .drain_notifications()
        .into_iter()
        .find(|n| n.method == "Runtime.exceptionThrown")
        .unwrap();
    let details = &thrown.params["exceptionDetails"];
    assert_eq!(details["lineNumber"], 1);
    assert_eq!(details["columnNumber"], 2);
    assert_eq!(details["exception"]["className"], "Error");
    let description = details["exception"]["description"].as_str().unwrap();
    assert!(description.contains("at inner (deep.js:2:3)"), "{description}");
    assert!(description.contains("at outer (deep.js:4:20)"), "{description}");
}
