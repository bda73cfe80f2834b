use crate::core::{Interpreter, JSObjectData, Value, format_js_number, value_to_string};
use crate::inspector::RemoteObject;
use crate::js_array::JSArray;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Elements printed before the rest of an array is summarized.
const MAX_ARRAY_ITEMS: usize = 100;

/// Nesting below which arrays and objects print as `[Array]` / `[Object]`.
const MAX_DEPTH: usize = 2;

pub fn format_console_value(val: &Value) -> String {
    format_nested(val, 0, &mut Vec::new())
}

fn format_nested(val: &Value, depth: usize, seen: &mut Vec<*const RefCell<JSObjectData>>) -> String {
    match val {
        Value::Number(n) => format_js_number(*n),
        Value::String(s) if depth > 0 => format!("'{s}'"),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(obj);
            if seen.contains(&ptr) {
                return "[Circular]".to_string();
            }
            let data = obj.borrow();
            if data.is_error {
                return value_to_string(val);
            }
            if depth > MAX_DEPTH {
                return if data.array.is_some() { "[Array]" } else { "[Object]" }.to_string();
            }
            seen.push(ptr);
            let text = match &data.array {
                Some(array) => format_array(array, depth, seen),
                None if data.properties.is_empty() => "{}".to_string(),
                None => {
                    let parts: Vec<String> = data
                        .properties
                        .iter()
                        .map(|(key, v)| format!("{}: {}", key, format_nested(v, depth + 1, seen)))
                        .collect();
                    format!("{{ {} }}", parts.join(", "))
                }
            };
            seen.pop();
            text
        }
        Value::Function(f) => {
            let name = f.name();
            format!("[Function: {}]", if name.is_empty() { "(anonymous)" } else { &name })
        }
        Value::Promise(_) => "Promise {}".to_string(),
        other => value_to_string(other),
    }
}

fn empty_items(count: usize) -> String {
    if count == 1 { "<1 empty item>".to_string() } else { format!("<{count} empty items>") }
}

/// Runs of holes collapse into one `<n empty items>` entry.
fn format_array(array: &JSArray, depth: usize, seen: &mut Vec<*const RefCell<JSObjectData>>) -> String {
    let mut parts = Vec::new();
    let mut next = 0;
    let mut shown = 0;
    for (index, element) in array.present() {
        if shown >= MAX_ARRAY_ITEMS {
            break;
        }
        if index > next {
            parts.push(empty_items(index - next));
            shown += 1;
        }
        parts.push(format_nested(&element, depth + 1, seen));
        shown += 1;
        next = index + 1;
    }
    if shown < MAX_ARRAY_ITEMS && array.len() > next {
        parts.push(empty_items(array.len() - next));
        next = array.len();
    }
    if array.len() > next {
        let rest = array.len() - next;
        parts.push(format!("... {rest} more item{}", if rest == 1 { "" } else { "s" }));
    }
    format!("[{}]", parts.join(", "))
}

/// `console.log(...)`: prints the arguments and forwards them to the
/// runtime domain when it is enabled.
pub(crate) fn console_log(interp: &mut Interpreter, args: &[Value]) {
    let output = args.iter().map(format_console_value).collect::<Vec<_>>().join(" ");
    log::debug!("console.log: {}", output);
    println!("{}", output);
    if interp.runtime_enabled {
        let remote: Vec<RemoteObject> = args.iter().map(RemoteObject::from_value).collect();
        interp.notify(
            "Runtime.consoleAPICalled",
            json!({
                "type": "log",
                "args": remote,
                "stackTrace": { "callFrames": interp.stack_trace_json() },
            }),
        );
    }
}
