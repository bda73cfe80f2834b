use crate::JSError;
use crate::core::Interpreter;
use crate::inspector::{EvaluateOptions, PauseOnExceptionsMode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value as JsonValue, json};

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: JsonValue,
}

#[derive(Deserialize)]
struct SetPauseOnExceptionsParams {
    state: PauseOnExceptionsMode,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateOnCallFrameParams {
    call_frame_id: String,
    expression: String,
    #[serde(default)]
    silent: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetBreakpointByUrlParams {
    line_number: usize,
    url: String,
    #[serde(default)]
    column_number: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoveBreakpointParams {
    breakpoint_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateParams {
    expression: String,
    #[serde(default)]
    repl_mode: bool,
    #[serde(default)]
    silent: bool,
    #[serde(default)]
    await_promise: bool,
}

fn params<T: DeserializeOwned>(raw: JsonValue) -> Result<T, JSError> {
    let raw = if raw.is_null() { json!({}) } else { raw };
    serde_json::from_value(raw).map_err(|e| crate::raise_invalid_params!(e))
}

fn to_json<T: serde::Serialize>(value: T) -> Result<JsonValue, JSError> {
    serde_json::to_value(value).map_err(|e| JSError::InvalidParams { message: e.to_string() })
}

/// Handles one protocol message `{id, method, params}` and returns the
/// response `{id, result}` or `{id, error: {code, message}}`.
pub fn dispatch(interp: &mut Interpreter, message: &JsonValue) -> JsonValue {
    let message: Message = match serde_json::from_value(message.clone()) {
        Ok(m) => m,
        Err(e) => {
            let err = crate::raise_invalid_params!(e);
            return json!({ "id": message.get("id").cloned(), "error": error_body(&err) });
        }
    };
    log::trace!("dispatch {}", message.method);
    match handle(interp, &message.method, message.params) {
        Ok(result) => json!({ "id": message.id, "result": result }),
        Err(e) => {
            log::debug!("{} failed: {}", message.method, e);
            json!({ "id": message.id, "error": error_body(&e) })
        }
    }
}

fn error_body(e: &JSError) -> JsonValue {
    json!({ "code": e.protocol_code(), "message": e.to_string() })
}

fn handle(interp: &mut Interpreter, method: &str, raw: JsonValue) -> Result<JsonValue, JSError> {
    match method {
        "Debugger.enable" => {
            interp.debugger_enable();
            Ok(json!({ "debuggerId": "jsinspect" }))
        }
        "Debugger.disable" => {
            interp.debugger_disable();
            Ok(json!({}))
        }
        "Debugger.setPauseOnExceptions" => {
            let p: SetPauseOnExceptionsParams = params(raw)?;
            interp.set_pause_on_exceptions(p.state)?;
            Ok(json!({}))
        }
        "Debugger.resume" => {
            interp.resume_paused()?;
            Ok(json!({}))
        }
        "Debugger.evaluateOnCallFrame" => {
            let p: EvaluateOnCallFrameParams = params(raw)?;
            to_json(interp.evaluate_on_call_frame(&p.call_frame_id, &p.expression, p.silent)?)
        }
        "Debugger.setBreakpointByUrl" => {
            let p: SetBreakpointByUrlParams = params(raw)?;
            let bp = interp.set_breakpoint_by_url(&p.url, p.line_number, p.column_number)?;
            Ok(json!({ "breakpointId": bp.breakpoint_id, "locations": bp.locations }))
        }
        "Debugger.removeBreakpoint" => {
            let p: RemoveBreakpointParams = params(raw)?;
            interp.remove_breakpoint(&p.breakpoint_id)?;
            Ok(json!({}))
        }
        "Runtime.enable" => {
            interp.runtime_enabled = true;
            Ok(json!({}))
        }
        "Runtime.evaluate" => {
            let p: EvaluateParams = params(raw)?;
            let options = EvaluateOptions {
                repl_mode: p.repl_mode,
                silent: p.silent,
                await_promise: p.await_promise,
            };
            to_json(interp.evaluate(&p.expression, options)?)
        }
        other => Err(JSError::UnknownMethod { method: other.to_string() }),
    }
}
