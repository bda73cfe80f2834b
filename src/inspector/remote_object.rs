use crate::core::{EvalError, Interpreter, ObjectClass, PropertyKey, ScriptId, SourceLocation, Value, format_js_number, value_to_string};
use crate::JSError;
use serde::Serialize;

/// Protocol mirror of an engine value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unserializable_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RemoteObject {
    fn new(kind: &str) -> Self {
        RemoteObject {
            kind: kind.to_string(),
            subtype: None,
            class_name: None,
            value: None,
            unserializable_value: None,
            description: None,
        }
    }

    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Undefined => RemoteObject::new("undefined"),
            Value::Null => RemoteObject {
                subtype: Some("null".into()),
                value: Some(serde_json::Value::Null),
                ..RemoteObject::new("object")
            },
            Value::Boolean(b) => RemoteObject {
                value: Some((*b).into()),
                ..RemoteObject::new("boolean")
            },
            Value::Number(n) => {
                let description = Some(format_js_number(*n));
                if n.is_finite() && !(*n == 0.0 && n.is_sign_negative()) {
                    let value = if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
                        serde_json::Value::from(*n as i64)
                    } else {
                        serde_json::Value::from(*n)
                    };
                    RemoteObject {
                        value: Some(value),
                        description,
                        ..RemoteObject::new("number")
                    }
                } else {
                    let unserializable = if n.is_finite() { "-0".to_string() } else { format_js_number(*n) };
                    RemoteObject {
                        unserializable_value: Some(unserializable.clone()),
                        description: Some(unserializable),
                        ..RemoteObject::new("number")
                    }
                }
            }
            Value::String(s) => RemoteObject {
                value: Some(s.clone().into()),
                ..RemoteObject::new("string")
            },
            Value::Symbol(sym) => RemoteObject {
                description: Some(sym.to_string()),
                ..RemoteObject::new("symbol")
            },
            Value::Object(obj) => {
                let data = obj.borrow();
                match data.class() {
                    ObjectClass::Array => RemoteObject {
                        subtype: Some("array".into()),
                        class_name: Some("Array".into()),
                        description: Some(format!("Array({})", data.array.as_ref().map(|a| a.len()).unwrap_or(0))),
                        ..RemoteObject::new("object")
                    },
                    ObjectClass::Error => {
                        let name = data
                            .get_own(&PropertyKey::from("name"))
                            .map(|v| value_to_string(&v))
                            .unwrap_or_else(|| "Error".into());
                        let stack = data.get_own(&PropertyKey::from("stack")).map(|v| value_to_string(&v));
                        RemoteObject {
                            subtype: Some("error".into()),
                            class_name: Some(name),
                            description: stack.or_else(|| Some(value_to_string(value))),
                            ..RemoteObject::new("object")
                        }
                    }
                    ObjectClass::Ordinary => RemoteObject {
                        class_name: Some("Object".into()),
                        description: Some("Object".into()),
                        ..RemoteObject::new("object")
                    },
                }
            }
            Value::Function(f) => RemoteObject {
                class_name: Some("Function".into()),
                description: Some(f.to_source_string()),
                ..RemoteObject::new("function")
            },
            Value::Promise(_) => RemoteObject {
                subtype: Some("promise".into()),
                class_name: Some("Promise".into()),
                description: Some("Promise".into()),
                ..RemoteObject::new("object")
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExceptionDetails {
    pub exception_id: u64,
    pub text: String,
    pub line_number: usize,
    pub column_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_id: Option<String>,
    pub exception: RemoteObject,
}

impl ExceptionDetails {
    pub(crate) fn new(id: u64, text: &str, location: Option<SourceLocation>, exception: &Value) -> Self {
        ExceptionDetails {
            exception_id: id,
            text: text.to_string(),
            line_number: location.map(|l| l.line_number).unwrap_or(0),
            column_number: location.map(|l| l.column_number).unwrap_or(0),
            script_id: location.map(|l| l.script_id.to_string()),
            exception: RemoteObject::from_value(exception),
        }
    }
}

/// Result of `Runtime.evaluate` and `Debugger.evaluateOnCallFrame`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateResult {
    pub result: RemoteObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception_details: Option<ExceptionDetails>,
    /// The engine value behind `result` (the exception when one was thrown).
    #[serde(skip)]
    pub value: Value,
}

impl EvaluateResult {
    pub fn is_exception(&self) -> bool {
        self.exception_details.is_some()
    }

    pub(crate) fn from_outcome(interp: &mut Interpreter, outcome: Result<Option<Value>, EvalError>) -> Result<Self, JSError> {
        match outcome {
            Ok(value) => {
                let value = value.unwrap_or(Value::Undefined);
                Ok(EvaluateResult {
                    result: RemoteObject::from_value(&value),
                    exception_details: None,
                    value,
                })
            }
            Err(EvalError::Throw(exception)) => {
                let location = interp.last_exception_location;
                Ok(interp.exception_result(exception, location))
            }
            Err(EvalError::Js(e)) => Err(e),
        }
    }
}

impl Interpreter {
    pub(crate) fn exception_result(&mut self, exception: Value, location: Option<SourceLocation>) -> EvaluateResult {
        let id = self.debugger.next_exception_id();
        EvaluateResult {
            result: RemoteObject::from_value(&exception),
            exception_details: Some(ExceptionDetails::new(id, "Uncaught", location, &exception)),
            value: exception,
        }
    }

    /// A compile error presented like a thrown `SyntaxError`.
    pub(crate) fn syntax_error_result(&mut self, error: &JSError, script_id: ScriptId) -> EvaluateResult {
        let (message, location) = match error {
            JSError::ParseError { message, line, column } | JSError::TokenizationError { message, line, column } => (
                message.clone(),
                Some(SourceLocation {
                    script_id,
                    line_number: *line,
                    column_number: *column,
                }),
            ),
            other => (other.to_string(), None),
        };
        let exception = self.create_error("SyntaxError", &message);
        self.exception_result(exception, location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_use_unserializable_values_when_needed() {
        let plain = RemoteObject::from_value(&Value::Number(3.0));
        assert_eq!(plain.value, Some(serde_json::json!(3)));
        let nan = RemoteObject::from_value(&Value::Number(f64::NAN));
        assert_eq!(nan.unserializable_value.as_deref(), Some("NaN"));
        let neg_zero = RemoteObject::from_value(&Value::Number(-0.0));
        assert_eq!(neg_zero.unserializable_value.as_deref(), Some("-0"));
    }

    #[test]
    fn serializes_camel_case_without_empty_fields() {
        let json = serde_json::to_value(RemoteObject::from_value(&Value::String("hi".into()))).unwrap();
        assert_eq!(json, serde_json::json!({"type": "string", "value": "hi"}));
    }
}
