use crate::{
    JSError,
    core::{Interpreter, JSObjectData, Value, value_to_string},
};
use std::cell::RefCell;
use std::rc::Rc;

pub const SUPPRESSED_ERROR_MESSAGE: &str = "An error was suppressed during disposal.";

/// Frames recorded in an error's `stack`.
pub const STACK_TRACE_LIMIT: usize = 10;

#[derive(Debug)]
pub enum EvalError {
    Js(JSError),
    /// A JavaScript exception in flight.
    Throw(Value),
}

impl From<JSError> for EvalError {
    fn from(e: JSError) -> Self {
        EvalError::Js(e)
    }
}

impl From<EvalError> for JSError {
    fn from(e: EvalError) -> Self {
        match e {
            EvalError::Js(j) => j,
            EvalError::Throw(value) => JSError::Throw { value },
        }
    }
}

impl EvalError {
    pub fn message(&self) -> String {
        match self {
            EvalError::Js(e) => e.to_string(),
            EvalError::Throw(v) => value_to_string(v),
        }
    }
}

/// Check if a value is an Error object.
pub fn is_error(val: &Value) -> bool {
    matches!(val, Value::Object(obj) if obj.borrow().is_error)
}

impl Interpreter {
    /// Creates an error object of class `name` with a stack of the live frames.
    pub(crate) fn create_error(&self, name: &str, message: &str) -> Value {
        let mut stack = if message.is_empty() { name.to_string() } else { format!("{name}: {message}") };
        for frame in self.call_stack.iter().rev().take(STACK_TRACE_LIMIT) {
            let url = self.scripts.url_of(frame.location.script_id).unwrap_or_default();
            let function = if frame.function_name.is_empty() { "<anonymous>" } else { &frame.function_name };
            stack.push_str(&format!(
                "\n    at {} ({}:{}:{})",
                function,
                url,
                frame.location.line_number + 1,
                frame.location.column_number + 1
            ));
        }
        let mut data = JSObjectData {
            is_error: true,
            ..Default::default()
        };
        data.set("name", Value::String(name.to_string()));
        data.set("message", Value::String(message.to_string()));
        data.set("stack", Value::String(stack));
        Value::Object(Rc::new(RefCell::new(data)))
    }

    /// `SuppressedError` carrying the newer `error` and the earlier `suppressed` one.
    pub(crate) fn create_suppressed_error(&self, error: Value, suppressed: Value) -> Value {
        let value = self.create_error("SuppressedError", SUPPRESSED_ERROR_MESSAGE);
        if let Value::Object(obj) = &value {
            let mut data = obj.borrow_mut();
            data.set("error", error);
            data.set("suppressed", suppressed);
        }
        value
    }

    /// Raises `value` as an exception, giving the debugger a chance to pause first.
    pub(crate) fn throw_value(&mut self, value: Value) -> EvalError {
        self.last_exception_location = self.current_location();
        self.report_exception(&value);
        EvalError::Throw(value)
    }

    pub(crate) fn throw_error(&mut self, name: &str, message: &str) -> EvalError {
        let value = self.create_error(name, message);
        self.throw_value(value)
    }
}
