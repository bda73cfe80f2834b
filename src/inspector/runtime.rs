use crate::JSError;
use crate::core::{EvalError, Interpreter, ParseGoal, ScriptId, Value};
use crate::inspector::{EvaluateResult, ExceptionDetails};
use crate::js_disposable::dispose_resources;
use crate::js_function::{Closure, JSFunction};
use serde_json::json;
use std::rc::Rc;

/// Flags of `Runtime.evaluate`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvaluateOptions {
    /// Persistent bindings, top-level `await`/`using`, redeclarable `let`.
    pub repl_mode: bool,
    /// Exceptions raised by the evaluation never pause.
    pub silent: bool,
    /// Unwrap a promise result.
    pub await_promise: bool,
}

impl EvaluateOptions {
    pub fn repl() -> Self {
        EvaluateOptions {
            repl_mode: true,
            ..Default::default()
        }
    }
}

impl Interpreter {
    pub(crate) fn evaluate(&mut self, expression: &str, options: EvaluateOptions) -> Result<EvaluateResult, JSError> {
        let goal = if options.repl_mode { ParseGoal::Repl } else { ParseGoal::Script };
        let template = match self.compile_script(expression, "", goal, 0, 0, &[]) {
            Ok(template) => template,
            Err(e) => {
                let script_id = self.scripts.last_id();
                return Ok(self.syntax_error_result(&e, script_id));
            }
        };
        let scope = if options.repl_mode { self.repl_scope.clone() } else { self.global.clone() };
        let unwrap_promise = options.repl_mode || options.await_promise;
        let result = self.run_evaluation(options.silent, |interp| {
            let value = interp.run_program(&template, &scope, !options.repl_mode)?;
            match value {
                Some(promise @ Value::Promise(_)) if unwrap_promise => interp.await_value(promise).map(Some),
                other => Ok(other),
            }
        });
        self.report_unhandled_rejections();
        result
    }

    /// Emits `Runtime.exceptionThrown` for rejections nothing observed.
    pub(crate) fn report_unhandled_rejections(&mut self) {
        for reason in self.take_unhandled_rejections() {
            log::debug!("unhandled rejection: {:?}", reason);
            let id = self.debugger.next_exception_id();
            let details = ExceptionDetails::new(id, "Uncaught (in promise)", None, &reason);
            self.notify_exception_thrown(details);
        }
    }

    fn notify_exception_thrown(&self, details: ExceptionDetails) {
        if !self.runtime_enabled {
            return;
        }
        self.notify(
            "Runtime.exceptionThrown",
            json!({
                "timestamp": chrono::Utc::now().timestamp_millis(),
                "exceptionDetails": details,
            }),
        );
    }

    /// Compiles and runs a classic script loaded from `url`, returning its
    /// id and completion value.
    pub(crate) fn run_script(&mut self, source: &str, url: &str) -> Result<(ScriptId, Value), JSError> {
        let template = self.compile_script(source, url, ParseGoal::Script, 0, 0, &[])?;
        let global = self.global.clone();
        let outcome = self.run_program(&template, &global, true);
        self.report_unhandled_rejections();
        match outcome {
            Ok(value) => Ok((template.script_id, value.unwrap_or(Value::Undefined))),
            Err(EvalError::Throw(value)) => {
                let id = self.debugger.next_exception_id();
                let details = ExceptionDetails::new(id, "Uncaught", self.last_exception_location, &value);
                self.notify_exception_thrown(details);
                Err(JSError::Throw { value })
            }
            Err(EvalError::Js(e)) => Err(e),
        }
    }

    /// Builds a function from a body text, as if it had been written at
    /// `line_offset`/`column_offset` of `url`. The body closes over the
    /// global scope.
    pub(crate) fn compile_function(
        &mut self,
        source: &str,
        url: &str,
        line_offset: usize,
        column_offset: usize,
        params: &[String],
    ) -> Result<Value, JSError> {
        let template = self.compile_script(source, url, ParseGoal::FunctionBody, line_offset, column_offset, params)?;
        Ok(Value::Function(Rc::new(JSFunction::Closure(Closure {
            template,
            env: self.global.clone(),
        }))))
    }

    /// Disposes the REPL scope's `using` resources in reverse order.
    pub(crate) fn close_repl(&mut self) -> Result<(), JSError> {
        let scope = self.repl_scope.clone();
        let outcome = dispose_resources(self, &scope, Ok(()));
        self.report_unhandled_rejections();
        outcome.map_err(JSError::from)
    }
}
