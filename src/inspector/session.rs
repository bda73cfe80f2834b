use crate::JSError;
use crate::config::EngineConfig;
use crate::core::{Interpreter, ScriptId, Value, env_get};
use crate::inspector::{Breakpoint, EvaluateOptions, EvaluateResult, Notification, PauseHandler, PauseOnExceptionsMode, dispatch};
use crossbeam_channel::Receiver;
use std::path::Path;

/// One engine instance plus its debugger and runtime agents.
///
/// The session owns all engine state; nothing in it is shared with other
/// sessions. Dropping it disposes the REPL scope's resources.
pub struct Session {
    interp: Interpreter,
    notifications: Receiver<Notification>,
    closed: bool,
}

impl Default for Session {
    fn default() -> Self {
        Session::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Session::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let (notifier, notifications) = crossbeam_channel::unbounded();
        let interp = Interpreter::new(config, notifier);
        Session {
            interp,
            notifications,
            closed: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.interp.config()
    }

    /// A receiver for protocol notifications. Clones share one queue.
    pub fn notifications(&self) -> Receiver<Notification> {
        self.notifications.clone()
    }

    /// Notifications queued so far.
    pub fn drain_notifications(&self) -> Vec<Notification> {
        self.notifications.try_iter().collect()
    }

    /// Installs the callback run on every pause. Without one, pauses resume
    /// immediately.
    pub fn set_pause_handler(&mut self, handler: impl PauseHandler + 'static) {
        self.interp.debugger.handler = Some(Box::new(handler));
    }

    pub fn clear_pause_handler(&mut self) {
        self.interp.debugger.handler = None;
    }

    pub fn debugger_enable(&mut self) {
        self.interp.debugger_enable();
    }

    pub fn debugger_disable(&mut self) {
        self.interp.debugger_disable();
    }

    pub fn runtime_enable(&mut self) {
        self.interp.runtime_enabled = true;
    }

    pub fn set_pause_on_exceptions(&mut self, mode: PauseOnExceptionsMode) -> Result<(), JSError> {
        self.interp.set_pause_on_exceptions(mode)
    }

    pub fn is_paused(&self) -> bool {
        self.interp.debugger.is_paused()
    }

    pub fn resume(&mut self) -> Result<(), JSError> {
        self.interp.resume_paused()
    }

    pub fn evaluate(&mut self, expression: &str, options: EvaluateOptions) -> Result<EvaluateResult, JSError> {
        self.interp.evaluate(expression, options)
    }

    /// Evaluation on a frame of the current pause. Only meaningful from a
    /// pause handler; otherwise every id is stale.
    pub fn evaluate_on_call_frame(&mut self, call_frame_id: &str, expression: &str) -> Result<EvaluateResult, JSError> {
        self.interp.evaluate_on_call_frame(call_frame_id, expression, false)
    }

    pub fn add_script(&mut self, source: &str, url: &str) -> Result<ScriptId, JSError> {
        self.interp.run_script(source, url).map(|(id, _)| id)
    }

    /// Like [`Session::add_script`], returning the script's completion value.
    pub fn run_script(&mut self, source: &str, url: &str) -> Result<Value, JSError> {
        self.interp.run_script(source, url).map(|(_, value)| value)
    }

    /// Reads `path` and runs it as a classic script whose url is the path.
    pub fn run_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Value, JSError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)?;
        self.run_script(&source, &path.display().to_string())
    }

    pub fn compile_function(
        &mut self,
        source: &str,
        url: &str,
        line_offset: usize,
        column_offset: usize,
        params: &[&str],
    ) -> Result<Value, JSError> {
        let params: Vec<String> = params.iter().map(|p| p.to_string()).collect();
        self.interp.compile_function(source, url, line_offset, column_offset, &params)
    }

    /// Calls `func` with `undefined` as `this`.
    pub fn call_function(&mut self, func: &Value, args: Vec<Value>) -> Result<Value, JSError> {
        let result = self.interp.invoke(func, Value::Undefined, args);
        self.interp.report_unhandled_rejections();
        result.map_err(JSError::from)
    }

    pub fn set_breakpoint_by_url(&mut self, url: &str, line_number: usize, column_number: usize) -> Result<Breakpoint, JSError> {
        self.interp.set_breakpoint_by_url(url, line_number, column_number)
    }

    pub fn remove_breakpoint(&mut self, breakpoint_id: &str) -> Result<(), JSError> {
        self.interp.remove_breakpoint(breakpoint_id)
    }

    /// Value of a global (or REPL-scope) binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.interp.global_value(name)
    }

    /// Feedback of the function bound to global `function_name`, one
    /// `(operation, state)` pair per slot. `None` when the name is not a
    /// function or its feedback vector was never allocated.
    pub fn feedback(&self, function_name: &str) -> Option<Vec<(String, String)>> {
        let Some(Value::Function(f)) = env_get(&self.interp.repl_scope, function_name) else {
            return None;
        };
        f.template()?.feedback_description()
    }

    pub fn dispatch(&mut self, message: &serde_json::Value) -> serde_json::Value {
        dispatch(&mut self.interp, message)
    }

    /// Disposes REPL-mode `using` resources. Called by `Drop` if not called
    /// explicitly.
    pub fn close(&mut self) -> Result<(), JSError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.interp.close_repl()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("disposal at session teardown failed: {}", e);
        }
    }
}
