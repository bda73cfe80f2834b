//! Inspector protocol surface: pausing on exceptions and breakpoints,
//! evaluation on paused frames and REPL-mode evaluation.

mod channel;
mod debugger;
mod protocol;
mod remote_object;
mod runtime;
mod scripts;
mod session;

pub use channel::{ChannelFrontend, FrontendHandle, channel_frontend};
pub use debugger::{Breakpoint, CallFrame, PauseOnExceptionsMode, PauseReason, ScopeDescriptor};
pub(crate) use debugger::DebuggerState;
pub use protocol::dispatch;
pub use remote_object::{EvaluateResult, ExceptionDetails, RemoteObject};
pub use runtime::EvaluateOptions;
pub use scripts::{Script, ScriptRegistry};
pub use session::Session;

use crate::JSError;
use crate::core::Interpreter;
use serde::{Deserialize, Serialize};

/// A protocol event sent to the frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub method: String,
    pub params: serde_json::Value,
}

/// Runs while execution is paused. Returning resumes execution.
pub trait PauseHandler {
    fn on_paused(&mut self, ctx: &mut PausedContext<'_>);
}

impl<F> PauseHandler for F
where
    F: FnMut(&mut PausedContext<'_>),
{
    fn on_paused(&mut self, ctx: &mut PausedContext<'_>) {
        self(ctx)
    }
}

/// What a pause handler may do while the script is stopped.
pub struct PausedContext<'a> {
    interp: &'a mut Interpreter,
}

impl<'a> PausedContext<'a> {
    pub(crate) fn new(interp: &'a mut Interpreter) -> Self {
        PausedContext { interp }
    }

    pub fn is_paused(&self) -> bool {
        self.interp.debugger.is_paused()
    }

    pub fn call_frames(&self) -> Vec<CallFrame> {
        self.interp.paused_call_frames()
    }

    pub fn reason(&self) -> Option<PauseReason> {
        self.interp.pause_reason()
    }

    pub fn evaluate_on_call_frame(&mut self, call_frame_id: &str, expression: &str) -> Result<EvaluateResult, JSError> {
        self.interp.evaluate_on_call_frame(call_frame_id, expression, false)
    }

    pub fn evaluate(&mut self, expression: &str, options: EvaluateOptions) -> Result<EvaluateResult, JSError> {
        self.interp.evaluate(expression, options)
    }

    pub fn set_pause_on_exceptions(&mut self, mode: PauseOnExceptionsMode) -> Result<(), JSError> {
        self.interp.set_pause_on_exceptions(mode)
    }

    /// Handles a raw protocol message as the frontend would send it.
    pub fn dispatch(&mut self, message: &serde_json::Value) -> serde_json::Value {
        dispatch(self.interp, message)
    }

    pub fn resume(&mut self) -> Result<(), JSError> {
        self.interp.resume_paused()
    }
}
