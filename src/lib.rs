pub mod config;
pub(crate) mod core;
pub(crate) mod error;
pub mod ic;
pub mod inspector;
pub(crate) mod js_array;
pub(crate) mod js_console;
pub(crate) mod js_disposable;
pub(crate) mod js_function;
pub(crate) mod js_promise;
pub(crate) mod repl;

pub use config::EngineConfig;
pub use core::{
    Interpreter, JSObjectData, ParseGoal, PropertyKey, ScriptId, SourceLocation, Value, format_js_number, is_error, promise_state, tokenize,
    type_of, value_to_string,
};
pub use error::JSError;
pub use ic::{ElementKind, FeedbackState};
pub use inspector::{
    CallFrame, EvaluateOptions, EvaluateResult, FrontendHandle, Notification, PauseHandler, PauseOnExceptionsMode, PauseReason,
    PausedContext, RemoteObject, Session, channel_frontend,
};
pub use js_console::format_console_value;
pub use js_promise::PromiseState;
pub use repl::Repl;

/// Runs `script` as a classic script in a fresh session and returns its
/// completion value. An uncaught exception becomes [`JSError::Throw`].
pub fn evaluate_script<T, P>(script: T, script_path: Option<P>) -> Result<Value, JSError>
where
    T: AsRef<str>,
    P: AsRef<std::path::Path>,
{
    let url = script_path.map(|p| p.as_ref().display().to_string()).unwrap_or_default();
    let mut session = Session::new();
    let value = session.run_script(script.as_ref(), &url)?;
    session.close()?;
    Ok(value)
}
