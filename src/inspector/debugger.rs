//! Pause policy, call frame snapshots and breakpoints.

use crate::JSError;
use crate::core::{EvalError, HandlerMarker, Interpreter, ParseGoal, ScopeKind, ScopePtr, SourceLocation, Value, new_scope, scope_chain_kinds};
use crate::inspector::{EvaluateResult, PauseHandler, PausedContext, RemoteObject};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PauseOnExceptionsMode {
    #[default]
    None,
    Caught,
    Uncaught,
    All,
}

impl PauseOnExceptionsMode {
    /// Whether an exception predicted as `caught` pauses in this mode.
    pub fn should_pause(self, caught: bool) -> bool {
        match self {
            PauseOnExceptionsMode::None => false,
            PauseOnExceptionsMode::Caught => caught,
            PauseOnExceptionsMode::Uncaught => !caught,
            PauseOnExceptionsMode::All => true,
        }
    }
}

impl FromStr for PauseOnExceptionsMode {
    type Err = JSError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(PauseOnExceptionsMode::None),
            "caught" => Ok(PauseOnExceptionsMode::Caught),
            "uncaught" => Ok(PauseOnExceptionsMode::Uncaught),
            "all" => Ok(PauseOnExceptionsMode::All),
            other => Err(crate::raise_invalid_params!(format!("unknown pause on exceptions mode '{other}'"))),
        }
    }
}

impl fmt::Display for PauseOnExceptionsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PauseOnExceptionsMode::None => "none",
            PauseOnExceptionsMode::Caught => "caught",
            PauseOnExceptionsMode::Uncaught => "uncaught",
            PauseOnExceptionsMode::All => "all",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone)]
pub enum PauseReason {
    Exception { value: Value, uncaught: bool },
    /// Breakpoint or `debugger;` statement.
    Other,
}

impl PauseReason {
    pub fn protocol_name(&self) -> &'static str {
        match self {
            PauseReason::Exception { .. } => "exception",
            PauseReason::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
}

/// Protocol view of a paused call frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallFrame {
    pub call_frame_id: String,
    pub function_name: String,
    pub function_location: SourceLocation,
    pub location: SourceLocation,
    pub url: String,
    pub scope_chain: Vec<ScopeDescriptor>,
    pub this: RemoteObject,
}

/// A call frame plus what evaluation on it needs. Lives as long as the pause.
pub(crate) struct PausedFrame {
    pub call_frame: CallFrame,
    pub scope: ScopePtr,
    pub this_value: Value,
}

pub(crate) enum PauseState {
    Running,
    Paused {
        epoch: u64,
        reason: PauseReason,
        frames: Vec<PausedFrame>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub breakpoint_id: String,
    pub url: String,
    pub line_number: usize,
    pub column_number: usize,
    pub locations: Vec<SourceLocation>,
}

pub(crate) struct DebuggerState {
    pub enabled: bool,
    pub mode: PauseOnExceptionsMode,
    pub pause: PauseState,
    pub epoch: u64,
    /// Open silent evaluations; exceptions inside them never pause.
    pub silent_depth: usize,
    pub handler: Option<Box<dyn PauseHandler>>,
    pub breakpoints: IndexMap<String, Breakpoint>,
    exception_ids: u64,
}

impl Default for DebuggerState {
    fn default() -> Self {
        DebuggerState {
            enabled: false,
            mode: PauseOnExceptionsMode::None,
            pause: PauseState::Running,
            epoch: 0,
            silent_depth: 0,
            handler: None,
            breakpoints: IndexMap::new(),
            exception_ids: 0,
        }
    }
}

impl DebuggerState {
    pub fn is_paused(&self) -> bool {
        matches!(self.pause, PauseState::Paused { .. })
    }

    pub fn next_exception_id(&mut self) -> u64 {
        self.exception_ids += 1;
        self.exception_ids
    }

    fn may_pause(&self) -> bool {
        self.enabled && self.silent_depth == 0 && !self.is_paused()
    }
}

impl Interpreter {
    pub(crate) fn debugger_enable(&mut self) {
        if self.debugger.enabled {
            return;
        }
        self.debugger.enabled = true;
        log::debug!("debugger enabled");
        let ids: Vec<_> = self.scripts.iter().map(|s| s.id).collect();
        for id in ids {
            self.announce_script(id);
        }
    }

    pub(crate) fn debugger_disable(&mut self) {
        if self.debugger.is_paused() {
            self.finish_pause();
        }
        self.debugger.enabled = false;
        self.debugger.mode = PauseOnExceptionsMode::None;
        self.debugger.breakpoints.clear();
        log::debug!("debugger disabled");
    }

    pub(crate) fn set_pause_on_exceptions(&mut self, mode: PauseOnExceptionsMode) -> Result<(), JSError> {
        if !self.debugger.enabled {
            return Err(JSError::DebuggerNotEnabled);
        }
        log::debug!("pause on exceptions: {}", mode);
        self.debugger.mode = mode;
        Ok(())
    }

    /// Scans the handler stack from the innermost marker outwards.
    pub(crate) fn predict_caught(&self) -> bool {
        for marker in self.handlers.iter().rev() {
            match marker {
                HandlerMarker::Catch => return true,
                HandlerMarker::AsyncBoundary { awaited: true } => continue,
                HandlerMarker::AsyncBoundary { awaited: false } | HandlerMarker::Barrier => return false,
            }
        }
        false
    }

    /// Called at every throw point before unwinding starts.
    pub(crate) fn report_exception(&mut self, value: &Value) {
        if !self.debugger.may_pause() {
            return;
        }
        let caught = self.predict_caught();
        let pause = self.debugger.mode.should_pause(caught);
        log::debug!(
            "exception {:?} predicted {}, mode {}: {}",
            value,
            if caught { "caught" } else { "uncaught" },
            self.debugger.mode,
            if pause { "pausing" } else { "not pausing" }
        );
        if pause {
            self.pause(
                PauseReason::Exception {
                    value: value.clone(),
                    uncaught: !caught,
                },
                Vec::new(),
            );
        }
    }

    /// Pauses if the statement about to run carries a breakpoint.
    pub(crate) fn check_breakpoint(&mut self) {
        if !self.debugger.may_pause() || self.debugger.breakpoints.is_empty() {
            return;
        }
        let Some(location) = self.current_location() else {
            return;
        };
        let hits: Vec<String> = self
            .debugger
            .breakpoints
            .values()
            .filter(|bp| bp.locations.contains(&location))
            .map(|bp| bp.breakpoint_id.clone())
            .collect();
        if !hits.is_empty() {
            self.pause(PauseReason::Other, hits);
        }
    }

    pub(crate) fn debugger_statement(&mut self) {
        if self.debugger.may_pause() {
            self.pause(PauseReason::Other, Vec::new());
        }
    }

    fn snapshot_frames(&self, epoch: u64) -> Vec<PausedFrame> {
        self.call_stack
            .iter()
            .rev()
            .enumerate()
            .map(|(index, frame)| PausedFrame {
                call_frame: CallFrame {
                    call_frame_id: format!("{epoch}:{index}"),
                    function_name: frame.function_name.clone(),
                    function_location: frame.function_location,
                    location: frame.location,
                    url: self.scripts.url_of(frame.location.script_id).unwrap_or_default(),
                    scope_chain: scope_chain_kinds(&frame.scope)
                        .into_iter()
                        .map(|kind| ScopeDescriptor {
                            kind: kind.protocol_name().to_string(),
                        })
                        .collect(),
                    this: RemoteObject::from_value(&frame.this_value),
                },
                scope: frame.scope.clone(),
                this_value: frame.this_value.clone(),
            })
            .collect()
    }

    /// Stops execution: announces the pause, runs the pause handler's nested
    /// loop and resumes once it returns.
    pub(crate) fn pause(&mut self, reason: PauseReason, hit_breakpoints: Vec<String>) {
        self.debugger.epoch += 1;
        let epoch = self.debugger.epoch;
        let frames = self.snapshot_frames(epoch);
        let call_frames: Vec<&CallFrame> = frames.iter().map(|f| &f.call_frame).collect();
        let mut params = json!({
            "callFrames": call_frames,
            "reason": reason.protocol_name(),
            "hitBreakpoints": hit_breakpoints,
        });
        if let PauseReason::Exception { value, uncaught } = &reason {
            let mut data = serde_json::to_value(RemoteObject::from_value(value)).unwrap_or_default();
            data["uncaught"] = json!(uncaught);
            params["data"] = data;
        }
        log::debug!("paused (epoch {}, reason {}, {} frames)", epoch, reason.protocol_name(), frames.len());
        self.debugger.pause = PauseState::Paused { epoch, reason, frames };
        self.notify("Debugger.paused", params);

        let exception_location = self.last_exception_location;
        if let Some(mut handler) = self.debugger.handler.take() {
            handler.on_paused(&mut PausedContext::new(self));
            if self.debugger.handler.is_none() {
                self.debugger.handler = Some(handler);
            }
        }
        self.last_exception_location = exception_location;
        if self.debugger.is_paused() {
            self.finish_pause();
        }
    }

    pub(crate) fn finish_pause(&mut self) {
        self.debugger.pause = PauseState::Running;
        log::debug!("resumed");
        self.notify("Debugger.resumed", json!({}));
    }

    pub(crate) fn resume_paused(&mut self) -> Result<(), JSError> {
        if !self.debugger.is_paused() {
            return Err(JSError::NotPaused);
        }
        self.finish_pause();
        Ok(())
    }

    pub(crate) fn paused_call_frames(&self) -> Vec<CallFrame> {
        match &self.debugger.pause {
            PauseState::Paused { frames, .. } => frames.iter().map(|f| f.call_frame.clone()).collect(),
            PauseState::Running => Vec::new(),
        }
    }

    pub(crate) fn pause_reason(&self) -> Option<PauseReason> {
        match &self.debugger.pause {
            PauseState::Paused { reason, .. } => Some(reason.clone()),
            PauseState::Running => None,
        }
    }

    /// Evaluates `expression` in a fresh scope nested in the paused frame
    /// `call_frame_id`. Resources declared at its top level are disposed
    /// (and awaited) before this returns.
    pub(crate) fn evaluate_on_call_frame(&mut self, call_frame_id: &str, expression: &str, silent: bool) -> Result<EvaluateResult, JSError> {
        let frame = match &self.debugger.pause {
            PauseState::Paused { frames, .. } => frames
                .iter()
                .find(|f| f.call_frame.call_frame_id == call_frame_id)
                .map(|f| (f.scope.clone(), f.this_value.clone())),
            PauseState::Running => None,
        };
        let Some((frame_scope, this_value)) = frame else {
            return Err(JSError::InvalidFrame {
                call_frame_id: call_frame_id.to_string(),
            });
        };

        let script_id = self.scripts.next_id();
        let mut options = crate::core::CompileOptions::new(script_id, ParseGoal::DebugEvaluate);
        options.allow_natives_syntax = self.config.allow_natives_syntax;
        let template = match crate::core::parse_program(expression, &options) {
            Ok(template) => template,
            Err(e) => return Ok(self.syntax_error_result(&e, script_id)),
        };

        let scope = new_scope(ScopeKind::Eval, Some(&frame_scope));
        scope.borrow_mut().this_value = Some(this_value);
        self.run_evaluation(silent, |interp| interp.run_program(&template, &scope, true))
    }

    /// Runs `f` with exception pauses suppressed when `silent`.
    pub(crate) fn run_evaluation(
        &mut self,
        silent: bool,
        f: impl FnOnce(&mut Interpreter) -> Result<Option<Value>, EvalError>,
    ) -> Result<EvaluateResult, JSError> {
        if silent {
            self.debugger.silent_depth += 1;
        }
        let outcome = f(self);
        if silent {
            self.debugger.silent_depth -= 1;
        }
        EvaluateResult::from_outcome(self, outcome)
    }

    pub(crate) fn set_breakpoint_by_url(&mut self, url: &str, line_number: usize, column_number: usize) -> Result<Breakpoint, JSError> {
        if !self.debugger.enabled {
            return Err(JSError::DebuggerNotEnabled);
        }
        let breakpoint_id = format!("1:{line_number}:{column_number}:{url}");
        if self.debugger.breakpoints.contains_key(&breakpoint_id) {
            return Err(JSError::BreakpointExists);
        }
        let locations = self
            .scripts
            .by_url(url)
            .filter_map(|script| first_location_at_or_after(&script.locations, line_number, column_number).map(|l| (script.id, l)))
            .map(|(script_id, (line, column))| SourceLocation {
                script_id,
                line_number: line,
                column_number: column,
            })
            .collect();
        let breakpoint = Breakpoint {
            breakpoint_id: breakpoint_id.clone(),
            url: url.to_string(),
            line_number,
            column_number,
            locations,
        };
        log::debug!("breakpoint {} resolved to {} location(s)", breakpoint_id, breakpoint.locations.len());
        self.debugger.breakpoints.insert(breakpoint_id, breakpoint.clone());
        Ok(breakpoint)
    }

    pub(crate) fn remove_breakpoint(&mut self, breakpoint_id: &str) -> Result<(), JSError> {
        match self.debugger.breakpoints.shift_remove(breakpoint_id) {
            Some(_) => Ok(()),
            None => Err(JSError::UnknownBreakpoint {
                id: breakpoint_id.to_string(),
            }),
        }
    }

    /// Adds locations in a newly compiled script to matching breakpoints.
    pub(crate) fn resolve_pending_breakpoints(&mut self, script_id: crate::core::ScriptId) {
        let Some(script) = self.scripts.get(script_id) else {
            return;
        };
        let mut resolved = Vec::new();
        for bp in self.debugger.breakpoints.values_mut().filter(|bp| bp.url == script.url) {
            if let Some((line, column)) = first_location_at_or_after(&script.locations, bp.line_number, bp.column_number) {
                let location = SourceLocation {
                    script_id,
                    line_number: line,
                    column_number: column,
                };
                bp.locations.push(location);
                resolved.push((bp.breakpoint_id.clone(), location));
            }
        }
        for (breakpoint_id, location) in resolved {
            log::debug!("breakpoint {} resolved in script {}", breakpoint_id, script_id);
            self.notify("Debugger.breakpointResolved", json!({ "breakpointId": breakpoint_id, "location": location }));
        }
    }

    /// Live frames as protocol stack trace entries.
    pub(crate) fn stack_trace_json(&self) -> serde_json::Value {
        let frames: Vec<serde_json::Value> = self
            .call_stack
            .iter()
            .rev()
            .map(|frame| {
                json!({
                    "functionName": frame.function_name,
                    "scriptId": frame.location.script_id,
                    "url": self.scripts.url_of(frame.location.script_id).unwrap_or_default(),
                    "lineNumber": frame.location.line_number,
                    "columnNumber": frame.location.column_number,
                })
            })
            .collect();
        json!(frames)
    }
}

fn first_location_at_or_after(locations: &[(usize, usize)], line: usize, column: usize) -> Option<(usize, usize)> {
    locations.iter().copied().find(|&loc| loc >= (line, column))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_matrix() {
        use PauseOnExceptionsMode::*;
        for caught in [true, false] {
            assert!(!None.should_pause(caught));
            assert!(All.should_pause(caught));
        }
        assert!(Caught.should_pause(true));
        assert!(!Caught.should_pause(false));
        assert!(Uncaught.should_pause(false));
        assert!(!Uncaught.should_pause(true));
    }

    #[test]
    fn parses_protocol_names() {
        assert_eq!("uncaught".parse::<PauseOnExceptionsMode>().unwrap(), PauseOnExceptionsMode::Uncaught);
        assert!("sometimes".parse::<PauseOnExceptionsMode>().is_err());
    }

    #[test]
    fn resolves_to_next_breakable_location() {
        let locations = [(1, 0), (3, 2), (5, 0)];
        assert_eq!(first_location_at_or_after(&locations, 2, 0), Some((3, 2)));
        assert_eq!(first_location_at_or_after(&locations, 3, 2), Some((3, 2)));
        assert_eq!(first_location_at_or_after(&locations, 6, 0), None);
    }
}
