#[derive(thiserror::Error, Debug)]
pub enum JSError {
    #[error("Tokenization failed at {line}:{column}: {message}")]
    TokenizationError { message: String, line: usize, column: usize },

    #[error("SyntaxError: {message} ({line}:{column})")]
    ParseError { message: String, line: usize, column: usize },

    #[error("Could not find call frame with given id: {call_frame_id}")]
    InvalidFrame { call_frame_id: String },

    #[error("Can only perform operation while paused.")]
    NotPaused,

    #[error("Debugger agent is not enabled")]
    DebuggerNotEnabled,

    #[error("Breakpoint at specified location already exists.")]
    BreakpointExists,

    #[error("Breakpoint '{id}' not found")]
    UnknownBreakpoint { id: String },

    #[error("'{method}' wasn't found")]
    UnknownMethod { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Uncaught {}", crate::core::value_to_string(.value))]
    Throw { value: crate::core::Value },

    #[error("std::io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl JSError {
    /// Input that ran out before a string literal or block comment was closed.
    pub fn is_unterminated(&self) -> bool {
        matches!(self, JSError::TokenizationError { message, .. } if message.starts_with("Unterminated"))
    }

    /// Protocol error code used when the error answers a dispatched command.
    pub fn protocol_code(&self) -> i64 {
        match self {
            JSError::UnknownMethod { .. } => -32601,
            JSError::InvalidParams { .. } => -32602,
            _ => -32000,
        }
    }
}

impl From<JSError> for std::io::Error {
    fn from(err: JSError) -> std::io::Error {
        match err {
            JSError::IoError(io_err) => io_err,
            _ => std::io::Error::other(err.to_string()),
        }
    }
}

#[macro_export]
macro_rules! raise_tokenize_error {
    ($msg:expr, $line:expr, $column:expr) => {
        $crate::JSError::TokenizationError {
            message: $msg.to_string(),
            line: $line,
            column: $column,
        }
    };
}

#[macro_export]
macro_rules! raise_parse_error {
    ($msg:expr, $line:expr, $column:expr) => {
        $crate::JSError::ParseError {
            message: $msg.to_string(),
            line: $line,
            column: $column,
        }
    };
}

// Builds a ParseError positioned at the given token.
#[macro_export]
macro_rules! raise_parse_error_with_token {
    ($msg:expr, $token:expr) => {
        $crate::raise_parse_error!($msg, $token.line, $token.column)
    };
}

#[macro_export]
macro_rules! raise_invalid_params {
    ($msg:expr) => {
        $crate::JSError::InvalidParams { message: $msg.to_string() }
    };
}
