use crate::{
    JSError,
    config::EngineConfig,
    core::{Token, tokenize},
    inspector::{EvaluateOptions, EvaluateResult, PauseHandler, PauseOnExceptionsMode, Session},
};

/// A persistent REPL on top of a [`Session`].
///
/// Every input is a REPL-mode evaluation: bindings persist, top-level
/// `await` and `using` are allowed, and `let`/`const` may be redeclared.
/// Resources bound with `using` live until the REPL is closed.
pub struct Repl {
    session: Session,
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

impl Repl {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Repl {
            session: Session::with_config(config),
        }
    }

    /// Enables the debugger with `mode` and routes pauses to `handler`.
    pub fn with_debugger(mut self, mode: PauseOnExceptionsMode, handler: impl PauseHandler + 'static) -> Result<Self, JSError> {
        self.session.debugger_enable();
        self.session.set_pause_on_exceptions(mode)?;
        self.session.set_pause_handler(handler);
        Ok(self)
    }

    pub fn session(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn eval<T: AsRef<str>>(&mut self, script: T) -> Result<EvaluateResult, JSError> {
        self.session.evaluate(script.as_ref(), EvaluateOptions::repl())
    }

    /// Disposes resources declared with `using` during the session.
    pub fn close(&mut self) -> Result<(), JSError> {
        self.session.close()
    }

    /// Whether `src` can be evaluated as is, or the user is still typing:
    /// an unterminated string or comment, or an unclosed bracket.
    pub fn is_complete_input(src: &str) -> bool {
        let tokens = match tokenize(src) {
            Ok(tokens) => tokens,
            Err(e) => return !e.is_unterminated(),
        };
        let mut depth: i64 = 0;
        for t in &tokens {
            match t.token {
                Token::LParen | Token::LBracket | Token::LBrace => depth += 1,
                Token::RParen | Token::RBracket | Token::RBrace => depth -= 1,
                _ => {}
            }
        }
        depth <= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_brackets_need_more_input() {
        assert!(!Repl::is_complete_input("function f() {"));
        assert!(!Repl::is_complete_input("let s = 'abc"));
        assert!(!Repl::is_complete_input("/* note"));
        assert!(Repl::is_complete_input("f(1, [2, 3])"));
        assert!(Repl::is_complete_input("}"));
    }
}
