//! Settled promises.
//!
//! Async functions run to completion when called, so a promise is created
//! already fulfilled or rejected. `await` unwraps the settled state directly;
//! there is no job queue. Rejections nobody observes are remembered and
//! reported once the top-level run that produced them finishes.

use crate::core::{EvalError, Interpreter, Value};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum PromiseState {
    Fulfilled(Value),
    Rejected(Value),
}

#[derive(Debug)]
pub struct JSPromise {
    pub state: PromiseState,
    /// Something awaited or otherwise consumed the rejection.
    pub handled: bool,
}

pub type JSPromisePtr = Rc<RefCell<JSPromise>>;

impl Interpreter {
    /// `Promise.resolve(value)`: promises pass through unchanged.
    pub(crate) fn promise_resolved(&mut self, value: Value) -> Value {
        if let Value::Promise(_) = value {
            return value;
        }
        Value::Promise(Rc::new(RefCell::new(JSPromise {
            state: PromiseState::Fulfilled(value),
            handled: true,
        })))
    }

    /// A rejected promise. Unless `handled`, it counts as an unhandled
    /// rejection until something awaits it.
    pub(crate) fn promise_rejected(&mut self, reason: Value, handled: bool) -> Value {
        let promise = Rc::new(RefCell::new(JSPromise {
            state: PromiseState::Rejected(reason),
            handled,
        }));
        if !handled {
            self.pending_rejections.push(promise.clone());
        }
        Value::Promise(promise)
    }

    /// Unwraps `value` for `await`. A rejected promise rethrows its reason
    /// without reporting it to the debugger a second time.
    pub(crate) fn await_value(&mut self, value: Value) -> Result<Value, EvalError> {
        let Value::Promise(promise) = value else {
            return Ok(value);
        };
        let mut p = promise.borrow_mut();
        p.handled = true;
        match &p.state {
            PromiseState::Fulfilled(v) => Ok(v.clone()),
            PromiseState::Rejected(reason) => {
                log::trace!("await rethrows rejection: {:?}", reason);
                Err(EvalError::Throw(reason.clone()))
            }
        }
    }

    /// Reasons of rejected promises that nothing handled since the last call.
    pub(crate) fn take_unhandled_rejections(&mut self) -> Vec<Value> {
        std::mem::take(&mut self.pending_rejections)
            .into_iter()
            .filter_map(|p| {
                let p = p.borrow();
                match (&p.state, p.handled) {
                    (PromiseState::Rejected(reason), false) => Some(reason.clone()),
                    _ => None,
                }
            })
            .collect()
    }
}
