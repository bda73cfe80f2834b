/// Explicit resource management: `using` and `await using` declarations.
use crate::core::{EvalError, Interpreter, PropertyKey, ScopePtr, Value, WellKnownSymbol, object_get_key_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisposalHint {
    Sync,
    Async,
}

/// A resource registered on a scope, disposed when the scope exits.
#[derive(Debug, Clone)]
pub struct DisposableResource {
    pub value: Value,
    /// `None` for a nullish `await using` value: nothing to call, but the
    /// scope still awaits at exit.
    pub method: Option<Value>,
    pub hint: DisposalHint,
}

/// Records `value` on `scope`, looking up its dispose method now.
pub(crate) fn add_disposable_resource(interp: &mut Interpreter, scope: &ScopePtr, value: Value, hint: DisposalHint) -> Result<(), EvalError> {
    let method = if value.is_nullish() {
        if hint == DisposalHint::Sync {
            return Ok(());
        }
        None
    } else {
        Some(match hint {
            DisposalHint::Sync => get_symbol_dispose_method(interp, &value)?,
            DisposalHint::Async => get_symbol_async_dispose_or_dispose_method(interp, &value)?,
        })
    };
    scope.borrow_mut().disposables.push(DisposableResource { value, method, hint });
    Ok(())
}

fn lookup_symbol_on_value(value: &Value, symbol: WellKnownSymbol) -> Value {
    match value {
        Value::Object(obj) => object_get_key_value(obj, &PropertyKey::Symbol(symbol)).unwrap_or(Value::Undefined),
        _ => Value::Undefined,
    }
}

fn get_symbol_dispose_method(interp: &mut Interpreter, value: &Value) -> Result<Value, EvalError> {
    if !matches!(value, Value::Object(_) | Value::Function(_)) {
        return Err(interp.throw_error("TypeError", "Using declarations can only be used with objects, null or undefined"));
    }
    let method = lookup_symbol_on_value(value, WellKnownSymbol::Dispose);
    if method.is_nullish() {
        return Err(interp.throw_error("TypeError", "The value does not have a callable [Symbol.dispose]() method"));
    }
    if !method.is_callable() {
        return Err(interp.throw_error("TypeError", "The [Symbol.dispose] property is not a function"));
    }
    Ok(method)
}

fn get_symbol_async_dispose_or_dispose_method(interp: &mut Interpreter, value: &Value) -> Result<Value, EvalError> {
    let method = lookup_symbol_on_value(value, WellKnownSymbol::AsyncDispose);
    if method.is_callable() {
        return Ok(method);
    }
    if !method.is_nullish() {
        return Err(interp.throw_error("TypeError", "The [Symbol.asyncDispose] property is not a function"));
    }
    get_symbol_dispose_method(interp, value)
}

/// Disposes every resource recorded on `scope` in reverse order and folds
/// the outcome into `completion`.
///
/// A disposer that throws replaces the pending exception with a
/// `SuppressedError` whose `error` is the new exception and whose
/// `suppressed` is the previous one. Each disposer finishes (and for async
/// resources, is awaited) before the next one starts.
pub(crate) fn dispose_resources<T>(interp: &mut Interpreter, scope: &ScopePtr, completion: Result<T, EvalError>) -> Result<T, EvalError> {
    let resources = std::mem::take(&mut scope.borrow_mut().disposables);
    if resources.is_empty() {
        return completion;
    }
    log::debug!("disposing {} resource(s)", resources.len());

    let mut outcome = match completion {
        Ok(v) => Ok(v),
        Err(EvalError::Throw(v)) => Err(v),
        Err(other) => {
            // Engine failure: release the resources, keep the error.
            for resource in resources.into_iter().rev() {
                if let Err(e) = dispose_one(interp, resource) {
                    log::warn!("disposal failed while unwinding: {}", e.message());
                }
            }
            return Err(other);
        }
    };

    for resource in resources.into_iter().rev() {
        match dispose_one(interp, resource) {
            Ok(()) => {}
            Err(EvalError::Throw(new_err)) => {
                outcome = Err(match outcome {
                    Err(prev) => interp.create_suppressed_error(new_err, prev),
                    Ok(_) => new_err,
                });
            }
            Err(other) => return Err(other),
        }
    }
    outcome.map_err(EvalError::Throw)
}

fn dispose_one(interp: &mut Interpreter, resource: DisposableResource) -> Result<(), EvalError> {
    let Some(method) = resource.method else {
        return Ok(());
    };
    let awaited = resource.hint == DisposalHint::Async;
    let result = interp.call_function(&method, resource.value, Vec::new(), awaited)?;
    if awaited {
        interp.await_value(result)?;
    }
    Ok(())
}
