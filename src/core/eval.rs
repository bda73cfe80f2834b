use crate::config::EngineConfig;
use crate::core::{
    AssignOutcome, BinaryOp, EvalError, Expr, MAX_STRING_LENGTH, PropertyKey, PropertyName, ScopeKind, ScopePtr, SourceLocation, Statement,
    StatementKind, UnaryOp, Value, WellKnownSymbol, array_index, array_join_floor, collect_var_names, env_declare, env_get, env_has_own,
    env_set, env_this, format_js_number, global_scope, loose_equals, new_js_object_data, new_js_object_with, new_scope,
    object_get_key_value, strict_equals, to_boolean, to_number, to_property_key, type_of, value_to_string, var_scope,
};
use crate::ic::{self, AllocationSite, ElementKind, ElementValue, FeedbackSlot, LayoutId, LayoutTable, Shape};
use crate::inspector::{DebuggerState, Notification, ScriptRegistry};
use crate::js_array::{array_length, construct_array, create_array, delete_element, load_element, store_element};
use crate::js_disposable::{DisposalHint, add_disposable_resource, dispose_resources};
use crate::js_function::{Closure, FunctionTemplate, JSFunction, call_intrinsic, call_native, new_native_function};
use crate::js_promise::JSPromisePtr;
use crossbeam_channel::Sender;
use std::rc::Rc;

/// Nesting limit for JavaScript calls.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Remaining native stack below which evaluation moves to a new segment.
pub(crate) const STACK_RED_ZONE: usize = 128 * 1024;
pub(crate) const STACK_GROW_SIZE: usize = 4 * 1024 * 1024;

/// Outcome of running a statement list.
#[derive(Debug)]
pub(crate) enum Completion {
    Normal(Option<Value>),
    Return(Value),
    Break,
    Continue,
}

/// Marks on the handler stack, scanned from the top to predict whether a
/// thrown exception will be caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HandlerMarker {
    /// A `try` with a `catch` clause.
    Catch,
    /// An async function body. `awaited` when the call was the direct
    /// operand of `await`, so a rejection propagates into the caller.
    AsyncBoundary { awaited: bool },
    /// Entry from the host: nothing above it can catch.
    Barrier,
}

/// A JavaScript function activation.
pub(crate) struct ActiveFrame {
    pub function_name: String,
    pub function_location: SourceLocation,
    pub location: SourceLocation,
    /// Innermost scope at the current statement.
    pub scope: ScopePtr,
    pub this_value: Value,
    pub template: Rc<FunctionTemplate>,
}

pub struct Interpreter {
    pub(crate) config: EngineConfig,
    pub(crate) global: ScopePtr,
    /// Bindings shared by REPL-mode evaluations.
    pub(crate) repl_scope: ScopePtr,
    pub(crate) layouts: LayoutTable,
    pub(crate) call_stack: Vec<ActiveFrame>,
    pub(crate) handlers: Vec<HandlerMarker>,
    pub(crate) debugger: DebuggerState,
    pub(crate) scripts: ScriptRegistry,
    pub(crate) pending_rejections: Vec<JSPromisePtr>,
    pub(crate) runtime_enabled: bool,
    pub(crate) last_exception_location: Option<SourceLocation>,
    notifier: Sender<Notification>,
}

impl Interpreter {
    /// Protocol notifications go to `notifier`; the caller keeps the receiving end.
    pub fn new(config: EngineConfig, notifier: Sender<Notification>) -> Self {
        let global = new_scope(ScopeKind::Global, None);
        global.borrow_mut().this_value = Some(Value::Undefined);
        initialize_global_constructors(&global);
        let repl_scope = new_scope(ScopeKind::Repl, Some(&global));
        Interpreter {
            config,
            global,
            repl_scope,
            layouts: LayoutTable::new(),
            call_stack: Vec::new(),
            handlers: Vec::new(),
            debugger: DebuggerState::default(),
            scripts: ScriptRegistry::default(),
            pending_rejections: Vec::new(),
            runtime_enabled: false,
            last_exception_location: None,
            notifier,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn notify(&self, method: &str, params: serde_json::Value) {
        log::trace!("notification {}", method);
        let notification = Notification {
            method: method.to_string(),
            params,
        };
        if self.notifier.send(notification).is_err() {
            log::warn!("notification '{}' dropped: no receiver", method);
        }
    }

    pub(crate) fn global_value(&self, name: &str) -> Option<Value> {
        env_get(&self.repl_scope, name)
    }

    fn current_template(&self) -> Option<&Rc<FunctionTemplate>> {
        self.call_stack.last().map(|f| &f.template)
    }

    pub(crate) fn current_location(&self) -> Option<SourceLocation> {
        self.call_stack.last().map(|f| f.location)
    }

    fn is_strict(&self) -> bool {
        self.current_template().is_some_and(|t| t.is_strict)
    }

    /// Runs `f` on feedback slot `slot` of the executing function, or on
    /// `None` while that function has no feedback vector.
    pub(crate) fn with_feedback_slot<R>(&mut self, slot: usize, f: impl FnOnce(Option<&mut FeedbackSlot>) -> R) -> R {
        let Some(template) = self.current_template().cloned() else {
            return f(None);
        };
        let mut vector = template.feedback.borrow_mut();
        f(vector.as_mut().and_then(|v| v.slot_mut(slot)))
    }

    /// Swaps the innermost scope of the executing frame, returning the old one.
    fn enter_scope(&mut self, scope: &ScopePtr) -> Option<ScopePtr> {
        self.call_stack.last_mut().map(|f| std::mem::replace(&mut f.scope, scope.clone()))
    }

    fn leave_scope(&mut self, saved: Option<ScopePtr>) {
        if let (Some(frame), Some(scope)) = (self.call_stack.last_mut(), saved) {
            frame.scope = scope;
        }
    }

    // ---- entry points ----

    /// Runs top-level code of `template` in `scope`. With `dispose`, resources
    /// declared at the top level are disposed before returning.
    pub(crate) fn run_program(&mut self, template: &Rc<FunctionTemplate>, scope: &ScopePtr, dispose: bool) -> Result<Option<Value>, EvalError> {
        template.note_invocation(&self.config);
        hoist_var_declarations(&template.body, scope);
        let location = SourceLocation {
            script_id: template.script_id,
            line_number: template.line,
            column_number: template.column,
        };
        self.call_stack.push(ActiveFrame {
            function_name: String::new(),
            function_location: location,
            location,
            scope: scope.clone(),
            this_value: env_this(scope),
            template: template.clone(),
        });
        let depth = self.handlers.len();
        self.handlers.push(HandlerMarker::Barrier);
        let result = self.exec_scope_body(&template.body, scope, dispose);
        self.handlers.truncate(depth);
        self.call_stack.pop();
        match result? {
            Completion::Normal(value) => Ok(value),
            Completion::Return(value) => Ok(Some(value)),
            Completion::Break | Completion::Continue => Ok(None),
        }
    }

    /// Calls `func` from the host, outside any JavaScript frame.
    pub(crate) fn invoke(&mut self, func: &Value, this: Value, args: Vec<Value>) -> Result<Value, EvalError> {
        let depth = self.handlers.len();
        self.handlers.push(HandlerMarker::Barrier);
        let result = self.call_function(func, this, args, false);
        self.handlers.truncate(depth);
        result
    }

    // ---- calls ----

    /// Calls `func`. `awaited` marks a call that is the direct operand of
    /// `await`; it only matters for async functions.
    pub(crate) fn call_function(&mut self, func: &Value, this: Value, args: Vec<Value>, awaited: bool) -> Result<Value, EvalError> {
        match func {
            Value::Function(f) => match &**f {
                JSFunction::Native(name) => call_native(self, name, args, None),
                JSFunction::Closure(closure) => self.call_closure(closure, this, args, awaited),
            },
            other => {
                let message = format!("{} is not a function", value_to_string(other));
                Err(self.throw_error("TypeError", &message))
            }
        }
    }

    fn call_closure(&mut self, closure: &Closure, this: Value, args: Vec<Value>, awaited: bool) -> Result<Value, EvalError> {
        if self.call_stack.len() >= MAX_CALL_DEPTH {
            return Err(self.throw_error("RangeError", "Maximum call stack size exceeded"));
        }
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.enter_closure(closure, this, args, awaited))
    }

    fn enter_closure(&mut self, closure: &Closure, this: Value, args: Vec<Value>, awaited: bool) -> Result<Value, EvalError> {
        let template = closure.template.clone();
        template.note_invocation(&self.config);

        let scope = new_scope(ScopeKind::Function, Some(&closure.env));
        if !template.is_arrow {
            scope.borrow_mut().this_value = Some(this);
        }
        let mut args = args.into_iter();
        for param in &template.params {
            env_declare(&scope, param, args.next().unwrap_or(Value::Undefined), true);
        }
        hoist_var_declarations(&template.body, &scope);

        let location = SourceLocation {
            script_id: template.script_id,
            line_number: template.line,
            column_number: template.column,
        };
        self.call_stack.push(ActiveFrame {
            function_name: template.name.clone(),
            function_location: location,
            location,
            scope: scope.clone(),
            this_value: env_this(&scope),
            template: template.clone(),
        });
        let depth = self.handlers.len();
        if template.is_async {
            self.handlers.push(HandlerMarker::AsyncBoundary { awaited });
        }
        let result = self.exec_scope_body(&template.body, &scope, true);
        self.handlers.truncate(depth);
        self.call_stack.pop();

        let result = match result {
            Ok(Completion::Return(value)) => Ok(value),
            Ok(_) => Ok(Value::Undefined),
            Err(e) => Err(e),
        };
        if !template.is_async {
            return result;
        }
        match result {
            Ok(value) => Ok(self.promise_resolved(value)),
            Err(EvalError::Throw(reason)) => Ok(self.promise_rejected(reason, awaited)),
            Err(e) => Err(e),
        }
    }

    fn construct(&mut self, callee: &Value, args: Vec<Value>, site: &Rc<AllocationSite>) -> Result<Value, EvalError> {
        let Value::Function(f) = callee else {
            let message = format!("{} is not a constructor", value_to_string(callee));
            return Err(self.throw_error("TypeError", &message));
        };
        match &**f {
            JSFunction::Native("Array") => construct_array(self, args, Some(site)),
            JSFunction::Native(name) if name.ends_with("Error") => call_native(self, name, args, None),
            JSFunction::Closure(closure) if !closure.template.is_arrow && !closure.template.is_async => {
                let this = Value::Object(new_js_object_data());
                match self.call_closure(closure, this.clone(), args, false)? {
                    result @ (Value::Object(_) | Value::Function(_) | Value::Promise(_)) => Ok(result),
                    _ => Ok(this),
                }
            }
            _ => {
                let message = format!("{} is not a constructor", f.name());
                Err(self.throw_error("TypeError", &message))
            }
        }
    }

    // ---- statements ----

    /// Executes `stmts` as the body of `scope`, hoisting function
    /// declarations first. With `dispose`, the scope's resources are
    /// disposed on every exit path.
    pub(crate) fn exec_scope_body(&mut self, stmts: &[Statement], scope: &ScopePtr, dispose: bool) -> Result<Completion, EvalError> {
        hoist_function_declarations(stmts, scope);
        let result = self.exec_statements(stmts, scope);
        if dispose { dispose_resources(self, scope, result) } else { result }
    }

    fn exec_block(&mut self, stmts: &[Statement], parent: &ScopePtr, kind: ScopeKind) -> Result<Completion, EvalError> {
        let scope = new_scope(kind, Some(parent));
        self.exec_block_in(stmts, &scope)
    }

    fn exec_block_in(&mut self, stmts: &[Statement], scope: &ScopePtr) -> Result<Completion, EvalError> {
        let saved = self.enter_scope(scope);
        let result = self.exec_scope_body(stmts, scope, true);
        self.leave_scope(saved);
        result
    }

    pub(crate) fn exec_statements(&mut self, stmts: &[Statement], scope: &ScopePtr) -> Result<Completion, EvalError> {
        let mut last = None;
        for stmt in stmts {
            match self.exec_statement(stmt, scope)? {
                Completion::Normal(Some(value)) => last = Some(value),
                Completion::Normal(None) => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal(last))
    }

    fn exec_statement(&mut self, stmt: &Statement, scope: &ScopePtr) -> Result<Completion, EvalError> {
        if let Some(frame) = self.call_stack.last_mut() {
            frame.location = SourceLocation {
                script_id: frame.template.script_id,
                line_number: stmt.line,
                column_number: stmt.column,
            };
        }
        if stmt.is_breakable() {
            self.check_breakpoint();
        }
        match &stmt.kind {
            StatementKind::Var(bindings) => {
                let target = var_scope(scope);
                for (name, init) in bindings {
                    if let Some(init) = init {
                        let value = self.eval_expr(init, scope)?;
                        env_declare(&target, name, value, true);
                    } else if !env_has_own(&target, name) {
                        env_declare(&target, name, Value::Undefined, true);
                    }
                }
                Ok(Completion::Normal(None))
            }
            StatementKind::Let(bindings) => {
                for (name, init) in bindings {
                    let value = match init {
                        Some(init) => self.eval_expr(init, scope)?,
                        None => Value::Undefined,
                    };
                    self.declare_lexical(scope, name, value, true)?;
                }
                Ok(Completion::Normal(None))
            }
            StatementKind::Const(bindings) => {
                for (name, init) in bindings {
                    let value = self.eval_expr(init, scope)?;
                    self.declare_lexical(scope, name, value, false)?;
                }
                Ok(Completion::Normal(None))
            }
            StatementKind::Using(bindings) => self.exec_using(bindings, scope, DisposalHint::Sync),
            StatementKind::AwaitUsing(bindings) => self.exec_using(bindings, scope, DisposalHint::Async),
            StatementKind::FunctionDeclaration(_) | StatementKind::Empty => Ok(Completion::Normal(None)),
            StatementKind::Expr(expr) => Ok(Completion::Normal(Some(self.eval_expr(expr, scope)?))),
            StatementKind::Return(expr) => {
                let value = match expr {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            StatementKind::If(cond, then, otherwise) => {
                if to_boolean(&self.eval_expr(cond, scope)?) {
                    self.exec_statements(then, scope)
                } else if let Some(otherwise) = otherwise {
                    self.exec_statements(otherwise, scope)
                } else {
                    Ok(Completion::Normal(None))
                }
            }
            StatementKind::While(cond, body) => {
                while to_boolean(&self.eval_expr(cond, scope)?) {
                    match self.exec_statements(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Continue | Completion::Normal(_) => {}
                    }
                }
                Ok(Completion::Normal(None))
            }
            StatementKind::For(init, cond, update, body) => {
                let loop_scope = new_scope(ScopeKind::Block, Some(scope));
                let saved = self.enter_scope(&loop_scope);
                let result = self.exec_for(init.as_deref(), cond.as_ref(), update.as_ref(), body, &loop_scope);
                self.leave_scope(saved);
                result
            }
            StatementKind::Block(body) => self.exec_block(body, scope, ScopeKind::Block),
            StatementKind::Break => Ok(Completion::Break),
            StatementKind::Continue => Ok(Completion::Continue),
            StatementKind::TryCatch {
                body,
                param,
                handler,
                finalizer,
            } => self.exec_try(body, param.as_deref(), handler.as_deref(), finalizer.as_deref(), scope),
            StatementKind::Throw(expr) => {
                let value = self.eval_expr(expr, scope)?;
                Err(self.throw_value(value))
            }
            StatementKind::Debugger => {
                self.debugger_statement();
                Ok(Completion::Normal(None))
            }
        }
    }

    fn exec_using(&mut self, bindings: &[(String, Expr)], scope: &ScopePtr, hint: DisposalHint) -> Result<Completion, EvalError> {
        for (name, init) in bindings {
            let value = self.eval_expr(init, scope)?;
            self.declare_lexical(scope, name, value.clone(), false)?;
            add_disposable_resource(self, scope, value, hint)?;
        }
        Ok(Completion::Normal(None))
    }

    fn exec_for(
        &mut self,
        init: Option<&Statement>,
        cond: Option<&Expr>,
        update: Option<&Expr>,
        body: &[Statement],
        scope: &ScopePtr,
    ) -> Result<Completion, EvalError> {
        if let Some(init) = init {
            self.exec_statement(init, scope)?;
        }
        loop {
            if let Some(cond) = cond
                && !to_boolean(&self.eval_expr(cond, scope)?)
            {
                break;
            }
            match self.exec_statements(body, scope)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Continue | Completion::Normal(_) => {}
            }
            if let Some(update) = update {
                self.eval_expr(update, scope)?;
            }
        }
        Ok(Completion::Normal(None))
    }

    fn exec_try(
        &mut self,
        body: &[Statement],
        param: Option<&str>,
        handler: Option<&[Statement]>,
        finalizer: Option<&[Statement]>,
        scope: &ScopePtr,
    ) -> Result<Completion, EvalError> {
        let depth = self.handlers.len();
        if handler.is_some() {
            self.handlers.push(HandlerMarker::Catch);
        }
        let result = self.exec_block(body, scope, ScopeKind::Block);
        self.handlers.truncate(depth);

        let mut result = match (result, handler) {
            (Err(EvalError::Throw(exception)), Some(handler)) => {
                let catch_scope = new_scope(ScopeKind::Catch, Some(scope));
                if let Some(param) = param {
                    env_declare(&catch_scope, param, exception, true);
                }
                self.exec_block_in(handler, &catch_scope)
            }
            (other, _) => other,
        };

        if let Some(finalizer) = finalizer {
            match self.exec_block(finalizer, scope, ScopeKind::Block) {
                Ok(Completion::Normal(_)) => {}
                abrupt => result = abrupt,
            }
        }
        result
    }

    fn declare_lexical(&mut self, scope: &ScopePtr, name: &str, value: Value, mutable: bool) -> Result<(), EvalError> {
        let redeclarable = scope.borrow().kind == ScopeKind::Repl;
        if env_has_own(scope, name) && !redeclarable {
            let message = format!("Identifier '{name}' has already been declared");
            return Err(self.throw_error("SyntaxError", &message));
        }
        env_declare(scope, name, value, mutable);
        Ok(())
    }

    // ---- expressions ----

    pub(crate) fn eval_expr(&mut self, expr: &Expr, scope: &ScopePtr) -> Result<Value, EvalError> {
        stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_SIZE, || self.eval_expr_inner(expr, scope))
    }

    fn eval_expr_inner(&mut self, expr: &Expr, scope: &ScopePtr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::String(s) => Ok(Value::String(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::This => Ok(env_this(scope)),
            Expr::Var(name) => self.lookup_var(scope, name),
            Expr::Array(elements, site) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(match element {
                        Some(e) => Some(self.eval_expr(e, scope)?),
                        None => None,
                    });
                }
                let site = if self.config.track_allocation_sites { Some(site) } else { None };
                Ok(create_array(values, site))
            }
            Expr::Object(properties) => {
                let obj = new_js_object_data();
                for (key, value) in properties {
                    let key = match key {
                        PropertyName::Static(name) => PropertyKey::from(name.as_str()),
                        PropertyName::Computed(e) => to_property_key(&self.eval_expr(e, scope)?),
                    };
                    let value = self.eval_expr(value, scope)?;
                    obj.borrow_mut().set(key, value);
                }
                Ok(Value::Object(obj))
            }
            Expr::Function(template) => Ok(Value::Function(Rc::new(JSFunction::Closure(Closure {
                template: template.clone(),
                env: scope.clone(),
            })))),
            Expr::Property(obj, name) => {
                let target = self.eval_expr(obj, scope)?;
                self.get_named_property(&target, name)
            }
            Expr::Index(obj, key, slot) => {
                let target = self.eval_expr(obj, scope)?;
                let key = self.eval_expr(key, scope)?;
                self.keyed_load(&target, &key, *slot)
            }
            Expr::Call(callee, args) => self.eval_call(callee, args, scope, false),
            Expr::New(callee, args, site) => {
                let callee = self.eval_expr(callee, scope)?;
                let args = self.eval_arguments(args, scope)?;
                self.construct(&callee, args, site)
            }
            Expr::Assign(target, rhs) => {
                match &**target {
                    Expr::Var(name) => {
                        let value = self.eval_expr(rhs, scope)?;
                        self.assign_var(scope, name, value.clone())?;
                        Ok(value)
                    }
                    Expr::Property(obj, name) => {
                        let target = self.eval_expr(obj, scope)?;
                        let value = self.eval_expr(rhs, scope)?;
                        self.set_named_property(&target, name, value.clone())?;
                        Ok(value)
                    }
                    _ => Err(self.throw_error("SyntaxError", "Invalid left-hand side in assignment")),
                }
            }
            Expr::AssignIndex(obj, key, rhs, slot) => {
                let target = self.eval_expr(obj, scope)?;
                let key = self.eval_expr(key, scope)?;
                let value = self.eval_expr(rhs, scope)?;
                self.keyed_store(&target, &key, value.clone(), *slot)?;
                Ok(value)
            }
            Expr::Binary(op, lhs, rhs) => {
                let l = self.eval_expr(lhs, scope)?;
                let r = self.eval_expr(rhs, scope)?;
                let concatenates = matches!(op, BinaryOp::Add) && (is_string_like(&l) || is_string_like(&r));
                if concatenates && string_length_floor(&l) + string_length_floor(&r) > MAX_STRING_LENGTH {
                    return Err(self.throw_error("RangeError", "Invalid string length"));
                }
                Ok(binary_op(*op, &l, &r))
            }
            Expr::LogicalAnd(lhs, rhs) => {
                let l = self.eval_expr(lhs, scope)?;
                if to_boolean(&l) { self.eval_expr(rhs, scope) } else { Ok(l) }
            }
            Expr::LogicalOr(lhs, rhs) => {
                let l = self.eval_expr(lhs, scope)?;
                if to_boolean(&l) { Ok(l) } else { self.eval_expr(rhs, scope) }
            }
            Expr::Unary(UnaryOp::TypeOf, operand) => {
                if let Expr::Var(name) = &**operand
                    && env_get(scope, name).is_none()
                {
                    return Ok(Value::String(type_of(&builtin_global(name).unwrap_or(Value::Undefined)).to_string()));
                }
                let value = self.eval_expr(operand, scope)?;
                Ok(Value::String(type_of(&value).to_string()))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval_expr(operand, scope)?;
                Ok(match op {
                    UnaryOp::Neg => Value::Number(-to_number(&value)),
                    UnaryOp::Plus => Value::Number(to_number(&value)),
                    UnaryOp::Not => Value::Boolean(!to_boolean(&value)),
                    UnaryOp::Void => Value::Undefined,
                    UnaryOp::TypeOf => Value::String(type_of(&value).to_string()),
                })
            }
            Expr::Delete(target) => self.eval_delete(target, scope),
            Expr::Update { name, delta, prefix } => {
                let old = to_number(&self.lookup_var(scope, name)?);
                let new = old + delta;
                self.assign_var(scope, name, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            Expr::Conditional(cond, then, otherwise) => {
                if to_boolean(&self.eval_expr(cond, scope)?) {
                    self.eval_expr(then, scope)
                } else {
                    self.eval_expr(otherwise, scope)
                }
            }
            Expr::Await(operand) => {
                let value = match &**operand {
                    Expr::Call(callee, args) => self.eval_call(callee, args, scope, true)?,
                    other => self.eval_expr(other, scope)?,
                };
                self.await_value(value)
            }
            Expr::Intrinsic(name, args) => {
                let args = self.eval_arguments(args, scope)?;
                call_intrinsic(self, name, args)
            }
        }
    }

    fn eval_arguments(&mut self, args: &[Expr], scope: &ScopePtr) -> Result<Vec<Value>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expr(arg, scope)?);
        }
        Ok(values)
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr], scope: &ScopePtr, awaited: bool) -> Result<Value, EvalError> {
        let (func, this) = match callee {
            Expr::Property(obj, name) => {
                let target = self.eval_expr(obj, scope)?;
                (self.get_named_property(&target, name)?, target)
            }
            Expr::Index(obj, key, slot) => {
                let target = self.eval_expr(obj, scope)?;
                let key = self.eval_expr(key, scope)?;
                (self.keyed_load(&target, &key, *slot)?, target)
            }
            other => (self.eval_expr(other, scope)?, Value::Undefined),
        };
        let args = self.eval_arguments(args, scope)?;
        if !func.is_callable() {
            let message = format!("{} is not a function", describe_callee(callee));
            return Err(self.throw_error("TypeError", &message));
        }
        self.call_function(&func, this, args, awaited)
    }

    fn eval_delete(&mut self, target: &Expr, scope: &ScopePtr) -> Result<Value, EvalError> {
        let (obj, key) = match target {
            Expr::Index(obj, key, _) => (self.eval_expr(obj, scope)?, self.eval_expr(key, scope)?),
            Expr::Property(obj, name) => (self.eval_expr(obj, scope)?, Value::String(name.clone())),
            Expr::Var(_) => return Ok(Value::Boolean(false)),
            other => {
                self.eval_expr(other, scope)?;
                return Ok(Value::Boolean(true));
            }
        };
        match &obj {
            Value::Object(o) => {
                let is_array = o.borrow().array.is_some();
                match array_index(&key) {
                    Some(index) if is_array => delete_element(o, index),
                    _ => {
                        o.borrow_mut().properties.shift_remove(&to_property_key(&key));
                    }
                }
                Ok(Value::Boolean(true))
            }
            v if v.is_nullish() => {
                let message = format!("Cannot convert undefined or null to object (deleting '{}')", value_to_string(&key));
                Err(self.throw_error("TypeError", &message))
            }
            _ => Ok(Value::Boolean(true)),
        }
    }

    fn lookup_var(&mut self, scope: &ScopePtr, name: &str) -> Result<Value, EvalError> {
        if let Some(value) = env_get(scope, name) {
            return Ok(value);
        }
        match builtin_global(name) {
            Some(value) => Ok(value),
            None => Err(self.throw_error("ReferenceError", &format!("{name} is not defined"))),
        }
    }

    fn assign_var(&mut self, scope: &ScopePtr, name: &str, value: Value) -> Result<(), EvalError> {
        match env_set(scope, name, value.clone()) {
            AssignOutcome::Assigned => Ok(()),
            AssignOutcome::Immutable => Err(self.throw_error("TypeError", "Assignment to constant variable.")),
            AssignOutcome::Missing if self.is_strict() => Err(self.throw_error("ReferenceError", &format!("{name} is not defined"))),
            AssignOutcome::Missing => {
                env_declare(&global_scope(scope), name, value, true);
                Ok(())
            }
        }
    }

    // ---- property access ----

    fn get_named_property(&mut self, target: &Value, name: &str) -> Result<Value, EvalError> {
        match target {
            Value::Object(obj) => {
                if name == "length"
                    && let Some(len) = array_length(obj)
                {
                    return Ok(Value::Number(len as f64));
                }
                Ok(object_get_key_value(obj, &PropertyKey::from(name)).unwrap_or(Value::Undefined))
            }
            Value::String(s) if name == "length" => Ok(Value::Number(s.encode_utf16().count() as f64)),
            Value::Function(f) if name == "name" => Ok(Value::String(f.name())),
            v if v.is_nullish() => {
                let message = format!("Cannot read properties of {} (reading '{}')", value_to_string(v), name);
                Err(self.throw_error("TypeError", &message))
            }
            _ => Ok(Value::Undefined),
        }
    }

    fn set_named_property(&mut self, target: &Value, name: &str, value: Value) -> Result<(), EvalError> {
        match target {
            Value::Object(obj) => {
                obj.borrow_mut().set(name, value);
                Ok(())
            }
            v if v.is_nullish() => {
                let message = format!("Cannot set properties of {} (setting '{}')", value_to_string(v), name);
                Err(self.throw_error("TypeError", &message))
            }
            _ => Ok(()),
        }
    }

    /// Layout of a plain object from its property insertion order.
    fn object_layout(&mut self, obj: &crate::core::JSObjectDataPtr) -> LayoutId {
        let names: Vec<String> = obj.borrow().properties.keys().map(|k| k.layout_name()).collect();
        self.layouts.layout_for(names.iter().map(String::as_str))
    }

    fn keyed_load(&mut self, target: &Value, key: &Value, slot: usize) -> Result<Value, EvalError> {
        match target {
            Value::Object(obj) => {
                let is_array = obj.borrow().array.is_some();
                if is_array {
                    if let Some(index) = array_index(key) {
                        return Ok(load_element(self, obj, index, slot));
                    }
                    if let Value::String(name) = key {
                        return self.get_named_property(target, name);
                    }
                }
                let value = object_get_key_value(obj, &to_property_key(key)).unwrap_or(Value::Undefined);
                if !is_array {
                    let layout = self.object_layout(obj);
                    let max = self.config.max_polymorphism;
                    let shape = Shape {
                        kind: ElementKind::HoleyGeneric,
                        layout,
                    };
                    self.with_feedback_slot(slot, |s| ic::observe_keyed_load(shape, s, max));
                }
                Ok(value)
            }
            Value::String(s) => Ok(match array_index(key) {
                Some(index) => code_unit_at(s, index).map(Value::String).unwrap_or(Value::Undefined),
                None => match key {
                    Value::String(name) => self.get_named_property(target, name)?,
                    _ => Value::Undefined,
                },
            }),
            v if v.is_nullish() => {
                let message = format!("Cannot read properties of {} (reading '{}')", value_to_string(v), value_to_string(key));
                Err(self.throw_error("TypeError", &message))
            }
            _ => Ok(Value::Undefined),
        }
    }

    fn keyed_store(&mut self, target: &Value, key: &Value, value: Value, slot: usize) -> Result<(), EvalError> {
        match target {
            Value::Object(obj) => {
                let is_array = obj.borrow().array.is_some();
                match array_index(key) {
                    Some(index) if is_array => store_element(self, obj, index, value, slot),
                    _ if is_array => obj.borrow_mut().set(to_property_key(key), value),
                    _ => {
                        obj.borrow_mut().set(to_property_key(key), value);
                        let layout = self.object_layout(obj);
                        let max = self.config.max_polymorphism;
                        self.with_feedback_slot(slot, |s| {
                            let mut data = obj.borrow_mut();
                            ic::observe_keyed_store(&mut *data, 0, ElementValue::Generic, layout, s, max);
                        });
                    }
                }
                Ok(())
            }
            v if v.is_nullish() => {
                let message = format!("Cannot set properties of {} (setting '{}')", value_to_string(v), value_to_string(key));
                Err(self.throw_error("TypeError", &message))
            }
            _ => Ok(()),
        }
    }
}

fn binary_op(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add => match (l, r) {
            (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
            _ if is_string_like(l) || is_string_like(r) => Value::String(format!("{}{}", value_to_string(l), value_to_string(r))),
            _ => Value::Number(to_number(l) + to_number(r)),
        },
        BinaryOp::Sub => Value::Number(to_number(l) - to_number(r)),
        BinaryOp::Mul => Value::Number(to_number(l) * to_number(r)),
        BinaryOp::Div => Value::Number(to_number(l) / to_number(r)),
        BinaryOp::Mod => Value::Number(to_number(l) % to_number(r)),
        BinaryOp::Equal => Value::Boolean(loose_equals(l, r)),
        BinaryOp::NotEqual => Value::Boolean(!loose_equals(l, r)),
        BinaryOp::StrictEqual => Value::Boolean(strict_equals(l, r)),
        BinaryOp::StrictNotEqual => Value::Boolean(!strict_equals(l, r)),
        BinaryOp::LessThan | BinaryOp::GreaterThan | BinaryOp::LessEqual | BinaryOp::GreaterEqual => {
            if let (Value::String(a), Value::String(b)) = (l, r) {
                return Value::Boolean(match op {
                    BinaryOp::LessThan => a < b,
                    BinaryOp::GreaterThan => a > b,
                    BinaryOp::LessEqual => a <= b,
                    _ => a >= b,
                });
            }
            let (a, b) = (to_number(l), to_number(r));
            Value::Boolean(match op {
                BinaryOp::LessThan => a < b,
                BinaryOp::GreaterThan => a > b,
                BinaryOp::LessEqual => a <= b,
                _ => a >= b,
            })
        }
    }
}

/// The UTF-16 code unit at `index` as a string. Half of a surrogate pair has
/// no UTF-8 form and reads as U+FFFD.
fn code_unit_at(s: &str, index: usize) -> Option<String> {
    s.encode_utf16().nth(index).map(|unit| String::from_utf16_lossy(&[unit]))
}

/// Lower bound on the length of `v` converted to a string.
fn string_length_floor(v: &Value) -> usize {
    match v {
        Value::String(s) => s.len(),
        other => array_join_floor(other),
    }
}

fn is_string_like(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Object(_) | Value::Function(_) | Value::Promise(_))
}

/// Globals that are values rather than bindings.
fn builtin_global(name: &str) -> Option<Value> {
    match name {
        "undefined" => Some(Value::Undefined),
        "NaN" => Some(Value::Number(f64::NAN)),
        "Infinity" => Some(Value::Number(f64::INFINITY)),
        _ => None,
    }
}

/// Source-ish spelling of a callee for error messages.
fn describe_callee(expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => name.clone(),
        Expr::Property(obj, name) => format!("{}.{}", describe_callee(obj), name),
        Expr::Index(obj, key, _) => match &**key {
            Expr::Number(n) => format!("{}[{}]", describe_callee(obj), format_js_number(*n)),
            _ => format!("{}[...]", describe_callee(obj)),
        },
        Expr::This => "this".to_string(),
        _ => "expression".to_string(),
    }
}

/// Declares `var` names of `body` on its var scope.
fn hoist_var_declarations(body: &[Statement], scope: &ScopePtr) {
    let mut names = Vec::new();
    collect_var_names(body, &mut names);
    let target = var_scope(scope);
    for name in names {
        if !env_has_own(&target, &name) {
            env_declare(&target, &name, Value::Undefined, true);
        }
    }
}

fn hoist_function_declarations(body: &[Statement], scope: &ScopePtr) {
    for stmt in body {
        if let StatementKind::FunctionDeclaration(template) = &stmt.kind {
            let closure = Value::Function(Rc::new(JSFunction::Closure(Closure {
                template: template.clone(),
                env: scope.clone(),
            })));
            env_declare(scope, &template.name, closure, true);
        }
    }
}

/// Populates the global scope with the builtins.
pub fn initialize_global_constructors(global: &ScopePtr) {
    for name in ["Error", "TypeError", "ReferenceError", "SyntaxError", "RangeError", "SuppressedError", "Array"] {
        env_declare(global, name, new_native_function(name), true);
    }
    let symbol = new_js_object_with(vec![
        ("dispose".into(), Value::Symbol(WellKnownSymbol::Dispose)),
        ("asyncDispose".into(), Value::Symbol(WellKnownSymbol::AsyncDispose)),
    ]);
    env_declare(global, "Symbol", symbol, true);
    let console = new_js_object_with(vec![("log".into(), new_native_function("console.log"))]);
    env_declare(global, "console", console, true);
    let promise = new_js_object_with(vec![
        ("resolve".into(), new_native_function("Promise.resolve")),
        ("reject".into(), new_native_function("Promise.reject")),
    ]);
    env_declare(global, "Promise", promise, true);
}
