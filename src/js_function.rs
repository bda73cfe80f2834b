use crate::config::EngineConfig;
use crate::core::{EvalError, Interpreter, ScopePtr, ScriptId, Statement, Value, to_boolean, value_to_string};
use crate::ic::{AllocationSite, FeedbackSlotKind, FeedbackVector};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Compiled form of a function literal, shared by every closure created from
/// it. Owns the function's feedback vector once one is allocated.
#[derive(Debug)]
pub struct FunctionTemplate {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Statement>,
    pub is_async: bool,
    pub is_arrow: bool,
    pub is_strict: bool,
    pub script_id: ScriptId,
    pub line: usize,
    pub column: usize,
    pub slot_kinds: Vec<FeedbackSlotKind>,
    pub feedback: RefCell<Option<FeedbackVector>>,
    pub invocation_count: Cell<u32>,
}

impl FunctionTemplate {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        params: Vec<String>,
        body: Vec<Statement>,
        is_async: bool,
        is_arrow: bool,
        is_strict: bool,
        script_id: ScriptId,
        start: (usize, usize),
        slot_kinds: Vec<FeedbackSlotKind>,
    ) -> Self {
        FunctionTemplate {
            name,
            params,
            body,
            is_async,
            is_arrow,
            is_strict,
            script_id,
            line: start.0,
            column: start.1,
            slot_kinds,
            feedback: RefCell::new(None),
            invocation_count: Cell::new(0),
        }
    }

    /// Counts a call and allocates the feedback vector once the function is
    /// warm enough.
    pub fn note_invocation(&self, config: &EngineConfig) {
        let count = self.invocation_count.get().saturating_add(1);
        self.invocation_count.set(count);
        if !config.lazy_feedback_allocation || count >= config.feedback_allocation_threshold {
            self.ensure_feedback_vector();
        }
    }

    pub fn ensure_feedback_vector(&self) {
        let mut feedback = self.feedback.borrow_mut();
        if feedback.is_none() {
            log::debug!("allocating feedback vector for '{}' ({} slots)", self.display_name(), self.slot_kinds.len());
            *feedback = Some(FeedbackVector::new(&self.slot_kinds));
        }
    }

    pub fn feedback_description(&self) -> Option<Vec<(String, String)>> {
        self.feedback.borrow().as_ref().map(|v| v.describe())
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { "<anonymous>" } else { &self.name }
    }
}

pub struct Closure {
    pub template: Rc<FunctionTemplate>,
    pub env: ScopePtr,
}

pub enum JSFunction {
    Closure(Closure),
    /// Builtin, dispatched by name.
    Native(&'static str),
}

impl JSFunction {
    pub fn name(&self) -> String {
        match self {
            JSFunction::Closure(c) => c.template.name.clone(),
            JSFunction::Native(name) => name.rsplit('.').next().unwrap_or(name).to_string(),
        }
    }

    pub fn template(&self) -> Option<&Rc<FunctionTemplate>> {
        match self {
            JSFunction::Closure(c) => Some(&c.template),
            JSFunction::Native(_) => None,
        }
    }

    pub fn to_source_string(&self) -> String {
        match self {
            JSFunction::Closure(c) => {
                let t = &c.template;
                let params = t.params.join(", ");
                match (t.is_async, t.is_arrow) {
                    (false, true) => format!("({params}) => {{ [code] }}"),
                    (true, true) => format!("async ({params}) => {{ [code] }}"),
                    (is_async, false) => format!("{}function {}({params}) {{ [code] }}", if is_async { "async " } else { "" }, t.name),
                }
            }
            JSFunction::Native(_) => format!("function {}() {{ [native code] }}", self.name()),
        }
    }
}

pub fn new_native_function(name: &'static str) -> Value {
    Value::Function(Rc::new(JSFunction::Native(name)))
}

/// Calls the builtin `name`. `site` is the allocation site of a `new`
/// expression, if the call came from one.
pub(crate) fn call_native(
    interp: &mut Interpreter,
    name: &str,
    args: Vec<Value>,
    site: Option<&Rc<AllocationSite>>,
) -> Result<Value, EvalError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or(Value::Undefined);
    match name {
        "Error" | "TypeError" | "ReferenceError" | "SyntaxError" | "RangeError" => {
            let message = match arg(0) {
                Value::Undefined => String::new(),
                other => value_to_string(&other),
            };
            Ok(interp.create_error(name, &message))
        }
        "SuppressedError" => {
            let error = interp.create_suppressed_error(arg(0), arg(1));
            if let (Value::Object(obj), Value::String(message)) = (&error, arg(2)) {
                obj.borrow_mut().set("message", Value::String(message));
            }
            Ok(error)
        }
        "Array" => crate::js_array::construct_array(interp, args, site),
        "console.log" => {
            crate::js_console::console_log(interp, &args);
            Ok(Value::Undefined)
        }
        "Promise.resolve" => Ok(interp.promise_resolved(arg(0))),
        "Promise.reject" => Ok(interp.promise_rejected(arg(0), false)),
        other => Err(interp.throw_error("TypeError", &format!("{other} is not a function"))),
    }
}

/// `%Name(args)` runtime intrinsics.
pub(crate) fn call_intrinsic(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let target = args.into_iter().next().unwrap_or(Value::Undefined);
    let template = match &target {
        Value::Function(f) => f.template().cloned(),
        _ => None,
    };
    match name {
        "GetFeedback" => {
            let Some(template) = template else {
                return Ok(Value::Undefined);
            };
            Ok(match template.feedback_description() {
                Some(entries) => {
                    let rows = entries
                        .into_iter()
                        .map(|(op, state)| {
                            Some(crate::js_array::create_array(
                                vec![Some(Value::String(op)), Some(Value::String(state))],
                                None,
                            ))
                        })
                        .collect();
                    crate::js_array::create_array(rows, None)
                }
                None => Value::Undefined,
            })
        }
        "PrepareFunctionForOptimization" => {
            match template {
                Some(template) => template.ensure_feedback_vector(),
                None => return Err(interp.throw_error("TypeError", "%PrepareFunctionForOptimization expects a function")),
            }
            Ok(Value::Undefined)
        }
        "HasSmiElements" | "HasDoubleElements" | "HasObjectElements" | "HasHoleyElements" => {
            let Some(kind) = target.elements_kind() else {
                return Ok(Value::Boolean(name == "HasObjectElements" && to_boolean(&target)));
            };
            let answer = match name {
                "HasSmiElements" => kind.is_smi(),
                "HasDoubleElements" => kind.is_double(),
                "HasObjectElements" => kind.is_generic(),
                _ => kind.is_holey(),
            };
            Ok(Value::Boolean(answer))
        }
        other => Err(interp.throw_error("SyntaxError", &format!("Unknown runtime function %{other}"))),
    }
}
