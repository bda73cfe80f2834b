use crate::core::Value;
use crate::js_disposable::DisposableResource;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type ScopePtr = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    /// Session-level scope shared by REPL-mode evaluations.
    Repl,
    Function,
    Block,
    Catch,
    /// Scope of a debug evaluation on a paused frame.
    Eval,
}

impl ScopeKind {
    /// Receives `var` declarations.
    pub fn is_var_scope(self) -> bool {
        matches!(self, ScopeKind::Global | ScopeKind::Repl | ScopeKind::Function | ScopeKind::Eval)
    }

    pub fn protocol_name(self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Repl => "script",
            ScopeKind::Function => "local",
            ScopeKind::Block | ScopeKind::Eval => "block",
            ScopeKind::Catch => "catch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
}

pub struct Scope {
    pub kind: ScopeKind,
    pub bindings: IndexMap<String, Binding>,
    pub parent: Option<ScopePtr>,
    /// `this` for function scopes; arrow functions leave it unset.
    pub this_value: Option<Value>,
    /// `using` / `await using` resources in declaration order.
    pub disposables: Vec<DisposableResource>,
}

pub fn new_scope(kind: ScopeKind, parent: Option<&ScopePtr>) -> ScopePtr {
    Rc::new(RefCell::new(Scope {
        kind,
        bindings: IndexMap::new(),
        parent: parent.cloned(),
        this_value: None,
        disposables: Vec::new(),
    }))
}

pub fn env_get(scope: &ScopePtr, name: &str) -> Option<Value> {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let data = s.borrow();
        if let Some(binding) = data.bindings.get(name) {
            return Some(binding.value.clone());
        }
        current = data.parent.clone();
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Assigned,
    Immutable,
    Missing,
}

pub fn env_set(scope: &ScopePtr, name: &str, value: Value) -> AssignOutcome {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let mut data = s.borrow_mut();
        if let Some(binding) = data.bindings.get_mut(name) {
            if !binding.mutable {
                return AssignOutcome::Immutable;
            }
            binding.value = value;
            return AssignOutcome::Assigned;
        }
        current = data.parent.clone();
    }
    AssignOutcome::Missing
}

/// Creates or overwrites a binding directly on `scope`.
pub fn env_declare(scope: &ScopePtr, name: &str, value: Value, mutable: bool) {
    scope.borrow_mut().bindings.insert(name.to_string(), Binding { value, mutable });
}

pub fn env_has_own(scope: &ScopePtr, name: &str) -> bool {
    scope.borrow().bindings.contains_key(name)
}

pub fn env_this(scope: &ScopePtr) -> Value {
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let data = s.borrow();
        if let Some(this) = &data.this_value {
            return this.clone();
        }
        current = data.parent.clone();
    }
    Value::Undefined
}

/// Nearest scope that receives `var` declarations.
pub fn var_scope(scope: &ScopePtr) -> ScopePtr {
    let mut current = scope.clone();
    loop {
        let parent = {
            let data = current.borrow();
            if data.kind.is_var_scope() {
                return current.clone();
            }
            data.parent.clone()
        };
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

pub fn global_scope(scope: &ScopePtr) -> ScopePtr {
    let mut current = scope.clone();
    loop {
        let parent = current.borrow().parent.clone();
        match parent {
            Some(p) => current = p,
            None => return current,
        }
    }
}

/// Protocol scope types from innermost to outermost.
pub fn scope_chain_kinds(scope: &ScopePtr) -> Vec<ScopeKind> {
    let mut kinds = Vec::new();
    let mut current = Some(scope.clone());
    while let Some(s) = current {
        let data = s.borrow();
        kinds.push(data.kind);
        current = data.parent.clone();
    }
    kinds
}
