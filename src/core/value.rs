use crate::core::{PropertyKey, WellKnownSymbol};
use crate::ic::{AllocationSite, ElementKind};
use crate::js_array::JSArray;
use crate::js_function::JSFunction;
use crate::js_promise::{JSPromisePtr, PromiseState};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub type JSObjectDataPtr = Rc<RefCell<JSObjectData>>;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Symbol(WellKnownSymbol),
    Object(JSObjectDataPtr),
    Function(Rc<JSFunction>),
    Promise(JSPromisePtr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectClass {
    Ordinary,
    Error,
    Array,
}

#[derive(Default)]
pub struct JSObjectData {
    pub properties: IndexMap<PropertyKey, Value>,
    pub prototype: Option<JSObjectDataPtr>,
    pub array: Option<JSArray>,
    pub is_error: bool,
}

impl JSObjectData {
    pub fn class(&self) -> ObjectClass {
        if self.array.is_some() {
            ObjectClass::Array
        } else if self.is_error {
            ObjectClass::Error
        } else {
            ObjectClass::Ordinary
        }
    }

    pub fn get_own(&self, key: &PropertyKey) -> Option<Value> {
        self.properties.get(key).cloned()
    }

    pub fn set(&mut self, key: impl Into<PropertyKey>, value: Value) {
        self.properties.insert(key.into(), value);
    }
}

pub fn new_js_object_data() -> JSObjectDataPtr {
    Rc::new(RefCell::new(JSObjectData::default()))
}

pub fn new_js_object_with(properties: Vec<(PropertyKey, Value)>) -> Value {
    let obj = new_js_object_data();
    obj.borrow_mut().properties.extend(properties);
    Value::Object(obj)
}

/// Reads `key` from `obj` or its prototype chain.
pub fn object_get_key_value(obj: &JSObjectDataPtr, key: &PropertyKey) -> Option<Value> {
    let mut current = Some(obj.clone());
    while let Some(o) = current {
        let data = o.borrow();
        if let Some(v) = data.properties.get(key) {
            return Some(v.clone());
        }
        current = data.prototype.clone();
    }
    None
}

impl Value {
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Own property of an object value.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self {
            Value::Object(obj) => object_get_key_value(obj, &PropertyKey::from(key)),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Object(obj) if obj.borrow().array.is_some())
    }

    pub fn elements_kind(&self) -> Option<ElementKind> {
        match self {
            Value::Object(obj) => obj.borrow().array.as_ref().map(|a| a.kind()),
            _ => None,
        }
    }

    pub fn allocation_site(&self) -> Option<Rc<AllocationSite>> {
        match self {
            Value::Object(obj) => obj.borrow().array.as_ref().and_then(|a| a.site().cloned()),
            _ => None,
        }
    }

    /// Elements of an array value, holes read as `undefined`.
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Object(obj) => obj
                .borrow()
                .array
                .as_ref()
                .map(|a| (0..a.len()).map(|i| a.get(i)).collect()),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", value_to_string(other)),
        }
    }
}

pub fn format_js_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n.is_sign_negative() { "-Infinity".to_string() } else { "Infinity".to_string() }
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

/// Longest string the engine will build.
pub const MAX_STRING_LENGTH: usize = (1 << 29) - 24;

pub fn value_to_string(val: &Value) -> String {
    to_string_in(val, &mut Vec::new())
}

/// Length of the string an array joins to, counting separators only.
pub fn array_join_floor(val: &Value) -> usize {
    match val {
        Value::Object(obj) => obj.borrow().array.as_ref().map(|a| a.len().saturating_sub(1)).unwrap_or(0),
        _ => 0,
    }
}

/// `joining` holds the arrays currently being joined; meeting one again
/// renders it as the empty string.
fn to_string_in(val: &Value, joining: &mut Vec<*const RefCell<JSObjectData>>) -> String {
    match val {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Number(n) => format_js_number(*n),
        Value::String(s) => s.clone(),
        Value::Symbol(sym) => sym.to_string(),
        Value::Object(obj) => {
            let ptr = Rc::as_ptr(obj);
            let data = obj.borrow();
            if let Some(array) = &data.array {
                if joining.contains(&ptr) {
                    return String::new();
                }
                if array.len() > MAX_STRING_LENGTH {
                    return format!("[object Array({})]", array.len());
                }
                joining.push(ptr);
                let mut out = String::new();
                let mut next = 0;
                for (index, element) in array.present() {
                    out.extend(std::iter::repeat_n(',', index - next));
                    if !element.is_nullish() {
                        out.push_str(&to_string_in(&element, joining));
                    }
                    next = index;
                }
                out.extend(std::iter::repeat_n(',', array.len().saturating_sub(1).saturating_sub(next)));
                joining.pop();
                return out;
            }
            if data.is_error {
                let name = data.get_own(&"name".into()).map(|v| value_to_string(&v)).unwrap_or_else(|| "Error".into());
                let message = data.get_own(&"message".into()).map(|v| value_to_string(&v)).unwrap_or_default();
                return if message.is_empty() { name } else { format!("{name}: {message}") };
            }
            "[object Object]".to_string()
        }
        Value::Function(func) => func.to_source_string(),
        Value::Promise(_) => "[object Promise]".to_string(),
    }
}

pub fn type_of(val: &Value) -> &'static str {
    match val {
        Value::Undefined => "undefined",
        Value::Null | Value::Object(_) | Value::Promise(_) => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Symbol(_) => "symbol",
        Value::Function(_) => "function",
    }
}

pub fn to_boolean(val: &Value) -> bool {
    match val {
        Value::Undefined | Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

pub fn to_number(val: &Value) -> f64 {
    match val {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                match trimmed {
                    "Infinity" | "+Infinity" => f64::INFINITY,
                    "-Infinity" => f64::NEG_INFINITY,
                    _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
                }
            }
        }
        Value::Object(obj) => match &obj.borrow().array {
            Some(array) if array.is_empty() => 0.0,
            _ => f64::NAN,
        },
        _ => f64::NAN,
    }
}

pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Boolean(x), Value::Boolean(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Symbol(x), Value::Symbol(y)) => x == y,
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Promise(x), Value::Promise(y)) => Rc::ptr_eq(x, y),
        _ => false,
    }
}

pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() && y.is_nullish() => true,
        (x, y) if x.is_nullish() || y.is_nullish() => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => to_number(a) == to_number(b),
        (Value::Boolean(_), _) => loose_equals(&Value::Number(to_number(a)), b),
        (_, Value::Boolean(_)) => loose_equals(a, &Value::Number(to_number(b))),
        _ => strict_equals(a, b),
    }
}

/// Array index spelled by `key`, if it is one.
pub fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n < u32::MAX as f64 => Some(*n as usize),
        Value::String(s) => match s.parse::<u32>() {
            Ok(i) if i.to_string() == *s && i != u32::MAX => Some(i as usize),
            _ => None,
        },
        _ => None,
    }
}

pub fn to_property_key(key: &Value) -> PropertyKey {
    match key {
        Value::Symbol(sym) => PropertyKey::Symbol(*sym),
        other => PropertyKey::String(value_to_string(other)),
    }
}

/// Settled state of a promise value, for callers outside the engine.
pub fn promise_state(val: &Value) -> Option<PromiseState> {
    match val {
        Value::Promise(p) => Some(p.borrow().state.clone()),
        _ => None,
    }
}
