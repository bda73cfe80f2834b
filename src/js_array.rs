use crate::core::{EvalError, Interpreter, JSObjectData, JSObjectDataPtr, Value};
use crate::ic::{self, AllocationSite, ElementKind, ElementValue, ElementsHolder, LayoutId, Shape};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Largest `new Array(n)` backed by a preallocated vector.
pub const MAX_DENSE_PREALLOCATION: usize = 1 << 16;

/// Stores this far past the end switch the array to dictionary elements.
pub const MAX_DENSE_GAP: usize = 1024;

#[derive(Debug, Clone)]
enum Elements {
    /// Holes are `None`.
    Dense(Vec<Option<Value>>),
    /// Only present indices are stored. Always holey.
    Dictionary { length: usize, entries: IndexMap<usize, Value> },
}

/// Array backing store.
#[derive(Debug, Clone)]
pub struct JSArray {
    elements: Elements,
    kind: ElementKind,
    site: Option<Rc<AllocationSite>>,
}

impl JSArray {
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn site(&self) -> Option<&Rc<AllocationSite>> {
        self.site.as_ref()
    }

    pub fn len(&self) -> usize {
        match &self.elements {
            Elements::Dense(v) => v.len(),
            Elements::Dictionary { length, .. } => *length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Value {
        self.slot(index).unwrap_or(Value::Undefined)
    }

    /// The element at `index`, `None` for a hole.
    pub fn slot(&self, index: usize) -> Option<Value> {
        match &self.elements {
            Elements::Dense(v) => v.get(index).cloned().flatten(),
            Elements::Dictionary { entries, .. } => entries.get(&index).cloned(),
        }
    }

    /// Present elements in index order.
    pub fn present(&self) -> Vec<(usize, Value)> {
        match &self.elements {
            Elements::Dense(v) => v.iter().enumerate().filter_map(|(i, e)| e.clone().map(|e| (i, e))).collect(),
            Elements::Dictionary { entries, .. } => {
                let mut present: Vec<(usize, Value)> = entries.iter().map(|(i, v)| (*i, v.clone())).collect();
                present.sort_by_key(|(i, _)| *i);
                present
            }
        }
    }

    fn write(&mut self, index: usize, value: Value) {
        match &mut self.elements {
            Elements::Dense(v) if index < v.len() => v[index] = Some(value),
            Elements::Dense(v) if index - v.len() <= MAX_DENSE_GAP => {
                v.resize(index + 1, None);
                v[index] = Some(value);
            }
            Elements::Dense(v) => {
                log::debug!("array store at {} moves to dictionary elements", index);
                let length = index + 1;
                let mut entries: IndexMap<usize, Value> = std::mem::take(v)
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, e)| e.map(|e| (i, e)))
                    .collect();
                entries.insert(index, value);
                self.elements = Elements::Dictionary { length, entries };
            }
            Elements::Dictionary { length, entries } => {
                *length = (*length).max(index + 1);
                entries.insert(index, value);
            }
        }
    }

    fn remove(&mut self, index: usize) -> bool {
        match &mut self.elements {
            Elements::Dense(v) if index < v.len() => {
                v[index] = None;
                true
            }
            Elements::Dense(_) => false,
            Elements::Dictionary { entries, .. } => entries.swap_remove(&index).is_some(),
        }
    }
}

impl ElementsHolder for JSObjectData {
    fn elements_kind(&self) -> ElementKind {
        self.array.as_ref().map(|a| a.kind).unwrap_or(ElementKind::HoleyGeneric)
    }

    fn length(&self) -> usize {
        self.array.as_ref().map(|a| a.len()).unwrap_or(0)
    }

    fn transition_elements_kind(&mut self, to: ElementKind) {
        if let Some(array) = &mut self.array {
            array.kind = to;
        }
    }

    fn allocation_site(&self) -> Option<&Rc<AllocationSite>> {
        self.array.as_ref().and_then(|a| a.site.as_ref())
    }
}

pub fn classify_element(value: &Value) -> ElementValue {
    match value {
        Value::Number(n) => ElementValue::of_number(*n),
        _ => ElementValue::Generic,
    }
}

/// Allocates an array with `elements`, seeded from `site` when present.
pub(crate) fn create_array(elements: Vec<Option<Value>>, site: Option<&Rc<AllocationSite>>) -> Value {
    let seed = site.map(|s| s.note_allocation()).unwrap_or(ElementKind::PackedSmi);
    let required = elements.iter().fold(seed, |kind, e| match e {
        Some(v) => kind.join(ElementKind::for_value(classify_element(v))),
        None => kind.to_holey(),
    });
    allocate(Elements::Dense(elements), seed, required, site)
}

/// A holey array of `length` with no elements and no preallocated storage.
fn create_dictionary_array(length: usize, site: Option<&Rc<AllocationSite>>) -> Value {
    let seed = site.map(|s| s.note_allocation()).unwrap_or(ElementKind::PackedSmi);
    let elements = Elements::Dictionary {
        length,
        entries: IndexMap::new(),
    };
    allocate(elements, seed, seed.to_holey(), site)
}

fn allocate(elements: Elements, seed: ElementKind, required: ElementKind, site: Option<&Rc<AllocationSite>>) -> Value {
    let mut data = JSObjectData {
        array: Some(JSArray {
            elements,
            kind: seed,
            site: site.cloned(),
        }),
        ..Default::default()
    };
    ic::generalize_elements(&mut data, required);
    Value::Object(Rc::new(RefCell::new(data)))
}

/// `new Array(...)` and `Array(...)`.
pub(crate) fn construct_array(interp: &mut Interpreter, args: Vec<Value>, site: Option<&Rc<AllocationSite>>) -> Result<Value, EvalError> {
    let site = if interp.config.track_allocation_sites { site } else { None };
    if let [Value::Number(n)] = args.as_slice() {
        if n.fract() != 0.0 || *n < 0.0 || *n > u32::MAX as f64 {
            return Err(interp.throw_error("RangeError", "Invalid array length"));
        }
        let length = *n as usize;
        if length > MAX_DENSE_PREALLOCATION {
            return Ok(create_dictionary_array(length, site));
        }
        return Ok(create_array(vec![None; length], site));
    }
    Ok(create_array(args.into_iter().map(Some).collect(), site))
}

/// Keyed store into an array element, recording feedback on `slot`.
pub(crate) fn store_element(interp: &mut Interpreter, obj: &JSObjectDataPtr, index: usize, value: Value, slot: usize) {
    let element = classify_element(&value);
    let max = interp.config.max_polymorphism;
    interp.with_feedback_slot(slot, |slot| {
        let mut target = obj.borrow_mut();
        ic::observe_keyed_store(&mut *target, index, element, LayoutId::ARRAY, slot, max);
    });
    if let Some(array) = &mut obj.borrow_mut().array {
        array.write(index, value);
    }
}

pub(crate) fn load_element(interp: &mut Interpreter, obj: &JSObjectDataPtr, index: usize, slot: usize) -> Value {
    let (kind, value) = match &obj.borrow().array {
        Some(array) => (array.kind, array.get(index)),
        None => return Value::Undefined,
    };
    let max = interp.config.max_polymorphism;
    interp.with_feedback_slot(slot, |slot| ic::observe_keyed_load(Shape::array(kind), slot, max));
    value
}

/// `delete a[i]` leaves a hole.
pub(crate) fn delete_element(obj: &JSObjectDataPtr, index: usize) {
    let mut data = obj.borrow_mut();
    let punched = match &mut data.array {
        Some(array) => array.remove(index),
        None => false,
    };
    if punched {
        let holey = data.elements_kind().to_holey();
        ic::generalize_elements(&mut *data, holey);
    }
}

pub(crate) fn array_length(obj: &JSObjectDataPtr) -> Option<usize> {
    obj.borrow().array.as_ref().map(|a| a.len())
}
