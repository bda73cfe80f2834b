use super::{ElementKind, LayoutId};
use std::fmt;

/// What a keyed access site has seen of a receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub kind: ElementKind,
    pub layout: LayoutId,
}

impl Shape {
    pub fn array(kind: ElementKind) -> Self {
        Shape {
            kind,
            layout: LayoutId::ARRAY,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.layout == LayoutId::ARRAY {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}@{}", self.kind, self.layout)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackSlotKind {
    StoreKeyedSloppy,
    StoreKeyedStrict,
    LoadKeyed,
}

impl FeedbackSlotKind {
    pub fn store(strict: bool) -> Self {
        if strict {
            FeedbackSlotKind::StoreKeyedStrict
        } else {
            FeedbackSlotKind::StoreKeyedSloppy
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FeedbackSlotKind::StoreKeyedSloppy => "StoreKeyedSloppy",
            FeedbackSlotKind::StoreKeyedStrict => "StoreKeyedStrict",
            FeedbackSlotKind::LoadKeyed => "LoadKeyed",
        }
    }

    pub fn is_store(self) -> bool {
        !matches!(self, FeedbackSlotKind::LoadKeyed)
    }
}

/// Inline-cache state of one access site.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FeedbackState {
    #[default]
    Uninitialized,
    Monomorphic(Shape),
    Polymorphic(Vec<Shape>),
    Megamorphic,
}

impl FeedbackState {
    pub fn shapes(&self) -> &[Shape] {
        match self {
            FeedbackState::Monomorphic(shape) => std::slice::from_ref(shape),
            FeedbackState::Polymorphic(shapes) => shapes,
            FeedbackState::Uninitialized | FeedbackState::Megamorphic => &[],
        }
    }

    fn from_shapes(mut shapes: Vec<Shape>, max_polymorphism: usize) -> Self {
        match shapes.len() {
            0 => FeedbackState::Uninitialized,
            1 => FeedbackState::Monomorphic(shapes.remove(0)),
            n if n <= max_polymorphism => FeedbackState::Polymorphic(shapes),
            _ => FeedbackState::Megamorphic,
        }
    }

    /// The state after observing `shape`.
    ///
    /// A shape that generalizes a recorded shape of the same layout replaces
    /// it in place; any other new shape widens the state.
    pub fn transition(&self, shape: Shape, max_polymorphism: usize) -> FeedbackState {
        match self {
            FeedbackState::Megamorphic => FeedbackState::Megamorphic,
            FeedbackState::Uninitialized => FeedbackState::Monomorphic(shape),
            FeedbackState::Monomorphic(_) | FeedbackState::Polymorphic(_) => {
                let recorded = self.shapes();
                if recorded.contains(&shape) {
                    return self.clone();
                }
                let generalizes = |s: &Shape| s.layout == shape.layout && shape.kind.is_more_general_than(s.kind);
                let mut shapes = Vec::with_capacity(recorded.len() + 1);
                let mut replaced = false;
                for s in recorded {
                    if generalizes(s) {
                        if !replaced {
                            shapes.push(shape);
                            replaced = true;
                        }
                    } else {
                        shapes.push(*s);
                    }
                }
                if !replaced {
                    shapes.push(shape);
                }
                Self::from_shapes(shapes, max_polymorphism)
            }
        }
    }

    /// A recorded kind strictly more general than `shape` on the same layout,
    /// if any. A receiver that can still be generalized adopts it instead of
    /// widening the state.
    pub fn absorbing_kind(&self, shape: Shape) -> Option<ElementKind> {
        self.shapes()
            .iter()
            .find(|s| s.layout == shape.layout && s.kind.is_more_general_than(shape.kind))
            .map(|s| s.kind)
    }

    pub fn descriptor(&self) -> String {
        match self {
            FeedbackState::Uninitialized => "UNINITIALIZED".to_string(),
            FeedbackState::Monomorphic(shape) => format!("MONOMORPHIC({})", shape),
            FeedbackState::Polymorphic(shapes) => {
                let names: Vec<String> = shapes.iter().map(|s| s.to_string()).collect();
                format!("POLYMORPHIC[{}]", names.join(", "))
            }
            FeedbackState::Megamorphic => "MEGAMORPHIC".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackSlot {
    kind: FeedbackSlotKind,
    state: FeedbackState,
}

impl FeedbackSlot {
    pub fn new(kind: FeedbackSlotKind) -> Self {
        FeedbackSlot {
            kind,
            state: FeedbackState::Uninitialized,
        }
    }

    pub fn kind(&self) -> FeedbackSlotKind {
        self.kind
    }

    pub fn state(&self) -> &FeedbackState {
        &self.state
    }

    pub fn record(&mut self, shape: Shape, max_polymorphism: usize) {
        let next = self.state.transition(shape, max_polymorphism);
        if next != self.state {
            log::trace!("{} feedback: {} -> {}", self.kind.name(), self.state.descriptor(), next.descriptor());
            self.state = next;
        }
    }
}

/// Feedback slots of one function, in source order.
#[derive(Debug, Clone)]
pub struct FeedbackVector {
    slots: Vec<FeedbackSlot>,
}

impl FeedbackVector {
    pub fn new(kinds: &[FeedbackSlotKind]) -> Self {
        FeedbackVector {
            slots: kinds.iter().map(|k| FeedbackSlot::new(*k)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot(&self, index: usize) -> Option<&FeedbackSlot> {
        self.slots.get(index)
    }

    pub fn slot_mut(&mut self, index: usize) -> Option<&mut FeedbackSlot> {
        self.slots.get_mut(index)
    }

    /// `(operation name, state descriptor)` per slot.
    pub fn describe(&self) -> Vec<(String, String)> {
        self.slots.iter().map(|s| (s.kind.name().to_string(), s.state.descriptor())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn array(kind: ElementKind) -> Shape {
        Shape::array(kind)
    }

    #[test]
    fn generalization_replaces_in_place() {
        let mono = FeedbackState::Uninitialized.transition(array(ElementKind::HoleySmi), 4);
        let next = mono.transition(array(ElementKind::HoleyDouble), 4);
        assert_eq!(next, FeedbackState::Monomorphic(array(ElementKind::HoleyDouble)));
        assert_eq!(next.descriptor(), "MONOMORPHIC(HOLEY_DOUBLE_ELEMENTS)");
    }

    #[test]
    fn less_general_shape_widens() {
        let mono = FeedbackState::Monomorphic(array(ElementKind::HoleyDouble));
        let next = mono.transition(array(ElementKind::HoleySmi), 4);
        assert_eq!(
            next,
            FeedbackState::Polymorphic(vec![array(ElementKind::HoleyDouble), array(ElementKind::HoleySmi)])
        );
        assert_eq!(mono.absorbing_kind(array(ElementKind::HoleySmi)), Some(ElementKind::HoleyDouble));
        assert_eq!(mono.absorbing_kind(array(ElementKind::PackedGeneric)), None);
    }

    #[test]
    fn identical_shape_is_stable() {
        let mono = FeedbackState::Monomorphic(array(ElementKind::PackedSmi));
        assert_eq!(mono.transition(array(ElementKind::PackedSmi), 4), mono);
    }

    #[test]
    fn bound_escalates_to_megamorphic() {
        let mut table = crate::ic::LayoutTable::new();
        let mut state = FeedbackState::Uninitialized;
        for name in ["a", "b", "c"] {
            let shape = Shape {
                kind: ElementKind::HoleyGeneric,
                layout: table.layout_for([name]),
            };
            state = state.transition(shape, 2);
        }
        assert_eq!(state.descriptor(), "MEGAMORPHIC");
        assert_eq!(state.transition(array(ElementKind::PackedSmi), 2), FeedbackState::Megamorphic);
    }

    #[test]
    fn distinct_layouts_stay_apart() {
        let mut table = crate::ic::LayoutTable::new();
        let a = Shape {
            kind: ElementKind::HoleyGeneric,
            layout: table.layout_for(["a"]),
        };
        let b = Shape {
            kind: ElementKind::HoleyGeneric,
            layout: table.layout_for(["b"]),
        };
        let state = FeedbackState::Uninitialized.transition(a, 4).transition(b, 4);
        assert!(matches!(state, FeedbackState::Polymorphic(ref s) if s.len() == 2));
        assert!(state.descriptor().starts_with("POLYMORPHIC["));
    }

    #[test]
    fn vector_describes_slots_in_order() {
        let mut vector = FeedbackVector::new(&[FeedbackSlotKind::StoreKeyedSloppy, FeedbackSlotKind::LoadKeyed]);
        if let Some(slot) = vector.slot_mut(0) {
            slot.record(array(ElementKind::PackedSmi), 4);
        }
        assert_eq!(
            vector.describe(),
            vec![
                ("StoreKeyedSloppy".to_string(), "MONOMORPHIC(PACKED_SMI_ELEMENTS)".to_string()),
                ("LoadKeyed".to_string(), "UNINITIALIZED".to_string()),
            ]
        );
    }
}
