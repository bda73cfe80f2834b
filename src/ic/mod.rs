//! Element kinds, allocation sites and keyed-access feedback.
//!
//! This module knows nothing about the interpreter's value model: receivers
//! are reached through [`ElementsHolder`] and stored values are reduced to an
//! [`ElementValue`] before they get here.

mod allocation_site;
pub use allocation_site::*;

mod elements_kind;
pub use elements_kind::*;

mod feedback;
pub use feedback::*;

mod layout;
pub use layout::*;

use std::rc::Rc;

/// A receiver with an elements backing store.
pub trait ElementsHolder {
    fn elements_kind(&self) -> ElementKind;

    fn length(&self) -> usize;

    /// Re-tag the backing store. Only ever called with a more general kind.
    fn transition_elements_kind(&mut self, to: ElementKind);

    fn allocation_site(&self) -> Option<&Rc<AllocationSite>>;
}

/// Moves `target` up to `to` (no-op unless strictly more general) and lets
/// its allocation site digest the transition.
pub fn generalize_elements<H: ElementsHolder + ?Sized>(target: &mut H, to: ElementKind) {
    let from = target.elements_kind();
    let to = from.join(to);
    if to == from {
        return;
    }
    log::trace!("elements transition {} -> {}", from, to);
    target.transition_elements_kind(to);
    if let Some(site) = target.allocation_site() {
        site.digest_transition(to);
    }
}

/// Records a keyed store of a value of class `value` at `index` into `target`.
///
/// The target is generalized first so the stored value fits, then the store
/// site's feedback is updated with the resulting shape. When the site already
/// knows a more general kind for this layout and the target came from an
/// allocation site, the target adopts that kind and the feedback stays put.
///
/// Returns the kind the store writes into.
pub fn observe_keyed_store<H: ElementsHolder + ?Sized>(
    target: &mut H,
    index: usize,
    value: ElementValue,
    layout: LayoutId,
    slot: Option<&mut FeedbackSlot>,
    max_polymorphism: usize,
) -> ElementKind {
    let current = target.elements_kind();
    let mut required = current.join(ElementKind::for_value(value));
    if index > target.length() {
        required = required.to_holey();
    }
    generalize_elements(target, required);

    if let Some(slot) = slot {
        let shape = Shape {
            kind: target.elements_kind(),
            layout,
        };
        match slot.state().absorbing_kind(shape) {
            Some(kind) if target.allocation_site().is_some() => {
                generalize_elements(target, kind);
                slot.record(Shape { kind, layout }, max_polymorphism);
            }
            _ => slot.record(shape, max_polymorphism),
        }
    }
    target.elements_kind()
}

/// Records a keyed load from a receiver of `shape`. Loads never transition.
pub fn observe_keyed_load(shape: Shape, slot: Option<&mut FeedbackSlot>, max_polymorphism: usize) {
    if let Some(slot) = slot {
        slot.record(shape, max_polymorphism);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestArray {
        kind: ElementKind,
        len: usize,
        site: Option<Rc<AllocationSite>>,
    }

    impl TestArray {
        fn from_site(site: &Rc<AllocationSite>, len: usize) -> Self {
            let kind = site.note_allocation();
            let mut array = TestArray {
                kind,
                len,
                site: Some(site.clone()),
            };
            if len > 0 {
                generalize_elements(&mut array, kind.to_holey());
            }
            array
        }

        fn without_site(kind: ElementKind, len: usize) -> Self {
            TestArray { kind, len, site: None }
        }
    }

    impl ElementsHolder for TestArray {
        fn elements_kind(&self) -> ElementKind {
            self.kind
        }

        fn length(&self) -> usize {
            self.len
        }

        fn transition_elements_kind(&mut self, to: ElementKind) {
            self.kind = to;
        }

        fn allocation_site(&self) -> Option<&Rc<AllocationSite>> {
            self.site.as_ref()
        }
    }

    #[test]
    fn site_absorbs_generalization() {
        let site = Rc::new(AllocationSite::new());
        let mut slot = FeedbackSlot::new(FeedbackSlotKind::StoreKeyedSloppy);

        let mut doubles = TestArray::from_site(&site, 5);
        observe_keyed_store(&mut doubles, 0, ElementValue::Double, LayoutId::ARRAY, None, 4);
        assert_eq!(doubles.kind, ElementKind::HoleyDouble);

        observe_keyed_store(&mut doubles, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);
        assert_eq!(slot.state().descriptor(), "MONOMORPHIC(HOLEY_DOUBLE_ELEMENTS)");

        // New arrays from the same site already start generalized.
        let mut smis = TestArray::from_site(&site, 5);
        assert_eq!(smis.kind, ElementKind::HoleyDouble);
        observe_keyed_store(&mut smis, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);
        assert_eq!(slot.state().descriptor(), "MONOMORPHIC(HOLEY_DOUBLE_ELEMENTS)");
    }

    #[test]
    fn site_links_array_to_recorded_kind() {
        let site = Rc::new(AllocationSite::new());
        let mut slot = FeedbackSlot::new(FeedbackSlotKind::StoreKeyedSloppy);
        let mut other = TestArray::without_site(ElementKind::HoleyDouble, 5);
        observe_keyed_store(&mut other, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);

        let mut fresh = TestArray::from_site(&site, 5);
        assert_eq!(fresh.kind, ElementKind::HoleySmi);
        let kind = observe_keyed_store(&mut fresh, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);
        assert_eq!(kind, ElementKind::HoleyDouble);
        assert_eq!(site.kind(), ElementKind::HoleyDouble);
        assert_eq!(slot.state().descriptor(), "MONOMORPHIC(HOLEY_DOUBLE_ELEMENTS)");
    }

    #[test]
    fn without_site_goes_polymorphic() {
        let mut slot = FeedbackSlot::new(FeedbackSlotKind::StoreKeyedSloppy);
        let mut doubles = TestArray::without_site(ElementKind::HoleyDouble, 5);
        let mut smis = TestArray::without_site(ElementKind::HoleySmi, 5);
        observe_keyed_store(&mut doubles, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);
        observe_keyed_store(&mut smis, 0, ElementValue::Smi, LayoutId::ARRAY, Some(&mut slot), 4);
        assert_eq!(smis.kind, ElementKind::HoleySmi);
        assert_eq!(
            slot.state().descriptor(),
            "POLYMORPHIC[HOLEY_DOUBLE_ELEMENTS, HOLEY_SMI_ELEMENTS]"
        );
    }

    #[test]
    fn store_past_end_makes_holey() {
        let mut packed = TestArray::without_site(ElementKind::PackedSmi, 2);
        observe_keyed_store(&mut packed, 2, ElementValue::Smi, LayoutId::ARRAY, None, 4);
        assert_eq!(packed.kind, ElementKind::PackedSmi);
        observe_keyed_store(&mut packed, 4, ElementValue::Smi, LayoutId::ARRAY, None, 4);
        assert_eq!(packed.kind, ElementKind::HoleySmi);
    }

    #[test]
    fn kinds_never_narrow() {
        let mut array = TestArray::without_site(ElementKind::PackedGeneric, 3);
        observe_keyed_store(&mut array, 0, ElementValue::Smi, LayoutId::ARRAY, None, 4);
        assert_eq!(array.kind, ElementKind::PackedGeneric);
    }

    #[test]
    fn loads_do_not_transition() {
        let mut slot = FeedbackSlot::new(FeedbackSlotKind::LoadKeyed);
        observe_keyed_load(Shape::array(ElementKind::HoleySmi), Some(&mut slot), 4);
        observe_keyed_load(Shape::array(ElementKind::HoleyDouble), Some(&mut slot), 4);
        assert_eq!(slot.state().descriptor(), "MONOMORPHIC(HOLEY_DOUBLE_ELEMENTS)");
    }
}
