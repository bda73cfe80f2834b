use super::ElementKind;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicUsize, Ordering};

static NEXT_SITE_ID: AtomicUsize = AtomicUsize::new(1);

/// Per construction-site record shared by every array created there.
///
/// The site's kind seeds arrays created later, so a transition observed on
/// one array is absorbed by its siblings at allocation time.
#[derive(Debug)]
pub struct AllocationSite {
    id: usize,
    kind: Cell<ElementKind>,
    transitions: RefCell<Vec<(ElementKind, ElementKind)>>,
    created: Cell<u32>,
}

impl Default for AllocationSite {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationSite {
    pub fn new() -> Self {
        AllocationSite {
            id: NEXT_SITE_ID.fetch_add(1, Ordering::Relaxed),
            kind: Cell::new(ElementKind::PackedSmi),
            transitions: RefCell::new(Vec::new()),
            created: Cell::new(0),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind.get()
    }

    pub fn transitions(&self) -> Vec<(ElementKind, ElementKind)> {
        self.transitions.borrow().clone()
    }

    pub fn created_count(&self) -> u32 {
        self.created.get()
    }

    /// Counts a new array and returns the kind it should start with.
    pub fn note_allocation(&self) -> ElementKind {
        self.created.set(self.created.get().saturating_add(1));
        self.kind.get()
    }

    /// Folds a transition observed on one of the site's arrays into the
    /// site's kind. Returns true when the site generalized.
    pub fn digest_transition(&self, to: ElementKind) -> bool {
        let current = self.kind.get();
        let next = current.join(to);
        if next == current {
            return false;
        }
        log::trace!("allocation site #{}: {} -> {}", self.id, current, next);
        self.kind.set(next);
        self.transitions.borrow_mut().push((current, next));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_only_generalizes() {
        let site = AllocationSite::new();
        assert!(site.digest_transition(ElementKind::HoleySmi));
        assert!(!site.digest_transition(ElementKind::PackedSmi));
        assert!(site.digest_transition(ElementKind::PackedDouble));
        assert_eq!(site.kind(), ElementKind::HoleyDouble);
        assert_eq!(
            site.transitions(),
            vec![
                (ElementKind::PackedSmi, ElementKind::HoleySmi),
                (ElementKind::HoleySmi, ElementKind::HoleyDouble)
            ]
        );
    }

    #[test]
    fn allocation_count() {
        let site = AllocationSite::new();
        assert_eq!(site.note_allocation(), ElementKind::PackedSmi);
        site.digest_transition(ElementKind::HoleyGeneric);
        assert_eq!(site.note_allocation(), ElementKind::HoleyGeneric);
        assert_eq!(site.created_count(), 2);
    }
}
