// Object layouts are learned from property insertion order. Every layout is a
// node of a transition tree rooted at the empty object; adding a property
// follows (or creates) the edge labelled with the property name.
//
//     [empty] --a--> [#2] --b--> [#3]
//                      \
//                       --c--> [#4]
//
// Two objects built by adding the same names in the same order share a
// layout. Arrays do not take part in the tree and share `LayoutId::ARRAY`.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(u32);

impl LayoutId {
    pub const ARRAY: LayoutId = LayoutId(0);
    pub const EMPTY_OBJECT: LayoutId = LayoutId(1);

    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for LayoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Debug)]
pub struct LayoutTable {
    transitions: HashMap<(LayoutId, String), LayoutId>,
    next: u32,
}

impl Default for LayoutTable {
    fn default() -> Self {
        Self::new()
    }
}

impl LayoutTable {
    pub fn new() -> Self {
        LayoutTable {
            transitions: HashMap::new(),
            next: LayoutId::EMPTY_OBJECT.0 + 1,
        }
    }

    pub fn add_property(&mut self, from: LayoutId, name: &str) -> LayoutId {
        if let Some(id) = self.transitions.get(&(from, name.to_string())) {
            return *id;
        }
        let id = LayoutId(self.next);
        self.next += 1;
        log::trace!("layout {} + '{}' -> {}", from, name, id);
        self.transitions.insert((from, name.to_string()), id);
        id
    }

    pub fn layout_for<'a, I>(&mut self, names: I) -> LayoutId
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().fold(LayoutId::EMPTY_OBJECT, |layout, name| self.add_property(layout, name))
    }
}
