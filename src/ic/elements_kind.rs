use std::fmt;

/// Smallest value representable as a small integer element.
pub const SMI_MIN: f64 = -1_073_741_824.0;
/// Largest value representable as a small integer element.
pub const SMI_MAX: f64 = 1_073_741_823.0;

/// Representation class of an array's backing store.
///
/// Kinds form a lattice: the value rank (`Smi < Double < Generic`) times
/// packed/holey. An array's kind only ever moves up the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    PackedSmi,
    HoleySmi,
    PackedDouble,
    HoleyDouble,
    PackedGeneric,
    HoleyGeneric,
}

/// Representation class of a single stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementValue {
    Smi,
    Double,
    Generic,
}

/// Whether `n` fits the 31-bit small-integer representation. `-0` does not.
pub fn is_smi(n: f64) -> bool {
    n.fract() == 0.0 && (SMI_MIN..=SMI_MAX).contains(&n) && !(n == 0.0 && n.is_sign_negative())
}

impl ElementValue {
    pub fn of_number(n: f64) -> Self {
        if is_smi(n) { ElementValue::Smi } else { ElementValue::Double }
    }

    fn rank(self) -> u8 {
        match self {
            ElementValue::Smi => 0,
            ElementValue::Double => 1,
            ElementValue::Generic => 2,
        }
    }
}

impl ElementKind {
    pub const ALL: [ElementKind; 6] = [
        ElementKind::PackedSmi,
        ElementKind::HoleySmi,
        ElementKind::PackedDouble,
        ElementKind::HoleyDouble,
        ElementKind::PackedGeneric,
        ElementKind::HoleyGeneric,
    ];

    fn from_parts(rank: u8, holey: bool) -> Self {
        match (rank, holey) {
            (0, false) => ElementKind::PackedSmi,
            (0, true) => ElementKind::HoleySmi,
            (1, false) => ElementKind::PackedDouble,
            (1, true) => ElementKind::HoleyDouble,
            (_, false) => ElementKind::PackedGeneric,
            (_, true) => ElementKind::HoleyGeneric,
        }
    }

    fn rank(self) -> u8 {
        match self {
            ElementKind::PackedSmi | ElementKind::HoleySmi => 0,
            ElementKind::PackedDouble | ElementKind::HoleyDouble => 1,
            ElementKind::PackedGeneric | ElementKind::HoleyGeneric => 2,
        }
    }

    /// The packed kind that holds exactly one value of the given class.
    pub fn for_value(value: ElementValue) -> Self {
        Self::from_parts(value.rank(), false)
    }

    pub fn is_holey(self) -> bool {
        matches!(self, ElementKind::HoleySmi | ElementKind::HoleyDouble | ElementKind::HoleyGeneric)
    }

    pub fn is_smi(self) -> bool {
        self.rank() == 0
    }

    pub fn is_double(self) -> bool {
        self.rank() == 1
    }

    pub fn is_generic(self) -> bool {
        self.rank() == 2
    }

    pub fn to_holey(self) -> Self {
        Self::from_parts(self.rank(), true)
    }

    /// Least upper bound of two kinds.
    pub fn join(self, other: ElementKind) -> Self {
        Self::from_parts(self.rank().max(other.rank()), self.is_holey() || other.is_holey())
    }

    /// Strictly above `other` in the lattice.
    pub fn is_more_general_than(self, other: ElementKind) -> bool {
        self != other && self.join(other) == self
    }

    /// Whether a value of class `value` can be stored without a transition.
    pub fn subsumes(self, value: ElementValue) -> bool {
        self.rank() >= value.rank()
    }

    pub fn name(self) -> &'static str {
        match self {
            ElementKind::PackedSmi => "PACKED_SMI_ELEMENTS",
            ElementKind::HoleySmi => "HOLEY_SMI_ELEMENTS",
            ElementKind::PackedDouble => "PACKED_DOUBLE_ELEMENTS",
            ElementKind::HoleyDouble => "HOLEY_DOUBLE_ELEMENTS",
            ElementKind::PackedGeneric => "PACKED_ELEMENTS",
            ElementKind::HoleyGeneric => "HOLEY_ELEMENTS",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
