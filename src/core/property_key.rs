use std::fmt;

/// Symbols the engine knows about. User code cannot mint new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    Dispose,
    AsyncDispose,
}

impl WellKnownSymbol {
    pub fn description(self) -> &'static str {
        match self {
            WellKnownSymbol::Dispose => "Symbol.dispose",
            WellKnownSymbol::AsyncDispose => "Symbol.asyncDispose",
        }
    }
}

impl fmt::Display for WellKnownSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(WellKnownSymbol),
}

impl PropertyKey {
    /// Name used for layout transitions.
    pub fn layout_name(&self) -> String {
        match self {
            PropertyKey::String(s) => s.clone(),
            PropertyKey::Symbol(sym) => format!("@@{}", sym.description()),
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<WellKnownSymbol> for PropertyKey {
    fn from(sym: WellKnownSymbol) -> Self {
        PropertyKey::Symbol(sym)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => write!(f, "{}", s),
            PropertyKey::Symbol(sym) => write!(f, "[{}]", sym.description()),
        }
    }
}
