/// Engine-wide tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Number of distinct shapes a keyed access site may record before it is
    /// considered megamorphic.
    pub max_polymorphism: usize,
    /// Enables `%Name(args)` runtime intrinsics in parsed source.
    pub allow_natives_syntax: bool,
    /// When false, feedback vectors are allocated on a function's first call.
    pub lazy_feedback_allocation: bool,
    /// Invocation count at which a lazily allocated feedback vector appears.
    pub feedback_allocation_threshold: u32,
    /// Link arrays to the allocation site that created them.
    pub track_allocation_sites: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_polymorphism: 4,
            allow_natives_syntax: false,
            lazy_feedback_allocation: true,
            feedback_allocation_threshold: 8,
            track_allocation_sites: true,
        }
    }
}

impl EngineConfig {
    pub fn with_natives_syntax(mut self, enabled: bool) -> Self {
        self.allow_natives_syntax = enabled;
        self
    }

    pub fn with_max_polymorphism(mut self, max: usize) -> Self {
        self.max_polymorphism = max.max(1);
        self
    }

    pub fn with_lazy_feedback_allocation(mut self, lazy: bool) -> Self {
        self.lazy_feedback_allocation = lazy;
        self
    }

    pub fn with_allocation_site_tracking(mut self, enabled: bool) -> Self {
        self.track_allocation_sites = enabled;
        self
    }
}
