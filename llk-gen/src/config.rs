/// Limits applied while resolving conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildConfig {
    /// Global lookahead limit; per-symbol overrides never exceed it.
    pub lookahead: usize,
    /// Maximum nesting of conflicts a single lookahead thread may fork
    /// through.
    pub conflict_depth: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            lookahead: 4,
            conflict_depth: 8,
        }
    }
}

impl BuildConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    pub fn with_conflict_depth(mut self, conflict_depth: usize) -> Self {
        self.conflict_depth = conflict_depth;
        self
    }
}
