//! Ordered fallback chains for field extraction
//!
//! Each extraction strategy returns `Option<T>`; a chain tries them in order
//! and keeps the first one that produces a value.

/// A named list of strategies, tried most-specific first
pub struct FallbackChain<'a, T> {
    steps: Vec<(&'static str, Box<dyn Fn() -> Option<T> + 'a>)>,
}

impl<'a, T> Default for FallbackChain<'a, T> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<'a, T> FallbackChain<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a strategy to the end of the chain
    pub fn or_try(mut self, name: &'static str, step: impl Fn() -> Option<T> + 'a) -> Self {
        self.steps.push((name, Box::new(step)));
        self
    }

    /// Runs the strategies in order, returning the first value produced
    /// together with the name of the strategy that produced it
    pub fn resolve_named(&self) -> Option<(&'static str, T)> {
        self.steps
            .iter()
            .find_map(|(name, step)| step().map(|value| (*name, value)))
    }

    /// Runs the strategies in order, returning the first value produced
    pub fn resolve(&self) -> Option<T> {
        self.resolve_named().map(|(_, value)| value)
    }
}

/// Treats an empty collection as "no result" so the chain moves on
pub fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}
