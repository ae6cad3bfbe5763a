use once_cell::sync::OnceCell;
use std::fmt;

/// What changed on an entity, so each cache can drop only the fields that depend on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    Rating,
    Attributes,
    Parent,
    Children,
    Flags,
    Definition,
}

/// A memoized derived value: empty until first read, emptied again on invalidation.
///
/// Never part of equality, so two entities with identical raw fields compare
/// equal whether or not their caches are warm.
#[derive(Clone)]
pub struct Cached<T>(OnceCell<T>);

impl<T> Cached<T> {
    pub fn new() -> Self {
        Self(OnceCell::new())
    }

    pub fn get_or_compute(&self, compute: impl FnOnce() -> T) -> &T {
        self.0.get_or_init(compute)
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }

    pub fn invalidate(&mut self) {
        self.0.take();
    }
}

impl<T: Clone> Cached<T> {
    pub fn get_cloned(&self, compute: impl FnOnce() -> T) -> T {
        self.get_or_compute(compute).clone()
    }
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PartialEq for Cached<T> {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Cached<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.get() {
            Some(value) => write!(f, "Cached({value:?})"),
            None => write!(f, "Cached(<unset>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_computes_once_until_invalidated() {
        let calls = Cell::new(0);
        let mut cached = Cached::new();
        let compute = || {
            calls.set(calls.get() + 1);
            42
        };

        assert!(!cached.is_set());
        assert_eq!(*cached.get_or_compute(compute), 42);
        assert_eq!(*cached.get_or_compute(compute), 42);
        assert_eq!(calls.get(), 1);

        cached.invalidate();
        assert!(!cached.is_set());
        assert_eq!(cached.get_cloned(compute), 42);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_cache_state_is_ignored_by_equality() {
        let warm = Cached::new();
        warm.get_or_compute(|| 1);
        assert_eq!(warm, Cached::<i32>::new());
    }
}
