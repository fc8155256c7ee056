use once_cell::sync::OnceCell;

/// A value derived once per generation run.
///
/// The first caller runs the delegate; concurrent callers block until it is
/// done and then share the cached value. The delegate runs at most once.
pub struct Memoized<T, F = Box<dyn Fn() -> T + Send + Sync>> {
    value: OnceCell<T>,
    delegate: F,
}

impl<T, F: Fn() -> T> Memoized<T, F> {
    pub fn new(delegate: F) -> Self {
        Self { value: OnceCell::new(), delegate }
    }
    pub fn get(&self) -> &T {
        self.value.get_or_init(|| (self.delegate)())
    }
    pub fn is_computed(&self) -> bool {
        self.value.get().is_some()
    }
}

impl<T: std::fmt::Debug, F> std::fmt::Debug for Memoized<T, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memoized").field("value", &self.value.get()).finish()
    }
}
