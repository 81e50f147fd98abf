//! RAII lease over a pooled handle

/// RAII guard representing a leased handle.
///
/// When the lease is dropped, the on-drop callback receives `Some(handle)`
/// and returns it to the pool. [`Lease::take`] detaches the handle from the
/// pool instead: the callback receives `None` so the pool can free the
/// capacity slot, and the caller keeps the handle.
pub struct Lease<T> {
    handle: Option<T>,
    on_drop: Option<Box<dyn FnOnce(Option<T>) + Send>>,
}

impl<T> Lease<T> {
    /// Create a new lease wrapping `handle` with a drop callback.
    pub(crate) fn new<F>(handle: T, on_drop: F) -> Self
    where
        F: FnOnce(Option<T>) + Send + 'static,
    {
        Self {
            handle: Some(handle),
            on_drop: Some(Box::new(on_drop)),
        }
    }

    /// Take the handle out of the lease, detaching it from the pool.
    ///
    /// The pool frees the handle's capacity slot and will never see the
    /// handle again; the caller becomes responsible for tearing it down.
    #[must_use]
    pub fn take(mut self) -> T {
        let handle = self.handle.take().expect("lease used after take");
        if let Some(on_drop) = self.on_drop.take() {
            on_drop(None);
        }
        handle
    }
}

impl<T> std::ops::Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.handle.as_ref().expect("lease used after take")
    }
}

impl<T> std::ops::DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.handle.as_mut().expect("lease used after take")
    }
}

impl<T> Drop for Lease<T> {
    fn drop(&mut self) {
        if let (Some(handle), Some(on_drop)) = (self.handle.take(), self.on_drop.take()) {
            on_drop(Some(handle));
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lease").field("handle", &self.handle).finish()
    }
}
