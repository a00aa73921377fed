//! In-flight request tracking shared by the cart and wishlist coordinators.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts requests in flight. Loading while the count is above zero.
#[derive(Debug, Default)]
pub struct Loading(AtomicUsize);

impl Loading {
    /// Mark a request in flight until the returned guard drops, on success,
    /// failure or cancellation alike.
    pub fn start(&self) -> LoadingGuard<'_> {
        self.0.fetch_add(1, Ordering::SeqCst);
        LoadingGuard(&self.0)
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.0.load(Ordering::SeqCst) > 0
    }
}

/// Marks a request in flight for as long as it lives.
#[must_use = "the request counts as in flight only while the guard is held"]
pub struct LoadingGuard<'a>(&'a AtomicUsize);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
