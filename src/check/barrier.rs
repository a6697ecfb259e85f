//! Reference count of outstanding work with a one-shot finalizer
//!
//! Every dispatched lookup holds one reference, and so does the dispatch
//! loop while it is still enumerating targets. The finalizer runs exactly
//! once, when the last reference is released. Holding the loop's own
//! reference keeps an early completion from reaching zero while targets
//! are still being dispatched.
//!
//! The barrier lives on a single thread (`Rc`/`Cell`) and is shared by the
//! local tasks of one run.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

type Finalizer = Box<dyn FnOnce()>;

struct Inner {
    outstanding: Cell<usize>,
    finalized: Cell<bool>,
    finalizer: RefCell<Option<Finalizer>>,
}

/// Join point over a dynamically growing set of operations
#[derive(Clone)]
pub struct CompletionBarrier {
    inner: Rc<Inner>,
}

impl CompletionBarrier {
    pub fn new<F>(finalize: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            inner: Rc::new(Inner {
                outstanding: Cell::new(0),
                finalized: Cell::new(false),
                finalizer: RefCell::new(Some(Box::new(finalize))),
            }),
        }
    }

    /// Take one reference.
    ///
    /// # Panics
    /// If the barrier has already finalized; work started after that point
    /// would never be waited for.
    pub fn increment(&self) {
        assert!(
            !self.inner.finalized.get(),
            "completion barrier acquired after finalization"
        );
        self.inner.outstanding.set(self.inner.outstanding.get() + 1);
    }

    /// Release one reference, finalizing when it was the last one.
    ///
    /// # Panics
    /// If no reference is held. An unmatched release means a completion was
    /// counted twice.
    pub fn decrement(&self) {
        let outstanding = self.inner.outstanding.get();
        assert!(
            outstanding > 0,
            "completion barrier released more often than acquired"
        );

        let outstanding = outstanding - 1;
        self.inner.outstanding.set(outstanding);
        if outstanding > 0 {
            return;
        }

        self.inner.finalized.set(true);
        // Take the finalizer out before calling it so it may touch the barrier.
        let finalizer = self.inner.finalizer.borrow_mut().take();
        if let Some(finalize) = finalizer {
            finalize();
        }
    }

    /// Discard the finalizer without running it.
    ///
    /// Outstanding references may still be released afterwards; reaching
    /// zero then does nothing.
    pub fn cancel(&self) {
        self.inner.finalizer.borrow_mut().take();
    }

    /// Take one reference, released when the guard drops
    pub fn acquire(&self) -> BarrierGuard {
        self.increment();
        BarrierGuard {
            barrier: self.clone(),
        }
    }

    pub fn outstanding(&self) -> usize {
        self.inner.outstanding.get()
    }

    pub fn is_finalized(&self) -> bool {
        self.inner.finalized.get()
    }
}

/// One held reference on a [`CompletionBarrier`]
#[must_use = "dropping the guard releases the reference immediately"]
pub struct BarrierGuard {
    barrier: CompletionBarrier,
}

impl BarrierGuard {
    /// Release the reference now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for BarrierGuard {
    fn drop(&mut self) {
        self.barrier.decrement();
    }
}
