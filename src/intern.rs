//! String interning for category names.
//!
//! Category names repeat across every stored document and every tree node.
//! The pool hands out shared `Arc<str>` instances so identical names share
//! one allocation. A pool belongs to one engine instance and is passed
//! explicitly to the tree and the engine.

use std::sync::Arc;

use ahash::AHashSet;
use parking_lot::Mutex;

/// A thread-safe pool of interned strings.
#[derive(Debug, Default)]
pub struct InternPool {
    strings: Mutex<AHashSet<Arc<str>>>,
}

impl InternPool {
    pub fn new() -> Self {
        InternPool {
            strings: Mutex::new(AHashSet::new()),
        }
    }

    /// Return the shared instance equal to `value`, inserting it if needed.
    pub fn intern(&self, value: &str) -> Arc<str> {
        let mut strings = self.strings.lock();
        if let Some(existing) = strings.get(value) {
            return Arc::clone(existing);
        }
        let shared: Arc<str> = Arc::from(value);
        strings.insert(Arc::clone(&shared));
        shared
    }

    pub fn len(&self) -> usize {
        self.strings.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.lock().is_empty()
    }

    /// Drop every interned string. Existing `Arc`s stay valid.
    pub fn clear(&self) {
        self.strings.lock().clear();
    }
}
