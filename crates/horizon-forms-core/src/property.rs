//! Change-detecting value cells.
//!
//! Item values, hint texts and visual attributes live in a [`Property`]. A
//! write through [`Property::set`] reports whether the stored value actually
//! changed, so the owner notifies its listener only for real edits. Loading a
//! value that must not count as an edit goes through [`Property::set_silent`].

use std::fmt;

use parking_lot::RwLock;

/// A shared value cell with change detection.
///
/// `Property<T>` is `Send + Sync` whenever `T` is.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a property holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// A copy of the current value.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Overwrite the value without comparing.
    pub fn set_silent(&self, value: T) {
        *self.value.write() = value;
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Store `value`, returning `true` if it differs from the current value.
    ///
    /// An equal value leaves the property untouched.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current == value {
            return false;
        }
        *current = value;
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.value.read(), f)
    }
}

static_assertions::assert_impl_all!(Property<String>: Send, Sync);
