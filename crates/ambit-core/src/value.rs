#![forbid(unsafe_code)]

//! Reference-identity handle for context values.
//!
//! Emitters and providers compare values with `PartialEq`. For plain data
//! that is structural equality: pushing `{ prop: "a" }` twice is a no-op.
//! Wrap a value in [`Shared`] to compare by instance instead, so that two
//! separately built but equal values still count as a change.

use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// An `Rc`-backed value whose equality is pointer identity.
pub struct Shared<T: ?Sized>(Rc<T>);

impl<T> Shared<T> {
    /// Allocate a new instance.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self(Rc::new(value))
    }
}

impl<T: ?Sized> Shared<T> {
    /// True if both handles point at the same instance.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    /// The underlying `Rc`.
    #[must_use]
    pub fn as_rc(&self) -> &Rc<T> {
        &self.0
    }
}

impl<T: ?Sized> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: ?Sized> PartialEq for Shared<T> {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Eq for Shared<T> {}

impl<T: ?Sized> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> From<Rc<T>> for Shared<T> {
    fn from(rc: Rc<T>) -> Self {
        Self(rc)
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Shared<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Shared").field(&&*self.0).finish()
    }
}
