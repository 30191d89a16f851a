#![forbid(unsafe_code)]

//! Change bitmasks and the policies that compute them.
//!
//! A [`ChangePolicy`] compares the previous and next value of a context and
//! reports which "aspects" of the value changed as a [`ChangedBits`] set.
//! Consumers declare the aspects they read through their observed bits and
//! skip notifications that do not intersect them.
//!
//! # Invariants
//!
//! 1. [`ChangedBits::ALL`] is `2^30 - 1`; the top two bits of the `u32` are
//!    never set by the default policy.
//! 2. [`ChangedBits::NONE`] means "nothing changed" and never intersects any
//!    observed mask.
//! 3. The default policy ([`full_change`]) reports `ALL` for every change, so
//!    observed bits have no filtering effect on contexts without a policy.

use std::rc::Rc;

bitflags::bitflags! {
    /// Set of changed aspects reported by a [`ChangePolicy`].
    ///
    /// Bit `k` set means aspect `k` of the value changed. Arbitrary user bits
    /// are carried through with [`ChangedBits::from_bits_retain`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChangedBits: u32 {
        /// Every aspect changed.
        const ALL = 0x3FFF_FFFF;
    }
}

impl ChangedBits {
    /// No aspect changed.
    pub const NONE: Self = Self::empty();

    /// Build a mask from raw bits, keeping bits that have no named flag.
    #[inline]
    #[must_use]
    pub const fn from_raw(bits: u32) -> Self {
        Self::from_bits_retain(bits)
    }

    /// True when a subscriber observing `self` should see a change of
    /// `changed`.
    #[inline]
    #[must_use]
    pub const fn observes(self, changed: Self) -> bool {
        self.bits() & changed.bits() != 0
    }
}

impl Default for ChangedBits {
    fn default() -> Self {
        Self::ALL
    }
}

/// Compares an old and new value and reports which aspects changed.
///
/// Policies must be pure; they are called once per value-changing push.
pub type ChangePolicy<T> = Rc<dyn Fn(&T, &T) -> ChangedBits>;

/// The default policy: any change is a change of every aspect.
#[must_use]
pub fn full_change<T>(_old: &T, _new: &T) -> ChangedBits {
    ChangedBits::ALL
}

/// Wrap [`full_change`] as a shareable [`ChangePolicy`].
#[must_use]
pub fn default_policy<T: 'static>() -> ChangePolicy<T> {
    Rc::new(full_change::<T>)
}

/// Build a policy from a closure.
pub fn policy<T, F>(f: F) -> ChangePolicy<T>
where
    F: Fn(&T, &T) -> ChangedBits + 'static,
{
    Rc::new(f)
}
