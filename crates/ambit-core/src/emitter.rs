#![forbid(unsafe_code)]

//! Value emitter: the current value of one provider plus its subscribers.
//!
//! # Design
//!
//! [`Emitter<T>`] keeps the value in shared, reference-counted storage
//! (`Rc<RefCell<..>>`) so a provider and the consumers below it can hold
//! handles to the same state. A push that changes the value (by `PartialEq`)
//! asks the emitter's [`ChangePolicy`] which aspects changed and hands the
//! value plus that [`ChangedBits`] set to every updater, in registration
//! order.
//!
//! Registering an updater delivers the current value to it immediately with
//! [`ChangedBits::ALL`], so a freshly mounted consumer is never behind.
//!
//! # Performance
//!
//! | Operation      | Complexity                  |
//! |----------------|-----------------------------|
//! | `get()`        | O(1) + clone                |
//! | `val(Some(_))` | O(S²) worst case, S = subscribers |
//! | `register()`   | O(1) amortized + one call   |
//! | `unregister()` | O(S)                        |
//!
//! # Failure Modes
//!
//! - **Re-entrant push**: an updater may push a new value. The nested pass
//!   notifies everyone with the newer value, then the outer pass resumes
//!   with its own value. Every subscriber is called once per changing push;
//!   one later in the list may see the nested value first.
//! - **Unregister during a pass**: updaters removed earlier in the same pass
//!   are skipped; the pass never double-invokes an entry.
//! - **Unknown updater**: `unregister` of something never registered is a
//!   silent no-op.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::trace;

use crate::bits::{ChangePolicy, ChangedBits, default_policy};
use crate::diagnostics::{Diagnostic, SharedSink};

/// Callback receiving the new value and the aspects that changed.
pub type Updater<T> = Rc<dyn Fn(&T, ChangedBits)>;

/// Anything a consumer can bind to: a live [`Emitter`] or [`NoProvider`].
pub trait ValueEmitter<T> {
    /// Add `updater` and deliver the current value to it right away.
    fn register(&self, updater: &Updater<T>);

    /// Remove `updater`. Unknown updaters are ignored.
    fn unregister(&self, updater: &Updater<T>);

    /// Read (`None`) or push (`Some`) the value. Returns the value after the
    /// call, or `None` when there is no value to report.
    fn val(&self, value: Option<T>) -> Option<T>;
}

struct Registration<T> {
    id: u64,
    updater: Updater<T>,
}

struct EmitterInner<T> {
    value: T,
    version: u64,
    next_id: u64,
    updaters: Vec<Registration<T>>,
    policy: ChangePolicy<T>,
}

impl<T> EmitterInner<T> {
    fn is_registered(&self, id: u64) -> bool {
        self.updaters.iter().any(|r| r.id == id)
    }
}

/// The current value of one provider instance and its subscribers.
///
/// Cloning an `Emitter` creates a new handle to the **same** state.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 per value-changing push.
/// 2. Pushing a value equal to the current one is a no-op.
/// 3. Updaters are notified in registration order.
/// 4. `register` invokes the new updater once, synchronously, with
///    [`ChangedBits::ALL`].
pub struct Emitter<T> {
    inner: Rc<RefCell<EmitterInner<T>>>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Emitter")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .field("subscriber_count", &inner.updaters.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Emitter<T> {
    /// Create an emitter using `policy` to compute change bits.
    #[must_use]
    pub fn new(value: T, policy: ChangePolicy<T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EmitterInner {
                value,
                version: 0,
                next_id: 0,
                updaters: Vec::new(),
                policy,
            })),
        }
    }

    /// Create an emitter that treats every change as total.
    #[must_use]
    pub fn with_default_policy(value: T) -> Self {
        Self::new(value, default_policy())
    }

    /// Clone of the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Access the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Push `value`. Returns the value held afterwards.
    pub fn set(&self, value: T) -> T {
        let bits = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return inner.value.clone();
            }
            let bits = (inner.policy)(&inner.value, &value);
            inner.value = value;
            inner.version += 1;
            bits
        };
        self.notify(bits);
        self.get()
    }

    /// Two-mode accessor: `None` reads, `Some(v)` pushes `v`.
    pub fn val(&self, value: Option<T>) -> T {
        match value {
            Some(value) => self.set(value),
            None => self.get(),
        }
    }

    /// Add `updater` and immediately deliver the current value with
    /// [`ChangedBits::ALL`].
    pub fn register(&self, updater: &Updater<T>) {
        let value = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.updaters.push(Registration {
                id,
                updater: Rc::clone(updater),
            });
            inner.value.clone()
        };
        updater(&value, ChangedBits::ALL);
    }

    /// Remove every registration of this exact updater (pointer identity).
    pub fn unregister(&self, updater: &Updater<T>) {
        self.inner
            .borrow_mut()
            .updaters
            .retain(|r| !Rc::ptr_eq(&r.updater, updater));
    }

    /// Number of value-changing pushes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of registered updaters.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().updaters.len()
    }

    /// True if both handles share the same state.
    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    fn notify(&self, bits: ChangedBits) {
        // Snapshot so updaters can register/unregister while we iterate.
        let (snapshot, value, version) = {
            let inner = self.inner.borrow();
            let snapshot: Vec<(u64, Updater<T>)> = inner
                .updaters
                .iter()
                .map(|r| (r.id, Rc::clone(&r.updater)))
                .collect();
            (snapshot, inner.value.clone(), inner.version)
        };
        // A nested push inside an updater runs its own pass; this pass still
        // delivers `value` to the rest of the snapshot.
        trace!(
            subscribers = snapshot.len(),
            bits = bits.bits(),
            version,
            "emitter notify"
        );

        for (id, updater) in &snapshot {
            if !self.inner.borrow().is_registered(*id) {
                continue;
            }
            updater(&value, bits);
        }
    }
}

impl<T: Clone + PartialEq + 'static> ValueEmitter<T> for Emitter<T> {
    fn register(&self, updater: &Updater<T>) {
        Emitter::register(self, updater);
    }

    fn unregister(&self, updater: &Updater<T>) {
        Emitter::unregister(self, updater);
    }

    fn val(&self, value: Option<T>) -> Option<T> {
        Some(Emitter::val(self, value))
    }
}

/// Stand-in emitter for consumers with no enclosing provider.
///
/// `register` reports [`Diagnostic::MissingProvider`] (unless silent) and
/// does nothing else. `unregister` and `val` are no-ops.
#[derive(Clone)]
pub struct NoProvider {
    sink: Option<SharedSink>,
}

impl NoProvider {
    /// A stub that reports to `sink` on every registration.
    #[must_use]
    pub fn new(sink: SharedSink) -> Self {
        Self { sink: Some(sink) }
    }

    /// A stub that never reports (provider-optional contexts).
    #[must_use]
    pub fn silent() -> Self {
        Self { sink: None }
    }
}

impl std::fmt::Debug for NoProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoProvider")
            .field("silent", &self.sink.is_none())
            .finish()
    }
}

impl<T> ValueEmitter<T> for NoProvider {
    fn register(&self, _updater: &Updater<T>) {
        if let Some(sink) = &self.sink {
            sink.warn(Diagnostic::MissingProvider);
        }
    }

    fn unregister(&self, _updater: &Updater<T>) {}

    fn val(&self, _value: Option<T>) -> Option<T> {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
