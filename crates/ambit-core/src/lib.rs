#![forbid(unsafe_code)]

//! Core: value emitters, change bitmasks, and ambient data for contexts.
//!
//! # Role in ambit
//! `ambit-core` holds everything a context needs that does not depend on a
//! render tree. The `ambit` crate builds providers and consumers on top of
//! it against a host's component interface.
//!
//! # Primary responsibilities
//! - **Emitter**: current value, ordered updaters, change suppression.
//! - **ChangedBits**: which aspects of a value changed, and who cares.
//! - **AmbientData**: persistent keyed map threaded down the tree.
//! - **ContextId**: process-unique keys into that map.
//! - **Diagnostics**: where degraded-operation reports go.

pub mod ambient;
pub mod bits;
pub mod diagnostics;
pub mod emitter;
pub mod identity;
pub mod logging;
pub mod value;

pub use ambient::AmbientData;
pub use bits::{ChangePolicy, ChangedBits, default_policy, full_change, policy};
pub use diagnostics::{
    CollectingSink, Diagnostic, DiagnosticSink, SharedSink, SilentSink, TracingSink,
};
pub use emitter::{Emitter, NoProvider, Updater, ValueEmitter};
pub use identity::ContextId;
pub use value::Shared;
