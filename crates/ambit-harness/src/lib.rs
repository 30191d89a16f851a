#![forbid(unsafe_code)]

//! Reference host and fixtures for testing ambit contexts.
//!
//! - [`TestRenderer`]: retained tree with positional reconciliation and a
//!   batched forced-update queue.
//! - [`EventLog`]: ordered lifecycle events, exportable as JSONL.
//! - [`markup`]: flattened host output, markup serialization, descendant
//!   class selectors.
//! - [`fixtures`]: helper components (update blockers, ambient injection).

pub mod config;
pub mod events;
pub mod fixtures;
pub mod markup;
pub mod renderer;

pub use config::HarnessConfig;
pub use events::{EventLog, LifecycleEvent, Phase};
pub use fixtures::{Blocker, Inject, RenderCounter, blocker, inject};
pub use markup::{HostNode, QueryError, Selector};
pub use renderer::{FlushReport, TestRenderer};
