#![forbid(unsafe_code)]

//! Diagnostic sink for degraded-operation paths.
//!
//! Nothing in a context ever fails hard. A consumer with no provider, a
//! consumer with two render sources, or one with none at all keeps running
//! and reports a [`Diagnostic`] to the sink configured on its context.
//!
//! # Sinks
//!
//! | Sink | Behavior |
//! |------|----------|
//! | [`TracingSink`] | `tracing::warn!` (default) |
//! | [`CollectingSink`] | Records the rendered messages in memory |
//! | [`SilentSink`] | Drops everything |

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A degraded-operation report.
///
/// `Display` renders the exact message text; tests and log scrapers match
/// on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// A consumer mounted with no enclosing provider of its context.
    MissingProvider,
    /// A consumer got both a child and a different render function.
    ConflictingRenderSources,
    /// A consumer got neither a function child nor a render function.
    MissingRenderFunction,
}

impl Diagnostic {
    /// Verbatim message text.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingProvider => "Consumer used without a Provider",
            Self::ConflictingRenderSources => {
                "Both children and a render function are defined. Children will be used"
            }
            Self::MissingRenderFunction => {
                "Consumer is expecting a function as one and only child but didn't find any"
            }
        }
    }

    /// Short stable code for structured logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::MissingProvider => "missing_provider",
            Self::ConflictingRenderSources => "conflicting_render_sources",
            Self::MissingRenderFunction => "missing_render_function",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Destination for [`Diagnostic`] reports.
pub trait DiagnosticSink {
    /// Report a degraded-operation condition.
    fn warn(&self, diagnostic: Diagnostic);
}

/// Forwards diagnostics to `tracing` at WARN level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn warn(&self, diagnostic: Diagnostic) {
        tracing::warn!(code = diagnostic.code(), "{}", diagnostic.message());
    }
}

/// Drops every diagnostic.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl DiagnosticSink for SilentSink {
    fn warn(&self, _diagnostic: Diagnostic) {}
}

/// Records diagnostics in call order.
///
/// Cloning shares the same record.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    records: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All diagnostics recorded so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.records.borrow().clone()
    }

    /// Rendered messages recorded so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.records
            .borrow()
            .iter()
            .map(|d| d.message().to_string())
            .collect()
    }

    /// Number of times `diagnostic` was reported.
    #[must_use]
    pub fn count(&self, diagnostic: Diagnostic) -> usize {
        self.records
            .borrow()
            .iter()
            .filter(|d| **d == diagnostic)
            .count()
    }

    /// Total number of reports.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    /// True if nothing was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn warn(&self, diagnostic: Diagnostic) {
        tracing::debug!(code = diagnostic.code(), "diagnostic collected");
        self.records.borrow_mut().push(diagnostic);
    }
}

/// Shared handle to a sink, as stored in context options.
pub type SharedSink = Rc<dyn DiagnosticSink>;
