#![forbid(unsafe_code)]

//! Reference host configuration.

/// Environment variable that turns on multi-root output.
pub const FRAGMENTS_ENV: &str = "AMBIT_HARNESS_FRAGMENTS";

/// Configuration for a [`TestRenderer`](crate::TestRenderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Report multi-root output support to components.
    pub fragments: bool,
    /// Upper bound on forced-update passes per flush. Requests raised by the
    /// last allowed pass stay queued.
    pub max_flush_passes: usize,
    /// Record lifecycle events in the renderer's event log.
    pub record_events: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            fragments: false,
            max_flush_passes: 32,
            record_events: true,
        }
    }
}

impl HarnessConfig {
    /// Defaults, with `fragments` taken from [`FRAGMENTS_ENV`].
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fragments = get_env(FRAGMENTS_ENV)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
            .unwrap_or(false);
        Self::default().with_fragments(fragments)
    }

    #[must_use]
    pub fn with_fragments(mut self, fragments: bool) -> Self {
        self.fragments = fragments;
        self
    }

    /// Set the pass limit. Zero is raised to one.
    #[must_use]
    pub fn with_max_flush_passes(mut self, passes: usize) -> Self {
        self.max_flush_passes = passes.max(1);
        self
    }

    #[must_use]
    pub fn with_record_events(mut self, record: bool) -> Self {
        self.record_events = record;
        self
    }
}
