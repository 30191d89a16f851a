#![forbid(unsafe_code)]

//! Logging bootstrap.
//!
//! Library code only emits `tracing` events. Binaries and test suites that
//! want to see them call [`init`] once (feature `subscriber`), which installs
//! a `tracing-subscriber` fmt subscriber filtered by `AMBIT_LOG`.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `AMBIT_LOG` | `EnvFilter` directive, e.g. `ambit=debug` |
//! | `AMBIT_LOG_JSON` | `1`/`true`/`yes`/`on` switches to JSON lines |

/// Environment variable holding the filter directive.
pub const LOG_ENV: &str = "AMBIT_LOG";
/// Environment variable enabling JSON output.
pub const LOG_JSON_ENV: &str = "AMBIT_LOG_JSON";

#[inline]
fn env_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive.
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    pub json: bool,
    /// Route output through the libtest capture writer.
    pub test_writer: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
            json: false,
            test_writer: false,
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `AMBIT_LOG` / `AMBIT_LOG_JSON`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom lookup.
    #[must_use]
    pub fn from_env_with<F>(get_env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(filter) = get_env(LOG_ENV).filter(|f| !f.trim().is_empty()) {
            config.filter = filter;
        }
        if let Some(json) = get_env(LOG_JSON_ENV) {
            config.json = env_flag(&json);
        }
        config
    }

    /// Set the filter directive.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Enable or disable JSON output.
    #[must_use]
    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    /// Write through the test harness capture.
    #[must_use]
    pub fn for_tests(mut self) -> Self {
        self.test_writer = true;
        self
    }
}

/// Install a global fmt subscriber. Returns `false` if one was already set.
#[cfg(feature = "subscriber")]
pub fn init(config: &LogConfig) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&config.filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match (config.json, config.test_writer) {
        (true, true) => builder.json().with_test_writer().try_init().is_ok(),
        (true, false) => builder.json().try_init().is_ok(),
        (false, true) => builder.with_test_writer().try_init().is_ok(),
        (false, false) => builder.try_init().is_ok(),
    }
}
