#![forbid(unsafe_code)]

//! Context factory.
//!
//! [`create_context`] mints a fresh [`ContextId`] and returns a
//! [`Context<T>`] handle. The handle builds [`Provider`](crate::Provider) and
//! [`Consumer`](crate::Consumer)
//! elements that share that id, so providers and consumers of different
//! contexts never see each other, even for the same value type.
//!
//! # Example
//!
//! ```
//! use ambit::{create_context, Element};
//!
//! let theme = create_context("light".to_string());
//! let tree: Element = theme
//!     .provider("dark".to_string())
//!     .child(theme.consumer().child_fn(|t: &String| Element::text(t.clone())))
//!     .into();
//! # let _ = tree;
//! ```

use std::fmt;
use std::rc::Rc;

use ambit_core::{
    AmbientData, ChangePolicy, ChangedBits, ContextId, Emitter, NoProvider, SharedSink,
    TracingSink, default_policy,
};

use crate::consumer::ConsumerBuilder;
use crate::provider::ProviderBuilder;

/// Per-context configuration.
#[derive(Clone)]
pub struct ContextOptions {
    /// Consumers without a provider silently use the default value instead
    /// of reporting a missing provider.
    pub provider_optional: bool,
    /// Where diagnostics of this context's consumers go.
    pub diagnostics: SharedSink,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            provider_optional: false,
            diagnostics: Rc::new(TracingSink),
        }
    }
}

impl ContextOptions {
    /// Do not warn when a consumer has no provider.
    #[must_use]
    pub fn provider_optional(mut self, optional: bool) -> Self {
        self.provider_optional = optional;
        self
    }

    /// Route diagnostics to `sink`.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: SharedSink) -> Self {
        self.diagnostics = sink;
        self
    }
}

impl fmt::Debug for ContextOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextOptions")
            .field("provider_optional", &self.provider_optional)
            .finish_non_exhaustive()
    }
}

/// State shared by every provider and consumer of one context.
pub(crate) struct ContextShared<T> {
    pub(crate) id: ContextId,
    pub(crate) default: T,
    pub(crate) policy: ChangePolicy<T>,
    pub(crate) options: ContextOptions,
    pub(crate) no_provider: NoProvider,
}

/// A provider/consumer pair sharing one private identity.
pub struct Context<T> {
    shared: Rc<ContextShared<T>>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Rc::clone(&self.shared),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Context<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.shared.id)
            .field("default", &self.shared.default)
            .field("options", &self.shared.options)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Context<T> {
    /// Start configuring a context with `default` as the value consumers see
    /// when no provider is above them.
    #[must_use]
    pub fn builder(default: T) -> ContextBuilder<T> {
        ContextBuilder {
            default,
            policy: None,
            options: ContextOptions::default(),
        }
    }

    /// Key under which providers of this context publish their emitter.
    #[must_use]
    pub fn id(&self) -> ContextId {
        self.shared.id
    }

    #[must_use]
    pub fn default_value(&self) -> &T {
        &self.shared.default
    }

    #[must_use]
    pub fn options(&self) -> &ContextOptions {
        &self.shared.options
    }

    /// The emitter of the nearest provider of this context, if any.
    #[must_use]
    pub fn lookup(&self, ambient: &AmbientData) -> Option<Emitter<T>> {
        lookup(&self.shared, ambient)
    }

    /// Start a provider element publishing `value`.
    #[must_use]
    pub fn provider(&self, value: T) -> ProviderBuilder<T> {
        ProviderBuilder::new(Rc::clone(&self.shared), value)
    }

    /// Start a consumer element.
    #[must_use]
    pub fn consumer(&self) -> ConsumerBuilder<T> {
        ConsumerBuilder::new(Rc::clone(&self.shared))
    }

    /// True if `self` and `other` are the same context.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

pub(crate) fn lookup<T: Clone + PartialEq + 'static>(
    shared: &ContextShared<T>,
    ambient: &AmbientData,
) -> Option<Emitter<T>> {
    ambient.get::<Emitter<T>>(shared.id).cloned()
}

/// Builder returned by [`Context::builder`].
pub struct ContextBuilder<T> {
    default: T,
    policy: Option<ChangePolicy<T>>,
    options: ContextOptions,
}

impl<T: Clone + PartialEq + 'static> ContextBuilder<T> {
    /// Compute change bits with `policy` instead of treating every change as
    /// total.
    #[must_use]
    pub fn change_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&T, &T) -> ChangedBits + 'static,
    {
        self.policy = Some(Rc::new(policy));
        self
    }

    /// See [`ContextOptions::provider_optional`].
    #[must_use]
    pub fn provider_optional(mut self, optional: bool) -> Self {
        self.options.provider_optional = optional;
        self
    }

    /// See [`ContextOptions::with_diagnostics`].
    #[must_use]
    pub fn diagnostics(mut self, sink: SharedSink) -> Self {
        self.options.diagnostics = sink;
        self
    }

    /// Replace all options at once.
    #[must_use]
    pub fn options(mut self, options: ContextOptions) -> Self {
        self.options = options;
        self
    }

    /// Mint the context.
    #[must_use]
    pub fn build(self) -> Context<T> {
        let id = ContextId::next();
        let no_provider = if self.options.provider_optional {
            NoProvider::silent()
        } else {
            NoProvider::new(Rc::clone(&self.options.diagnostics))
        };
        tracing::debug!(
            context = %id,
            provider_optional = self.options.provider_optional,
            "context created"
        );
        Context {
            shared: Rc::new(ContextShared {
                id,
                default: self.default,
                policy: self.policy.unwrap_or_else(default_policy),
                options: self.options,
                no_provider,
            }),
        }
    }
}

/// Create a context whose consumers see `default` when no provider is
/// above them. Every change is reported as [`ChangedBits::ALL`].
#[must_use]
pub fn create_context<T: Clone + PartialEq + 'static>(default: T) -> Context<T> {
    Context::builder(default).build()
}

/// Create a context with a change policy, letting consumers filter
/// notifications with observed bits.
#[must_use]
pub fn create_context_with_policy<T, F>(default: T, policy: F) -> Context<T>
where
    T: Clone + PartialEq + 'static,
    F: Fn(&T, &T) -> ChangedBits + 'static,
{
    Context::builder(default).change_policy(policy).build()
}
