#![forbid(unsafe_code)]

//! Subscriber node.
//!
//! A [`Consumer`] reads the nearest [`Provider`](crate::Provider) of its
//! context and renders through a function of the value.
//!
//! # Lifecycle
//!
//! | Hook | Effect |
//! |------|--------|
//! | `create` | Seed the cached value from the nearest emitter or the default |
//! | `did_mount` | Register the updater (no provider: report and bind to the stub) |
//! | `should_update` | True on a new binding, a new value, or a new render function |
//! | `did_update` | Re-bind when the nearest emitter changed |
//! | `will_unmount` | Unregister |
//!
//! # Render source
//!
//! The single child wins when there is exactly one child; otherwise the
//! `render` prop is used. See [`RenderSource::resolve`].
//!
//! Notifications whose bits do not intersect the consumer's observed bits
//! are dropped without touching the cached value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ambit_core::{AmbientData, ChangedBits, Diagnostic, Emitter, Updater, ValueEmitter};
use tracing::{debug, debug_span, trace};

use crate::context::{ContextShared, lookup};
use crate::host::{Component, Element, Scope};

/// A function from the context value to output.
pub type RenderFn<T> = Rc<dyn Fn(&T) -> Element>;

/// One child of a consumer: a render function or a plain element.
pub enum ConsumerChild<T> {
    Render(RenderFn<T>),
    Node(Element),
}

impl<T> Clone for ConsumerChild<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Render(f) => Self::Render(Rc::clone(f)),
            Self::Node(el) => Self::Node(el.clone()),
        }
    }
}

impl<T> fmt::Debug for ConsumerChild<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(_) => f.write_str("Render(..)"),
            Self::Node(el) => f.debug_tuple("Node").field(el).finish(),
        }
    }
}

/// Where a consumer's output comes from for one render.
pub enum RenderSource<T> {
    /// The single function child.
    Children(RenderFn<T>),
    /// The `render` prop.
    Render(RenderFn<T>),
    /// Nothing callable.
    None,
}

impl<T> fmt::Debug for RenderSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Children(_) => "Children",
            Self::Render(_) => "Render",
            Self::None => "None",
        })
    }
}

/// Result of [`RenderSource::resolve`].
#[derive(Debug)]
pub struct Resolution<T> {
    /// The function this consumer renders with, if any.
    pub source: RenderSource<T>,
    /// A `render` prop was given but lost to something else.
    pub conflicting: bool,
}

impl<T> Resolution<T> {
    /// Diagnostics this resolution should report, in order.
    pub fn diagnostics(&self) -> impl Iterator<Item = Diagnostic> {
        let conflict = self.conflicting.then_some(Diagnostic::ConflictingRenderSources);
        let missing = matches!(self.source, RenderSource::None)
            .then_some(Diagnostic::MissingRenderFunction);
        conflict.into_iter().chain(missing)
    }
}

impl<T> RenderSource<T> {
    /// Pick the effective source.
    ///
    /// Exactly one child is the source, function or not; with zero or several
    /// children the `render` prop is. A `render` prop that is not the
    /// effective function is a conflict.
    #[must_use]
    pub fn resolve(children: &[ConsumerChild<T>], render: Option<&RenderFn<T>>) -> Resolution<T> {
        let source = match (children, render) {
            ([ConsumerChild::Render(f)], _) => Self::Children(Rc::clone(f)),
            ([ConsumerChild::Node(_)], _) => Self::None,
            (_, Some(f)) => Self::Render(Rc::clone(f)),
            (_, None) => Self::None,
        };
        let conflicting = match (render, source.function()) {
            (Some(render), Some(active)) => !Rc::ptr_eq(render, active),
            (Some(_), None) => true,
            (None, _) => false,
        };
        Resolution {
            source,
            conflicting,
        }
    }

    /// The function to call, if any.
    #[must_use]
    pub fn function(&self) -> Option<&RenderFn<T>> {
        match self {
            Self::Children(f) | Self::Render(f) => Some(f),
            Self::None => None,
        }
    }
}

/// Props of a [`Consumer`].
pub struct ConsumerProps<T> {
    context: Rc<ContextShared<T>>,
    /// Children as given; a single render function here wins over `render`.
    pub children: Vec<ConsumerChild<T>>,
    /// Fallback render function.
    pub render: Option<RenderFn<T>>,
    /// Aspects this consumer re-renders for. Defaults to all.
    pub observed_bits: ChangedBits,
}

impl<T> fmt::Debug for ConsumerProps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerProps")
            .field("context", &self.context.id)
            .field("children", &self.children)
            .field("render", &self.render.is_some())
            .field("observed_bits", &self.observed_bits)
            .finish()
    }
}

struct Slot<T> {
    value: T,
    rendered: Option<T>,
    rendered_fn: Option<RenderFn<T>>,
    observed: ChangedBits,
}

/// Subscriber node: renders the nearest provider's value.
pub struct Consumer<T> {
    context: Rc<ContextShared<T>>,
    slot: Rc<RefCell<Slot<T>>>,
    bound: Option<Emitter<T>>,
    updater: Updater<T>,
}

impl<T: Clone + PartialEq + 'static> Consumer<T> {
    /// The cached value.
    #[must_use]
    pub fn value(&self) -> T {
        self.slot.borrow().value.clone()
    }

    /// The emitter this consumer is bound to, if it has a provider.
    #[must_use]
    pub fn bound(&self) -> Option<&Emitter<T>> {
        self.bound.as_ref()
    }

    fn upstream(&self) -> &dyn ValueEmitter<T> {
        match &self.bound {
            Some(emitter) => emitter,
            None => &self.context.no_provider,
        }
    }

    fn seed(&self, nearest: Option<&Emitter<T>>) -> T {
        nearest.map_or_else(|| self.context.default.clone(), Emitter::get)
    }

    fn is_bound_to(&self, nearest: Option<&Emitter<T>>) -> bool {
        match (&self.bound, nearest) {
            (Some(a), Some(b)) => Emitter::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

fn same_fn<T>(a: Option<&RenderFn<T>>, b: Option<&RenderFn<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

fn make_updater<T: Clone + PartialEq + 'static>(
    slot: &Rc<RefCell<Slot<T>>>,
    scope: &Scope,
) -> Updater<T> {
    let slot = Rc::downgrade(slot);
    let handle = scope.update_handle();
    Rc::new(move |value: &T, bits: ChangedBits| {
        let Some(slot) = slot.upgrade() else {
            return;
        };
        let changed = {
            let mut slot = slot.borrow_mut();
            if !slot.observed.observes(bits) {
                trace!(
                    node = %handle.node(),
                    observed = slot.observed.bits(),
                    bits = bits.bits(),
                    "notification filtered"
                );
                return;
            }
            if slot.value == *value {
                false
            } else {
                slot.value = value.clone();
                true
            }
        };
        if changed {
            handle.request();
        }
    })
}

impl<T: Clone + PartialEq + 'static> Component for Consumer<T> {
    type Props = ConsumerProps<T>;

    fn name() -> &'static str {
        "Consumer"
    }

    fn kind_tag(props: &ConsumerProps<T>) -> u64 {
        props.context.id.get()
    }

    fn create(props: &ConsumerProps<T>, scope: &Scope) -> Self {
        let bound = lookup(&props.context, scope.ambient());
        let value = bound
            .as_ref()
            .map_or_else(|| props.context.default.clone(), Emitter::get);
        let slot = Rc::new(RefCell::new(Slot {
            value,
            rendered: None,
            rendered_fn: None,
            observed: props.observed_bits,
        }));
        let updater = make_updater(&slot, scope);
        Self {
            context: Rc::clone(&props.context),
            slot,
            bound,
            updater,
        }
    }

    fn did_mount(&mut self, _props: &ConsumerProps<T>, _scope: &Scope) {
        self.upstream().register(&self.updater);
    }

    fn should_update(
        &mut self,
        _prev: &ConsumerProps<T>,
        next: &ConsumerProps<T>,
        scope: &Scope,
    ) -> bool {
        let nearest = lookup(&self.context, scope.ambient());
        if !self.is_bound_to(nearest.as_ref()) {
            return true;
        }
        let resolution = RenderSource::resolve(&next.children, next.render.as_ref());
        let mut slot = self.slot.borrow_mut();
        slot.observed = next.observed_bits;
        slot.rendered.as_ref() != Some(&slot.value)
            || !same_fn(resolution.source.function(), slot.rendered_fn.as_ref())
    }

    fn render(&mut self, props: &ConsumerProps<T>, scope: &Scope) -> Element {
        let _span = debug_span!("consumer_render", context = %self.context.id).entered();

        let nearest = lookup(&self.context, scope.ambient());
        if !self.is_bound_to(nearest.as_ref()) {
            // Show the new provider's value now; did_update registers.
            let seed = self.seed(nearest.as_ref());
            self.slot.borrow_mut().value = seed;
        }

        let resolution = RenderSource::resolve(&props.children, props.render.as_ref());
        for diagnostic in resolution.diagnostics() {
            self.context.options.diagnostics.warn(diagnostic);
        }

        let value = {
            let slot = &mut *self.slot.borrow_mut();
            slot.observed = props.observed_bits;
            slot.rendered = Some(slot.value.clone());
            slot.rendered_fn = resolution.source.function().cloned();
            slot.value.clone()
        };
        match resolution.source.function() {
            Some(render) => render(&value),
            None => Element::Empty,
        }
    }

    fn did_update(
        &mut self,
        _prev: &ConsumerProps<T>,
        _props: &ConsumerProps<T>,
        _prev_ambient: &AmbientData,
        scope: &Scope,
    ) {
        let nearest = lookup(&self.context, scope.ambient());
        if self.is_bound_to(nearest.as_ref()) {
            return;
        }
        debug!(
            context = %self.context.id,
            node = %scope.update_handle().node(),
            had_provider = self.bound.is_some(),
            has_provider = nearest.is_some(),
            "consumer rebinding"
        );
        self.upstream().unregister(&self.updater);
        let seed = self.seed(nearest.as_ref());
        let stale = {
            let mut slot = self.slot.borrow_mut();
            slot.value = seed;
            slot.rendered.as_ref() != Some(&slot.value)
        };
        self.bound = nearest;
        self.upstream().register(&self.updater);
        if stale {
            scope.update_handle().request();
        }
    }

    fn will_unmount(&mut self, _scope: &Scope) {
        self.upstream().unregister(&self.updater);
    }
}

/// Builder returned by [`Context::consumer`](crate::Context::consumer).
pub struct ConsumerBuilder<T> {
    context: Rc<ContextShared<T>>,
    children: Vec<ConsumerChild<T>>,
    render: Option<RenderFn<T>>,
    observed_bits: ChangedBits,
}

impl<T: Clone + PartialEq + 'static> ConsumerBuilder<T> {
    pub(crate) fn new(context: Rc<ContextShared<T>>) -> Self {
        Self {
            context,
            children: Vec::new(),
            render: None,
            observed_bits: ChangedBits::ALL,
        }
    }

    /// Add a render-function child.
    #[must_use]
    pub fn child_fn<F>(self, f: F) -> Self
    where
        F: Fn(&T) -> Element + 'static,
    {
        self.child_render(Rc::new(f))
    }

    /// Add an existing render function as a child, keeping its identity.
    #[must_use]
    pub fn child_render(mut self, f: RenderFn<T>) -> Self {
        self.children.push(ConsumerChild::Render(f));
        self
    }

    /// Add a plain element child. Consumers cannot render these.
    #[must_use]
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(ConsumerChild::Node(child.into()));
        self
    }

    /// Set the `render` prop.
    #[must_use]
    pub fn render<F>(self, f: F) -> Self
    where
        F: Fn(&T) -> Element + 'static,
    {
        self.render_fn(Rc::new(f))
    }

    /// Set the `render` prop from a shared function, keeping its identity.
    #[must_use]
    pub fn render_fn(mut self, f: RenderFn<T>) -> Self {
        self.render = Some(f);
        self
    }

    /// Only re-render for changes whose bits intersect `bits`.
    #[must_use]
    pub fn observed_bits(mut self, bits: u32) -> Self {
        self.observed_bits = ChangedBits::from_raw(bits);
        self
    }

    /// Finish into a component element.
    #[must_use]
    pub fn build(self) -> Element {
        Element::component::<Consumer<T>>(ConsumerProps {
            context: self.context,
            children: self.children,
            render: self.render,
            observed_bits: self.observed_bits,
        })
    }
}

impl<T: Clone + PartialEq + 'static> From<ConsumerBuilder<T>> for Element {
    fn from(builder: ConsumerBuilder<T>) -> Self {
        builder.build()
    }
}
