#![forbid(unsafe_code)]

//! Host interface: what a component runtime must offer providers and
//! consumers.
//!
//! A host owns mount/update/unmount scheduling and tree diffing. This module
//! only fixes the contract:
//!
//! - [`Element`]: the description a component renders to.
//! - [`Component`]: lifecycle hooks the host calls, including
//!   [`Component::provide`] for writing ambient data to descendants.
//! - [`Scope`]: what the host hands a component during a hook (nearest
//!   ancestor's [`AmbientData`], an [`UpdateHandle`], capabilities).
//! - [`UpdateHandle`]: forces a component to recompute its output.
//!
//! Hosts never see concrete component types; they drive
//! [`AnyComponent`] trait objects built by [`ComponentElement::instantiate`].
//!
//! # Lifecycle order
//!
//! ```text
//! create → provide → render → (children) → did_mount
//! should_update → provide → render → (children) → did_update
//! will_unmount
//! ```
//!
//! A forced update runs the update sequence with unchanged props.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::{Rc, Weak};

use ambit_core::AmbientData;

// ---------------------------------------------------------------------------
// Elements
// ---------------------------------------------------------------------------

/// Output of a render call.
#[derive(Clone, Default)]
pub enum Element {
    /// Renders nothing.
    #[default]
    Empty,
    /// A text leaf.
    Text(String),
    /// A host node with an optional class and children.
    Tag(TagElement),
    /// Several roots with no wrapper (hosts with multi-root output only).
    Fragment(Vec<Element>),
    /// A component to instantiate.
    Component(ComponentElement),
}

impl Element {
    /// A text leaf.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Start a host node.
    #[must_use]
    pub fn tag(name: impl Into<String>) -> TagElement {
        TagElement::new(name)
    }

    /// A component element.
    #[must_use]
    pub fn component<C: Component>(props: C::Props) -> Self {
        Self::Component(ComponentElement::new::<C>(props))
    }

    /// True for [`Element::Empty`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl From<&str> for Element {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Element {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<TagElement> for Element {
    fn from(tag: TagElement) -> Self {
        Self::Tag(tag)
    }
}

impl From<ComponentElement> for Element {
    fn from(component: ComponentElement) -> Self {
        Self::Component(component)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Tag(tag) => fmt::Debug::fmt(tag, f),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Component(component) => fmt::Debug::fmt(component, f),
        }
    }
}

/// A host node: tag name, optional class, children.
#[derive(Debug, Clone, PartialEq)]
pub struct TagElement {
    pub name: String,
    pub class: Option<String>,
    pub children: Vec<Element>,
}

impl TagElement {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.class = Some(class.into());
        self
    }

    #[must_use]
    pub fn child(mut self, child: impl Into<Element>) -> Self {
        self.children.push(child.into());
        self
    }

    #[must_use]
    pub fn children<I, E>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Element>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }
}

/// Structural equality. Component elements compare by kind and props
/// identity, so two separately built components are never equal.
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Empty, Self::Empty) => true,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Tag(a), Self::Tag(b)) => a == b,
            (Self::Fragment(a), Self::Fragment(b)) => a == b,
            (Self::Component(a), Self::Component(b)) => {
                a.kind == b.kind && Rc::ptr_eq(&a.props, &b.props)
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// A node in the tree with its own lifecycle.
///
/// All hooks except [`create`](Component::create) and
/// [`render`](Component::render) default to no-ops.
pub trait Component: Sized + 'static {
    /// Inputs passed down by the parent on every render.
    type Props: 'static;

    /// Display name for logs and lifecycle traces.
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Extra discriminator folded into [`ComponentKind`]. Two elements of the
    /// same Rust type but different tags are different kinds to the host.
    fn kind_tag(_props: &Self::Props) -> u64 {
        0
    }

    /// Build the instance. `scope` carries the ambient data of the position
    /// the instance is about to occupy.
    fn create(props: &Self::Props, scope: &Scope) -> Self;

    /// Called once after the first render and all its children mounted.
    fn did_mount(&mut self, _props: &Self::Props, _scope: &Scope) {}

    /// Return `false` to keep the previous output for this update.
    fn should_update(&mut self, _prev: &Self::Props, _next: &Self::Props, _scope: &Scope) -> bool {
        true
    }

    /// Produce the output for `props`.
    fn render(&mut self, props: &Self::Props, scope: &Scope) -> Element;

    /// Called after an update's render and children reconciled.
    /// `prev_ambient` is the ambient data the previous render saw.
    fn did_update(
        &mut self,
        _prev: &Self::Props,
        _props: &Self::Props,
        _prev_ambient: &AmbientData,
        _scope: &Scope,
    ) {
    }

    /// Called once before the instance is dropped.
    fn will_unmount(&mut self, _scope: &Scope) {}

    /// Ambient data for this node's descendants. Defaults to passing the
    /// received data through.
    fn provide(&self, _props: &Self::Props, ambient: &AmbientData) -> AmbientData {
        ambient.clone()
    }
}

/// Identity of a component type as seen by the host's diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind {
    type_id: TypeId,
    tag: u64,
    name: &'static str,
}

impl ComponentKind {
    /// Kind for component type `C` with discriminator `tag`.
    #[must_use]
    pub fn of<C: Component>(tag: u64) -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            tag,
            name: C::name(),
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub const fn tag(&self) -> u64 {
        self.tag
    }
}

type MountFn = fn(&dyn Any, &Scope) -> Option<Box<dyn AnyComponent>>;

/// A component plus its props, not yet instantiated.
#[derive(Clone)]
pub struct ComponentElement {
    kind: ComponentKind,
    props: Rc<dyn Any>,
    mount: MountFn,
}

impl ComponentElement {
    /// Describe component `C` with `props`.
    #[must_use]
    pub fn new<C: Component>(props: C::Props) -> Self {
        Self {
            kind: ComponentKind::of::<C>(C::kind_tag(&props)),
            props: Rc::new(props),
            mount: mount_erased::<C>,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Type-erased props, shared between clones of this element.
    #[must_use]
    pub fn props(&self) -> &Rc<dyn Any> {
        &self.props
    }

    /// Create the instance. `None` only if the props do not match the
    /// component type, which `new` rules out.
    #[must_use]
    pub fn instantiate(&self, scope: &Scope) -> Option<Box<dyn AnyComponent>> {
        (self.mount)(self.props.as_ref(), scope)
    }
}

impl fmt::Debug for ComponentElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.kind.name)
            .field("tag", &self.kind.tag)
            .finish_non_exhaustive()
    }
}

fn mount_erased<C: Component>(props: &dyn Any, scope: &Scope) -> Option<Box<dyn AnyComponent>> {
    let props = props.downcast_ref::<C::Props>()?;
    Some(Box::new(Erased(C::create(props, scope))))
}

/// Object-safe view of a [`Component`] that the host drives.
///
/// Props arrive type-erased; a mismatched props type makes every hook a
/// no-op and `render` return [`Element::Empty`].
pub trait AnyComponent {
    fn name(&self) -> &'static str;
    fn did_mount(&mut self, props: &dyn Any, scope: &Scope);
    fn should_update(&mut self, prev: &dyn Any, next: &dyn Any, scope: &Scope) -> bool;
    fn render(&mut self, props: &dyn Any, scope: &Scope) -> Element;
    fn did_update(
        &mut self,
        prev: &dyn Any,
        props: &dyn Any,
        prev_ambient: &AmbientData,
        scope: &Scope,
    );
    fn will_unmount(&mut self, scope: &Scope);
    fn provide(&self, props: &dyn Any, ambient: &AmbientData) -> AmbientData;
}

struct Erased<C>(C);

impl<C: Component> AnyComponent for Erased<C> {
    fn name(&self) -> &'static str {
        C::name()
    }

    fn did_mount(&mut self, props: &dyn Any, scope: &Scope) {
        if let Some(props) = props.downcast_ref::<C::Props>() {
            self.0.did_mount(props, scope);
        }
    }

    fn should_update(&mut self, prev: &dyn Any, next: &dyn Any, scope: &Scope) -> bool {
        match (prev.downcast_ref::<C::Props>(), next.downcast_ref::<C::Props>()) {
            (Some(prev), Some(next)) => self.0.should_update(prev, next, scope),
            _ => false,
        }
    }

    fn render(&mut self, props: &dyn Any, scope: &Scope) -> Element {
        props
            .downcast_ref::<C::Props>()
            .map_or(Element::Empty, |props| self.0.render(props, scope))
    }

    fn did_update(
        &mut self,
        prev: &dyn Any,
        props: &dyn Any,
        prev_ambient: &AmbientData,
        scope: &Scope,
    ) {
        if let (Some(prev), Some(props)) =
            (prev.downcast_ref::<C::Props>(), props.downcast_ref::<C::Props>())
        {
            self.0.did_update(prev, props, prev_ambient, scope);
        }
    }

    fn will_unmount(&mut self, scope: &Scope) {
        self.0.will_unmount(scope);
    }

    fn provide(&self, props: &dyn Any, ambient: &AmbientData) -> AmbientData {
        props
            .downcast_ref::<C::Props>()
            .map_or_else(|| ambient.clone(), |props| self.0.provide(props, ambient))
    }
}

// ---------------------------------------------------------------------------
// Scope and forced updates
// ---------------------------------------------------------------------------

/// Host-assigned identity of a mounted component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Host side of [`UpdateHandle`]: queues a recompute of `node`.
pub trait UpdateScheduler {
    fn schedule(&self, node: NodeId);
}

struct Detached;

impl UpdateScheduler for Detached {
    fn schedule(&self, _node: NodeId) {}
}

/// Asks the host to recompute one component.
///
/// Holds the scheduler weakly: requests after the host is gone are dropped.
#[derive(Clone)]
pub struct UpdateHandle {
    node: NodeId,
    scheduler: Weak<dyn UpdateScheduler>,
}

impl UpdateHandle {
    #[must_use]
    pub fn new(node: NodeId, scheduler: Weak<dyn UpdateScheduler>) -> Self {
        Self { node, scheduler }
    }

    /// A handle whose requests go nowhere.
    #[must_use]
    pub fn detached() -> Self {
        let scheduler: Weak<dyn UpdateScheduler> = Weak::<Detached>::new();
        Self {
            node: NodeId(u64::MAX),
            scheduler,
        }
    }

    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Request a recompute. Returns `false` if the host is gone.
    pub fn request(&self) -> bool {
        match self.scheduler.upgrade() {
            Some(scheduler) => {
                scheduler.schedule(self.node);
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for UpdateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateHandle")
            .field("node", &self.node)
            .field("attached", &(self.scheduler.strong_count() > 0))
            .finish()
    }
}

/// What a host passes to every lifecycle hook.
#[derive(Debug, Clone)]
pub struct Scope {
    ambient: AmbientData,
    update: UpdateHandle,
    fragments: bool,
}

impl Scope {
    #[must_use]
    pub fn new(ambient: AmbientData, update: UpdateHandle, fragments: bool) -> Self {
        Self {
            ambient,
            update,
            fragments,
        }
    }

    /// A scope outside any host, for unit tests of single components.
    #[must_use]
    pub fn detached(ambient: AmbientData) -> Self {
        Self::new(ambient, UpdateHandle::detached(), false)
    }

    /// Ambient data contributed by the nearest ancestors.
    #[must_use]
    pub fn ambient(&self) -> &AmbientData {
        &self.ambient
    }

    /// Handle that recomputes the component this scope belongs to.
    #[must_use]
    pub fn update_handle(&self) -> UpdateHandle {
        self.update.clone()
    }

    /// True if the host can output several roots without a wrapper.
    #[must_use]
    pub fn supports_fragments(&self) -> bool {
        self.fragments
    }
}
