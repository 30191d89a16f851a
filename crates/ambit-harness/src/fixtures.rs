#![forbid(unsafe_code)]

//! Helper components for tree-shape tests.

use std::cell::Cell;
use std::rc::Rc;

use ambit::{AmbientData, Component, Element, Scope};

/// Renders its child once and then refuses every update.
pub struct Blocker;

impl Component for Blocker {
    type Props = Element;

    fn name() -> &'static str {
        "Blocker"
    }

    fn create(_props: &Element, _scope: &Scope) -> Self {
        Self
    }

    fn should_update(&mut self, _prev: &Element, _next: &Element, _scope: &Scope) -> bool {
        false
    }

    fn render(&mut self, props: &Element, _scope: &Scope) -> Element {
        props.clone()
    }
}

/// A [`Blocker`] around `child`.
#[must_use]
pub fn blocker(child: impl Into<Element>) -> Element {
    Element::component::<Blocker>(child.into())
}

/// Props of [`Inject`].
pub struct InjectProps {
    pub ambient: AmbientData,
    pub child: Element,
}

/// Replaces the ambient data its subtree sees with `ambient`.
///
/// Moves consumers between emitters without remounting them.
pub struct Inject;

impl Component for Inject {
    type Props = InjectProps;

    fn name() -> &'static str {
        "Inject"
    }

    fn create(_props: &InjectProps, _scope: &Scope) -> Self {
        Self
    }

    fn render(&mut self, props: &InjectProps, _scope: &Scope) -> Element {
        props.child.clone()
    }

    fn provide(&self, props: &InjectProps, _ambient: &AmbientData) -> AmbientData {
        props.ambient.clone()
    }
}

/// An [`Inject`] exposing `ambient` to `child`.
#[must_use]
pub fn inject(ambient: AmbientData, child: impl Into<Element>) -> Element {
    Element::component::<Inject>(InjectProps {
        ambient,
        child: child.into(),
    })
}

/// Render-call counter for render functions.
#[derive(Debug, Clone, Default)]
pub struct RenderCounter(Rc<Cell<usize>>);

impl RenderCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.set(self.0.get() + 1);
    }

    #[must_use]
    pub fn get(&self) -> usize {
        self.0.get()
    }
}
