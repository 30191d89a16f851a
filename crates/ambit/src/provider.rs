#![forbid(unsafe_code)]

//! Publisher node.
//!
//! A [`Provider`] owns one [`Emitter`] for its subtree. The emitter is
//! created at mount, seeded with the first `value` prop, and published to
//! descendants under the context's id. Every update whose `value` differs
//! from the previous one pushes the new value into the emitter.
//!
//! A provider renders its children as they are: one child passes through
//! unwrapped; several children are returned as a fragment when the host can
//! output multiple roots and wrapped in a single `span` otherwise.

use std::fmt;
use std::rc::Rc;

use ambit_core::{AmbientData, ContextId, Emitter};
use tracing::debug_span;

use crate::context::ContextShared;
use crate::host::{Component, Element, Scope};

/// Tag of the neutral container used for multiple children.
pub const WRAPPER_TAG: &str = "span";

/// Props of a [`Provider`].
pub struct ProviderProps<T> {
    context: Rc<ContextShared<T>>,
    /// Value published to the subtree.
    pub value: T,
    /// Children rendered unchanged.
    pub children: Vec<Element>,
}

impl<T: fmt::Debug> fmt::Debug for ProviderProps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderProps")
            .field("context", &self.context.id)
            .field("value", &self.value)
            .field("children", &self.children.len())
            .finish()
    }
}

/// Publisher node: owns the emitter of one subtree.
pub struct Provider<T> {
    id: ContextId,
    emitter: Emitter<T>,
}

impl<T: Clone + PartialEq + 'static> Provider<T> {
    /// The emitter this instance publishes.
    #[must_use]
    pub fn emitter(&self) -> &Emitter<T> {
        &self.emitter
    }
}

impl<T: Clone + PartialEq + 'static> Component for Provider<T> {
    type Props = ProviderProps<T>;

    fn name() -> &'static str {
        "Provider"
    }

    fn kind_tag(props: &ProviderProps<T>) -> u64 {
        props.context.id.get()
    }

    fn create(props: &ProviderProps<T>, _scope: &Scope) -> Self {
        Self {
            id: props.context.id,
            emitter: Emitter::new(props.value.clone(), Rc::clone(&props.context.policy)),
        }
    }

    fn provide(&self, _props: &ProviderProps<T>, ambient: &AmbientData) -> AmbientData {
        ambient.provide(self.id, self.emitter.clone())
    }

    fn render(&mut self, props: &ProviderProps<T>, scope: &Scope) -> Element {
        pass_through(&props.children, scope.supports_fragments())
    }

    fn did_update(
        &mut self,
        prev: &ProviderProps<T>,
        props: &ProviderProps<T>,
        _prev_ambient: &AmbientData,
        _scope: &Scope,
    ) {
        if prev.value != props.value {
            let _span = debug_span!(
                "provider_push",
                context = %self.id,
                subscribers = self.emitter.subscriber_count()
            )
            .entered();
            self.emitter.val(Some(props.value.clone()));
        }
    }
}

/// Render `children` as a single unit.
pub(crate) fn pass_through(children: &[Element], fragments: bool) -> Element {
    match children {
        [] => Element::Empty,
        [only] => only.clone(),
        many if fragments => Element::Fragment(many.to_vec()),
        many => Element::tag(WRAPPER_TAG).children(many.iter().cloned()).into(),
    }
}

/// Builder returned by [`Context::provider`](crate::Context::provider).
pub struct ProviderBuilder<T> {
    context: Rc<ContextShared<T>>,
    value: T,
    children: Vec<Element>,
}

impl<T: Clone + PartialEq + 'static> ProviderBuilder<T> {
    pub(crate) fn new(context: Rc<ContextShared<T>>, value: T) -> Self {
        Self {
            context,
            value,
            children: Vec::new(),
        }
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

    /// Finish into a component element.
    #[must_use]
    pub fn build(self) -> Element {
        Element::component::<Provider<T>>(ProviderProps {
            context: self.context,
            value: self.value,
            children: self.children,
        })
    }
}

impl<T: Clone + PartialEq + 'static> From<ProviderBuilder<T>> for Element {
    fn from(builder: ProviderBuilder<T>) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::create_context;
    use ambit_core::{ChangedBits, Updater};
    use std::cell::RefCell;

    fn props_of(el: &Element) -> &ProviderProps<i32> {
        let Element::Component(c) = el else {
            panic!("expected component");
        };
        c.props().downcast_ref().expect("provider props")
    }

    #[test]
    fn single_child_passes_through() {
        let out = pass_through(&[Element::text("Hi from provider")], false);
        assert_eq!(out, Element::text("Hi from provider"));
    }

    #[test]
    fn no_children_render_nothing() {
        assert!(pass_through(&[], false).is_empty());
    }

    #[test]
    fn many_children_wrap_in_one_span() {
        let out = pass_through(&[Element::tag("div").into(), Element::text("x")], false);
        let Element::Tag(tag) = out else {
            panic!("expected wrapper");
        };
        assert_eq!(tag.name, WRAPPER_TAG);
        assert_eq!(tag.children.len(), 2);
    }

    #[test]
    fn many_children_become_fragment_when_supported() {
        let out = pass_through(&[Element::text("a"), Element::text("b")], true);
        assert_eq!(
            out,
            Element::Fragment(vec![Element::text("a"), Element::text("b")])
        );
    }

    #[test]
    fn publishes_emitter_and_pushes_changes() {
        let ctx = create_context(1);
        let first = ctx.provider(2).build();
        let second = ctx.provider(3).build();
        let scope = Scope::detached(AmbientData::new());

        let mut provider = Provider::create(props_of(&first), &scope);
        let ambient = provider.provide(props_of(&first), scope.ambient());
        let emitter = ctx.lookup(&ambient).expect("published");
        assert!(Emitter::ptr_eq(&emitter, provider.emitter()));
        assert_eq!(emitter.get(), 2);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        let updater: Updater<i32> = Rc::new(move |v: &i32, bits: ChangedBits| {
            seen_clone.borrow_mut().push((*v, bits));
        });
        emitter.register(&updater);

        provider.did_update(props_of(&first), props_of(&second), &ambient, &scope);
        provider.did_update(props_of(&second), props_of(&second), &ambient, &scope);
        assert_eq!(
            *seen.borrow(),
            vec![(2, ChangedBits::ALL), (3, ChangedBits::ALL)]
        );
    }

    #[test]
    fn distinct_contexts_have_distinct_kinds() {
        let a = create_context(0).provider(1).build();
        let b = create_context(0).provider(1).build();
        let (Element::Component(a), Element::Component(b)) = (a, b) else {
            panic!("expected components");
        };
        assert_eq!(a.kind().name(), "Provider");
        assert_ne!(a.kind(), b.kind());
    }
}
