#![forbid(unsafe_code)]

//! End-to-end scenarios: provider/consumer trees driven by the reference
//! host.
//!
//! - provider updates reach consumers
//! - consumers without a provider fall back to the default and report it
//! - observed bits gate re-renders
//! - nested providers of one context shadow each other
//! - providers wrap several children in one container

use std::rc::Rc;

use ambit::{
    ChangedBits, CollectingSink, Context, Diagnostic, Element, RenderFn, create_context,
    create_context_with_policy,
};
use ambit_core::logging::{self, LogConfig};
use ambit_harness::{HarnessConfig, Phase, RenderCounter, TestRenderer, blocker};
use pretty_assertions::assert_eq;

fn init_tracing() {
    let _ = logging::init(&LogConfig::from_env().for_tests());
}

#[test]
fn provider_update_reaches_consumer() {
    init_tracing();
    let ctx = create_context(1);
    let show: RenderFn<i32> = Rc::new(|v: &i32| Element::text(format!("result: '{v}'")));
    let tree = |value: i32| {
        ctx.provider(value)
            .child(ctx.consumer().child_render(Rc::clone(&show)))
    };

    let mut host = TestRenderer::default();
    host.render(tree(2));
    assert_eq!(host.text(), "result: '2'");

    host.render(tree(3));
    assert_eq!(host.text(), "result: '3'");
    assert_eq!(host.events().count("Provider", Phase::Update), 1);
}

#[test]
fn consumer_without_provider_uses_default_and_warns_once() {
    init_tracing();
    let sink = CollectingSink::new();
    let ctx = Context::builder("The Default Context")
        .diagnostics(Rc::new(sink.clone()))
        .build();

    let mut host = TestRenderer::default();
    host.render(
        ctx.consumer()
            .child_fn(|v: &&'static str| Element::text(format!("Hi from '{v}'"))),
    );

    assert_eq!(host.text(), "Hi from 'The Default Context'");
    assert_eq!(sink.count(Diagnostic::MissingProvider), 1);
    assert_eq!(
        sink.messages(),
        vec!["Consumer used without a Provider".to_string()]
    );
}

#[derive(Debug, Clone, PartialEq)]
struct FooBar {
    foo: i32,
    bar: i32,
}

fn foo_bar_bits(a: &FooBar, b: &FooBar) -> ChangedBits {
    let mut bits = 0;
    if a.foo != b.foo {
        bits |= 0b01;
    }
    if a.bar != b.bar {
        bits |= 0b10;
    }
    ChangedBits::from_raw(bits)
}

fn counted(counter: &RenderCounter, class: &'static str, pick: fn(&FooBar) -> i32) -> RenderFn<FooBar> {
    let counter = counter.clone();
    Rc::new(move |v: &FooBar| {
        counter.hit();
        Element::tag("span")
            .class(class)
            .child(pick(v).to_string())
            .into()
    })
}

#[test]
fn observed_bits_gate_rerenders() {
    init_tracing();
    let ctx = create_context_with_policy(FooBar { foo: 0, bar: 0 }, foo_bar_bits);
    let foo_renders = RenderCounter::new();
    let bar_renders = RenderCounter::new();
    let show_foo = counted(&foo_renders, "foo", |v| v.foo);
    let show_bar = counted(&bar_renders, "bar", |v| v.bar);
    let tree = |value: FooBar| {
        ctx.provider(value).child(blocker(
            Element::tag("div")
                .child(
                    ctx.consumer()
                        .observed_bits(0b01)
                        .child_render(Rc::clone(&show_foo)),
                )
                .child(
                    ctx.consumer()
                        .observed_bits(0b10)
                        .child_render(Rc::clone(&show_bar)),
                ),
        ))
    };

    let mut host = TestRenderer::default();
    host.render(tree(FooBar { foo: 0, bar: 0 }));
    assert_eq!((foo_renders.get(), bar_renders.get()), (1, 1));

    host.render(tree(FooBar { foo: 1, bar: 0 }));
    assert_eq!((foo_renders.get(), bar_renders.get()), (2, 1));
    assert_eq!(host.query(".foo"), Ok("1".to_string()));
    assert_eq!(host.query(".bar"), Ok("0".to_string()));

    host.render(tree(FooBar { foo: 1, bar: 5 }));
    assert_eq!((foo_renders.get(), bar_renders.get()), (2, 2));
    assert_eq!(host.query(".bar"), Ok("5".to_string()));

    host.render(tree(FooBar { foo: 2, bar: 6 }));
    assert_eq!((foo_renders.get(), bar_renders.get()), (3, 3));
    assert_eq!(host.query(".foo"), Ok("2".to_string()));
    assert_eq!(host.query(".bar"), Ok("6".to_string()));
    assert_eq!(host.events().count("Blocker", Phase::Skip), 3);
}

#[test]
fn nested_provider_shadows_outer() {
    init_tracing();
    let ctx = create_context(10);
    let inner = ctx.clone();
    let tree = |value: i32| {
        let inner = inner.clone();
        ctx.provider(value).child(ctx.consumer().child_fn(move |v: &i32| {
            Element::tag("div")
                .class("c3")
                .child(Element::tag("span").class("result").child(v.to_string()))
                .child(
                    inner.provider(v * 10).child(
                        Element::tag("div").class("c5").child(inner.consumer().child_fn(
                            |n: &i32| Element::tag("span").class("value").child(n.to_string()).into(),
                        )),
                    ),
                )
                .into()
        }))
    };

    let mut host = TestRenderer::default();
    host.render(tree(12));
    assert_eq!(host.query(".c3 .result"), Ok("12".to_string()));
    assert_eq!(host.query(".c3 .c5 .value"), Ok("120".to_string()));

    host.render(tree(13));
    assert_eq!(host.query(".c3 .result"), Ok("13".to_string()));
    assert_eq!(host.query(".c3 .c5 .value"), Ok("130".to_string()));
}

#[test]
fn several_children_are_wrapped_once() {
    init_tracing();
    let ctx = create_context(0);
    let mut host = TestRenderer::default();

    host.render(
        ctx.provider(1)
            .child(Element::tag("i"))
            .child(Element::tag("b")),
    );
    assert_eq!(host.markup(), "<span><i></i><b></b></span>");

    host.render(ctx.provider(1).child(Element::tag("i")));
    assert_eq!(host.markup(), "<i></i>");

    host.render(ctx.provider(1).child("Hi from provider"));
    assert_eq!(host.markup(), "Hi from provider");

    host.render(ctx.provider(1));
    assert_eq!(host.markup(), "");
}

#[test]
fn multi_root_host_skips_wrapper() {
    init_tracing();
    let ctx = create_context(0);
    let mut host = TestRenderer::new(HarnessConfig::default().with_fragments(true));
    host.render(
        ctx.provider(1)
            .child(Element::tag("i"))
            .child(Element::tag("b")),
    );
    assert_eq!(host.markup(), "<i></i><b></b>");
}

#[test]
fn logging_bootstrap_installs_once() {
    init_tracing();
    assert!(!logging::init(&LogConfig::default().for_tests()));
}
