#![forbid(unsafe_code)]

//! Consumer rendering rules: render sources, diagnostics, re-render
//! suppression, late mounts and unmounts.

use std::rc::Rc;

use ambit::{
    ChangedBits, CollectingSink, Context, Diagnostic, Element, RenderFn, Shared, create_context,
    create_context_with_policy,
};
use ambit_core::logging::{self, LogConfig};
use ambit_harness::{Phase, RenderCounter, TestRenderer, blocker};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_tracing() {
    let _ = logging::init(&LogConfig::from_env().for_tests());
}

fn collecting<T: Clone + PartialEq + 'static>(default: T) -> (Context<T>, CollectingSink) {
    let sink = CollectingSink::new();
    let ctx = Context::builder(default)
        .diagnostics(Rc::new(sink.clone()))
        .build();
    (ctx, sink)
}

fn counted_text(counter: &RenderCounter) -> RenderFn<String> {
    let counter = counter.clone();
    Rc::new(move |v: &String| {
        counter.hit();
        Element::tag("span")
            .class("result")
            .child(format!("'{v}' rendered {} times", counter.get()))
            .into()
    })
}

#[test]
fn executes_child_function() {
    init_tracing();
    let (ctx, sink) = collecting("The Default Context".to_string());
    let mut host = TestRenderer::default();
    host.render(
        ctx.provider("The Provided Context".to_string())
            .child(ctx.consumer().child_fn(|v: &String| Element::text(format!("Hi from '{v}'")))),
    );
    assert_eq!(host.text(), "Hi from 'The Provided Context'");
    assert!(sink.is_empty());
}

#[test]
fn executes_render_prop() {
    init_tracing();
    let (ctx, sink) = collecting("The Default Context".to_string());
    let mut host = TestRenderer::default();
    host.render(
        ctx.provider("The Provided Context".to_string())
            .child(ctx.consumer().render(|v: &String| Element::text(format!("render: {v}")))),
    );
    assert_eq!(host.text(), "render: The Provided Context");
    assert!(sink.is_empty());
}

#[test]
fn child_function_wins_over_render_prop() {
    init_tracing();
    let (ctx, sink) = collecting(0);
    let mut host = TestRenderer::default();
    host.render(
        ctx.provider(1).child(
            ctx.consumer()
                .child_fn(|v: &i32| Element::text(format!("child {v}")))
                .render(|v: &i32| Element::text(format!("render {v}"))),
        ),
    );
    assert_eq!(host.text(), "child 1");
    assert_eq!(
        sink.messages(),
        vec!["Both children and a render function are defined. Children will be used".to_string()]
    );
}

#[test]
fn same_function_in_both_slots_does_not_warn() {
    init_tracing();
    let (ctx, sink) = collecting(0);
    let show: RenderFn<i32> = Rc::new(|v: &i32| Element::text(v.to_string()));
    let mut host = TestRenderer::default();
    host.render(
        ctx.provider(4).child(
            ctx.consumer()
                .child_render(Rc::clone(&show))
                .render_fn(Rc::clone(&show)),
        ),
    );
    assert_eq!(host.text(), "4");
    assert!(sink.is_empty());
}

#[test]
fn non_function_child_renders_nothing_and_warns() {
    init_tracing();
    let (ctx, sink) = collecting("The Default Context".to_string());
    let mut host = TestRenderer::default();
    host.render(ctx.provider("x".to_string()).child(ctx.consumer().child("Nothing")));
    assert_eq!(host.markup(), "");
    assert_eq!(sink.count(Diagnostic::MissingRenderFunction), 1);
    assert_eq!(
        sink.messages(),
        vec!["Consumer is expecting a function as one and only child but didn't find any".to_string()]
    );
}

#[test]
fn no_render_source_renders_nothing() {
    init_tracing();
    let (ctx, sink) = collecting(0);
    let mut host = TestRenderer::default();
    host.render(ctx.provider(1).child(ctx.consumer()));
    assert_eq!(host.markup(), "");
    assert_eq!(sink.diagnostics(), vec![Diagnostic::MissingRenderFunction]);
}

#[test]
fn initial_value_does_not_cause_second_render() {
    init_tracing();
    let (ctx, _sink) = collecting("The Default Context".to_string());
    let renders = RenderCounter::new();
    let mut host = TestRenderer::default();
    host.render(
        ctx.provider("provided context".to_string())
            .child(ctx.consumer().render_fn(counted_text(&renders))),
    );
    assert_eq!(
        host.query(".result"),
        Ok("'provided context' rendered 1 times".to_string())
    );
    assert_eq!(host.events().count("Consumer", Phase::Forced), 0);
}

#[test]
fn unchanged_value_and_function_do_not_rerender() {
    init_tracing();
    let (ctx, _sink) = collecting("The Default Context".to_string());
    let renders = RenderCounter::new();
    let print = counted_text(&renders);
    let tree = || {
        ctx.provider("provided context".to_string())
            .child(ctx.consumer().render_fn(Rc::clone(&print)))
    };

    let mut host = TestRenderer::default();
    host.render(tree());
    host.render(tree());
    assert_eq!(
        host.query(".result"),
        Ok("'provided context' rendered 1 times".to_string())
    );
    assert_eq!(host.events().count("Consumer", Phase::Skip), 1);
}

#[derive(Debug, PartialEq)]
struct Props {
    prop: &'static str,
}

fn counted_prop(counter: &RenderCounter) -> RenderFn<Shared<Props>> {
    let counter = counter.clone();
    Rc::new(move |v: &Shared<Props>| {
        counter.hit();
        Element::tag("span")
            .class("result")
            .child(format!("'{}' rendered {} times", v.prop, counter.get()))
            .into()
    })
}

#[test]
fn same_instance_does_not_rerender() {
    init_tracing();
    let ctx = create_context(Shared::new(Props { prop: "da prop" }));
    let renders = RenderCounter::new();
    let print = counted_prop(&renders);
    let updated = Shared::new(Props {
        prop: "updated prop",
    });
    let tree = || {
        ctx.provider(updated.clone())
            .child(ctx.consumer().render_fn(Rc::clone(&print)))
    };

    let mut host = TestRenderer::default();
    host.render(tree());
    host.render(tree());
    assert_eq!(
        host.query(".result"),
        Ok("'updated prop' rendered 1 times".to_string())
    );
}

#[test]
fn new_instance_with_equal_fields_rerenders() {
    init_tracing();
    let ctx = create_context(Shared::new(Props { prop: "da prop" }));
    let renders = RenderCounter::new();
    let print = counted_prop(&renders);
    let tree = || {
        ctx.provider(Shared::new(Props {
            prop: "updated prop",
        }))
        .child(ctx.consumer().render_fn(Rc::clone(&print)))
    };

    let mut host = TestRenderer::default();
    host.render(tree());
    host.render(tree());
    assert_eq!(
        host.query(".result"),
        Ok("'updated prop' rendered 2 times".to_string())
    );
}

#[test]
fn new_render_function_rerenders() {
    init_tracing();
    let (ctx, _sink) = collecting("The Default Context".to_string());
    let renders = RenderCounter::new();
    let mut host = TestRenderer::default();
    for _ in 0..2 {
        host.render(
            ctx.provider("provided context".to_string())
                .child(ctx.consumer().render_fn(counted_text(&renders))),
        );
    }
    assert_eq!(
        host.query(".result"),
        Ok("'provided context' rendered 2 times".to_string())
    );
}

#[test]
fn new_child_function_rerenders() {
    init_tracing();
    let (ctx, _sink) = collecting("The Default Context".to_string());
    let renders = RenderCounter::new();
    let mut host = TestRenderer::default();
    for _ in 0..3 {
        host.render(
            ctx.provider("provided context".to_string())
                .child(ctx.consumer().child_render(counted_text(&renders))),
        );
    }
    assert_eq!(renders.get(), 3);
}

#[test]
fn value_reaches_consumer_behind_blocked_indirection() {
    init_tracing();
    let (ctx, sink) = collecting("The Default Context".to_string());
    let tree = |value: &str| {
        ctx.provider(value.to_string()).child(blocker(
            ctx.consumer()
                .child_fn(|v: &String| Element::text(format!("Hi from '{v}'"))),
        ))
    };

    let mut host = TestRenderer::default();
    host.render(tree("The Provided Context"));
    assert_eq!(host.markup(), "Hi from 'The Provided Context'");

    host.render(tree("The Updated Context"));
    assert_eq!(host.markup(), "Hi from 'The Updated Context'");
    assert_eq!(host.events().count("Blocker", Phase::Skip), 1);
    assert!(sink.is_empty());
}

#[derive(Debug, Clone, PartialEq)]
struct Message {
    message: String,
}

#[test]
fn late_mounted_consumer_sees_current_value() {
    init_tracing();
    let ctx = create_context(Message {
        message: "initial".to_string(),
    });
    let consumer = |name: &'static str| -> Element {
        ctx.consumer()
            .child_fn(move |m: &Message| {
                Element::tag("div")
                    .class(format!("consumer {name}"))
                    .child(m.message.as_str())
                    .into()
            })
            .build()
    };
    let app = |flag: bool| {
        let message = if flag { "Not the initial value" } else { "" };
        Element::tag("div").class("app").child(
            ctx.provider(Message {
                message: message.to_string(),
            })
            .child(
                Element::tag("div")
                    .class("my-provider")
                    .child(if flag { consumer("a") } else { Element::Empty })
                    .child(consumer("b"))
                    .child(consumer("c")),
            ),
        )
    };

    let mut host = TestRenderer::default();
    host.render(app(false));
    assert_eq!(host.query_all(".b").map(|v| v.len()), Ok(1));
    assert_eq!(host.query_all(".c").map(|v| v.len()), Ok(1));
    assert_eq!(host.query_all(".consumer").map(|v| v.len()), Ok(2));

    host.render(app(true));
    let texts = host.query_all(".consumer").expect("valid selector");
    assert_eq!(texts.len(), 3);
    assert!(texts.iter().all(|t| t == "Not the initial value"), "{texts:?}");
}

#[test]
fn unmounted_consumer_is_no_longer_notified() {
    init_tracing();
    let (ctx, _sink) = collecting(0);
    let renders = RenderCounter::new();
    let show: RenderFn<i32> = {
        let renders = renders.clone();
        Rc::new(move |v: &i32| {
            renders.hit();
            Element::text(v.to_string())
        })
    };

    let mut host = TestRenderer::default();
    host.render(ctx.provider(1).child(ctx.consumer().child_render(Rc::clone(&show))));
    host.render(ctx.provider(1));
    host.render(ctx.provider(2));

    assert_eq!(renders.get(), 1);
    assert_eq!(host.events().count("Consumer", Phase::Unmount), 1);
    assert_eq!(host.markup(), "");
}

#[test]
fn required_context_warns_only_without_provider() {
    init_tracing();
    let (ctx, sink) = collecting(0);
    let component = || ctx.consumer().child_fn(|_: &i32| Element::tag("div").class("component").into());

    let mut host = TestRenderer::default();
    host.render(ctx.provider(1).child(Element::tag("div").class("app").child(component())));
    assert_eq!(sink.len(), 0);
    drop(host);

    let mut host = TestRenderer::default();
    host.render(Element::tag("div").class("app").child(component()));
    assert_eq!(sink.len(), 1);
}

#[test]
fn optional_context_never_warns() {
    init_tracing();
    let sink = CollectingSink::new();
    let ctx = Context::builder(0)
        .provider_optional(true)
        .diagnostics(Rc::new(sink.clone()))
        .build();
    let component = || ctx.consumer().child_fn(|_: &i32| Element::tag("div").class("component").into());

    let mut host = TestRenderer::default();
    host.render(ctx.provider(1).child(Element::tag("div").class("app").child(component())));
    host.render(Element::tag("div").class("app").child(component()));
    assert!(sink.is_empty());
    assert_eq!(host.query_all(".component").map(|v| v.len()), Ok(1));
}

fn constant_bits(bits: u32) -> impl Fn(&i32, &i32) -> ChangedBits {
    move |_: &i32, _: &i32| ChangedBits::from_raw(bits)
}

proptest! {
    #[test]
    fn consumer_rerenders_iff_bits_intersect(
        observed in 0u32..=0x3FFF_FFFF,
        changed in 0u32..=0x3FFF_FFFF
    ) {
        let ctx = create_context_with_policy(0, constant_bits(changed));
        let renders = RenderCounter::new();
        let show: RenderFn<i32> = {
            let renders = renders.clone();
            Rc::new(move |v: &i32| {
                renders.hit();
                Element::text(v.to_string())
            })
        };
        let tree = |value: i32| {
            ctx.provider(value).child(
                ctx.consumer()
                    .observed_bits(observed)
                    .child_render(Rc::clone(&show)),
            )
        };

        let mut host = TestRenderer::default();
        host.render(tree(0));
        host.render(tree(1));

        let expected = if observed & changed != 0 { 2 } else { 1 };
        prop_assert_eq!(renders.get(), expected);
        let shown = if expected == 2 { "1" } else { "0" };
        prop_assert_eq!(host.text(), shown);
    }
}
