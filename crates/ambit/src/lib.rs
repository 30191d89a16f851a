#![forbid(unsafe_code)]

//! Context providers and consumers for component trees.
//!
//! # Role in ambit
//! A [`Provider`] high in a tree publishes a value; any [`Consumer`] below it
//! reads the value without it being threaded through every layer in
//! between. When the provider's value changes, only the consumers that
//! observe the changed aspects recompute.
//!
//! # Primary responsibilities
//! - **Context**: [`create_context`] mints a private identity and hands out
//!   provider and consumer builders sharing it.
//! - **Provider**: owns one emitter per instance and writes it to the ambient
//!   data of its subtree.
//! - **Consumer**: binds to the nearest emitter, filters notifications by
//!   observed bits, and re-binds when the tree moves it under another
//!   provider.
//! - **Host interface**: [`host`] fixes what a component runtime must offer.
//!
//! # How it fits in the system
//! The value emitter, change bitmasks and ambient data map live in
//! `ambit-core`. A host runtime drives the components defined here;
//! `ambit-harness` ships a reference host for tests.

pub mod consumer;
pub mod context;
pub mod host;
pub mod provider;

pub use consumer::{
    Consumer, ConsumerBuilder, ConsumerChild, ConsumerProps, RenderFn, RenderSource, Resolution,
};
pub use context::{Context, ContextBuilder, ContextOptions, create_context, create_context_with_policy};
pub use host::{
    AnyComponent, Component, ComponentElement, ComponentKind, Element, NodeId, Scope, TagElement,
    UpdateHandle, UpdateScheduler,
};
pub use provider::{Provider, ProviderBuilder, ProviderProps};

pub use ambit_core::{
    AmbientData, ChangedBits, CollectingSink, ContextId, Diagnostic, DiagnosticSink, Emitter,
    NoProvider, SharedSink, Shared, SilentSink, TracingSink, Updater, ValueEmitter,
};
