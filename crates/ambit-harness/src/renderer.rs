#![forbid(unsafe_code)]

//! Retained-tree reference host.
//!
//! [`TestRenderer`] mounts an [`Element`] tree, keeps component instances in
//! an arena keyed by [`NodeId`], and reconciles new trees against the
//! mounted one by position: a component of the same kind at the same place
//! is updated, anything else is unmounted and replaced.
//!
//! # Forced updates
//!
//! Update handles push node ids onto a queue instead of re-entering the
//! renderer. The queue is flushed after every [`TestRenderer::render`] in
//! passes: each pass drains the ids queued so far, deduplicated, in request
//! order; requests raised during a pass go to the next one. Ids of nodes
//! unmounted in the meantime are skipped.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use ambit::{
    AmbientData, AnyComponent, ComponentElement, ComponentKind, Element, NodeId, Scope,
    UpdateHandle, UpdateScheduler,
};
use tracing::{debug, trace, warn};

use crate::config::HarnessConfig;
use crate::events::{EventLog, Phase};
use crate::markup::{HostNode, QueryError, Selector, to_markup};

#[derive(Default)]
struct UpdateQueue {
    pending: RefCell<VecDeque<NodeId>>,
}

impl UpdateScheduler for UpdateQueue {
    fn schedule(&self, node: NodeId) {
        let mut pending = self.pending.borrow_mut();
        if !pending.contains(&node) {
            pending.push_back(node);
        }
    }
}

impl UpdateQueue {
    fn drain(&self) -> Vec<NodeId> {
        self.pending.borrow_mut().drain(..).collect()
    }

    fn len(&self) -> usize {
        self.pending.borrow().len()
    }
}

/// What the renderer holds at one position of its output.
#[derive(Debug, Default)]
enum Mounted {
    #[default]
    Empty,
    Text(String),
    Tag {
        name: String,
        class: Option<String>,
        children: Vec<Mounted>,
    },
    Fragment(Vec<Mounted>),
    Component(NodeId),
}

struct Instance {
    element: ComponentElement,
    component: Box<dyn AnyComponent>,
    ambient: AmbientData,
    child: Mounted,
}

impl Instance {
    fn kind(&self) -> ComponentKind {
        self.element.kind()
    }
}

/// Summary of one [`TestRenderer::flush`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub passes: usize,
    pub updates: usize,
    /// Requests still queued because the pass limit was reached.
    pub pending: usize,
}

/// Reference host used by tests.
pub struct TestRenderer {
    config: HarnessConfig,
    queue: Rc<UpdateQueue>,
    scheduler: Weak<dyn UpdateScheduler>,
    nodes: HashMap<NodeId, Instance>,
    root: Mounted,
    next_id: u64,
    log: EventLog,
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new(HarnessConfig::default())
    }
}

impl std::fmt::Debug for TestRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestRenderer")
            .field("config", &self.config)
            .field("mounted", &self.nodes.len())
            .field("pending", &self.queue.len())
            .finish()
    }
}

impl TestRenderer {
    #[must_use]
    pub fn new(config: HarnessConfig) -> Self {
        let queue = Rc::new(UpdateQueue::default());
        let weak: Weak<UpdateQueue> = Rc::downgrade(&queue);
        let scheduler: Weak<dyn UpdateScheduler> = weak;
        let log = EventLog::new(config.record_events);
        Self {
            config,
            queue,
            scheduler,
            nodes: HashMap::new(),
            root: Mounted::Empty,
            next_id: 0,
            log,
        }
    }

    #[must_use]
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Reconcile `element` against the current tree, then flush forced
    /// updates.
    pub fn render(&mut self, element: impl Into<Element>) -> FlushReport {
        let element = element.into();
        let old = std::mem::take(&mut self.root);
        self.root = self.reconcile(old, &element, &AmbientData::new());
        self.flush()
    }

    /// Unmount everything.
    pub fn unmount(&mut self) {
        let old = std::mem::take(&mut self.root);
        self.unmount_node(old);
        self.queue.drain();
    }

    /// Process queued forced updates.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        while report.passes < self.config.max_flush_passes {
            let batch = self.queue.drain();
            if batch.is_empty() {
                break;
            }
            report.passes += 1;
            for id in batch {
                if self.force_update(id) {
                    report.updates += 1;
                }
            }
        }
        report.pending = self.queue.len();
        if report.pending > 0 {
            warn!(
                passes = report.passes,
                pending = report.pending,
                "flush pass limit reached"
            );
        }
        report
    }

    /// Number of mounted component instances.
    #[must_use]
    pub fn mounted_count(&self) -> usize {
        self.nodes.len()
    }

    /// Ids of mounted components named `name`, in mount order.
    #[must_use]
    pub fn find_nodes(&self, name: &str) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .iter()
            .filter(|(_, inst)| inst.kind().name() == name)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn clear_events(&mut self) {
        self.log.clear();
    }

    /// Snapshot of the host output with components and fragments flattened.
    #[must_use]
    pub fn host_nodes(&self) -> Vec<HostNode> {
        let mut out = Vec::new();
        self.collect_host(&self.root, &mut out);
        out
    }

    /// Host output as markup.
    #[must_use]
    pub fn markup(&self) -> String {
        to_markup(&self.host_nodes())
    }

    /// Text content of the host output.
    #[must_use]
    pub fn text(&self) -> String {
        self.host_nodes().iter().map(HostNode::text_content).collect()
    }

    /// Text content of every node matching `selector`.
    pub fn query_all(&self, selector: &str) -> Result<Vec<String>, QueryError> {
        let selector = Selector::parse(selector)?;
        let roots = self.host_nodes();
        Ok(selector
            .select(&roots)
            .into_iter()
            .map(HostNode::text_content)
            .collect())
    }

    /// Text content of the single node matching `selector`.
    pub fn query(&self, selector: &str) -> Result<String, QueryError> {
        let selector = Selector::parse(selector)?;
        let roots = self.host_nodes();
        selector.select_one(&roots).map(HostNode::text_content)
    }

    fn collect_host(&self, mounted: &Mounted, out: &mut Vec<HostNode>) {
        match mounted {
            Mounted::Empty => {}
            Mounted::Text(text) => out.push(HostNode::Text(text.clone())),
            Mounted::Tag {
                name,
                class,
                children,
            } => {
                let mut inner = Vec::new();
                for child in children {
                    self.collect_host(child, &mut inner);
                }
                out.push(HostNode::Tag {
                    name: name.clone(),
                    class: class.clone(),
                    children: inner,
                });
            }
            Mounted::Fragment(children) => {
                for child in children {
                    self.collect_host(child, out);
                }
            }
            Mounted::Component(id) => {
                if let Some(inst) = self.nodes.get(id) {
                    self.collect_host(&inst.child, out);
                }
            }
        }
    }

    fn scope(&self, node: NodeId, ambient: AmbientData) -> Scope {
        Scope::new(
            ambient,
            UpdateHandle::new(node, Weak::clone(&self.scheduler)),
            self.config.fragments,
        )
    }

    fn mount(&mut self, element: &Element, ambient: &AmbientData) -> Mounted {
        match element {
            Element::Empty => Mounted::Empty,
            Element::Text(text) => Mounted::Text(text.clone()),
            Element::Tag(tag) => Mounted::Tag {
                name: tag.name.clone(),
                class: tag.class.clone(),
                children: tag
                    .children
                    .iter()
                    .map(|child| self.mount(child, ambient))
                    .collect(),
            },
            Element::Fragment(children) => Mounted::Fragment(
                children
                    .iter()
                    .map(|child| self.mount(child, ambient))
                    .collect(),
            ),
            Element::Component(component) => self.mount_component(component, ambient),
        }
    }

    fn mount_component(&mut self, element: &ComponentElement, ambient: &AmbientData) -> Mounted {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        let scope = self.scope(id, ambient.clone());
        let Some(mut component) = element.instantiate(&scope) else {
            warn!(node = %id, component = element.kind().name(), "props do not match component");
            return Mounted::Empty;
        };
        let name = component.name();
        debug!(node = %id, component = name, "mount");
        self.log.record(id, name, Phase::Create);

        let props = element.props().as_ref();
        let child_ambient = component.provide(props, ambient);
        let output = component.render(props, &scope);
        self.log.record(id, name, Phase::Render);
        let child = self.mount(&output, &child_ambient);

        component.did_mount(props, &scope);
        self.log.record(id, name, Phase::Mount);
        self.nodes.insert(
            id,
            Instance {
                element: element.clone(),
                component,
                ambient: ambient.clone(),
                child,
            },
        );
        Mounted::Component(id)
    }

    fn reconcile(&mut self, old: Mounted, next: &Element, ambient: &AmbientData) -> Mounted {
        match (old, next) {
            (Mounted::Component(id), Element::Component(component))
                if self.nodes.get(&id).map(Instance::kind) == Some(component.kind()) =>
            {
                self.update_component(id, component, ambient, Phase::Update);
                Mounted::Component(id)
            }
            (
                Mounted::Tag {
                    name, children, ..
                },
                Element::Tag(tag),
            ) if name == tag.name => Mounted::Tag {
                name,
                class: tag.class.clone(),
                children: self.reconcile_children(children, &tag.children, ambient),
            },
            (Mounted::Fragment(children), Element::Fragment(next)) => {
                Mounted::Fragment(self.reconcile_children(children, next, ambient))
            }
            (old, next) => {
                self.unmount_node(old);
                self.mount(next, ambient)
            }
        }
    }

    fn reconcile_children(
        &mut self,
        old: Vec<Mounted>,
        next: &[Element],
        ambient: &AmbientData,
    ) -> Vec<Mounted> {
        let mut old = old.into_iter();
        let mut out = Vec::with_capacity(next.len());
        for element in next {
            let mounted = match old.next() {
                Some(prev) => self.reconcile(prev, element, ambient),
                None => self.mount(element, ambient),
            };
            out.push(mounted);
        }
        for rest in old {
            self.unmount_node(rest);
        }
        out
    }

    /// Run the update sequence for `id` with `next` props under `ambient`.
    /// Returns false if `should_update` declined.
    fn update_component(
        &mut self,
        id: NodeId,
        next: &ComponentElement,
        ambient: &AmbientData,
        phase: Phase,
    ) -> bool {
        let Some(mut inst) = self.nodes.remove(&id) else {
            return false;
        };
        let name = inst.component.name();
        let scope = self.scope(id, ambient.clone());
        let prev = std::mem::replace(&mut inst.element, next.clone());
        let prev_ambient = std::mem::replace(&mut inst.ambient, ambient.clone());
        let prev_props = prev.props().as_ref();
        let next_props = next.props().as_ref();

        if !inst.component.should_update(prev_props, next_props, &scope) {
            self.log.record(id, name, Phase::Skip);
            self.nodes.insert(id, inst);
            return false;
        }

        let child_ambient = inst.component.provide(next_props, ambient);
        let output = inst.component.render(next_props, &scope);
        self.log.record(id, name, Phase::Render);
        let old_child = std::mem::take(&mut inst.child);
        inst.child = self.reconcile(old_child, &output, &child_ambient);

        inst.component
            .did_update(prev_props, next_props, &prev_ambient, &scope);
        self.log.record(id, name, phase);
        self.nodes.insert(id, inst);
        true
    }

    fn force_update(&mut self, id: NodeId) -> bool {
        let Some(inst) = self.nodes.get(&id) else {
            trace!(node = %id, "forced update for unmounted node skipped");
            return false;
        };
        let element = inst.element.clone();
        let ambient = inst.ambient.clone();
        self.update_component(id, &element, &ambient, Phase::Forced)
    }

    fn unmount_node(&mut self, mounted: Mounted) {
        match mounted {
            Mounted::Empty | Mounted::Text(_) => {}
            Mounted::Tag { children, .. } | Mounted::Fragment(children) => {
                for child in children {
                    self.unmount_node(child);
                }
            }
            Mounted::Component(id) => {
                let Some(mut inst) = self.nodes.remove(&id) else {
                    return;
                };
                let name = inst.component.name();
                let scope = self.scope(id, inst.ambient.clone());
                inst.component.will_unmount(&scope);
                self.log.record(id, name, Phase::Unmount);
                debug!(node = %id, component = name, "unmount");
                let child = std::mem::take(&mut inst.child);
                self.unmount_node(child);
            }
        }
    }
}

impl Drop for TestRenderer {
    fn drop(&mut self) {
        self.unmount();
    }
}
