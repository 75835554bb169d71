//! Reclaims scopes kept alive only by closures stored inside them.
//!
//! A function literal captures the scope it is evaluated in, so
//! `let f = fn() { 1 };` leaves the scope holding `f` and `f` holding the
//! scope. When a handle to a scope is dropped while other references remain,
//! everything reachable from that scope is scanned. A node whose strong count
//! is fully accounted for by references from inside the scan, and which no
//! externally held node reaches, is garbage. Emptying the stores of garbage
//! scopes breaks their cycles and `Rc` frees the rest.
//!
//! Scopes that survive a scan are remembered, since whatever kept them alive
//! may be dropped later, and are rescanned by `collect_garbage`.

use super::Scope;
use crate::object::{FunctionObject, Object};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::{Rc, Weak};

// Remembered scopes are rescanned once at least this many pile up.
const MIN_RESCAN_THRESHOLD: usize = 64;

struct Suspects {
    scopes: Vec<Weak<Scope>>,
    threshold: usize,
}

thread_local! {
    static SUSPECTS: RefCell<Suspects> = RefCell::new(Suspects {
        scopes: Vec::new(),
        threshold: MIN_RESCAN_THRESHOLD,
    });
}

type NodeId = usize;

fn address<T>(ptr: *const T) -> NodeId {
    ptr as *const () as NodeId
}

enum Node {
    Scope(Weak<Scope>),
    Function(Weak<FunctionObject>),
    Array(Weak<Vec<Object>>),
}

impl Node {
    fn id(&self) -> NodeId {
        match self {
            Self::Scope(weak) => address(weak.as_ptr()),
            Self::Function(weak) => address(weak.as_ptr()),
            Self::Array(weak) => address(weak.as_ptr()),
        }
    }

    fn strong_count(&self) -> usize {
        match self {
            Self::Scope(weak) => weak.strong_count(),
            Self::Function(weak) => weak.strong_count(),
            Self::Array(weak) => weak.strong_count(),
        }
    }

    fn push_object(value: &Object, nodes: &mut Vec<Node>) {
        match value {
            Object::Function(func) => nodes.push(Self::Function(Rc::downgrade(func))),
            Object::Array(elements) => nodes.push(Self::Array(Rc::downgrade(elements))),
            _ => {}
        }
    }

    // One entry per strong reference this node holds. `None` when a store is
    // in use and cannot be inspected.
    fn children(&self) -> Option<Vec<Node>> {
        let mut children = Vec::new();
        match self {
            Self::Scope(weak) => {
                if let Some(scope) = weak.upgrade() {
                    let store = scope.store.try_borrow().ok()?;
                    for value in store.values() {
                        Self::push_object(value, &mut children);
                    }
                    if let Some(outer) = &scope.outer {
                        children.push(Self::Scope(Rc::downgrade(outer)));
                    }
                }
            }
            Self::Function(weak) => {
                if let Some(func) = weak.upgrade() {
                    children.push(Self::Scope(Rc::downgrade(&func.env)));
                }
            }
            Self::Array(weak) => {
                if let Some(elements) = weak.upgrade() {
                    for value in elements.iter() {
                        Self::push_object(value, &mut children);
                    }
                }
            }
        }
        Some(children)
    }
}

struct Entry {
    node: Node,
    edges: Vec<NodeId>,
    internal: usize,
}

impl Entry {
    fn new(node: Node) -> Self {
        Self {
            node,
            edges: Vec::new(),
            internal: 0,
        }
    }
}

struct Graph {
    entries: HashMap<NodeId, Entry>,
}

impl Graph {
    fn scan(starts: Vec<Node>) -> Option<Self> {
        let mut entries: HashMap<NodeId, Entry> = HashMap::new();
        let mut pending = Vec::new();

        for node in starts {
            let id = node.id();
            if !entries.contains_key(&id) {
                entries.insert(id, Entry::new(node));
                pending.push(id);
            }
        }

        while let Some(id) = pending.pop() {
            let children = entries.get(&id)?.node.children()?;
            let mut edges = Vec::with_capacity(children.len());
            for child in children {
                let child_id = child.id();
                let entry = entries.entry(child_id).or_insert_with(|| {
                    pending.push(child_id);
                    Entry::new(child)
                });
                entry.internal += 1;
                edges.push(child_id);
            }
            if let Some(entry) = entries.get_mut(&id) {
                entry.edges = edges;
            }
        }

        Some(Self { entries })
    }

    /// Scopes that no externally held node reaches. `released` names a scope
    /// whose handle is being dropped, so that handle no longer counts.
    fn unreachable_scopes(&self, released: Option<NodeId>) -> Vec<Rc<Scope>> {
        let mut live = HashSet::new();
        let mut pending = Vec::new();

        for (id, entry) in self.entries.iter() {
            let mut strong = entry.node.strong_count();
            if released == Some(*id) {
                strong = strong.saturating_sub(1);
            }
            if strong > entry.internal {
                live.insert(*id);
                pending.push(*id);
            }
        }

        while let Some(id) = pending.pop() {
            if let Some(entry) = self.entries.get(&id) {
                for edge in entry.edges.iter() {
                    if live.insert(*edge) {
                        pending.push(*edge);
                    }
                }
            }
        }

        self.entries
            .iter()
            .filter(|(id, _)| !live.contains(*id))
            .filter_map(|(_, entry)| match &entry.node {
                Node::Scope(weak) => weak.upgrade(),
                _ => None,
            })
            .collect()
    }
}

fn sweep(garbage: Vec<Rc<Scope>>) {
    if garbage.is_empty() {
        return;
    }
    tracing::trace!(scopes = garbage.len(), "releasing unreachable scopes");

    let mut bindings = Vec::with_capacity(garbage.len());
    for scope in garbage.iter() {
        if let Ok(mut store) = scope.store.try_borrow_mut() {
            bindings.push(std::mem::take(&mut *store));
        }
    }
    // Values are dropped only once no store is borrowed.
    drop(garbage);
    drop(bindings);
}

/// Called when a handle to `scope` is dropped while other references remain.
pub(super) fn collect_on_release(scope: &Rc<Scope>) {
    let start = Node::Scope(Rc::downgrade(scope));
    let released = start.id();

    let garbage = match Graph::scan(vec![start]) {
        Some(graph) => graph.unreachable_scopes(Some(released)),
        None => Vec::new(),
    };
    let released_is_garbage = garbage.iter().any(|g| Rc::ptr_eq(g, scope));
    sweep(garbage);

    if !released_is_garbage {
        // Handles dropped during thread teardown are simply not remembered.
        let rescan = SUSPECTS
            .try_with(|suspects| {
                let mut suspects = suspects.borrow_mut();
                suspects.scopes.push(Rc::downgrade(scope));
                suspects.scopes.len() >= suspects.threshold
            })
            .unwrap_or(false);
        if rescan {
            collect_garbage();
        }
    }
}

/// Rescans every remembered scope and releases the ones whose closures have
/// since become unreachable.
pub fn collect_garbage() {
    let suspects: Vec<Weak<Scope>> = SUSPECTS
        .with(|suspects| std::mem::take(&mut suspects.borrow_mut().scopes))
        .into_iter()
        .filter(|weak| weak.strong_count() > 0)
        .collect();
    if suspects.is_empty() {
        return;
    }

    let starts = suspects.iter().map(|weak| Node::Scope(weak.clone())).collect();
    if let Some(graph) = Graph::scan(starts) {
        sweep(graph.unreachable_scopes(None));
    }

    let mut seen = HashSet::new();
    let survivors: Vec<Weak<Scope>> = suspects
        .into_iter()
        .filter(|weak| weak.strong_count() > 0 && seen.insert(address(weak.as_ptr())))
        .collect();

    SUSPECTS.with(|suspects| {
        let mut suspects = suspects.borrow_mut();
        suspects.threshold = MIN_RESCAN_THRESHOLD.max(2 * survivors.len());
        suspects.scopes.extend(survivors);
    });
}
