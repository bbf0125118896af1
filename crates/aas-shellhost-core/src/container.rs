//! Path-addressed element tree store.
//!
//! A node *is* a container: it owns an optional element value, a cached
//! path, and an ordered list of child nodes. Handles are cheap aliases
//! (`Arc` interior), so a clone refers to the same live node. The
//! invocation engine spawns concurrent work over one submodel tree and
//! relies on this.
//!
//! Sibling `idShort`s are unique; a child's path is always
//! `parent.path + '/' + child.id_short`. Insertion order is significant
//! for iteration and serialization, not for lookup.

use crate::error::{KindMismatch, StoreError};
use crate::events::{ChangeEvent, ChangeEventKind, Subscriber};
use parking_lot::RwLock;
use std::sync::Arc;

/// An element that can live in a container.
///
/// `nested` exposes the child container owned by collection-typed
/// elements so the store can descend through them; leaf elements keep
/// the default.
pub trait Referable: Clone + Send + Sync + 'static {
    /// The sibling-unique short name of this element.
    fn id_short(&self) -> &str;

    /// The nested container owned by this element, if it is one of the
    /// collection-typed kinds.
    fn nested(&self) -> Option<ElementContainer<Self>> {
        None
    }
}

struct NodeState<T: Referable> {
    id_short: String,
    path: String,
    value: Option<T>,
    children: Vec<ElementContainer<T>>,
}

/// One position in the element tree.
pub struct ElementContainer<T: Referable> {
    inner: Arc<RwLock<NodeState<T>>>,
    subscribers: Arc<RwLock<Vec<Subscriber<T>>>>,
}

impl<T: Referable> Clone for ElementContainer<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            subscribers: Arc::clone(&self.subscribers),
        }
    }
}

impl<T: Referable> Default for ElementContainer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Referable> std::fmt::Debug for ElementContainer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementContainer")
            .field("path", &self.path())
            .field("children", &self.len())
            .finish()
    }
}

impl<T: Referable> ElementContainer<T> {
    /// Create an empty root container (no value, empty path).
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(NodeState {
                id_short: String::new(),
                path: String::new(),
                value: None,
                children: Vec::new(),
            })),
            subscribers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// The `idShort` of this node (empty for anonymous roots).
    #[must_use]
    pub fn id_short(&self) -> String {
        self.inner.read().id_short.clone()
    }

    /// The cached path of this node.
    #[must_use]
    pub fn path(&self) -> String {
        self.inner.read().path.clone()
    }

    /// The element value carried by this node, if any.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.inner.read().value.clone()
    }

    /// Number of direct children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().children.len()
    }

    /// Whether this node has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().children.is_empty()
    }

    /// Subscribe to change events on this container.
    ///
    /// Every successful create/update/delete invoked on this handle
    /// fires exactly one event, synchronously, before the call returns.
    pub fn on_change(&self, subscriber: impl Fn(&ChangeEvent<T>) + Send + Sync + 'static) {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    /// Append a new element as a direct child.
    ///
    /// # Errors
    ///
    /// `Conflict` if a sibling already uses the element's `idShort`,
    /// `InvalidArgument` if the `idShort` is empty.
    pub fn create(&self, element: T) -> Result<T, StoreError> {
        let node = self.create_inner(&element)?;
        self.fire(ChangeEvent {
            kind: ChangeEventKind::Created,
            path: node.path(),
            id_short: node.id_short(),
            element: Some(element.clone()),
        });
        Ok(element)
    }

    /// Resolve a `/`-delimited path to its element value.
    ///
    /// A single-segment path is a direct-child lookup.
    ///
    /// # Errors
    ///
    /// `NotFound` if any segment is missing or the resolved node
    /// carries no value.
    pub fn retrieve(&self, path: &str) -> Result<T, StoreError> {
        let node = self.resolve(path)?;
        node.value().ok_or_else(|| StoreError::no_value(path))
    }

    /// Resolve a path and narrow the element to a concrete kind.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve, or (with a
    /// kind-mismatch detail) if the element is not of kind `U`.
    pub fn retrieve_typed<U>(&self, path: &str) -> Result<U, StoreError>
    where
        U: TryFrom<T, Error = KindMismatch>,
    {
        let element = self.retrieve(path)?;
        U::try_from(element).map_err(|mismatch| StoreError::NotFound {
            path: path.to_string(),
            detail: mismatch.to_string(),
        })
    }

    /// All direct child values, in insertion order.
    #[must_use]
    pub fn retrieve_all(&self) -> Vec<T> {
        self.inner
            .read()
            .children
            .iter()
            .filter_map(ElementContainer::value)
            .collect()
    }

    /// Direct child values matching a predicate. An empty result is
    /// success, not failure.
    #[must_use]
    pub fn retrieve_where(&self, predicate: impl Fn(&T) -> bool) -> Vec<T> {
        self.retrieve_all()
            .into_iter()
            .filter(|element| predicate(element))
            .collect()
    }

    /// Replace the element at an existing path, or create it when the
    /// path does not yet resolve.
    ///
    /// A resolved path is replaced in place, preserving its sibling
    /// position. An absent multi-segment path delegates to `create` on
    /// the parent; an absent single-segment path behaves as `create`.
    ///
    /// # Errors
    ///
    /// `NotFound` if the parent of an absent multi-segment path is
    /// missing; `Conflict`/`InvalidArgument` as for `create`.
    pub fn create_or_update(&self, path: &str, element: T) -> Result<T, StoreError> {
        if self.resolve(path).is_ok() {
            return self.update(path, element);
        }
        let created_path;
        match path.rsplit_once('/') {
            Some((parent_path, _)) => {
                let parent = self.resolve(parent_path)?;
                let node = parent.create_inner(&element)?;
                created_path = node.path();
            }
            None => {
                let node = self.create_inner(&element)?;
                created_path = node.path();
            }
        }
        self.fire(ChangeEvent {
            kind: ChangeEventKind::Created,
            path: created_path,
            id_short: element.id_short().to_string(),
            element: Some(element.clone()),
        });
        Ok(element)
    }

    /// Replace the element at an existing path, leaving its sibling
    /// position untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn update(&self, path: &str, element: T) -> Result<T, StoreError> {
        let (parent, last) = self.parent_of(path)?;
        let node = parent.replace_child(last, &element, path)?;
        self.fire(ChangeEvent {
            kind: ChangeEventKind::Updated,
            path: node.path(),
            id_short: element.id_short().to_string(),
            element: Some(element.clone()),
        });
        Ok(element)
    }

    /// Detach the node at a path from its parent.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not resolve.
    pub fn delete(&self, path: &str) -> Result<(), StoreError> {
        let (parent, last) = self.parent_of(path)?;
        let removed = parent.detach_child(last, path)?;
        self.fire(ChangeEvent {
            kind: ChangeEventKind::Deleted,
            path: join_path(&self.path(), path),
            id_short: removed,
            element: None,
        });
        Ok(())
    }

    /// Whether a direct child with the given `idShort` exists.
    #[must_use]
    pub fn has_child(&self, id_short: &str) -> bool {
        self.child(id_short).is_some()
    }

    /// Whether the given path resolves to a node.
    #[must_use]
    pub fn has_child_path(&self, path: &str) -> bool {
        self.resolve(path).is_ok()
    }

    /// The node at a path, rather than its value.
    #[must_use]
    pub fn get_child(&self, path: &str) -> Option<Self> {
        self.resolve(path).ok()
    }

    /// Visit every value in the subtree in pre-order: a node's own
    /// value first, then its children.
    pub fn traverse(&self, action: &mut impl FnMut(&T)) {
        let (value, children) = {
            let state = self.inner.read();
            (state.value.clone(), state.children.clone())
        };
        if let Some(element) = &value {
            action(element);
        }
        for child in children {
            child.traverse(action);
        }
    }

    /// A finite, restartable snapshot of all values in the subtree,
    /// value-then-descendants order.
    #[must_use]
    pub fn flatten(&self) -> Vec<T> {
        let mut out = Vec::new();
        self.traverse(&mut |element| out.push(element.clone()));
        out
    }

    /// Rewrite the cached path of this node and all descendants for a
    /// new root prefix. Applied once per reparenting; recomputing from
    /// the prefix keeps it idempotent.
    pub fn append_root_path(&self, prefix: &str) {
        let (new_path, children) = {
            let mut state = self.inner.write();
            state.path = join_path(prefix, &state.id_short);
            (state.path.clone(), state.children.clone())
        };
        for child in children {
            child.append_root_path(&new_path);
        }
    }

    // -- internals ---------------------------------------------------

    /// Build the node for an element (its own nested container when it
    /// has one), attach it under this node, without firing an event.
    fn create_inner(&self, element: &T) -> Result<Self, StoreError> {
        let id_short = element.id_short().to_string();
        if id_short.is_empty() {
            return Err(StoreError::InvalidArgument(
                "idShort must not be empty".to_string(),
            ));
        }
        let node = Self::adopt(element, &self.path());
        let mut state = self.inner.write();
        if state
            .children
            .iter()
            .any(|child| child.id_short() == id_short)
        {
            return Err(StoreError::Conflict { id_short });
        }
        state.children.push(node.clone());
        drop(state);
        tracing::debug!(path = %node.path(), "element created");
        Ok(node)
    }

    /// Turn an element into a tree node under `parent_path`.
    fn adopt(element: &T, parent_path: &str) -> Self {
        let node = element.nested().unwrap_or_default();
        {
            let mut state = node.inner.write();
            state.id_short = element.id_short().to_string();
            state.value = Some(element.clone());
        }
        node.append_root_path(parent_path);
        node
    }

    fn replace_child(&self, id_short: &str, element: &T, path: &str) -> Result<Self, StoreError> {
        let node = Self::adopt(element, &self.path());
        let mut state = self.inner.write();
        let index = state
            .children
            .iter()
            .position(|child| child.id_short() == id_short)
            .ok_or_else(|| StoreError::missing(path, id_short))?;
        state.children[index] = node.clone();
        drop(state);
        tracing::debug!(path = %node.path(), "element updated");
        Ok(node)
    }

    fn detach_child(&self, id_short: &str, path: &str) -> Result<String, StoreError> {
        let mut state = self.inner.write();
        let index = state
            .children
            .iter()
            .position(|child| child.id_short() == id_short)
            .ok_or_else(|| StoreError::missing(path, id_short))?;
        let removed = state.children.remove(index);
        drop(state);
        tracing::debug!(path = %removed.path(), "element deleted");
        Ok(removed.id_short())
    }

    fn resolve(&self, path: &str) -> Result<Self, StoreError> {
        if path.is_empty() {
            return Err(StoreError::InvalidArgument(
                "path must not be empty".to_string(),
            ));
        }
        let mut node = self.clone();
        for segment in path.split('/') {
            node = node
                .child(segment)
                .ok_or_else(|| StoreError::missing(path, segment))?;
        }
        Ok(node)
    }

    fn child(&self, id_short: &str) -> Option<Self> {
        self.inner
            .read()
            .children
            .iter()
            .find(|child| child.id_short() == id_short)
            .cloned()
    }

    fn parent_of<'a>(&self, path: &'a str) -> Result<(Self, &'a str), StoreError> {
        match path.rsplit_once('/') {
            Some((parent_path, last)) => Ok((self.resolve(parent_path)?, last)),
            None => Ok((self.clone(), path)),
        }
    }

    fn fire(&self, event: ChangeEvent<T>) {
        let subscribers: Vec<Subscriber<T>> = self.subscribers.read().clone();
        for subscriber in subscribers {
            subscriber(&event);
        }
    }
}

/// Join a path prefix and an `idShort`, eliding empty parts.
#[must_use]
pub fn join_path(prefix: &str, id_short: &str) -> String {
    if prefix.is_empty() {
        id_short.to_string()
    } else if id_short.is_empty() {
        prefix.to_string()
    } else {
        format!("{prefix}/{id_short}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum Node {
        Leaf { id: String, n: i64 },
        Group { id: String, members: ElementContainer<Node> },
    }

    impl Node {
        fn leaf(id: &str, n: i64) -> Self {
            Node::Leaf {
                id: id.to_string(),
                n,
            }
        }

        fn group(id: &str) -> Self {
            Node::Group {
                id: id.to_string(),
                members: ElementContainer::new(),
            }
        }

        fn n(&self) -> i64 {
            match self {
                Node::Leaf { n, .. } => *n,
                Node::Group { .. } => panic!("not a leaf"),
            }
        }
    }

    impl Referable for Node {
        fn id_short(&self) -> &str {
            match self {
                Node::Leaf { id, .. } | Node::Group { id, .. } => id,
            }
        }

        fn nested(&self) -> Option<ElementContainer<Node>> {
            match self {
                Node::Leaf { .. } => None,
                Node::Group { members, .. } => Some(members.clone()),
            }
        }
    }

    #[test]
    fn create_then_retrieve() {
        let root = ElementContainer::new();
        root.create(Node::leaf("Temperature", 25)).unwrap();

        let got = root.retrieve("Temperature").unwrap();
        assert_eq!(got.n(), 25);
    }

    #[test]
    fn retrieve_missing_is_not_found() {
        let root: ElementContainer<Node> = ElementContainer::new();
        assert!(matches!(
            root.retrieve("Nothing"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn duplicate_id_short_is_conflict() {
        let root = ElementContainer::new();
        root.create(Node::leaf("X", 1)).unwrap();

        let err = root.create(Node::leaf("X", 2)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        // First element is untouched
        assert_eq!(root.retrieve("X").unwrap().n(), 1);
    }

    #[test]
    fn empty_id_short_is_invalid() {
        let root = ElementContainer::new();
        assert!(matches!(
            root.create(Node::leaf("", 0)),
            Err(StoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn nested_path_descent() {
        let root = ElementContainer::new();
        let group = Node::group("Motor");
        group.nested().unwrap().create(Node::leaf("Rpm", 3000)).unwrap();
        root.create(group).unwrap();

        assert_eq!(root.retrieve("Motor/Rpm").unwrap().n(), 3000);
        assert!(root.has_child_path("Motor/Rpm"));
        assert!(!root.has_child_path("Motor/Torque"));
    }

    #[test]
    fn paths_follow_reparenting() {
        let root = ElementContainer::new();
        let group = Node::group("Motor");
        group.nested().unwrap().create(Node::leaf("Rpm", 0)).unwrap();
        root.create(group).unwrap();

        let node = root.get_child("Motor/Rpm").unwrap();
        assert_eq!(node.path(), "Motor/Rpm");
    }

    #[test]
    fn delete_fires_exactly_one_event() {
        let root = ElementContainer::new();
        root.create(Node::leaf("Old", 1)).unwrap();

        let deleted: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&deleted);
        root.on_change(move |event| {
            if event.kind == ChangeEventKind::Deleted {
                sink.lock().unwrap().push(event.id_short.clone());
            }
        });

        root.delete("Old").unwrap();
        assert_eq!(deleted.lock().unwrap().as_slice(), ["Old".to_string()]);
        assert!(matches!(
            root.retrieve("Old"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn delete_missing_is_not_found() {
        let root: ElementContainer<Node> = ElementContainer::new();
        assert!(matches!(
            root.delete("Ghost"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn create_or_update_preserves_position() {
        let root = ElementContainer::new();
        root.create(Node::leaf("A", 1)).unwrap();
        root.create(Node::leaf("B", 2)).unwrap();
        root.create(Node::leaf("C", 3)).unwrap();

        root.create_or_update("B", Node::leaf("B", 20)).unwrap();

        let order: Vec<String> = root
            .retrieve_all()
            .iter()
            .map(|e| e.id_short().to_string())
            .collect();
        assert_eq!(order, ["A", "B", "C"]);
        assert_eq!(root.retrieve("B").unwrap().n(), 20);
    }

    #[test]
    fn create_or_update_creates_when_absent() {
        let root = ElementContainer::new();
        let events = Arc::new(AtomicUsize::new(0));
        let count = Arc::clone(&events);
        root.on_change(move |event| {
            if event.kind == ChangeEventKind::Created {
                count.fetch_add(1, Ordering::SeqCst);
            }
        });

        root.create_or_update("Fresh", Node::leaf("Fresh", 7)).unwrap();
        assert_eq!(root.retrieve("Fresh").unwrap().n(), 7);
        assert_eq!(events.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn create_or_update_needs_existing_parent() {
        let root = ElementContainer::new();
        let err = root
            .create_or_update("Missing/Child", Node::leaf("Child", 1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn update_requires_existing_path() {
        let root = ElementContainer::new();
        assert!(matches!(
            root.update("Nope", Node::leaf("Nope", 1)),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn flatten_is_value_then_descendants() {
        let root = ElementContainer::new();
        let group = Node::group("G");
        group.nested().unwrap().create(Node::leaf("Inner", 2)).unwrap();
        root.create(Node::leaf("First", 1)).unwrap();
        root.create(group).unwrap();
        root.create(Node::leaf("Last", 3)).unwrap();

        let ids: Vec<String> = root
            .flatten()
            .iter()
            .map(|e| e.id_short().to_string())
            .collect();
        assert_eq!(ids, ["First", "G", "Inner", "Last"]);

        // Restartable: a second pass sees the same sequence
        assert_eq!(root.flatten().len(), 4);
    }

    #[test]
    fn retrieve_where_filters() {
        let root = ElementContainer::new();
        root.create(Node::leaf("A", 1)).unwrap();
        root.create(Node::leaf("B", 10)).unwrap();

        let big = root.retrieve_where(|e| matches!(e, Node::Leaf { n, .. } if *n > 5));
        assert_eq!(big.len(), 1);

        let none = root.retrieve_where(|_| false);
        assert!(none.is_empty());
    }

    #[test]
    fn join_path_elides_empty_parts() {
        assert_eq!(join_path("", "A"), "A");
        assert_eq!(join_path("Root", "A"), "Root/A");
        assert_eq!(join_path("Root", ""), "Root");
    }
}
