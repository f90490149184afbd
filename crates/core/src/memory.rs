#![forbid(unsafe_code)]

use crate::error::HierarchyError;
use crate::ids::NodeId;
use crate::node::{Node, NodeUpdate};
use crate::path::AncestorPath;
use crate::store::NodeStore;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("memory store: injected failure in {0}")]
    Injected(&'static str),
}

#[derive(Clone, Copy, Debug, Default)]
struct Faults {
    update_row: bool,
    bulk_rewrite: bool,
}

/// A node table kept in a `BTreeMap`, ordered by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RefCell<BTreeMap<NodeId, Node>>,
    faults: Cell<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nodes(nodes: impl IntoIterator<Item = Node>) -> Self {
        let store = Self::new();
        for node in nodes {
            store.insert(node);
        }
        store
    }

    /// Plain row insert; the caller is responsible for a consistent path.
    pub fn insert(&self, node: Node) -> Option<Node> {
        self.rows.borrow_mut().insert(node.id, node)
    }

    pub fn remove(&self, id: NodeId) -> Option<Node> {
        self.rows.borrow_mut().remove(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<Node> {
        self.rows.borrow().get(&id).cloned()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.rows.borrow().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.rows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.borrow().is_empty()
    }

    #[cfg(test)]
    pub(crate) fn fail_update_row(&self, fail: bool) {
        let mut faults = self.faults.get();
        faults.update_row = fail;
        self.faults.set(faults);
    }

    #[cfg(test)]
    pub(crate) fn fail_bulk_rewrite(&self, fail: bool) {
        let mut faults = self.faults.get();
        faults.bulk_rewrite = fail;
        self.faults.set(faults);
    }
}

impl NodeStore for MemoryStore {
    type Error = MemoryStoreError;

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>, Self::Error> {
        Ok(self.get(id))
    }

    fn find_by_ids(&self, ids: &[NodeId]) -> Result<Vec<Node>, Self::Error> {
        let rows = self.rows.borrow();
        Ok(rows
            .values()
            .filter(|node| ids.contains(&node.id))
            .cloned()
            .collect())
    }

    fn find_where_path_contains(&self, id: NodeId) -> Result<Vec<Node>, Self::Error> {
        let rows = self.rows.borrow();
        Ok(rows
            .values()
            .filter(|node| node.parent_path.contains(id))
            .cloned()
            .collect())
    }

    fn update_row(&self, id: NodeId, update: &NodeUpdate) -> Result<bool, Self::Error> {
        if self.faults.get().update_row {
            return Err(MemoryStoreError::Injected("update_row"));
        }
        let mut rows = self.rows.borrow_mut();
        let Some(node) = rows.get_mut(&id) else {
            return Ok(false);
        };
        update.apply_to(node);
        Ok(true)
    }

    fn bulk_rewrite_path_prefix(
        &self,
        containing_id: NodeId,
        remove_count: usize,
        insert_prefix: &AncestorPath,
    ) -> Result<usize, Self::Error> {
        if self.faults.get().bulk_rewrite {
            return Err(MemoryStoreError::Injected("bulk_rewrite_path_prefix"));
        }
        let mut rows = self.rows.borrow_mut();
        let mut touched = 0usize;
        for node in rows.values_mut() {
            if node.parent_path.contains(containing_id) {
                node.parent_path = node.parent_path.splice_prefix(remove_count, insert_prefix);
                touched += 1;
            }
        }
        Ok(touched)
    }

    fn atomically<T, F>(&self, work: F) -> Result<T, HierarchyError>
    where
        F: FnOnce(&Self) -> Result<T, HierarchyError>,
    {
        let snapshot = self.rows.borrow().clone();
        let result = work(self);
        if result.is_err() {
            *self.rows.borrow_mut() = snapshot;
        }
        result
    }
}
