#![forbid(unsafe_code)]

use crate::error::{HierarchyError, ParentProblem};
use crate::ids::NodeId;
use crate::node::{Node, NodeRef, NodeUpdate, ParentRef, Reparented};
use crate::path::AncestorPath;
use crate::store::NodeStore;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const DEFAULT_SEPARATOR: &str = "/";

/// Ancestor / descendant queries and re-parenting over a materialized-path node table.
///
/// Lookups treat an unknown item as an empty answer. The re-parent operation never
/// degrades: every abnormal condition is an error, and nothing is written unless the whole
/// operation succeeds.
#[derive(Debug)]
pub struct HierarchyManager<S> {
    store: S,
}

impl<S: NodeStore> HierarchyManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Ancestors of `item`, root first, optionally followed by `item` itself.
    pub fn get_parent_list(
        &self,
        item: impl Into<NodeRef>,
        include_self: bool,
    ) -> Result<Vec<Node>, HierarchyError> {
        let Some(item) = resolve(&self.store, item.into())? else {
            return Ok(Vec::new());
        };

        let mut parents = Vec::with_capacity(item.depth() + 1);
        if !item.parent_path.is_empty() {
            let fetched = self
                .store
                .find_by_ids(item.parent_path.ids())
                .map_err(HierarchyError::store)?;
            let mut by_id: BTreeMap<NodeId, Node> =
                fetched.into_iter().map(|node| (node.id, node)).collect();
            for ancestor_id in item.parent_path.ids() {
                match by_id.remove(ancestor_id) {
                    Some(node) => parents.push(node),
                    None => warn!(
                        item = %item.id,
                        ancestor = %ancestor_id,
                        "parent path references a missing node"
                    ),
                }
            }
        }

        if include_self {
            parents.push(item);
        }
        Ok(parents)
    }

    /// Every node below `item`, optionally preceded by `item` itself.
    pub fn get_children_list(
        &self,
        item: impl Into<NodeRef>,
        include_self: bool,
    ) -> Result<Vec<Node>, HierarchyError> {
        let Some(item) = resolve(&self.store, item.into())? else {
            return Ok(Vec::new());
        };

        let children = self
            .store
            .find_where_path_contains(item.id)
            .map_err(HierarchyError::store)?;
        if !include_self {
            return Ok(children);
        }

        let mut out = Vec::with_capacity(children.len() + 1);
        out.push(item);
        out.extend(children);
        Ok(out)
    }

    pub fn get_item_full_name(
        &self,
        item: impl Into<NodeRef>,
        include_self: bool,
        separator: &str,
    ) -> Result<String, HierarchyError> {
        let names: Vec<String> = self
            .get_parent_list(item, include_self)?
            .into_iter()
            .map(|node| node.name)
            .collect();
        Ok(names.join(separator))
    }

    /// `get_item_full_name` with the item included and `/` between names.
    pub fn full_name(&self, item: impl Into<NodeRef>) -> Result<String, HierarchyError> {
        self.get_item_full_name(item, true, DEFAULT_SEPARATOR)
    }

    /// Moves `item` under `parent` and rewrites the path of every node below it.
    ///
    /// Runs inside [`NodeStore::atomically`]; on any error no row is changed. Records passed
    /// for `item` or `parent` only identify the nodes: both rows are read again from the store.
    pub fn update_item_parent(
        &self,
        item: impl Into<NodeRef>,
        parent: impl Into<ParentRef>,
    ) -> Result<Reparented, HierarchyError> {
        let item = item.into();
        let parent = parent.into();
        self.store
            .atomically(|store| reparent(store, item, parent))
    }
}

fn resolve<S: NodeStore>(store: &S, item: NodeRef) -> Result<Option<Node>, HierarchyError> {
    match item {
        NodeRef::Record(node) => Ok(Some(node)),
        NodeRef::Id(id) => store.find_by_id(id).map_err(HierarchyError::store),
    }
}

fn reparent<S: NodeStore>(
    store: &S,
    item: NodeRef,
    parent: ParentRef,
) -> Result<Reparented, HierarchyError> {
    // Rows are re-read under the write lock; a caller's record only names the node.
    let item_id = item.id();
    let mut node = store
        .find_by_id(item_id)
        .map_err(HierarchyError::store)?
        .ok_or(HierarchyError::NotFound { id: item_id })?;

    let parent_id = match parent {
        ParentRef::Keep => node.parent_id,
        ParentRef::Root => None,
        ParentRef::Id(id) => Some(id),
        ParentRef::Record(parent) => Some(parent.id),
    };

    if parent_id == Some(node.id) {
        return Err(HierarchyError::CyclicParent {
            item: node.id,
            parent: node.id,
        });
    }

    let parent_node = match parent_id {
        None => None,
        Some(id) => Some(
            store
                .find_by_id(id)
                .map_err(HierarchyError::store)?
                .ok_or(HierarchyError::InvalidParent(ParentProblem::Missing(id)))?,
        ),
    };

    let old_path = node.parent_path.clone();
    let new_path = match &parent_node {
        None => AncestorPath::root(),
        Some(parent) => {
            let path = parent.parent_path.child(parent.id);
            if path.contains(node.id) {
                return Err(HierarchyError::CyclicParent {
                    item: node.id,
                    parent: parent.id,
                });
            }
            path
        }
    };

    let update = NodeUpdate::between(&node, parent_id, &new_path);
    let node_changed = !update.is_empty();
    if node_changed {
        match store.update_row(node.id, &update) {
            Ok(true) => update.apply_to(&mut node),
            Ok(false) => {
                return Err(HierarchyError::UpdateFailed {
                    id: node.id,
                    source: None,
                });
            }
            Err(err) => {
                return Err(HierarchyError::UpdateFailed {
                    id: node.id,
                    source: Some(Box::new(err)),
                });
            }
        }
    }

    let mut descendants_rewritten = 0;
    if old_path != new_path {
        descendants_rewritten = store
            .bulk_rewrite_path_prefix(node.id, old_path.depth(), &new_path)
            .map_err(|err| HierarchyError::DescendantUpdateFailed {
                id: node.id,
                source: Box::new(err),
            })?;
    }

    debug!(
        node = %node.id,
        old_path = ?old_path.ids(),
        new_path = ?new_path.ids(),
        node_changed,
        descendants_rewritten,
        "re-parented node"
    );

    Ok(Reparented {
        node,
        previous_path: old_path,
        node_changed,
        descendants_rewritten,
    })
}
