#![forbid(unsafe_code)]

use crate::error::HierarchyError;
use crate::ids::NodeId;
use crate::node::{Node, NodeUpdate};
use crate::path::AncestorPath;

/// Storage capabilities the hierarchy algorithm needs from the node table.
///
/// Implementations own every piece of query syntax. The algorithm never reads a row back
/// after asking for a bulk rewrite, so `bulk_rewrite_path_prefix` must be a single
/// engine-side update.
pub trait NodeStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>, Self::Error>;

    /// Batch fetch. Order of the returned rows is unspecified; unknown ids are skipped.
    fn find_by_ids(&self, ids: &[NodeId]) -> Result<Vec<Node>, Self::Error>;

    /// Every node whose stored path contains `id`, i.e. the whole subtree below `id`.
    fn find_where_path_contains(&self, id: NodeId) -> Result<Vec<Node>, Self::Error>;

    /// Writes the changed fields of one row. `Ok(false)` means no row was updated.
    fn update_row(&self, id: NodeId, update: &NodeUpdate) -> Result<bool, Self::Error>;

    /// For every row whose path contains `containing_id`: drop the first `remove_count`
    /// path elements, then put `insert_prefix` in front. Returns the number of rows touched.
    fn bulk_rewrite_path_prefix(
        &self,
        containing_id: NodeId,
        remove_count: usize,
        insert_prefix: &AncestorPath,
    ) -> Result<usize, Self::Error>;

    /// Runs `work` so that all of its writes land together or not at all.
    fn atomically<T, F>(&self, work: F) -> Result<T, HierarchyError>
    where
        F: FnOnce(&Self) -> Result<T, HierarchyError>;
}

impl<S: NodeStore> NodeStore for &S {
    type Error = S::Error;

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>, Self::Error> {
        (**self).find_by_id(id)
    }

    fn find_by_ids(&self, ids: &[NodeId]) -> Result<Vec<Node>, Self::Error> {
        (**self).find_by_ids(ids)
    }

    fn find_where_path_contains(&self, id: NodeId) -> Result<Vec<Node>, Self::Error> {
        (**self).find_where_path_contains(id)
    }

    fn update_row(&self, id: NodeId, update: &NodeUpdate) -> Result<bool, Self::Error> {
        (**self).update_row(id, update)
    }

    fn bulk_rewrite_path_prefix(
        &self,
        containing_id: NodeId,
        remove_count: usize,
        insert_prefix: &AncestorPath,
    ) -> Result<usize, Self::Error> {
        (**self).bulk_rewrite_path_prefix(containing_id, remove_count, insert_prefix)
    }

    fn atomically<T, F>(&self, work: F) -> Result<T, HierarchyError>
    where
        F: FnOnce(&Self) -> Result<T, HierarchyError>,
    {
        (**self).atomically(|_| work(self))
    }
}
