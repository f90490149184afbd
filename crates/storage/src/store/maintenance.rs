#![forbid(unsafe_code)]

use super::{
    InsertNodeRequest, ListNodesRequest, NodePage, PathViolation, SqliteStore, StoreError,
    to_sqlite_i64,
};
use mtree_core::{
    AncestorPath, HierarchyError, HierarchyManager, Node, NodeId, NodeStore, ParentRef,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter};
use std::collections::BTreeMap;
use tracing::{debug, info};

impl SqliteStore {
    /// Inserts a node below `parent_id` and derives its path in the same transaction.
    pub fn insert_node(&self, request: InsertNodeRequest) -> Result<Node, StoreError> {
        let InsertNodeRequest { name, parent_id } = request;
        let report = self.atomically(|store| {
            let raw_id = store
                .conn
                .query_row(
                    &store.sql.insert_returning_id(),
                    params![name, NodeId::to_parent_column(parent_id)],
                    |row| row.get::<_, i64>(0),
                )
                .map_err(|err| HierarchyError::store(StoreError::from(err)))?;
            let id = NodeId::try_new(raw_id)
                .map_err(|_| HierarchyError::store(StoreError::InvalidInput("invalid node id row")))?;
            HierarchyManager::new(store).update_item_parent(id, ParentRef::Keep)
        })?;
        debug!(node = %report.node.id, depth = report.node.depth(), "inserted node");
        Ok(report.node)
    }

    /// Deletes a leaf node. Nodes that still have descendants are refused.
    pub fn delete_node(&mut self, id: NodeId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;

        let below = tx.query_row(&self.sql.count_below(), params![id.get()], |row| {
            row.get::<_, i64>(0)
        })?;
        if below > 0 {
            return Err(StoreError::HasDescendants { id });
        }

        let deleted = tx.execute(&self.sql.delete_by_id(), params![id.get()])?;
        if deleted == 0 {
            return Err(StoreError::UnknownId);
        }

        tx.commit()?;
        Ok(())
    }

    /// Renames many nodes with one CASE-expression UPDATE per chunk, all in one transaction.
    /// Returns the number of rows updated.
    pub fn rename_nodes(
        &mut self,
        renames: &[(NodeId, String)],
        chunk_size: usize,
    ) -> Result<usize, StoreError> {
        if renames.is_empty() {
            return Err(StoreError::InvalidInput("rename list must not be empty"));
        }
        if chunk_size == 0 {
            return Err(StoreError::InvalidInput("chunk size must be at least 1"));
        }

        let tx = self.conn.transaction()?;
        let mut updated = 0usize;
        for chunk in renames.chunks(chunk_size) {
            let mut values: Vec<Value> = Vec::with_capacity(chunk.len() * 3);
            for (id, name) in chunk {
                values.push(Value::Integer(id.get()));
                values.push(Value::Text(name.clone()));
            }
            values.extend(chunk.iter().map(|(id, _)| Value::Integer(id.get())));
            updated += tx.execute(&self.sql.batch_rename(chunk.len()), params_from_iter(values))?;
        }
        tx.commit()?;

        info!(requested = renames.len(), updated, "renamed nodes");
        Ok(updated)
    }

    pub fn list_nodes(&self, request: ListNodesRequest) -> Result<NodePage, StoreError> {
        let limit = to_sqlite_i64(request.limit)?;
        let offset = to_sqlite_i64(request.offset)?;

        let total = self
            .conn
            .query_row(&self.sql.count_all(), [], |row| row.get::<_, i64>(0))?;
        let nodes = if total > 0 {
            self.query_nodes(&self.sql.select_page(), params![limit, offset])?
        } else {
            Vec::new()
        };

        Ok(NodePage {
            nodes,
            total: usize::try_from(total).unwrap_or(0),
            limit: request.limit,
            offset: request.offset,
        })
    }

    /// Direct parent of `id`; `None` for roots.
    pub fn parent_of(&self, id: NodeId) -> Result<Option<Node>, StoreError> {
        let node = self.find_by_id(id)?.ok_or(StoreError::UnknownId)?;
        match node.parent_id {
            Some(parent_id) => self.find_by_id(parent_id),
            None => Ok(None),
        }
    }

    /// Nodes whose parent column is `id`, ordered by id.
    pub fn direct_children(&self, id: NodeId) -> Result<Vec<Node>, StoreError> {
        self.query_nodes(&self.sql.select_children(), params![id.get()])
    }

    /// Scans the whole table and reports every path that breaks the hierarchy invariants.
    /// Nothing is repaired.
    pub fn audit_paths(&self) -> Result<Vec<PathViolation>, StoreError> {
        let mut stmt = self.conn.prepare(&self.sql.select_all())?;
        let mut rows = stmt.query([])?;

        let mut table: BTreeMap<i64, (Option<NodeId>, Result<AncestorPath, String>)> =
            BTreeMap::new();
        while let Some(row) = rows.next()? {
            let raw_id = row.get::<_, i64>(0)?;
            let parent_id = NodeId::from_parent_column(row.get::<_, Option<i64>>(2)?);
            let raw_path = row.get::<_, Option<String>>(3)?;
            let path = AncestorPath::decode(raw_path.as_deref()).map_err(|err| err.to_string());
            table.insert(raw_id, (parent_id, path));
        }

        let mut violations = Vec::new();
        for (raw_id, (parent_id, path)) in &table {
            let path = match path {
                Ok(path) => path,
                Err(message) => {
                    violations.push(PathViolation::CorruptPath {
                        id: *raw_id,
                        message: message.clone(),
                    });
                    continue;
                }
            };
            let Ok(id) = NodeId::try_new(*raw_id) else {
                violations.push(PathViolation::CorruptPath {
                    id: *raw_id,
                    message: "node id must be positive".to_string(),
                });
                continue;
            };

            if path.contains(id) {
                violations.push(PathViolation::SelfReference { id });
                continue;
            }
            for ancestor in path.ids() {
                if !table.contains_key(&ancestor.get()) {
                    violations.push(PathViolation::MissingAncestor {
                        id,
                        ancestor: *ancestor,
                    });
                }
            }

            let expected = match parent_id {
                None => AncestorPath::root(),
                Some(parent) => match table.get(&parent.get()) {
                    None => {
                        violations.push(PathViolation::MissingParent { id, parent: *parent });
                        continue;
                    }
                    // The parent's own corruption is reported on the parent.
                    Some((_, Err(_))) => continue,
                    Some((_, Ok(parent_path))) => parent_path.child(*parent),
                },
            };
            if &expected != path {
                violations.push(PathViolation::PathMismatch {
                    id,
                    expected: expected.ids().to_vec(),
                    actual: path.ids().to_vec(),
                });
            }
        }

        if !violations.is_empty() {
            info!(violations = violations.len(), "path audit found problems");
        }
        Ok(violations)
    }
}
