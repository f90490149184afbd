#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, read_node};
use mtree_core::{AncestorPath, HierarchyError, Node, NodeId, NodeStore, NodeUpdate};
use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Transaction, TransactionBehavior, params, params_from_iter};
use tracing::{debug, warn};

const NESTED_SAVEPOINT: &str = "mtree_atomic";

impl NodeStore for SqliteStore {
    type Error = StoreError;

    fn find_by_id(&self, id: NodeId) -> Result<Option<Node>, Self::Error> {
        let mut nodes = self.query_nodes(&self.sql.select_by_id(), params![id.get()])?;
        Ok(nodes.pop())
    }

    fn find_by_ids(&self, ids: &[NodeId]) -> Result<Vec<Node>, Self::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let raw: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let id_list = serde_json::to_string(&raw)
            .map_err(|_| StoreError::InvalidInput("id list is not serializable"))?;
        self.query_nodes(&self.sql.select_by_id_list(), params![id_list])
    }

    /// Rows whose stored path cannot be decoded are skipped so the rest of the subtree
    /// stays readable; `audit_paths` reports them.
    fn find_where_path_contains(&self, id: NodeId) -> Result<Vec<Node>, Self::Error> {
        let mut stmt = self.conn.prepare(&self.sql.select_path_contains())?;
        let mut rows = stmt.query(params![id.get()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            match read_node(row) {
                Ok(node) => out.push(node),
                Err(StoreError::CorruptPath { id: corrupt, source }) => warn!(
                    below = %id,
                    node = corrupt,
                    error = %source,
                    "skipping row with a corrupt parent path"
                ),
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    fn update_row(&self, id: NodeId, update: &NodeUpdate) -> Result<bool, Self::Error> {
        let mut columns: Vec<&str> = Vec::with_capacity(2);
        let mut values: Vec<Value> = Vec::with_capacity(3);
        if let Some(parent_id) = update.parent_id {
            columns.push(&self.sql.parent_id);
            values.push(Value::Integer(NodeId::to_parent_column(parent_id)));
        }
        if let Some(parent_path) = &update.parent_path {
            columns.push(&self.sql.parent_path);
            values.push(match parent_path.encode() {
                Some(text) => Value::Text(text),
                None => Value::Null,
            });
        }

        if columns.is_empty() {
            return Ok(self
                .conn
                .query_row(&self.sql.select_by_id(), params![id.get()], |_| Ok(()))
                .optional()?
                .is_some());
        }

        values.push(Value::Integer(id.get()));
        let sql = self.sql.update_columns(&columns, values.len());
        let updated = self.conn.execute(&sql, params_from_iter(values))?;
        Ok(updated > 0)
    }

    fn bulk_rewrite_path_prefix(
        &self,
        containing_id: NodeId,
        remove_count: usize,
        insert_prefix: &AncestorPath,
    ) -> Result<usize, Self::Error> {
        let sql = self
            .sql
            .bulk_rewrite_prefix(remove_count, !insert_prefix.is_empty());
        let rewritten = if insert_prefix.is_empty() {
            self.conn.execute(&sql, params![containing_id.get()])?
        } else {
            self.conn.execute(
                &sql,
                params![containing_id.get(), insert_prefix.to_json_elements()],
            )?
        };
        debug!(
            containing = %containing_id,
            remove_count,
            insert_prefix = ?insert_prefix.ids(),
            rewritten,
            "rewrote descendant paths"
        );
        Ok(rewritten)
    }

    fn atomically<T, F>(&self, work: F) -> Result<T, HierarchyError>
    where
        F: FnOnce(&Self) -> Result<T, HierarchyError>,
    {
        if !self.conn.is_autocommit() {
            return self.within_savepoint(work);
        }

        // The write lock is held from the first read; concurrent movers wait on busy_timeout.
        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(|err| HierarchyError::store(StoreError::from(err)))?;
        let out = work(self)?;
        tx.commit()
            .map_err(|err| HierarchyError::store(StoreError::from(err)))?;
        Ok(out)
    }
}

impl SqliteStore {
    fn within_savepoint<T, F>(&self, work: F) -> Result<T, HierarchyError>
    where
        F: FnOnce(&Self) -> Result<T, HierarchyError>,
    {
        self.conn
            .execute_batch(&format!("SAVEPOINT {NESTED_SAVEPOINT}"))
            .map_err(|err| HierarchyError::store(StoreError::from(err)))?;

        match work(self) {
            Ok(out) => {
                self.conn
                    .execute_batch(&format!("RELEASE {NESTED_SAVEPOINT}"))
                    .map_err(|err| HierarchyError::store(StoreError::from(err)))?;
                Ok(out)
            }
            Err(err) => {
                if let Err(rollback) = self.conn.execute_batch(&format!(
                    "ROLLBACK TO {NESTED_SAVEPOINT}; RELEASE {NESTED_SAVEPOINT}"
                )) {
                    debug!(error = %rollback, "savepoint rollback failed");
                }
                Err(err)
            }
        }
    }
}
