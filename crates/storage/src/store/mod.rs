#![forbid(unsafe_code)]

mod error;
mod maintenance;
mod node_store;
mod requests;
mod sql;

pub use error::StoreError;
pub use requests::*;

use mtree_core::{AncestorPath, HierarchyManager, Node, NodeId, TableSchema};
use rusqlite::{Connection, Params, Row, params};
use sql::NodeSql;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DB_FILE_NAME: &str = "mtree.db";

/// A node table in SQLite. Paths are stored as JSON array text and manipulated with
/// SQLite's JSON functions.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    schema: TableSchema,
    sql: NodeSql,
    storage_dir: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_schema(storage_dir, TableSchema::default())
    }

    pub fn open_with_schema(
        storage_dir: impl AsRef<Path>,
        schema: TableSchema,
    ) -> Result<Self, StoreError> {
        schema.validate()?;
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            "#,
        )?;

        let store = Self::from_parts(conn, schema, Some(storage_dir));
        store.install_schema()?;
        store.preflight()?;
        info!(path = %db_path.display(), table = %store.schema.table, "opened node store");
        Ok(store)
    }

    pub fn open_in_memory(schema: TableSchema) -> Result<Self, StoreError> {
        schema.validate()?;
        let conn = Connection::open_in_memory()?;
        let store = Self::from_parts(conn, schema, None);
        store.install_schema()?;
        store.preflight()?;
        Ok(store)
    }

    /// Uses an existing table as-is. No DDL runs; the configured columns must exist.
    pub fn attach(conn: Connection, schema: TableSchema) -> Result<Self, StoreError> {
        schema.validate()?;
        let store = Self::from_parts(conn, schema, None);
        store.preflight()?;
        info!(table = %store.schema.table, "attached to existing node table");
        Ok(store)
    }

    fn from_parts(conn: Connection, schema: TableSchema, storage_dir: Option<PathBuf>) -> Self {
        let sql = NodeSql::new(&schema);
        Self {
            conn,
            schema,
            sql,
            storage_dir,
        }
    }

    pub fn storage_dir(&self) -> Option<&Path> {
        self.storage_dir.as_deref()
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hierarchy operations over this store.
    pub fn hierarchy(&self) -> HierarchyManager<&Self> {
        HierarchyManager::new(self)
    }

    fn install_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(&self.sql.create_table())?;
        Ok(())
    }

    fn preflight(&self) -> Result<(), StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let mut rows = stmt.query(params![self.schema.table])?;
        let mut present = BTreeSet::new();
        while let Some(row) = rows.next()? {
            present.insert(row.get::<_, String>(0)?);
        }

        if present.is_empty() {
            return Err(StoreError::InvalidInput("node table is missing"));
        }
        if self
            .schema
            .columns
            .as_array()
            .iter()
            .any(|column| !present.contains(*column))
        {
            return Err(StoreError::InvalidInput("configured column is missing"));
        }
        Ok(())
    }

    fn query_nodes<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Node>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(read_node(row)?);
        }
        Ok(out)
    }
}

// Columns are always selected in `NodeSql::columns` order.
fn read_node(row: &Row<'_>) -> Result<Node, StoreError> {
    let raw_id = row.get::<_, i64>(0)?;
    let id = NodeId::try_new(raw_id).map_err(|_| StoreError::InvalidInput("invalid node id row"))?;
    let name = row.get::<_, Option<String>>(1)?.unwrap_or_default();
    let parent_id = NodeId::from_parent_column(row.get::<_, Option<i64>>(2)?);
    let raw_path = row.get::<_, Option<String>>(3)?;
    let parent_path = AncestorPath::decode(raw_path.as_deref())
        .map_err(|source| StoreError::CorruptPath { id: raw_id, source })?;

    Ok(Node {
        id,
        name,
        parent_id,
        parent_path,
    })
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}
