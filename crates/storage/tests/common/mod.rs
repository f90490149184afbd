#![allow(dead_code)]

use mtree_core::{Node, NodeId};
use mtree_storage::{InsertNodeRequest, SqliteStore};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("mtree=debug".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

pub fn id(value: i64) -> NodeId {
    NodeId::try_new(value).expect("positive id")
}

pub fn path_ids(node: &Node) -> Vec<i64> {
    node.parent_path.ids().iter().map(|id| id.get()).collect()
}

pub fn ids(nodes: &[Node]) -> Vec<i64> {
    nodes.iter().map(|node| node.id.get()).collect()
}

pub fn temp_store() -> (TempDir, SqliteStore) {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = SqliteStore::open(dir.path()).expect("open store");
    (dir, store)
}

pub fn insert(store: &SqliteStore, name: &str, parent: Option<i64>) -> Node {
    store
        .insert_node(InsertNodeRequest {
            name: name.to_string(),
            parent_id: parent.map(id),
        })
        .expect("insert node")
}

/// root(1) -> child(2) -> grandchild(3), and a second root other(4).
pub fn scenario(store: &SqliteStore) {
    let root = insert(store, "root", None);
    let child = insert(store, "child", Some(root.id.get()));
    let grandchild = insert(store, "grandchild", Some(child.id.get()));
    let other = insert(store, "other", None);
    assert_eq!(
        ids(&[root, child, grandchild, other]),
        vec![1, 2, 3, 4],
        "fresh table should hand out ids in insert order"
    );
}

pub fn stored(store: &SqliteStore, value: i64) -> Node {
    use mtree_core::NodeStore;
    store
        .find_by_id(id(value))
        .expect("lookup")
        .expect("node should exist")
}

/// Raw column text, bypassing decoding.
pub fn raw_path(store: &SqliteStore, value: i64) -> Option<String> {
    store
        .connection()
        .query_row(
            "SELECT parent_path FROM nodes WHERE id = ?1",
            [value],
            |row| row.get::<_, Option<String>>(0),
        )
        .expect("raw path")
}
