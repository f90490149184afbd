mod common;

use common::{id, ids, insert, path_ids, scenario, stored, temp_store};
use mtree_core::{HierarchyError, NodeStore, ParentProblem};
use mtree_storage::{InsertNodeRequest, ListNodesRequest, PathViolation, StoreError};

#[test]
fn insert_derives_path_from_parent() {
    let (_dir, store) = temp_store();
    scenario(&store);

    let node = insert(&store, "great-grandchild", Some(3));
    assert_eq!(node.parent_id, Some(id(3)));
    assert_eq!(path_ids(&node), vec![1, 2, 3]);
    assert_eq!(stored(&store, node.id.get()), node);
}

#[test]
fn insert_under_missing_parent_leaves_no_row() {
    let (_dir, store) = temp_store();
    scenario(&store);

    let err = store
        .insert_node(InsertNodeRequest {
            name: "orphan".to_string(),
            parent_id: Some(id(42)),
        })
        .expect_err("missing parent must fail");
    assert!(matches!(
        err,
        StoreError::Hierarchy(HierarchyError::InvalidParent(ParentProblem::Missing(_)))
    ));
    assert_eq!(err.code(), "INVALID_PARENT");

    let page = store
        .list_nodes(ListNodesRequest {
            limit: 10,
            offset: 0,
        })
        .expect("list");
    assert_eq!(page.total, 4);
    assert!(store.connection().is_autocommit());
}

#[test]
fn delete_refuses_nodes_with_descendants() {
    let (_dir, mut store) = temp_store();
    scenario(&store);

    let err = store.delete_node(id(2)).expect_err("child has a grandchild");
    assert!(matches!(err, StoreError::HasDescendants { id: blocked } if blocked == id(2)));

    store.delete_node(id(3)).expect("leaf delete");
    store.delete_node(id(2)).expect("now a leaf");
    assert!(store.find_by_id(id(2)).expect("lookup").is_none());

    let err = store.delete_node(id(2)).expect_err("already gone");
    assert_eq!(err.code(), "UNKNOWN_ID");
}

#[test]
fn rename_nodes_updates_in_chunks() {
    let (_dir, mut store) = temp_store();
    scenario(&store);

    let updated = store
        .rename_nodes(
            &[
                (id(1), "Root".to_string()),
                (id(2), "Child".to_string()),
                (id(3), "Grandchild".to_string()),
                (id(99), "Ghost".to_string()),
            ],
            2,
        )
        .expect("rename");
    assert_eq!(updated, 3);
    assert_eq!(stored(&store, 4).name, "other");
    assert_eq!(
        store.hierarchy().full_name(id(3)).expect("full name"),
        "Root/Child/Grandchild"
    );
}

#[test]
fn rename_nodes_rejects_bad_arguments() {
    let (_dir, mut store) = temp_store();
    scenario(&store);

    assert!(matches!(
        store.rename_nodes(&[], 10),
        Err(StoreError::InvalidInput(_))
    ));
    assert!(matches!(
        store.rename_nodes(&[(id(1), "x".to_string())], 0),
        Err(StoreError::InvalidInput(_))
    ));
    assert_eq!(stored(&store, 1).name, "root");
}

#[test]
fn list_nodes_pages_by_id() {
    let (_dir, store) = temp_store();
    scenario(&store);

    let first = store
        .list_nodes(ListNodesRequest {
            limit: 3,
            offset: 0,
        })
        .expect("first page");
    assert_eq!(ids(&first.nodes), vec![1, 2, 3]);
    assert_eq!(first.total, 4);
    assert!(first.has_more());

    let second = store
        .list_nodes(ListNodesRequest {
            limit: 3,
            offset: 3,
        })
        .expect("second page");
    assert_eq!(ids(&second.nodes), vec![4]);
    assert!(!second.has_more());
}

#[test]
fn direct_relations() {
    let (_dir, store) = temp_store();
    scenario(&store);
    insert(&store, "second child", Some(1));

    assert_eq!(ids(&store.direct_children(id(1)).expect("children")), vec![2, 5]);
    assert!(store.direct_children(id(3)).expect("children").is_empty());
    assert_eq!(
        store.parent_of(id(3)).expect("parent").map(|node| node.id),
        Some(id(2))
    );
    assert_eq!(store.parent_of(id(1)).expect("parent"), None);
    assert!(matches!(store.parent_of(id(50)), Err(StoreError::UnknownId)));
}

#[test]
fn audit_reports_each_kind_of_violation() {
    let (_dir, store) = temp_store();
    scenario(&store);
    insert(&store, "a", None); // 5
    insert(&store, "b", Some(5)); // 6
    insert(&store, "c", None); // 7
    insert(&store, "d", None); // 8

    store
        .connection()
        .execute_batch(
            r#"
            UPDATE nodes SET parent_path = '[1,2'   WHERE id = 4;
            UPDATE nodes SET parent_path = '[9,6]'  WHERE id = 6;
            UPDATE nodes SET parent_id = 77         WHERE id = 7;
            UPDATE nodes SET parent_path = '[8]'    WHERE id = 8;
            UPDATE nodes SET parent_path = '[2]'    WHERE id = 3;
            "#,
        )
        .expect("corrupt rows");

    let violations = store.audit_paths().expect("audit");
    let by_id = |wanted: i64| {
        violations
            .iter()
            .filter(|violation| violation.id() == wanted)
            .cloned()
            .collect::<Vec<_>>()
    };

    assert!(matches!(by_id(4).as_slice(), [PathViolation::CorruptPath { .. }]));
    assert_eq!(
        by_id(6),
        vec![PathViolation::SelfReference { id: id(6) }]
    );
    assert_eq!(
        by_id(7),
        vec![PathViolation::MissingParent {
            id: id(7),
            parent: id(77)
        }]
    );
    assert_eq!(by_id(8), vec![PathViolation::SelfReference { id: id(8) }]);
    assert_eq!(
        by_id(3),
        vec![PathViolation::PathMismatch {
            id: id(3),
            expected: vec![id(1), id(2)],
            actual: vec![id(2)],
        }]
    );
    assert!(by_id(1).is_empty());
    assert!(by_id(2).is_empty());
    assert!(by_id(5).is_empty());
}

#[test]
fn audit_reports_missing_ancestors() {
    let (_dir, store) = temp_store();
    scenario(&store);
    store
        .connection()
        .execute("UPDATE nodes SET parent_path = '[30,1]' WHERE id = 2", [])
        .expect("corrupt row");

    let violations = store.audit_paths().expect("audit");
    assert!(violations.contains(&PathViolation::MissingAncestor {
        id: id(2),
        ancestor: id(30)
    }));
    assert!(violations.contains(&PathViolation::PathMismatch {
        id: id(2),
        expected: vec![id(1)],
        actual: vec![id(30), id(1)],
    }));
    // Expectations follow the parent's stored path, corrupt or not.
    assert!(violations.contains(&PathViolation::PathMismatch {
        id: id(3),
        expected: vec![id(30), id(1), id(2)],
        actual: vec![id(1), id(2)],
    }));
}
