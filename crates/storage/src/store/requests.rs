#![forbid(unsafe_code)]

use mtree_core::{Node, NodeId};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertNodeRequest {
    pub name: String,
    pub parent_id: Option<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListNodesRequest {
    pub limit: usize,
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodePage {
    pub nodes: Vec<Node>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

impl NodePage {
    pub fn has_more(&self) -> bool {
        self.offset.saturating_add(self.nodes.len()) < self.total
    }
}

/// A consistency problem found by [`crate::SqliteStore::audit_paths`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PathViolation {
    CorruptPath { id: i64, message: String },
    SelfReference { id: NodeId },
    MissingAncestor { id: NodeId, ancestor: NodeId },
    MissingParent { id: NodeId, parent: NodeId },
    PathMismatch {
        id: NodeId,
        expected: Vec<NodeId>,
        actual: Vec<NodeId>,
    },
}

impl PathViolation {
    pub fn id(&self) -> i64 {
        match self {
            Self::CorruptPath { id, .. } => *id,
            Self::SelfReference { id }
            | Self::MissingAncestor { id, .. }
            | Self::MissingParent { id, .. }
            | Self::PathMismatch { id, .. } => id.get(),
        }
    }
}
