#![forbid(unsafe_code)]

use crate::error::{HierarchyError, ParentProblem};
use crate::ids::NodeId;
use crate::path::AncestorPath;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub parent_id: Option<NodeId>,
    pub parent_path: AncestorPath,
}

impl Node {
    pub fn root(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: None,
            parent_path: AncestorPath::root(),
        }
    }

    /// A node placed directly under `parent`, with its path derived from the parent's.
    pub fn child_of(parent: &Node, id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent_id: Some(parent.id),
            parent_path: parent.parent_path.child(parent.id),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn depth(&self) -> usize {
        self.parent_path.depth()
    }
}

/// The item an operation works on: either just its id or an already loaded row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeRef {
    Id(NodeId),
    Record(Node),
}

impl NodeRef {
    pub fn id(&self) -> NodeId {
        match self {
            Self::Id(id) => *id,
            Self::Record(node) => node.id,
        }
    }
}

impl From<NodeId> for NodeRef {
    fn from(value: NodeId) -> Self {
        Self::Id(value)
    }
}

impl From<Node> for NodeRef {
    fn from(value: Node) -> Self {
        Self::Record(value)
    }
}

impl From<&Node> for NodeRef {
    fn from(value: &Node) -> Self {
        Self::Record(value.clone())
    }
}

/// Target parent for a re-parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParentRef {
    /// Keep the current `parent_id` and recompute the path from it.
    Keep,
    Root,
    Id(NodeId),
    Record(Node),
}

impl ParentRef {
    /// Numeric parent as stored: `0` is root, negatives are rejected.
    pub fn from_raw(value: i64) -> Result<Self, HierarchyError> {
        if value == 0 {
            return Ok(Self::Root);
        }
        NodeId::try_new(value)
            .map(Self::Id)
            .map_err(|_| HierarchyError::InvalidParent(ParentProblem::Negative(value)))
    }

    /// Parent given as text (form fields, query strings). Must be an integer.
    pub fn parse(raw: &str) -> Result<Self, HierarchyError> {
        let trimmed = raw.trim();
        let value = trimmed.parse::<i64>().map_err(|_| {
            HierarchyError::InvalidParent(ParentProblem::Unparseable(trimmed.to_string()))
        })?;
        Self::from_raw(value)
    }
}

impl From<NodeId> for ParentRef {
    fn from(value: NodeId) -> Self {
        Self::Id(value)
    }
}

impl From<Option<NodeId>> for ParentRef {
    fn from(value: Option<NodeId>) -> Self {
        match value {
            Some(id) => Self::Id(id),
            None => Self::Root,
        }
    }
}

impl From<Node> for ParentRef {
    fn from(value: Node) -> Self {
        Self::Record(value)
    }
}

impl From<&Node> for ParentRef {
    fn from(value: &Node) -> Self {
        Self::Record(value.clone())
    }
}

/// Changed fields of a single node row. `None` means "leave the column alone".
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodeUpdate {
    pub parent_id: Option<Option<NodeId>>,
    pub parent_path: Option<AncestorPath>,
}

impl NodeUpdate {
    pub fn between(current: &Node, parent_id: Option<NodeId>, parent_path: &AncestorPath) -> Self {
        Self {
            parent_id: (current.parent_id != parent_id).then_some(parent_id),
            parent_path: (&current.parent_path != parent_path).then(|| parent_path.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parent_id.is_none() && self.parent_path.is_none()
    }

    pub fn apply_to(&self, node: &mut Node) {
        if let Some(parent_id) = self.parent_id {
            node.parent_id = parent_id;
        }
        if let Some(parent_path) = &self.parent_path {
            node.parent_path = parent_path.clone();
        }
    }
}

/// What a successful re-parent did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reparented {
    pub node: Node,
    pub previous_path: AncestorPath,
    pub node_changed: bool,
    pub descendants_rewritten: usize,
}

impl Reparented {
    pub fn path_changed(&self) -> bool {
        self.previous_path != self.node.parent_path
    }
}
