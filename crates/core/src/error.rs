#![forbid(unsafe_code)]

use crate::ids::NodeId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, thiserror::Error)]
pub enum HierarchyError {
    #[error("node {id} not found")]
    NotFound { id: NodeId },
    #[error("invalid parent: {0}")]
    InvalidParent(ParentProblem),
    #[error("node {parent} cannot become the parent of node {item}: it is the node itself or one of its descendants")]
    CyclicParent { item: NodeId, parent: NodeId },
    #[error("failed to update node {id}")]
    UpdateFailed {
        id: NodeId,
        #[source]
        source: Option<BoxError>,
    },
    #[error("failed to rewrite descendant paths of node {id}")]
    DescendantUpdateFailed {
        id: NodeId,
        #[source]
        source: BoxError,
    },
    #[error("storage: {0}")]
    Store(#[source] BoxError),
}

impl HierarchyError {
    pub fn store(err: impl Into<BoxError>) -> Self {
        Self::Store(err.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::InvalidParent(_) => "INVALID_PARENT",
            Self::CyclicParent { .. } => "CYCLIC_PARENT",
            Self::UpdateFailed { .. } => "UPDATE_FAILED",
            Self::DescendantUpdateFailed { .. } => "DESCENDANT_UPDATE_FAILED",
            Self::Store(_) => "STORE",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParentProblem {
    #[error("parent node {0} does not exist")]
    Missing(NodeId),
    #[error("parent id {0} is negative")]
    Negative(i64),
    #[error("parent {0:?} is not an integer id")]
    Unparseable(String),
}
