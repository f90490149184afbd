#![forbid(unsafe_code)]

use mtree_core::{HierarchyError, NodeId, PathDecodeError, SchemaError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unknown id")]
    UnknownId,
    #[error("node {id} has a corrupt parent path: {source}")]
    CorruptPath {
        id: i64,
        #[source]
        source: PathDecodeError,
    },
    #[error("node {id} has descendants and cannot be deleted")]
    HasDescendants { id: NodeId },
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            Self::Sql(_) => "SQLITE",
            Self::Schema(_) => "INVALID_SCHEMA",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::UnknownId => "UNKNOWN_ID",
            Self::CorruptPath { .. } => "CORRUPT_PATH",
            Self::HasDescendants { .. } => "HAS_DESCENDANTS",
            Self::Hierarchy(err) => err.code(),
        }
    }
}
