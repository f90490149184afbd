#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a stored node. Always positive; `0` is the storage sentinel for "no parent".
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct NodeId(i64);

impl NodeId {
    pub fn try_new(value: i64) -> Result<Self, NodeIdError> {
        if value <= 0 {
            return Err(NodeIdError::NotPositive(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// Reads a stored parent column: `0` (or anything non-positive) means root.
    pub fn from_parent_column(value: Option<i64>) -> Option<Self> {
        value.and_then(|raw| Self::try_new(raw).ok())
    }

    /// Inverse of [`NodeId::from_parent_column`].
    pub fn to_parent_column(parent: Option<Self>) -> i64 {
        parent.map(Self::get).unwrap_or(0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for NodeId {
    type Error = NodeIdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<NodeId> for i64 {
    fn from(value: NodeId) -> Self {
        value.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeIdError {
    NotPositive(i64),
}

impl NodeIdError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NotPositive(_) => "node id must be a positive integer",
        }
    }
}

impl fmt::Display for NodeIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(value) => write!(f, "{} (got {value})", self.message()),
        }
    }
}

impl std::error::Error for NodeIdError {}
