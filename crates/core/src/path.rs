#![forbid(unsafe_code)]

use crate::ids::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ancestor ids of a node, root first, nearest parent last. Empty for roots.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AncestorPath(Vec<NodeId>);

impl AncestorPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn try_from_ids(ids: Vec<NodeId>) -> Result<Self, PathDecodeError> {
        let mut seen = BTreeSet::new();
        for id in &ids {
            if !seen.insert(*id) {
                return Err(PathDecodeError::DuplicateId(id.get()));
            }
        }
        Ok(Self(ids))
    }

    /// Decodes the stored column. `NULL`, `""`, `null` and `[]` all mean "no ancestors".
    pub fn decode(raw: Option<&str>) -> Result<Self, PathDecodeError> {
        let Some(raw) = raw.map(str::trim) else {
            return Ok(Self::root());
        };
        if raw.is_empty() || raw == "null" {
            return Ok(Self::root());
        }

        let values: Vec<i64> =
            serde_json::from_str(raw).map_err(|err| PathDecodeError::Malformed(err.to_string()))?;
        let ids = values
            .into_iter()
            .map(|value| NodeId::try_new(value).map_err(|_| PathDecodeError::InvalidId(value)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::try_from_ids(ids)
    }

    /// Column value for this path: `None` (stored as `NULL`) for roots.
    pub fn encode(&self) -> Option<String> {
        if self.0.is_empty() {
            return None;
        }
        let raw: Vec<i64> = self.0.iter().map(|id| id.get()).collect();
        serde_json::to_string(&raw).ok()
    }

    /// Comma-separated ids without brackets, e.g. `9,4`. Empty for roots.
    pub fn to_json_elements(&self) -> String {
        self.0
            .iter()
            .map(|id| id.get().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn ids(&self) -> &[NodeId] {
        &self.0
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains(&id)
    }

    pub fn nearest(&self) -> Option<NodeId> {
        self.0.last().copied()
    }

    /// Path of a child whose parent has this path and the given id.
    pub fn child(&self, parent_id: NodeId) -> Self {
        let mut ids = self.0.clone();
        ids.push(parent_id);
        Self(ids)
    }

    /// Drops the first `remove_count` ancestors and puts `insert_prefix` in front of the rest.
    pub fn splice_prefix(&self, remove_count: usize, insert_prefix: &AncestorPath) -> Self {
        let keep = self.0.iter().skip(remove_count).copied();
        Self(insert_prefix.0.iter().copied().chain(keep).collect())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PathDecodeError {
    #[error("parent path is not a JSON array of integers: {0}")]
    Malformed(String),
    #[error("parent path holds a non-positive id: {0}")]
    InvalidId(i64),
    #[error("parent path repeats id {0}")]
    DuplicateId(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> NodeId {
        NodeId::try_new(value).expect("positive id")
    }

    #[test]
    fn empty_spellings_decode_to_root() {
        for raw in [None, Some(""), Some("  "), Some("null"), Some("[]")] {
            assert_eq!(AncestorPath::decode(raw), Ok(AncestorPath::root()), "{raw:?}");
        }
        assert_eq!(AncestorPath::root().encode(), None);
    }

    #[test]
    fn decode_keeps_root_first_order() {
        let path = AncestorPath::decode(Some("[1, 7, 3]")).expect("valid path");
        assert_eq!(path.ids(), &[id(1), id(7), id(3)]);
        assert_eq!(path.encode().as_deref(), Some("[1,7,3]"));
        assert_eq!(path.nearest(), Some(id(3)));
        assert_eq!(path.depth(), 3);
    }

    #[test]
    fn decode_rejects_bad_payloads() {
        assert!(matches!(
            AncestorPath::decode(Some("{\"a\":1}")),
            Err(PathDecodeError::Malformed(_))
        ));
        assert!(matches!(
            AncestorPath::decode(Some("[\"1\"]")),
            Err(PathDecodeError::Malformed(_))
        ));
        assert_eq!(
            AncestorPath::decode(Some("[1,0]")),
            Err(PathDecodeError::InvalidId(0))
        );
        assert_eq!(
            AncestorPath::decode(Some("[1,2,1]")),
            Err(PathDecodeError::DuplicateId(1))
        );
    }

    #[test]
    fn splice_replaces_prefix_and_keeps_suffix() {
        // grandchild of a node at [1,2] with id 5 => [1,2,5,8]; node moves under [9,4]
        let old = AncestorPath::try_from_ids(vec![id(1), id(2), id(5), id(8)]).unwrap();
        let new_prefix = AncestorPath::try_from_ids(vec![id(9), id(4)]).unwrap();
        let rewritten = old.splice_prefix(2, &new_prefix);
        assert_eq!(rewritten.ids(), &[id(9), id(4), id(5), id(8)]);

        let to_root = old.splice_prefix(2, &AncestorPath::root());
        assert_eq!(to_root.ids(), &[id(5), id(8)]);
        assert_eq!(new_prefix.to_json_elements(), "9,4");
    }
}
