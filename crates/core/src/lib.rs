#![forbid(unsafe_code)]

//! Materialized-path hierarchy maintenance.
//!
//! Every node row stores its parent id and the ids of all its ancestors (root first) as a
//! serialized array. Ancestor and descendant queries read that array instead of walking the
//! tree; [`HierarchyManager::update_item_parent`] keeps it consistent for a whole subtree
//! when a node moves.

mod error;
mod hierarchy;
mod memory;
mod node;
mod store;

pub mod ids;
pub mod path;
pub mod schema;

pub use error::{BoxError, HierarchyError, ParentProblem};
pub use hierarchy::{DEFAULT_SEPARATOR, HierarchyManager};
pub use ids::{NodeId, NodeIdError};
pub use memory::{MemoryStore, MemoryStoreError};
pub use node::{Node, NodeRef, NodeUpdate, ParentRef, Reparented};
pub use path::{AncestorPath, PathDecodeError};
pub use schema::{ColumnMap, SchemaError, TableSchema};
pub use store::NodeStore;
