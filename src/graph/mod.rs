//! Property graph data model
//!
//! - Nodes with one label and a property map
//! - Directed typed edges with properties, several allowed between the same
//!   pair of nodes
//! - In-memory storage with label and edge-type indices

pub mod edge;
pub mod node;
pub mod property;
pub mod store;
pub mod types;

pub use edge::Edge;
pub use node::Node;
pub use property::{PropertyMap, PropertyValue};
pub use store::{GraphError, GraphResult, GraphStore};
pub use types::{EdgeId, EdgeType, Label, NodeId};
