use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

/// Handle to a node of the component graph; serialized as its arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct NodeId(pub NodeIndex<u32>);

impl From<NodeIndex<u32>> for NodeId {
    fn from(idx: NodeIndex<u32>) -> Self {
        NodeId(idx)
    }
}

impl From<u32> for NodeId {
    fn from(raw: u32) -> Self {
        NodeId(NodeIndex::new(raw as usize))
    }
}

impl From<NodeId> for u32 {
    fn from(id: NodeId) -> Self {
        id.0.index() as u32
    }
}

impl Deref for NodeId {
    type Target = NodeIndex<u32>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0.index())
    }
}
