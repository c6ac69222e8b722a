use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(PartialEq, Eq, Debug, PartialOrd, Ord, Clone, Copy, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub const MAX: Self = Self(!0);
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Marker for fixed-width neighbor slots that hold no neighbor.
pub trait EmptyValue {
    fn is_empty(&self) -> bool;
    fn empty() -> Self;
}

impl EmptyValue for NodeId {
    fn is_empty(&self) -> bool {
        self.0 == !0
    }

    fn empty() -> Self {
        Self::MAX
    }
}
