use roaring::{treemap, RoaringTreemap};

use crate::types::NodeId;

/// A set of node ids backed by a compressed bitmap.
///
/// Memory and iteration cost follow the members rather than the graph
/// size, so a set holding one island of a large level stays small.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeSet(RoaringTreemap);

impl Default for NodeSet {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeSet {
    pub fn new() -> Self {
        Self(RoaringTreemap::new())
    }

    /// The set of every id in `[0, size)`.
    pub fn full(size: usize) -> Self {
        let mut map = RoaringTreemap::new();
        map.insert_range(0..size as u64);
        Self(map)
    }

    pub fn len(&self) -> usize {
        self.0.len() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, n: NodeId) -> bool {
        self.0.contains(n.0 as u64)
    }

    /// Returns true if `n` was not yet a member.
    pub fn insert(&mut self, n: NodeId) -> bool {
        self.0.insert(n.0 as u64)
    }

    /// Returns true if `n` was a member.
    pub fn remove(&mut self, n: NodeId) -> bool {
        self.0.remove(n.0 as u64)
    }

    /// Removes every member of `other` from this set.
    pub fn remove_all(&mut self, other: &NodeSet) {
        self.0 -= &other.0;
    }

    /// The smallest member.
    pub fn first(&self) -> Option<NodeId> {
        self.0.min().map(|n| NodeId(n as usize))
    }

    pub fn is_subset(&self, other: &NodeSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn is_disjoint(&self, other: &NodeSet) -> bool {
        self.0.is_disjoint(&other.0)
    }

    pub fn iter(&self) -> Iter<'_> {
        Iter(self.0.iter())
    }

    pub fn to_vec(&self) -> Vec<NodeId> {
        self.iter().collect()
    }
}

/// Members in ascending order.
pub struct Iter<'a>(treemap::Iter<'a>);

impl<'a> Iterator for Iter<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        self.0.next().map(|n| NodeId(n as usize))
    }
}

impl<'a> IntoIterator for &'a NodeSet {
    type Item = NodeId;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl Extend<NodeId> for NodeSet {
    fn extend<I: IntoIterator<Item = NodeId>>(&mut self, iter: I) {
        for n in iter {
            self.insert(n);
        }
    }
}

impl FromIterator<NodeId> for NodeSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        let mut set = NodeSet::new();
        set.extend(iter);
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(v: &[usize]) -> NodeSet {
        v.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn insert_remove_and_len() {
        let mut s = NodeSet::new();
        assert!(s.is_empty());
        assert!(s.insert(NodeId(3)));
        assert!(!s.insert(NodeId(3)));
        assert!(s.insert(NodeId(200)));
        assert_eq!(s.len(), 2);
        assert!(s.contains(NodeId(200)));
        assert!(!s.contains(NodeId(4)));
        assert!(!s.contains(NodeId(100_000)));
        assert!(s.remove(NodeId(3)));
        assert!(!s.remove(NodeId(3)));
        assert!(!s.remove(NodeId(100_000)));
        assert_eq!(s.to_vec(), vec![NodeId(200)]);
    }

    #[test]
    fn ids_beyond_u32_are_kept() {
        let big = NodeId(u32::MAX as usize + 7);
        let mut s = set(&[1]);
        assert!(s.insert(big));
        assert_eq!(s.to_vec(), vec![NodeId(1), big]);
    }

    #[test]
    fn full_covers_exactly_the_range() {
        for size in [0, 1, 63, 64, 65, 130, 70_000] {
            let s = NodeSet::full(size);
            assert_eq!(s.len(), size);
            assert_eq!(s.iter().count(), size);
            assert!(!s.contains(NodeId(size)));
        }
    }

    #[test]
    fn first_is_the_smallest_member() {
        let mut s = set(&[300, 65, 64, 1]);
        assert_eq!(s.first(), Some(NodeId(1)));
        s.remove(NodeId(1));
        assert_eq!(s.first(), Some(NodeId(64)));
        assert_eq!(NodeSet::new().first(), None);
        assert_eq!(s.to_vec(), vec![NodeId(64), NodeId(65), NodeId(300)]);
    }

    #[test]
    fn set_algebra() {
        let mut a = set(&[1, 2, 3, 70]);
        let b = set(&[2, 70, 500]);
        assert!(!a.is_disjoint(&b));
        assert!(!b.is_subset(&a));
        a.remove_all(&b);
        assert_eq!(a, set(&[1, 3]));
        assert_eq!(a.len(), 2);
        assert!(a.is_disjoint(&b));
        assert!(a.is_subset(&set(&[0, 1, 3])));
    }
}
