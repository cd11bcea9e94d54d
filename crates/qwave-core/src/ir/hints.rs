//! Advisory parallel-group hints
//!
//! Written by the performance pass and consumed by the scheduler. Hints never
//! change what the graph computes.

use super::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u32);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Nodes with no path between any two of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParallelGroup {
    pub id: GroupId,
    /// Members in ascending id order
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParallelHints {
    groups: Vec<ParallelGroup>,
}

impl ParallelHints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group; members are sorted and groups under two members ignored
    pub fn add_group(&mut self, mut members: Vec<NodeId>) -> Option<GroupId> {
        members.sort();
        members.dedup();
        if members.len() < 2 {
            return None;
        }
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(ParallelGroup { id, members });
        Some(id)
    }

    pub fn groups(&self) -> &[ParallelGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Option<&ParallelGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Group a node belongs to
    pub fn group_of(&self, node: NodeId) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|g| g.members.binary_search(&node).is_ok())
            .map(|g| g.id)
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Keep only groups for which `keep` holds, ids are preserved
    pub fn retain(&mut self, mut keep: impl FnMut(&ParallelGroup) -> bool) {
        self.groups.retain(|g| keep(g));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_group_ignores_singletons() {
        let mut hints = ParallelHints::new();
        assert!(hints.add_group(vec![NodeId(3)]).is_none());
        assert!(hints.add_group(vec![NodeId(3), NodeId(3)]).is_none());

        let id = hints.add_group(vec![NodeId(5), NodeId(2)]).unwrap();
        assert_eq!(id, GroupId(0));
        assert_eq!(hints.group(id).unwrap().members, vec![NodeId(2), NodeId(5)]);
        assert_eq!(hints.group_of(NodeId(5)), Some(id));
        assert_eq!(hints.group_of(NodeId(4)), None);
    }
}
