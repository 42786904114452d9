use std::collections::HashSet;

use crate::types::Transition;

/// Writes needed to turn `persisted` into `required`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeDiff {
    /// Required but absent.
    pub to_insert: HashSet<Transition>,
    /// Present but no longer required.
    pub to_delete: HashSet<Transition>,
}

impl EdgeDiff {
    pub fn is_empty(&self) -> bool {
        self.to_insert.is_empty() && self.to_delete.is_empty()
    }

    /// `to_insert` in a stable order.
    pub fn sorted_inserts(&self) -> Vec<Transition> {
        let mut v: Vec<_> = self.to_insert.iter().copied().collect();
        v.sort();
        v
    }

    /// `to_delete` in a stable order.
    pub fn sorted_deletes(&self) -> Vec<Transition> {
        let mut v: Vec<_> = self.to_delete.iter().copied().collect();
        v.sort();
        v
    }
}

pub fn diff(required: &HashSet<Transition>, persisted: &HashSet<Transition>) -> EdgeDiff {
    EdgeDiff {
        to_insert: required.difference(persisted).copied().collect(),
        to_delete: persisted.difference(required).copied().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{RoleId, StatusId, TrackerId};

    fn t(role: u64, from: u64, to: u64) -> Transition {
        Transition::new(TrackerId(1), RoleId(role), StatusId(from), StatusId(to)).unwrap()
    }

    fn set(v: &[Transition]) -> HashSet<Transition> {
        v.iter().copied().collect()
    }

    #[test]
    fn equal_sets_produce_empty_diff() {
        let s = set(&[t(1, 1, 2), t(1, 2, 1)]);
        assert!(diff(&s, &s).is_empty());
    }

    #[test]
    fn missing_and_stale_are_split() {
        let required = set(&[t(1, 1, 2), t(1, 2, 1)]);
        let persisted = set(&[t(1, 1, 2), t(1, 1, 3)]);
        let d = diff(&required, &persisted);
        assert_eq!(d.to_insert, set(&[t(1, 2, 1)]));
        assert_eq!(d.to_delete, set(&[t(1, 1, 3)]));
    }

    #[test]
    fn empty_persisted_inserts_everything() {
        let required = set(&[t(1, 1, 2), t(2, 1, 2)]);
        let d = diff(&required, &HashSet::new());
        assert_eq!(d.to_insert, required);
        assert!(d.to_delete.is_empty());
    }

    #[test]
    fn digit_boundaries_do_not_alias() {
        let required = set(&[t(1, 23, 4)]);
        let persisted = set(&[t(12, 3, 4)]);
        let d = diff(&required, &persisted);
        assert_eq!(d.to_insert.len(), 1);
        assert_eq!(d.to_delete.len(), 1);
    }

    #[test]
    fn sorted_views_are_ordered() {
        let d = diff(&set(&[t(2, 1, 2), t(1, 3, 1), t(1, 1, 2)]), &HashSet::new());
        assert_eq!(d.sorted_inserts(), vec![t(1, 1, 2), t(1, 3, 1), t(2, 1, 2)]);
    }
}
