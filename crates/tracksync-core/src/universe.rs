use std::collections::BTreeSet;

use crate::error::Result;
use crate::store::WorkflowStore;
use crate::types::{ProjectId, StatusId};

/// Union of `defaults` and every per-project override set.
///
/// Projects without overrides contribute nothing beyond `defaults`. The
/// result is a set union, so the order of `overrides` never matters.
pub fn aggregate<'a, I>(defaults: &BTreeSet<StatusId>, overrides: I) -> BTreeSet<StatusId>
where
    I: IntoIterator<Item = &'a BTreeSet<StatusId>>,
{
    let mut universe = defaults.clone();
    for set in overrides {
        universe.extend(set.iter().copied());
    }
    universe
}

/// Reads the defaults and each project's overrides from `store` and
/// aggregates them.
pub fn universe_of<S: WorkflowStore + ?Sized>(
    store: &S,
    projects: &[ProjectId],
) -> Result<BTreeSet<StatusId>> {
    let defaults = store.global_default_statuses()?;
    let overrides = projects
        .iter()
        .map(|p| store.status_overrides_for(*p))
        .collect::<Result<Vec<_>>>()?;
    Ok(aggregate(&defaults, &overrides))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::types::TrackerId;

    fn ids(v: &[u64]) -> BTreeSet<StatusId> {
        v.iter().copied().map(StatusId).collect()
    }

    #[test]
    fn defaults_only() {
        let u = aggregate(&ids(&[1, 2]), std::iter::empty());
        assert_eq!(u, ids(&[1, 2]));
    }

    #[test]
    fn empty_override_adds_nothing() {
        let none = BTreeSet::new();
        assert_eq!(aggregate(&ids(&[1, 2]), [&none]), ids(&[1, 2]));
    }

    #[test]
    fn overrides_widen_the_universe() {
        let a = ids(&[2, 5]);
        let b = ids(&[9]);
        assert_eq!(aggregate(&ids(&[1, 2]), [&a, &b]), ids(&[1, 2, 5, 9]));
    }

    #[test]
    fn order_of_projects_is_irrelevant() {
        let sets = [ids(&[4]), ids(&[1, 6]), ids(&[]), ids(&[6, 8])];
        let forward = aggregate(&ids(&[1]), sets.iter());
        let backward = aggregate(&ids(&[1]), sets.iter().rev());
        let shuffled = aggregate(&ids(&[1]), [&sets[2], &sets[0], &sets[3], &sets[1]]);
        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn adding_an_override_never_shrinks() {
        let before = aggregate(&ids(&[1, 2]), [&ids(&[3])]);
        let after = aggregate(&ids(&[1, 2]), [&ids(&[3]), &ids(&[4])]);
        assert!(before.is_subset(&after));
    }

    #[test]
    fn universe_of_reads_store() {
        let store = MemoryStore::new(TrackerId(1));
        store.set_defaults(ids(&[1, 2]));
        store.add_project(ProjectId(1));
        store.add_project(ProjectId(2));
        store.set_overrides(ProjectId(2), ids(&[3]));
        let u = universe_of(&store, &[ProjectId(1), ProjectId(2)]).unwrap();
        assert_eq!(u, ids(&[1, 2, 3]));
    }
}
