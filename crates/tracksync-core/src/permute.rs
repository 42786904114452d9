use std::collections::{BTreeSet, HashSet};

use crate::types::{RoleId, StatusId, TrackerId, Transition};

/// Every transition required for `universe` and `roles` on `tracker`.
///
/// One tuple per ordered pair of distinct statuses per role, so the result
/// holds `n * (n - 1) * roles` tuples. `A -> B` and `B -> A` are both emitted.
pub fn generate(
    universe: &BTreeSet<StatusId>,
    roles: &BTreeSet<RoleId>,
    tracker: TrackerId,
) -> HashSet<Transition> {
    let n = universe.len();
    let mut required = HashSet::with_capacity(n * n.saturating_sub(1) * roles.len());
    for &from in universe {
        for &to in universe {
            for &role in roles {
                if let Some(t) = Transition::new(tracker, role, from, to) {
                    required.insert(t);
                }
            }
        }
    }
    required
}
