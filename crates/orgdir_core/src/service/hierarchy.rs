//! Bounded-depth expansion of the activity taxonomy.
//!
//! # Responsibility
//! - Collect an activity and its descendants, level by level, through a
//!   child-id query collaborator.
//!
//! # Invariants
//! - The result always contains the root id, even for unknown roots.
//! - At most `MAX_EXPANSION_DEPTH` child queries are issued per expansion.
//! - Expansion stops as soon as a level contributes no unseen ids, so a
//!   malformed parent cycle cannot loop.

use crate::model::activity::ActivityId;
use crate::repo::directory_repo::RepoResult;
use std::collections::BTreeSet;

/// Number of levels below the root that an expansion reaches.
pub const MAX_EXPANSION_DEPTH: usize = 3;

/// Tree-query collaborator: direct children of a set of parents.
pub trait ChildActivitySource {
    /// Returns ids of all activities whose parent is in `parent_ids`.
    fn child_activity_ids(
        &self,
        parent_ids: &BTreeSet<ActivityId>,
    ) -> RepoResult<BTreeSet<ActivityId>>;
}

/// Expands `root_id` into itself plus descendants up to
/// [`MAX_EXPANSION_DEPTH`] levels down.
pub fn expand_activity_tree<S>(source: &S, root_id: ActivityId) -> RepoResult<BTreeSet<ActivityId>>
where
    S: ChildActivitySource + ?Sized,
{
    let mut collected = BTreeSet::from([root_id]);
    let mut frontier = BTreeSet::from([root_id]);

    for _ in 0..MAX_EXPANSION_DEPTH {
        let children = source.child_activity_ids(&frontier)?;
        let unseen: BTreeSet<ActivityId> = children.difference(&collected).copied().collect();
        if unseen.is_empty() {
            break;
        }
        collected.extend(unseen.iter().copied());
        frontier = unseen;
    }

    Ok(collected)
}
