//! Hierarchy walker: visits every reachable group once and bubbles members up.
//!
//! The walk is an explicit depth-first worklist over [`GroupCache`] slots, so
//! it does not depend on call-stack depth and never recurses through `async`.
//! For each group not yet in the cache:
//!
//! 1. its members are fetched and stored, which marks it visited;
//! 2. under [`SyncScope::IncludeSubgroups`], each unvisited sub-group stub is
//!    walked in order;
//! 3. when a sub-group finishes, its final member list is appended to its
//!    parent's list.
//!
//! Step 3 does not deduplicate: a user reachable through two sibling
//! sub-groups appears twice in the parent. A sub-group already visited
//! through another parent is not fetched again, but its final list is still
//! bubbled into the new parent. A sub-group that is an ancestor on the
//! current path closes a cycle and is skipped without bubbling.
//!
//! Any fetch failure aborts the walk and is returned unchanged.

use std::collections::HashSet;

use tracing::{debug, error};

use crate::cache::GroupCache;
use crate::config::SyncScope;
use crate::contract::{DirectoryClient, NativeGroup};
use crate::error::TransportError;

struct Frame {
    slot: usize,
    pending: std::vec::IntoIter<NativeGroup>,
}

pub async fn walk<C>(
    client: &C,
    top_level: Vec<NativeGroup>,
    scope: SyncScope,
    cache: &mut GroupCache,
) -> Result<(), TransportError>
where
    C: DirectoryClient + ?Sized,
{
    for group in top_level {
        if cache.contains(&group.id) {
            debug!(group_id = %group.id, "[WALK] Top-level group already visited, skipping");
            continue;
        }

        let root = visit(client, group, cache).await?;
        let mut on_path = HashSet::from([root.slot]);
        let mut stack = vec![root];

        while let Some(frame) = stack.last_mut() {
            let parent = frame.slot;
            let next = match scope {
                SyncScope::IncludeSubgroups => frame.pending.next(),
                SyncScope::GroupOnly => None,
            };

            match next {
                Some(sub_group) => match cache.slot(&sub_group.id) {
                    Some(existing) if on_path.contains(&existing) => {
                        debug!(group_id = %sub_group.id, "[WALK] Sub-group is an ancestor, skipping cycle");
                    }
                    Some(existing) => {
                        debug!(group_id = %sub_group.id, "[WALK] Sub-group already visited, bubbling cached members");
                        cache.bubble(existing, parent);
                    }
                    None => {
                        let child = visit(client, sub_group, cache).await?;
                        on_path.insert(child.slot);
                        stack.push(child);
                    }
                },
                None => {
                    stack.pop();
                    on_path.remove(&parent);
                    if let Some(grandparent) = stack.last() {
                        cache.bubble(parent, grandparent.slot);
                    }
                }
            }
        }
    }

    debug!(visited = cache.len(), "[WALK] Walk complete");
    Ok(())
}

/// Fetch members and cache the group. Its sub-group stubs move into the frame.
async fn visit<C>(
    client: &C,
    mut group: NativeGroup,
    cache: &mut GroupCache,
) -> Result<Frame, TransportError>
where
    C: DirectoryClient + ?Sized,
{
    let members = client.list_group_members(&group.id).await.map_err(|e| {
        error!(group_id = %group.id, error = %e, "[WALK][ERROR] Failed to fetch group members");
        e
    })?;
    debug!(group_id = %group.id, members = members.len(), "[WALK] Fetched group members");
    let pending = std::mem::take(&mut group.sub_groups).into_iter();
    Ok(Frame {
        slot: cache.insert(group, members),
        pending,
    })
}
