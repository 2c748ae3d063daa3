//! Allow-list filter over top-level group names.

use tracing::debug;

use crate::contract::NativeGroup;

/// An empty allow-list allows every group.
pub fn is_group_allowed(name: &str, allow_list: &[String]) -> bool {
    allow_list.is_empty() || allow_list.iter().any(|allowed| allowed == name)
}

/// Keep the top-level groups the allow-list admits.
///
/// Groups without a name pass an empty allow-list (the mapper drops them later)
/// and fail a non-empty one. Sub-group stubs are never inspected.
pub fn filter_top_level(groups: Vec<NativeGroup>, allow_list: &[String]) -> Vec<NativeGroup> {
    if allow_list.is_empty() {
        return groups;
    }
    groups
        .into_iter()
        .filter(|group| {
            let allowed = group
                .name
                .as_deref()
                .is_some_and(|name| is_group_allowed(name, allow_list));
            if !allowed {
                debug!(group_id = %group.id, name = ?group.name, "[FILTER] Group not in allow-list");
            }
            allowed
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_allows_all() {
        assert!(is_group_allowed("anything", &[]));
    }

    #[test]
    fn only_exact_names_pass() {
        let allow = vec!["eng".to_string()];
        let groups = vec![
            NativeGroup::new("1", "eng"),
            NativeGroup::new("2", "engineering"),
            NativeGroup::new("3", "ops"),
        ];

        let kept = filter_top_level(groups, &allow);

        assert_eq!(kept, vec![NativeGroup::new("1", "eng")]);
    }

    #[test]
    fn sub_groups_travel_with_their_parent() {
        let allow = vec!["eng".to_string()];
        let parent = NativeGroup::new("1", "eng")
            .with_sub_groups(vec![NativeGroup::new("2", "not-listed")]);

        let kept = filter_top_level(vec![parent.clone()], &allow);

        assert_eq!(kept, vec![parent]);
    }

    #[test]
    fn nameless_group_fails_non_empty_list() {
        let nameless = NativeGroup {
            id: "x".into(),
            name: None,
            sub_groups: Vec::new(),
        };
        assert!(filter_top_level(vec![nameless.clone()], &["eng".into()]).is_empty());
        assert_eq!(filter_top_level(vec![nameless.clone()], &[]), vec![nameless]);
    }
}
