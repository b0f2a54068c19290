//! Orphan pruning: groups the directory has but desired state does not.

use groupsync_directory::Group;

use crate::desired::DesiredStateStore;
use crate::plan::Mutation;

/// Plans a delete for every observed group missing from `desired`, in
/// listing order.
#[must_use]
pub fn plan_orphans(desired: &DesiredStateStore, observed: &[Group]) -> Vec<Mutation> {
    observed
        .iter()
        .filter(|group| !desired.contains(&group.email))
        .map(|group| Mutation::DeleteGroup {
            email_id: group.email.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::desired::DesiredGroup;

    #[test]
    fn test_only_undeclared_groups_are_pruned() {
        let desired = DesiredStateStore::load(vec![DesiredGroup::new("x@example.com")]).unwrap();
        let observed = vec![
            Group::new("x@example.com"),
            Group::new("y@example.com"),
            Group::new("a@example.com"),
        ];

        let plan = plan_orphans(&desired, &observed);

        assert_eq!(
            plan,
            vec![
                Mutation::DeleteGroup {
                    email_id: "y@example.com".into()
                },
                Mutation::DeleteGroup {
                    email_id: "a@example.com".into()
                },
            ]
        );
    }

    #[test]
    fn test_empty_directory_prunes_nothing() {
        let desired = DesiredStateStore::load(vec![DesiredGroup::new("x@example.com")]).unwrap();
        assert!(plan_orphans(&desired, &[]).is_empty());
    }
}
