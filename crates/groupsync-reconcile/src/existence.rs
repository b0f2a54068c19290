//! Group existence: create missing groups, fix name and description.

use groupsync_directory::Group;

use crate::desired::DesiredGroup;
use crate::plan::Mutation;

/// Plans the create-or-update for `desired` against the observed group.
///
/// `observed` is `None` when the directory reported the group missing.
/// Empty desired fields mean "don't care" and never cause an update.
#[must_use]
pub fn plan_existence(desired: &DesiredGroup, observed: Option<&Group>) -> Option<Mutation> {
    let Some(have) = observed else {
        return Some(Mutation::CreateGroup {
            group: desired.to_group(),
        });
    };

    let name_differs = !desired.name.is_empty() && desired.name != have.name;
    let description_differs =
        !desired.description.is_empty() && desired.description != have.description;

    if name_differs || description_differs {
        Some(Mutation::UpdateGroup {
            email_id: desired.email_id.clone(),
            group: desired.to_group(),
            previous: have.clone(),
        })
    } else {
        None
    }
}
