use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use utoipa::ToSchema;

use super::AccessError;
use crate::locations::LocationLevel;

/// The closed set of dashboard roles, ordered by scope breadth:
/// `super_admin` ⊇ `division_admin` ⊇ … ⊇ `village_admin`.
///
/// Exactly one role per user. Role checks everywhere in the API go
/// through this type and [`role_permissions`]; there are no string
/// comparisons against role names outside the parser.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    DivisionAdmin,
    DistrictAdmin,
    UpazilaAdmin,
    UnionAdmin,
    VillageAdmin,
}

impl Role {
    /// Parse a stored role string. Anything outside the closed set is
    /// `AccessError::UnknownRole` — never a silent default.
    pub fn parse(raw: &str) -> Result<Self, AccessError> {
        raw.parse()
            .map_err(|_| AccessError::UnknownRole(raw.to_string()))
    }

    /// Breadth rank: 0 for super_admin down to 5 for village_admin.
    pub fn breadth_rank(self) -> u8 {
        match self {
            Role::SuperAdmin => 0,
            Role::DivisionAdmin => 1,
            Role::DistrictAdmin => 2,
            Role::UpazilaAdmin => 3,
            Role::UnionAdmin => 4,
            Role::VillageAdmin => 5,
        }
    }

    /// The location level this role is anchored to; `None` for
    /// super_admin, which carries no location restriction.
    pub fn anchor_level(self) -> Option<LocationLevel> {
        match self {
            Role::SuperAdmin => None,
            Role::DivisionAdmin => Some(LocationLevel::Division),
            Role::DistrictAdmin => Some(LocationLevel::District),
            Role::UpazilaAdmin => Some(LocationLevel::Upazila),
            Role::UnionAdmin => Some(LocationLevel::Union),
            Role::VillageAdmin => Some(LocationLevel::Village),
        }
    }

    /// All roles strictly narrower than this one, broadest first.
    pub fn subordinates(self) -> Vec<Role> {
        Role::iter()
            .filter(|other| other.breadth_rank() > self.breadth_rank())
            .collect()
    }
}

/// Actions a role is allowed on voter records, plus the set of roles it
/// may grant to others.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PermissionSet {
    pub can_read: bool,
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
    pub can_assign_roles: Vec<Role>,
}

impl PermissionSet {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Read => self.can_read,
            Capability::Create => self.can_create,
            Capability::Update => self.can_update,
            Capability::Delete => self.can_delete,
            Capability::AssignRoles => !self.can_assign_roles.is_empty(),
        }
    }
}

/// Route-gating capabilities derived from [`PermissionSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Read,
    Create,
    Update,
    Delete,
    AssignRoles,
}

/// The fixed role → permission table. Every role manages voters within
/// its scope; only super_admin deletes; a role may assign exactly the
/// roles strictly below it. These are business rules, not configuration.
pub fn role_permissions(role: Role) -> PermissionSet {
    PermissionSet {
        can_read: true,
        can_create: true,
        can_update: true,
        can_delete: role == Role::SuperAdmin,
        can_assign_roles: role.subordinates(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_six_roles() {
        for role in Role::iter() {
            assert_eq!(Role::parse(&role.to_string()).unwrap(), role);
        }
    }

    #[test]
    fn rejects_unknown_role_string() {
        assert_eq!(
            Role::parse("moderator"),
            Err(AccessError::UnknownRole("moderator".into()))
        );
        assert!(Role::parse("").is_err());
        // Case matters: stored roles are snake_case.
        assert!(Role::parse("Super_Admin").is_err());
    }

    #[test]
    fn assignable_roles_are_exactly_the_strictly_narrower_ones() {
        for role in Role::iter() {
            let perms = role_permissions(role);
            for assignable in &perms.can_assign_roles {
                assert!(
                    assignable.breadth_rank() > role.breadth_rank(),
                    "{role} must not assign {assignable}"
                );
            }
            let expected = Role::iter()
                .filter(|o| o.breadth_rank() > role.breadth_rank())
                .count();
            assert_eq!(perms.can_assign_roles.len(), expected);
        }
    }

    #[test]
    fn super_admin_assigns_five_village_admin_none() {
        assert_eq!(role_permissions(Role::SuperAdmin).can_assign_roles.len(), 5);
        assert!(role_permissions(Role::VillageAdmin)
            .can_assign_roles
            .is_empty());
        assert!(!role_permissions(Role::VillageAdmin).allows(Capability::AssignRoles));
    }

    #[test]
    fn only_super_admin_deletes() {
        for role in Role::iter() {
            let perms = role_permissions(role);
            assert!(perms.can_read && perms.can_create && perms.can_update);
            assert_eq!(perms.can_delete, role == Role::SuperAdmin);
        }
    }

    #[test]
    fn anchor_levels_match_role_names() {
        assert_eq!(Role::SuperAdmin.anchor_level(), None);
        assert_eq!(
            Role::DivisionAdmin.anchor_level(),
            Some(LocationLevel::Division)
        );
        assert_eq!(
            Role::VillageAdmin.anchor_level(),
            Some(LocationLevel::Village)
        );
    }
}
