//! # Role Policy
//!
//! Roles are an explicit enumeration and every permission decision goes
//! through [`authorize`]. Identifier sniffing for legacy accounts lives in
//! [`Role::from_identifier`] and nowhere else.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::MembershipError;

/// Who is acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    BlockAdmin,
    DistrictAdmin,
    StateAdmin,
    SuperAdmin,
}

/// What they are trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit,
    View,
    List,
    Approve,
    Reject,
    Export,
}

/// The single permission table.
#[must_use]
pub fn authorize(role: Role, action: Action) -> bool {
    match action {
        Action::View | Action::Export => true,
        Action::Submit => role == Role::Member,
        Action::List | Action::Approve | Action::Reject => role.is_admin(),
    }
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Member,
        Role::BlockAdmin,
        Role::DistrictAdmin,
        Role::StateAdmin,
        Role::SuperAdmin,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::BlockAdmin => "block_admin",
            Role::DistrictAdmin => "district_admin",
            Role::StateAdmin => "state_admin",
            Role::SuperAdmin => "super_admin",
        }
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        !matches!(self, Role::Member)
    }

    /// Name recorded as `reviewer` on a stage this role decides.
    #[must_use]
    pub fn reviewer_title(&self) -> &'static str {
        match self {
            Role::Member => "Member",
            Role::BlockAdmin => "Block Admin",
            Role::DistrictAdmin => "District Admin",
            Role::StateAdmin => "State Admin",
            Role::SuperAdmin => "Super Admin",
        }
    }

    /// Infer a role from a legacy member id or e-mail address.
    ///
    /// E-mail prefixes (`block.`, `district.`, `state.`, `super.`) and the
    /// well-known admin addresses are checked first, then id prefixes
    /// (`BA`, `DA`, `SA`, `SU`). Everything else is a member.
    #[must_use]
    pub fn from_identifier(identifier: &str) -> Role {
        let email = identifier.trim().to_ascii_lowercase();
        let by_email = match email.as_str() {
            "blockadmin@activ.com" => Some(Role::BlockAdmin),
            "districtadmin@activ.com" => Some(Role::DistrictAdmin),
            "stateadmin@activ.com" => Some(Role::StateAdmin),
            "superadmin@activ.com" => Some(Role::SuperAdmin),
            e if e.starts_with("block.") => Some(Role::BlockAdmin),
            e if e.starts_with("district.") => Some(Role::DistrictAdmin),
            e if e.starts_with("state.") => Some(Role::StateAdmin),
            e if e.starts_with("super.") => Some(Role::SuperAdmin),
            _ => None,
        };
        if let Some(role) = by_email {
            return role;
        }
        // Id prefixes only apply to bare ids; "susan@..." is not a super admin.
        if email.contains('@') {
            return Role::Member;
        }

        let id = identifier.trim().to_ascii_uppercase();
        if id.starts_with("BA") {
            Role::BlockAdmin
        } else if id.starts_with("DA") {
            Role::DistrictAdmin
        } else if id.starts_with("SA") {
            Role::StateAdmin
        } else if id.starts_with("SU") {
            Role::SuperAdmin
        } else {
            Role::Member
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = MembershipError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s.trim())
            .ok_or_else(|| MembershipError::InvalidApplication(format!("unknown role: {s}")))
    }
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::View => "view",
            Action::List => "list",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::Export => "export",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fail with `Unauthorized` unless [`authorize`] allows the pair.
pub fn ensure_authorized(role: Role, action: Action) -> Result<(), MembershipError> {
    if authorize(role, action) {
        Ok(())
    } else {
        Err(MembershipError::Unauthorized { role, action })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_cannot_review() {
        assert!(!authorize(Role::Member, Action::Approve));
        assert!(!authorize(Role::Member, Action::Reject));
        assert!(authorize(Role::Member, Action::Submit));
        assert!(authorize(Role::Member, Action::Export));
    }

    #[test]
    fn every_admin_can_review_but_not_submit() {
        for role in Role::ALL.iter().filter(|r| r.is_admin()) {
            assert!(authorize(*role, Action::Approve));
            assert!(authorize(*role, Action::Reject));
            assert!(authorize(*role, Action::List));
            assert!(!authorize(*role, Action::Submit));
        }
    }

    #[test]
    fn identifier_inference() {
        assert_eq!(Role::from_identifier("block.north@x.in"), Role::BlockAdmin);
        assert_eq!(Role::from_identifier("StateAdmin@activ.com"), Role::StateAdmin);
        assert_eq!(Role::from_identifier("da_007"), Role::DistrictAdmin);
        assert_eq!(Role::from_identifier("SU-1"), Role::SuperAdmin);
        assert_eq!(Role::from_identifier("priya@example.com"), Role::Member);
        assert_eq!(Role::from_identifier("susan@example.com"), Role::Member);
    }

    #[test]
    fn role_round_trips_through_text() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().expect("parse"), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn ensure_authorized_reports_role_and_action() {
        let err = ensure_authorized(Role::Member, Action::Approve).expect_err("denied");
        assert_eq!(err.to_string(), "Role member may not approve");
    }
}
