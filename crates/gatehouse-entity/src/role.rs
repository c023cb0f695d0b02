//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use gatehouse_core::AppError;

/// The closed set of roles known to the platform.
///
/// Any string outside this set fails to parse; it is never coerced to a
/// nearby role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Unrestricted platform administrator. The only role allowed to emulate.
    SuperAdmin,
    /// Administrator of one organization.
    OrgAdmin,
    /// Regular signed-in user.
    User,
    /// Administrator of the events of an organization.
    EventAdmin,
    /// Door staff scanning QR codes for one event.
    EventQrChecker,
    /// Dormitory administrator.
    PropertyAdmin,
    /// Property manager.
    PropertyManager,
    /// Property accountant.
    PropertyAccountant,
    /// Property maintenance staff.
    PropertyMaintenance,
    /// Property utility staff.
    PropertyUtility,
    /// Property front desk.
    PropertyFrontdesk,
    /// Property tenant.
    PropertyTenant,
    /// Property guest.
    PropertyGuest,
    /// ID generator administrator.
    IdGenAdmin,
    /// ID generator user.
    IdGenUser,
}

impl UserRole {
    /// Every role, in declaration order.
    pub const ALL: [UserRole; 15] = [
        Self::SuperAdmin,
        Self::OrgAdmin,
        Self::User,
        Self::EventAdmin,
        Self::EventQrChecker,
        Self::PropertyAdmin,
        Self::PropertyManager,
        Self::PropertyAccountant,
        Self::PropertyMaintenance,
        Self::PropertyUtility,
        Self::PropertyFrontdesk,
        Self::PropertyTenant,
        Self::PropertyGuest,
        Self::IdGenAdmin,
        Self::IdGenUser,
    ];

    /// The single most privileged role in the system.
    pub const fn most_privileged() -> Self {
        Self::SuperAdmin
    }

    /// Whether this is the most privileged role.
    pub fn is_most_privileged(&self) -> bool {
        *self == Self::most_privileged()
    }

    /// Return the role as its snake_case wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::OrgAdmin => "org_admin",
            Self::User => "user",
            Self::EventAdmin => "event_admin",
            Self::EventQrChecker => "event_qr_checker",
            Self::PropertyAdmin => "property_admin",
            Self::PropertyManager => "property_manager",
            Self::PropertyAccountant => "property_accountant",
            Self::PropertyMaintenance => "property_maintenance",
            Self::PropertyUtility => "property_utility",
            Self::PropertyFrontdesk => "property_frontdesk",
            Self::PropertyTenant => "property_tenant",
            Self::PropertyGuest => "property_guest",
            Self::IdGenAdmin => "id_gen_admin",
            Self::IdGenUser => "id_gen_user",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "Super Admin",
            Self::OrgAdmin => "Organization Admin",
            Self::User => "Regular User",
            Self::EventAdmin => "Event Admin",
            Self::EventQrChecker => "Event QR Checker",
            Self::PropertyAdmin => "Property Admin",
            Self::PropertyManager => "Property Manager",
            Self::PropertyAccountant => "Property Accountant",
            Self::PropertyMaintenance => "Property Maintenance",
            Self::PropertyUtility => "Property Utility",
            Self::PropertyFrontdesk => "Property Front Desk",
            Self::PropertyTenant => "Property Tenant",
            Self::PropertyGuest => "Property Guest",
            Self::IdGenAdmin => "ID Generator Admin",
            Self::IdGenUser => "ID Generator User",
        }
    }

    /// Whether the role administers something.
    pub fn is_admin(&self) -> bool {
        matches!(
            self,
            Self::SuperAdmin
                | Self::OrgAdmin
                | Self::EventAdmin
                | Self::PropertyAdmin
                | Self::IdGenAdmin
        )
    }

    /// Whether the role is scoped to an organization.
    pub fn requires_org_id(&self) -> bool {
        !matches!(self, Self::User)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| AppError::invalid_role(format!("Invalid user role: '{s}'")))
    }
}
