use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    RegionalManager,
    HubAdmin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::RegionalManager => "REGIONAL_MANAGER",
            Role::HubAdmin => "HUB_ADMIN",
            Role::Staff => "STAFF",
        }
    }

    pub fn can_switch_hub(&self) -> bool {
        match self {
            Role::SuperAdmin | Role::RegionalManager => true,
            Role::HubAdmin | Role::Staff => false,
        }
    }

    pub fn can_manage_zones(&self) -> bool {
        match self {
            Role::SuperAdmin | Role::RegionalManager | Role::HubAdmin => true,
            Role::Staff => false,
        }
    }

    /// Hub-locked roles must carry an assigned hub.
    pub fn requires_assigned_hub(&self) -> bool {
        matches!(self, Role::HubAdmin | Role::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role strings (including legacy ones) fail closed.
impl FromStr for Role {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "REGIONAL_MANAGER" => Ok(Role::RegionalManager),
            "HUB_ADMIN" => Ok(Role::HubAdmin),
            "STAFF" => Ok(Role::Staff),
            _ => Err(AppError::Forbidden),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminPrincipal {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub assigned_hub: Option<Uuid>,
}
