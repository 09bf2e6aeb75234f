//! Tenant scoping: which hubs a request may read or write.
//!
//! A [`ScopeDecision`] is resolved once per request from the principal and an
//! optionally requested hub, then passed explicitly to every scoped query.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::admin::{AdminPrincipal, Role};
use crate::models::hub::{Hub, HubSummary};
use crate::models::parcel::{Parcel, Rider};
use crate::models::zone::Zone;
use crate::store::{GrantStore, HubDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "hub_ids", rename_all = "snake_case")]
pub enum ScopeDecision {
    Hub(Uuid),
    HubSet(BTreeSet<Uuid>),
    Unrestricted,
}

/// Rows that belong to exactly one hub.
pub trait HubScoped {
    fn scope_hub_id(&self) -> Uuid;
}

impl HubScoped for Hub {
    fn scope_hub_id(&self) -> Uuid {
        self.id
    }
}

impl HubScoped for Zone {
    fn scope_hub_id(&self) -> Uuid {
        self.hub_id
    }
}

impl HubScoped for Parcel {
    fn scope_hub_id(&self) -> Uuid {
        self.hub_id
    }
}

impl HubScoped for Rider {
    fn scope_hub_id(&self) -> Uuid {
        self.hub_id
    }
}

impl ScopeDecision {
    /// `hub_id = id`, `hub_id IN (ids)` (empty set matches nothing), or no filter.
    pub fn permits(&self, hub_id: Uuid) -> bool {
        match self {
            ScopeDecision::Hub(id) => *id == hub_id,
            ScopeDecision::HubSet(ids) => ids.contains(&hub_id),
            ScopeDecision::Unrestricted => true,
        }
    }

    pub fn single_hub(&self) -> Option<Uuid> {
        match self {
            ScopeDecision::Hub(id) => Some(*id),
            ScopeDecision::HubSet(_) | ScopeDecision::Unrestricted => None,
        }
    }

    pub fn apply<T, I>(&self, rows: I) -> Vec<T>
    where
        T: HubScoped,
        I: IntoIterator<Item = T>,
    {
        rows.into_iter()
            .filter(|row| self.permits(row.scope_hub_id()))
            .collect()
    }

    /// SQL predicate over `column`, or `None` when no filter applies.
    pub fn sql_predicate(&self, column: &str) -> Option<String> {
        match self {
            ScopeDecision::Hub(id) => Some(format!("{column} = '{id}'")),
            ScopeDecision::HubSet(ids) if ids.is_empty() => Some("FALSE".to_string()),
            ScopeDecision::HubSet(ids) => {
                let list = ids
                    .iter()
                    .map(|id| format!("'{id}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                Some(format!("{column} IN ({list})"))
            }
            ScopeDecision::Unrestricted => None,
        }
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            ScopeDecision::Hub(_) => "hub",
            ScopeDecision::HubSet(_) => "hub_set",
            ScopeDecision::Unrestricted => "unrestricted",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HubContext {
    pub role: Role,
    pub can_switch: bool,
    pub show_global: bool,
    pub accessible_hubs: Vec<HubSummary>,
    pub active_hub_id: Option<Uuid>,
}

pub struct TenantAccessResolver<'a> {
    hubs: &'a dyn HubDirectory,
    grants: &'a dyn GrantStore,
}

impl<'a> TenantAccessResolver<'a> {
    pub fn new(hubs: &'a dyn HubDirectory, grants: &'a dyn GrantStore) -> Self {
        Self { hubs, grants }
    }

    pub fn resolve(
        &self,
        principal: &AdminPrincipal,
        requested_hub: Option<Uuid>,
    ) -> Result<ScopeDecision, AppError> {
        match principal.role {
            Role::HubAdmin | Role::Staff => principal
                .assigned_hub
                .map(ScopeDecision::Hub)
                .ok_or_else(|| {
                    warn!(admin_id = %principal.id, role = %principal.role, "principal has no assigned hub");
                    AppError::NoHubAssigned
                }),
            Role::SuperAdmin => match requested_hub {
                Some(hub_id) => {
                    self.ensure_active(hub_id)?;
                    Ok(ScopeDecision::Hub(hub_id))
                }
                None => Ok(ScopeDecision::Unrestricted),
            },
            Role::RegionalManager => {
                let granted = self.grants.granted_hubs(principal.id);
                match requested_hub {
                    Some(hub_id) => {
                        if !granted.contains(&hub_id) {
                            warn!(admin_id = %principal.id, "hub requested outside grants");
                            return Err(AppError::HubAccessDenied);
                        }
                        self.ensure_active(hub_id)?;
                        Ok(ScopeDecision::Hub(hub_id))
                    }
                    None => Ok(ScopeDecision::HubSet(granted)),
                }
            }
        }
    }

    /// Explicit hub switch; `None` asks for the global view.
    pub fn switch_hub(
        &self,
        principal: &AdminPrincipal,
        target: Option<Uuid>,
    ) -> Result<Option<HubSummary>, AppError> {
        if !principal.role.can_switch_hub() {
            return Err(AppError::RoleCannotSwitch);
        }

        let Some(hub_id) = target else {
            return match principal.role {
                Role::SuperAdmin => Ok(None),
                _ => Err(AppError::GlobalViewDenied),
            };
        };

        match self.resolve(principal, Some(hub_id))? {
            ScopeDecision::Hub(id) => {
                let hub = self.hubs.find_hub(id).ok_or(AppError::HubNotFound)?;
                Ok(Some(hub.summary()))
            }
            ScopeDecision::HubSet(_) | ScopeDecision::Unrestricted => {
                Err(AppError::Internal("hub switch resolved to a multi-hub scope".to_string()))
            }
        }
    }

    /// Active hubs the principal may select, ordered by code.
    pub fn accessible_hubs(&self, principal: &AdminPrincipal) -> Vec<HubSummary> {
        let mut hubs: Vec<Hub> = match principal.role {
            Role::SuperAdmin => self.hubs.all_hubs(),
            Role::RegionalManager => self
                .grants
                .granted_hubs(principal.id)
                .into_iter()
                .filter_map(|id| self.hubs.find_hub(id))
                .collect(),
            Role::HubAdmin | Role::Staff => principal
                .assigned_hub
                .and_then(|id| self.hubs.find_hub(id))
                .into_iter()
                .collect(),
        };

        hubs.retain(Hub::is_usable);
        hubs.sort_by(|a, b| a.code.cmp(&b.code));
        hubs.iter().map(Hub::summary).collect()
    }

    pub fn hub_context(
        &self,
        principal: &AdminPrincipal,
        requested_hub: Option<Uuid>,
    ) -> Result<HubContext, AppError> {
        let decision = self.resolve(principal, requested_hub)?;

        Ok(HubContext {
            role: principal.role,
            can_switch: principal.role.can_switch_hub(),
            show_global: principal.role == Role::SuperAdmin,
            accessible_hubs: self.accessible_hubs(principal),
            active_hub_id: decision.single_hub(),
        })
    }

    fn ensure_active(&self, hub_id: Uuid) -> Result<(), AppError> {
        if self.hubs.is_active_hub(hub_id) {
            Ok(())
        } else {
            Err(AppError::HubNotFound)
        }
    }
}
