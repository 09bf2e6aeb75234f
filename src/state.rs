use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use dashmap::DashMap;
use uuid::Uuid;

use crate::engine::scope::TenantAccessResolver;
use crate::engine::zones::ZoneGeometryEngine;
use crate::models::admin::AdminPrincipal;
use crate::models::hub::Hub;
use crate::models::parcel::{Parcel, Rider};
use crate::models::zone::Zone;
use crate::observability::metrics::Metrics;
use crate::store::{GrantStore, HubDirectory, ZoneSource};

pub struct AppState {
    pub hubs: DashMap<Uuid, Hub>,
    pub zones: DashMap<Uuid, Zone>,
    pub admins: DashMap<Uuid, AdminPrincipal>,
    /// admin id -> granted hub ids
    pub grants: DashMap<Uuid, BTreeSet<Uuid>>,
    pub riders: DashMap<Uuid, Rider>,
    pub parcels: DashMap<Uuid, Parcel>,
    pub zone_engine: ZoneGeometryEngine,
    /// Serialises zone check-then-write sequences.
    pub zone_writes: Mutex<()>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(zone_cache_ttl: Duration) -> Self {
        let metrics = Metrics::new();

        Self {
            hubs: DashMap::new(),
            zones: DashMap::new(),
            admins: DashMap::new(),
            grants: DashMap::new(),
            riders: DashMap::new(),
            parcels: DashMap::new(),
            zone_engine: ZoneGeometryEngine::in_memory(zone_cache_ttl, metrics.clone()),
            zone_writes: Mutex::new(()),
            metrics,
        }
    }

    pub fn resolver(&self) -> TenantAccessResolver<'_> {
        TenantAccessResolver::new(self, self)
    }
}

impl HubDirectory for AppState {
    fn find_hub(&self, hub_id: Uuid) -> Option<Hub> {
        self.hubs.get(&hub_id).map(|entry| entry.value().clone())
    }

    fn all_hubs(&self) -> Vec<Hub> {
        self.hubs.iter().map(|entry| entry.value().clone()).collect()
    }
}

impl GrantStore for AppState {
    fn granted_hubs(&self, admin_id: Uuid) -> BTreeSet<Uuid> {
        self.grants
            .get(&admin_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl ZoneSource for AppState {
    fn boundary_zones(&self, hub_id: Uuid) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self
            .zones
            .iter()
            .filter_map(|entry| {
                let zone = entry.value();
                let eligible =
                    zone.hub_id == hub_id && zone.is_active && !zone.deleted && zone.has_boundary();

                if eligible {
                    Some(zone.clone())
                } else {
                    None
                }
            })
            .collect();

        zones.sort_by(|a, b| a.code.cmp(&b.code));
        zones
    }
}
