//! Data-access seams consumed by the engines.
//!
//! The engines only ever see these traits; `AppState` is the in-memory
//! implementation used by the service and the tests.

pub mod cache;

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::models::hub::Hub;
use crate::models::zone::Zone;

pub use cache::{CacheStore, MemoryCache};

pub trait HubDirectory: Send + Sync {
    /// Any hub by id, including inactive and soft-deleted ones.
    fn find_hub(&self, hub_id: Uuid) -> Option<Hub>;

    fn all_hubs(&self) -> Vec<Hub>;

    fn is_active_hub(&self, hub_id: Uuid) -> bool {
        self.find_hub(hub_id).is_some_and(|hub| hub.is_usable())
    }
}

pub trait GrantStore: Send + Sync {
    /// Hub ids explicitly granted to an admin. Read fresh on every call.
    fn granted_hubs(&self, admin_id: Uuid) -> BTreeSet<Uuid>;
}

pub trait ZoneSource: Send + Sync {
    /// Active, non-deleted zones of a hub that carry a usable boundary.
    fn boundary_zones(&self, hub_id: Uuid) -> Vec<Zone>;
}
