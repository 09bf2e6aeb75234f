pub mod hub_service;
pub mod routing;
pub mod scope;
pub mod zone_service;
pub mod zones;
