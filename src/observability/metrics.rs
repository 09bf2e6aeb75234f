use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub scope_resolutions_total: IntCounterVec,
    pub zone_cache_lookups_total: IntCounterVec,
    pub zone_detections_total: IntCounterVec,
    pub route_suggestions_total: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let scope_resolutions_total = IntCounterVec::new(
            Opts::new("scope_resolutions_total", "Hub scope resolutions by outcome"),
            &["outcome"],
        )
        .expect("valid scope_resolutions_total metric");

        let zone_cache_lookups_total = IntCounterVec::new(
            Opts::new("zone_cache_lookups_total", "Zone boundary cache lookups by result"),
            &["result"],
        )
        .expect("valid zone_cache_lookups_total metric");

        let zone_detections_total = IntCounterVec::new(
            Opts::new("zone_detections_total", "Point classifications by outcome"),
            &["outcome"],
        )
        .expect("valid zone_detections_total metric");

        let route_suggestions_total = IntCounterVec::new(
            Opts::new("route_suggestions_total", "Route suggestions by strategy"),
            &["strategy"],
        )
        .expect("valid route_suggestions_total metric");

        registry
            .register(Box::new(scope_resolutions_total.clone()))
            .expect("register scope_resolutions_total");
        registry
            .register(Box::new(zone_cache_lookups_total.clone()))
            .expect("register zone_cache_lookups_total");
        registry
            .register(Box::new(zone_detections_total.clone()))
            .expect("register zone_detections_total");
        registry
            .register(Box::new(route_suggestions_total.clone()))
            .expect("register route_suggestions_total");

        Self {
            registry,
            scope_resolutions_total,
            zone_cache_lookups_total,
            zone_detections_total,
            route_suggestions_total,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
