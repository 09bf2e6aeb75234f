//! Zone geometry: point classification, overlap guard and the per-hub
//! boundary cache.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::boundaries_overlap;
use crate::models::hub::GeoPoint;
use crate::models::zone::{Zone, ZoneOutline, MIN_BOUNDARY_VERTICES};
use crate::observability::metrics::Metrics;
use crate::store::{CacheStore, MemoryCache, ZoneSource};

pub type BoundarySet = Arc<Vec<Zone>>;

pub struct ZoneGeometryEngine {
    cache: Box<dyn CacheStore<BoundarySet>>,
    /// Bumped on every invalidation; a fill only lands if the epoch it
    /// started under is still current.
    epochs: DashMap<Uuid, u64>,
    ttl: Duration,
    metrics: Metrics,
}

impl ZoneGeometryEngine {
    pub fn new(cache: Box<dyn CacheStore<BoundarySet>>, ttl: Duration, metrics: Metrics) -> Self {
        Self {
            cache,
            epochs: DashMap::new(),
            ttl,
            metrics,
        }
    }

    pub fn in_memory(ttl: Duration, metrics: Metrics) -> Self {
        Self::new(Box::new(MemoryCache::new()), ttl, metrics)
    }

    pub fn cache_key(hub_id: Uuid) -> String {
        format!("hub:{hub_id}:zone_boundaries")
    }

    /// Active, boundary-bearing zones of a hub, served read-through from the cache.
    pub fn boundary_set(&self, source: &dyn ZoneSource, hub_id: Uuid) -> BoundarySet {
        let key = Self::cache_key(hub_id);

        if let Some(zones) = self.cache.get(&key) {
            self.metrics
                .zone_cache_lookups_total
                .with_label_values(&["hit"])
                .inc();
            return zones;
        }

        self.metrics
            .zone_cache_lookups_total
            .with_label_values(&["miss"])
            .inc();

        let epoch = self.epochs.get(&hub_id).map(|e| *e).unwrap_or(0);
        let zones: BoundarySet = Arc::new(
            source
                .boundary_zones(hub_id)
                .into_iter()
                .filter(Zone::has_boundary)
                .collect(),
        );

        let current = self.epochs.entry(hub_id).or_insert(0);
        if *current == epoch {
            self.cache.set(&key, zones.clone(), self.ttl);
            debug!(hub_id = %hub_id, zones = zones.len(), "zone boundary cache filled");
        } else {
            debug!(hub_id = %hub_id, "zone boundary cache fill skipped after invalidation");
        }
        drop(current);

        zones
    }

    /// Must run before a boundary write is acknowledged to its caller.
    pub fn invalidate_hub_cache(&self, hub_id: Uuid) {
        let mut epoch = self.epochs.entry(hub_id).or_insert(0);
        *epoch += 1;
        self.cache.delete(&Self::cache_key(hub_id));
        drop(epoch);

        info!(hub_id = %hub_id, "zone boundary cache invalidated");
    }

    /// First zone whose polygon contains the point. Overlapping zones make
    /// the winner depend on fetch order.
    pub fn detect(&self, source: &dyn ZoneSource, hub_id: Uuid, point: &GeoPoint) -> Option<Zone> {
        let zones = self.boundary_set(source, hub_id);
        let found = first_containing(&zones, point).cloned();
        self.record_detection(found.is_some());
        found
    }

    pub fn detect_zone_id(
        &self,
        source: &dyn ZoneSource,
        hub_id: Uuid,
        point: &GeoPoint,
    ) -> Option<Uuid> {
        self.detect(source, hub_id, point).map(|zone| zone.id)
    }

    /// Classifies every point against a single fetch of the hub's boundaries.
    pub fn detect_batch(
        &self,
        source: &dyn ZoneSource,
        hub_id: Uuid,
        points: &[GeoPoint],
    ) -> Vec<Option<Uuid>> {
        let zones = self.boundary_set(source, hub_id);

        points
            .iter()
            .map(|point| {
                let found = first_containing(&zones, point).map(|zone| zone.id);
                self.record_detection(found.is_some());
                found
            })
            .collect()
    }

    /// First active sibling that overlaps the candidate boundary.
    ///
    /// Uses [`boundaries_overlap`]: duplicates and shapes built on a sibling's
    /// corners are caught, edge or corner contact is not an overlap. Reads the
    /// source directly, never the cache.
    pub fn find_overlapping(
        &self,
        source: &dyn ZoneSource,
        candidate: &[GeoPoint],
        hub_id: Uuid,
        exclude_zone_id: Option<Uuid>,
    ) -> Result<Option<Zone>, AppError> {
        if candidate.len() < MIN_BOUNDARY_VERTICES {
            return Err(AppError::InvalidBoundary(format!(
                "a boundary needs at least {MIN_BOUNDARY_VERTICES} vertices, got {}",
                candidate.len()
            )));
        }

        let overlap = source
            .boundary_zones(hub_id)
            .into_iter()
            .filter(|sibling| Some(sibling.id) != exclude_zone_id)
            .find(|sibling| {
                let Some(sibling_vertices) = sibling.boundary.as_deref() else {
                    return false;
                };
                if sibling_vertices.len() < MIN_BOUNDARY_VERTICES {
                    return false;
                }

                boundaries_overlap(candidate, sibling_vertices)
            });

        Ok(overlap)
    }

    pub fn check_overlap(
        &self,
        source: &dyn ZoneSource,
        candidate: &[GeoPoint],
        hub_id: Uuid,
        exclude_zone_id: Option<Uuid>,
    ) -> Result<Option<Uuid>, AppError> {
        Ok(self
            .find_overlapping(source, candidate, hub_id, exclude_zone_id)?
            .map(|zone| zone.id))
    }

    pub fn boundaries_for_hub(&self, source: &dyn ZoneSource, hub_id: Uuid) -> Vec<ZoneOutline> {
        self.boundary_set(source, hub_id)
            .iter()
            .map(Zone::outline)
            .collect()
    }

    fn record_detection(&self, matched: bool) {
        let outcome = if matched { "matched" } else { "unmatched" };
        self.metrics
            .zone_detections_total
            .with_label_values(&[outcome])
            .inc();
    }
}

fn first_containing<'z>(zones: &'z [Zone], point: &GeoPoint) -> Option<&'z Zone> {
    zones.iter().find(|zone| zone.contains_point(point))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, OnceLock};
    use std::time::Duration;

    use chrono::Utc;
    use uuid::Uuid;

    use super::ZoneGeometryEngine;
    use crate::error::AppError;
    use crate::models::hub::GeoPoint;
    use crate::models::zone::Zone;
    use crate::observability::metrics::Metrics;
    use crate::store::ZoneSource;

    const HUB: Uuid = Uuid::from_u128(1);

    #[derive(Default)]
    struct FakeZones {
        zones: Mutex<Vec<Zone>>,
        fetches: AtomicUsize,
        invalidate_on_fetch: OnceLock<Arc<ZoneGeometryEngine>>,
    }

    impl FakeZones {
        fn with(zones: Vec<Zone>) -> Self {
            let source = Self::default();
            *source.zones.lock().unwrap() = zones;
            source
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl ZoneSource for FakeZones {
        fn boundary_zones(&self, hub_id: Uuid) -> Vec<Zone> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let zones = self
                .zones
                .lock()
                .unwrap()
                .iter()
                .filter(|zone| zone.hub_id == hub_id)
                .cloned()
                .collect();

            if let Some(engine) = self.invalidate_on_fetch.get() {
                engine.invalidate_hub_cache(hub_id);
            }
            zones
        }
    }

    fn rect(seed: u128, lat0: f64, lng0: f64, lat1: f64, lng1: f64) -> Zone {
        Zone {
            id: Uuid::from_u128(seed),
            hub_id: HUB,
            name: format!("zone-{seed}"),
            code: format!("Z{seed}"),
            is_active: true,
            boundary: Some(vec![
                GeoPoint::new(lat0, lng0),
                GeoPoint::new(lat0, lng1),
                GeoPoint::new(lat1, lng1),
                GeoPoint::new(lat1, lng0),
            ]),
            color_code: None,
            deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn engine() -> ZoneGeometryEngine {
        ZoneGeometryEngine::in_memory(Duration::from_secs(300), Metrics::new())
    }

    fn boundary(zone: &Zone) -> Vec<GeoPoint> {
        zone.boundary.clone().unwrap()
    }

    #[test]
    fn detects_containing_zone() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0), rect(11, 20.0, 20.0, 30.0, 30.0)]);
        let engine = engine();

        let zone = engine.detect(&source, HUB, &GeoPoint::new(25.0, 25.0)).unwrap();
        assert_eq!(zone.id, Uuid::from_u128(11));
        assert_eq!(
            engine.detect_zone_id(&source, HUB, &GeoPoint::new(5.0, 5.0)),
            Some(Uuid::from_u128(10))
        );
    }

    #[test]
    fn point_outside_every_zone_is_none() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        assert!(engine().detect(&source, HUB, &GeoPoint::new(50.0, 50.0)).is_none());
    }

    #[test]
    fn zones_without_boundary_are_skipped() {
        let mut bare = rect(10, 0.0, 0.0, 10.0, 10.0);
        bare.boundary = None;
        let mut line = rect(11, 0.0, 0.0, 10.0, 10.0);
        line.boundary = Some(vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(10.0, 10.0)]);
        let source = FakeZones::with(vec![bare, line]);

        assert!(engine().detect(&source, HUB, &GeoPoint::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn batch_detection_fetches_boundaries_once() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0), rect(11, 20.0, 20.0, 30.0, 30.0)]);
        let engine = engine();
        let points = vec![
            GeoPoint::new(5.0, 5.0),
            GeoPoint::new(50.0, 50.0),
            GeoPoint::new(25.0, 21.0),
            GeoPoint::new(1.0, 9.0),
        ];

        let results = engine.detect_batch(&source, HUB, &points);
        assert_eq!(
            results,
            vec![
                Some(Uuid::from_u128(10)),
                None,
                Some(Uuid::from_u128(11)),
                Some(Uuid::from_u128(10)),
            ]
        );
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn warm_cache_serves_without_refetch() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        let engine = engine();

        engine.detect(&source, HUB, &GeoPoint::new(5.0, 5.0));
        engine.detect(&source, HUB, &GeoPoint::new(6.0, 6.0));
        engine.boundaries_for_hub(&source, HUB);
        assert_eq!(source.fetches(), 1);
    }

    #[test]
    fn invalidation_exposes_latest_zones_within_ttl() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        let engine = engine();
        let spot = GeoPoint::new(25.0, 25.0);

        assert!(engine.detect(&source, HUB, &spot).is_none());
        source.zones.lock().unwrap().push(rect(11, 20.0, 20.0, 30.0, 30.0));

        engine.invalidate_hub_cache(HUB);
        assert_eq!(engine.detect_zone_id(&source, HUB, &spot), Some(Uuid::from_u128(11)));
    }

    #[test]
    fn fill_racing_an_invalidation_is_not_cached() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        let engine = Arc::new(engine());
        let _ = source.invalidate_on_fetch.set(engine.clone());

        engine.detect(&source, HUB, &GeoPoint::new(5.0, 5.0));
        engine.detect(&source, HUB, &GeoPoint::new(5.0, 5.0));
        assert_eq!(source.fetches(), 2);
    }

    #[test]
    fn invalidation_is_per_hub() {
        let other_hub = Uuid::from_u128(2);
        let mut elsewhere = rect(20, 0.0, 0.0, 10.0, 10.0);
        elsewhere.hub_id = other_hub;
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0), elsewhere]);
        let engine = engine();

        engine.detect(&source, HUB, &GeoPoint::new(5.0, 5.0));
        engine.detect(&source, other_hub, &GeoPoint::new(5.0, 5.0));
        engine.invalidate_hub_cache(other_hub);
        engine.detect(&source, HUB, &GeoPoint::new(5.0, 5.0));
        assert_eq!(source.fetches(), 2);
        engine.detect(&source, other_hub, &GeoPoint::new(5.0, 5.0));
        assert_eq!(source.fetches(), 3);
    }

    #[test]
    fn overlap_is_found_in_both_directions() {
        let a = rect(10, 0.0, 0.0, 10.0, 10.0);
        let b = rect(11, 5.0, 5.0, 15.0, 15.0);
        let source = FakeZones::with(vec![a.clone(), b.clone()]);
        let engine = engine();

        assert_eq!(
            engine.check_overlap(&source, &boundary(&a), HUB, Some(a.id)).unwrap(),
            Some(b.id)
        );
        assert_eq!(
            engine.check_overlap(&source, &boundary(&b), HUB, Some(b.id)).unwrap(),
            Some(a.id)
        );
    }

    #[test]
    fn candidate_swallowing_a_sibling_is_an_overlap() {
        let small = rect(10, 4.0, 4.0, 6.0, 6.0);
        let source = FakeZones::with(vec![small.clone()]);
        let big = boundary(&rect(99, 0.0, 0.0, 10.0, 10.0));

        let found = engine().find_overlapping(&source, &big, HUB, None).unwrap();
        assert_eq!(found.map(|zone| zone.id), Some(small.id));
    }

    #[test]
    fn excluded_zone_does_not_overlap_itself() {
        let a = rect(10, 0.0, 0.0, 10.0, 10.0);
        let source = FakeZones::with(vec![a.clone()]);

        let moved = boundary(&rect(10, 1.0, 1.0, 11.0, 11.0));
        assert_eq!(engine().check_overlap(&source, &moved, HUB, Some(a.id)).unwrap(), None);
        assert_eq!(engine().check_overlap(&source, &moved, HUB, None).unwrap(), Some(a.id));
    }

    #[test]
    fn zones_sharing_an_edge_do_not_overlap() {
        let west = rect(10, 0.0, 0.0, 10.0, 10.0);
        let source = FakeZones::with(vec![west]);
        let east = boundary(&rect(11, 0.0, 10.0, 10.0, 20.0));

        assert_eq!(engine().check_overlap(&source, &east, HUB, None).unwrap(), None);
    }

    #[test]
    fn crossing_through_edge_midpoints_is_found() {
        let tall = rect(10, 0.0, 4.0, 10.0, 6.0);
        let source = FakeZones::with(vec![tall.clone()]);
        let wide = boundary(&rect(11, 4.0, 0.0, 6.0, 10.0));

        assert_eq!(engine().check_overlap(&source, &wide, HUB, None).unwrap(), Some(tall.id));
    }

    #[test]
    fn duplicate_boundary_is_an_overlap() {
        let a = rect(10, 0.0, 0.0, 10.0, 10.0);
        let source = FakeZones::with(vec![a.clone()]);

        assert_eq!(engine().check_overlap(&source, &boundary(&a), HUB, None).unwrap(), Some(a.id));
    }

    #[test]
    fn triangle_on_sibling_corners_is_an_overlap() {
        let a = rect(10, 0.0, 0.0, 10.0, 10.0);
        let source = FakeZones::with(vec![a.clone()]);
        let half = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 10.0),
            GeoPoint::new(10.0, 10.0),
        ];

        assert_eq!(engine().check_overlap(&source, &half, HUB, None).unwrap(), Some(a.id));
    }

    #[test]
    fn zones_touching_at_a_corner_do_not_overlap() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        let diagonal = boundary(&rect(11, 10.0, 10.0, 20.0, 20.0));

        assert_eq!(engine().check_overlap(&source, &diagonal, HUB, None).unwrap(), None);
    }

    #[test]
    fn short_candidate_is_invalid() {
        let source = FakeZones::with(vec![rect(10, 0.0, 0.0, 10.0, 10.0)]);
        let result = engine().check_overlap(
            &source,
            &[GeoPoint::new(1.0, 1.0), GeoPoint::new(2.0, 2.0)],
            HUB,
            None,
        );
        assert!(matches!(result, Err(AppError::InvalidBoundary(_))));
    }
}
