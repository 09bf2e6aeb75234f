//! Greedy nearest-neighbour stop ordering over great-circle distance.
//!
//! This approximates a delivery run; it knows nothing about the road network.

use crate::geo::haversine_km;
use crate::models::hub::GeoPoint;
use crate::models::route::{PlannedStop, Priority, RoutePlan, RouteStop, RouteWeights, Strategy};

/// Effective urban speed used for the ETA estimate.
const AVERAGE_SPEED_KMH: f64 = 25.0;
const HANDLING_MINUTES_PER_STOP: f64 = 2.0;
/// Used instead of the speed model when the route covers no distance.
const FLAT_MINUTES_PER_STOP: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectiveWeights {
    pub distance: f64,
    pub priority: f64,
}

impl EffectiveWeights {
    pub fn resolve(strategy: Strategy, overrides: Option<RouteWeights>) -> Self {
        let (distance, priority) = match strategy {
            Strategy::Shortest => (10.0, 0.0),
            Strategy::Priority => (2.0, 10.0),
            Strategy::Balanced => (5.0, 5.0),
        };
        let overrides = overrides.unwrap_or_default();

        Self {
            distance: overrides.distance.unwrap_or(distance),
            priority: overrides.priority.unwrap_or(priority),
        }
    }
}

fn priority_penalty(priority: &Priority) -> f64 {
    match priority {
        Priority::Express => 0.0,
        Priority::Normal => 1.0,
    }
}

fn leg_score(weights: &EffectiveWeights, distance_km: f64, priority: &Priority) -> f64 {
    weights.distance * distance_km + weights.priority * priority_penalty(priority)
}

pub fn estimate_eta_minutes(total_distance_km: f64, stop_count: usize) -> u32 {
    if total_distance_km > 0.0 {
        let minutes = (total_distance_km / AVERAGE_SPEED_KMH) * 60.0
            + stop_count as f64 * HANDLING_MINUTES_PER_STOP;
        minutes.round() as u32
    } else {
        stop_count as u32 * FLAT_MINUTES_PER_STOP
    }
}

/// Orders stops from `start`. Stops without valid coordinates go last, in
/// input order, and add nothing to the distance.
pub fn suggest_route(
    start: GeoPoint,
    stops: &[RouteStop],
    strategy: Strategy,
    weights: Option<RouteWeights>,
) -> RoutePlan {
    let weights = EffectiveWeights::resolve(strategy, weights);

    let mut remaining: Vec<(&RouteStop, GeoPoint)> = Vec::with_capacity(stops.len());
    let mut unlocated: Vec<&RouteStop> = Vec::new();
    for stop in stops {
        match stop.location.filter(GeoPoint::is_valid) {
            Some(location) => remaining.push((stop, location)),
            None => unlocated.push(stop),
        }
    }

    let mut planned = Vec::with_capacity(stops.len());
    let mut current = start;
    let mut total_distance_km = 0.0;

    while !remaining.is_empty() {
        let mut best_idx = 0;
        let mut best_score = f64::MAX;
        let mut best_distance = 0.0;

        for (idx, (stop, location)) in remaining.iter().enumerate() {
            let distance = haversine_km(&current, location);
            let score = leg_score(&weights, distance, &stop.priority);
            if score < best_score {
                best_idx = idx;
                best_score = score;
                best_distance = distance;
            }
        }

        let (stop, location) = remaining.remove(best_idx);
        total_distance_km += best_distance;
        current = location;

        planned.push(PlannedStop {
            stop_order: planned.len() + 1,
            stop_id: stop.id,
            location: Some(location),
            priority: stop.priority,
            distance_km: Some(best_distance),
        });
    }

    for stop in unlocated {
        planned.push(PlannedStop {
            stop_order: planned.len() + 1,
            stop_id: stop.id,
            location: None,
            priority: stop.priority,
            distance_km: None,
        });
    }

    let eta_minutes = estimate_eta_minutes(total_distance_km, planned.len());

    RoutePlan {
        strategy,
        stops: planned,
        total_distance_km,
        eta_minutes,
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{estimate_eta_minutes, suggest_route, EffectiveWeights};
    use crate::models::hub::GeoPoint;
    use crate::models::route::{Priority, RouteStop, RouteWeights, Strategy};

    /// Degrees of latitude per kilometre on a 6371 km sphere.
    const DEG_PER_KM: f64 = 1.0 / 111.194_926_6;

    fn start() -> GeoPoint {
        GeoPoint::new(0.0, 0.0)
    }

    fn stop(seed: u128, km_north: f64, priority: Priority) -> RouteStop {
        RouteStop {
            id: Uuid::from_u128(seed),
            location: Some(GeoPoint::new(km_north * DEG_PER_KM, 0.0)),
            priority,
        }
    }

    fn unlocated(seed: u128) -> RouteStop {
        RouteStop {
            id: Uuid::from_u128(seed),
            location: None,
            priority: Priority::Normal,
        }
    }

    fn order(stops: &[RouteStop], strategy: Strategy, weights: Option<RouteWeights>) -> Vec<u128> {
        suggest_route(start(), stops, strategy, weights)
            .stops
            .iter()
            .map(|s| s.stop_id.as_u128())
            .collect()
    }

    #[test]
    fn strategy_defaults() {
        assert_eq!(
            EffectiveWeights::resolve(Strategy::Shortest, None),
            EffectiveWeights { distance: 10.0, priority: 0.0 }
        );
        assert_eq!(
            EffectiveWeights::resolve(Strategy::Priority, None),
            EffectiveWeights { distance: 2.0, priority: 10.0 }
        );
        assert_eq!(
            EffectiveWeights::resolve(Strategy::Balanced, None),
            EffectiveWeights { distance: 5.0, priority: 5.0 }
        );
    }

    #[test]
    fn overrides_apply_independently() {
        let weights = EffectiveWeights::resolve(
            Strategy::Balanced,
            Some(RouteWeights { distance: Some(1.0), priority: None }),
        );
        assert_eq!(weights, EffectiveWeights { distance: 1.0, priority: 5.0 });
    }

    #[test]
    fn shortest_visits_nearer_stop_first() {
        let stops = vec![stop(1, 5.0, Priority::Normal), stop(2, -2.0, Priority::Normal)];
        assert_eq!(order(&stops, Strategy::Shortest, None), vec![2, 1]);
    }

    #[test]
    fn priority_strategy_puts_express_first() {
        let stops = vec![stop(1, -2.0, Priority::Normal), stop(2, 5.0, Priority::Express)];
        assert_eq!(order(&stops, Strategy::Priority, None), vec![2, 1]);
        assert_eq!(order(&stops, Strategy::Shortest, None), vec![1, 2]);
    }

    #[test]
    fn zero_distance_weight_orders_purely_by_priority() {
        let stops = vec![
            stop(1, 1.0, Priority::Normal),
            stop(2, 40.0, Priority::Express),
            stop(3, 2.0, Priority::Normal),
        ];
        let weights = RouteWeights { distance: Some(0.0), priority: None };
        assert_eq!(order(&stops, Strategy::Balanced, Some(weights)), vec![2, 1, 3]);
    }

    #[test]
    fn ties_keep_input_order() {
        let stops = vec![stop(7, 3.0, Priority::Normal), stop(3, 3.0, Priority::Normal)];
        assert_eq!(order(&stops, Strategy::Shortest, None), vec![7, 3]);
    }

    #[test]
    fn greedy_walk_advances_from_each_stop() {
        let stops = vec![
            stop(1, 10.0, Priority::Normal),
            stop(2, -1.0, Priority::Normal),
            stop(3, 4.0, Priority::Normal),
        ];
        let plan = suggest_route(start(), &stops, Strategy::Shortest, None);
        let ids: Vec<u128> = plan.stops.iter().map(|s| s.stop_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        // 1 km south, then 5 km north, then 6 km north.
        assert!((plan.total_distance_km - 12.0).abs() < 0.01);
        assert!((plan.stops[1].distance_km.unwrap() - 5.0).abs() < 0.01);
    }

    #[test]
    fn unlocated_stops_trail_in_input_order() {
        let mut bad = stop(5, 1.0, Priority::Express);
        bad.location = Some(GeoPoint::new(120.0, 0.0));
        let stops = vec![
            unlocated(9),
            stop(1, 3.0, Priority::Normal),
            bad,
            unlocated(4),
            stop(2, 1.0, Priority::Normal),
        ];

        let plan = suggest_route(start(), &stops, Strategy::Balanced, None);
        let ids: Vec<u128> = plan.stops.iter().map(|s| s.stop_id.as_u128()).collect();
        assert_eq!(ids, vec![2, 1, 9, 5, 4]);
        assert!(plan.stops[2..].iter().all(|s| s.distance_km.is_none()));
        assert!((plan.total_distance_km - 3.0).abs() < 0.01);
        assert_eq!(
            plan.stops.iter().map(|s| s.stop_order).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn empty_route_is_not_an_error() {
        let plan = suggest_route(start(), &[], Strategy::Priority, None);
        assert!(plan.stops.is_empty());
        assert_eq!(plan.total_distance_km, 0.0);
        assert_eq!(plan.eta_minutes, 0);
    }

    #[test]
    fn eta_uses_speed_model_when_distance_is_covered() {
        assert_eq!(estimate_eta_minutes(25.0, 3), 66);
        assert_eq!(estimate_eta_minutes(12.5, 1), 32);
    }

    #[test]
    fn eta_falls_back_to_flat_minutes_without_distance() {
        assert_eq!(estimate_eta_minutes(0.0, 3), 15);

        let at_start = RouteStop {
            id: Uuid::from_u128(1),
            location: Some(start()),
            priority: Priority::Normal,
        };
        let plan = suggest_route(start(), &[at_start, unlocated(2)], Strategy::Shortest, None);
        assert_eq!(plan.total_distance_km, 0.0);
        assert_eq!(plan.eta_minutes, 10);
    }
}
