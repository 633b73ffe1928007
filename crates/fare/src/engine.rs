use model::{Coordinates, TransportMode};
use utility::geo;

use crate::tiers::{self, MetroLine, Tier};

/// Returned by several legacy code paths when coordinates are missing and no
/// other fare signal is available; kept as a named constant rather than a
/// magic number scattered across call sites.
pub const DEFAULT_FARE_MINOR_UNITS: i64 = 15000;

/// Fallback distance (km) used when either endpoint's coordinates are absent.
pub const DEFAULT_DISTANCE_KM: f64 = 12.0;

/// Straight-line radius (km) within which a pickup or drop is considered
/// "at the airport" for surge purposes.
const AIRPORT_PROXIMITY_KM: f64 = 3.0;

/// Anchor point for airport-surge detection.
const AIRPORT: geo::Coordinates = geo::Coordinates {
    lat: 13.1986,
    lng: 77.7066,
};

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Road distance in km between pickup and drop, or `DEFAULT_DISTANCE_KM` if
/// either endpoint is missing.
pub fn distance_km(pickup: Option<Coordinates>, drop: Option<Coordinates>) -> f64 {
    match (pickup, drop) {
        (Some(a), Some(b)) => round2(geo::road_km(a.to_geo(), b.to_geo())),
        _ => DEFAULT_DISTANCE_KM,
    }
}

/// Trip duration in whole minutes, derived from distance and mode speed.
pub fn duration_minutes(distance_km: f64, mode: TransportMode) -> i64 {
    (distance_km / tiers::speed_kmh(mode) * 60.0).round() as i64 + 3
}

fn hour_base_surge(hour: u32) -> f64 {
    match hour {
        7..=9 => 1.20,
        17..=20 => 1.30,
        23 | 0..=5 => 1.15,
        _ => 1.00,
    }
}

fn near_airport(pickup: Option<Coordinates>, drop: Option<Coordinates>) -> bool {
    [pickup, drop].into_iter().flatten().any(|point| {
        geo::straight_line_km(point.to_geo(), AIRPORT) <= AIRPORT_PROXIMITY_KM
    })
}

/// Surge multiplier for CAB/BIKE/AUTO; METRO is always 1.0.
///
/// `surge_override` lets tests and `fareEstimate`-carrying callers pin the
/// multiplier instead of deriving it from the clock.
pub fn surge_multiplier(
    mode: TransportMode,
    hour: u32,
    pickup: Option<Coordinates>,
    drop: Option<Coordinates>,
    surge_override: Option<f64>,
) -> f64 {
    if mode == TransportMode::Metro {
        return 1.0;
    }
    if let Some(surge) = surge_override {
        return round2(surge);
    }

    let mut surge = hour_base_surge(hour);
    if near_airport(pickup, drop) {
        surge = surge.max(1.10) + 0.05;
    }

    let cap = match mode {
        TransportMode::Bike => Some(1.30),
        TransportMode::Auto => Some(1.40),
        _ => None,
    };
    if let Some(cap) = cap {
        surge = surge.min(cap);
    }

    round2(surge)
}

/// A single tier's priced breakdown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FareBreakdown {
    pub tier: &'static str,
    pub base: i64,
    pub distance_charge: i64,
    pub time_charge: i64,
    pub subtotal: i64,
    pub surge_charge: i64,
    pub total_fare: i64,
    pub min_fare_applied: bool,
}

fn price_tier(tier: &Tier, distance_km: f64, duration_min: i64, surge: f64) -> FareBreakdown {
    let distance_charge = (distance_km * tier.per_km as f64).round() as i64;
    let time_charge = (duration_min as f64 * tier.per_min as f64).round() as i64;
    let subtotal = tier.base + distance_charge + time_charge;
    let surge_charge = if surge > 1.0 {
        (subtotal as f64 * (surge - 1.0)).round() as i64
    } else {
        0
    };
    let raw = subtotal + surge_charge;
    let total_fare = raw.max(tier.min_fare);

    FareBreakdown {
        tier: tier.name,
        base: tier.base,
        distance_charge,
        time_charge,
        subtotal,
        surge_charge,
        total_fare,
        min_fare_applied: raw < tier.min_fare,
    }
}

/// Priced breakdown for every tier of a CAB/BIKE/AUTO mode. Empty for METRO —
/// use [`metro_breakdown`] instead.
pub fn tier_breakdowns(
    mode: TransportMode,
    pickup: Option<Coordinates>,
    drop: Option<Coordinates>,
    hour: u32,
    surge_override: Option<f64>,
) -> Vec<FareBreakdown> {
    let distance = distance_km(pickup, drop);
    let duration = duration_minutes(distance, mode);
    let surge = surge_multiplier(mode, hour, pickup, drop, surge_override);

    tiers::tiers_for(mode)
        .iter()
        .map(|tier| price_tier(tier, distance, duration, surge))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetroBreakdown {
    pub line: &'static str,
    pub stations: u32,
    pub fare: i64,
    pub duration_minutes: i64,
}

const METRO_STATION_GAP_KM: f64 = 1.2;

fn metro_stations(distance_km: f64) -> u32 {
    (distance_km / METRO_STATION_GAP_KM).round().max(1.0) as u32
}

/// One breakdown per known metro line, capped at that line's station count.
pub fn metro_breakdown(
    pickup: Option<Coordinates>,
    drop: Option<Coordinates>,
) -> Vec<MetroBreakdown> {
    let distance = distance_km(pickup, drop);
    let stations = metro_stations(distance);

    tiers::METRO_LINES
        .iter()
        .map(|line: &MetroLine| {
            let capped_stations = stations.min(line.station_count);
            MetroBreakdown {
                line: line.name,
                stations: capped_stations,
                fare: tiers::metro_slab_fare(capped_stations),
                duration_minutes: (capped_stations as f64 * line.avg_gap_minutes).round() as i64
                    + 5,
            }
        })
        .collect()
}

/// The cheapest fare across all tiers/lines for `mode`, used by the booking
/// state machine when no quote was selected up front.
pub fn cheapest_fare(
    mode: TransportMode,
    pickup: Option<Coordinates>,
    drop: Option<Coordinates>,
    hour: u32,
) -> i64 {
    if mode == TransportMode::Metro {
        return metro_breakdown(pickup, drop)
            .into_iter()
            .map(|breakdown| breakdown.fare)
            .min()
            .unwrap_or(DEFAULT_FARE_MINOR_UNITS);
    }

    tier_breakdowns(mode, pickup, drop, hour, None)
        .into_iter()
        .map(|breakdown| breakdown.total_fare)
        .min()
        .unwrap_or(DEFAULT_FARE_MINOR_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(lat: f64, lng: f64) -> Coordinates {
        Coordinates::new(lat, lng)
    }

    // Economy cab, no surge, midday, 10km/30min.
    #[test]
    fn s1_economy_cab_no_surge() {
        // Pick two points whose road distance rounds to 10.00 km; cheaper to
        // pin duration via an explicit distance check than hunt coordinates.
        let distance = 10.0;
        let duration = 30;
        let economy = tiers::CAB_TIERS[0];
        let breakdown = price_tier(&economy, distance, duration, 1.0);

        assert_eq!(breakdown.base, 5000);
        assert_eq!(breakdown.distance_charge, 12000);
        assert_eq!(breakdown.time_charge, 4500);
        assert_eq!(breakdown.subtotal, 21500);
        assert_eq!(breakdown.surge_charge, 0);
        assert_eq!(breakdown.total_fare, 21500);
        assert!(!breakdown.min_fare_applied);
    }

    // Economy cab, 0.5km/2min.
    #[test]
    fn s2_economy_cab_min_fare_applied() {
        let economy = tiers::CAB_TIERS[0];
        let breakdown = price_tier(&economy, 0.5, 2, 1.0);

        assert_eq!(breakdown.total_fare, 8000);
        assert!(breakdown.min_fare_applied);
    }

    // Economy cab, 1.5x surge, 10km/30min.
    #[test]
    fn s3_economy_cab_with_surge() {
        let economy = tiers::CAB_TIERS[0];
        let breakdown = price_tier(&economy, 10.0, 30, 1.5);

        assert_eq!(breakdown.surge_charge, 10750);
        assert_eq!(breakdown.total_fare, 32250);
    }

    #[test]
    fn missing_coordinates_default_to_twelve_km() {
        assert_eq!(distance_km(None, None), DEFAULT_DISTANCE_KM);
    }

    // totalFare >= tier.minFare always.
    #[test]
    fn total_fare_never_below_tier_min_fare() {
        for tier in tiers::CAB_TIERS
            .iter()
            .chain(tiers::BIKE_TIERS)
            .chain(tiers::AUTO_TIERS)
        {
            for distance in [0.1, 1.0, 5.0, 50.0] {
                for surge in [1.0, 1.15, 1.4] {
                    let duration = duration_minutes(distance, TransportMode::Cab);
                    let breakdown = price_tier(tier, distance, duration, surge);
                    assert!(breakdown.total_fare >= tier.min_fare);
                }
            }
        }
    }

    // Surge caps per mode, metro always 1.0.
    #[test]
    fn surge_respects_mode_caps() {
        assert_eq!(
            surge_multiplier(TransportMode::Metro, 18, None, None, None),
            1.0
        );

        for hour in 0..24 {
            let bike = surge_multiplier(TransportMode::Bike, hour, None, None, None);
            assert!(bike <= 1.30);
            let auto = surge_multiplier(TransportMode::Auto, hour, None, None, None);
            assert!(auto <= 1.40);
        }
    }

    #[test]
    fn airport_proximity_lifts_surge() {
        let pickup = coords(AIRPORT.lat, AIRPORT.lng);
        let surge = surge_multiplier(TransportMode::Cab, 11, Some(pickup), None, None);
        assert!(surge >= 1.10 + 0.05 - f64::EPSILON);
    }
}
