use model::TransportMode;

/// A named price band within a transport mode (Economy/Comfort/Premium for
/// cabs, Standard elsewhere). All monetary fields are minor units.
#[derive(Debug, Clone, Copy)]
pub struct Tier {
    pub name: &'static str,
    pub base: i64,
    pub per_km: i64,
    pub per_min: i64,
    pub min_fare: i64,
}

pub const CAB_TIERS: &[Tier] = &[
    Tier {
        name: "Economy",
        base: 5000,
        per_km: 1200,
        per_min: 150,
        min_fare: 8000,
    },
    Tier {
        name: "Comfort",
        base: 7000,
        per_km: 1500,
        per_min: 200,
        min_fare: 12000,
    },
    Tier {
        name: "Premium",
        base: 10000,
        per_km: 1800,
        per_min: 250,
        min_fare: 18000,
    },
];

pub const BIKE_TIERS: &[Tier] = &[Tier {
    name: "Standard",
    base: 2000,
    per_km: 700,
    per_min: 0,
    min_fare: 3000,
}];

pub const AUTO_TIERS: &[Tier] = &[Tier {
    name: "Standard",
    base: 3000,
    per_km: 1000,
    per_min: 100,
    min_fare: 5000,
}];

pub fn tiers_for(mode: TransportMode) -> &'static [Tier] {
    match mode {
        TransportMode::Cab => CAB_TIERS,
        TransportMode::Bike => BIKE_TIERS,
        TransportMode::Auto => AUTO_TIERS,
        TransportMode::Metro => &[],
    }
}

/// Average speed used to derive trip duration from distance, km/h.
pub fn speed_kmh(mode: TransportMode) -> f64 {
    match mode {
        TransportMode::Cab => 22.0,
        TransportMode::Bike => 28.0,
        TransportMode::Auto => 20.0,
        TransportMode::Metro => 35.0,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MetroLine {
    pub name: &'static str,
    /// Average time between successive stations, in minutes.
    pub avg_gap_minutes: f64,
    pub station_count: u32,
}

pub const METRO_LINES: &[MetroLine] = &[
    MetroLine {
        name: "Purple Line",
        avg_gap_minutes: 2.2,
        station_count: 28,
    },
    MetroLine {
        name: "Green Line",
        avg_gap_minutes: 2.0,
        station_count: 24,
    },
];

/// Flat per-station-count slabs, minor units, indexed by the upper bound of
/// the station-count bucket they apply to.
pub const METRO_SLABS: &[(u32, i64)] = &[
    (2, 1000),
    (5, 2000),
    (10, 3000),
    (15, 4000),
    (25, 5000),
    (u32::MAX, 6000),
];

pub fn metro_slab_fare(stations: u32) -> i64 {
    METRO_SLABS
        .iter()
        .find(|(upper, _)| stations <= *upper)
        .map(|(_, fare)| *fare)
        .unwrap_or(6000)
}
