pub mod engine;
pub mod tiers;

pub use engine::{
    cheapest_fare, distance_km, duration_minutes, metro_breakdown, surge_multiplier,
    tier_breakdowns, FareBreakdown, MetroBreakdown, DEFAULT_DISTANCE_KM, DEFAULT_FARE_MINOR_UNITS,
};
