use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utility::id::Id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Individual,
    Fleet,
}

impl ProviderType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProviderType::Individual => "INDIVIDUAL",
            ProviderType::Fleet => "FLEET",
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INDIVIDUAL" => Ok(ProviderType::Individual),
            "FLEET" => Ok(ProviderType::Fleet),
            other => Err(format!("unknown provider type: {other}")),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMetadata {
    pub make: Option<String>,
    pub model: Option<String>,
    pub plate_number: Option<String>,
    pub color: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: Id<Provider>,
    pub name: String,
    pub phone: String,
    pub provider_type: ProviderType,
    pub vehicle: VehicleMetadata,
    pub commission_rate: f64,
    pub active: bool,
    pub paused_until: Option<DateTime<Utc>>,
    pub pause_reason: Option<String>,
    pub reliability: f64,
    pub rating: f64,
    pub total_rides: i64,
    pub successful_rides: i64,
    pub last_active_at: Option<DateTime<Utc>>,
}

impl Provider {
    /// Default commission rate applied to new providers.
    pub const DEFAULT_COMMISSION_RATE: f64 = 0.10;
    pub const DEFAULT_RELIABILITY: f64 = 0.85;
    pub const DEFAULT_RATING: f64 = 4.5;

    /// A provider is eligible for assignment when active and not currently paused.
    pub fn is_eligible(&self, now: DateTime<Utc>) -> bool {
        self.active && self.paused_until.map_or(true, |until| until < now)
    }
}
