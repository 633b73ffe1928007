use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utility::id::Id;

use crate::provider::Provider;
use crate::user::User;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripType {
    HighReliability,
    Standard,
}

impl TripType {
    /// (minRel, minRating) hard-filter thresholds for this trip type.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            TripType::HighReliability => (0.90, 4.0),
            TripType::Standard => (0.70, 3.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TripType::HighReliability => "HIGH_RELIABILITY",
            TripType::Standard => "STANDARD",
        }
    }
}

impl std::str::FromStr for TripType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HIGH_RELIABILITY" => Ok(TripType::HighReliability),
            "STANDARD" => Ok(TripType::Standard),
            other => Err(format!("unknown trip type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportMode {
    Cab,
    Bike,
    Auto,
    Metro,
}

impl TransportMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportMode::Cab => "CAB",
            TransportMode::Bike => "BIKE",
            TransportMode::Auto => "AUTO",
            TransportMode::Metro => "METRO",
        }
    }
}

impl std::str::FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CAB" => Ok(TransportMode::Cab),
            "BIKE" => Ok(TransportMode::Bike),
            "AUTO" => Ok(TransportMode::Auto),
            "METRO" => Ok(TransportMode::Metro),
            other => Err(format!("unknown transport mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingState {
    Searching,
    Confirmed,
    InProgress,
    Failed,
    ManualEscalation,
    Completed,
    Cancelled,
}

impl BookingState {
    /// The transition graph in full, leaves first: terminal states allow nothing.
    pub fn can_transition_to(self, next: BookingState) -> bool {
        use BookingState::*;
        matches!(
            (self, next),
            (Searching, Confirmed)
                | (Searching, Failed)
                | (Searching, Cancelled)
                | (Searching, ManualEscalation)
                | (Confirmed, InProgress)
                | (Confirmed, Cancelled)
                | (Confirmed, Failed)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Failed, Searching)
                | (Failed, ManualEscalation)
                | (ManualEscalation, Confirmed)
                | (ManualEscalation, Cancelled)
                | (ManualEscalation, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BookingState::Completed | BookingState::Cancelled)
    }

    /// The wire/log spelling, matching the `SCREAMING_SNAKE_CASE` serde rename.
    pub fn as_str(self) -> &'static str {
        match self {
            BookingState::Searching => "SEARCHING",
            BookingState::Confirmed => "CONFIRMED",
            BookingState::InProgress => "IN_PROGRESS",
            BookingState::Failed => "FAILED",
            BookingState::ManualEscalation => "MANUAL_ESCALATION",
            BookingState::Completed => "COMPLETED",
            BookingState::Cancelled => "CANCELLED",
        }
    }
}

impl std::str::FromStr for BookingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEARCHING" => Ok(BookingState::Searching),
            "CONFIRMED" => Ok(BookingState::Confirmed),
            "IN_PROGRESS" => Ok(BookingState::InProgress),
            "FAILED" => Ok(BookingState::Failed),
            "MANUAL_ESCALATION" => Ok(BookingState::ManualEscalation),
            "COMPLETED" => Ok(BookingState::Completed),
            "CANCELLED" => Ok(BookingState::Cancelled),
            other => Err(format!("unknown booking state: {other}")),
        }
    }
}

/// Typed replacement for the source's untyped `metadata: any` on a booking.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingMetadata {
    pub quote_id: Option<uuid::Uuid>,
    pub preselected_provider_id: Option<Id<Provider>>,
    pub notes: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Id<Booking>,
    pub user_id: Id<User>,
    pub user_phone: String,
    pub pickup: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff: String,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub trip_type: TripType,
    pub transport_mode: TransportMode,
    pub provider_id: Option<Id<Provider>>,
    pub state: BookingState,
    pub previous_state: Option<BookingState>,
    pub fare_estimate: i64,
    pub fare_actual: Option<i64>,
    pub commission_rate: f64,
    pub commission_amount: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub timeout_at: DateTime<Utc>,
    pub recovery_attempts: i32,
    pub manual_intervention: bool,
    pub metadata: BookingMetadata,
}

/// Typed replacement for the source's untyped attempt `metadata: any`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptMetadata {
    FastPath,
    Scoring,
    Recovery { attempt_number: i32 },
    Manual,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingAttempt {
    pub id: Id<BookingAttempt>,
    pub booking_id: Id<Booking>,
    pub provider_id: Id<Provider>,
    pub attempt_number: i32,
    pub success: bool,
    pub score: Option<f64>,
    pub reliability: f64,
    pub eta: Option<i32>,
    pub fare: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub metadata: AttemptMetadata,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BookingLogEvent {
    State(BookingState),
    ProviderAssigned,
    RecoverySuccess,
    RecoveryFailed,
    Escalated,
    ManualConfirmation,
    CompensationLimit,
}

impl std::fmt::Display for BookingLogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingLogEvent::State(state) => write!(f, "STATE_{}", state.as_str()),
            BookingLogEvent::ProviderAssigned => write!(f, "PROVIDER_ASSIGNED"),
            BookingLogEvent::RecoverySuccess => write!(f, "RECOVERY_SUCCESS"),
            BookingLogEvent::RecoveryFailed => write!(f, "RECOVERY_FAILED"),
            BookingLogEvent::Escalated => write!(f, "ESCALATED"),
            BookingLogEvent::ManualConfirmation => write!(f, "MANUAL_CONFIRMATION"),
            BookingLogEvent::CompensationLimit => write!(f, "COMPENSATION_LIMIT"),
        }
    }
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingLog {
    pub id: Id<BookingLog>,
    pub booking_id: Id<Booking>,
    pub event: String,
    pub message: String,
    pub metadata: Option<Value>,
    pub admin_action: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn searching_can_reach_confirmed_failed_cancelled_or_escalation() {
        let s = BookingState::Searching;
        assert!(s.can_transition_to(BookingState::Confirmed));
        assert!(s.can_transition_to(BookingState::Failed));
        assert!(s.can_transition_to(BookingState::Cancelled));
        assert!(s.can_transition_to(BookingState::ManualEscalation));
        assert!(!s.can_transition_to(BookingState::InProgress));
        assert!(!s.can_transition_to(BookingState::Completed));
    }

    #[test]
    fn terminal_states_allow_nothing() {
        for state in [BookingState::Completed, BookingState::Cancelled] {
            for next in [
                BookingState::Searching,
                BookingState::Confirmed,
                BookingState::InProgress,
                BookingState::Failed,
                BookingState::ManualEscalation,
                BookingState::Completed,
                BookingState::Cancelled,
            ] {
                assert!(!state.can_transition_to(next));
            }
        }
    }

    #[test]
    fn state_log_event_formats_as_state_prefixed_screaming_snake() {
        assert_eq!(
            BookingLogEvent::State(BookingState::ManualEscalation).to_string(),
            "STATE_MANUAL_ESCALATION"
        );
    }
}
