use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::TransportMode;
use crate::provider::Provider;
use utility::id::Id;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuoteTag {
    Cheapest,
    Best,
    Premium,
}

/// A single priced offer returned to the client in a `getQuotes` response.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub quote_id: Uuid,
    pub transport_mode: TransportMode,
    pub tier: String,
    pub provider_id: Option<Id<Provider>>,
    pub fare_paise: i64,
    pub fare_rupees: f64,
    pub eta_minutes: i32,
    pub tag: Option<QuoteTag>,
}

/// Typed replacement for the source's untyped per-item cache payload.
///
/// Stored under `quote_item:<quoteId>` with a 300s TTL; read back by
/// `createBooking` when a client books against a previously quoted item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuoteCacheItem {
    pub provider_id: Option<Id<Provider>>,
    pub fare_paise: i64,
    pub transport_mode: TransportMode,
}

/// Full quote-session payload stored under `quote:<sessionId>` for audit/replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSession {
    pub session_id: Uuid,
    pub quotes: Vec<Quote>,
}
