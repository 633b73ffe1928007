use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
pub use serde_with;
use utility::id::HasId;
use uuid::Uuid;

pub mod booking;
pub mod credit;
pub mod metric;
pub mod provider;
pub mod quote;
pub mod user;

pub use booking::{
    AttemptMetadata, Booking, BookingAttempt, BookingLog, BookingLogEvent, BookingMetadata,
    BookingState, TransportMode, TripType,
};
pub use credit::UserCredit;
pub use metric::ProviderMetric;
pub use provider::{Provider, ProviderType, VehicleMetadata};
pub use quote::{Quote, QuoteCacheItem, QuoteSession, QuoteTag};
pub use user::User;

impl HasId for User {
    type IdType = Uuid;
}
impl HasId for Provider {
    type IdType = Uuid;
}
impl HasId for Booking {
    type IdType = Uuid;
}
impl HasId for BookingAttempt {
    type IdType = Uuid;
}
impl HasId for BookingLog {
    type IdType = Uuid;
}
impl HasId for UserCredit {
    type IdType = Uuid;
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn to_geo(self) -> utility::geo::Coordinates {
        utility::geo::Coordinates::new(self.lat, self.lng)
    }
}

/// A page of results, mirroring the admin/list endpoints' `?page&limit` query shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VecResponse<T> {
    pub data: Vec<T>,
    pub pagination: Option<Pagination>,
}

impl<T> VecResponse<T> {
    pub fn non_paginated(data: Vec<T>) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn paginated(
        data: Vec<T>,
        current_page: usize,
        total_pages: usize,
        total_items: usize,
        page_size: usize,
    ) -> Self {
        Self {
            data,
            pagination: Some(Pagination {
                current_page,
                total_pages,
                total_items,
                page_size,
            }),
        }
    }
}

/// An authenticated caller, produced by the auth layer from a verified bearer
/// credential and consumed everywhere a handler needs to know "who is asking".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: utility::id::Id<User>,
    pub phone: String,
    pub is_admin: bool,
}

pub fn now() -> DateTime<Utc> {
    Utc::now()
}
