use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::booking::Booking;
use crate::user::User;

/// A wallet credit issued by the recovery pipeline when automation exhausts
/// retries for a booking.
///
/// The source conflates "issued for booking B" and "redeemed on booking B"
/// into a single `usedInBookingId` field. Split here into an immutable
/// issuance reference and a nullable redemption reference.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCredit {
    pub id: Id<UserCredit>,
    pub user_id: Id<User>,
    pub user_phone: String,
    pub amount: i64,
    pub reason: String,
    pub issued_at: DateTime<Utc>,
    pub issued_for_booking_id: Id<Booking>,
    pub used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub redeemed_in_booking_id: Option<Id<Booking>>,
    pub expires_at: DateTime<Utc>,
}

impl UserCredit {
    /// Compensation credit amount, minor units.
    pub const COMPENSATION_AMOUNT: i64 = 10000;
    /// Credits are valid for 30 days from issuance.
    pub const VALIDITY_DAYS: i64 = 30;
    /// Daily cap per user before `issueCompensation` becomes a no-op.
    pub const DAILY_CAP: usize = 3;
}
