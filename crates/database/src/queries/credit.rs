use chrono::{DateTime, Utc};
use model::{Booking, User, UserCredit};
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct UserCreditRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    user_phone: String,
    amount: i64,
    reason: String,
    issued_at: DateTime<Utc>,
    issued_for_booking_id: uuid::Uuid,
    used: bool,
    used_at: Option<DateTime<Utc>>,
    redeemed_in_booking_id: Option<uuid::Uuid>,
    expires_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for UserCreditRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_phone: row.try_get("user_phone")?,
            amount: row.try_get("amount")?,
            reason: row.try_get("reason")?,
            issued_at: row.try_get("issued_at")?,
            issued_for_booking_id: row.try_get("issued_for_booking_id")?,
            used: row.try_get("used")?,
            used_at: row.try_get("used_at")?,
            redeemed_in_booking_id: row.try_get("redeemed_in_booking_id")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

impl From<UserCreditRow> for UserCredit {
    fn from(row: UserCreditRow) -> Self {
        UserCredit {
            id: Id::new(row.id),
            user_id: Id::new(row.user_id),
            user_phone: row.user_phone,
            amount: row.amount,
            reason: row.reason,
            issued_at: row.issued_at,
            issued_for_booking_id: Id::new(row.issued_for_booking_id),
            used: row.used,
            used_at: row.used_at,
            redeemed_in_booking_id: row.redeemed_in_booking_id.map(Id::new),
            expires_at: row.expires_at,
        }
    }
}

/// Idempotent on `issuedForBookingId`: a booking can only ever have one
/// compensation credit issued for it.
pub async fn issue<'c, E>(
    executor: E,
    user_id: Id<User>,
    user_phone: &str,
    amount: i64,
    reason: &str,
    issued_for_booking_id: Id<Booking>,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<UserCredit>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO user_credits (
            id, user_id, user_phone, amount, reason, issued_at,
            issued_for_booking_id, used, used_at, redeemed_in_booking_id, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, false, NULL, NULL, $8)
        ON CONFLICT (issued_for_booking_id) DO UPDATE SET issued_for_booking_id = EXCLUDED.issued_for_booking_id
        RETURNING *;
        ",
    )
    .bind(Id::<UserCredit>::generate().raw())
    .bind(user_id.raw())
    .bind(user_phone)
    .bind(amount)
    .bind(reason)
    .bind(now)
    .bind(issued_for_booking_id.raw())
    .bind(expires_at)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(UserCreditRow::into)
}

pub async fn exists_for_booking<'c, E>(executor: E, booking_id: Id<Booking>) -> Result<bool>
where
    E: Executor<'c, Database = Postgres>,
{
    let found: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT id FROM user_credits WHERE issued_for_booking_id = $1;")
            .bind(booking_id.raw())
            .fetch_optional(executor)
            .await
            .map_err(convert_error)?;

    Ok(found.is_some())
}

/// Count of credits issued to this user since midnight, for the daily cap.
pub async fn count_for_user_today<'c, E>(
    executor: E,
    user_id: Id<User>,
    since: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_credits WHERE user_id = $1 AND issued_at >= $2;",
    )
    .bind(user_id.raw())
    .bind(since)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
}

pub async fn list_for_user<'c, E>(executor: E, user_id: Id<User>) -> Result<Vec<UserCredit>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<UserCreditRow> = sqlx::query_as(
        "SELECT * FROM user_credits WHERE user_id = $1 ORDER BY issued_at DESC;",
    )
    .bind(user_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(UserCredit::from).collect())
}

pub async fn total_available_for_user<'c, E>(
    executor: E,
    user_id: Id<User>,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'c, Database = Postgres>,
{
    let total: Option<i64> = sqlx::query_scalar(
        "
        SELECT SUM(amount) FROM user_credits
        WHERE user_id = $1 AND used = false AND expires_at > $2;
        ",
    )
    .bind(user_id.raw())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(convert_error)?;

    Ok(total.unwrap_or(0))
}

pub async fn redeem<'c, E>(
    executor: E,
    id: Id<UserCredit>,
    redeemed_in_booking_id: Id<Booking>,
    now: DateTime<Utc>,
) -> Result<UserCredit>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE user_credits SET used = true, used_at = $3, redeemed_in_booking_id = $2
        WHERE id = $1 AND used = false
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(redeemed_in_booking_id.raw())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(UserCreditRow::into)
}
