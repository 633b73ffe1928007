use chrono::{DateTime, Utc};
use model::{Booking, BookingAttempt, AttemptMetadata, Provider};
use sqlx::{postgres::PgRow, types::Json, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct BookingAttemptRow {
    id: uuid::Uuid,
    booking_id: uuid::Uuid,
    provider_id: uuid::Uuid,
    attempt_number: i32,
    success: bool,
    score: Option<f64>,
    reliability: f64,
    eta: Option<i32>,
    fare: Option<i64>,
    created_at: DateTime<Utc>,
    metadata: Json<AttemptMetadata>,
}

impl FromRow<'_, PgRow> for BookingAttemptRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            provider_id: row.try_get("provider_id")?,
            attempt_number: row.try_get("attempt_number")?,
            success: row.try_get("success")?,
            score: row.try_get("score")?,
            reliability: row.try_get("reliability")?,
            eta: row.try_get("eta")?,
            fare: row.try_get("fare")?,
            created_at: row.try_get("created_at")?,
            metadata: row.try_get("metadata")?,
        })
    }
}

impl From<BookingAttemptRow> for BookingAttempt {
    fn from(row: BookingAttemptRow) -> Self {
        BookingAttempt {
            id: Id::new(row.id),
            booking_id: Id::new(row.booking_id),
            provider_id: Id::new(row.provider_id),
            attempt_number: row.attempt_number,
            success: row.success,
            score: row.score,
            reliability: row.reliability,
            eta: row.eta,
            fare: row.fare,
            created_at: row.created_at,
            metadata: row.metadata.0,
        }
    }
}

/// Appends the next attempt for a booking, computing `attemptNumber` as
/// `max(existing) + 1` atomically within this single statement.
#[allow(clippy::too_many_arguments)]
pub async fn append<'c, E>(
    executor: E,
    booking_id: Id<Booking>,
    provider_id: Id<Provider>,
    success: bool,
    score: Option<f64>,
    reliability: f64,
    eta: Option<i32>,
    fare: Option<i64>,
    metadata: AttemptMetadata,
    now: DateTime<Utc>,
) -> Result<BookingAttempt>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO booking_attempts (
            id, booking_id, provider_id, attempt_number, success, score,
            reliability, eta, fare, created_at, metadata
        )
        SELECT
            $1, $2, $3,
            COALESCE((SELECT MAX(attempt_number) FROM booking_attempts WHERE booking_id = $2), 0) + 1,
            $4, $5, $6, $7, $8, $9, $10
        RETURNING *;
        ",
    )
    .bind(Id::<BookingAttempt>::generate().raw())
    .bind(booking_id.raw())
    .bind(provider_id.raw())
    .bind(success)
    .bind(score)
    .bind(reliability)
    .bind(eta)
    .bind(fare)
    .bind(now)
    .bind(Json(metadata))
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(BookingAttemptRow::into)
}

pub async fn list_for_booking<'c, E>(executor: E, booking_id: Id<Booking>) -> Result<Vec<BookingAttempt>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<BookingAttemptRow> = sqlx::query_as(
        "SELECT * FROM booking_attempts WHERE booking_id = $1 ORDER BY attempt_number ASC;",
    )
    .bind(booking_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(BookingAttempt::from).collect())
}
