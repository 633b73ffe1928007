use std::str::FromStr;

use chrono::{DateTime, Utc};
use model::{Booking, BookingMetadata, BookingState, TransportMode, TripType};
use sqlx::{postgres::PgRow, types::Json, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, DatabaseError, Result};

#[derive(Debug, Clone)]
struct BookingRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    user_phone: String,
    pickup: String,
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    dropoff: String,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
    trip_type: String,
    transport_mode: String,
    provider_id: Option<uuid::Uuid>,
    state: String,
    previous_state: Option<String>,
    fare_estimate: i64,
    fare_actual: Option<i64>,
    commission_rate: f64,
    commission_amount: Option<i64>,
    created_at: DateTime<Utc>,
    confirmed_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    failed_at: Option<DateTime<Utc>>,
    timeout_at: DateTime<Utc>,
    recovery_attempts: i32,
    manual_intervention: bool,
    metadata: Json<BookingMetadata>,
}

impl FromRow<'_, PgRow> for BookingRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            user_phone: row.try_get("user_phone")?,
            pickup: row.try_get("pickup")?,
            pickup_lat: row.try_get("pickup_lat")?,
            pickup_lng: row.try_get("pickup_lng")?,
            dropoff: row.try_get("dropoff")?,
            dropoff_lat: row.try_get("dropoff_lat")?,
            dropoff_lng: row.try_get("dropoff_lng")?,
            trip_type: row.try_get("trip_type")?,
            transport_mode: row.try_get("transport_mode")?,
            provider_id: row.try_get("provider_id")?,
            state: row.try_get("state")?,
            previous_state: row.try_get("previous_state")?,
            fare_estimate: row.try_get("fare_estimate")?,
            fare_actual: row.try_get("fare_actual")?,
            commission_rate: row.try_get("commission_rate")?,
            commission_amount: row.try_get("commission_amount")?,
            created_at: row.try_get("created_at")?,
            confirmed_at: row.try_get("confirmed_at")?,
            started_at: row.try_get("started_at")?,
            completed_at: row.try_get("completed_at")?,
            failed_at: row.try_get("failed_at")?,
            timeout_at: row.try_get("timeout_at")?,
            recovery_attempts: row.try_get("recovery_attempts")?,
            manual_intervention: row.try_get("manual_intervention")?,
            metadata: row.try_get("metadata")?,
        })
    }
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        Booking {
            id: Id::new(row.id),
            user_id: Id::new(row.user_id),
            user_phone: row.user_phone,
            pickup: row.pickup,
            pickup_lat: row.pickup_lat,
            pickup_lng: row.pickup_lng,
            dropoff: row.dropoff,
            dropoff_lat: row.dropoff_lat,
            dropoff_lng: row.dropoff_lng,
            trip_type: TripType::from_str(&row.trip_type).unwrap_or(TripType::Standard),
            transport_mode: TransportMode::from_str(&row.transport_mode).unwrap_or(TransportMode::Cab),
            provider_id: row.provider_id.map(Id::new),
            state: BookingState::from_str(&row.state).unwrap_or(BookingState::Searching),
            previous_state: row
                .previous_state
                .and_then(|s| BookingState::from_str(&s).ok()),
            fare_estimate: row.fare_estimate,
            fare_actual: row.fare_actual,
            commission_rate: row.commission_rate,
            commission_amount: row.commission_amount,
            created_at: row.created_at,
            confirmed_at: row.confirmed_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            failed_at: row.failed_at,
            timeout_at: row.timeout_at,
            recovery_attempts: row.recovery_attempts,
            manual_intervention: row.manual_intervention,
            metadata: row.metadata.0,
        }
    }
}

/// An optimistic `(id, expectedState)` update matched zero rows: the row is
/// gone or another writer already moved it past `expectedState`.
fn optimistic(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::StaleState,
        other => convert_error(other),
    }
}

pub async fn create<'c, E>(executor: E, booking: &Booking) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO bookings (
            id, user_id, user_phone, pickup, pickup_lat, pickup_lng,
            dropoff, dropoff_lat, dropoff_lng, trip_type, transport_mode,
            provider_id, state, previous_state, fare_estimate, fare_actual,
            commission_rate, commission_amount, created_at, confirmed_at,
            started_at, completed_at, failed_at, timeout_at,
            recovery_attempts, manual_intervention, metadata
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
            $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27
        )
        RETURNING *;
        ",
    )
    .bind(booking.id.raw())
    .bind(booking.user_id.raw())
    .bind(&booking.user_phone)
    .bind(&booking.pickup)
    .bind(booking.pickup_lat)
    .bind(booking.pickup_lng)
    .bind(&booking.dropoff)
    .bind(booking.dropoff_lat)
    .bind(booking.dropoff_lng)
    .bind(booking.trip_type.as_str())
    .bind(booking.transport_mode.as_str())
    .bind(booking.provider_id.map(|id| id.raw()))
    .bind(booking.state.as_str())
    .bind(booking.previous_state.map(|s| s.as_str()))
    .bind(booking.fare_estimate)
    .bind(booking.fare_actual)
    .bind(booking.commission_rate)
    .bind(booking.commission_amount)
    .bind(booking.created_at)
    .bind(booking.confirmed_at)
    .bind(booking.started_at)
    .bind(booking.completed_at)
    .bind(booking.failed_at)
    .bind(booking.timeout_at)
    .bind(booking.recovery_attempts)
    .bind(booking.manual_intervention)
    .bind(Json(&booking.metadata))
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(BookingRow::into)
}

pub async fn get<'c, E>(executor: E, id: Id<Booking>) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM bookings WHERE id = $1;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(BookingRow::into)
}

/// Caps list pages at 50 regardless of the caller's ask.
pub async fn list_for_user<'c, E>(
    executor: E,
    user_id: Id<model::User>,
    page: i64,
    limit: i64,
) -> Result<Vec<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    let limit = limit.clamp(1, 50);
    let rows: Vec<BookingRow> = sqlx::query_as(
        "
        SELECT * FROM bookings
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3;
        ",
    )
    .bind(user_id.raw())
    .bind(limit)
    .bind((page.max(1) - 1) * limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(Booking::from).collect())
}

pub async fn list_active<'c, E>(executor: E) -> Result<Vec<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<BookingRow> = sqlx::query_as(
        "
        SELECT * FROM bookings
        WHERE state NOT IN ('COMPLETED', 'CANCELLED')
        ORDER BY created_at DESC;
        ",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(Booking::from).collect())
}

pub async fn list_escalated<'c, E>(executor: E) -> Result<Vec<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<BookingRow> = sqlx::query_as(
        "SELECT * FROM bookings WHERE state = 'MANUAL_ESCALATION' ORDER BY created_at ASC;",
    )
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(Booking::from).collect())
}

/// Bookings still `SEARCHING` past their `timeoutAt` — the timeout sweeper's input.
pub async fn list_searching_timed_out<'c, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<Booking>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<BookingRow> = sqlx::query_as(
        "SELECT * FROM bookings WHERE state = 'SEARCHING' AND timeout_at < $1;",
    )
    .bind(now)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(Booking::from).collect())
}

/// Searching -> Confirmed with a provider assignment (fast path or scoring path).
#[allow(clippy::too_many_arguments)]
pub async fn assign_to_confirmed<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
    provider_id: Id<model::Provider>,
    commission_rate: f64,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET
            previous_state = state,
            state = 'CONFIRMED',
            provider_id = $3,
            commission_rate = $4,
            confirmed_at = $5
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .bind(provider_id.raw())
    .bind(commission_rate)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

pub async fn start<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET previous_state = state, state = 'IN_PROGRESS', started_at = $3
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

pub async fn complete<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
    fare_actual: i64,
    commission_amount: i64,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET
            previous_state = state,
            state = 'COMPLETED',
            completed_at = $3,
            fare_actual = $4,
            commission_amount = $5
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .bind(now)
    .bind(fare_actual)
    .bind(commission_amount)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

pub async fn fail<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET previous_state = state, state = 'FAILED', failed_at = $3
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

pub async fn cancel<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET previous_state = state, state = 'CANCELLED'
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

/// Recovery pipeline exhausted its retry ladder; flips on `manualIntervention`.
pub async fn escalate<'c, E>(
    executor: E,
    id: Id<Booking>,
    expected_state: BookingState,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET
            previous_state = state,
            state = 'MANUAL_ESCALATION',
            manual_intervention = true
        WHERE id = $1 AND state = $2
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(expected_state.as_str())
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

/// Bumps `recoveryAttempts` without touching state; one per retry-ladder rung.
pub async fn bump_recovery_attempts<'c, E>(executor: E, id: Id<Booking>) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "UPDATE bookings SET recovery_attempts = recovery_attempts + 1 WHERE id = $1 RETURNING *;",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(BookingRow::into)
}

/// Failed -> Searching, bumping `recoveryAttempts` for the next retry rung.
pub async fn retry_to_searching<'c, E>(
    executor: E,
    id: Id<Booking>,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET
            previous_state = state,
            state = 'SEARCHING',
            recovery_attempts = recovery_attempts + 1,
            timeout_at = $2
        WHERE id = $1 AND state = 'FAILED'
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}

/// Admin manual-confirm out of `MANUAL_ESCALATION` or `FAILED`.
pub async fn manual_confirm<'c, E>(
    executor: E,
    id: Id<Booking>,
    provider_id: Id<model::Provider>,
    now: DateTime<Utc>,
) -> Result<Booking>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE bookings SET
            previous_state = state,
            state = 'CONFIRMED',
            provider_id = $2,
            confirmed_at = $3
        WHERE id = $1 AND state IN ('MANUAL_ESCALATION', 'FAILED')
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(provider_id.raw())
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(optimistic)
    .map(BookingRow::into)
}
