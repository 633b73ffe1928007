use chrono::{DateTime, Utc};
use model::{Booking, BookingLog};
use serde_json::Value;
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct BookingLogRow {
    id: uuid::Uuid,
    booking_id: uuid::Uuid,
    event: String,
    message: String,
    metadata: Option<Value>,
    admin_action: bool,
    created_at: DateTime<Utc>,
}

impl FromRow<'_, PgRow> for BookingLogRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            booking_id: row.try_get("booking_id")?,
            event: row.try_get("event")?,
            message: row.try_get("message")?,
            metadata: row.try_get("metadata")?,
            admin_action: row.try_get("admin_action")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<BookingLogRow> for BookingLog {
    fn from(row: BookingLogRow) -> Self {
        BookingLog {
            id: Id::new(row.id),
            booking_id: Id::new(row.booking_id),
            event: row.event,
            message: row.message,
            metadata: row.metadata,
            admin_action: row.admin_action,
            created_at: row.created_at,
        }
    }
}

/// Append-only; booking logs are never updated or deleted.
pub async fn append<'c, E>(
    executor: E,
    booking_id: Id<Booking>,
    event: &str,
    message: &str,
    metadata: Option<Value>,
    admin_action: bool,
    now: DateTime<Utc>,
) -> Result<BookingLog>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO booking_logs (id, booking_id, event, message, metadata, admin_action, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        ",
    )
    .bind(Id::<BookingLog>::generate().raw())
    .bind(booking_id.raw())
    .bind(event)
    .bind(message)
    .bind(metadata)
    .bind(admin_action)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(BookingLogRow::into)
}

pub async fn list_for_booking<'c, E>(executor: E, booking_id: Id<Booking>) -> Result<Vec<BookingLog>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<BookingLogRow> = sqlx::query_as(
        "SELECT * FROM booking_logs WHERE booking_id = $1 ORDER BY created_at ASC;",
    )
    .bind(booking_id.raw())
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(BookingLog::from).collect())
}
