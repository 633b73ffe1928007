use std::str::FromStr;

use chrono::{DateTime, Utc};
use model::{Provider, ProviderType, VehicleMetadata};
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct ProviderRow {
    id: uuid::Uuid,
    name: String,
    phone: String,
    provider_type: String,
    vehicle_make: Option<String>,
    vehicle_model: Option<String>,
    vehicle_plate_number: Option<String>,
    vehicle_color: Option<String>,
    commission_rate: f64,
    active: bool,
    paused_until: Option<DateTime<Utc>>,
    pause_reason: Option<String>,
    reliability: f64,
    rating: f64,
    total_rides: i64,
    successful_rides: i64,
    last_active_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, PgRow> for ProviderRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            phone: row.try_get("phone")?,
            provider_type: row.try_get("provider_type")?,
            vehicle_make: row.try_get("vehicle_make")?,
            vehicle_model: row.try_get("vehicle_model")?,
            vehicle_plate_number: row.try_get("vehicle_plate_number")?,
            vehicle_color: row.try_get("vehicle_color")?,
            commission_rate: row.try_get("commission_rate")?,
            active: row.try_get("active")?,
            paused_until: row.try_get("paused_until")?,
            pause_reason: row.try_get("pause_reason")?,
            reliability: row.try_get("reliability")?,
            rating: row.try_get("rating")?,
            total_rides: row.try_get("total_rides")?,
            successful_rides: row.try_get("successful_rides")?,
            last_active_at: row.try_get("last_active_at")?,
        })
    }
}

impl From<ProviderRow> for Provider {
    fn from(row: ProviderRow) -> Self {
        Provider {
            id: Id::new(row.id),
            name: row.name,
            phone: row.phone,
            provider_type: ProviderType::from_str(&row.provider_type)
                .unwrap_or(ProviderType::Individual),
            vehicle: VehicleMetadata {
                make: row.vehicle_make,
                model: row.vehicle_model,
                plate_number: row.vehicle_plate_number,
                color: row.vehicle_color,
            },
            commission_rate: row.commission_rate,
            active: row.active,
            paused_until: row.paused_until,
            pause_reason: row.pause_reason,
            reliability: row.reliability,
            rating: row.rating,
            total_rides: row.total_rides,
            successful_rides: row.successful_rides,
            last_active_at: row.last_active_at,
        }
    }
}

pub async fn create<'c, E>(executor: E, provider: &Provider) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO providers (
            id, name, phone, provider_type,
            vehicle_make, vehicle_model, vehicle_plate_number, vehicle_color,
            commission_rate, active, paused_until, pause_reason,
            reliability, rating, total_rides, successful_rides, last_active_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        RETURNING *;
        ",
    )
    .bind(provider.id.raw())
    .bind(&provider.name)
    .bind(&provider.phone)
    .bind(provider.provider_type.as_str())
    .bind(&provider.vehicle.make)
    .bind(&provider.vehicle.model)
    .bind(&provider.vehicle.plate_number)
    .bind(&provider.vehicle.color)
    .bind(provider.commission_rate)
    .bind(provider.active)
    .bind(provider.paused_until)
    .bind(&provider.pause_reason)
    .bind(provider.reliability)
    .bind(provider.rating)
    .bind(provider.total_rides)
    .bind(provider.successful_rides)
    .bind(provider.last_active_at)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderRow::into)
}

/// Full update; forbids mutating id/createdAt/totalRides/successfulRides by
/// simply never accepting them as inputs here.
pub async fn update<'c, E>(executor: E, provider: &Provider) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE providers SET
            name = $2,
            phone = $3,
            provider_type = $4,
            vehicle_make = $5,
            vehicle_model = $6,
            vehicle_plate_number = $7,
            vehicle_color = $8,
            commission_rate = $9,
            active = $10,
            paused_until = $11,
            pause_reason = $12,
            reliability = $13,
            rating = $14
        WHERE id = $1
        RETURNING *;
        ",
    )
    .bind(provider.id.raw())
    .bind(&provider.name)
    .bind(&provider.phone)
    .bind(provider.provider_type.as_str())
    .bind(&provider.vehicle.make)
    .bind(&provider.vehicle.model)
    .bind(&provider.vehicle.plate_number)
    .bind(&provider.vehicle.color)
    .bind(provider.commission_rate)
    .bind(provider.active)
    .bind(provider.paused_until)
    .bind(&provider.pause_reason)
    .bind(provider.reliability)
    .bind(provider.rating)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderRow::into)
}

pub async fn get<'c, E>(executor: E, id: Id<Provider>) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM providers WHERE id = $1;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(ProviderRow::into)
}

pub async fn list<'c, E>(
    executor: E,
    active_only: bool,
    page: i64,
    limit: i64,
) -> Result<Vec<Provider>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<ProviderRow> = sqlx::query_as(
        "
        SELECT * FROM providers
        WHERE ($1 = false OR active = true)
        ORDER BY name ASC
        LIMIT $2 OFFSET $3;
        ",
    )
    .bind(active_only)
    .bind(limit)
    .bind((page.max(1) - 1) * limit)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(Provider::from).collect())
}

/// All providers, unfiltered and unpaginated — the scoring engine's input.
pub async fn all<'c, E>(executor: E) -> Result<Vec<Provider>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<ProviderRow> = sqlx::query_as("SELECT * FROM providers;")
        .fetch_all(executor)
        .await
        .map_err(convert_error)?;

    Ok(rows.into_iter().map(Provider::from).collect())
}

pub async fn pause<'c, E>(
    executor: E,
    id: Id<Provider>,
    reason: &str,
    paused_until: DateTime<Utc>,
) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE providers SET paused_until = $2, pause_reason = $3
        WHERE id = $1
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(paused_until)
    .bind(reason)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderRow::into)
}

pub async fn resume<'c, E>(executor: E, id: Id<Provider>) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE providers SET paused_until = NULL, pause_reason = NULL, active = true
        WHERE id = $1
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderRow::into)
}

/// Clears expired pauses; used by the paused-provider sweeper.
pub async fn resume_expired_pauses<'c, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<Id<Provider>>>
where
    E: Executor<'c, Database = Postgres>,
{
    let ids: Vec<uuid::Uuid> = sqlx::query_scalar(
        "
        UPDATE providers SET paused_until = NULL, pause_reason = NULL, active = true
        WHERE paused_until IS NOT NULL AND paused_until < $1
        RETURNING id;
        ",
    )
    .bind(now)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(ids.into_iter().map(Id::new).collect())
}

/// Bumps ride counters and recomputes reliability after a terminal
/// transition.
pub async fn record_terminal_ride<'c, E>(
    executor: E,
    id: Id<Provider>,
    success: bool,
    now: DateTime<Utc>,
) -> Result<Provider>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        UPDATE providers SET
            total_rides = total_rides + 1,
            successful_rides = successful_rides + CASE WHEN $2 THEN 1 ELSE 0 END,
            last_active_at = $3,
            reliability = ROUND(
                (successful_rides + CASE WHEN $2 THEN 1 ELSE 0 END)::numeric
                    / (total_rides + 1)::numeric,
                2
            )::float8
        WHERE id = $1
        RETURNING *;
        ",
    )
    .bind(id.raw())
    .bind(success)
    .bind(now)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderRow::into)
}
