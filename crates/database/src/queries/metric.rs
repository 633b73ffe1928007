use chrono::NaiveDate;
use model::{Provider, ProviderMetric};
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct ProviderMetricRow {
    provider_id: uuid::Uuid,
    date: NaiveDate,
    total: i64,
    successful: i64,
    cancelled: i64,
    rejected: i64,
    failed: i64,
    on_time: i64,
    late: i64,
    reliability_score: f64,
    on_time_rate: f64,
    total_revenue: i64,
    total_commission: i64,
}

impl FromRow<'_, PgRow> for ProviderMetricRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            provider_id: row.try_get("provider_id")?,
            date: row.try_get("date")?,
            total: row.try_get("total")?,
            successful: row.try_get("successful")?,
            cancelled: row.try_get("cancelled")?,
            rejected: row.try_get("rejected")?,
            failed: row.try_get("failed")?,
            on_time: row.try_get("on_time")?,
            late: row.try_get("late")?,
            reliability_score: row.try_get("reliability_score")?,
            on_time_rate: row.try_get("on_time_rate")?,
            total_revenue: row.try_get("total_revenue")?,
            total_commission: row.try_get("total_commission")?,
        })
    }
}

impl From<ProviderMetricRow> for ProviderMetric {
    fn from(row: ProviderMetricRow) -> Self {
        ProviderMetric {
            provider_id: Id::new(row.provider_id),
            date: row.date,
            total: row.total,
            successful: row.successful,
            cancelled: row.cancelled,
            rejected: row.rejected,
            failed: row.failed,
            on_time: row.on_time,
            late: row.late,
            reliability_score: row.reliability_score,
            on_time_rate: row.on_time_rate,
            total_revenue: row.total_revenue,
            total_commission: row.total_commission,
        }
    }
}

/// One outcome bucket the aggregator can bump per terminal booking.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Successful,
    Cancelled,
    Rejected,
    Failed,
}

/// Upserts the day's row for a provider, incrementing the counter for
/// `outcome` and folding in revenue/commission for completed rides.
pub async fn record_outcome<'c, E>(
    executor: E,
    provider_id: Id<Provider>,
    date: NaiveDate,
    outcome: Outcome,
    on_time: bool,
    revenue: i64,
    commission: i64,
) -> Result<ProviderMetric>
where
    E: Executor<'c, Database = Postgres>,
{
    let (successful, cancelled, rejected, failed) = match outcome {
        Outcome::Successful => (1, 0, 0, 0),
        Outcome::Cancelled => (0, 1, 0, 0),
        Outcome::Rejected => (0, 0, 1, 0),
        Outcome::Failed => (0, 0, 0, 1),
    };
    let (on_time_count, late_count) = if matches!(outcome, Outcome::Successful) {
        if on_time {
            (1, 0)
        } else {
            (0, 1)
        }
    } else {
        (0, 0)
    };

    sqlx::query_as(
        "
        INSERT INTO provider_metrics (
            provider_id, date, total, successful, cancelled, rejected, failed,
            on_time, late, reliability_score, on_time_rate, total_revenue, total_commission
        )
        VALUES (
            $1, $2, 1, $3, $4, $5, $6, $7, $8,
            $3::float8,
            ($7::numeric / NULLIF($7 + $8, 0)::numeric)::float8,
            $9, $10
        )
        ON CONFLICT (provider_id, date) DO UPDATE SET
            total = provider_metrics.total + 1,
            successful = provider_metrics.successful + $3,
            cancelled = provider_metrics.cancelled + $4,
            rejected = provider_metrics.rejected + $5,
            failed = provider_metrics.failed + $6,
            on_time = provider_metrics.on_time + $7,
            late = provider_metrics.late + $8,
            total_revenue = provider_metrics.total_revenue + $9,
            total_commission = provider_metrics.total_commission + $10,
            reliability_score = ((provider_metrics.successful + $3)::numeric
                / NULLIF(provider_metrics.total + 1, 0)::numeric)::float8,
            on_time_rate = ((provider_metrics.on_time + $7)::numeric
                / NULLIF((provider_metrics.on_time + $7) + (provider_metrics.late + $8), 0)::numeric)::float8
        RETURNING *;
        ",
    )
    .bind(provider_id.raw())
    .bind(date)
    .bind(successful)
    .bind(cancelled)
    .bind(rejected)
    .bind(failed)
    .bind(on_time_count)
    .bind(late_count)
    .bind(revenue)
    .bind(commission)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(ProviderMetricRow::into)
}

pub async fn get<'c, E>(executor: E, provider_id: Id<Provider>, date: NaiveDate) -> Result<ProviderMetric>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM provider_metrics WHERE provider_id = $1 AND date = $2;")
        .bind(provider_id.raw())
        .bind(date)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(ProviderMetricRow::into)
}

pub async fn list_recent<'c, E>(
    executor: E,
    provider_id: Id<Provider>,
    since: NaiveDate,
) -> Result<Vec<ProviderMetric>>
where
    E: Executor<'c, Database = Postgres>,
{
    let rows: Vec<ProviderMetricRow> = sqlx::query_as(
        "
        SELECT * FROM provider_metrics
        WHERE provider_id = $1 AND date >= $2
        ORDER BY date ASC;
        ",
    )
    .bind(provider_id.raw())
    .bind(since)
    .fetch_all(executor)
    .await
    .map_err(convert_error)?;

    Ok(rows.into_iter().map(ProviderMetric::from).collect())
}
