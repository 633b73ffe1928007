use chrono::{DateTime, Utc};
use database::queries::metric::Outcome;
use model::{Booking, BookingState, Provider};
use utility::id::Id;

use crate::error::AppError;
use crate::services::Services;

/// Folds a terminal booking into its provider's day bucket and bumps the
/// provider's lifetime ride counters/reliability. Only called for bookings
/// that reached a terminal state with a provider already assigned.
pub async fn record_terminal(services: &Services, booking: &Booking, now: DateTime<Utc>) -> Result<(), AppError> {
    let Some(provider_id) = booking.provider_id else {
        return Ok(());
    };

    let success = booking.state == BookingState::Completed;
    let outcome = if success {
        Outcome::Successful
    } else {
        Outcome::Failed
    };
    let on_time = booking
        .started_at
        .zip(booking.completed_at)
        .map(|(started, completed)| (completed - started).num_minutes() <= 90)
        .unwrap_or(true);
    let revenue = booking.fare_actual.unwrap_or(booking.fare_estimate);
    let commission = booking
        .commission_amount
        .unwrap_or_else(|| (revenue as f64 * booking.commission_rate).round() as i64);

    database::queries::metric::record_outcome(
        services.db.pool(),
        provider_id,
        now.date_naive(),
        outcome,
        on_time,
        revenue,
        commission,
    )
    .await?;

    database::queries::provider::record_terminal_ride(services.db.pool(), provider_id, success, now).await?;

    Ok(())
}

/// Called whenever a booking is cancelled or rejected before ever reaching a
/// provider-assigned terminal state, so the aggregator still sees the event.
pub async fn record_non_terminal_outcome(
    services: &Services,
    provider_id: Option<Id<Provider>>,
    outcome: Outcome,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let Some(provider_id) = provider_id else {
        return Ok(());
    };
    database::queries::metric::record_outcome(
        services.db.pool(),
        provider_id,
        now.date_naive(),
        outcome,
        true,
        0,
        0,
    )
    .await?;
    Ok(())
}
