use std::sync::Arc;

use chrono::Utc;
use database::queries::attempt;
use model::{AttemptMetadata, BookingLogEvent, BookingState};
use utility::id::Id;

use crate::bookings::log_and_publish;
use crate::error::AppError;
use crate::recovery;
use crate::services::Services;

/// Tries the preselected provider first (fast path), falls back to the
/// scoring engine, and hands off to recovery when nothing survives the
/// hard filter. Runs inside a `BookingActor`, so only one of these is ever
/// in flight per booking.
pub async fn run(services: &Arc<Services>, booking_id: Id<model::Booking>) -> Result<(), AppError> {
    let booking = database::queries::booking::get(services.db.pool(), booking_id).await?;
    if booking.state != BookingState::Searching {
        // Already resolved concurrently (e.g. admin manual-confirm, or a
        // duplicate message delivery) — nothing left for this run to do.
        return Ok(());
    }
    let now = Utc::now();

    if let Some(provider_id) = booking.metadata.preselected_provider_id {
        if let Ok(provider) = database::queries::provider::get(services.db.pool(), provider_id).await {
            let (min_reliability, min_rating) = booking.trip_type.thresholds();
            let eligible = provider.is_eligible(now)
                && provider.reliability >= min_reliability
                && provider.rating >= min_rating;

            attempt::append(
                services.db.pool(),
                booking.id,
                provider_id,
                eligible,
                None,
                provider.reliability,
                None,
                Some(booking.fare_estimate),
                AttemptMetadata::FastPath,
                now,
            )
            .await?;

            if eligible {
                return confirm(
                    services,
                    &booking,
                    provider_id,
                    provider.commission_rate,
                    "from quote selection",
                    now,
                )
                .await;
            }
        }
    }

    let excluded: Vec<Id<model::Provider>> = attempt::list_for_booking(services.db.pool(), booking.id)
        .await?
        .into_iter()
        .filter(|attempt| !attempt.success)
        .map(|attempt| attempt.provider_id)
        .collect();

    let providers = database::queries::provider::all(services.db.pool()).await?;
    match scoring::find_best(&providers, &excluded, booking.trip_type, now) {
        Some(scored) => {
            attempt::append(
                services.db.pool(),
                booking.id,
                scored.provider_id,
                true,
                Some(scored.total),
                scored.reliability,
                None,
                Some(booking.fare_estimate),
                AttemptMetadata::Scoring,
                now,
            )
            .await?;
            confirm(
                services,
                &booking,
                scored.provider_id,
                booking.commission_rate,
                "assigned by scoring engine",
                now,
            )
            .await
        }
        None => recovery::run(services, booking_id).await,
    }
}

async fn confirm(
    services: &Services,
    booking: &model::Booking,
    provider_id: Id<model::Provider>,
    commission_rate: f64,
    assignment_message: &str,
    now: chrono::DateTime<Utc>,
) -> Result<(), AppError> {
    let updated = match database::queries::booking::assign_to_confirmed(
        services.db.pool(),
        booking.id,
        BookingState::Searching,
        provider_id,
        commission_rate,
        now,
    )
    .await
    {
        Ok(updated) => updated,
        // Someone else already moved this booking past SEARCHING — treat as
        // already handled rather than surfacing an error.
        Err(database::DatabaseError::StaleState) => return Ok(()),
        Err(other) => return Err(other.into()),
    };

    log_and_publish(
        services,
        &updated,
        BookingLogEvent::State(BookingState::Confirmed),
        "booking confirmed",
        None,
        false,
    )
    .await?;
    log_and_publish(
        services,
        &updated,
        BookingLogEvent::ProviderAssigned,
        assignment_message,
        None,
        false,
    )
    .await
}
