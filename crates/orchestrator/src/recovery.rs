use std::sync::Arc;

use chrono::{Duration, Utc};
use database::queries::attempt;
use model::{AttemptMetadata, Booking, BookingLogEvent, BookingState, TripType};
use utility::id::Id;

use crate::bookings::{cancel_receiver, log_and_publish};
use crate::error::AppError;
use crate::services::Services;

const MAX_RETRIES: i32 = 3;
/// Fixed compensation credit amount, independent of the booking's fare.
const COMPENSATION_AMOUNT_MINOR_UNITS: i64 = 10000;
/// Capped at three per user per day.
const DAILY_COMPENSATION_CAP: i64 = 3;
const COMPENSATION_VALIDITY_DAYS: i64 = 30;

/// Retries assignment up to [`MAX_RETRIES`] times, loosening the trip
/// type to `STANDARD` after the first attempt, then escalates to manual
/// review and issues a compensation credit. Runs inside the same
/// `BookingActor` as [`crate::assignment::run`], so it never races itself.
pub async fn run(services: &Arc<Services>, booking_id: Id<Booking>) -> Result<(), AppError> {
    let booking = database::queries::booking::get(services.db.pool(), booking_id).await?;
    let mut booking = match booking.state {
        BookingState::Failed => {
            database::queries::booking::retry_to_searching(services.db.pool(), booking_id, Utc::now())
                .await?
        }
        BookingState::Searching => booking,
        // Already resolved (confirmed, cancelled, escalated) by someone else.
        _ => return Ok(()),
    };

    let excluded: Vec<Id<model::Provider>> = attempt::list_for_booking(services.db.pool(), booking_id)
        .await?
        .into_iter()
        .filter(|attempt| !attempt.success)
        .map(|attempt| attempt.provider_id)
        .collect();

    let mut cancelled = cancel_receiver(services, booking_id);

    for attempt_number in 1..=MAX_RETRIES {
        if *cancelled.borrow_and_update() {
            return Ok(());
        }

        booking = database::queries::booking::bump_recovery_attempts(services.db.pool(), booking_id).await?;

        let trip_type = if attempt_number == 1 {
            booking.trip_type
        } else {
            TripType::Standard
        };
        let now = Utc::now();
        let providers = database::queries::provider::all(services.db.pool()).await?;

        match scoring::find_best(&providers, &excluded, trip_type, now) {
            Some(scored) => {
                attempt::append(
                    services.db.pool(),
                    booking_id,
                    scored.provider_id,
                    true,
                    Some(scored.total),
                    scored.reliability,
                    None,
                    Some(booking.fare_estimate),
                    AttemptMetadata::Recovery { attempt_number },
                    now,
                )
                .await?;

                let updated = match database::queries::booking::assign_to_confirmed(
                    services.db.pool(),
                    booking_id,
                    BookingState::Searching,
                    scored.provider_id,
                    booking.commission_rate,
                    now,
                )
                .await
                {
                    Ok(updated) => updated,
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
                    BookingLogEvent::RecoverySuccess,
                    &format!("recovered on attempt {attempt_number}"),
                    None,
                    false,
                )
                .await?;
                return Ok(());
            }
            None => {
                // No specific provider was attempted, so `excluded` is left
                // untouched — loosening the trip type next rung may let a
                // provider already in the pool pass the hard filter.
                log_and_publish(
                    services,
                    &booking,
                    BookingLogEvent::RecoveryFailed,
                    &format!("no eligible provider on attempt {attempt_number}"),
                    None,
                    false,
                )
                .await?;
            }
        }
    }

    let failed = database::queries::booking::fail(services.db.pool(), booking_id, BookingState::Searching, Utc::now())
        .await?;
    log_and_publish(
        services,
        &failed,
        BookingLogEvent::State(BookingState::Failed),
        "retry ladder exhausted",
        None,
        false,
    )
    .await?;

    let escalated =
        database::queries::booking::escalate(services.db.pool(), booking_id, BookingState::Failed).await?;
    log_and_publish(
        services,
        &escalated,
        BookingLogEvent::Escalated,
        "escalated to manual review",
        None,
        false,
    )
    .await?;

    issue_compensation(services, &escalated).await
}

/// Idempotent: a booking can only ever carry one compensation credit, and a
/// user is capped at [`DAILY_COMPENSATION_CAP`] per day.
async fn issue_compensation(services: &Services, booking: &Booking) -> Result<(), AppError> {
    if database::queries::credit::exists_for_booking(services.db.pool(), booking.id).await? {
        return Ok(());
    }

    let now = Utc::now();
    let since = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is a valid time")
        .and_utc();
    let issued_today =
        database::queries::credit::count_for_user_today(services.db.pool(), booking.user_id, since).await?;
    if issued_today >= DAILY_COMPENSATION_CAP {
        log_and_publish(
            services,
            booking,
            BookingLogEvent::CompensationLimit,
            "daily compensation cap reached, no credit issued",
            None,
            false,
        )
        .await?;
        return Ok(());
    }

    database::queries::credit::issue(
        services.db.pool(),
        booking.user_id,
        &booking.user_phone,
        COMPENSATION_AMOUNT_MINOR_UNITS,
        "booking escalated to manual review",
        booking.id,
        now,
        now + Duration::days(COMPENSATION_VALIDITY_DAYS),
    )
    .await?;

    Ok(())
}
