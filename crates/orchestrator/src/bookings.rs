use std::sync::Arc;

use chrono::{Duration, Utc};
use model::{
    Booking, BookingLogEvent, BookingMetadata, BookingState, Coordinates, Provider, TransportMode,
    TripType, UserCredit, UserIdentity, VecResponse,
};
use tokio::sync::watch;
use utility::id::Id;
use uuid::Uuid;

use crate::actor::{self, RunAssignment};
use crate::error::AppError;
use crate::metrics;
use crate::quotes;
use crate::services::Services;

/// Inbound shape for `POST /bookings`.
pub struct CreateBookingParams {
    pub pickup: String,
    pub pickup_coords: Option<Coordinates>,
    pub dropoff: String,
    pub dropoff_coords: Option<Coordinates>,
    pub trip_type: TripType,
    pub transport_mode: TransportMode,
    pub quote_id: Option<Uuid>,
    pub fare_estimate: Option<i64>,
}

/// Appends a `BookingLog` row and publishes `booking:state_changed` — the
/// pair every transition requires.
pub(crate) async fn log_and_publish(
    services: &Services,
    booking: &Booking,
    event: BookingLogEvent,
    message: &str,
    metadata: Option<serde_json::Value>,
    admin_action: bool,
) -> Result<(), AppError> {
    database::queries::log::append(
        services.db.pool(),
        booking.id,
        &event.to_string(),
        message,
        metadata,
        admin_action,
        Utc::now(),
    )
    .await?;

    services.events.publish_booking_state_changed(
        booking.user_id,
        booking.id,
        booking.state,
        booking.previous_state,
        booking.provider_id,
        Utc::now(),
    );

    Ok(())
}

/// The watch channel a booking's recovery loop polls between retry attempts
/// so a user cancellation aborts it early.
pub(crate) fn cancel_sender(services: &Services, booking_id: Id<Booking>) -> watch::Sender<bool> {
    services
        .cancel_signals
        .entry(booking_id)
        .or_insert_with(|| watch::channel(false).0)
        .clone()
}

pub(crate) fn cancel_receiver(services: &Services, booking_id: Id<Booking>) -> watch::Receiver<bool> {
    cancel_sender(services, booking_id).subscribe()
}

/// Resolves the fare (quoted item, then explicit estimate, then a fresh
/// cheapest-fare lookup), persists `SEARCHING`, and kicks off assignment
/// asynchronously.
pub async fn create_booking(
    services: &Arc<Services>,
    user: &UserIdentity,
    params: CreateBookingParams,
) -> Result<Booking, AppError> {
    let now = Utc::now();
    let hour: u32 = now.format("%H").to_string().parse().unwrap_or(12);

    let mut metadata = BookingMetadata::default();
    let fare_estimate = match params.quote_id {
        Some(quote_id) => match quotes::lookup_item(services, quote_id).await? {
            Some(item) => {
                metadata.quote_id = Some(quote_id);
                metadata.preselected_provider_id = item.provider_id;
                item.fare_paise
            }
            // Cache miss: fall back as if no quote had been selected at all.
            None => params.fare_estimate.unwrap_or_else(|| {
                fare::cheapest_fare(
                    params.transport_mode,
                    params.pickup_coords,
                    params.dropoff_coords,
                    hour,
                )
            }),
        },
        None => params.fare_estimate.unwrap_or_else(|| {
            fare::cheapest_fare(
                params.transport_mode,
                params.pickup_coords,
                params.dropoff_coords,
                hour,
            )
        }),
    };

    let booking = Booking {
        id: Id::generate(),
        user_id: user.user_id,
        user_phone: user.phone.clone(),
        pickup: params.pickup,
        pickup_lat: params.pickup_coords.map(|c| c.lat),
        pickup_lng: params.pickup_coords.map(|c| c.lng),
        dropoff: params.dropoff,
        dropoff_lat: params.dropoff_coords.map(|c| c.lat),
        dropoff_lng: params.dropoff_coords.map(|c| c.lng),
        trip_type: params.trip_type,
        transport_mode: params.transport_mode,
        provider_id: None,
        state: BookingState::Searching,
        previous_state: None,
        fare_estimate,
        fare_actual: None,
        commission_rate: Provider::DEFAULT_COMMISSION_RATE,
        commission_amount: None,
        created_at: now,
        confirmed_at: None,
        started_at: None,
        completed_at: None,
        failed_at: None,
        timeout_at: now + Duration::minutes(5),
        recovery_attempts: 0,
        manual_intervention: false,
        metadata,
    };

    let created = database::queries::booking::create(services.db.pool(), &booking).await?;
    log_and_publish(
        services,
        &created,
        BookingLogEvent::State(BookingState::Searching),
        "booking created",
        None,
        false,
    )
    .await?;

    let assignment_actor = actor::actor_for(services, created.id);
    let _ = assignment_actor
        .tell(RunAssignment {
            booking_id: created.id,
        })
        .await;

    if services.config.simulation_enabled() {
        spawn_dev_simulator(services.clone(), created.id);
    }

    Ok(created)
}

/// Development-only shortcut: confirms a booking 8 seconds after creation if
/// assignment/recovery haven't already settled it, so a local environment
/// without real providers still has something to demo. Statically
/// unreachable outside `Config::simulation_enabled`.
fn spawn_dev_simulator(services: Arc<Services>, booking_id: Id<Booking>) {
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(8)).await;

        let Ok(booking) = database::queries::booking::get(services.db.pool(), booking_id).await else {
            return;
        };
        if booking.state != BookingState::Searching {
            return;
        }
        let Ok(providers) = database::queries::provider::all(services.db.pool()).await else {
            return;
        };
        let Some(provider) = providers.first() else {
            return;
        };

        let now = Utc::now();
        let updated = match database::queries::booking::assign_to_confirmed(
            services.db.pool(),
            booking_id,
            BookingState::Searching,
            provider.id,
            provider.commission_rate,
            now,
        )
        .await
        {
            Ok(updated) => updated,
            Err(_) => return,
        };

        let _ = log_and_publish(
            &services,
            &updated,
            BookingLogEvent::State(BookingState::Confirmed),
            "confirmed by development simulator",
            None,
            false,
        )
        .await;
    });
}

pub async fn get(
    services: &Services,
    requester: &UserIdentity,
    id: Id<Booking>,
) -> Result<Booking, AppError> {
    let booking = database::queries::booking::get(services.db.pool(), id).await?;
    if !requester.is_admin && booking.user_id != requester.user_id {
        return Err(AppError::Forbidden);
    }
    Ok(booking)
}

pub async fn list_for_user(
    services: &Services,
    user_id: Id<model::User>,
    page: i64,
    limit: i64,
) -> Result<VecResponse<Booking>, AppError> {
    let bookings = database::queries::booking::list_for_user(services.db.pool(), user_id, page, limit)
        .await?;
    Ok(VecResponse::non_paginated(bookings))
}

/// `POST /bookings/:id/cancel`. Only the owner may cancel, and only from a
/// state the transition table allows.
pub async fn cancel(
    services: &Services,
    requester: &UserIdentity,
    id: Id<Booking>,
) -> Result<Booking, AppError> {
    let current = database::queries::booking::get(services.db.pool(), id).await?;
    if current.user_id != requester.user_id {
        return Err(AppError::Forbidden);
    }
    if !current.state.can_transition_to(BookingState::Cancelled) {
        return Err(AppError::InvalidTransition {
            current: current.state,
            expected: BookingState::Cancelled,
        });
    }

    let updated = database::queries::booking::cancel(services.db.pool(), id, current.state)
        .await
        .map_err(|why| match why {
            database::DatabaseError::StaleState => AppError::InvalidTransition {
                current: current.state,
                expected: BookingState::Cancelled,
            },
            other => other.into(),
        })?;

    // Wakes a recovery loop sleeping on this booking so it aborts early.
    let _ = cancel_sender(services, id).send(true);

    log_and_publish(
        services,
        &updated,
        BookingLogEvent::State(BookingState::Cancelled),
        "cancelled by user",
        None,
        false,
    )
    .await?;

    Ok(updated)
}

/// Driver-side progress transitions. Nothing in this system's HTTP surface
/// triggers these — there is no real provider integration to call back from —
/// but the state machine and the terminal-transition metrics hook are still
/// complete without a request path bolted on.
pub async fn mark_in_progress(services: &Services, id: Id<Booking>) -> Result<Booking, AppError> {
    let current = database::queries::booking::get(services.db.pool(), id).await?;
    let updated =
        database::queries::booking::start(services.db.pool(), id, current.state, Utc::now()).await?;
    log_and_publish(
        services,
        &updated,
        BookingLogEvent::State(BookingState::InProgress),
        "ride started",
        None,
        false,
    )
    .await?;
    Ok(updated)
}

pub async fn complete_ride(services: &Services, id: Id<Booking>) -> Result<Booking, AppError> {
    let current = database::queries::booking::get(services.db.pool(), id).await?;
    let now = Utc::now();
    // No live metering is available in this system's scope, so the fare
    // charged is exactly the estimate quoted at booking time.
    let fare_actual = current.fare_estimate;
    let commission_amount = (fare_actual as f64 * current.commission_rate).round() as i64;

    let updated = database::queries::booking::complete(
        services.db.pool(),
        id,
        current.state,
        fare_actual,
        commission_amount,
        now,
    )
    .await?;
    log_and_publish(
        services,
        &updated,
        BookingLogEvent::State(BookingState::Completed),
        "ride completed",
        None,
        false,
    )
    .await?;
    metrics::record_terminal(services, &updated, now).await?;
    Ok(updated)
}

pub async fn fail_ride(services: &Services, id: Id<Booking>) -> Result<Booking, AppError> {
    let current = database::queries::booking::get(services.db.pool(), id).await?;
    let now = Utc::now();
    let updated = database::queries::booking::fail(services.db.pool(), id, current.state, now).await?;
    log_and_publish(
        services,
        &updated,
        BookingLogEvent::State(BookingState::Failed),
        "ride failed",
        None,
        false,
    )
    .await?;
    metrics::record_terminal(services, &updated, now).await?;
    Ok(updated)
}

/// `POST /admin/bookings/:id/confirm`. Pulls a booking out of
/// `MANUAL_ESCALATION`/`FAILED` by hand-assigning it to a provider the admin
/// has vetted as available.
pub async fn manual_confirm(
    services: &Services,
    id: Id<Booking>,
    provider_id: Id<Provider>,
) -> Result<Booking, AppError> {
    let provider = database::queries::provider::get(services.db.pool(), provider_id).await?;
    if !provider.is_eligible(Utc::now()) {
        return Err(AppError::Validation(
            "provider is not eligible for assignment".to_string(),
        ));
    }

    let updated =
        database::queries::booking::manual_confirm(services.db.pool(), id, provider_id, Utc::now())
            .await
            .map_err(|why| match why {
                database::DatabaseError::StaleState => AppError::InvalidTransition {
                    current: BookingState::ManualEscalation,
                    expected: BookingState::Confirmed,
                },
                other => other.into(),
            })?;

    log_and_publish(
        services,
        &updated,
        BookingLogEvent::ManualConfirmation,
        "manually confirmed by admin",
        None,
        true,
    )
    .await?;

    Ok(updated)
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditsSummary {
    pub credits: Vec<UserCredit>,
    pub total_available: i64,
}

pub async fn credits(services: &Services, user_id: Id<model::User>) -> Result<CreditsSummary, AppError> {
    let credits = database::queries::credit::list_for_user(services.db.pool(), user_id).await?;
    let total_available =
        database::queries::credit::total_available_for_user(services.db.pool(), user_id, Utc::now())
            .await?;
    Ok(CreditsSummary {
        credits,
        total_available,
    })
}
