use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use auth::AuthUser;
use model::{Booking, BookingAttempt, BookingLog, Coordinates, TransportMode, TripType};
use orchestrator::bookings::{CreateBookingParams, CreditsSummary};
use orchestrator::{AppError, Services};
use serde::{Deserialize, Serialize};
use utility::id::Id;
use uuid::Uuid;

use crate::common::{Created, Ok200, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/", post(create).get(list))
        .route("/credits", get(credits))
        .route("/:id", get(get_one))
        .route("/:id/cancel", post(cancel))
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingBody {
    pickup: String,
    dropoff: String,
    trip_type: TripType,
    transport_mode: TransportMode,
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
    quote_id: Option<Uuid>,
    fare_estimate: Option<i64>,
}

async fn create(
    State(services): State<Arc<Services>>,
    AuthUser(user): AuthUser,
    Json(body): Json<CreateBookingBody>,
) -> Result<Created<Booking>, crate::common::ApiError> {
    if body.pickup.trim().is_empty() || body.dropoff.trim().is_empty() {
        return Err(AppError::Validation("pickup and dropoff are required".to_string()).into());
    }

    let params = CreateBookingParams {
        pickup: body.pickup,
        pickup_coords: coordinates(body.pickup_lat, body.pickup_lng),
        dropoff: body.dropoff,
        dropoff_coords: coordinates(body.dropoff_lat, body.dropoff_lng),
        trip_type: body.trip_type,
        transport_mode: body.transport_mode,
        quote_id: body.quote_id,
        fare_estimate: body.fare_estimate,
    };

    let booking = orchestrator::bookings::create_booking(&services, &user, params).await?;
    Ok(Created(booking))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingDetail {
    #[serde(flatten)]
    booking: Booking,
    logs: Vec<BookingLog>,
    attempts: Vec<BookingAttempt>,
}

async fn get_one(
    State(services): State<Arc<Services>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id<Booking>>,
) -> RouteResult<BookingDetail> {
    let booking = orchestrator::bookings::get(&services, &user, id).await?;
    let logs = database::queries::log::list_for_booking(services.db.pool(), id).await?;
    let attempts = database::queries::attempt::list_for_booking(services.db.pool(), id).await?;
    Ok(Ok200(BookingDetail {
        booking,
        logs,
        attempts,
    }))
}

#[derive(Deserialize)]
struct ListQuery {
    page: Option<i64>,
    limit: Option<i64>,
}

async fn list(
    State(services): State<Arc<Services>>,
    AuthUser(user): AuthUser,
    Query(query): Query<ListQuery>,
) -> RouteResult<model::VecResponse<Booking>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20);
    let bookings =
        orchestrator::bookings::list_for_user(&services, user.user_id, page, limit).await?;
    Ok(Ok200(bookings))
}

async fn cancel(
    State(services): State<Arc<Services>>,
    AuthUser(user): AuthUser,
    Path(id): Path<Id<Booking>>,
) -> RouteResult<Booking> {
    let booking = orchestrator::bookings::cancel(&services, &user, id).await?;
    Ok(Ok200(booking))
}

async fn credits(
    State(services): State<Arc<Services>>,
    AuthUser(user): AuthUser,
) -> RouteResult<CreditsSummary> {
    let summary = orchestrator::bookings::credits(&services, user.user_id).await?;
    Ok(Ok200(summary))
}

fn coordinates(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    }
}
