use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use model::{Coordinates, Quote, TransportMode};
use orchestrator::{AppError, Services};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Ok200, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new().route("/", post(create_quote)).with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteRequest {
    pickup: String,
    dropoff: String,
    transport_mode: TransportMode,
    pickup_lat: Option<f64>,
    pickup_lng: Option<f64>,
    dropoff_lat: Option<f64>,
    dropoff_lng: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    quote_id: Uuid,
    quotes: Vec<Quote>,
}

/// Prices every tier for the requested mode. Pickup/dropoff coordinates are
/// optional — the fare engine falls back to defined defaults when either
/// pair is absent, so an address-only request still gets a usable estimate.
async fn create_quote(
    State(services): State<Arc<Services>>,
    Json(body): Json<QuoteRequest>,
) -> RouteResult<QuoteResponse> {
    let pickup = coordinates(body.pickup_lat, body.pickup_lng);
    let dropoff = coordinates(body.dropoff_lat, body.dropoff_lng);

    if (body.pickup.trim().is_empty()) || (body.dropoff.trim().is_empty()) {
        return Err(AppError::Validation("pickup and dropoff are required".to_string()).into());
    }

    let result = orchestrator::quotes::get_quotes(&services, body.transport_mode, pickup, dropoff).await?;
    Ok(Ok200(QuoteResponse {
        quote_id: result.session_id,
        quotes: result.quotes,
    }))
}

fn coordinates(lat: Option<f64>, lng: Option<f64>) -> Option<Coordinates> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(Coordinates::new(lat, lng)),
        _ => None,
    }
}
