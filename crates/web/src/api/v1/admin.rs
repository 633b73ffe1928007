use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Json, Router,
};
use auth::AdminUser;
use model::{Booking, Provider, ProviderMetric};
use orchestrator::Services;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::common::{Created, Ok200, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/bookings/active", get(active_bookings))
        .route("/bookings/escalated", get(escalated_bookings))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/providers", get(list_providers).post(create_provider))
        .route("/providers/:id", put(update_provider))
        .route("/providers/:id/metrics", get(provider_metrics))
        .route("/providers/:id/pause", post(pause_provider))
        .route("/providers/:id/resume", post(resume_provider))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Dashboard {
    active_bookings: usize,
    escalated_bookings: usize,
    total_providers: usize,
    active_providers: usize,
}

async fn dashboard(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
) -> RouteResult<Dashboard> {
    let active = database::queries::booking::list_active(services.db.pool()).await?;
    let escalated = database::queries::booking::list_escalated(services.db.pool()).await?;
    let providers = database::queries::provider::all(services.db.pool()).await?;

    Ok(Ok200(Dashboard {
        active_bookings: active.len(),
        escalated_bookings: escalated.len(),
        total_providers: providers.len(),
        active_providers: providers.iter().filter(|p| p.active).count(),
    }))
}

async fn active_bookings(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
) -> RouteResult<Vec<Booking>> {
    let bookings = database::queries::booking::list_active(services.db.pool()).await?;
    Ok(Ok200(bookings))
}

async fn escalated_bookings(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
) -> RouteResult<Vec<Booking>> {
    let bookings = database::queries::booking::list_escalated(services.db.pool()).await?;
    Ok(Ok200(bookings))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmBookingBody {
    provider_id: Id<Provider>,
}

async fn confirm_booking(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Id<Booking>>,
    Json(body): Json<ConfirmBookingBody>,
) -> RouteResult<Booking> {
    let booking = orchestrator::bookings::manual_confirm(&services, id, body.provider_id).await?;
    Ok(Ok200(booking))
}

#[derive(Deserialize)]
struct ListProvidersQuery {
    #[serde(rename = "activeOnly")]
    active_only: Option<bool>,
    page: Option<i64>,
    limit: Option<i64>,
}

async fn list_providers(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Query(query): Query<ListProvidersQuery>,
) -> RouteResult<Vec<Provider>> {
    let providers = orchestrator::providers::list(
        &services,
        query.active_only.unwrap_or(false),
        query.page.unwrap_or(1).max(1),
        query.limit.unwrap_or(20),
    )
    .await?;
    Ok(Ok200(providers))
}

async fn create_provider(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Json(provider): Json<Provider>,
) -> Result<Created<Provider>, crate::common::ApiError> {
    let created = orchestrator::providers::create(&services, provider).await?;
    Ok(Created(created))
}

async fn update_provider(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Id<Provider>>,
    Json(mut provider): Json<Provider>,
) -> RouteResult<Provider> {
    provider.id = id;
    let updated = orchestrator::providers::update(&services, provider).await?;
    Ok(Ok200(updated))
}

#[derive(Deserialize)]
struct MetricsQuery {
    days: Option<i64>,
}

async fn provider_metrics(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Id<Provider>>,
    Query(query): Query<MetricsQuery>,
) -> RouteResult<Vec<ProviderMetric>> {
    let metrics =
        orchestrator::providers::get_metrics(&services, id, query.days.unwrap_or(30)).await?;
    Ok(Ok200(metrics))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PauseProviderBody {
    reason: String,
    duration_hours: i64,
}

async fn pause_provider(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Id<Provider>>,
    Json(body): Json<PauseProviderBody>,
) -> RouteResult<Provider> {
    let provider =
        orchestrator::providers::pause(&services, id, &body.reason, body.duration_hours).await?;
    Ok(Ok200(provider))
}

async fn resume_provider(
    State(services): State<Arc<Services>>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Id<Provider>>,
) -> RouteResult<Provider> {
    let provider = orchestrator::providers::resume(&services, id).await?;
    Ok(Ok200(provider))
}
