use axum::{
    extract::{OriginalUri, Request},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::MethodFilter,
    Json,
};
use orchestrator::AppError;
use serde::Serialize;

/// A `MethodFilter` that matches every HTTP method, for catch-all fallbacks.
pub(crate) const METHOD_FILTER_ALL: MethodFilter = MethodFilter::GET
    .or(MethodFilter::POST)
    .or(MethodFilter::PATCH)
    .or(MethodFilter::PUT)
    .or(MethodFilter::DELETE);

/// The wire envelope every response carries, per spec.md §6:
/// `{success, data?, error?, message?}`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

pub type RouteResult<T> = Result<Ok200<T>, ApiError>;

/// A successful `200` response wrapping its payload in the envelope.
pub struct Ok200<T>(pub T);

impl<T: Serialize> IntoResponse for Ok200<T> {
    fn into_response(self) -> Response {
        Json(Envelope::ok(self.0)).into_response()
    }
}

/// A successful `201 Created` response, used by `POST /bookings`.
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(Envelope::ok(self.0))).into_response()
    }
}

/// Wraps [`AppError`] (spec.md §7's error taxonomy) for the HTTP boundary:
/// synchronous handlers never throw, they always return a structured
/// `{success: false, error, message}` body with the matching status code.
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(why: AppError) -> Self {
        ApiError(why)
    }
}

impl From<database::DatabaseError> for ApiError {
    fn from(why: database::DatabaseError) -> Self {
        ApiError(AppError::from(why))
    }
}

impl From<cache::CacheError> for ApiError {
    fn from(why: cache::CacheError) -> Self {
        ApiError(AppError::from(why))
    }
}

impl From<auth::AuthError> for ApiError {
    fn from(why: auth::AuthError) -> Self {
        ApiError(AppError::from(why))
    }
}

fn error_kind(why: &AppError) -> &'static str {
    match why {
        AppError::Validation(_) => "VALIDATION",
        AppError::Unauthenticated => "UNAUTHENTICATED",
        AppError::Forbidden => "FORBIDDEN",
        AppError::NotFound(_) => "NOT_FOUND",
        AppError::Conflict(_) => "CONFLICT",
        AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
        AppError::NoProvidersAvailable => "NO_PROVIDERS_AVAILABLE",
        AppError::Transient(_) => "TRANSIENT",
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        let body: Envelope<()> = Envelope {
            success: false,
            data: None,
            error: Some(error_kind(&self.0).to_string()),
            message: Some(self.0.to_string()),
        };
        (status, Json(body)).into_response()
    }
}

pub(crate) async fn route_not_found(OriginalUri(original_uri): OriginalUri, req: Request) -> impl IntoResponse {
    not_found_response(req.method(), original_uri.path())
}

pub(crate) fn not_found_response(method: &Method, uri: &str) -> impl IntoResponse {
    let body: Envelope<()> = Envelope {
        success: false,
        data: None,
        error: Some("NOT_FOUND".to_string()),
        message: Some(format!("no route for {method} {uri}")),
    };
    (StatusCode::NOT_FOUND, Json(body))
}
