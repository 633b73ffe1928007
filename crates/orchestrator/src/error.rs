use axum::http::StatusCode;
use model::BookingState;

/// The orchestrator's single error type. Hand-rolled rather than derived
/// with `thiserror`, matching the shape the rest of this codebase uses for
/// its domain error enums.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Unauthenticated,
    Forbidden,
    NotFound(String),
    Conflict(String),
    InvalidTransition {
        current: BookingState,
        expected: BookingState,
    },
    NoProvidersAvailable,
    /// Upstream dependency (database, cache) failed in a way a retry could
    /// plausibly fix. Surfaced as 500 on the synchronous path; background
    /// workflows retry per their own policy instead of bubbling this up.
    Transient(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(why) => write!(f, "validation error: {why}"),
            AppError::Unauthenticated => write!(f, "authentication required"),
            AppError::Forbidden => write!(f, "forbidden"),
            AppError::NotFound(what) => write!(f, "{what} not found"),
            AppError::Conflict(why) => write!(f, "conflict: {why}"),
            AppError::InvalidTransition { current, expected } => write!(
                f,
                "invalid transition: booking is {current:?}, expected {expected:?}"
            ),
            AppError::NoProvidersAvailable => write!(f, "no providers available"),
            AppError::Transient(why) => write!(f, "transient error: {why}"),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::InvalidTransition { .. } => StatusCode::BAD_REQUEST,
            AppError::NoProvidersAvailable => StatusCode::NOT_FOUND,
            AppError::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<database::DatabaseError> for AppError {
    fn from(why: database::DatabaseError) -> Self {
        match why {
            database::DatabaseError::NotFound => AppError::NotFound("resource".to_string()),
            database::DatabaseError::Conflict(message) => AppError::Conflict(message),
            // The caller of a transition function is responsible for turning
            // this into a `current`/`expected` pair it actually knows; this
            // fallback only fires where that context isn't available.
            database::DatabaseError::StaleState => AppError::Conflict(
                "booking state changed before this update could apply".to_string(),
            ),
            database::DatabaseError::Other(why) => AppError::Transient(why.to_string()),
        }
    }
}

impl From<cache::CacheError> for AppError {
    fn from(why: cache::CacheError) -> Self {
        AppError::Transient(why.to_string())
    }
}

impl From<auth::AuthError> for AppError {
    fn from(_why: auth::AuthError) -> Self {
        AppError::Unauthenticated
    }
}
