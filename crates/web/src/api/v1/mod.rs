use axum::{routing::on, Router};

use crate::{
    common::{route_not_found, METHOD_FILTER_ALL},
    WebState,
};

mod admin;
mod auth;
mod bookings;
mod quotes;
mod realtime;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .nest_service("/auth", auth::routes(state.clone()))
        .nest_service("/quotes", quotes::routes(state.clone()))
        .nest_service("/bookings", bookings::routes(state.clone()))
        .nest_service("/admin", admin::routes(state.clone()))
        .nest_service("/realtime", realtime::routes(state.clone()))
        .fallback_service(on(METHOD_FILTER_ALL, route_not_found))
}
