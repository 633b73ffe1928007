use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use events::BookingEvent;
use orchestrator::Services;
use serde::Deserialize;

use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new().route("/ws", get(upgrade)).with_state(state)
}

#[derive(Deserialize)]
struct WsQuery {
    /// Browsers can't attach custom headers to a WebSocket handshake, so the
    /// bearer token travels as a query parameter here instead.
    token: String,
}

/// Authenticates at handshake time, then streams every `booking:state_changed`
/// event for the caller's own room (and the admin room, for admins) until the
/// client disconnects.
async fn upgrade(
    State(services): State<Arc<Services>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    match auth::Claims::decode(&query.token, &services.config.jwt_secret) {
        Ok(claims) => ws.on_upgrade(move |socket| stream_events(socket, services, claims.identity())),
        Err(_) => (axum::http::StatusCode::UNAUTHORIZED, "invalid token").into_response(),
    }
}

async fn stream_events(mut socket: WebSocket, services: Arc<Services>, identity: model::UserIdentity) {
    let mut user_rx = services.events.subscribe(&events::user_room(identity.user_id));
    let mut admin_rx = identity
        .is_admin
        .then(|| services.events.subscribe(events::ADMIN_ROOM));

    loop {
        let event = if let Some(admin_rx) = admin_rx.as_mut() {
            tokio::select! {
                biased;
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                },
                event = user_rx.recv() => event,
                event = admin_rx.recv() => event,
            }
        } else {
            tokio::select! {
                biased;
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(_)) => break,
                },
                event = user_rx.recv() => event,
            }
        };

        let event: BookingEvent = match event {
            Ok(event) => event,
            // A lagged subscriber skips to the next event rather than
            // disconnecting; the database remains the source of truth.
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        let payload = match serde_json::to_string(&event) {
            Ok(payload) => payload,
            Err(_) => continue,
        };
        if socket.send(Message::Text(payload)).await.is_err() {
            break;
        }
    }
}
