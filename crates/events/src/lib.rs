use chrono::{DateTime, Utc};
use dashmap::DashMap;
use model::{Booking, BookingState, Provider, User};
use serde::Serialize;
use tokio::sync::broadcast;
use utility::id::Id;

/// Capacity of each room's broadcast channel. A slow subscriber that falls
/// this far behind gets `Lagged` on its next recv rather than blocking
/// the publisher — state changes are still in the database either way.
const ROOM_CAPACITY: usize = 256;

/// Summary payload published on every booking state transition.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    #[serde(rename = "booking:state_changed")]
    StateChanged {
        id: Id<Booking>,
        state: BookingState,
        previous_state: Option<BookingState>,
        provider_id: Option<Id<Provider>>,
        updated_at: DateTime<Utc>,
    },
}

pub const ADMIN_ROOM: &str = "admin";

pub fn user_room(user_id: Id<User>) -> String {
    format!("user:{user_id}")
}

/// Single-process pub/sub over named rooms. A room is created lazily on
/// first subscribe or publish and lives for the process lifetime — there is
/// no persistence, so a restarted process means subscribers must reconnect.
#[derive(Default)]
pub struct EventBus {
    rooms: DashMap<String, broadcast::Sender<BookingEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, room: &str) -> broadcast::Sender<BookingEvent> {
        self.rooms
            .entry(room.to_string())
            .or_insert_with(|| broadcast::channel(ROOM_CAPACITY).0)
            .clone()
    }

    /// Joins `room`, returning a receiver for every event published to it
    /// from this point forward.
    pub fn subscribe(&self, room: &str) -> broadcast::Receiver<BookingEvent> {
        self.sender(room).subscribe()
    }

    /// Publishes to `room`. A room with no subscribers silently drops the
    /// event — there is nothing to persist or redeliver to.
    pub fn publish(&self, room: &str, event: BookingEvent) {
        let _ = self.sender(room).send(event);
    }

    /// Publishes the same event to both the owning user's room and the
    /// admin room.
    pub fn publish_booking_state_changed(
        &self,
        user_id: Id<User>,
        id: Id<Booking>,
        state: BookingState,
        previous_state: Option<BookingState>,
        provider_id: Option<Id<Provider>>,
        updated_at: DateTime<Utc>,
    ) {
        let event = BookingEvent::StateChanged {
            id,
            state,
            previous_state,
            provider_id,
            updated_at,
        };
        self.publish(&user_room(user_id), event.clone());
        self.publish(ADMIN_ROOM, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("user:1");

        bus.publish(
            "user:1",
            BookingEvent::StateChanged {
                id: Id::generate(),
                state: BookingState::Confirmed,
                previous_state: Some(BookingState::Searching),
                provider_id: None,
                updated_at: Utc::now(),
            },
        );

        let received = rx.recv().await.unwrap();
        match received {
            BookingEvent::StateChanged { state, .. } => {
                assert_eq!(state, BookingState::Confirmed)
            }
        }
    }

    #[tokio::test]
    async fn publish_fans_out_to_user_and_admin_rooms() {
        let bus = EventBus::new();
        let user_id: Id<User> = Id::generate();
        let mut user_rx = bus.subscribe(&user_room(user_id));
        let mut admin_rx = bus.subscribe(ADMIN_ROOM);

        bus.publish_booking_state_changed(
            user_id,
            Id::generate(),
            BookingState::Confirmed,
            Some(BookingState::Searching),
            None,
            Utc::now(),
        );

        assert!(user_rx.recv().await.is_ok());
        assert!(admin_rx.recv().await.is_ok());
    }

    #[tokio::test]
    async fn rooms_not_joined_receive_nothing() {
        let bus = EventBus::new();
        let mut other_rx = bus.subscribe("admin");

        bus.publish(
            "user:999",
            BookingEvent::StateChanged {
                id: Id::generate(),
                state: BookingState::Cancelled,
                previous_state: Some(BookingState::Confirmed),
                provider_id: None,
                updated_at: Utc::now(),
            },
        );

        assert!(other_rx.try_recv().is_err());
    }
}
