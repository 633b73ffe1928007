use std::sync::Arc;

use actors::actor::Actor;
use actors::actor_ref::ActorRef;
use actors::handler::{Handler, Message};
use async_trait::async_trait;
use model::Booking;
use utility::id::Id;

use crate::services::Services;
use crate::{assignment, recovery};

/// One of these runs per booking that currently needs attention, ensuring
/// at most one assignment or recovery task is in flight for it at a time —
/// layered on top of the database's own optimistic-concurrency guard.
pub struct BookingActor {
    pub(crate) services: Arc<Services>,
}

impl Actor for BookingActor {}

#[derive(Clone)]
pub struct RunAssignment {
    pub booking_id: Id<Booking>,
}

impl Message for RunAssignment {
    type Response = ();
}

#[derive(Clone)]
pub struct RunRecovery {
    pub booking_id: Id<Booking>,
}

impl Message for RunRecovery {
    type Response = ();
}

#[async_trait]
impl Handler<RunAssignment> for BookingActor {
    async fn handle(&mut self, message: RunAssignment) {
        if let Err(why) = assignment::run(&self.services, message.booking_id).await {
            tracing::warn!(booking_id = %message.booking_id, error = %why, "assignment workflow failed");
        }
    }
}

#[async_trait]
impl Handler<RunRecovery> for BookingActor {
    async fn handle(&mut self, message: RunRecovery) {
        if let Err(why) = recovery::run(&self.services, message.booking_id).await {
            tracing::warn!(booking_id = %message.booking_id, error = %why, "recovery pipeline failed");
        }
    }
}

/// Looks up or spawns the actor responsible for `booking_id`.
pub fn actor_for(services: &Arc<Services>, booking_id: Id<Booking>) -> ActorRef<BookingActor> {
    services
        .booking_actors
        .entry(booking_id)
        .or_insert_with(|| {
            let services = services.clone();
            actors::run(move || BookingActor {
                services: services.clone(),
            })
        })
        .clone()
}
