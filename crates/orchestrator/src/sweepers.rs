use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::actor::{self, RunRecovery};
use crate::services::Services;

const TIMEOUT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
const PAUSE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Finds `SEARCHING` bookings past their `timeoutAt` and hands each to its
/// per-booking actor for recovery. A panic in one tick is swallowed and
/// logged rather than taking the sweeper down, mirroring the supervised
/// shape used for the booking actors themselves.
pub fn spawn_timeout_sweeper(services: Arc<Services>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TIMEOUT_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let outcome = AssertUnwindSafe(sweep_timeouts(&services))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(why)) => tracing::warn!(error = %why, "timeout sweep failed"),
                Err(_) => tracing::error!("timeout sweep panicked"),
            }
        }
    });
}

async fn sweep_timeouts(services: &Arc<Services>) -> Result<(), database::DatabaseError> {
    let timed_out =
        database::queries::booking::list_searching_timed_out(services.db.pool(), chrono::Utc::now())
            .await?;
    for booking in timed_out {
        let _ = actor::actor_for(services, booking.id)
            .tell(RunRecovery {
                booking_id: booking.id,
            })
            .await;
    }
    Ok(())
}

/// Clears `pausedUntil` on any provider whose pause has expired, so the next
/// scoring pass sees them as eligible again.
pub fn spawn_pause_sweeper(services: Arc<Services>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PAUSE_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let outcome = AssertUnwindSafe(sweep_expired_pauses(&services))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(resumed)) if !resumed.is_empty() => {
                    tracing::info!(count = resumed.len(), "resumed providers past their pause")
                }
                Ok(Ok(_)) => {}
                Ok(Err(why)) => tracing::warn!(error = %why, "pause sweep failed"),
                Err(_) => tracing::error!("pause sweep panicked"),
            }
        }
    });
}

async fn sweep_expired_pauses(
    services: &Arc<Services>,
) -> Result<Vec<utility::id::Id<model::Provider>>, database::DatabaseError> {
    database::queries::provider::resume_expired_pauses(services.db.pool(), chrono::Utc::now()).await
}
