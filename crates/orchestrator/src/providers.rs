use chrono::{Duration, Utc};
use database::queries::provider;
use model::{Provider, ProviderMetric};
use utility::id::Id;

use crate::error::AppError;
use crate::services::Services;

/// Wraps the provider table with admin-write constraints: `update` can't
/// touch id/createdAt/totalRides/successfulRides because those simply
/// aren't accepted as inputs by `database::queries::provider::update`.
pub async fn create(services: &Services, mut provider: Provider) -> Result<Provider, AppError> {
    provider.id = Id::generate();
    provider.reliability = Provider::DEFAULT_RELIABILITY;
    provider.rating = Provider::DEFAULT_RATING;
    provider.total_rides = 0;
    provider.successful_rides = 0;
    provider.last_active_at = None;
    let created = self::provider::create(services.db.pool(), &provider).await?;
    Ok(created)
}

pub async fn update(services: &Services, mut provider: Provider) -> Result<Provider, AppError> {
    let existing = self::provider::get(services.db.pool(), provider.id).await?;
    provider.total_rides = existing.total_rides;
    provider.successful_rides = existing.successful_rides;
    provider.reliability = existing.reliability;
    let updated = self::provider::update(services.db.pool(), &provider).await?;
    Ok(updated)
}

pub async fn get(services: &Services, id: Id<Provider>) -> Result<Provider, AppError> {
    Ok(self::provider::get(services.db.pool(), id).await?)
}

pub async fn list(
    services: &Services,
    active_only: bool,
    page: i64,
    limit: i64,
) -> Result<Vec<Provider>, AppError> {
    let limit = limit.clamp(1, 100);
    Ok(self::provider::list(services.db.pool(), active_only, page, limit).await?)
}

/// Pauses a provider for `duration_hours`.
pub async fn pause(
    services: &Services,
    id: Id<Provider>,
    reason: &str,
    duration_hours: i64,
) -> Result<Provider, AppError> {
    let paused_until = Utc::now() + Duration::hours(duration_hours);
    Ok(self::provider::pause(services.db.pool(), id, reason, paused_until).await?)
}

pub async fn resume(services: &Services, id: Id<Provider>) -> Result<Provider, AppError> {
    Ok(self::provider::resume(services.db.pool(), id).await?)
}

pub async fn get_metrics(
    services: &Services,
    id: Id<Provider>,
    days_back: i64,
) -> Result<Vec<ProviderMetric>, AppError> {
    let since = (Utc::now() - Duration::days(days_back)).date_naive();
    Ok(database::queries::metric::list_recent(services.db.pool(), id, since).await?)
}
