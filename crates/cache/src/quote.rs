use std::time::Duration;

use model::{QuoteCacheItem, QuoteSession};
use uuid::Uuid;

use crate::store::{CacheError, EphemeralStore, Result};

/// Quote cache entries live for 5 minutes.
pub const QUOTE_TTL: Duration = Duration::from_secs(300);

fn session_key(session_id: Uuid) -> String {
    format!("quote:{session_id}")
}

fn item_key(quote_id: Uuid) -> String {
    format!("quote_item:{quote_id}")
}

/// Stores the full quote response under `quote:<sessionId>` for audit/replay.
pub async fn store_session(store: &dyn EphemeralStore, session: &QuoteSession) -> Result<()> {
    let payload = serde_json::to_string(session)
        .map_err(|why| CacheError::Backend(format!("serialize quote session: {why}")))?;
    store
        .set(&session_key(session.session_id), &payload, QUOTE_TTL)
        .await
}

/// Stores a single quote's cache item under `quote_item:<quoteId>`.
pub async fn store_item(
    store: &dyn EphemeralStore,
    quote_id: Uuid,
    item: &QuoteCacheItem,
) -> Result<()> {
    let payload = serde_json::to_string(item)
        .map_err(|why| CacheError::Backend(format!("serialize quote item: {why}")))?;
    store.set(&item_key(quote_id), &payload, QUOTE_TTL).await
}

/// Looks up a previously cached quote item; `None` on miss or TTL expiry.
pub async fn get_item(
    store: &dyn EphemeralStore,
    quote_id: Uuid,
) -> Result<Option<QuoteCacheItem>> {
    let Some(payload) = store.get(&item_key(quote_id)).await? else {
        return Ok(None);
    };
    serde_json::from_str(&payload)
        .map(Some)
        .map_err(|why| CacheError::Backend(format!("deserialize quote item: {why}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use model::TransportMode;

    // Write then read within TTL round-trips the same value.
    #[tokio::test]
    async fn quote_item_round_trips() {
        let store = InMemoryStore::new();
        let quote_id = Uuid::new_v4();
        let item = QuoteCacheItem {
            provider_id: None,
            fare_paise: 21500,
            transport_mode: TransportMode::Cab,
        };

        store_item(&store, quote_id, &item).await.unwrap();
        let fetched = get_item(&store, quote_id).await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn missing_quote_item_is_a_cache_miss() {
        let store = InMemoryStore::new();
        assert!(get_item(&store, Uuid::new_v4()).await.unwrap().is_none());
    }
}
