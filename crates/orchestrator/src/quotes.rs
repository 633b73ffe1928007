use chrono::Utc;
use model::{
    Coordinates, Quote, QuoteCacheItem, QuoteSession, QuoteTag, TransportMode, TripType,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::Services;

const BEST_SCORE_THRESHOLD: f64 = 90.0;
/// Number of providers the scoring engine is asked for per quote request.
const TOP_PROVIDERS: usize = 5;

pub struct QuoteResult {
    pub session_id: Uuid,
    pub quotes: Vec<Quote>,
}

/// Prices every tier/line for `mode`, tags the cheapest/best/premium
/// options, assigns providers round-robin across the top-scored pool for
/// non-METRO modes, and caches both the session and each item for 300s.
pub async fn get_quotes(
    services: &Services,
    mode: TransportMode,
    pickup: Option<Coordinates>,
    drop: Option<Coordinates>,
) -> Result<QuoteResult, AppError> {
    let now = Utc::now();
    let hour = now.format("%H").to_string().parse::<u32>().unwrap_or(12);

    let (mut quotes, first_tier_is_best) = if mode == TransportMode::Metro {
        let quotes = fare::metro_breakdown(pickup, drop)
            .into_iter()
            .map(|breakdown| Quote {
                quote_id: Uuid::new_v4(),
                transport_mode: mode,
                tier: breakdown.line.to_string(),
                provider_id: None,
                fare_paise: breakdown.fare,
                fare_rupees: breakdown.fare as f64 / 100.0,
                eta_minutes: breakdown.duration_minutes as i32,
                tag: None,
            })
            .collect::<Vec<_>>();
        (quotes, false)
    } else {
        let providers = database::queries::provider::all(services.db.pool()).await?;
        let scored = scoring::find_top_n(
            &providers,
            TOP_PROVIDERS,
            &[],
            TripType::Standard,
            now,
        );
        if scored.is_empty() {
            return Err(AppError::NoProvidersAvailable);
        }
        let first_tier_is_best = scored[0].total >= BEST_SCORE_THRESHOLD;

        let quotes = fare::tier_breakdowns(mode, pickup, drop, hour, None)
            .into_iter()
            .enumerate()
            .map(|(index, breakdown)| {
                let assigned = &scored[index % scored.len()];
                Quote {
                    quote_id: Uuid::new_v4(),
                    transport_mode: mode,
                    tier: breakdown.tier.to_string(),
                    provider_id: Some(assigned.provider_id),
                    fare_paise: breakdown.total_fare,
                    fare_rupees: breakdown.total_fare as f64 / 100.0,
                    eta_minutes: fare::duration_minutes(
                        fare::distance_km(pickup, drop),
                        mode,
                    ) as i32,
                    tag: None,
                }
            })
            .collect::<Vec<_>>();
        (quotes, first_tier_is_best)
    };

    tag_tiers(&mut quotes, first_tier_is_best);

    let session_id = Uuid::new_v4();
    let session = QuoteSession {
        session_id,
        quotes: quotes.clone(),
    };
    cache::quote::store_session(&services.cache, &session).await?;
    for quote in &quotes {
        let item = QuoteCacheItem {
            provider_id: quote.provider_id,
            fare_paise: quote.fare_paise,
            transport_mode: quote.transport_mode,
        };
        cache::quote::store_item(&services.cache, quote.quote_id, &item).await?;
    }

    Ok(QuoteResult { session_id, quotes })
}

/// Tags the first tier (list order) CHEAPEST (upgraded to BEST if its
/// assigned provider scored at or above [`BEST_SCORE_THRESHOLD`]), and the
/// last tier PREMIUM if there's more than one. Every other tier is left
/// untagged.
fn tag_tiers(quotes: &mut [Quote], first_tier_is_best: bool) {
    if quotes.is_empty() {
        return;
    }
    quotes[0].tag = Some(if first_tier_is_best {
        QuoteTag::Best
    } else {
        QuoteTag::Cheapest
    });
    if quotes.len() > 1 {
        let last = quotes.len() - 1;
        quotes[last].tag = Some(QuoteTag::Premium);
    }
}

/// Looks up a previously quoted item for `createBooking`'s fare-resolution
/// order.
pub async fn lookup_item(
    services: &Services,
    quote_id: Uuid,
) -> Result<Option<QuoteCacheItem>, AppError> {
    Ok(cache::quote::get_item(&services.cache, quote_id).await?)
}
