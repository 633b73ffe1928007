use chrono::{DateTime, Utc};
use model::{Provider, TripType};
use utility::id::Id;

/// Constant placeholder for the proximity sub-score; no live GPS feed is
/// available to this system, so every surviving provider scores the same.
const PROXIMITY_PLACEHOLDER: f64 = 70.0;

const WEIGHT_RELIABILITY: f64 = 0.35;
const WEIGHT_RATING: f64 = 0.20;
const WEIGHT_COMPLETION: f64 = 0.20;
const WEIGHT_RECENCY: f64 = 0.10;
const WEIGHT_PROXIMITY: f64 = 0.15;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProvider {
    pub provider_id: Id<Provider>,
    pub reliability: f64,
    pub total: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn recency_score(last_active_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    let Some(last_active_at) = last_active_at else {
        return 0.0;
    };
    let hours = (now - last_active_at).num_seconds() as f64 / 3600.0;
    if hours < 1.0 {
        100.0
    } else if hours < 6.0 {
        80.0
    } else if hours < 24.0 {
        60.0
    } else if hours < 72.0 {
        30.0
    } else {
        10.0
    }
}

fn completion_score(provider: &Provider) -> f64 {
    if provider.total_rides == 0 {
        50.0
    } else {
        provider.successful_rides as f64 / provider.total_rides as f64 * 100.0
    }
}

/// `active=true`, reliability/rating thresholds, eligibility (not paused),
/// and exclusion list — everything SQL-expressible ahead of scoring.
pub fn hard_filter<'a>(
    providers: &'a [Provider],
    trip_type: TripType,
    exclude_ids: &[Id<Provider>],
    now: DateTime<Utc>,
) -> Vec<&'a Provider> {
    let (min_rel, min_rating) = trip_type.thresholds();
    providers
        .iter()
        .filter(|provider| {
            provider.active
                && provider.reliability >= min_rel
                && provider.rating >= min_rating
                && !exclude_ids.contains(&provider.id)
                && provider.is_eligible(now)
        })
        .collect()
}

fn score_provider(provider: &Provider, now: DateTime<Utc>) -> ScoredProvider {
    let reliability_score = provider.reliability * 100.0;
    let rating_score = (provider.rating - 1.0) / 4.0 * 100.0;
    let completion = completion_score(provider);
    let recency = recency_score(provider.last_active_at, now);

    let total = WEIGHT_RELIABILITY * reliability_score
        + WEIGHT_RATING * rating_score
        + WEIGHT_COMPLETION * completion
        + WEIGHT_RECENCY * recency
        + WEIGHT_PROXIMITY * PROXIMITY_PLACEHOLDER;

    ScoredProvider {
        provider_id: provider.id,
        reliability: provider.reliability,
        total: round2(total),
    }
}

fn ranked(
    providers: &[Provider],
    trip_type: TripType,
    exclude_ids: &[Id<Provider>],
    now: DateTime<Utc>,
) -> Vec<ScoredProvider> {
    let mut scored: Vec<ScoredProvider> = hard_filter(providers, trip_type, exclude_ids, now)
        .into_iter()
        .map(|provider| score_provider(provider, now))
        .collect();

    // descending by total, tie-broken lexicographically on provider id for determinism.
    scored.sort_by(|a, b| {
        b.total
            .partial_cmp(&a.total)
            .unwrap()
            .then_with(|| a.provider_id.raw().to_string().cmp(&b.provider_id.raw().to_string()))
    });
    scored
}

/// Best surviving provider, or `None` if the hard filter eliminates all.
pub fn find_best(
    providers: &[Provider],
    exclude_ids: &[Id<Provider>],
    trip_type: TripType,
    now: DateTime<Utc>,
) -> Option<ScoredProvider> {
    ranked(providers, trip_type, exclude_ids, now)
        .into_iter()
        .next()
}

/// Top `n` surviving providers, ranked best-first.
pub fn find_top_n(
    providers: &[Provider],
    n: usize,
    exclude_ids: &[Id<Provider>],
    trip_type: TripType,
    now: DateTime<Utc>,
) -> Vec<ScoredProvider> {
    ranked(providers, trip_type, exclude_ids, now)
        .into_iter()
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{ProviderType, VehicleMetadata};

    fn provider(reliability: f64, rating: f64, active: bool) -> Provider {
        Provider {
            id: Id::generate(),
            name: "test".into(),
            phone: "+10000000000".into(),
            provider_type: ProviderType::Individual,
            vehicle: VehicleMetadata {
                make: None,
                model: None,
                plate_number: None,
                color: None,
            },
            commission_rate: Provider::DEFAULT_COMMISSION_RATE,
            active,
            paused_until: None,
            pause_reason: None,
            reliability,
            rating,
            total_rides: 10,
            successful_rides: 9,
            last_active_at: Some(Utc::now()),
        }
    }

    #[test]
    fn high_reliability_filters_out_mediocre_providers() {
        let providers = vec![provider(0.95, 4.5, true), provider(0.80, 4.5, true)];
        let best = find_best(&providers, &[], TripType::HighReliability, Utc::now());
        assert_eq!(best.unwrap().provider_id, providers[0].id);
    }

    #[test]
    fn inactive_providers_are_excluded() {
        let providers = vec![provider(0.95, 4.5, false)];
        assert!(find_best(&providers, &[], TripType::Standard, Utc::now()).is_none());
    }

    #[test]
    fn excluded_ids_are_skipped() {
        let providers = vec![provider(0.95, 4.5, true)];
        let excluded = vec![providers[0].id];
        assert!(find_best(&providers, &excluded, TripType::Standard, Utc::now()).is_none());
    }

    #[test]
    fn find_top_n_is_sorted_descending() {
        let providers = vec![
            provider(0.95, 4.9, true),
            provider(0.95, 3.5, true),
            provider(0.95, 4.0, true),
        ];
        let top = find_top_n(&providers, 3, &[], TripType::Standard, Utc::now());
        assert!(top[0].total >= top[1].total);
        assert!(top[1].total >= top[2].total);
    }
}
