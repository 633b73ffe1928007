use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::provider::Provider;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetric {
    pub provider_id: Id<Provider>,
    pub date: NaiveDate,
    pub total: i64,
    pub successful: i64,
    pub cancelled: i64,
    pub rejected: i64,
    pub failed: i64,
    pub on_time: i64,
    pub late: i64,
    pub reliability_score: f64,
    pub on_time_rate: f64,
    pub total_revenue: i64,
    pub total_commission: i64,
}

impl ProviderMetric {
    pub fn empty(provider_id: Id<Provider>, date: NaiveDate) -> Self {
        Self {
            provider_id,
            date,
            total: 0,
            successful: 0,
            cancelled: 0,
            rejected: 0,
            failed: 0,
            on_time: 0,
            late: 0,
            reliability_score: 0.0,
            on_time_rate: 0.0,
            total_revenue: 0,
            total_commission: 0,
        }
    }
}
