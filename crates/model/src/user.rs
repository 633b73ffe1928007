use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utility::id::Id;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Id<User>,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub referral_code: String,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}
