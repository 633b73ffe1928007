use std::time::Duration;

use crate::store::{EphemeralStore, Result};

/// OTPs are single-use and short-lived; 5 minutes mirrors the quote cache's
/// TTL, there being no other signal in scope for how long a code should live.
pub const OTP_TTL: Duration = Duration::from_secs(300);

fn key(phone: &str) -> String {
    format!("otp:{phone}")
}

pub async fn store(store: &dyn EphemeralStore, phone: &str, code: &str) -> Result<()> {
    store.set(&key(phone), code, OTP_TTL).await
}

/// Verifies `code` against the stored OTP for `phone`. On success the code
/// is consumed (deleted) so it cannot be replayed.
pub async fn verify(store: &dyn EphemeralStore, phone: &str, code: &str) -> Result<bool> {
    let Some(stored) = store.get(&key(phone)).await? else {
        return Ok(false);
    };
    if stored != code {
        return Ok(false);
    }
    store.del(&key(phone)).await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    #[tokio::test]
    async fn correct_otp_verifies_once() {
        let cache = InMemoryStore::new();
        store(&cache, "+15551234", "123456").await.unwrap();

        assert!(verify(&cache, "+15551234", "123456").await.unwrap());
        // consumed on success: a second attempt with the same code fails.
        assert!(!verify(&cache, "+15551234", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn wrong_otp_does_not_verify() {
        let cache = InMemoryStore::new();
        store(&cache, "+15551234", "123456").await.unwrap();
        assert!(!verify(&cache, "+15551234", "000000").await.unwrap());
    }
}
