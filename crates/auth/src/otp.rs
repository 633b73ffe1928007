use cache::EphemeralStore;
use rand::Rng;

/// Generates a 6-digit numeric code, zero-padded.
pub fn generate_code() -> String {
    let code: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

/// Issues a fresh OTP for `phone` and stores it in the ephemeral cache. There
/// is no SMS gateway in scope; the code is logged at info level the way a
/// provider integration would be wired in later.
pub async fn send(store: &dyn EphemeralStore, phone: &str) -> cache::Result<String> {
    let code = generate_code();
    cache::otp::store(store, phone, &code).await?;
    tracing::info!(phone, code, "issued otp");
    Ok(code)
}

pub async fn verify(store: &dyn EphemeralStore, phone: &str, code: &str) -> cache::Result<bool> {
    cache::otp::verify(store, phone, code).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use cache::InMemoryStore;

    #[test]
    fn generated_codes_are_six_digits() {
        for _ in 0..20 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[tokio::test]
    async fn a_sent_code_verifies_once() {
        let store = InMemoryStore::new();
        let code = send(&store, "+15551234").await.unwrap();
        assert!(verify(&store, "+15551234", &code).await.unwrap());
        assert!(!verify(&store, "+15551234", &code).await.unwrap());
    }
}
