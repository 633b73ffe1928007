pub mod otp;
pub mod quote;
pub mod store;

pub use store::{CacheError, EphemeralCache, EphemeralStore, InMemoryStore, RedisStore, Result};
