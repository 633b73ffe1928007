pub mod actor;
pub mod assignment;
pub mod bookings;
pub mod config;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod quotes;
pub mod recovery;
pub mod services;
pub mod sweepers;

pub use config::Config;
pub use error::AppError;
pub use services::Services;
