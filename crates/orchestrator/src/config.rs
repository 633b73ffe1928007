use std::env;

use database::DatabaseConnectionInfo;

/// Process configuration, read once at startup. Missing required variables
/// panic immediately rather than surfacing as a runtime error later.
pub struct Config {
    pub database: DatabaseConnectionInfo,
    pub ephemeral_kv_url: Option<String>,
    pub fallback_allowed: bool,
    pub jwt_secret: String,
    pub jwt_ttl_seconds: i64,
    pub cors_origin: String,
    pub frontend_url: String,
    pub oauth_client_id: Option<String>,
    pub oauth_client_secret: Option<String>,
    /// This process's own externally-reachable base URL, used to build the
    /// Google OAuth `redirect_uri` (the URL Google calls back into).
    pub public_url: String,
    pub node_env: String,
    pub disable_booking_simulation: bool,
    pub port: u16,
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|value| value == "true" || value == "1")
        .unwrap_or(false)
}

impl Config {
    pub fn from_env() -> Self {
        let database = DatabaseConnectionInfo::from_env()
            .expect("expected database connection info in env.");

        Self {
            database,
            ephemeral_kv_url: env::var("EPHEMERAL_KV_URL").ok(),
            fallback_allowed: env_flag("FALLBACK_ALLOWED"),
            jwt_secret: env::var("JWT_SECRET").expect("expected JWT_SECRET in env."),
            jwt_ttl_seconds: env::var("JWT_TTL_SECONDS")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(86_400),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or_else(|_| "*".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            oauth_client_id: env::var("OAUTH_CLIENT_ID").ok(),
            oauth_client_secret: env::var("OAUTH_CLIENT_SECRET").ok(),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            node_env: env::var("NODE_ENV").unwrap_or_else(|_| "development".to_string()),
            disable_booking_simulation: env_flag("DISABLE_BOOKING_SIMULATION"),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(8080),
        }
    }

    pub fn database_connection_info(&self) -> DatabaseConnectionInfo {
        self.database.clone()
    }

    pub fn oauth_configured(&self) -> bool {
        self.oauth_client_id.is_some() && self.oauth_client_secret.is_some()
    }

    pub fn google_redirect_uri(&self) -> String {
        format!("{}/api/v1/auth/google/callback", self.public_url)
    }

    /// The dev booking simulator only runs outside production, and only
    /// when not explicitly disabled.
    pub fn simulation_enabled(&self) -> bool {
        self.node_env != "production" && !self.disable_booking_simulation
    }
}
