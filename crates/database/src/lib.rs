use std::{env, fmt};

use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

pub mod queries;

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug)]
pub enum DatabaseError {
    NotFound,
    /// A unique constraint was violated (e.g. duplicate phone on create).
    Conflict(String),
    /// An optimistic `(id, expectedState)` update matched zero rows: either
    /// the row doesn't exist or it has already moved past the expected state.
    StaleState,
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound => write!(f, "not found"),
            DatabaseError::Conflict(message) => write!(f, "conflict: {message}"),
            DatabaseError::StaleState => write!(f, "stale state"),
            DatabaseError::Other(why) => write!(f, "{why}"),
        }
    }
}

impl std::error::Error for DatabaseError {}

pub(crate) fn convert_error(why: sqlx::Error) -> DatabaseError {
    match why {
        sqlx::Error::RowNotFound => DatabaseError::NotFound,
        sqlx::Error::Database(ref db_err) if db_err.code().as_deref() == Some("23505") => {
            DatabaseError::Conflict(db_err.message().to_string())
        }
        other => DatabaseError::Other(Box::new(other)),
    }
}

#[derive(Clone)]
pub struct DatabaseConnectionInfo {
    pub username: String,
    pub password: String,
    pub hostname: String,
    pub port: u16,
    pub database: String,
}

impl DatabaseConnectionInfo {
    pub fn from_env() -> Option<Self> {
        let username = env::var("DATABASE_USER").ok()?;
        let password = env::var("DATABASE_PASSWORD").ok()?;
        let hostname = env::var("DATABASE_HOST").ok()?;
        let port: u16 = env::var("DATABASE_PORT").ok()?.parse().ok()?;
        let database = env::var("DATABASE_NAME").ok()?;
        Some(Self {
            username,
            password,
            hostname,
            port,
            database,
        })
    }

    pub(self) fn postgres_url(self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.hostname, self.port, self.database
        )
    }
}

#[derive(Clone)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    pub async fn connect(database_connection_info: DatabaseConnectionInfo) -> Result<Self> {
        let url = database_connection_info.postgres_url();
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .map_err(convert_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|why| DatabaseError::Other(Box::new(why)))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>> {
        self.pool.begin().await.map_err(convert_error)
    }
}
