use chrono::{DateTime, Utc};
use model::User;
use sqlx::{postgres::PgRow, Executor, FromRow, Postgres, Row};
use utility::id::Id;

use crate::{convert_error, Result};

#[derive(Debug, Clone)]
struct UserRow {
    id: uuid::Uuid,
    phone: String,
    name: Option<String>,
    email: Option<String>,
    referral_code: String,
    created_at: DateTime<Utc>,
    last_login_at: Option<DateTime<Utc>>,
}

impl FromRow<'_, PgRow> for UserRow {
    fn from_row(row: &PgRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            phone: row.try_get("phone")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            referral_code: row.try_get("referral_code")?,
            created_at: row.try_get("created_at")?,
            last_login_at: row.try_get("last_login_at")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: Id::new(row.id),
            phone: row.phone,
            name: row.name,
            email: row.email,
            referral_code: row.referral_code,
            created_at: row.created_at,
            last_login_at: row.last_login_at,
        }
    }
}

pub async fn create<'c, E>(executor: E, user: &User) -> Result<User>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as(
        "
        INSERT INTO users (id, phone, name, email, referral_code, created_at, last_login_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *;
        ",
    )
    .bind(user.id.raw())
    .bind(&user.phone)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.referral_code)
    .bind(user.created_at)
    .bind(user.last_login_at)
    .fetch_one(executor)
    .await
    .map_err(convert_error)
    .map(UserRow::into)
}

pub async fn get_by_id<'c, E>(executor: E, id: Id<User>) -> Result<User>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM users WHERE id = $1;")
        .bind(id.raw())
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(UserRow::into)
}

pub async fn get_by_phone<'c, E>(executor: E, phone: &str) -> Result<User>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM users WHERE phone = $1;")
        .bind(phone)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(UserRow::into)
}

pub async fn touch_last_login<'c, E>(executor: E, id: Id<User>, now: DateTime<Utc>) -> Result<User>
where
    E: Executor<'c, Database = Postgres>,
{
    sqlx::query_as("UPDATE users SET last_login_at = $2 WHERE id = $1 RETURNING *;")
        .bind(id.raw())
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(convert_error)
        .map(UserRow::into)
}
