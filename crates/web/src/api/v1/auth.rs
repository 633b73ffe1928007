use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use model::{User, UserIdentity};
use orchestrator::{AppError, Services};
use serde::{Deserialize, Serialize};
use utility::id::Id;

use crate::common::{ApiError, Ok200, RouteResult};
use crate::WebState;

pub(crate) fn routes(state: WebState) -> Router {
    Router::new()
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/google", get(google_redirect))
        .route("/google/callback", get(google_callback))
        .with_state(state)
}

#[derive(Deserialize)]
struct SendOtpBody {
    phone: String,
}

#[derive(Serialize)]
struct SendOtpResponse {
    sent: bool,
}

async fn send_otp(
    State(services): State<Arc<Services>>,
    Json(body): Json<SendOtpBody>,
) -> RouteResult<SendOtpResponse> {
    if body.phone.trim().is_empty() {
        return Err(AppError::Validation("phone is required".to_string()).into());
    }
    auth::otp::send(&services.cache, &body.phone).await?;
    Ok(Ok200(SendOtpResponse { sent: true }))
}

#[derive(Deserialize)]
struct VerifyOtpBody {
    phone: String,
    code: String,
}

#[derive(Serialize)]
struct VerifyOtpResponse {
    token: String,
    user: User,
}

/// Verifies the OTP, then gets-or-creates the user by phone — the only
/// identity fact this login path has — and issues a bearer JWT.
async fn verify_otp(
    State(services): State<Arc<Services>>,
    Json(body): Json<VerifyOtpBody>,
) -> RouteResult<VerifyOtpResponse> {
    let verified = auth::otp::verify(&services.cache, &body.phone, &body.code).await?;
    if !verified {
        return Err(AppError::Validation("invalid or expired code".to_string()).into());
    }

    let user = get_or_create_user(&services, &body.phone).await?;
    let token = issue_token(&services, &user)?;
    Ok(Ok200(VerifyOtpResponse { token, user }))
}

async fn get_or_create_user(services: &Services, phone: &str) -> Result<User, ApiError> {
    match database::queries::user::get_by_phone(services.db.pool(), phone).await {
        Ok(user) => {
            let touched =
                database::queries::user::touch_last_login(services.db.pool(), user.id, Utc::now())
                    .await?;
            Ok(touched)
        }
        Err(database::DatabaseError::NotFound) => {
            let user = User {
                id: Id::generate(),
                phone: phone.to_string(),
                name: None,
                email: None,
                referral_code: generate_referral_code(),
                created_at: Utc::now(),
                last_login_at: Some(Utc::now()),
            };
            Ok(database::queries::user::create(services.db.pool(), &user).await?)
        }
        Err(other) => Err(other.into()),
    }
}

fn generate_referral_code() -> String {
    format!(
        "REF{}",
        uuid::Uuid::new_v4().simple().to_string()[..8].to_uppercase()
    )
}

fn issue_token(services: &Services, user: &User) -> Result<String, ApiError> {
    let identity = UserIdentity {
        user_id: user.id,
        phone: user.phone.clone(),
        is_admin: false,
    };
    let claims = auth::Claims::new(&identity, services.config.jwt_ttl_seconds);
    Ok(claims.encode(&services.config.jwt_secret).map_err(AppError::from)?)
}

/// Redirects the browser straight to Google's consent screen. Out of this
/// system's scope in depth (no scopes beyond basic profile, no refresh
/// tokens, no account-linking flow) but wired up end to end per the login
/// surface's contract.
async fn google_redirect(State(services): State<Arc<Services>>) -> Result<Redirect, ApiError> {
    if !services.config.oauth_configured() {
        return Err(AppError::Validation("Google OAuth is not configured".to_string()).into());
    }
    let client_id = services.config.oauth_client_id.as_deref().unwrap_or_default();
    let redirect_uri = services.config.google_redirect_uri();
    let url = format!(
        "https://accounts.google.com/o/oauth2/v2/auth?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile",
        urlencode(client_id),
        urlencode(&redirect_uri),
    );
    Ok(Redirect::temporary(&url))
}

#[derive(Deserialize)]
struct GoogleCallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct GoogleUserInfo {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

/// Exchanges the authorization code for an access token, fetches the
/// profile, and gets-or-creates a user keyed on a synthetic
/// `google:<sub>` phone placeholder — Google never hands back a phone
/// number, and real phone-linking for OAuth accounts is out of scope here.
async fn google_callback(
    State(services): State<Arc<Services>>,
    Query(query): Query<GoogleCallbackQuery>,
) -> impl IntoResponse {
    let frontend_url = services.config.frontend_url.clone();

    if let Some(error) = query.error {
        return Redirect::temporary(&format!("{frontend_url}?auth_error={}", urlencode(&error)));
    }
    let Some(code) = query.code else {
        return Redirect::temporary(&format!(
            "{frontend_url}?auth_error={}",
            urlencode("missing authorization code")
        ));
    };

    match complete_google_login(&services, &code).await {
        Ok(token) => Redirect::temporary(&format!("{frontend_url}?token={token}")),
        Err(why) => Redirect::temporary(&format!(
            "{frontend_url}?auth_error={}",
            urlencode(&why.to_string())
        )),
    }
}

async fn complete_google_login(services: &Services, code: &str) -> Result<String, AppError> {
    let client_id = services
        .config
        .oauth_client_id
        .clone()
        .ok_or_else(|| AppError::Validation("Google OAuth is not configured".to_string()))?;
    let client_secret = services
        .config
        .oauth_client_secret
        .clone()
        .ok_or_else(|| AppError::Validation("Google OAuth is not configured".to_string()))?;

    let http = reqwest::Client::new();
    let token_response: GoogleTokenResponse = http
        .post("https://oauth2.googleapis.com/token")
        .form(&[
            ("code", code),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("redirect_uri", services.config.google_redirect_uri().as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await
        .map_err(|why| AppError::Transient(why.to_string()))?
        .error_for_status()
        .map_err(|why| AppError::Transient(why.to_string()))?
        .json()
        .await
        .map_err(|why| AppError::Transient(why.to_string()))?;

    let profile: GoogleUserInfo = http
        .get("https://www.googleapis.com/oauth2/v3/userinfo")
        .bearer_auth(&token_response.access_token)
        .send()
        .await
        .map_err(|why| AppError::Transient(why.to_string()))?
        .error_for_status()
        .map_err(|why| AppError::Transient(why.to_string()))?
        .json()
        .await
        .map_err(|why| AppError::Transient(why.to_string()))?;

    let synthetic_phone = format!("google:{}", profile.sub);
    let user = match database::queries::user::get_by_phone(services.db.pool(), &synthetic_phone)
        .await
    {
        Ok(user) => {
            database::queries::user::touch_last_login(services.db.pool(), user.id, Utc::now())
                .await?
        }
        Err(database::DatabaseError::NotFound) => {
            let user = User {
                id: Id::generate(),
                phone: synthetic_phone,
                name: profile.name,
                email: profile.email,
                referral_code: generate_referral_code(),
                created_at: Utc::now(),
                last_login_at: Some(Utc::now()),
            };
            database::queries::user::create(services.db.pool(), &user).await?
        }
        Err(other) => return Err(other.into()),
    };

    let identity = UserIdentity {
        user_id: user.id,
        phone: user.phone.clone(),
        is_admin: false,
    };
    let claims = auth::Claims::new(&identity, services.config.jwt_ttl_seconds);
    claims.encode(&services.config.jwt_secret).map_err(AppError::from)
}

fn urlencode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
