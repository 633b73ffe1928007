use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use model::{User, UserIdentity};
use serde::{Deserialize, Serialize};
use utility::id::Id;

pub mod otp;

#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidToken(String),
    Signing(String),
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingCredentials => write!(f, "missing bearer credentials"),
            AuthError::InvalidToken(why) => write!(f, "invalid token: {why}"),
            AuthError::Signing(why) => write!(f, "failed to sign token: {why}"),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Claims embedded in bearer JWTs issued after OTP/OAuth login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: uuid::Uuid,
    pub phone: String,
    pub is_admin: bool,
    pub exp: usize,
    pub iat: usize,
}

impl Claims {
    pub fn new(identity: &UserIdentity, ttl_seconds: i64) -> Self {
        let now = Utc::now();
        let expires_at = now + Duration::seconds(ttl_seconds);
        Self {
            sub: identity.user_id.raw(),
            phone: identity.phone.clone(),
            is_admin: identity.is_admin,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        }
    }

    pub fn encode(&self, secret: &str) -> Result<String, AuthError> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|why| AuthError::Signing(why.to_string()))
    }

    pub fn decode(token: &str, secret: &str) -> Result<Self, AuthError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|why| AuthError::InvalidToken(why.to_string()))
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: Id::<User>::new(self.sub),
            phone: self.phone.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Implemented by whatever `axum::State` the host crate uses, so this crate
/// never needs to know the concrete app state type.
pub trait AuthState {
    fn jwt_secret(&self) -> &str;
}

impl<T: AuthState + ?Sized> AuthState for std::sync::Arc<T> {
    fn jwt_secret(&self) -> &str {
        (**self).jwt_secret()
    }
}

/// Extractor pulling a verified [`UserIdentity`] out of the `Authorization` header.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: AuthState + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AuthError::MissingCredentials)?;

        let claims = Claims::decode(bearer.token(), state.jwt_secret())?;
        Ok(AuthUser(claims.identity()))
    }
}

/// Same as [`AuthUser`], but rejects non-admin callers. Used on `/admin/*` routes.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: AuthState + Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if !identity.is_admin {
            return Err((StatusCode::FORBIDDEN, "admin privileges required").into_response());
        }

        Ok(AdminUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> UserIdentity {
        UserIdentity {
            user_id: Id::generate(),
            phone: "+15551234".to_string(),
            is_admin: false,
        }
    }

    #[test]
    fn a_token_round_trips_through_encode_and_decode() {
        let claims = Claims::new(&identity(), 3600);
        let token = claims.encode("test-secret").unwrap();
        let decoded = Claims::decode(&token, "test-secret").unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.phone, claims.phone);
    }

    #[test]
    fn decoding_with_the_wrong_secret_fails() {
        let claims = Claims::new(&identity(), 3600);
        let token = claims.encode("test-secret").unwrap();
        assert!(Claims::decode(&token, "wrong-secret").is_err());
    }

    #[test]
    fn an_expired_token_fails_to_decode() {
        let claims = Claims::new(&identity(), -1);
        let token = claims.encode("test-secret").unwrap();
        assert!(Claims::decode(&token, "test-secret").is_err());
    }
}
