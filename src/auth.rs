use std::sync::Arc;

use axum::extract::{FromRequestParts, State};
use axum::headers::authorization::{Authorization, Bearer};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};
use axum::{Json, TypedHeader};
use hyper::{header, StatusCode};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;
use crate::store::Store;
use crate::types::{Admin, AdminProfile};

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub enum AuthError {
    #[schema(example = "Incorrect username or password")]
    Unauthorized(String),
    Internal(String),
}

impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = %err, "database failure during authentication");
        AuthError::Internal("database failure".to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthorized(_) => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Bearer")],
                Json(self),
            )
                .into_response(),
            AuthError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
            }
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub admin_id: i32,
    pub exp: usize,
}

pub fn create_access_token(admin: &Admin, config: &Config) -> Result<String, AuthError> {
    let expires_at = chrono::Utc::now() + chrono::Duration::minutes(config.token_expiry_minutes);
    let claims = Claims {
        sub: admin.username.clone(),
        admin_id: admin.id,
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret_key.as_bytes()),
    )
    .map_err(|err| {
        tracing::error!(error = %err, "failed to sign access token");
        AuthError::Internal("failed to sign access token".to_string())
    })
}

pub fn verify_token(token: &str, config: &Config) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret_key.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::Unauthorized("Invalid or expired token".to_string()))
}

/// Extractor for protected routes: resolves the bearer token to an active
/// administrator or rejects with 401.
pub struct AuthAdmin(pub Admin);

#[axum::async_trait]
impl FromRequestParts<Arc<Store>> for AuthAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<Store>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthError::Unauthorized("Missing bearer token".to_string()))?;

        let claims = verify_token(bearer.token(), &state.config)?;

        let q = "--sql
            select *
            from admins
            where username = $1;
        ";

        let admin = sqlx::query_as::<_, Admin>(q)
            .bind(&claims.sub)
            .fetch_optional(&state.db_pool)
            .await?
            .ok_or_else(|| AuthError::Unauthorized("Administrator not found".to_string()))?;

        if !admin.is_active {
            return Err(AuthError::Unauthorized(
                "Administrator account is inactive".to_string(),
            ));
        }

        Ok(AuthAdmin(admin))
    }
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginPayload {
    #[schema(example = "admin")]
    pub username: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    pub admin_id: i32,
    pub username: String,
    pub email: String,
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Authenticated successfully", body = TokenResponse),
        (status = 401, description = "Incorrect username or password, or inactive account", body = AuthError)
    )
)]
pub(super) async fn login(
    State(store): State<Arc<Store>>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<TokenResponse>, AuthError> {
    let q = "--sql
        select *
        from admins
        where username = $1;
    ";

    let admin = sqlx::query_as::<_, Admin>(q)
        .bind(&payload.username)
        .fetch_optional(&store.db_pool)
        .await?
        .ok_or_else(|| AuthError::Unauthorized("Incorrect username or password".to_string()))?;

    let verified = bcrypt::verify(&payload.password, &admin.password_hash).unwrap_or(false);
    if !verified {
        return Err(AuthError::Unauthorized(
            "Incorrect username or password".to_string(),
        ));
    }

    if !admin.is_active {
        return Err(AuthError::Unauthorized(
            "Administrator account is inactive".to_string(),
        ));
    }

    let access_token = create_access_token(&admin, &store.config)?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
        admin_id: admin.id,
        username: admin.username,
        email: admin.email,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    security(("bearer_token" = [])),
    responses(
        (status = 200, description = "Current administrator profile", body = AdminProfile),
        (status = 401, description = "Missing or invalid token", body = AuthError)
    )
)]
pub(super) async fn me(AuthAdmin(admin): AuthAdmin) -> Json<AdminProfile> {
    Json(AdminProfile::from(admin))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_admin() -> Admin {
        Admin {
            id: 1,
            username: "admin".to_string(),
            password_hash: String::new(),
            email: "admin@raffleapp.com".to_string(),
            phone: None,
            is_active: true,
            is_main_admin: true,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    #[test]
    fn token_round_trip() {
        let config = Config::from_env().unwrap();
        let token = create_access_token(&test_admin(), &config).unwrap();
        let claims = verify_token(&token, &config).unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.admin_id, 1);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = Config::from_env().unwrap();
        let token = create_access_token(&test_admin(), &config).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(verify_token(&tampered, &config).is_err());
    }
}
