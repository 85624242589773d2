use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::{LoginPayload, RegisterPayload, User};
use crate::store::Store;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

pub struct AuthService {
    store: Arc<dyn Store>,
    secret: String,
    token_ttl: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn Store>, secret: String, token_ttl: Duration) -> Self {
        Self {
            store,
            secret,
            token_ttl,
        }
    }

    pub async fn register(&self, payload: RegisterPayload) -> ApiResult<()> {
        let mut errors = Vec::new();
        let username = match payload.username.as_deref().map(str::trim) {
            Some(u) if u.len() >= 3 => u.to_string(),
            Some(_) => {
                errors.push(FieldError::new("username", "must be at least 3 characters"));
                String::new()
            }
            None => {
                errors.push(FieldError::new("username", "this field is required"));
                String::new()
            }
        };
        let password = match payload.password.as_deref() {
            Some(p) if p.len() >= 8 => p.to_string(),
            Some(_) => {
                errors.push(FieldError::new("password", "must be at least 8 characters"));
                String::new()
            }
            None => {
                errors.push(FieldError::new("password", "this field is required"));
                String::new()
            }
        };
        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("password hashing failed: {e}"))?
            .to_string();

        let user = User {
            id: None,
            username,
            email: payload.email,
            password_hash: hash,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;
        Ok(())
    }

    /// Verifies credentials and issues a bearer token. Unknown usernames and
    /// wrong passwords are indistinguishable.
    pub async fn login(&self, payload: LoginPayload) -> ApiResult<String> {
        let invalid = || ApiError::Unauthorized("invalid credentials".into());

        let username = payload.username.as_deref().map(str::trim).unwrap_or("");
        let password = payload.password.as_deref().unwrap_or("");
        if username.is_empty() || password.is_empty() {
            return Err(invalid());
        }

        let user = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(invalid)?;
        let parsed =
            PasswordHash::new(&user.password_hash).map_err(|e| anyhow!("stored hash invalid: {e}"))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| invalid())?;

        let user_id = user
            .id
            .ok_or_else(|| anyhow!("stored user has no id"))?;
        self.issue_token(&user_id)
    }

    pub fn issue_token(&self, user_id: &ObjectId) -> ApiResult<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_hex(),
            iat: now,
            exp: now + self.token_ttl.as_secs() as i64,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("signing token")?;
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> ApiResult<ObjectId> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;
        ObjectId::parse_str(&data.claims.sub)
            .map_err(|_| ApiError::Unauthorized("invalid token subject".into()))
    }
}

/// Request guard for routes requiring a `Authorization: Bearer <token>`
/// header. Failures surface through the 401 catcher.
pub struct AuthUser {
    pub id: ObjectId,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthUser {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(state) = req.rocket().state::<crate::db::AppState>() else {
            return Outcome::Error((Status::InternalServerError, ()));
        };
        let token = req
            .headers()
            .get_one("Authorization")
            .and_then(|h| h.strip_prefix("Bearer "));
        match token {
            Some(t) => match state.auth.verify_token(t) {
                Ok(id) => Outcome::Success(AuthUser { id }),
                Err(_) => Outcome::Error((Status::Unauthorized, ())),
            },
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}
