use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Serialize;
use serde_json::{json, Value};

use crate::db::AppState;
use crate::error::ApiError;
use crate::models::{LoginPayload, RegisterPayload};

/// Response wrapper used only by the account endpoints.
#[derive(Serialize)]
pub struct Envelope {
    pub data: Value,
    pub message: String,
}

fn envelope(data: Value, message: &str) -> Json<Envelope> {
    Json(Envelope {
        data,
        message: message.to_string(),
    })
}

#[post("/register", data = "<payload>")]
pub async fn register(
    state: &State<AppState>,
    payload: Json<RegisterPayload>,
) -> (Status, Json<Envelope>) {
    match state.auth.register(payload.into_inner()).await {
        Ok(()) => (
            Status::Created,
            envelope(json!({}), "Your account is created"),
        ),
        Err(ApiError::Validation(errors)) => (
            Status::BadRequest,
            envelope(json!(errors), "something went wrong"),
        ),
        Err(ApiError::Conflict(error)) => (
            Status::BadRequest,
            envelope(json!([error]), "something went wrong"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "registration failed");
            (
                Status::InternalServerError,
                envelope(json!({}), "something went wrong"),
            )
        }
    }
}

#[post("/login", data = "<payload>")]
pub async fn login(
    state: &State<AppState>,
    payload: Json<LoginPayload>,
) -> (Status, Json<Envelope>) {
    match state.auth.login(payload.into_inner()).await {
        Ok(token) => (
            Status::Ok,
            envelope(json!({ "access": token }), "Login successful"),
        ),
        Err(ApiError::Unauthorized(_)) => (
            Status::Unauthorized,
            envelope(json!({}), "Invalid credentials"),
        ),
        Err(e) => {
            tracing::error!(error = %e, "login failed");
            (
                Status::InternalServerError,
                envelope(json!({}), "something went wrong"),
            )
        }
    }
}

pub fn routes() -> Vec<Route> {
    routes![register, login]
}
