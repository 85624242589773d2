use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::{Route, State};

use crate::auth::AuthUser;
use crate::db::AppState;
use crate::error::ApiResult;
use crate::models::{ReviewPayload, ReviewView};
use crate::routes::books::parse_id;

// All detail operations are scoped to the review's owner; a review owned by
// another user answers 404, never 403.

// GET /reviews/<id>
#[get("/<id>")]
pub async fn detail(
    state: &State<AppState>,
    user: AuthUser,
    id: &str,
) -> ApiResult<Json<ReviewView>> {
    let oid = parse_id(id, "Review")?;
    Ok(Json(state.reviews.get(&oid, &user.id).await?))
}

// PUT /reviews/<id>
#[put("/<id>", data = "<payload>")]
pub async fn update(
    state: &State<AppState>,
    user: AuthUser,
    id: &str,
    payload: Json<ReviewPayload>,
) -> ApiResult<Json<ReviewView>> {
    let oid = parse_id(id, "Review")?;
    Ok(Json(
        state
            .reviews
            .update(&oid, payload.into_inner(), &user.id)
            .await?,
    ))
}

// DELETE /reviews/<id>
#[delete("/<id>")]
pub async fn delete(state: &State<AppState>, user: AuthUser, id: &str) -> ApiResult<Status> {
    let oid = parse_id(id, "Review")?;
    state.reviews.delete(&oid, &user.id).await?;
    Ok(Status::NoContent)
}

pub fn routes() -> Vec<Route> {
    routes![detail, update, delete]
}
