use mongodb::bson::oid::ObjectId;
use rocket::http::Status;
use rocket::response::content::RawJson;
use rocket::serde::json::Json;
use rocket::{Route, State};

use crate::auth::AuthUser;
use crate::db::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{BookPayload, BookView, ReviewPayload, ReviewView};

pub(crate) fn parse_id(raw: &str, what: &'static str) -> ApiResult<ObjectId> {
    // a malformed id can never name an existing record
    ObjectId::parse_str(raw).map_err(|_| ApiError::NotFound(what))
}

// GET /books?query=
#[get("/?<query>")]
pub async fn index(
    state: &State<AppState>,
    _user: AuthUser,
    query: Option<String>,
) -> ApiResult<RawJson<Vec<u8>>> {
    let bytes = state.books.list(query.as_deref().unwrap_or("")).await?;
    Ok(RawJson(bytes))
}

// POST /books
#[post("/", data = "<payload>")]
pub async fn create(
    state: &State<AppState>,
    user: AuthUser,
    payload: Json<BookPayload>,
) -> ApiResult<(Status, Json<BookView>)> {
    let view = state.books.create(payload.into_inner(), user.id).await?;
    Ok((Status::Created, Json(view)))
}

// GET /books/<id>
#[get("/<id>")]
pub async fn detail(
    state: &State<AppState>,
    _user: AuthUser,
    id: &str,
) -> ApiResult<Json<BookView>> {
    let oid = parse_id(id, "Book")?;
    Ok(Json(state.books.get(&oid).await?))
}

/// PUT /books/<id>. Any authenticated caller may update any book; the
/// original API performs no ownership check here and that behavior is kept.
#[put("/<id>", data = "<payload>")]
pub async fn update(
    state: &State<AppState>,
    _user: AuthUser,
    id: &str,
    payload: Json<BookPayload>,
) -> ApiResult<Json<BookView>> {
    let oid = parse_id(id, "Book")?;
    Ok(Json(state.books.update(&oid, payload.into_inner()).await?))
}

// DELETE /books/<id>
#[delete("/<id>")]
pub async fn delete(state: &State<AppState>, _user: AuthUser, id: &str) -> ApiResult<Status> {
    let oid = parse_id(id, "Book")?;
    state.books.delete(&oid).await?;
    Ok(Status::NoContent)
}

// GET /books/<book_id>/reviews
#[get("/<book_id>/reviews")]
pub async fn list_reviews(
    state: &State<AppState>,
    _user: AuthUser,
    book_id: &str,
) -> ApiResult<Json<Vec<ReviewView>>> {
    let oid = parse_id(book_id, "Book")?;
    Ok(Json(state.reviews.list_for_book(&oid).await?))
}

// POST /books/<book_id>/reviews
#[post("/<book_id>/reviews", data = "<payload>")]
pub async fn create_review(
    state: &State<AppState>,
    user: AuthUser,
    book_id: &str,
    payload: Json<ReviewPayload>,
) -> ApiResult<(Status, Json<ReviewView>)> {
    let oid = parse_id(book_id, "Book")?;
    let view = state
        .reviews
        .create(&oid, payload.into_inner(), user.id)
        .await?;
    Ok((Status::Created, Json(view)))
}

pub fn routes() -> Vec<Route> {
    routes![index, create, detail, update, delete, list_reviews, create_review]
}

/* ===== Routes mounted at the root ===== */

// GET /book_by_book_id/<id> — fetch-by-id kept as a separate endpoint for
// wire compatibility with the original API.
#[get("/book_by_book_id/<id>")]
pub async fn by_book_id(
    state: &State<AppState>,
    _user: AuthUser,
    id: &str,
) -> ApiResult<Json<BookView>> {
    let oid = parse_id(id, "Book")?;
    Ok(Json(state.books.get(&oid).await?))
}

// GET /user/books
#[get("/user/books")]
pub async fn user_books(
    state: &State<AppState>,
    user: AuthUser,
) -> ApiResult<Json<Vec<BookView>>> {
    Ok(Json(state.books.list_for_owner(&user.id).await?))
}

pub fn root_routes() -> Vec<Route> {
    routes![by_book_id, user_books]
}
