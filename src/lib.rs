#[macro_use]
extern crate rocket;

use rocket::http::Method;
use rocket::serde::json::{json, Value};
use rocket::{Build, Rocket};
use rocket_cors::{AllowedHeaders, AllowedOrigins, CorsOptions};

pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sentiment;
pub mod services;
pub mod store;
pub mod routes {
    pub mod account;
    pub mod books;
    pub mod reviews;
}

#[get("/health")]
fn health() -> &'static str {
    "ok"
}

#[catch(400)]
fn bad_request() -> Value {
    json!({ "error": "bad request" })
}

#[catch(401)]
fn unauthorized() -> Value {
    json!({ "error": "authentication required" })
}

#[catch(404)]
fn not_found() -> Value {
    json!({ "error": "not found" })
}

#[catch(422)]
fn unprocessable() -> Value {
    json!({ "error": "malformed request body" })
}

#[catch(500)]
fn internal() -> Value {
    json!({ "error": "something went wrong" })
}

// Open CORS for development.
fn cors() -> rocket_cors::Cors {
    let allowed_origins = AllowedOrigins::all();

    CorsOptions {
        allowed_origins,
        allowed_methods: vec![
            Method::Get,
            Method::Post,
            Method::Put,
            Method::Delete,
            Method::Options,
        ]
        .into_iter()
        .map(From::from)
        .collect(),
        allowed_headers: AllowedHeaders::some(&["Content-Type", "Accept", "Authorization"]),
        allow_credentials: true,
        ..Default::default()
    }
    .to_cors()
    .expect("error building CORS")
}

pub fn rocket(state: db::AppState) -> Rocket<Build> {
    rocket::build()
        .manage(state)
        .attach(cors())
        .mount("/", routes![health])
        .mount("/", routes::account::routes())
        .mount("/", routes::books::root_routes())
        .mount("/books", routes::books::routes())
        .mount("/reviews", routes::reviews::routes())
        .register(
            "/",
            catchers![bad_request, unauthorized, not_found, unprocessable, internal],
        )
}
