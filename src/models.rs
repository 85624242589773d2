use bson::serde_helpers::chrono_datetime_as_bson_datetime;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::sentiment::SentimentLabel;

/* ===== Stored entities ===== */

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Book {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId, // set once at creation, never from input
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: Option<String>,
    #[serde(rename = "isbn_number")]
    pub isbn: String, // globally unique
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Review {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book_id: ObjectId,
    pub owner_id: ObjectId,
    pub rating: f64, // 1.0..=5.0, one decimal place
    pub comment: String,
    pub sentiment: SentimentLabel, // recomputed on every save
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/* ===== Wire views ===== */

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BookView {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub cover_image: Option<String>,
    pub isbn_number: String,
    pub user: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Book> for BookView {
    fn from(b: &Book) -> Self {
        BookView {
            id: b.id.map(|i| i.to_hex()).unwrap_or_default(),
            title: b.title.clone(),
            author: b.author.clone(),
            description: b.description.clone(),
            cover_image: b.cover_image.clone(),
            isbn_number: b.isbn.clone(),
            user: b.owner_id.to_hex(),
            created_at: b.created_at.to_rfc3339(),
            updated_at: b.updated_at.to_rfc3339(),
        }
    }
}

/// Review representation with the owning book embedded, mirroring the
/// depth-1 serialization of the original API.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ReviewView {
    pub id: String,
    pub book_id: String,
    pub book: BookView,
    pub user: String,
    pub rating: f64,
    pub comment: String,
    pub sentiment: SentimentLabel,
    pub created_at: String,
    pub updated_at: String,
    pub relative_time: String,
}

/* ===== Request payloads ===== */

// All fields come in optional so presence checks can produce field-level
// 400s instead of a body-level deserialization failure.

#[derive(Debug, Deserialize)]
pub struct BookPayload {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub isbn_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewPayload {
    pub book_id: Option<String>,
    pub rating: Option<f64>,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}
