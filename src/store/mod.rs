use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use thiserror::Error;

use crate::models::{Book, Review, User};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write (isbn_number, username).
    #[error("duplicate value for unique field `{0}`")]
    Duplicate(&'static str),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for users, books and reviews.
///
/// Uniqueness (isbn_number, username) is enforced here; callers translate
/// `Duplicate` into their conflict responses. Replace/delete return whether
/// a matching record existed.
#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn insert_user(&self, user: &User) -> StoreResult<ObjectId>;
    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // books
    async fn insert_book(&self, book: &Book) -> StoreResult<ObjectId>;
    async fn find_book(&self, id: &ObjectId) -> StoreResult<Option<Book>>;
    async fn list_books(&self) -> StoreResult<Vec<Book>>;
    async fn list_books_by_owner(&self, owner_id: &ObjectId) -> StoreResult<Vec<Book>>;
    async fn replace_book(&self, id: &ObjectId, book: &Book) -> StoreResult<bool>;
    async fn delete_book(&self, id: &ObjectId) -> StoreResult<bool>;

    // reviews
    async fn insert_review(&self, review: &Review) -> StoreResult<ObjectId>;
    async fn find_review(&self, id: &ObjectId) -> StoreResult<Option<Review>>;
    async fn list_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<Vec<Review>>;
    async fn replace_review(&self, id: &ObjectId, review: &Review) -> StoreResult<bool>;
    async fn delete_review(&self, id: &ObjectId) -> StoreResult<bool>;
    async fn delete_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<u64>;
}
