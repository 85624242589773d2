use async_trait::async_trait;
use dashmap::DashMap;
use mongodb::bson::oid::ObjectId;

use super::{Store, StoreError, StoreResult};
use crate::models::{Book, Review, User};

/// Store backed by process memory. Used by the test suite and for local runs
/// without MONGO_URI. Enforces the same unique constraints as the Mongo
/// indexes. Listings are sorted by creation time for stable output.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<ObjectId, User>,
    books: DashMap<ObjectId, Book>,
    reviews: DashMap<ObjectId, Review>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_books(mut books: Vec<Book>) -> Vec<Book> {
    books.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    books
}

fn sort_reviews(mut reviews: Vec<Review>) -> Vec<Review> {
    reviews.sort_by(|a, b| {
        a.created_at
            .cmp(&b.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
    reviews
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<ObjectId> {
        if self
            .users
            .iter()
            .any(|u| u.username == user.username)
        {
            return Err(StoreError::Duplicate("username"));
        }
        let id = ObjectId::new();
        let mut stored = user.clone();
        stored.id = Some(id);
        self.users.insert(id, stored);
        Ok(id)
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        Ok(self.users.get(id).map(|u| u.clone()))
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username == username)
            .map(|u| u.clone()))
    }

    async fn insert_book(&self, book: &Book) -> StoreResult<ObjectId> {
        if self.books.iter().any(|b| b.isbn == book.isbn) {
            return Err(StoreError::Duplicate("isbn_number"));
        }
        let id = ObjectId::new();
        let mut stored = book.clone();
        stored.id = Some(id);
        self.books.insert(id, stored);
        Ok(id)
    }

    async fn find_book(&self, id: &ObjectId) -> StoreResult<Option<Book>> {
        Ok(self.books.get(id).map(|b| b.clone()))
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        Ok(sort_books(
            self.books.iter().map(|b| b.clone()).collect(),
        ))
    }

    async fn list_books_by_owner(&self, owner_id: &ObjectId) -> StoreResult<Vec<Book>> {
        Ok(sort_books(
            self.books
                .iter()
                .filter(|b| b.owner_id == *owner_id)
                .map(|b| b.clone())
                .collect(),
        ))
    }

    async fn replace_book(&self, id: &ObjectId, book: &Book) -> StoreResult<bool> {
        if self
            .books
            .iter()
            .any(|b| b.isbn == book.isbn && b.id != Some(*id))
        {
            return Err(StoreError::Duplicate("isbn_number"));
        }
        if !self.books.contains_key(id) {
            return Ok(false);
        }
        let mut stored = book.clone();
        stored.id = Some(*id);
        self.books.insert(*id, stored);
        Ok(true)
    }

    async fn delete_book(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.books.remove(id).is_some())
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<ObjectId> {
        let id = ObjectId::new();
        let mut stored = review.clone();
        stored.id = Some(id);
        self.reviews.insert(id, stored);
        Ok(id)
    }

    async fn find_review(&self, id: &ObjectId) -> StoreResult<Option<Review>> {
        Ok(self.reviews.get(id).map(|r| r.clone()))
    }

    async fn list_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<Vec<Review>> {
        Ok(sort_reviews(
            self.reviews
                .iter()
                .filter(|r| r.book_id == *book_id)
                .map(|r| r.clone())
                .collect(),
        ))
    }

    async fn replace_review(&self, id: &ObjectId, review: &Review) -> StoreResult<bool> {
        if !self.reviews.contains_key(id) {
            return Ok(false);
        }
        let mut stored = review.clone();
        stored.id = Some(*id);
        self.reviews.insert(*id, stored);
        Ok(true)
    }

    async fn delete_review(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.reviews.remove(id).is_some())
    }

    async fn delete_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<u64> {
        let ids: Vec<ObjectId> = self
            .reviews
            .iter()
            .filter(|r| r.book_id == *book_id)
            .filter_map(|r| r.id)
            .collect();
        let count = ids.len() as u64;
        for id in ids {
            self.reviews.remove(&id);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;
    use chrono::Utc;

    fn book(isbn: &str, owner: ObjectId) -> Book {
        let now = Utc::now();
        Book {
            id: None,
            owner_id: owner,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
            description: "Desert planet".into(),
            cover_image: None,
            isbn: isbn.into(),
            created_at: now,
            updated_at: now,
        }
    }

    fn review(book_id: ObjectId, owner: ObjectId) -> Review {
        let now = Utc::now();
        Review {
            id: None,
            book_id,
            owner_id: owner,
            rating: 4.0,
            comment: "fine".into(),
            sentiment: SentimentLabel::Neutral,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_isbn_is_rejected() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        store.insert_book(&book("9780441013593", owner)).await.unwrap();
        let err = store
            .insert_book(&book("9780441013593", owner))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("isbn_number")));
    }

    #[tokio::test]
    async fn replace_cannot_steal_anothers_isbn() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        store.insert_book(&book("1111111111111", owner)).await.unwrap();
        let second = store.insert_book(&book("2222222222222", owner)).await.unwrap();

        let hijack = book("1111111111111", owner);
        let err = store.replace_book(&second, &hijack).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("isbn_number")));
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        let user = User {
            id: None,
            username: "ana".into(),
            email: None,
            password_hash: "h".into(),
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();
        let err = store.insert_user(&user).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate("username")));
    }

    #[tokio::test]
    async fn reviews_for_book_are_bulk_deletable() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        let book_id = store.insert_book(&book("3333333333333", owner)).await.unwrap();
        store.insert_review(&review(book_id, owner)).await.unwrap();
        store.insert_review(&review(book_id, owner)).await.unwrap();
        let other = store.insert_book(&book("4444444444444", owner)).await.unwrap();
        let kept = store.insert_review(&review(other, owner)).await.unwrap();

        assert_eq!(store.delete_reviews_for_book(&book_id).await.unwrap(), 2);
        assert!(store.list_reviews_for_book(&book_id).await.unwrap().is_empty());
        assert!(store.find_review(&kept).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn replace_of_missing_record_reports_absent() {
        let store = MemoryStore::new();
        let owner = ObjectId::new();
        let ghost = ObjectId::new();
        assert!(!store.replace_book(&ghost, &book("5555555555555", owner)).await.unwrap());
        assert!(!store.replace_review(&ghost, &review(ghost, owner)).await.unwrap());
    }
}
