use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;

use crate::cache::Cache;
use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::{Book, BookPayload, BookView};
use crate::store::Store;

/// Namespace for cached search results. The key for the empty query is the
/// bare prefix and doubles as the "all books" key.
pub const SEARCH_CACHE_PREFIX: &str = "books_search_";

pub struct BookService {
    store: Arc<dyn Store>,
    cache: Arc<dyn Cache>,
    cache_ttl: Duration,
}

impl BookService {
    pub fn new(store: Arc<dyn Store>, cache: Arc<dyn Cache>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    pub fn cache_key(query: &str) -> String {
        format!("{SEARCH_CACHE_PREFIX}{}", query.trim().to_lowercase())
    }

    /// Cache-first search. A hit returns the stored bytes verbatim with no
    /// staleness check; a miss filters by case-insensitive substring match
    /// on title or author, caches the serialized list and returns it.
    pub async fn list(&self, query: &str) -> ApiResult<Vec<u8>> {
        let key = Self::cache_key(query);
        if let Some(bytes) = self.cache.get(&key).await {
            tracing::debug!(key, "book search served from cache");
            return Ok(bytes);
        }

        let needle = query.trim().to_lowercase();
        let books = self.store.list_books().await?;
        let views: Vec<BookView> = books
            .iter()
            .filter(|b| {
                needle.is_empty()
                    || b.title.to_lowercase().contains(&needle)
                    || b.author.to_lowercase().contains(&needle)
            })
            .map(BookView::from)
            .collect();

        let bytes = serde_json::to_vec(&views).context("serializing book list")?;
        self.cache.set(&key, &bytes, Some(self.cache_ttl)).await;
        Ok(bytes)
    }

    pub async fn create(&self, payload: BookPayload, caller: ObjectId) -> ApiResult<BookView> {
        let fields = validate(payload)?;
        let now = Utc::now();
        let book = Book {
            id: None,
            owner_id: caller,
            title: fields.title,
            author: fields.author,
            description: fields.description,
            cover_image: fields.cover_image,
            isbn: fields.isbn,
            created_at: now,
            updated_at: now,
        };
        let id = self.store.insert_book(&book).await?;

        // Only the "all books" key is invalidated here; cached non-empty
        // query results stay until TTL expiry, as in the original system.
        self.cache.del(&Self::cache_key("")).await;

        let created = Book {
            id: Some(id),
            ..book
        };
        Ok(BookView::from(&created))
    }

    pub async fn get(&self, id: &ObjectId) -> ApiResult<BookView> {
        let book = self
            .store
            .find_book(id)
            .await?
            .ok_or(ApiError::NotFound("Book"))?;
        Ok(BookView::from(&book))
    }

    pub async fn list_for_owner(&self, caller: &ObjectId) -> ApiResult<Vec<BookView>> {
        let books = self.store.list_books_by_owner(caller).await?;
        Ok(books.iter().map(BookView::from).collect())
    }

    /// Full-field replace. The owner is carried over from the stored record;
    /// any owner in the input is ignored. No ownership check on update
    /// (documented behavior of the original API).
    pub async fn update(&self, id: &ObjectId, payload: BookPayload) -> ApiResult<BookView> {
        let existing = self
            .store
            .find_book(id)
            .await?
            .ok_or(ApiError::NotFound("Book"))?;
        let fields = validate(payload)?;

        let book = Book {
            id: Some(*id),
            owner_id: existing.owner_id,
            title: fields.title,
            author: fields.author,
            description: fields.description,
            cover_image: fields.cover_image,
            isbn: fields.isbn,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        if !self.store.replace_book(id, &book).await? {
            return Err(ApiError::NotFound("Book"));
        }

        self.cache.del(&Self::cache_key("")).await;
        Ok(BookView::from(&book))
    }

    /// Deletes the book and cascades to its reviews, then wipes the whole
    /// search-cache namespace.
    pub async fn delete(&self, id: &ObjectId) -> ApiResult<()> {
        if self.store.find_book(id).await?.is_none() {
            return Err(ApiError::NotFound("Book"));
        }
        let dropped = self.store.delete_reviews_for_book(id).await?;
        if dropped > 0 {
            tracing::debug!(book_id = %id, count = dropped, "cascaded review delete");
        }
        self.store.delete_book(id).await?;

        self.cache.del(&Self::cache_key("")).await;
        self.cache.del_prefix(SEARCH_CACHE_PREFIX).await;
        Ok(())
    }
}

struct ValidBook {
    title: String,
    author: String,
    description: String,
    cover_image: Option<String>,
    isbn: String,
}

fn validate(payload: BookPayload) -> ApiResult<ValidBook> {
    let mut errors = Vec::new();
    let title = required(&mut errors, "title", payload.title);
    let author = required(&mut errors, "author", payload.author);
    let description = required(&mut errors, "description", payload.description);
    let isbn = required(&mut errors, "isbn_number", payload.isbn_number);
    if isbn.len() > 13 {
        errors.push(FieldError::new(
            "isbn_number",
            "must be at most 13 characters",
        ));
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok(ValidBook {
        title,
        author,
        description,
        cover_image: payload.cover_image,
        isbn,
    })
}

fn required(errors: &mut Vec<FieldError>, field: &str, value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => {
            errors.push(FieldError::new(field, "this field is required"));
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::store::{MemoryStore, StoreResult};
    use crate::models::{Review, User};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store decorator counting how often the book listing is computed.
    struct CountingStore {
        inner: MemoryStore,
        list_calls: AtomicUsize,
    }

    impl CountingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Store for CountingStore {
        async fn insert_user(&self, user: &User) -> StoreResult<ObjectId> {
            self.inner.insert_user(user).await
        }
        async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
            self.inner.find_user(id).await
        }
        async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
            self.inner.find_user_by_username(username).await
        }
        async fn insert_book(&self, book: &Book) -> StoreResult<ObjectId> {
            self.inner.insert_book(book).await
        }
        async fn find_book(&self, id: &ObjectId) -> StoreResult<Option<Book>> {
            self.inner.find_book(id).await
        }
        async fn list_books(&self) -> StoreResult<Vec<Book>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_books().await
        }
        async fn list_books_by_owner(&self, owner_id: &ObjectId) -> StoreResult<Vec<Book>> {
            self.inner.list_books_by_owner(owner_id).await
        }
        async fn replace_book(&self, id: &ObjectId, book: &Book) -> StoreResult<bool> {
            self.inner.replace_book(id, book).await
        }
        async fn delete_book(&self, id: &ObjectId) -> StoreResult<bool> {
            self.inner.delete_book(id).await
        }
        async fn insert_review(&self, review: &Review) -> StoreResult<ObjectId> {
            self.inner.insert_review(review).await
        }
        async fn find_review(&self, id: &ObjectId) -> StoreResult<Option<Review>> {
            self.inner.find_review(id).await
        }
        async fn list_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<Vec<Review>> {
            self.inner.list_reviews_for_book(book_id).await
        }
        async fn replace_review(&self, id: &ObjectId, review: &Review) -> StoreResult<bool> {
            self.inner.replace_review(id, review).await
        }
        async fn delete_review(&self, id: &ObjectId) -> StoreResult<bool> {
            self.inner.delete_review(id).await
        }
        async fn delete_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<u64> {
            self.inner.delete_reviews_for_book(book_id).await
        }
    }

    fn payload(title: &str, author: &str, isbn: &str) -> BookPayload {
        BookPayload {
            title: Some(title.into()),
            author: Some(author.into()),
            description: Some("a description".into()),
            cover_image: None,
            isbn_number: Some(isbn.into()),
        }
    }

    fn service_with(store: Arc<dyn Store>) -> BookService {
        BookService::new(store, Arc::new(MemoryCache::new()), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn cache_key_normalizes_query() {
        assert_eq!(BookService::cache_key("  RuSt  "), "books_search_rust");
        assert_eq!(BookService::cache_key(""), "books_search_");
    }

    #[tokio::test]
    async fn repeated_search_hits_cache_not_store() {
        let store = Arc::new(CountingStore::new());
        let svc = service_with(store.clone());
        svc.create(payload("Dune", "Frank Herbert", "9780441013593"), ObjectId::new())
            .await
            .unwrap();

        let first = svc.list("dune").await.unwrap();
        let second = svc.list("dune").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn create_refreshes_all_books_but_not_query_keys() {
        let svc = service_with(Arc::new(MemoryStore::new()));
        let caller = ObjectId::new();

        svc.create(payload("Dune", "Frank Herbert", "1000000000001"), caller)
            .await
            .unwrap();
        // warm both the all-books key and a query key
        let all_before = svc.list("").await.unwrap();
        let query_before = svc.list("herbert").await.unwrap();

        svc.create(payload("Dune Messiah", "Frank Herbert", "1000000000002"), caller)
            .await
            .unwrap();

        let all_after = svc.list("").await.unwrap();
        assert_ne!(all_before, all_after, "all-books key must be invalidated");

        // the non-empty query key keeps serving the stale cached list
        let query_after = svc.list("herbert").await.unwrap();
        assert_eq!(query_before, query_after);
    }

    #[tokio::test]
    async fn delete_wipes_every_search_key() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(store.clone());
        let caller = ObjectId::new();

        let a = svc
            .create(payload("Dune", "Frank Herbert", "1000000000001"), caller)
            .await
            .unwrap();
        svc.create(payload("Hyperion", "Dan Simmons", "1000000000002"), caller)
            .await
            .unwrap();
        svc.list("herbert").await.unwrap();

        let id = ObjectId::parse_str(&a.id).unwrap();
        svc.delete(&id).await.unwrap();

        let results: Vec<BookView> =
            serde_json::from_slice(&svc.list("herbert").await.unwrap()).unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_or_author_case_insensitively() {
        let svc = service_with(Arc::new(MemoryStore::new()));
        let caller = ObjectId::new();
        svc.create(payload("Dune", "Frank Herbert", "1000000000001"), caller)
            .await
            .unwrap();
        svc.create(payload("Hyperion", "Dan Simmons", "1000000000002"), caller)
            .await
            .unwrap();

        let by_title: Vec<BookView> =
            serde_json::from_slice(&svc.list("DUNE").await.unwrap()).unwrap();
        assert_eq!(by_title.len(), 1);

        let by_author: Vec<BookView> =
            serde_json::from_slice(&svc.list("simmons").await.unwrap()).unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].title, "Hyperion");
    }

    #[tokio::test]
    async fn duplicate_isbn_creation_conflicts() {
        let svc = service_with(Arc::new(MemoryStore::new()));
        let caller = ObjectId::new();
        svc.create(payload("Dune", "Frank Herbert", "9780441013593"), caller)
            .await
            .unwrap();
        let err = svc
            .create(payload("Other", "Someone", "9780441013593"), caller)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(ref f) if f.field == "isbn_number"));
    }

    #[tokio::test]
    async fn owner_is_forced_to_caller_and_survives_update() {
        let store = Arc::new(MemoryStore::new());
        let svc = service_with(store.clone());
        let caller = ObjectId::new();

        let view = svc
            .create(payload("Dune", "Frank Herbert", "1000000000001"), caller)
            .await
            .unwrap();
        assert_eq!(view.user, caller.to_hex());

        let id = ObjectId::parse_str(&view.id).unwrap();
        let updated = svc
            .update(&id, payload("Dune (revised)", "Frank Herbert", "1000000000001"))
            .await
            .unwrap();
        assert_eq!(updated.user, caller.to_hex());
        assert_eq!(updated.title, "Dune (revised)");
    }

    #[tokio::test]
    async fn missing_fields_are_reported_per_field() {
        let svc = service_with(Arc::new(MemoryStore::new()));
        let err = svc
            .create(
                BookPayload {
                    title: None,
                    author: Some("A".into()),
                    description: None,
                    cover_image: None,
                    isbn_number: Some("123".into()),
                },
                ObjectId::new(),
            )
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert!(fields.contains(&"title"));
                assert!(fields.contains(&"description"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn get_and_update_of_missing_book_are_not_found() {
        let svc = service_with(Arc::new(MemoryStore::new()));
        let ghost = ObjectId::new();
        assert!(matches!(svc.get(&ghost).await, Err(ApiError::NotFound("Book"))));
        assert!(matches!(
            svc.update(&ghost, payload("T", "A", "1")).await,
            Err(ApiError::NotFound("Book"))
        ));
        assert!(matches!(svc.delete(&ghost).await, Err(ApiError::NotFound("Book"))));
    }
}
