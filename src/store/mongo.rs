use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, Database, IndexModel};

use super::{Store, StoreError, StoreResult};
use crate::models::{Book, Review, User};

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let mut opts = ClientOptions::parse(uri).await?;
        opts.app_name = Some("bookrate".into());
        let client = Client::with_options(opts)?;
        let db = client.database(db_name);

        let store = Self { db };
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection::<User>("users")
    }
    fn books(&self) -> Collection<Book> {
        self.db.collection::<Book>("books")
    }
    fn reviews(&self) -> Collection<Review> {
        self.db.collection::<Review>("reviews")
    }

    async fn ensure_indexes(&self) -> mongodb::error::Result<()> {
        // Unique isbn backs the conflict invariant on book creation.
        let isbn_unique = IndexModel::builder()
            .keys(doc! { "isbn_number": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let _ = self.books().create_index(isbn_unique).await?;

        let owner_idx = IndexModel::builder().keys(doc! { "owner_id": 1 }).build();
        let _ = self.books().create_index(owner_idx).await?;

        let username_unique = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        let _ = self.users().create_index(username_unique).await?;

        let review_book_idx = IndexModel::builder()
            .keys(doc! { "book_id": 1, "created_at": 1 })
            .build();
        let _ = self.reviews().create_index(review_book_idx).await?;

        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == 11000
    )
}

fn insert_err(field: &'static str) -> impl FnOnce(mongodb::error::Error) -> StoreError {
    move |e| {
        if is_duplicate_key(&e) {
            StoreError::Duplicate(field)
        } else {
            StoreError::Backend(e.into())
        }
    }
}

fn backend(e: mongodb::error::Error) -> StoreError {
    StoreError::Backend(e.into())
}

fn inserted_id(res: mongodb::results::InsertOneResult) -> StoreResult<ObjectId> {
    res.inserted_id
        .as_object_id()
        .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("inserted id is not an ObjectId")))
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, user: &User) -> StoreResult<ObjectId> {
        let res = self
            .users()
            .insert_one(user)
            .await
            .map_err(insert_err("username"))?;
        inserted_id(res)
    }

    async fn find_user(&self, id: &ObjectId) -> StoreResult<Option<User>> {
        self.users()
            .find_one(doc! { "_id": id })
            .await
            .map_err(backend)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.users()
            .find_one(doc! { "username": username })
            .await
            .map_err(backend)
    }

    async fn insert_book(&self, book: &Book) -> StoreResult<ObjectId> {
        let res = self
            .books()
            .insert_one(book)
            .await
            .map_err(insert_err("isbn_number"))?;
        inserted_id(res)
    }

    async fn find_book(&self, id: &ObjectId) -> StoreResult<Option<Book>> {
        self.books()
            .find_one(doc! { "_id": id })
            .await
            .map_err(backend)
    }

    async fn list_books(&self) -> StoreResult<Vec<Book>> {
        let mut cur = self.books().find(doc! {}).await.map_err(backend)?;
        let mut books = Vec::new();
        while let Some(b) = cur.try_next().await.map_err(backend)? {
            books.push(b);
        }
        Ok(books)
    }

    async fn list_books_by_owner(&self, owner_id: &ObjectId) -> StoreResult<Vec<Book>> {
        let mut cur = self
            .books()
            .find(doc! { "owner_id": owner_id })
            .await
            .map_err(backend)?;
        let mut books = Vec::new();
        while let Some(b) = cur.try_next().await.map_err(backend)? {
            books.push(b);
        }
        Ok(books)
    }

    async fn replace_book(&self, id: &ObjectId, book: &Book) -> StoreResult<bool> {
        let res = self
            .books()
            .replace_one(doc! { "_id": id }, book)
            .await
            .map_err(insert_err("isbn_number"))?;
        Ok(res.matched_count > 0)
    }

    async fn delete_book(&self, id: &ObjectId) -> StoreResult<bool> {
        let res = self
            .books()
            .delete_one(doc! { "_id": id })
            .await
            .map_err(backend)?;
        Ok(res.deleted_count > 0)
    }

    async fn insert_review(&self, review: &Review) -> StoreResult<ObjectId> {
        let res = self
            .reviews()
            .insert_one(review)
            .await
            .map_err(backend)?;
        inserted_id(res)
    }

    async fn find_review(&self, id: &ObjectId) -> StoreResult<Option<Review>> {
        self.reviews()
            .find_one(doc! { "_id": id })
            .await
            .map_err(backend)
    }

    async fn list_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<Vec<Review>> {
        let mut cur = self
            .reviews()
            .find(doc! { "book_id": book_id })
            .await
            .map_err(backend)?;
        let mut reviews = Vec::new();
        while let Some(r) = cur.try_next().await.map_err(backend)? {
            reviews.push(r);
        }
        Ok(reviews)
    }

    async fn replace_review(&self, id: &ObjectId, review: &Review) -> StoreResult<bool> {
        let res = self
            .reviews()
            .replace_one(doc! { "_id": id }, review)
            .await
            .map_err(backend)?;
        Ok(res.matched_count > 0)
    }

    async fn delete_review(&self, id: &ObjectId) -> StoreResult<bool> {
        let res = self
            .reviews()
            .delete_one(doc! { "_id": id })
            .await
            .map_err(backend)?;
        Ok(res.deleted_count > 0)
    }

    async fn delete_reviews_for_book(&self, book_id: &ObjectId) -> StoreResult<u64> {
        let res = self
            .reviews()
            .delete_many(doc! { "book_id": book_id })
            .await
            .map_err(backend)?;
        Ok(res.deleted_count)
    }
}
