use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mongodb::bson::oid::ObjectId;

use crate::error::{ApiError, ApiResult, FieldError};
use crate::models::{Book, BookView, Review, ReviewPayload, ReviewView};
use crate::sentiment::SentimentAnalyzer;
use crate::store::Store;

pub struct ReviewService {
    store: Arc<dyn Store>,
    analyzer: Arc<SentimentAnalyzer>,
}

impl ReviewService {
    pub fn new(store: Arc<dyn Store>, analyzer: Arc<SentimentAnalyzer>) -> Self {
        Self { store, analyzer }
    }

    /// All reviews of a book, each enriched with `relative_time`. No
    /// ownership filter; an unknown book id simply yields an empty list.
    pub async fn list_for_book(&self, book_id: &ObjectId) -> ApiResult<Vec<ReviewView>> {
        let Some(book) = self.store.find_book(book_id).await? else {
            return Ok(Vec::new());
        };
        let reviews = self.store.list_reviews_for_book(book_id).await?;
        let now = Utc::now();
        Ok(reviews
            .iter()
            .map(|r| view(r, &book, now))
            .collect())
    }

    /// Creates a review on an existing book. The owner is the caller and the
    /// sentiment label is computed from the comment; neither is accepted
    /// from input.
    pub async fn create(
        &self,
        book_id: &ObjectId,
        payload: ReviewPayload,
        caller: ObjectId,
    ) -> ApiResult<ReviewView> {
        let book = self
            .store
            .find_book(book_id)
            .await?
            .ok_or(ApiError::NotFound("Book"))?;
        let (rating, comment) = validate(&payload)?;
        let sentiment = self.analyzer.classify(&comment).await;

        let now = Utc::now();
        let review = Review {
            id: None,
            book_id: *book_id,
            owner_id: caller,
            rating,
            comment,
            sentiment,
            created_at: now,
            updated_at: now,
        };
        let id = self.store.insert_review(&review).await?;

        let created = Review {
            id: Some(id),
            ..review
        };
        Ok(view(&created, &book, now))
    }

    pub async fn get(&self, id: &ObjectId, caller: &ObjectId) -> ApiResult<ReviewView> {
        let review = self.find_owned(id, caller).await?;
        let book = self
            .store
            .find_book(&review.book_id)
            .await?
            .ok_or(ApiError::NotFound("Book"))?;
        Ok(view(&review, &book, Utc::now()))
    }

    /// Ownership-scoped update. A missing `book_id` in the payload defaults
    /// to the review's current book; the sentiment is recomputed from the
    /// (possibly new) comment.
    pub async fn update(
        &self,
        id: &ObjectId,
        payload: ReviewPayload,
        caller: &ObjectId,
    ) -> ApiResult<ReviewView> {
        let existing = self.find_owned(id, caller).await?;

        let book_id = match payload.book_id.as_deref() {
            Some(raw) => ObjectId::parse_str(raw)
                .map_err(|_| ApiError::invalid("book_id", "not a valid id"))?,
            None => existing.book_id,
        };
        let book = self
            .store
            .find_book(&book_id)
            .await?
            .ok_or(ApiError::NotFound("Book"))?;
        let (rating, comment) = validate(&payload)?;
        let sentiment = self.analyzer.classify(&comment).await;

        let review = Review {
            id: Some(*id),
            book_id,
            owner_id: existing.owner_id,
            rating,
            comment,
            sentiment,
            created_at: existing.created_at,
            updated_at: Utc::now(),
        };
        if !self.store.replace_review(id, &review).await? {
            return Err(ApiError::NotFound("Review"));
        }
        Ok(view(&review, &book, Utc::now()))
    }

    pub async fn delete(&self, id: &ObjectId, caller: &ObjectId) -> ApiResult<()> {
        self.find_owned(id, caller).await?;
        self.store.delete_review(id).await?;
        Ok(())
    }

    /// A review owned by someone else is reported exactly like a missing
    /// one, so callers cannot probe for existence.
    async fn find_owned(&self, id: &ObjectId, caller: &ObjectId) -> ApiResult<Review> {
        match self.store.find_review(id).await? {
            Some(r) if r.owner_id == *caller => Ok(r),
            _ => Err(ApiError::NotFound("Review")),
        }
    }
}

fn view(review: &Review, book: &Book, now: DateTime<Utc>) -> ReviewView {
    ReviewView {
        id: review.id.map(|i| i.to_hex()).unwrap_or_default(),
        book_id: review.book_id.to_hex(),
        book: BookView::from(book),
        user: review.owner_id.to_hex(),
        rating: review.rating,
        comment: review.comment.clone(),
        sentiment: review.sentiment,
        created_at: review.created_at.to_rfc3339(),
        updated_at: review.updated_at.to_rfc3339(),
        relative_time: relative_time(review.created_at, now),
    }
}

fn validate(payload: &ReviewPayload) -> ApiResult<(f64, String)> {
    let mut errors = Vec::new();

    let rating = match payload.rating {
        Some(r) if (1.0..=5.0).contains(&r) => (r * 10.0).round() / 10.0,
        Some(_) => {
            errors.push(FieldError::new("rating", "must be between 1 and 5"));
            0.0
        }
        None => {
            errors.push(FieldError::new("rating", "this field is required"));
            0.0
        }
    };

    let comment = match payload.comment.as_deref() {
        Some(c) if !c.trim().is_empty() => c.to_string(),
        _ => {
            errors.push(FieldError::new("comment", "this field is required"));
            String::new()
        }
    };

    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    Ok((rating, comment))
}

/// Humanized age of a review: an "ago" phrase inside the first day,
/// "yesterday" inside the second, a DD/MM/YY date beyond that.
pub fn relative_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let delta = now - created_at;
    if delta < Duration::days(1) {
        let secs = delta.num_seconds().max(0);
        if secs < 60 {
            plural(secs, "second")
        } else if secs < 3600 {
            plural(delta.num_minutes(), "minute")
        } else {
            plural(delta.num_hours(), "hour")
        }
    } else if delta < Duration::days(2) {
        "yesterday".to_string()
    } else {
        created_at.format("%d/%m/%y").to_string()
    }
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{n} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookPayload;
    use crate::sentiment::{LexiconModel, SentimentLabel};
    use crate::services::BookService;
    use crate::cache::NoopCache;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    struct Fixture {
        books: BookService,
        reviews: ReviewService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let analyzer = Arc::new(SentimentAnalyzer::new(
            Arc::new(LexiconModel::new()),
            StdDuration::from_secs(5),
        ));
        Fixture {
            books: BookService::new(store.clone(), Arc::new(NoopCache), StdDuration::from_secs(60)),
            reviews: ReviewService::new(store, analyzer),
        }
    }

    async fn seed_book(f: &Fixture, isbn: &str) -> ObjectId {
        let view = f
            .books
            .create(
                BookPayload {
                    title: Some("Dune".into()),
                    author: Some("Frank Herbert".into()),
                    description: Some("Desert planet".into()),
                    cover_image: None,
                    isbn_number: Some(isbn.into()),
                },
                ObjectId::new(),
            )
            .await
            .unwrap();
        ObjectId::parse_str(&view.id).unwrap()
    }

    fn payload(rating: f64, comment: &str) -> ReviewPayload {
        ReviewPayload {
            book_id: None,
            rating: Some(rating),
            comment: Some(comment.into()),
        }
    }

    #[tokio::test]
    async fn rating_bounds_are_inclusive() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        let caller = ObjectId::new();

        for ok in [1.0, 3.5, 5.0] {
            assert!(f.reviews.create(&book, payload(ok, "fine"), caller).await.is_ok());
        }
        for bad in [0.9, 5.1, 0.0, -1.0] {
            let err = f
                .reviews
                .create(&book, payload(bad, "fine"), caller)
                .await
                .unwrap_err();
            assert!(matches!(err, ApiError::Validation(_)), "rating {bad} accepted");
        }
    }

    #[tokio::test]
    async fn rating_is_rounded_to_one_decimal() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        let view = f
            .reviews
            .create(&book, payload(4.44, "fine"), ObjectId::new())
            .await
            .unwrap();
        assert_eq!(view.rating, 4.4);
    }

    #[tokio::test]
    async fn sentiment_is_computed_from_comment() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        let caller = ObjectId::new();

        let praise = f
            .reviews
            .create(&book, payload(5.0, "A wonderful, superb masterpiece."), caller)
            .await
            .unwrap();
        assert_eq!(praise.sentiment, SentimentLabel::Positive);

        let pan = f
            .reviews
            .create(&book, payload(1.0, "Dull, tedious and a waste of paper."), caller)
            .await
            .unwrap();
        assert_eq!(pan.sentiment, SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn update_recomputes_sentiment_and_keeps_book() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        let caller = ObjectId::new();

        let created = f
            .reviews
            .create(&book, payload(4.0, "A wonderful read."), caller)
            .await
            .unwrap();
        assert_eq!(created.sentiment, SentimentLabel::Positive);

        let id = ObjectId::parse_str(&created.id).unwrap();
        // no book_id in the payload: the existing book is kept
        let updated = f
            .reviews
            .update(&id, payload(2.0, "On rereading it was terrible."), &caller)
            .await
            .unwrap();
        assert_eq!(updated.sentiment, SentimentLabel::Negative);
        assert_eq!(updated.book_id, book.to_hex());
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn review_on_missing_book_is_not_found() {
        let f = fixture();
        let err = f
            .reviews
            .create(&ObjectId::new(), payload(3.0, "fine"), ObjectId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound("Book")));
    }

    #[tokio::test]
    async fn other_users_reviews_look_nonexistent() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        let owner = ObjectId::new();
        let stranger = ObjectId::new();

        let created = f
            .reviews
            .create(&book, payload(4.0, "fine"), owner)
            .await
            .unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();

        assert!(matches!(
            f.reviews.get(&id, &stranger).await,
            Err(ApiError::NotFound("Review"))
        ));
        assert!(matches!(
            f.reviews.update(&id, payload(1.0, "bad"), &stranger).await,
            Err(ApiError::NotFound("Review"))
        ));
        assert!(matches!(
            f.reviews.delete(&id, &stranger).await,
            Err(ApiError::NotFound("Review"))
        ));

        // the owner still sees it untouched
        let mine = f.reviews.get(&id, &owner).await.unwrap();
        assert_eq!(mine.rating, 4.0);
    }

    #[tokio::test]
    async fn listing_carries_relative_time_and_no_owner_filter() {
        let f = fixture();
        let book = seed_book(&f, "1000000000001").await;
        f.reviews.create(&book, payload(4.0, "fine"), ObjectId::new()).await.unwrap();
        f.reviews.create(&book, payload(2.0, "meh"), ObjectId::new()).await.unwrap();

        let listed = f.reviews.list_for_book(&book).await.unwrap();
        assert_eq!(listed.len(), 2);
        for r in &listed {
            assert!(r.relative_time.ends_with("ago"));
            assert_eq!(r.book.title, "Dune");
        }
    }

    #[test]
    fn relative_time_tiers() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 5).unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 10).unwrap();
        assert_eq!(relative_time(base, now), "5 seconds ago");

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 5).unwrap();
        assert_eq!(relative_time(base, now), "5 minutes ago");

        let now = Utc.with_ymd_and_hms(2024, 1, 1, 3, 0, 5).unwrap();
        assert_eq!(relative_time(base, now), "3 hours ago");

        let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 5).unwrap();
        assert_eq!(relative_time(base, now), "yesterday");

        let now = Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 5).unwrap();
        assert_eq!(relative_time(base, now), "01/01/24");
    }
}
