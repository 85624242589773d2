pub mod books;
pub mod reviews;

pub use books::BookService;
pub use reviews::ReviewService;
