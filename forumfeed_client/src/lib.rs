pub mod api;
pub mod app;
pub mod cache;
pub mod models;

pub use api::ApiClient;
pub use app::FeedSession;
pub use cache::{merge_page, FeedCache, VoteTicket};
