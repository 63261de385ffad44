use crate::cache::VoteTicket;
use crate::models::{FeedPage, FeedPost, VoteOutcome};

pub enum FeedMessage {
    PageLoaded {
        generation: u64,
        cursor: Option<String>,
        result: Result<FeedPage, anyhow::Error>,
    },
    VoteFinished {
        ticket: VoteTicket,
        result: Result<VoteOutcome, anyhow::Error>,
    },
    PostDeleted {
        post_id: i64,
        result: Result<(), anyhow::Error>,
    },
    PostCreated(Result<FeedPost, anyhow::Error>),
}
