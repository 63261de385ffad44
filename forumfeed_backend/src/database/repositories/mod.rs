mod posts;
mod users;
mod votes;

use super::models::{
    FeedPosition, FeedRow, NewPostRecord, PostRecord, ScoreDrift, UserRecord, VoteRecord,
};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, username: &str, created_at: i64) -> Result<UserRecord>;
    fn get(&self, id: i64) -> Result<Option<UserRecord>>;
    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>>;
}

pub trait PostRepository {
    fn create(&self, record: &NewPostRecord) -> Result<PostRecord>;
    fn get(&self, id: i64) -> Result<Option<PostRecord>>;
    /// Fetches one post annotated the same way as a feed row.
    fn get_row(&self, id: i64, viewer: Option<i64>) -> Result<Option<FeedRow>>;
    fn update_content(&self, id: i64, title: &str, text: &str, updated_at: i64) -> Result<()>;
    /// Returns `false` when no post had that id.
    fn delete(&self, id: i64) -> Result<bool>;
    /// Applies `delta` relative to the stored aggregate. Returns `false` when
    /// the post does not exist.
    fn add_points(&self, id: i64, delta: i64) -> Result<bool>;
    fn points(&self, id: i64) -> Result<Option<i64>>;
    /// Newest-first rows strictly after `after`, at most `fetch` of them.
    fn page(
        &self,
        viewer: Option<i64>,
        after: Option<FeedPosition>,
        fetch: usize,
    ) -> Result<Vec<FeedRow>>;
    fn find_score_drift(&self) -> Result<Vec<ScoreDrift>>;
}

pub trait VoteRepository {
    fn get(&self, user_id: i64, post_id: i64) -> Result<Option<VoteRecord>>;
    fn upsert(&self, record: &VoteRecord) -> Result<()>;
    fn sum_for_post(&self, post_id: i64) -> Result<i64>;
    fn list_for_post(&self, post_id: i64) -> Result<Vec<VoteRecord>>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn votes(&self) -> impl VoteRepository + '_ {
        votes::SqliteVoteRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}
