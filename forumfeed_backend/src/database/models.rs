use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostRecord {
    pub title: String,
    pub text: String,
    pub author_id: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: i64,
    pub title: String,
    pub text: String,
    /// Denormalized sum of every vote cast on the post.
    pub points: i64,
    pub author_id: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One row of the vote ledger. `value` is always `1` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub user_id: i64,
    pub post_id: i64,
    pub value: i64,
}

/// A post joined with its author and, when a viewer is known, the viewer's
/// ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRow {
    pub post: PostRecord,
    pub author_username: String,
    pub viewer_vote: Option<i64>,
}

/// Position in the feed ordering `(created_at DESC, id DESC)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedPosition {
    pub created_at: i64,
    /// Tie-breaker for posts sharing a timestamp. `None` means "strictly older
    /// than `created_at`".
    pub id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDrift {
    pub post_id: i64,
    pub stored_points: i64,
    pub ledger_sum: i64,
}
