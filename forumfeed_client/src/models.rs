use serde::{Deserialize, Serialize};

/// Direction of a single vote as it travels over the wire (`1` / `-1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn value(self) -> i64 {
        match self {
            VoteDirection::Up => 1,
            VoteDirection::Down => -1,
        }
    }

    /// Score change when moving from `previous` to `self`: a fresh vote moves
    /// the score by one, switching sides moves it by two.
    pub fn swing_from(self, previous: Option<VoteDirection>) -> i64 {
        match previous {
            Some(prev) if prev == self => 0,
            Some(_) => 2 * self.value(),
            None => self.value(),
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VoteDirection::Up),
            -1 => Ok(VoteDirection::Down),
            other => Err(format!("invalid vote direction {other}")),
        }
    }
}

impl From<VoteDirection> for i64 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPost {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub text_snippet: String,
    #[serde(default)]
    pub text: Option<String>,
    pub score: i64,
    #[serde(default)]
    pub vote_direction: Option<VoteDirection>,
    pub author_id: i64,
    pub author_username: String,
}

impl FeedPost {
    /// Composite `<millis>:<id>` cursor the server accepts to continue after this post.
    pub fn cursor(&self) -> String {
        format!("{}:{}", self.created_at, self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    #[serde(default)]
    pub items: Vec<FeedPost>,
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CreatePostInput {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub post_id: i64,
    pub score: i64,
    pub vote_direction: VoteDirection,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct VoteRequest {
    pub direction: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeleteResponse {
    pub deleted: bool,
}
