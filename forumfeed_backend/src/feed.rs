//! Cursor-paginated, newest-first post feed.
//!
//! Pages are ordered by `(created_at DESC, id DESC)`. The cursor names the
//! last post of the previous page, and the next page starts strictly after
//! it, so walking the cursor chain visits every post exactly once while
//! creation timestamps stay immutable.

use crate::config::FeedConfig;
use crate::database::models::{FeedPosition, FeedRow};
use crate::database::repositories::PostRepository;
use crate::database::Database;
use crate::error::{from_repository, ForumError, ForumResult};
use crate::utils::text_snippet;
use crate::votes::VoteDirection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque pagination token: `"<created_at millis>:<id>"`, or a bare
/// `"<created_at millis>"` meaning "strictly older than this instant".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor(FeedPosition);

impl FeedCursor {
    pub fn after(created_at: i64, id: i64) -> Self {
        Self(FeedPosition {
            created_at,
            id: Some(id),
        })
    }

    pub fn before_time(created_at: i64) -> Self {
        Self(FeedPosition {
            created_at,
            id: None,
        })
    }

    pub fn position(&self) -> FeedPosition {
        self.0
    }
}

impl fmt::Display for FeedCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.id {
            Some(id) => write!(f, "{}:{}", self.0.created_at, id),
            None => write!(f, "{}", self.0.created_at),
        }
    }
}

impl FromStr for FeedCursor {
    type Err = ForumError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ForumError::validation(format!("malformed feed cursor {raw:?}"));
        let raw = raw.trim();
        match raw.split_once(':') {
            Some((time, id)) => {
                let created_at = time.parse().map_err(|_| invalid())?;
                let id = id.parse().map_err(|_| invalid())?;
                Ok(FeedCursor::after(created_at, id))
            }
            None => raw
                .parse()
                .map(FeedCursor::before_time)
                .map_err(|_| invalid()),
        }
    }
}

/// A post as the UI sees it: stored columns plus the values derived per
/// request (live score, requester's vote, snippet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub title: String,
    pub text_snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub score: i64,
    pub vote_direction: Option<VoteDirection>,
    pub author_id: i64,
    pub author_username: String,
}

impl PostView {
    pub(crate) fn from_row(row: FeedRow, include_text: bool) -> Self {
        let snippet = text_snippet(&row.post.text);
        Self {
            id: row.post.id,
            created_at: row.post.created_at,
            updated_at: row.post.updated_at,
            title: row.post.title,
            text_snippet: snippet,
            text: include_text.then_some(row.post.text),
            score: row.post.points,
            vote_direction: row.viewer_vote.and_then(VoteDirection::from_value),
            author_id: row.post.author_id,
            author_username: row.author_username,
        }
    }

    pub fn cursor(&self) -> FeedCursor {
        FeedCursor::after(self.created_at, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<PostView>,
    pub has_more: bool,
    /// Cursor of the last item, ready to request the following page.
    pub next_cursor: Option<String>,
}

#[derive(Clone)]
pub struct FeedService {
    database: Database,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(database: Database, config: FeedConfig) -> Self {
        Self { database, config }
    }

    pub fn get_feed(
        &self,
        viewer: Option<i64>,
        limit: Option<i64>,
        cursor: Option<&str>,
    ) -> ForumResult<FeedPage> {
        let cursor = cursor
            .filter(|raw| !raw.trim().is_empty())
            .map(FeedCursor::from_str)
            .transpose()?;
        let limit = self.config.clamp_limit(limit);
        // One extra row tells us whether another page exists.
        let fetch = limit + 1;

        let mut rows = self
            .database
            .with_repositories(|repos| {
                repos
                    .posts()
                    .page(viewer, cursor.map(|c| c.position()), fetch)
            })
            .map_err(from_repository)?;

        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let items: Vec<PostView> = rows
            .into_iter()
            .map(|row| PostView::from_row(row, false))
            .collect();
        let next_cursor = items.last().map(|item| item.cursor().to_string());

        tracing::debug!(
            limit,
            returned = items.len(),
            has_more,
            cursor = ?cursor.map(|c| c.to_string()),
            "feed page served"
        );
        Ok(FeedPage {
            items,
            has_more,
            next_cursor,
        })
    }

    pub fn get_post(&self, viewer: Option<i64>, post_id: i64) -> ForumResult<PostView> {
        self.database
            .with_repositories(|repos| repos.posts().get_row(post_id, viewer))
            .map_err(from_repository)?
            .map(|row| PostView::from_row(row, true))
            .ok_or_else(|| ForumError::post_not_found(post_id))
    }
}
