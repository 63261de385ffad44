//! Vote ledger transitions and the post score aggregate they maintain.
//!
//! Each (user, post) pair holds at most one ledger entry. Casting a vote moves
//! that entry through one of three transitions and applies the matching delta
//! to the post's stored score in the same write transaction, so the score is
//! always the sum of the ledger entries for the post.

use crate::config::VoteConfig;
use crate::database::models::{ScoreDrift, VoteRecord};
use crate::database::repositories::{PostRepository, UserRepository, VoteRepository};
use crate::database::Database;
use crate::error::{from_repository, ForumError, ForumResult};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

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

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(VoteDirection::Up),
            -1 => Some(VoteDirection::Down),
            _ => None,
        }
    }
}

impl TryFrom<i64> for VoteDirection {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        VoteDirection::from_value(value)
            .ok_or_else(|| format!("vote direction must be 1 or -1, got {value}"))
    }
}

impl From<VoteDirection> for i64 {
    fn from(direction: VoteDirection) -> Self {
        direction.value()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteTransition {
    /// No prior entry: the entry is created.
    Cast,
    /// The entry already holds the requested direction.
    Unchanged,
    /// The entry held the opposite direction and is overwritten.
    Flip,
}

impl VoteTransition {
    pub fn plan(existing: Option<VoteDirection>, requested: VoteDirection) -> Self {
        match existing {
            None => VoteTransition::Cast,
            Some(current) if current == requested => VoteTransition::Unchanged,
            Some(_) => VoteTransition::Flip,
        }
    }

    /// Score change caused by moving the ledger entry to `requested`.
    pub fn score_delta(self, requested: VoteDirection) -> i64 {
        match self {
            VoteTransition::Cast => requested.value(),
            VoteTransition::Unchanged => 0,
            VoteTransition::Flip => 2 * requested.value(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteOutcome {
    pub post_id: i64,
    /// Aggregate score read inside the transaction that applied the vote.
    pub score: i64,
    pub vote_direction: VoteDirection,
    pub delta: i64,
    pub transition: VoteTransition,
}

#[derive(Clone)]
pub struct VoteService {
    database: Database,
    config: VoteConfig,
}

impl VoteService {
    pub fn new(database: Database, config: VoteConfig) -> Self {
        Self { database, config }
    }

    /// Records `direction` as `user_id`'s vote on `post_id`.
    ///
    /// Writer contention is retried here up to `max_attempts`; callers only
    /// see `StorageConflict` once the budget is spent.
    pub fn cast_vote(
        &self,
        user_id: i64,
        post_id: i64,
        direction: VoteDirection,
    ) -> ForumResult<VoteOutcome> {
        let outcome = with_conflict_retry(&self.config, || {
            self.apply_transition(user_id, post_id, direction)
        })?;
        tracing::debug!(
            user_id,
            post_id,
            direction = direction.value(),
            delta = outcome.delta,
            score = outcome.score,
            "vote applied"
        );
        Ok(outcome)
    }

    /// Posts whose stored score disagrees with their ledger entries.
    pub fn audit(&self) -> ForumResult<Vec<ScoreDrift>> {
        self.database
            .with_repositories(|repos| repos.posts().find_score_drift())
            .map_err(from_repository)
    }

    fn apply_transition(
        &self,
        user_id: i64,
        post_id: i64,
        direction: VoteDirection,
    ) -> ForumResult<VoteOutcome> {
        self.database.with_write_transaction(|repos| {
            if repos.users().get(user_id).map_err(from_repository)?.is_none() {
                return Err(ForumError::AuthenticationRequired);
            }
            if repos.posts().get(post_id).map_err(from_repository)?.is_none() {
                return Err(ForumError::post_not_found(post_id));
            }

            let existing = match repos.votes().get(user_id, post_id).map_err(from_repository)? {
                Some(record) => Some(VoteDirection::from_value(record.value).ok_or_else(|| {
                    anyhow!("ledger entry for post {post_id} holds {}", record.value)
                })?),
                None => None,
            };
            let transition = VoteTransition::plan(existing, direction);
            let delta = transition.score_delta(direction);

            if transition != VoteTransition::Unchanged {
                repos
                    .votes()
                    .upsert(&VoteRecord {
                        user_id,
                        post_id,
                        value: direction.value(),
                    })
                    .map_err(from_repository)?;
                repos
                    .posts()
                    .add_points(post_id, delta)
                    .map_err(from_repository)?;
            }

            let score = repos
                .posts()
                .points(post_id)
                .map_err(from_repository)?
                .ok_or_else(|| ForumError::post_not_found(post_id))?;

            Ok(VoteOutcome {
                post_id,
                score,
                vote_direction: direction,
                delta,
                transition,
            })
        })
    }
}

/// Re-runs `op` while it fails with a storage conflict, sleeping a little
/// longer after each attempt.
pub(crate) fn with_conflict_retry<T, F>(config: &VoteConfig, mut op: F) -> ForumResult<T>
where
    F: FnMut() -> ForumResult<T>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Err(err) if err.is_conflict() => {
                if attempt >= max_attempts {
                    tracing::warn!(attempts = attempt, "vote transition gave up on storage conflict");
                    return Err(ForumError::StorageConflict { attempts: attempt });
                }
                tracing::warn!(attempt, "storage conflict during vote transition, retrying");
                std::thread::sleep(config.retry_backoff * attempt);
                attempt += 1;
            }
            other => return other,
        }
    }
}
