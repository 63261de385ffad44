//! Client-side feed cache.
//!
//! There is one canonical feed list regardless of which `limit` or `cursor`
//! produced each page. Pages are appended, never replace what is already
//! shown, and a post id appears at most once.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::models::{FeedPage, FeedPost, VoteDirection, VoteOutcome};

/// Merge an incoming page behind the existing one, dropping incoming items
/// whose id is already present. Pagination metadata comes from `incoming`.
///
/// Standalone list-level form of the rule [`FeedCache::apply_page`] applies
/// to its keyed store, for callers that hold plain pages.
pub fn merge_page(existing: &FeedPage, incoming: FeedPage) -> FeedPage {
    let seen: HashSet<i64> = existing.items.iter().map(|post| post.id).collect();
    let mut items = existing.items.clone();
    items.extend(incoming.items.into_iter().filter(|post| !seen.contains(&post.id)));
    FeedPage {
        items,
        has_more: incoming.has_more,
        next_cursor: incoming.next_cursor,
    }
}

/// Handle for one optimistic vote, returned to the caller so the server's
/// answer can be matched back to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteTicket {
    pub post_id: i64,
    pub direction: VoteDirection,
    seq: u64,
    generation: u64,
}

/// Votes still in flight for one post, plus the last value the server vouched
/// for. The slot is settled to `score`/`direction` once `outstanding` drains.
#[derive(Debug)]
struct PendingVotes {
    outstanding: HashSet<u64>,
    score: i64,
    direction: Option<VoteDirection>,
    /// Ticket whose confirmation produced the values above; 0 for a snapshot.
    confirmed_seq: u64,
}

#[derive(Debug, Default)]
pub struct FeedCache {
    entities: HashMap<i64, FeedPost>,
    index: Vec<i64>,
    indexed: HashSet<i64>,
    /// Deleted ids. Never written again until the next invalidation.
    evicted: HashSet<i64>,
    pending_votes: HashMap<i64, PendingVotes>,
    has_more: bool,
    next_cursor: Option<String>,
    loaded: bool,
    generation: u64,
    next_seq: u64,
}

impl FeedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Incremented by [`FeedCache::invalidate`]; results requested under an
    /// older generation must be dropped.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Live posts in feed order. Evicted slots are skipped.
    pub fn posts(&self) -> Vec<&FeedPost> {
        self.index
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect()
    }

    pub fn get(&self, post_id: i64) -> Option<&FeedPost> {
        self.entities.get(&post_id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Cursor to request the page after the last live item.
    pub fn next_cursor(&self) -> Option<String> {
        self.index
            .iter()
            .rev()
            .find_map(|id| self.entities.get(id))
            .map(FeedPost::cursor)
            .or_else(|| self.next_cursor.clone())
    }

    /// Authoritative write of a fetched page. Every item overwrites its slot,
    /// new ids are appended to the list. Evicted ids stay evicted.
    pub fn apply_page(&mut self, page: FeedPage) {
        for post in page.items {
            let id = post.id;
            if self.evicted.contains(&id) {
                debug!("ignoring evicted post {id} from a stale page");
                continue;
            }
            self.write_authoritative(post);
            if self.indexed.insert(id) {
                self.index.push(id);
            }
        }
        self.has_more = page.has_more;
        self.next_cursor = page.next_cursor;
        self.loaded = true;
    }

    /// Authoritative write of a single post outside of paging, without
    /// changing its position in the list.
    pub fn apply_post(&mut self, post: FeedPost) {
        if self.entities.contains_key(&post.id) {
            self.write_authoritative(post);
        }
    }

    /// Apply the expected result of a vote before the server confirms it.
    /// Returns `None` when the post is not cached or already carries `direction`.
    pub fn apply_optimistic_vote(
        &mut self,
        post_id: i64,
        direction: VoteDirection,
    ) -> Option<VoteTicket> {
        let post = self.entities.get_mut(&post_id)?;
        let previous_direction = post.vote_direction;
        if previous_direction == Some(direction) {
            return None;
        }
        self.next_seq += 1;
        let seq = self.next_seq;
        let pending = self
            .pending_votes
            .entry(post_id)
            .or_insert_with(|| PendingVotes {
                outstanding: HashSet::new(),
                score: post.score,
                direction: previous_direction,
                confirmed_seq: 0,
            });
        pending.outstanding.insert(seq);
        post.score += direction.swing_from(previous_direction);
        post.vote_direction = Some(direction);
        Some(VoteTicket {
            post_id,
            direction,
            seq,
            generation: self.generation,
        })
    }

    /// Record the server's answer. The slot shows it once no other vote on the
    /// post is still in flight; a later ticket's answer outranks an earlier one.
    pub fn confirm_vote(&mut self, ticket: &VoteTicket, outcome: VoteOutcome) {
        if ticket.generation != self.generation {
            return;
        }
        let Some(pending) = self.pending_votes.get_mut(&ticket.post_id) else {
            return;
        };
        if !pending.outstanding.remove(&ticket.seq) {
            return;
        }
        if ticket.seq > pending.confirmed_seq {
            pending.score = outcome.score;
            pending.direction = Some(outcome.vote_direction);
            pending.confirmed_seq = ticket.seq;
        }
        self.settle(ticket.post_id);
    }

    /// Drop a failed optimistic vote. Once the last vote on the post has
    /// answered, the slot returns to the last server-vouched value. Returns
    /// `true` when the visible post changed.
    pub fn rollback_vote(&mut self, ticket: &VoteTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let Some(pending) = self.pending_votes.get_mut(&ticket.post_id) else {
            return false;
        };
        if !pending.outstanding.remove(&ticket.seq) {
            return false;
        }
        self.settle(ticket.post_id)
    }

    /// Remove a deleted post. Its list slot stays but is no longer rendered,
    /// and later pages cannot bring it back.
    pub fn evict(&mut self, post_id: i64) -> bool {
        self.evicted.insert(post_id);
        self.pending_votes.remove(&post_id);
        self.entities.remove(&post_id).is_some()
    }

    /// Drop the list and its pagination metadata so the first page is
    /// fetched again.
    pub fn invalidate(&mut self) {
        self.entities.clear();
        self.index.clear();
        self.indexed.clear();
        self.evicted.clear();
        self.pending_votes.clear();
        self.has_more = false;
        self.next_cursor = None;
        self.loaded = false;
        self.generation += 1;
    }

    fn settle(&mut self, post_id: i64) -> bool {
        let drained = self
            .pending_votes
            .get(&post_id)
            .is_some_and(|pending| pending.outstanding.is_empty());
        if !drained {
            return false;
        }
        let Some(pending) = self.pending_votes.remove(&post_id) else {
            return false;
        };
        let Some(post) = self.entities.get_mut(&post_id) else {
            return false;
        };
        let changed = post.score != pending.score || post.vote_direction != pending.direction;
        post.score = pending.score;
        post.vote_direction = pending.direction;
        changed
    }

    fn write_authoritative(&mut self, post: FeedPost) {
        if let Some(pending) = self.pending_votes.get_mut(&post.id) {
            pending.score = post.score;
            pending.direction = post.vote_direction;
        }
        self.entities.insert(post.id, post);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn post(id: i64, created_at: i64, score: i64) -> FeedPost {
        FeedPost {
            id,
            created_at,
            updated_at: created_at,
            title: format!("post {id}"),
            text_snippet: String::new(),
            text: None,
            score,
            vote_direction: None,
            author_id: 1,
            author_username: "ada".into(),
        }
    }

    fn page(items: Vec<FeedPost>, has_more: bool) -> FeedPage {
        let next_cursor = items.last().map(FeedPost::cursor);
        FeedPage {
            items,
            has_more,
            next_cursor,
        }
    }

    fn ids(cache: &FeedCache) -> Vec<i64> {
        cache.posts().iter().map(|post| post.id).collect()
    }

    #[test]
    fn merge_appends_and_dedupes_by_id() {
        let existing = page(vec![post(5, 50, 0), post(4, 40, 0)], true);
        let incoming = page(vec![post(4, 40, 9), post(3, 30, 0)], false);
        let merged = merge_page(&existing, incoming);
        let merged_ids: Vec<i64> = merged.items.iter().map(|p| p.id).collect();
        assert_eq!(merged_ids, vec![5, 4, 3]);
        assert!(!merged.has_more);
        assert_eq!(merged.next_cursor.as_deref(), Some("30:3"));
    }

    #[test]
    fn pages_accumulate_into_one_list() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(5, 50, 0), post(4, 40, 0)], true));
        cache.apply_page(page(vec![post(4, 40, 2), post(3, 30, 0)], false));
        assert_eq!(ids(&cache), vec![5, 4, 3]);
        assert_eq!(cache.get(4).map(|p| p.score), Some(2));
        assert!(!cache.has_more());
        assert_eq!(cache.next_cursor().as_deref(), Some("30:3"));
    }

    #[test]
    fn optimistic_vote_and_confirm() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(1, 10, 4)], false));

        let ticket = cache
            .apply_optimistic_vote(1, VoteDirection::Up)
            .expect("ticket");
        assert_eq!(cache.get(1).map(|p| p.score), Some(5));
        assert!(cache.apply_optimistic_vote(1, VoteDirection::Up).is_none());

        cache.confirm_vote(
            &ticket,
            VoteOutcome {
                post_id: 1,
                score: 7,
                vote_direction: VoteDirection::Up,
            },
        );
        assert_eq!(cache.get(1).map(|p| p.score), Some(7));
        assert!(!cache.rollback_vote(&ticket));
        assert_eq!(cache.get(1).map(|p| p.score), Some(7));
    }

    #[test]
    fn flip_swings_by_two_and_rolls_back() {
        let mut cache = FeedCache::new();
        let mut voted = post(1, 10, 3);
        voted.vote_direction = Some(VoteDirection::Up);
        cache.apply_page(page(vec![voted], false));

        let ticket = cache
            .apply_optimistic_vote(1, VoteDirection::Down)
            .expect("ticket");
        assert_eq!(cache.get(1).map(|p| p.score), Some(1));

        assert!(cache.rollback_vote(&ticket));
        let restored = cache.get(1).expect("cached");
        assert_eq!(restored.score, 3);
        assert_eq!(restored.vote_direction, Some(VoteDirection::Up));
    }

    #[test]
    fn rollback_skipped_after_authoritative_refresh() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(1, 10, 0)], true));
        let ticket = cache
            .apply_optimistic_vote(1, VoteDirection::Up)
            .expect("ticket");

        let mut fresh = post(1, 10, 6);
        fresh.vote_direction = Some(VoteDirection::Up);
        cache.apply_post(fresh);

        assert!(!cache.rollback_vote(&ticket));
        assert_eq!(cache.get(1).map(|p| p.score), Some(6));
    }

    #[test]
    fn vote_on_uncached_post_is_ignored() {
        let mut cache = FeedCache::new();
        assert!(cache.apply_optimistic_vote(42, VoteDirection::Down).is_none());
    }

    #[test]
    fn eviction_hides_post_but_keeps_cursor_usable() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(3, 30, 0), post(2, 20, 0), post(1, 10, 0)], true));
        assert!(cache.evict(1));
        assert!(!cache.evict(1));
        assert_eq!(ids(&cache), vec![3, 2]);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.next_cursor().as_deref(), Some("20:2"));

        cache.apply_page(page(vec![post(0, 5, 0)], false));
        assert_eq!(ids(&cache), vec![3, 2, 0]);
    }

    #[test]
    fn stale_page_does_not_revive_evicted_post() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(3, 30, 0), post(2, 20, 0), post(1, 10, 0)], true));
        assert!(cache.evict(2));

        // Fetched before the delete landed.
        cache.apply_page(page(vec![post(2, 20, 4), post(1, 10, 1)], false));
        cache.apply_post(post(2, 20, 5));

        assert_eq!(ids(&cache), vec![3, 1]);
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.get(1).map(|p| p.score), Some(1));
    }

    #[test]
    fn overlapping_failed_votes_restore_original_state() {
        for first_failure in [0, 1] {
            let mut cache = FeedCache::new();
            cache.apply_page(page(vec![post(1, 10, 0)], false));
            let up = cache
                .apply_optimistic_vote(1, VoteDirection::Up)
                .expect("up ticket");
            let down = cache
                .apply_optimistic_vote(1, VoteDirection::Down)
                .expect("down ticket");
            assert_eq!(cache.get(1).map(|p| p.score), Some(-1));

            let (early, late) = if first_failure == 0 {
                (&up, &down)
            } else {
                (&down, &up)
            };
            assert!(!cache.rollback_vote(early));
            assert_eq!(cache.get(1).map(|p| p.score), Some(-1));
            assert!(cache.rollback_vote(late));

            let restored = cache.get(1).expect("cached");
            assert_eq!(restored.score, 0);
            assert_eq!(restored.vote_direction, None);
        }
    }

    #[test]
    fn failed_vote_after_confirmed_one_settles_on_confirmed_value() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(1, 10, 2)], false));
        let up = cache
            .apply_optimistic_vote(1, VoteDirection::Up)
            .expect("up ticket");
        let down = cache
            .apply_optimistic_vote(1, VoteDirection::Down)
            .expect("down ticket");

        cache.confirm_vote(
            &up,
            VoteOutcome {
                post_id: 1,
                score: 3,
                vote_direction: VoteDirection::Up,
            },
        );
        // The later vote is still in flight, so it keeps showing.
        assert_eq!(cache.get(1).map(|p| p.vote_direction), Some(Some(VoteDirection::Down)));

        cache.rollback_vote(&down);
        let settled = cache.get(1).expect("cached");
        assert_eq!(settled.score, 3);
        assert_eq!(settled.vote_direction, Some(VoteDirection::Up));
    }

    #[test]
    fn later_confirmation_outranks_earlier_one_arriving_last() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(1, 10, 0)], false));
        let up = cache
            .apply_optimistic_vote(1, VoteDirection::Up)
            .expect("up ticket");
        let down = cache
            .apply_optimistic_vote(1, VoteDirection::Down)
            .expect("down ticket");

        cache.confirm_vote(
            &down,
            VoteOutcome {
                post_id: 1,
                score: -1,
                vote_direction: VoteDirection::Down,
            },
        );
        cache.confirm_vote(
            &up,
            VoteOutcome {
                post_id: 1,
                score: 1,
                vote_direction: VoteDirection::Up,
            },
        );
        let settled = cache.get(1).expect("cached");
        assert_eq!(settled.score, -1);
        assert_eq!(settled.vote_direction, Some(VoteDirection::Down));
    }

    #[test]
    fn invalidate_resets_list_and_generation() {
        let mut cache = FeedCache::new();
        cache.apply_page(page(vec![post(2, 20, 0)], true));
        let ticket = cache
            .apply_optimistic_vote(2, VoteDirection::Up)
            .expect("ticket");
        let before = cache.generation();

        cache.invalidate();
        assert!(cache.is_empty());
        assert!(!cache.is_loaded());
        assert!(!cache.has_more());
        assert_eq!(cache.next_cursor(), None);
        assert_eq!(cache.generation(), before + 1);

        cache.apply_page(page(vec![post(2, 20, 1)], false));
        assert!(!cache.rollback_vote(&ticket));
        assert_eq!(cache.get(2).map(|p| p.score), Some(1));
    }
}
