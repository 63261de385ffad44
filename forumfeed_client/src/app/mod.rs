use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use log::{error, info, warn};

use crate::api::ApiClient;
use crate::cache::FeedCache;
use crate::models::{CreatePostInput, VoteDirection};

mod messages;
mod tasks;

pub use messages::FeedMessage;

pub const DEFAULT_PAGE_SIZE: i64 = 15;

/// Drives the feed from a UI thread. Requests run on worker threads and never
/// wait on each other; their results are folded into the cache by [`FeedSession::poll`].
pub struct FeedSession {
    client: ApiClient,
    tx: Sender<FeedMessage>,
    rx: Receiver<FeedMessage>,
    cache: FeedCache,
    page_size: i64,
    page_in_flight: bool,
    pending: usize,
    status: Option<String>,
}

impl FeedSession {
    pub fn new(client: ApiClient, page_size: i64) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            client,
            tx,
            rx,
            cache: FeedCache::new(),
            page_size,
            page_in_flight: false,
            pending: 0,
            status: None,
        }
    }

    pub fn cache(&self) -> &FeedCache {
        &self.cache
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn is_loading(&self) -> bool {
        self.page_in_flight
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Last error or notice, cleared when read.
    pub fn take_status(&mut self) -> Option<String> {
        self.status.take()
    }

    /// Request the next page. Returns `false` when a page is already on its
    /// way or the feed is exhausted.
    pub fn load_more(&mut self) -> bool {
        if self.page_in_flight {
            return false;
        }
        if self.cache.is_loaded() && !self.cache.has_more() {
            return false;
        }
        let cursor = if self.cache.is_loaded() {
            self.cache.next_cursor()
        } else {
            None
        };
        self.request_page(cursor);
        true
    }

    /// Forget everything and fetch the first page again.
    pub fn reload(&mut self) {
        self.cache.invalidate();
        self.request_page(None);
    }

    pub fn vote(&mut self, post_id: i64, direction: VoteDirection) -> bool {
        let Some(ticket) = self.cache.apply_optimistic_vote(post_id, direction) else {
            return false;
        };
        self.pending += 1;
        tasks::cast_vote(self.client.clone(), self.tx.clone(), ticket);
        true
    }

    pub fn delete_post(&mut self, post_id: i64) {
        self.pending += 1;
        tasks::delete_post(self.client.clone(), self.tx.clone(), post_id);
    }

    pub fn create_post(&mut self, title: impl Into<String>, text: impl Into<String>) {
        let payload = CreatePostInput {
            title: title.into(),
            text: text.into(),
        };
        self.pending += 1;
        tasks::create_post(self.client.clone(), self.tx.clone(), payload);
    }

    /// Apply every result that has arrived so far. Returns how many were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.handle_message(message);
            applied += 1;
        }
        applied
    }

    /// Block until every outstanding request has answered or `timeout` passes.
    pub fn wait_idle(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.pending > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok(message) => self.handle_message(message),
                Err(RecvTimeoutError::Timeout) => return false,
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    pub fn handle_message(&mut self, message: FeedMessage) {
        self.pending = self.pending.saturating_sub(1);
        match message {
            FeedMessage::PageLoaded {
                generation,
                cursor,
                result,
            } => {
                if generation != self.cache.generation() {
                    info!("dropping page for stale feed generation {generation}");
                    return;
                }
                self.page_in_flight = false;
                match result {
                    Ok(page) => self.cache.apply_page(page),
                    Err(err) => {
                        warn!("failed to load feed page after {cursor:?}: {err}");
                        self.status = Some(format!("Failed to load feed: {err}"));
                    }
                }
            }
            FeedMessage::VoteFinished { ticket, result } => match result {
                Ok(outcome) => self.cache.confirm_vote(&ticket, outcome),
                Err(err) => {
                    warn!("vote on post {} failed: {err}", ticket.post_id);
                    self.cache.rollback_vote(&ticket);
                    self.status = Some(format!("Vote failed: {err}"));
                }
            },
            FeedMessage::PostDeleted { post_id, result } => match result {
                Ok(()) => {
                    self.cache.evict(post_id);
                }
                Err(err) => {
                    error!("failed to delete post {post_id}: {err}");
                    self.status = Some(format!("Delete failed: {err}"));
                }
            },
            FeedMessage::PostCreated(result) => match result {
                Ok(post) => {
                    info!("created post {}", post.id);
                    self.reload();
                }
                Err(err) => {
                    error!("failed to create post: {err}");
                    self.status = Some(format!("Create failed: {err}"));
                }
            },
        }
    }

    fn request_page(&mut self, cursor: Option<String>) {
        self.page_in_flight = true;
        self.pending += 1;
        tasks::load_page(
            self.client.clone(),
            self.tx.clone(),
            self.cache.generation(),
            self.page_size,
            cursor,
        );
    }
}
