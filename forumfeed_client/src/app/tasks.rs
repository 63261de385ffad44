use std::sync::mpsc::Sender;
use std::thread;

use log::error;

use crate::api::ApiClient;
use crate::cache::VoteTicket;
use crate::models::CreatePostInput;

use super::messages::FeedMessage;

pub fn load_page(
    client: ApiClient,
    tx: Sender<FeedMessage>,
    generation: u64,
    limit: i64,
    cursor: Option<String>,
) {
    thread::spawn(move || {
        let result = client.get_feed(limit, cursor.as_deref());
        let message = FeedMessage::PageLoaded {
            generation,
            cursor,
            result,
        };
        if tx.send(message).is_err() {
            error!("failed to send PageLoaded message");
        }
    });
}

pub fn cast_vote(client: ApiClient, tx: Sender<FeedMessage>, ticket: VoteTicket) {
    thread::spawn(move || {
        let result = client.cast_vote(ticket.post_id, ticket.direction);
        if tx.send(FeedMessage::VoteFinished { ticket, result }).is_err() {
            error!("failed to send VoteFinished message");
        }
    });
}

pub fn delete_post(client: ApiClient, tx: Sender<FeedMessage>, post_id: i64) {
    thread::spawn(move || {
        let result = client.delete_post(post_id);
        if tx.send(FeedMessage::PostDeleted { post_id, result }).is_err() {
            error!("failed to send PostDeleted message");
        }
    });
}

pub fn create_post(client: ApiClient, tx: Sender<FeedMessage>, payload: CreatePostInput) {
    thread::spawn(move || {
        let result = client.create_post(&payload);
        if tx.send(FeedMessage::PostCreated(result)).is_err() {
            error!("failed to send PostCreated message");
        }
    });
}
