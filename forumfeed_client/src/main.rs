use std::io::{self, BufRead, Write};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::info;

use forumfeed_client::app::DEFAULT_PAGE_SIZE;
use forumfeed_client::models::{FeedPost, VoteDirection};
use forumfeed_client::{ApiClient, FeedSession};

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
const REQUEST_WAIT: Duration = Duration::from_secs(20);

fn main() -> Result<()> {
    env_logger::init();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("FORUMFEED_API_URL").ok())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());
    let mut client = ApiClient::new(base_url)?;
    if let Ok(raw) = std::env::var("FORUMFEED_USER_ID") {
        let id = raw
            .trim()
            .parse::<i64>()
            .context("FORUMFEED_USER_ID must be a number")?;
        client.set_user_id(Some(id));
    }
    info!(
        "browsing feed at {} as {:?}",
        client.base_url(),
        client.user_id()
    );

    let mut session = FeedSession::new(client, DEFAULT_PAGE_SIZE);
    session.load_more();
    settle(&mut session);
    render(&session);
    print_help();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        print!("feed> ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        let (command, rest) = line.split_once(' ').unwrap_or((line, ""));
        match command {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                print_help();
                continue;
            }
            "more" => {
                if !session.load_more() {
                    println!("No more posts.");
                    continue;
                }
            }
            "reload" => session.reload(),
            "up" | "down" => {
                let Some(post_id) = parse_id(rest) else {
                    continue;
                };
                let direction = if command == "up" {
                    VoteDirection::Up
                } else {
                    VoteDirection::Down
                };
                if !session.vote(post_id, direction) {
                    println!("Nothing to do for post {post_id}.");
                    continue;
                }
                render(&session);
            }
            "rm" => {
                let Some(post_id) = parse_id(rest) else {
                    continue;
                };
                session.delete_post(post_id);
            }
            "post" => {
                let (title, text) = rest.split_once(' ').unwrap_or((rest, ""));
                if title.is_empty() {
                    println!("Usage: post <title> <text>");
                    continue;
                }
                session.create_post(title, text);
            }
            other => {
                println!("Unknown command '{other}'. Type 'help'.");
                continue;
            }
        }
        settle(&mut session);
        render(&session);
    }
    Ok(())
}

fn settle(session: &mut FeedSession) {
    if !session.wait_idle(REQUEST_WAIT) {
        println!("Still waiting on the server; results will show up later.");
    }
    if let Some(status) = session.take_status() {
        println!("{status}");
    }
}

fn render(session: &FeedSession) {
    let posts = session.cache().posts();
    if posts.is_empty() {
        println!("(feed is empty)");
    }
    for post in posts {
        println!("{}", format_post(post));
    }
    if session.cache().has_more() {
        println!("-- 'more' for older posts --");
    }
}

fn format_post(post: &FeedPost) -> String {
    let marker = match post.vote_direction {
        Some(VoteDirection::Up) => "^",
        Some(VoteDirection::Down) => "v",
        None => " ",
    };
    let when = DateTime::<Utc>::from_timestamp_millis(post.created_at)
        .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    format!(
        "[{:>4}]{} #{} {} ({} {})\n        {}",
        post.score, marker, post.id, post.title, post.author_username, when, post.text_snippet
    )
}

fn parse_id(raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) => Some(id),
        Err(_) => {
            println!("Expected a numeric post id.");
            None
        }
    }
}

fn print_help() {
    println!("Commands: more | reload | up <id> | down <id> | rm <id> | post <title> <text> | quit");
}
