use crate::config::ForumConfig;
use crate::database::Database;
use crate::error::ForumResult;
use crate::feed::{FeedPage, FeedService};
use crate::posts::{CreatePostInput, PostService};
use crate::users::UserService;
use crate::votes::{VoteDirection, VoteService};
use anyhow::{anyhow, Result};
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Run the interactive CLI for posting, voting, and paging through the feed.
pub async fn run_cli(config: ForumConfig, database: Database) -> Result<()> {
    let mut session = CliSession {
        feed: FeedService::new(database.clone(), config.feed),
        posts: PostService::new(database.clone()),
        votes: VoteService::new(database.clone(), config.votes),
        users: UserService::new(database),
        page_size: config.feed.default_page_size,
        user_id: None,
        next_cursor: None,
    };

    println!("Forumfeed CLI ready. Type 'help' for a list of commands.");

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        print!("forumfeed> ");
        io::stdout().flush()?;

        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            println!("Exiting");
            break;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let tokens = match shell_words::split(trimmed) {
            Ok(tokens) if !tokens.is_empty() => tokens,
            Ok(_) => continue,
            Err(err) => {
                println!("Unable to parse command: {err}");
                continue;
            }
        };

        match session.handle_command(&tokens) {
            Ok(LoopAction::Continue) => {}
            Ok(LoopAction::Exit) => break,
            Err(err) => {
                println!("Error: {err:#}");
            }
        }
    }

    Ok(())
}

struct CliSession {
    feed: FeedService,
    posts: PostService,
    votes: VoteService,
    users: UserService,
    page_size: usize,
    user_id: Option<i64>,
    next_cursor: Option<String>,
}

enum LoopAction {
    Continue,
    Exit,
}

impl CliSession {
    fn handle_command(&mut self, tokens: &[String]) -> Result<LoopAction> {
        let command = tokens[0].as_str();
        match command {
            "help" => self.print_help(),
            "register" => {
                let Some(name) = tokens.get(1) else {
                    println!("Usage: register <username>");
                    return Ok(LoopAction::Continue);
                };
                let user = self.users.register(name)?;
                self.user_id = Some(user.id);
                println!("Registered {} as user {} (logged in)", user.username, user.id);
            }
            "login" => {
                let id = parse_id(tokens.get(1), "login <user_id>")?;
                let user = self
                    .users
                    .get(id)?
                    .ok_or_else(|| anyhow!("user {id} does not exist"))?;
                self.user_id = Some(user.id);
                println!("Logged in as {}", user.username);
            }
            "whoami" => match self.user_id {
                Some(id) => println!("user {id}"),
                None => println!("anonymous"),
            },
            "post" => {
                if tokens.len() < 3 {
                    println!("Usage: post TITLE TEXT");
                    return Ok(LoopAction::Continue);
                }
                let author = self.require_login()?;
                let post = self.posts.create_post(
                    author,
                    CreatePostInput {
                        title: tokens[1].clone(),
                        text: tokens[2..].join(" "),
                    },
                )?;
                println!("Created post {}", post.id);
            }
            "feed" => {
                if let Some(raw) = tokens.get(1) {
                    self.page_size = raw
                        .parse()
                        .map_err(|_| anyhow!("page size must be a number"))?;
                }
                self.next_cursor = None;
                let page = self.load_page()?;
                self.print_page(&page);
            }
            "more" => {
                if self.next_cursor.is_none() {
                    println!("Nothing more to load. Use 'feed' to start from the top.");
                    return Ok(LoopAction::Continue);
                }
                let page = self.load_page()?;
                self.print_page(&page);
            }
            "up" | "down" => {
                let post_id = parse_id(tokens.get(1), "up|down <post_id>")?;
                let direction = if command == "up" {
                    VoteDirection::Up
                } else {
                    VoteDirection::Down
                };
                let user_id = self.require_login()?;
                let outcome = self.votes.cast_vote(user_id, post_id, direction)?;
                println!(
                    "Post {} now at {} ({:+})",
                    outcome.post_id, outcome.score, outcome.delta
                );
            }
            "delete" => {
                let post_id = parse_id(tokens.get(1), "delete <post_id>")?;
                let user_id = self.require_login()?;
                self.posts.delete_post(user_id, post_id)?;
                println!("Deleted post {post_id}");
            }
            "audit" => {
                let drift = self.votes.audit()?;
                if drift.is_empty() {
                    println!("All post scores match their votes.");
                }
                for entry in drift {
                    println!(
                        "  post {}: stored {} but votes sum to {}",
                        entry.post_id, entry.stored_points, entry.ledger_sum
                    );
                }
            }
            "exit" | "quit" => return Ok(LoopAction::Exit),
            other => println!("Unknown command '{other}'. Type 'help' for a list of commands."),
        }
        Ok(LoopAction::Continue)
    }

    fn load_page(&mut self) -> ForumResult<FeedPage> {
        let limit = i64::try_from(self.page_size).unwrap_or(i64::MAX);
        let page = self
            .feed
            .get_feed(self.user_id, Some(limit), self.next_cursor.as_deref())?;
        self.next_cursor = if page.has_more {
            page.next_cursor.clone()
        } else {
            None
        };
        Ok(page)
    }

    fn require_login(&self) -> Result<i64> {
        self.user_id
            .ok_or_else(|| anyhow!("log in first with 'register' or 'login'"))
    }

    fn print_page(&self, page: &FeedPage) {
        if page.items.is_empty() {
            println!("No posts yet. Use 'post' to create one.");
            return;
        }
        for item in &page.items {
            let marker = match item.vote_direction {
                Some(VoteDirection::Up) => "^",
                Some(VoteDirection::Down) => "v",
                None => " ",
            };
            println!(
                "  {marker}[{:>4}] #{} {} (by {})",
                item.score, item.id, item.title, item.author_username
            );
            println!("          {}", item.text_snippet);
        }
        if page.has_more {
            println!("Type 'more' to load older posts.");
        }
    }

    fn print_help(&self) {
        println!("Available commands:");
        println!("  help                 Show this help message");
        println!("  register <name>      Create a user and log in as it");
        println!("  login <user_id>      Act as an existing user");
        println!("  whoami               Show the current user");
        println!("  post TITLE TEXT      Create a new post");
        println!("  feed [N]             Show the newest posts (page size N)");
        println!("  more                 Load the next page of the feed");
        println!("  up <post_id>         Upvote a post");
        println!("  down <post_id>       Downvote a post");
        println!("  delete <post_id>     Delete one of your posts");
        println!("  audit                Compare stored scores with the vote ledger");
        println!("  exit                 Quit the CLI");
    }
}

fn parse_id(raw: Option<&String>, usage: &str) -> Result<i64> {
    raw.and_then(|value| value.parse().ok())
        .ok_or_else(|| anyhow!("Usage: {usage}"))
}
