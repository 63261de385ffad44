use forumfeed_backend::api;
use forumfeed_backend::bootstrap;
use forumfeed_backend::config::{ForumConfig, ForumPaths};
use serde_json::{json, Value};
use tempfile::{tempdir, TempDir};
use tokio::time::{sleep, Duration};

struct TestServer {
    _dir: TempDir,
    server: tokio::task::JoinHandle<()>,
    base_url: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let dir = tempdir().expect("tempdir");
        let port = next_port();
        let config = ForumConfig::new(port, ForumPaths::from_base_dir(dir.path()).expect("paths"));
        let resources = bootstrap::initialize(&config).expect("bootstrap");

        let server = tokio::spawn(async move {
            let _ = api::serve_http(config, resources.database).await;
        });

        let base_url = format!("http://127.0.0.1:{port}");
        wait_for_health(&base_url).await;

        Self {
            _dir: dir,
            server,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str) -> i64 {
        let user: Value = self
            .client
            .post(self.url("/users"))
            .json(&json!({ "username": username }))
            .send()
            .await
            .expect("register response")
            .json()
            .await
            .expect("user json");
        user["id"].as_i64().expect("user id")
    }

    async fn create_post(&self, user_id: i64, title: &str) -> i64 {
        let post: Value = self
            .client
            .post(self.url("/posts"))
            .header("x-user-id", user_id.to_string())
            .json(&json!({ "title": title, "text": format!("{title} body") }))
            .send()
            .await
            .expect("create post response")
            .json()
            .await
            .expect("post json");
        post["id"].as_i64().expect("post id")
    }

    async fn vote(&self, user_id: i64, post_id: i64, direction: i64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/posts/{post_id}/vote")))
            .header("x-user-id", user_id.to_string())
            .json(&json!({ "direction": direction }))
            .send()
            .await
            .expect("vote response")
    }

    async fn shutdown(self) {
        self.server.abort();
        let _ = self.server.await;
    }
}

fn next_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind ephemeral port")
        .local_addr()
        .expect("local addr")
        .port()
}

async fn wait_for_health(base_url: &str) {
    let client = reqwest::Client::new();
    for _ in 0..50 {
        if let Ok(resp) = client.get(format!("{base_url}/health")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        sleep(Duration::from_millis(100)).await;
    }
    panic!("server did not become healthy in time");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn vote_transitions_over_http() {
    let server = TestServer::start().await;
    let author = server.register("author").await;
    let voter = server.register("voter").await;
    let post_id = server.create_post(author, "Vote target").await;

    let mut scores = Vec::new();
    for direction in [1, 1, -1] {
        let outcome: Value = server
            .vote(voter, post_id, direction)
            .await
            .json()
            .await
            .expect("vote json");
        scores.push(outcome["score"].as_i64().expect("score"));
    }
    assert_eq!(scores, vec![1, 1, -1]);

    let anonymous = server
        .client
        .post(server.url(&format!("/posts/{post_id}/vote")))
        .json(&json!({ "direction": 1 }))
        .send()
        .await
        .expect("anonymous vote");
    assert_eq!(anonymous.status(), reqwest::StatusCode::UNAUTHORIZED);

    let invalid = server.vote(voter, post_id, 0).await;
    assert_eq!(invalid.status(), reqwest::StatusCode::BAD_REQUEST);

    let missing = server.vote(voter, post_id + 100, 1).await;
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    let post: Value = server
        .client
        .get(server.url(&format!("/posts/{post_id}")))
        .header("x-user-id", voter.to_string())
        .send()
        .await
        .expect("get post")
        .json()
        .await
        .expect("post json");
    assert_eq!(post["score"], -1);
    assert_eq!(post["voteDirection"], -1);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn feed_pages_cover_every_post_once() {
    let server = TestServer::start().await;
    let author = server.register("author").await;
    let mut created = Vec::new();
    for n in 0..7 {
        created.push(server.create_post(author, &format!("post {n}")).await);
    }

    let mut seen = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let mut request = server.client.get(server.url("/posts")).query(&[("limit", "3")]);
        if let Some(cursor) = &cursor {
            request = request.query(&[("cursor", cursor.as_str())]);
        }
        let page: Value = request
            .send()
            .await
            .expect("feed response")
            .json()
            .await
            .expect("feed json");
        let items = page["items"].as_array().expect("items");
        assert!(items.len() <= 3);
        seen.extend(items.iter().map(|item| item["id"].as_i64().expect("id")));
        if !page["hasMore"].as_bool().expect("hasMore") {
            break;
        }
        cursor = page["nextCursor"].as_str().map(str::to_string);
    }

    created.reverse();
    assert_eq!(seen, created);

    let bad_cursor = server
        .client
        .get(server.url("/posts"))
        .query(&[("cursor", "yesterday")])
        .send()
        .await
        .expect("bad cursor response");
    assert_eq!(bad_cursor.status(), reqwest::StatusCode::BAD_REQUEST);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_authors_delete_and_deleted_posts_leave_the_feed() {
    let server = TestServer::start().await;
    let author = server.register("author").await;
    let stranger = server.register("stranger").await;
    let post_id = server.create_post(author, "Short lived").await;
    server.vote(stranger, post_id, 1).await;

    let forbidden = server
        .client
        .delete(server.url(&format!("/posts/{post_id}")))
        .header("x-user-id", stranger.to_string())
        .send()
        .await
        .expect("delete response");
    assert_eq!(forbidden.status(), reqwest::StatusCode::FORBIDDEN);

    let deleted: Value = server
        .client
        .delete(server.url(&format!("/posts/{post_id}")))
        .header("x-user-id", author.to_string())
        .send()
        .await
        .expect("delete response")
        .json()
        .await
        .expect("delete json");
    assert_eq!(deleted["deleted"], true);

    let page: Value = server
        .client
        .get(server.url("/posts"))
        .send()
        .await
        .expect("feed response")
        .json()
        .await
        .expect("feed json");
    assert!(page["items"].as_array().expect("items").is_empty());
    assert_eq!(page["hasMore"], false);

    server.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_http_votes_keep_score_consistent() {
    let server = TestServer::start().await;
    let author = server.register("author").await;
    let post_id = server.create_post(author, "Popular").await;
    let mut voters = Vec::new();
    for n in 0..6 {
        voters.push(server.register(&format!("voter-{n}")).await);
    }

    let mut tasks = Vec::new();
    for (n, voter) in voters.iter().copied().enumerate() {
        let client = server.client.clone();
        let url = server.url(&format!("/posts/{post_id}/vote"));
        tasks.push(tokio::spawn(async move {
            for round in 0..5 {
                let direction = if (n + round) % 2 == 0 { 1 } else { -1 };
                let resp = client
                    .post(&url)
                    .header("x-user-id", voter.to_string())
                    .json(&json!({ "direction": direction }))
                    .send()
                    .await
                    .expect("vote response");
                assert!(resp.status().is_success());
            }
        }));
    }
    for task in tasks {
        task.await.expect("vote task");
    }

    // Each voter's last vote was round 4: (n + 4) even => +1, else -1.
    let expected: i64 = (0..6).map(|n| if (n + 4) % 2 == 0 { 1 } else { -1 }).sum();
    let post: Value = server
        .client
        .get(server.url(&format!("/posts/{post_id}")))
        .send()
        .await
        .expect("get post")
        .json()
        .await
        .expect("post json");
    assert_eq!(post["score"].as_i64(), Some(expected));

    server.shutdown().await;
}
