use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Url;

use crate::models::{
    CreatePostInput, DeleteResponse, FeedPage, FeedPost, VoteDirection, VoteOutcome, VoteRequest,
};

const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    user_id: Option<i64>,
    client: Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base = sanitize_base_url(base_url.into())?;
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            base_url: base,
            user_id: None,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    pub fn set_user_id(&mut self, user_id: Option<i64>) {
        self.user_id = user_id;
    }

    pub fn get_feed(&self, limit: i64, cursor: Option<&str>) -> Result<FeedPage> {
        let mut url = self.url("/posts")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("cursor", cursor);
            }
        }
        let response = self.with_user(self.client.get(url)).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    pub fn get_post(&self, post_id: i64) -> Result<FeedPost> {
        let url = self.url(&format!("/posts/{post_id}"))?;
        let response = self.with_user(self.client.get(url)).send()?.error_for_status()?;
        Ok(response.json()?)
    }

    pub fn cast_vote(&self, post_id: i64, direction: VoteDirection) -> Result<VoteOutcome> {
        let url = self.url(&format!("/posts/{post_id}/vote"))?;
        let payload = VoteRequest {
            direction: direction.value(),
        };
        let response = self
            .with_user(self.client.post(url))
            .json(&payload)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    pub fn create_post(&self, input: &CreatePostInput) -> Result<FeedPost> {
        let url = self.url("/posts")?;
        let response = self
            .with_user(self.client.post(url))
            .json(input)
            .send()?
            .error_for_status()?;
        Ok(response.json()?)
    }

    pub fn delete_post(&self, post_id: i64) -> Result<()> {
        let url = self.url(&format!("/posts/{post_id}"))?;
        let response = self
            .with_user(self.client.delete(url))
            .send()?
            .error_for_status()?;
        let body: DeleteResponse = response.json()?;
        if !body.deleted {
            return Err(anyhow!("post {post_id} was not deleted"));
        }
        Ok(())
    }

    fn with_user(&self, request: RequestBuilder) -> RequestBuilder {
        match self.user_id {
            Some(id) => request.header(USER_HEADER, id.to_string()),
            None => request,
        }
    }

    fn url(&self, path: &str) -> Result<Url> {
        let joined = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        Url::parse(&joined).with_context(|| format!("invalid request URL {joined}"))
    }
}

fn sanitize_base_url(mut base: String) -> Result<String> {
    if !base.starts_with("http://") && !base.starts_with("https://") {
        base = format!("http://{base}");
    }
    while base.ends_with('/') {
        base.pop();
    }
    let _ = Url::parse(&base).context("invalid base URL")?;
    Ok(base)
}
