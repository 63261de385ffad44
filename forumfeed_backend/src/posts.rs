use crate::database::models::NewPostRecord;
use crate::database::repositories::{PostRepository, UserRepository};
use crate::database::Database;
use crate::error::{from_repository, ForumError, ForumResult};
use crate::feed::PostView;
use crate::utils::now_millis;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct PostService {
    database: Database,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePostInput {
    pub title: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePostInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create_post(&self, author_id: i64, input: CreatePostInput) -> ForumResult<PostView> {
        self.create_post_at(author_id, input, now_millis())
    }

    pub(crate) fn create_post_at(
        &self,
        author_id: i64,
        input: CreatePostInput,
        created_at: i64,
    ) -> ForumResult<PostView> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ForumError::validation("post title may not be empty"));
        }
        let record = NewPostRecord {
            title,
            text: input.text,
            author_id,
            created_at,
        };

        let row = self.database.with_write_transaction(|repos| {
            if repos.users().get(author_id).map_err(from_repository)?.is_none() {
                return Err(ForumError::AuthenticationRequired);
            }
            let posts = repos.posts();
            let stored = posts.create(&record).map_err(from_repository)?;
            posts
                .get_row(stored.id, Some(author_id))
                .map_err(from_repository)?
                .ok_or_else(|| {
                    ForumError::Internal(anyhow::anyhow!(
                        "post creation lost newly inserted record"
                    ))
                })
        })?;

        tracing::info!(post_id = row.post.id, author_id, "post created");
        Ok(PostView::from_row(row, true))
    }

    /// Edits title and/or text. Score and creation time are never touched.
    pub fn update_post(
        &self,
        user_id: i64,
        post_id: i64,
        input: UpdatePostInput,
    ) -> ForumResult<PostView> {
        if let Some(title) = &input.title {
            if title.trim().is_empty() {
                return Err(ForumError::validation("post title may not be empty"));
            }
        }

        let row = self.database.with_write_transaction(|repos| {
            let posts = repos.posts();
            let current = posts
                .get(post_id)
                .map_err(from_repository)?
                .ok_or_else(|| ForumError::post_not_found(post_id))?;
            if current.author_id != user_id {
                return Err(ForumError::NotPermitted {
                    entity: "post",
                    id: post_id,
                });
            }
            let title = input
                .title
                .as_deref()
                .map(str::trim)
                .unwrap_or(current.title.as_str());
            let text = input.text.as_deref().unwrap_or(current.text.as_str());
            posts
                .update_content(post_id, title, text, now_millis().max(current.updated_at))
                .map_err(from_repository)?;
            posts
                .get_row(post_id, Some(user_id))
                .map_err(from_repository)?
                .ok_or_else(|| ForumError::post_not_found(post_id))
        })?;

        Ok(PostView::from_row(row, true))
    }

    /// Deletes a post together with every vote cast on it.
    pub fn delete_post(&self, user_id: i64, post_id: i64) -> ForumResult<()> {
        self.database.with_write_transaction(|repos| {
            let posts = repos.posts();
            let current = posts
                .get(post_id)
                .map_err(from_repository)?
                .ok_or_else(|| ForumError::post_not_found(post_id))?;
            if current.author_id != user_id {
                return Err(ForumError::NotPermitted {
                    entity: "post",
                    id: post_id,
                });
            }
            posts.delete(post_id).map_err(from_repository)?;
            Ok(())
        })?;
        tracing::info!(post_id, user_id, "post deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VoteConfig;
    use crate::database::repositories::VoteRepository;
    use crate::users::UserService;
    use crate::votes::{VoteDirection, VoteService};

    fn setup() -> (Database, PostService, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let users = UserService::new(db.clone());
        let author = users.register("author").unwrap().id;
        let other = users.register("other").unwrap().id;
        (db.clone(), PostService::new(db), author, other)
    }

    fn input(title: &str) -> CreatePostInput {
        CreatePostInput {
            title: title.into(),
            text: "hello world".into(),
        }
    }

    #[test]
    fn create_post_starts_at_zero_and_rejects_blank_title() {
        let (_, posts, author, _) = setup();
        let post = posts.create_post(author, input("  First  ")).unwrap();
        assert_eq!(post.title, "First");
        assert_eq!(post.score, 0);
        assert_eq!(post.author_username, "author");
        assert_eq!(post.text.as_deref(), Some("hello world"));

        assert!(matches!(
            posts.create_post(author, input("   ")),
            Err(ForumError::Validation(_))
        ));
    }

    #[test]
    fn create_post_for_unknown_author_requires_authentication() {
        let (_, posts, _, _) = setup();
        assert!(matches!(
            posts.create_post(9_999, input("ghost")),
            Err(ForumError::AuthenticationRequired)
        ));
    }

    #[test]
    fn only_author_may_update_and_score_is_untouched() {
        let (db, posts, author, other) = setup();
        let post = posts.create_post(author, input("Original")).unwrap();
        VoteService::new(db, VoteConfig::default())
            .cast_vote(other, post.id, VoteDirection::Up)
            .unwrap();

        assert!(matches!(
            posts.update_post(
                other,
                post.id,
                UpdatePostInput {
                    title: Some("Hijack".into()),
                    text: None,
                }
            ),
            Err(ForumError::NotPermitted { .. })
        ));

        let updated = posts
            .update_post(
                author,
                post.id,
                UpdatePostInput {
                    title: Some("Edited".into()),
                    text: None,
                },
            )
            .unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.text.as_deref(), Some("hello world"));
        assert_eq!(updated.score, 1);
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[test]
    fn delete_cascades_votes_and_reports_missing_posts() {
        let (db, posts, author, other) = setup();
        let post = posts.create_post(author, input("Doomed")).unwrap();
        VoteService::new(db.clone(), VoteConfig::default())
            .cast_vote(other, post.id, VoteDirection::Down)
            .unwrap();

        assert!(matches!(
            posts.delete_post(other, post.id),
            Err(ForumError::NotPermitted { .. })
        ));
        posts.delete_post(author, post.id).unwrap();

        let votes = db
            .with_repositories(|repos| repos.votes().list_for_post(post.id))
            .unwrap();
        assert!(votes.is_empty());
        assert!(matches!(
            posts.delete_post(author, post.id),
            Err(ForumError::NotFound { .. })
        ));
    }
}
