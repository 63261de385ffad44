use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::Database;
use crate::error::{from_repository, ForumError, ForumResult};
use crate::utils::now_millis;

/// Minimal user store standing in for the account side of authentication.
#[derive(Clone)]
pub struct UserService {
    database: Database,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn register(&self, username: &str) -> ForumResult<UserRecord> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ForumError::validation("username may not be empty"));
        }
        let record = self
            .database
            .with_repositories(|repos| {
                let users = repos.users();
                if users.get_by_username(username)?.is_some() {
                    return Ok(None);
                }
                Ok(Some(users.create(username, now_millis())?))
            })
            .map_err(from_repository)?;
        match record {
            Some(record) => {
                tracing::info!(user_id = record.id, username = %record.username, "user registered");
                Ok(record)
            }
            None => Err(ForumError::validation(format!(
                "username {username} is already taken"
            ))),
        }
    }

    pub fn get(&self, id: i64) -> ForumResult<Option<UserRecord>> {
        self.database
            .with_repositories(|repos| repos.users().get(id))
            .map_err(from_repository)
    }
}
