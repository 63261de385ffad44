use crate::database::models::UserRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteUserRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::UserRepository for SqliteUserRepository<'conn> {
    fn create(&self, username: &str, created_at: i64) -> Result<UserRecord> {
        self.conn.execute(
            r#"
            INSERT INTO users (username, created_at)
            VALUES (?1, ?2)
            "#,
            params![username, created_at],
        )?;
        Ok(UserRecord {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            created_at,
        })
    }

    fn get(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE id = ?1",
                params![id],
                map_user,
            )
            .optional()?)
    }

    fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                map_user,
            )
            .optional()?)
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: row.get(2)?,
    })
}
