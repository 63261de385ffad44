use crate::database::models::VoteRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqliteVoteRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

impl<'conn> super::VoteRepository for SqliteVoteRepository<'conn> {
    fn get(&self, user_id: i64, post_id: i64) -> Result<Option<VoteRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT user_id, post_id, value
                FROM votes
                WHERE user_id = ?1 AND post_id = ?2
                "#,
                params![user_id, post_id],
                map_vote,
            )
            .optional()?)
    }

    fn upsert(&self, record: &VoteRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO votes (user_id, post_id, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, post_id) DO UPDATE SET
                value = excluded.value
            "#,
            params![record.user_id, record.post_id, record.value],
        )?;
        Ok(())
    }

    fn sum_for_post(&self, post_id: i64) -> Result<i64> {
        let sum: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(value), 0) FROM votes WHERE post_id = ?1",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(sum)
    }

    fn list_for_post(&self, post_id: i64) -> Result<Vec<VoteRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT user_id, post_id, value
            FROM votes
            WHERE post_id = ?1
            ORDER BY user_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![post_id], map_vote)?;
        let mut votes = Vec::new();
        for row in rows {
            votes.push(row?);
        }
        Ok(votes)
    }
}

fn map_vote(row: &rusqlite::Row<'_>) -> rusqlite::Result<VoteRecord> {
    Ok(VoteRecord {
        user_id: row.get(0)?,
        post_id: row.get(1)?,
        value: row.get(2)?,
    })
}
