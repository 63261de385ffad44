use crate::database::models::{FeedPosition, FeedRow, NewPostRecord, PostRecord, ScoreDrift};
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

pub(super) struct SqlitePostRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

const FEED_COLUMNS: &str = r#"
    p.id, p.title, p.text, p.points, p.author_id, p.created_at, p.updated_at,
    u.username, v.value
"#;

impl<'conn> super::PostRepository for SqlitePostRepository<'conn> {
    fn create(&self, record: &NewPostRecord) -> Result<PostRecord> {
        self.conn.execute(
            r#"
            INSERT INTO posts (title, text, points, author_id, created_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?4, ?4)
            "#,
            params![
                record.title,
                record.text,
                record.author_id,
                record.created_at
            ],
        )?;
        Ok(PostRecord {
            id: self.conn.last_insert_rowid(),
            title: record.title.clone(),
            text: record.text.clone(),
            points: 0,
            author_id: record.author_id,
            created_at: record.created_at,
            updated_at: record.created_at,
        })
    }

    fn get(&self, id: i64) -> Result<Option<PostRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, title, text, points, author_id, created_at, updated_at
                FROM posts
                WHERE id = ?1
                "#,
                params![id],
                map_post,
            )
            .optional()?)
    }

    fn get_row(&self, id: i64, viewer: Option<i64>) -> Result<Option<FeedRow>> {
        let sql = format!(
            r#"
            SELECT {FEED_COLUMNS}
            FROM posts p
            INNER JOIN users u ON u.id = p.author_id
            LEFT JOIN votes v ON v.post_id = p.id AND v.user_id = ?2
            WHERE p.id = ?1
            "#
        );
        Ok(self
            .conn
            .query_row(&sql, params![id, viewer], map_feed_row)
            .optional()?)
    }

    fn update_content(&self, id: i64, title: &str, text: &str, updated_at: i64) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE posts
            SET title = ?2, text = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
            params![id, title, text, updated_at],
        )?;
        Ok(())
    }

    fn delete(&self, id: i64) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    fn add_points(&self, id: i64, delta: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE posts SET points = points + ?2 WHERE id = ?1",
            params![id, delta],
        )?;
        Ok(updated > 0)
    }

    fn points(&self, id: i64) -> Result<Option<i64>> {
        Ok(self
            .conn
            .query_row(
                "SELECT points FROM posts WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn page(
        &self,
        viewer: Option<i64>,
        after: Option<FeedPosition>,
        fetch: usize,
    ) -> Result<Vec<FeedRow>> {
        let fetch = i64::try_from(fetch).unwrap_or(i64::MAX);
        let sql = page_sql(after);
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match after {
            None => stmt.query_map(params![viewer, fetch], map_feed_row)?,
            Some(FeedPosition {
                created_at,
                id: None,
            }) => stmt.query_map(params![viewer, fetch, created_at], map_feed_row)?,
            Some(FeedPosition {
                created_at,
                id: Some(id),
            }) => stmt.query_map(params![viewer, fetch, created_at, id], map_feed_row)?,
        };
        let mut page = Vec::new();
        for row in rows {
            page.push(row?);
        }
        Ok(page)
    }

    fn find_score_drift(&self) -> Result<Vec<ScoreDrift>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT p.id, p.points, COALESCE(SUM(v.value), 0) AS ledger_sum
            FROM posts p
            LEFT JOIN votes v ON v.post_id = p.id
            GROUP BY p.id
            HAVING p.points <> ledger_sum
            ORDER BY p.id ASC
            "#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(ScoreDrift {
                post_id: row.get(0)?,
                stored_points: row.get(1)?,
                ledger_sum: row.get(2)?,
            })
        })?;
        let mut drift = Vec::new();
        for row in rows {
            drift.push(row?);
        }
        Ok(drift)
    }
}

/// Feed query for a position. Each cursor shape gets its own range predicate
/// so the `(created_at, id)` index drives the scan. Parameters: `?1` viewer,
/// `?2` fetch, then the cursor fields.
fn page_sql(after: Option<FeedPosition>) -> String {
    let range = match after {
        None => "",
        Some(FeedPosition { id: None, .. }) => "WHERE p.created_at < ?3",
        Some(FeedPosition { id: Some(_), .. }) => "WHERE (p.created_at, p.id) < (?3, ?4)",
    };
    format!(
        r#"
        SELECT {FEED_COLUMNS}
        FROM posts p
        INNER JOIN users u ON u.id = p.author_id
        LEFT JOIN votes v ON v.post_id = p.id AND v.user_id = ?1
        {range}
        ORDER BY p.created_at DESC, p.id DESC
        LIMIT ?2
        "#
    )
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        text: row.get(2)?,
        points: row.get(3)?,
        author_id: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn map_feed_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedRow> {
    Ok(FeedRow {
        post: map_post(row)?,
        author_username: row.get(7)?,
        viewer_vote: row.get(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MIGRATIONS;

    fn query_plan(conn: &Connection, sql: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("EXPLAIN QUERY PLAN {sql}"))
            .unwrap();
        let steps: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(3))
            .unwrap()
            .map(Result::unwrap)
            .collect();
        steps
    }

    #[test]
    fn cursor_pages_scan_the_feed_index() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(MIGRATIONS).unwrap();

        for after in [
            Some(FeedPosition {
                created_at: 10,
                id: None,
            }),
            Some(FeedPosition {
                created_at: 10,
                id: Some(3),
            }),
        ] {
            let plan = query_plan(&conn, &page_sql(after));
            assert!(
                plan.iter().any(|step| step.contains("idx_posts_feed")),
                "plan for {after:?} skipped the feed index: {plan:?}"
            );
        }
    }
}
