use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::models::Post;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("Item not found in database: {0}")]
    NotFound(String),
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so that SQL
/// string comparison and ordering is chronological.
pub(crate) fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, u.username, p.title, p.text, p.create_date, p.published_date";

fn map_post_row(row: &Row) -> rusqlite::Result<Post> {
    let create_raw: String = row.get(5)?;
    let published_raw: Option<String> = row.get(6)?;
    let published_date = match published_raw {
        Some(raw) => Some(parse_ts(6, &raw)?),
        None => None,
    };
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        title: row.get(3)?,
        text: row.get(4)?,
        create_date: parse_ts(5, &create_raw)?,
        published_date,
    })
}

/// Inserts a new draft. `create_date` is evaluated here, at record creation
/// time; `published_date` starts null.
pub fn create_post(conn: &Connection, author_id: i64, title: &str, text: &str) -> Result<i64, DbError> {
    let create_date = format_ts(Utc::now());
    conn.execute(
        "INSERT INTO posts (author_id, title, text, create_date, published_date)
         VALUES (?1, ?2, ?3, ?4, NULL)",
        params![author_id, title, text, create_date],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_post(conn: &Connection, post_id: i64) -> Result<Post, DbError> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.author_id WHERE p.id = ?1"),
        [post_id],
        map_post_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("Post {} not found", post_id)))
}

/// Overwrites the externally settable fields. `create_date` and
/// `published_date` are untouched.
pub fn update_post(
    conn: &Connection,
    post_id: i64,
    author_id: i64,
    title: &str,
    text: &str,
) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE posts SET author_id = ?1, title = ?2, text = ?3 WHERE id = ?4",
        params![author_id, title, text, post_id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("Post {} not found", post_id)));
    }
    Ok(())
}

/// Deleting a post cascades to its comments via the schema's foreign key.
pub fn delete_post(conn: &Connection, post_id: i64) -> Result<(), DbError> {
    let changed = conn.execute("DELETE FROM posts WHERE id = ?1", [post_id])?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("Post {} not found", post_id)));
    }
    Ok(())
}

/// Stamps the publication timestamp. Re-publishing simply overwrites with
/// the new timestamp.
pub fn set_published_date(conn: &Connection, post_id: i64, ts: DateTime<Utc>) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE posts SET published_date = ?1 WHERE id = ?2",
        params![format_ts(ts), post_id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("Post {} not found", post_id)));
    }
    Ok(())
}

/// Posts with a publication timestamp at or before `now`, most recent first.
pub fn list_published(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Post>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE p.published_date IS NOT NULL AND p.published_date <= ?1
         ORDER BY p.published_date DESC"
    ))?;
    let rows = stmt.query_map([format_ts(now)], map_post_row)?;
    let mut posts = Vec::new();
    for post in rows {
        posts.push(post?);
    }
    Ok(posts)
}

/// Unpublished posts, oldest first.
pub fn list_drafts(conn: &Connection) -> Result<Vec<Post>, DbError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {POST_COLUMNS} FROM posts p JOIN users u ON u.id = p.author_id
         WHERE p.published_date IS NULL
         ORDER BY p.create_date ASC"
    ))?;
    let rows = stmt.query_map([], map_post_row)?;
    let mut posts = Vec::new();
    for post in rows {
        posts.push(post?);
    }
    Ok(posts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::users_db_operations;
    use crate::setup::db_setup;
    use chrono::{Duration, SubsecRound};

    fn test_conn() -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::setup_blog_db(&mut conn).unwrap();
        users_db_operations::create_user(&conn, "ines", "hunter2sixteen").unwrap();
        let author_id = users_db_operations::read_user_by_username(&conn, "ines")
            .unwrap()
            .id;
        (conn, author_id)
    }

    #[test]
    fn new_post_is_a_draft_with_creation_time() {
        let (conn, author_id) = test_conn();
        // Stored timestamps are truncated to microseconds.
        let before = Utc::now().trunc_subsecs(6);
        let id = create_post(&conn, author_id, "Hi", "body").unwrap();
        let post = read_post(&conn, id).unwrap();
        assert!(post.published_date.is_none());
        assert!(post.create_date >= before && post.create_date <= Utc::now());
        assert_eq!(post.author_name, "ines");
    }

    #[test]
    fn published_list_excludes_drafts_and_future_posts() {
        let (conn, author_id) = test_conn();
        let now = Utc::now();
        let draft = create_post(&conn, author_id, "draft", "d").unwrap();
        let future = create_post(&conn, author_id, "future", "f").unwrap();
        set_published_date(&conn, future, now + Duration::days(1)).unwrap();
        let live = create_post(&conn, author_id, "live", "l").unwrap();
        set_published_date(&conn, live, now - Duration::minutes(5)).unwrap();

        let published = list_published(&conn, now).unwrap();
        assert_eq!(published.iter().map(|p| p.id).collect::<Vec<_>>(), vec![live]);

        let drafts = list_drafts(&conn).unwrap();
        assert_eq!(drafts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![draft]);
    }

    #[test]
    fn published_list_orders_most_recent_first() {
        let (conn, author_id) = test_conn();
        let now = Utc::now();
        let older = create_post(&conn, author_id, "older", "o").unwrap();
        let newer = create_post(&conn, author_id, "newer", "n").unwrap();
        set_published_date(&conn, older, now - Duration::hours(2)).unwrap();
        set_published_date(&conn, newer, now - Duration::hours(1)).unwrap();

        let published = list_published(&conn, now).unwrap();
        assert_eq!(
            published.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![newer, older]
        );
    }

    #[test]
    fn publishing_a_draft_moves_it_out_of_the_draft_list() {
        let (conn, author_id) = test_conn();
        let id = create_post(&conn, author_id, "Hi", "body").unwrap();
        assert_eq!(list_drafts(&conn).unwrap().len(), 1);

        let stamp = Utc::now().trunc_subsecs(6);
        set_published_date(&conn, id, stamp).unwrap();
        assert!(list_drafts(&conn).unwrap().is_empty());
        let post = read_post(&conn, id).unwrap();
        assert_eq!(post.published_date, Some(stamp));
        assert!(post.is_published(Utc::now()));
    }

    #[test]
    fn republish_restamps_the_timestamp() {
        let (conn, author_id) = test_conn();
        let id = create_post(&conn, author_id, "Hi", "body").unwrap();
        let first = Utc::now().trunc_subsecs(6) - Duration::hours(1);
        set_published_date(&conn, id, first).unwrap();
        let second = Utc::now().trunc_subsecs(6);
        set_published_date(&conn, id, second).unwrap();
        assert_eq!(read_post(&conn, id).unwrap().published_date, Some(second));
    }

    #[test]
    fn update_leaves_dates_untouched() {
        let (conn, author_id) = test_conn();
        let id = create_post(&conn, author_id, "Hi", "body").unwrap();
        let created = read_post(&conn, id).unwrap().create_date;
        update_post(&conn, id, author_id, "New title", "new body").unwrap();
        let post = read_post(&conn, id).unwrap();
        assert_eq!(post.title, "New title");
        assert_eq!(post.create_date, created);
        assert!(post.published_date.is_none());
    }

    #[test]
    fn unknown_ids_surface_as_not_found() {
        let (conn, author_id) = test_conn();
        assert!(matches!(read_post(&conn, 99), Err(DbError::NotFound(_))));
        assert!(matches!(delete_post(&conn, 99), Err(DbError::NotFound(_))));
        assert!(matches!(
            update_post(&conn, 99, author_id, "t", "x"),
            Err(DbError::NotFound(_))
        ));
        assert!(matches!(
            set_published_date(&conn, 99, Utc::now()),
            Err(DbError::NotFound(_))
        ));
    }
}
