use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::posts_db_operations::{format_ts, parse_ts, DbError};
use crate::models::Comment;

fn map_comment_row(row: &Row) -> rusqlite::Result<Comment> {
    let create_raw: String = row.get(4)?;
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author: row.get(2)?,
        text: row.get(3)?,
        create_date: parse_ts(4, &create_raw)?,
        approved_comment: row.get(5)?,
    })
}

/// Inserts a visitor comment against an existing post. Starts unapproved;
/// `create_date` is evaluated here, at record creation time.
pub fn create_comment(conn: &Connection, post_id: i64, author: &str, text: &str) -> Result<i64, DbError> {
    let create_date = format_ts(Utc::now());
    conn.execute(
        "INSERT INTO comments (post_id, author, text, create_date, approved_comment)
         VALUES (?1, ?2, ?3, ?4, 0)",
        params![post_id, author, text, create_date],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn read_comment(conn: &Connection, comment_id: i64) -> Result<Comment, DbError> {
    conn.query_row(
        "SELECT id, post_id, author, text, create_date, approved_comment
         FROM comments WHERE id = ?1",
        [comment_id],
        map_comment_row,
    )
    .optional()?
    .ok_or_else(|| DbError::NotFound(format!("Comment {} not found", comment_id)))
}

/// Marks a comment approved. One-way: there is no unapprove operation.
pub fn approve_comment(conn: &Connection, comment_id: i64) -> Result<(), DbError> {
    let changed = conn.execute(
        "UPDATE comments SET approved_comment = 1 WHERE id = ?1",
        [comment_id],
    )?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("Comment {} not found", comment_id)));
    }
    Ok(())
}

pub fn delete_comment(conn: &Connection, comment_id: i64) -> Result<(), DbError> {
    let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [comment_id])?;
    if changed == 0 {
        return Err(DbError::NotFound(format!("Comment {} not found", comment_id)));
    }
    Ok(())
}

fn list_for_post(conn: &Connection, post_id: i64, approved: bool) -> Result<Vec<Comment>, DbError> {
    let mut stmt = conn.prepare(
        "SELECT id, post_id, author, text, create_date, approved_comment
         FROM comments WHERE post_id = ?1 AND approved_comment = ?2
         ORDER BY id ASC",
    )?;
    let rows = stmt.query_map(params![post_id, approved], map_comment_row)?;
    let mut comments = Vec::new();
    for comment in rows {
        comments.push(comment?);
    }
    Ok(comments)
}

/// The publicly visible comment set of a post, in creation order.
pub fn approved_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Comment>, DbError> {
    list_for_post(conn, post_id, true)
}

/// Comments still awaiting moderation, in creation order.
pub fn pending_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Comment>, DbError> {
    list_for_post(conn, post_id, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::db_operations::{posts_db_operations, users_db_operations};
    use crate::setup::db_setup;

    fn conn_with_post() -> (Connection, i64) {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        db_setup::setup_blog_db(&mut conn).unwrap();
        users_db_operations::create_user(&conn, "ines", "hunter2sixteen").unwrap();
        let author_id = users_db_operations::read_user_by_username(&conn, "ines")
            .unwrap()
            .id;
        let post_id = posts_db_operations::create_post(&conn, author_id, "Hi", "body").unwrap();
        (conn, post_id)
    }

    #[test]
    fn comment_starts_unapproved_and_hidden() {
        let (conn, post_id) = conn_with_post();
        let id = create_comment(&conn, post_id, "A", "nice").unwrap();
        let comment = read_comment(&conn, id).unwrap();
        assert!(!comment.approved_comment);
        assert!(approved_for_post(&conn, post_id).unwrap().is_empty());
        assert_eq!(pending_for_post(&conn, post_id).unwrap().len(), 1);
    }

    #[test]
    fn approval_makes_a_comment_visible() {
        let (conn, post_id) = conn_with_post();
        let id = create_comment(&conn, post_id, "A", "nice").unwrap();
        approve_comment(&conn, id).unwrap();
        let visible = approved_for_post(&conn, post_id).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, id);
        assert!(pending_for_post(&conn, post_id).unwrap().is_empty());
    }

    #[test]
    fn approved_comments_keep_creation_order() {
        let (conn, post_id) = conn_with_post();
        let first = create_comment(&conn, post_id, "A", "first").unwrap();
        let second = create_comment(&conn, post_id, "B", "second").unwrap();
        approve_comment(&conn, second).unwrap();
        approve_comment(&conn, first).unwrap();
        let visible = approved_for_post(&conn, post_id).unwrap();
        assert_eq!(visible.iter().map(|c| c.id).collect::<Vec<_>>(), vec![first, second]);
    }

    #[test]
    fn deleting_a_post_cascades_to_its_comments() {
        let (conn, post_id) = conn_with_post();
        let id = create_comment(&conn, post_id, "A", "nice").unwrap();
        posts_db_operations::delete_post(&conn, post_id).unwrap();
        assert!(matches!(read_comment(&conn, id), Err(DbError::NotFound(_))));
    }

    #[test]
    fn unknown_comment_ids_surface_as_not_found() {
        let (conn, _post_id) = conn_with_post();
        assert!(matches!(read_comment(&conn, 42), Err(DbError::NotFound(_))));
        assert!(matches!(approve_comment(&conn, 42), Err(DbError::NotFound(_))));
        assert!(matches!(delete_comment(&conn, 42), Err(DbError::NotFound(_))));
    }
}
