use chrono::Utc;

use crate::config::AuthorAttribution;
use crate::middleware::AuthenticatedAuthor;
use crate::models::db_operations::{
    comments_db_operations, posts_db_operations, users_db_operations, DbError,
};
use crate::models::{Author, Comment, Post};
use crate::DbPool;

// Service layer between the route handlers and the typed query functions.
// Entity state changes (publish, approve, remove) happen here, never on the
// entities themselves.

pub fn verify_author_credentials(pool: &DbPool, username: &str, password: &str) -> Option<Author> {
    let conn = pool.get().ok()?;
    users_db_operations::verify_credentials(&conn, username, password)
}

pub fn record_author_login(pool: &DbPool, username: &str) {
    let result = (|| -> Result<(), DbError> {
        let conn = pool.get()?;
        users_db_operations::update_last_login_time(&conn, username)?;
        Ok(())
    })();
    // A missed stamp is not worth failing a login over, but it is logged.
    if let Err(e) = result {
        log::warn!("Failed to record last login for '{}': {}", username, e);
    }
}

pub fn fetch_published_posts(pool: &DbPool) -> Result<Vec<Post>, DbError> {
    let conn = pool.get()?;
    posts_db_operations::list_published(&conn, Utc::now())
}

pub fn fetch_draft_posts(pool: &DbPool) -> Result<Vec<Post>, DbError> {
    let conn = pool.get()?;
    posts_db_operations::list_drafts(&conn)
}

pub fn fetch_post(pool: &DbPool, post_id: i64) -> Result<Post, DbError> {
    let conn = pool.get()?;
    posts_db_operations::read_post(&conn, post_id)
}

/// A post together with its publicly visible comments.
pub fn fetch_post_with_comments(pool: &DbPool, post_id: i64) -> Result<(Post, Vec<Comment>), DbError> {
    let conn = pool.get()?;
    let post = posts_db_operations::read_post(&conn, post_id)?;
    let comments = comments_db_operations::approved_for_post(&conn, post_id)?;
    Ok((post, comments))
}

/// Comments awaiting moderation, for the logged-in author's detail view.
pub fn fetch_pending_comments(pool: &DbPool, post_id: i64) -> Result<Vec<Comment>, DbError> {
    let conn = pool.get()?;
    comments_db_operations::pending_for_post(&conn, post_id)
}

/// Resolves which account a post submission is attributed to. Under
/// `Session` the logged-in account always wins; under `Form` the submitted
/// name must match an existing account, and `None` signals a form error.
pub fn resolve_post_author(
    pool: &DbPool,
    attribution: AuthorAttribution,
    current: &AuthenticatedAuthor,
    submitted: &str,
) -> Result<Option<Author>, DbError> {
    let conn = pool.get()?;
    let username = match attribution {
        AuthorAttribution::Session => current.username.as_str(),
        AuthorAttribution::Form => submitted,
    };
    Ok(users_db_operations::read_user_by_username(&conn, username))
}

pub fn create_post(pool: &DbPool, author_id: i64, title: &str, text: &str) -> Result<i64, DbError> {
    let conn = pool.get()?;
    posts_db_operations::create_post(&conn, author_id, title, text)
}

pub fn update_post(
    pool: &DbPool,
    post_id: i64,
    author_id: i64,
    title: &str,
    text: &str,
) -> Result<(), DbError> {
    let conn = pool.get()?;
    posts_db_operations::update_post(&conn, post_id, author_id, title, text)
}

pub fn delete_post(pool: &DbPool, post_id: i64) -> Result<(), DbError> {
    let conn = pool.get()?;
    posts_db_operations::delete_post(&conn, post_id)
}

/// Stamps `published_date` with the invocation time. Re-publishing a post
/// that is already live simply overwrites the stamp.
pub fn publish_post(pool: &DbPool, post_id: i64) -> Result<(), DbError> {
    let conn = pool.get()?;
    posts_db_operations::set_published_date(&conn, post_id, Utc::now())
}

pub fn add_comment(pool: &DbPool, post_id: i64, author: &str, text: &str) -> Result<i64, DbError> {
    let conn = pool.get()?;
    comments_db_operations::create_comment(&conn, post_id, author, text)
}

/// Approves a comment and returns its parent post id for the redirect.
/// The parent reference is read before any mutation.
pub fn approve_comment(pool: &DbPool, comment_id: i64) -> Result<i64, DbError> {
    let conn = pool.get()?;
    let comment = comments_db_operations::read_comment(&conn, comment_id)?;
    comments_db_operations::approve_comment(&conn, comment_id)?;
    Ok(comment.post_id)
}

/// Deletes a comment and returns the parent post id it belonged to. The id
/// is captured before the delete, since the record is gone afterwards.
pub fn remove_comment(pool: &DbPool, comment_id: i64) -> Result<i64, DbError> {
    let conn = pool.get()?;
    let comment = comments_db_operations::read_comment(&conn, comment_id)?;
    comments_db_operations::delete_comment(&conn, comment_id)?;
    Ok(comment.post_id)
}
