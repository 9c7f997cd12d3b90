use rusqlite::Connection;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Rusqlite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
}

pub fn setup_blog_db(conn: &mut Connection) -> Result<(), SetupError> {
    let tx = conn.transaction()?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_time TEXT
        )",
        [],
    )?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            author_id INTEGER NOT NULL,
            title TEXT NOT NULL CHECK(length(title) <= 200),
            text TEXT NOT NULL,
            create_date TEXT NOT NULL,
            published_date TEXT,
            FOREIGN KEY (author_id) REFERENCES users(id)
        )",
        [],
    )?;

    // Comments belong to exactly one post; deleting the post removes them.
    tx.execute(
        "CREATE TABLE IF NOT EXISTS comments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id INTEGER NOT NULL,
            author TEXT NOT NULL CHECK(length(author) <= 200),
            text TEXT NOT NULL,
            create_date TEXT NOT NULL,
            approved_comment INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE
        )",
        [],
    )?;

    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_posts_published_date ON posts(published_date)",
        [],
    )?;
    tx.execute(
        "CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id)",
        [],
    )?;

    tx.commit()?;
    Ok(())
}
