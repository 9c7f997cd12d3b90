use bcrypt::{hash, verify, BcryptError};
use chrono::Utc;
use rusqlite::{params, Connection, Error as RusqliteError};

use crate::models::Author;

fn bcrypt_to_rusqlite_error(e: BcryptError) -> RusqliteError {
    RusqliteError::ToSqlConversionFailure(Box::new(e))
}

pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<(), RusqliteError> {
    let hashed_password = hash(password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
        params![username, hashed_password],
    )?;
    Ok(())
}

pub fn read_all_users(conn: &Connection) -> Result<Vec<Author>, RusqliteError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, is_active, last_login_time FROM users ORDER BY id",
    )?;
    let user_iter = stmt.query_map([], |row| {
        Ok(Author {
            id: row.get(0)?,
            username: row.get(1)?,
            is_active: row.get(2)?,
            last_login_time: row.get(3)?,
        })
    })?;

    let users = user_iter.filter_map(|u| u.ok()).collect();
    Ok(users)
}

pub fn read_user_by_username(conn: &Connection, username: &str) -> Option<Author> {
    conn.query_row(
        "SELECT id, username, is_active, last_login_time FROM users WHERE username = ?1",
        [username],
        |row| {
            Ok(Author {
                id: row.get(0)?,
                username: row.get(1)?,
                is_active: row.get(2)?,
                last_login_time: row.get(3)?,
            })
        },
    )
    .ok()
}

/// Checks a username/password pair against the stored bcrypt hash.
/// Suspended accounts never verify.
pub fn verify_credentials(conn: &Connection, username: &str, password: &str) -> Option<Author> {
    let res: rusqlite::Result<(String, bool)> = conn.query_row(
        "SELECT password_hash, is_active FROM users WHERE username = ?1",
        [username],
        |row| Ok((row.get(0)?, row.get(1)?)),
    );

    if let Ok((hash, is_active)) = res {
        if is_active && verify(password, &hash).unwrap_or(false) {
            return read_user_by_username(conn, username);
        }
    }
    None
}

pub fn update_last_login_time(conn: &Connection, username: &str) -> Result<(), RusqliteError> {
    let now = Utc::now().to_rfc3339();
    conn.execute(
        "UPDATE users SET last_login_time = ?1 WHERE username = ?2",
        params![now, username],
    )?;
    Ok(())
}

pub fn change_password(conn: &Connection, username: &str, new_password: &str) -> Result<usize, RusqliteError> {
    let hashed_password =
        hash(new_password, bcrypt::DEFAULT_COST).map_err(bcrypt_to_rusqlite_error)?;
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE username = ?2",
        params![hashed_password, username],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::db_setup;

    fn test_conn() -> Connection {
        let mut conn = Connection::open_in_memory().unwrap();
        db_setup::setup_blog_db(&mut conn).unwrap();
        conn
    }

    #[test]
    fn verify_credentials_accepts_the_right_password_only() {
        let conn = test_conn();
        create_user(&conn, "ines", "correct horse").unwrap();
        assert!(verify_credentials(&conn, "ines", "correct horse").is_some());
        assert!(verify_credentials(&conn, "ines", "wrong").is_none());
        assert!(verify_credentials(&conn, "nobody", "correct horse").is_none());
    }

    #[test]
    fn suspended_accounts_cannot_log_in() {
        let conn = test_conn();
        create_user(&conn, "ines", "correct horse").unwrap();
        conn.execute("UPDATE users SET is_active = 0 WHERE username = 'ines'", [])
            .unwrap();
        assert!(verify_credentials(&conn, "ines", "correct horse").is_none());
    }
}
