use actix_session::Session;
use actix_web::HttpResponse;
use serde::Serialize;

pub const LOGIN_URL: &str = "/author/login";

#[derive(Debug, Serialize, Clone)]
pub struct AuthenticatedAuthor {
    pub id: i64,
    pub username: String,
}

/// Reads the logged-in author out of the session, if any.
pub fn author_session(session: &Session) -> Option<AuthenticatedAuthor> {
    let id = session.get::<i64>("author_id").unwrap_or(None)?;
    let username = session.get::<String>("username").unwrap_or(None)?;
    Some(AuthenticatedAuthor { id, username })
}

/// The explicit guard every author-only handler calls first. An
/// unauthenticated request gets a redirect to the login page, never an
/// error page.
pub fn require_author(session: &Session) -> Result<AuthenticatedAuthor, HttpResponse> {
    author_session(session).ok_or_else(|| {
        HttpResponse::Found()
            .append_header(("location", LOGIN_URL))
            .finish()
    })
}
