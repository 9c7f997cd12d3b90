use actix_session::Session;
use actix_web::HttpResponse;
use tera::{Context, Tera};

use crate::middleware;
use crate::models::db_operations::DbError;
use crate::models::Notification;

pub mod author;
pub mod public;

/// A context pre-populated with the session-dependent keys every page
/// template expects: the logged-in author (if any) and a one-shot
/// notification flash.
pub(crate) fn base_context(session: &Session) -> Context {
    let mut ctx = Context::new();
    // Always present (possibly null): Tera is strict about undefined keys.
    ctx.insert("current_author", &middleware::author_session(session));
    let notification = session.get::<Notification>("notification").unwrap_or(None);
    if notification.is_some() {
        session.remove("notification");
    }
    ctx.insert("notification", &notification);
    ctx
}

pub(crate) fn set_notification(session: &Session, message: &str, r#type: &str) {
    session
        .insert(
            "notification",
            Notification { message: message.to_string(), r#type: r#type.to_string() },
        )
        .unwrap();
}

pub(crate) fn render_page(tera: &Tera, template: &str, ctx: &Context) -> HttpResponse {
    match tera.render(template, ctx) {
        Ok(rendered) => HttpResponse::Ok()
            .content_type("text/html; charset=utf-8")
            .body(rendered),
        Err(err) => {
            log::error!("Template rendering error for '{}': {}", template, err);
            HttpResponse::InternalServerError().body("Template error")
        }
    }
}

pub(crate) fn redirect_to(location: String) -> HttpResponse {
    HttpResponse::Found()
        .append_header(("location", location))
        .finish()
}

/// Unknown identifiers become 404s; everything else is logged and surfaces
/// as a 500.
pub(crate) fn db_error_response(context: &str, e: DbError) -> HttpResponse {
    match e {
        DbError::NotFound(_) => HttpResponse::NotFound().body("Not found"),
        other => {
            log::error!("{}: {}", context, other);
            HttpResponse::InternalServerError().finish()
        }
    }
}
