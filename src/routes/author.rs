use actix_csrf::extractor::{Csrf, CsrfGuarded, CsrfToken};
use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use std::collections::HashMap;
use tera::Tera;

use super::{base_context, db_error_response, redirect_to, render_page, set_notification};
use crate::config::Config;
use crate::helper::{blog_helpers, form_helpers};
use crate::middleware::{self, AuthenticatedAuthor};
use crate::DbPool;

#[derive(Deserialize)]
struct LoginForm {
    csrf_token: CsrfToken,
    username: String,
    password: String,
}

impl CsrfGuarded for LoginForm {
    fn csrf_token(&self) -> &CsrfToken {
        &self.csrf_token
    }
}

pub fn config_author(cfg: &mut web::ServiceConfig) {
    cfg.route("/login", web::get().to(show_login_form))
        .route("/login", web::post().to(handle_login))
        .route("/logout", web::post().to(handle_logout))
        .route("/drafts", web::get().to(show_draft_list))
        .route("/post/new", web::get().to(show_new_post_form))
        .route("/post/new", web::post().to(handle_new_post))
        .route("/post/{post_id}/edit", web::get().to(show_edit_post_form))
        .route("/post/{post_id}/edit", web::post().to(handle_edit_post))
        .route("/post/{post_id}/delete", web::post().to(delete_post_action))
        .route("/post/{post_id}/publish", web::post().to(publish_post_action))
        .route("/comment/{comment_id}/approve", web::post().to(approve_comment_action))
        .route("/comment/{comment_id}/remove", web::post().to(remove_comment_action));
}

// --- Login / logout ---

async fn show_login_form(session: Session, tera: web::Data<Tera>, token: CsrfToken) -> impl Responder {
    if middleware::author_session(&session).is_some() {
        return redirect_to("/author/drafts".to_string());
    }
    let mut ctx = base_context(&session);
    ctx.insert("csrf_token", token.get());
    let error = session.get::<String>("error").unwrap_or(None);
    if error.is_some() {
        session.remove("error");
    }
    ctx.insert("error", &error);
    render_page(&tera, "author/login.html", &ctx)
}

async fn handle_login(
    session: Session,
    pool: web::Data<DbPool>,
    form: Csrf<web::Form<LoginForm>>,
) -> impl Responder {
    let login_data = form.into_inner();
    if let Some(author) =
        blog_helpers::verify_author_credentials(pool.get_ref(), &login_data.username, &login_data.password)
    {
        session.insert("author_id", author.id).unwrap();
        session.insert("username", author.username.clone()).unwrap();
        session.remove("error");
        blog_helpers::record_author_login(pool.get_ref(), &author.username);
        redirect_to("/author/drafts".to_string())
    } else {
        session.insert("error", "Invalid credentials or account suspended.").unwrap();
        redirect_to(middleware::LOGIN_URL.to_string())
    }
}

async fn handle_logout(session: Session) -> impl Responder {
    session.clear();
    redirect_to("/".to_string())
}

// --- Draft listing ---

async fn show_draft_list(session: Session, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    let drafts = match blog_helpers::fetch_draft_posts(pool.get_ref()) {
        Ok(drafts) => drafts,
        Err(e) => return db_error_response("Failed to fetch drafts", e),
    };
    let mut ctx = base_context(&session);
    ctx.insert("posts", &drafts);
    render_page(&tera, "author/draft_list.html", &ctx)
}

// --- Post create / edit ---

fn render_post_form(
    session: &Session,
    tera: &Tera,
    heading: &str,
    action: &str,
    data: &form_helpers::PostFormData,
    errors: &HashMap<&'static str, String>,
) -> HttpResponse {
    let mut ctx = base_context(session);
    ctx.insert("heading", heading);
    ctx.insert("form_action", action);
    let fields = form_helpers::post_form_fields();
    ctx.insert("values", &data.values());
    ctx.insert("errors", &form_helpers::errors_context(&fields, errors));
    ctx.insert("fields", &fields);
    render_page(tera, "author/post_form.html", &ctx)
}

/// Validates a post submission and resolves its author account according to
/// the configured attribution mode. A failed resolution is reported as a
/// field error on `author`.
fn validate_post_submission(
    pool: &DbPool,
    config: &Config,
    current: &AuthenticatedAuthor,
    data: &form_helpers::PostFormData,
) -> Result<Result<i64, HashMap<&'static str, String>>, HttpResponse> {
    let mut errors = data.validate();
    let mut author_id = None;
    if !errors.contains_key("author") {
        match blog_helpers::resolve_post_author(pool, config.author_attribution, current, &data.author) {
            Ok(Some(author)) => author_id = Some(author.id),
            Ok(None) => {
                errors.insert("author", "No author account with that name exists.".to_string());
            }
            Err(e) => return Err(db_error_response("Failed to resolve post author", e)),
        }
    }
    match author_id {
        Some(author_id) if errors.is_empty() => Ok(Ok(author_id)),
        _ => Ok(Err(errors)),
    }
}

async fn show_new_post_form(session: Session, tera: web::Data<Tera>) -> impl Responder {
    let author = match middleware::require_author(&session) {
        Ok(author) => author,
        Err(redirect) => return redirect,
    };
    let data = form_helpers::PostFormData {
        author: author.username,
        title: String::new(),
        text: String::new(),
    };
    render_post_form(&session, &tera, "New post", "/author/post/new", &data, &HashMap::new())
}

async fn handle_new_post(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    form: web::Bytes,
) -> impl Responder {
    let author = match middleware::require_author(&session) {
        Ok(author) => author,
        Err(redirect) => return redirect,
    };
    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let data = form_helpers::PostFormData::from_map(&parsed);
    let author_id = match validate_post_submission(pool.get_ref(), &config, &author, &data) {
        Ok(Ok(author_id)) => author_id,
        Ok(Err(errors)) => {
            return render_post_form(&session, &tera, "New post", "/author/post/new", &data, &errors)
        }
        Err(response) => return response,
    };

    match blog_helpers::create_post(pool.get_ref(), author_id, &data.title, &data.text) {
        Ok(post_id) => {
            set_notification(&session, "Draft created.", "success");
            redirect_to(format!("/post/{}", post_id))
        }
        Err(e) => db_error_response("Failed to create post", e),
    }
}

async fn show_edit_post_form(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    let post_id = path.into_inner();
    let post = match blog_helpers::fetch_post(pool.get_ref(), post_id) {
        Ok(post) => post,
        Err(e) => return db_error_response("Failed to fetch post for editing", e),
    };
    let data = form_helpers::PostFormData {
        author: post.author_name.clone(),
        title: post.title.clone(),
        text: post.text.clone(),
    };
    let action = format!("/author/post/{}/edit", post_id);
    render_post_form(&session, &tera, "Edit post", &action, &data, &HashMap::new())
}

async fn handle_edit_post(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    config: web::Data<Config>,
    path: web::Path<i64>,
    form: web::Bytes,
) -> impl Responder {
    let author = match middleware::require_author(&session) {
        Ok(author) => author,
        Err(redirect) => return redirect,
    };
    let post_id = path.into_inner();
    // 404 before any form handling on an unknown post.
    let post = match blog_helpers::fetch_post(pool.get_ref(), post_id) {
        Ok(post) => post,
        Err(e) => return db_error_response("Failed to fetch post for editing", e),
    };

    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let data = form_helpers::PostFormData::from_map(&parsed);
    let action = format!("/author/post/{}/edit", post_id);
    let author_id = match validate_post_submission(pool.get_ref(), &config, &author, &data) {
        Ok(Ok(author_id)) => author_id,
        Ok(Err(errors)) => {
            return render_post_form(&session, &tera, "Edit post", &action, &data, &errors)
        }
        Err(response) => return response,
    };

    match blog_helpers::update_post(pool.get_ref(), post.id, author_id, &data.title, &data.text) {
        Ok(()) => {
            set_notification(&session, "Post updated.", "success");
            redirect_to(format!("/post/{}", post.id))
        }
        Err(e) => db_error_response("Failed to update post", e),
    }
}

// --- Post lifecycle actions ---

async fn delete_post_action(
    session: Session,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    match blog_helpers::delete_post(pool.get_ref(), path.into_inner()) {
        Ok(()) => {
            set_notification(&session, "Post deleted.", "success");
            redirect_to("/".to_string())
        }
        Err(e) => db_error_response("Failed to delete post", e),
    }
}

async fn publish_post_action(
    session: Session,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    let post_id = path.into_inner();
    match blog_helpers::publish_post(pool.get_ref(), post_id) {
        Ok(()) => {
            set_notification(&session, "Post published.", "success");
            redirect_to(format!("/post/{}", post_id))
        }
        Err(e) => db_error_response("Failed to publish post", e),
    }
}

// --- Comment moderation ---

async fn approve_comment_action(
    session: Session,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    match blog_helpers::approve_comment(pool.get_ref(), path.into_inner()) {
        Ok(post_id) => {
            set_notification(&session, "Comment approved.", "success");
            redirect_to(format!("/post/{}", post_id))
        }
        Err(e) => db_error_response("Failed to approve comment", e),
    }
}

async fn remove_comment_action(
    session: Session,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    if let Err(redirect) = middleware::require_author(&session) {
        return redirect;
    }
    match blog_helpers::remove_comment(pool.get_ref(), path.into_inner()) {
        Ok(post_id) => {
            set_notification(&session, "Comment removed.", "success");
            redirect_to(format!("/post/{}", post_id))
        }
        Err(e) => db_error_response("Failed to remove comment", e),
    }
}
