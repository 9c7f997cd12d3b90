use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use tera::Tera;

use super::{base_context, db_error_response, redirect_to, render_page};
use crate::helper::{blog_helpers, form_helpers, sanitization_helpers};
use crate::middleware;
use crate::DbPool;

pub fn config_public(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(show_post_list))
        .route("/about", web::get().to(show_about_page))
        .route("/post/{post_id}", web::get().to(show_post_detail))
        .route("/post/{post_id}/comment", web::get().to(show_comment_form))
        .route("/post/{post_id}/comment", web::post().to(handle_comment_form));
}

/// The homepage: every published post, most recent first.
async fn show_post_list(session: Session, tera: web::Data<Tera>, pool: web::Data<DbPool>) -> impl Responder {
    let posts = match blog_helpers::fetch_published_posts(pool.get_ref()) {
        Ok(posts) => posts,
        Err(e) => return db_error_response("Failed to fetch published posts", e),
    };
    let mut ctx = base_context(&session);
    ctx.insert("posts", &posts);
    render_page(&tera, "blog/post_list.html", &ctx)
}

async fn show_about_page(session: Session, tera: web::Data<Tera>) -> impl Responder {
    let ctx = base_context(&session);
    render_page(&tera, "blog/about.html", &ctx)
}

async fn show_post_detail(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    let post_id = path.into_inner();
    let (post, comments) = match blog_helpers::fetch_post_with_comments(pool.get_ref(), post_id) {
        Ok(found) => found,
        Err(e) => return db_error_response("Failed to fetch post detail", e),
    };

    let mut ctx = base_context(&session);
    ctx.insert("post", &post);
    ctx.insert("rendered_text", &sanitization_helpers::render_markdown_content(&post.text));
    ctx.insert("comments", &comments);

    // Moderation view: the logged-in author also sees what is still waiting
    // for approval. Visitors only ever get the approved set.
    let pending = if middleware::author_session(&session).is_some() {
        match blog_helpers::fetch_pending_comments(pool.get_ref(), post_id) {
            Ok(pending) => pending,
            Err(e) => return db_error_response("Failed to fetch pending comments", e),
        }
    } else {
        Vec::new()
    };
    ctx.insert("pending_comments", &pending);

    render_page(&tera, "blog/post_detail.html", &ctx)
}

fn render_comment_form(
    session: &Session,
    tera: &Tera,
    post: &crate::models::Post,
    data: &form_helpers::CommentFormData,
    errors: &std::collections::HashMap<&'static str, String>,
) -> HttpResponse {
    let mut ctx = base_context(session);
    ctx.insert("post", post);
    let fields = form_helpers::comment_form_fields();
    ctx.insert("values", &data.values());
    ctx.insert("errors", &form_helpers::errors_context(&fields, errors));
    ctx.insert("fields", &fields);
    render_page(tera, "blog/comment_form.html", &ctx)
}

async fn show_comment_form(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> impl Responder {
    // Unknown post id is a 404 before any form handling.
    let post = match blog_helpers::fetch_post(pool.get_ref(), path.into_inner()) {
        Ok(post) => post,
        Err(e) => return db_error_response("Failed to fetch post for comment form", e),
    };
    let empty = form_helpers::CommentFormData { author: String::new(), text: String::new() };
    render_comment_form(&session, &tera, &post, &empty, &Default::default())
}

async fn handle_comment_form(
    session: Session,
    tera: web::Data<Tera>,
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    form: web::Bytes,
) -> impl Responder {
    let post = match blog_helpers::fetch_post(pool.get_ref(), path.into_inner()) {
        Ok(post) => post,
        Err(e) => return db_error_response("Failed to fetch post for comment submission", e),
    };

    let parsed = match form_helpers::parse_form(&form) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let data = form_helpers::CommentFormData::from_map(&parsed);
    let errors = data.validate();
    if !errors.is_empty() {
        // No partial save: the form comes back with the prior input.
        return render_comment_form(&session, &tera, &post, &data, &errors);
    }

    match blog_helpers::add_comment(pool.get_ref(), post.id, &data.author, &data.text) {
        Ok(_) => redirect_to(format!("/post/{}", post.id)),
        Err(e) => db_error_response("Failed to store comment", e),
    }
}
