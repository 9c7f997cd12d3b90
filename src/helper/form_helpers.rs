use actix_web::{web, HttpResponse};
use serde::Serialize;
use std::collections::HashMap;
use url::form_urlencoded;

use super::sanitization_helpers;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_COMMENT_AUTHOR_LEN: usize = 200;

/// Parses URL-encoded form data from bytes, handling potential UTF-8 errors gracefully.
pub fn parse_form(form_bytes: &web::Bytes) -> Result<HashMap<String, String>, HttpResponse> {
    let body = match String::from_utf8(form_bytes.to_vec()) {
        Ok(s) => s,
        Err(_) => return Err(HttpResponse::BadRequest().body("Invalid UTF-8 in request body.")),
    };
    Ok(form_urlencoded::parse(body.as_bytes()).into_owned().collect())
}

/// Presentation hint for a form field. Cosmetic only; validation semantics
/// come from the bounds below.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Widget {
    SingleLine,
    MultiLine,
}

#[derive(Debug, Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: Widget,
    pub css_class: &'static str,
}

/// Fields a client may submit for a post. Everything else (`id`,
/// `create_date`, `published_date`) is server-assigned.
pub fn post_form_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec { name: "author", label: "Author", widget: Widget::SingleLine, css_class: "textinputclass" },
        FieldSpec { name: "title", label: "Title", widget: Widget::SingleLine, css_class: "textinputclass" },
        FieldSpec { name: "text", label: "Text", widget: Widget::MultiLine, css_class: "editable postcontent" },
    ]
}

/// Fields a client may submit for a comment. `post`, `create_date` and
/// `approved_comment` are server-assigned.
pub fn comment_form_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec { name: "author", label: "Name", widget: Widget::SingleLine, css_class: "textinputclass" },
        FieldSpec { name: "text", label: "Comment", widget: Widget::MultiLine, css_class: "editable" },
    ]
}

/// A complete field -> message map for template rendering: every declared
/// field is present, with an empty message when it validated cleanly.
pub fn errors_context(
    fields: &[FieldSpec],
    errors: &HashMap<&'static str, String>,
) -> HashMap<&'static str, String> {
    fields
        .iter()
        .map(|f| (f.name, errors.get(f.name).cloned().unwrap_or_default()))
        .collect()
}

#[derive(Debug, Serialize, Clone)]
pub struct PostFormData {
    pub author: String,
    pub title: String,
    pub text: String,
}

impl PostFormData {
    /// Builds the stored form of a submission: trimmed, and the title
    /// stripped of markup so validation bounds what actually persists.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let raw_title = map.get("title").map_or("", String::as_str);
        PostFormData {
            author: map.get("author").map_or("", |s| s.trim()).to_string(),
            title: sanitization_helpers::strip_all_html(raw_title).trim().to_string(),
            text: map.get("text").map_or("", |s| s.trim()).to_string(),
        }
    }

    /// Returns field name -> message for every violation; empty means the
    /// trimmed data is ready for persistence.
    pub fn validate(&self) -> HashMap<&'static str, String> {
        let mut errors = HashMap::new();
        if self.author.is_empty() {
            errors.insert("author", "Author is required.".to_string());
        }
        if self.title.is_empty() {
            errors.insert("title", "Title is required.".to_string());
        } else if self.title.chars().count() > MAX_TITLE_LEN {
            errors.insert("title", format!("Title must be at most {} characters.", MAX_TITLE_LEN));
        }
        if self.text.is_empty() {
            errors.insert("text", "Text is required.".to_string());
        }
        errors
    }

    pub fn values(&self) -> HashMap<&'static str, &str> {
        HashMap::from([
            ("author", self.author.as_str()),
            ("title", self.title.as_str()),
            ("text", self.text.as_str()),
        ])
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct CommentFormData {
    pub author: String,
    pub text: String,
}

impl CommentFormData {
    /// Display names are stripped of markup here, before validation.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        let raw_author = map.get("author").map_or("", String::as_str);
        CommentFormData {
            author: sanitization_helpers::strip_all_html(raw_author).trim().to_string(),
            text: map.get("text").map_or("", |s| s.trim()).to_string(),
        }
    }

    pub fn validate(&self) -> HashMap<&'static str, String> {
        let mut errors = HashMap::new();
        if self.author.is_empty() {
            errors.insert("author", "Name is required.".to_string());
        } else if self.author.chars().count() > MAX_COMMENT_AUTHOR_LEN {
            errors.insert(
                "author",
                format!("Name must be at most {} characters.", MAX_COMMENT_AUTHOR_LEN),
            );
        }
        if self.text.is_empty() {
            errors.insert("text", "Comment text is required.".to_string());
        }
        errors
    }

    pub fn values(&self) -> HashMap<&'static str, &str> {
        HashMap::from([("author", self.author.as_str()), ("text", self.text.as_str())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn post_form_accepts_a_valid_submission() {
        let data = PostFormData::from_map(&map(&[
            ("author", "ines"),
            ("title", "Hi"),
            ("text", "body"),
        ]));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn post_form_rejects_an_overlong_title() {
        let long_title = "x".repeat(MAX_TITLE_LEN + 1);
        let data = PostFormData::from_map(&map(&[
            ("author", "ines"),
            ("title", &long_title),
            ("text", "body"),
        ]));
        assert!(data.validate().contains_key("title"));

        let edge_title = "x".repeat(MAX_TITLE_LEN);
        let data = PostFormData::from_map(&map(&[
            ("author", "ines"),
            ("title", &edge_title),
            ("text", "body"),
        ]));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn post_form_rejects_missing_required_fields() {
        let data = PostFormData::from_map(&map(&[("title", "   "), ("text", "")]));
        let errors = data.validate();
        assert!(errors.contains_key("author"));
        assert!(errors.contains_key("title"));
        assert!(errors.contains_key("text"));
    }

    #[test]
    fn comment_form_bounds_the_display_name() {
        let long_name = "y".repeat(MAX_COMMENT_AUTHOR_LEN + 1);
        let data = CommentFormData::from_map(&map(&[("author", &long_name), ("text", "nice")]));
        assert!(data.validate().contains_key("author"));

        let data = CommentFormData::from_map(&map(&[("author", "A"), ("text", "nice")]));
        assert!(data.validate().is_empty());
    }

    #[test]
    fn form_data_is_trimmed() {
        let data = CommentFormData::from_map(&map(&[("author", "  A  "), ("text", " nice ")]));
        assert_eq!(data.author, "A");
        assert_eq!(data.text, "nice");
    }

    #[test]
    fn titles_are_stripped_of_tags_but_not_entity_encoded() {
        let data = PostFormData::from_map(&map(&[
            ("author", "ines"),
            ("title", "<b>Tom & Jerry</b>"),
            ("text", "body"),
        ]));
        assert_eq!(data.title, "Tom & Jerry");
        assert!(data.validate().is_empty());
    }

    #[test]
    fn ampersand_heavy_title_validates_at_its_stored_length() {
        let title = "&".repeat(MAX_TITLE_LEN);
        let data = PostFormData::from_map(&map(&[
            ("author", "ines"),
            ("title", &title),
            ("text", "body"),
        ]));
        assert_eq!(data.title.chars().count(), MAX_TITLE_LEN);
        assert!(data.validate().is_empty());
    }

    #[test]
    fn comment_names_are_stripped_at_parse_time() {
        let data = CommentFormData::from_map(&map(&[("author", "<i>A</i> & B"), ("text", "hi")]));
        assert_eq!(data.author, "A & B");
        assert!(data.validate().is_empty());
    }
}
