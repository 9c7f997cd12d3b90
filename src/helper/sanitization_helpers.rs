use ammonia::Builder;
use pulldown_cmark::{html, Options, Parser};
use std::collections::HashSet;

/// Renders Markdown post content to HTML and sanitizes the result down to a
/// whitelisted subset. All scripting capability (`onclick`, `onerror`,
/// script/style tags) is removed.
pub fn render_markdown_content(markdown_input: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown_input, options);
    let mut unsafe_html = String::new();
    html::push_html(&mut unsafe_html, parser);

    let tags_to_allow = [
        "h1", "h2", "h3", "h4", "h5", "h6", "b", "strong", "i", "em", "p", "br",
        "a", "ul", "ol", "li", "blockquote", "code", "pre", "hr", "img", "table",
        "thead", "tbody", "tr", "th", "td", "s", "del",
    ];
    let safe_tags = tags_to_allow.iter().cloned().collect::<HashSet<_>>();

    let safe_attributes = ["src", "href", "alt", "title"];
    let generic_attributes = safe_attributes.iter().cloned().collect::<HashSet<_>>();

    Builder::new()
        .tags(safe_tags)
        .generic_attributes(generic_attributes)
        .link_rel(Some("nofollow ugc"))
        .clean(&unsafe_html)
        .to_string()
}

/// Strips all HTML tags from a string, leaving only the plain text content.
/// Used for titles and comment display names before validation. The result
/// is plain text, not entity-encoded: templates autoescape on display.
pub fn strip_all_html(input: &str) -> String {
    let stripped = Builder::new()
        .tags(HashSet::new())
        .clean(input)
        .to_string();
    html_escape::decode_html_entities(&stripped).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_renders_to_whitelisted_html() {
        let rendered = render_markdown_content("# Hello\n\nSome *emphasis*.");
        assert!(rendered.contains("<h1>"));
        assert!(rendered.contains("<em>emphasis</em>"));
    }

    #[test]
    fn scripting_is_removed_from_rendered_content() {
        let rendered = render_markdown_content("hi <script>alert(1)</script> <img src=x onerror=alert(1)>");
        assert!(!rendered.contains("<script"));
        assert!(!rendered.contains("onerror"));
    }

    #[test]
    fn strip_all_html_leaves_plain_text() {
        assert_eq!(strip_all_html("<b>Hi</b> there"), "Hi there");
    }

    #[test]
    fn strip_all_html_does_not_entity_encode() {
        assert_eq!(strip_all_html("Tom & Jerry"), "Tom & Jerry");
        assert_eq!(strip_all_html("a < b"), "a < b");
        assert_eq!(strip_all_html("&".repeat(60).as_str()), "&".repeat(60));
    }
}
