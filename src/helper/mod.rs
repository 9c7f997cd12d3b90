pub mod blog_helpers;
pub mod form_helpers;
pub mod sanitization_helpers;
