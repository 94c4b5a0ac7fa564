//! Document parsing and text extraction
//!
//! This module handles:
//! - Content type detection for fetched documents
//! - Heuristic HTML extraction into indexable fields
//! - Keyword (tag) derivation

mod html;
mod keywords;

pub use html::*;
pub use keywords::*;

/// Content types we can recognise from a response header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Html,
    Other,
}

impl ContentType {
    /// Detect content type from MIME type
    pub fn from_mime(mime: &str) -> Self {
        let mime_lower = mime.to_lowercase();
        if mime_lower.contains("html") {
            ContentType::Html
        } else {
            ContentType::Other
        }
    }

    /// Whether documents of this type can be extracted
    pub fn is_markup(self) -> bool {
        matches!(self, ContentType::Html)
    }
}

/// Structured fields extracted from a markup document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDocument {
    /// Document title, empty if none was found
    pub title: String,

    /// Main text content
    pub body: String,

    /// Heading texts, newline separated, in document order
    pub headings: String,

    /// Code and preformatted blocks, blank-line separated
    pub code_blocks: String,

    /// Keyword tags
    pub tags: Vec<String>,
}

/// Collapse every run of whitespace (including newlines) into a single space
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !result.is_empty() {
                result.push(' ');
            }
            pending_space = false;
            result.push(c);
        }
    }

    result
}

/// First `max_chars` characters of `text`, never splitting a code point
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_from_mime() {
        assert_eq!(ContentType::from_mime("text/html; charset=utf-8"), ContentType::Html);
        assert_eq!(ContentType::from_mime("application/xhtml+xml"), ContentType::Html);
        assert_eq!(ContentType::from_mime("application/json"), ContentType::Other);
        assert!(!ContentType::from_mime("image/png").is_markup());
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  hello   world  "), "hello world");
        assert_eq!(normalize_whitespace("line1\n\n\nline2\tend"), "line1 line2 end");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("测试文档内容", 2), "测试");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
