//! HTML parsing and text extraction

use super::{extract_keywords, normalize_whitespace, ParsedDocument};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

/// Containers that usually wrap the main text of documentation pages, in priority order
const CONTENT_CONTAINERS: &[&str] = &[
    ".content",
    ".main-content",
    ".theme-default-content",
    ".article-content",
    ".post-content",
    ".entry-content",
    ".page-content",
    ".documentation-content",
];

/// Elements that never carry document content
const BOILERPLATE: &str = "script, style, noscript, nav, header, footer";

/// Below this many characters the container text is considered a miss
const MIN_BODY_CHARS: usize = 100;

/// Code blocks this short are noise (inline `x`, `()`)
const MIN_CODE_CHARS: usize = 2;

/// Number of statistical keywords used when the page declares none
const TAG_COUNT: usize = 5;

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn element_text(elem: ElementRef<'_>) -> String {
    normalize_whitespace(&elem.text().collect::<String>())
}

fn flattened_text(elem: ElementRef<'_>) -> String {
    normalize_whitespace(&elem.text().collect::<Vec<_>>().join(" "))
}

fn first_match<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = selector(css)?;
    document.select(&sel).next()
}

/// Drop boilerplate subtrees before any text is read
fn strip_boilerplate(document: &mut Html) {
    let Some(sel) = selector(BOILERPLATE) else {
        return;
    };
    let ids: Vec<_> = document.select(&sel).map(|e| e.id()).collect();
    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn extract_title(document: &Html) -> String {
    ["title", "h1"]
        .iter()
        .filter_map(|css| first_match(document, css))
        .map(element_text)
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

fn content_root(document: &Html) -> ElementRef<'_> {
    CONTENT_CONTAINERS
        .iter()
        .chain(["main", "article", "body"].iter())
        .find_map(|css| first_match(document, css))
        .unwrap_or_else(|| document.root_element())
}

/// Paragraphs, list items and table rows of `root`, deduplicated, in document order
fn collect_lines(root: ElementRef<'_>) -> Vec<String> {
    let (Some(blocks), Some(cells)) = (selector("p, li, tr"), selector("th, td")) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for elem in root.select(&blocks) {
        let line = if elem.value().name() == "tr" {
            elem.select(&cells)
                .map(element_text)
                .filter(|c| !c.is_empty())
                .collect::<Vec<_>>()
                .join(" | ")
        } else {
            element_text(elem)
        };

        if !line.is_empty() && seen.insert(line.clone()) {
            lines.push(line);
        }
    }
    lines
}

fn extract_body(document: &Html) -> String {
    let root = content_root(document);
    let body = normalize_whitespace(&collect_lines(root).join(" "));
    if body.chars().count() >= MIN_BODY_CHARS {
        return body;
    }

    first_match(document, "body")
        .map(flattened_text)
        .unwrap_or_else(|| flattened_text(document.root_element()))
}

fn extract_headings(document: &Html) -> String {
    let Some(sel) = selector("h1, h2, h3, h4, h5, h6") else {
        return String::new();
    };
    document
        .select(&sel)
        .map(element_text)
        .filter(|h| !h.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn inside_pre(elem: ElementRef<'_>) -> bool {
    elem.ancestors()
        .filter_map(|a| a.value().as_element())
        .any(|e| e.name() == "pre")
}

fn extract_code_blocks(document: &Html) -> String {
    let Some(sel) = selector("pre, code") else {
        return String::new();
    };
    document
        .select(&sel)
        .filter(|e| !(e.value().name() == "code" && inside_pre(*e)))
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|code| code.chars().count() > MIN_CODE_CHARS)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Split a keywords declaration on ASCII, full-width and enumeration commas
pub fn split_keywords(declared: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in declared.split([',', '，', '、']) {
        let tag = tag.trim();
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}

fn declared_keywords(document: &Html) -> Option<String> {
    let sel = selector("meta")?;
    document
        .select(&sel)
        .find(|m| {
            m.value()
                .attr("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("keywords"))
        })
        .and_then(|m| m.value().attr("content"))
        .map(str::to_string)
}

/// Extract structured fields from raw markup.
///
/// Never fails: malformed input degrades to whatever the parser recovered,
/// and missing sections come back empty.
pub fn extract_document(raw: &str) -> ParsedDocument {
    let mut document = Html::parse_document(raw);
    strip_boilerplate(&mut document);

    let body = extract_body(&document);
    let tags = match declared_keywords(&document).map(|k| split_keywords(&k)) {
        Some(tags) if !tags.is_empty() => tags,
        _ => extract_keywords(&body, TAG_COUNT),
    };

    ParsedDocument {
        title: extract_title(&document),
        headings: extract_headings(&document),
        code_blocks: extract_code_blocks(&document),
        body,
        tags,
    }
}
