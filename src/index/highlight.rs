//! Context-fragment highlighting of stored field text.

use super::tokenizer;
use levenshtein_automata::{Distance, LevenshteinAutomatonBuilder, DFA};
use std::collections::HashSet;
use std::sync::OnceLock;

/// Fragment window, in characters
const MAX_FRAGMENT_CHARS: usize = 300;

/// Context kept on each side of a match, in characters
const SURROUND_CHARS: usize = 50;

const FRAGMENT_SEPARATOR: &str = "...";

/// Largest edit distance a fuzzy matcher supports
const MAX_FUZZY_DISTANCE: u8 = 2;

/// Automaton builders per distance; a transposition counts as a single edit
fn automaton_builder(distance: u8) -> &'static LevenshteinAutomatonBuilder {
    static BUILDERS: [OnceLock<LevenshteinAutomatonBuilder>; 3] =
        [OnceLock::new(), OnceLock::new(), OnceLock::new()];
    let distance = distance.min(MAX_FUZZY_DISTANCE);
    BUILDERS[usize::from(distance)].get_or_init(|| LevenshteinAutomatonBuilder::new(distance, true))
}

/// Which analyzed tokens count as matches
#[derive(Default)]
pub struct TermMatcher {
    exact: HashSet<String>,
    fuzzy: Vec<DFA>,
}

impl TermMatcher {
    pub fn exact<I>(terms: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        Self {
            exact: terms.into_iter().collect(),
            fuzzy: Vec::new(),
        }
    }

    /// Tokens within `distance` edits of `term`, the same way the fuzzy query counts them
    pub fn fuzzy(term: &str, distance: u8) -> Self {
        let dfa = automaton_builder(distance).build_dfa(&term.to_lowercase());
        Self {
            exact: HashSet::new(),
            fuzzy: vec![dfa],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.fuzzy.is_empty()
    }

    fn matches(&self, token: &str) -> bool {
        self.exact.contains(token)
            || self
                .fuzzy
                .iter()
                .any(|dfa| matches!(dfa.eval(token), Distance::Exact(_)))
    }
}

fn back_chars(text: &str, idx: usize, n: usize) -> usize {
    text[..idx]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(idx)
}

fn forward_chars(text: &str, idx: usize, n: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| idx + i)
        .unwrap_or(text.len())
}

#[derive(Debug)]
struct Fragment {
    start: usize,
    end: usize,
    spans: Vec<(usize, usize)>,
}

/// Wraps matched terms in markers and cuts the best context fragments
#[derive(Debug, Clone)]
pub struct Highlighter {
    pre: String,
    post: String,
}

impl Highlighter {
    pub fn new(pre: impl Into<String>, post: impl Into<String>) -> Self {
        Self {
            pre: pre.into(),
            post: post.into(),
        }
    }

    /// Byte spans of matching tokens, overlaps merged
    fn match_spans(&self, text: &str, matcher: &TermMatcher) -> Vec<(usize, usize)> {
        let mut spans: Vec<(usize, usize)> = tokenizer::analyze(text)
            .into_iter()
            .filter(|t| matcher.matches(&t.text))
            .map(|t| (t.start, t.end))
            .collect();
        spans.sort_unstable();

        let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
        for (start, end) in spans {
            match merged.last_mut() {
                Some(last) if start < last.1 => last.1 = last.1.max(end),
                _ => merged.push((start, end)),
            }
        }
        merged
    }

    fn fragments(&self, text: &str, spans: Vec<(usize, usize)>) -> Vec<Fragment> {
        let mut fragments: Vec<Fragment> = Vec::new();
        for (start, end) in spans {
            let window_end = forward_chars(text, end, SURROUND_CHARS);
            if let Some(current) = fragments.last_mut() {
                if text[current.start..window_end].chars().count() <= MAX_FRAGMENT_CHARS {
                    current.end = window_end;
                    current.spans.push((start, end));
                    continue;
                }
            }
            fragments.push(Fragment {
                start: back_chars(text, start, SURROUND_CHARS),
                end: window_end,
                spans: vec![(start, end)],
            });
        }
        fragments
    }

    fn render(&self, text: &str, fragment: &Fragment) -> String {
        let mut out = String::new();
        let mut cursor = fragment.start;
        for &(start, end) in &fragment.spans {
            let start = start.max(cursor);
            out.push_str(&text[cursor..start]);
            out.push_str(&self.pre);
            out.push_str(&text[start..end]);
            out.push_str(&self.post);
            cursor = end;
        }
        out.push_str(&text[cursor..fragment.end.max(cursor)]);
        out.trim().to_string()
    }

    /// Up to `top` fragments of `text` with matches marked, or `None` if nothing matched
    pub fn highlight(&self, text: &str, matcher: &TermMatcher, top: usize) -> Option<String> {
        if text.is_empty() || matcher.is_empty() || top == 0 {
            return None;
        }

        let spans = self.match_spans(text, matcher);
        if spans.is_empty() {
            return None;
        }

        let mut fragments = self.fragments(text, spans);
        // best first, earlier wins ties; then back to reading order
        fragments.sort_by(|a, b| b.spans.len().cmp(&a.spans.len()).then(a.start.cmp(&b.start)));
        fragments.truncate(top);
        fragments.sort_by_key(|f| f.start);

        Some(
            fragments
                .iter()
                .map(|f| self.render(text, f))
                .collect::<Vec<_>>()
                .join(FRAGMENT_SEPARATOR),
        )
    }
}
