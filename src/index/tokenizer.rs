//! Mixed CJK/Latin segmentation backed by jieba.
//!
//! The segmenter is process-wide. Call [`init`] once with the custom
//! vocabulary before indexing or querying; if nobody does, the first use
//! initializes it with the default term list.

use crate::config::default_custom_terms;
use jieba_rs::Jieba;
use regex::Regex;
use std::sync::OnceLock;
use tantivy::tokenizer::{
    LowerCaser, RawTokenizer, TextAnalyzer, Token, TokenStream, Tokenizer,
};
use tracing::{debug, info};

/// Name under which the text analyzer is registered with the index.
pub const TEXT_TOKENIZER: &str = "jieba";

/// Name under which the tag analyzer is registered with the index.
pub const TAG_TOKENIZER: &str = "tag";

/// Dictionary frequency given to custom terms so they win over splits.
const CUSTOM_TERM_FREQ: usize = 10_000;

static JIEBA: OnceLock<Jieba> = OnceLock::new();

fn build(terms: &[String]) -> Jieba {
    let mut jieba = Jieba::new();
    for term in terms {
        let term = term.trim();
        if !term.is_empty() {
            jieba.add_word(term, Some(CUSTOM_TERM_FREQ), None);
        }
    }
    jieba
}

/// Initialize the segmenter with a custom vocabulary.
///
/// Returns `false` if it was already initialized, in which case `terms` is ignored.
pub fn init(terms: &[String]) -> bool {
    let mut installed = false;
    JIEBA.get_or_init(|| {
        installed = true;
        build(terms)
    });
    if installed {
        info!("Segmenter initialized with {} custom terms", terms.len());
    } else {
        debug!("Segmenter already initialized, ignoring {} terms", terms.len());
    }
    installed
}

/// The process-wide segmenter, initialized with the default terms on first use
pub fn segmenter() -> &'static Jieba {
    JIEBA.get_or_init(|| {
        debug!("Segmenter used before init, loading default vocabulary");
        build(&default_custom_terms())
    })
}

/// Byte offset of `part` within `whole`; jieba hands back subslices of its input.
fn offset_in(whole: &str, part: &str) -> Option<usize> {
    let offset = (part.as_ptr() as usize).checked_sub(whole.as_ptr() as usize)?;
    (offset + part.len() <= whole.len()).then_some(offset)
}

fn is_word(piece: &str) -> bool {
    piece.chars().any(char::is_alphanumeric)
}

/// Fine-grained ("search" mode) segmentation with byte offsets.
pub fn segment_for_search(text: &str) -> Vec<(usize, &str)> {
    segmenter()
        .cut_for_search(text, true)
        .into_iter()
        .filter(|w| is_word(w))
        .filter_map(|w| offset_in(text, w).map(|offset| (offset, w)))
        .collect()
}

/// Coarse segmentation used for keyword statistics and query preparation.
pub fn cut(text: &str) -> Vec<&str> {
    segmenter()
        .cut(text, true)
        .into_iter()
        .filter(|w| is_word(w))
        .collect()
}

fn query_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?P<op>[-+])?(?P<field>[A-Za-z_][A-Za-z0-9_]*:)?(?P<word>[^\s()":]+)(?P<colon>:)?"#,
        )
        .expect("valid query word regex")
    })
}

fn segment_words(text: &str) -> String {
    query_word_re()
        .replace_all(text, |caps: &regex::Captures| {
            let op = caps.name("op").map_or("", |m| m.as_str());
            let field = caps.name("field").map_or("", |m| m.as_str());
            let word = &caps["word"];
            // a qualifier in front of a group or a quoted phrase
            let qualifier = caps.name("colon").is_some();
            let operator = op.is_empty() && field.is_empty() && matches!(word, "AND" | "OR" | "NOT");
            if qualifier || operator {
                return caps[0].to_string();
            }
            cut(word)
                .iter()
                .map(|piece| format!("{op}{field}\"{piece}\""))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .into_owned()
}

/// Cut the free text of a query into dictionary words, leaving its syntax alone.
///
/// Each word is quoted so the parser analyzes it as one unit; custom terms
/// such as `K线` or `C++` survive whole. Operators, field qualifiers,
/// grouping and quoted phrases pass through unchanged.
pub fn segment_query(text: &str) -> String {
    text.split('"')
        .enumerate()
        .map(|(i, part)| {
            if i % 2 == 1 {
                part.to_string()
            } else {
                segment_words(part)
            }
        })
        .collect::<Vec<_>>()
        .join("\"")
}

/// A token produced by the text analyzer, with byte offsets into the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyzedToken {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Run the text analyzer (segmentation + lowercasing) over `text`.
pub fn analyze(text: &str) -> Vec<AnalyzedToken> {
    let mut analyzer = text_analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while stream.advance() {
        let token = stream.token();
        tokens.push(AnalyzedToken {
            text: token.text.clone(),
            start: token.offset_from,
            end: token.offset_to,
        });
    }
    tokens
}

/// Distinct analyzed terms of `text`, in first-seen order.
pub fn analyze_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in analyze(text) {
        if !terms.contains(&token.text) {
            terms.push(token.text);
        }
    }
    terms
}

/// Analyzer for the text fields: jieba search-mode segmentation, lowercased.
pub fn text_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(JiebaTokenizer).filter(LowerCaser).build()
}

/// Analyzer for the tags field: whole value, lowercased.
pub fn tag_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(RawTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// tantivy adapter over the process-wide segmenter.
#[derive(Clone, Default)]
pub struct JiebaTokenizer;

pub struct JiebaTokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl Tokenizer for JiebaTokenizer {
    type TokenStream<'a> = JiebaTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let tokens = segment_for_search(text)
            .into_iter()
            .enumerate()
            .map(|(position, (offset, word))| Token {
                offset_from: offset,
                offset_to: offset + word.len(),
                position,
                text: word.to_string(),
                position_length: 1,
            })
            .collect();
        JiebaTokenStream { tokens, index: 0 }
    }
}

impl TokenStream for JiebaTokenStream {
    fn advance(&mut self) -> bool {
        if self.index < self.tokens.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.index - 1]
    }
}
