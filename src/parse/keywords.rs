//! Statistical keyword extraction for documents that declare no keywords.

use crate::index::tokenizer;
use jieba_rs::{KeywordExtract, TfIdf};
use std::sync::OnceLock;

static TFIDF: OnceLock<TfIdf> = OnceLock::new();

/// TF-IDF scorer over jieba's bundled IDF table and stop words
fn tfidf() -> &'static TfIdf {
    TFIDF.get_or_init(TfIdf::default)
}

/// Top `k` keywords of `text` by TF-IDF weight, heaviest first.
pub fn extract_keywords(text: &str, k: usize) -> Vec<String> {
    if k == 0 || text.trim().is_empty() {
        return Vec::new();
    }

    tfidf()
        .extract_keywords(tokenizer::segmenter(), text, k, Vec::new())
        .into_iter()
        .map(|keyword| keyword.keyword)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_by_weight() {
        tokenizer::init(&crate::config::default_custom_terms());
        let tags = extract_keywords("回测回测回测 策略 策略 行情", 2);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0], "回测");
    }

    #[test]
    fn test_skips_stop_words_and_short_pieces() {
        let tags = extract_keywords("the the the and a 持仓", 5);
        assert_eq!(tags, vec!["持仓"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_keywords("   ", 5).is_empty());
        assert!(extract_keywords("行情", 0).is_empty());
    }
}
