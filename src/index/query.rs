//! Query construction for the five search modes.
//!
//! Free-form input goes through two stages: a strict parse that honours
//! the full syntax, and a degraded parse that keeps only plain terms.
//! Neither stage lets a syntax error escape; the caller gets a
//! [`ParsedQuery`] that says which stage produced the query.

use super::schema::{DocFields, TAGS_BOOST};
use super::tokenizer;
use crate::error::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;
use tantivy::query::{
    BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, PhraseQuery, Query, QueryParser, TermQuery,
};
use tantivy::schema::IndexRecordOption;
use tantivy::{Index, Term};

/// Field names a boolean expression may qualify terms with
const QUALIFIABLE_FIELDS: &[&str] = &["title", "content", "headings", "code_blocks", "tags"];

/// Outcome of turning user input into an executable query
pub enum ParsedQuery {
    /// The input parsed with its full syntax
    Strict(Box<dyn Query>),
    /// The input was simplified before it would parse
    Degraded { query: Box<dyn Query>, note: String },
    /// Nothing searchable was left
    Empty { note: String },
}

impl ParsedQuery {
    /// Fall back to `degraded` when the strict stage failed
    fn or_degrade(strict: Result<Box<dyn Query>>, degraded: impl FnOnce(String) -> Self) -> Self {
        match strict {
            Ok(query) => ParsedQuery::Strict(query),
            Err(e) => degraded(e.to_string()),
        }
    }
}

fn operator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(AND|OR|NOT)\b").expect("valid operator regex"))
}

fn qualifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z_]+:").expect("valid qualifier regex"))
}

fn grouping_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["()]"#).expect("valid grouping regex"))
}

fn not_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bNOT\s+").expect("valid NOT regex"))
}

fn field_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([A-Za-z_][A-Za-z0-9_\-]*):").expect("valid field regex"))
}

/// Strip boolean operators, field qualifiers, quotes and parentheses
pub fn strip_syntax(expr: &str) -> String {
    let text = operator_re().replace_all(expr, " ");
    let text = qualifier_re().replace_all(&text, " ");
    let text = grouping_re().replace_all(&text, " ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Analyzed terms a query would match, for highlighting
pub fn highlight_terms(text: &str) -> Vec<String> {
    tokenizer::analyze_terms(&strip_syntax(text))
}

/// Reject qualifiers naming fields that do not exist
fn check_qualifiers(expr: &str) -> Result<()> {
    for caps in field_name_re().captures_iter(expr) {
        let name = &caps[1];
        if !QUALIFIABLE_FIELDS.contains(&name) {
            return Err(Error::QuerySyntax(format!("unknown field '{}'", name)));
        }
    }
    Ok(())
}

/// Builds queries against one index
pub struct QueryBuilder<'a> {
    index: &'a Index,
    fields: DocFields,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(index: &'a Index, fields: DocFields) -> Self {
        Self { index, fields }
    }

    fn text_parser(&self) -> QueryParser {
        let text_fields = self.fields.text_fields();
        let mut parser =
            QueryParser::for_index(self.index, text_fields.iter().map(|(f, _)| *f).collect());
        for (field, boost) in text_fields {
            parser.set_field_boost(field, boost);
        }
        parser.set_field_boost(self.fields.tags, TAGS_BOOST);
        parser
    }

    /// `segmented` cuts free text into separate OR-ed words instead of phrases
    fn strict_parse(&self, text: &str, segmented: bool) -> Result<Box<dyn Query>> {
        check_qualifiers(text)?;
        if highlight_terms(text).is_empty() {
            return Err(Error::QuerySyntax("no searchable terms".to_string()));
        }
        // `NOT x` is spelled `-x` by the parser
        let text = not_re().replace_all(text, "-");
        let input = if segmented {
            tokenizer::segment_query(&text)
        } else {
            text.into_owned()
        };
        let query = self.text_parser().parse_query(&input)?;
        Ok(query)
    }

    fn content_parse(&self, text: &str) -> Result<Box<dyn Query>> {
        let parser = QueryParser::for_index(self.index, vec![self.fields.content]);
        let query = parser.parse_query(&tokenizer::segment_query(&strip_syntax(text)))?;
        Ok(query)
    }

    fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
        Box::new(BoostQuery::new(query, boost))
    }

    fn union(clauses: Vec<Box<dyn Query>>) -> Box<dyn Query> {
        Box::new(BooleanQuery::new(
            clauses.into_iter().map(|q| (Occur::Should, q)).collect(),
        ))
    }

    /// Plain multi-field OR over already analyzed terms
    pub fn terms_query(&self, terms: &[String]) -> Box<dyn Query> {
        let mut clauses = Vec::new();
        for (field, boost) in self.fields.text_fields() {
            for term in terms {
                let query = TermQuery::new(
                    Term::from_field_text(field, term),
                    IndexRecordOption::WithFreqs,
                );
                clauses.push(Self::boosted(Box::new(query), boost));
            }
        }
        Self::union(clauses)
    }

    /// Multi-field keyword query; narrows to the content field if the input will not parse
    pub fn keyword(&self, text: &str) -> ParsedQuery {
        ParsedQuery::or_degrade(self.strict_parse(text, true), |reason| {
            match self.content_parse(text) {
                Ok(query) => ParsedQuery::Degraded {
                    query,
                    note: format!("query not understood ({reason}); searched content only"),
                },
                Err(e) => ParsedQuery::Empty {
                    note: format!("query not understood: {e}"),
                },
            }
        })
    }

    /// Boolean expression; degrades to a plain OR over whatever terms survive
    pub fn boolean(&self, expr: &str) -> ParsedQuery {
        ParsedQuery::or_degrade(self.strict_parse(expr, false), |reason| {
            let cleaned = strip_syntax(expr);
            let terms = tokenizer::analyze_terms(&cleaned);
            if terms.is_empty() {
                return ParsedQuery::Empty {
                    note: format!("no valid terms in query ({reason})"),
                };
            }
            ParsedQuery::Degraded {
                query: self.terms_query(&terms),
                note: format!(
                    "invalid boolean syntax ({reason}); searched for any of: {}",
                    terms.join(" ")
                ),
            }
        })
    }

    /// Exact adjacency of the phrase's terms in any text field
    pub fn phrase(&self, phrase: &str) -> Option<Box<dyn Query>> {
        let words: Vec<String> = tokenizer::analyze(phrase)
            .into_iter()
            .map(|t| t.text)
            .collect();
        if words.is_empty() {
            return None;
        }

        let clauses = self
            .fields
            .text_fields()
            .into_iter()
            .map(|(field, boost)| {
                let terms: Vec<Term> = words
                    .iter()
                    .map(|w| Term::from_field_text(field, w))
                    .collect();
                let query: Box<dyn Query> = match terms.as_slice() {
                    [single] => Box::new(TermQuery::new(
                        single.clone(),
                        IndexRecordOption::WithFreqs,
                    )),
                    _ => Box::new(PhraseQuery::new(terms)),
                };
                Self::boosted(query, boost)
            })
            .collect();
        Some(Self::union(clauses))
    }

    /// Edit-distance match of a single term in any text field
    pub fn fuzzy(&self, term: &str, distance: u8) -> Option<Box<dyn Query>> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return None;
        }

        let clauses = self
            .fields
            .text_fields()
            .into_iter()
            .map(|(field, boost)| {
                let query = FuzzyTermQuery::new(Term::from_field_text(field, &term), distance, true);
                Self::boosted(Box::new(query), boost)
            })
            .collect();
        Some(Self::union(clauses))
    }

    fn tag_term(&self, tag: &str) -> Box<dyn Query> {
        let query = TermQuery::new(
            Term::from_field_text(self.fields.tags, &tag.trim().to_lowercase()),
            IndexRecordOption::WithFreqs,
        );
        Self::boosted(Box::new(query), TAGS_BOOST)
    }

    /// Tag match, optionally narrowed by a keyword query over the text fields
    pub fn tag(&self, tag: &str, keyword: &str) -> ParsedQuery {
        if tag.trim().is_empty() {
            return ParsedQuery::Empty {
                note: "no tag given".to_string(),
            };
        }
        let tag_query = self.tag_term(tag);
        if keyword.trim().is_empty() {
            return ParsedQuery::Strict(tag_query);
        }

        let must = |query: Box<dyn Query>, tag_query: Box<dyn Query>| -> Box<dyn Query> {
            Box::new(BooleanQuery::new(vec![
                (Occur::Must, tag_query),
                (Occur::Must, query),
            ]))
        };
        match self.keyword(keyword) {
            ParsedQuery::Strict(query) => ParsedQuery::Strict(must(query, tag_query)),
            ParsedQuery::Degraded { query, note } => ParsedQuery::Degraded {
                query: must(query, tag_query),
                note,
            },
            ParsedQuery::Empty { note } => ParsedQuery::Degraded {
                query: tag_query,
                note: format!("{note}; matched on tag only"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_syntax() {
        assert_eq!(
            strip_syntax(r#"title:(行情 AND "K线") OR NOT content:api"#),
            "行情 K线 api"
        );
        assert_eq!(strip_syntax("AND OR NOT"), "");
    }

    #[test]
    fn test_check_qualifiers() {
        assert!(check_qualifiers("title:api AND content:行情").is_ok());
        assert!(check_qualifiers("-tags:sdk").is_ok());
        assert!(check_qualifiers("not-a-valid-field:::@@").is_err());
    }

    #[test]
    fn test_highlight_terms() {
        let terms = highlight_terms("title:API OR 行情");
        assert!(terms.contains(&"api".to_string()));
        assert!(terms.contains(&"行情".to_string()));
    }
}
