//! On-disk full-text index
//!
//! This module handles:
//! - Schema with boosted text fields, exact identifiers and a tag list
//! - Deduplicating ingestion of downloaded documents
//! - Keyword, boolean, phrase, fuzzy and tag search
//! - Result formatting with highlighted fragments

mod highlight;
mod query;
mod schema;
mod session;
pub mod tokenizer;

pub use highlight::{Highlighter, TermMatcher};
pub use query::{strip_syntax, ParsedQuery, QueryBuilder};
pub use schema::{build_schema, describe_schema, DocFields, FieldDescriptor};
pub use session::WriterSession;

use crate::error::{Error, Result};
use crate::parse::{extract_document, truncate_chars, ParsedDocument};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use tantivy::collector::{DocSetCollector, TopDocs};
use tantivy::directory::MmapDirectory;
use tantivy::query::AllQuery;
use tantivy::schema::Value;
use tantivy::{DocAddress, Index, IndexReader, ReloadPolicy, Score, TantivyDocument};
use tracing::{debug, error, info, warn};

/// Characters of stored content returned with each hit
const CONTENT_PREVIEW_CHARS: usize = 500;

/// Characters of plain content used when nothing could be highlighted
const FALLBACK_SNIPPET_CHARS: usize = 300;

/// Identifier of the scoring model: per-field BM25 combined through field boosts
pub const SCORER: &str = "BM25F";

/// A stored document file and the URL it was fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub file_path: PathBuf,
    pub url: String,
}

/// Outcome counts of one ingestion batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexReport {
    pub total_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped_count: usize,
}

/// One formatted search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub url: String,
    pub score: f32,
    pub highlighted_title: String,
    pub highlighted_content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Results of one query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
    /// Set when the query had to be simplified or matched nothing searchable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl SearchResults {
    pub fn empty(query: impl Into<String>, note: Option<String>) -> Self {
        Self {
            query: query.into(),
            total_hits: 0,
            results: Vec::new(),
            note,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_docs: u64,
    pub index_dir: String,
    pub schema_fields: Vec<FieldDescriptor>,
    pub scorer: &'static str,
}

struct IndexState {
    index: Index,
    reader: IndexReader,
}

/// Owner of the on-disk index
pub struct IndexEngine {
    dir: PathBuf,
    fields: DocFields,
    state: RwLock<IndexState>,
    highlighter: Highlighter,
}

fn open_state(dir: &Path) -> Result<(IndexState, DocFields)> {
    std::fs::create_dir_all(dir)?;
    let (schema, fields) = build_schema();
    let index = Index::open_or_create(MmapDirectory::open(dir)?, schema)?;

    index
        .tokenizers()
        .register(tokenizer::TEXT_TOKENIZER, tokenizer::text_analyzer());
    index
        .tokenizers()
        .register(tokenizer::TAG_TOKENIZER, tokenizer::tag_analyzer());

    let reader: IndexReader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::Manual)
        .try_into()?;

    Ok((IndexState { index, reader }, fields))
}

fn text_of(doc: &TantivyDocument, field: tantivy::schema::Field) -> String {
    doc.get_first(field)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

impl IndexEngine {
    /// Open the index in `dir`, creating it if needed
    pub fn open(dir: &Path, highlighter: Highlighter) -> Result<Self> {
        let (state, fields) = open_state(dir)?;
        info!("Opened index at {:?}", dir);
        Ok(Self {
            dir: dir.to_path_buf(),
            fields,
            state: RwLock::new(state),
            highlighter,
        })
    }

    fn state(&self) -> Result<RwLockReadGuard<'_, IndexState>> {
        self.state
            .read()
            .map_err(|_| Error::Other("index state lock poisoned".to_string()))
    }

    /// Every URL currently in the index
    pub fn indexed_urls(&self) -> Result<HashSet<String>> {
        let state = self.state()?;
        let searcher = state.reader.searcher();
        let addresses = searcher.search(&AllQuery, &DocSetCollector)?;

        let mut urls = HashSet::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher.doc(address)?;
            urls.insert(text_of(&doc, self.fields.url));
        }
        Ok(urls)
    }

    fn to_document(&self, source: &DocumentSource, parsed: ParsedDocument) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.url, &source.url);
        doc.add_text(self.fields.file_path, source.file_path.to_string_lossy());
        doc.add_text(self.fields.title, &parsed.title);
        doc.add_text(self.fields.content, &parsed.body);
        doc.add_text(self.fields.headings, &parsed.headings);
        doc.add_text(self.fields.code_blocks, &parsed.code_blocks);
        for tag in &parsed.tags {
            doc.add_text(self.fields.tags, tag);
        }
        doc
    }

    fn read_source(source: &DocumentSource) -> Result<ParsedDocument> {
        let bytes = std::fs::read(&source.file_path)?;
        Ok(extract_document(&String::from_utf8_lossy(&bytes)))
    }

    /// Ingest documents whose URL is not yet indexed.
    ///
    /// Failures are counted per document and never abort the batch.
    pub fn add_documents(&self, sources: &[DocumentSource]) -> IndexReport {
        let mut report = IndexReport {
            total_count: sources.len(),
            ..Default::default()
        };
        if sources.is_empty() {
            return report;
        }

        let mut seen = match self.indexed_urls() {
            Ok(urls) => urls,
            Err(e) => {
                error!("Cannot read indexed URLs: {}", e);
                report.failure_count = sources.len();
                return report;
            }
        };

        let fresh: Vec<&DocumentSource> = sources
            .iter()
            .filter(|s| seen.insert(s.url.clone()))
            .collect();
        report.skipped_count = sources.len() - fresh.len();
        if fresh.is_empty() {
            info!("All {} documents already indexed", sources.len());
            return report;
        }

        let state = match self.state() {
            Ok(state) => state,
            Err(e) => {
                error!("{}", e);
                report.failure_count = fresh.len();
                return report;
            }
        };

        let mut session = match WriterSession::open(&state.index) {
            Ok(session) => session,
            Err(e) => {
                error!("{}", e);
                report.failure_count = fresh.len();
                return report;
            }
        };

        for source in fresh {
            let written = Self::read_source(source)
                .map(|parsed| self.to_document(source, parsed))
                .and_then(|doc| session.write(doc));
            match written {
                Ok(()) => {
                    debug!("Indexed {}", source.url);
                    report.success_count += 1;
                }
                Err(e) => {
                    warn!("Failed to index {}: {}", source.url, e);
                    report.failure_count += 1;
                }
            }
        }

        if let Err(e) = session.finish() {
            warn!("Writer session did not close cleanly: {}", e);
        }
        if let Err(e) = state.reader.reload() {
            warn!("Index reader reload failed: {}", e);
        }

        info!(
            "Indexed {}/{} documents ({} skipped, {} failed)",
            report.success_count, report.total_count, report.skipped_count, report.failure_count
        );
        report
    }

    fn execute(
        &self,
        label: String,
        parsed: ParsedQuery,
        matcher: &TermMatcher,
        max_results: usize,
    ) -> Result<SearchResults> {
        let (query, note) = match parsed {
            ParsedQuery::Strict(query) => (query, None),
            ParsedQuery::Degraded { query, note } => {
                debug!("Degraded query '{}': {}", label, note);
                (query, Some(note))
            }
            ParsedQuery::Empty { note } => return Ok(SearchResults::empty(label, Some(note))),
        };

        let state = self.state()?;
        let searcher = state.reader.searcher();
        // the collector preallocates its limit, so never ask for more than exist
        let max_results = max_results.max(1);
        let limit = max_results
            .saturating_mul(2)
            .min(usize::try_from(searcher.num_docs()).unwrap_or(usize::MAX))
            .max(1);
        let mut top = searcher.search(&*query, &TopDocs::with_limit(limit))?;
        top.truncate(max_results);

        let mut results = Vec::with_capacity(top.len());
        for (score, address) in top {
            results.push(self.format_hit(&searcher, score, address, matcher)?);
        }

        Ok(SearchResults {
            query: label,
            total_hits: results.len(),
            results,
            note,
        })
    }

    fn format_hit(
        &self,
        searcher: &tantivy::Searcher,
        score: Score,
        address: DocAddress,
        matcher: &TermMatcher,
    ) -> Result<SearchHit> {
        let doc: TantivyDocument = searcher.doc(address)?;
        let title = text_of(&doc, self.fields.title);
        let content = text_of(&doc, self.fields.content);
        let headings = text_of(&doc, self.fields.headings);

        let highlighted_title = self
            .highlighter
            .highlight(&title, matcher, 1)
            .unwrap_or_else(|| title.clone());
        let highlighted_content = self
            .highlighter
            .highlight(&content, matcher, 3)
            .or_else(|| self.highlighter.highlight(&headings, matcher, 2))
            .unwrap_or_else(|| {
                let lead = truncate_chars(&content, FALLBACK_SNIPPET_CHARS);
                if lead.len() < content.len() {
                    format!("{}...", lead)
                } else {
                    lead.to_string()
                }
            });

        Ok(SearchHit {
            content: truncate_chars(&content, CONTENT_PREVIEW_CHARS).to_string(),
            url: text_of(&doc, self.fields.url),
            score: score.max(0.0),
            tags: doc
                .get_all(self.fields.tags)
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            title,
            highlighted_title,
            highlighted_content,
        })
    }

    fn with_builder<T>(&self, f: impl FnOnce(&QueryBuilder<'_>) -> T) -> Result<T> {
        let state = self.state()?;
        let builder = QueryBuilder::new(&state.index, self.fields);
        Ok(f(&builder))
    }

    /// Multi-field keyword search
    pub fn search(&self, keyword: &str, max_results: usize) -> Result<SearchResults> {
        let parsed = self.with_builder(|b| b.keyword(keyword))?;
        let matcher = TermMatcher::exact(query::highlight_terms(keyword));
        self.execute(keyword.to_string(), parsed, &matcher, max_results)
    }

    /// Boolean expression search with AND/OR/NOT, grouping and field qualifiers
    pub fn boolean_search(&self, expr: &str, max_results: usize) -> Result<SearchResults> {
        let parsed = self.with_builder(|b| b.boolean(expr))?;
        let matcher = TermMatcher::exact(query::highlight_terms(expr));
        self.execute(expr.to_string(), parsed, &matcher, max_results)
    }

    /// Exact phrase search
    pub fn phrase_search(&self, phrase: &str, max_results: usize) -> Result<SearchResults> {
        let parsed = match self.with_builder(|b| b.phrase(phrase))? {
            Some(query) => ParsedQuery::Strict(query),
            None => ParsedQuery::Empty {
                note: "no valid terms in phrase".to_string(),
            },
        };
        let matcher = TermMatcher::exact(tokenizer::analyze_terms(phrase));
        self.execute(phrase.to_string(), parsed, &matcher, max_results)
    }

    /// Edit-distance search for a single term; distance is clamped to 1..=2
    pub fn fuzzy_search(
        &self,
        term: &str,
        edit_distance: u8,
        max_results: usize,
    ) -> Result<SearchResults> {
        let distance = edit_distance.clamp(1, 2);
        let parsed = match self.with_builder(|b| b.fuzzy(term, distance))? {
            Some(query) => ParsedQuery::Strict(query),
            None => ParsedQuery::Empty {
                note: "no term given".to_string(),
            },
        };
        let matcher = TermMatcher::fuzzy(term.trim(), distance);
        self.execute(term.to_string(), parsed, &matcher, max_results)
    }

    /// Documents carrying `tag`, optionally also matching `keyword`
    pub fn tag_search(&self, tag: &str, keyword: &str, max_results: usize) -> Result<SearchResults> {
        let parsed = self.with_builder(|b| b.tag(tag, keyword))?;
        let matcher = TermMatcher::exact(query::highlight_terms(keyword));
        let label = format!("tag:{} {}", tag, keyword).trim_end().to_string();
        self.execute(label, parsed, &matcher, max_results)
    }

    /// Document count and schema description
    pub fn stats(&self) -> Result<IndexStats> {
        let state = self.state()?;
        Ok(IndexStats {
            total_docs: state.reader.searcher().num_docs(),
            index_dir: self.dir.display().to_string(),
            schema_fields: describe_schema(),
            scorer: SCORER,
        })
    }

    /// Drop every on-disk index artifact, recreate the schema and ingest `sources`
    pub fn rebuild_index(&self, sources: &[DocumentSource]) -> Result<IndexReport> {
        {
            let mut state = self
                .state
                .write()
                .map_err(|_| Error::Other("index state lock poisoned".to_string()))?;
            info!("Rebuilding index at {:?}", self.dir);
            if self.dir.exists() {
                std::fs::remove_dir_all(&self.dir)?;
            }
            let (fresh, _) = open_state(&self.dir)?;
            *state = fresh;
        }
        Ok(self.add_documents(sources))
    }
}
