//! Result objects returned by the search flow.

use crate::discover::{CategorySummary, DiscoveryFilters};
use crate::index::{IndexStats, SearchResults};
use crate::store::FileStats;
use serde::{Deserialize, Serialize};

/// Default edit distance of fuzzy queries
pub const DEFAULT_FUZZY_DISTANCE: u8 = 2;

/// One local query in any of the five search modes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LocalQuery {
    Keyword { keyword: String },
    Boolean { expression: String },
    Phrase { phrase: String },
    Fuzzy { term: String, distance: u8 },
    Tag { tag: String, keyword: String },
}

impl LocalQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        LocalQuery::Keyword {
            keyword: keyword.into(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            LocalQuery::Keyword { .. } => "keyword",
            LocalQuery::Boolean { .. } => "boolean",
            LocalQuery::Phrase { .. } => "phrase",
            LocalQuery::Fuzzy { .. } => "fuzzy",
            LocalQuery::Tag { .. } => "tag",
        }
    }

    /// Label echoed back as the result's `query`
    pub fn label(&self) -> String {
        match self {
            LocalQuery::Keyword { keyword } => keyword.clone(),
            LocalQuery::Boolean { expression } => expression.clone(),
            LocalQuery::Phrase { phrase } => phrase.clone(),
            LocalQuery::Fuzzy { term, .. } => term.clone(),
            LocalQuery::Tag { tag, keyword } => {
                format!("tag:{} {}", tag, keyword).trim_end().to_string()
            }
        }
    }

    /// Plain text to send to discovery when acquiring documents for this query
    pub fn discovery_text(&self) -> String {
        match self {
            LocalQuery::Keyword { keyword } => keyword.trim().to_string(),
            LocalQuery::Boolean { expression } => crate::index::strip_syntax(expression),
            LocalQuery::Phrase { phrase } => phrase.trim().to_string(),
            LocalQuery::Fuzzy { term, .. } => term.trim().to_string(),
            LocalQuery::Tag { tag, keyword } if keyword.trim().is_empty() => {
                tag.trim().to_string()
            }
            LocalQuery::Tag { keyword, .. } => keyword.trim().to_string(),
        }
    }
}

/// Counts of one acquisition pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub api_hits: usize,
    pub newly_downloaded: usize,
    pub newly_indexed: usize,
    pub failed_downloads: usize,
    pub skipped_existing_downloads: usize,
    pub skipped_existing_indexing: usize,
    pub total_skipped: usize,
}

/// Share of candidate URLs that needed no fresh work
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingEfficiency {
    pub total_urls: usize,
    pub download_skip_ratio: f64,
    pub index_skip_ratio: f64,
    pub total_efficiency: f64,
    pub time_saved: bool,
}

impl ProcessingEfficiency {
    pub fn from_stats(stats: &ProcessingStats, total_urls: usize) -> Self {
        let ratio = |n: usize| {
            if total_urls == 0 {
                0.0
            } else {
                n as f64 / total_urls as f64
            }
        };
        Self {
            total_urls,
            download_skip_ratio: ratio(stats.skipped_existing_downloads),
            index_skip_ratio: ratio(stats.skipped_existing_indexing),
            total_efficiency: ratio(stats.total_skipped),
            time_saved: stats.total_skipped > 0,
        }
    }
}

/// Search results plus whatever the flow has to say about producing them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryOutcome {
    #[serde(flatten)]
    pub results: SearchResults,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_stats: Option<ProcessingStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_efficiency: Option<ProcessingEfficiency>,
}

impl QueryOutcome {
    pub fn from_results(results: SearchResults) -> Self {
        Self {
            results,
            ..Default::default()
        }
    }

    pub fn failed(query: impl Into<String>, error: impl ToString) -> Self {
        Self {
            results: SearchResults::empty(query, None),
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_message(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            results: SearchResults::empty(query, None),
            message: Some(message.into()),
            ..Default::default()
        }
    }
}

/// Short description of one discovered document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub title: String,
    pub url: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// What discovery knows about a keyword, without fetching anything
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoverOutcome {
    pub query: String,
    pub total_hits: usize,
    pub document_summaries: Vec<DocumentSummary>,
    pub unique_urls: Vec<String>,
    pub processing_time_ms: u64,
    pub document_categories: CategorySummary,
    pub search_filters: DiscoveryFilters,
    pub estimated_total_hits: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Configuration values worth reporting next to the statistics
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub config_file: String,
    pub data_dir: String,
    pub discovery_endpoint: String,
    pub fetch_concurrency: usize,
    pub request_delay_ms: u64,
    pub default_max_results: usize,
}

/// Store and index statistics
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloader: Option<FileStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_engine: Option<IndexStats>,
    pub config: ConfigSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_efficiency_ratios() {
        let stats = ProcessingStats {
            skipped_existing_downloads: 2,
            skipped_existing_indexing: 3,
            total_skipped: 5,
            ..Default::default()
        };
        let efficiency = ProcessingEfficiency::from_stats(&stats, 10);
        assert_eq!(efficiency.total_urls, 10);
        assert!((efficiency.download_skip_ratio - 0.2).abs() < f64::EPSILON);
        assert!((efficiency.index_skip_ratio - 0.3).abs() < f64::EPSILON);
        assert!((efficiency.total_efficiency - 0.5).abs() < f64::EPSILON);
        assert!(efficiency.time_saved);

        let idle = ProcessingEfficiency::from_stats(&ProcessingStats::default(), 0);
        assert_eq!(idle.total_efficiency, 0.0);
        assert!(!idle.time_saved);
    }

    #[test]
    fn test_query_labels_and_discovery_text() {
        let tag = LocalQuery::Tag {
            tag: "python".to_string(),
            keyword: String::new(),
        };
        assert_eq!(tag.label(), "tag:python");
        assert_eq!(tag.discovery_text(), "python");

        let boolean = LocalQuery::Boolean {
            expression: "title:行情 AND NOT 期货".to_string(),
        };
        assert_eq!(boolean.discovery_text(), "行情 期货");
        assert_eq!(boolean.mode(), "boolean");
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let outcome = QueryOutcome::with_message("行情", "no documents found");
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["query"], "行情");
        assert_eq!(json["total_hits"], 0);
        assert_eq!(json["message"], "no documents found");
        assert!(json.get("error").is_none());
    }
}
