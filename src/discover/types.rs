//! Wire and summary types of the discovery API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Characters of hit content used as a fallback title
const TITLE_FALLBACK_CHARS: usize = 100;

/// Kind of documentation page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Api,
    Tutorial,
    Faq,
    QuickStart,
}

/// SDK language a page is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    Cpp,
    Csharp,
    Matlab,
}

/// Functional area of a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Api,
    Data,
    Trading,
    Sdk,
    Tools,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Api => "api",
            DocumentType::Tutorial => "tutorial",
            DocumentType::Faq => "faq",
            DocumentType::QuickStart => "quick_start",
        }
    }
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Cpp => "cpp",
            Language::Csharp => "csharp",
            Language::Matlab => "matlab",
        }
    }
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Api => "api",
            Category::Data => "data",
            Category::Trading => "trading",
            Category::Sdk => "sdk",
            Category::Tools => "tools",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional narrowing of discovery hits.
///
/// Each filter matches against one hierarchy level of a hit: document type
/// against level 0, language against level 1, category against level 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
}

impl DiscoveryFilters {
    pub fn is_empty(&self) -> bool {
        self.document_type.is_none() && self.language.is_none() && self.category.is_none()
    }

    /// Whether `hit` passes every set filter
    pub fn matches(&self, hit: &DiscoveryHit) -> bool {
        fn level_contains(level: Option<&str>, wanted: Option<&'static str>) -> bool {
            match wanted {
                None => true,
                Some(wanted) => level
                    .map(|value| value.to_lowercase().contains(wanted))
                    .unwrap_or(false),
            }
        }

        level_contains(hit.radio_level(0), self.document_type.map(|d| d.as_str()))
            && level_contains(hit.radio_level(1), self.language.map(|l| l.as_str()))
            && level_contains(hit.radio_level(2), self.category.map(|c| c.as_str()))
    }
}

/// A discovery search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRequest {
    pub query: String,
    pub limit: usize,
    pub filters: DiscoveryFilters,
}

impl DiscoveryRequest {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
            filters: DiscoveryFilters::default(),
        }
    }

    pub fn with_filters(mut self, filters: DiscoveryFilters) -> Self {
        self.filters = filters;
        self
    }
}

/// Request body sent to the search endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchBody<'a> {
    pub q: &'a str,
    pub limit: usize,
    pub attributes_to_highlight: [&'static str; 1],
    pub attributes_to_crop: [&'static str; 1],
    pub crop_length: usize,
}

/// Highlighted copies of the hierarchy levels
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedHierarchy {
    #[serde(default)]
    pub hierarchy_radio_lvl0: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl1: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl2: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl3: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl4: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl5: Option<String>,
}

impl FormattedHierarchy {
    fn level(&self, level: usize) -> Option<&str> {
        match level {
            0 => self.hierarchy_radio_lvl0.as_deref(),
            1 => self.hierarchy_radio_lvl1.as_deref(),
            2 => self.hierarchy_radio_lvl2.as_deref(),
            3 => self.hierarchy_radio_lvl3.as_deref(),
            4 => self.hierarchy_radio_lvl4.as_deref(),
            5 => self.hierarchy_radio_lvl5.as_deref(),
            _ => None,
        }
    }
}

/// One ranked discovery hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryHit {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, rename = "objectID")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub anchor: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub hierarchy_lvl0: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl1: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl2: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl3: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl4: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl5: Option<String>,
    #[serde(default)]
    pub hierarchy_lvl6: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl0: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl1: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl2: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl3: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl4: Option<String>,
    #[serde(default)]
    pub hierarchy_radio_lvl5: Option<String>,
    #[serde(default, rename = "_formatted")]
    pub formatted: Option<FormattedHierarchy>,
}

impl DiscoveryHit {
    /// Hierarchy level used for categorisation, preferring the plain value over the highlighted copy
    pub fn radio_level(&self, level: usize) -> Option<&str> {
        let plain = match level {
            0 => self.hierarchy_radio_lvl0.as_deref(),
            1 => self.hierarchy_radio_lvl1.as_deref(),
            2 => self.hierarchy_radio_lvl2.as_deref(),
            3 => self.hierarchy_radio_lvl3.as_deref(),
            4 => self.hierarchy_radio_lvl4.as_deref(),
            5 => self.hierarchy_radio_lvl5.as_deref(),
            _ => None,
        };
        plain
            .or_else(|| self.formatted.as_ref().and_then(|f| f.level(level)))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Display title: top hierarchy level, else the start of the content
    pub fn title(&self) -> String {
        if let Some(title) = self
            .radio_level(0)
            .or(self.hierarchy_lvl0.as_deref())
            .filter(|t| !t.trim().is_empty())
        {
            return title.trim().to_string();
        }
        match self.content.as_deref().map(str::trim) {
            Some(content) if !content.is_empty() => {
                content.chars().take(TITLE_FALLBACK_CHARS).collect()
            }
            _ => "Untitled".to_string(),
        }
    }
}

/// Response of the search endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResponse {
    #[serde(default)]
    pub hits: Vec<DiscoveryHit>,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub processing_time_ms: u64,
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub estimated_total_hits: u64,
}

impl DiscoveryResponse {
    /// Non-empty hit URLs, first occurrence kept
    pub fn unique_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.hits
            .iter()
            .map(|hit| hit.url.trim())
            .filter(|url| !url.is_empty() && seen.insert(*url))
            .map(str::to_string)
            .collect()
    }

    /// Hit counts per document type, language and category
    pub fn categories(&self) -> CategorySummary {
        let mut summary = CategorySummary {
            total_documents: self.hits.len(),
            ..Default::default()
        };
        for hit in &self.hits {
            if let Some(doc_type) = hit.radio_level(0) {
                *summary.document_types.entry(doc_type.to_string()).or_insert(0) += 1;
            }
            if let Some(language) = hit.radio_level(1) {
                *summary.languages.entry(language.to_lowercase()).or_insert(0) += 1;
            }
            if let Some(category) = hit.radio_level(2) {
                *summary.categories.entry(category.to_lowercase()).or_insert(0) += 1;
            }
        }
        summary
    }
}

/// Aggregated hierarchy metadata of a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub total_documents: usize,
    pub document_types: BTreeMap<String, usize>,
    pub languages: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
}
