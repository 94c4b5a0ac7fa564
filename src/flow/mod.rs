//! Search flow: discovery, acquisition and local querying
//!
//! Every public operation returns a result object. Failures are reported
//! through its `error` field and never escape as `Err`, except for the
//! maintenance operations used by the CLI.

mod types;

pub use types::*;

use crate::config::Config;
use crate::discover::{DiscoveryClient, DiscoveryFilters, DiscoveryRequest, MeiliDiscoveryClient};
use crate::error::Result;
use crate::index::{tokenizer, DocumentSource, Highlighter, IndexEngine, IndexReport, SearchResults};
use crate::parse::truncate_chars;
use crate::store::{ContentStore, FetchOutcome};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Characters of hit content kept in a discovery summary
const SUMMARY_CHARS: usize = 200;

const NO_DOCUMENTS_MESSAGE: &str = "no documents found";

/// Composes discovery, the content store and the index
pub struct SearchFlow {
    config: Config,
    discovery: Arc<dyn DiscoveryClient>,
    store: ContentStore,
    index: IndexEngine,
}

impl SearchFlow {
    /// Build the flow described by `config`
    pub fn new(config: Config) -> Result<Self> {
        tokenizer::init(&config.index.custom_terms);
        let discovery = Arc::new(MeiliDiscoveryClient::new(&config)?);
        let store = ContentStore::open(&config)?;
        let index = IndexEngine::open(&config.paths.index_dir, highlighter(&config))?;
        Ok(Self::with_parts(config, discovery, store, index))
    }

    /// Build the flow from already constructed parts
    pub fn with_parts(
        config: Config,
        discovery: Arc<dyn DiscoveryClient>,
        store: ContentStore,
        index: IndexEngine,
    ) -> Self {
        Self {
            config,
            discovery,
            store,
            index,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    pub fn index(&self) -> &IndexEngine {
        &self.index
    }

    fn run_local(&self, query: &LocalQuery, max_results: usize) -> Result<SearchResults> {
        match query {
            LocalQuery::Keyword { keyword } => self.index.search(keyword, max_results),
            LocalQuery::Boolean { expression } => self.index.boolean_search(expression, max_results),
            LocalQuery::Phrase { phrase } => self.index.phrase_search(phrase, max_results),
            LocalQuery::Fuzzy { term, distance } => {
                self.index.fuzzy_search(term, *distance, max_results)
            }
            LocalQuery::Tag { tag, keyword } => self.index.tag_search(tag, keyword, max_results),
        }
    }

    /// Query the local index only
    pub fn local_query(&self, query: &LocalQuery, max_results: Option<usize>) -> QueryOutcome {
        let max_results = self.config.clamp_results(max_results);
        let started = Instant::now();
        match self.run_local(query, max_results) {
            Ok(results) => {
                info!(
                    "{} search '{}' returned {} hits in {:?}",
                    query.mode(),
                    query.label(),
                    results.total_hits,
                    started.elapsed()
                );
                QueryOutcome::from_results(results)
            }
            Err(e) => {
                error!("{} search '{}' failed: {}", query.mode(), query.label(), e);
                QueryOutcome::failed(query.label(), e)
            }
        }
    }

    /// Acquire documents for `keyword`, then run a keyword query
    pub async fn full_query(&self, keyword: &str, max_results: Option<usize>) -> QueryOutcome {
        self.full_query_with(&LocalQuery::keyword(keyword), max_results)
            .await
    }

    /// Acquire documents for `query`, then run it locally with acquisition statistics attached
    pub async fn full_query_with(
        &self,
        query: &LocalQuery,
        max_results: Option<usize>,
    ) -> QueryOutcome {
        let text = query.discovery_text();
        let request = DiscoveryRequest::new(&text, self.config.discovery.candidate_limit);
        let response = match self.discovery.search(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Discovery failed for '{}': {}", text, e);
                return QueryOutcome::failed(query.label(), e);
            }
        };

        let urls = response.unique_urls();
        if urls.is_empty() {
            info!("Discovery found no documents for '{}'", text);
            return QueryOutcome::with_message(query.label(), NO_DOCUMENTS_MESSAGE);
        }

        let mut stats = self.acquire(&urls).await;
        stats.api_hits = response.hits.len();

        let mut outcome = self.local_query(query, max_results);
        outcome.processing_efficiency = Some(ProcessingEfficiency::from_stats(&stats, urls.len()));
        outcome.processing_stats = Some(stats);
        outcome
    }

    /// Fetch new URLs and index whatever is stored but not yet indexed
    async fn acquire(&self, urls: &[String]) -> ProcessingStats {
        let outcomes = self.store.fetch_all(urls).await;

        let mut stats = ProcessingStats::default();
        let mut sources: Vec<DocumentSource> = Vec::new();
        for url in urls {
            match outcomes.get(url) {
                Some(FetchOutcome::Success(record)) => {
                    stats.newly_downloaded += 1;
                    sources.push(record.source());
                }
                Some(FetchOutcome::Skipped) => {
                    stats.skipped_existing_downloads += 1;
                    if let Some(record) = self.store.record(url) {
                        sources.push(record.source());
                    }
                }
                Some(FetchOutcome::Failure(_)) => stats.failed_downloads += 1,
                None => warn!("No fetch outcome for {}", url),
            }
        }

        let report = self.index.add_documents(&sources);
        stats.newly_indexed = report.success_count;
        stats.skipped_existing_indexing = report.skipped_count;
        stats.total_skipped = stats.skipped_existing_downloads + stats.skipped_existing_indexing;

        info!(
            "Acquired {} URLs: {} downloaded, {} indexed, {} failed, {} skipped",
            urls.len(),
            stats.newly_downloaded,
            stats.newly_indexed,
            stats.failed_downloads,
            stats.total_skipped
        );
        stats
    }

    /// Ask discovery about `keyword` without fetching or indexing anything
    pub async fn discover(
        &self,
        keyword: &str,
        filters: DiscoveryFilters,
        limit: Option<usize>,
    ) -> DiscoverOutcome {
        let limit = limit.unwrap_or(self.config.discovery.candidate_limit).max(1);
        let request = DiscoveryRequest::new(keyword, limit).with_filters(filters.clone());

        let response = match self.discovery.search(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Discovery failed for '{}': {}", keyword, e);
                return DiscoverOutcome {
                    query: keyword.to_string(),
                    search_filters: filters,
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let document_summaries = response
            .hits
            .iter()
            .take(self.config.discovery.summary_limit)
            .map(|hit| {
                let content = hit.content.as_deref().unwrap_or_default();
                let lead = truncate_chars(content, SUMMARY_CHARS);
                let summary = if lead.len() < content.len() {
                    format!("{}...", lead)
                } else {
                    lead.to_string()
                };
                DocumentSummary {
                    title: hit.title(),
                    url: hit.url.clone(),
                    summary,
                    document_type: hit.radio_level(0).map(str::to_string),
                    language: hit.radio_level(1).map(str::to_lowercase),
                }
            })
            .collect();

        DiscoverOutcome {
            query: keyword.to_string(),
            total_hits: response.hits.len(),
            document_summaries,
            unique_urls: response.unique_urls(),
            processing_time_ms: response.processing_time_ms,
            document_categories: response.categories(),
            search_filters: filters,
            estimated_total_hits: response.estimated_total_hits,
            error: None,
        }
    }

    /// Store and index statistics plus a configuration summary
    pub fn get_stats(&self) -> SystemStats {
        let mut errors = Vec::new();
        let downloader = self
            .store
            .file_stats()
            .map_err(|e| errors.push(format!("store: {}", e)))
            .ok();
        let search_engine = self
            .index
            .stats()
            .map_err(|e| errors.push(format!("index: {}", e)))
            .ok();

        SystemStats {
            downloader,
            search_engine,
            config: ConfigSummary {
                config_file: self.config.paths.config_file.display().to_string(),
                data_dir: self.config.paths.data_dir.display().to_string(),
                discovery_endpoint: self.config.discovery.endpoint.clone(),
                fetch_concurrency: self.config.fetch.concurrency,
                request_delay_ms: self.config.fetch.request_delay_ms,
                default_max_results: self.config.query.default_max_results,
            },
            errors,
        }
    }

    /// Rebuild the index from every stored document
    pub fn rebuild(&self) -> Result<IndexReport> {
        let sources = self.store.indexable_pairs();
        info!("Rebuilding index from {} stored documents", sources.len());
        self.index.rebuild_index(&sources)
    }

    /// Drop stored documents older than `days`; the index keeps them until the next rebuild
    pub fn evict_older_than(&self, days: u32) -> Result<usize> {
        self.store.evict_older_than(days)
    }
}

fn highlighter(config: &Config) -> Highlighter {
    Highlighter::new(&config.index.highlight_pre, &config.index.highlight_post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discover::{DiscoveryHit, DiscoveryResponse};
    use crate::error::Error;
    use crate::store::DocumentFetcher;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct StaticDiscovery {
        response: Option<DiscoveryResponse>,
        requests: Mutex<Vec<DiscoveryRequest>>,
    }

    #[async_trait]
    impl DiscoveryClient for StaticDiscovery {
        async fn search(&self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.response
                .clone()
                .ok_or_else(|| Error::Upstream("service unavailable".to_string()))
        }
    }

    struct StaticFetcher {
        pages: HashMap<String, String>,
    }

    #[async_trait]
    impl DocumentFetcher for StaticFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
            self.pages
                .get(url)
                .map(|page| page.as_bytes().to_vec())
                .ok_or_else(|| Error::Fetch(format!("HTTP 404: {}", url)))
        }
    }

    fn page(title: &str, body: &str) -> String {
        format!(
            "<html><head><title>{title}</title><meta name=\"keywords\" content=\"行情,api\"></head>\
             <body><div class=\"content\"><h1>{title}</h1><p>{body}</p><p>{body}{body}</p></div></body></html>"
        )
    }

    fn flow(tmp: &Path, response: Option<DiscoveryResponse>, pages: &[(&str, String)]) -> SearchFlow {
        tokenizer::init(&crate::config::default_custom_terms());
        let mut config = Config::default();
        config.paths.docs_dir = tmp.join("docs");
        config.paths.url_map_file = tmp.join("docs").join("url_map.json");
        config.paths.index_dir = tmp.join("index");

        let fetcher = Arc::new(StaticFetcher {
            pages: pages
                .iter()
                .map(|(url, page)| (url.to_string(), page.clone()))
                .collect(),
        });
        let store = ContentStore::with_fetcher(
            &config.paths.docs_dir,
            &config.paths.url_map_file,
            fetcher,
            5,
            Duration::ZERO,
        )
        .unwrap();
        let index = IndexEngine::open(&config.paths.index_dir, highlighter(&config)).unwrap();
        let discovery = Arc::new(StaticDiscovery {
            response,
            requests: Mutex::new(Vec::new()),
        });
        SearchFlow::with_parts(config, discovery, store, index)
    }

    fn response(urls: &[&str]) -> DiscoveryResponse {
        DiscoveryResponse {
            hits: urls
                .iter()
                .map(|url| DiscoveryHit {
                    url: url.to_string(),
                    content: Some("获取行情数据的接口说明".to_string()),
                    hierarchy_radio_lvl0: Some("API".to_string()),
                    hierarchy_radio_lvl1: Some("Python".to_string()),
                    ..Default::default()
                })
                .collect(),
            processing_time_ms: 4,
            estimated_total_hits: urls.len() as u64,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_full_query_acquires_then_searches() {
        let tmp = TempDir::new().unwrap();
        let pages = [
            ("https://docs.example.com/a", page("行情订阅", "订阅实时行情数据 subscribe")),
            ("https://docs.example.com/b", page("下单接口", "委托下单与撤单 order")),
        ];
        let flow = flow(
            tmp.path(),
            Some(response(&[
                "https://docs.example.com/a",
                "https://docs.example.com/b",
                "https://docs.example.com/missing",
                "https://docs.example.com/a",
            ])),
            &pages,
        );

        let first = flow.full_query("行情", Some(5)).await;
        assert!(first.error.is_none());
        assert!(first.results.total_hits >= 1);
        assert_eq!(first.results.results[0].url, "https://docs.example.com/a");

        let stats = first.processing_stats.clone().unwrap();
        assert_eq!(stats.api_hits, 4);
        assert_eq!(stats.newly_downloaded, 2);
        assert_eq!(stats.newly_indexed, 2);
        assert_eq!(stats.failed_downloads, 1);
        assert_eq!(stats.total_skipped, 0);
        let efficiency = first.processing_efficiency.clone().unwrap();
        assert_eq!(efficiency.total_urls, 3);
        assert!(!efficiency.time_saved);

        let second = flow.full_query("行情", Some(5)).await;
        let stats = second.processing_stats.unwrap();
        assert_eq!(stats.newly_downloaded, 0);
        assert_eq!(stats.newly_indexed, 0);
        assert_eq!(stats.skipped_existing_downloads, 2);
        assert_eq!(stats.skipped_existing_indexing, 2);
        assert_eq!(stats.total_skipped, 4);
        assert!(second.processing_efficiency.unwrap().time_saved);
        assert_eq!(flow.index().stats().unwrap().total_docs, 2);
    }

    #[tokio::test]
    async fn test_full_query_without_urls_short_circuits() {
        let tmp = TempDir::new().unwrap();
        let flow = flow(tmp.path(), Some(DiscoveryResponse::default()), &[]);

        let outcome = flow.full_query("行情", None).await;
        assert_eq!(outcome.message.as_deref(), Some(NO_DOCUMENTS_MESSAGE));
        assert_eq!(outcome.results.total_hits, 0);
        assert!(outcome.processing_stats.is_none());
        assert_eq!(flow.index().stats().unwrap().total_docs, 0);
    }

    #[tokio::test]
    async fn test_discovery_failure_becomes_error_field() {
        let tmp = TempDir::new().unwrap();
        let flow = flow(tmp.path(), None, &[]);

        let outcome = flow.full_query("行情", None).await;
        assert_eq!(outcome.results.total_hits, 0);
        assert!(outcome.error.unwrap().contains("service unavailable"));

        let discovered = flow.discover("行情", DiscoveryFilters::default(), None).await;
        assert!(discovered.error.is_some());
        assert!(discovered.unique_urls.is_empty());
    }

    #[tokio::test]
    async fn test_discover_summarises_without_indexing() {
        let tmp = TempDir::new().unwrap();
        let urls: Vec<String> = (0..25)
            .map(|i| format!("https://docs.example.com/{i}"))
            .collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let flow = flow(tmp.path(), Some(response(&refs)), &[]);

        let outcome = flow.discover("行情", DiscoveryFilters::default(), Some(25)).await;
        assert_eq!(outcome.total_hits, 25);
        assert_eq!(outcome.document_summaries.len(), 20);
        assert_eq!(outcome.unique_urls.len(), 25);
        assert_eq!(outcome.document_categories.languages.get("python"), Some(&25));
        assert_eq!(outcome.document_summaries[0].title, "API");
        assert_eq!(outcome.processing_time_ms, 4);
        assert_eq!(flow.index().stats().unwrap().total_docs, 0);
        assert_eq!(flow.store().file_stats().unwrap().total_files, 0);
    }

    #[tokio::test]
    async fn test_local_modes_and_rebuild() {
        let tmp = TempDir::new().unwrap();
        let pages = [(
            "https://docs.example.com/a",
            page("行情订阅", "订阅实时行情数据 subscribe API"),
        )];
        let flow = flow(
            tmp.path(),
            Some(response(&["https://docs.example.com/a"])),
            &pages,
        );
        flow.full_query("行情", None).await;

        let tagged = flow.local_query(
            &LocalQuery::Tag {
                tag: "API".to_string(),
                keyword: String::new(),
            },
            None,
        );
        assert_eq!(tagged.results.total_hits, 1);
        assert_eq!(tagged.results.query, "tag:API");

        let fuzzy = flow.local_query(
            &LocalQuery::Fuzzy {
                term: "subscrib".to_string(),
                distance: 1,
            },
            None,
        );
        assert_eq!(fuzzy.results.total_hits, 1);

        let report = flow.rebuild().unwrap();
        assert_eq!(report.success_count, 1);
        let again = flow.local_query(&LocalQuery::keyword("行情"), None);
        assert_eq!(again.results.total_hits, 1);

        let stats = flow.get_stats();
        assert!(stats.errors.is_empty());
        assert_eq!(stats.downloader.unwrap().total_files, 1);
        assert_eq!(stats.search_engine.unwrap().total_docs, 1);
    }

    /// The same flow against wiremock standing in for discovery and the document host
    mod over_http {
        use crate::config::Config;
        use crate::discover::MeiliDiscoveryClient;
        use crate::flow::{LocalQuery, SearchFlow};
        use crate::index::{tokenizer, Highlighter, IndexEngine};
        use crate::store::{ContentStore, HttpFetcher};
        use serde_json::json;
        use std::path::Path;
        use std::sync::Arc;
        use std::time::Duration;
        use tempfile::TempDir;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        const ORDER_PAGE: &str = r#"<html>
<head>
  <title>下单函数 order_volume</title>
  <meta name="keywords" content="交易, API, Python">
</head>
<body>
  <nav>首页 | 文档</nav>
  <div class="content">
    <h1>order_volume 按指定量委托</h1>
    <p>order_volume 函数用于按指定数量委托下单，支持限价和市价两种委托方式。</p>
    <p>调用前需要先完成账户登录，并确认交易时段内可以正常提交委托。</p>
    <h2>示例</h2>
    <pre><code>order_volume(symbol='SHSE.600000', volume=100, side=OrderSide_Buy)</code></pre>
  </div>
</body>
</html>"#;

        const QUOTE_PAGE: &str = r#"<html>
<head><title>行情订阅 subscribe</title></head>
<body>
  <main>
    <h1>subscribe 订阅行情</h1>
    <p>subscribe 用于订阅实时行情数据，订阅后在 on_tick 与 on_bar 回调中接收推送。</p>
    <p>可以同时订阅多个标的，使用逗号分隔代码，频率支持 tick 与 60s 等多种周期。</p>
    <p>Subscribe to real time market quotes before the session opens.</p>
  </main>
</body>
</html>"#;

        async fn mount_page(server: &MockServer, route: &str, body: &'static str) {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_raw(body, "text/html; charset=utf-8"),
                )
                .mount(server)
                .await;
        }

        async fn mount_discovery(server: &MockServer, urls: &[String]) {
            let hits: Vec<_> = urls
                .iter()
                .map(|url| {
                    json!({
                        "url": url,
                        "objectID": url,
                        "content": "交易接口说明",
                        "hierarchy_radio_lvl0": "API文档",
                        "hierarchy_radio_lvl1": "Python"
                    })
                })
                .collect();
            let total = hits.len();
            Mock::given(method("POST"))
                .and(path("/indexes/docs/search"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "hits": hits,
                    "query": "委托",
                    "processingTimeMs": 2,
                    "limit": 50,
                    "offset": 0,
                    "estimatedTotalHits": total
                })))
                .mount(server)
                .await;
        }

        fn build_flow(data: &Path, server: &MockServer) -> SearchFlow {
            let mut config = Config::at(&data.join("config.toml"));
            config.fetch.request_delay_ms = 0;
            tokenizer::init(&config.index.custom_terms);

            let discovery = Arc::new(
                MeiliDiscoveryClient::with_options(
                    &format!("{}/indexes/docs/search", server.uri()),
                    None,
                    None,
                    Duration::from_secs(5),
                    "docsift-test",
                )
                .unwrap(),
            );
            let store = ContentStore::with_fetcher(
                &config.paths.docs_dir,
                &config.paths.url_map_file,
                Arc::new(HttpFetcher::new(&config.fetch).unwrap()),
                config.fetch.concurrency,
                config.fetch.request_delay(),
            )
            .unwrap();
            let index = IndexEngine::open(
                &config.paths.index_dir,
                Highlighter::new(&config.index.highlight_pre, &config.index.highlight_post),
            )
            .unwrap();

            SearchFlow::with_parts(config, discovery, store, index)
        }

        #[tokio::test]
        async fn test_full_query_fetches_indexes_and_reuses_the_corpus() {
            let server = MockServer::start().await;
            mount_page(&server, "/docs/order", ORDER_PAGE).await;
            mount_page(&server, "/docs/quote", QUOTE_PAGE).await;
            Mock::given(method("GET"))
                .and(path("/docs/broken"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let urls = vec![
                format!("{}/docs/order", server.uri()),
                format!("{}/docs/quote", server.uri()),
                format!("{}/docs/broken", server.uri()),
            ];
            mount_discovery(&server, &urls).await;

            let tmp = TempDir::new().unwrap();
            let flow = build_flow(tmp.path(), &server);

            let first = flow.full_query("委托", Some(5)).await;
            assert!(first.error.is_none(), "unexpected error: {:?}", first.error);
            let stats = first.processing_stats.clone().unwrap();
            assert_eq!(stats.newly_downloaded, 2);
            assert_eq!(stats.newly_indexed, 2);
            assert_eq!(stats.failed_downloads, 1);
            assert_eq!(first.results.results[0].url, urls[0]);
            assert!(first.results.results[0].highlighted_content.contains("<mark>"));

            let second = flow.full_query("委托", Some(5)).await;
            let stats = second.processing_stats.clone().unwrap();
            assert_eq!(stats.newly_downloaded, 0);
            assert_eq!(stats.skipped_existing_downloads, 2);
            assert_eq!(stats.skipped_existing_indexing, 2);
            let efficiency = second.processing_efficiency.unwrap();
            assert_eq!(efficiency.total_urls, 3);
            assert!(efficiency.time_saved);

            // every mode answers from the local corpus
            let phrase = flow.local_query(
                &LocalQuery::Phrase {
                    phrase: "real time market quotes".to_string(),
                },
                None,
            );
            assert_eq!(phrase.results.results[0].url, urls[1]);

            let tagged = flow.local_query(
                &LocalQuery::Tag {
                    tag: "python".to_string(),
                    keyword: "委托".to_string(),
                },
                None,
            );
            assert_eq!(tagged.results.total_hits, 1);
            assert_eq!(tagged.results.results[0].url, urls[0]);

            let degraded = flow.local_query(
                &LocalQuery::Boolean {
                    expression: "nosuchfield:subscribe AND (".to_string(),
                },
                None,
            );
            assert!(degraded.results.note.is_some());
            assert!(degraded.error.is_none());
        }

        #[tokio::test]
        async fn test_full_query_without_candidates_leaves_the_index_untouched() {
            let server = MockServer::start().await;
            mount_discovery(&server, &[]).await;

            let tmp = TempDir::new().unwrap();
            let flow = build_flow(tmp.path(), &server);

            let outcome = flow.full_query("委托", None).await;
            assert_eq!(outcome.results.total_hits, 0);
            assert_eq!(outcome.message.as_deref(), Some("no documents found"));
            assert!(outcome.processing_stats.is_none());

            let stats = flow.get_stats();
            assert_eq!(stats.search_engine.unwrap().total_docs, 0);
            assert_eq!(stats.downloader.unwrap().total_files, 0);
        }
    }
}
