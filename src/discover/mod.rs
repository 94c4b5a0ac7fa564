//! Remote document discovery
//!
//! Candidate URLs and hierarchy metadata come from a Meilisearch-style
//! documentation search endpoint. Ranking is the service's business; this
//! module only transports the request and types the response.

mod types;

pub use types::*;

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Characters of content the service keeps around each match
const CROP_LENGTH: usize = 50;

/// A source of candidate documents for a keyword
#[async_trait]
pub trait DiscoveryClient: Send + Sync {
    async fn search(&self, request: &DiscoveryRequest) -> Result<DiscoveryResponse>;
}

/// Client for a Meilisearch-compatible search endpoint
pub struct MeiliDiscoveryClient {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
}

impl MeiliDiscoveryClient {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_options(
            &config.discovery.endpoint,
            config.discovery_api_key(),
            config.discovery.referer.as_deref(),
            Duration::from_secs(config.discovery.timeout_secs),
            &config.fetch.user_agent,
        )
    }

    pub fn with_options(
        endpoint: &str,
        api_key: Option<String>,
        referer: Option<&str>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;

        let mut headers = HeaderMap::new();
        if let Some(referer) = referer {
            let value = HeaderValue::from_str(referer)
                .map_err(|e| Error::Config(format!("Invalid discovery referer: {}", e)))?;
            headers.insert(REFERER, value);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .default_headers(headers)
            .gzip(true)
            .build()
            .map_err(|e| Error::Upstream(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl DiscoveryClient for MeiliDiscoveryClient {
    async fn search(&self, request: &DiscoveryRequest) -> Result<DiscoveryResponse> {
        let body = SearchBody {
            q: &request.query,
            limit: request.limit,
            attributes_to_highlight: ["*"],
            attributes_to_crop: ["content"],
            crop_length: CROP_LENGTH,
        };
        debug!("Discovery request to {}: {:?}", self.endpoint, body);

        let mut builder = self.client.post(self.endpoint.clone()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Error::Upstream(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let excerpt: String = text.chars().take(200).collect();
            return Err(Error::Upstream(format!("HTTP {}: {}", status, excerpt)));
        }

        let mut parsed: DiscoveryResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("Malformed discovery response: {}", e)))?;

        // the endpoint does not understand these filters, so they narrow the hits here
        if !request.filters.is_empty() {
            let before = parsed.hits.len();
            parsed.hits.retain(|hit| request.filters.matches(hit));
            debug!("Filters kept {} of {} hits", parsed.hits.len(), before);
        }

        info!(
            "Discovery returned {} hits for '{}' in {}ms",
            parsed.hits.len(),
            request.query,
            parsed.processing_time_ms
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, api_key: Option<&str>) -> MeiliDiscoveryClient {
        MeiliDiscoveryClient::with_options(
            &format!("{}/indexes/docs/search", server.uri()),
            api_key.map(str::to_string),
            Some("https://docs.example.com/"),
            Duration::from_secs(5),
            "docsift-test",
        )
        .unwrap()
    }

    fn body() -> serde_json::Value {
        json!({
            "hits": [
                {"url": "https://docs.example.com/a", "objectID": "1",
                 "hierarchy_radio_lvl0": "API", "hierarchy_radio_lvl1": "Python"},
                {"url": "https://docs.example.com/b", "objectID": "2",
                 "hierarchy_radio_lvl0": "教程", "hierarchy_radio_lvl1": "MATLAB"}
            ],
            "query": "行情",
            "processingTimeMs": 7,
            "limit": 50,
            "offset": 0,
            "estimatedTotalHits": 2
        })
    }

    #[tokio::test]
    async fn test_search_sends_meilisearch_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/docs/search"))
            .and(header("authorization", "Bearer secret"))
            .and(header("referer", "https://docs.example.com/"))
            .and(body_partial_json(json!({
                "q": "行情",
                "limit": 50,
                "attributesToHighlight": ["*"],
                "attributesToCrop": ["content"],
                "cropLength": 50
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server, Some("secret"))
            .search(&DiscoveryRequest::new("行情", 50))
            .await
            .unwrap();
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.processing_time_ms, 7);
        assert_eq!(response.unique_urls().len(), 2);
    }

    #[tokio::test]
    async fn test_search_applies_filters() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body()))
            .mount(&server)
            .await;

        let request = DiscoveryRequest::new("行情", 50).with_filters(DiscoveryFilters {
            language: Some(Language::Matlab),
            ..Default::default()
        });
        let response = client(&server, None).search(&request).await.unwrap();
        assert_eq!(response.hits.len(), 1);
        assert_eq!(response.hits[0].url, "https://docs.example.com/b");
    }

    #[tokio::test]
    async fn test_search_reports_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let err = client(&server, None)
            .search(&DiscoveryRequest::new("行情", 50))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Upstream(_)));
        assert!(err.to_string().contains("503"));
    }
}
