//! Local store of downloaded documents
//!
//! This module handles:
//! - Splitting candidate URLs into new and already stored ones
//! - Bounded, delayed batch fetching with per-URL outcomes
//! - Content-hash file naming and the persisted URL map
//! - Storage statistics and age-based eviction

pub mod fetch;
mod url_map;

pub use fetch::{DocumentFetcher, HttpFetcher};
pub use url_map::{content_hash_id, file_name_for, UrlMap, UrlMapEntry};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::DocumentSource;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// A document that was fetched and persisted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub url: String,
    pub content_hash_id: String,
    pub downloaded_at: DateTime<Utc>,
    pub size_bytes: u64,
    pub storage_path: PathBuf,
}

impl DocumentRecord {
    pub fn source(&self) -> DocumentSource {
        DocumentSource {
            file_path: self.storage_path.clone(),
            url: self.url.clone(),
        }
    }
}

/// Per-URL result of a fetch batch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Success(DocumentRecord),
    Failure(String),
    /// Already stored, not fetched again
    Skipped,
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }
}

/// Storage statistics
#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    pub total_files: usize,
    pub total_size_bytes: u64,
    pub total_size_mb: f64,
    pub download_dir: String,
    pub url_map_file: String,
    /// Downloads per day (`YYYY-MM-DD`)
    pub download_dates: BTreeMap<String, usize>,
}

/// Downloaded documents plus their URL map
pub struct ContentStore {
    docs_dir: PathBuf,
    map_file: PathBuf,
    records: Mutex<UrlMap>,
    fetcher: Arc<dyn DocumentFetcher>,
    concurrency: usize,
    delay: Duration,
}

impl ContentStore {
    /// Open the store configured in `config`, fetching over HTTP
    pub fn open(config: &Config) -> Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        Self::with_fetcher(
            &config.paths.docs_dir,
            &config.paths.url_map_file,
            fetcher,
            config.fetch.concurrency,
            config.fetch.request_delay(),
        )
    }

    pub fn with_fetcher(
        docs_dir: &Path,
        map_file: &Path,
        fetcher: Arc<dyn DocumentFetcher>,
        concurrency: usize,
        delay: Duration,
    ) -> Result<Self> {
        std::fs::create_dir_all(docs_dir)?;
        let records = UrlMap::load(map_file);
        debug!(
            "Opened content store at {:?} with {} recorded documents",
            docs_dir,
            records.len()
        );

        Ok(Self {
            docs_dir: docs_dir.to_path_buf(),
            map_file: map_file.to_path_buf(),
            records: Mutex::new(records),
            fetcher,
            concurrency: concurrency.max(1),
            delay,
        })
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    fn records(&self) -> MutexGuard<'_, UrlMap> {
        // the map is only ever replaced whole, so a poisoned lock still holds a usable map
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stored record for `url`, if its file is still on disk
    pub fn record(&self, url: &str) -> Option<DocumentRecord> {
        let records = self.records();
        let (name, entry) = records.get(url)?;
        let path = self.docs_dir.join(&name);
        if !path.is_file() {
            return None;
        }
        Some(DocumentRecord {
            url: entry.url.clone(),
            content_hash_id: name.trim_end_matches(".html").to_string(),
            downloaded_at: entry.downloaded_at,
            size_bytes: entry.file_size,
            storage_path: path,
        })
    }

    /// Split `urls` into (new, existing), collapsing duplicates in first-seen order.
    ///
    /// A URL counts as existing only while its file is still present, so a
    /// deleted file is fetched again.
    pub fn filter(&self, urls: &[String]) -> (Vec<String>, Vec<String>) {
        let mut seen = HashSet::new();
        let mut new = Vec::new();
        let mut existing = Vec::new();

        for url in urls {
            if !seen.insert(url.as_str()) {
                continue;
            }
            if self.record(url).is_some() {
                existing.push(url.clone());
            } else {
                new.push(url.clone());
            }
        }
        (new, existing)
    }

    /// Fetch every new URL in `urls`; stored ones come back as [`FetchOutcome::Skipped`].
    ///
    /// At most `concurrency` fetches are in flight and each waits the request
    /// delay first. One failing URL never affects the others.
    pub async fn fetch_all(&self, urls: &[String]) -> HashMap<String, FetchOutcome> {
        let (new, existing) = self.filter(urls);
        info!(
            "Fetching {} new documents ({} already stored)",
            new.len(),
            existing.len()
        );

        let mut outcomes: HashMap<String, FetchOutcome> = existing
            .into_iter()
            .map(|url| (url, FetchOutcome::Skipped))
            .collect();

        let fetched: Vec<(String, FetchOutcome)> = stream::iter(new)
            .map(|url| async move {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                let outcome = match self.fetch_one(&url).await {
                    Ok(record) => FetchOutcome::Success(record),
                    Err(e) => {
                        warn!("Failed to fetch {}: {}", url, e);
                        FetchOutcome::Failure(e.to_string())
                    }
                };
                (url, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.extend(fetched);
        outcomes
    }

    async fn fetch_one(&self, url: &str) -> Result<DocumentRecord> {
        let body = self.fetcher.fetch(url).await?;

        let name = file_name_for(url);
        let path = self.docs_dir.join(&name);
        tokio::fs::write(&path, &body).await?;

        let entry = UrlMapEntry {
            url: url.to_string(),
            downloaded_at: Utc::now(),
            file_size: body.len() as u64,
        };
        let record = DocumentRecord {
            url: url.to_string(),
            content_hash_id: content_hash_id(url),
            downloaded_at: entry.downloaded_at,
            size_bytes: entry.file_size,
            storage_path: path,
        };

        let mut records = self.records();
        records.insert(name, entry);
        records
            .save(&self.map_file)
            .map_err(|e| Error::Fetch(format!("stored {} but could not save URL map: {}", url, e)))?;

        debug!("Stored {} ({} bytes)", url, record.size_bytes);
        Ok(record)
    }

    /// File count, sizes and a per-day download histogram
    pub fn file_stats(&self) -> Result<FileStats> {
        let mut total_files = 0;
        let mut total_size_bytes = 0;
        for entry in std::fs::read_dir(&self.docs_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "html") && path.is_file() {
                total_files += 1;
                total_size_bytes += entry.metadata()?.len();
            }
        }

        let mut download_dates = BTreeMap::new();
        for (_, entry) in self.records().iter() {
            let day = entry.downloaded_at.format("%Y-%m-%d").to_string();
            *download_dates.entry(day).or_insert(0) += 1;
        }

        Ok(FileStats {
            total_files,
            total_size_bytes,
            total_size_mb: ((total_size_bytes as f64 / BYTES_PER_MIB) * 100.0).round() / 100.0,
            download_dir: self.docs_dir.display().to_string(),
            url_map_file: self.map_file.display().to_string(),
            download_dates,
        })
    }

    /// Remove documents downloaded more than `days` days ago. Returns how many were removed.
    pub fn evict_older_than(&self, days: u32) -> Result<usize> {
        let cutoff = Utc::now() - ChronoDuration::days(i64::from(days));
        let mut records = self.records();

        let expired: Vec<String> = records
            .iter()
            .filter(|(_, entry)| entry.downloaded_at < cutoff)
            .map(|(name, _)| name.clone())
            .collect();
        if expired.is_empty() {
            return Ok(0);
        }

        for name in &expired {
            let path = self.docs_dir.join(name);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {:?}: {}", path, e),
            }
            records.remove(name);
        }
        records.save(&self.map_file)?;

        info!("Evicted {} documents older than {} days", expired.len(), days);
        Ok(expired.len())
    }

    /// Every recorded document whose file is still on disk
    pub fn indexable_pairs(&self) -> Vec<DocumentSource> {
        let records = self.records();
        let mut missing = 0;
        let pairs: Vec<DocumentSource> = records
            .iter()
            .filter_map(|(name, entry)| {
                let path = self.docs_dir.join(name);
                if path.is_file() {
                    Some(DocumentSource {
                        file_path: path,
                        url: entry.url.clone(),
                    })
                } else {
                    missing += 1;
                    None
                }
            })
            .collect();

        if missing > 0 {
            warn!("{} recorded documents are missing on disk", missing);
        }
        pairs
    }
}
