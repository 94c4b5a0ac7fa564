//! Persisted URL to document metadata map.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Deterministic storage identity of a URL
pub fn content_hash_id(url: &str) -> String {
    blake3::hash(url.as_bytes()).to_hex().to_string()
}

/// Storage filename of a URL
pub fn file_name_for(url: &str) -> String {
    format!("{}.html", content_hash_id(url))
}

/// Metadata persisted for every downloaded document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlMapEntry {
    pub url: String,
    pub downloaded_at: DateTime<Utc>,
    pub file_size: u64,
}

/// Filename-keyed map of downloaded documents, read and written as one JSON file
#[derive(Debug, Default)]
pub struct UrlMap {
    entries: BTreeMap<String, UrlMapEntry>,
}

impl UrlMap {
    /// Load the map; a missing or unreadable file yields an empty map
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("No URL map at {:?} ({}), starting empty", path, e);
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => Self { entries },
            Err(e) => {
                warn!("Ignoring corrupt URL map {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Write the whole map to a sibling temp file, then rename it into place
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&self.entries)?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Entry recorded for `url`, with its filename
    pub fn get(&self, url: &str) -> Option<(String, &UrlMapEntry)> {
        let name = file_name_for(url);
        let entry = self.entries.get(&name).filter(|e| e.url == url)?;
        Some((name, entry))
    }

    pub fn insert(&mut self, file_name: String, entry: UrlMapEntry) {
        self.entries.insert(file_name, entry);
    }

    pub fn remove(&mut self, file_name: &str) -> Option<UrlMapEntry> {
        self.entries.remove(file_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UrlMapEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(url: &str) -> UrlMapEntry {
        UrlMapEntry {
            url: url.to_string(),
            downloaded_at: Utc::now(),
            file_size: 42,
        }
    }

    #[test]
    fn test_file_name_is_deterministic() {
        let a = file_name_for("https://example.com/a");
        assert_eq!(a, file_name_for("https://example.com/a"));
        assert_ne!(a, file_name_for("https://example.com/b"));
        assert!(a.ends_with(".html"));
        assert_eq!(a.len(), 64 + ".html".len());
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("docs").join("url_map.json");

        let mut map = UrlMap::default();
        let url = "https://example.com/a";
        map.insert(file_name_for(url), entry(url));
        map.save(&path).unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = UrlMap::load(&path);
        assert_eq!(loaded.len(), 1);
        let (name, stored) = loaded.get(url).unwrap();
        assert_eq!(name, file_name_for(url));
        assert_eq!(stored.file_size, 42);
    }

    #[test]
    fn test_corrupt_map_starts_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("url_map.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(UrlMap::load(&path).is_empty());
        assert!(UrlMap::load(&tmp.path().join("absent.json")).is_empty());
    }
}
