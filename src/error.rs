//! Custom error types for docsift

use thiserror::Error;

/// Main error type for docsift operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Index write error: {0}")]
    IndexWrite(String),

    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    #[error("Discovery service error: {0}")]
    Upstream(String),

    #[error("Index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    #[error("Index directory error: {0}")]
    IndexDirectory(#[from] tantivy::directory::error::OpenDirectoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Already initialized at {0}")]
    AlreadyInitialized(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("{0}")]
    Other(String),
}

impl From<tantivy::query::QueryParserError> for Error {
    fn from(err: tantivy::query::QueryParserError) -> Self {
        Error::QuerySyntax(err.to_string())
    }
}

/// Result type alias for docsift
pub type Result<T> = std::result::Result<T, Error>;
