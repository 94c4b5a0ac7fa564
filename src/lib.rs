//! docsift: a local, searchable corpus of remotely discovered documentation
//!
//! Documents found through a discovery service are fetched once, stored by
//! content-hash name, extracted into structured fields and indexed for
//! keyword, boolean, phrase, fuzzy and tag search.

pub mod commands;
pub mod config;
pub mod discover;
pub mod error;
pub mod flow;
pub mod index;
pub mod parse;
pub mod progress;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use flow::SearchFlow;
