//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{tokenizer, Highlighter, IndexEngine};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub config_path: PathBuf,
    pub force: bool,
}

/// Write a default configuration and create the data directories and an empty index
pub fn cmd_init(options: InitOptions) -> Result<Config> {
    let InitOptions { config_path, force } = options;

    if config_path.exists() && !force {
        return Err(Error::AlreadyInitialized(format!(
            "{} (use --force to overwrite)",
            config_path.display()
        )));
    }

    let config = Config::at(&config_path);
    config.validate()?;
    config.save()?;

    std::fs::create_dir_all(&config.paths.docs_dir)?;
    tokenizer::init(&config.index.custom_terms);
    IndexEngine::open(
        &config.paths.index_dir,
        Highlighter::new(&config.index.highlight_pre, &config.index.highlight_post),
    )?;
    info!("Created data directory at {:?}", config.paths.data_dir);

    Ok(config)
}

/// Print init summary to console
pub fn print_init(config: &Config) {
    println!("✓ Initialized docsift at {:?}", config.paths.base_dir);
    println!("\nConfiguration: {:?}", config.paths.config_file);
    println!("Documents: {:?}", config.paths.docs_dir);
    println!("Index: {:?}", config.paths.index_dir);
    println!("\nNext steps:");
    println!("  docsift search 行情            # Discover, fetch and search");
    println!("  docsift search 行情 --local    # Search what is already indexed");
    println!("  docsift discover 下单           # Preview what discovery knows");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_layout_and_refuses_overwrite() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");
        let options = InitOptions {
            config_path: config_path.clone(),
            force: false,
        };

        let config = cmd_init(options.clone()).unwrap();
        assert!(config_path.exists());
        assert!(config.paths.docs_dir.is_dir());
        assert!(config.paths.index_dir.is_dir());

        let err = cmd_init(options).unwrap_err();
        assert!(matches!(err, Error::AlreadyInitialized(_)));

        assert!(cmd_init(InitOptions {
            config_path,
            force: true,
        })
        .is_ok());
    }
}
