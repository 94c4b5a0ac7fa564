//! docsift CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use docsift::{
    commands::{
        cmd_discover, cmd_evict, cmd_init, cmd_rebuild, cmd_search, cmd_stats, print_discover_outcome,
        print_evict_stats, print_init, print_query_outcome, print_rebuild_report, print_stats,
        InitOptions, SearchOptions,
    },
    config::Config,
    discover::{Category, DiscoveryFilters, DocumentType, Language},
    error::Result,
    flow::{LocalQuery, SearchFlow, DEFAULT_FUZZY_DISTANCE},
    progress::LogWriterFactory,
};
use serde::Serialize;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "docsift")]
#[command(version, about = "Keep a local, searchable corpus of remotely discovered documentation", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every search mode
#[derive(clap::Args, Debug, Clone)]
struct SearchArgs {
    /// Maximum number of results
    #[arg(short, long)]
    limit: Option<usize>,

    /// Search the local index only, without discovery or fetching
    #[arg(long)]
    local: bool,
}

impl From<SearchArgs> for SearchOptions {
    fn from(args: SearchArgs) -> Self {
        SearchOptions {
            limit: args.limit,
            local: args.local,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize docsift configuration and data directories
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Keyword search across titles, headings, code and content
    Search {
        /// The search keywords
        keyword: String,

        #[command(flatten)]
        args: SearchArgs,
    },

    /// Boolean search (AND, OR, NOT, grouping, field:term)
    Boolean {
        /// The boolean expression
        expression: String,

        #[command(flatten)]
        args: SearchArgs,
    },

    /// Exact phrase search
    Phrase {
        /// The phrase
        phrase: String,

        #[command(flatten)]
        args: SearchArgs,
    },

    /// Typo-tolerant search for a single term
    Fuzzy {
        /// The term
        term: String,

        /// Maximum edit distance (1 or 2)
        #[arg(short, long, default_value_t = DEFAULT_FUZZY_DISTANCE)]
        distance: u8,

        #[command(flatten)]
        args: SearchArgs,
    },

    /// Search documents carrying a tag
    Tag {
        /// The tag
        tag: String,

        /// Keywords the tagged documents must also match
        #[arg(short, long, default_value = "")]
        keyword: String,

        #[command(flatten)]
        args: SearchArgs,
    },

    /// Show what discovery knows about a keyword without fetching anything
    Discover {
        /// The search keywords
        keyword: String,

        /// Filter by document type
        #[arg(long, value_enum)]
        document_type: Option<DocumentType>,

        /// Filter by SDK language
        #[arg(long, value_enum)]
        language: Option<Language>,

        /// Filter by functional category
        #[arg(long, value_enum)]
        category: Option<Category>,

        /// Maximum discovery hits
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show store and index statistics
    Stats,

    /// Rebuild the index from every stored document
    Rebuild,

    /// Remove stored documents older than the given number of days
    Evict {
        /// Age in days
        days: u32,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Handle init command specially (doesn't need existing config)
    if let Commands::Init { force } = cli.command {
        let config_path = cli.config.unwrap_or_else(Config::default_config_path);
        let config = cmd_init(InitOptions { config_path, force })?;
        print_init(&config);
        return Ok(());
    }

    // Handle completions command (doesn't need config)
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "docsift", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let flow = SearchFlow::new(config)?;
    let json = cli.json;

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Search { keyword, args } => {
            let query = LocalQuery::Keyword { keyword };
            search(&flow, query, args, json).await?;
        }

        Commands::Boolean { expression, args } => {
            let query = LocalQuery::Boolean { expression };
            search(&flow, query, args, json).await?;
        }

        Commands::Phrase { phrase, args } => {
            let query = LocalQuery::Phrase { phrase };
            search(&flow, query, args, json).await?;
        }

        Commands::Fuzzy {
            term,
            distance,
            args,
        } => {
            let query = LocalQuery::Fuzzy { term, distance };
            search(&flow, query, args, json).await?;
        }

        Commands::Tag { tag, keyword, args } => {
            let query = LocalQuery::Tag { tag, keyword };
            search(&flow, query, args, json).await?;
        }

        Commands::Discover {
            keyword,
            document_type,
            language,
            category,
            limit,
        } => {
            let filters = DiscoveryFilters {
                document_type,
                language,
                category,
            };
            let outcome = cmd_discover(&flow, &keyword, filters, limit).await;
            output(&outcome, json, print_discover_outcome)?;
        }

        Commands::Stats => {
            let stats = cmd_stats(&flow);
            output(&stats, json, print_stats)?;
        }

        Commands::Rebuild => {
            let report = cmd_rebuild(&flow)?;
            output(&report, json, print_rebuild_report)?;
        }

        Commands::Evict { days } => {
            let stats = cmd_evict(&flow, days)?;
            output(&stats, json, print_evict_stats)?;
        }
    }

    Ok(())
}

async fn search(flow: &SearchFlow, query: LocalQuery, args: SearchArgs, json: bool) -> Result<()> {
    let outcome = cmd_search(flow, query, args.into()).await;
    output(&outcome, json, print_query_outcome)
}

fn output<T: Serialize>(value: &T, json: bool, print: impl Fn(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print(value);
    }
    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        eprintln!(
            "Config file not found: {}\nRun 'docsift init' first.",
            config_path.display()
        );
        std::process::exit(1);
    }

    Config::load(&config_path)
}
