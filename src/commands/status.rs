//! Stats command implementation

use crate::flow::{SearchFlow, SystemStats};
use tracing::info;

/// Get store and index statistics
pub fn cmd_stats(flow: &SearchFlow) -> SystemStats {
    info!("Getting stats");
    flow.get_stats()
}

/// Print stats to console
pub fn print_stats(stats: &SystemStats) {
    println!("\n📊 docsift Status\n");
    println!("Configuration: {}", stats.config.config_file);
    println!("Data: {}", stats.config.data_dir);
    println!("Discovery: {}", stats.config.discovery_endpoint);
    println!(
        "Fetching: {} concurrent, {}ms delay",
        stats.config.fetch_concurrency, stats.config.request_delay_ms
    );

    println!("\nDocuments:");
    match &stats.downloader {
        Some(files) => {
            println!("  Directory: {}", files.download_dir);
            println!("  Files: {}", files.total_files);
            println!("  Size: {:.2} MB", files.total_size_mb);
            if let Some((day, count)) = files.download_dates.iter().next_back() {
                println!("  Last download day: {} ({} documents)", day, count);
            }
        }
        None => println!("  ✗ Unavailable"),
    }

    println!("\nIndex:");
    match &stats.search_engine {
        Some(index) => {
            println!("  Directory: {}", index.index_dir);
            println!("  Documents: {}", index.total_docs);
            println!("  Scoring: {}", index.scorer);
            let fields: Vec<String> = index
                .schema_fields
                .iter()
                .map(|f| match f.boost {
                    Some(boost) => format!("{} (x{})", f.name, boost),
                    None => f.name.to_string(),
                })
                .collect();
            println!("  Fields: {}", fields.join(", "));
        }
        None => println!("  ✗ Unavailable"),
    }

    for error in &stats.errors {
        println!("\n⚠ {}", error);
    }
}
