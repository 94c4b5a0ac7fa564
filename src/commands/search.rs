//! Search and discover command implementation

use crate::discover::DiscoveryFilters;
use crate::flow::{DiscoverOutcome, LocalQuery, QueryOutcome, SearchFlow};
use crate::progress::spinner;
use tracing::info;

/// Search options
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Number of results to return
    pub limit: Option<usize>,
    /// Skip discovery and fetching
    pub local: bool,
}

/// Run one query, acquiring documents first unless `local` is set
pub async fn cmd_search(flow: &SearchFlow, query: LocalQuery, options: SearchOptions) -> QueryOutcome {
    info!("{} search: {}", query.mode(), query.label());

    if options.local {
        return flow.local_query(&query, options.limit);
    }

    let progress = spinner(format!("Acquiring documents for '{}'", query.discovery_text()));
    let outcome = flow.full_query_with(&query, options.limit).await;
    progress.finish_and_clear();
    outcome
}

/// Ask discovery about a keyword without fetching anything
pub async fn cmd_discover(
    flow: &SearchFlow,
    keyword: &str,
    filters: DiscoveryFilters,
    limit: Option<usize>,
) -> DiscoverOutcome {
    info!("Discovering: {}", keyword);
    flow.discover(keyword, filters, limit).await
}

fn one_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Print query results to console
pub fn print_query_outcome(outcome: &QueryOutcome) {
    let results = &outcome.results;
    println!("\n🔍 Query: {}\n", results.query);

    if let Some(error) = &outcome.error {
        println!("✗ {}", error);
        return;
    }
    if let Some(message) = &outcome.message {
        println!("{}", message);
    }
    if let Some(note) = &results.note {
        println!("⚠ {}\n", note);
    }

    println!("Found {} results:\n", results.total_hits);
    for (i, hit) in results.results.iter().enumerate() {
        println!("{}. [score: {:.3}] {}", i + 1, hit.score, hit.highlighted_title);
        println!("   {}", hit.url);
        if !hit.tags.is_empty() {
            println!("   Tags: {}", hit.tags.join(", "));
        }
        println!("   {}\n", one_line(&hit.highlighted_content));
    }

    if let (Some(stats), Some(efficiency)) =
        (&outcome.processing_stats, &outcome.processing_efficiency)
    {
        println!("📥 Acquisition:");
        println!("  Discovery hits: {}", stats.api_hits);
        println!(
            "  Downloaded: {} new, {} already stored, {} failed",
            stats.newly_downloaded, stats.skipped_existing_downloads, stats.failed_downloads
        );
        println!(
            "  Indexed: {} new, {} already indexed",
            stats.newly_indexed, stats.skipped_existing_indexing
        );
        println!(
            "  Skipped: {:.0}% of {} URLs",
            efficiency.total_efficiency * 100.0,
            efficiency.total_urls
        );
    }
}

/// Print discovery results to console
pub fn print_discover_outcome(outcome: &DiscoverOutcome) {
    println!("\n🧭 Discover: {}\n", outcome.query);

    if let Some(error) = &outcome.error {
        println!("✗ {}", error);
        return;
    }

    println!(
        "{} hits ({} estimated) in {}ms, {} unique URLs\n",
        outcome.total_hits,
        outcome.estimated_total_hits,
        outcome.processing_time_ms,
        outcome.unique_urls.len()
    );

    for (i, doc) in outcome.document_summaries.iter().enumerate() {
        println!("{}. {}", i + 1, doc.title);
        println!("   {}", doc.url);
        if !doc.summary.is_empty() {
            println!("   {}", one_line(&doc.summary));
        }
        println!();
    }

    let categories = &outcome.document_categories;
    for (label, counts) in [
        ("Document types", &categories.document_types),
        ("Languages", &categories.languages),
        ("Categories", &categories.categories),
    ] {
        if counts.is_empty() {
            continue;
        }
        let parts: Vec<String> = counts.iter().map(|(k, v)| format!("{} ({})", k, v)).collect();
        println!("{}: {}", label, parts.join(", "));
    }
}
