//! Rebuild and evict command implementation

use crate::error::Result;
use crate::flow::SearchFlow;
use crate::index::IndexReport;
use crate::progress::spinner;
use serde::Serialize;
use tracing::info;

/// Eviction outcome
#[derive(Debug, Clone, Serialize)]
pub struct EvictStats {
    pub days: u32,
    pub removed: usize,
}

/// Drop the index and re-ingest every stored document
pub fn cmd_rebuild(flow: &SearchFlow) -> Result<IndexReport> {
    info!("Starting rebuild");
    let progress = spinner("Rebuilding index");
    let report = flow.rebuild();
    progress.finish_and_clear();
    report
}

/// Remove stored documents older than `days`
pub fn cmd_evict(flow: &SearchFlow, days: u32) -> Result<EvictStats> {
    let removed = flow.evict_older_than(days)?;
    Ok(EvictStats { days, removed })
}

/// Print rebuild report to console
pub fn print_rebuild_report(report: &IndexReport) {
    println!("\n🔄 Rebuild Complete\n");
    println!("Documents found: {}", report.total_count);
    println!("Indexed: {}", report.success_count);
    if report.skipped_count > 0 {
        println!("Duplicates skipped: {}", report.skipped_count);
    }
    if report.failure_count > 0 {
        println!("⚠ Failed: {}", report.failure_count);
    }
}

/// Print eviction outcome to console
pub fn print_evict_stats(stats: &EvictStats) {
    println!(
        "\n🧹 Removed {} documents older than {} days",
        stats.removed, stats.days
    );
    if stats.removed > 0 {
        println!("Run 'docsift rebuild' to drop them from the index.");
    }
}
