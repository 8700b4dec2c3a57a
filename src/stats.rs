//! Store statistics overview.
//!
//! Provides a quick summary of what has been extracted: company, report,
//! and initiative counts with per-category, per-year, and per-company
//! breakdowns. Used by `ide stats` and at the end of `ide process`.

use anyhow::Result;

use crate::config::Config;
use crate::models::{NamedCount, Statistics};
use crate::store::Store;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = Store::open(config).await?;
    let stats = store.get_statistics().await?;

    let db_size = std::fs::metadata(store.path())
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Digital Initiative Index: Store Stats");
    println!("======================================");
    println!();
    println!("  Database:    {}", store.path().display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    print!("{}", render_statistics(&stats));

    store.close().await;
    Ok(())
}

/// Render statistics as indented text tables.
pub fn render_statistics(stats: &Statistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("  Companies:   {}\n", stats.total_companies));
    out.push_str(&format!("  Reports:     {}\n", stats.total_reports));
    out.push_str(&format!("  Initiatives: {}\n", stats.total_initiatives));

    render_table(&mut out, "By category:", "CATEGORY", &stats.by_category);
    render_table(&mut out, "By year:", "YEAR", &stats.by_year);
    render_table(&mut out, "Top companies:", "COMPANY", &stats.top_companies);

    out.push('\n');
    out
}

fn render_table(out: &mut String, title: &str, heading: &str, rows: &[NamedCount]) {
    if rows.is_empty() {
        return;
    }
    out.push('\n');
    out.push_str(&format!("  {}\n", title));
    out.push_str(&format!("  {:<40} {:>8}\n", heading, "COUNT"));
    out.push_str(&format!("  {}\n", "-".repeat(49)));
    for row in rows {
        out.push_str(&format!("  {:<40} {:>8}\n", row.name, row.count));
    }
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_render_skips_empty_tables() {
        let stats = Statistics {
            total_companies: 1,
            total_reports: 1,
            total_initiatives: 2,
            by_category: vec![NamedCount {
                name: "Cybersecurity".into(),
                count: 2,
            }],
            by_year: vec![],
            top_companies: vec![],
        };
        let text = render_statistics(&stats);
        assert!(text.contains("Initiatives: 2"));
        assert!(text.contains("By category:"));
        assert!(text.contains("Cybersecurity"));
        assert!(!text.contains("By year:"));
    }
}
