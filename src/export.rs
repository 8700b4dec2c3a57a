//! Export the initiative store as JSON.
//!
//! Produces one document holding every initiative, the current statistics,
//! and the export time, for downstream analysis outside the CLI.

use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::models::{Initiative, Statistics};
use crate::store::Store;

#[derive(Serialize)]
pub struct ExportData {
    pub initiatives: Vec<Initiative>,
    pub statistics: Statistics,
    /// RFC 3339 timestamp.
    pub exported_at: String,
}

pub async fn collect_export(store: &Store) -> Result<ExportData> {
    Ok(ExportData {
        initiatives: store.all_initiatives().await?,
        statistics: store.get_statistics().await?,
        exported_at: chrono::Utc::now().to_rfc3339(),
    })
}

/// Export initiatives and statistics as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let store = Store::open(config).await?;
    let data = collect_export(&store).await?;
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)?;
            eprintln!(
                "Exported {} initiatives to {}",
                data.initiatives.len(),
                path.display()
            );
        }
        None => {
            println!("{}", json);
        }
    }

    store.close().await;
    Ok(())
}
