//! `apiq bulk <FILE>` – send a file of calls as one bulk group.

use anyhow::{Context, Result};
use apiq_core::config::ApiqConfig;
use apiq_core::request::{BulkOptions, CallOptions, CompletionPolicy};
use apiq_core::scheduler::Scheduler;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use super::call::report;

/// Bulk file layout: a list of `[[call]]` tables.
#[derive(Debug, Default, Deserialize)]
pub struct BulkFile {
    #[serde(default)]
    pub call: Vec<CallOptions>,
}

pub fn load_bulk_file(path: &Path) -> Result<BulkFile> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse bulk file {}", path.display()))
}

pub async fn run_bulk(cfg: &ApiqConfig, path: &Path, continue_with_failure: bool) -> Result<()> {
    let file = load_bulk_file(path)?;
    tracing::info!(calls = file.call.len(), file = %path.display(), "bulk file loaded");

    let options = BulkOptions {
        policy: CompletionPolicy::from_continue_flag(continue_with_failure),
        ..BulkOptions::default()
    }
    .on_progress(|p| eprintln!("progress: {:>5.1}%", p * 100.0));

    let scheduler = Scheduler::with_curl(cfg);
    let result = scheduler.submit_bulk(file.call, options).await;
    scheduler.shutdown().await;
    report(&result)
}
