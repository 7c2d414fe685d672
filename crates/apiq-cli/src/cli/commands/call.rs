//! `apiq call <METHOD> <PATH>` – send one request.

use anyhow::{bail, Context, Result};
use apiq_core::config::ApiqConfig;
use apiq_core::request::{CallOptions, CallResult};
use apiq_core::scheduler::Scheduler;

#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    pub method: String,
    pub path: String,
    pub data: Option<String>,
    pub alias: Option<String>,
    pub attempts: Option<u32>,
}

impl CallArgs {
    pub fn to_options(&self) -> Result<CallOptions> {
        let mut opts = CallOptions::new(self.method.as_str(), self.path.as_str());
        if let Some(raw) = &self.data {
            let body = serde_json::from_str(raw).context("--data is not valid JSON")?;
            opts = opts.body(body);
        }
        if let Some(alias) = &self.alias {
            opts = opts.alias(alias.as_str());
        }
        if let Some(n) = self.attempts {
            opts = opts.attempts(n);
        }
        Ok(opts)
    }
}

/// Prints `result` as pretty JSON; an unsuccessful result becomes an error.
pub fn report(result: &CallResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    if !result.success {
        match result.status {
            Some(status) => bail!("request finished with status {}", status),
            None if result.error_info.is_empty() => bail!("request failed"),
            None => bail!("request failed: {}", result.error_info),
        }
    }
    Ok(())
}

pub async fn run_call(cfg: &ApiqConfig, args: CallArgs) -> Result<()> {
    let opts = args.to_options()?;
    let scheduler = Scheduler::with_curl(cfg);
    let result = scheduler.submit(opts).await;
    scheduler.shutdown().await;
    report(&result)
}
