//! Batch run command.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use console::style;

use super::helpers::connect_client;
use crate::captcha::JsonlCaptchaLedger;
use crate::cli::progress::BarProgress;
use crate::client::TokioPause;
use crate::config::Settings;
use crate::models::RequestSpec;
use crate::orchestrator::{BatchError, BatchOrchestrator, JsonlSink};
use crate::tracker::{ProgressTracker, PsProcessTable};

/// Query every request spec in `requests` and append batches to the output file.
pub async fn cmd_run(settings: &Settings, requests: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(requests)
        .await
        .with_context(|| format!("failed to read {}", requests.display()))?;
    let specs: Vec<RequestSpec> = serde_json::from_str(&content)
        .with_context(|| format!("{} is not a JSON array of requests", requests.display()))?;

    if specs.is_empty() {
        println!("{} No requests in {}", style("!").yellow(), requests.display());
        return Ok(());
    }

    settings.ensure_directories()?;

    let ledger = Arc::new(JsonlCaptchaLedger::new(&settings.captcha_ledger_path));
    let client = connect_client(settings, ledger).await?;
    let tracker = ProgressTracker::new(
        &settings.tracker_path,
        Box::new(PsProcessTable::new(&settings.process_signature)),
    );
    let sink = JsonlSink::new(&settings.output_path);

    let mut orchestrator = BatchOrchestrator::new(client, tracker, Box::new(sink), Arc::new(TokioPause))
        .with_policy(settings.retry.clone());

    println!(
        "{} Querying {} request(s), writing to {}",
        style("→").cyan(),
        specs.len(),
        settings.output_path.display()
    );

    let mut progress = BarProgress::new();
    match orchestrator.run(&specs, &mut progress).await {
        Ok(summary) => {
            println!(
                "{} {} request(s) done, {} proceedings, {} retries",
                style("✓").green(),
                summary.completed,
                summary.records,
                summary.retries
            );
            Ok(())
        }
        Err(BatchError::AlreadyRunning { pid }) => {
            println!(
                "{} Another run is active (pid {}); see `fssp status`",
                style("✗").red(),
                pid
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
