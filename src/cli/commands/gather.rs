//! Captcha gathering command.

use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use super::helpers::connect_client;
use crate::captcha::JsonlCaptchaLedger;
use crate::config::Settings;

/// Fetch `count` fresh challenges into the captcha ledger for later labelling.
pub async fn cmd_gather(settings: &Settings, count: usize) -> anyhow::Result<()> {
    settings.ensure_directories()?;
    let ledger = Arc::new(JsonlCaptchaLedger::new(&settings.captcha_ledger_path));
    let mut client = connect_client(settings, ledger).await?;

    let pb = ProgressBar::new(count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message("Gathering");

    let gathered = client
        .gather_challenges(count, |stored| pb.set_position(stored as u64))
        .await?;

    pb.finish_and_clear();
    println!(
        "{} Stored {} challenge(s) in {}",
        style("✓").green(),
        gathered,
        settings.captcha_ledger_path.display()
    );
    Ok(())
}
