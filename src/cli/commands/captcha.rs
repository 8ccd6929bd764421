//! Offline captcha commands: solve one challenge, measure accuracy.

use std::path::Path;

use anyhow::Context;
use console::style;

use super::helpers::build_solver;
use crate::config::Settings;
use crate::models::{CaptchaChallenge, CaptchaSample, ScoredSample};

/// Solve a challenge stored in a file.
pub async fn cmd_solve(settings: &Settings, file: &Path) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let challenge = CaptchaChallenge::new(raw.trim());
    let solver = build_solver(settings)?;

    let attempt = tokio::task::spawn_blocking(move || solver.solve(&challenge)).await??;

    println!(
        "{} {} (factor {:.2})",
        style("✓").green(),
        style(&attempt.code).bold(),
        attempt.factor
    );
    Ok(())
}

/// Run the solver over labelled samples and report accuracy.
pub async fn cmd_measure(settings: &Settings, samples: &Path) -> anyhow::Result<()> {
    let content = tokio::fs::read_to_string(samples)
        .await
        .with_context(|| format!("failed to read {}", samples.display()))?;
    let samples: Vec<CaptchaSample> = serde_json::from_str(&content)
        .context("samples must be a JSON array of {\"challenge\", \"reference\"} objects")?;
    let solver = build_solver(settings)?;

    let mut report = tokio::task::spawn_blocking(move || solver.measure_accuracy(&samples)).await??;
    report.samples.sort_by(ScoredSample::compare_by_date);

    for sample in &report.samples {
        let mark = if sample.success {
            style("✓").green()
        } else {
            style("✗").red()
        };
        println!(
            "{} {:<8} {:<8} factor {:.2}",
            mark, sample.recognized, sample.reference, sample.factor
        );
    }

    println!(
        "\n{} of {} resolved ({}%)",
        report.resolved,
        report.samples.len(),
        report.percent_resolved()
    );
    Ok(())
}
