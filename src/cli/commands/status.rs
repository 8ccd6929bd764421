//! Run status command.

use console::style;

use crate::captcha::JsonlCaptchaLedger;
use crate::config::Settings;
use crate::tracker::{now, ProgressTracker, PsProcessTable, DATE_FORMAT};

/// Show the tracker state and the captcha ledger totals.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let tracker = ProgressTracker::new(
        &settings.tracker_path,
        Box::new(PsProcessTable::new(&settings.process_signature)),
    );

    println!("\n{}", style("Batch Run").bold());
    println!("{}", "-".repeat(40));

    match tracker.state()? {
        None => println!("{:<16} {}", "Status:", style("Not running").dim()),
        Some(state) => {
            let fmt = |d: Option<chrono::NaiveDateTime>| {
                d.map(|d| d.format(DATE_FORMAT).to_string())
                    .unwrap_or_else(|| "-".to_string())
            };

            println!("{:<16} {}", "Status:", style("Running").green());
            println!("{:<16} {}", "Started:", state.start_date.format(DATE_FORMAT));
            println!("{:<16} {}", "Process:", state.process_id);
            println!("{:<16} {}", "Successful:", state.success_count);
            println!("{:<16} {}", "Last success:", fmt(state.last_success_date));
            println!("{:<16} {}", "Per hour:", state.average_per_hour(now()));
            println!("{:<16} {}", "Last error at:", fmt(state.last_error_date));
            if let Some(error) = &state.last_error_message {
                println!("{:<16} {}", "Last error:", style(error).red());
            }
        }
    }

    let ledger = JsonlCaptchaLedger::new(&settings.captcha_ledger_path);
    let entries = ledger.entries()?;
    let judged: Vec<bool> = entries.iter().filter_map(|e| e.is_resolved).collect();
    let resolved = judged.iter().filter(|r| **r).count();

    println!("\n{}", style("Captcha Ledger").bold());
    println!("{}", "-".repeat(40));
    println!("{:<16} {}", "Entries:", entries.len());
    println!("{:<16} {}", "Unlabelled:", entries.len() - judged.len());
    if !judged.is_empty() {
        let percent = resolved as f64 / judged.len() as f64 * 100.0;
        println!(
            "{:<16} {}/{} ({:.2}%)",
            "Accepted:",
            resolved,
            judged.len(),
            percent
        );
    }

    Ok(())
}
