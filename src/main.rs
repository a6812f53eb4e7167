//! market-pulse-bot: one run per invocation.
//! Meant to be fired by an external periodic trigger (cron, CI schedule)
//! every few minutes; all memory lives in the state file.

use std::process::ExitCode;

use chrono::Utc;
use market_pulse_bot::notify::notifier_from_env;
use market_pulse_bot::orchestrator::report_failure;
use market_pulse_bot::{telemetry, BotConfig, Collaborators, Orchestrator, TriggerMode};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the file is absent.
    let _ = dotenvy::dotenv();
    telemetry::init_tracing();

    let notifier = notifier_from_env();

    let config = match BotConfig::load_default() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = ?e, "config invalid");
            report_failure(notifier.as_ref(), &e).await;
            return ExitCode::FAILURE;
        }
    };

    let metrics = match &config.metrics_textfile {
        Some(_) => match telemetry::install_metrics() {
            Ok(h) => Some(h),
            Err(e) => {
                tracing::warn!(error = ?e, "metrics disabled");
                None
            }
        },
        None => None,
    };

    let mode = TriggerMode::from_env();
    let result = match Collaborators::from_config(&config, notifier.clone()) {
        Ok(deps) => {
            Orchestrator::new(config.clone(), deps)
                .run(mode, Utc::now())
                .await
        }
        Err(e) => Err(e),
    };

    if let (Some(handle), Some(path)) = (&metrics, &config.metrics_textfile) {
        if let Err(e) = telemetry::write_metrics_textfile(handle, path) {
            tracing::warn!(error = ?e, "metrics textfile not written");
        }
    }

    match result {
        Ok(summary) => {
            tracing::info!(
                ?mode,
                alerts = summary.alerts_sent.len(),
                reports = summary.reports_sent.len(),
                purged = summary.purged_news,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = ?e, "run failed");
            report_failure(notifier.as_ref(), &e).await;
            ExitCode::FAILURE
        }
    }
}
