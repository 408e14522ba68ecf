use chrono::Datelike;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cli::{ExportArgs, StatusArgs};
use siplah_export::client::HttpExportBackend;
use siplah_export::config::Config;
use siplah_export::export::{
    AuthToken, BackendError, BillsFilter, ExportBackend, ExportError, ExportFilter, ExportJob,
    ExportJobController, ExportKind, ExportStatus, FilterError, JobId, OrdersFilter,
    PaymentsFilter, ProviderFilter,
};
use siplah_export::storage::{ExportStore, StorageError};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No API token: pass --token or set SIPLAH_TOKEN")]
    MissingToken,

    #[error("{0}")]
    Usage(String),

    #[error("Invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("{0}")]
    Failed(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode status report: {0}")]
    Json(#[from] serde_json::Error),
}

fn resolve_token(config: &Config, flag: Option<String>) -> Result<AuthToken, CommandError> {
    flag.or_else(|| config.api.token.clone())
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
        .map(AuthToken::new)
        .ok_or(CommandError::MissingToken)
}

/// Translate command-line flags into the request body for the chosen kind
pub fn build_filter(args: &ExportArgs) -> Result<ExportFilter, CommandError> {
    let filter = match args.kind {
        ExportKind::Orders => ExportFilter::try_from(
            OrdersFilter::builder()
                .maybe_search(args.search.clone())
                .statuses(args.statuses.clone())
                .maybe_start_date(args.start_date)
                .maybe_end_date(args.end_date)
                .build(),
        )?,
        ExportKind::Payments => ExportFilter::try_from(
            PaymentsFilter::builder()
                .maybe_search(args.search.clone())
                .maybe_forwarded(args.forwarded)
                .maybe_start_date(args.start_date)
                .maybe_end_date(args.end_date)
                .build(),
        )?,
        ExportKind::Bills => {
            let period = match (args.month, args.year, args.start_date, args.end_date) {
                (Some(month), Some(year), _, _) => BillsFilter::Month { month, year },
                (None, _, Some(start), Some(end)) => BillsFilter::DateRange { start, end },
                _ => {
                    return Err(CommandError::Usage(
                        "bills export needs --month and --year, or --start-date and --end-date"
                            .to_string(),
                    ));
                }
            };
            ExportFilter::try_from(period)?
        }
        ExportKind::Providers => {
            let year = args.year.unwrap_or_else(|| chrono::Local::now().year());
            ExportFilter::try_from(
                ProviderFilter::builder()
                    .mall_ids(args.providers.clone())
                    .year(year)
                    .build(),
            )?
        }
    };

    Ok(filter)
}

/// Start an export, follow it to completion and save the file
pub async fn run_export(
    config: Config,
    token: Option<String>,
    args: ExportArgs,
) -> Result<(), CommandError> {
    let token = resolve_token(&config, token)?;
    let filter = build_filter(&args)?;
    let out_dir = args.out.clone().unwrap_or_else(|| config.output.dir.clone());
    let store = ExportStore::local(&out_dir)?;

    let backend = HttpExportBackend::from_config(args.kind, &config, token.clone())?;
    info!(kind = %backend.kind(), filter = %serde_json::Value::Object(filter.as_map().clone()), "Starting export");

    let controller =
        ExportJobController::new(Arc::new(backend), token, config.export.controller_options());

    if let Err(err) = controller.start(filter).await {
        let job = controller.snapshot();
        return Err(match job.error {
            Some(job_error) => CommandError::Failed(job_error.user_message()),
            None => err.into(),
        });
    }

    let job = tokio::select! {
        job = follow_progress(&controller) => job,
        _ = shutdown_signal() => {
            controller.cancel();
            return Err(CommandError::Cancelled);
        }
    };

    if job.status != ExportStatus::Completed {
        let message = job
            .error
            .map(|e| e.user_message())
            .unwrap_or_else(|| format!("Export ended with status {}", job.status));
        return Err(CommandError::Failed(message));
    }

    let file = match controller.download().await {
        Ok(file) => file,
        Err(err) => {
            warn!(error = %err, "Download failed");
            let message = controller
                .snapshot()
                .error
                .map(|e| e.user_message())
                .unwrap_or_else(|| err.to_string());
            return Err(CommandError::Failed(message));
        }
    };

    let saved = store.save(&file).await?;
    info!(
        path = %out_dir.join(&saved.key).display(),
        size = saved.size,
        record_count = ?file.record_count,
        "Export saved"
    );

    Ok(())
}

/// Log status and progress changes until the job settles
async fn follow_progress(controller: &ExportJobController) -> ExportJob {
    let mut rx = controller.subscribe();
    let mut last = None;

    loop {
        let job = ExportJob::clone(&rx.borrow_and_update());

        if last != Some((job.status, job.raw_progress)) {
            info!(
                status = job.status.label(),
                progress = job.raw_progress,
                estimated_time = ?job.estimated_time,
                message = ?job.message,
                "Export progress"
            );
            last = Some((job.status, job.raw_progress));
        } else {
            debug!(display_progress = job.display_progress, "Progress frame");
        }

        if job.status.is_terminal() || job.status == ExportStatus::Idle {
            return job;
        }

        if rx.changed().await.is_err() {
            return controller.snapshot();
        }
    }
}

/// Perform one status check and print the report as JSON
pub async fn run_status(
    config: Config,
    token: Option<String>,
    args: StatusArgs,
) -> Result<(), CommandError> {
    let token = resolve_token(&config, token)?;
    let backend = HttpExportBackend::from_config(args.kind, &config, token)?;

    let job_id = JobId::new(args.job_id.trim());
    debug!(kind = %backend.kind(), %job_id, "Checking export status");
    let report = backend.check_status(&job_id).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn args(kind: ExportKind) -> ExportArgs {
        ExportArgs {
            kind,
            search: None,
            statuses: Vec::new(),
            forwarded: None,
            start_date: None,
            end_date: None,
            month: None,
            year: None,
            providers: Vec::new(),
            out: None,
        }
    }

    #[test]
    fn test_orders_without_flags_exports_everything() {
        let filter = build_filter(&args(ExportKind::Orders)).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_bills_by_month() {
        let mut bills = args(ExportKind::Bills);
        bills.month = Some(3);
        bills.year = Some(2024);

        let filter = build_filter(&bills).unwrap();
        assert_eq!(filter.get("month"), Some(&serde_json::json!(3)));
        assert_eq!(filter.get("year"), Some(&serde_json::json!(2024)));
    }

    #[test]
    fn test_bills_need_a_period() {
        let mut bills = args(ExportKind::Bills);
        bills.start_date = NaiveDate::from_ymd_opt(2024, 1, 1);

        assert!(matches!(build_filter(&bills), Err(CommandError::Usage(_))));
    }

    #[test]
    fn test_providers_need_a_selection() {
        let mut providers = args(ExportKind::Providers);
        providers.year = Some(2024);

        assert!(matches!(
            build_filter(&providers),
            Err(CommandError::Filter(FilterError::NoProviders))
        ));
    }

    #[test]
    fn test_token_flag_wins_over_environment() {
        let mut config = Config::default();
        config.api.token = Some("from-env".to_string());

        let token = resolve_token(&config, Some("from-flag".to_string())).unwrap();
        assert_eq!(token.expose(), "from-flag");

        config.api.token = None;
        assert!(matches!(
            resolve_token(&config, Some("  ".to_string())),
            Err(CommandError::MissingToken)
        ));
    }
}
