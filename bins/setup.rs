use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use dotenvy::dotenv;
use tracing::{error, info, warn};
use uuid::Uuid;

use configs::AppConfig;
use service::backend::AppwriteBackend;
use service::provision::{Provisioner, StepOutcome};

const ATTRIBUTE_SETTLE: Duration = Duration::from_secs(2);

fn load_config() -> anyhow::Result<AppConfig> {
    let cfg = AppConfig::load_and_validate()?;
    if cfg.backend.api_key.is_none() {
        return Err(anyhow!("APPWRITE_API_KEY is required to provision collections and buckets"));
    }
    Ok(cfg)
}

async fn run(cfg: AppConfig) -> anyhow::Result<bool> {
    let backend = AppwriteBackend::new(&cfg.backend).context("building backend client")?;
    let provisioner = Provisioner::new(Arc::new(backend), cfg).with_attribute_settle(ATTRIBUTE_SETTLE);
    let report = provisioner.run().await;

    for step in report.steps.iter().filter(|s| s.outcome == StepOutcome::Failed) {
        warn!(service = "setup", step = %step.target, error = step.message.as_deref().unwrap_or(""), "step_failed");
    }
    info!(
        service = "setup",
        event = "summary",
        created = report.created(),
        existing = report.existing(),
        failed = report.failed(),
        "provisioning finished"
    );
    Ok(report.is_success())
}

fn main() -> ExitCode {
    dotenv().ok();

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "setup", event = "config_invalid", error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging(cfg.logging.json);

    let run_id = Uuid::new_v4();
    std::panic::set_hook(Box::new(move |info| {
        error!(service = "setup", event = "panic", %run_id, message = %info, "unhandled panic occurred");
    }));

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "setup", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service = "setup",
        event = "start",
        %run_id,
        endpoint = %cfg.backend.endpoint,
        database = %cfg.backend.database_id,
        version = env!("CARGO_PKG_VERSION"),
        "provisioning backend schema"
    );

    match rt.block_on(run(cfg)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!(service = "setup", event = "run_failed", error = %e, "setup aborted");
            ExitCode::FAILURE
        }
    }
}
