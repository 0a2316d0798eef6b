// src/pipeline/build.rs

//! Build orchestration over all discovered bundles.

use std::fmt;

use crate::bundle::Bundle;
use crate::error::{AppError, Result};
use crate::models::BuildConfig;
use crate::services::{ProcessOutput, ProcessRunner, ProcessStatus};

use super::progress::ProgressDisplay;

/// Outcome counts of a build run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub succeeded: usize,
    /// Exit code zero with diagnostics on stderr
    pub warned: usize,
    /// Non-zero exit, timeout or spawn failure
    pub errored: usize,
}

impl BuildSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.warned + self.errored
    }
}

impl fmt::Display for BuildSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} warnings, {} errors",
            self.succeeded, self.warned, self.errored
        )
    }
}

/// Build every bundle, never stopping on a single failure.
///
/// With `require_bundles`, an empty bundle list is an error.
pub async fn build_all(
    bundles: &mut [Bundle],
    runner: &dyn ProcessRunner,
    config: &BuildConfig,
    require_bundles: bool,
    progress: &ProgressDisplay,
) -> Result<BuildSummary> {
    if bundles.is_empty() && require_bundles {
        return Err(AppError::NoBundlesFound("the build queue".into()));
    }

    let mut summary = BuildSummary::default();
    for bundle in bundles.iter_mut() {
        progress.start(bundle.label());
        let label = bundle.label().to_string();
        let result = bundle.generate_build(runner, config).await;
        record("BUILD", &label, result, config, &mut summary)?;
        progress.inc();
    }
    progress.finish();

    log::info!("Build finished: {}", summary);
    Ok(summary)
}

/// Install every bundle for the current user, or system-wide.
pub async fn install_all(
    bundles: &[Bundle],
    runner: &dyn ProcessRunner,
    config: &BuildConfig,
    system: bool,
    progress: &ProgressDisplay,
) -> Result<BuildSummary> {
    if bundles.is_empty() {
        return Err(AppError::NoBundlesFound("the install queue".into()));
    }

    let mut summary = BuildSummary::default();
    for bundle in bundles {
        progress.start(bundle.label());
        let result = bundle.install(runner, config, system).await;
        record("INSTALL", bundle.label(), result, config, &mut summary)?;
        progress.inc();
    }
    progress.finish();

    log::info!("Install finished: {}", summary);
    Ok(summary)
}

/// Count one step outcome. Only fatal errors propagate.
fn record(
    step: &str,
    label: &str,
    result: Result<ProcessOutput>,
    config: &BuildConfig,
    summary: &mut BuildSummary,
) -> Result<()> {
    match result {
        Ok(output) => match output.status {
            ProcessStatus::Exited(0) if output.stderr.trim().is_empty() => {
                log::info!("[{}][{}] ok", step, label);
                summary.succeeded += 1;
            }
            ProcessStatus::Exited(0) => {
                log::warn!("[{}][{}] {}", step, label, output.stderr.trim());
                summary.warned += 1;
            }
            ProcessStatus::Exited(code) => {
                let err = AppError::BuildFailure {
                    bundle: label.to_string(),
                    code,
                };
                log::error!("[{}][{}] {}: {}", step, label, err, output.stderr.trim());
                summary.errored += 1;
            }
            ProcessStatus::TimedOut => {
                let err = AppError::BuildTimeout {
                    bundle: label.to_string(),
                    secs: if config.retry {
                        config.timeout_secs * 3
                    } else {
                        config.timeout_secs
                    },
                };
                log::error!("[{}][{}] {}", step, label, err);
                summary.errored += 1;
            }
        },
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            log::error!("[{}][{}] {}", step, label, e);
            summary.errored += 1;
        }
    }
    Ok(())
}
