use tracing::{debug, info};

use crate::{
    gate::error::{GateError, Rejection},
    github::{CheckRun, CheckRuns, PullRequestApi, PullRequestRef},
};

/// Verifies each required check in turn, stopping at the first one that isn't green.
///
/// Lookups are awaited one after the other.
pub async fn ensure_required_checks(
    api: &dyn PullRequestApi,
    pr: &PullRequestRef,
    required: &[String],
) -> Result<(), GateError> {
    for name in required {
        debug!("looking up runs of check '{}' on {}", name, pr.head_sha);
        let runs = api.list_check_runs(pr, name).await?;
        for run in &runs.check_runs {
            debug!("found run {}", run);
        }
        evaluate_check_runs(name, &runs)?;
        info!("required check '{}' passed", name);
    }

    Ok(())
}

pub fn evaluate_check_runs(name: &str, runs: &CheckRuns) -> Result<(), Rejection> {
    if runs.total_count == 0 {
        return Err(Rejection::CheckNotRun(name.to_owned()));
    }

    if !runs.check_runs.iter().any(CheckRun::is_successful) {
        return Err(Rejection::CheckNotSuccessful(name.to_owned()));
    }

    Ok(())
}
