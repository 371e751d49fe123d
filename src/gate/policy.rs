use tracing::{debug, info};

use crate::{
    config::GateConfig,
    gate::{
        checks::ensure_required_checks,
        error::{GateError, Rejection},
        reviews::{ReviewState, ReviewerVerdict},
    },
    github::{PullRequestApi, PullRequestRef},
};

/// Counts the reviewers that belong to the lead-dev team.
///
/// Lookups run one at a time; a failed lookup counts as "not a member".
pub async fn count_lead_devs(
    api: &dyn PullRequestApi,
    pr: &PullRequestRef,
    team_id: &str,
    verdicts: &[ReviewerVerdict],
) -> usize {
    let mut count = 0;

    for verdict in verdicts {
        match api.is_team_member(pr, team_id, &verdict.reviewer).await {
            Ok(true) => count += 1,
            Ok(false) => {}
            Err(e) => debug!(
                "membership lookup for {} failed, assuming not a lead dev: {}",
                verdict.reviewer, e
            ),
        }
    }

    count
}

pub fn ensure_fully_approved(verdicts: &[ReviewerVerdict]) -> Result<(), Rejection> {
    let waiting: Vec<String> = verdicts
        .iter()
        .filter(|verdict| verdict.state != ReviewState::Approved)
        .map(|verdict| verdict.reviewer.clone())
        .collect();

    if verdicts.is_empty() || !waiting.is_empty() {
        info!("reviewers: {}", waiting.join(","));
        return Err(Rejection::NotFullyApproved { waiting });
    }

    Ok(())
}

/// Runs the approval rules in order: lead-dev review, full approval, then required checks.
pub async fn check_approval(
    api: &dyn PullRequestApi,
    pr: &PullRequestRef,
    config: &GateConfig,
    verdicts: &[ReviewerVerdict],
) -> Result<(), GateError> {
    let lead_devs = count_lead_devs(api, pr, &config.leaddev_team_id, verdicts).await;
    if lead_devs == 0 {
        return Err(Rejection::NoLeadDev.into());
    }

    ensure_fully_approved(verdicts)?;

    ensure_required_checks(api, pr, &config.required_checks).await
}
