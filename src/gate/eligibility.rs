use regex::Regex;

use crate::{
    gate::error::Rejection,
    webhooks::github::events::{PullRequestAction, PullRequestEvent},
};

#[derive(Debug, PartialEq, Eq)]
pub enum Eligibility {
    /// The event doesn't concern the gate, nothing should be posted.
    Skip,
    Reject(Rejection),
    Proceed,
}

/// Structural checks on the event itself, done before any API call.
pub fn check_eligibility(event: &PullRequestEvent, label: &str, reference: &Regex) -> Eligibility {
    let pr = &event.pull_request;
    let labeled = pr.has_label(label);

    // NOTE: both actions only proceed while the label is still on the PR, so an `unlabeled`
    // event for our own label is never evaluated.
    let relevant = match event.action {
        PullRequestAction::Labeled | PullRequestAction::Unlabeled => labeled,
        PullRequestAction::Other(_) => false,
    };
    if !relevant {
        return Eligibility::Skip;
    }

    if pr.draft && labeled {
        return Eligibility::Reject(Rejection::Draft);
    }

    if pr.draft {
        return Eligibility::Skip;
    }

    if !reference.is_match(pr.body()) {
        return Eligibility::Reject(Rejection::MissingReference);
    }

    let pending = pr.requested_reviewers.len();
    if pending > 0 {
        return Eligibility::Reject(Rejection::ReviewsExpected(pending));
    }

    Eligibility::Proceed
}
