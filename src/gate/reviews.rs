use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ReviewState {
    Approved,
    ChangesRequested,
    Commented,
    Dismissed,
    Pending,
    Other(String),
}

impl From<String> for ReviewState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "APPROVED" => Self::Approved,
            "CHANGES_REQUESTED" => Self::ChangesRequested,
            "COMMENTED" => Self::Commented,
            "DISMISSED" => Self::Dismissed,
            "PENDING" => Self::Pending,
            _ => Self::Other(state),
        }
    }
}

impl Display for ReviewState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match self {
            Self::Approved => "APPROVED",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Commented => "COMMENTED",
            Self::Dismissed => "DISMISSED",
            Self::Pending => "PENDING",
            Self::Other(state) => state,
        };
        f.write_str(state)
    }
}

/// One review as submitted on the pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewRecord {
    pub reviewer: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub state: ReviewState,
}

/// The review that currently counts for a given reviewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewerVerdict {
    pub reviewer: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub state: ReviewState,
}

impl From<&ReviewRecord> for ReviewerVerdict {
    fn from(record: &ReviewRecord) -> Self {
        Self {
            reviewer: record.reviewer.clone(),
            submitted_at: record.submitted_at,
            state: record.state.clone(),
        }
    }
}

/// Reduces a review history to the latest non-comment review of each reviewer.
///
/// Records are folded in the order given. A record replaces the current verdict of its reviewer
/// only when it was submitted strictly later, so on equal timestamps the first one wins. Verdicts
/// come out in the order their reviewer first appeared. An unsubmitted review (no timestamp) is
/// older than any submitted one.
pub fn latest_verdicts(records: &[ReviewRecord]) -> Vec<ReviewerVerdict> {
    records
        .iter()
        .filter(|record| record.state != ReviewState::Commented)
        .fold(Vec::new(), |mut verdicts: Vec<ReviewerVerdict>, record| {
            info!(
                "found a review: {} {:?} {}",
                record.reviewer, record.submitted_at, record.state
            );

            match verdicts
                .iter_mut()
                .find(|verdict| verdict.reviewer == record.reviewer)
            {
                Some(verdict) if verdict.submitted_at < record.submitted_at => {
                    *verdict = record.into()
                }
                Some(_) => {}
                None => verdicts.push(record.into()),
            }

            verdicts
        })
}
