use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    gate::reviews::{ReviewRecord, ReviewState},
    webhooks::github::events::GitHubUser,
};

#[derive(Debug, Serialize)]
pub(crate) struct CommentRequest<'a> {
    pub body: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct LabelsRequest<'a> {
    pub labels: &'a [String],
}

/// Login GitHub shows in place of deleted accounts.
const GHOST_LOGIN: &str = "ghost";

#[derive(Debug, Deserialize)]
pub struct Review {
    // null when the author's account was deleted
    pub user: Option<GitHubUser>,
    pub state: ReviewState,
    // pending reviews haven't been submitted yet
    pub submitted_at: Option<DateTime<Utc>>,
}

impl Review {
    pub fn into_record(self) -> ReviewRecord {
        let reviewer = match self.user {
            Some(user) => user.login,
            None => GHOST_LOGIN.to_owned(),
        };
        ReviewRecord {
            reviewer,
            submitted_at: self.submitted_at,
            state: self.state,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckRuns {
    pub total_count: u64,
    pub check_runs: Vec<CheckRun>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckRun {
    pub name: String,
    pub status: String,
    pub conclusion: Option<String>,
}

impl CheckRun {
    pub fn is_successful(&self) -> bool {
        self.status == "completed" && self.conclusion.as_deref() == Some("success")
    }
}

impl Display for CheckRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.name,
            self.status,
            self.conclusion.as_deref().unwrap_or("no conclusion")
        )
    }
}
