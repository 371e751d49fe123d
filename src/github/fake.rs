use std::{collections::HashMap, sync::Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use url::Url;

use crate::{
    gate::reviews::ReviewRecord,
    github::{ApiError, CheckRuns, PullRequestApi, PullRequestRef},
};

/// Side effect or lookup performed against a [`FakeApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RemoveLabel(String),
    AddLabels(Vec<String>),
    Comment(String),
    ListReviews,
    TeamMember(String),
    CheckRuns(String),
}

/// In-memory [`PullRequestApi`] recording every call it receives.
#[derive(Default)]
pub struct FakeApi {
    pub reviews: Vec<ReviewRecord>,
    pub team_members: Vec<String>,
    /// Logins for which the membership lookup itself fails.
    pub broken_members: Vec<String>,
    pub check_runs: HashMap<String, CheckRuns>,
    pub fail_reviews: bool,
    pub fail_remove_label: bool,
    pub fail_comment: bool,
    pub fail_add_labels: bool,
    pub log: Mutex<Vec<Call>>,
}

pub fn server_error(body: &str) -> ApiError {
    ApiError::Status {
        url: Url::parse("https://api.github.com/fake").unwrap(),
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: body.to_string(),
    }
}

impl FakeApi {
    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Comment(body) => Some(body),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PullRequestApi for FakeApi {
    async fn remove_label(&self, _pr: &PullRequestRef, label: &str) -> Result<(), ApiError> {
        self.record(Call::RemoveLabel(label.to_string()));
        if self.fail_remove_label {
            return Err(server_error("label not found"));
        }
        Ok(())
    }

    async fn add_labels(&self, _pr: &PullRequestRef, labels: &[String]) -> Result<(), ApiError> {
        self.record(Call::AddLabels(labels.to_vec()));
        if self.fail_add_labels {
            return Err(server_error("can't add labels"));
        }
        Ok(())
    }

    async fn create_comment(&self, _pr: &PullRequestRef, body: &str) -> Result<(), ApiError> {
        if self.fail_comment {
            return Err(server_error("can't comment"));
        }
        self.record(Call::Comment(body.to_string()));
        Ok(())
    }

    async fn list_reviews(&self, _pr: &PullRequestRef) -> Result<Vec<ReviewRecord>, ApiError> {
        self.record(Call::ListReviews);
        if self.fail_reviews {
            return Err(server_error("reviews unavailable"));
        }
        Ok(self.reviews.clone())
    }

    async fn is_team_member(
        &self,
        _pr: &PullRequestRef,
        _team_id: &str,
        login: &str,
    ) -> Result<bool, ApiError> {
        self.record(Call::TeamMember(login.to_string()));
        if self.broken_members.iter().any(|member| member == login) {
            return Err(server_error("membership lookup failed"));
        }
        Ok(self.team_members.iter().any(|member| member == login))
    }

    async fn list_check_runs(
        &self,
        _pr: &PullRequestRef,
        check_name: &str,
    ) -> Result<CheckRuns, ApiError> {
        self.record(Call::CheckRuns(check_name.to_string()));
        Ok(self.check_runs.get(check_name).cloned().unwrap_or_default())
    }
}
