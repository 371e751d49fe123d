use std::fmt::Display;

use serde::Deserialize;

use crate::{
    github::PullRequestRef,
    webhooks::github::events::{GitHubUser, Label, Organization, PullRequest, Repository},
};

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: PullRequestAction,
    pub repository: Repository,
    pub organization: Option<Organization>,
    pub sender: GitHubUser,
    pub pull_request: PullRequest,
    /// Label that was added or removed, for `labeled` / `unlabeled` actions.
    pub label: Option<Label>,
}

impl PullRequestEvent {
    pub fn target(&self) -> PullRequestRef {
        PullRequestRef {
            owner: self.repository.owner.login.clone(),
            repo: self.repository.name.clone(),
            number: self.pull_request.number,
            head_sha: self.pull_request.head.sha.clone(),
            organization_url: self.organization.as_ref().map(|org| org.url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PullRequestAction {
    Labeled,
    Unlabeled,
    Other(String),
}

impl From<String> for PullRequestAction {
    fn from(action: String) -> Self {
        match action.as_str() {
            "labeled" => Self::Labeled,
            "unlabeled" => Self::Unlabeled,
            _ => Self::Other(action),
        }
    }
}

impl Display for PullRequestAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Labeled => write!(f, "labeled"),
            Self::Unlabeled => write!(f, "unlabeled"),
            Self::Other(action) => write!(f, "{}", action),
        }
    }
}
