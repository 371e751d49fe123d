//! Thin client for the parts of the GitHub REST API the gate talks to.

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use crate::gate::reviews::ReviewRecord;

mod types;
pub use types::*;

#[cfg(test)]
pub(crate) mod fake;

const USER_AGENT: &str = concat!("release-ready/", env!("CARGO_PKG_VERSION"));
const GITHUB_JSON: &str = "application/vnd.github+json";
const PER_PAGE: usize = 100;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("couldn't build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed: {source}")]
    Request {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("GitHub API error on {url}: {status} - {body}")]
    Status {
        url: Url,
        status: StatusCode,
        body: String,
    },
    #[error("couldn't decode response from {url}: {source}")]
    Decode {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0} can't be used as a base for API URLs")]
    BaseUrl(Url),
}

/// Everything needed to address one pull request through the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub head_sha: String,
    /// API URL of the owning organization, when the repository belongs to one.
    pub organization_url: Option<Url>,
}

/// Operations the gate performs against the hosting service.
///
/// Which failures matter is decided by the caller: label removal and membership lookups are
/// best-effort, everything else aborts the evaluation.
#[async_trait]
pub trait PullRequestApi: Send + Sync {
    async fn remove_label(&self, pr: &PullRequestRef, label: &str) -> Result<(), ApiError>;

    async fn add_labels(&self, pr: &PullRequestRef, labels: &[String]) -> Result<(), ApiError>;

    async fn create_comment(&self, pr: &PullRequestRef, body: &str) -> Result<(), ApiError>;

    /// Every review submitted on the pull request, in the order GitHub returns them.
    async fn list_reviews(&self, pr: &PullRequestRef) -> Result<Vec<ReviewRecord>, ApiError>;

    /// `Ok(false)` when GitHub answers that `login` isn't part of the team.
    async fn is_team_member(
        &self,
        pr: &PullRequestRef,
        team_id: &str,
        login: &str,
    ) -> Result<bool, ApiError>;

    async fn list_check_runs(
        &self,
        pr: &PullRequestRef,
        check_name: &str,
    ) -> Result<CheckRuns, ApiError>;
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    api_url: Url,
}

/// Appends `segments` to the path of `base`, percent-encoding each of them.
pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::BaseUrl(base.clone()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl GitHubClient {
    pub fn new(token: &str, api_url: Url) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            client,
            token: token.to_owned(),
            api_url,
        })
    }

    fn issue_endpoint(&self, pr: &PullRequestRef, rest: &[&str]) -> Result<Url, ApiError> {
        let number = pr.number.to_string();
        let mut segments = vec![
            "repos",
            pr.owner.as_str(),
            pr.repo.as_str(),
            "issues",
            number.as_str(),
        ];
        segments.extend_from_slice(rest);
        endpoint(&self.api_url, &segments)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        trace!("{} {}", method, url);
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(ACCEPT, GITHUB_JSON)
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| ApiError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                url: url.clone(),
                status,
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self
            .send(self.request(Method::GET, url.clone()), &url)
            .await?;
        response
            .json()
            .await
            .map_err(|source| ApiError::Decode { url, source })
    }

    async fn post_json<B: Serialize + ?Sized>(&self, url: Url, body: &B) -> Result<(), ApiError> {
        self.send(self.request(Method::POST, url.clone()).json(body), &url)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PullRequestApi for GitHubClient {
    async fn remove_label(&self, pr: &PullRequestRef, label: &str) -> Result<(), ApiError> {
        let url = self.issue_endpoint(pr, &["labels", label])?;
        self.send(self.request(Method::DELETE, url.clone()), &url)
            .await?;
        Ok(())
    }

    async fn add_labels(&self, pr: &PullRequestRef, labels: &[String]) -> Result<(), ApiError> {
        let url = self.issue_endpoint(pr, &["labels"])?;
        self.post_json(url, &LabelsRequest { labels }).await
    }

    async fn create_comment(&self, pr: &PullRequestRef, body: &str) -> Result<(), ApiError> {
        let url = self.issue_endpoint(pr, &["comments"])?;
        self.post_json(url, &CommentRequest { body }).await
    }

    async fn list_reviews(&self, pr: &PullRequestRef) -> Result<Vec<ReviewRecord>, ApiError> {
        let number = pr.number.to_string();
        let base = endpoint(
            &self.api_url,
            &[
                "repos",
                pr.owner.as_str(),
                pr.repo.as_str(),
                "pulls",
                number.as_str(),
                "reviews",
            ],
        )?;

        let mut records = Vec::new();
        for page in 1.. {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let reviews: Vec<Review> = self.get_json(url).await?;
            let last_page = reviews.len() < PER_PAGE;
            records.extend(reviews.into_iter().map(Review::into_record));

            if last_page {
                break;
            }
        }

        debug!("fetched {} reviews for #{}", records.len(), pr.number);
        Ok(records)
    }

    async fn is_team_member(
        &self,
        pr: &PullRequestRef,
        team_id: &str,
        login: &str,
    ) -> Result<bool, ApiError> {
        let organization = match &pr.organization_url {
            Some(url) => url.clone(),
            None => endpoint(&self.api_url, &["orgs", pr.owner.as_str()])?,
        };
        let url = endpoint(&organization, &["teams", team_id, "members", login])?;

        match self.send(self.request(Method::GET, url.clone()), &url).await {
            Ok(_) => Ok(true),
            Err(ApiError::Status { status, .. }) if status == StatusCode::NOT_FOUND => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list_check_runs(
        &self,
        pr: &PullRequestRef,
        check_name: &str,
    ) -> Result<CheckRuns, ApiError> {
        let mut url = endpoint(
            &self.api_url,
            &[
                "repos",
                pr.owner.as_str(),
                pr.repo.as_str(),
                "commits",
                pr.head_sha.as_str(),
                "check-runs",
            ],
        )?;
        url.query_pairs_mut()
            .append_pair("check_name", check_name)
            .append_pair("per_page", &PER_PAGE.to_string());

        self.get_json(url).await
    }
}
