use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::{
    config::GateConfig,
    github::{ApiError, PullRequestApi, PullRequestRef},
    webhooks::{github::events::PullRequestEvent, GitHubEvent},
};

pub(crate) mod checks;
pub(crate) mod comment;
pub(crate) mod eligibility;
pub(crate) mod error;
pub(crate) mod policy;
pub(crate) mod reviews;

use comment::Comment;
use eligibility::{check_eligibility, Eligibility};
use error::GateError;
use policy::check_approval;
use reviews::latest_verdicts;

/// What an evaluation ended up doing to the pull request.
#[derive(Debug)]
pub enum Verdict {
    /// The event isn't relevant, nothing was touched.
    Skip,
    /// Nobody reviewed yet: the label was removed without comment.
    Unlabel,
    /// Success comment posted and label added.
    Accept,
    /// Label removed and the reason posted as a comment.
    Reject(GateError),
}

pub struct Gatekeeper<A> {
    api: A,
    config: GateConfig,
}

impl<A: PullRequestApi> Gatekeeper<A> {
    pub fn new(config: GateConfig, api: A) -> Self {
        Self { api, config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Evaluates events one after the other until every sender is dropped.
    pub async fn run(&self, mut events: UnboundedReceiver<GitHubEvent>) {
        debug!("running...");

        loop {
            let event = match events.recv().await {
                Some(event) => event,
                None => {
                    info!("all channel senders were dropped, exiting receive loop");
                    break;
                }
            };
            debug!("received event: {:?}", event);

            if let Err(e) = self.handle_event(event).await {
                warn!("encountered error while handling event: {}", e);
            }
        }
    }

    async fn handle_event(&self, event: GitHubEvent) -> anyhow::Result<()> {
        match event {
            GitHubEvent::Ping(ping) => {
                info!("pinged by GitHub (hook {:?}): {}", ping.hook_id, ping.zen);
            }
            GitHubEvent::PullRequest(event) => {
                let verdict = self.process(&event).await?;
                debug!("{} ended with {:?}", event.pull_request, verdict);
            }
        }

        Ok(())
    }

    /// Evaluates one event and applies the outcome to the pull request.
    ///
    /// Rejections and API failures are turned into a comment; an error is only returned when
    /// that comment couldn't be posted.
    pub async fn process(&self, event: &PullRequestEvent) -> Result<Verdict, ApiError> {
        info!(
            "triggered action: {} by {} on {} ({})",
            event.action, event.sender.login, event.repository.full_name, event.pull_request
        );
        if let Some(label) = &event.label {
            debug!("label concerned by the event: {}", label.name);
        }
        let pr = event.target();

        match self.evaluate(event, &pr).await {
            Ok(verdict) => Ok(verdict),
            Err(e) => {
                self.remove_label(&pr).await;
                let comment = e.comment();
                self.api
                    .create_comment(&pr, &comment.to_string())
                    .await
                    .map_err(|comment_error| {
                        error!(
                            "couldn't report `{}` on #{}: {}",
                            comment, pr.number, comment_error
                        );
                        comment_error
                    })?;
                info!("{}", comment);
                Ok(Verdict::Reject(e))
            }
        }
    }

    async fn evaluate(
        &self,
        event: &PullRequestEvent,
        pr: &PullRequestRef,
    ) -> Result<Verdict, GateError> {
        let config = &self.config;

        match check_eligibility(event, &config.label, &config.reference_pattern) {
            Eligibility::Skip => {
                info!("nothing to do");
                return Ok(Verdict::Skip);
            }
            Eligibility::Reject(rejection) => return Err(rejection.into()),
            Eligibility::Proceed => {}
        }

        let reviews = self.api.list_reviews(pr).await?;
        if reviews.is_empty() {
            self.remove_label(pr).await;
            return Ok(Verdict::Unlabel);
        }

        let verdicts = latest_verdicts(&reviews);
        check_approval(&self.api, pr, config, &verdicts).await?;

        self.api
            .create_comment(pr, &Comment::released().to_string())
            .await?;
        info!(
            "OK! adding label {} to {}",
            config.label, event.pull_request.html_url
        );
        self.api
            .add_labels(pr, std::slice::from_ref(&config.label))
            .await?;

        Ok(Verdict::Accept)
    }

    /// Best-effort: the label may already be gone.
    async fn remove_label(&self, pr: &PullRequestRef) {
        info!("removing label {} from #{}", self.config.label, pr.number);
        if let Err(e) = self.api.remove_label(pr, &self.config.label).await {
            debug!("ignoring label removal failure: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        config::tests::sample_config,
        gate::{
            error::Rejection,
            reviews::{ReviewRecord, ReviewState},
        },
        github::{
            fake::{Call, FakeApi},
            CheckRun, CheckRuns,
        },
        webhooks::github::events::{fixtures::labeled_event, GitHubUser, PullRequestAction},
    };

    const RELEASED: &str = ":heavy_check_mark: release-ready: this PR can be released.";

    fn review(reviewer: &str, hour: u32, state: ReviewState) -> ReviewRecord {
        ReviewRecord {
            reviewer: reviewer.to_string(),
            submitted_at: Some(Utc.with_ymd_and_hms(2021, 9, 1, hour, 0, 0).unwrap()),
            state,
        }
    }

    fn approved_by_lead() -> FakeApi {
        FakeApi {
            reviews: vec![review("lead1", 9, ReviewState::Approved)],
            team_members: vec!["lead1".to_string()],
            ..Default::default()
        }
    }

    fn label() -> String {
        "release-ready".to_string()
    }

    #[tokio::test]
    async fn approved_pull_request_is_released() {
        let mut event = labeled_event();
        event.pull_request.body = Some("fix RP-1".to_string());
        let gatekeeper = Gatekeeper::new(sample_config(), approved_by_lead());

        let verdict = gatekeeper.process(&event).await.unwrap();

        assert!(matches!(verdict, Verdict::Accept));
        assert_eq!(
            gatekeeper.api.calls(),
            vec![
                Call::ListReviews,
                Call::TeamMember("lead1".to_string()),
                Call::Comment(RELEASED.to_string()),
                Call::AddLabels(vec![label()]),
            ]
        );
    }

    #[tokio::test]
    async fn irrelevant_events_touch_nothing() {
        let mut event = labeled_event();
        event.action = PullRequestAction::Other("opened".to_string());
        let gatekeeper = Gatekeeper::new(sample_config(), approved_by_lead());

        let verdict = gatekeeper.process(&event).await.unwrap();

        assert!(matches!(verdict, Verdict::Skip));
        assert!(gatekeeper.api.calls().is_empty());
    }

    #[tokio::test]
    async fn eligibility_rejection_is_reported_without_api_lookups() {
        let mut event = labeled_event();
        event.pull_request.requested_reviewers = vec![GitHubUser {
            login: "alice".to_string(),
        }];
        let gatekeeper = Gatekeeper::new(sample_config(), approved_by_lead());

        let verdict = gatekeeper.process(&event).await.unwrap();

        assert!(matches!(
            verdict,
            Verdict::Reject(GateError::Rejected(Rejection::ReviewsExpected(1)))
        ));
        assert_eq!(
            gatekeeper.api.calls(),
            vec![
                Call::RemoveLabel(label()),
                Call::Comment(":bulb: release-ready: 1 review still expected.".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn draft_rejection_survives_label_removal_failure() {
        let mut event = labeled_event();
        event.pull_request.draft = true;
        let api = FakeApi {
            fail_remove_label: true,
            ..approved_by_lead()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&event).await.unwrap();

        assert!(matches!(
            verdict,
            Verdict::Reject(GateError::Rejected(Rejection::Draft))
        ));
        assert_eq!(
            gatekeeper.api.comments(),
            [":bulb: release-ready: removing label on draft PR."]
        );
    }

    #[tokio::test]
    async fn no_reviews_removes_label_silently() {
        let gatekeeper = Gatekeeper::new(sample_config(), FakeApi::default());

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        assert!(matches!(verdict, Verdict::Unlabel));
        assert_eq!(
            gatekeeper.api.calls(),
            vec![Call::ListReviews, Call::RemoveLabel(label())]
        );
    }

    #[tokio::test]
    async fn only_comments_still_go_through_the_policy() {
        let api = FakeApi {
            reviews: vec![review("lead1", 9, ReviewState::Commented)],
            team_members: vec!["lead1".to_string()],
            ..Default::default()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        // the comment-only review leaves no verdict, so no lead dev is found
        assert!(matches!(
            verdict,
            Verdict::Reject(GateError::Rejected(Rejection::NoLeadDev))
        ));
        assert_eq!(
            gatekeeper.api.comments(),
            [":bulb: release-ready: this PR must be reviewed by at least 1 lead dev."]
        );
    }

    #[tokio::test]
    async fn changes_requested_after_approval_blocks() {
        let api = FakeApi {
            reviews: vec![
                review("lead1", 9, ReviewState::Approved),
                review("dev", 10, ReviewState::Approved),
                review("dev", 11, ReviewState::ChangesRequested),
            ],
            team_members: vec!["lead1".to_string()],
            ..Default::default()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        assert!(matches!(
            verdict,
            Verdict::Reject(GateError::Rejected(Rejection::NotFullyApproved { .. }))
        ));
        assert_eq!(
            gatekeeper.api.comments(),
            [":bulb: release-ready: this PR is not fully approved yet."]
        );
    }

    #[tokio::test]
    async fn failing_required_check_blocks_release() {
        let mut api = approved_by_lead();
        api.check_runs.insert(
            "build".to_string(),
            CheckRuns {
                total_count: 1,
                check_runs: vec![CheckRun {
                    name: "build".to_string(),
                    status: "completed".to_string(),
                    conclusion: Some("failure".to_string()),
                }],
            },
        );
        let mut config = sample_config();
        config.required_checks = vec!["build".to_string()];
        let gatekeeper = Gatekeeper::new(config, api);

        gatekeeper.process(&labeled_event()).await.unwrap();

        assert_eq!(
            gatekeeper.api.calls(),
            vec![
                Call::ListReviews,
                Call::TeamMember("lead1".to_string()),
                Call::CheckRuns("build".to_string()),
                Call::RemoveLabel(label()),
                Call::Comment(
                    ":bulb: release-ready: check 'build' is required and must be successful."
                        .to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn deleted_reviewer_is_not_treated_as_no_review() {
        let api = FakeApi {
            reviews: vec![review("ghost", 9, ReviewState::Approved)],
            ..Default::default()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        assert!(matches!(
            verdict,
            Verdict::Reject(GateError::Rejected(Rejection::NoLeadDev))
        ));
        assert_eq!(
            gatekeeper.api.comments(),
            [":bulb: release-ready: this PR must be reviewed by at least 1 lead dev."]
        );
    }

    #[tokio::test]
    async fn api_failure_is_reported_as_comment() {
        let api = FakeApi {
            fail_reviews: true,
            ..Default::default()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        assert!(matches!(verdict, Verdict::Reject(GateError::Api(_))));
        let comments = gatekeeper.api.comments();
        assert_eq!(comments.len(), 1);
        assert!(comments[0].starts_with(":x: release-ready: GitHub API error"));
        assert!(comments[0].contains("reviews unavailable"));
    }

    #[tokio::test]
    async fn add_label_failure_is_reported() {
        let api = FakeApi {
            fail_add_labels: true,
            ..approved_by_lead()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        let verdict = gatekeeper.process(&labeled_event()).await.unwrap();

        assert!(matches!(verdict, Verdict::Reject(GateError::Api(_))));
        let calls = gatekeeper.api.calls();
        assert_eq!(calls[2], Call::Comment(RELEASED.to_string()));
        assert_eq!(calls[3], Call::AddLabels(vec![label()]));
        assert_eq!(calls[4], Call::RemoveLabel(label()));
        assert!(matches!(&calls[5], Call::Comment(body) if body.contains("can't add labels")));
    }

    #[tokio::test]
    async fn unreportable_failure_is_returned() {
        let mut event = labeled_event();
        event.pull_request.body = None;
        let api = FakeApi {
            fail_comment: true,
            ..Default::default()
        };
        let gatekeeper = Gatekeeper::new(sample_config(), api);

        assert!(gatekeeper.process(&event).await.is_err());
        assert_eq!(gatekeeper.api.calls(), vec![Call::RemoveLabel(label())]);
    }

    #[tokio::test]
    async fn run_drains_channel_until_closed() {
        let (sender, receiver) = tokio::sync::mpsc::unbounded_channel();
        let gatekeeper = Gatekeeper::new(sample_config(), approved_by_lead());

        sender
            .send(GitHubEvent::PullRequest(Box::new(labeled_event())))
            .unwrap();
        drop(sender);

        gatekeeper.run(receiver).await;

        assert_eq!(gatekeeper.api.comments(), [RELEASED]);
    }
}
