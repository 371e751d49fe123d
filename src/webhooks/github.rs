use std::str::FromStr;

use anyhow::anyhow;
use rocket::{
    http::Status,
    request::{FromRequest, Outcome},
    Request, State,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, trace, warn};

pub mod events;
pub use events::GitHubEvent;

mod signing;
use signing::SignedGitHubPayload;

const X_GITHUB_EVENT: &str = "X-GitHub-Event";

pub struct GitHubSecret(pub String);

/// Hands verified deliveries over to the gatekeeper's receive loop.
pub struct EventSender(pub UnboundedSender<GitHubEvent>);

#[rocket::post("/api/webhooks/github", data = "<payload>")]
pub fn github_webhook(
    event_type: GitHubEventType,
    payload: SignedGitHubPayload,
    sender: &State<EventSender>,
) -> Result<&'static str, Status> {
    info!("received event {:?}", event_type);
    trace!("signed payload:\n{}", payload.0);

    let event = match parse_event(&event_type, &payload.0) {
        Ok(Some(event)) => event,
        Ok(None) => {
            debug!("ignoring {:?} event", event_type);
            return Ok("OK");
        }
        Err(e) => {
            warn!("couldn't decode {:?} payload: {}", event_type, e);
            return Err(Status::BadRequest);
        }
    };

    sender.0.send(event).map_err(|_| {
        error!("event channel was closed / dropped");
        Status::ServiceUnavailable
    })?;

    Ok("OK")
}

fn parse_event(
    event_type: &GitHubEventType,
    payload: &str,
) -> serde_json::Result<Option<GitHubEvent>> {
    let event = match event_type {
        GitHubEventType::Ping => GitHubEvent::Ping(serde_json::from_str(payload)?),
        GitHubEventType::PullRequest => {
            GitHubEvent::PullRequest(Box::new(serde_json::from_str(payload)?))
        }
        GitHubEventType::Other(_) => return Ok(None),
    };

    Ok(Some(event))
}

#[derive(Debug, PartialEq, Eq)]
pub enum GitHubEventType {
    Ping,
    PullRequest,
    Other(String),
}

impl FromStr for GitHubEventType {
    type Err = std::convert::Infallible;

    fn from_str(event_type: &str) -> Result<Self, Self::Err> {
        Ok(match event_type {
            "ping" => Self::Ping,
            "pull_request" => Self::PullRequest,
            other => Self::Other(other.to_owned()),
        })
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for GitHubEventType {
    type Error = anyhow::Error;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let event_types = request.headers().get(X_GITHUB_EVENT).collect::<Vec<_>>();
        if event_types.len() != 1 {
            return Outcome::Error((
                Status::BadRequest,
                anyhow!("request header needs exactly one event type"),
            ));
        }

        match event_types[0].parse::<GitHubEventType>() {
            Ok(ev_type) => Outcome::Success(ev_type),
            Err(e) => match e {},
        }
    }
}
