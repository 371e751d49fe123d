use thiserror::Error;

use crate::{
    gate::comment::{Comment, Emoji},
    github::ApiError,
};

/// Business rule the pull request doesn't satisfy yet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("removing label on draft PR")]
    Draft,
    #[error("body must contain at least one reference")]
    MissingReference,
    #[error("{}", reviews_expected(.0))]
    ReviewsExpected(usize),
    #[error("this PR must be reviewed by at least 1 lead dev")]
    NoLeadDev,
    #[error("this PR is not fully approved yet")]
    NotFullyApproved { waiting: Vec<String> },
    #[error("check '{0}' is required and must be run")]
    CheckNotRun(String),
    #[error("check '{0}' is required and must be successful")]
    CheckNotSuccessful(String),
}

fn reviews_expected(count: &usize) -> String {
    if *count == 1 {
        "1 review still expected".to_string()
    } else {
        format!("{} reviews still expected", count)
    }
}

impl Rejection {
    pub fn comment(&self) -> Comment {
        let emoji = match self {
            Self::MissingReference | Self::CheckNotRun(_) => Emoji::Cross,
            _ => Emoji::Bulb,
        };
        Comment::new(emoji, self.to_string())
    }
}

/// Why an evaluation ended without releasing the pull request.
#[derive(Debug, Error)]
pub enum GateError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl GateError {
    pub fn comment(&self) -> Comment {
        match self {
            Self::Rejected(rejection) => rejection.comment(),
            Self::Api(e) => Comment::new(Emoji::Cross, e.to_string()),
        }
    }
}
