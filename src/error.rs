//! Error types.
//!
//! [`Error`] covers infrastructure failures at startup and while serving:
//! configuration, binding, template compilation. [`AppError`] is what request
//! handling produces; handlers decide how each kind is shown to the user.

use thiserror::Error;

use crate::response::{IntoResponse, Response};
use crate::status::Status;
use crate::store::StoreError;

/// Infrastructure error returned by startup and [`Server::serve`](crate::Server::serve).
#[derive(Error, Debug)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Setting { key: &'static str, reason: String },

    #[error("template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}

/// Failure while handling a request.
#[derive(Error, Debug)]
pub enum AppError {
    /// A required field is missing or blank.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A value that must be unique is already in use.
    #[error("{0} is already taken")]
    Taken(String),

    /// Unknown or malformed identifier.
    #[error("not found")]
    NotFound,

    /// Wrong username or password.
    #[error("invalid credentials")]
    Auth,

    /// The document store failed.
    #[error("store: {0}")]
    Store(String),

    #[error("render: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("internal: {0}")]
    Internal(String),
}

impl AppError {
    /// Short, stable code carried in `?error=` when redirecting back to a form.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Taken(_) => "taken",
            Self::NotFound => "not_found",
            Self::Auth => "auth",
            Self::Store(_) | Self::Render(_) | Self::Internal(_) => "store",
        }
    }

    /// The message a form shows for an `?error=` code.
    pub fn message_for(code: &str) -> Option<&'static str> {
        match code {
            "validation" => Some("Please fill in every field."),
            "taken" => Some("That username is already taken."),
            "not_found" => Some("That post no longer exists."),
            "auth" => Some("Invalid username or password."),
            "store" => Some("Something went wrong while saving. Please try again."),
            _ => None,
        }
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) | Self::Taken(_) => Status::UnprocessableContent,
            Self::NotFound => Status::NotFound,
            Self::Auth => Status::Unauthorized,
            Self::Store(_) | Self::Render(_) | Self::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::Duplicate(what) => Self::Taken(what),
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Internal(e.to_string())
    }
}

/// Fallback rendering for errors a handler does not map itself.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == Status::InternalServerError {
            tracing::error!(error = %self, "request failed");
        }
        Response::builder().status(status).text(status_text(status))
    }
}

fn status_text(status: Status) -> &'static str {
    match status {
        Status::UnprocessableContent => "Unprocessable Content",
        Status::NotFound => "Not Found",
        Status::Unauthorized => "Unauthorized",
        _ => "Internal Server Error",
    }
}
