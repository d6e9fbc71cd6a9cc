//! Route handlers.
//!
//! Handlers work with typed results internally. At the edge a failed form
//! submission becomes a redirect back to the form with `?error=<code>`, and
//! the form page turns that code into a message.

pub mod auth;
pub mod posts;

use serde::Serialize;
use tracing::{error, warn};

use crate::app::App;
use crate::error::AppError;
use crate::model::PostId;
use crate::request::Request;
use crate::response::Response;
use crate::session::SessionUser;
use crate::status::Status;
use crate::view::{Empty, Page, UserView};

/// Redirects to `path` carrying the error's code, logging the cause.
fn back_to(path: &str, err: &AppError) -> Response {
    match err {
        AppError::Validation(_) | AppError::Taken(_) | AppError::Auth | AppError::NotFound => {
            warn!(error = %err, "form rejected");
        }
        _ => error!(error = %err, "form submission failed"),
    }
    Response::redirect(&format!("{path}?error={}", err.code()))
}

/// The message for an `?error=` code in the request's query string.
fn flash(req: &Request) -> Option<&'static str> {
    req.query_value("error").and_then(|code| AppError::message_for(&code))
}

fn render<T: Serialize>(
    app: &App,
    name: &str,
    req: &Request,
    user: Option<&SessionUser>,
    data: T,
) -> Result<Response, AppError> {
    let page = Page { user: user.map(UserView::from), error: flash(req), data };
    Ok(Response::html(app.views.render(name, &page)?))
}

fn not_found(app: &App, user: Option<&SessionUser>) -> Result<Response, AppError> {
    let page = Page { user: user.map(UserView::from), error: None, data: Empty {} };
    let html = app.views.render("not_found", &page)?;
    Ok(Response::builder().status(Status::NotFound).html(html))
}

/// The `{id}` path parameter. Malformed ids are indistinguishable from unknown ones.
fn post_id(req: &Request) -> Result<PostId, AppError> {
    req.param("id").and_then(|id| id.parse().ok()).ok_or(AppError::NotFound)
}
