//! The session gate.
//!
//! Two states per request: anonymous or authenticated. Routes wrapped with
//! [`require_session`] run only when the request carries a cookie that
//! resolves to a live session; anything else is redirected to the login page
//! without reaching the handler.

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

use crate::app::App;
use crate::handler::Handler;
use crate::request::Request;
use crate::response::{IntoResponse, Response};
use crate::session::{SessionUser, COOKIE_NAME};

pub const LOGIN_PATH: &str = "/auth/login";

/// The signed-in user for this request, if any.
pub async fn current_user(app: &App, req: &Request) -> Option<SessionUser> {
    let cookie = req.cookie(COOKIE_NAME)?;
    app.sessions.resolve(cookie).await
}

/// Wraps `handler` so it only runs for authenticated requests and receives
/// the session's user.
pub fn require_session<F, Fut, R>(app: &Arc<App>, handler: F) -> impl Handler
where
    F: Fn(Arc<App>, Request, SessionUser) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    let app = Arc::clone(app);
    let handler = Arc::new(handler);
    move |req: Request| {
        let app = Arc::clone(&app);
        let handler = Arc::clone(&handler);
        async move {
            let user = current_user(&app, &req).await;
            match user {
                Some(user) => (*handler)(app, req, user).await.into_response(),
                None => {
                    debug!(method = %req.method(), path = req.path(), "no session, redirecting to login");
                    Response::redirect(LOGIN_PATH)
                }
            }
        }
    }
}
