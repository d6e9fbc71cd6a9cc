//! Health-check handlers.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? |
//! | **Readiness** | `/readyz` | Can the document store serve requests? |

use std::sync::Arc;

use tracing::warn;

use crate::app::App;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Always `200 OK` with body `"ok"`. If the process can answer HTTP at all,
/// it is alive.
pub async fn liveness(_req: Request) -> Response {
    Response::text("ok")
}

/// `200 OK` with body `"ready"` while the store answers its ping, `503`
/// otherwise.
pub async fn readiness(app: Arc<App>, _req: Request) -> Response {
    match app.posts.ping().await {
        Ok(()) => Response::text("ready"),
        Err(e) => {
            warn!(error = %e, "store not ready");
            Response::builder().status(Status::ServiceUnavailable).text("store unavailable")
        }
    }
}
