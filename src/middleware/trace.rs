//! Per-request tracing.

use std::time::Instant;

use tracing::{info, info_span, warn, Instrument};

use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// Routes `req` inside a span and logs the outcome once the response exists.
pub async fn traced(router: &Router, req: Request) -> Response {
    let span = info_span!("request", method = %req.method(), path = %req.path());
    async move {
        let started = Instant::now();
        let response = router.respond(req).await;
        let status = response.status_code();
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        if status >= 500 {
            warn!(status, elapsed_ms, "request failed");
        } else {
            info!(status, elapsed_ms, "request handled");
        }
        response
    }
    .instrument(span)
    .await
}
