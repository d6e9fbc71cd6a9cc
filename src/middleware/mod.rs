//! Middleware layer.
//!
//! Cross-cutting request concerns that wrap handlers or the dispatch path:
//!
//! - [`auth`] — the session gate in front of every write route
//! - [`trace`] — per-request span with method, path, status, and latency

pub mod auth;
pub mod trace;
