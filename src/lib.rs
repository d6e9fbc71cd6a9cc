//! # quill
//!
//! A small blog served as HTML forms: list, write, edit and delete posts,
//! with accounts and sessions guarding every write.
//!
//! ## Shape
//!
//! - Radix-tree routing via [`matchit`], one tree per method
//! - hyper server with graceful shutdown on SIGTERM / Ctrl-C
//! - A document store seam ([`store::PostStore`], [`store::UserStore`]) with
//!   id-keyed records, in memory or in a JSON file
//! - Signed-cookie sessions and an auth gate in front of write routes
//! - Handlebars views compiled into the binary
//!
//! ## Running
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use quill::{routes, App, AppConfig, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), quill::Error> {
//!     let config = AppConfig::load()?;
//!     let app = Arc::new(App::from_config(&config).await?);
//!     Server::bind(config.socket_addr()?).serve(routes(app)).await
//! }
//! ```

mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;
mod status;

pub mod app;
pub mod config;
pub mod handlers;
pub mod health;
pub mod middleware;
pub mod model;
pub mod password;
pub mod routes;
pub mod session;
pub mod store;
pub mod telemetry;
pub mod view;

pub use app::App;
pub use config::AppConfig;
pub use error::{AppError, Error};
pub use handler::Handler;
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use routes::routes;
pub use server::Server;
pub use status::Status;
