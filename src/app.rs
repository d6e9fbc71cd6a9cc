//! Shared application state.

use std::sync::Arc;

use tracing::warn;

use crate::config::AppConfig;
use crate::error::Error;
use crate::session::SessionStore;
use crate::store::{self, DocumentStore, PostStore, UserStore};
use crate::view::Views;

/// Everything a handler can reach. Built once, shared behind an `Arc`.
pub struct App {
    pub posts: Arc<dyn PostStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: SessionStore,
    pub views: Views,
}

impl App {
    /// Opens the configured store and compiles the views.
    pub async fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let store = Arc::new(store::open(&config.store.url).await?);
        let secret = match &config.session.secret {
            Some(secret) => secret.clone(),
            None => {
                warn!("session.secret is not set; using a random secret, sessions will not survive a restart");
                SessionStore::random_secret()
            }
        };
        Self::new(store, &secret)
    }

    /// Posts and users both live in `store`.
    pub fn new(store: Arc<DocumentStore>, session_secret: &str) -> Result<Self, Error> {
        Ok(Self {
            posts: Arc::clone(&store) as Arc<dyn PostStore>,
            users: store,
            sessions: SessionStore::new(session_secret)?,
            views: Views::new()?,
        })
    }
}
