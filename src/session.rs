//! Server-side sessions.
//!
//! A session is a random token mapped to a snapshot of the signed-in user.
//! The browser holds `token.signature` in the [`COOKIE_NAME`] cookie, where
//! the signature is HMAC-SHA256 of the token under the configured secret.
//! Sessions live until logout or process exit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Error;
use crate::model::{User, UserId};

type HmacSha256 = Hmac<Sha256>;

pub const COOKIE_NAME: &str = "quill.sid";

/// The part of a [`User`] a session carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self { id: user.id, username: user.username.clone() }
    }
}

#[derive(Debug)]
struct Session {
    user: SessionUser,
    created_at: DateTime<Utc>,
}

pub struct SessionStore {
    mac: HmacSha256,
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(secret: &str) -> Result<Self, Error> {
        if secret.is_empty() {
            return Err(Error::Setting { key: "session.secret", reason: "must not be empty".into() });
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| Error::Setting { key: "session.secret", reason: e.to_string() })?;
        Ok(Self { mac, sessions: RwLock::new(HashMap::new()) })
    }

    /// A fresh 256-bit secret, hex encoded.
    pub fn random_secret() -> String {
        hex::encode(random_bytes())
    }

    /// Starts a session for `user` and returns the signed cookie value.
    pub async fn create(&self, user: &User) -> String {
        let token = hex::encode(random_bytes());
        let cookie = format!("{token}.{}", self.sign(&token));
        self.sessions.write().await.insert(token, Session {
            user: SessionUser::from(user),
            created_at: Utc::now(),
        });
        debug!(user = %user.username, "session created");
        cookie
    }

    /// The user behind a cookie value, if the signature holds and the session exists.
    pub async fn resolve(&self, cookie: &str) -> Option<SessionUser> {
        let token = self.verify(cookie)?;
        self.sessions.read().await.get(token).map(|s| s.user.clone())
    }

    /// Ends the session behind `cookie`. Returns whether one existed.
    pub async fn destroy(&self, cookie: &str) -> bool {
        let Some(token) = self.verify(cookie) else { return false };
        let removed = self.sessions.write().await.remove(token);
        if let Some(session) = &removed {
            debug!(user = %session.user.username, since = %session.created_at, "session destroyed");
        }
        removed.is_some()
    }

    /// Number of live sessions.
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn sign(&self, token: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn verify<'a>(&self, cookie: &'a str) -> Option<&'a str> {
        let (token, signature) = cookie.split_once('.')?;
        let signature = hex::decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(token.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(token)
    }
}

/// `Set-Cookie` value that installs a session cookie.
pub fn set_cookie(value: &str) -> String {
    format!("{COOKIE_NAME}={value}; Path=/; HttpOnly; SameSite=Lax")
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_cookie() -> String {
    format!("{COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

fn random_bytes() -> [u8; 32] {
    let mut buf = [0u8; 32];
    rand::rng().fill_bytes(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User {
            id: UserId(1),
            username: name.to_owned(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_resolve_destroy() {
        let store = SessionStore::new("secret").unwrap();
        let cookie = store.create(&user("alice")).await;

        let resolved = store.resolve(&cookie).await.unwrap();
        assert_eq!(resolved.username, "alice");

        assert!(store.destroy(&cookie).await);
        assert_eq!(store.resolve(&cookie).await, None);
        assert!(!store.destroy(&cookie).await);
    }

    #[tokio::test]
    async fn tampered_cookie_does_not_resolve() {
        let store = SessionStore::new("secret").unwrap();
        let cookie = store.create(&user("alice")).await;
        let (token, _) = cookie.split_once('.').unwrap();

        assert_eq!(store.resolve(token).await, None);
        assert_eq!(store.resolve(&format!("{token}.00")).await, None);
        assert_eq!(store.resolve(&format!("{token}.not-hex")).await, None);
    }

    #[tokio::test]
    async fn cookie_from_another_secret_is_rejected() {
        let ours = SessionStore::new("ours").unwrap();
        let theirs = SessionStore::new("theirs").unwrap();
        let cookie = theirs.create(&user("mallory")).await;
        assert_eq!(ours.resolve(&cookie).await, None);
        assert!(!ours.destroy(&cookie).await);
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SessionStore::new("").is_err());
    }

    #[test]
    fn random_secrets_differ() {
        assert_ne!(SessionStore::random_secret(), SessionStore::random_secret());
    }
}
