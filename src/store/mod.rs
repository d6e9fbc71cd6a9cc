//! The document store seam.
//!
//! Handlers only see [`PostStore`] and [`UserStore`]: id-keyed find, create,
//! update and delete. [`DocumentStore`] implements both, in process or backed
//! by a JSON file, chosen by the connection string passed to [`open`].

mod document;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{NewPost, Post, PostId, PostListing, PostUpdate, User, UserId};

pub use document::DocumentStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found")]
    NotFound,

    #[error("{0} already exists")]
    Duplicate(String),

    #[error("unsupported store url `{0}` (expected memory:// or file://PATH)")]
    UnsupportedUrl(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store file: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait PostStore: Send + Sync {
    /// All posts in id order, authors resolved.
    async fn list(&self) -> Result<Vec<PostListing>, StoreError>;

    /// Posts written by `author`, in id order.
    async fn list_by_author(&self, author: UserId) -> Result<Vec<PostListing>, StoreError>;

    async fn create(&self, post: NewPost, author: Option<UserId>) -> Result<PostId, StoreError>;

    async fn get(&self, id: PostId) -> Result<Post, StoreError>;

    /// Overwrites the fields present in `update`. Last writer wins.
    async fn update(&self, id: PostId, update: PostUpdate) -> Result<Post, StoreError>;

    /// Removes the post. Deleting an absent id is a no-op.
    async fn delete(&self, id: PostId) -> Result<(), StoreError>;

    /// Succeeds when the store can currently serve requests.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    /// Inserts a user. Fails with [`StoreError::Duplicate`] if the username is taken.
    async fn insert(&self, username: &str, password_hash: &str) -> Result<User, StoreError>;
}

/// Opens the store named by a connection string.
///
/// - `memory://` keeps everything in process; it is gone on restart.
/// - `file:///var/lib/quill/blog.json` keeps the same tables and rewrites the
///   file after every mutation.
pub async fn open(url: &str) -> Result<DocumentStore, StoreError> {
    if url.starts_with("memory:") {
        return Ok(DocumentStore::in_memory());
    }
    match url.strip_prefix("file://") {
        Some(path) if !path.is_empty() => DocumentStore::open_file(path).await,
        _ => Err(StoreError::UnsupportedUrl(url.to_owned())),
    }
}
