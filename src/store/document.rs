use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{PostStore, StoreError, UserStore};
use crate::model::{NewPost, Post, PostId, PostListing, PostUpdate, User, UserId};

/// Id-keyed posts and users behind one lock.
///
/// Every operation takes the lock exactly once, so single-document writes
/// are atomic and concurrent deletes can never hit the wrong post. When a
/// file path is set the whole table set is rewritten after each mutation.
/// A mutation whose write fails is undone before the lock is released, so
/// memory never holds a change the caller was told did not happen.
pub struct DocumentStore {
    path: Option<PathBuf>,
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    next_post_id: u64,
    next_user_id: u64,
    posts: BTreeMap<PostId, Post>,
    users: BTreeMap<UserId, User>,
}

/// On-disk shape of [`Tables`].
#[derive(Serialize, Deserialize)]
struct Snapshot {
    next_post_id: u64,
    next_user_id: u64,
    posts: Vec<Post>,
    users: Vec<User>,
}

impl Tables {
    fn from_snapshot(s: Snapshot) -> Self {
        let posts: BTreeMap<_, _> = s.posts.into_iter().map(|p| (p.id, p)).collect();
        let users: BTreeMap<_, _> = s.users.into_iter().map(|u| (u.id, u)).collect();
        // Never hand out an id that is already on disk, even if the counters were edited.
        let next_post_id = s.next_post_id.max(posts.keys().last().map_or(1, |id| id.0 + 1));
        let next_user_id = s.next_user_id.max(users.keys().last().map_or(1, |id| id.0 + 1));
        Self { next_post_id, next_user_id, posts, users }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            next_post_id: self.next_post_id,
            next_user_id: self.next_user_id,
            posts: self.posts.values().cloned().collect(),
            users: self.users.values().cloned().collect(),
        }
    }

    fn listing(&self, post: &Post) -> PostListing {
        PostListing {
            post: post.clone(),
            author: post.author.and_then(|id| self.users.get(&id).cloned()),
        }
    }
}

impl DocumentStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            tables: RwLock::new(Tables { next_post_id: 1, next_user_id: 1, ..Tables::default() }),
        }
    }

    /// Loads `path` if it exists, otherwise starts empty and creates it on
    /// the first write.
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let tables = match tokio::fs::read(&path).await {
            Ok(bytes) => Tables::from_snapshot(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Tables { next_post_id: 1, next_user_id: 1, ..Tables::default() }
            }
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            posts = tables.posts.len(),
            users = tables.users.len(),
            "document store opened"
        );
        Ok(Self { path: Some(path), tables: RwLock::new(tables) })
    }

    async fn flush(&self, tables: &Tables) -> Result<(), StoreError> {
        let Some(path) = &self.path else { return Ok(()) };
        let bytes = serde_json::to_vec_pretty(&tables.snapshot())?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "document store flushed");
        Ok(())
    }
}

#[async_trait]
impl PostStore for DocumentStore {
    async fn list(&self) -> Result<Vec<PostListing>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values().map(|p| tables.listing(p)).collect())
    }

    async fn list_by_author(&self, author: UserId) -> Result<Vec<PostListing>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.values()
            .filter(|p| p.author == Some(author))
            .map(|p| tables.listing(p))
            .collect())
    }

    async fn create(&self, post: NewPost, author: Option<UserId>) -> Result<PostId, StoreError> {
        let mut tables = self.tables.write().await;
        let id = PostId(tables.next_post_id);
        let now = Utc::now();
        tables.next_post_id += 1;
        tables.posts.insert(id, Post {
            id,
            title: post.title,
            content: post.content,
            author,
            created_at: now,
            updated_at: now,
        });
        if let Err(e) = self.flush(&tables).await {
            tables.posts.remove(&id);
            tables.next_post_id = id.0;
            return Err(e);
        }
        Ok(id)
    }

    async fn get(&self, id: PostId) -> Result<Post, StoreError> {
        self.tables.read().await.posts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: PostId, update: PostUpdate) -> Result<Post, StoreError> {
        let mut tables = self.tables.write().await;
        let previous = tables.posts.get(&id).cloned().ok_or(StoreError::NotFound)?;
        let mut updated = previous.clone();
        if let Some(title) = update.title {
            updated.title = title;
        }
        if let Some(content) = update.content {
            updated.content = content;
        }
        updated.updated_at = Utc::now();
        tables.posts.insert(id, updated.clone());
        if let Err(e) = self.flush(&tables).await {
            tables.posts.insert(id, previous);
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete(&self, id: PostId) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let Some(removed) = tables.posts.remove(&id) else { return Ok(()) };
        if let Err(e) = self.flush(&tables).await {
            tables.posts.insert(id, removed);
            return Err(e);
        }
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let Some(path) = &self.path else { return Ok(()) };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        tokio::fs::metadata(dir).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for DocumentStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::Duplicate(format!("username `{username}`")));
        }
        let user = User {
            id: UserId(tables.next_user_id),
            username: username.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: Utc::now(),
        };
        tables.next_user_id += 1;
        tables.users.insert(user.id, user.clone());
        if let Err(e) = self.flush(&tables).await {
            tables.users.remove(&user.id);
            tables.next_user_id = user.id.0;
            return Err(e);
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_post(title: &str, content: &str) -> NewPost {
        NewPost { title: title.to_owned(), content: content.to_owned() }
    }

    #[tokio::test]
    async fn create_then_list_keeps_insertion_order() {
        let store = DocumentStore::in_memory();
        let a = store.create(new_post("first", "1"), None).await.unwrap();
        let b = store.create(new_post("second", "2"), None).await.unwrap();
        assert!(a < b);

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|l| l.post.title).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[tokio::test]
    async fn delete_does_not_renumber_survivors() {
        let store = DocumentStore::in_memory();
        let ids: Vec<_> = [
            store.create(new_post("a", ""), None).await.unwrap(),
            store.create(new_post("b", ""), None).await.unwrap(),
            store.create(new_post("c", ""), None).await.unwrap(),
        ].into();

        store.delete(ids[0]).await.unwrap();

        assert!(matches!(store.get(ids[0]).await, Err(StoreError::NotFound)));
        assert_eq!(store.get(ids[1]).await.unwrap().title, "b");
        assert_eq!(store.get(ids[2]).await.unwrap().title, "c");
        // Ids are not reused either.
        let d = store.create(new_post("d", ""), None).await.unwrap();
        assert!(d > ids[2]);
    }

    #[tokio::test]
    async fn delete_of_absent_id_is_a_no_op() {
        let store = DocumentStore::in_memory();
        store.create(new_post("keep", ""), None).await.unwrap();
        store.delete(PostId(99)).await.unwrap();
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_is_partial_and_targets_one_post() {
        let store = DocumentStore::in_memory();
        let a = store.create(new_post("a", "alpha"), None).await.unwrap();
        let b = store.create(new_post("b", "beta"), None).await.unwrap();

        let update = PostUpdate { title: Some("A".into()), content: None };
        let updated = store.update(a, update).await.unwrap();

        assert_eq!(updated.title, "A");
        assert_eq!(updated.content, "alpha");
        assert_eq!(store.get(b).await.unwrap().title, "b");
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_not_found() {
        let store = DocumentStore::in_memory();
        let res = store.update(PostId(3), PostUpdate::default()).await;
        assert!(matches!(res, Err(StoreError::NotFound)));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_resolves_authors() {
        let store = DocumentStore::in_memory();
        let alice = store.insert("alice", "hash").await.unwrap();
        store.create(new_post("by alice", ""), Some(alice.id)).await.unwrap();
        store.create(new_post("anonymous", ""), None).await.unwrap();

        let listings = store.list().await.unwrap();
        assert_eq!(listings[0].author.as_ref().map(|u| u.username.as_str()), Some("alice"));
        assert!(listings[1].author.is_none());

        let mine = store.list_by_author(alice.id).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].post.title, "by alice");
    }

    #[tokio::test]
    async fn usernames_are_unique() {
        let store = DocumentStore::in_memory();
        store.insert("alice", "h1").await.unwrap();
        let again = store.insert("alice", "h2").await;
        assert!(matches!(again, Err(StoreError::Duplicate(_))));
        assert_eq!(store.find_by_username("alice").await.unwrap().unwrap().password_hash, "h1");
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.json");

        let store = DocumentStore::open_file(&path).await.unwrap();
        let alice = store.insert("alice", "hash").await.unwrap();
        let kept = store.create(new_post("kept", "body"), Some(alice.id)).await.unwrap();
        let gone = store.create(new_post("gone", ""), None).await.unwrap();
        store.delete(gone).await.unwrap();
        drop(store);

        let reopened = DocumentStore::open_file(&path).await.unwrap();
        let listings = reopened.list().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].post.id, kept);
        assert_eq!(listings[0].author.as_ref().unwrap().username, "alice");

        let next = reopened.create(new_post("next", ""), None).await.unwrap();
        assert!(next > gone);
        reopened.ping().await.unwrap();
    }

    #[tokio::test]
    async fn failed_write_leaves_the_store_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.json");
        let store = DocumentStore::open_file(&path).await.unwrap();
        let kept = store.create(new_post("kept", "body"), None).await.unwrap();

        // A directory where the temp file belongs makes every flush fail.
        let blocker = dir.path().join("blog.tmp");
        std::fs::create_dir(&blocker).unwrap();

        assert!(matches!(store.create(new_post("lost", ""), None).await, Err(StoreError::Io(_))));
        let edit = PostUpdate { title: Some("edited".into()), content: None };
        assert!(store.update(kept, edit).await.is_err());
        assert!(store.delete(kept).await.is_err());
        assert!(store.insert("alice", "hash").await.is_err());

        let listings = store.list().await.unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].post.title, "kept");
        assert!(store.find_by_username("alice").await.unwrap().is_none());

        std::fs::remove_dir(&blocker).unwrap();
        let next = store.create(new_post("next", ""), None).await.unwrap();
        assert_eq!(next, PostId(kept.0 + 1));
        assert!(store.insert("alice", "hash").await.is_ok());
    }

    #[tokio::test]
    async fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(DocumentStore::open_file(&path).await, Err(StoreError::Corrupt(_))));
    }
}
