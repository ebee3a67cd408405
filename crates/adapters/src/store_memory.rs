//! In-memory store for testing and offline use

use async_trait::async_trait;
use devshare_domain::{
    Account, Note, PkceStore, Post, PostStatus, PostStore, Provider, PublishContext,
    PublishReceipt, StoreError, User,
};
use std::collections::HashMap;
use std::sync::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

/// In-memory store implementation
pub struct InMemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    accounts: RwLock<HashMap<(Uuid, Provider), Account>>,
    notes: RwLock<HashMap<Uuid, Note>>,
    posts: RwLock<HashMap<Uuid, Post>>,
    oauth_states: RwLock<HashMap<String, (String, OffsetDateTime)>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            accounts: RwLock::new(HashMap::new()),
            notes: RwLock::new(HashMap::new()),
            posts: RwLock::new(HashMap::new()),
            oauth_states: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

#[async_trait]
impl PostStore for InMemoryStore {
    async fn upsert_user(
        &self,
        email: &str,
        display_name: Option<&str>,
    ) -> Result<User, StoreError> {
        let mut users = self.users.write().map_err(lock_err)?;
        if let Some(existing) = users.values_mut().find(|u| u.email == email) {
            if display_name.is_some() {
                existing.display_name = display_name.map(String::from);
            }
            return Ok(existing.clone());
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: display_name.map(String::from),
            password_hash: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn upsert_account(&self, account: &Account) -> Result<(), StoreError> {
        let mut accounts = self.accounts.write().map_err(lock_err)?;
        accounts.insert((account.user_id, account.provider), account.clone());
        Ok(())
    }

    async fn accounts_for_user(&self, user_id: Uuid) -> Result<Vec<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(lock_err)?;
        Ok(accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create_note(&self, note: &Note) -> Result<(), StoreError> {
        let mut notes = self.notes.write().map_err(lock_err)?;
        notes.insert(note.id, note.clone());
        Ok(())
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>, StoreError> {
        let notes = self.notes.read().map_err(lock_err)?;
        Ok(notes.get(&id).filter(|n| !n.is_deleted).cloned())
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let notes = self.notes.read().map_err(lock_err)?;
        let mut result: Vec<Note> = notes
            .values()
            .filter(|n| n.user_id == user_id && !n.is_deleted)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn delete_note(&self, id: Uuid) -> Result<(), StoreError> {
        let mut notes = self.notes.write().map_err(lock_err)?;
        let note = notes
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("note {}", id)))?;
        note.is_deleted = true;
        Ok(())
    }

    async fn count_posts_for_note(&self, note_id: Uuid) -> Result<u64, StoreError> {
        let posts = self.posts.read().map_err(lock_err)?;
        Ok(posts
            .values()
            .filter(|p| p.note_id == note_id && !p.is_deleted)
            .count() as u64)
    }

    async fn create_post(&self, post: &Post) -> Result<(), StoreError> {
        let mut posts = self.posts.write().map_err(lock_err)?;
        posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> Result<Option<Post>, StoreError> {
        let posts = self.posts.read().map_err(lock_err)?;
        Ok(posts.get(&id).filter(|p| !p.is_deleted).cloned())
    }

    async fn list_posts(&self, user_id: Uuid) -> Result<Vec<Post>, StoreError> {
        let posts = self.posts.read().map_err(lock_err)?;
        let mut result: Vec<Post> = posts
            .values()
            .filter(|p| p.user_id == user_id && !p.is_deleted)
            .cloned()
            .collect();
        result.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(result)
    }

    async fn publish_context(&self, post_id: Uuid) -> Result<Option<PublishContext>, StoreError> {
        let Some(post) = self.get_post(post_id).await? else {
            return Ok(None);
        };

        let user = {
            let users = self.users.read().map_err(lock_err)?;
            users
                .get(&post.user_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(format!("user {}", post.user_id)))?
        };

        let accounts = self.accounts_for_user(post.user_id).await?;

        Ok(Some(PublishContext {
            post,
            user,
            accounts,
        }))
    }

    async fn due_posts(&self, now: OffsetDateTime) -> Result<Vec<Post>, StoreError> {
        let posts = self.posts.read().map_err(lock_err)?;
        let mut due: Vec<Post> = posts
            .values()
            .filter(|p| {
                p.status == PostStatus::Scheduled
                    && !p.is_deleted
                    && p.scheduled_for.is_some_and(|at| at <= now)
            })
            .cloned()
            .collect();
        due.sort_by_key(|p| p.scheduled_for);
        Ok(due)
    }

    async fn claim_for_publish(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut posts = self.posts.write().map_err(lock_err)?;
        match posts.get_mut(&id) {
            Some(post)
                if !post.is_deleted
                    && matches!(post.status, PostStatus::Draft | PostStatus::Scheduled) =>
            {
                post.status = PostStatus::Publishing;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_published(
        &self,
        id: Uuid,
        at: OffsetDateTime,
        receipt: &PublishReceipt,
    ) -> Result<(), StoreError> {
        let mut posts = self.posts.write().map_err(lock_err)?;
        let post = posts
            .get_mut(&id)
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| StoreError::NotFound(format!("post {}", id)))?;
        post.status = PostStatus::Published;
        post.published_at = Some(at);
        post.external_id = receipt.external_id.clone();
        post.external_url = receipt.url.clone();
        post.updated_at = at;
        Ok(())
    }

    async fn rollback_to_draft(&self, id: Uuid) -> Result<(), StoreError> {
        let mut posts = self.posts.write().map_err(lock_err)?;
        let post = posts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("post {}", id)))?;
        post.status = PostStatus::Draft;
        Ok(())
    }

    async fn schedule_post(&self, id: Uuid, at: OffsetDateTime) -> Result<(), StoreError> {
        let mut posts = self.posts.write().map_err(lock_err)?;
        let post = posts
            .get_mut(&id)
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| StoreError::NotFound(format!("post {}", id)))?;
        post.status = PostStatus::Scheduled;
        post.scheduled_for = Some(at);
        Ok(())
    }
}

#[async_trait]
impl PkceStore for InMemoryStore {
    async fn put_state(
        &self,
        state: &str,
        verifier: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), StoreError> {
        let mut states = self.oauth_states.write().map_err(lock_err)?;
        states.insert(state.to_string(), (verifier.to_string(), expires_at));
        Ok(())
    }

    async fn take_state(
        &self,
        state: &str,
        now: OffsetDateTime,
    ) -> Result<Option<String>, StoreError> {
        let mut states = self.oauth_states.write().map_err(lock_err)?;
        Ok(states
            .remove(state)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(verifier, _)| verifier))
    }
}
