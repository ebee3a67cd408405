//! Scheduler - promotes due scheduled posts through the publish orchestrator
//!
//! Each tick queries for posts with `status = scheduled` and `scheduled_for
//! <= now`, then processes them one at a time in scheduled order. Per-post
//! failures are logged and reported; they never abort the rest of the tick.
//!
//! Failure policy: a post whose publish attempt exhausts its retries rolls
//! back to draft, and draft posts are not rescanned. Re-publishing a failed
//! post requires explicit user action (publish now, or schedule again).

use std::sync::Arc;
use uuid::Uuid;

use crate::{
    model::PublishReceipt,
    ports::{Clock, PostStore, StoreError},
    usecases::publish::{PublishOrchestrator, PublishPostError},
};

/// Outcome of one due post within a tick
#[derive(Debug)]
pub enum TickOutcome {
    /// Delivered, or already handled elsewhere
    Published(PublishReceipt),
    /// Claim lost to another instance, or post no longer claimable
    Skipped { reason: String },
    /// Publish failed terminally; the post is back in draft
    Failed { error: String },
}

/// Periodic publisher of due scheduled posts
pub struct Scheduler<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    store: Arc<St>,
    clock: Arc<Cl>,
    orchestrator: PublishOrchestrator<St, Cl>,
}

impl<St, Cl> Scheduler<St, Cl>
where
    St: PostStore + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(
        store: Arc<St>,
        clock: Arc<Cl>,
        orchestrator: PublishOrchestrator<St, Cl>,
    ) -> Self {
        Self {
            store,
            clock,
            orchestrator,
        }
    }

    /// Run a single scan-and-publish cycle
    pub async fn tick(&self) -> Result<Vec<(Uuid, TickOutcome)>, StoreError> {
        let now = self.clock.now();
        let due = self.store.due_posts(now).await?;

        if due.is_empty() {
            tracing::debug!("No due posts");
            return Ok(vec![]);
        }

        tracing::info!(count = due.len(), "Found due posts");

        let mut results = Vec::with_capacity(due.len());
        for post in due {
            let outcome = match self.orchestrator.publish(post.id).await {
                Ok(receipt) => TickOutcome::Published(receipt),
                Err(PublishPostError::NotClaimable(id)) => {
                    tracing::debug!(post_id = %id, "Post claimed elsewhere, skipping");
                    TickOutcome::Skipped {
                        reason: "claimed by another instance".to_string(),
                    }
                }
                Err(error) => {
                    tracing::error!(
                        post_id = %post.id,
                        platform = %post.platform,
                        error = %error,
                        "Scheduled publish failed"
                    );
                    TickOutcome::Failed {
                        error: error.to_string(),
                    }
                }
            };
            results.push((post.id, outcome));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Platform, PostStatus, Provider};
    use crate::ports::SystemClock;
    use crate::usecases::publish::tests::{
        FakeStore, FlakyPublisher, draft_post, linked_account, test_user,
    };
    use crate::usecases::publish::PublishConfig;
    use crate::ports::SocialPublisher;
    use time::{Duration, OffsetDateTime};

    fn scheduler(
        store: Arc<FakeStore>,
        publishers: Vec<Arc<dyn SocialPublisher>>,
    ) -> Scheduler<FakeStore, SystemClock> {
        let clock = Arc::new(SystemClock);
        let orchestrator = PublishOrchestrator::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            publishers,
            PublishConfig {
                max_retries: 0,
                retry_delay: std::time::Duration::from_millis(1),
            },
        );
        Scheduler::new(store, clock, orchestrator)
    }

    fn scheduled(store: &FakeStore, user_id: uuid::Uuid, offset: Duration) -> uuid::Uuid {
        let mut post = draft_post(user_id, Platform::Twitter);
        post.status = PostStatus::Scheduled;
        post.scheduled_for = Some(OffsetDateTime::now_utc() + offset);
        let id = post.id;
        store.insert_post(post);
        id
    }

    #[tokio::test]
    async fn test_tick_selects_only_due_posts() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));

        let due = scheduled(&store, user.id, Duration::minutes(-1));
        let future = scheduled(&store, user.id, Duration::hours(1));
        let deleted = {
            let mut post = draft_post(user.id, Platform::Twitter);
            post.status = PostStatus::Scheduled;
            post.scheduled_for = Some(OffsetDateTime::now_utc() - Duration::minutes(1));
            post.is_deleted = true;
            let id = post.id;
            store.insert_post(post);
            id
        };

        let publisher = Arc::new(FlakyPublisher::new(Platform::Twitter, 0));
        let sched = scheduler(Arc::clone(&store), vec![publisher]);

        let results = sched.tick().await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, due);
        assert!(matches!(results[0].1, TickOutcome::Published(_)));

        assert_eq!(store.status_of(due), PostStatus::Published);
        assert_eq!(store.status_of(future), PostStatus::Scheduled);
        assert_eq!(store.status_of(deleted), PostStatus::Scheduled);
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_posts() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));

        // first due post fails (all attempts), second still publishes
        let failing = scheduled(&store, user.id, Duration::minutes(-2));
        let later = scheduled(&store, user.id, Duration::seconds(-30));

        let publisher = Arc::new(FlakyPublisher::new(Platform::Twitter, 1));
        let sched = scheduler(Arc::clone(&store), vec![publisher.clone()]);

        let results = sched.tick().await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, failing);
        assert!(matches!(results[0].1, TickOutcome::Failed { .. }));
        assert_eq!(results[1].0, later);
        assert!(matches!(results[1].1, TickOutcome::Published(_)));

        assert_eq!(store.status_of(failing), PostStatus::Draft);
        assert_eq!(store.status_of(later), PostStatus::Published);
    }

    #[tokio::test]
    async fn test_failed_post_not_rescanned_next_tick() {
        let user = test_user();
        let account = linked_account(user.id, Provider::Twitter);
        let store = Arc::new(FakeStore::new(user.clone(), vec![account]));

        let post_id = scheduled(&store, user.id, Duration::minutes(-1));

        let publisher = Arc::new(FlakyPublisher::new(Platform::Twitter, u32::MAX));
        let sched = scheduler(Arc::clone(&store), vec![publisher.clone()]);

        let first = sched.tick().await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(store.status_of(post_id), PostStatus::Draft);
        let attempts_after_first = publisher.call_count();

        // rolled back to draft, so the next tick finds nothing
        let second = sched.tick().await.unwrap();
        assert!(second.is_empty());
        assert_eq!(publisher.call_count(), attempts_after_first);
    }

    #[tokio::test]
    async fn test_empty_tick() {
        let user = test_user();
        let store = Arc::new(FakeStore::new(user, vec![]));
        let sched = scheduler(store, vec![]);
        assert!(sched.tick().await.unwrap().is_empty());
    }
}
