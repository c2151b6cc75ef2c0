//! Structured fan-out with first-error cancellation.
//!
//! A [`TaskGroup`] owns every task it spawns. The first member to fail stores
//! its error and cancels the group's token, so siblings can bail out at their
//! next await point. [`TaskGroup::wait`] always joins every member before it
//! returns.

use std::future::Future;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub struct TaskGroup<E> {
    set: JoinSet<()>,
    token: CancellationToken,
    first_error: Arc<Mutex<Option<E>>>,
    limit: Option<Arc<Semaphore>>,
}

impl<E: Send + 'static> TaskGroup<E> {
    /// Create a group whose token is a child of `parent`: cancelling the
    /// parent cancels the group, never the other way around.
    pub fn new(parent: &CancellationToken) -> Self {
        Self {
            set: JoinSet::new(),
            token: parent.child_token(),
            first_error: Arc::new(Mutex::new(None)),
            limit: None,
        }
    }

    /// Run at most `limit` members at a time. A zero limit is treated as one.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Spawn a member. `f` receives the group token and must build a future
    /// that observes it.
    ///
    /// A member still waiting for a concurrency permit when the group is
    /// cancelled never runs, and that is not recorded as an error.
    pub fn spawn<F, Fut>(&mut self, f: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        let token = self.token.clone();
        let first_error = Arc::clone(&self.first_error);
        let limit = self.limit.clone();
        let member = f(token.clone());

        self.set.spawn(async move {
            let _permit = match limit {
                Some(sem) => tokio::select! {
                    biased;
                    _ = token.cancelled() => return,
                    permit = sem.acquire_owned() => permit.ok(),
                },
                None => None,
            };

            if let Err(err) = member.await {
                record_first(&first_error, err);
                token.cancel();
            }
        });
    }

    /// Join every member and return the first captured error, if any.
    ///
    /// Panics in a member are re-raised here after the rest of the group
    /// has been cancelled.
    pub async fn wait(mut self) -> Result<(), E> {
        while let Some(joined) = self.set.join_next().await {
            if let Err(err) = joined {
                if err.is_panic() {
                    tracing::error!("task group member panicked: {err}");
                    self.token.cancel();
                    std::panic::resume_unwind(err.into_panic());
                }
            }
        }
        self.token.cancel();

        let mut slot = self.first_error.lock().unwrap_or_else(|e| e.into_inner());
        match slot.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn record_first<E>(slot: &Mutex<Option<E>>, err: E) {
    let mut slot = slot.lock().unwrap_or_else(|e| e.into_inner());
    if slot.is_none() {
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn all_members_succeed() {
        let done = Arc::new(AtomicUsize::new(0));
        let mut group: TaskGroup<String> = TaskGroup::new(&CancellationToken::new());

        for _ in 0..5 {
            let done = Arc::clone(&done);
            group.spawn(move |_| async move {
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(group.len(), 5);

        group.wait().await.expect("no member failed");
        assert_eq!(done.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn first_error_cancels_siblings_and_wins() {
        let mut group: TaskGroup<String> = TaskGroup::new(&CancellationToken::new());

        group.spawn(|_| async { Err("boom".to_string()) });
        for _ in 0..3 {
            group.spawn(|token| async move {
                token.cancelled().await;
                Err("cancelled".to_string())
            });
        }

        let res = tokio::time::timeout(Duration::from_secs(5), group.wait())
            .await
            .expect("join must not hang");
        assert_eq!(res.unwrap_err(), "boom");
    }

    #[tokio::test]
    async fn parent_cancellation_reaches_members() {
        let parent = CancellationToken::new();
        let mut group: TaskGroup<&'static str> = TaskGroup::new(&parent);

        group.spawn(|token| async move {
            token.cancelled().await;
            Err("stopped")
        });
        parent.cancel();

        assert_eq!(group.wait().await.unwrap_err(), "stopped");
    }

    #[tokio::test]
    async fn group_failure_does_not_cancel_parent() {
        let parent = CancellationToken::new();
        let mut group: TaskGroup<()> = TaskGroup::new(&parent);
        group.spawn(|_| async { Err(()) });

        assert!(group.wait().await.is_err());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn limit_bounds_members_in_flight() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut group: TaskGroup<()> = TaskGroup::new(&CancellationToken::new()).with_limit(2);

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            group.spawn(move |_| async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            });
        }

        group.wait().await.unwrap();
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn queued_members_are_skipped_after_failure() {
        let started = Arc::new(AtomicUsize::new(0));
        let mut group: TaskGroup<&'static str> =
            TaskGroup::new(&CancellationToken::new()).with_limit(1);

        group.spawn(|_| async { Err("first") });
        for _ in 0..4 {
            let started = Arc::clone(&started);
            group.spawn(move |_| async move {
                started.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        assert_eq!(group.wait().await.unwrap_err(), "first");
        assert_eq!(started.load(Ordering::SeqCst), 0);
    }

    fn blow_up() -> Result<(), ()> {
        panic!("member blew up")
    }

    #[tokio::test]
    #[should_panic(expected = "member blew up")]
    async fn panics_are_propagated() {
        let mut group: TaskGroup<()> = TaskGroup::new(&CancellationToken::new());
        group.spawn(|_| async { blow_up() });
        let _ = group.wait().await;
    }
}
