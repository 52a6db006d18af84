//! Single-flight registry for concurrent cache misses.
//!
//! When several requests miss on the same key at once, only the first one
//! (the leader) starts a render; the rest join it and receive a clone of the
//! leader's result.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::{FutureExt, LocalBoxFuture, Shared};

use crate::key::CacheKey;

type SharedRender<T, E> = Shared<LocalBoxFuture<'static, Result<T, E>>>;
type Pending<T, E> = Rc<RefCell<HashMap<String, SharedRender<T, E>>>>;

/// Renders currently in flight, keyed by cache key.
///
/// Scoped to one executor; requests served by different instances do not
/// share renders.
pub struct InFlightRenders<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    pending: Pending<T, E>,
}

impl<T, E> InFlightRenders<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            pending: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    /// Join the render in flight for a key, or start one.
    ///
    /// `start` is only called when no render is in flight for the key.
    pub fn join_or_start<F>(&self, key: &CacheKey, start: F) -> InFlight<T, E>
    where
        F: FnOnce() -> LocalBoxFuture<'static, Result<T, E>>,
    {
        let mut pending = self.pending.borrow_mut();

        if let Some(shared) = pending.get(key.as_str()) {
            return InFlight {
                future: shared.clone(),
                guard: None,
            };
        }

        let shared = start().shared();
        pending.insert(key.as_str().to_string(), shared.clone());

        InFlight {
            future: shared,
            guard: Some(InFlightGuard {
                key: key.as_str().to_string(),
                pending: Rc::clone(&self.pending),
            }),
        }
    }

    /// Number of renders in flight.
    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Check if nothing is in flight.
    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }

    /// Check if a render is in flight for a key.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.pending.borrow().contains_key(key.as_str())
    }
}

impl<T, E> Default for InFlightRenders<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// A handle on one in-flight render.
pub struct InFlight<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    future: SharedRender<T, E>,
    guard: Option<InFlightGuard<T, E>>,
}

impl<T, E> InFlight<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Whether this handle started the render.
    pub fn is_leader(&self) -> bool {
        self.guard.is_some()
    }

    /// Wait for the render to finish.
    ///
    /// The leader's registry entry is released once its result is available
    /// or the handle is dropped, whichever comes first.
    pub async fn wait(self) -> Result<T, E> {
        let InFlight { future, guard } = self;
        let result = future.await;
        drop(guard);
        result
    }
}

struct InFlightGuard<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    key: String,
    pending: Pending<T, E>,
}

impl<T, E> Drop for InFlightGuard<T, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.try_borrow_mut() {
            pending.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use futures::channel::oneshot;

    fn key(url: &str) -> CacheKey {
        CacheKey::new("prerender", url)
    }

    #[tokio::test]
    async fn test_leader_then_release() {
        let renders: InFlightRenders<String, String> = InFlightRenders::new();
        let k = key("https://site.test/");

        let handle = renders.join_or_start(&k, || async { Ok("<html>".to_string()) }.boxed_local());
        assert!(handle.is_leader());
        assert!(renders.contains(&k));

        assert_eq!(handle.wait().await.unwrap(), "<html>");
        assert!(renders.is_empty());
    }

    #[tokio::test]
    async fn test_followers_share_one_render() {
        let renders: InFlightRenders<String, String> = InFlightRenders::new();
        let k = key("https://site.test/");
        let starts = Rc::new(Cell::new(0));
        let (tx, rx) = oneshot::channel::<()>();

        let counter = Rc::clone(&starts);
        let leader = renders.join_or_start(&k, move || {
            counter.set(counter.get() + 1);
            async move {
                let _ = rx.await;
                Ok("<html>shared</html>".to_string())
            }
            .boxed_local()
        });

        let counter = Rc::clone(&starts);
        let follower = renders.join_or_start(&k, move || {
            counter.set(counter.get() + 1);
            async { Ok("<html>second</html>".to_string()) }.boxed_local()
        });

        assert!(leader.is_leader());
        assert!(!follower.is_leader());
        assert_eq!(renders.len(), 1);

        let _ = tx.send(());
        let (a, b) = futures::join!(leader.wait(), follower.wait());

        assert_eq!(starts.get(), 1);
        assert_eq!(a.unwrap(), "<html>shared</html>");
        assert_eq!(b.unwrap(), "<html>shared</html>");
        assert!(renders.is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_shared() {
        let renders: InFlightRenders<String, String> = InFlightRenders::new();
        let k = key("https://site.test/");

        let leader = renders.join_or_start(&k, || async { Err("timeout".to_string()) }.boxed_local());
        let follower = renders.join_or_start(&k, || async { Ok(String::new()) }.boxed_local());

        let (a, b) = futures::join!(leader.wait(), follower.wait());
        assert_eq!(a.unwrap_err(), "timeout");
        assert_eq!(b.unwrap_err(), "timeout");
    }

    #[tokio::test]
    async fn test_distinct_keys_render_independently() {
        let renders: InFlightRenders<String, String> = InFlightRenders::new();
        let a = renders.join_or_start(&key("https://site.test/a"), || async { Ok("a".to_string()) }.boxed_local());
        let b = renders.join_or_start(&key("https://site.test/b"), || async { Ok("b".to_string()) }.boxed_local());

        assert!(a.is_leader());
        assert!(b.is_leader());
        assert_eq!(renders.len(), 2);
    }

    #[test]
    fn test_dropped_leader_releases_key() {
        let renders: InFlightRenders<String, String> = InFlightRenders::new();
        let k = key("https://site.test/");

        let handle = renders.join_or_start(&k, || async { Ok(String::new()) }.boxed_local());
        drop(handle);

        assert!(!renders.contains(&k));
    }
}
