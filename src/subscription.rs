//! Toolbar-click subscriptions for native window integrations.
//!
//! Hosts that draw a toolbar button in the mail client's window need a
//! process-wide hook on that window. The hook is only worth keeping while
//! someone listens, so [`ListenerRegistry`] reference-counts subscribers:
//! the first [`ListenerRegistry::subscribe`] installs the [`WindowHook`], and
//! dropping the last [`Subscription`] removes it again.
//!
//! ```rust
//! use attachment_preview::{ListenerRegistry, ToolbarClick, WindowHook};
//! use std::sync::Arc;
//!
//! struct NoHook;
//! impl WindowHook for NoHook {
//!     fn install(&self) {}
//!     fn uninstall(&self) {}
//! }
//!
//! let registry = ListenerRegistry::<ToolbarClick>::new(Arc::new(NoHook));
//! let sub = registry.subscribe(|click| println!("clicked {}", click.toolbar_id));
//! registry.emit(&ToolbarClick { toolbar_id: "preview".into(), x: 4, y: 2 });
//! drop(sub);
//! assert_eq!(registry.listener_count(), 0);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, error};

/// A click on a toolbar button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolbarClick {
    pub toolbar_id: String,
    pub x: i32,
    pub y: i32,
}

/// The native hook that produces events.
pub trait WindowHook: Send + Sync {
    fn install(&self);
    fn uninstall(&self);
}

type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Inner<E> {
    hook: Arc<dyn WindowHook>,
    listeners: Mutex<BTreeMap<u64, Callback<E>>>,
    next_id: AtomicU64,
}

impl<E> Inner<E> {
    fn listeners(&self) -> MutexGuard<'_, BTreeMap<u64, Callback<E>>> {
        // The map stays consistent even if a holder panicked.
        self.listeners.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Reference-counted set of event listeners sharing one window hook.
pub struct ListenerRegistry<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for ListenerRegistry<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: 'static> ListenerRegistry<E> {
    pub fn new(hook: Arc<dyn WindowHook>) -> Self {
        Self {
            inner: Arc::new(Inner {
                hook,
                listeners: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Register `callback`. It stays registered until the returned handle
    /// is dropped (or [`Subscription::unsubscribe`]d).
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let mut listeners = self.inner.listeners();
        if listeners.is_empty() {
            debug!("First listener, installing window hook");
            self.inner.hook.install();
        }
        listeners.insert(id, Arc::new(callback));
        drop(listeners);

        // The handle keeps the registry alive so the last drop can uninstall.
        let inner = Arc::clone(&self.inner);
        Subscription {
            release: Some(Box::new(move || release(&inner, id))),
        }
    }

    /// Call every registered listener with `event`, in subscription order.
    pub fn emit(&self, event: &E) {
        // Snapshot so callbacks may subscribe or unsubscribe.
        let callbacks: Vec<Callback<E>> = self.inner.listeners().values().cloned().collect();
        for callback in callbacks {
            callback(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

fn release<E>(inner: &Inner<E>, id: u64) {
    let mut listeners = inner.listeners();
    if listeners.remove(&id).is_none() {
        error!("Listener {} released twice", id);
        return;
    }
    if listeners.is_empty() {
        debug!("Last listener gone, removing window hook");
        inner.hook.uninstall();
    }
}

/// Handle keeping one listener registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.run_release();
    }

    fn run_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.run_release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// Counts toolbar clicks and greets.
#[derive(Debug, Default)]
pub struct ClickCounter {
    clicks: AtomicU64,
}

impl ClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) -> u64 {
        self.clicks.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn value(&self) -> u64 {
        self.clicks.load(Ordering::SeqCst)
    }

    /// Count one more click and greet `name` with the running total.
    pub fn say_hello(&self, name: &str) -> String {
        let clicks = self.increment();
        format!("Hello {}! I counted {} clicks so far.", name, clicks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingHook {
        installs: AtomicU64,
        uninstalls: AtomicU64,
    }

    impl WindowHook for CountingHook {
        fn install(&self) {
            self.installs.fetch_add(1, Ordering::SeqCst);
        }
        fn uninstall(&self) {
            self.uninstalls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn click(id: &str) -> ToolbarClick {
        ToolbarClick {
            toolbar_id: id.into(),
            x: 0,
            y: 0,
        }
    }

    #[test]
    fn hook_follows_first_and_last_listener() {
        let hook = Arc::new(CountingHook::default());
        let registry = ListenerRegistry::<ToolbarClick>::new(hook.clone());

        let a = registry.subscribe(|_| {});
        let b = registry.subscribe(|_| {});
        assert_eq!(hook.installs.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count(), 2);

        drop(a);
        assert_eq!(hook.uninstalls.load(Ordering::SeqCst), 0);
        b.unsubscribe();
        assert_eq!(hook.uninstalls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.listener_count(), 0);

        let _c = registry.subscribe(|_| {});
        assert_eq!(hook.installs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn emit_reaches_every_listener() {
        let registry = ListenerRegistry::<ToolbarClick>::new(Arc::new(CountingHook::default()));
        let counter = Arc::new(ClickCounter::new());

        let c1 = Arc::clone(&counter);
        let _s1 = registry.subscribe(move |_| {
            c1.increment();
        });
        let c2 = Arc::clone(&counter);
        let _s2 = registry.subscribe(move |e| {
            assert_eq!(e.toolbar_id, "preview");
            c2.increment();
        });

        registry.emit(&click("preview"));
        assert_eq!(counter.value(), 2);
    }

    #[test]
    fn subscription_outliving_registry_still_uninstalls() {
        let hook = Arc::new(CountingHook::default());
        let registry = ListenerRegistry::<ToolbarClick>::new(hook.clone());
        let sub = registry.subscribe(|_| {});
        drop(registry);
        assert_eq!(hook.uninstalls.load(Ordering::SeqCst), 0);

        drop(sub);
        assert_eq!(hook.installs.load(Ordering::SeqCst), 1);
        assert_eq!(hook.uninstalls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn say_hello_counts() {
        let counter = ClickCounter::new();
        assert_eq!(counter.say_hello("Ada"), "Hello Ada! I counted 1 clicks so far.");
        assert_eq!(counter.say_hello("Ada"), "Hello Ada! I counted 2 clicks so far.");
        assert_eq!(counter.value(), 2);
    }
}
