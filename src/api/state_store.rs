use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::trace;

use super::{ChartState, Field, ResolvedState, View};

/// Result of committing a resolved state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub revision: u64,
    /// Effective fields whose value differs from the previous commit.
    pub changed: BTreeSet<Field>,
    pub view_changed: bool,
}

impl StateChange {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && !self.view_changed
    }
}

struct StoreInner {
    resolved: ResolvedState,
    revision: u64,
}

/// Shared holder of the current [`ResolvedState`].
///
/// Every commit replaces the whole resolved state under one write lock, so a
/// reader never observes a view with another view's field values.
#[derive(Clone)]
pub struct StateStore {
    inner: Arc<RwLock<StoreInner>>,
    revision_tx: Arc<watch::Sender<u64>>,
}

impl StateStore {
    #[must_use]
    pub fn new(initial: ResolvedState) -> Self {
        let (revision_tx, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                resolved: initial,
                revision: 0,
            })),
            revision_tx: Arc::new(revision_tx),
        }
    }

    /// Commits `next` atomically and reports what changed.
    pub fn apply(&self, next: ResolvedState) -> StateChange {
        let change = {
            let mut inner = self.inner.write();
            let changed = inner.resolved.state().diff(next.state());
            let view_changed = inner.resolved.view() != next.view();
            let overrides_changed = inner.resolved.overrides() != next.overrides();
            if !changed.is_empty() || view_changed || overrides_changed {
                inner.revision += 1;
            }
            inner.resolved = next;
            StateChange {
                revision: inner.revision,
                changed,
                view_changed,
            }
        };
        trace!(
            revision = change.revision,
            changed = change.changed.len(),
            view_changed = change.view_changed,
            "state committed"
        );
        self.revision_tx.send_replace(change.revision);
        change
    }

    #[must_use]
    pub fn snapshot(&self) -> ResolvedState {
        self.inner.read().resolved.clone()
    }

    #[must_use]
    pub fn state(&self) -> ChartState {
        self.inner.read().resolved.state().clone()
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.inner.read().resolved.view()
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.inner.read().revision
    }

    #[must_use]
    pub fn is_user_set(&self, field: Field) -> bool {
        self.inner.read().resolved.is_user_set(field)
    }

    /// Receiver that observes the revision of every commit.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision_tx.subscribe()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("StateStore")
            .field("view", &inner.resolved.view())
            .field("revision", &inner.revision)
            .finish()
    }
}
