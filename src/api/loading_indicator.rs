use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

/// Debounced loading-overlay visibility.
///
/// [`LoadingIndicator::begin`] arms a timer; the overlay becomes visible only
/// if the returned guard is still alive when the delay elapses. Dropping the
/// guard cancels the timer and hides the overlay on every exit path.
#[derive(Debug, Clone)]
pub struct LoadingIndicator {
    delay: Duration,
    tx: Arc<watch::Sender<bool>>,
}

impl LoadingIndicator {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            delay,
            tx: Arc::new(tx),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    #[must_use]
    pub fn is_visible(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Arms the overlay timer. Outside a tokio runtime no timer runs and the
    /// overlay stays hidden.
    #[must_use = "dropping the guard immediately hides the overlay"]
    pub fn begin(&self) -> LoadingGuard {
        let timer = Handle::try_current().ok().map(|handle| {
            let tx = Arc::clone(&self.tx);
            let delay = self.delay;
            handle.spawn(async move {
                tokio::time::sleep(delay).await;
                trace!(delay_ms = delay.as_millis() as u64, "showing loading overlay");
                tx.send_replace(true);
            })
        });
        LoadingGuard {
            tx: Arc::clone(&self.tx),
            timer,
        }
    }
}

/// Keeps the overlay timer armed until dropped.
#[derive(Debug)]
pub struct LoadingGuard {
    tx: Arc<watch::Sender<bool>>,
    timer: Option<JoinHandle<()>>,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.tx.send_if_modified(|visible| std::mem::replace(visible, false));
    }
}
