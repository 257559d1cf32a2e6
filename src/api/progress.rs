use std::sync::Arc;

use tokio::sync::watch;

use super::ProgressCallback;

/// Observable aggregation progress as a rounded 0-100 percentage.
#[derive(Debug, Clone)]
pub struct ProgressState {
    tx: Arc<watch::Sender<u8>>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u8> {
        self.tx.subscribe()
    }

    pub fn report(&self, done: usize, total: usize) {
        let percent = percent_of(done, total);
        self.tx.send_if_modified(|current| {
            let changed = *current != percent;
            *current = percent;
            changed
        });
    }

    pub fn reset(&self) {
        self.report(0, 0);
    }

    /// Callback that feeds this state.
    #[must_use]
    pub fn callback(&self) -> ProgressCallback {
        let state = self.clone();
        Arc::new(move |done, total| state.report(done, total))
    }
}

/// `done / total` as a rounded, clamped percentage; zero without a total.
#[must_use]
pub fn percent_of(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let done = done.min(total) as f64;
    let percent = (done * 100.0 / total as f64).round();
    percent.clamp(0.0, 100.0) as u8
}
