//! Fixed-interval polling with an owned, cancellable handle.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Owns a running poll task. Dropping or cancelling it stops all future
/// polls; a fetch in flight is dropped and its result never applied.
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    poke: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Runs one extra poll now instead of waiting for the next tick.
    pub fn poke(&self) {
        self.poke.notify_one();
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancels and waits for the task to exit.
    pub async fn stop(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("poll task ended abnormally: {e}");
            }
        }
    }

    /// Waits for the task to finish on its own (the apply step broke the loop).
    pub async fn finished(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("poll task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

/// Resolves once the handle is cancelled or gone.
async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

/// Polls immediately, then every `every`. `fetch` produces a value and
/// `apply` consumes it; `apply` never runs once the handle is cancelled and
/// returning `ControlFlow::Break` ends polling.
pub fn spawn_polling<T, F, Fut, A>(every: Duration, mut fetch: F, mut apply: A) -> PollHandle
where
    T: Send + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send,
    A: FnMut(T) -> ControlFlow<()> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);
    let poke = Arc::new(Notify::new());
    let poked = Arc::clone(&poke);

    let task = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancelled(&mut shutdown_rx) => break,
                _ = poked.notified() => {
                    ticker.reset();
                }
                _ = ticker.tick() => {}
            }

            let value = tokio::select! {
                biased;
                _ = cancelled(&mut shutdown_rx) => {
                    tracing::debug!("poll cancelled while a fetch was in flight");
                    break;
                }
                value = fetch() => value,
            };
            if apply(value).is_break() {
                break;
            }
        }
    });

    PollHandle {
        shutdown,
        poke,
        task: Some(task),
    }
}
