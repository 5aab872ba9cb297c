use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Forwards the latest pushed value to a sink once no new value has arrived for `delay`.
///
/// Dropping the debouncer (or calling [`Debouncer::cancel`]) discards any pending
/// value without emitting it. Must be created inside a tokio runtime.
pub struct Debouncer<T> {
    input: mpsc::UnboundedSender<T>,
    handle: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    pub fn spawn<F>(delay: Duration, sink: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (input, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(delay, rx, sink));
        Self { input, handle }
    }

    /// Returns `false` once the debouncer has been cancelled.
    pub fn push(&self, value: T) -> bool {
        self.input.send(value).is_ok()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run<T, F>(delay: Duration, mut rx: mpsc::UnboundedReceiver<T>, mut sink: F)
where
    F: FnMut(T),
{
    let mut pending: Option<T> = None;
    loop {
        match pending.take() {
            None => match rx.recv().await {
                Some(value) => pending = Some(value),
                None => return,
            },
            Some(value) => {
                tokio::select! {
                    next = rx.recv() => match next {
                        Some(next) => pending = Some(next),
                        None => return,
                    },
                    _ = tokio::time::sleep(delay) => sink(value),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{SortMode, SortOrder, SortSpec};
    use crate::state::TaskListState;
    use tokio::time::{sleep, timeout, Instant};

    const DELAY: Duration = Duration::from_millis(400);

    fn collecting() -> (
        impl FnMut(String) + Send + 'static,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = move |value: String| {
            let _ = tx.send(value);
        };
        (sink, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_input_emits_only_last_value_once() {
        let (sink, mut rx) = collecting();
        let debouncer = Debouncer::spawn(DELAY, sink);

        debouncer.push("a".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.push("ab".to_string());
        sleep(Duration::from_millis(100)).await;
        let last_input = Instant::now();
        debouncer.push("abc".to_string());

        let value = rx.recv().await.expect("debounced value");
        assert_eq!(value, "abc");
        let waited = last_input.elapsed();
        assert!(waited >= DELAY, "emitted after {waited:?}");
        assert!(waited < DELAY + Duration::from_millis(50), "emitted after {waited:?}");

        assert!(timeout(Duration::from_secs(5), rx.recv()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn separate_quiet_windows_emit_separately() {
        let (sink, mut rx) = collecting();
        let debouncer = Debouncer::spawn(DELAY, sink);

        debouncer.push("first".to_string());
        assert_eq!(rx.recv().await.as_deref(), Some("first"));

        debouncer.push("second".to_string());
        assert_eq!(rx.recv().await.as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_emitted_before_quiescence() {
        let (sink, mut rx) = collecting();
        let debouncer = Debouncer::spawn(DELAY, sink);

        for i in 0..10 {
            debouncer.push(i.to_string());
            sleep(Duration::from_millis(300)).await;
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(rx.recv().await.as_deref(), Some("9"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_pending_value() {
        let (sink, mut rx) = collecting();
        let debouncer = Debouncer::spawn(DELAY, sink);

        debouncer.push("pending".to_string());
        sleep(Duration::from_millis(100)).await;
        debouncer.cancel();

        // The aborted task drops the sink, closing the channel without a value.
        assert_eq!(rx.recv().await, None);
        assert!(debouncer.is_cancelled());
        assert!(!debouncer.push("late".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn drop_discards_pending_value() {
        let (sink, mut rx) = collecting();
        let debouncer = Debouncer::spawn(DELAY, sink);
        debouncer.push("pending".to_string());
        drop(debouncer);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn feeds_task_list_search() {
        let state = TaskListState::new(
            Vec::new(),
            SortSpec::new(SortMode::CreatedAt, SortOrder::Descending),
        );
        let target = state.clone();
        let debouncer = Debouncer::spawn(DELAY, move |text: String| target.apply_search(text));

        debouncer.push("gro".to_string());
        debouncer.push("groceries".to_string());
        sleep(DELAY / 2).await;
        assert_eq!(state.search_text(), "");

        sleep(DELAY).await;
        assert_eq!(state.search_text(), "groceries");
    }
}
