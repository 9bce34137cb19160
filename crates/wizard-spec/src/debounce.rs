//! Timer-based coalescing queue.
//!
//! Values pushed into a [`Debouncer`] are held until `delay` passes without a
//! newer push; only the most recent value reaches the sink. A push supersedes
//! (and cancels) whatever was pending.

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command<T> {
    Push(T),
    Flush(oneshot::Sender<()>),
    Cancel,
}

pub struct Debouncer<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    worker: JoinHandle<()>,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn<F>(delay: Duration, mut sink: F) -> Self
    where
        F: FnMut(T) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<Command<T>>();
        let worker = tokio::spawn(async move {
            let mut pending: Option<T> = None;
            loop {
                tokio::select! {
                    command = rx.recv() => match command {
                        Some(Command::Push(value)) => pending = Some(value),
                        Some(Command::Flush(done)) => {
                            if let Some(value) = pending.take() {
                                sink(value);
                            }
                            let _ = done.send(());
                        }
                        Some(Command::Cancel) => pending = None,
                        None => {
                            if let Some(value) = pending.take() {
                                sink(value);
                            }
                            break;
                        }
                    },
                    _ = tokio::time::sleep(delay), if pending.is_some() => {
                        if let Some(value) = pending.take() {
                            sink(value);
                        }
                    }
                }
            }
        });
        Self { tx, worker }
    }

    pub fn push(&self, value: T) {
        if self.tx.send(Command::Push(value)).is_err() {
            log::warn!("debouncer worker has stopped; value dropped");
        }
    }

    /// Delivers the pending value now, if any.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Drops the pending value without delivering it.
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }

    /// Flushes what is pending and waits for the worker to finish.
    pub async fn shutdown(self) {
        let Self { tx, worker } = self;
        drop(tx);
        if let Err(err) = worker.await {
            log::error!("debouncer worker failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl FnMut(u32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink = move |value: u32| sink_seen.lock().expect("lock").push(value);
        (seen, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn bursts_collapse_to_latest_value() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::spawn(Duration::from_millis(100), sink);
        debouncer.push(1);
        debouncer.push(2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        debouncer.push(3);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(seen.lock().expect("lock").is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*seen.lock().expect("lock"), vec![3]);
    }

    #[tokio::test]
    async fn flush_and_cancel() {
        let (seen, sink) = recorder();
        let debouncer = Debouncer::spawn(Duration::from_secs(60), sink);
        debouncer.push(7);
        debouncer.flush().await;
        assert_eq!(*seen.lock().expect("lock"), vec![7]);

        debouncer.push(8);
        debouncer.cancel();
        debouncer.flush().await;
        assert_eq!(*seen.lock().expect("lock"), vec![7]);

        debouncer.push(9);
        debouncer.shutdown().await;
        assert_eq!(*seen.lock().expect("lock"), vec![7, 9]);
    }
}
