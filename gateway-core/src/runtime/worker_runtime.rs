//! Runtime helper for spawning dedicated worker threads.

use std::future::Future;
use std::io;
use std::thread::{self, JoinHandle};
use tokio::runtime::Builder;
use tracing::error;

/// Runs `run_loop` to completion on a new OS thread driving its own
/// current-thread tokio runtime, isolated from any runtime the caller uses.
pub(crate) fn spawn_worker_thread<F, Fut>(name: &str, run_loop: F) -> io::Result<JoinHandle<()>>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    let thread_name = name.to_string();
    thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(worker = %thread_name, err = %err, "failed to create worker runtime");
                    return;
                }
            };

            runtime.block_on(run_loop());
        })
}

#[cfg(test)]
mod tests {
    use super::spawn_worker_thread;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn worker_runs_future_on_named_thread() {
        let (tx, rx) = mpsc::channel();
        let handle = spawn_worker_thread("test-worker", move || async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let name = std::thread::current().name().map(str::to_string);
            tx.send(name).expect("receiver alive");
        })
        .expect("spawn worker");

        handle.join().expect("worker thread joins");
        assert_eq!(
            rx.recv().expect("worker reported"),
            Some("test-worker".to_string())
        );
    }
}
