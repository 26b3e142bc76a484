//! Fixed-width worker pool over a shared cursor.

use std::future::Future;
use std::sync::{Arc, Mutex};

use log::error;

/// Run `worker` over `items` with at most `width` concurrent workers.
///
/// Each worker repeatedly claims the next item from a lock-protected cursor
/// and runs without holding the lock; `Some` results are appended to a
/// lock-protected list in completion order. The call returns only after
/// every worker has observed exhaustion and exited. A worker that panics is
/// logged and does not take the pool down.
pub(crate) async fn run_pool<T, R, F, Fut>(width: usize, items: Vec<T>, worker: F) -> Vec<R>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Option<R>> + Send + 'static,
{
    let cursor = Arc::new(Mutex::new(items.into_iter()));
    let results = Arc::new(Mutex::new(Vec::new()));
    let worker = Arc::new(worker);

    let width = width.max(1);
    let mut handles = Vec::with_capacity(width);
    for _ in 0..width {
        let cursor = cursor.clone();
        let results = results.clone();
        let worker = worker.clone();
        handles.push(tokio::spawn(async move {
            loop {
                // Claim-and-advance under the lock, work outside it.
                let item = cursor.lock().unwrap().next();
                let Some(item) = item else { break };
                if let Some(result) = worker(item).await {
                    results.lock().unwrap().push(result);
                }
            }
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!("pool worker exited abnormally: {e}");
        }
    }

    match Arc::try_unwrap(results) {
        Ok(results) => results.into_inner().unwrap(),
        Err(results) => std::mem::take(&mut *results.lock().unwrap()),
    }
}
