use tokio::task::JoinHandle;
use tracing::warn;

/// Background assistant operation.
///
/// Wraps a tokio task together with the value to report if the task dies
/// without producing one, so awaiting a `Task` is as total as calling the
/// operation directly.
pub struct Task<T> {
    handle: JoinHandle<T>,
    fallback: T,
}

impl<T: Send + 'static> Task<T> {
    pub(crate) fn spawn<F>(future: F, fallback: T) -> Self
    where
        F: std::future::Future<Output = T> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(future),
            fallback,
        }
    }

    /// Wait for the result
    pub async fn join(self) -> T {
        let Task { handle, fallback } = self;
        match handle.await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Assistant task did not complete");
                fallback
            }
        }
    }

    /// Run `callback` with the result once it is ready.
    ///
    /// The callback runs on a runtime worker, not on the caller's thread;
    /// UI code should only use it to post the value back to its own loop.
    pub fn then<C>(self, callback: C) -> JoinHandle<()>
    where
        C: FnOnce(T) + Send + 'static,
    {
        tokio::spawn(async move { callback(self.join().await) })
    }
}
