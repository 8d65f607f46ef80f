use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::core::observability;
use crate::log;
use crate::logging::LogLevel;

/// Fire-and-forget callback with a cancellation handle.
///
/// Dropping the task cancels it, so a holder that is torn down cannot leave
/// a callback behind.
#[derive(Debug)]
pub struct DeferredTask {
    handle: Option<JoinHandle<()>>,
}

impl DeferredTask {
    /// Runs `f` after `delay` on the current Tokio runtime. Returns `None`
    /// when called outside a runtime.
    pub fn schedule<F>(delay: Duration, f: F) -> Option<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            tokio::time::sleep(delay).await;
            f();
        })
    }

    fn spawn<Fut>(future: Fut) -> Option<Self>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(runtime) => Some(Self {
                handle: Some(runtime.spawn(future)),
            }),
            Err(e) => {
                log!(LogLevel::Error, "deferred task not scheduled: {e}");
                None
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map(JoinHandle::is_finished).unwrap_or(true)
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                observability::record_deferred_cancelled();
            }
            handle.abort();
        }
    }
}

impl Drop for DeferredTask {
    fn drop(&mut self) {
        self.cancel();
    }
}
