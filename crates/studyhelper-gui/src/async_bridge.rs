//! Async runtime bridge for running HTTP work behind the egui frame loop.

use std::future::Future;

use tokio::runtime::Runtime;

use crate::state::ResponseSlot;

/// Bridge between the tokio runtime and egui. Views hand it a future plus a
/// [`ResponseSlot`]; the result shows up in the slot for the next frame.
pub struct AsyncBridge {
    /// Tokio runtime for async operations (wrapped in Option for clean shutdown).
    runtime: Option<Runtime>,
}

impl AsyncBridge {
    pub fn new() -> Self {
        let runtime = Runtime::new().expect("Failed to create tokio runtime");
        Self {
            runtime: Some(runtime),
        }
    }

    /// Get the runtime handle for spawning tasks.
    pub fn runtime(&self) -> &Runtime {
        self.runtime.as_ref().expect("Runtime has been shut down")
    }

    /// Run a request in the background, posting its result into the slot.
    pub fn spawn<T, F>(&self, slot: ResponseSlot<T>, future: F)
    where
        T: Send + 'static,
        F: Future<Output = Result<T, String>> + Send + 'static,
    {
        self.runtime().spawn(async move {
            slot.post(future.await);
        });
    }
}

impl Default for AsyncBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncBridge {
    fn drop(&mut self) {
        // Shutdown the runtime without blocking
        // This prevents the "Cannot drop a runtime in a context where blocking is not allowed" panic
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
