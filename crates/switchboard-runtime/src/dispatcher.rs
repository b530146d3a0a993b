//! Response fan-out.
//!
//! ```text
//!                       ┌──▶ adapter A.send_response(copy)
//!   Response ──dispatch─┼──▶ adapter B.send_response(copy)
//!                       └──▶ adapter C.send_response(copy)
//! ```
//!
//! Every delivery runs on its own task, so a slow or failing adapter never
//! delays the others or the engine loop that called [`dispatch`].
//!
//! [`dispatch`]: ResponseDispatcher::dispatch

use std::sync::Arc;

use switchboard_core::{CancellationToken, Response};
use tokio_util::task::TaskTracker;
use tracing::trace;

use crate::adapter::AdapterManager;
use crate::reporter::{AdapterOperation, BoxedReporter};

/// Delivers responses to every registered adapter.
pub struct ResponseDispatcher {
    adapters: Arc<AdapterManager>,
    reporter: BoxedReporter,
    tracker: TaskTracker,
}

impl ResponseDispatcher {
    pub fn new(adapters: Arc<AdapterManager>, reporter: BoxedReporter) -> Self {
        Self {
            adapters,
            reporter,
            tracker: TaskTracker::new(),
        }
    }

    /// Starts one delivery per adapter and returns without waiting.
    ///
    /// Each adapter gets its own copy of `response`. Failures go to the
    /// error reporter.
    pub fn dispatch(&self, cancel: &CancellationToken, response: Response) {
        let adapters = self.adapters.all();
        trace!(
            adapters = adapters.len(),
            response_type = %response.response_type,
            "Dispatching response"
        );

        for adapter in adapters {
            let reporter = Arc::clone(&self.reporter);
            let cancel = cancel.clone();
            let response = response.clone();
            self.tracker.spawn(async move {
                if let Err(err) = adapter.send_response(cancel, response).await {
                    reporter.report(adapter.name(), AdapterOperation::SendResponse, &err);
                }
            });
        }
    }

    /// Number of deliveries still running.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Waits for every delivery started so far.
    ///
    /// Later calls to [`dispatch`](Self::dispatch) are still accepted.
    pub async fn wait(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

impl std::fmt::Debug for ResponseDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseDispatcher")
            .field("adapters", &self.adapters.len())
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{CollectingReporter, RecordingAdapter, shared};

    fn dispatcher(
        adapters: &[Arc<RecordingAdapter>],
    ) -> (ResponseDispatcher, Arc<CollectingReporter>) {
        let manager = Arc::new(AdapterManager::new());
        for adapter in adapters {
            manager.register(adapter.clone());
        }
        let reporter = shared(CollectingReporter::default());
        let dispatcher = ResponseDispatcher::new(manager, reporter.clone());
        (dispatcher, reporter)
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let failing = shared(RecordingAdapter::new("x").failing());
        let healthy = shared(RecordingAdapter::new("y"));
        let (dispatcher, reporter) = dispatcher(&[Arc::clone(&failing), Arc::clone(&healthy)]);

        dispatcher.dispatch(&CancellationToken::new(), Response::text("pong"));
        dispatcher.wait().await;

        assert_eq!(healthy.responses(), vec![Response::text("pong")]);
        assert!(failing.responses().is_empty());

        let reports = reporter.reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, "x");
        assert_eq!(reports[0].1, AdapterOperation::SendResponse);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_every_adapter_gets_a_copy() {
        let adapters: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|name| shared(RecordingAdapter::new(name)))
            .collect();
        let (dispatcher, reporter) = dispatcher(&adapters);

        let response = Response::text("hi").with_metadata("origin", "test");
        dispatcher.dispatch(&CancellationToken::new(), response.clone());
        dispatcher.dispatch(&CancellationToken::new(), response.clone());
        dispatcher.wait().await;

        for adapter in &adapters {
            assert_eq!(adapter.responses(), vec![response.clone(), response.clone()]);
        }
        assert!(reporter.reports.lock().is_empty());
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_dispatch_after_wait() {
        let adapter = shared(RecordingAdapter::new("a"));
        let (dispatcher, _) = dispatcher(&[Arc::clone(&adapter)]);

        dispatcher.wait().await;
        dispatcher.dispatch(&CancellationToken::new(), Response::text("late"));
        dispatcher.wait().await;

        assert_eq!(adapter.responses().len(), 1);
    }

    #[tokio::test]
    async fn test_no_adapters() {
        let (dispatcher, _) = dispatcher(&[]);
        dispatcher.dispatch(&CancellationToken::new(), Response::text("void"));
        dispatcher.wait().await;
    }
}
