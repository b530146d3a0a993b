//! Mock adapters shared by the runtime's tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use switchboard_core::{
    Adapter, AdapterError, AdapterResult, CancellationToken, Event, EventSender, Response,
};
use tokio::sync::Notify;

use crate::reporter::{AdapterOperation, ErrorReporter};

/// Pushes scripted texts on start and records every response it receives.
pub struct RecordingAdapter {
    name: String,
    script: Vec<String>,
    session_id: Option<String>,
    fail_sends: bool,
    responses: Mutex<Vec<Response>>,
    received: Notify,
    pub closed: AtomicBool,
}

impl RecordingAdapter {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            script: Vec::new(),
            session_id: None,
            fail_sends: false,
            responses: Mutex::new(Vec::new()),
            received: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn script<I, S>(mut self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.script = texts.into_iter().map(Into::into).collect();
        self
    }

    pub fn session_id(mut self, id: &str) -> Self {
        self.session_id = Some(id.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses.lock().clone()
    }

    /// Waits until at least `count` responses were recorded.
    pub async fn wait_for(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let notified = self.received.notified();
                if self.responses.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await
        .expect("timed out waiting for responses");
    }
}

#[async_trait]
impl Adapter for RecordingAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self, cancel: CancellationToken, events: EventSender) -> AdapterResult<()> {
        for text in &self.script {
            let mut event = events.new_event();
            event.event_type = Event::MESSAGE.to_string();
            event.platform = self.name.clone();
            event.set_text(text.as_str());
            if let Some(id) = &self.session_id {
                event
                    .data
                    .insert(Event::SESSION_KEY.to_string(), id.as_str().into());
            }
            events.send(event).await?;
        }
        cancel.cancelled().await;
        Ok(())
    }

    async fn send_response(
        &self,
        _cancel: CancellationToken,
        response: Response,
    ) -> AdapterResult<()> {
        if self.fail_sends {
            return Err(AdapterError::send("connection reset"));
        }
        self.responses.lock().push(response);
        self.received.notify_waiters();
        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// An adapter whose ingestion loop fails immediately.
pub struct BrokenAdapter;

#[async_trait]
impl Adapter for BrokenAdapter {
    fn name(&self) -> &str {
        "broken"
    }

    async fn start(&self, _cancel: CancellationToken, _events: EventSender) -> AdapterResult<()> {
        Err(AdapterError::Connection("refused".into()))
    }

    async fn send_response(
        &self,
        _cancel: CancellationToken,
        _response: Response,
    ) -> AdapterResult<()> {
        Ok(())
    }
}

/// Collects reported failures.
#[derive(Default)]
pub struct CollectingReporter {
    pub reports: Mutex<Vec<(String, AdapterOperation, String)>>,
}

impl ErrorReporter for CollectingReporter {
    fn report(&self, adapter: &str, operation: AdapterOperation, error: &AdapterError) {
        self.reports
            .lock()
            .push((adapter.to_string(), operation, error.to_string()));
    }
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
