//! Adapters for the console demo.

use async_trait::async_trait;
use serde_json::Value;
use switchboard::prelude::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};

/// Payload key carrying the name of the person typing.
pub const USER_KEY: &str = "user";

/// Reads commands from stdin and prints responses to stdout.
///
/// Every line becomes one message event in the session of `user`. When stdin
/// reaches end of file, `on_eof` is cancelled so piped input shuts the bot
/// down once it has been answered.
pub struct ConsoleAdapter {
    user: String,
    on_eof: CancellationToken,
}

impl ConsoleAdapter {
    pub fn new(user: impl Into<String>, on_eof: CancellationToken) -> Self {
        Self {
            user: user.into(),
            on_eof,
        }
    }

    fn event_for(&self, events: &EventSender, line: String) -> Event {
        let mut event = events.new_event();
        event.event_type = Event::MESSAGE.to_string();
        event.platform = self.name().to_string();
        event.set_text(line);
        event
            .data
            .insert(Event::SESSION_KEY.to_string(), Value::from(self.user.as_str()));
        event
            .data
            .insert(USER_KEY.to_string(), Value::from(self.user.as_str()));
        event
    }
}

#[async_trait]
impl Adapter for ConsoleAdapter {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self, cancel: CancellationToken, events: EventSender) -> AdapterResult<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                _ = cancel.cancelled() => break,
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                debug!("stdin closed");
                self.on_eof.cancel();
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            events.send(self.event_for(&events, line)).await?;
        }
        Ok(())
    }

    async fn send_response(
        &self,
        _cancel: CancellationToken,
        response: Response,
    ) -> AdapterResult<()> {
        let body = match (&response.response_type, response.as_text()) {
            (ResponseType::Text, Some(text)) => format!("{text}\n"),
            (ResponseType::Error, Some(text)) => format!("error: {text}\n"),
            (kind, _) => format!("[{kind}] {}\n", response.data),
        };

        let mut stdout = tokio::io::stdout();
        stdout.write_all(body.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Logs every response it is handed. Produces no events.
pub struct LogAdapter;

#[async_trait]
impl Adapter for LogAdapter {
    fn name(&self) -> &str {
        "log"
    }

    async fn start(&self, cancel: CancellationToken, _events: EventSender) -> AdapterResult<()> {
        cancel.cancelled().await;
        Ok(())
    }

    async fn send_response(
        &self,
        _cancel: CancellationToken,
        response: Response,
    ) -> AdapterResult<()> {
        info!(
            response_type = %response.response_type,
            data = %response.data,
            "Response delivered"
        );
        Ok(())
    }

    async fn close(&self) -> AdapterResult<()> {
        debug!("Log adapter closed");
        Ok(())
    }
}
