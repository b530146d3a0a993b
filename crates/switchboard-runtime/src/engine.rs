//! The engine: queues, pools and the central routing loop.
//!
//! ```text
//!  adapters ──▶ event queue ──┐
//!                             ▼
//!                      ┌─────────────┐  submit   ┌─────────────┐
//!   cancel ──────────▶ │ engine loop │ ────────▶ │ worker pool │ ── process ──┐
//!                      └─────────────┘           └─────────────┘              │
//!                             ▲                                               │
//!  adapters ◀── fan-out ◀─────┴──────────── response queue ◀──────────────────┘
//! ```
//!
//! The loop only routes. Processing happens on pool workers and every
//! delivery runs on its own task, so a slow handler or adapter never stalls
//! intake.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchboard_runtime::Engine;
//!
//! let engine = Engine::builder().worker_pool_size(8).build()?;
//! engine.register_plugin(Arc::new(AdminPlugin), &[logging_middleware()]);
//! engine.register_adapter(Arc::new(ConsoleAdapter::new()));
//! engine.run_until_signal().await?;
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use switchboard_core::{BoxedAdapter, CancellationToken, Event, EventSender, Pool, Response};
use switchboard_framework::{
    BoxedPlugin, CommandRegistry, EventProcessor, Middleware, PluginManager,
};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::adapter::AdapterManager;
use crate::config::{ConfigLoader, EngineConfig, validate_config};
use crate::dispatcher::ResponseDispatcher;
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::reporter::{AdapterOperation, BoxedReporter, TracingReporter};
use crate::session::SessionStore;
use crate::worker_pool::{TaskPermit, WorkerPool};

/// How long adapters get to return from `start` after cancellation.
const ADAPTER_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Lifecycle of an [`Engine`]. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Created,
    Running,
    Stopping,
    Stopped,
}

impl EngineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

type Receivers = (mpsc::Receiver<Event>, mpsc::Receiver<Response>);

/// Routes events from adapters through commands and back out.
///
/// An engine is built once, runs once, and is then finished. Several engines
/// can live in one process; nothing is global.
pub struct Engine {
    config: EngineConfig,
    state: Mutex<EngineState>,
    plugins: PluginManager,
    adapters: Arc<AdapterManager>,
    processor: Arc<EventProcessor>,
    workers: WorkerPool,
    dispatcher: ResponseDispatcher,
    sessions: Arc<SessionStore>,
    event_pool: Arc<Pool<Event>>,
    event_tx: mpsc::Sender<Event>,
    response_tx: mpsc::Sender<Response>,
    receivers: Mutex<Option<Receivers>>,
    reporter: BoxedReporter,
}

impl Engine {
    /// Creates an engine builder.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let engine = Engine::builder()
    ///     .config_file("config/switchboard.toml")
    ///     .command_prefix("!")
    ///     .build()?;
    /// ```
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Creates an engine from an already loaded configuration.
    ///
    /// Initializes logging from `config.logging` unless a subscriber is
    /// already installed.
    pub fn from_config(config: EngineConfig) -> RuntimeResult<Self> {
        validate_config(&config)?;
        logging::init_from_config(&config.logging);
        Ok(Self::assemble(config, Arc::new(TracingReporter)))
    }

    fn assemble(config: EngineConfig, reporter: BoxedReporter) -> Self {
        let registry = Arc::new(CommandRegistry::new());
        let adapters = Arc::new(AdapterManager::new());
        let (event_tx, event_rx) = mpsc::channel(config.event_queue_capacity);
        let (response_tx, response_rx) = mpsc::channel(config.response_queue_capacity);

        info!(
            workers = config.worker_pool_size,
            event_queue = config.event_queue_capacity,
            response_queue = config.response_queue_capacity,
            prefix = %config.command_prefix,
            "Engine created"
        );

        Self {
            plugins: PluginManager::new(Arc::clone(&registry)),
            processor: Arc::new(EventProcessor::new(registry, config.command_prefix.clone())),
            workers: WorkerPool::new(config.worker_pool_size, config.worker_queue_capacity),
            dispatcher: ResponseDispatcher::new(Arc::clone(&adapters), Arc::clone(&reporter)),
            sessions: Arc::new(SessionStore::new(
                config.session_ttl(),
                config.session_pool_capacity,
            )),
            event_pool: Arc::new(Pool::new(config.event_pool_capacity)),
            state: Mutex::new(EngineState::Created),
            receivers: Mutex::new(Some((event_rx, response_rx))),
            adapters,
            event_tx,
            response_tx,
            reporter,
            config,
        }
    }

    /// Registers a plugin, wrapping its commands with `middlewares`.
    ///
    /// Returns `false` if a plugin with the same name is already registered.
    pub fn register_plugin(&self, plugin: BoxedPlugin, middlewares: &[Middleware]) -> bool {
        self.plugins.register(plugin, middlewares)
    }

    /// Registers an adapter.
    ///
    /// Adapters registered while the engine runs receive responses but are
    /// never started.
    pub fn register_adapter(&self, adapter: BoxedAdapter) {
        self.adapters.register(adapter);
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginManager {
        &self.plugins
    }

    pub fn adapters(&self) -> &Arc<AdapterManager> {
        &self.adapters
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        self.plugins.registry()
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// A producer for the event queue, for feeding events from outside an
    /// adapter.
    pub fn event_sender(&self) -> EventSender {
        EventSender::new(self.event_tx.clone(), Arc::clone(&self.event_pool))
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock() = state;
        debug!(state = %state, "Engine state changed");
    }

    /// Runs the engine until `cancel` fires, then shuts it down.
    ///
    /// Returns once every queued task has run, every pending response has
    /// been delivered and every adapter has been closed.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::AlreadyStarted`] if the engine has run before.
    pub async fn run(&self, cancel: CancellationToken) -> RuntimeResult<()> {
        let Some((mut event_rx, mut response_rx)) = self.receivers.lock().take() else {
            return Err(RuntimeError::AlreadyStarted);
        };
        self.set_state(EngineState::Running);
        info!(
            adapters = self.adapters.len(),
            plugins = self.plugins.plugin_count(),
            commands = self.registry().len(),
            "Engine starting"
        );

        let ingest = self.start_adapters(&cancel);
        self.workers.start();

        let period = self.config.session_sweep_interval();
        let mut sweep = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // A queue slot is reserved before an event is taken off the event
        // queue, so the loop never waits on a full task queue while
        // responses pile up.
        let mut permit: Option<TaskPermit> = None;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(response) = response_rx.recv() => {
                    self.dispatcher.dispatch(&cancel, response);
                }
                reserved = self.workers.reserve(), if permit.is_none() => {
                    permit = Some(reserved);
                }
                Some(event) = event_rx.recv(), if permit.is_some() => {
                    if let Some(permit) = permit.take() {
                        self.submit_event(permit, &cancel, event);
                    }
                }
                _ = sweep.tick() => {
                    self.sessions.purge_expired(Instant::now());
                }
            }
        }
        drop(permit);

        self.shutdown(&cancel, event_rx, response_rx, ingest).await;
        Ok(())
    }

    /// Runs the engine until Ctrl+C or SIGTERM.
    pub async fn run_until_signal(&self) -> RuntimeResult<()> {
        let cancel = CancellationToken::new();
        let run = self.run(cancel.clone());
        tokio::pin!(run);

        info!("Engine is now running. Press Ctrl+C to stop.");
        let signal = tokio::select! {
            result = &mut run => return result,
            signal = wait_for_shutdown() => signal,
        };

        cancel.cancel();
        run.await?;
        signal.map_err(RuntimeError::from)
    }

    fn start_adapters(&self, cancel: &CancellationToken) -> JoinSet<()> {
        let mut ingest = JoinSet::new();
        for adapter in self.adapters.all() {
            let events = self.event_sender();
            let cancel = cancel.clone();
            let reporter = Arc::clone(&self.reporter);
            ingest.spawn(async move {
                info!(adapter = %adapter.name(), "Adapter started");
                match adapter.start(cancel, events).await {
                    Ok(()) => debug!(adapter = %adapter.name(), "Adapter ingestion finished"),
                    Err(err) => reporter.report(adapter.name(), AdapterOperation::Start, &err),
                }
            });
        }
        ingest
    }

    fn submit_event(&self, permit: TaskPermit, cancel: &CancellationToken, mut event: Event) {
        self.sessions.attach(&mut event);

        let span = info_span!(
            "process_event",
            platform = %event.platform,
            event_type = %event.event_type,
            session = event.session.as_ref().map_or("", |s| s.id.as_str()),
        );
        let processor = Arc::clone(&self.processor);
        let sessions = Arc::clone(&self.sessions);
        let event_pool = Arc::clone(&self.event_pool);
        let response_tx = self.response_tx.clone();
        let cancel = cancel.clone();

        permit.submit(
            async move {
                let event = Arc::new(event);
                let response = processor.process(&cancel, Arc::clone(&event)).await;
                if response.is_deliverable() {
                    if response_tx.send(response).await.is_err() {
                        warn!("Response queue closed, dropping response");
                    }
                } else {
                    debug!(response_type = %response.response_type, "Dropping response");
                }

                // A handler may still hold the event, e.g. in a spawned task.
                if let Ok(mut event) = Arc::try_unwrap(event) {
                    if let Some(session) = event.session.take() {
                        sessions.recycle(session);
                    }
                    event_pool.release(event);
                }
            }
            .instrument(span),
        );
    }

    async fn shutdown(
        &self,
        cancel: &CancellationToken,
        mut event_rx: mpsc::Receiver<Event>,
        mut response_rx: mpsc::Receiver<Response>,
        mut ingest: JoinSet<()>,
    ) {
        self.set_state(EngineState::Stopping);
        info!("Engine stopping");

        event_rx.close();
        let mut discarded = 0_usize;
        while let Ok(event) = event_rx.try_recv() {
            self.event_pool.release(event);
            discarded += 1;
        }
        if discarded > 0 {
            debug!(discarded, "Discarded unprocessed events");
        }

        // Workers may be waiting on a full response queue, so keep draining
        // it while they finish.
        {
            let stop = self.workers.stop();
            tokio::pin!(stop);
            loop {
                tokio::select! {
                    _ = &mut stop => break,
                    Some(response) = response_rx.recv() => {
                        self.dispatcher.dispatch(cancel, response);
                    }
                }
            }
        }
        response_rx.close();
        while let Ok(response) = response_rx.try_recv() {
            self.dispatcher.dispatch(cancel, response);
        }
        self.dispatcher.wait().await;

        let drained = tokio::time::timeout(ADAPTER_GRACE_PERIOD, async {
            while let Some(result) = ingest.join_next().await {
                if let Err(err) = result {
                    error!(error = %err, "Adapter task terminated abnormally");
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                remaining = ingest.len(),
                "Adapters ignored cancellation, aborting them"
            );
            ingest.shutdown().await;
        }

        for adapter in self.adapters.all() {
            if let Err(err) = adapter.close().await {
                self.reporter
                    .report(adapter.name(), AdapterOperation::Close, &err);
            }
        }

        self.set_state(EngineState::Stopped);
        info!("Engine stopped");
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state())
            .field("adapters", &self.adapters)
            .field("plugins", &self.plugins.plugin_names())
            .field("workers", &self.workers)
            .field("sessions", &self.sessions)
            .finish()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => {
                result?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// EngineBuilder
// =============================================================================

/// Builder for an [`Engine`].
///
/// Configuration comes from the config loader (files, then `SWITCHBOARD_*`
/// environment variables) unless [`config`](Self::config) supplies one.
/// The individual setters override either source.
pub struct EngineBuilder {
    config_loader: ConfigLoader,
    config: Option<EngineConfig>,
    event_queue_capacity: Option<usize>,
    response_queue_capacity: Option<usize>,
    worker_pool_size: Option<usize>,
    command_prefix: Option<String>,
    reporter: Option<BoxedReporter>,
    init_logging: bool,
}

impl EngineBuilder {
    /// Creates a builder that searches the current directory, then the user
    /// config directory, for config files.
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            config: None,
            event_queue_capacity: None,
            response_queue_capacity: None,
            worker_pool_size: None,
            command_prefix: None,
            reporter: None,
            init_logging: true,
        }
    }

    /// Uses `config` as-is instead of loading one.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.event_queue_capacity = Some(capacity);
        self
    }

    pub fn response_queue_capacity(mut self, capacity: usize) -> Self {
        self.response_queue_capacity = Some(capacity);
        self
    }

    pub fn worker_pool_size(mut self, size: usize) -> Self {
        self.worker_pool_size = Some(size);
        self
    }

    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = Some(prefix.into());
        self
    }

    /// Sets where adapter failures are reported. Defaults to
    /// [`TracingReporter`].
    pub fn error_reporter(mut self, reporter: BoxedReporter) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// Leaves the global `tracing` subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Builds the engine.
    pub fn build(self) -> RuntimeResult<Engine> {
        let mut config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };
        if let Some(capacity) = self.event_queue_capacity {
            config.event_queue_capacity = capacity;
        }
        if let Some(capacity) = self.response_queue_capacity {
            config.response_queue_capacity = capacity;
        }
        if let Some(size) = self.worker_pool_size {
            config.worker_pool_size = size;
        }
        if let Some(prefix) = self.command_prefix {
            config.command_prefix = prefix;
        }
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }
        let reporter = self.reporter.unwrap_or_else(|| Arc::new(TracingReporter));
        Ok(Engine::assemble(config, reporter))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
