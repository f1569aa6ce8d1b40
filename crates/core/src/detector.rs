//! `CallDetector` facade: subscription lifecycle around the engine task.

use crate::config::DetectorConfig;
use crate::engine::Engine;
use crate::error::{DetectError, Result};
use crate::notifier::{ChangeNotifier, StatusCallback};
use crate::platform::PlatformRef;
use crate::query::StatusQuery;
use crate::signal::{select_source, SignalKind, SignalSink};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

struct RunningEngine {
    sink: SignalSink,
    task: JoinHandle<()>,
    kind: SignalKind,
}

impl RunningEngine {
    /// Ask the engine to release its resources and wait until it has.
    async fn shutdown(self) {
        let (ack, done) = oneshot::channel();
        if self.sink.shutdown(ack) {
            let _ = done.await;
        }
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!("engine task panicked: {:?}", e);
            }
        }
    }
}

/// Monitors call state on one platform.
///
/// `start` and `stop` are async because they hand work to and from the
/// engine task; `current_status` stays synchronous.
pub struct CallDetector {
    platform: PlatformRef,
    config: DetectorConfig,
    query: StatusQuery,
    running: Mutex<Option<RunningEngine>>,
}

impl CallDetector {
    pub fn new(platform: PlatformRef, config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            query: StatusQuery::new(Arc::clone(&platform)),
            platform,
            config,
            running: Mutex::new(None),
        })
    }

    pub fn with_defaults(platform: PlatformRef) -> Self {
        Self {
            query: StatusQuery::new(Arc::clone(&platform)),
            platform,
            config: DetectorConfig::default(),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Begin monitoring.
    ///
    /// `callback` receives the current status once, synchronously, then only
    /// real changes. A running subscription is stopped first.
    pub async fn start(&self, callback: StatusCallback) -> Result<()> {
        let runtime = Handle::try_current().map_err(|_| DetectError::NoRuntime)?;

        let mut running = self.running.lock().await;
        if let Some(previous) = running.take() {
            tracing::debug!("replacing running subscription");
            previous.shutdown().await;
        }

        let initial = self.query.current_status();
        let mut notifier = ChangeNotifier::default();
        notifier.start(callback, initial);

        let source = select_source(Arc::clone(&self.platform), &self.config);
        let kind = source.kind();
        let mut engine = Engine::new(source, self.config.clone(), notifier, initial);
        engine.boot();

        let sink = engine.sink();
        let task = runtime.spawn(engine.run());
        *running = Some(RunningEngine { sink, task, kind });

        tracing::info!(?kind, initial, "call detection started");
        Ok(())
    }

    /// End monitoring and release every platform resource. Idempotent.
    pub async fn stop(&self) {
        let Some(engine) = self.running.lock().await.take() else {
            tracing::debug!("stop called while not running");
            return;
        };
        engine.shutdown().await;
        tracing::info!("call detection stopped");
    }

    /// Fresh snapshot from the platform. Never disturbs a running subscription.
    pub fn current_status(&self) -> bool {
        self.query.current_status()
    }

    pub async fn is_running(&self) -> bool {
        self.running
            .lock()
            .await
            .as_ref()
            .is_some_and(|engine| !engine.task.is_finished())
    }

    /// Signal source of the running subscription, if any.
    pub async fn signal_kind(&self) -> Option<SignalKind> {
        self.running.lock().await.as_ref().map(|engine| engine.kind)
    }
}

impl Drop for CallDetector {
    fn drop(&mut self) {
        // Best effort: the engine releases platform resources on its own task.
        if let Some(engine) = self.running.get_mut().take() {
            let (ack, _done) = oneshot::channel();
            engine.sink.shutdown(ack);
        }
    }
}
