//! ---
//! volta_section: "01-core-functionality"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "Per-observer session registry and streaming scheduler."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
//! Each observer owns at most one [`SimulationSession`], driven by its own
//! tokio task. The task multiplexes the tick timer, the duration deadline and
//! a cancellation channel. Every read or write of a session happens under
//! that session's mutex, and stopping flips the session to `Stopped` while
//! holding it, so a tick that loses the race sees a stopped session and
//! delivers nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use volta_sim::{
    ComponentId, NoiseFactory, Properties, SessionCommand, SessionOutcome, SimError,
    SimulationSession,
};

use crate::errors::{EngineError, Result};
use crate::protocol::{ObserverId, ServerMessage, SimulationEvent, StreamConfig, StreamOverrides};
use crate::scheduling::RateLimiter;
use crate::store::DesignStore;

/// Outbound queue towards one observer.
pub type ObserverSink = mpsc::Sender<ServerMessage>;

/// Cloneable handle to the shared registry.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    store: Arc<dyn DesignStore>,
    noise: NoiseFactory,
    defaults: StreamConfig,
    sessions: Mutex<HashMap<ObserverId, SessionHandle>>,
    generations: AtomicU64,
}

struct SessionHandle {
    generation: u64,
    design_id: Uuid,
    session: Arc<Mutex<SimulationSession>>,
    sink: ObserverSink,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Teardown {
    Stop,
    Expired,
    Disconnect,
}

impl Teardown {
    fn notifies_observer(self) -> bool {
        !matches!(self, Teardown::Disconnect)
    }
}

enum TickOutcome {
    Delivered,
    Dropped,
    Halted,
    ObserverGone,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("defaults", &self.inner.defaults)
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn DesignStore>, noise: NoiseFactory, defaults: StreamConfig) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                store,
                noise,
                defaults,
                sessions: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    pub fn defaults(&self) -> StreamConfig {
        self.inner.defaults
    }

    pub fn active_sessions(&self) -> usize {
        self.inner.sessions.lock().len()
    }

    pub fn is_active(&self, observer: ObserverId) -> bool {
        self.inner.sessions.lock().contains_key(&observer)
    }

    /// Start streaming `design_id` to `observer`, replacing any session the
    /// observer already has. Returns the effective cadence.
    ///
    /// An unknown design or an invalid config leaves an existing session
    /// untouched.
    pub fn start(
        &self,
        observer: ObserverId,
        sink: ObserverSink,
        design_id: Uuid,
        overrides: Option<StreamOverrides>,
    ) -> Result<StreamConfig> {
        let config = overrides
            .unwrap_or_default()
            .resolve(self.inner.defaults)?;
        let design = self
            .inner
            .store
            .get_design(design_id)
            .ok_or(EngineError::DesignNotFound(design_id))?;

        let mut session = SimulationSession::from_design(&design, (self.inner.noise)());
        session.apply(SessionCommand::Start)?;
        let session = Arc::new(Mutex::new(session));
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel_tx, cancel_rx) = watch::channel(false);

        // The map lock spans spawn and insert so an early expiry cannot run
        // before the entry it has to remove exists.
        let replaced = {
            let mut sessions = self.inner.sessions.lock();
            let replaced = sessions.remove(&observer);
            if let Some(previous) = replaced.as_ref() {
                halt(previous);
            }
            if let Err(err) = sink.try_send(
                SimulationEvent::SimulationStarted { design_id, config }.into(),
            ) {
                warn!(%observer, design = %design_id, error = %err, "could not acknowledge session start");
            }
            let task = tokio::spawn(drive_session(
                Arc::downgrade(&self.inner),
                observer,
                generation,
                session.clone(),
                sink.clone(),
                config,
                cancel_rx,
            ));
            sessions.insert(
                observer,
                SessionHandle {
                    generation,
                    design_id,
                    session,
                    sink,
                    cancel: cancel_tx,
                    task,
                },
            );
            replaced
        };
        if let Some(previous) = replaced {
            log_stopped(observer, &previous, Teardown::Stop);
        }

        info!(
            %observer,
            design = %design_id,
            generation,
            tick_interval_ms = config.tick_interval_ms,
            duration_ms = config.duration_ms,
            "simulation session started"
        );
        Ok(config)
    }

    /// Stop the observer's session and emit `simulation_stopped`. Returns
    /// `false` when the observer had no session.
    pub fn stop(&self, observer: ObserverId) -> bool {
        let stopped = self.inner.remove_and_teardown(observer, None, Teardown::Stop);
        if !stopped {
            debug!(%observer, "stop ignored for observer without a session");
        }
        stopped
    }

    /// Same cleanup as [`stop`](Self::stop) without notifying the observer.
    pub fn disconnect(&self, observer: ObserverId) -> bool {
        self.inner
            .remove_and_teardown(observer, None, Teardown::Disconnect)
    }

    /// Merge `properties` into a component of the observer's working copy
    /// and acknowledge with `component_updated`. Unknown observers and
    /// components are ignored.
    pub fn update_component(
        &self,
        observer: ObserverId,
        component: ComponentId,
        properties: Properties,
    ) -> bool {
        let target = {
            let sessions = self.inner.sessions.lock();
            sessions
                .get(&observer)
                .map(|handle| (handle.session.clone(), handle.sink.clone()))
        };
        let Some((session, sink)) = target else {
            debug!(%observer, component, "update ignored for observer without a session");
            return false;
        };

        let mut session = session.lock();
        if !session.update_component(component, &properties) {
            debug!(%observer, component, "update ignored for unknown component");
            return false;
        }
        debug!(%observer, component, keys = properties.len(), "component properties merged");
        if let Err(err) = sink.try_send(
            SimulationEvent::ComponentUpdated {
                component_id: component,
                properties,
            }
            .into(),
        ) {
            warn!(%observer, component, error = %err, "could not acknowledge component update");
        }
        true
    }

    /// Stop every session and wait for their tasks to finish.
    pub async fn shutdown(&self) {
        let drained: Vec<_> = self.inner.sessions.lock().drain().collect();
        let count = drained.len();
        let tasks: Vec<_> = drained
            .into_iter()
            .map(|(observer, handle)| (observer, teardown(observer, handle, Teardown::Stop)))
            .collect();
        for (observer, task) in tasks {
            if let Err(err) = task.await {
                error!(%observer, error = %err, "session task join error");
            }
        }
        info!(sessions = count, "session registry shut down");
    }
}

impl RegistryInner {
    /// Remove the observer's entry, optionally only when it still belongs to
    /// `generation`, and tear it down.
    fn remove_and_teardown(
        &self,
        observer: ObserverId,
        generation: Option<u64>,
        reason: Teardown,
    ) -> bool {
        let removed = {
            let mut sessions = self.sessions.lock();
            match sessions.get(&observer) {
                Some(handle) if generation.map_or(true, |g| g == handle.generation) => {
                    sessions.remove(&observer)
                }
                _ => None,
            }
        };
        match removed {
            Some(handle) => {
                // Detached: the task exits on its own once cancelled.
                drop(teardown(observer, handle, reason));
                true
            }
            None => false,
        }
    }
}

fn teardown(observer: ObserverId, handle: SessionHandle, reason: Teardown) -> JoinHandle<()> {
    if reason.notifies_observer() {
        halt(&handle);
    } else {
        handle.session.lock().stop();
        let _ = handle.cancel.send(true);
    }
    log_stopped(observer, &handle, reason);
    handle.task
}

/// Flip the session to `Stopped`, cancel its task and tell the observer,
/// all under the session lock.
fn halt(handle: &SessionHandle) {
    let mut session = handle.session.lock();
    session.stop();
    let _ = handle.cancel.send(true);
    let _ = handle
        .sink
        .try_send(SimulationEvent::SimulationStopped.into());
}

fn log_stopped(observer: ObserverId, handle: &SessionHandle, reason: Teardown) {
    info!(
        %observer,
        design = %handle.design_id,
        generation = handle.generation,
        ?reason,
        "simulation session stopped"
    );
}

async fn drive_session(
    registry: Weak<RegistryInner>,
    observer: ObserverId,
    generation: u64,
    session: Arc<Mutex<SimulationSession>>,
    sink: ObserverSink,
    config: StreamConfig,
    mut cancel: watch::Receiver<bool>,
) {
    let started = Instant::now();
    let mut limiter = RateLimiter::new(config.tick_interval());
    let expiry = tokio::time::sleep_until(started + config.duration());
    tokio::pin!(expiry);

    let exit = loop {
        tokio::select! {
            biased;
            _ = cancel.changed() => break None,
            _ = &mut expiry => {
                info!(%observer, generation, duration_ms = config.duration_ms, "session duration elapsed");
                break Some(Teardown::Expired);
            }
            _ = limiter.tick() => {
                match deliver_tick(observer, &session, &sink, started) {
                    TickOutcome::Delivered | TickOutcome::Dropped => {}
                    TickOutcome::Halted => break None,
                    TickOutcome::ObserverGone => {
                        debug!(%observer, generation, "observer channel closed");
                        break Some(Teardown::Disconnect);
                    }
                }
            }
        }
    };

    if let (Some(reason), Some(registry)) = (exit, registry.upgrade()) {
        registry.remove_and_teardown(observer, Some(generation), reason);
    }
    debug!(%observer, generation, "session task finished");
}

fn deliver_tick(
    observer: ObserverId,
    session: &Mutex<SimulationSession>,
    sink: &ObserverSink,
    started: Instant,
) -> TickOutcome {
    let mut session = session.lock();
    let time_ms = started.elapsed().as_secs_f64() * 1000.0;
    let snapshot = match session.apply(SessionCommand::Simulate { time_ms }) {
        Ok(SessionOutcome::Snapshot(snapshot)) => snapshot,
        Ok(_) | Err(SimError::SessionNotActive(_)) => return TickOutcome::Halted,
        Err(err) => {
            warn!(%observer, error = %err, "tick failed");
            return TickOutcome::Halted;
        }
    };
    let step = snapshot.time_step;
    match sink.try_send(
        SimulationEvent::SimulationData { data: snapshot }.into(),
    ) {
        Ok(()) => TickOutcome::Delivered,
        Err(TrySendError::Full(_)) => {
            warn!(%observer, step, "observer buffer full, snapshot dropped");
            TickOutcome::Dropped
        }
        Err(TrySendError::Closed(_)) => TickOutcome::ObserverGone,
    }
}
