//! Advertising session state machine
//!
//! An [`AdvertisingSession`] owns one radio and drives it through
//! `Idle -> Starting -> Running -> Stopping -> Idle`, with `Running -> Failed -> Idle` and
//! `Running -> TimedOut -> Idle` for lost advertisements and elapsed deadlines.
//!
//! ## Concurrency
//!
//! Every transition happens under a single mutex that is never held across an await.
//! Radio calls run on a dedicated task fed by an unbounded command queue, so `start` and
//! `stop` return immediately and the radio sees calls in request order. Each start bumps
//! an epoch; completions, timer expiries and faults carry the epoch they were issued
//! under and are dropped unless both the epoch and the state still match.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use beaconcast_core::{
    encode, AdvertisementPayload, ErrorCode, PacketType, SessionEvent, SessionState,
    StructRecord, Timestamp,
};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::advertising::{Advertiser, FaultReporter};
use crate::config::{AdvertiseSettings, SessionConfig};
use crate::error::{SessionError, StartError};
use crate::notifier::{EventNotifier, ObserverId, SessionObserver};

// ----------------------------------------------------------------------------
// Radio Commands
// ----------------------------------------------------------------------------

#[derive(Debug)]
enum RadioCommand {
    Start {
        epoch: u64,
        payload: AdvertisementPayload,
        settings: AdvertiseSettings,
    },
    Stop {
        epoch: u64,
    },
}

// ----------------------------------------------------------------------------
// Session State
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct SessionData {
    state: SessionState,
    epoch: u64,
    payload: Option<AdvertisementPayload>,
    last_error: Option<ErrorCode>,
    started_at: Option<Timestamp>,
    deadline: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

impl SessionData {
    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        self.deadline = None;
    }

    fn clear_active(&mut self) {
        self.disarm_timer();
        self.payload = None;
        self.started_at = None;
    }
}

struct SessionInner {
    data: Mutex<SessionData>,
    state_tx: watch::Sender<SessionState>,
    commands: mpsc::UnboundedSender<RadioCommand>,
    notifier: EventNotifier,
    config: SessionConfig,
    runtime: Handle,
}

impl SessionInner {
    fn lock(&self) -> MutexGuard<'_, SessionData> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Move to `state` and publish `event`; callers hold the data lock
    fn transition(&self, data: &mut SessionData, state: SessionState, event: SessionEvent) {
        debug!("Session {} -> {}", data.state, state);
        data.state = state;
        self.state_tx.send_replace(state);
        self.notifier.publish(event);
    }

    fn enter(&self, data: &mut SessionData, state: SessionState) {
        self.transition(data, state, SessionEvent::state_changed(state));
    }

    fn send(&self, command: RadioCommand) -> Result<(), SessionError> {
        self.commands.send(command).map_err(|_| {
            error!("Radio task has stopped; command dropped");
            SessionError::RadioUnavailable
        })
    }

    fn on_start_complete(self: &Arc<Self>, epoch: u64, result: Result<(), ErrorCode>) {
        let mut data = self.lock();
        if data.epoch != epoch || data.state != SessionState::Starting {
            debug!(
                "Discarding stale start completion (epoch {}, current {} in {})",
                epoch, data.epoch, data.state
            );
            return;
        }

        match result {
            Ok(()) => {
                data.started_at = Some(Timestamp::now());
                if let Some(timeout) = self.config.timeout {
                    match Instant::now().checked_add(timeout) {
                        Some(deadline) => {
                            data.deadline = Some(deadline);
                            data.timer = Some(self.arm_timer(epoch, timeout));
                        }
                        None => warn!(
                            "Timeout of {:?} is beyond the clock range; advertising until stopped",
                            timeout
                        ),
                    }
                }
                self.enter(&mut data, SessionState::Running);
                info!("Advertising started");
            }
            Err(code) => {
                warn!("Radio rejected advertisement: {} ({})", code.name(), code.as_i32());
                data.clear_active();
                data.last_error = Some(code);
                self.transition(&mut data, SessionState::Idle, SessionEvent::failed(code));
            }
        }
    }

    fn on_stop_complete(&self, epoch: u64) {
        let mut data = self.lock();
        if data.epoch != epoch || data.state != SessionState::Stopping {
            debug!("Discarding stale stop acknowledgement (epoch {})", epoch);
            return;
        }
        self.enter(&mut data, SessionState::Idle);
        info!("Advertising stopped");
    }

    fn on_timeout(&self, epoch: u64) {
        let mut data = self.lock();
        if data.epoch != epoch || data.state != SessionState::Running {
            debug!("Discarding stale timeout (epoch {})", epoch);
            return;
        }

        // Running on the timer task itself, so release the handle without aborting.
        data.timer = None;
        data.clear_active();
        data.last_error = Some(ErrorCode::TimedOut);
        let _ = self.send(RadioCommand::Stop { epoch });

        self.transition(&mut data, SessionState::TimedOut, SessionEvent::timed_out());
        self.enter(&mut data, SessionState::Idle);
        info!("Advertising timed out");
    }

    fn on_fault(&self, epoch: u64, code: ErrorCode) {
        let mut data = self.lock();
        if data.epoch != epoch || data.state != SessionState::Running {
            debug!("Discarding stale radio fault {} (epoch {})", code.name(), epoch);
            return;
        }

        warn!("Radio lost advertisement: {} ({})", code.name(), code.as_i32());
        data.clear_active();
        data.last_error = Some(code);
        let _ = self.send(RadioCommand::Stop { epoch });

        self.transition(&mut data, SessionState::Failed, SessionEvent::failed(code));
        self.enter(&mut data, SessionState::Idle);
    }

    fn arm_timer(self: &Arc<Self>, epoch: u64, timeout: Duration) -> JoinHandle<()> {
        let session = Arc::downgrade(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(session) = session.upgrade() {
                session.on_timeout(epoch);
            }
        })
    }

    fn fault_reporter(session: &Weak<Self>, epoch: u64) -> FaultReporter {
        let session = session.clone();
        FaultReporter::new(move |code| {
            if let Some(session) = session.upgrade() {
                session.on_fault(epoch, code);
            }
        })
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        let data = self
            .data
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        data.disarm_timer();
    }
}

// ----------------------------------------------------------------------------
// Radio Task
// ----------------------------------------------------------------------------

async fn run_radio(
    mut advertiser: Box<dyn Advertiser>,
    mut commands: mpsc::UnboundedReceiver<RadioCommand>,
    session: Weak<SessionInner>,
) {
    debug!("Radio task started ({})", advertiser.name());

    while let Some(command) = commands.recv().await {
        match command {
            RadioCommand::Start {
                epoch,
                payload,
                settings,
            } => {
                debug!("Radio start (epoch {}): {}", epoch, payload);
                let faults = SessionInner::fault_reporter(&session, epoch);
                let result = advertiser.start_advertising(&payload, &settings, faults).await;
                match session.upgrade() {
                    Some(session) => session.on_start_complete(epoch, result),
                    None => break,
                }
            }
            RadioCommand::Stop { epoch } => {
                debug!("Radio stop (epoch {})", epoch);
                advertiser.stop_advertising().await;
                match session.upgrade() {
                    Some(session) => session.on_stop_complete(epoch),
                    None => break,
                }
            }
        }
    }

    if advertiser.is_advertising() {
        advertiser.stop_advertising().await;
    }
    debug!("Radio task stopped ({})", advertiser.name());
}

// ----------------------------------------------------------------------------
// Advertising Session
// ----------------------------------------------------------------------------

/// Handle to an advertising session
///
/// Clones share the same session. The radio is stopped once the last handle is dropped.
#[derive(Clone)]
pub struct AdvertisingSession {
    inner: Arc<SessionInner>,
}

impl AdvertisingSession {
    /// Create a session with the default configuration
    pub fn new(advertiser: impl Advertiser + 'static) -> Result<Self, SessionError> {
        Self::with_config(advertiser, SessionConfig::default())
    }

    /// Create a session; must be called from within a Tokio runtime
    pub fn with_config(
        advertiser: impl Advertiser + 'static,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let runtime = Handle::try_current().map_err(|_| SessionError::NoRuntime)?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(SessionState::Idle);

        let inner = Arc::new(SessionInner {
            data: Mutex::new(SessionData {
                state: SessionState::Idle,
                epoch: 0,
                payload: None,
                last_error: None,
                started_at: None,
                deadline: None,
                timer: None,
            }),
            state_tx,
            commands,
            notifier: EventNotifier::new(&runtime),
            config,
            runtime: runtime.clone(),
        });

        runtime.spawn(run_radio(
            Box::new(advertiser),
            command_rx,
            Arc::downgrade(&inner),
        ));

        Ok(Self { inner })
    }

    /// Encode `records` and start advertising them
    ///
    /// Encoding errors are returned before the radio is involved.
    pub fn start(
        &self,
        packet_type: PacketType,
        records: &[StructRecord],
    ) -> Result<(), StartError> {
        let payload = encode(packet_type, records)?;
        self.start_payload(payload)?;
        Ok(())
    }

    /// Start advertising an already encoded payload
    pub fn start_payload(&self, payload: AdvertisementPayload) -> Result<(), SessionError> {
        let inner = &self.inner;
        let mut data = inner.lock();
        match data.state {
            SessionState::Starting | SessionState::Running => {
                return Err(SessionError::AlreadyStarted)
            }
            SessionState::Stopping => return Err(SessionError::StopInProgress),
            SessionState::Idle | SessionState::Failed | SessionState::TimedOut => {}
        }

        let epoch = data.epoch + 1;
        inner.send(RadioCommand::Start {
            epoch,
            payload: payload.clone(),
            settings: inner.config.settings,
        })?;

        data.epoch = epoch;
        data.payload = Some(payload);
        inner.enter(&mut data, SessionState::Starting);
        Ok(())
    }

    /// Stop advertising
    ///
    /// No-op when idle or already stopping.
    pub fn stop(&self) {
        let inner = &self.inner;
        let mut data = inner.lock();
        if !matches!(data.state, SessionState::Starting | SessionState::Running) {
            debug!("Stop ignored in state {}", data.state);
            return;
        }

        data.clear_active();
        let epoch = data.epoch;
        inner.enter(&mut data, SessionState::Stopping);

        if inner.send(RadioCommand::Stop { epoch }).is_err() {
            inner.enter(&mut data, SessionState::Idle);
        }
    }

    /// Whether the radio has confirmed the advertisement is on air
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Code of the most recent failure or timeout
    pub fn last_error(&self) -> Option<ErrorCode> {
        self.inner.lock().last_error
    }

    /// When the current advertisement went on air
    pub fn started_at(&self) -> Option<Timestamp> {
        self.inner.lock().started_at
    }

    /// Payload of the current start, from `Starting` until the session leaves `Running`
    pub fn active_payload(&self) -> Option<AdvertisementPayload> {
        self.inner.lock().payload.clone()
    }

    /// When the running advertisement will time out
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.lock().deadline
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Wait until the session reaches `state`
    ///
    /// Returns immediately if it is already there. `Failed` and `TimedOut` are passed
    /// through within a single transition and are generally not observable here; watch
    /// events for those instead.
    pub async fn wait_for_state(&self, state: SessionState) {
        let mut states = self.inner.state_tx.subscribe();
        let _ = states.wait_for(|current| *current == state).await;
    }

    pub fn notifier(&self) -> &EventNotifier {
        &self.inner.notifier
    }

    pub fn subscribe(&self, observer: impl SessionObserver + 'static) -> ObserverId {
        self.inner.notifier.subscribe(observer)
    }

    pub fn subscribe_channel(&self) -> (ObserverId, mpsc::UnboundedReceiver<SessionEvent>) {
        self.inner.notifier.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.inner.notifier.unsubscribe(id)
    }
}

impl std::fmt::Debug for AdvertisingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data = self.inner.lock();
        f.debug_struct("AdvertisingSession")
            .field("state", &data.state)
            .field("epoch", &data.epoch)
            .field("last_error", &data.last_error)
            .finish()
    }
}
