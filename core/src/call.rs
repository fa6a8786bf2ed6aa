//! Call overlay state machine
//!
//! `idle -> ringing -> connected -> ended -> idle`. The two timed edges and
//! the connected-time tick run as tokio tasks whose handles are stored next to
//! the session. Every transition aborts the pending handles and bumps an
//! epoch; a task that already woke up re-checks the epoch under the lock, so a
//! superseded timer can never apply its transition.

use crate::models::{CallParticipant, CallSession, CallStatus, CallType};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTimings {
    /// Delay before a ringing call is considered answered.
    pub ringing: Duration,
    /// How long the "call ended" view stays up before returning to idle.
    pub ended: Duration,
    /// Period of the elapsed-time counter while connected.
    pub tick: Duration,
}

impl Default for CallTimings {
    fn default() -> Self {
        Self {
            ringing: Duration::from_secs(3),
            ended: Duration::from_secs(2),
            tick: Duration::from_secs(1),
        }
    }
}

#[derive(Default)]
struct Timers {
    ringing: Option<JoinHandle<()>>,
    ticker: Option<JoinHandle<()>>,
    hangup: Option<JoinHandle<()>>,
}

impl Timers {
    fn cancel_all(&mut self) {
        for handle in [self.ringing.take(), self.ticker.take(), self.hangup.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
        }
    }
}

struct State {
    session: CallSession,
    epoch: u64,
    timers: Timers,
}

struct Shared {
    state: Mutex<State>,
    updates: watch::Sender<CallSession>,
    timings: CallTimings,
}

impl Shared {
    fn publish(&self, session: &CallSession) {
        self.updates.send_replace(session.clone());
    }

    fn connect(shared: &Arc<Shared>, epoch: u64) {
        let mut state = shared.state.lock();
        if state.epoch != epoch || state.session.status != CallStatus::Ringing {
            return;
        }

        // This runs inside the ringing task itself; just detach its handle.
        state.timers.ringing.take();
        state.epoch += 1;
        state.session.status = CallStatus::Connected;
        state.session.elapsed_seconds = 0;

        let tick_epoch = state.epoch;
        let period = shared.timings.tick;
        let ticker_shared = shared.clone();
        state.timers.ticker = Some(tokio::spawn(async move {
            let mut interval = interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if !Shared::tick(&ticker_shared, tick_epoch) {
                    break;
                }
            }
        }));

        tracing::info!("Call connected");
        shared.publish(&state.session);
    }

    fn tick(shared: &Arc<Shared>, epoch: u64) -> bool {
        let mut state = shared.state.lock();
        if state.epoch != epoch || state.session.status != CallStatus::Connected {
            return false;
        }
        state.session.elapsed_seconds += 1;
        shared.publish(&state.session);
        true
    }

    fn reset(shared: &Arc<Shared>, epoch: u64) {
        let mut state = shared.state.lock();
        if state.epoch != epoch || state.session.status != CallStatus::Ended {
            return;
        }
        state.timers.hangup.take();
        state.epoch += 1;
        state.session = CallSession::default();
        tracing::debug!("Call session cleared");
        shared.publish(&state.session);
    }
}

/// Drives a single [`CallSession`]. Cloning yields another handle to the
/// same session.
#[derive(Clone)]
pub struct CallController {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl CallController {
    pub fn new(timings: CallTimings, runtime: Handle) -> Self {
        let (updates, _) = watch::channel(CallSession::default());
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    session: CallSession::default(),
                    epoch: 0,
                    timers: Timers::default(),
                }),
                updates,
                timings,
            }),
            runtime,
        }
    }

    /// Current state of the call.
    pub fn snapshot(&self) -> CallSession {
        self.shared.state.lock().session.clone()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<CallSession> {
        self.shared.updates.subscribe()
    }

    /// Start ringing `participant`, discarding whatever session existed.
    pub fn start_call(&self, call_type: CallType, participant: CallParticipant) {
        let mut state = self.shared.state.lock();
        state.timers.cancel_all();
        state.epoch += 1;

        tracing::info!(call_type = ?call_type, participant = %participant.name, "Starting call");

        state.session = CallSession {
            status: CallStatus::Ringing,
            call_type: Some(call_type),
            participant: Some(participant),
            is_muted: false,
            is_video_off: false,
            elapsed_seconds: 0,
        };

        let epoch = state.epoch;
        let delay = self.shared.timings.ringing;
        let shared = self.shared.clone();
        state.timers.ringing = Some(self.runtime.spawn(async move {
            sleep(delay).await;
            Shared::connect(&shared, epoch);
        }));

        self.shared.publish(&state.session);
    }

    /// Hang up a ringing or connected call. Ignored in any other state.
    pub fn end_call(&self) {
        let mut state = self.shared.state.lock();
        if !matches!(
            state.session.status,
            CallStatus::Ringing | CallStatus::Connected
        ) {
            return;
        }

        state.timers.cancel_all();
        state.epoch += 1;
        state.session.status = CallStatus::Ended;
        state.session.elapsed_seconds = 0;

        let epoch = state.epoch;
        let delay = self.shared.timings.ended;
        let shared = self.shared.clone();
        state.timers.hangup = Some(self.runtime.spawn(async move {
            sleep(delay).await;
            Shared::reset(&shared, epoch);
        }));

        tracing::info!("Call ended");
        self.shared.publish(&state.session);
    }

    pub fn toggle_mute(&self) {
        let mut state = self.shared.state.lock();
        if state.session.status != CallStatus::Connected {
            return;
        }
        state.session.is_muted = !state.session.is_muted;
        self.shared.publish(&state.session);
    }

    pub fn toggle_video(&self) {
        let mut state = self.shared.state.lock();
        if state.session.status != CallStatus::Connected
            || state.session.call_type != Some(CallType::Video)
        {
            return;
        }
        state.session.is_video_off = !state.session.is_video_off;
        self.shared.publish(&state.session);
    }
}
