//! Session controller: owns the connection to the remote generative service.
//!
//! A single tokio task runs the state machine. Every input — engine commands,
//! backend events, backoff timers — is funneled through one channel and
//! applied in the controller's own turn, so no state is ever touched from an
//! arbitrary callback context. Backend events are tagged with a session
//! generation so messages from a torn-down session cannot perturb its
//! replacement.
//!
//! Recovery discipline: as long as the caller's intent is "playing" the
//! controller retries forever, one attempt per backoff window — a lost
//! ambient backing track is a degraded-but-survivable condition, never a
//! fatal one. Timers that fire after `pause()` observe the new intent and
//! no-op.

use log::{debug, info, warn};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;

use crate::backend::{BackendEvent, MusicSession, SharedBackend};
use crate::config::EngineConfig;
use crate::prompt::PromptSet;
use crate::render::RenderCmd;

/// Connection lifecycle. Owned solely by the controller task; observers read
/// it through the watch channel on [`ControllerHandle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Live,
    Reconnecting,
}

/// Commands from the engine facade.
#[derive(Debug)]
pub(crate) enum ControlCmd {
    Play,
    Pause,
    /// Replace the prompt set; transmitted immediately when live, re-sent on
    /// every (re)connect.
    Prompts(PromptSet),
    /// Stop the controller task. The task holds a sender to its own queue for
    /// timer messages, so it cannot rely on channel closure to exit.
    Shutdown,
}

/// Everything the controller task reacts to, in one queue.
#[derive(Debug)]
enum ControllerMsg {
    Cmd(ControlCmd),
    /// Backend event tagged with the session generation it belongs to.
    Backend(u64, BackendEvent),
    BackoffElapsed,
}

/// Cheap handle the engine keeps; dropping every handle stops the task.
#[derive(Clone)]
pub(crate) struct ControllerHandle {
    tx: UnboundedSender<ControllerMsg>,
    state: watch::Receiver<SessionState>,
}

impl ControllerHandle {
    pub(crate) fn send(&self, cmd: ControlCmd) {
        let _ = self.tx.send(ControllerMsg::Cmd(cmd));
    }

    pub(crate) fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Wait until the session state satisfies `pred` (test helper).
    #[cfg(test)]
    pub(crate) async fn wait_for(&mut self, pred: impl Fn(SessionState) -> bool) {
        let mut rx = self.state.clone();
        while !pred(*rx.borrow_and_update()) {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub(crate) struct SessionController {
    cfg: EngineConfig,
    backend: SharedBackend,
    render_tx: crossbeam_channel::Sender<RenderCmd>,
    self_tx: UnboundedSender<ControllerMsg>,
    state_tx: watch::Sender<SessionState>,

    state: SessionState,
    /// The caller's most recently expressed desire to be playing, independent
    /// of actual connection state.
    intent_playing: bool,
    session: Option<Box<dyn MusicSession>>,
    /// Bumped on every connect; stale backend events carry an older value.
    generation: u64,
    /// Guard: at most one backoff timer in flight.
    reconnect_pending: bool,
    prompts: Option<PromptSet>,
}

impl SessionController {
    /// Spawn the controller task. Must be called within a tokio runtime.
    pub(crate) fn spawn(
        cfg: EngineConfig,
        backend: SharedBackend,
        render_tx: crossbeam_channel::Sender<RenderCmd>,
    ) -> ControllerHandle {
        let (tx, rx) = unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let controller = Self {
            cfg,
            backend,
            render_tx,
            self_tx: tx.clone(),
            state_tx,
            state: SessionState::Disconnected,
            intent_playing: false,
            session: None,
            generation: 0,
            reconnect_pending: false,
            prompts: None,
        };
        tokio::spawn(controller.run(rx));
        ControllerHandle {
            tx,
            state: state_rx,
        }
    }

    async fn run(mut self, mut rx: UnboundedReceiver<ControllerMsg>) {
        while let Some(msg) = rx.recv().await {
            match msg {
                ControllerMsg::Cmd(ControlCmd::Shutdown) => break,
                ControllerMsg::Cmd(cmd) => self.on_cmd(cmd).await,
                ControllerMsg::Backend(generation, ev) => {
                    if generation == self.generation {
                        self.on_backend_event(ev).await;
                    } else {
                        debug!("ignoring event from stale session generation {generation}");
                    }
                }
                ControllerMsg::BackoffElapsed => self.on_backoff_elapsed().await,
            }
        }
        debug!("session controller shut down");
    }

    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!("session state {:?} -> {:?}", self.state, state);
            self.state = state;
            let _ = self.state_tx.send(state);
        }
    }

    async fn on_cmd(&mut self, cmd: ControlCmd) {
        match cmd {
            ControlCmd::Play => {
                self.intent_playing = true;
                match self.state {
                    SessionState::Disconnected => {
                        if let Some(session) = self.session.as_mut() {
                            // paused but still connected: just resume
                            if session.play().await.is_err() {
                                self.on_session_lost("resume failed");
                            } else {
                                self.set_state(SessionState::Live);
                            }
                        } else {
                            self.connect().await;
                        }
                    }
                    // a connect attempt or backoff is already in flight
                    SessionState::Connecting
                    | SessionState::Reconnecting
                    | SessionState::Live => {}
                }
            }
            ControlCmd::Pause => {
                self.intent_playing = false;
                if let Some(session) = self.session.as_mut() {
                    if let Err(e) = session.pause().await {
                        warn!("pause command failed on remote session: {e}");
                    }
                }
                // any pending backoff timer will observe the intent and no-op
                self.set_state(SessionState::Disconnected);
            }
            ControlCmd::Prompts(set) => {
                self.prompts = Some(set.clone());
                if self.state == SessionState::Live {
                    if let Some(session) = self.session.as_mut() {
                        if let Err(e) = session.set_weighted_prompts(set).await {
                            // stale prompts keep playing; never a hard failure
                            warn!("prompt update failed: {e}");
                        }
                    }
                }
            }
            // intercepted in run()
            ControlCmd::Shutdown => {}
        }
    }

    async fn on_backend_event(&mut self, ev: BackendEvent) {
        match ev {
            BackendEvent::SetupComplete => {
                info!("remote session ready");
                self.set_state(SessionState::Live);
                if let Some(set) = self.prompts.clone() {
                    if let Some(session) = self.session.as_mut() {
                        if let Err(e) = session.set_weighted_prompts(set).await {
                            warn!("initial prompt send failed: {e}");
                        }
                    }
                }
                if self.intent_playing {
                    if let Some(session) = self.session.as_mut() {
                        if session.play().await.is_err() {
                            self.on_session_lost("begin-playback failed");
                        }
                    }
                }
            }
            BackendEvent::Audio(chunk) => {
                // scheduled even while pausing: already-generated audio is
                // allowed to finish rather than being cut
                let _ = self.render_tx.send(RenderCmd::Chunk(chunk));
            }
            BackendEvent::Error(msg) => {
                warn!("remote session error: {msg}");
                self.on_session_lost("remote error");
            }
            BackendEvent::Closed => {
                info!("remote session closed");
                self.on_session_lost("remote close");
            }
        }
    }

    fn on_session_lost(&mut self, why: &str) {
        self.session = None;
        self.generation += 1; // silence any stragglers from the dead session
        if self.intent_playing {
            self.set_state(SessionState::Reconnecting);
            self.schedule_reconnect(why);
        } else {
            self.set_state(SessionState::Disconnected);
        }
    }

    fn schedule_reconnect(&mut self, why: &str) {
        if self.reconnect_pending {
            return;
        }
        self.reconnect_pending = true;
        let backoff = self.cfg.reconnect_backoff;
        info!("scheduling reconnect in {backoff:?} ({why})");
        let tx = self.self_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            let _ = tx.send(ControllerMsg::BackoffElapsed);
        });
    }

    async fn on_backoff_elapsed(&mut self) {
        self.reconnect_pending = false;
        if self.intent_playing && self.state == SessionState::Reconnecting {
            self.connect().await;
        } else {
            // paused while waiting: stay quiet, no reconnection storms
            if self.state == SessionState::Reconnecting {
                self.set_state(SessionState::Disconnected);
            }
        }
    }

    async fn connect(&mut self) {
        self.set_state(SessionState::Connecting);
        self.generation += 1;
        let generation = self.generation;

        // Funnel this session's events into the controller queue, tagged so a
        // later session is never confused by leftovers.
        let (ev_tx, mut ev_rx) = unbounded_channel::<BackendEvent>();
        let fwd = self.self_tx.clone();
        tokio::spawn(async move {
            while let Some(ev) = ev_rx.recv().await {
                if fwd.send(ControllerMsg::Backend(generation, ev)).is_err() {
                    break;
                }
            }
        });

        match self.backend.connect(&self.cfg.model, ev_tx).await {
            Ok(session) => {
                debug!("backend connect accepted, awaiting setup-complete");
                self.session = Some(session);
                // Connecting -> Live happens on SetupComplete
            }
            Err(e) => {
                warn!("backend connect failed: {e}");
                if self.intent_playing {
                    self.set_state(SessionState::Reconnecting);
                    self.schedule_reconnect("connect failed");
                } else {
                    self.set_state(SessionState::Disconnected);
                }
            }
        }
    }
}

// ------------------------------------ Tests --------------------------------------
