//! The advancement engine.
//!
//! One background thread per engine owns the index and pause state. Callers
//! talk to it through a command channel, so every wait in the loop (pause,
//! interval, token, retry backoff) can be interrupted by `Stop`.

use std::mem;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::constants::{MIN_POLL_SLICE, TOKEN_POLL_SLICE};
use crate::display::DisplaySink;
use crate::image_set::ImageSet;
use crate::link::{LinkError, NullLink, Token, TriggerLink};
use crate::retry::RetryPolicy;
use crate::state::{EngineState, Lifecycle, Mode};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("trigger mode requires a trigger link")]
    MissingLink,
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("engine is already running")]
    AlreadyRunning,
    #[error("engine has been stopped")]
    AlreadyStopped,
    #[error("engine is not running")]
    NotRunning,
    #[error("engine thread panicked")]
    WorkerPanicked,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Stop,
}

/// Cloneable handle for steering a running engine from any thread.
#[derive(Debug, Clone)]
pub struct Controller {
    commands: Sender<Command>,
}

impl Controller {
    pub fn toggle_pause(&self) -> Result<(), EngineError> {
        self.commands
            .send(Command::TogglePause)
            .map_err(|_| EngineError::NotRunning)
    }

    /// Asks the loop to stop without waiting for it. `Engine::stop` joins.
    pub fn request_stop(&self) {
        let _ = self.commands.send(Command::Stop);
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub retry: RetryPolicy,
    /// Upper bound on how long a token wait blocks before commands are
    /// checked again. Raised to `MIN_POLL_SLICE` when shorter.
    pub poll_slice: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            poll_slice: TOKEN_POLL_SLICE,
        }
    }
}

enum Phase<S, L> {
    Idle { sink: S, link: Option<L> },
    Running { commands: Sender<Command>, worker: JoinHandle<Option<L>> },
    Stopped { link: Option<L> },
}

pub struct Engine<S: DisplaySink, L: TriggerLink = NullLink> {
    images: ImageSet,
    mode: Mode,
    options: EngineOptions,
    phase: Phase<S, L>,
}

impl<S: DisplaySink> Engine<S, NullLink> {
    pub fn with_interval(images: ImageSet, interval: Duration, sink: S) -> Result<Self, EngineError> {
        Self::new(images, Mode::Interval(interval), sink, None)
    }
}

impl<S: DisplaySink, L: TriggerLink> Engine<S, L> {
    pub fn with_trigger(images: ImageSet, sink: S, link: L) -> Result<Self, EngineError> {
        Self::new(images, Mode::Trigger, sink, Some(link))
    }

    pub fn new(images: ImageSet, mode: Mode, sink: S, link: Option<L>) -> Result<Self, EngineError> {
        match mode {
            Mode::Trigger if link.is_none() => return Err(EngineError::MissingLink),
            Mode::Interval(interval) if interval.is_zero() => return Err(EngineError::ZeroInterval),
            _ => {}
        }
        Ok(Self {
            images,
            mode,
            options: EngineOptions::default(),
            phase: Phase::Idle { sink, link },
        })
    }

    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = EngineOptions {
            poll_slice: options.poll_slice.max(MIN_POLL_SLICE),
            ..options
        };
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.phase {
            Phase::Idle { .. } => Lifecycle::Idle,
            Phase::Running { .. } => Lifecycle::Running,
            Phase::Stopped { .. } => Lifecycle::Stopped,
        }
    }

    /// Shows the first image and starts the loop thread.
    pub fn start(&mut self) -> Result<(), EngineError> {
        let (mut sink, link) = match mem::replace(&mut self.phase, Phase::Stopped { link: None }) {
            Phase::Idle { sink, link } => (sink, link),
            running @ Phase::Running { .. } => {
                self.phase = running;
                return Err(EngineError::AlreadyRunning);
            }
            stopped @ Phase::Stopped { .. } => {
                self.phase = stopped;
                return Err(EngineError::AlreadyStopped);
            }
        };

        let state = EngineState::new(self.mode);
        let first = &self.images[state.index];
        info!(
            "Starting slideshow of {} images in {:?} mode",
            self.images.len(),
            self.mode
        );
        if let Err(e) = sink.show(first) {
            warn!("Failed to show {}: {}", first.display(), e);
        }

        let (commands, receiver) = mpsc::channel();
        let worker = Worker {
            images: self.images.clone(),
            state,
            sink,
            link,
            commands: receiver,
            options: self.options,
            failures: 0,
            reported_down: false,
        };
        // The thread gets the worker only after it exists, so a failed spawn
        // leaves the sink and link with us.
        let (handoff, pickup) = mpsc::channel::<Worker<S, L>>();
        let spawned = thread::Builder::new()
            .name("slideshow-engine".into())
            .spawn(move || pickup.recv().ok().and_then(Worker::run));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.phase = Phase::Stopped { link: worker.abandon() };
                return Err(EngineError::Spawn(e));
            }
        };
        if let Err(mpsc::SendError(worker)) = handoff.send(worker) {
            let _ = handle.join();
            self.phase = Phase::Stopped { link: worker.abandon() };
            return Err(EngineError::WorkerPanicked);
        }

        self.phase = Phase::Running {
            commands,
            worker: handle,
        };
        Ok(())
    }

    pub fn toggle_pause(&self) -> Result<(), EngineError> {
        match &self.phase {
            Phase::Running { commands, .. } => commands
                .send(Command::TogglePause)
                .map_err(|_| EngineError::NotRunning),
            _ => Err(EngineError::NotRunning),
        }
    }

    pub fn controller(&self) -> Option<Controller> {
        match &self.phase {
            Phase::Running { commands, .. } => Some(Controller {
                commands: commands.clone(),
            }),
            _ => None,
        }
    }

    /// Stops the loop and releases the display. Calling it again is a no-op.
    pub fn stop(&mut self) -> Result<(), EngineError> {
        match mem::replace(&mut self.phase, Phase::Stopped { link: None }) {
            Phase::Idle { mut sink, link } => {
                sink.release();
                self.phase = Phase::Stopped { link };
                Ok(())
            }
            Phase::Running { commands, worker } => {
                let _ = commands.send(Command::Stop);
                drop(commands);
                let link = worker.join().map_err(|_| EngineError::WorkerPanicked)?;
                self.phase = Phase::Stopped { link };
                Ok(())
            }
            stopped @ Phase::Stopped { .. } => {
                self.phase = stopped;
                Ok(())
            }
        }
    }

    /// Hands the trigger link back once the engine has stopped.
    pub fn take_link(&mut self) -> Option<L> {
        match &mut self.phase {
            Phase::Stopped { link } => link.take(),
            _ => None,
        }
    }
}

impl<S: DisplaySink, L: TriggerLink> Drop for Engine<S, L> {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Engine shutdown failed: {}", e);
        }
    }
}

enum Wake {
    Advance,
    Paused,
    Stop,
}

struct Worker<S, L> {
    images: ImageSet,
    state: EngineState,
    sink: S,
    link: Option<L>,
    commands: Receiver<Command>,
    options: EngineOptions,
    failures: u32,
    reported_down: bool,
}

impl<S: DisplaySink, L: TriggerLink> Worker<S, L> {
    fn run(mut self) -> Option<L> {
        debug!("Engine loop started");
        loop {
            if self.state.paused && !self.wait_while_paused() {
                break;
            }
            match self.wait_for_advance() {
                Wake::Advance => self.advance(),
                Wake::Paused => continue,
                Wake::Stop => break,
            }
        }
        info!("Slideshow stopped at image {}", self.state.index);
        self.abandon()
    }

    /// Releases the display and gives up the link without running the loop.
    fn abandon(mut self) -> Option<L> {
        self.state.paused = true;
        self.sink.release();
        self.link
    }

    /// Returns false when the engine should stop.
    fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::TogglePause => {
                self.state.paused = !self.state.paused;
                info!("Slideshow {}", if self.state.paused { "paused" } else { "resumed" });
                true
            }
            Command::Stop => false,
        }
    }

    fn wait_while_paused(&mut self) -> bool {
        while self.state.paused {
            match self.commands.recv() {
                Ok(command) => {
                    if !self.apply(command) {
                        return false;
                    }
                }
                Err(_) => return false,
            }
        }
        true
    }

    /// Blocks for `duration` unless a command interrupts the wait.
    fn sleep(&mut self, duration: Duration) -> Option<Wake> {
        let deadline = Instant::now().checked_add(duration);
        loop {
            let received = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    self.commands.recv_timeout(deadline - now)
                }
                // Past the end of the clock: only a command ends the wait.
                None => self
                    .commands
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(command) => {
                    if !self.apply(command) {
                        return Some(Wake::Stop);
                    }
                    if self.state.paused {
                        return Some(Wake::Paused);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Some(Wake::Stop),
            }
        }
    }

    /// Handles queued commands without blocking.
    fn drain_commands(&mut self) -> Option<Wake> {
        loop {
            match self.commands.try_recv() {
                Ok(command) => {
                    if !self.apply(command) {
                        return Some(Wake::Stop);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Some(Wake::Stop),
            }
        }
        if self.state.paused {
            Some(Wake::Paused)
        } else {
            None
        }
    }

    fn wait_for_advance(&mut self) -> Wake {
        match self.state.mode {
            Mode::Interval(interval) => self.sleep(interval).unwrap_or(Wake::Advance),
            Mode::Trigger => self.wait_for_next(),
        }
    }

    fn wait_for_next(&mut self) -> Wake {
        loop {
            if let Some(wake) = self.drain_commands() {
                return wake;
            }
            let Some(link) = self.link.as_mut() else {
                error!("Trigger mode without a link");
                return Wake::Stop;
            };
            match link.poll_token(self.options.poll_slice) {
                Ok(Some(Token::Next)) => {
                    self.link_healthy();
                    return Wake::Advance;
                }
                Ok(Some(other)) => {
                    self.link_healthy();
                    debug!("Ignoring token {:?}", other.as_str());
                }
                Ok(None) => self.link_healthy(),
                Err(e) => {
                    if let Some(wake) = self.recover(e) {
                        return wake;
                    }
                }
            }
        }
    }

    fn link_healthy(&mut self) {
        if self.failures > 0 {
            info!("Trigger link recovered after {} failures", self.failures);
            self.failures = 0;
            self.reported_down = false;
        }
    }

    /// Backs off and reconnects. The engine keeps running whatever happens.
    fn recover(&mut self, cause: LinkError) -> Option<Wake> {
        self.failures = self.failures.saturating_add(1);
        let retry = self.options.retry;
        if retry.exhausted(self.failures) {
            if !self.reported_down {
                error!(
                    "Trigger link down after {} attempts: {}; retrying every {:?}",
                    self.failures, cause, retry.max_delay
                );
                self.reported_down = true;
            }
        } else {
            warn!("Trigger link error (attempt {}): {}", self.failures, cause);
        }

        if let Some(wake) = self.sleep(retry.delay(self.failures)) {
            return Some(wake);
        }
        if let Some(link) = self.link.as_mut() {
            if let Err(e) = link.reconnect() {
                debug!("Reconnect failed: {}", e);
            }
        }
        None
    }

    fn advance(&mut self) {
        self.state.index = self.images.next_index(self.state.index);
        let path = &self.images[self.state.index];
        debug!("Showing image {}: {}", self.state.index, path.display());
        if let Err(e) = self.sink.show(path) {
            warn!("Failed to show {}: {}", path.display(), e);
        }

        if self.state.mode == Mode::Trigger {
            if let Some(link) = self.link.as_mut() {
                if let Err(e) = link.write_token(&Token::Capture) {
                    warn!("Failed to send capture: {}", e);
                }
            }
        }
    }
}
