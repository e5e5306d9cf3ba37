use std::time::Duration;

/// How the slideshow decides to advance. Fixed for the life of an engine.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Mode {
    Interval(Duration), // Advance every time the period elapses
    Trigger,            // Advance when the device sends `next`
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Lifecycle {
    Idle,    // Constructed, nothing shown yet
    Running, // Loop thread is alive
    Stopped, // Terminal; display released
}

/// State owned by the loop thread.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub index: usize,
    pub paused: bool,
    pub mode: Mode,
}

impl EngineState {
    pub fn new(mode: Mode) -> Self {
        Self {
            index: 0,
            paused: false,
            mode,
        }
    }
}
