use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("display surface is closed")]
    Closed,
}

/// Receives render requests from the engine.
///
/// `show` must not wait for the frame to be painted: the engine moves on to
/// its next wait as soon as the request is handed over.
pub trait DisplaySink: Send + 'static {
    fn show(&mut self, image: &Path) -> Result<(), DisplayError>;

    /// Called once when the engine stops.
    fn release(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayRequest {
    Show(PathBuf),
    Release,
}

/// Engine-side half of a display that renders on another thread.
pub struct ChannelSink {
    requests: Sender<DisplayRequest>,
}

impl ChannelSink {
    pub fn new() -> (ChannelSink, Receiver<DisplayRequest>) {
        let (tx, rx) = mpsc::channel();
        (ChannelSink { requests: tx }, rx)
    }
}

impl DisplaySink for ChannelSink {
    fn show(&mut self, image: &Path) -> Result<(), DisplayError> {
        self.requests
            .send(DisplayRequest::Show(image.to_path_buf()))
            .map_err(|_| DisplayError::Closed)
    }

    fn release(&mut self) {
        // The screen may already be gone; nothing left to release then.
        let _ = self.requests.send(DisplayRequest::Release);
    }
}
