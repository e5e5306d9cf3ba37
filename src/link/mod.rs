//! Trigger link: the byte channel to an external device that paces the
//! slideshow in trigger mode.

use std::io;
use std::thread;
use std::time::Duration;

use thiserror::Error;

pub mod channel;
pub mod framing;
#[cfg(unix)]
pub mod serial;

pub use channel::{ChannelLink, DeviceEnd};
pub use framing::{Token, TokenDecoder};
#[cfg(unix)]
pub use serial::SerialLink;

/// Link failures. All of them are transient from the engine's point of view.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("trigger device disconnected")]
    Disconnected,
    #[error("unsupported baud rate: {0}")]
    UnsupportedBaud(u32),
    #[error("trigger link I/O error: {0}")]
    Io(#[from] io::Error),
}

pub trait TriggerLink: Send + 'static {
    /// Waits up to `timeout` for a complete token.
    fn poll_token(&mut self, timeout: Duration) -> Result<Option<Token>, LinkError>;

    /// Sends a token without waiting for any acknowledgment.
    fn write_token(&mut self, token: &Token) -> Result<(), LinkError>;

    /// Re-establishes the channel after a failure.
    fn reconnect(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    /// Blocks until a complete token arrives.
    fn read_token(&mut self) -> Result<Token, LinkError> {
        loop {
            if let Some(token) = self.poll_token(Duration::from_secs(1))? {
                return Ok(token);
            }
        }
    }
}

impl<T: TriggerLink + ?Sized> TriggerLink for Box<T> {
    fn poll_token(&mut self, timeout: Duration) -> Result<Option<Token>, LinkError> {
        (**self).poll_token(timeout)
    }

    fn write_token(&mut self, token: &Token) -> Result<(), LinkError> {
        (**self).write_token(token)
    }

    fn reconnect(&mut self) -> Result<(), LinkError> {
        (**self).reconnect()
    }

    fn read_token(&mut self) -> Result<Token, LinkError> {
        (**self).read_token()
    }
}

/// Link that never produces tokens and discards writes.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLink;

impl TriggerLink for NullLink {
    fn poll_token(&mut self, timeout: Duration) -> Result<Option<Token>, LinkError> {
        thread::sleep(timeout);
        Ok(None)
    }

    fn write_token(&mut self, _token: &Token) -> Result<(), LinkError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn null_link_waits_and_yields_nothing() {
        let mut link = NullLink;
        let started = Instant::now();
        assert!(link.poll_token(Duration::from_millis(20)).unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
        assert!(link.write_token(&Token::Capture).is_ok());
    }

    #[test]
    fn boxed_link_forwards_calls() {
        let (link, device) = ChannelLink::pair();
        let mut boxed: Box<dyn TriggerLink> = Box::new(link);
        device.send(b"next\n");
        assert_eq!(boxed.read_token().unwrap(), Token::Next);
        boxed.write_token(&Token::Capture).unwrap();
        assert_eq!(device.written(), vec![Token::Capture]);
    }
}
