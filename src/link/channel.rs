//! In-memory trigger link backed by `mpsc` channels.
//!
//! The [`DeviceEnd`] plays the external device: it pushes raw byte fragments
//! (exercising the same framing as the serial link), injects transient
//! faults, and observes the tokens the engine writes.

use std::io;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::{Duration, Instant};

use log::trace;

use super::{LinkError, Token, TokenDecoder, TriggerLink};

enum Inbound {
    Bytes(Vec<u8>),
    Fault,
}

pub struct ChannelLink {
    inbound: Receiver<Inbound>,
    outbound: Sender<Token>,
    decoder: TokenDecoder,
    disconnected: bool,
}

pub struct DeviceEnd {
    inbound: Sender<Inbound>,
    outbound: Receiver<Token>,
}

impl ChannelLink {
    pub fn pair() -> (ChannelLink, DeviceEnd) {
        let (in_tx, in_rx) = mpsc::channel();
        let (out_tx, out_rx) = mpsc::channel();
        let link = ChannelLink {
            inbound: in_rx,
            outbound: out_tx,
            decoder: TokenDecoder::new(),
            disconnected: false,
        };
        let device = DeviceEnd {
            inbound: in_tx,
            outbound: out_rx,
        };
        (link, device)
    }

    fn receive(&mut self, message: Inbound) -> Result<(), LinkError> {
        match message {
            Inbound::Bytes(bytes) => {
                trace!("ChannelLink: {} bytes in", bytes.len());
                self.decoder.push(&bytes);
                Ok(())
            }
            Inbound::Fault => Err(LinkError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "injected fault",
            ))),
        }
    }
}

impl TriggerLink for ChannelLink {
    fn poll_token(&mut self, timeout: Duration) -> Result<Option<Token>, LinkError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(token) = self.decoder.next_token() {
                return Ok(Some(token));
            }
            if self.disconnected {
                return Err(LinkError::Disconnected);
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() {
                return Ok(None);
            }
            match self.inbound.recv_timeout(remaining) {
                Ok(message) => self.receive(message)?,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    self.disconnected = true;
                    return Err(LinkError::Disconnected);
                }
            }
        }
    }

    fn write_token(&mut self, token: &Token) -> Result<(), LinkError> {
        self.outbound
            .send(token.clone())
            .map_err(|_| LinkError::Disconnected)
    }

    fn reconnect(&mut self) -> Result<(), LinkError> {
        if self.disconnected {
            return Err(LinkError::Disconnected);
        }
        // Anything already queued is still valid after a fault.
        match self.inbound.try_recv() {
            Ok(message) => self.receive(message),
            Err(TryRecvError::Empty) => Ok(()),
            Err(TryRecvError::Disconnected) => {
                self.disconnected = true;
                Err(LinkError::Disconnected)
            }
        }
    }
}

impl DeviceEnd {
    /// Delivers raw bytes, which may hold partial or several tokens.
    pub fn send(&self, bytes: &[u8]) {
        let _ = self.inbound.send(Inbound::Bytes(bytes.to_vec()));
    }

    pub fn send_token(&self, token: &Token) {
        self.send(&token.encode());
    }

    /// Makes the next read on the link fail with an I/O error.
    pub fn inject_fault(&self) {
        let _ = self.inbound.send(Inbound::Fault);
    }

    /// Tokens written by the engine so far.
    pub fn written(&self) -> Vec<Token> {
        self.outbound.try_iter().collect()
    }

    /// Waits up to `timeout` for the next token written by the engine.
    pub fn recv_written(&self, timeout: Duration) -> Option<Token> {
        self.outbound.recv_timeout(timeout).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_are_reassembled() {
        let (mut link, device) = ChannelLink::pair();
        device.send(b"ne");
        assert!(link.poll_token(Duration::from_millis(10)).unwrap().is_none());
        device.send(b"xt\nfoo");
        assert_eq!(
            link.poll_token(Duration::from_millis(10)).unwrap(),
            Some(Token::Next)
        );
        assert!(link.poll_token(Duration::from_millis(10)).unwrap().is_none());
    }

    #[test]
    fn injected_fault_is_recoverable() {
        let (mut link, device) = ChannelLink::pair();
        device.inject_fault();
        device.send_token(&Token::Next);
        assert!(matches!(
            link.poll_token(Duration::from_millis(10)),
            Err(LinkError::Io(_))
        ));
        link.reconnect().unwrap();
        assert_eq!(
            link.poll_token(Duration::from_millis(10)).unwrap(),
            Some(Token::Next)
        );
    }

    #[test]
    fn dropped_device_disconnects() {
        let (mut link, device) = ChannelLink::pair();
        drop(device);
        assert!(matches!(
            link.poll_token(Duration::from_millis(10)),
            Err(LinkError::Disconnected)
        ));
        assert!(matches!(link.reconnect(), Err(LinkError::Disconnected)));
        assert!(matches!(
            link.write_token(&Token::Capture),
            Err(LinkError::Disconnected)
        ));
    }

    #[test]
    fn unbounded_poll_returns_queued_token() {
        let (mut link, device) = ChannelLink::pair();
        device.send(b"next\n");
        assert_eq!(link.poll_token(Duration::MAX).unwrap(), Some(Token::Next));
        drop(device);
        assert!(matches!(
            link.poll_token(Duration::MAX),
            Err(LinkError::Disconnected)
        ));
    }
}
