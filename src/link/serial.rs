// src/link/serial.rs

//! Trigger link over a Unix serial character device.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};
use termios::{TCIOFLUSH, TCSANOW, Termios, VMIN, VTIME, cfmakeraw, cfsetspeed, tcflush, tcsetattr};

use super::{LinkError, Token, TokenDecoder, TriggerLink};

pub struct SerialLink {
    device: PathBuf,
    baud: u32,
    port: Option<Port>,
    decoder: TokenDecoder,
    buffer: [u8; 256],
}

struct Port {
    file: File,
    original_termios: Termios,
}

impl Drop for Port {
    fn drop(&mut self) {
        if let Err(e) = tcsetattr(self.file.as_raw_fd(), TCSANOW, &self.original_termios) {
            warn!("SerialLink: failed to restore terminal attributes: {}", e);
        }
    }
}

fn speed_for(baud: u32) -> Result<libc::speed_t, LinkError> {
    let speed = match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        other => return Err(LinkError::UnsupportedBaud(other)),
    };
    Ok(speed)
}

impl Port {
    fn open(device: &Path, baud: u32) -> Result<Self, LinkError> {
        let speed = speed_for(baud)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(device)?;
        let fd = file.as_raw_fd();

        let original_termios = Termios::from_fd(fd)?;
        let mut raw = original_termios;
        cfmakeraw(&mut raw);
        cfsetspeed(&mut raw, speed)?;
        raw.c_cflag |= libc::CLOCAL | libc::CREAD;
        // Reads and writes never block; waiting is done with poll(2).
        raw.c_cc[VMIN] = 0;
        raw.c_cc[VTIME] = 0;
        tcsetattr(fd, TCSANOW, &raw)?;
        tcflush(fd, TCIOFLUSH)?;

        Ok(Port {
            file,
            original_termios,
        })
    }
}

/// Waits until `fd` is readable. Returns `Ok(false)` on timeout.
fn wait_readable(fd: RawFd, timeout: Duration) -> Result<bool, LinkError> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as libc::c_int;
    let ready = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
    if ready < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err.into());
    }
    if ready == 0 {
        return Ok(false);
    }
    if pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0
        && pfd.revents & libc::POLLIN == 0
    {
        return Err(LinkError::Disconnected);
    }
    Ok(true)
}

impl SerialLink {
    pub fn open(device: impl AsRef<Path>, baud: u32) -> Result<Self, LinkError> {
        let device = device.as_ref().to_path_buf();
        let port = Port::open(&device, baud)?;
        info!("SerialLink: opened {} at {} baud", device.display(), baud);
        Ok(SerialLink {
            device,
            baud,
            port: Some(port),
            decoder: TokenDecoder::new(),
            buffer: [0u8; 256],
        })
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    fn port(&mut self) -> Result<&mut Port, LinkError> {
        self.port.as_mut().ok_or(LinkError::Disconnected)
    }
}

impl TriggerLink for SerialLink {
    fn poll_token(&mut self, timeout: Duration) -> Result<Option<Token>, LinkError> {
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(token) = self.decoder.next_token() {
                return Ok(Some(token));
            }
            let remaining = match deadline {
                Some(deadline) => deadline.saturating_duration_since(Instant::now()),
                None => timeout,
            };
            if remaining.is_zero() {
                return Ok(None);
            }

            let fd = self.port()?.file.as_raw_fd();
            if !wait_readable(fd, remaining)? {
                continue;
            }

            let read = {
                let SerialLink { port, buffer, .. } = self;
                let port = port.as_mut().ok_or(LinkError::Disconnected)?;
                match port.file.read(buffer) {
                    Ok(n) => n,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(e) => return Err(e.into()),
                }
            };
            if read == 0 {
                // Readable with no data means the other side hung up.
                return Err(LinkError::Disconnected);
            }
            trace!("SerialLink: {} bytes in", read);
            self.decoder.push(&self.buffer[..read]);
        }
    }

    fn write_token(&mut self, token: &Token) -> Result<(), LinkError> {
        let bytes = token.encode();
        let port = self.port()?;
        port.file.write_all(&bytes)?;
        trace!("SerialLink: wrote {:?}", token.as_str());
        Ok(())
    }

    fn reconnect(&mut self) -> Result<(), LinkError> {
        debug!("SerialLink: reopening {}", self.device.display());
        // Restore and close the old handle before reopening.
        self.port = None;
        self.decoder = TokenDecoder::new();
        self.port = Some(Port::open(&self.device, self.baud)?);
        info!("SerialLink: reconnected to {}", self.device.display());
        Ok(())
    }
}
