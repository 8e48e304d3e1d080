//! Connection layer
//!
//! This module resolves an X display name and opens the byte stream to the
//! server via TCP or Unix sockets.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::TcpStream;
use thiserror::Error;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// Base TCP port; display `n` listens on `X_TCP_PORT + n`
pub const X_TCP_PORT: u16 = 6000;

/// Directory holding the local display sockets
pub const X_UNIX_DIR: &str = "/tmp/.X11-unix";

#[derive(Debug, Error)]
pub enum DisplayError {
    #[error("the DISPLAY is not set")]
    NotSet,
    #[error("display name {0:?} has no ':'")]
    MissingColon(String),
    #[error("invalid display number in {0:?}")]
    InvalidDisplay(String),
    #[error("invalid screen number in {0:?}")]
    InvalidScreen(String),
}

/// Parsed `[host]:display[.screen]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayName {
    /// `None` for the local Unix socket
    pub host: Option<String>,
    pub display: u16,
    pub screen: u16,
}

impl DisplayName {
    pub fn parse(name: &str) -> Result<Self, DisplayError> {
        let (host, rest) = name
            .rsplit_once(':')
            .ok_or_else(|| DisplayError::MissingColon(name.to_string()))?;

        let (display, screen) = match rest.split_once('.') {
            Some((display, screen)) => (display, Some(screen)),
            None => (rest, None),
        };

        let display = display
            .parse()
            .map_err(|_| DisplayError::InvalidDisplay(name.to_string()))?;
        let screen = match screen {
            Some(s) => s
                .parse()
                .map_err(|_| DisplayError::InvalidScreen(name.to_string()))?,
            None => 0,
        };

        let host = match host {
            "" | "unix" => None,
            h => Some(h.to_string()),
        };

        Ok(DisplayName {
            host,
            display,
            screen,
        })
    }

    /// Parse the `DISPLAY` environment variable
    pub fn from_env() -> Result<Self, DisplayError> {
        match std::env::var("DISPLAY") {
            Ok(name) if !name.is_empty() => DisplayName::parse(&name),
            _ => Err(DisplayError::NotSet),
        }
    }

    /// Path of the local socket for this display
    pub fn socket_path(&self) -> String {
        format!("{}/X{}", X_UNIX_DIR, self.display)
    }

    pub fn tcp_port(&self) -> u16 {
        X_TCP_PORT.saturating_add(self.display)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}.{}",
            self.host.as_deref().unwrap_or(""),
            self.display,
            self.screen
        )
    }
}

/// Connection type
pub enum Transport {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Transport {
    /// Open the stream for `display`
    pub fn connect(display: &DisplayName) -> io::Result<Self> {
        match &display.host {
            Some(host) => {
                log::debug!("Connecting to {}:{}", host, display.tcp_port());
                let stream = TcpStream::connect((host.as_str(), display.tcp_port()))?;
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
            #[cfg(unix)]
            None => {
                let path = display.socket_path();
                log::debug!("Connecting to {}", path);
                Ok(Transport::Unix(UnixStream::connect(path)?))
            }
            #[cfg(not(unix))]
            None => {
                let stream = TcpStream::connect(("127.0.0.1", display.tcp_port()))?;
                stream.set_nodelay(true)?;
                Ok(Transport::Tcp(stream))
            }
        }
    }
}

impl Read for Transport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.read(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.read(buf),
        }
    }
}

impl Write for Transport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Transport::Tcp(stream) => stream.write(buf),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Transport::Tcp(stream) => stream.flush(),
            #[cfg(unix)]
            Transport::Unix(stream) => stream.flush(),
        }
    }
}
