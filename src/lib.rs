/// x11setup - X11 connection setup client
///
/// Opens a session with an X11 display server, performs the connection
/// handshake and decodes the setup reply into a [`protocol::Setup`].

pub mod protocol;
pub mod connection;
pub mod security;

pub use protocol::{handshake, HandshakeOutcome, Setup, SetupError};
pub use connection::{DisplayName, Transport};
pub use security::{Credential, XAuthority};

/// Client version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
