//! Authorization credentials
//!
//! This module reads the Xauthority credential store and selects the
//! name/data pair presented to the server during connection setup.

use crate::connection::DisplayName;
use byteorder::{BigEndian, ByteOrder as _, ReadBytesExt};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::net::{IpAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Address families used in Xauthority records
pub mod family {
    pub const INTERNET: u16 = 0;
    pub const INTERNET6: u16 = 6;
    pub const LOCAL: u16 = 256;
    pub const WILD: u16 = 65535;
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("could not read Xauthority file")]
    Io(#[from] io::Error),
    #[error("Xauthority record truncated while reading {0}")]
    Truncated(&'static str),
}

/// Authorization name/data pair sent in the setup request
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credential {
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl Credential {
    pub fn new(name: Vec<u8>, data: Vec<u8>) -> Self {
        Credential { name, data }
    }

    /// Empty credential; servers without access control accept it
    pub fn none() -> Self {
        Credential::default()
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.data.is_empty()
    }
}

// Keep cookie bytes out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &String::from_utf8_lossy(&self.name))
            .field("data_len", &self.data.len())
            .finish()
    }
}

/// One Xauthority record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthEntry {
    pub family: u16,
    pub address: Vec<u8>,
    pub display: Vec<u8>,
    pub name: Vec<u8>,
    pub data: Vec<u8>,
}

impl AuthEntry {
    pub fn credential(&self) -> Credential {
        Credential::new(self.name.clone(), self.data.clone())
    }

    fn matches_display(&self, display: &DisplayName) -> bool {
        self.display == display.display.to_string().as_bytes()
    }

    /// Internet families store raw address octets, Local stores the host name
    fn matches_address(&self, display: &DisplayName, addresses: &[IpAddr]) -> bool {
        match (self.family, &display.host) {
            (family::WILD, _) => true,
            (family::LOCAL, None) => true,
            (family::LOCAL, Some(host)) => self.address == host.as_bytes(),
            (family::INTERNET, Some(_)) => addresses.iter().any(|addr| match addr {
                IpAddr::V4(v4) => self.address == v4.octets(),
                IpAddr::V6(_) => false,
            }),
            (family::INTERNET6, Some(_)) => addresses.iter().any(|addr| match addr {
                IpAddr::V6(v6) => self.address == v6.octets(),
                IpAddr::V4(_) => false,
            }),
            _ => false,
        }
    }
}

/// Parsed Xauthority file
#[derive(Debug, Clone, Default)]
pub struct XAuthority {
    pub entries: Vec<AuthEntry>,
}

impl XAuthority {
    /// Location of the credential store: `$XAUTHORITY`, else `$HOME/.Xauthority`
    pub fn path_from_env() -> Option<PathBuf> {
        match std::env::var_os("XAUTHORITY") {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => std::env::var_os("HOME").map(|home| Path::new(&home).join(".Xauthority")),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let file = File::open(path)?;
        let authority = XAuthority::parse(&mut BufReader::new(file))?;
        log::debug!(
            "Loaded {} Xauthority entries from {}",
            authority.entries.len(),
            path.display()
        );
        Ok(authority)
    }

    /// Parse records until a clean end of input. Fields are always big-endian.
    pub fn parse<R: Read>(reader: &mut R) -> Result<Self, AuthError> {
        let mut entries = Vec::new();
        while let Some(family) = read_family(reader)? {
            entries.push(AuthEntry {
                family,
                address: read_counted(reader, "address")?,
                display: read_counted(reader, "display")?,
                name: read_counted(reader, "name")?,
                data: read_counted(reader, "data")?,
            });
        }
        Ok(XAuthority { entries })
    }

    /// Credential to present when connecting to `display`
    pub fn credential_for(&self, display: &DisplayName) -> Credential {
        let addresses = match &display.host {
            Some(host) => host_addresses(host),
            None => Vec::new(),
        };
        let entry = self
            .entries
            .iter()
            .find(|e| e.matches_display(display) && e.matches_address(display, &addresses))
            .or_else(|| self.entries.iter().find(|e| e.matches_display(display)))
            .or_else(|| self.entries.first());

        match entry {
            Some(entry) => {
                log::debug!(
                    "Using {} credential (family {}) for display {}",
                    String::from_utf8_lossy(&entry.name),
                    entry.family,
                    display
                );
                entry.credential()
            }
            None => Credential::none(),
        }
    }
}

/// Addresses of a display host: the literal itself, or what the resolver returns
fn host_addresses(host: &str) -> Vec<IpAddr> {
    if let Ok(addr) = host.parse::<IpAddr>() {
        return vec![addr];
    }
    match (host, 0u16).to_socket_addrs() {
        Ok(addrs) => addrs.map(|a| a.ip()).collect(),
        Err(e) => {
            log::debug!("Could not resolve {}: {}", host, e);
            Vec::new()
        }
    }
}

fn read_family<R: Read>(reader: &mut R) -> Result<Option<u16>, AuthError> {
    let mut buf = [0u8; 2];
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(None),
            Ok(0) => return Err(AuthError::Truncated("family")),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(AuthError::Io(e)),
        }
    }
    Ok(Some(BigEndian::read_u16(&buf)))
}

fn read_counted<R: Read>(reader: &mut R, field: &'static str) -> Result<Vec<u8>, AuthError> {
    let truncated = |e: io::Error| {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            AuthError::Truncated(field)
        } else {
            AuthError::Io(e)
        }
    };
    let len = reader.read_u16::<BigEndian>().map_err(truncated)?;
    let mut value = vec![0u8; len as usize];
    reader.read_exact(&mut value).map_err(truncated)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn record(family: u16, address: &[u8], display: &[u8], name: &[u8], data: &[u8]) -> Vec<u8> {
        let mut out = family.to_be_bytes().to_vec();
        for field in [address, display, name, data] {
            out.extend_from_slice(&(field.len() as u16).to_be_bytes());
            out.extend_from_slice(field);
        }
        out
    }

    #[test]
    fn test_parse_single_record() {
        let bytes = record(family::LOCAL, b"myhost", b"0", b"MIT-MAGIC-COOKIE-1", &[1, 2, 3, 4]);
        let auth = XAuthority::parse(&mut Cursor::new(bytes)).unwrap();

        assert_eq!(auth.entries.len(), 1);
        let entry = &auth.entries[0];
        assert_eq!(entry.family, family::LOCAL);
        assert_eq!(entry.address, b"myhost");
        assert_eq!(entry.display, b"0");
        assert_eq!(entry.name, b"MIT-MAGIC-COOKIE-1");
        assert_eq!(entry.data, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_empty_file() {
        let auth = XAuthority::parse(&mut Cursor::new(Vec::new())).unwrap();
        assert!(auth.entries.is_empty());
        let display = DisplayName::parse(":0").unwrap();
        assert!(auth.credential_for(&display).is_empty());
    }

    #[test]
    fn test_parse_truncated_record() {
        let mut bytes = record(family::LOCAL, b"host", b"0", b"MIT-MAGIC-COOKIE-1", &[9; 16]);
        bytes.truncate(bytes.len() - 3);
        match XAuthority::parse(&mut Cursor::new(bytes)) {
            Err(AuthError::Truncated(field)) => assert_eq!(field, "data"),
            other => panic!("expected truncation, got {:?}", other),
        }

        match XAuthority::parse(&mut Cursor::new(vec![1u8])) {
            Err(AuthError::Truncated(field)) => assert_eq!(field, "family"),
            other => panic!("expected truncation, got {:?}", other),
        }
    }

    #[test]
    fn test_credential_selection_by_display() {
        let mut bytes = record(family::LOCAL, b"host", b"0", b"MIT-MAGIC-COOKIE-1", &[0; 16]);
        bytes.extend(record(family::LOCAL, b"host", b"1", b"MIT-MAGIC-COOKIE-1", &[1; 16]));
        bytes.extend(record(family::INTERNET, &[192, 168, 1, 20], b"1", b"XDM-AUTHORIZATION-1", &[2; 8]));
        let auth = XAuthority::parse(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(auth.entries.len(), 3);

        let local = auth.credential_for(&DisplayName::parse(":1").unwrap());
        assert_eq!(local.data, vec![1; 16]);

        let remote = auth.credential_for(&DisplayName::parse("192.168.1.20:1").unwrap());
        assert_eq!(remote.name, b"XDM-AUTHORIZATION-1");

        // Unknown display falls back to the first record
        let other = auth.credential_for(&DisplayName::parse(":7").unwrap());
        assert_eq!(other.data, vec![0; 16]);
    }

    #[test]
    fn test_internet_records_match_address_octets() {
        let mut bytes = record(family::INTERNET, &[10, 0, 0, 5], b"1", b"MIT-MAGIC-COOKIE-1", &[1; 16]);
        bytes.extend(record(family::INTERNET, &[10, 0, 0, 6], b"1", b"MIT-MAGIC-COOKIE-1", &[2; 16]));
        let mut v6 = [0u8; 16];
        v6[15] = 1;
        bytes.extend(record(family::INTERNET6, &v6, b"1", b"MIT-MAGIC-COOKIE-1", &[3; 16]));
        let auth = XAuthority::parse(&mut Cursor::new(bytes)).unwrap();

        let second = auth.credential_for(&DisplayName::parse("10.0.0.6:1").unwrap());
        assert_eq!(second.data, vec![2; 16]);

        let first = auth.credential_for(&DisplayName::parse("10.0.0.5:1").unwrap());
        assert_eq!(first.data, vec![1; 16]);

        let loopback6 = auth.credential_for(&DisplayName::parse("::1:1").unwrap());
        assert_eq!(loopback6.data, vec![3; 16]);

        // Raw octets never match the textual form of the host
        let entry = &auth.entries[1];
        let display = DisplayName::parse("10.0.0.6:1").unwrap();
        assert!(entry.matches_address(&display, &host_addresses("10.0.0.6")));
        assert!(!entry.matches_address(&display, &host_addresses("10.0.0.5")));
    }

    #[test]
    fn test_credential_debug_hides_data() {
        let credential = Credential::new(b"MIT-MAGIC-COOKIE-1".to_vec(), vec![0x42; 16]);
        let text = format!("{:?}", credential);
        assert!(text.contains("data_len: 16"));
        assert!(!text.contains("66"));
    }
}
