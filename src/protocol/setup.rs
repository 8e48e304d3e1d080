//! X11 connection setup protocol
//!
//! This module handles the initial connection handshake from the client side:
//! the hello carrying byte order and credentials, and the decoding of the
//! server's reply into a [`Setup`].

use super::*;
use crate::security::Credential;
use std::fmt;
use std::io::{Read, Write};

/// Connection setup request from client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupRequest {
    pub byte_order: ByteOrder,
    pub protocol_major_version: u16,
    pub protocol_minor_version: u16,
    pub authorization_protocol_name: Vec<u8>,
    pub authorization_protocol_data: Vec<u8>,
}

impl SetupRequest {
    pub fn new(byte_order: ByteOrder, credential: &Credential) -> Self {
        SetupRequest {
            byte_order,
            protocol_major_version: PROTOCOL_MAJOR_VERSION,
            protocol_minor_version: PROTOCOL_MINOR_VERSION,
            authorization_protocol_name: credential.name.clone(),
            authorization_protocol_data: credential.data.clone(),
        }
    }

    /// Encode the request and write it to the stream in one piece
    pub fn encode<W: Write>(&self, stream: &mut W) -> SetupResult<()> {
        let name_len = wire_len(&self.authorization_protocol_name)?;
        let data_len = wire_len(&self.authorization_protocol_data)?;

        let mut writer = WireWriter::new(Vec::new(), self.byte_order);
        writer.write_u8(self.byte_order.hello_byte())?;
        writer.write_u8(0)?; // Unused
        writer.write_u16(self.protocol_major_version)?;
        writer.write_u16(self.protocol_minor_version)?;
        writer.write_u16(name_len)?;
        writer.write_u16(data_len)?;
        writer.write_bytes(&[0u8; 2])?; // Unused
        writer.write_padded(&self.authorization_protocol_name)?;
        writer.write_padded(&self.authorization_protocol_data)?;

        let buffer = writer.into_inner();
        log::trace!("Setup request: {} bytes", buffer.len());
        stream.write_all(&buffer)?;
        Ok(())
    }

    /// Parse setup request from stream
    pub fn parse<R: Read>(stream: &mut R) -> SetupResult<Self> {
        // The first byte announces the order of everything after it
        let mut first = WireReader::new(&mut *stream, ByteOrder::native());
        let order_byte = first.read_u8("byte order")?;
        let byte_order =
            ByteOrder::from_hello_byte(order_byte).ok_or(SetupError::BadByteOrder(order_byte))?;

        let mut reader = WireReader::new(&mut *stream, byte_order);
        reader.skip(1, "unused")?;
        let protocol_major_version = reader.read_u16("protocol major version")?;
        let protocol_minor_version = reader.read_u16("protocol minor version")?;
        let name_len = reader.read_u16("authorization name length")? as usize;
        let data_len = reader.read_u16("authorization data length")? as usize;
        reader.skip(2, "unused")?;

        let authorization_protocol_name = reader.read_padded(name_len, "authorization name")?;
        let authorization_protocol_data = reader.read_padded(data_len, "authorization data")?;

        Ok(SetupRequest {
            byte_order,
            protocol_major_version,
            protocol_minor_version,
            authorization_protocol_name,
            authorization_protocol_data,
        })
    }
}

fn wire_len(bytes: &[u8]) -> SetupResult<u16> {
    u16::try_from(bytes.len()).map_err(|_| SetupError::CredentialTooLong { len: bytes.len() })
}

/// Setup response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStatus {
    Failed = 0,
    Success = 1,
}

impl SetupStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SetupStatus::Failed),
            1 => Some(SetupStatus::Success),
            _ => None,
        }
    }
}

/// Protocol version pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Format information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixmapFormat {
    pub depth: u8,
    pub bits_per_pixel: u8,
    pub scanline_pad: u8,
}

impl PixmapFormat {
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> SetupResult<Self> {
        let depth = reader.read_u8("format depth")?;
        let bits_per_pixel = reader.read_u8("format bits per pixel")?;
        let scanline_pad = reader.read_u8("format scanline pad")?;
        reader.skip(5, "format padding")?;
        Ok(PixmapFormat {
            depth,
            bits_per_pixel,
            scanline_pad,
        })
    }
}

/// Visual type information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualType {
    pub visual_id: VisualID,
    pub class: VisualClass,
    pub bits_per_rgb_value: u8,
    pub colormap_entries: u16,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
}

impl VisualType {
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> SetupResult<Self> {
        let visual_id = VisualID::new(reader.read_u32("visual id")?);
        let class_code = reader.read_u8("visual class")?;
        let class = VisualClass::from_u8(class_code)
            .ok_or(SetupError::UnknownVisualClass(class_code))?;
        let bits_per_rgb_value = reader.read_u8("bits per rgb value")?;
        let colormap_entries = reader.read_u16("colormap entries")?;
        let red_mask = reader.read_u32("red mask")?;
        let green_mask = reader.read_u32("green mask")?;
        let blue_mask = reader.read_u32("blue mask")?;
        reader.skip(4, "visual padding")?;

        Ok(VisualType {
            visual_id,
            class,
            bits_per_rgb_value,
            colormap_entries,
            red_mask,
            green_mask,
            blue_mask,
        })
    }
}

/// Depth information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Depth {
    pub depth: u8,
    pub visuals: Vec<VisualType>,
}

impl Depth {
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> SetupResult<Self> {
        let depth = reader.read_u8("depth")?;
        reader.skip(1, "depth padding")?;
        let visual_count = reader.read_u16("visual count")?;
        reader.skip(4, "depth padding")?;

        let mut visuals = Vec::with_capacity(visual_count as usize);
        for _ in 0..visual_count {
            visuals.push(VisualType::decode(reader)?);
        }

        Ok(Depth { depth, visuals })
    }
}

/// Screen information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub root: Window,
    pub default_colormap: Colormap,
    pub white_pixel: u32,
    pub black_pixel: u32,
    pub current_input_masks: EventSet,
    pub width_in_pixels: u16,
    pub height_in_pixels: u16,
    pub width_in_millimeters: u16,
    pub height_in_millimeters: u16,
    pub installed_maps: InstalledMaps,
    pub root_visual: VisualID,
    pub backing_stores: BackingStores,
    pub save_unders: bool,
    pub root_depth: u8,
    pub allowed_depths: Vec<Depth>,
}

impl Screen {
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> SetupResult<Self> {
        let root = Window::new(reader.read_u32("root window")?);
        let default_colormap = Colormap::new(reader.read_u32("default colormap")?);
        let white_pixel = reader.read_u32("white pixel")?;
        let black_pixel = reader.read_u32("black pixel")?;
        let current_input_masks = EventSet::from_bits_retain(reader.read_u32("current input masks")?);
        let width_in_pixels = reader.read_u16("width in pixels")?;
        let height_in_pixels = reader.read_u16("height in pixels")?;
        let width_in_millimeters = reader.read_u16("width in millimeters")?;
        let height_in_millimeters = reader.read_u16("height in millimeters")?;
        let installed_maps = InstalledMaps {
            min: reader.read_u16("min installed maps")?,
            max: reader.read_u16("max installed maps")?,
        };
        let root_visual = VisualID::new(reader.read_u32("root visual")?);
        let backing_code = reader.read_u8("backing stores")?;
        let backing_stores = BackingStores::from_u8(backing_code)
            .ok_or(SetupError::UnknownBackingStore(backing_code))?;
        let save_unders = reader.read_bool("save unders")?;
        let root_depth = reader.read_u8("root depth")?;
        let depth_count = reader.read_u8("allowed depths count")?;

        let mut allowed_depths = Vec::with_capacity(depth_count as usize);
        for _ in 0..depth_count {
            allowed_depths.push(Depth::decode(reader)?);
        }

        log::trace!(
            "Screen root={} {}x{} depths={}",
            root.id(),
            width_in_pixels,
            height_in_pixels,
            allowed_depths.len()
        );

        Ok(Screen {
            root,
            default_colormap,
            white_pixel,
            black_pixel,
            current_input_masks,
            width_in_pixels,
            height_in_pixels,
            width_in_millimeters,
            height_in_millimeters,
            installed_maps,
            root_visual,
            backing_stores,
            save_unders,
            root_depth,
            allowed_depths,
        })
    }

    /// Find a visual advertised by any depth of this screen
    pub fn visual(&self, id: VisualID) -> Option<&VisualType> {
        self.allowed_depths
            .iter()
            .flat_map(|d| d.visuals.iter())
            .find(|v| v.visual_id == id)
    }
}

/// Setup reply (success case)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Setup {
    pub protocol_version: ProtocolVersion,
    pub release_number: u32,
    pub resource_id_base: u32,
    pub resource_id_mask: u32,
    pub motion_buffer_size: u32,
    pub maximum_request_length: u16,
    pub image_byte_order: ByteOrder,
    pub bitmap_format_bit_order: ByteOrder,
    pub bitmap_format_scanline_unit: u8,
    pub bitmap_format_scanline_pad: u8,
    pub keycodes: KeycodeRange,
    pub vendor: String,
    pub pixmap_formats: Vec<PixmapFormat>,
    pub roots: Vec<Screen>,
}

impl Setup {
    /// Decode the body of a successful setup reply.
    ///
    /// The reader must be positioned just after the status byte and the
    /// unused byte that follows it.
    pub fn decode<R: Read>(reader: &mut WireReader<R>) -> SetupResult<Self> {
        let protocol_version = ProtocolVersion {
            major: reader.read_u16("protocol major version")?,
            minor: reader.read_u16("protocol minor version")?,
        };
        let extra_data_length = reader.read_u16("additional data length")?;
        let release_number = reader.read_u32("release number")?;
        let resource_id_base = reader.read_u32("resource id base")?;
        let resource_id_mask = reader.read_u32("resource id mask")?;
        let motion_buffer_size = reader.read_u32("motion buffer size")?;
        let vendor_length = reader.read_u16("vendor length")?;
        let maximum_request_length = reader.read_u16("maximum request length")?;
        let screen_count = reader.read_u8("screen count")?;
        let declared_format_count = reader.read_u8("format count")?;
        let image_byte_order = ByteOrder::from_flag(reader.read_u8("image byte order")?);
        let bitmap_format_bit_order = ByteOrder::from_flag(reader.read_u8("bitmap bit order")?);
        let bitmap_format_scanline_unit = reader.read_u8("bitmap scanline unit")?;
        let bitmap_format_scanline_pad = reader.read_u8("bitmap scanline pad")?;
        let keycodes = KeycodeRange {
            min: Keycode::new(reader.read_u8("min keycode")?),
            max: Keycode::new(reader.read_u8("max keycode")?),
        };
        reader.skip(4, "header padding")?;

        let vendor_bytes = reader.read_padded(vendor_length as usize, "vendor")?;
        let vendor = String::from_utf8_lossy(&vendor_bytes).into_owned();

        log::debug!(
            "Setup header: version {} release {} vendor {:?} screens {} length {}",
            protocol_version,
            release_number,
            vendor,
            screen_count,
            extra_data_length
        );

        let format_count = pixmap_format_count(extra_data_length, vendor_length, screen_count)?;
        if format_count != declared_format_count as usize {
            log::warn!(
                "Derived {} pixmap formats, server declared {}",
                format_count,
                declared_format_count
            );
        }

        let mut pixmap_formats = Vec::with_capacity(format_count);
        for _ in 0..format_count {
            pixmap_formats.push(PixmapFormat::decode(reader)?);
        }

        let mut roots = Vec::with_capacity(screen_count as usize);
        for _ in 0..screen_count {
            roots.push(Screen::decode(reader)?);
        }

        Ok(Setup {
            protocol_version,
            release_number,
            resource_id_base,
            resource_id_mask,
            motion_buffer_size,
            maximum_request_length,
            image_byte_order,
            bitmap_format_bit_order,
            bitmap_format_scanline_unit,
            bitmap_format_scanline_pad,
            keycodes,
            vendor,
            pixmap_formats,
            roots,
        })
    }

    /// Resource ID for the client-chosen sequence number `n`
    pub fn resource_id(&self, n: u32) -> XID {
        XID::new(self.resource_id_base | (n & self.resource_id_mask))
    }
}

/// Number of pixmap format records that follow the vendor string.
///
/// The count is backed out of the additional-data length (in 4-byte units):
/// the 8 units of fixed header and the vendor/screen units are subtracted and
/// the rest is split into 8-unit records. A reply whose length cannot cover
/// the header is rejected instead of wrapping around.
pub fn pixmap_format_count(
    extra_data_length: u16,
    vendor_length: u16,
    screen_count: u8,
) -> SetupResult<usize> {
    let vendor_units = (padded_len(vendor_length as usize) + screen_count as usize) / 4;
    let remaining = (extra_data_length as usize)
        .checked_sub(8)
        .and_then(|n| n.checked_sub(vendor_units))
        .ok_or(SetupError::LengthUnderflow {
            extra_data_length,
            vendor_length,
            screen_count,
        })?;
    Ok(remaining / 8)
}

/// Result of the setup exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The server declined the connection
    Refused {
        server_version: ProtocolVersion,
        reason: String,
    },
    Accepted(Setup),
}

/// Read the server's answer to a setup request.
///
/// `reader` must use the byte order the request announced.
pub fn read_setup_response<R: Read>(reader: &mut WireReader<R>) -> SetupResult<HandshakeOutcome> {
    let status = reader.read_u8("setup status")?;
    match SetupStatus::from_u8(status) {
        Some(SetupStatus::Failed) => {
            let reason_len = reader.read_u8("reason length")?;
            let server_version = ProtocolVersion {
                major: reader.read_u16("protocol major version")?,
                minor: reader.read_u16("protocol minor version")?,
            };
            reader.skip(2, "refusal header")?;
            let reason = reader.read_bytes(reason_len as usize, "refusal reason")?;
            let reason = String::from_utf8_lossy(&reason).into_owned();
            log::debug!("Setup refused by server {}: {}", server_version, reason);
            Ok(HandshakeOutcome::Refused {
                server_version,
                reason,
            })
        }
        Some(SetupStatus::Success) => {
            reader.skip(1, "unused")?;
            let setup = Setup::decode(reader)?;
            log::debug!(
                "Setup accepted: {} screens, {} pixmap formats",
                setup.roots.len(),
                setup.pixmap_formats.len()
            );
            Ok(HandshakeOutcome::Accepted(setup))
        }
        None => Err(SetupError::UnknownStatus(status)),
    }
}

/// Perform the connection setup on `stream`, announcing `byte_order`
pub fn handshake_with_order<S: Read + Write>(
    stream: &mut S,
    credential: &Credential,
    byte_order: ByteOrder,
) -> SetupResult<HandshakeOutcome> {
    let request = SetupRequest::new(byte_order, credential);
    log::debug!(
        "Sending setup request: {} order, protocol {}.{}, auth {:?}",
        byte_order,
        request.protocol_major_version,
        request.protocol_minor_version,
        String::from_utf8_lossy(&request.authorization_protocol_name)
    );
    request.encode(stream)?;
    stream.flush()?;

    let mut reader = WireReader::new(stream, byte_order);
    read_setup_response(&mut reader)
}

/// Perform the connection setup on `stream` in LSB-first order
pub fn handshake<S: Read + Write>(
    stream: &mut S,
    credential: &Credential,
) -> SetupResult<HandshakeOutcome> {
    handshake_with_order(stream, credential, ByteOrder::LSBFirst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_format_count_from_length() {
        for k in 0..64u16 {
            assert_eq!(pixmap_format_count(8 + k * 8, 0, 0).unwrap(), k as usize);
        }
    }

    #[test]
    fn test_format_count_with_vendor_and_screens() {
        // 10-byte vendor pads to 12 = 3 units; (12 + 1) / 4 = 3
        assert_eq!(pixmap_format_count(8 + 3 + 16, 10, 1).unwrap(), 2);
        // Partial records round down
        assert_eq!(pixmap_format_count(8 + 3 + 15, 10, 1).unwrap(), 1);
    }

    #[test]
    fn test_format_count_underflow() {
        let err = pixmap_format_count(8, 4, 0).unwrap_err();
        assert!(matches!(err, SetupError::LengthUnderflow { .. }));
        assert!(pixmap_format_count(0, 0, 0).is_err());
    }

    #[test]
    fn test_request_layout() {
        let credential = Credential::new(b"MIT-MAGIC-COOKIE-1".to_vec(), vec![0xaa; 16]);
        let request = SetupRequest::new(ByteOrder::LSBFirst, &credential);
        let mut out = Vec::new();
        request.encode(&mut out).unwrap();

        assert_eq!(out[0], b'l');
        assert_eq!(&out[2..4], &11u16.to_le_bytes());
        assert_eq!(&out[4..6], &0u16.to_le_bytes());
        assert_eq!(&out[6..8], &18u16.to_le_bytes());
        assert_eq!(&out[8..10], &16u16.to_le_bytes());
        assert_eq!(&out[12..30], b"MIT-MAGIC-COOKIE-1");
        assert_eq!(&out[30..32], &[0, 0]);
        assert_eq!(out.len(), 12 + 20 + 16);
    }

    #[test]
    fn test_request_round_trip() {
        for order in [ByteOrder::LSBFirst, ByteOrder::MSBFirst] {
            for name_len in 0..6 {
                let credential = Credential::new(vec![b'n'; name_len], vec![7u8; 5 - name_len]);
                let request = SetupRequest::new(order, &credential);
                let mut out = Vec::new();
                request.encode(&mut out).unwrap();
                assert_eq!(out.len() % 4, 0);

                let mut cursor = Cursor::new(out);
                let parsed = SetupRequest::parse(&mut cursor).unwrap();
                assert_eq!(parsed, request);
                assert_eq!(cursor.position() as usize, cursor.get_ref().len());
            }
        }
    }

    #[test]
    fn test_oversized_credential_is_rejected() {
        let credential = Credential::new(b"x".to_vec(), vec![0; 70000]);
        let request = SetupRequest::new(ByteOrder::LSBFirst, &credential);
        let mut out = Vec::new();
        let err = request.encode(&mut out).unwrap_err();
        assert!(matches!(err, SetupError::CredentialTooLong { len: 70000 }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_parse_rejects_bad_order_byte() {
        let mut cursor = Cursor::new(vec![b'x', 0, 0, 11, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert!(matches!(
            SetupRequest::parse(&mut cursor),
            Err(SetupError::BadByteOrder(b'x'))
        ));
    }

    #[test]
    fn test_resource_id() {
        let setup = Setup {
            protocol_version: ProtocolVersion { major: 11, minor: 0 },
            release_number: 0,
            resource_id_base: 0x0440_0000,
            resource_id_mask: 0x001f_ffff,
            motion_buffer_size: 0,
            maximum_request_length: 0xffff,
            image_byte_order: ByteOrder::LSBFirst,
            bitmap_format_bit_order: ByteOrder::LSBFirst,
            bitmap_format_scanline_unit: 32,
            bitmap_format_scanline_pad: 32,
            keycodes: KeycodeRange {
                min: Keycode(8),
                max: Keycode(255),
            },
            vendor: String::new(),
            pixmap_formats: Vec::new(),
            roots: Vec::new(),
        };
        assert_eq!(setup.resource_id(1).get(), 0x0440_0001);
        assert_eq!(setup.resource_id(0xffff_ffff).get(), 0x045f_ffff);
    }
}
