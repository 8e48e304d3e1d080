//! Core X11 protocol types
//!
//! These types represent the values carried by the connection setup reply.
//! They are kept minimal and close to the wire protocol.

use bitflags::bitflags;
use std::fmt;

/// X11 resource ID - used for windows, colormaps, etc.
/// In X11, all objects are identified by 29-bit IDs.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XID(pub u32);

impl XID {
    pub fn new(id: u32) -> Self {
        XID(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for XID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.0)
    }
}

/// Window ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Window(pub XID);

impl Window {
    pub fn new(id: u32) -> Self {
        Window(XID::new(id))
    }

    pub fn id(&self) -> XID {
        self.0
    }
}

/// Colormap ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Colormap(pub XID);

impl Colormap {
    pub fn new(id: u32) -> Self {
        Colormap(XID::new(id))
    }

    pub fn id(&self) -> XID {
        self.0
    }
}

/// Visual ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualID(pub u32);

impl VisualID {
    pub fn new(id: u32) -> Self {
        VisualID(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for VisualID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Keycode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Keycode(pub u8);

impl Keycode {
    pub fn new(code: u8) -> Self {
        Keycode(code)
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

/// Inclusive keycode range advertised by the server (min <= max is assumed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeycodeRange {
    pub min: Keycode,
    pub max: Keycode,
}

impl fmt::Display for KeycodeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min.0, self.max.0)
    }
}

/// Installed colormap count range of a screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstalledMaps {
    pub min: u16,
    pub max: u16,
}

impl fmt::Display for InstalledMaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// Backing store support advertised per screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackingStores {
    Never = 0,
    WhenMapped = 1,
    Always = 2,
}

impl BackingStores {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(BackingStores::Never),
            1 => Some(BackingStores::WhenMapped),
            2 => Some(BackingStores::Always),
            _ => None,
        }
    }
}

/// Visual class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualClass {
    StaticGray = 0,
    GrayScale = 1,
    StaticColor = 2,
    PseudoColor = 3,
    TrueColor = 4,
    DirectColor = 5,
}

impl VisualClass {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(VisualClass::StaticGray),
            1 => Some(VisualClass::GrayScale),
            2 => Some(VisualClass::StaticColor),
            3 => Some(VisualClass::PseudoColor),
            4 => Some(VisualClass::TrueColor),
            5 => Some(VisualClass::DirectColor),
            _ => None,
        }
    }
}

/// Byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    LSBFirst = 0,
    MSBFirst = 1,
}

impl ByteOrder {
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            ByteOrder::LSBFirst
        } else {
            ByteOrder::MSBFirst
        }
    }

    /// Map a setup-reply order flag: zero is LSBFirst, anything else MSBFirst
    pub fn from_flag(value: u8) -> Self {
        if value == 0 {
            ByteOrder::LSBFirst
        } else {
            ByteOrder::MSBFirst
        }
    }

    /// Byte that announces this order in the client hello
    pub fn hello_byte(&self) -> u8 {
        match self {
            ByteOrder::MSBFirst => b'B',
            ByteOrder::LSBFirst => b'l',
        }
    }

    pub fn from_hello_byte(value: u8) -> Option<Self> {
        match value {
            b'B' => Some(ByteOrder::MSBFirst),
            b'l' => Some(ByteOrder::LSBFirst),
            _ => None,
        }
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::LSBFirst => write!(f, "LSBFirst"),
            ByteOrder::MSBFirst => write!(f, "MSBFirst"),
        }
    }
}

bitflags! {
    /// SETofEVENT as carried in a screen's current input mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventSet: u32 {
        const KEY_PRESS             = 1 << 0;
        const KEY_RELEASE           = 1 << 1;
        const BUTTON_PRESS          = 1 << 2;
        const BUTTON_RELEASE        = 1 << 3;
        const ENTER_WINDOW          = 1 << 4;
        const LEAVE_WINDOW          = 1 << 5;
        const POINTER_MOTION        = 1 << 6;
        const POINTER_MOTION_HINT   = 1 << 7;
        const BUTTON1_MOTION        = 1 << 8;
        const BUTTON2_MOTION        = 1 << 9;
        const BUTTON3_MOTION        = 1 << 10;
        const BUTTON4_MOTION        = 1 << 11;
        const BUTTON5_MOTION        = 1 << 12;
        const BUTTON_MOTION         = 1 << 13;
        const KEYMAP_STATE          = 1 << 14;
        const EXPOSURE              = 1 << 15;
        const VISIBILITY_CHANGE     = 1 << 16;
        const STRUCTURE_NOTIFY      = 1 << 17;
        const RESIZE_REDIRECT       = 1 << 18;
        const SUBSTRUCTURE_NOTIFY   = 1 << 19;
        const SUBSTRUCTURE_REDIRECT = 1 << 20;
        const FOCUS_CHANGE          = 1 << 21;
        const PROPERTY_CHANGE       = 1 << 22;
        const COLORMAP_CHANGE       = 1 << 23;
        const OWNER_GRAB_BUTTON     = 1 << 24;
        const UNUSED                = 1 << 31;
    }
}

impl fmt::Display for EventSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:08x}", self.bits())
    }
}
