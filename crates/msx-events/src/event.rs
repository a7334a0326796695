//! Canonical input events.
//!
//! The closed set of normalized events that flows from the input
//! normalizer through the host distributor into the emulated machine.

use std::path::PathBuf;

use crate::keys::{KeyCode, Modifiers, Scancode};

/// Namespace bit for key identities derived from a unicode code point.
pub const UNICODE_IDENTITY_BIT: i32 = 0x4000_0000;

/// 1-based joystick number as seen by the emulated machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoystickId(pub u32);

impl std::fmt::Display for JoystickId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "joystick{}", self.0)
    }
}

/// Button of the on-screen virtual controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsdButton {
    Left = 0,
    Right = 1,
    Up = 2,
    Down = 3,
    A = 4,
    B = 5,
}

impl OsdButton {
    pub const ALL: [OsdButton; 6] = [
        OsdButton::Left,
        OsdButton::Right,
        OsdButton::Up,
        OsdButton::Down,
        OsdButton::A,
        OsdButton::B,
    ];

    /// Bit of this button in a 6-bit control mask.
    pub const fn mask(self) -> u8 {
        1 << self as u8
    }
}

/// Key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Source timestamp in platform milliseconds.
    pub timestamp: u32,
    pub key: KeyCode,
    pub scancode: Scancode,
    pub modifiers: Modifiers,
    /// Unicode code point, 0 if none.
    pub unicode: u32,
    pub repeat: bool,
}

impl KeyEvent {
    pub fn new(timestamp: u32, key: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            timestamp,
            key,
            scancode: key.default_scancode(),
            modifiers,
            unicode: 0,
            repeat: false,
        }
    }

    /// Key-less event that only carries a code point (split text input).
    pub fn from_unicode(timestamp: u32, unicode: u32) -> Self {
        Self {
            timestamp,
            key: KeyCode::UNKNOWN,
            scancode: Scancode::UNKNOWN,
            modifiers: Modifiers::empty(),
            unicode,
            repeat: false,
        }
    }

    pub fn with_unicode(mut self, unicode: u32) -> Self {
        self.unicode = unicode;
        self
    }

    /// Identity used to pair a release with its press.
    ///
    /// Unicode-only events live in their own namespace so they never
    /// collide with physical keys.
    pub fn key_identity(&self) -> i32 {
        if self.key == KeyCode::UNKNOWN && self.unicode != 0 {
            self.unicode as i32 | UNICODE_IDENTITY_BIT
        } else {
            self.key.masked()
        }
    }
}

/// Committed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEvent {
    pub timestamp: u32,
    pub text: String,
}

/// What happened to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEventKind {
    FocusGained,
    FocusLost,
    Close,
    Exposed,
    Resized { width: u32, height: u32 },
    /// Platform window event with no canonical meaning.
    Other(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowEvent {
    pub timestamp: u32,
    pub window_id: u32,
    pub kind: WindowEventKind,
}

/// Fieldless tag of a [`CanonicalEvent`], used for listener registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    TextInput,
    MouseMotion,
    MouseButtonDown,
    MouseButtonUp,
    MouseWheel,
    JoyAxisMotion,
    JoyHat,
    JoyButtonDown,
    JoyButtonUp,
    OsdControlPress,
    OsdControlRelease,
    Window,
    FileDrop,
    Quit,
}

/// Normalized input event.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalEvent {
    KeyDown(KeyEvent),
    KeyUp(KeyEvent),
    TextInput(TextEvent),
    MouseMotion {
        timestamp: u32,
        x: i32,
        y: i32,
        xrel: i32,
        yrel: i32,
    },
    MouseButton {
        timestamp: u32,
        button: u8,
        down: bool,
        x: i32,
        y: i32,
    },
    MouseWheel {
        timestamp: u32,
        x: i32,
        y: i32,
    },
    JoystickAxis {
        timestamp: u32,
        joystick: JoystickId,
        axis: u8,
        value: i16,
    },
    JoystickHat {
        timestamp: u32,
        joystick: JoystickId,
        hat: u8,
        value: u8,
    },
    JoystickButton {
        timestamp: u32,
        joystick: JoystickId,
        button: u8,
        down: bool,
    },
    OsdControl {
        timestamp: u32,
        button: OsdButton,
        pressed: bool,
    },
    Window(WindowEvent),
    FileDrop {
        timestamp: u32,
        path: PathBuf,
    },
    Quit {
        timestamp: u32,
    },
}

impl CanonicalEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            CanonicalEvent::KeyDown(_) => EventKind::KeyDown,
            CanonicalEvent::KeyUp(_) => EventKind::KeyUp,
            CanonicalEvent::TextInput(_) => EventKind::TextInput,
            CanonicalEvent::MouseMotion { .. } => EventKind::MouseMotion,
            CanonicalEvent::MouseButton { down: true, .. } => EventKind::MouseButtonDown,
            CanonicalEvent::MouseButton { down: false, .. } => EventKind::MouseButtonUp,
            CanonicalEvent::MouseWheel { .. } => EventKind::MouseWheel,
            CanonicalEvent::JoystickAxis { .. } => EventKind::JoyAxisMotion,
            CanonicalEvent::JoystickHat { .. } => EventKind::JoyHat,
            CanonicalEvent::JoystickButton { down: true, .. } => EventKind::JoyButtonDown,
            CanonicalEvent::JoystickButton { down: false, .. } => EventKind::JoyButtonUp,
            CanonicalEvent::OsdControl { pressed: true, .. } => EventKind::OsdControlPress,
            CanonicalEvent::OsdControl { pressed: false, .. } => EventKind::OsdControlRelease,
            CanonicalEvent::Window(_) => EventKind::Window,
            CanonicalEvent::FileDrop { .. } => EventKind::FileDrop,
            CanonicalEvent::Quit { .. } => EventKind::Quit,
        }
    }

    /// Source timestamp in platform milliseconds.
    pub fn timestamp(&self) -> u32 {
        match self {
            CanonicalEvent::KeyDown(k) | CanonicalEvent::KeyUp(k) => k.timestamp,
            CanonicalEvent::TextInput(t) => t.timestamp,
            CanonicalEvent::Window(w) => w.timestamp,
            CanonicalEvent::MouseMotion { timestamp, .. }
            | CanonicalEvent::MouseButton { timestamp, .. }
            | CanonicalEvent::MouseWheel { timestamp, .. }
            | CanonicalEvent::JoystickAxis { timestamp, .. }
            | CanonicalEvent::JoystickHat { timestamp, .. }
            | CanonicalEvent::JoystickButton { timestamp, .. }
            | CanonicalEvent::OsdControl { timestamp, .. }
            | CanonicalEvent::FileDrop { timestamp, .. }
            | CanonicalEvent::Quit { timestamp } => *timestamp,
        }
    }

    /// Key payload of a KeyDown/KeyUp event.
    pub fn as_key(&self) -> Option<&KeyEvent> {
        match self {
            CanonicalEvent::KeyDown(k) | CanonicalEvent::KeyUp(k) => Some(k),
            _ => None,
        }
    }
}
