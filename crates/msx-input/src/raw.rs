/// Raw platform events, as delivered by a [`RawEventSource`](crate::source::RawEventSource).
use std::path::PathBuf;

use msx_events::{KeyCode, Modifiers, Scancode, WindowEventKind};

/// Hat direction flags, SDL layout.
pub mod hat {
    pub const CENTERED: u8 = 0x00;
    pub const UP: u8 = 0x01;
    pub const RIGHT: u8 = 0x02;
    pub const DOWN: u8 = 0x04;
    pub const LEFT: u8 = 0x08;
}

/// Application lifecycle notifications from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycle {
    Terminating,
    LowMemory,
    WillEnterBackground,
    DidEnterBackground,
    WillEnterForeground,
    DidEnterForeground,
}

/// Buttons of the on-screen D-pad overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpadButton {
    Up,
    Down,
    Left,
    Right,
    Return,
    Space,
    Tab,
    Escape,
}

impl DpadButton {
    /// Overlay index as sent by the platform layer.
    pub fn from_index(index: i32) -> Option<Self> {
        Some(match index {
            0 => DpadButton::Up,
            1 => DpadButton::Down,
            2 => DpadButton::Left,
            3 => DpadButton::Right,
            4 => DpadButton::Return,
            5 => DpadButton::Space,
            6 => DpadButton::Tab,
            7 => DpadButton::Escape,
            _ => return None,
        })
    }

    /// Key and scancode the button stands for.
    pub fn key(self) -> (KeyCode, Scancode) {
        match self {
            DpadButton::Up => (KeyCode::UP, Scancode::UP),
            DpadButton::Down => (KeyCode::DOWN, Scancode::DOWN),
            DpadButton::Left => (KeyCode::LEFT, Scancode::LEFT),
            DpadButton::Right => (KeyCode::RIGHT, Scancode::RIGHT),
            DpadButton::Return => (KeyCode::RETURN, Scancode::RETURN),
            DpadButton::Space => (KeyCode::SPACE, Scancode::SPACE),
            DpadButton::Tab => (KeyCode::TAB, Scancode::TAB),
            DpadButton::Escape => (KeyCode::ESCAPE, Scancode::ESCAPE),
        }
    }
}

/// Event as produced by the platform.
#[derive(Debug, Clone, PartialEq)]
pub enum RawEvent {
    Key {
        timestamp: u32,
        down: bool,
        key: KeyCode,
        scancode: Scancode,
        modifiers: Modifiers,
        repeat: bool,
    },
    TextInput {
        timestamp: u32,
        text: String,
    },
    /// IME composition in progress.
    TextEditing {
        timestamp: u32,
        text: String,
        start: i32,
        length: i32,
    },
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
    JoyDeviceAdded {
        timestamp: u32,
        instance_id: u32,
    },
    JoyDeviceRemoved {
        timestamp: u32,
        instance_id: u32,
    },
    JoyAxis {
        timestamp: u32,
        instance_id: u32,
        axis: u8,
        value: i16,
    },
    JoyHat {
        timestamp: u32,
        instance_id: u32,
        hat: u8,
        value: u8,
    },
    JoyButton {
        timestamp: u32,
        instance_id: u32,
        button: u8,
        down: bool,
    },
    Window {
        timestamp: u32,
        window_id: u32,
        kind: WindowEventKind,
    },
    DropFile {
        timestamp: u32,
        path: PathBuf,
    },
    Quit {
        timestamp: u32,
    },
    AppLifecycle {
        timestamp: u32,
        state: AppLifecycle,
    },
    /// Custom signal asking to turn the on-screen keyboard on or off.
    TextInputRequest {
        enable: bool,
    },
    /// Press or release on the on-screen D-pad overlay.
    VirtualDpad {
        timestamp: u32,
        button: DpadButton,
        down: bool,
    },
}

impl RawEvent {
    pub fn key_down(timestamp: u32, key: KeyCode) -> Self {
        RawEvent::Key {
            timestamp,
            down: true,
            key,
            scancode: key.default_scancode(),
            modifiers: Modifiers::empty(),
            repeat: false,
        }
    }

    pub fn key_up(timestamp: u32, key: KeyCode) -> Self {
        RawEvent::Key {
            timestamp,
            down: false,
            key,
            scancode: key.default_scancode(),
            modifiers: Modifiers::empty(),
            repeat: false,
        }
    }

    pub fn text(timestamp: u32, text: &str) -> Self {
        RawEvent::TextInput {
            timestamp,
            text: text.to_string(),
        }
    }

    pub fn window(timestamp: u32, window_id: u32, kind: WindowEventKind) -> Self {
        RawEvent::Window {
            timestamp,
            window_id,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dpad_indices() {
        assert_eq!(DpadButton::from_index(0), Some(DpadButton::Up));
        assert_eq!(DpadButton::from_index(7), Some(DpadButton::Escape));
        assert_eq!(DpadButton::from_index(8), None);
        assert_eq!(DpadButton::from_index(-1), None);
    }

    #[test]
    fn dpad_keys_use_arrow_scancodes() {
        assert_eq!(DpadButton::Left.key(), (KeyCode::LEFT, Scancode::LEFT));
        assert_eq!(DpadButton::Return.key(), (KeyCode::RETURN, Scancode::RETURN));
    }

    #[test]
    fn key_helpers_fill_scancode() {
        match RawEvent::key_down(5, KeyCode::A) {
            RawEvent::Key { down, scancode, repeat, .. } => {
                assert!(down);
                assert_eq!(scancode, Scancode(4));
                assert!(!repeat);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
