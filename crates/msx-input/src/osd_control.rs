/// On-screen virtual controller state.
///
/// Joystick axes, hats, buttons and a handful of keys drive a 6-bit mask
/// over {LEFT, RIGHT, UP, DOWN, A, B}. Internally a set bit means
/// "released", matching the hardware convention of active-low buttons.
/// Every changed bit yields exactly one press or release event.
use msx_events::{CanonicalEvent, KeyCode, OsdButton};

use crate::raw::hat;

const ALL_RELEASED: u8 = 0x3F;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OsdControlState {
    released: u8,
}

impl OsdControlState {
    pub fn new() -> Self {
        Self {
            released: ALL_RELEASED,
        }
    }

    /// Mask of pressed buttons (bit set = pressed).
    pub fn pressed_mask(&self) -> u8 {
        !self.released & ALL_RELEASED
    }

    pub fn is_pressed(&self, button: OsdButton) -> bool {
        self.pressed_mask() & button.mask() != 0
    }

    /// Replace the whole released-mask, emitting one event per changed bit.
    pub fn set_released_mask(&mut self, new_released: u8, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let new_released = new_released & ALL_RELEASED;
        let delta = self.released ^ new_released;
        for button in OsdButton::ALL {
            if delta & button.mask() != 0 {
                out.push(CanonicalEvent::OsdControl {
                    timestamp,
                    button,
                    pressed: new_released & button.mask() == 0,
                });
            }
        }
        self.released = new_released;
    }

    /// Axis 0 drives LEFT/RIGHT, axis 1 UP/DOWN; others are ignored.
    ///
    /// `value` must already have the dead zone applied (0 = centered).
    pub fn on_axis(&mut self, axis: u8, value: i32, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let (neg, pos) = match axis {
            0 => (OsdButton::Left.mask(), OsdButton::Right.mask()),
            1 => (OsdButton::Up.mask(), OsdButton::Down.mask()),
            _ => (0, 0),
        };
        let next = if value > 0 {
            (self.released | neg) & !pos
        } else if value < 0 {
            (self.released | pos) & !neg
        } else {
            self.released | neg | pos
        };
        self.set_released_mask(next, timestamp, out);
    }

    /// A hat direction whose flag is absent is released.
    pub fn on_hat(&mut self, value: u8, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let mut dir = 0;
        if value & hat::UP == 0 {
            dir |= OsdButton::Up.mask();
        }
        if value & hat::DOWN == 0 {
            dir |= OsdButton::Down.mask();
        }
        if value & hat::LEFT == 0 {
            dir |= OsdButton::Left.mask();
        }
        if value & hat::RIGHT == 0 {
            dir |= OsdButton::Right.mask();
        }
        let ab = self.released & (OsdButton::A.mask() | OsdButton::B.mask());
        self.set_released_mask(ab | dir, timestamp, out);
    }

    /// Press (`down`) or release the buttons in `mask`.
    pub fn change_buttons(&mut self, down: bool, mask: u8, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let next = if down {
            self.released & !mask
        } else {
            self.released | mask
        };
        self.set_released_mask(next, timestamp, out);
    }

    /// Even joystick buttons act as A, odd ones as B.
    pub fn on_joystick_button(&mut self, button: u8, down: bool, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let mask = if button & 1 != 0 {
            OsdButton::B.mask()
        } else {
            OsdButton::A.mask()
        };
        self.change_buttons(down, mask, timestamp, out);
    }

    /// Arrows, SPACE/RETURN (A) and ESCAPE (B).
    ///
    /// An auto-repeated press is first released so the overlay shows a
    /// fresh press.
    pub fn on_key(&mut self, key: KeyCode, down: bool, repeat: bool, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        let mask = match key {
            KeyCode::LEFT => OsdButton::Left.mask(),
            KeyCode::RIGHT => OsdButton::Right.mask(),
            KeyCode::UP => OsdButton::Up.mask(),
            KeyCode::DOWN => OsdButton::Down.mask(),
            KeyCode::SPACE | KeyCode::RETURN => OsdButton::A.mask(),
            KeyCode::ESCAPE => OsdButton::B.mask(),
            _ => return,
        };
        if repeat {
            self.change_buttons(!down, mask, timestamp, out);
        }
        self.change_buttons(down, mask, timestamp, out);
    }
}

impl Default for OsdControlState {
    fn default() -> Self {
        Self::new()
    }
}
