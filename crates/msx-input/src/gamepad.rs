/// Gamepad raw event source backed by gilrs.
///
/// gilrs reports normalized floats and named buttons; this adapter turns
/// them into the SDL-style joystick events the normalizer expects: axes as
/// signed 16-bit values (Y pointing down), buttons by index, and the D-pad
/// buttons folded into hat 0.
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use anyhow::{Result, anyhow};
use gilrs::{Axis, Button, EventType, Gilrs};
use log::{info, trace, warn};
use msx_events::RealClock;

use crate::raw::{RawEvent, hat};
use crate::source::RawEventSource;

const AXIS_SCALE: f32 = 32767.0;

/// Gamepad state → raw event queue, independent of the gilrs context.
#[derive(Debug, Default)]
pub struct GamepadTranslator {
    queue: VecDeque<RawEvent>,
    /// Current hat value per instance, built from D-pad buttons.
    hats: HashMap<u32, u8>,
}

impl GamepadTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connected(&mut self, timestamp: u32, instance_id: u32) {
        self.queue.push_back(RawEvent::JoyDeviceAdded {
            timestamp,
            instance_id,
        });
    }

    pub fn disconnected(&mut self, timestamp: u32, instance_id: u32) {
        self.hats.remove(&instance_id);
        self.queue.push_back(RawEvent::JoyDeviceRemoved {
            timestamp,
            instance_id,
        });
    }

    /// D-pad buttons update hat 0 and only report actual changes.
    pub fn button(&mut self, timestamp: u32, instance_id: u32, button: Button, down: bool) {
        if let Some(flag) = dpad_flag(button) {
            let current = self.hats.entry(instance_id).or_insert(hat::CENTERED);
            let next = if down { *current | flag } else { *current & !flag };
            if next != *current {
                *current = next;
                self.queue.push_back(RawEvent::JoyHat {
                    timestamp,
                    instance_id,
                    hat: 0,
                    value: next,
                });
            }
        } else if let Some(index) = button_index(button) {
            self.queue.push_back(RawEvent::JoyButton {
                timestamp,
                instance_id,
                button: index,
                down,
            });
        }
    }

    pub fn axis(&mut self, timestamp: u32, instance_id: u32, axis: Axis, value: f32) {
        if let Some(index) = axis_index(axis) {
            self.queue.push_back(RawEvent::JoyAxis {
                timestamp,
                instance_id,
                axis: index,
                value: scale_axis(axis, value),
            });
        }
    }

    /// Hat value tracked for `instance_id`, if any D-pad button was seen.
    pub fn hat(&self, instance_id: u32) -> Option<u8> {
        self.hats.get(&instance_id).copied()
    }

    pub fn pop(&mut self) -> Option<RawEvent> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

pub struct GilrsSource<C: RealClock> {
    gilrs: Gilrs,
    clock: C,
    translator: GamepadTranslator,
}

impl<C: RealClock> GilrsSource<C> {
    /// Open the gamepad subsystem. Pads already connected are reported as
    /// device-added events on the first poll.
    pub fn new(clock: C) -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| {
            warn!("gamepad input unavailable: {e}");
            anyhow!("Failed to initialize gamepad input: {e}")
        })?;
        let timestamp = clock.ticks_ms();
        let mut translator = GamepadTranslator::new();
        for (id, pad) in gilrs.gamepads() {
            info!("gamepad found: {}", pad.name());
            translator.connected(timestamp, usize::from(id) as u32);
        }
        Ok(Self {
            gilrs,
            clock,
            translator,
        })
    }

    fn pump(&mut self) {
        while let Some(event) = self.gilrs.next_event() {
            self.translate(event);
        }
    }

    fn translate(&mut self, event: gilrs::Event) {
        let timestamp = self.clock.ticks_ms();
        let instance_id = usize::from(event.id) as u32;
        let translator = &mut self.translator;
        match event.event {
            EventType::Connected => translator.connected(timestamp, instance_id),
            EventType::Disconnected => translator.disconnected(timestamp, instance_id),
            EventType::ButtonPressed(button, _) => {
                translator.button(timestamp, instance_id, button, true)
            }
            EventType::ButtonReleased(button, _) => {
                translator.button(timestamp, instance_id, button, false)
            }
            EventType::AxisChanged(axis, value, _) => {
                translator.axis(timestamp, instance_id, axis, value)
            }
            other => trace!("ignoring gamepad event {other:?}"),
        }
    }
}

impl<C: RealClock> RawEventSource for GilrsSource<C> {
    fn poll_event(&mut self) -> Option<RawEvent> {
        if self.translator.is_empty() {
            self.pump();
        }
        self.translator.pop()
    }

    fn wait_event(&mut self, timeout: Option<Duration>) -> bool {
        self.pump();
        while self.translator.is_empty() {
            // An untimed wait retries past events that translate to nothing.
            match self.gilrs.next_event_blocking(timeout) {
                Some(event) => self.translate(event),
                None => return false,
            }
            self.pump();
            if timeout.is_some() {
                break;
            }
        }
        !self.translator.is_empty()
    }

    fn set_text_input(&mut self, enabled: bool) {
        trace!("gamepad source has no text input (requested {enabled})");
    }
}

/// SDL-style button index of a gilrs button.
pub fn button_index(button: Button) -> Option<u8> {
    Some(match button {
        Button::South => 0,
        Button::East => 1,
        Button::West => 2,
        Button::North => 3,
        Button::LeftTrigger => 4,
        Button::RightTrigger => 5,
        Button::Select => 6,
        Button::Start => 7,
        Button::Mode => 8,
        Button::LeftThumb => 9,
        Button::RightThumb => 10,
        Button::LeftTrigger2 => 11,
        Button::RightTrigger2 => 12,
        Button::C => 13,
        Button::Z => 14,
        _ => return None,
    })
}

/// SDL-style axis index. D-pad axes are not mapped.
pub fn axis_index(axis: Axis) -> Option<u8> {
    Some(match axis {
        Axis::LeftStickX => 0,
        Axis::LeftStickY => 1,
        Axis::RightStickX => 2,
        Axis::RightStickY => 3,
        Axis::LeftZ => 4,
        Axis::RightZ => 5,
        _ => return None,
    })
}

/// Hat flag of a D-pad button.
pub fn dpad_flag(button: Button) -> Option<u8> {
    match button {
        Button::DPadUp => Some(hat::UP),
        Button::DPadDown => Some(hat::DOWN),
        Button::DPadLeft => Some(hat::LEFT),
        Button::DPadRight => Some(hat::RIGHT),
        _ => None,
    }
}

/// `[-1, 1]` → `[-32767, 32767]`; Y axes flipped to point down.
pub fn scale_axis(axis: Axis, value: f32) -> i16 {
    let value = if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) };
    let value = match axis {
        Axis::LeftStickY | Axis::RightStickY => -value,
        _ => value,
    };
    (value * AXIS_SCALE).round() as i16
}
