// Platform input normalization: raw events in, canonical events out

pub mod gamepad;
pub mod grab;
pub mod joystick;
pub mod normalizer;
pub mod osd_control;
pub mod raw;
pub mod source;
pub mod text_keys;

pub use gamepad::{GamepadTranslator, GilrsSource};
pub use grab::{Command, CommandError, EscapeGrabCmd, EscapeGrabState, HeadlessGrab, InputGrab, WindowGrab};
pub use joystick::JoystickManager;
pub use normalizer::InputNormalizer;
pub use osd_control::OsdControlState;
pub use raw::{AppLifecycle, DpadButton, RawEvent};
pub use source::{RawEventSource, VirtualEventSource};
pub use text_keys::key_for_char;
