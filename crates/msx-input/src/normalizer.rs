/// Raw platform events → canonical events.
///
/// One pass of [`InputNormalizer::poll`] drains the raw queue. A key press
/// is held back for one event: if the next raw event is committed text,
/// the press inherits the first code point of that text (platforms report
/// key and character separately, the MSX keyboard wants them together).
///
/// While the on-screen keyboard is active, committed text is replayed as
/// synthetic key presses and most physical keys are suppressed.
use std::cell::RefCell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

use log::{debug, info, trace};
use msx_config::InputConfig;
use msx_events::{
    CanonicalEvent, JoystickId, KeyCode, KeyEvent, Modifiers, RealClock, TextEvent, WindowEvent,
    WindowEventKind, normalize_modifiers,
};

use crate::grab::{EscapeGrabCmd, InputGrab, WindowGrab};
use crate::joystick::JoystickManager;
use crate::osd_control::OsdControlState;
use crate::raw::{DpadButton, RawEvent};
use crate::source::RawEventSource;
use crate::text_keys::key_for_char;

/// Back-off used by [`InputNormalizer::wait`] while the platform is not up.
const UNINITIALIZED_WAIT: Duration = Duration::from_millis(100);

/// Gap between a synthetic press and its release, in ms.
const SYNTHETIC_HOLD_MS: u32 = 2;

/// Keys that stay live while the on-screen keyboard is active.
fn passes_through_ime(key: KeyCode) -> bool {
    matches!(
        key,
        KeyCode::RETURN
            | KeyCode::KP_ENTER
            | KeyCode::BACKSPACE
            | KeyCode::TAB
            | KeyCode::ESCAPE
            | KeyCode::LEFT
            | KeyCode::RIGHT
            | KeyCode::UP
            | KeyCode::DOWN
            | KeyCode::DELETE
    )
}

pub struct InputNormalizer<S: RawEventSource, C: RealClock> {
    source: S,
    clock: C,
    joysticks: JoystickManager,
    osd: OsdControlState,
    grab: Rc<RefCell<InputGrab>>,
    ime_enabled: bool,
    sent_quit: bool,
    /// `None`: every window counts as the main window.
    main_window: Option<u32>,
    /// Next free synthetic timestamp.
    next_synthetic: u32,
}

impl<S: RawEventSource, C: RealClock> InputNormalizer<S, C> {
    pub fn new(source: S, clock: C) -> Self {
        Self::with_grab(source, clock, InputGrab::headless())
    }

    pub fn with_window_grab(source: S, clock: C, window: Box<dyn WindowGrab>) -> Self {
        Self::with_grab(source, clock, InputGrab::new(window))
    }

    fn with_grab(source: S, clock: C, grab: InputGrab) -> Self {
        Self {
            source,
            clock,
            joysticks: JoystickManager::new(),
            osd: OsdControlState::new(),
            grab: Rc::new(RefCell::new(grab)),
            ime_enabled: false,
            sent_quit: false,
            main_window: None,
            next_synthetic: 0,
        }
    }

    /// Drain every queued raw event.
    pub fn poll(&mut self) -> Vec<CanonicalEvent> {
        let mut out = Vec::new();
        let mut held: Option<KeyEvent> = None;
        while let Some(raw) = self.source.poll_event() {
            self.process(raw, &mut held, &mut out);
        }
        if let Some(key) = held.take() {
            self.handle_key_down(key, 0, &mut out);
        }
        out
    }

    /// Block until at least one raw event is queued, then [`poll`](Self::poll).
    pub fn wait(&mut self) -> Vec<CanonicalEvent> {
        if !self.source.is_initialized() {
            thread::sleep(UNINITIALIZED_WAIT);
        }
        if self.source.wait_event(None) {
            self.poll()
        } else {
            Vec::new()
        }
    }

    fn process(&mut self, raw: RawEvent, held: &mut Option<KeyEvent>, out: &mut Vec<CanonicalEvent>) {
        match raw {
            RawEvent::TextInputRequest { enable } => {
                self.flush_held(held, out);
                self.set_ime_enabled(enable);
                return;
            }
            RawEvent::TextEditing { .. } => return,
            RawEvent::VirtualDpad {
                timestamp,
                button,
                down,
            } => {
                self.set_ime_enabled(false);
                let event = dpad_key(timestamp, button, down);
                self.process(event, held, out);
                return;
            }
            RawEvent::Window {
                kind: WindowEventKind::FocusLost,
                ..
            } => {
                if held.take().is_some() {
                    debug!("focus lost, dropping held key press");
                }
            }
            RawEvent::AppLifecycle { state, .. } => {
                if held.take().is_some() {
                    debug!("app state {state:?}, dropping held key press");
                }
            }
            _ => {}
        }

        if self.ime_enabled {
            self.flush_held(held, out);
            match raw {
                RawEvent::TextInput { timestamp, text } => {
                    if !text.is_empty() {
                        self.commit_text(timestamp, &text, out);
                        out.push(CanonicalEvent::TextInput(TextEvent { timestamp, text }));
                    }
                }
                RawEvent::Key { key, .. } if !passes_through_ime(key) => {
                    trace!("suppressing key {key:?} while text input is active");
                }
                other => self.handle(other, out),
            }
            return;
        }

        if let Some(prev) = held.take() {
            if let RawEvent::TextInput { timestamp, text } = raw {
                let mut chars = text.chars();
                let unicode = chars.next().map_or(0, u32::from);
                self.handle_key_down(prev, unicode, out);
                if unicode != 0 {
                    Self::split_text(timestamp, chars.as_str(), out);
                }
                out.push(CanonicalEvent::TextInput(TextEvent { timestamp, text }));
                return;
            }
            self.handle_key_down(prev, 0, out);
        }

        match raw {
            RawEvent::Key {
                timestamp,
                down: true,
                key,
                scancode,
                modifiers,
                repeat,
            } => {
                *held = Some(KeyEvent {
                    timestamp,
                    key,
                    scancode,
                    modifiers,
                    unicode: 0,
                    repeat,
                });
            }
            other => self.handle(other, out),
        }
    }

    fn flush_held(&mut self, held: &mut Option<KeyEvent>, out: &mut Vec<CanonicalEvent>) {
        if let Some(key) = held.take() {
            self.handle_key_down(key, 0, out);
        }
    }

    fn handle(&mut self, raw: RawEvent, out: &mut Vec<CanonicalEvent>) {
        match raw {
            RawEvent::Key {
                timestamp,
                down,
                key,
                scancode,
                modifiers,
                repeat,
            } => {
                let event = KeyEvent {
                    timestamp,
                    key,
                    scancode,
                    modifiers,
                    unicode: 0,
                    repeat,
                };
                if down {
                    self.handle_key_down(event, 0, out);
                } else {
                    self.handle_key_up(event, out);
                }
            }
            RawEvent::TextInput { timestamp, text } => {
                Self::split_text(timestamp, &text, out);
                out.push(CanonicalEvent::TextInput(TextEvent { timestamp, text }));
            }
            RawEvent::MouseMotion {
                timestamp,
                x,
                y,
                xrel,
                yrel,
            } => out.push(CanonicalEvent::MouseMotion {
                timestamp,
                x,
                y,
                xrel,
                yrel,
            }),
            RawEvent::MouseButton {
                timestamp,
                button,
                down,
                x,
                y,
            } => out.push(CanonicalEvent::MouseButton {
                timestamp,
                button,
                down,
                x,
                y,
            }),
            RawEvent::MouseWheel { timestamp, x, y } => {
                out.push(CanonicalEvent::MouseWheel { timestamp, x, y })
            }
            RawEvent::JoyDeviceAdded { instance_id, .. } => {
                self.joysticks.add(instance_id);
            }
            RawEvent::JoyDeviceRemoved { instance_id, .. } => {
                self.joysticks.remove(instance_id);
            }
            RawEvent::JoyAxis {
                timestamp,
                instance_id,
                axis,
                value,
            } => {
                let Some(joystick) = self.resolve_joystick(instance_id) else {
                    return;
                };
                let filtered = self.joysticks.filter_axis(joystick, value);
                self.osd.on_axis(axis, filtered, timestamp, out);
                out.push(CanonicalEvent::JoystickAxis {
                    timestamp,
                    joystick,
                    axis,
                    value,
                });
            }
            RawEvent::JoyHat {
                timestamp,
                instance_id,
                hat,
                value,
            } => {
                let Some(joystick) = self.resolve_joystick(instance_id) else {
                    return;
                };
                self.osd.on_hat(value, timestamp, out);
                out.push(CanonicalEvent::JoystickHat {
                    timestamp,
                    joystick,
                    hat,
                    value,
                });
            }
            RawEvent::JoyButton {
                timestamp,
                instance_id,
                button,
                down,
            } => {
                let Some(joystick) = self.resolve_joystick(instance_id) else {
                    return;
                };
                self.osd.on_joystick_button(button, down, timestamp, out);
                out.push(CanonicalEvent::JoystickButton {
                    timestamp,
                    joystick,
                    button,
                    down,
                });
            }
            RawEvent::Window {
                timestamp,
                window_id,
                kind,
            } => self.handle_window(timestamp, window_id, kind, out),
            RawEvent::DropFile { timestamp, path } => {
                out.push(CanonicalEvent::FileDrop { timestamp, path })
            }
            RawEvent::Quit { timestamp } => self.quit_once(timestamp, out),
            // Consumed in `process`.
            RawEvent::TextEditing { .. }
            | RawEvent::AppLifecycle { .. }
            | RawEvent::TextInputRequest { .. }
            | RawEvent::VirtualDpad { .. } => {}
        }
    }

    /// Emit a key press carrying `unicode`, preceded by its OSD events.
    pub fn handle_key_down(&mut self, mut key: KeyEvent, unicode: u32, out: &mut Vec<CanonicalEvent>) {
        key.modifiers = normalize_modifiers(key.key, key.modifiers);
        key.unicode = unicode;
        self.osd
            .on_key(key.key, true, key.repeat, key.timestamp, out);
        out.push(CanonicalEvent::KeyDown(key));
    }

    fn handle_key_up(&mut self, mut key: KeyEvent, out: &mut Vec<CanonicalEvent>) {
        key.modifiers = normalize_modifiers(key.key, key.modifiers);
        self.osd.on_key(key.key, false, false, key.timestamp, out);
        out.push(CanonicalEvent::KeyUp(key));
    }

    fn handle_window(
        &mut self,
        timestamp: u32,
        window_id: u32,
        kind: WindowEventKind,
        out: &mut Vec<CanonicalEvent>,
    ) {
        let main = self.is_main_window(window_id);
        match kind {
            WindowEventKind::Close if main => {
                self.quit_once(timestamp, out);
                return;
            }
            WindowEventKind::FocusGained | WindowEventKind::FocusLost if main => {
                let gained = kind == WindowEventKind::FocusGained;
                match self.grab.try_borrow_mut() {
                    Ok(mut grab) => grab.on_focus(gained),
                    Err(_) => debug!("input grab busy, focus change not tracked"),
                }
            }
            _ => {}
        }
        out.push(CanonicalEvent::Window(WindowEvent {
            timestamp,
            window_id,
            kind,
        }));
    }

    fn resolve_joystick(&self, instance_id: u32) -> Option<JoystickId> {
        let id = self.joysticks.translate(instance_id);
        if id.is_none() {
            trace!("dropping event of unregistered joystick instance {instance_id}");
        }
        id
    }

    /// Emit a single `Quit`, however many quit signals arrive.
    pub fn quit_once(&mut self, timestamp: u32, out: &mut Vec<CanonicalEvent>) {
        if self.sent_quit {
            return;
        }
        self.sent_quit = true;
        out.push(CanonicalEvent::Quit { timestamp });
    }

    /// Replay on-screen keyboard text as key presses and releases.
    ///
    /// Characters with no key are skipped. Every emitted event gets its own
    /// timestamp, later than any synthesized before.
    pub fn commit_text(&mut self, timestamp: u32, text: &str, out: &mut Vec<CanonicalEvent>) {
        let mut ts = self
            .clock
            .ticks_ms()
            .max(timestamp)
            .max(self.next_synthetic);
        for c in text.chars() {
            let Some((key, shift)) = key_for_char(c) else {
                trace!("no key for {c:?}, skipped");
                continue;
            };
            let unicode = u32::from(c);
            if shift {
                let shift_key = KeyEvent::new(ts, KeyCode::LSHIFT, Modifiers::empty());
                out.push(CanonicalEvent::KeyDown(shift_key));
                ts = ts.wrapping_add(1);
            }
            out.push(CanonicalEvent::KeyDown(
                KeyEvent::new(ts, key, Modifiers::empty()).with_unicode(unicode),
            ));
            out.push(CanonicalEvent::KeyUp(
                KeyEvent::new(ts.wrapping_add(SYNTHETIC_HOLD_MS), key, Modifiers::empty())
                    .with_unicode(unicode),
            ));
            ts = ts.wrapping_add(SYNTHETIC_HOLD_MS + 1);
            if shift {
                let shift_key = KeyEvent::new(ts, KeyCode::LSHIFT, Modifiers::empty());
                out.push(CanonicalEvent::KeyUp(shift_key));
                ts = ts.wrapping_add(1);
            }
        }
        self.next_synthetic = ts;
    }

    /// One key-less press per code point of `text`, all at `timestamp`.
    pub fn split_text(timestamp: u32, text: &str, out: &mut Vec<CanonicalEvent>) {
        out.extend(
            text.chars()
                .map(|c| CanonicalEvent::KeyDown(KeyEvent::from_unicode(timestamp, u32::from(c)))),
        );
    }

    pub fn ime_enabled(&self) -> bool {
        self.ime_enabled
    }

    /// Turn on-screen keyboard mode on or off and tell the platform.
    pub fn set_ime_enabled(&mut self, enabled: bool) {
        if self.ime_enabled != enabled {
            info!("text input {}", if enabled { "enabled" } else { "disabled" });
        }
        self.ime_enabled = enabled;
        self.source.set_text_input(enabled);
    }

    pub fn set_main_window(&mut self, window_id: Option<u32>) {
        self.main_window = window_id;
    }

    fn is_main_window(&self, window_id: u32) -> bool {
        self.main_window.is_none_or(|main| main == window_id)
    }

    pub fn apply_config(&mut self, config: &InputConfig) {
        self.joysticks.apply_config(config);
        let changed = self.grab.borrow().grab_input() != config.grab_input;
        if changed {
            self.grab.borrow_mut().update_grab(config.grab_input);
        }
    }

    pub fn quit_sent(&self) -> bool {
        self.sent_quit
    }

    pub fn osd_state(&self) -> &OsdControlState {
        &self.osd
    }

    pub fn joysticks(&self) -> &JoystickManager {
        &self.joysticks
    }

    pub fn joysticks_mut(&mut self) -> &mut JoystickManager {
        &mut self.joysticks
    }

    pub fn grab_handle(&self) -> Rc<RefCell<InputGrab>> {
        Rc::clone(&self.grab)
    }

    /// The `escape_grab` command bound to this normalizer's grab state.
    pub fn escape_grab_command(&self) -> EscapeGrabCmd {
        EscapeGrabCmd::new(self.grab_handle())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }
}

fn dpad_key(timestamp: u32, button: DpadButton, down: bool) -> RawEvent {
    let (key, scancode) = button.key();
    RawEvent::Key {
        timestamp,
        down,
        key,
        scancode,
        modifiers: Modifiers::empty(),
        repeat: false,
    }
}
