/// Input grab and the `escape_grab` command.
///
/// With grab enabled the emulator holds exclusive mouse and keyboard
/// capture. `escape_grab` releases it until the main window has lost and
/// regained focus, after which capture is restored.
use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, info};
use thiserror::Error;

/// Progress of a temporary grab release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeGrabState {
    /// Idle; focus changes are ignored.
    WaitCmd,
    /// Capture released, waiting for the window to lose focus.
    WaitLost,
    /// Focus lost, waiting for it to come back.
    WaitGain,
}

/// Window-system side of input capture.
pub trait WindowGrab {
    fn set_grab(&mut self, grab: bool);
}

/// Grab backend for headless use; remembers the last request.
#[derive(Debug, Default)]
pub struct HeadlessGrab {
    pub grabbed: bool,
    pub requests: usize,
}

impl WindowGrab for HeadlessGrab {
    fn set_grab(&mut self, grab: bool) {
        self.grabbed = grab;
        self.requests += 1;
    }
}

impl<W: WindowGrab + ?Sized> WindowGrab for Rc<RefCell<W>> {
    fn set_grab(&mut self, grab: bool) {
        self.borrow_mut().set_grab(grab);
    }
}

pub struct InputGrab {
    grab_input: bool,
    state: EscapeGrabState,
    window: Box<dyn WindowGrab>,
}

impl InputGrab {
    pub fn new(window: Box<dyn WindowGrab>) -> Self {
        Self {
            grab_input: false,
            state: EscapeGrabState::WaitCmd,
            window,
        }
    }

    pub fn headless() -> Self {
        Self::new(Box::new(HeadlessGrab::default()))
    }

    pub fn grab_input(&self) -> bool {
        self.grab_input
    }

    pub fn state(&self) -> EscapeGrabState {
        self.state
    }

    /// New value of the grab setting. Cancels a pending escape.
    pub fn update_grab(&mut self, grab: bool) {
        self.grab_input = grab;
        self.state = EscapeGrabState::WaitCmd;
        self.window.set_grab(grab);
    }

    /// Release capture until the next focus loss and regain.
    ///
    /// Does nothing while grab is disabled.
    pub fn escape(&mut self) {
        if !self.grab_input {
            debug!("escape_grab ignored, input is not grabbed");
            return;
        }
        self.state = EscapeGrabState::WaitLost;
        self.window.set_grab(false);
    }

    /// Focus change of the main window.
    pub fn on_focus(&mut self, gained: bool) {
        match (self.state, gained) {
            (EscapeGrabState::WaitLost, false) => self.state = EscapeGrabState::WaitGain,
            (EscapeGrabState::WaitGain, true) => {
                self.state = EscapeGrabState::WaitCmd;
                info!("focus regained, restoring input grab");
                self.window.set_grab(true);
            }
            _ => {}
        }
    }
}

impl std::fmt::Debug for InputGrab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputGrab")
            .field("grab_input", &self.grab_input)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}: target is busy")]
    Busy(&'static str),
}

/// Externally invocable console command.
pub trait Command {
    fn name(&self) -> &'static str;
    fn help(&self) -> &'static str;
    fn execute(&mut self) -> Result<(), CommandError>;
}

pub struct EscapeGrabCmd {
    target: Rc<RefCell<InputGrab>>,
}

impl EscapeGrabCmd {
    pub fn new(target: Rc<RefCell<InputGrab>>) -> Self {
        Self { target }
    }
}

impl Command for EscapeGrabCmd {
    fn name(&self) -> &'static str {
        "escape_grab"
    }

    fn help(&self) -> &'static str {
        "Temporarily release input grab."
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        let mut grab = self
            .target
            .try_borrow_mut()
            .map_err(|_| CommandError::Busy(self.name()))?;
        grab.escape();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grab_with_probe() -> (InputGrab, Rc<RefCell<HeadlessGrab>>) {
        let probe = Rc::new(RefCell::new(HeadlessGrab::default()));
        let grab = InputGrab::new(Box::new(Rc::clone(&probe)));
        (grab, probe)
    }

    #[test]
    fn update_grab_applies_setting() {
        let (mut grab, probe) = grab_with_probe();
        grab.update_grab(true);
        assert!(probe.borrow().grabbed);
        assert_eq!(grab.state(), EscapeGrabState::WaitCmd);
    }

    #[test]
    fn escape_loop() {
        let (mut grab, probe) = grab_with_probe();
        grab.update_grab(true);

        grab.escape();
        assert_eq!(grab.state(), EscapeGrabState::WaitLost);
        assert!(!probe.borrow().grabbed);

        grab.on_focus(true);
        assert_eq!(grab.state(), EscapeGrabState::WaitLost);

        grab.on_focus(false);
        assert_eq!(grab.state(), EscapeGrabState::WaitGain);
        assert!(!probe.borrow().grabbed);

        grab.on_focus(true);
        assert_eq!(grab.state(), EscapeGrabState::WaitCmd);
        assert!(probe.borrow().grabbed);
    }

    #[test]
    fn focus_changes_are_ignored_while_idle() {
        let (mut grab, probe) = grab_with_probe();
        grab.update_grab(true);
        let requests = probe.borrow().requests;
        grab.on_focus(false);
        grab.on_focus(true);
        assert_eq!(grab.state(), EscapeGrabState::WaitCmd);
        assert_eq!(probe.borrow().requests, requests);
    }

    #[test]
    fn escape_without_grab_is_noop() {
        let (mut grab, probe) = grab_with_probe();
        grab.escape();
        assert_eq!(grab.state(), EscapeGrabState::WaitCmd);
        assert_eq!(probe.borrow().requests, 0);
    }

    #[test]
    fn setting_change_cancels_escape() {
        let (mut grab, _probe) = grab_with_probe();
        grab.update_grab(true);
        grab.escape();
        grab.update_grab(true);
        assert_eq!(grab.state(), EscapeGrabState::WaitCmd);
    }

    #[test]
    fn command_drives_shared_grab() {
        let target = Rc::new(RefCell::new(InputGrab::headless()));
        target.borrow_mut().update_grab(true);
        let mut cmd = EscapeGrabCmd::new(Rc::clone(&target));
        assert_eq!(cmd.name(), "escape_grab");
        cmd.execute().unwrap();
        assert_eq!(target.borrow().state(), EscapeGrabState::WaitLost);
    }

    #[test]
    fn command_reports_busy_target() {
        let target = Rc::new(RefCell::new(InputGrab::headless()));
        let mut cmd = EscapeGrabCmd::new(Rc::clone(&target));
        let _held = target.borrow_mut();
        assert!(matches!(cmd.execute(), Err(CommandError::Busy("escape_grab"))));
    }
}
