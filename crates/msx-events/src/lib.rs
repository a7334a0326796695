//! Canonical input events and the collaborators that carry them.
//!
//! - [`CanonicalEvent`]: the closed set of normalized input events
//! - [`EventDistributor`]: host-side priority fan-out to listeners
//! - [`EventSink`]: machine-side delivery at an emulated instant
//! - [`VirtualScheduler`]: emulated-time sync points
//! - [`RealClock`]: host time, as seen by raw event timestamps

pub mod clock;
pub mod distributor;
pub mod event;
pub mod keys;
pub mod scheduler;
pub mod time;

pub use clock::{ManualClock, RealClock, SystemClock};
pub use distributor::{
    DistributeError, EventDistributor, EventListener, EventSink, Priority, RecordingSink,
};
pub use event::{
    CanonicalEvent, EventKind, JoystickId, KeyEvent, OsdButton, TextEvent, UNICODE_IDENTITY_BIT,
    WindowEvent, WindowEventKind,
};
pub use keys::{KeyCode, Modifiers, SCANCODE_MASK, Scancode, normalize_modifiers};
pub use scheduler::{SyncPointQueue, VirtualScheduler};
pub use time::{EmuDuration, EmuTime, MAIN_FREQ};
