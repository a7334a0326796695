// Input delay stage between the host event distributor and the emulated machine

pub mod event_delay;
pub mod key_burst;

pub use event_delay::{DELAYED_EVENT_KINDS, Delivery, EventDelayScheduler, ScheduledEvent};
pub use key_burst::{KeyBurstTable, PendingKeyRecord, ReleaseVerdict};
