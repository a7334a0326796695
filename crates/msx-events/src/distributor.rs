//! Event fan-out.
//!
//! [`EventDistributor`] is the host-side hub: producers queue canonical
//! events, listeners registered per [`EventKind`] receive them in priority
//! order. [`EventSink`] is the machine-side entry point that receives
//! events together with the emulated time they take effect.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use log::trace;
use thiserror::Error;

use crate::event::{CanonicalEvent, EventKind};
use crate::time::EmuTime;

/// Listener priority tier. Tiers are served in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    Console,
    Hotkey,
    Msx,
    Other,
}

/// Receiver of host-side events.
pub trait EventListener {
    /// Handle `event`. Returning `true` blocks listeners of lower tiers.
    fn signal_event(&mut self, event: &CanonicalEvent) -> bool;
}

struct Registration {
    priority: Priority,
    listener: Weak<RefCell<dyn EventListener>>,
}

impl Registration {
    fn points_to(&self, target: *const ()) -> bool {
        self.listener.as_ptr() as *const () == target
    }
}

/// Priority-ordered fan-out of canonical events.
///
/// Listeners are held weakly; a dropped listener silently disappears.
#[derive(Default)]
pub struct EventDistributor {
    listeners: BTreeMap<EventKind, Vec<Registration>>,
    queue: Vec<CanonicalEvent>,
}

impl EventDistributor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind`. Within a tier, earlier registrations
    /// are served first.
    pub fn register_event_listener<L>(
        &mut self,
        kind: EventKind,
        listener: &Rc<RefCell<L>>,
        priority: Priority,
    ) where
        L: EventListener + 'static,
    {
        let dyn_listener: Rc<RefCell<dyn EventListener>> = listener.clone();
        let entries = self.listeners.entry(kind).or_default();
        let pos = entries
            .iter()
            .position(|r| r.priority > priority)
            .unwrap_or(entries.len());
        entries.insert(
            pos,
            Registration {
                priority,
                listener: Rc::downgrade(&dyn_listener),
            },
        );
    }

    pub fn unregister_event_listener<L>(&mut self, kind: EventKind, listener: &Rc<RefCell<L>>)
    where
        L: EventListener + 'static,
    {
        let target = Rc::as_ptr(listener) as *const ();
        if let Some(entries) = self.listeners.get_mut(&kind) {
            entries.retain(|r| !r.points_to(target));
        }
    }

    /// Number of live listeners for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .get(&kind)
            .map(|entries| entries.iter().filter(|r| r.listener.strong_count() > 0).count())
            .unwrap_or(0)
    }

    /// Queue an event for the next [`deliver_events`](Self::deliver_events).
    pub fn distribute_event(&mut self, event: CanonicalEvent) {
        self.queue.push(event);
    }

    pub fn distribute_all(&mut self, events: impl IntoIterator<Item = CanonicalEvent>) {
        self.queue.extend(events);
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Deliver every queued event, in queue order.
    pub fn deliver_events(&mut self) {
        let events = std::mem::take(&mut self.queue);
        for event in &events {
            self.deliver(event);
        }
    }

    fn deliver(&mut self, event: &CanonicalEvent) {
        let Some(entries) = self.listeners.get_mut(&event.kind()) else {
            return;
        };
        entries.retain(|r| r.listener.strong_count() > 0);
        let targets: Vec<(Priority, Rc<RefCell<dyn EventListener>>)> = entries
            .iter()
            .filter_map(|r| r.listener.upgrade().map(|l| (r.priority, l)))
            .collect();

        let mut blocked_below: Option<Priority> = None;
        for (priority, listener) in targets {
            if blocked_below.is_some_and(|p| priority > p) {
                trace!("{:?} blocked for tier {:?}", event.kind(), priority);
                break;
            }
            if listener.borrow_mut().signal_event(event) {
                blocked_below.get_or_insert(priority);
            }
        }
    }
}

/// Failure raised by the machine-side distributor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DistributeError {
    #[error("listener rejected {kind:?} event: {reason}")]
    Rejected { kind: EventKind, reason: String },
}

/// Machine-side event distributor.
pub trait EventSink {
    fn distribute_event(
        &mut self,
        event: &CanonicalEvent,
        time: EmuTime,
    ) -> Result<(), DistributeError>;
}

/// Sink that records what reaches the machine.
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Vec<(CanonicalEvent, EmuTime)>,
    failing: Vec<EventKind>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every event of `kind` from now on.
    pub fn fail_on(&mut self, kind: EventKind) {
        self.failing.push(kind);
    }

    pub fn delivered(&self) -> &[(CanonicalEvent, EmuTime)] {
        &self.delivered
    }

    pub fn take(&mut self) -> Vec<(CanonicalEvent, EmuTime)> {
        std::mem::take(&mut self.delivered)
    }
}

impl EventSink for RecordingSink {
    fn distribute_event(
        &mut self,
        event: &CanonicalEvent,
        time: EmuTime,
    ) -> Result<(), DistributeError> {
        let kind = event.kind();
        if self.failing.contains(&kind) {
            return Err(DistributeError::Rejected {
                kind,
                reason: "configured to fail".into(),
            });
        }
        self.delivered.push((event.clone(), time));
        Ok(())
    }
}
