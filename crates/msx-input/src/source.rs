/// Raw event sources.
///
/// The normalizer pulls raw events from a [`RawEventSource`]. The only
/// thing it ever pushes back is a request to toggle platform text input.
use std::collections::VecDeque;
use std::time::Duration;

use crate::raw::RawEvent;

/// Platform abstraction for the raw event queue.
pub trait RawEventSource {
    /// Next queued event, without blocking.
    fn poll_event(&mut self) -> Option<RawEvent>;

    /// Block until an event is queued or `timeout` expires (`None` waits
    /// indefinitely). Returns `true` if an event is available.
    fn wait_event(&mut self, timeout: Option<Duration>) -> bool;

    /// Whether the platform event subsystem is up.
    fn is_initialized(&self) -> bool {
        true
    }

    /// Start or stop platform text input (on-screen keyboard / IME).
    fn set_text_input(&mut self, enabled: bool);
}

/// Queue-backed source for tests and scripted input.
#[derive(Debug)]
pub struct VirtualEventSource {
    queue: VecDeque<RawEvent>,
    text_input: bool,
    text_input_requests: Vec<bool>,
    initialized: bool,
}

impl VirtualEventSource {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            text_input: false,
            text_input_requests: Vec::new(),
            initialized: true,
        }
    }

    pub fn push(&mut self, event: RawEvent) {
        self.queue.push_back(event);
    }

    pub fn push_all(&mut self, events: impl IntoIterator<Item = RawEvent>) {
        self.queue.extend(events);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether text input is currently requested.
    pub fn text_input_active(&self) -> bool {
        self.text_input
    }

    /// Every text-input toggle received, in order.
    pub fn text_input_requests(&self) -> &[bool] {
        &self.text_input_requests
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }
}

impl Default for VirtualEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RawEventSource for VirtualEventSource {
    fn poll_event(&mut self) -> Option<RawEvent> {
        self.queue.pop_front()
    }

    fn wait_event(&mut self, _timeout: Option<Duration>) -> bool {
        !self.queue.is_empty()
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn set_text_input(&mut self, enabled: bool) {
        self.text_input = enabled;
        self.text_input_requests.push(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msx_events::KeyCode;

    #[test]
    fn fifo_order() {
        let mut source = VirtualEventSource::new();
        source.push(RawEvent::key_down(1, KeyCode::A));
        source.push(RawEvent::key_up(2, KeyCode::A));

        assert!(source.wait_event(None));
        assert_eq!(source.poll_event(), Some(RawEvent::key_down(1, KeyCode::A)));
        assert_eq!(source.poll_event(), Some(RawEvent::key_up(2, KeyCode::A)));
        assert_eq!(source.poll_event(), None);
        assert!(!source.wait_event(Some(Duration::from_millis(1))));
    }

    #[test]
    fn records_text_input_toggles() {
        let mut source = VirtualEventSource::new();
        source.set_text_input(true);
        source.set_text_input(false);
        assert!(!source.text_input_active());
        assert_eq!(source.text_input_requests(), &[true, false]);
    }
}
