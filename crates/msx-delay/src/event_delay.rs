/// Delayed delivery of input events to the emulated machine.
///
/// Events arrive stamped with host milliseconds. Each sync maps them onto
/// the emulated clock so that the machine sees them a roughly constant
/// `input_delay` after they happened, however bursty their arrival.
///
/// Flow: [`signal_event`](EventDelayScheduler::signal_event) queues,
/// [`sync`](EventDelayScheduler::sync) assigns emulated delivery instants
/// and registers sync points, [`execute_until`](EventDelayScheduler::execute_until)
/// hands one event to the machine per fired sync point.
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use log::{debug, trace};
use msx_config::{BurstConfig, InputConfig, clamp_input_delay};
use msx_events::{
    CanonicalEvent, DistributeError, EmuDuration, EmuTime, EventDistributor, EventKind,
    EventListener, EventSink, Priority, RealClock, VirtualScheduler,
};

use crate::key_burst::{KeyBurstTable, ReleaseVerdict};

/// Event kinds routed through the delay stage.
pub const DELAYED_EVENT_KINDS: [EventKind; 9] = [
    EventKind::KeyDown,
    EventKind::KeyUp,
    EventKind::MouseMotion,
    EventKind::MouseButtonDown,
    EventKind::MouseButtonUp,
    EventKind::JoyAxisMotion,
    EventKind::JoyHat,
    EventKind::JoyButtonDown,
    EventKind::JoyButtonUp,
];

/// An event with its emulated delivery instant.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub event: CanonicalEvent,
    pub time: EmuTime,
}

/// Outcome of one [`EventDelayScheduler::execute_until`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The machine rejected the event. It is dropped.
    Ignored(DistributeError),
    /// Nothing was scheduled.
    Idle,
}

pub struct EventDelayScheduler<S: VirtualScheduler, D: EventSink, C: RealClock> {
    scheduler: S,
    sink: D,
    clock: C,
    /// Waiting for the next sync, in arrival order.
    pending: Vec<CanonicalEvent>,
    /// Waiting for their sync point, in arrival order.
    scheduled: VecDeque<ScheduledEvent>,
    presses: KeyBurstTable,
    prev_real_us: u64,
    prev_emu: EmuTime,
    /// Emulated seconds per real second over the last sync interval.
    factor: f64,
    delay_secs: f64,
    burst: BurstConfig,
}

impl<S: VirtualScheduler, D: EventSink, C: RealClock> EventDelayScheduler<S, D, C> {
    pub fn new(scheduler: S, sink: D, clock: C, config: &InputConfig) -> Self {
        let prev_real_us = clock.now_us();
        let prev_emu = scheduler.current_time();
        Self {
            scheduler,
            sink,
            clock,
            pending: Vec::new(),
            scheduled: VecDeque::new(),
            presses: KeyBurstTable::new(),
            prev_real_us,
            prev_emu,
            factor: 1.0,
            delay_secs: clamp_input_delay(config.input_delay),
            burst: config.burst.clone(),
        }
    }

    /// Queue `event`. Without delay it is scheduled right away.
    pub fn signal_event(&mut self, event: CanonicalEvent) {
        self.enqueue(event);
    }

    fn enqueue(&mut self, event: CanonicalEvent) {
        self.pending.push(event);
        if self.delay_secs == 0.0 {
            let now = self.scheduler.current_time();
            self.sync(now);
        }
    }

    /// Schedule every pending event relative to `cur_emu`.
    ///
    /// Releases that follow their press within the burst threshold are
    /// re-stamped and kept pending for the next sync instead.
    pub fn sync(&mut self, cur_emu: EmuTime) {
        let cur_real_us = self.clock.now_us();
        let real_elapsed_us = cur_real_us.saturating_sub(self.prev_real_us);
        self.prev_real_us = cur_real_us;
        let emu_elapsed = cur_emu.saturating_duration_since(self.prev_emu);
        self.prev_emu = cur_emu;
        if real_elapsed_us > 0 {
            self.factor = emu_elapsed.to_secs_f64() / (real_elapsed_us as f64 / 1_000_000.0);
        }

        let extra_delay = EmuDuration::from_secs_f64(self.delay_secs);
        let target = cur_emu + extra_delay;
        let now_ms = self.clock.ticks_ms();
        let mut deferred = Vec::new();
        let mut restamp = 0u32;

        for event in std::mem::take(&mut self.pending) {
            if self.burst.enabled {
                match &event {
                    CanonicalEvent::KeyDown(press) => self.presses.record_press(press),
                    CanonicalEvent::KeyUp(release) => {
                        if let ReleaseVerdict::Defer(gap) =
                            self.presses.check_release(release, self.burst.threshold_ms)
                        {
                            if self.burst.restamp_increment {
                                restamp += 1;
                            }
                            let mut retry = *release;
                            retry.timestamp = now_ms.wrapping_add(restamp);
                            debug!(
                                "key {:?} released {gap}ms after press, deferred to next sync",
                                release.key
                            );
                            deferred.push(CanonicalEvent::KeyUp(retry));
                            continue;
                        }
                    }
                    _ => {}
                }
            }

            let lag_ms = (now_ms.wrapping_sub(event.timestamp()) as i32).unsigned_abs();
            let offset = EmuDuration::from_secs_f64(self.factor * f64::from(lag_ms) / 1000.0);
            let time = if offset < extra_delay {
                target - offset
            } else {
                cur_emu
            };
            assert!(
                cur_emu <= time,
                "event scheduled before current time: {time} < {cur_emu}"
            );
            trace!("{:?} lagging {lag_ms}ms scheduled at {time}", event.kind());
            self.scheduler.set_sync_point(time);
            self.scheduled.push_back(ScheduledEvent { event, time });
        }

        self.pending = deferred;
    }

    /// Deliver the oldest scheduled event at `time`.
    ///
    /// Delivery is best effort: a rejected event is dropped.
    pub fn execute_until(&mut self, time: EmuTime) -> Delivery {
        let Some(scheduled) = self.scheduled.pop_front() else {
            return Delivery::Idle;
        };
        match self.sink.distribute_event(&scheduled.event, time) {
            Ok(()) => Delivery::Delivered,
            Err(err) => {
                debug!("ignoring failed delivery of {:?}: {err}", scheduled.event.kind());
                Delivery::Ignored(err)
            }
        }
    }

    /// Fire every sync point up to `limit`, then advance the scheduler to it.
    pub fn run_until(&mut self, limit: EmuTime) -> Vec<Delivery> {
        let mut outcomes = Vec::new();
        while let Some(due) = self.scheduler.next_due(limit) {
            outcomes.push(self.execute_until(due));
        }
        self.scheduler.advance_to(limit);
        outcomes
    }

    /// Deliver everything now: scheduled events first, then pending ones.
    ///
    /// Returns the number of events handed to the machine.
    pub fn flush(&mut self) -> usize {
        let now = self.scheduler.current_time();
        let scheduled = std::mem::take(&mut self.scheduled);
        let pending = std::mem::take(&mut self.pending);
        let count = scheduled.len() + pending.len();
        let events = scheduled.into_iter().map(|s| s.event).chain(pending);
        for event in events {
            if let Err(err) = self.sink.distribute_event(&event, now) {
                debug!("ignoring failed delivery of {:?} on flush: {err}", event.kind());
            }
        }
        self.scheduler.remove_sync_points();
        count
    }

    /// Change the input delay (clamped to its valid range). A changed
    /// value delivers everything in flight first.
    pub fn set_input_delay(&mut self, secs: f64) {
        let secs = clamp_input_delay(secs);
        if secs != self.delay_secs {
            let flushed = self.flush();
            debug!("input delay {} -> {secs}s, flushed {flushed} events", self.delay_secs);
            self.delay_secs = secs;
        }
    }

    pub fn apply_config(&mut self, config: &InputConfig) {
        self.burst = config.burst.clone();
        self.set_input_delay(config.input_delay);
    }

    pub fn input_delay(&self) -> f64 {
        self.delay_secs
    }

    pub fn drift_factor(&self) -> f64 {
        self.factor
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn pending(&self) -> &[CanonicalEvent] {
        &self.pending
    }

    pub fn scheduled_len(&self) -> usize {
        self.scheduled.len()
    }

    pub fn scheduled(&self) -> impl Iterator<Item = &ScheduledEvent> {
        self.scheduled.iter()
    }

    pub fn key_presses(&self) -> &KeyBurstTable {
        &self.presses
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn sink(&self) -> &D {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut D {
        &mut self.sink
    }
}

impl<S, D, C> EventDelayScheduler<S, D, C>
where
    S: VirtualScheduler + 'static,
    D: EventSink + 'static,
    C: RealClock + 'static,
{
    /// Listen for the delayed event kinds at MSX priority.
    pub fn attach(this: &Rc<RefCell<Self>>, distributor: &mut EventDistributor) {
        for kind in DELAYED_EVENT_KINDS {
            distributor.register_event_listener(kind, this, Priority::Msx);
        }
    }

    pub fn detach(this: &Rc<RefCell<Self>>, distributor: &mut EventDistributor) {
        for kind in DELAYED_EVENT_KINDS.into_iter().rev() {
            distributor.unregister_event_listener(kind, this);
        }
    }
}

impl<S: VirtualScheduler, D: EventSink, C: RealClock> EventListener
    for EventDelayScheduler<S, D, C>
{
    fn signal_event(&mut self, event: &CanonicalEvent) -> bool {
        self.enqueue(event.clone());
        false
    }
}

impl<S: VirtualScheduler, D: EventSink, C: RealClock> Drop for EventDelayScheduler<S, D, C> {
    fn drop(&mut self) {
        if !self.pending.is_empty() || !self.scheduled.is_empty() {
            self.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msx_events::{
        KeyCode, KeyEvent, MAIN_FREQ, ManualClock, Modifiers, RecordingSink, SyncPointQueue,
    };

    type Delay = EventDelayScheduler<SyncPointQueue, RecordingSink, ManualClock>;

    const START_US: u64 = 10_000_000;

    fn ms(n: u64) -> EmuDuration {
        EmuDuration::from_millis(n)
    }

    fn delay_with(config: InputConfig) -> (Delay, ManualClock) {
        let clock = ManualClock::new(START_US);
        let delay = EventDelayScheduler::new(
            SyncPointQueue::new(),
            RecordingSink::new(),
            clock.clone(),
            &config,
        );
        (delay, clock)
    }

    fn delayed(secs: f64) -> (Delay, ManualClock) {
        let mut config = InputConfig::default();
        config.input_delay = secs;
        delay_with(config)
    }

    fn motion(timestamp: u32) -> CanonicalEvent {
        CanonicalEvent::MouseMotion { timestamp, x: 0, y: 0, xrel: 1, yrel: 0 }
    }

    fn down(timestamp: u32, key: KeyCode) -> CanonicalEvent {
        CanonicalEvent::KeyDown(KeyEvent::new(timestamp, key, Modifiers::empty()))
    }

    fn up(timestamp: u32, key: KeyCode) -> CanonicalEvent {
        CanonicalEvent::KeyUp(KeyEvent::new(timestamp, key, Modifiers::empty()))
    }

    fn now_ms(clock: &ManualClock) -> u32 {
        clock.ticks_ms()
    }

    #[test]
    fn zero_delay_delivers_at_current_time() {
        let (mut delay, clock) = delayed(0.0);
        delay.scheduler_mut().advance_to(EmuTime::from_ticks(5_000));
        delay.signal_event(motion(now_ms(&clock)));

        assert_eq!(delay.pending_len(), 0);
        let times: Vec<EmuTime> = delay.scheduled().map(|s| s.time).collect();
        assert_eq!(times, vec![EmuTime::from_ticks(5_000)]);
        assert_eq!(delay.scheduler().pending(), times);

        let outcomes = delay.run_until(EmuTime::from_ticks(5_000));
        assert_eq!(outcomes, vec![Delivery::Delivered]);
        assert_eq!(delay.sink().delivered(), &[(motion(now_ms(&clock)), EmuTime::from_ticks(5_000))]);
    }

    #[test]
    fn positive_delay_waits_for_sync() {
        let (mut delay, clock) = delayed(0.05);
        delay.signal_event(motion(now_ms(&clock)));
        assert_eq!(delay.pending_len(), 1);
        assert_eq!(delay.scheduled_len(), 0);
        assert!(delay.scheduler().is_empty());
    }

    #[test]
    fn fresh_event_gets_full_delay() {
        let (mut delay, clock) = delayed(0.05);
        delay.signal_event(motion(now_ms(&clock)));
        delay.sync(EmuTime::ZERO);
        let times: Vec<EmuTime> = delay.scheduled().map(|s| s.time).collect();
        assert_eq!(times, vec![EmuTime::ZERO + ms(50)]);
    }

    #[test]
    fn old_event_is_delivered_sooner() {
        let (mut delay, clock) = delayed(0.05);
        clock.advance_ms(100);
        delay.sync(EmuTime::ZERO + ms(100));

        clock.advance_ms(20);
        let cur = EmuTime::ZERO + ms(120);
        delay.signal_event(motion(now_ms(&clock) - 20));
        delay.signal_event(motion(now_ms(&clock) - 80));
        delay.sync(cur);

        let times: Vec<EmuTime> = delay.scheduled().map(|s| s.time).collect();
        assert_eq!(times.len(), 2);
        let expected = (cur + ms(30)).ticks() as i64;
        assert!((times[0].ticks() as i64 - expected).abs() <= 1, "{times:?}");
        assert_eq!(times[1], cur);
    }

    #[test]
    fn drift_factor_tracks_emulation_speed() {
        let (mut delay, clock) = delayed(0.05);
        clock.advance_ms(100);
        delay.sync(EmuTime::ZERO + ms(50));
        assert!((delay.drift_factor() - 0.5).abs() < 1e-9);

        delay.sync(EmuTime::ZERO + ms(60));
        assert!((delay.drift_factor() - 0.5).abs() < 1e-9, "reused without real time");
    }

    #[test]
    fn quick_release_is_deferred_to_next_sync() {
        let (mut delay, clock) = delayed(0.05);
        let t = now_ms(&clock);
        delay.signal_event(down(t - 100, KeyCode::A));
        delay.signal_event(up(t - 95, KeyCode::A));
        delay.sync(EmuTime::ZERO);

        let kinds: Vec<EventKind> = delay.scheduled().map(|s| s.event.kind()).collect();
        assert_eq!(kinds, vec![EventKind::KeyDown]);
        assert_eq!(delay.pending_len(), 1);
        let retry = delay.pending()[0].as_key().copied().unwrap();
        assert_eq!(retry.timestamp, t + 1);
        assert_eq!(retry.key, KeyCode::A);

        clock.advance_ms(100);
        delay.sync(EmuTime::ZERO + ms(100));
        let kinds: Vec<EventKind> = delay.scheduled().map(|s| s.event.kind()).collect();
        assert_eq!(kinds, vec![EventKind::KeyDown, EventKind::KeyUp]);
        assert_eq!(delay.pending_len(), 0);
        assert!(delay.key_presses().is_empty());
    }

    #[test]
    fn deferral_repeats_while_within_threshold() {
        let (mut delay, clock) = delayed(0.05);
        let t = now_ms(&clock);
        delay.signal_event(down(t, KeyCode::A));
        delay.signal_event(up(t, KeyCode::A));
        delay.sync(EmuTime::ZERO);

        clock.advance_ms(30);
        delay.sync(EmuTime::ZERO + ms(30));
        assert_eq!(delay.pending_len(), 1);
        assert_eq!(delay.pending()[0].timestamp(), t + 31);
        assert_eq!(delay.key_presses().len(), 1);
    }

    #[test]
    fn slow_release_is_scheduled_in_same_cycle() {
        let (mut delay, clock) = delayed(0.05);
        let t = now_ms(&clock);
        delay.signal_event(down(t - 200, KeyCode::A));
        delay.signal_event(up(t - 100, KeyCode::A));
        delay.sync(EmuTime::ZERO);

        let kinds: Vec<EventKind> = delay.scheduled().map(|s| s.event.kind()).collect();
        assert_eq!(kinds, vec![EventKind::KeyDown, EventKind::KeyUp]);
        assert_eq!(delay.pending_len(), 0);
        assert!(delay.key_presses().is_empty());
    }

    #[test]
    fn restamps_increase_within_one_cycle() {
        let (mut delay, clock) = delayed(0.05);
        let t = now_ms(&clock);
        for key in [KeyCode::A, KeyCode::B] {
            delay.signal_event(down(t, key));
            delay.signal_event(up(t, key));
        }
        delay.sync(EmuTime::ZERO);
        let stamps: Vec<u32> = delay.pending().iter().map(CanonicalEvent::timestamp).collect();
        assert_eq!(stamps, vec![t + 1, t + 2]);
    }

    #[test]
    fn restamp_without_increment() {
        let mut config = InputConfig::default();
        config.input_delay = 0.05;
        config.burst.restamp_increment = false;
        let (mut delay, clock) = delay_with(config);
        let t = now_ms(&clock);
        delay.signal_event(down(t, KeyCode::A));
        delay.signal_event(up(t, KeyCode::A));
        delay.sync(EmuTime::ZERO);
        assert_eq!(delay.pending()[0].timestamp(), t);
    }

    #[test]
    fn burst_correction_can_be_disabled() {
        let mut config = InputConfig::default();
        config.input_delay = 0.05;
        config.burst.enabled = false;
        let (mut delay, clock) = delay_with(config);
        let t = now_ms(&clock);
        delay.signal_event(down(t, KeyCode::A));
        delay.signal_event(up(t, KeyCode::A));
        delay.sync(EmuTime::ZERO);
        assert_eq!(delay.scheduled_len(), 2);
        assert!(delay.key_presses().is_empty());
    }

    #[test]
    fn execute_until_is_fifo_and_best_effort() {
        let (mut delay, clock) = delayed(0.05);
        delay.sink_mut().fail_on(EventKind::KeyDown);
        let t = now_ms(&clock);
        delay.signal_event(down(t - 500, KeyCode::A));
        delay.signal_event(motion(t));
        delay.sync(EmuTime::ZERO);

        let at = EmuTime::from_ticks(MAIN_FREQ);
        assert!(matches!(delay.execute_until(at), Delivery::Ignored(DistributeError::Rejected { .. })));
        assert_eq!(delay.execute_until(at), Delivery::Delivered);
        assert_eq!(delay.execute_until(at), Delivery::Idle);
        assert_eq!(delay.sink().delivered(), &[(motion(t), at)]);
    }

    #[test]
    fn flush_delivers_everything_now() {
        let (mut delay, clock) = delayed(0.05);
        delay.scheduler_mut().advance_to(EmuTime::from_ticks(77));
        let t = now_ms(&clock);
        delay.signal_event(motion(t));
        delay.sync(EmuTime::from_ticks(77));
        delay.signal_event(up(t, KeyCode::B));

        assert_eq!(delay.flush(), 2);
        assert_eq!(delay.pending_len(), 0);
        assert_eq!(delay.scheduled_len(), 0);
        assert!(delay.scheduler().is_empty());
        let delivered = delay.sink().delivered();
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].0.kind(), EventKind::MouseMotion);
        assert_eq!(delivered[1].0.kind(), EventKind::KeyUp);
        assert!(delivered.iter().all(|(_, time)| *time == EmuTime::from_ticks(77)));
    }

    #[test]
    fn changing_delay_flushes() {
        let (mut delay, clock) = delayed(0.05);
        delay.signal_event(motion(now_ms(&clock)));

        delay.set_input_delay(0.05);
        assert_eq!(delay.pending_len(), 1);

        delay.set_input_delay(0.2);
        assert_eq!(delay.pending_len(), 0);
        assert_eq!(delay.sink().delivered().len(), 1);
        assert_eq!(delay.input_delay(), 0.2);
    }

    #[test]
    fn delay_setting_is_clamped() {
        let (mut delay, _clock) = delayed(0.0);
        delay.set_input_delay(42.0);
        assert_eq!(delay.input_delay(), 10.0);
        delay.set_input_delay(-1.0);
        assert_eq!(delay.input_delay(), 0.0);
    }

    #[test]
    fn future_timestamps_count_as_lag() {
        let (mut delay, clock) = delayed(0.05);
        delay.signal_event(motion(now_ms(&clock) + 10));
        delay.sync(EmuTime::ZERO);
        let time = delay.scheduled().next().map(|s| s.time).unwrap();
        assert!(time < EmuTime::ZERO + ms(50));
        assert!(time > EmuTime::ZERO);
    }

    #[test]
    fn listener_registration() {
        let (delay, clock) = delayed(0.0);
        let delay = Rc::new(RefCell::new(delay));
        let mut distributor = EventDistributor::new();
        EventDelayScheduler::attach(&delay, &mut distributor);
        for kind in DELAYED_EVENT_KINDS {
            assert_eq!(distributor.listener_count(kind), 1);
        }
        assert_eq!(distributor.listener_count(EventKind::TextInput), 0);

        distributor.distribute_event(motion(now_ms(&clock)));
        distributor.distribute_event(CanonicalEvent::Quit { timestamp: 0 });
        distributor.deliver_events();
        assert_eq!(delay.borrow().scheduled_len(), 1);

        EventDelayScheduler::detach(&delay, &mut distributor);
        assert_eq!(distributor.listener_count(EventKind::KeyDown), 0);
    }
}
