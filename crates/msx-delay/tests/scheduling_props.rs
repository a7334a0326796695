use msx_config::InputConfig;
use msx_delay::EventDelayScheduler;
use msx_events::{
    CanonicalEvent, EmuDuration, EmuTime, ManualClock, RealClock, RecordingSink, SyncPointQueue,
};
use proptest::prelude::*;

fn motion(timestamp: u32) -> CanonicalEvent {
    CanonicalEvent::MouseMotion {
        timestamp,
        x: 0,
        y: 0,
        xrel: 0,
        yrel: 1,
    }
}

proptest! {
    #[test]
    fn test_schedule_is_ordered_and_bounded(
        delay_ms in 1u64..10_000,
        real_advance_ms in 0u64..2_000,
        emu_advance_ms in 0u64..2_000,
        mut ages in prop::collection::vec(0u32..5_000, 1..32),
    ) {
        let clock = ManualClock::new(60_000_000);
        let mut config = InputConfig::default();
        config.input_delay = delay_ms as f64 / 1000.0;
        let mut delay = EventDelayScheduler::new(
            SyncPointQueue::new(),
            RecordingSink::new(),
            clock.clone(),
            &config,
        );

        clock.advance_ms(real_advance_ms);
        let cur = EmuTime::ZERO + EmuDuration::from_millis(emu_advance_ms);
        let now = clock.ticks_ms();
        // Oldest first, as they would have arrived.
        ages.sort_unstable_by(|a, b| b.cmp(a));
        for age in &ages {
            delay.signal_event(motion(now - age));
        }
        delay.sync(cur);

        let bound = cur + EmuDuration::from_secs_f64(config.input_delay);
        let times: Vec<EmuTime> = delay.scheduled().map(|s| s.time).collect();
        prop_assert_eq!(times.len(), ages.len());
        for pair in times.windows(2) {
            prop_assert!(pair[0] <= pair[1], "{:?}", times);
        }
        for time in &times {
            prop_assert!(cur <= *time && *time <= bound);
        }
    }

    #[test]
    fn test_same_tick_events_share_delivery_time(
        delay_ms in 1u64..10_000,
        count in 1usize..20,
    ) {
        let clock = ManualClock::new(1_000_000);
        let mut config = InputConfig::default();
        config.input_delay = delay_ms as f64 / 1000.0;
        let mut delay = EventDelayScheduler::new(
            SyncPointQueue::new(),
            RecordingSink::new(),
            clock.clone(),
            &config,
        );
        let now = clock.ticks_ms();
        for _ in 0..count {
            delay.signal_event(motion(now));
        }
        delay.sync(EmuTime::ZERO);

        let expected = EmuTime::ZERO + EmuDuration::from_secs_f64(config.input_delay);
        prop_assert!(delay.scheduled().all(|s| s.time == expected));
        prop_assert_eq!(delay.scheduled().count(), count);
    }

    #[test]
    fn test_flush_empties_both_queues(
        scheduled in 0usize..10,
        pending in 0usize..10,
    ) {
        let clock = ManualClock::new(1_000_000);
        let mut config = InputConfig::default();
        config.input_delay = 0.1;
        let mut delay = EventDelayScheduler::new(
            SyncPointQueue::new(),
            RecordingSink::new(),
            clock.clone(),
            &config,
        );
        for _ in 0..scheduled {
            delay.signal_event(motion(clock.ticks_ms()));
        }
        delay.sync(EmuTime::ZERO);
        for _ in 0..pending {
            delay.signal_event(motion(clock.ticks_ms()));
        }

        prop_assert_eq!(delay.flush(), scheduled + pending);
        prop_assert_eq!(delay.pending_len(), 0);
        prop_assert_eq!(delay.scheduled_len(), 0);
        prop_assert!(delay.scheduler().is_empty());
        prop_assert_eq!(delay.sink().delivered().len(), scheduled + pending);
    }
}
