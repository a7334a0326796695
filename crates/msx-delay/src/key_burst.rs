/// Press/release correlation for virtual-keyboard bursts.
///
/// On-screen keyboards report a press and its release within a few
/// milliseconds, too fast for the MSX to scan the key in its matrix. The
/// table remembers the last press per key identity so a release that
/// follows too closely can be held back.
use log::trace;
use msx_events::KeyEvent;

/// Last unmatched press of one key identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingKeyRecord {
    pub identity: i32,
    pub press: KeyEvent,
}

impl PendingKeyRecord {
    pub fn down_timestamp(&self) -> u32 {
        self.press.timestamp
    }
}

/// What to do with a release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseVerdict {
    /// Deliver normally.
    Schedule,
    /// Too close to its press; retry next cycle. Carries the gap in ms.
    Defer(u32),
}

/// At most one record per key identity.
#[derive(Debug, Clone, Default)]
pub struct KeyBurstTable {
    records: Vec<PendingKeyRecord>,
}

impl KeyBurstTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `press`, replacing an earlier press of the same key.
    pub fn record_press(&mut self, press: &KeyEvent) {
        let identity = press.key_identity();
        match self.records.iter_mut().find(|r| r.identity == identity) {
            Some(record) => record.press = *press,
            None => self.records.push(PendingKeyRecord {
                identity,
                press: *press,
            }),
        }
    }

    /// Judge `release` against the recorded press.
    ///
    /// A deferred release keeps the record so the retry is judged against
    /// the same press; otherwise a matching record is evicted.
    pub fn check_release(&mut self, release: &KeyEvent, threshold_ms: u32) -> ReleaseVerdict {
        let identity = release.key_identity();
        let Some(index) = self.records.iter().position(|r| r.identity == identity) else {
            return ReleaseVerdict::Schedule;
        };
        let gap = release
            .timestamp
            .wrapping_sub(self.records[index].down_timestamp());
        if gap <= threshold_ms {
            return ReleaseVerdict::Defer(gap);
        }
        trace!("release of {identity:#x} after {gap}ms, record evicted");
        self.records.swap_remove(index);
        ReleaseVerdict::Schedule
    }

    pub fn get(&self, identity: i32) -> Option<&PendingKeyRecord> {
        self.records.iter().find(|r| r.identity == identity)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
