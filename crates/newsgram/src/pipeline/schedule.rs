//! Posting-time assignment.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Days, FixedOffset, NaiveTime, Offset, TimeZone, Utc};

use crate::config::schema::SchedulingConfig;

/// Source of "now" for scheduling.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock stopped at one instant.
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Hands out posting slots round-robin through the configured hours.
///
/// Slot `n` falls at `hours[n % len]` on day `day_offset + n / len` after
/// today, in the configured UTC offset, so a job's posts never share a slot.
pub struct PostingScheduler {
    hours: Vec<u32>,
    day_offset: u64,
    offset: FixedOffset,
    clock: Arc<dyn Clock>,
    next: AtomicUsize,
}

impl PostingScheduler {
    pub fn new(config: &SchedulingConfig, clock: Arc<dyn Clock>) -> Self {
        let offset = FixedOffset::east_opt(config.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        let mut hours: Vec<u32> = config
            .optimal_hours
            .iter()
            .copied()
            .filter(|h| *h < 24)
            .collect();
        if hours.is_empty() {
            hours.push(12);
        }

        Self {
            hours,
            day_offset: u64::from(config.day_offset),
            offset,
            clock,
            next: AtomicUsize::new(0),
        }
    }

    pub fn next_slot(&self) -> DateTime<FixedOffset> {
        let n = self.next.fetch_add(1, Ordering::SeqCst);
        let hour = self.hours[n % self.hours.len()];
        let extra_days = (n / self.hours.len()) as u64;

        let now = self.clock.now().with_timezone(&self.offset);
        let date = now
            .date_naive()
            .checked_add_days(Days::new(self.day_offset + extra_days))
            .unwrap_or_else(|| now.date_naive());
        let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);

        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .unwrap_or(now)
    }
}
