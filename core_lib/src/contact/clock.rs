//! Time sources and the display timestamp used in delivered messages

use chrono::{DateTime, Duration, FixedOffset, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// São Paulo has observed UTC-03:00 year-round since 2019.
const SAO_PAULO_OFFSET_SECONDS: i32 = -3 * 3600;

const DISPLAY_FORMAT: &str = "%d/%m/%Y, %H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock();
        *current += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.current.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

pub fn format_local_timestamp(instant: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(SAO_PAULO_OFFSET_SECONDS) {
        Some(offset) => instant.with_timezone(&offset).format(DISPLAY_FORMAT).to_string(),
        None => instant.format(DISPLAY_FORMAT).to_string(),
    }
}
