use chrono::{DateTime, Utc};
use folio_application::Clock;

/// Wall-clock implementation of the clock port.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
