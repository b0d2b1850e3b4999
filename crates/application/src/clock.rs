use chrono::{DateTime, Utc};

/// Time source port.
///
/// Rate limit windows are computed against this clock so tests can drive
/// simulated time.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}
