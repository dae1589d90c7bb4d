use nix::time::{ClockId, clock_gettime};
use std::fmt::Debug;

/// Source of the relative timestamps attached to recorded events.
pub trait Clock: Debug + Send + Sync {
    fn relative_timestamp(&self) -> nix::Result<i64>;
}

/// Nanoseconds since boot, suspend included. This is the clock the event
/// recorder correlates relative timestamps against.
#[derive(Debug, Default, Clone, Copy)]
pub struct BootClock;

impl Clock for BootClock {
    fn relative_timestamp(&self) -> nix::Result<i64> {
        let now = clock_gettime(ClockId::CLOCK_BOOTTIME)?;
        Ok(i64::from(now.tv_sec()) * 1_000_000_000 + i64::from(now.tv_nsec()))
    }
}
