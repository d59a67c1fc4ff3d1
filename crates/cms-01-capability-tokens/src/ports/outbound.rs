//! # Outbound Ports (Driven Ports / SPI)

use chrono::Utc;

/// Source of the current time, unix seconds.
pub trait TimeSource: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}
