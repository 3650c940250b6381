use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Lets a message through at most once per `period`. Used for errors that can occur at sensor frame rate
#[derive(Debug)]
pub struct LogThrottle {
    period: Duration,
    last_emitted: Mutex<Option<Instant>>,
}

impl LogThrottle {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_emitted: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns `true` if a message may be emitted now, and records the emission
    pub fn should_emit(&self) -> bool {
        let now = Instant::now();
        let mut last_emitted = match self.last_emitted.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match *last_emitted {
            Some(last) if now.duration_since(last) < self.period => false,
            _ => {
                *last_emitted = Some(now);
                true
            }
        }
    }

    /// Logs `message` at error level unless an error was logged through this throttle within the last `period`
    pub fn error(&self, message: std::fmt::Arguments<'_>) {
        if self.should_emit() {
            log::error!("{}", message);
        }
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}
