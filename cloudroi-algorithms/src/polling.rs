use std::thread;
use std::time::{Duration, Instant};

/// State reported by a [Pollable] handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The awaited value is available
    Ready,
    /// Not available yet, but might become available later
    Pending,
    /// Can never become available
    Unavailable,
}

/// Outcome of [wait_for]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Ready,
    TimedOut,
    NotReady,
}

/// Something that can be asked repeatedly whether the value it waits for has arrived
pub trait Pollable {
    fn poll(&mut self) -> Readiness;
}

impl<F: FnMut() -> Readiness> Pollable for F {
    fn poll(&mut self) -> Readiness {
        self()
    }
}

/// Polls `handle` every `poll_interval` until it is ready, reports that it never will be, or `max_wait`
/// has passed. The handle is always polled at least once, also for a zero `max_wait`. Returns no later
/// than one `poll_interval` after `max_wait` has passed.
pub fn wait_for<P: Pollable + ?Sized>(
    handle: &mut P,
    max_wait: Duration,
    poll_interval: Duration,
) -> PollStatus {
    let deadline = Instant::now() + max_wait;
    loop {
        match handle.poll() {
            Readiness::Ready => return PollStatus::Ready,
            Readiness::Unavailable => return PollStatus::NotReady,
            Readiness::Pending => {}
        }
        let now = Instant::now();
        if now >= deadline {
            return PollStatus::TimedOut;
        }
        thread::sleep(poll_interval.min(deadline - now));
    }
}
