//! Scoped timing.
//!
//! A [`Stopwatch`] records its start on construction and logs the elapsed time
//! when dropped. [`timed`] wraps a closure with one.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Stopwatch {
    label: String,
    start: Instant,
}

impl Stopwatch {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Stopwatch {
    fn drop(&mut self) {
        log::info!(
            "{}: {:.3}s elapsed",
            self.label,
            self.start.elapsed().as_secs_f64()
        );
    }
}

/// Run `f`, logging how long it took under `label`.
pub fn timed<T>(label: &str, f: impl FnOnce() -> T) -> T {
    let _watch = Stopwatch::start(label);
    f()
}
