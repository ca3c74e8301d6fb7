use chrono::Local;
use std::fmt;
use std::time::{Duration, Instant};

/// Wall-clock bookkeeping for a run of known target size.
pub struct ProgressTimer {
    start: Instant,
    total: usize,
    done: usize,
    elapsed: Duration,
}

impl ProgressTimer {
    pub fn new(total: usize) -> ProgressTimer {
        ProgressTimer {
            start: Instant::now(),
            total,
            done: 0,
            elapsed: Duration::default(),
        }
    }

    pub fn update(&mut self, done: usize) {
        self.done = done;
        self.elapsed = self.start.elapsed();
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Linear extrapolation of the time still needed. Unknown before the first
    /// unit, or when it does not fit in a `Duration`.
    pub fn remaining(&self) -> Option<Duration> {
        if self.done == 0 {
            return None;
        }
        let left = self.total.saturating_sub(self.done) as f64;
        Duration::try_from_secs_f64(self.elapsed.as_secs_f64() * left / self.done as f64).ok()
    }
}

impl fmt::Display for ProgressTimer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} done, {:.1}s elapsed",
            self.done,
            self.total,
            self.elapsed.as_secs_f64()
        )?;

        match self.remaining() {
            Some(remaining) => {
                write!(f, ", {:.1}s remaining", remaining.as_secs_f64())?;
                let finish = chrono::Duration::from_std(remaining)
                    .ok()
                    .and_then(|remaining| Local::now().checked_add_signed(remaining));
                if let Some(finish) = finish {
                    write!(f, ", finishing at {}", finish.format("%Y-%m-%d %H:%M:%S"))?;
                }
                Ok(())
            }
            None => write!(f, ", remaining time unknown"),
        }
    }
}
