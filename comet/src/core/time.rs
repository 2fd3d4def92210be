use std::time::{Duration, Instant};

/// Host render rate.
pub const SIXTY_FPS: u64 = 16_666_666;
/// Default heartbeat interval.
pub const THIRTY_HZ: u64 = 33_333_333;

/// Frame timing for a host loop.
///
/// Each call to [`advance`](Self::advance) (or [`tick`](Self::tick), which measures the delta
/// itself) records one rendered frame and reports how many fixed-interval heartbeats became due.
/// Depending on frame time there may be several heartbeats per frame or none.
#[derive(Debug, Copy, Clone)]
pub struct FrameClock {
    // The instant the last frame was recorded
    instant: Instant,
    /// Heartbeat interval in nanoseconds
    pub fixed_time_step: u64,
    /// The time delta of the last frame
    pub delta: Duration,
    /// The total elapsed time since the first frame
    pub time: Duration,
    /// The total elapsed time, incremented by the fixed time step
    pub fixed_time: Duration,
    // Nanoseconds not yet consumed by a fixed step
    accumulator: u64,
}

impl FrameClock {
    /// Construct a clock with a heartbeat interval in nanoseconds.
    pub fn new(fixed_time_step: u64) -> Self {
        Self {
            fixed_time_step: fixed_time_step.max(1),
            instant: Instant::now(),
            delta: Duration::ZERO,
            time: Duration::ZERO,
            fixed_time: Duration::ZERO,
            accumulator: 0,
        }
    }

    /// Record a frame of the given length and return the number of heartbeats now due.
    pub fn advance(&mut self, delta: Duration) -> usize {
        self.instant = Instant::now();
        self.delta = delta;
        self.time += delta;
        self.accumulator += delta.as_nanos() as u64;

        let mut steps = 0;
        while self.accumulator >= self.fixed_time_step {
            self.accumulator -= self.fixed_time_step;
            self.fixed_time += Duration::from_nanos(self.fixed_time_step);
            steps += 1;
        }
        steps
    }

    /// Record a frame lasting since the previous one and return the number of heartbeats due.
    pub fn tick(&mut self) -> usize {
        let delta = self.instant.elapsed();
        self.advance(delta)
    }

    /// The last frame's delta in seconds.
    pub fn delta_secs(&self) -> f64 {
        self.delta.as_secs_f64()
    }

    /// The heartbeat interval in seconds.
    pub fn fixed_delta_secs(&self) -> f64 {
        Duration::from_nanos(self.fixed_time_step).as_secs_f64()
    }

    /// Reset to now with a zeroed accumulator, e.g. after the host was suspended.
    pub fn reset_now(&mut self) {
        self.instant = Instant::now();
        self.accumulator = 0;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(THIRTY_HZ)
    }
}
