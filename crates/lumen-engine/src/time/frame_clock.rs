use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Seconds of accumulated (clamped) frame time since the clock started.
    ///
    /// Stalls do not make animations jump.
    pub elapsed: f32,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Per-window clock producing [`FrameTime`] snapshots.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    /// Resets the delta baseline, e.g. after the window was occluded.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last);
        self.last = now;
        self.advance(dt)
    }

    fn advance(&mut self, raw_dt: Duration) -> FrameTime {
        let dt = raw_dt.clamp(self.dt_min, self.dt_max);
        self.elapsed += dt;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed.as_secs_f32(),
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock() -> FrameClock {
        FrameClock::with_clamps(Duration::from_millis(1), Duration::from_millis(100))
    }

    #[test]
    fn frame_index_counts_ticks() {
        let mut c = clock();
        assert_eq!(c.advance(Duration::from_millis(16)).frame_index, 0);
        assert_eq!(c.advance(Duration::from_millis(16)).frame_index, 1);
    }

    #[test]
    fn long_stall_is_clamped() {
        let mut c = clock();
        let ft = c.advance(Duration::from_secs(5));
        assert!((ft.dt - 0.1).abs() < 1e-6);
        assert!((ft.elapsed - 0.1).abs() < 1e-6);
    }

    #[test]
    fn zero_dt_is_raised_to_minimum() {
        let mut c = clock();
        assert!((c.advance(Duration::ZERO).dt - 0.001).abs() < 1e-6);
    }

    #[test]
    fn elapsed_accumulates() {
        let mut c = clock();
        c.advance(Duration::from_millis(20));
        let ft = c.advance(Duration::from_millis(30));
        assert!((ft.elapsed - 0.05).abs() < 1e-5);
    }
}
