use std::time::{Duration, Instant};

const FPS_SAMPLE_COUNT: usize = 60;

/// Variable-timestep frame clock.
///
/// Each frame's delta is the wall-clock time since the previous frame start,
/// capped at `max_dt` so a stall (window drag, breakpoint) does not teleport
/// everything on the next frame.
pub struct FrameClock {
    pub max_dt: f64,
    pub total_time: f64,
    pub frame_count: u64,
    pub real_dt: f64,
    last_instant: Instant,

    fps_samples: [f64; FPS_SAMPLE_COUNT],
    fps_sample_index: usize,
    fps_sample_count: usize,
    pub smoothed_fps: f64,
    pub smoothed_frame_time_ms: f64,
}

impl FrameClock {
    pub fn new(max_dt: f64) -> Self {
        Self {
            max_dt,
            total_time: 0.0,
            frame_count: 0,
            real_dt: 0.0,
            last_instant: Instant::now(),
            fps_samples: [0.0; FPS_SAMPLE_COUNT],
            fps_sample_index: 0,
            fps_sample_count: 0,
            smoothed_fps: 0.0,
            smoothed_frame_time_ms: 0.0,
        }
    }

    /// Measure the time since the previous call and return the (capped) delta.
    pub fn begin_frame(&mut self) -> Duration {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_instant).as_secs_f64();
        self.last_instant = now;
        self.advance(elapsed)
    }

    /// Feed a measured delta in seconds. Split out from `begin_frame` so the
    /// capping and smoothing can be driven deterministically.
    pub fn advance(&mut self, elapsed_secs: f64) -> Duration {
        self.real_dt = elapsed_secs.max(0.0);
        if self.real_dt > self.max_dt {
            log::warn!(
                "Frame took {:.1}ms, capping delta to {}ms",
                self.real_dt * 1000.0,
                self.max_dt * 1000.0
            );
            self.real_dt = self.max_dt;
        }

        self.total_time += self.real_dt;
        self.frame_count += 1;

        self.fps_samples[self.fps_sample_index] = self.real_dt;
        self.fps_sample_index = (self.fps_sample_index + 1) % FPS_SAMPLE_COUNT;
        self.fps_sample_count = (self.fps_sample_count + 1).min(FPS_SAMPLE_COUNT);
        let avg_dt: f64 = self.fps_samples[..self.fps_sample_count].iter().sum::<f64>()
            / self.fps_sample_count as f64;
        self.smoothed_frame_time_ms = avg_dt * 1000.0;
        self.smoothed_fps = if avg_dt > 0.0 { 1.0 / avg_dt } else { 0.0 };

        Duration::from_secs_f64(self.real_dt)
    }

    /// FPS line shown in the corner overlay.
    pub fn fps_label(&self) -> String {
        format!("{:.1} FPS", self.smoothed_fps)
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(0.25)
    }
}
