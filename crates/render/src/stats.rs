use std::time::Duration;

/// Counters for one rendered frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub frame_index: u64,
    pub delta_time: f32,
    pub drawables_considered: usize,
    pub drawables_drawn: usize,
    pub drawables_culled: usize,
    pub canvases_drawn: usize,
    /// Triangles reported through the drawn-triangle counter.
    pub triangles: u64,
}

/// Ring buffer of recent frame durations.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    history: Vec<Duration>,
    index: usize,
    filled: bool,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new(120)
    }
}

impl FrameTimer {
    /// `capacity` is clamped to at least one sample.
    pub fn new(capacity: usize) -> Self {
        Self {
            history: vec![Duration::ZERO; capacity.max(1)],
            index: 0,
            filled: false,
        }
    }

    pub fn record(&mut self, dt: Duration) {
        self.history[self.index] = dt;
        self.index = (self.index + 1) % self.history.len();
        if self.index == 0 {
            self.filled = true;
        }
    }

    fn samples(&self) -> &[Duration] {
        let count = if self.filled {
            self.history.len()
        } else {
            self.index
        };
        &self.history[..count]
    }

    pub fn count(&self) -> usize {
        self.samples().len()
    }

    pub fn average(&self) -> Duration {
        let samples = self.samples();
        if samples.is_empty() {
            return Duration::ZERO;
        }
        samples.iter().sum::<Duration>() / samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples().iter().copied().max().unwrap_or(Duration::ZERO)
    }

    pub fn min(&self) -> Duration {
        self.samples().iter().copied().min().unwrap_or(Duration::ZERO)
    }

    /// Frames per second over the recorded window, zero when empty.
    pub fn fps(&self) -> f64 {
        let average = self.average().as_secs_f64();
        if average > 0.0 { 1.0 / average } else { 0.0 }
    }
}
