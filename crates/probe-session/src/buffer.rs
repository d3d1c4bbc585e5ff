//! Rolling sample buffer
//!
//! Two views over the sample stream:
//! - a fixed-size display window for live plotting, oldest evicted first
//! - an unbounded run accumulation for report export
//!
//! The device's first reported timestamp of a run is unreliable, so the
//! first sample after a clear is stored in the run with a zero offset.

use std::collections::VecDeque;

use probe_protocol::Sample;

/// Default display window capacity
pub const DEFAULT_WINDOW_SIZE: usize = 20;

/// Display window plus run accumulation
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    window_size: usize,
    display: VecDeque<Sample>,
    run: Vec<Sample>,
}

impl SampleBuffer {
    /// Create a buffer with the default window size
    pub fn new() -> Self {
        Self::with_window_size(DEFAULT_WINDOW_SIZE)
    }

    /// Create a buffer with a given window size (at least 1)
    pub fn with_window_size(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        let mut buffer = Self {
            window_size,
            display: VecDeque::with_capacity(window_size + 1),
            run: Vec::new(),
        };
        buffer.clear();
        buffer
    }

    /// Display window capacity
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Append to both views
    pub fn push(&mut self, sample: Sample) {
        self.push_display(sample);
        self.push_run(sample);
    }

    /// Append to the display window, evicting the oldest sample when full
    pub fn push_display(&mut self, sample: Sample) {
        self.display.push_back(sample);
        while self.display.len() > self.window_size {
            self.display.pop_front();
        }
    }

    /// Append to the run accumulation
    pub fn push_run(&mut self, sample: Sample) {
        if self.run.is_empty() {
            self.run.push(sample.with_time(0));
        } else {
            self.run.push(sample);
        }
    }

    /// Reset the window to zero samples and empty the run
    pub fn clear(&mut self) {
        self.display.clear();
        self.display
            .extend(std::iter::repeat(Sample::default()).take(self.window_size));
        self.run.clear();
    }

    /// Copy of the display window, oldest first
    pub fn snapshot_display(&self) -> Vec<Sample> {
        self.display.iter().copied().collect()
    }

    /// Copy of the run accumulation, in arrival order
    pub fn snapshot_run(&self) -> Vec<Sample> {
        self.run.clone()
    }

    /// Number of samples collected in the current run
    pub fn run_len(&self) -> usize {
        self.run.len()
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
