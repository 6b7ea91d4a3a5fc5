/// Simulation clock handed to model plugins each tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timekeeper {
    step_size: f64,
    time: f64,
    ticks: u64,
}

impl Timekeeper {
    pub fn new(step_size: f64) -> Self {
        Self { step_size, time: 0.0, ticks: 0 }
    }

    /// Duration of the step about to be taken (s).
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Changes the size of subsequent steps; steps need not be uniform.
    pub fn set_step_size(&mut self, step_size: f64) {
        self.step_size = step_size;
    }

    /// Simulated time elapsed so far (s).
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Closes the current step.
    pub fn advance(&mut self) {
        self.time += self.step_size;
        self.ticks += 1;
    }
}

impl Default for Timekeeper {
    fn default() -> Self {
        Self::new(0.01)
    }
}
