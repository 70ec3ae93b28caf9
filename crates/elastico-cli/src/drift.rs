//! Two-clock drift simulation around an elastic delay buffer.
//!
//! A producer pushes blocks at `sample_rate * (1 + drift_ppm * 1e-6)` and a
//! consumer pulls blocks at `sample_rate`. Events are merged on a shared
//! timeline, so a fast producer occasionally lands two pushes between pulls
//! and a slow one occasionally misses a pull.

use elastico_config::{ConfigError, ElasticSettings};
use elastico_core::{
    AudioBuffer, DelayProbe, ElasticDelayBuffer, FractionalResampler, LagrangeInterpolator,
};

/// Which side of the buffer handled the last event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The producer pushed a block.
    Push,
    /// The consumer pulled a block.
    Pull,
}

/// Running statistics gathered after every pull.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftStats {
    /// Number of pulls so far.
    pub cycles: usize,
    /// Number of pushes so far.
    pub pushes: usize,
    /// Delay after the most recent pull.
    pub final_delay: usize,
    /// Smallest delay seen after a pull.
    pub min_delay: usize,
    /// Largest delay seen after a pull.
    pub max_delay: usize,
    /// Factor used by the most recent pull.
    pub final_factor: f64,
    /// Smallest factor used.
    pub min_factor: f64,
    /// Largest factor used.
    pub max_factor: f64,
    /// Largest absolute sample value pulled on any channel.
    pub output_peak: f32,
    factor_sum: f64,
}

impl Default for DriftStats {
    fn default() -> Self {
        Self {
            cycles: 0,
            pushes: 0,
            final_delay: 0,
            min_delay: usize::MAX,
            max_delay: 0,
            final_factor: 1.0,
            min_factor: f64::INFINITY,
            max_factor: f64::NEG_INFINITY,
            output_peak: 0.0,
            factor_sum: 0.0,
        }
    }
}

impl DriftStats {
    fn record(&mut self, delay: usize, factor: f64) {
        self.cycles += 1;
        self.final_delay = delay;
        self.min_delay = self.min_delay.min(delay);
        self.max_delay = self.max_delay.max(delay);
        self.final_factor = factor;
        self.min_factor = self.min_factor.min(factor);
        self.max_factor = self.max_factor.max(factor);
        self.factor_sum += factor;
    }

    /// Average factor over all pulls, or 1.0 before the first pull.
    pub fn mean_factor(&self) -> f64 {
        if self.cycles == 0 {
            1.0
        } else {
            self.factor_sum / self.cycles as f64
        }
    }
}

/// Producer and consumer sharing one [`ElasticDelayBuffer`].
pub struct DriftSimulation<R = LagrangeInterpolator> {
    elastic: ElasticDelayBuffer<R>,
    block_size: usize,
    target_delay: usize,
    input_gain: f32,
    producer_period: f64,
    consumer_period: f64,
    producer_clock: f64,
    consumer_clock: f64,
    input: AudioBuffer,
    output: AudioBuffer,
    stats: DriftStats,
}

impl<R: FractionalResampler + Default> DriftSimulation<R> {
    /// Build a simulation from validated settings.
    ///
    /// The buffer starts with its read cursor `target_delay` samples behind
    /// the write cursor.
    pub fn new(settings: &ElasticSettings, drift_ppm: f64) -> Result<Self, ConfigError> {
        if !drift_ppm.is_finite() || drift_ppm <= -1e6 {
            return Err(ConfigError::invalid(
                "drift_ppm",
                format!("must be finite and above -1000000, got {drift_ppm}"),
            ));
        }

        let elastic = settings.build()?;
        let sample_rate = f64::from(settings.sample_rate);
        let block = settings.block_size as f64;

        Ok(Self {
            elastic,
            block_size: settings.block_size,
            target_delay: settings.target_delay,
            input_gain: 1.0,
            producer_period: block / (sample_rate * (1.0 + drift_ppm * 1e-6)),
            consumer_period: block / sample_rate,
            producer_clock: 0.0,
            consumer_clock: 0.0,
            input: AudioBuffer::new(settings.channels, settings.block_size),
            output: AudioBuffer::new(settings.channels, settings.block_size),
            stats: DriftStats::default(),
        })
    }

    /// Handle the next event on the timeline. Pushes win ties.
    ///
    /// `produce` fills the next producer block; `consume` receives every
    /// pulled block.
    pub fn step<F, G>(&mut self, produce: &mut F, consume: &mut G) -> Event
    where
        F: FnMut(&mut AudioBuffer),
        G: FnMut(&AudioBuffer),
    {
        let n = self.block_size;

        if self.producer_clock <= self.consumer_clock {
            produce(&mut self.input);
            self.elastic
                .push_block(self.input.channels(), n, self.input_gain);
            self.producer_clock += self.producer_period;
            self.stats.pushes += 1;
            return Event::Push;
        }

        self.elastic
            .pull_block(self.output.channels_mut(), n, self.target_delay);
        self.consumer_clock += self.consumer_period;
        consume(&self.output);

        let delay = self.elastic.actual_delay();
        let factor = self.elastic.last_resampling_factor();
        self.stats.record(delay, factor);
        for channel in self.output.channels() {
            for &s in channel {
                self.stats.output_peak = self.stats.output_peak.max(s.abs());
            }
        }

        tracing::debug!(cycle = self.stats.cycles, delay, factor, "pull");
        Event::Pull
    }

    /// Step until `cycles` more pulls have happened.
    pub fn run<F, G>(&mut self, cycles: usize, mut produce: F, mut consume: G)
    where
        F: FnMut(&mut AudioBuffer),
        G: FnMut(&AudioBuffer),
    {
        let stop = self.stats.cycles + cycles;
        while self.stats.cycles < stop {
            self.step(&mut produce, &mut consume);
        }
    }

    /// Set the linear gain applied to every pushed block.
    pub fn set_input_gain(&mut self, gain: f32) {
        self.input_gain = gain;
    }

    /// Change the delay the consumer asks for on later pulls.
    pub fn set_target_delay(&mut self, target_delay: usize) {
        self.target_delay = target_delay;
    }

    /// Statistics so far.
    pub fn stats(&self) -> &DriftStats {
        &self.stats
    }

    /// Handle for reading the current delay from elsewhere.
    pub fn delay_probe(&self) -> DelayProbe {
        self.elastic.delay_probe()
    }

    /// The buffer being driven.
    pub fn elastic(&self) -> &ElasticDelayBuffer<R> {
        &self.elastic
    }

    /// Samples per producer and consumer block.
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
