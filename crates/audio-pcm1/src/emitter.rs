//! The emission-thread side: turns drained edges into a buffer of signed
//! 16-bit mono samples at a fixed rate.

use crate::queue::EdgeConsumer;

/// Default output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 22_050;
/// Peak amplitude for the square wave.
pub const MAX_AMPLITUDE: i16 = i16::MAX;

/// A destination for finished PCM buffers. The host implements this over
/// whatever playback device it has open; the CORE does not assume one.
pub trait AudioSink {
    fn write(&mut self, samples: &[i16]);
}

/// Converts CPU-time edges into sample-rate PCM.
///
/// Tracks the current square-wave level and the CPU time corresponding to
/// the start of the next buffer, so phase never drifts relative to
/// CPU-time — only the sink's own pacing can introduce drift.
pub struct PcmEmitter {
    consumer: EdgeConsumer,
    cpu_hz: u64,
    sample_rate: u32,
    last_sample_value: i16,
    last_sample_ts: u64,
}

impl PcmEmitter {
    #[must_use]
    pub fn new(consumer: EdgeConsumer, cpu_hz: u64, sample_rate: u32) -> Self {
        Self {
            consumer,
            cpu_hz,
            sample_rate,
            last_sample_value: -MAX_AMPLITUDE,
            last_sample_ts: 0,
        }
    }

    /// CPU ticks to whole samples at the configured rate, truncating.
    fn cpu_to_samples(&self, cpu_ticks: u64) -> u64 {
        u64::try_from(u128::from(cpu_ticks) * u128::from(self.sample_rate) / u128::from(self.cpu_hz))
            .unwrap_or(u64::MAX)
    }

    /// Sample count to the CPU-time span it spans, truncating.
    fn samples_to_cpu(&self, samples: u64) -> u64 {
        u64::try_from(u128::from(samples) * u128::from(self.cpu_hz) / u128::from(self.sample_rate))
            .unwrap_or(u64::MAX)
    }

    /// Fill `buf` with one buffer's worth of samples and advance
    /// `last_sample_ts` by exactly the buffer's CPU-time span — this is
    /// what keeps phase from drifting across buffers.
    pub fn fill_buffer(&mut self, buf: &mut [i16]) {
        let buffer_samples = buf.len() as u64;
        let buffer_duration_cpu = self.samples_to_cpu(buffer_samples);
        let window_end = self.last_sample_ts + buffer_duration_cpu;

        let mut filled = 0usize;
        let mut prev_ts = self.last_sample_ts;

        while (filled as u64) < buffer_samples {
            let Some(edge_ts) = self.consumer.peek() else {
                break;
            };
            if edge_ts > window_end {
                break;
            }
            self.consumer.try_pop();

            let delta_cpu = edge_ts.saturating_sub(prev_ts);
            let remaining = buffer_samples - filled as u64;
            let n = self.cpu_to_samples(delta_cpu).min(remaining) as usize;
            buf[filled..filled + n].fill(self.last_sample_value);
            filled += n;
            prev_ts = edge_ts;
            self.last_sample_value = -self.last_sample_value;
        }

        buf[filled..].fill(self.last_sample_value);
        self.last_sample_ts = self.last_sample_ts.wrapping_add(buffer_duration_cpu);
    }
}
