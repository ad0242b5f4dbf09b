//! A host audio sink backed by `cpal`, for callers that want a working
//! default instead of implementing [`AudioSink`] themselves.
//!
//! Mirrors `runner-lib::audio::AudioOutput`: a ring buffer absorbs the
//! mismatch between the emission thread's buffer-sized writes and cpal's
//! per-callback sample pulls, pre-filled with silence to avoid a startup
//! underrun.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::HeapRb;

use crate::emitter::AudioSink;

/// Default audio output device opened through `cpal`.
pub struct CpalSink {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
}

impl CpalSink {
    /// Open the host's default output device at `sample_rate`. Returns
    /// `None` if no device is available or the stream fails to start —
    /// the caller decides whether that is fatal.
    #[must_use]
    pub fn new(sample_rate: u32) -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(sample_rate as usize);
        let (mut producer, mut consumer) = ring.split();
        for _ in 0..(sample_rate as usize / 4) {
            let _ = producer.try_push(0.0);
        }

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    for sample in data.iter_mut() {
                        *sample = consumer.try_pop().unwrap_or(0.0);
                    }
                },
                |err| eprintln!("audio-pcm1: cpal stream error: {err}"),
                None,
            )
            .ok()?;

        stream.play().ok()?;

        Some(Self { _stream: stream, producer })
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[i16]) {
        for &sample in samples {
            let normalized = f32::from(sample) / f32::from(i16::MAX);
            while self.producer.try_push(normalized).is_err() {
                std::thread::yield_now();
            }
        }
    }
}
