//! One-bit PCM audio synthesis for the K1801VM1 CORE.
//!
//! The system-control-register device (in `machine-bk0010`) pushes a
//! CPU-time timestamp into the [`queue::EdgeProducer`] on every flip of
//! the audio output bit. A dedicated emission thread drains the
//! [`queue::EdgeConsumer`] through a [`emitter::PcmEmitter`], which turns
//! those edges into signed 16-bit mono samples and hands finished buffers
//! to an [`emitter::AudioSink`] — either the host's own, or [`sink::CpalSink`]
//! if the host wants the ready-made `cpal` backend.

mod emitter;
mod queue;
mod sink;
mod thread;

pub use emitter::{AudioSink, PcmEmitter, DEFAULT_SAMPLE_RATE, MAX_AMPLITUDE};
pub use queue::{edge_queue, EdgeConsumer, EdgeProducer};
pub use sink::CpalSink;
pub use thread::{spawn_emission_thread, AudioThreadHandle};
