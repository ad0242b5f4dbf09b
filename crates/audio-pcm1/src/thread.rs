//! The emission thread itself: repeatedly fills a buffer and writes it to
//! the sink until asked to stop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::emitter::{AudioSink, PcmEmitter};

/// A running emission thread. Dropping this without calling [`Self::stop`]
/// leaves the thread running detached; callers that care about clean
/// shutdown should call `stop` explicitly (running flag down, thread
/// finishes its current buffer, then the caller joins before the sink is
/// released).
pub struct AudioThreadHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AudioThreadHandle {
    /// Signal the thread to stop after its current buffer and join it.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.join.take() {
            let _ = handle.join();
        }
    }
}

/// Spawn the emission thread: loop filling `buffer_samples`-sized buffers
/// from `emitter` and writing them to `sink` until [`AudioThreadHandle::stop`]
/// is called.
pub fn spawn_emission_thread(
    mut emitter: PcmEmitter,
    mut sink: impl AudioSink + Send + 'static,
    buffer_samples: usize,
) -> AudioThreadHandle {
    let running = Arc::new(AtomicBool::new(true));
    let running_thread = Arc::clone(&running);

    let join = std::thread::spawn(move || {
        let mut buf = vec![0i16; buffer_samples];
        while running_thread.load(Ordering::Acquire) {
            emitter.fill_buffer(&mut buf);
            sink.write(&buf);
        }
    });

    AudioThreadHandle { running, join: Some(join) }
}
