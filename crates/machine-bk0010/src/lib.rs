//! The Elektronika BK-0010/BK-0011 machine: the memory bus, the four
//! supplemented devices (system control, keyboard, timer, video sync),
//! and the [`Computer`] construction API an external host links against.
//!
//! This crate assembles the CPU core (`cpu-k1801vm1`) and the audio
//! synthesizer (`audio-pcm1`) into a runnable machine. The region/device
//! wiring stays a generic list (see `bus.rs`) rather than a hardcoded
//! per-chip memory map, since the K1801VM1 has no fixed chip set of its
//! own the way a home-computer chipset does.

pub mod bus;
pub mod device;
pub mod devices;
pub mod memory;

use audio_pcm1::{edge_queue, spawn_emission_thread, AudioSink, AudioThreadHandle, EdgeConsumer, PcmEmitter, DEFAULT_SAMPLE_RATE};
use cpu_k1801vm1::{Bus as CpuBus, Cpu1801, Psw, PC};
use emu_core::MasterClock;

pub use bus::Bus;
pub use device::{Device, InterruptSink, StateBag};
pub use memory::MemoryRegion;

/// Where `Computer::reset` reads the initial PC/PSW from: two consecutive
/// words, the same two-word shape as a trap vector. Follows the PDP-11
/// convention of treating address 0 as that vector — see DESIGN.md's
/// Open Question note.
pub const DEFAULT_RESET_VECTOR: u16 = 0;

/// Configuration for the one-bit PCM audio path: the configured clock
/// frequency plus the emitter's own output rate. A plain struct, no
/// config-file crate.
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    pub sample_rate: u32,
    /// CPU cycles an edge-producing instruction sequence needs at minimum
    /// between two toggles of the output bit (see DESIGN.md's note on
    /// ring sizing: two single-operand instructions back to back).
    pub min_cycles_per_edge: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: DEFAULT_SAMPLE_RATE, min_cycles_per_edge: 2 }
    }
}

impl AudioConfig {
    /// `max_edges_per_buffer = buffer_samples * cpu_freq / (rate * min_cycles_per_edge)`,
    /// with a floor so a very low sample rate or slow clock never yields a
    /// capacity of zero.
    fn queue_capacity(&self, clock: MasterClock, buffer_samples: u64) -> usize {
        let capacity = buffer_samples.saturating_mul(clock.frequency_hz)
            / (u64::from(self.sample_rate) * self.min_cycles_per_edge).max(1);
        capacity.max(64) as usize
    }
}

/// A 20ms buffer at the configured sample rate; matches the fixed-size
/// buffer `audio_pcm1::spawn_emission_thread` fills each iteration.
fn buffer_samples(sample_rate: u32) -> u64 {
    (u64::from(sample_rate) / 50).max(1)
}

/// The assembled BK-0010/BK-0011 computer: CPU, bus, and (if wired via
/// [`Computer::add_audio_output`]) the audio edge queue's consumer half.
///
/// Constructed empty, populated with [`Computer::add_memory`] and
/// [`Computer::add_device`], then [`Computer::reset`] before running.
pub struct Computer {
    cpu: Cpu1801,
    bus: Bus,
    clock: MasterClock,
    audio: AudioConfig,
    reset_vector: u16,
    edge_consumer: Option<EdgeConsumer>,
    nanos_debt: u64,
}

impl Computer {
    /// Construct an empty computer clocked at `clock`. No memory or
    /// devices are mapped yet; the address space bus-errors everywhere
    /// until [`Computer::add_memory`]/[`Computer::add_device`] are called.
    #[must_use]
    pub fn new(clock: MasterClock) -> Self {
        Self::with_audio_config(clock, AudioConfig::default())
    }

    #[must_use]
    pub fn with_audio_config(clock: MasterClock, audio: AudioConfig) -> Self {
        Self {
            cpu: Cpu1801::new(),
            bus: Bus::new(),
            clock,
            audio,
            reset_vector: DEFAULT_RESET_VECTOR,
            edge_consumer: None,
            nanos_debt: 0,
        }
    }

    /// Override where `reset` reads the initial PC/PSW pair from (default
    /// [`DEFAULT_RESET_VECTOR`]).
    pub fn set_reset_vector(&mut self, vector: u16) {
        self.reset_vector = vector;
    }

    /// Register a RAM or ROM region. Fails if it overlaps an existing
    /// region or device — a wiring error in how the host assembled the
    /// machine, not a runtime condition the emulated program can trigger.
    pub fn add_memory(&mut self, region: MemoryRegion) -> Result<(), String> {
        self.bus.add_region(region)
    }

    /// Register a device by the addresses it claims.
    pub fn add_device(&mut self, device: Box<dyn Device>) -> Result<(), String> {
        self.bus.add_device(device)
    }

    /// Register the system-control register at `address` and wire its
    /// audio-output bit to a fresh edge queue, sized per
    /// [`AudioConfig::queue_capacity`]. Call [`Computer::start_audio`] or
    /// [`Computer::take_audio_consumer`] afterward to consume it.
    pub fn add_audio_output(&mut self, address: u16) -> Result<(), String> {
        let capacity = self.audio.queue_capacity(self.clock, buffer_samples(self.audio.sample_rate));
        let (producer, consumer) = edge_queue(capacity);
        self.bus.add_device(Box::new(devices::SystemControl::new(address, producer)))?;
        self.edge_consumer = Some(consumer);
        Ok(())
    }

    /// Register the keyboard status/data register pair at
    /// `status_addr`/`data_addr`. Call [`Computer::set_key`] afterward to
    /// feed it a keypress.
    pub fn add_keyboard(&mut self, status_addr: u16, data_addr: u16) -> Result<(), String> {
        self.bus.add_device(Box::new(devices::Keyboard::new(status_addr, data_addr)))
    }

    /// Register the down-counting timer at `control_addr`/`count_addr`;
    /// see [`devices::Timer::new`] for `cycles_per_tick`/`priority`/`vector`.
    pub fn add_timer(
        &mut self,
        control_addr: u16,
        count_addr: u16,
        cycles_per_tick: u32,
        priority: u8,
        vector: u16,
    ) -> Result<(), String> {
        self.bus.add_device(Box::new(devices::Timer::new(
            control_addr,
            count_addr,
            cycles_per_tick,
            priority,
            vector,
        )))
    }

    /// Register the vertical-sync status bit at `address`; see
    /// [`devices::VideoSync::new`] for `cycles_per_frame`/`vblank_cycles`.
    pub fn add_video_sync(
        &mut self,
        address: u16,
        cycles_per_frame: u64,
        vblank_cycles: u64,
    ) -> Result<(), String> {
        self.bus.add_device(Box::new(devices::VideoSync::new(
            address,
            cycles_per_frame,
            vblank_cycles,
        )))
    }

    /// Host API: latch a scan code on the registered keyboard, as though
    /// a key had just been struck. Returns `false` if no keyboard was
    /// ever registered via [`Computer::add_keyboard`].
    pub fn set_key(&mut self, code: u8) -> bool {
        let Some(keyboard) = self.keyboard_mut() else {
            return false;
        };
        keyboard.set_key(code);
        true
    }

    /// Reach the registered keyboard device directly, if one was added
    /// via [`Computer::add_keyboard`].
    pub fn keyboard_mut(&mut self) -> Option<&mut devices::Keyboard> {
        self.bus
            .devices_mut()
            .find_map(|d| d.as_any_mut().downcast_mut::<devices::Keyboard>())
    }

    /// Reset the CPU and every device: PC/PSW load from the reset vector,
    /// then every device receives `init(cpu_time=0)`.
    pub fn reset(&mut self) {
        self.cpu.reset();
        let pc = self.bus.read_word(0, self.reset_vector).ok().unwrap_or(0);
        let psw = self.bus.read_word(0, self.reset_vector.wrapping_add(2)).ok().unwrap_or(Psw::default().get());
        self.cpu.write_register(PC, pc);
        self.cpu.set_psw(Psw::new(psw));
        self.bus.init_devices(0);
        self.nanos_debt = 0;
    }

    /// Execute exactly one instruction (including any trap it triggers)
    /// and age every device by the cycles it took. Returns the cycle
    /// count charged.
    pub fn execute_single_instruction(&mut self) -> u32 {
        let before = self.cpu.cpu_time();
        self.cpu.step(&mut self.bus);
        let after = self.cpu.cpu_time();
        let elapsed = u32::try_from(after - before).unwrap_or(u32::MAX);
        for device in self.bus.devices_mut() {
            device.advance(after, elapsed, &mut self.cpu);
        }
        elapsed
    }

    /// Run until at least `nanos` of simulated CPU time have elapsed, or
    /// the CPU halts. Nanosecond/cycle conversion carries its remainder
    /// across calls (`nanos_debt`) so repeated short calls don't lose
    /// time to truncation.
    pub fn execute_for(&mut self, nanos: u64) {
        let freq = self.clock.frequency_hz.max(1);
        let total_nanos = self.nanos_debt + nanos;
        let target_cycles = (u128::from(total_nanos) * u128::from(freq) / 1_000_000_000) as u64;
        let consumed_nanos = (u128::from(target_cycles) * 1_000_000_000 / u128::from(freq)) as u64;
        self.nanos_debt = total_nanos - consumed_nanos;

        let start = self.cpu.cpu_time();
        while self.cpu.cpu_time().saturating_sub(start) < target_cycles {
            if self.cpu.is_halted() {
                break;
            }
            self.execute_single_instruction();
        }
    }

    #[must_use]
    pub fn cpu(&self) -> &Cpu1801 {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu1801 {
        &mut self.cpu
    }

    #[must_use]
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut Bus {
        &mut self.bus
    }

    /// Take ownership of the audio edge consumer wired by
    /// [`Computer::add_audio_output`], to drive a [`PcmEmitter`] by hand
    /// instead of using [`Computer::start_audio`].
    pub fn take_audio_consumer(&mut self) -> Option<EdgeConsumer> {
        self.edge_consumer.take()
    }

    /// Spawn the audio emission thread against `sink`, consuming the edge
    /// queue wired by [`Computer::add_audio_output`]. Returns `None` if no
    /// audio output device was ever wired.
    pub fn start_audio(&mut self, sink: impl AudioSink + Send + 'static) -> Option<AudioThreadHandle> {
        let consumer = self.edge_consumer.take()?;
        let emitter = PcmEmitter::new(consumer, self.clock.frequency_hz, self.audio.sample_rate);
        let samples = buffer_samples(self.audio.sample_rate) as usize;
        Some(spawn_emission_thread(emitter, sink, samples))
    }

    /// Serialize every device's persisted state (spec §6's `save_state`).
    #[must_use]
    pub fn save_state(&self) -> StateBag {
        let mut bag = StateBag::new();
        for device in self.bus.devices() {
            device.save_state(&mut bag);
        }
        bag
    }

    /// Restore every device's persisted state (spec §6's `restore_state`).
    pub fn restore_state(&mut self, bag: &StateBag) {
        for device in self.bus.devices_mut() {
            device.restore_state(bag);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOCK: MasterClock = MasterClock::new(3_000_000);

    fn start_vector_rom(pc: u16) -> MemoryRegion {
        let mut image = vec![0u8; 4];
        image[0] = (pc & 0xFF) as u8;
        image[1] = (pc >> 8) as u8;
        image[2] = 0o340u16 as u8;
        image[3] = 0;
        MemoryRegion::rom(0, image)
    }

    #[test]
    fn reset_loads_pc_and_psw_from_the_reset_vector() {
        let mut computer = Computer::new(CLOCK);
        computer.add_memory(start_vector_rom(0o100000)).unwrap();
        computer.add_memory(MemoryRegion::ram(0o100000, 0x1000)).unwrap();
        computer.reset();
        assert_eq!(computer.cpu().read_register(PC), 0o100000);
        assert_eq!(computer.cpu().psw().priority(), 7);
    }

    #[test]
    fn execute_single_instruction_advances_pc_and_returns_cycles() {
        let mut computer = Computer::new(CLOCK);
        computer.add_memory(start_vector_rom(0o100000)).unwrap();
        let mut ram = MemoryRegion::ram(0o100000, 0x1000);
        ram.write_word(0o100000, 0o000240); // NOP
        computer.add_memory(ram).unwrap();
        computer.reset();

        let cycles = computer.execute_single_instruction();
        assert!(cycles > 0);
        assert_eq!(computer.cpu().read_register(PC), 0o100002);
    }

    #[test]
    fn execute_for_stops_at_halt_without_spinning() {
        let mut computer = Computer::new(CLOCK);
        computer.add_memory(start_vector_rom(0o100000)).unwrap();
        let mut ram = MemoryRegion::ram(0o100000, 0x1000);
        ram.write_word(0o100000, 0o000000); // HALT
        computer.add_memory(ram).unwrap();
        computer.reset();

        computer.execute_for(1_000_000_000);
        assert!(computer.cpu().is_halted());
    }

    #[test]
    fn audio_output_wiring_exposes_an_edge_consumer() {
        let mut computer = Computer::new(CLOCK);
        computer.add_audio_output(0o177716).unwrap();
        assert!(computer.take_audio_consumer().is_some());
        assert!(computer.take_audio_consumer().is_none());
    }

    #[test]
    fn overlapping_memory_and_device_addresses_fail_to_register() {
        let mut computer = Computer::new(CLOCK);
        computer.add_memory(MemoryRegion::ram(0, 0o200000)).unwrap();
        let err = computer.add_audio_output(0o177716).unwrap_err();
        assert!(err.contains("overlaps"));
    }

    #[test]
    fn set_key_reaches_the_registered_keyboard() {
        let mut computer = Computer::new(CLOCK);
        computer.add_keyboard(0o177660, 0o177662).unwrap();

        assert!(computer.set_key(b'A'));
        assert_eq!(computer.bus_mut().read_word(0, 0o177662).ok(), Some(u16::from(b'A')));
    }

    #[test]
    fn set_key_without_a_registered_keyboard_reports_failure() {
        let mut computer = Computer::new(CLOCK);
        assert!(!computer.set_key(b'A'));
    }

    #[test]
    fn timer_and_video_sync_register_through_computer_like_any_other_device() {
        let mut computer = Computer::new(CLOCK);
        computer.add_timer(0o177706, 0o177710, 10, 6, 0o1000).unwrap();
        computer.add_video_sync(0o177714, 1000, 100).unwrap();

        assert_eq!(computer.bus_mut().read_word(0, 0o177706).ok(), Some(0));
        assert_eq!(computer.bus_mut().read_word(0, 0o177714).ok(), Some(0));
    }
}
