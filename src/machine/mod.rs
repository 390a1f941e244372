#[cfg(test)]
mod tests;

use std::path::Path;

use crate::bus::Bus;
use crate::cpu::{Context, Cpu, IrqLine, LineState};
use crate::error::{Error, Result};

/// Default interleave granularity: 64 microseconds, one PC Engine scanline.
pub const DEFAULT_SLICE_NANOS: u64 = 64_000;
const NANOS_PER_SECOND: u128 = 1_000_000_000;

pub type CoreId = usize;

struct Core {
    name: String,
    cpu: Cpu,
    /// Cycles executed since the machine started.
    cycles: u64,
}

#[derive(bincode::Encode, bincode::Decode)]
struct CoreState {
    name: String,
    cycles: u64,
    context: Context,
}

#[derive(bincode::Encode, bincode::Decode)]
struct MachineState {
    elapsed_nanos: u64,
    cores: Vec<CoreState>,
}

/// Cooperative scheduler for several cores sharing one bus.
///
/// Cores run one after another for a fixed slice of emulated time each.
/// Every core keeps a running cycle total and is driven towards the total
/// its own clock implies for the elapsed time, so overruns and early
/// returns even out over later slices.
pub struct Scheduler<B: Bus> {
    bus: B,
    cores: Vec<Core>,
    slice_nanos: u64,
    elapsed_nanos: u64,
}

impl<B: Bus> Scheduler<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            cores: Vec::new(),
            slice_nanos: DEFAULT_SLICE_NANOS,
            elapsed_nanos: 0,
        }
    }

    pub fn add_cpu(&mut self, name: impl Into<String>, cpu: Cpu) -> CoreId {
        self.cores.push(Core {
            name: name.into(),
            cpu,
            cycles: 0,
        });
        self.cores.len() - 1
    }

    pub fn set_slice_nanos(&mut self, nanos: u64) {
        self.slice_nanos = nanos.max(1);
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn cpu(&self, id: CoreId) -> Option<&Cpu> {
        self.cores.get(id).map(|core| &core.cpu)
    }

    pub fn cpu_mut(&mut self, id: CoreId) -> Option<&mut Cpu> {
        self.cores.get_mut(id).map(|core| &mut core.cpu)
    }

    pub fn core_name(&self, id: CoreId) -> Option<&str> {
        self.cores.get(id).map(|core| core.name.as_str())
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    /// Cycles core `id` has executed since the last reset.
    pub fn cycles(&self, id: CoreId) -> Option<u64> {
        self.cores.get(id).map(|core| core.cycles)
    }

    pub fn elapsed_nanos(&self) -> u64 {
        self.elapsed_nanos
    }

    pub fn reset(&mut self) {
        for core in &mut self.cores {
            core.cpu.reset(&mut self.bus);
            core.cycles = 0;
        }
        self.elapsed_nanos = 0;
    }

    /// Drive an interrupt input of one core. Returns `false` for an unknown id.
    pub fn set_irq_line(&mut self, id: CoreId, line: IrqLine, state: LineState) -> bool {
        match self.cores.get_mut(id) {
            Some(core) => {
                core.cpu.set_irq_line(&mut self.bus, line, state);
                true
            }
            None => false,
        }
    }

    /// Advance the whole machine by one slice.
    pub fn run_slice(&mut self) {
        self.elapsed_nanos += self.slice_nanos;
        let elapsed = self.elapsed_nanos;
        for core in &mut self.cores {
            let target = cycles_at(core.cpu.config().clock_hz, elapsed);
            let budget = target.saturating_sub(core.cycles);
            if budget == 0 {
                continue;
            }
            let budget = budget.min(i32::MAX as u64) as i32;
            let used = core.cpu.execute(&mut self.bus, budget);
            core.cycles += used.max(0) as u64;
        }
    }

    /// Advance by at least `nanos` of emulated time, in whole slices.
    pub fn run_for(&mut self, nanos: u64) {
        let slices = nanos.div_ceil(self.slice_nanos);
        log::debug!("running {} slice(s) on {} core(s)", slices, self.cores.len());
        for _ in 0..slices {
            self.run_slice();
        }
    }

    /// Serialize every core's register file plus scheduler timing. Bus
    /// contents are the owner's business.
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let state = MachineState {
            elapsed_nanos: self.elapsed_nanos,
            cores: self
                .cores
                .iter()
                .map(|core| CoreState {
                    name: core.name.clone(),
                    cycles: core.cycles,
                    context: core.cpu.get_context(),
                })
                .collect(),
        };
        Ok(bincode::encode_to_vec(&state, bincode::config::standard())?)
    }

    pub fn load_state(&mut self, bytes: &[u8]) -> Result<()> {
        let (state, read): (MachineState, usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())?;
        if read != bytes.len() {
            return Err(Error::TrailingContextBytes {
                extra: bytes.len() - read,
            });
        }
        if state.cores.len() != self.cores.len() {
            return Err(Error::CoreCountMismatch {
                expected: self.cores.len(),
                found: state.cores.len(),
            });
        }
        for (core, saved) in self.cores.iter_mut().zip(state.cores) {
            if core.name != saved.name {
                log::warn!("restoring core '{}' from state saved as '{}'", core.name, saved.name);
            }
            core.cycles = saved.cycles;
            core.cpu.set_context(saved.context);
        }
        self.elapsed_nanos = state.elapsed_nanos;
        Ok(())
    }

    pub fn save_state_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.save_state()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load_state_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let bytes = std::fs::read(path)?;
        self.load_state(&bytes)
    }
}

fn cycles_at(clock_hz: u32, nanos: u64) -> u64 {
    let cycles = nanos as u128 * clock_hz as u128 / NANOS_PER_SECOND;
    cycles.min(u64::MAX as u128) as u64
}
