use crate::bus::PHYSICAL_ADDRESS_MASK;

/// PC Engine master clock divided by 3.
pub const DEFAULT_CLOCK_HZ: u32 = 7_159_090;
pub const DEFAULT_TIMER_IO_BASE: u32 = 0x1F_EC00;
pub const DEFAULT_IRQ_IO_BASE: u32 = 0x1F_F400;
pub const DEFAULT_VDC_ST_BASE: u32 = 0x1F_E000;
/// Each internal register block decodes a 1 KiB window.
pub const IO_BLOCK_SIZE: u32 = 0x400;

/// Runtime configuration of one core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuConfig {
    pub clock_hz: u32,
    /// Enables the debugger hook and mapper-register introspection.
    pub debug: bool,
    /// Leave `execute` early when an instruction branches to itself.
    pub stall_guard: bool,
    /// Physical base of the timer register block.
    pub timer_io_base: u32,
    /// Physical base of the interrupt mask/status block.
    pub irq_io_base: u32,
    /// Physical address ST0 writes to; ST1/ST2 hit `+2` and `+3`.
    pub vdc_st_base: u32,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            clock_hz: DEFAULT_CLOCK_HZ,
            debug: false,
            stall_guard: true,
            timer_io_base: DEFAULT_TIMER_IO_BASE,
            irq_io_base: DEFAULT_IRQ_IO_BASE,
            vdc_st_base: DEFAULT_VDC_ST_BASE,
        }
    }
}

impl CpuConfig {
    /// Defaults overlaid with `H6280_*` environment switches.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(debug) = Self::env_debug() {
            config.debug = debug;
        }
        if let Some(stall_guard) = Self::env_stall_guard() {
            config.stall_guard = stall_guard;
        }
        if let Some(hz) = Self::env_clock_hz().filter(|&hz| hz > 0) {
            config.clock_hz = hz;
        }
        if let Some(base) = Self::env_timer_io_base() {
            config.timer_io_base = base & PHYSICAL_ADDRESS_MASK;
        }
        if let Some(base) = Self::env_irq_io_base() {
            config.irq_io_base = base & PHYSICAL_ADDRESS_MASK;
        }
        config
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_clock(mut self, clock_hz: u32) -> Self {
        self.clock_hz = clock_hz;
        self
    }
}
