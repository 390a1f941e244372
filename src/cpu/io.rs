use super::config::IO_BLOCK_SIZE;
use super::registers::{IrqLine, LineState, IRQ_MASK_ALL};
use super::Cpu;

/// Registers the core decodes itself, ahead of the external bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ControlRegister {
    TimerCounter,
    TimerControl,
    IrqMask,
    IrqStatus,
    /// Unused slots of the interrupt block read back the I/O latch.
    IrqOpen,
}

impl Cpu {
    pub(super) fn decode_control_register(&self, addr: u32) -> Option<ControlRegister> {
        let timer = self.config.timer_io_base;
        let irq = self.config.irq_io_base;
        if (timer..timer + IO_BLOCK_SIZE).contains(&addr) {
            match (addr - timer) & 0x01 {
                0x00 => Some(ControlRegister::TimerCounter),
                _ => Some(ControlRegister::TimerControl),
            }
        } else if (irq..irq + IO_BLOCK_SIZE).contains(&addr) {
            match (addr - irq) & 0x03 {
                0x02 => Some(ControlRegister::IrqMask),
                0x03 => Some(ControlRegister::IrqStatus),
                _ => Some(ControlRegister::IrqOpen),
            }
        } else {
            None
        }
    }

    pub(super) fn read_control_register(&self, register: ControlRegister) -> u8 {
        let latch = self.ctx.io_buffer;
        match register {
            // Both timer offsets return the countdown.
            ControlRegister::TimerCounter | ControlRegister::TimerControl => {
                self.ctx.timer.read_counter() | (latch & 0x80)
            }
            ControlRegister::IrqMask => self.ctx.irq_mask | (latch & !IRQ_MASK_ALL),
            ControlRegister::IrqStatus => self.irq_status() | (latch & !IRQ_MASK_ALL),
            ControlRegister::IrqOpen => latch,
        }
    }

    pub(super) fn write_control_register(&mut self, register: ControlRegister, value: u8) {
        self.ctx.io_buffer = value;
        match register {
            ControlRegister::TimerCounter => self.ctx.timer.write_reload(value),
            ControlRegister::TimerControl => {
                self.ctx.timer.write_control(value);
                log::trace!(
                    "timer {} (period {} cycles)",
                    if self.ctx.timer.enabled { "started" } else { "stopped" },
                    self.ctx.timer.load
                );
            }
            ControlRegister::IrqMask => self.ctx.irq_mask = value & IRQ_MASK_ALL,
            // Any write acknowledges the timer interrupt.
            ControlRegister::IrqStatus => self.ctx.set_line_state(IrqLine::Timer, LineState::Clear),
            ControlRegister::IrqOpen => {}
        }
    }

    fn irq_status(&self) -> u8 {
        IrqLine::MASKABLE
            .iter()
            .filter(|line| self.ctx.line_state(**line).is_asserted())
            .fold(0, |status, line| status | line.mask_bit())
    }

    /// Timer block read handler for machines that route the I/O page
    /// themselves. Only bit 0 of `offset` is decoded.
    pub fn timer_read(&self, offset: u32) -> u8 {
        let register = if offset & 1 == 0 {
            ControlRegister::TimerCounter
        } else {
            ControlRegister::TimerControl
        };
        self.read_control_register(register)
    }

    /// Timer block write handler: offset 0 latches the reload value,
    /// offset 1 starts or stops the countdown.
    pub fn timer_write(&mut self, offset: u32, value: u8) {
        let register = if offset & 1 == 0 {
            ControlRegister::TimerCounter
        } else {
            ControlRegister::TimerControl
        };
        self.write_control_register(register, value);
    }

    /// Interrupt block read handler: offset 2 is the mask, offset 3 the
    /// pending status.
    pub fn irq_status_read(&self, offset: u32) -> u8 {
        self.read_control_register(Self::irq_register(offset))
    }

    /// Interrupt block write handler: offset 2 sets the mask, offset 3
    /// acknowledges the timer.
    pub fn irq_status_write(&mut self, offset: u32, value: u8) {
        self.write_control_register(Self::irq_register(offset), value);
    }

    fn irq_register(offset: u32) -> ControlRegister {
        match offset & 0x03 {
            0x02 => ControlRegister::IrqMask,
            0x03 => ControlRegister::IrqStatus,
            _ => ControlRegister::IrqOpen,
        }
    }
}
