use super::opcodes::{opcode_info, AddressingMode};
use super::registers::*;
use super::{Cpu, VECTOR_IRQ2_BRK, ZERO_PAGE_BASE};
use crate::bus::Bus;

impl Cpu {
    /// Fetch, decode and run one instruction. Returns its cycle cost.
    pub(super) fn execute_instruction<B: Bus + ?Sized>(&mut self, bus: &mut B) -> i32 {
        let opcode = self.fetch_byte(bus);
        let info = opcode_info(opcode);
        let mode = info.mode;
        let base_cycles = info.cycles as u32;

        if self.config.debug {
            log::trace!(
                "{:04X}: {:02X} {} A={:02X} X={:02X} Y={:02X} S={:02X} P={:02X}",
                self.ctx.ppc,
                opcode,
                info.mnemonic,
                self.ctx.a,
                self.ctx.x,
                self.ctx.y,
                self.ctx.sp,
                self.ctx.p
            );
        }

        let cycles = match opcode {
            // Loads
            0xA9 | 0xA5 | 0xB5 | 0xAD | 0xBD | 0xB9 | 0xA1 | 0xB1 | 0xB2 => {
                let value = self.read_operand(bus, mode);
                self.lda(value, base_cycles)
            }
            0xA2 | 0xA6 | 0xB6 | 0xAE | 0xBE => {
                let value = self.read_operand(bus, mode);
                self.ldx(value, base_cycles)
            }
            0xA0 | 0xA4 | 0xB4 | 0xAC | 0xBC => {
                let value = self.read_operand(bus, mode);
                self.ldy(value, base_cycles)
            }

            // Stores
            0x85 | 0x95 | 0x8D | 0x9D | 0x99 | 0x81 | 0x91 | 0x92 => {
                let addr = self.operand_address(bus, mode);
                self.write8(bus, addr, self.ctx.a);
                base_cycles
            }
            0x86 | 0x96 | 0x8E => {
                let addr = self.operand_address(bus, mode);
                self.write8(bus, addr, self.ctx.x);
                base_cycles
            }
            0x84 | 0x94 | 0x8C => {
                let addr = self.operand_address(bus, mode);
                self.write8(bus, addr, self.ctx.y);
                base_cycles
            }
            0x64 | 0x74 | 0x9C | 0x9E => {
                let addr = self.operand_address(bus, mode);
                self.write8(bus, addr, 0);
                base_cycles
            }

            // Arithmetic and logic
            0x69 | 0x65 | 0x75 | 0x6D | 0x7D | 0x79 | 0x61 | 0x71 | 0x72 => {
                let value = self.read_operand(bus, mode);
                self.adc(value, base_cycles)
            }
            0xE9 | 0xE5 | 0xF5 | 0xED | 0xFD | 0xF9 | 0xE1 | 0xF1 | 0xF2 => {
                let value = self.read_operand(bus, mode);
                self.sbc(value, base_cycles)
            }
            0x29 | 0x25 | 0x35 | 0x2D | 0x3D | 0x39 | 0x21 | 0x31 | 0x32 => {
                let value = self.read_operand(bus, mode);
                self.and(value, base_cycles)
            }
            0x09 | 0x05 | 0x15 | 0x0D | 0x1D | 0x19 | 0x01 | 0x11 | 0x12 => {
                let value = self.read_operand(bus, mode);
                self.ora(value, base_cycles)
            }
            0x49 | 0x45 | 0x55 | 0x4D | 0x5D | 0x59 | 0x41 | 0x51 | 0x52 => {
                let value = self.read_operand(bus, mode);
                self.eor(value, base_cycles)
            }

            // Compares
            0xC9 | 0xC5 | 0xD5 | 0xCD | 0xDD | 0xD9 | 0xC1 | 0xD1 | 0xD2 => {
                let value = self.read_operand(bus, mode);
                self.cmp(value, self.ctx.a, base_cycles)
            }
            0xE0 | 0xE4 | 0xEC => {
                let value = self.read_operand(bus, mode);
                self.cmp(value, self.ctx.x, base_cycles)
            }
            0xC0 | 0xC4 | 0xCC => {
                let value = self.read_operand(bus, mode);
                self.cmp(value, self.ctx.y, base_cycles)
            }
            0x89 | 0x24 | 0x34 | 0x2C | 0x3C => {
                let value = self.read_operand(bus, mode);
                self.bit(value, base_cycles)
            }

            // Shifts and rotates
            0x0A => {
                self.ctx.a = self.asl(self.ctx.a);
                base_cycles
            }
            0x4A => {
                self.ctx.a = self.lsr(self.ctx.a);
                base_cycles
            }
            0x2A => {
                self.ctx.a = self.rol(self.ctx.a);
                base_cycles
            }
            0x6A => {
                self.ctx.a = self.ror(self.ctx.a);
                base_cycles
            }
            0x06 | 0x16 | 0x0E | 0x1E => self.modify(bus, mode, Self::asl, base_cycles),
            0x46 | 0x56 | 0x4E | 0x5E => self.modify(bus, mode, Self::lsr, base_cycles),
            0x26 | 0x36 | 0x2E | 0x3E => self.modify(bus, mode, Self::rol, base_cycles),
            0x66 | 0x76 | 0x6E | 0x7E => self.modify(bus, mode, Self::ror, base_cycles),

            // Increments and decrements
            0xE6 | 0xF6 | 0xEE | 0xFE => self.modify(bus, mode, Self::inc, base_cycles),
            0xC6 | 0xD6 | 0xCE | 0xDE => self.modify(bus, mode, Self::dec, base_cycles),
            0x1A => {
                self.ctx.a = self.inc(self.ctx.a);
                base_cycles
            }
            0x3A => {
                self.ctx.a = self.dec(self.ctx.a);
                base_cycles
            }
            0xE8 => {
                self.ctx.x = self.inc(self.ctx.x);
                base_cycles
            }
            0xC8 => {
                self.ctx.y = self.inc(self.ctx.y);
                base_cycles
            }
            0xCA => {
                self.ctx.x = self.dec(self.ctx.x);
                base_cycles
            }
            0x88 => {
                self.ctx.y = self.dec(self.ctx.y);
                base_cycles
            }

            // Bit manipulation
            0x04 | 0x0C => self.tsb(bus, mode, base_cycles),
            0x14 | 0x1C => self.trb(bus, mode, base_cycles),
            0x83 | 0xA3 | 0x93 | 0xB3 => self.tst(bus, mode, base_cycles),
            0x07 | 0x17 | 0x27 | 0x37 | 0x47 | 0x57 | 0x67 | 0x77 => {
                self.rmb(bus, opcode >> 4, base_cycles)
            }
            0x87 | 0x97 | 0xA7 | 0xB7 | 0xC7 | 0xD7 | 0xE7 | 0xF7 => {
                self.smb(bus, (opcode >> 4) & 0x07, base_cycles)
            }
            0x0F | 0x1F | 0x2F | 0x3F | 0x4F | 0x5F | 0x6F | 0x7F => {
                self.branch_on_bit(bus, opcode >> 4, false, base_cycles)
            }
            0x8F | 0x9F | 0xAF | 0xBF | 0xCF | 0xDF | 0xEF | 0xFF => {
                self.branch_on_bit(bus, (opcode >> 4) & 0x07, true, base_cycles)
            }

            // Branches
            0x10 => self.branch(bus, !self.ctx.flag(FLAG_NEGATIVE), base_cycles),
            0x30 => self.branch(bus, self.ctx.flag(FLAG_NEGATIVE), base_cycles),
            0x50 => self.branch(bus, !self.ctx.flag(FLAG_OVERFLOW), base_cycles),
            0x70 => self.branch(bus, self.ctx.flag(FLAG_OVERFLOW), base_cycles),
            0x90 => self.branch(bus, !self.ctx.flag(FLAG_CARRY), base_cycles),
            0xB0 => self.branch(bus, self.ctx.flag(FLAG_CARRY), base_cycles),
            0xD0 => self.branch(bus, !self.ctx.flag(FLAG_ZERO), base_cycles),
            0xF0 => self.branch(bus, self.ctx.flag(FLAG_ZERO), base_cycles),
            0x80 => self.branch(bus, true, base_cycles),
            0x44 => self.bsr(bus, base_cycles),

            // Jumps and subroutines
            0x4C => {
                self.ctx.pc = self.fetch_word(bus);
                base_cycles
            }
            0x6C => {
                let ptr = self.fetch_word(bus);
                self.ctx.pc = self.read_word(bus, ptr);
                base_cycles
            }
            0x7C => {
                let ptr = self.fetch_word(bus).wrapping_add(self.ctx.x as u16);
                self.ctx.pc = self.read_word(bus, ptr);
                base_cycles
            }
            0x20 => self.jsr(bus, base_cycles),
            0x60 => self.rts(bus, base_cycles),
            0x40 => self.rti(bus, base_cycles),
            0x00 => self.brk(bus, base_cycles),

            // Stack
            0x48 => {
                self.push_byte(bus, self.ctx.a);
                base_cycles
            }
            0xDA => {
                self.push_byte(bus, self.ctx.x);
                base_cycles
            }
            0x5A => {
                self.push_byte(bus, self.ctx.y);
                base_cycles
            }
            0x08 => {
                self.push_byte(bus, self.ctx.p);
                base_cycles
            }
            0x68 => {
                let value = self.pop_byte(bus);
                self.lda(value, base_cycles)
            }
            0xFA => {
                let value = self.pop_byte(bus);
                self.ldx(value, base_cycles)
            }
            0x7A => {
                let value = self.pop_byte(bus);
                self.ldy(value, base_cycles)
            }
            0x28 => {
                self.ctx.p = self.pop_byte(bus);
                base_cycles
            }

            // Register transfers
            0xAA => self.ldx(self.ctx.a, base_cycles),
            0xA8 => self.ldy(self.ctx.a, base_cycles),
            0x8A => self.lda(self.ctx.x, base_cycles),
            0x98 => self.lda(self.ctx.y, base_cycles),
            0xBA => self.ldx(self.ctx.sp, base_cycles),
            0x9A => {
                self.ctx.sp = self.ctx.x;
                base_cycles
            }
            0x22 => {
                std::mem::swap(&mut self.ctx.a, &mut self.ctx.x);
                base_cycles
            }
            0x42 => {
                std::mem::swap(&mut self.ctx.a, &mut self.ctx.y);
                base_cycles
            }
            0x02 => {
                std::mem::swap(&mut self.ctx.x, &mut self.ctx.y);
                base_cycles
            }
            0x62 => {
                self.ctx.a = 0;
                base_cycles
            }
            0x82 => {
                self.ctx.x = 0;
                base_cycles
            }
            0xC2 => {
                self.ctx.y = 0;
                base_cycles
            }

            // Flags
            0x18 => self.flag_op(FLAG_CARRY, false, base_cycles),
            0x38 => self.flag_op(FLAG_CARRY, true, base_cycles),
            0x58 => self.flag_op(FLAG_INTERRUPT_DISABLE, false, base_cycles),
            0x78 => self.flag_op(FLAG_INTERRUPT_DISABLE, true, base_cycles),
            0xB8 => self.flag_op(FLAG_OVERFLOW, false, base_cycles),
            0xD8 => self.flag_op(FLAG_DECIMAL, false, base_cycles),
            0xF8 => self.flag_op(FLAG_DECIMAL, true, base_cycles),
            // SET: memory-operation mode is not modelled, only the bit is.
            0xF4 => self.flag_op(FLAG_RESERVED, true, base_cycles),

            // Memory mapper
            0x53 => self.tam(bus, base_cycles),
            0x43 => self.tma(bus, base_cycles),

            // Video controller ports
            0x03 => self.st_port(bus, 0, base_cycles),
            0x13 => self.st_port(bus, 2, base_cycles),
            0x23 => self.st_port(bus, 3, base_cycles),

            // Block transfers
            0x73 => self.block_transfer(bus, BlockMode::Tii, base_cycles),
            0xC3 => self.block_transfer(bus, BlockMode::Tdd, base_cycles),
            0xD3 => self.block_transfer(bus, BlockMode::Tin, base_cycles),
            0xE3 => self.block_transfer(bus, BlockMode::Tia, base_cycles),
            0xF3 => self.block_transfer(bus, BlockMode::Tai, base_cycles),

            // CSL/CSH: the clock speed switch is not modelled.
            0x54 | 0xD4 => base_cycles,
            0xEA => base_cycles,

            _ => {
                log::debug!("illegal opcode {:02X} at {:04X}", opcode, self.ctx.ppc);
                base_cycles
            }
        };

        self.ctx.p |= FLAG_BREAK | FLAG_RESERVED;
        cycles as i32
    }

    /// Effective logical address for the memory-operand modes. Zero-page
    /// operands resolve into logical page 1.
    fn operand_address<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: AddressingMode) -> u16 {
        match mode {
            AddressingMode::ZeroPage => ZERO_PAGE_BASE | self.fetch_byte(bus) as u16,
            AddressingMode::ZeroPageX => {
                ZERO_PAGE_BASE | self.fetch_byte(bus).wrapping_add(self.ctx.x) as u16
            }
            AddressingMode::ZeroPageY => {
                ZERO_PAGE_BASE | self.fetch_byte(bus).wrapping_add(self.ctx.y) as u16
            }
            AddressingMode::Absolute => self.fetch_word(bus),
            AddressingMode::AbsoluteX => self.fetch_word(bus).wrapping_add(self.ctx.x as u16),
            AddressingMode::AbsoluteY => self.fetch_word(bus).wrapping_add(self.ctx.y as u16),
            AddressingMode::ZeroPageIndirect => {
                let zp = self.fetch_byte(bus);
                self.read_zero_page_word(bus, zp)
            }
            AddressingMode::ZeroPageIndexedIndirect => {
                let zp = self.fetch_byte(bus).wrapping_add(self.ctx.x);
                self.read_zero_page_word(bus, zp)
            }
            AddressingMode::ZeroPageIndirectIndexed => {
                let zp = self.fetch_byte(bus);
                self.read_zero_page_word(bus, zp)
                    .wrapping_add(self.ctx.y as u16)
            }
            // Remaining modes carry no single data operand.
            _ => ZERO_PAGE_BASE,
        }
    }

    fn read_operand<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: AddressingMode) -> u8 {
        if mode == AddressingMode::Immediate {
            return self.fetch_byte(bus);
        }
        let addr = self.operand_address(bus, mode);
        self.read8(bus, addr)
    }

    fn read_word<B: Bus + ?Sized>(&mut self, bus: &mut B, addr: u16) -> u16 {
        let lo = self.read8(bus, addr) as u16;
        let hi = self.read8(bus, addr.wrapping_add(1)) as u16;
        (hi << 8) | lo
    }

    /// Read-modify-write on a memory operand.
    fn modify<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        mode: AddressingMode,
        op: fn(&mut Self, u8) -> u8,
        cycles: u32,
    ) -> u32 {
        let addr = self.operand_address(bus, mode);
        let value = self.read8(bus, addr);
        let result = op(self, value);
        self.write8(bus, addr, result);
        cycles
    }

    fn update_zero_and_negative(&mut self, value: u8) {
        self.ctx.set_flag(FLAG_ZERO, value == 0);
        self.ctx.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }

    fn lda(&mut self, value: u8, cycles: u32) -> u32 {
        self.ctx.a = value;
        self.update_zero_and_negative(value);
        cycles
    }

    fn ldx(&mut self, value: u8, cycles: u32) -> u32 {
        self.ctx.x = value;
        self.update_zero_and_negative(value);
        cycles
    }

    fn ldy(&mut self, value: u8, cycles: u32) -> u32 {
        self.ctx.y = value;
        self.update_zero_and_negative(value);
        cycles
    }

    fn adc(&mut self, value: u8, cycles: u32) -> u32 {
        let a = self.ctx.a as i32;
        let m = value as i32;
        let carry = self.ctx.flag(FLAG_CARRY) as i32;

        if self.ctx.flag(FLAG_DECIMAL) {
            // V is left untouched in decimal mode.
            let mut lo = (a & 0x0F) + (m & 0x0F) + carry;
            let mut hi = (a & 0xF0) + (m & 0xF0);
            if lo > 0x09 {
                hi += 0x10;
                lo += 0x06;
            }
            if hi > 0x90 {
                hi += 0x60;
            }
            self.ctx.set_flag(FLAG_CARRY, hi & 0xFF00 != 0);
            self.ctx.a = ((lo & 0x0F) + (hi & 0xF0)) as u8;
        } else {
            let sum = a + m + carry;
            self.ctx
                .set_flag(FLAG_OVERFLOW, !(a ^ m) & (a ^ sum) & 0x80 != 0);
            self.ctx.set_flag(FLAG_CARRY, sum & 0xFF00 != 0);
            self.ctx.a = sum as u8;
        }
        self.update_zero_and_negative(self.ctx.a);
        cycles
    }

    fn sbc(&mut self, value: u8, cycles: u32) -> u32 {
        let a = self.ctx.a as i32;
        let m = value as i32;
        let borrow = !self.ctx.flag(FLAG_CARRY) as i32;
        let diff = a - m - borrow;

        if self.ctx.flag(FLAG_DECIMAL) {
            let mut lo = (a & 0x0F) - (m & 0x0F) - borrow;
            let mut hi = (a & 0xF0) - (m & 0xF0);
            if lo & 0xF0 != 0 {
                lo -= 6;
            }
            if lo & 0x80 != 0 {
                hi -= 0x10;
            }
            if hi & 0x0F00 != 0 {
                hi -= 0x60;
            }
            self.ctx.set_flag(FLAG_CARRY, diff & 0xFF00 == 0);
            self.ctx.a = ((lo & 0x0F) + (hi & 0xF0)) as u8;
        } else {
            self.ctx
                .set_flag(FLAG_OVERFLOW, (a ^ m) & (a ^ diff) & 0x80 != 0);
            self.ctx.set_flag(FLAG_CARRY, diff & 0xFF00 == 0);
            self.ctx.a = diff as u8;
        }
        self.update_zero_and_negative(self.ctx.a);
        cycles
    }

    fn and(&mut self, value: u8, cycles: u32) -> u32 {
        self.lda(self.ctx.a & value, cycles)
    }

    fn ora(&mut self, value: u8, cycles: u32) -> u32 {
        self.lda(self.ctx.a | value, cycles)
    }

    fn eor(&mut self, value: u8, cycles: u32) -> u32 {
        self.lda(self.ctx.a ^ value, cycles)
    }

    fn cmp(&mut self, value: u8, register: u8, cycles: u32) -> u32 {
        self.ctx.set_flag(FLAG_CARRY, register >= value);
        self.update_zero_and_negative(register.wrapping_sub(value));
        cycles
    }

    fn bit(&mut self, value: u8, cycles: u32) -> u32 {
        self.ctx.set_flag(FLAG_ZERO, self.ctx.a & value == 0);
        self.ctx.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
        self.ctx.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
        cycles
    }

    fn asl(&mut self, value: u8) -> u8 {
        self.ctx.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = value << 1;
        self.update_zero_and_negative(result);
        result
    }

    fn lsr(&mut self, value: u8) -> u8 {
        self.ctx.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = value >> 1;
        self.update_zero_and_negative(result);
        result
    }

    fn rol(&mut self, value: u8) -> u8 {
        let carry_in = self.ctx.flag(FLAG_CARRY) as u8;
        self.ctx.set_flag(FLAG_CARRY, value & 0x80 != 0);
        let result = (value << 1) | carry_in;
        self.update_zero_and_negative(result);
        result
    }

    fn ror(&mut self, value: u8) -> u8 {
        let carry_in = (self.ctx.flag(FLAG_CARRY) as u8) << 7;
        self.ctx.set_flag(FLAG_CARRY, value & 0x01 != 0);
        let result = (value >> 1) | carry_in;
        self.update_zero_and_negative(result);
        result
    }

    fn inc(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.update_zero_and_negative(result);
        result
    }

    fn dec(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.update_zero_and_negative(result);
        result
    }

    fn flag_op(&mut self, flag: u8, value: bool, cycles: u32) -> u32 {
        self.ctx.set_flag(flag, value);
        cycles
    }

    /// N and V from the operand, Z from the value written back.
    fn tsb<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: AddressingMode, cycles: u32) -> u32 {
        let addr = self.operand_address(bus, mode);
        let value = self.read8(bus, addr);
        let result = value | self.ctx.a;
        self.set_test_flags(value, result);
        self.write8(bus, addr, result);
        cycles
    }

    fn trb<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: AddressingMode, cycles: u32) -> u32 {
        let addr = self.operand_address(bus, mode);
        let value = self.read8(bus, addr);
        let result = value & !self.ctx.a;
        self.set_test_flags(value, result);
        self.write8(bus, addr, result);
        cycles
    }

    fn tst<B: Bus + ?Sized>(&mut self, bus: &mut B, mode: AddressingMode, cycles: u32) -> u32 {
        let mask = self.fetch_byte(bus);
        let operand_mode = match mode {
            AddressingMode::ImmediateZeroPage => AddressingMode::ZeroPage,
            AddressingMode::ImmediateZeroPageX => AddressingMode::ZeroPageX,
            AddressingMode::ImmediateAbsolute => AddressingMode::Absolute,
            _ => AddressingMode::AbsoluteX,
        };
        let value = self.read_operand(bus, operand_mode);
        self.set_test_flags(value, mask & value);
        cycles
    }

    fn set_test_flags(&mut self, operand: u8, result: u8) {
        self.ctx.set_flag(FLAG_NEGATIVE, operand & 0x80 != 0);
        self.ctx.set_flag(FLAG_OVERFLOW, operand & 0x40 != 0);
        self.ctx.set_flag(FLAG_ZERO, result == 0);
    }

    fn rmb<B: Bus + ?Sized>(&mut self, bus: &mut B, bit: u8, cycles: u32) -> u32 {
        let addr = ZERO_PAGE_BASE | self.fetch_byte(bus) as u16;
        let value = self.read8(bus, addr) & !(1 << bit);
        self.write8(bus, addr, value);
        cycles
    }

    fn smb<B: Bus + ?Sized>(&mut self, bus: &mut B, bit: u8, cycles: u32) -> u32 {
        let addr = ZERO_PAGE_BASE | self.fetch_byte(bus) as u16;
        let value = self.read8(bus, addr) | (1 << bit);
        self.write8(bus, addr, value);
        cycles
    }

    fn branch_on_bit<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        bit: u8,
        branch_if_set: bool,
        cycles: u32,
    ) -> u32 {
        let addr = ZERO_PAGE_BASE | self.fetch_byte(bus) as u16;
        let value = self.read8(bus, addr);
        let bit_set = value & (1 << bit) != 0;
        self.branch(bus, bit_set == branch_if_set, cycles)
    }

    fn branch<B: Bus + ?Sized>(&mut self, bus: &mut B, condition: bool, cycles: u32) -> u32 {
        let offset = self.fetch_byte(bus) as i8;
        if condition {
            self.ctx.pc = self.ctx.pc.wrapping_add(offset as u16);
            // Taken branches cost 2 more, no page-crossing penalty.
            cycles + 2
        } else {
            cycles
        }
    }

    fn bsr<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let offset = self.fetch_byte(bus) as i8;
        let return_addr = self.ctx.pc.wrapping_sub(1);
        self.push_byte(bus, (return_addr >> 8) as u8);
        self.push_byte(bus, return_addr as u8);
        self.ctx.pc = self.ctx.pc.wrapping_add(offset as u16);
        cycles
    }

    fn jsr<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let target = self.fetch_word(bus);
        let return_addr = self.ctx.pc.wrapping_sub(1);
        self.push_byte(bus, (return_addr >> 8) as u8);
        self.push_byte(bus, return_addr as u8);
        self.ctx.pc = target;
        cycles
    }

    fn rts<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        self.ctx.pc = ((hi << 8) | lo).wrapping_add(1);
        cycles
    }

    fn rti<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        self.ctx.p = self.pop_byte(bus);
        let lo = self.pop_byte(bus) as u16;
        let hi = self.pop_byte(bus) as u16;
        self.ctx.pc = (hi << 8) | lo;
        cycles
    }

    /// Software interrupt through the IRQ2 vector. The byte after the opcode
    /// is a signature and is skipped.
    fn brk<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let pc = self.ctx.pc.wrapping_add(1);
        self.push_byte(bus, (pc >> 8) as u8);
        self.push_byte(bus, pc as u8);
        self.push_byte(bus, self.ctx.p | FLAG_BREAK);
        self.ctx.set_flag(FLAG_DECIMAL, false);
        self.ctx.set_flag(FLAG_INTERRUPT_DISABLE, true);
        self.ctx.pc = self.read_word(bus, VECTOR_IRQ2_BRK);
        cycles
    }

    fn tam<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let mask = self.fetch_byte(bus);
        let value = self.ctx.a;
        for (bank, slot) in self.ctx.mmr.iter_mut().enumerate() {
            if mask & (1 << bank) != 0 {
                *slot = value;
            }
        }
        cycles
    }

    /// Copies the first selected mapper register into A.
    fn tma<B: Bus + ?Sized>(&mut self, bus: &mut B, cycles: u32) -> u32 {
        let mask = self.fetch_byte(bus);
        if let Some(bank) = (0..self.ctx.mmr.len()).find(|bank| mask & (1 << bank) != 0) {
            self.ctx.a = self.ctx.mmr[bank];
        }
        cycles
    }

    fn st_port<B: Bus + ?Sized>(&mut self, bus: &mut B, port: u32, cycles: u32) -> u32 {
        let value = self.fetch_byte(bus);
        let addr = self.config.vdc_st_base + port;
        self.write_physical(bus, addr, value);
        cycles
    }

    fn block_transfer<B: Bus + ?Sized>(
        &mut self,
        bus: &mut B,
        mode: BlockMode,
        cycles: u32,
    ) -> u32 {
        let source = self.fetch_word(bus);
        let dest = self.fetch_word(bus);
        let length = match self.fetch_word(bus) {
            0 => 0x1_0000,
            length => length as u32,
        };

        // A, X and Y are saved on the stack around the transfer.
        self.push_byte(bus, self.ctx.a);
        self.push_byte(bus, self.ctx.x);
        self.push_byte(bus, self.ctx.y);

        let mut src = source;
        let mut dst = dest;
        let mut alternate: u16 = 0;
        for _ in 0..length {
            let (from, to) = match mode {
                BlockMode::Tia => (src, dest.wrapping_add(alternate)),
                BlockMode::Tai => (source.wrapping_add(alternate), dst),
                _ => (src, dst),
            };
            let value = self.read8(bus, from);
            self.write8(bus, to, value);

            match mode {
                BlockMode::Tii => {
                    src = src.wrapping_add(1);
                    dst = dst.wrapping_add(1);
                }
                BlockMode::Tdd => {
                    src = src.wrapping_sub(1);
                    dst = dst.wrapping_sub(1);
                }
                BlockMode::Tin | BlockMode::Tia => src = src.wrapping_add(1),
                BlockMode::Tai => dst = dst.wrapping_add(1),
            }
            alternate ^= 1;
        }

        self.ctx.y = self.pop_byte(bus);
        self.ctx.x = self.pop_byte(bus);
        self.ctx.a = self.pop_byte(bus);
        cycles + 6 * length
    }
}

#[derive(Clone, Copy, Debug)]
enum BlockMode {
    /// Increment source and destination.
    Tii,
    /// Decrement source and destination.
    Tdd,
    /// Increment source, fixed destination.
    Tin,
    /// Increment source, destination alternates between two bytes.
    Tia,
    /// Source alternates between two bytes, increment destination.
    Tai,
}
