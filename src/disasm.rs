//! HuC6280 disassembler for debugger front ends.

use std::fmt;

use crate::bus::{translate, Bus, NUM_BANKS};
use crate::cpu::{opcode_info, AddressingMode, Cpu};

/// One decoded instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub address: u16,
    pub opcode: u8,
    pub mnemonic: &'static str,
    pub mode: AddressingMode,
    pub operand_bytes: Vec<u8>,
    pub illegal: bool,
}

impl Instruction {
    /// Length in bytes, opcode included.
    pub fn size(&self) -> u16 {
        1 + self.operand_bytes.len() as u16
    }

    pub fn operand(&self) -> String {
        format_operand(self)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operand = format_operand(self);
        if operand.is_empty() {
            f.write_str(self.mnemonic)
        } else {
            write!(f, "{} {}", self.mnemonic, operand)
        }
    }
}

/// Decode the instruction at logical `pc`, reading through the mapper
/// registers `mmr` with [`Bus::debug_read`].
pub fn disassemble<B: Bus + ?Sized>(bus: &mut B, mmr: &[u8; NUM_BANKS], pc: u16) -> Instruction {
    let opcode = bus.debug_read(translate(mmr, pc));
    let info = opcode_info(opcode);
    let operand_bytes = (1..info.size() as u16)
        .map(|offset| bus.debug_read(translate(mmr, pc.wrapping_add(offset))))
        .collect();
    Instruction {
        address: pc,
        opcode,
        mnemonic: info.mnemonic,
        mode: info.mode,
        operand_bytes,
        illegal: info.illegal,
    }
}

/// Disassemble `count` consecutive instructions starting at `pc`.
pub fn disassemble_range<B: Bus + ?Sized>(
    bus: &mut B,
    mmr: &[u8; NUM_BANKS],
    pc: u16,
    count: usize,
) -> Vec<Instruction> {
    let mut listing = Vec::with_capacity(count);
    let mut addr = pc;
    for _ in 0..count {
        let instruction = disassemble(bus, mmr, addr);
        addr = addr.wrapping_add(instruction.size());
        listing.push(instruction);
    }
    listing
}

impl Cpu {
    /// Disassemble at `pc` using this core's current bank mapping.
    /// Returns the text and the instruction length.
    pub fn disassemble<B: Bus + ?Sized>(&self, bus: &mut B, pc: u16) -> (String, u16) {
        let instruction = disassemble(bus, &self.context().mmr, pc);
        (instruction.to_string(), instruction.size())
    }
}

fn word(lo: u8, hi: u8) -> u16 {
    u16::from_le_bytes([lo, hi])
}

fn branch_target(from: u16, offset: u8) -> u16 {
    from.wrapping_add(offset as i8 as u16)
}

fn format_operand(instr: &Instruction) -> String {
    use AddressingMode::*;

    if instr.illegal {
        return format!("${:02X}", instr.opcode);
    }

    let b = &instr.operand_bytes;
    let byte = |index: usize| b.get(index).copied().unwrap_or(0);
    let next = instr.address.wrapping_add(instr.size());

    match instr.mode {
        Implied => String::new(),
        Accumulator => "A".to_string(),
        Immediate => format!("#${:02X}", byte(0)),
        ZeroPage => format!("${:02X}", byte(0)),
        ZeroPageX => format!("${:02X},X", byte(0)),
        ZeroPageY => format!("${:02X},Y", byte(0)),
        Absolute => format!("${:04X}", word(byte(0), byte(1))),
        AbsoluteX => format!("${:04X},X", word(byte(0), byte(1))),
        AbsoluteY => format!("${:04X},Y", word(byte(0), byte(1))),
        AbsoluteIndirect => format!("(${:04X})", word(byte(0), byte(1))),
        AbsoluteIndexedIndirect => format!("(${:04X},X)", word(byte(0), byte(1))),
        ZeroPageIndirect => format!("(${:02X})", byte(0)),
        ZeroPageIndexedIndirect => format!("(${:02X},X)", byte(0)),
        ZeroPageIndirectIndexed => format!("(${:02X}),Y", byte(0)),
        Relative => format!("${:04X}", branch_target(next, byte(0))),
        ZeroPageRelative => format!("${:02X}, ${:04X}", byte(0), branch_target(next, byte(1))),
        ImmediateZeroPage => format!("#${:02X}, ${:02X}", byte(0), byte(1)),
        ImmediateZeroPageX => format!("#${:02X}, ${:02X},X", byte(0), byte(1)),
        ImmediateAbsolute => format!("#${:02X}, ${:04X}", byte(0), word(byte(1), byte(2))),
        ImmediateAbsoluteX => format!("#${:02X}, ${:04X},X", byte(0), word(byte(1), byte(2))),
        BlockTransfer => format!(
            "${:04X}, ${:04X}, ${:04X}",
            word(byte(0), byte(1)),
            word(byte(2), byte(3)),
            word(byte(4), byte(5))
        ),
    }
}
