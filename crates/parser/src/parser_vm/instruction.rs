//! Bytecode instruction encoding and opcodes.
//!
//! Instructions are 32-bit words: 8-bit opcode + 24-bit operand.

/// Opcode constants (8-bit)
pub mod op {
    // Input matching
    pub const LITERAL: u8 = 0x01;
    pub const CHAR_CLASS: u8 = 0x02;
    pub const CHAR_SET: u8 = 0x03;
    pub const ANY: u8 = 0x04;

    // Control flow
    pub const JUMP: u8 = 0x10;
    pub const CHOICE: u8 = 0x11;
    pub const COMMIT: u8 = 0x12;
    pub const FAIL: u8 = 0x13;
    pub const END: u8 = 0x14;

    // Rule dispatch
    pub const CALL: u8 = 0x20;
}

/// Encode an instruction from opcode and operand
#[inline]
pub fn encode(opcode: u8, operand: u32) -> u32 {
    ((opcode as u32) << 24) | (operand & 0x00FF_FFFF)
}

/// Decode opcode from instruction
#[inline]
pub fn opcode(instr: u32) -> u8 {
    (instr >> 24) as u8
}

/// Decode operand from instruction (24-bit unsigned)
#[inline]
pub fn operand(instr: u32) -> u32 {
    instr & 0x00FF_FFFF
}

/// Decode operand as signed offset
#[inline]
pub fn operand_signed(instr: u32) -> i32 {
    let raw = instr & 0x00FF_FFFF;
    // Sign-extend from 24 bits
    if raw & 0x0080_0000 != 0 {
        (raw | 0xFF00_0000) as i32
    } else {
        raw as i32
    }
}

/// Encode a signed offset into 24-bit operand
#[inline]
pub fn encode_signed(offset: i32) -> u32 {
    (offset as u32) & 0x00FF_FFFF
}
