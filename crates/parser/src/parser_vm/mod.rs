//! Parsing Virtual Machine
//!
//! Compiles grammar rules into bytecode and executes it against input with
//! explicit backtracking.
//!
//! # Instruction Encoding
//!
//! Instructions are 32-bit words: 8-bit opcode + 24-bit operand.

mod charset;
mod compiler;
mod grammar;
mod instruction;
mod vm;

pub use charset::CompiledCharSet;
pub use compiler::Compiler;
pub use grammar::{CompiledGrammar, CompiledRule};
pub use instruction::{encode, encode_signed, op, opcode, operand, operand_signed};
pub use vm::VM;
