//! Compiled grammar containing bytecode, tables, and rule entry points.

use super::charset::CompiledCharSet;
use super::instruction::{encode, encode_signed, op, opcode, operand, operand_signed};

/// Compiled grammar containing bytecode and lookup tables
pub struct CompiledGrammar<'a> {
    /// Bytecode buffer
    pub code: Vec<u32>,

    /// String table for literals
    pub strings: Vec<&'a str>,

    /// Character set table
    pub charsets: Vec<CompiledCharSet>,

    /// Rule info, indexed by rule id; rule 0 is the start rule
    pub rules: Vec<CompiledRule<'a>>,
}

/// Information about a compiled rule
pub struct CompiledRule<'a> {
    pub name: &'a str,
    pub bytecode_offset: usize,
}

impl<'a> CompiledGrammar<'a> {
    pub fn new() -> Self {
        Self {
            code: Vec::new(),
            strings: Vec::new(),
            charsets: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Get rule id by name (linear scan; grammars are small)
    pub fn get_rule(&self, name: &str) -> Option<u32> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.name == name {
                return Some(i as u32);
            }
        }
        None
    }

    /// Intern a string, returning its ID
    pub fn intern_string(&mut self, s: &'a str) -> u32 {
        for (i, existing) in self.strings.iter().enumerate() {
            if *existing == s {
                return i as u32;
            }
        }
        let id = self.strings.len() as u32;
        self.strings.push(s);
        id
    }

    /// Add a character set, returning its ID
    pub fn add_charset(&mut self, ranges: &[(char, char)], negated: bool) -> u32 {
        let charset = CompiledCharSet::new(ranges, negated);
        let id = self.charsets.len() as u32;
        self.charsets.push(charset);
        id
    }

    /// Emit an instruction
    pub fn emit(&mut self, instr: u32) -> usize {
        let offset = self.code.len();
        self.code.push(instr);
        offset
    }

    /// Get current code offset
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Patch a jump-family instruction at the given offset to target
    pub fn patch_jump(&mut self, offset: usize, target: usize) {
        let instr = self.code[offset];
        let opc = opcode(instr);
        let rel_offset = (target as i32) - (offset as i32);
        self.code[offset] = encode(opc, encode_signed(rel_offset));
    }

    /// Dump the compiled grammar to stderr for debugging
    pub fn dump(&self) {
        use std::io::Write;
        let stderr = std::io::stderr();
        let mut out = stderr.lock();

        writeln!(out, "\n{:=^60}", " COMPILED GRAMMAR DUMP ").ok();

        writeln!(out, "\n--- String Table ({} entries) ---", self.strings.len()).ok();
        for (i, s) in self.strings.iter().enumerate() {
            writeln!(out, "  [{:3}] {:?}", i, s).ok();
        }

        writeln!(out, "\n--- Charset Table ({} entries) ---", self.charsets.len()).ok();
        for (i, cs) in self.charsets.iter().enumerate() {
            let neg = if cs.is_negated() { "^" } else { "" };
            let mut chars = String::new();
            for c in 0u8..128 {
                if cs.matches(c as char) {
                    if c.is_ascii_graphic() {
                        chars.push(c as char);
                    } else {
                        chars.push_str(&format!("\\x{:02x}", c));
                    }
                }
            }
            if chars.len() > 40 {
                chars.truncate(40);
                chars.push_str("...");
            }
            writeln!(out, "  [{:3}] [{}{}]", i, neg, chars).ok();
        }

        writeln!(out, "\n--- Rules ({} entries) ---", self.rules.len()).ok();
        for (i, rule) in self.rules.iter().enumerate() {
            writeln!(out, "  [{:3}] {} @ offset {}", i, rule.name, rule.bytecode_offset).ok();
        }

        writeln!(out, "\n--- Bytecode ({} instructions) ---", self.code.len()).ok();
        self.disassemble(&mut out);

        writeln!(out, "\n{:=^60}\n", "").ok();
    }

    /// Disassemble bytecode to a writer
    pub fn disassemble<W: std::io::Write>(&self, out: &mut W) {
        let mut pc = 0;
        while pc < self.code.len() {
            let instr = self.code[pc];
            let opc = opcode(instr);
            let oper = operand(instr);

            for rule in &self.rules {
                if rule.bytecode_offset == pc {
                    writeln!(out, "\n  ; === {} ===", rule.name).ok();
                }
            }

            let desc = match opc {
                op::LITERAL => {
                    let s = self.strings.get(oper as usize).copied().unwrap_or("???");
                    format!("LITERAL      {} ({:?})", oper, s)
                }
                op::CHAR_CLASS => {
                    let name = match oper {
                        0 => "Digit",
                        1 => "Word",
                        2 => "Whitespace",
                        _ => "???",
                    };
                    format!("CHAR_CLASS   {} ({})", oper, name)
                }
                op::CHAR_SET => format!("CHAR_SET     {}", oper),
                op::ANY => "ANY".to_string(),
                op::JUMP => {
                    let offset = operand_signed(instr);
                    let target = (pc as i32 + offset) as usize;
                    format!("JUMP         {} -> @{}", offset, target)
                }
                op::CHOICE => {
                    let offset = operand_signed(instr);
                    let target = (pc as i32 + offset) as usize;
                    format!("CHOICE       {} -> @{}", offset, target)
                }
                op::COMMIT => {
                    let offset = operand_signed(instr);
                    let target = (pc as i32 + offset) as usize;
                    format!("COMMIT       {} -> @{}", offset, target)
                }
                op::FAIL => "FAIL".to_string(),
                op::END => "END".to_string(),
                op::CALL => {
                    let name = self
                        .rules
                        .get(oper as usize)
                        .map(|r| r.name)
                        .unwrap_or("???");
                    format!("CALL         {} ({})", oper, name)
                }
                _ => format!("??? opcode={:#04x} oper={}", opc, oper),
            };

            writeln!(out, "  {:4}: {}", pc, desc).ok();
            pc += 1;
        }
    }
}

impl<'a> Default for CompiledGrammar<'a> {
    fn default() -> Self {
        Self::new()
    }
}
