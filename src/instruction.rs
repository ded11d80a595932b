/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! The encodable program items: [`Instruction`] (one opcode plus operands)
//! and [`DataWord`] (a raw 16-bit value, Von-Neumann mode only).

use crate::errors::AssemblyError;
use crate::expr::{Context, Expression};
use crate::opcode::{AluBSel, ImmExtMode, Opcode};
use crate::register::Register;

#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dest: Option<Register>,
    pub source: Option<Register>,
    pub constant: Option<Expression>,
    pub label: Option<String>,
    pub macro_description: Option<String>,
    pub comment: Option<String>,
    pub line: usize,
    pub origin: Option<i64>,
    /// Resolved by the address pass; meaningless before linking.
    pub address: i64,
}

impl Instruction {
    /// Size in 16-bit words: 2 for the long immediate encoding, else 1.
    pub fn size(&self) -> i64 {
        if self.opcode.flags().alu_b_sel == AluBSel::ImReg {
            2
        } else {
            1
        }
    }

    fn eval_constant(&self, context: &Context) -> Result<i64, AssemblyError> {
        self.constant
            .as_ref()
            .ok_or_else(|| AssemblyError::semantic_no_line("instruction expects a constant"))?
            .get_value(context)
            .map_err(|e| e.with_line(self.line))
    }

    /// Encodes this instruction into one or two 16-bit words per §4.4.
    pub fn encode(&self, context: &Context) -> Result<Vec<u16>, AssemblyError> {
        let flags = self.opcode.flags();
        let op = self.opcode.value() as u16;
        let rd = self.dest.map(|r| r.value() as u16).unwrap_or(0);
        let rs = self.source.map(|r| r.value() as u16).unwrap_or(0);

        match flags.alu_b_sel {
            AluBSel::InstrSourceAndDest => {
                let c = self.eval_constant(context)?;
                let offset = c - self.address - 1;
                if !(-128..=127).contains(&offset) {
                    return Err(AssemblyError::semantic(
                        self.line,
                        format!("branch target out of range: offset {offset}"),
                    ));
                }
                let word = (op << 8) | ((offset as i16 as u16) & 0xFF);
                Ok(vec![word])
            }
            AluBSel::InstrSource => {
                let c = self.eval_constant(context)?;
                if !(0..=15).contains(&c) {
                    return Err(AssemblyError::semantic(self.line, "short constant too large"));
                }
                Ok(vec![(op << 8) | (rd << 4) | (c as u16 & 0xF)])
            }
            AluBSel::InstrDest => {
                let c = self.eval_constant(context)?;
                if !(0..=15).contains(&c) {
                    return Err(AssemblyError::semantic(self.line, "short constant too large"));
                }
                Ok(vec![(op << 8) | ((c as u16 & 0xF) << 4) | rs])
            }
            AluBSel::ImReg => {
                let c = self.eval_constant(context)?;
                let const_word = (c as u16 & 0x7FFF) | 0x8000;
                let low = match flags.imm_ext_mode {
                    ImmExtMode::Extend => {
                        if !(-16384..=16383).contains(&c) {
                            return Err(AssemblyError::semantic(
                                self.line,
                                "constant does not fit in a signed 15-bit field",
                            ));
                        }
                        (rd << 4) | rs
                    }
                    ImmExtMode::Src0 | ImmExtMode::Dest0 => {
                        if !(-32768..=65535).contains(&c) {
                            return Err(AssemblyError::semantic(
                                self.line,
                                "constant does not fit in a 16-bit field",
                            ));
                        }
                        let const_bit = ((c >> 15) & 1) as u16;
                        if flags.imm_ext_mode == ImmExtMode::Src0 {
                            (rd << 4) | const_bit
                        } else {
                            (const_bit << 4) | rs
                        }
                    }
                    ImmExtMode::Res => unreachable!("Res is never produced by any opcode"),
                };
                Ok(vec![const_word, (op << 8) | low])
            }
            // Register-only instructions place the destination nibble above
            // the source nibble, matching the ImReg extend word above.
            _ => Ok(vec![(op << 8) | (rd << 4) | rs]),
        }
    }
}

/// Accumulates operands for one instruction line as the mnemonic-argument
/// grammar (`ArgShape::parse`) drives the token stream.
pub struct InstructionBuilder {
    opcode: Opcode,
    line: usize,
    dest: Option<Register>,
    source: Option<Register>,
    constant: Option<Expression>,
}

impl InstructionBuilder {
    pub fn new(opcode: Opcode, line: usize) -> Self {
        InstructionBuilder {
            opcode,
            line,
            dest: None,
            source: None,
            constant: None,
        }
    }

    pub fn set_dest(&mut self, reg: Register) -> Result<(), AssemblyError> {
        self.dest = Some(reg);
        Ok(())
    }

    pub fn set_source(&mut self, reg: Register) -> Result<(), AssemblyError> {
        self.source = Some(reg);
        Ok(())
    }

    pub fn set_constant(&mut self, expr: Expression) -> Result<(), AssemblyError> {
        self.constant = Some(expr);
        Ok(())
    }

    /// Freezes the builder into an `Instruction`; pending label/macro-description/
    /// comment/origin are attached afterward by the program assembler.
    pub fn build(self) -> Instruction {
        Instruction {
            opcode: self.opcode,
            dest: self.dest,
            source: self.source,
            constant: self.constant,
            label: None,
            macro_description: None,
            comment: None,
            line: self.line,
            origin: None,
            address: 0,
        }
    }
}

/// A raw 16-bit value emitted directly into program memory. Only legal in
/// Von-Neumann mode (after `.dorg`); size is always 1.
#[derive(Debug, Clone)]
pub struct DataWord {
    pub value: Expression,
    pub label: Option<String>,
    pub line: usize,
    pub address: i64,
}

impl DataWord {
    pub fn size(&self) -> i64 {
        1
    }

    pub fn encode(&self, context: &Context) -> Result<u16, AssemblyError> {
        let v = self.value.get_value(context).map_err(|e| e.with_line(self.line))?;
        if !(-32768..=65535).contains(&v) {
            return Err(AssemblyError::semantic(self.line, "data value out of 16-bit range"));
        }
        Ok(v as u16)
    }
}

/// One slot in a [`crate::program::Program`]: either an instruction or a raw word.
#[derive(Debug, Clone)]
pub enum ProgramItem {
    Instruction(Instruction),
    Data(DataWord),
}

impl ProgramItem {
    pub fn size(&self) -> i64 {
        match self {
            ProgramItem::Instruction(i) => i.size(),
            ProgramItem::Data(d) => d.size(),
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            ProgramItem::Instruction(i) => i.label.as_deref(),
            ProgramItem::Data(d) => d.label.as_deref(),
        }
    }

    pub fn origin(&self) -> Option<i64> {
        match self {
            ProgramItem::Instruction(i) => i.origin,
            ProgramItem::Data(_) => None,
        }
    }

    pub fn line(&self) -> usize {
        match self {
            ProgramItem::Instruction(i) => i.line,
            ProgramItem::Data(d) => d.line,
        }
    }

    pub fn address(&self) -> i64 {
        match self {
            ProgramItem::Instruction(i) => i.address,
            ProgramItem::Data(d) => d.address,
        }
    }

    pub fn set_address(&mut self, addr: i64) {
        match self {
            ProgramItem::Instruction(i) => i.address = addr,
            ProgramItem::Data(d) => d.address = addr,
        }
    }

    pub fn encode(&self, context: &Context) -> Result<Vec<u16>, AssemblyError> {
        match self {
            ProgramItem::Instruction(i) => i.encode(context),
            ProgramItem::Data(d) => Ok(vec![d.encode(context)?]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;

    fn ctx() -> Context {
        Context::new()
    }

    #[test]
    fn mov_encodes_register_only_word() {
        let mut b = InstructionBuilder::new(Opcode::MOV, 1);
        b.set_dest(Register::R0).unwrap();
        b.set_source(Register::R1).unwrap();
        let instr = b.build();
        let words = instr.encode(&ctx()).unwrap();
        assert_eq!(words, vec![0x101]);
    }

    #[test]
    fn short_immediate_out_of_range_is_rejected() {
        let mut b = InstructionBuilder::new(Opcode::LDSs, 1);
        b.set_dest(Register::R0).unwrap();
        b.set_constant(Expression::constant(16)).unwrap();
        let instr = b.build();
        assert!(instr.encode(&ctx()).is_err());
    }

    #[test]
    fn short_immediate_in_range_succeeds() {
        let mut b = InstructionBuilder::new(Opcode::LDSs, 1);
        b.set_dest(Register::R0).unwrap();
        b.set_constant(Expression::constant(15)).unwrap();
        let instr = b.build();
        assert!(instr.encode(&ctx()).is_ok());
    }

    #[test]
    fn long_immediate_emits_two_words() {
        let mut b = InstructionBuilder::new(Opcode::LDI, 1);
        b.set_dest(Register::R0).unwrap();
        b.set_constant(Expression::constant(0x1234)).unwrap();
        let instr = b.build();
        let words = instr.encode(&ctx()).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0], 0x9234);
    }
}
