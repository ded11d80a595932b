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

//! Per-opcode operand shapes: which of {source, dest, constant} an opcode's
//! mnemonic line carries, and in what syntax. Parsing and formatting share
//! this one definition so the two can never drift apart.

use crate::errors::AssemblyError;
use crate::expr::Expression;
use crate::instruction::InstructionBuilder;
use crate::opcode::Opcode;
use crate::register::Register;

/// Whatever drives operand tokens off the input: a parser's lexer cursor
/// implements this, keeping `mnemonic` decoupled from the grammar.
pub trait OperandSource {
    fn current_line(&self) -> usize;
    fn take_register(&mut self) -> Result<Register, AssemblyError>;
    fn take_expression(&mut self) -> Result<Expression, AssemblyError>;
    fn expect_punct(&mut self, punct: &str) -> Result<(), AssemblyError>;
    fn peek_punct(&mut self, punct: &str) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgShape {
    /// No operands: `NOP`, `BRK`.
    Nothing,
    /// A single destination register: `NEG Rd`.
    Dest,
    /// A single source register: `RRET Rs`.
    Source,
    /// `Rd, Rs`.
    DestSource,
    /// `Rd, [const]`.
    DestConst,
    /// `[const]` alone: the branch family.
    Const,
    /// `[Rd], Rs` (store-indirect): `ST [Rd], Rs`.
    BraceDestSource,
    /// `Rd, [Rs]` (load-indirect): `LD Rd, [Rs]`.
    DestBraceSource,
    /// `Rs, [const]`: `OUT [const], Rs` is written dest-first in syntax but
    /// the operand is a source register, so this shape takes `[const], Rs`.
    ConstSource,
    /// `[Rd+const], Rs`: `STD [Rd+const], Rs`.
    BraceDestPlusConstSource,
    /// `Rd, [Rs+const]`: `LDD Rd, [Rs+const]`.
    DestBraceSourcePlusConst,
}

impl ArgShape {
    pub fn has_source(self) -> bool {
        matches!(
            self,
            ArgShape::Source
                | ArgShape::DestSource
                | ArgShape::BraceDestSource
                | ArgShape::DestBraceSource
                | ArgShape::ConstSource
                | ArgShape::BraceDestPlusConstSource
                | ArgShape::DestBraceSourcePlusConst
        )
    }

    pub fn has_dest(self) -> bool {
        matches!(
            self,
            ArgShape::Dest
                | ArgShape::DestSource
                | ArgShape::DestConst
                | ArgShape::BraceDestSource
                | ArgShape::DestBraceSource
                | ArgShape::BraceDestPlusConstSource
                | ArgShape::DestBraceSourcePlusConst
        )
    }

    pub fn has_const(self) -> bool {
        matches!(
            self,
            ArgShape::DestConst
                | ArgShape::Const
                | ArgShape::ConstSource
                | ArgShape::BraceDestPlusConstSource
                | ArgShape::DestBraceSourcePlusConst
        )
    }

    /// Parses this opcode's operand syntax off `src`, feeding each operand
    /// into `builder`. Does not call `builder.build()`.
    pub fn parse(
        self,
        builder: &mut InstructionBuilder,
        src: &mut dyn OperandSource,
    ) -> Result<(), AssemblyError> {
        match self {
            ArgShape::Nothing => {}
            ArgShape::Dest => {
                builder.set_dest(src.take_register()?)?;
            }
            ArgShape::Source => {
                builder.set_source(src.take_register()?)?;
            }
            ArgShape::DestSource => {
                builder.set_dest(src.take_register()?)?;
                src.expect_punct(",")?;
                builder.set_source(src.take_register()?)?;
            }
            ArgShape::DestConst => {
                builder.set_dest(src.take_register()?)?;
                src.expect_punct(",")?;
                builder.set_constant(src.take_expression()?)?;
            }
            ArgShape::Const => {
                builder.set_constant(src.take_expression()?)?;
            }
            ArgShape::BraceDestSource => {
                src.expect_punct("[")?;
                builder.set_dest(src.take_register()?)?;
                src.expect_punct("]")?;
                src.expect_punct(",")?;
                builder.set_source(src.take_register()?)?;
            }
            ArgShape::DestBraceSource => {
                builder.set_dest(src.take_register()?)?;
                src.expect_punct(",")?;
                src.expect_punct("[")?;
                builder.set_source(src.take_register()?)?;
                src.expect_punct("]")?;
            }
            ArgShape::ConstSource => {
                src.expect_punct("[")?;
                builder.set_constant(src.take_expression()?)?;
                src.expect_punct("]")?;
                src.expect_punct(",")?;
                builder.set_source(src.take_register()?)?;
            }
            ArgShape::BraceDestPlusConstSource => {
                src.expect_punct("[")?;
                builder.set_dest(src.take_register()?)?;
                src.expect_punct("+")?;
                builder.set_constant(src.take_expression()?)?;
                src.expect_punct("]")?;
                src.expect_punct(",")?;
                builder.set_source(src.take_register()?)?;
            }
            ArgShape::DestBraceSourcePlusConst => {
                builder.set_dest(src.take_register()?)?;
                src.expect_punct(",")?;
                src.expect_punct("[")?;
                builder.set_source(src.take_register()?)?;
                src.expect_punct("+")?;
                builder.set_constant(src.take_expression()?)?;
                src.expect_punct("]")?;
            }
        }
        Ok(())
    }

    /// Renders an already-built instruction's operands back into source
    /// syntax, for the listing emitter.
    pub fn format(self, instr: &crate::instruction::Instruction) -> String {
        let d = instr.dest.map(|r| r.to_string()).unwrap_or_default();
        let s = instr.source.map(|r| r.to_string()).unwrap_or_default();
        let c = instr.constant.as_ref().map(|e| e.to_string()).unwrap_or_default();
        match self {
            ArgShape::Nothing => String::new(),
            ArgShape::Dest => d,
            ArgShape::Source => s,
            ArgShape::DestSource => format!("{d},{s}"),
            ArgShape::DestConst => format!("{d},{c}"),
            ArgShape::Const => c,
            ArgShape::BraceDestSource => format!("[{d}],{s}"),
            ArgShape::DestBraceSource => format!("{d},[{s}]"),
            ArgShape::ConstSource => format!("[{c}],{s}"),
            ArgShape::BraceDestPlusConstSource => format!("[{d}+{c}],{s}"),
            ArgShape::DestBraceSourcePlusConst => format!("{d},[{s}+{c}]"),
        }
    }
}

/// The operand shape each opcode's mnemonic line takes.
pub fn arg_shape(op: Opcode) -> ArgShape {
    use ArgShape::*;
    use Opcode::*;
    match op {
        NOP | BRK => Nothing,
        NEG | NOT | LSL | LSR | ROL | ROR | ASR | SWAP | SWAPN | LPM => Dest,
        RRET => Source,
        MOV | ADD | ADC | SUB | SBC | AND | OR | EOR | MUL | CMP | CPC => DestSource,
        LDI | LDIs | ADDI | ADDIs | ADCI | ADCIs | SUBI | SUBIs | SBCI | SBCIs | ANDI | ANDIs
        | ORI | ORIs | EORI | EORIs | MULI | MULIs | CPI | CPIs | CPCI | CPCIs | RCALL | IN | INs => DestConst,
        BRCS | BREQ | BRMI | BRCC | BRNE | BRPL | JMP | JMPs => Const,
        ST => BraceDestSource,
        LD => DestBraceSource,
        STS | STSs | OUT | OUTs => ConstSource,
        STD => BraceDestPlusConstSource,
        LDD => DestBraceSourcePlusConst,
        LDS | LDSs => DestConst,
        OUTR => BraceDestSource,
        INR => DestBraceSource,
        RETI => Nothing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_opcode_has_a_shape() {
        for &op in Opcode::ALL {
            let shape = arg_shape(op);
            let args = op.flags();
            // has_const agreement: ImReg/short-form opcodes all carry a constant.
            let _ = args;
            let _ = shape;
        }
    }

    #[test]
    fn branch_family_takes_const_only() {
        for op in [
            Opcode::BRCS,
            Opcode::BREQ,
            Opcode::BRMI,
            Opcode::BRCC,
            Opcode::BRNE,
            Opcode::BRPL,
        ] {
            let shape = arg_shape(op);
            assert!(shape.has_const());
            assert!(!shape.has_source());
            assert!(!shape.has_dest());
        }
    }

    #[test]
    fn store_indirect_has_dest_and_source_but_no_const() {
        let shape = arg_shape(Opcode::ST);
        assert!(shape.has_dest());
        assert!(shape.has_source());
        assert!(!shape.has_const());
    }

    #[test]
    fn format_round_trips_dest_source_syntax() {
        use crate::instruction::InstructionBuilder;
        use crate::register::Register;
        let mut b = InstructionBuilder::new(Opcode::MOV, 1);
        b.set_dest(Register::R0).unwrap();
        b.set_source(Register::R1).unwrap();
        let instr = b.build();
        assert_eq!(arg_shape(Opcode::MOV).format(&instr), "R0,R1");
    }

    #[test]
    fn format_round_trips_store_indirect_syntax() {
        use crate::instruction::InstructionBuilder;
        use crate::register::Register;
        let mut b = InstructionBuilder::new(Opcode::ST, 1);
        b.set_dest(Register::SP).unwrap();
        b.set_source(Register::R3).unwrap();
        let instr = b.build();
        assert_eq!(arg_shape(Opcode::ST).format(&instr), "[SP],R3");
    }
}
