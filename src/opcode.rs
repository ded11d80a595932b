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

//! The 70-member opcode enumeration and its control-word metadata.
//!
//! Unlike the reference implementation this table is not lazily built: every
//! opcode's [`Flags`] are produced by a plain `match`, resolved once at the
//! call site with no shared mutable cache and no construction-order coupling.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRam {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadIo {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteRam {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteIo {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Break {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceToAluA {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    No,
    Brc,
    Brz,
    Brn,
    Uncond,
    Brnc,
    Brnz,
    Brnn,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluBSel {
    Source,
    Rom,
    ImReg,
    Zero,
    Res,
    InstrSource,
    InstrSourceAndDest,
    InstrDest,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluToBus {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrcToBus {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmExtMode {
    Extend,
    Res,
    Src0,
    Dest0,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluCmd {
    PassInB,
    Add,
    Sub,
    And,
    Or,
    Xor,
    Not,
    Neg,
    Lsl,
    Lsr,
    Asr,
    Swap,
    Swapn,
    Mul,
    Res4,
    Res5,
    Res6,
    Adc,
    Sbc,
    Res7,
    Res8,
    Res9,
    Res10,
    Res11,
    Rol,
    Ror,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnRegWrite {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorePc {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JmpAbs {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetI {
    No,
    Yes,
}
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFlags {
    No,
    Yes,
}

/// Control-signal bundle for one opcode. Field order here is declaration
/// order, *not* the packing order — packing order is fixed explicitly in
/// [`Opcode::create_control_word`].
#[derive(Debug, Clone, Copy)]
pub struct Flags {
    pub rr: ReadRam,
    pub wr: WriteRam,
    pub br: Branch,
    pub alu_b_sel: AluBSel,
    pub imm_ext_mode: ImmExtMode,
    pub alu_to_bus: AluToBus,
    pub src_to_bus: SrcToBus,
    pub alu_cmd: AluCmd,
    pub en_reg_write: EnRegWrite,
    pub store_pc: StorePc,
    pub source_to_alu_a: SourceToAluA,
    pub jmp_abs: JmpAbs,
    pub ret_i: RetI,
    pub wio: WriteIo,
    pub rio: ReadIo,
    pub brk: Break,
    pub str_flags: StoreFlags,
}

impl Default for Flags {
    fn default() -> Self {
        Flags {
            rr: ReadRam::No,
            wr: WriteRam::No,
            br: Branch::No,
            alu_b_sel: AluBSel::Source,
            imm_ext_mode: ImmExtMode::Extend,
            alu_to_bus: AluToBus::No,
            src_to_bus: SrcToBus::No,
            alu_cmd: AluCmd::PassInB,
            en_reg_write: EnRegWrite::No,
            store_pc: StorePc::No,
            source_to_alu_a: SourceToAluA::No,
            jmp_abs: JmpAbs::No,
            ret_i: RetI::No,
            wio: WriteIo::No,
            rio: ReadIo::No,
            brk: Break::No,
            str_flags: StoreFlags::No,
        }
    }
}

/// Packs one enumerated control field, in the order its `.add` calls are
/// made, using `ceil(log2(member_count))` bits per field.
#[derive(Default)]
struct ControlWordBuilder {
    pos: u32,
    word: u64,
}

impl ControlWordBuilder {
    fn add(mut self, value: u8, member_count: u32) -> Self {
        let width = match member_count {
            0..=2 => 1,
            3..=4 => 2,
            5..=8 => 3,
            9..=16 => 4,
            17..=32 => 5,
            n => panic!("unsupported enum size: {n} members"),
        };
        self.word |= (value as u64) << self.pos;
        self.pos += width;
        self
    }

    fn get(self) -> u64 {
        self.word
    }
}

macro_rules! ordinal {
    ($value:expr) => {
        $value as u8
    };
}

impl Flags {
    /// Packs this opcode's control signals into one word, field order fixed
    /// by the datapath: alu_b_sel, src_to_bus, alu_cmd, en_reg_write,
    /// str_flags, alu_to_bus, imm_ext_mode, br, source_to_alu_a, rr, wr,
    /// jmp_abs, wio, rio, store_pc, brk, ret_i.
    pub fn control_word(&self) -> u64 {
        ControlWordBuilder::default()
            .add(ordinal!(self.alu_b_sel), 8)
            .add(ordinal!(self.src_to_bus), 2)
            .add(ordinal!(self.alu_cmd), 26)
            .add(ordinal!(self.en_reg_write), 2)
            .add(ordinal!(self.str_flags), 2)
            .add(ordinal!(self.alu_to_bus), 2)
            .add(ordinal!(self.imm_ext_mode), 4)
            .add(ordinal!(self.br), 8)
            .add(ordinal!(self.source_to_alu_a), 2)
            .add(ordinal!(self.rr), 2)
            .add(ordinal!(self.wr), 2)
            .add(ordinal!(self.jmp_abs), 2)
            .add(ordinal!(self.wio), 2)
            .add(ordinal!(self.rio), 2)
            .add(ordinal!(self.store_pc), 2)
            .add(ordinal!(self.brk), 2)
            .add(ordinal!(self.ret_i), 2)
            .get()
    }
}

macro_rules! opcodes {
    ($($(#[$doc:meta])* $name:ident = $value:literal),+ $(,)?) => {
        /// The closed 70-member instruction opcode enumeration.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum Opcode {
            $($(#[$doc])* $name),+
        }

        impl Opcode {
            pub fn value(self) -> u8 {
                match self {
                    $(Opcode::$name => $value),+
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    $(Opcode::$name => stringify!($name)),+
                }
            }

            /// Case-insensitive mnemonic lookup.
            pub fn parse_str(s: &str) -> Option<Opcode> {
                let upper = s.to_ascii_uppercase();
                match upper.as_str() {
                    $(stringify!($name) => Some(Opcode::$name),)+
                    _ => None,
                }
            }

            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),+];
        }
    };
}

opcodes! {
    NOP = 0, MOV = 1, ADD = 2, ADC = 3, SUB = 4, SBC = 5, AND = 6, OR = 7, EOR = 8,
    LDI = 9, LDIs = 10, ADDI = 11, ADDIs = 12, ADCI = 13, ADCIs = 14, SUBI = 15,
    SUBIs = 16, SBCI = 17, SBCIs = 18, NEG = 19, ANDI = 20, ANDIs = 21, ORI = 22,
    ORIs = 23, EORI = 24, EORIs = 25, NOT = 26, MUL = 27, MULI = 28, MULIs = 29,
    CMP = 30, CPC = 31, CPI = 32, CPIs = 33, CPCI = 34, CPCIs = 35, LSL = 36,
    LSR = 37, ROL = 38, ROR = 39, ASR = 40, SWAP = 41, SWAPN = 42, ST = 43,
    LD = 44, STS = 45, STSs = 46, LDS = 47, LDSs = 48, STD = 49, LDD = 50,
    LPM = 51, BRCS = 52, BREQ = 53, BRMI = 54, BRCC = 55, BRNE = 56, BRPL = 57,
    RCALL = 58, RRET = 59, JMP = 60, JMPs = 61, OUT = 62, OUTs = 63, OUTR = 64,
    IN = 65, INs = 66, INR = 67, BRK = 68, RETI = 69,
}

impl Opcode {
    pub fn flags(self) -> Flags {
        use AluBSel::*;
        use AluCmd::*;
        use Branch::*;
        use ImmExtMode::*;
        let d = Flags::default;
        match self {
            Opcode::NOP => d(),
            Opcode::MOV => Flags {
                src_to_bus: SrcToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ADD => Flags {
                alu_cmd: Add,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ADC => Flags {
                alu_cmd: Adc,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::SUB => Flags {
                alu_cmd: Sub,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::SBC => Flags {
                alu_cmd: Sbc,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::AND => Flags {
                alu_cmd: And,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::OR => Flags {
                alu_cmd: Or,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::EOR => Flags {
                alu_cmd: Xor,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::LDI => Flags {
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::LDIs => Flags {
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::ADDI => Flags {
                alu_cmd: Add,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::ADDIs => Flags {
                alu_cmd: Add,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::ADCI => Flags {
                alu_cmd: Adc,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::ADCIs => Flags {
                alu_cmd: Adc,
                alu_to_bus: AluToBus::Yes,
                str_flags: StoreFlags::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::SUBI => Flags {
                alu_cmd: Sub,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::SUBIs => Flags {
                alu_cmd: Sub,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::SBCI => Flags {
                alu_cmd: Sbc,
                alu_to_bus: AluToBus::Yes,
                str_flags: StoreFlags::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::SBCIs => Flags {
                alu_cmd: Sbc,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::NEG => Flags {
                alu_cmd: Neg,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ANDI => Flags {
                alu_cmd: And,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::ANDIs => Flags {
                alu_cmd: And,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::ORI => Flags {
                alu_cmd: Or,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::ORIs => Flags {
                alu_cmd: Or,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::EORI => Flags {
                alu_cmd: Xor,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::EORIs => Flags {
                alu_cmd: Xor,
                alu_to_bus: AluToBus::Yes,
                str_flags: StoreFlags::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::NOT => Flags {
                alu_cmd: Not,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::MUL => Flags {
                alu_cmd: Mul,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::MULI => Flags {
                alu_cmd: Mul,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::MULIs => Flags {
                alu_cmd: Mul,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::CMP => Flags {
                str_flags: StoreFlags::Yes,
                alu_cmd: Sub,
                ..d()
            },
            Opcode::CPC => Flags {
                str_flags: StoreFlags::Yes,
                alu_cmd: Sbc,
                ..d()
            },
            Opcode::CPI => Flags {
                alu_cmd: Sub,
                str_flags: StoreFlags::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::CPIs => Flags {
                alu_cmd: Sub,
                str_flags: StoreFlags::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::CPCI => Flags {
                alu_cmd: Sbc,
                str_flags: StoreFlags::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::CPCIs => Flags {
                alu_cmd: Sbc,
                str_flags: StoreFlags::Yes,
                alu_b_sel: InstrSource,
                ..d()
            },
            Opcode::LSL => Flags {
                alu_cmd: Lsl,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::LSR => Flags {
                alu_cmd: Lsr,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ROL => Flags {
                alu_cmd: Rol,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ROR => Flags {
                alu_cmd: Ror,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ASR => Flags {
                alu_cmd: Asr,
                str_flags: StoreFlags::Yes,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::SWAP => Flags {
                alu_cmd: Swap,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::SWAPN => Flags {
                alu_cmd: Swapn,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::ST => Flags {
                wr: WriteRam::Yes,
                src_to_bus: SrcToBus::Yes,
                alu_b_sel: Zero,
                alu_cmd: Add,
                ..d()
            },
            Opcode::LD => Flags {
                rr: ReadRam::Yes,
                alu_b_sel: Zero,
                alu_cmd: Add,
                source_to_alu_a: SourceToAluA::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::STS => Flags {
                wr: WriteRam::Yes,
                src_to_bus: SrcToBus::Yes,
                imm_ext_mode: Dest0,
                alu_b_sel: ImReg,
                ..d()
            },
            Opcode::STSs => Flags {
                wr: WriteRam::Yes,
                src_to_bus: SrcToBus::Yes,
                alu_b_sel: InstrDest,
                ..d()
            },
            Opcode::LDS => Flags {
                rr: ReadRam::Yes,
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::LDSs => Flags {
                rr: ReadRam::Yes,
                alu_b_sel: InstrSource,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::STD => Flags {
                wr: WriteRam::Yes,
                src_to_bus: SrcToBus::Yes,
                imm_ext_mode: Extend,
                alu_b_sel: ImReg,
                alu_cmd: Add,
                ..d()
            },
            Opcode::LDD => Flags {
                rr: ReadRam::Yes,
                imm_ext_mode: Extend,
                alu_b_sel: ImReg,
                alu_cmd: Add,
                en_reg_write: EnRegWrite::Yes,
                source_to_alu_a: SourceToAluA::Yes,
                ..d()
            },
            Opcode::LPM => Flags {
                alu_b_sel: Rom,
                alu_cmd: PassInB,
                alu_to_bus: AluToBus::Yes,
                en_reg_write: EnRegWrite::Yes,
                ..d()
            },
            Opcode::BRCS => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brc,
                ..d()
            },
            Opcode::BREQ => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brz,
                ..d()
            },
            Opcode::BRMI => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brn,
                ..d()
            },
            Opcode::BRCC => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brnc,
                ..d()
            },
            Opcode::BRNE => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brnz,
                ..d()
            },
            Opcode::BRPL => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Brnn,
                ..d()
            },
            Opcode::RCALL => Flags {
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                store_pc: StorePc::Yes,
                en_reg_write: EnRegWrite::Yes,
                jmp_abs: JmpAbs::Yes,
                ..d()
            },
            Opcode::RRET => Flags {
                jmp_abs: JmpAbs::Yes,
                ..d()
            },
            Opcode::JMP => Flags {
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                jmp_abs: JmpAbs::Yes,
                ..d()
            },
            Opcode::JMPs => Flags {
                alu_b_sel: InstrSourceAndDest,
                br: Uncond,
                ..d()
            },
            Opcode::OUT => Flags {
                imm_ext_mode: Dest0,
                alu_b_sel: ImReg,
                src_to_bus: SrcToBus::Yes,
                wio: WriteIo::Yes,
                ..d()
            },
            Opcode::OUTs => Flags {
                alu_b_sel: InstrDest,
                src_to_bus: SrcToBus::Yes,
                wio: WriteIo::Yes,
                ..d()
            },
            Opcode::OUTR => Flags {
                alu_cmd: Add,
                alu_b_sel: Zero,
                src_to_bus: SrcToBus::Yes,
                wio: WriteIo::Yes,
                ..d()
            },
            Opcode::IN => Flags {
                imm_ext_mode: Src0,
                alu_b_sel: ImReg,
                en_reg_write: EnRegWrite::Yes,
                source_to_alu_a: SourceToAluA::Yes,
                rio: ReadIo::Yes,
                ..d()
            },
            Opcode::INs => Flags {
                alu_b_sel: InstrSource,
                en_reg_write: EnRegWrite::Yes,
                source_to_alu_a: SourceToAluA::Yes,
                rio: ReadIo::Yes,
                ..d()
            },
            Opcode::INR => Flags {
                alu_b_sel: Zero,
                alu_cmd: Add,
                en_reg_write: EnRegWrite::Yes,
                source_to_alu_a: SourceToAluA::Yes,
                rio: ReadIo::Yes,
                ..d()
            },
            Opcode::BRK => Flags {
                brk: Break::Yes,
                ..d()
            },
            Opcode::RETI => Flags {
                jmp_abs: JmpAbs::Yes,
                ret_i: RetI::Yes,
                ..d()
            },
        }
    }

    pub fn description(self) -> String {
        let base = match self {
            Opcode::NOP => "Does nothing.",
            Opcode::MOV => "Move the content of Rs to register Rd.",
            Opcode::ADD => "Adds the content of register Rs to register Rd without carry.",
            Opcode::ADC => "Adds the content of register Rs to register Rd with carry.",
            Opcode::SUB => "Subtracts the content of register Rs from register Rd without carry.",
            Opcode::SBC => "Subtracts the content of register Rs from register Rd with carry.",
            Opcode::AND => "Stores Rs and Rd in register Rd.",
            Opcode::OR => "Stores Rs or Rd in register Rd.",
            Opcode::EOR => "Stores Rs xor Rd in register Rd.",
            Opcode::LDI | Opcode::LDIs => "Loads Register Rd with the constant value [const].",
            Opcode::ADDI | Opcode::ADDIs => "Adds the constant [const] to register Rd without carry.",
            Opcode::ADCI | Opcode::ADCIs => "Adds the constant [const] to register Rd with carry.",
            Opcode::SUBI | Opcode::SUBIs => "Subtracts a constant [const] from register Rd without carry.",
            Opcode::SBCI | Opcode::SBCIs => "Subtracts a constant [const] from register Rd with carry.",
            Opcode::NEG => "Stores the two's complement of Rd in register Rd.",
            Opcode::ANDI | Opcode::ANDIs => "Stores Rd and [const] in register Rd.",
            Opcode::ORI | Opcode::ORIs => "Stores Rd or [const] in register Rd.",
            Opcode::EORI | Opcode::EORIs => "Stores Rd xor [const] in register Rd.",
            Opcode::NOT => "Stores not Rd in register Rd.",
            Opcode::MUL => "Multiplies the content of register Rs with register Rd and stores result in Rd.",
            Opcode::MULI | Opcode::MULIs => "Multiplies the constant [const] with register Rd and stores result in Rd.",
            Opcode::CMP => "Subtracts the content of register Rs from register Rd without carry, does not store the result.",
            Opcode::CPC => "Subtracts the content of register Rs from register Rd with carry, does not store the result.",
            Opcode::CPI | Opcode::CPIs => "Subtracts a constant [const] from register Rd without carry, does not store the result.",
            Opcode::CPCI | Opcode::CPCIs => "Subtracts a constant [const] from register Rd with carry, does not store the result.",
            Opcode::LSL => "Shifts register Rd by one bit to the left. A zero bit is filled in and the highest bit is moved to the carry bit.",
            Opcode::LSR => "Shifts register Rd by one bit to the right. A zero bit is filled in and the lowest bit is moved to the carry bit.",
            Opcode::ROL => "Shifts register Rd by one bit to the left. The carry bit is filled in and the highest bit is moved to the carry bit.",
            Opcode::ROR => "Shifts register Rd by one bit to the right. The carry bit is filled in and the lowest bit is moved to the carry bit.",
            Opcode::ASR => "Shifts register Rd by one bit to the right. The MSB remains unchanged and the lowest bit is moved to the carry bit.",
            Opcode::SWAP => "Swaps the high and low byte in register Rd.",
            Opcode::SWAPN => "Swaps the high and low nibbles of both bytes in register Rd.",
            Opcode::ST => "Stores the content of register Rs to the memory at the address [Rd].",
            Opcode::LD => "Loads the value at memory address [Rs] to register Rd.",
            Opcode::STS | Opcode::STSs => "Stores the content of register Rs to memory at the location given by [const].",
            Opcode::LDS | Opcode::LDSs => "Loads the memory value at the location given by [const] to register Rd.",
            Opcode::STD => "Stores the content of register Rs to the memory at the address (Rd+[const]).",
            Opcode::LDD => "Loads the value at memory address (Rs+[const]) to register Rd.",
            Opcode::LPM => "Loads the value at program address [Rs] to register Rd.",
            Opcode::BRCS => "Jumps to the address given by [const] if carry flag is set.",
            Opcode::BREQ => "Jumps to the address given by [const] if zero flag is set.",
            Opcode::BRMI => "Jumps to the address given by [const] if negative flag is set.",
            Opcode::BRCC => "Jumps to the address given by [const] if carry flag is clear.",
            Opcode::BRNE => "Jumps to the address given by [const] if zero flag is clear.",
            Opcode::BRPL => "Jumps to the address given by [const] if negative flag is clear.",
            Opcode::RCALL => "Jumps to the address given by [const], the return address is stored in register Rd.",
            Opcode::RRET => "Jumps to the address given by register Rs.",
            Opcode::JMP | Opcode::JMPs => "Jumps to the address given by [const].",
            Opcode::OUT | Opcode::OUTs => "Writes the content of register Rs to io location given by [const].",
            Opcode::OUTR => "Writes the content of register Rs to the io location [Rd].",
            Opcode::IN | Opcode::INs => "Reads the io location given by [const] and stores it in register Rd.",
            Opcode::INR => "Reads the io location given by (Rs) and stores it in register Rd.",
            Opcode::BRK => "Stops execution by stopping the simulator.",
            Opcode::RETI => "Return from Interrupt.",
        };
        match self.flags().alu_b_sel {
            AluBSel::InstrDest | AluBSel::InstrSource => format!("{base} (0<=[const]<=15)"),
            AluBSel::InstrSourceAndDest => format!("{base} (-128<=[const]<=127)"),
            _ => base.to_string(),
        }
    }

    pub fn create_control_word(self) -> u64 {
        self.flags().control_word()
    }

    /// The short-form counterpart of a long-form immediate opcode, if any.
    pub fn short_form(self) -> Option<Opcode> {
        Some(match self {
            Opcode::LDI => Opcode::LDIs,
            Opcode::ADDI => Opcode::ADDIs,
            Opcode::ADCI => Opcode::ADCIs,
            Opcode::SUBI => Opcode::SUBIs,
            Opcode::SBCI => Opcode::SBCIs,
            Opcode::ANDI => Opcode::ANDIs,
            Opcode::ORI => Opcode::ORIs,
            Opcode::EORI => Opcode::EORIs,
            Opcode::CPI => Opcode::CPIs,
            Opcode::CPCI => Opcode::CPCIs,
            Opcode::MULI => Opcode::MULIs,
            Opcode::LDS => Opcode::LDSs,
            Opcode::STS => Opcode::STSs,
            Opcode::IN => Opcode::INs,
            Opcode::OUT => Opcode::OUTs,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_word_width_is_constant_across_opcodes() {
        // rr(1)+wr(1)+br(3)+alu_b_sel(3)+imm_ext_mode(2)+alu_to_bus(1)+src_to_bus(1)
        // +alu_cmd(5)+en_reg_write(1)+store_pc(1)+source_to_alu_a(1)+jmp_abs(1)
        // +ret_i(1)+wio(1)+rio(1)+brk(1)+str_flags(1) = 26 bits, so every
        // control word fits comfortably under 1<<26.
        for &op in Opcode::ALL {
            assert!(op.create_control_word() < (1u64 << 26));
        }
    }

    #[test]
    fn nop_control_word_is_zero() {
        assert_eq!(Opcode::NOP.create_control_word(), 0);
    }

    #[test]
    fn mov_control_word_matches_reference_dump() {
        assert_eq!(Opcode::MOV.create_control_word(), 0x208);
    }

    #[test]
    fn reti_control_word_matches_reference_dump() {
        assert_eq!(Opcode::RETI.create_control_word(), 0x2100000);
    }

    #[test]
    fn parse_str_is_case_insensitive() {
        assert_eq!(Opcode::parse_str("jmps"), Some(Opcode::JMPs));
        assert_eq!(Opcode::parse_str("Jmp"), Some(Opcode::JMP));
        assert_eq!(Opcode::parse_str("nonsense"), None);
    }

    #[test]
    fn short_form_pairs_are_consistent() {
        assert_eq!(Opcode::LDI.short_form(), Some(Opcode::LDIs));
        assert_eq!(Opcode::JMP.short_form(), None); // JMP/JMPs handled separately (branch offset, not short const)
        assert_eq!(Opcode::MOV.short_form(), None);
    }

    #[test]
    fn at_most_one_bus_driver_per_opcode() {
        for &op in Opcode::ALL {
            let f = op.flags();
            let drivers = [
                f.src_to_bus == SrcToBus::Yes,
                f.alu_to_bus == AluToBus::Yes,
                f.rr == ReadRam::Yes,
                f.rio == ReadIo::Yes,
                f.store_pc == StorePc::Yes,
            ]
            .iter()
            .filter(|&&b| b)
            .count();
            assert!(drivers <= 1, "{op:?} drives the bus from {drivers} sources");
        }
    }
}
