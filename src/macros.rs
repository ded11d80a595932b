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

//! Pseudo-instruction macros (§4.6): each expands at parse time into a short
//! sequence of real instructions, every one tagged with the macro's
//! description string. Stack convention: SP points at the top-of-stack cell;
//! push decrements then stores, pop loads then increments.

use crate::expr::{Context, Expression, Operation};
use crate::instruction::InstructionBuilder;
use crate::opcode::Opcode;
use crate::program::Program;
use crate::register::Register;

fn emit(program: &mut Program, desc: &str, line: usize, builder: InstructionBuilder) {
    // Errors can't occur this late: the macro controls its own operand
    // shapes entirely, so `set_pending_macro_description` only fails on a
    // double-occupied slot, which never happens here (one push per call).
    program
        .set_pending_macro_description(desc.to_string(), line)
        .ok();
    program.push_instruction(builder.build());
}

pub fn inc(program: &mut Program, rd: Register, line: usize) {
    let mut b = InstructionBuilder::new(Opcode::ADDIs, line);
    b.set_dest(rd).unwrap();
    b.set_constant(Expression::constant(1)).unwrap();
    emit(program, "INC Rd", line, b);
}

pub fn dec(program: &mut Program, rd: Register, line: usize) {
    let mut b = InstructionBuilder::new(Opcode::SUBIs, line);
    b.set_dest(rd).unwrap();
    b.set_constant(Expression::constant(1)).unwrap();
    emit(program, "DEC Rd", line, b);
}

pub fn push(program: &mut Program, rs: Register, line: usize) {
    let mut dec_sp = InstructionBuilder::new(Opcode::SUBIs, line);
    dec_sp.set_dest(Register::SP).unwrap();
    dec_sp.set_constant(Expression::constant(1)).unwrap();
    emit(program, "PUSH Rs", line, dec_sp);

    let mut store = InstructionBuilder::new(Opcode::ST, line);
    store.set_dest(Register::SP).unwrap();
    store.set_source(rs).unwrap();
    emit(program, "PUSH Rs", line, store);
}

pub fn pop(program: &mut Program, rd: Register, line: usize) {
    let mut load = InstructionBuilder::new(Opcode::LD, line);
    load.set_dest(rd).unwrap();
    load.set_source(Register::SP).unwrap();
    emit(program, "POP Rd", line, load);

    let mut inc_sp = InstructionBuilder::new(Opcode::ADDIs, line);
    inc_sp.set_dest(Register::SP).unwrap();
    inc_sp.set_constant(Expression::constant(1)).unwrap();
    emit(program, "POP Rd", line, inc_sp);
}

/// `CALL target`: pushes a return address 3 instructions past the `LDI`
/// (accounting for `ST` and `JMP`), computed via `_SKIP2_ADDR_`.
pub fn call(program: &mut Program, target: Expression, line: usize) {
    let mut dec_sp = InstructionBuilder::new(Opcode::SUBIs, line);
    dec_sp.set_dest(Register::SP).unwrap();
    dec_sp.set_constant(Expression::constant(1)).unwrap();
    emit(program, "CALL target", line, dec_sp);

    let mut load_ra = InstructionBuilder::new(Opcode::LDI, line);
    load_ra.set_dest(Register::RA).unwrap();
    load_ra
        .set_constant(Expression::identifier(Context::SKIP2_ADDR))
        .unwrap();
    emit(program, "CALL target", line, load_ra);

    let mut store = InstructionBuilder::new(Opcode::ST, line);
    store.set_dest(Register::SP).unwrap();
    store.set_source(Register::RA).unwrap();
    emit(program, "CALL target", line, store);

    let mut jmp = InstructionBuilder::new(Opcode::JMP, line);
    jmp.set_constant(target).unwrap();
    emit(program, "CALL target", line, jmp);
}

pub fn scall(program: &mut Program, target: Expression, line: usize) {
    push(program, Register::RA, line);

    let mut rcall = InstructionBuilder::new(Opcode::RCALL, line);
    rcall.set_dest(Register::RA).unwrap();
    rcall.set_constant(target).unwrap();
    emit(program, "_SCALL target", line, rcall);

    pop(program, Register::RA, line);
}

pub fn ret(program: &mut Program, line: usize) {
    pop(program, Register::RA, line);

    let mut rret = InstructionBuilder::new(Opcode::RRET, line);
    rret.set_source(Register::RA).unwrap();
    emit(program, "RET", line, rret);
}

pub fn ret_n(program: &mut Program, n: Expression, line: usize) {
    let mut load = InstructionBuilder::new(Opcode::LD, line);
    load.set_dest(Register::RA).unwrap();
    load.set_source(Register::SP).unwrap();
    emit(program, "RET N", line, load);

    let mut adj = InstructionBuilder::new(Opcode::ADDI, line);
    adj.set_dest(Register::SP).unwrap();
    adj.set_constant(n.binary(Operation::Add, Expression::constant(1)))
        .unwrap();
    emit(program, "RET N", line, adj);

    let mut rret = InstructionBuilder::new(Opcode::RRET, line);
    rret.set_source(Register::RA).unwrap();
    emit(program, "RET N", line, rret);
}

pub fn enter(program: &mut Program, n: Expression, line: usize) {
    push(program, Register::BP, line);

    let mut mov = InstructionBuilder::new(Opcode::MOV, line);
    mov.set_dest(Register::BP).unwrap();
    mov.set_source(Register::SP).unwrap();
    emit(program, "ENTER N", line, mov);

    if n != Expression::constant(0) {
        let mut sub = InstructionBuilder::new(Opcode::SUBI, line);
        sub.set_dest(Register::SP).unwrap();
        sub.set_constant(n).unwrap();
        emit(program, "ENTER N", line, sub);
    }
}

pub fn leave(program: &mut Program, line: usize) {
    let mut mov = InstructionBuilder::new(Opcode::MOV, line);
    mov.set_dest(Register::SP).unwrap();
    mov.set_source(Register::BP).unwrap();
    emit(program, "LEAVE", line, mov);

    pop(program, Register::BP, line);
}

fn std_indexed(program: &mut Program, rd: Register, offset: i64, rs: Register, line: usize, desc: &str) {
    let mut b = InstructionBuilder::new(Opcode::STD, line);
    b.set_dest(rd).unwrap();
    b.set_source(rs).unwrap();
    b.set_constant(Expression::constant(offset)).unwrap();
    emit(program, desc, line, b);
}

fn ldd_indexed(program: &mut Program, rd: Register, rs: Register, offset: i64, line: usize, desc: &str) {
    let mut b = InstructionBuilder::new(Opcode::LDD, line);
    b.set_dest(rd).unwrap();
    b.set_source(rs).unwrap();
    b.set_constant(Expression::constant(offset)).unwrap();
    emit(program, desc, line, b);
}

pub fn enteri(program: &mut Program, line: usize) {
    std_indexed(program, Register::SP, -1, Register::R0, line, "ENTERI");

    let mut inp = InstructionBuilder::new(Opcode::IN, line);
    inp.set_dest(Register::R0).unwrap();
    inp.set_constant(Expression::constant(0)).unwrap();
    emit(program, "ENTERI", line, inp);

    std_indexed(program, Register::SP, -2, Register::R0, line, "ENTERI");

    let mut sub = InstructionBuilder::new(Opcode::SUBIs, line);
    sub.set_dest(Register::SP).unwrap();
    sub.set_constant(Expression::constant(2)).unwrap();
    emit(program, "ENTERI", line, sub);
}

pub fn leavei(program: &mut Program, line: usize) {
    let mut add = InstructionBuilder::new(Opcode::ADDIs, line);
    add.set_dest(Register::SP).unwrap();
    add.set_constant(Expression::constant(2)).unwrap();
    emit(program, "LEAVEI", line, add);

    ldd_indexed(program, Register::R0, Register::SP, -2, line, "LEAVEI");

    let mut out = InstructionBuilder::new(Opcode::OUT, line);
    out.set_source(Register::R0).unwrap();
    out.set_constant(Expression::constant(0)).unwrap();
    emit(program, "LEAVEI", line, out);

    ldd_indexed(program, Register::R0, Register::SP, -1, line, "LEAVEI");
}

/// The set of recognized macro mnemonics, for the parser's dispatch table.
pub const MACRO_NAMES: &[&str] = &[
    "INC", "DEC", "PUSH", "POP", "CALL", "_SCALL", "RET", "ENTER", "LEAVE", "ENTERI", "LEAVEI",
];

pub fn is_macro(name: &str) -> bool {
    MACRO_NAMES.iter().any(|m| m.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ProgramItem;

    fn opcodes(program: &Program) -> Vec<Opcode> {
        program
            .items
            .iter()
            .map(|item| match item {
                ProgramItem::Instruction(i) => i.opcode,
                ProgramItem::Data(_) => panic!("macro expansion should never emit a data word"),
            })
            .collect()
    }

    #[test]
    fn push_expands_to_decrement_then_store() {
        let mut p = Program::new();
        push(&mut p, Register::R3, 1);
        assert_eq!(opcodes(&p), vec![Opcode::SUBIs, Opcode::ST]);
        let ProgramItem::Instruction(store) = &p.items[1] else {
            unreachable!()
        };
        assert_eq!(store.dest, Some(Register::SP));
        assert_eq!(store.source, Some(Register::R3));
        assert_eq!(store.macro_description.as_deref(), Some("PUSH Rs"));
    }

    #[test]
    fn pop_expands_to_load_then_increment() {
        let mut p = Program::new();
        pop(&mut p, Register::R5, 1);
        assert_eq!(opcodes(&p), vec![Opcode::LD, Opcode::ADDIs]);
    }

    #[test]
    fn call_expands_to_four_instructions_with_skip2_addr() {
        let mut p = Program::new();
        call(&mut p, Expression::identifier("target"), 1);
        assert_eq!(
            opcodes(&p),
            vec![Opcode::SUBIs, Opcode::LDI, Opcode::ST, Opcode::JMP]
        );
        let ProgramItem::Instruction(ldi) = &p.items[1] else {
            unreachable!()
        };
        assert_eq!(
            ldi.constant,
            Some(Expression::identifier(Context::SKIP2_ADDR))
        );
    }

    #[test]
    fn scall_expands_push_rcall_pop() {
        let mut p = Program::new();
        scall(&mut p, Expression::identifier("target"), 1);
        assert_eq!(
            opcodes(&p),
            vec![Opcode::SUBIs, Opcode::ST, Opcode::RCALL, Opcode::LD, Opcode::ADDIs]
        );
    }

    #[test]
    fn ret_expands_to_pop_ra_then_rret() {
        let mut p = Program::new();
        ret(&mut p, 1);
        assert_eq!(opcodes(&p), vec![Opcode::LD, Opcode::ADDIs, Opcode::RRET]);
    }

    #[test]
    fn enter_with_literal_zero_omits_the_sub() {
        let mut p = Program::new();
        enter(&mut p, Expression::constant(0), 1);
        assert_eq!(opcodes(&p), vec![Opcode::SUBIs, Opcode::ST, Opcode::MOV]);
    }

    #[test]
    fn enter_with_nonzero_frame_size_keeps_the_sub() {
        let mut p = Program::new();
        enter(&mut p, Expression::constant(8), 1);
        assert_eq!(
            opcodes(&p),
            vec![Opcode::SUBIs, Opcode::ST, Opcode::MOV, Opcode::SUBI]
        );
    }

    #[test]
    fn enteri_saves_r0_and_the_flags_register() {
        let mut p = Program::new();
        enteri(&mut p, 1);
        assert_eq!(
            opcodes(&p),
            vec![Opcode::STD, Opcode::IN, Opcode::STD, Opcode::SUBIs]
        );
    }

    #[test]
    fn leavei_restores_in_reverse_order() {
        let mut p = Program::new();
        leavei(&mut p, 1);
        assert_eq!(
            opcodes(&p),
            vec![Opcode::ADDIs, Opcode::LDD, Opcode::OUT, Opcode::LDD]
        );
    }

    #[test]
    fn macro_names_are_recognized_case_insensitively() {
        assert!(is_macro("push"));
        assert!(is_macro("Enter"));
        assert!(!is_macro("MOV"));
    }
}
