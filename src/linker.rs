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

//! The address/short-form/jump-optimize convergence loop (§4.8).

use crate::errors::AssemblyError;
use crate::expr::Context;
use crate::instruction::ProgramItem;
use crate::opcode::Opcode;
use crate::program::Program;

/// Seeds `_ADDR_`/`_NEXT_ADDR_`/`_SKIP_ADDR_`/`_SKIP2_ADDR_` relative to
/// `items[idx]`, using each neighbor's already-resolved address-pass size.
/// These are single mutable slots on `Context`, valid only for the duration
/// of evaluating this one instruction's constant.
fn seed_context(context: &mut Context, items: &[ProgramItem], idx: usize) {
    let addr = items[idx].address();
    context.set_instr_addr(addr);
    let next_addr = addr + items[idx].size();
    context.set_identifier(Context::NEXT_ADDR, next_addr);
    let skip_addr = next_addr + items.get(idx + 1).map(|i| i.size()).unwrap_or(0);
    context.set_identifier(Context::SKIP_ADDR, skip_addr);
    let skip2_addr = skip_addr + items.get(idx + 2).map(|i| i.size()).unwrap_or(0);
    context.set_identifier(Context::SKIP2_ADDR, skip2_addr);
}

/// Walks instructions in order, applying explicit origins, assigning
/// addresses, and registering labels. `silent` selects `set_identifier`
/// (fixed-point re-runs) over `add_identifier` (the first pass, which must
/// still catch a genuine case-insensitive label clash).
fn address_pass(program: &mut Program, silent: bool) -> Result<(), AssemblyError> {
    let mut cursor: i64 = 0;
    let mut prev_addr: i64 = 0;
    for item in program.items.iter_mut() {
        if let Some(origin) = item.origin() {
            if origin < cursor && origin != prev_addr {
                return Err(AssemblyError::semantic(
                    item.line(),
                    "'.org' may not move the address backward",
                ));
            }
            cursor = origin;
        }
        item.set_address(cursor);
        if let Some(label) = item.label() {
            if silent {
                program.context.set_identifier(label, cursor);
            } else {
                program.context.add_identifier(label, cursor)?;
            }
        }
        prev_addr = cursor;
        cursor += item.size();
    }
    Ok(())
}

/// Swaps any long-immediate opcode with a short counterpart whose constant
/// resolves and fits 0..=15. Runs once: since it never grows an instruction,
/// a single pass already reaches this rewrite's fixed point.
fn short_form_pass(program: &mut Program) -> Result<(), AssemblyError> {
    for idx in 0..program.items.len() {
        let (opcode, constant) = match &program.items[idx] {
            ProgramItem::Instruction(instr) => (instr.opcode, instr.constant.clone()),
            ProgramItem::Data(_) => continue,
        };
        let Some(short) = opcode.short_form() else { continue };
        let Some(constant) = constant else { continue };

        seed_context(&mut program.context, &program.items, idx);
        if let Ok(value) = constant.get_value(&program.context) {
            if (0..=15).contains(&value) {
                if let ProgramItem::Instruction(instr) = &mut program.items[idx] {
                    instr.opcode = short;
                }
            }
        }
    }
    Ok(())
}

/// Scans for `JMP` whose target resolves to a signed-8-bit-offset branch and
/// swaps it to `JMPs`. Returns whether anything changed this pass.
fn jump_pass(program: &mut Program) -> bool {
    let mut changed = false;
    for idx in 0..program.items.len() {
        let (opcode, constant, addr) = match &program.items[idx] {
            ProgramItem::Instruction(instr) => (instr.opcode, instr.constant.clone(), instr.address),
            ProgramItem::Data(_) => continue,
        };
        if opcode != Opcode::JMP {
            continue;
        }
        let Some(constant) = constant else { continue };

        seed_context(&mut program.context, &program.items, idx);
        if let Ok(target) = constant.get_value(&program.context) {
            let offset = target - addr - 1;
            if (-128..=127).contains(&offset) {
                if let ProgramItem::Instruction(instr) = &mut program.items[idx] {
                    instr.opcode = Opcode::JMPs;
                }
                changed = true;
            }
        }
    }
    changed
}

/// Runs the full convergence sequence from §4.8: address-pass, short-form
/// pass, then the fixed-point jump-optimize loop, then a final address-pass
/// so every label in `Context` holds its terminal value before emission.
pub fn optimize_and_link(program: &mut Program) -> Result<(), AssemblyError> {
    address_pass(program, false)?;
    short_form_pass(program)?;
    loop {
        address_pass(program, true)?;
        if !jump_pass(program) {
            break;
        }
    }
    address_pass(program, true)?;
    Ok(())
}

/// Sets up `Context` relative to `items[idx]` for evaluating that single
/// instruction's constant during emission (listing/hex output walk items in
/// address order, one at a time).
pub fn seed_context_for_emit(context: &mut Context, items: &[ProgramItem], idx: usize) {
    seed_context(context, items, idx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Expression;
    use crate::instruction::InstructionBuilder;
    use crate::register::Register;

    fn push(program: &mut Program, opcode: Opcode, label: Option<&str>, dest: Option<Register>, constant: Option<Expression>) {
        if let Some(l) = label {
            program.set_pending_label(l.to_string(), 1).unwrap();
        }
        let mut b = InstructionBuilder::new(opcode, 1);
        if let Some(d) = dest {
            b.set_dest(d).unwrap();
        }
        if let Some(c) = constant {
            b.set_constant(c).unwrap();
        }
        program.push_instruction(b.build());
    }

    #[test]
    fn self_jump_optimizes_to_short_form() {
        let mut program = Program::new();
        push(&mut program, Opcode::JMP, Some("end"), None, Some(Expression::identifier("end")));
        optimize_and_link(&mut program).unwrap();
        let ProgramItem::Instruction(instr) = &program.items[0] else { panic!() };
        assert_eq!(instr.opcode, Opcode::JMPs);
    }

    #[test]
    fn short_immediate_swap_applies_when_constant_fits() {
        let mut program = Program::new();
        push(&mut program, Opcode::ADDI, None, Some(Register::R0), Some(Expression::constant(3)));
        optimize_and_link(&mut program).unwrap();
        let ProgramItem::Instruction(instr) = &program.items[0] else { panic!() };
        assert_eq!(instr.opcode, Opcode::ADDIs);
    }

    #[test]
    fn short_immediate_swap_skipped_when_constant_too_large() {
        let mut program = Program::new();
        push(&mut program, Opcode::ADDI, None, Some(Register::R0), Some(Expression::constant(1000)));
        optimize_and_link(&mut program).unwrap();
        let ProgramItem::Instruction(instr) = &program.items[0] else { panic!() };
        assert_eq!(instr.opcode, Opcode::ADDI);
    }

    #[test]
    fn case_insensitive_label_clash_is_rejected_at_link_time() {
        let mut program = Program::new();
        push(&mut program, Opcode::MOV, Some("L1"), Some(Register::R0), None);
        if let ProgramItem::Instruction(instr) = program.items.last_mut().unwrap() {
            instr.source = Some(Register::R1);
        }
        push(&mut program, Opcode::MOV, Some("l1"), Some(Register::R0), None);
        if let ProgramItem::Instruction(instr) = program.items.last_mut().unwrap() {
            instr.source = Some(Register::R1);
        }
        assert!(optimize_and_link(&mut program).is_err());
    }

    #[test]
    fn addresses_advance_monotonically_with_instruction_size() {
        let mut program = Program::new();
        push(&mut program, Opcode::NOP, None, None, None);
        push(&mut program, Opcode::LDI, None, Some(Register::R0), Some(Expression::constant(0x1234)));
        push(&mut program, Opcode::NOP, None, None, None);
        optimize_and_link(&mut program).unwrap();
        assert_eq!(program.items[0].address(), 0);
        assert_eq!(program.items[1].address(), 1);
        assert_eq!(program.items[2].address(), 3); // LDI occupies 2 words
    }
}
