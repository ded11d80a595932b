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

//! Black-box tests driven entirely through the public `assemble(...)` entry
//! point and the `emit` artifact generators, using `MockFileReader` so no
//! real files are touched. Covers the scenarios enumerated in the design
//! ledger's testable-properties section.

use cicasm::emit;
use cicasm::errors::AssemblyError;
use cicasm::file_reader::MockFileReader;
use std::path::Path;

fn assemble_str(src: &str) -> Result<cicasm::program::Program, AssemblyError> {
    let mut reader = MockFileReader::default();
    reader.add_file("/main.asm", src);
    cicasm::assemble(Path::new("/main.asm"), &reader).map_err(|e| e.downcast::<AssemblyError>().unwrap())
}

fn hex_of(src: &str) -> String {
    let mut program = assemble_str(src).expect("assembly should succeed");
    emit::hex::emit(&mut program).expect("emission should succeed")
}

/// Range/fit validation (branch offsets, short-constant width) happens in
/// `Instruction::encode`, which only runs during emission, not linking — so
/// these errors only surface once something actually emits the program.
fn emit_err(src: &str) -> AssemblyError {
    let mut program = assemble_str(src).expect("assembly should succeed");
    emit::hex::emit(&mut program).expect_err("emission should fail")
}

#[test]
fn simple_move_encodes_to_the_documented_word() {
    let out = hex_of("MOV R0,R1");
    assert_eq!(out, "v2.0 raw\n110\n");
}

#[test]
fn self_jump_optimizes_to_the_short_form() {
    let mut program = assemble_str("end: jmp end").unwrap();
    let cicasm::instruction::ProgramItem::Instruction(instr) = &program.items[0] else {
        panic!("expected an instruction");
    };
    assert_eq!(instr.opcode, cicasm::opcode::Opcode::JMPs);
    let out = emit::hex::emit(&mut program).unwrap();
    assert_eq!(out.lines().count(), 2); // header + one word
}

#[test]
fn control_word_dump_matches_the_reference_sequence_prefix_and_suffix() {
    let out = emit::control_words::emit();
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("v2.0 raw"));
    let expected_prefix = ["0", "208", "e10", "f10", "e20", "f20", "e30", "e40", "e50", "2a02", "a05"];
    for expected in expected_prefix {
        assert_eq!(lines.next(), Some(expected));
    }
    assert!(out.trim_end().ends_with("2100000"));
}

#[test]
fn short_constant_out_of_range_is_rejected() {
    let err = emit_err("LDSs R0, 16");
    assert!(matches!(err, AssemblyError::SemanticError { .. }));
    assert!(err.to_string().contains("short constant too large"));
}

#[test]
fn short_constant_at_the_boundary_succeeds() {
    hex_of("LDSs R0, 15");
}

#[test]
fn branch_range_succeeds_at_the_positive_boundary() {
    // Instruction at address 1000 branching to 1128 has offset 127, the max.
    let src = ".org 1000\nJMPs target\n.org 1128\ntarget: NOP\n";
    hex_of(src);
}

#[test]
fn branch_range_fails_just_past_the_positive_boundary() {
    let src = ".org 1000\nJMPs target\n.org 1129\ntarget: NOP\n";
    let err = emit_err(src);
    assert!(err.to_string().contains("branch target out of range"));
}

#[test]
fn branch_range_succeeds_at_the_negative_boundary() {
    // offset = target - addr - 1 = -128 requires target = addr - 127.
    let src = "target: NOP\n.org 873\nJMPs target\n";
    hex_of(src);
}

#[test]
fn branch_range_fails_just_past_the_negative_boundary() {
    let src = "target: NOP\n.org 872\nJMPs target\n";
    let err = emit_err(src);
    assert!(err.to_string().contains("branch target out of range"));
}

#[test]
fn case_insensitive_label_clash_is_rejected() {
    let src = "L1: mov r0,r1\nl1: mov r0,r1\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("label"));
}

#[test]
fn case_insensitive_labels_at_the_same_address_are_fine() {
    // Two labels at the *same* address (via `.org` repeating it), differently
    // cased, bind the same value twice rather than clashing.
    let src = "here: NOP\n.org 0\nHERE: NOP\n";
    assemble_str(src).unwrap();
}

#[test]
fn von_neumann_data_emits_string_bytes_then_the_ldi_encoding() {
    let out = hex_of(".dorg 0x8000\n.data text \"AA\",0\nLDI R0,text\n");
    let mut lines = out.lines();
    assert_eq!(lines.next(), Some("v2.0 raw"));
    let body: Vec<&str> = lines.collect();
    // 0x8000 words of zero-fill precede the `.data`; the two `"AA"` bytes
    // and the explicit `0` land at 0x8000..0x8002, then the two-word LDI
    // encoding (constant word first, per §4.4, then the opcode word).
    let tail = &body[body.len() - 5..];
    assert_eq!(tail[0], "41");
    assert_eq!(tail[1], "41");
    assert_eq!(tail[2], "0");
    assert_eq!(tail[3], "8000"); // (text & 0x7FFF) | 0x8000, text == 0x8000
    assert_eq!(tail[4], "901"); // (LDI<<8) | (R0<<4) | const_bit(1)
}

#[test]
fn ret_n_macro_expands_and_short_optimizes_the_middle_instruction() {
    let mut program = assemble_str("RET 2").unwrap();
    use cicasm::instruction::ProgramItem;
    use cicasm::opcode::Opcode;
    let opcodes: Vec<Opcode> = program
        .items
        .iter()
        .map(|i| match i {
            ProgramItem::Instruction(instr) => instr.opcode,
            ProgramItem::Data(_) => panic!("macro expansion never emits data"),
        })
        .collect();
    assert_eq!(opcodes, vec![Opcode::LD, Opcode::ADDIs, Opcode::RRET]);
    let ProgramItem::Instruction(adj) = &program.items[1] else {
        unreachable!()
    };
    assert_eq!(adj.constant.as_ref().unwrap().get_value(&program.context).unwrap(), 3);
    emit::hex::emit(&mut program).unwrap();
}

#[test]
fn include_cycle_is_detected_rather_than_recursing_forever() {
    let mut reader = MockFileReader::default();
    reader.add_file("/a.asm", ".include \"/b.asm\"\nNOP\n");
    reader.add_file("/b.asm", ".include \"/a.asm\"\nNOP\n");
    let err = cicasm::assemble(Path::new("/a.asm"), &reader).unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("cycle") || err.chain().any(|c| c.to_string().contains("cycle")));
}

#[test]
fn include_pulls_in_a_second_file_relative_to_the_including_directory() {
    let mut reader = MockFileReader::default();
    reader.add_file("/dir/main.asm", ".include \"helper.asm\"\nMOV R0,R1\n");
    reader.add_file("/dir/helper.asm", "NOP\n");
    let mut program = cicasm::assemble(Path::new("/dir/main.asm"), &reader).unwrap();
    assert_eq!(program.items.len(), 2);
    let out = emit::hex::emit(&mut program).unwrap();
    assert_eq!(out, "v2.0 raw\n0\n110\n");
}

#[test]
fn reg_alias_resolves_to_the_underlying_register_in_encoding() {
    let out = hex_of(".reg scratch R7\nMOV scratch,R0");
    // MOV Rd=R7, Rs=R0 -> (op<<8)|(rs<<4)|rd = 0x100 | 0x00 | 0x07
    assert_eq!(out, "v2.0 raw\n107\n");
}

#[test]
fn const_directive_binds_an_identifier_usable_in_later_expressions() {
    let out = hex_of(".const N 5\nLDIs R0,N");
    // LDIs Rd=R0 const=5: (op<<8)|(rd<<4)|(c&0xF) = 0xa00 | 0 | 5
    assert_eq!(out, "v2.0 raw\na05\n");
}

#[test]
fn org_may_not_move_the_address_backward() {
    let src = ".org 10\nNOP\n.org 5\nNOP\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().contains("backward"));
}

#[test]
fn org_may_repeat_the_last_used_address_to_attach_a_label() {
    let src = ".org 10\nhere: NOP\n.org 10\nthere: NOP\n";
    assemble_str(src).unwrap();
}

#[test]
fn word_directive_is_rejected_after_dorg_switches_to_von_neumann_mode() {
    let src = ".dorg 0x8000\n.word buf\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().contains("Von-Neumann") || err.to_string().contains("dorg"));
}

#[test]
fn dorg_is_rejected_once_ram_has_already_been_allocated() {
    let src = ".word buf\n.dorg 0x8000\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().contains("dorg") || err.to_string().contains("allocated"));
}

#[test]
fn division_by_zero_in_a_constant_expression_is_an_error() {
    let src = ".const N 1/0\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("division"));
}

#[test]
fn unresolved_identifier_surfaces_a_not_found_error() {
    let src = "LDI R0,missing_label\n";
    let err = assemble_str(src).unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[test]
fn push_pop_macros_round_trip_through_the_stack() {
    let mut program = assemble_str("PUSH R3\nPOP R4\n").unwrap();
    use cicasm::instruction::ProgramItem;
    use cicasm::opcode::Opcode;
    let opcodes: Vec<Opcode> = program
        .items
        .iter()
        .map(|i| match i {
            ProgramItem::Instruction(instr) => instr.opcode,
            ProgramItem::Data(_) => unreachable!(),
        })
        .collect();
    assert_eq!(opcodes, vec![Opcode::SUBIs, Opcode::ST, Opcode::LD, Opcode::ADDIs]);
    emit::hex::emit(&mut program).unwrap();
}

#[test]
fn enter_and_leave_bracket_a_stack_frame() {
    let mut program = assemble_str("ENTER 4\nLEAVE\n").unwrap();
    emit::hex::emit(&mut program).unwrap();
    assert_eq!(program.items.len(), 6); // PUSH(2)+MOV+SUB, then MOV+POP(2)
}

#[test]
fn call_macro_uses_skip2_addr_for_the_return_address() {
    let src = "start: CALL target\ntarget: NOP\n";
    let mut program = assemble_str(src).unwrap();
    // CALL expands to 4 instructions (SUBIs, LDI, ST, JMP); the return
    // address loaded into RA must be the address right after the JMP.
    let jmp_addr = program.items[3].address();
    let expected_return = jmp_addr + program.items[3].size();
    use cicasm::instruction::ProgramItem;
    let ProgramItem::Instruction(load_ra) = &program.items[1] else {
        unreachable!()
    };
    let constant = load_ra.constant.clone().unwrap();
    cicasm::linker::seed_context_for_emit(&mut program.context, &program.items, 1);
    assert_eq!(constant.get_value(&program.context).unwrap(), expected_return);
    emit::hex::emit(&mut program).unwrap();
}

#[test]
fn listing_emitter_reports_address_words_label_and_mnemonic() {
    let mut program = assemble_str("start: MOV R0,R1 ; hello\n").unwrap();
    let out = emit::listing::emit(&mut program).unwrap();
    assert!(out.contains("start"));
    assert!(out.contains("MOV"));
    assert!(out.contains("R0,R1"));
    assert!(out.contains("hello"));
}

#[test]
fn map_emitter_produces_address_sorted_json_entries() {
    let mut program = assemble_str("NOP\nNOP\nNOP\n").unwrap();
    let json = emit::map::emit(&program).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let arr = parsed.as_array().unwrap();
    assert_eq!(arr.len(), 3);
    assert_eq!(arr[0]["addr"], 0);
    assert_eq!(arr[1]["addr"], 1);
    assert_eq!(arr[2]["addr"], 2);
}

#[test]
fn two_labels_on_the_same_line_is_a_structural_error() {
    let src = "a: b: NOP\n";
    let err = assemble_str(src).unwrap_err();
    assert!(matches!(err, AssemblyError::StructuralError { .. }));
    assert!(err.to_string().contains("two labels"));
}

#[test]
fn unknown_mnemonic_is_rejected_with_a_line_number() {
    let err = assemble_str("FROBNICATE R0\n").unwrap_err();
    assert_eq!(err.line(), Some(1));
}

#[test]
fn long_form_is_used_when_the_short_form_constant_would_not_fit() {
    let out = hex_of("ADDI R0,1000");
    // Constant word first, then opcode word; opcode ADDI = 11 = 0x0B.
    assert_eq!(out, "v2.0 raw\n83e8\nb00\n");
}

#[test]
fn mixed_program_with_labels_directives_and_a_macro_assembles_end_to_end() {
    let src = "\
.const STACK_TOP 0x1000
.reg scratch R5
start:
    LDI SP, STACK_TOP
    PUSH scratch
loop:
    INC scratch
    JMP loop
";
    let mut program = assemble_str(src).unwrap();
    assert!(program.items.len() >= 5);
    let out = emit::hex::emit(&mut program).unwrap();
    assert!(out.starts_with("v2.0 raw\n"));
}
