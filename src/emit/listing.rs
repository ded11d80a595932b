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

//! Human-readable listing emitter: address, machine code, label, mnemonic,
//! formatted arguments, macro description, comments.

use crate::errors::AssemblyError;
use crate::instruction::ProgramItem;
use crate::linker::seed_context_for_emit;
use crate::mnemonic;
use crate::program::Program;

fn words_column(words: &[u16]) -> String {
    words.iter().map(|w| format!("{w:04x}")).collect::<Vec<_>>().join(" ")
}

/// Renders one line per program item. Column widths are fixed but not
/// required to be bit-exact; this is for a human reviewing an `.lst` file.
pub fn emit(program: &mut Program) -> Result<String, AssemblyError> {
    let mut out = String::new();
    for idx in 0..program.items.len() {
        seed_context_for_emit(&mut program.context, &program.items, idx);
        let addr = program.items[idx].address();
        let words = program.items[idx].encode(&program.context)?;

        let line = match &program.items[idx] {
            ProgramItem::Instruction(instr) => {
                let shape = mnemonic::arg_shape(instr.opcode);
                let args = shape.format(instr);
                let label = instr.label.as_deref().unwrap_or("");
                let mut line = format!(
                    "{:04x}  {:<10} {:<12} {:<6} {}",
                    addr,
                    words_column(&words),
                    label,
                    instr.opcode.name(),
                    args
                );
                if let Some(desc) = &instr.macro_description {
                    line.push_str(&format!("    ; {desc}"));
                }
                if let Some(comment) = &instr.comment {
                    line.push_str(&format!("    ; {comment}"));
                }
                line
            }
            ProgramItem::Data(data) => {
                let label = data.label.as_deref().unwrap_or("");
                format!("{:04x}  {:<10} {:<12} .data {}", addr, words_column(&words), label, data.value)
            }
        };
        out.push_str(&line);
        out.push('\n');
    }
    Ok(out)
}
