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

//! [`Program`]: the ordered instruction/data stream plus the pending-state
//! latch the directive/macro expanders write into (§4.7).

use crate::errors::AssemblyError;
use crate::expr::{Context, Expression};
use crate::instruction::{DataWord, Instruction, ProgramItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Harvard,
    VonNeumann,
}

#[derive(Default)]
struct Pending {
    label: Option<String>,
    macro_description: Option<String>,
    comment: Option<String>,
    origin: Option<i64>,
}

pub struct Program {
    pub items: Vec<ProgramItem>,
    pub context: Context,
    pending: Pending,
    mode: Mode,
    ram_cursor: i64,
    ram_or_data_allocated: bool,
}

impl Program {
    pub fn new() -> Self {
        Program {
            items: Vec::new(),
            context: Context::new(),
            pending: Pending::default(),
            mode: Mode::Harvard,
            ram_cursor: 0,
            ram_or_data_allocated: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Attaches a label to whichever instruction/data word is emitted next.
    /// Re-occupying the slot before it drains is a structural error.
    pub fn set_pending_label(&mut self, name: String, line: usize) -> Result<(), AssemblyError> {
        if self.pending.label.is_some() {
            return Err(AssemblyError::structural(
                line,
                "two labels for the same command",
            ));
        }
        self.pending.label = Some(name);
        Ok(())
    }

    pub fn set_pending_macro_description(
        &mut self,
        desc: String,
        line: usize,
    ) -> Result<(), AssemblyError> {
        if self.pending.macro_description.is_some() {
            return Err(AssemblyError::structural(
                line,
                "two macro descriptions for the same command",
            ));
        }
        self.pending.macro_description = Some(desc);
        Ok(())
    }

    /// Pending comments accumulate, joined by newline, rather than erroring.
    pub fn append_pending_comment(&mut self, text: String) {
        match &mut self.pending.comment {
            Some(existing) => {
                existing.push('\n');
                existing.push_str(&text);
            }
            None => self.pending.comment = Some(text),
        }
    }

    pub fn set_pending_origin(&mut self, addr: i64) {
        self.pending.origin = Some(addr);
    }

    fn drain_pending(&mut self) -> Pending {
        std::mem::take(&mut self.pending)
    }

    /// Appends an instruction built by the parser/macro expander, latching
    /// whatever pending state is waiting.
    pub fn push_instruction(&mut self, mut instr: Instruction) {
        let pending = self.drain_pending();
        instr.label = pending.label;
        instr.macro_description = pending.macro_description;
        instr.comment = pending.comment;
        instr.origin = pending.origin;
        self.items.push(ProgramItem::Instruction(instr));
    }

    /// Attaches a trailing same-line comment to the most recently pushed item.
    pub fn attach_trailing_comment(&mut self, text: String) {
        if let Some(item) = self.items.last_mut() {
            let comment = match item {
                ProgramItem::Instruction(i) => &mut i.comment,
                ProgramItem::Data(d) => {
                    let _ = d;
                    return;
                }
            };
            match comment {
                Some(existing) => {
                    existing.push('\n');
                    existing.push_str(&text);
                }
                None => *comment = Some(text),
            }
        }
    }

    pub fn push_data_word(&mut self, value: Expression, line: usize) {
        let pending = self.drain_pending();
        self.items.push(ProgramItem::Data(DataWord {
            value,
            label: pending.label,
            line,
            address: 0,
        }));
    }

    /// `.word`/`.long`/`.words`: reserve `count` RAM words for `ident`,
    /// binding it to the current RAM cursor. Invalid once in Von-Neumann mode.
    pub fn reserve_ram(&mut self, ident: &str, count: i64, line: usize) -> Result<(), AssemblyError> {
        if self.mode == Mode::VonNeumann {
            return Err(AssemblyError::semantic(
                line,
                "`.word`/`.long`/`.words` are invalid after `.dorg` switched to Von-Neumann mode",
            ));
        }
        self.context.add_identifier(ident, self.ram_cursor)?;
        self.ram_cursor += count;
        self.ram_or_data_allocated = true;
        Ok(())
    }

    /// `.const ident expr`: bind an already-evaluated integer identifier.
    pub fn bind_const(&mut self, ident: &str, value: i64) -> Result<(), AssemblyError> {
        self.context.add_identifier(ident, value)
    }

    /// `.org addr`: latch the explicit origin for the next emitted item.
    pub fn set_org(&mut self, addr: i64) {
        self.set_pending_origin(addr);
    }

    /// `.dorg addr`: switch to Von-Neumann mode and seed the cursor.
    /// Rejected once any RAM/Harvard-data has already been allocated.
    pub fn set_dorg(&mut self, addr: i64, line: usize) -> Result<(), AssemblyError> {
        if self.mode == Mode::VonNeumann {
            return Err(AssemblyError::structural(line, "`.dorg` used more than once"));
        }
        if self.ram_or_data_allocated {
            return Err(AssemblyError::structural(
                line,
                "`.dorg` after RAM/data has already been allocated",
            ));
        }
        self.mode = Mode::VonNeumann;
        self.ram_cursor = addr;
        self.set_pending_origin(addr);
        Ok(())
    }

    /// `.data` in Harvard mode: RAM-initialization codegen is unimplemented
    /// (see DESIGN.md), so this is a structural error rather than silently
    /// registering an address nobody will ever populate.
    pub fn harvard_data_unsupported(&mut self, line: usize) -> Result<(), AssemblyError> {
        self.ram_or_data_allocated = true;
        Err(AssemblyError::structural(
            line,
            "`.data` in Harvard mode is unsupported (use `.dorg` first); \
             RAM-initialization codegen is not implemented",
        ))
    }
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_label_conflict_is_an_error() {
        let mut p = Program::new();
        p.set_pending_label("a".into(), 1).unwrap();
        assert!(p.set_pending_label("b".into(), 1).is_err());
    }

    #[test]
    fn pending_comments_accumulate() {
        let mut p = Program::new();
        p.append_pending_comment("first".into());
        p.append_pending_comment("second".into());
        assert_eq!(p.pending.comment.as_deref(), Some("first\nsecond"));
    }

    #[test]
    fn dorg_after_ram_reservation_is_rejected() {
        let mut p = Program::new();
        p.reserve_ram("buf", 1, 1).unwrap();
        assert!(p.set_dorg(0x8000, 2).is_err());
    }
}
