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

//! Structural parser (§4.5, §4.6): dispatches on label/directive/macro/opcode
//! tokens, drives the macro expander and `mnemonic::ArgShape`, and recurses
//! through `.include` with cycle detection and lexically-scoped `.reg`
//! aliases (§9).

use super::{tokenize, Token, TokenCursor, TokenKind};
use crate::errors::AssemblyError;
use crate::expr::Expression;
use crate::file_reader::FileReader;
use crate::instruction::InstructionBuilder;
use crate::macros;
use crate::mnemonic::{self, OperandSource};
use crate::opcode::Opcode;
use crate::program::{Mode, Program};
use crate::register::Register;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn resolve_include(current_file: &Path, include_path: &str) -> PathBuf {
    let target = Path::new(include_path);
    if target.is_absolute() {
        return normalize(target);
    }
    let dir = current_file.parent().unwrap_or_else(|| Path::new(""));
    normalize(&dir.join(target))
}

fn looks_like_statement_start(name: &str) -> bool {
    macros::is_macro(name) || Opcode::parse_str(name).is_some()
}

struct Parser<'f, F: FileReader> {
    reader: &'f F,
    aliases: HashMap<String, Register>,
    include_stack: Vec<PathBuf>,
}

impl<'f, F: FileReader> Parser<'f, F> {
    fn new(reader: &'f F) -> Self {
        Parser {
            reader,
            aliases: HashMap::new(),
            include_stack: Vec::new(),
        }
    }

    fn assemble_file(&mut self, path: &Path, program: &mut Program) -> Result<(), AssemblyError> {
        let canonical = normalize(path);
        if self.include_stack.contains(&canonical) {
            let mut cycle: Vec<String> = self
                .include_stack
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            cycle.push(canonical.display().to_string());
            return Err(AssemblyError::structural(
                0,
                format!("include cycle detected: {}", cycle.join(" -> ")),
            ));
        }

        let source = self
            .reader
            .read_to_string(path)
            .map_err(|e| AssemblyError::structural(0, format!("cannot read '{}': {e}", path.display())))?;
        let tokens = tokenize(&source)?;

        self.include_stack.push(canonical);
        self.parse_tokens(&tokens, path, program)?;
        self.include_stack.pop();
        Ok(())
    }

    fn parse_tokens(&mut self, tokens: &[Token], current_file: &Path, program: &mut Program) -> Result<(), AssemblyError> {
        let mut pos = 0;
        while pos < tokens.len() {
            let line = tokens[pos].line;
            let kind = tokens[pos].kind.clone();
            pos += 1;
            let pushed_item = match kind {
                TokenKind::Comment(text) => {
                    program.append_pending_comment(text);
                    false
                }
                TokenKind::LabelDef(name) => {
                    program.set_pending_label(name, line)?;
                    false
                }
                TokenKind::Directive(name) => {
                    let remaining = tokens.len() - pos;
                    let mut cur = TokenCursor::new(&tokens[pos..], &self.aliases);
                    let result = self.handle_directive(&name, &mut cur, line, program, current_file)?;
                    pos += remaining - cur.remaining();
                    result
                }
                TokenKind::Ident(name) => {
                    let remaining = tokens.len() - pos;
                    let mut cur = TokenCursor::new(&tokens[pos..], &self.aliases);
                    let result = self.handle_mnemonic(&name, &mut cur, line, program)?;
                    pos += remaining - cur.remaining();
                    result
                }
                other => return Err(AssemblyError::structural(line, format!("unexpected token {other:?}"))),
            };

            if pushed_item {
                if let Some(Token {
                    kind: TokenKind::Comment(_),
                    line: cline,
                }) = tokens.get(pos)
                {
                    if *cline == line {
                        if let TokenKind::Comment(text) = tokens[pos].kind.clone() {
                            program.attach_trailing_comment(text);
                            pos += 1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Returns whether this directive pushed an instruction/data word (and
    /// so is eligible for a same-line trailing comment).
    fn handle_directive(
        &mut self,
        name: &str,
        cur: &mut TokenCursor,
        line: usize,
        program: &mut Program,
        current_file: &Path,
    ) -> Result<bool, AssemblyError> {
        match name.to_ascii_lowercase().as_str() {
            "reg" => {
                let alias = take_ident(cur, line)?;
                let reg = cur.take_register()?;
                self.aliases.insert(alias.to_ascii_lowercase(), reg);
                Ok(false)
            }
            "word" => {
                let ident = take_ident(cur, line)?;
                program.reserve_ram(&ident, 1, line)?;
                Ok(false)
            }
            "long" => {
                let ident = take_ident(cur, line)?;
                program.reserve_ram(&ident, 2, line)?;
                Ok(false)
            }
            "words" => {
                let ident = take_ident(cur, line)?;
                let n = cur.take_expression()?.get_value(&program.context).map_err(|e| e.with_line(line))?;
                if n < 0 {
                    return Err(AssemblyError::semantic(line, "'.words' count must be >= 0"));
                }
                program.reserve_ram(&ident, n, line)?;
                Ok(false)
            }
            "const" => {
                let ident = take_ident(cur, line)?;
                let value = cur.take_expression()?.get_value(&program.context).map_err(|e| e.with_line(line))?;
                program.bind_const(&ident, value)?;
                Ok(false)
            }
            "org" => {
                let value = cur.take_expression()?.get_value(&program.context).map_err(|e| e.with_line(line))?;
                program.set_org(value);
                Ok(false)
            }
            "dorg" => {
                let value = cur.take_expression()?.get_value(&program.context).map_err(|e| e.with_line(line))?;
                program.set_dorg(value, line)?;
                Ok(false)
            }
            "data" => self.handle_data(cur, line, program),
            "include" => {
                let target = match cur.bump_kind() {
                    Some(TokenKind::DqString(s)) => s,
                    other => {
                        return Err(AssemblyError::structural(
                            line,
                            format!("'.include' expects a quoted filename, found {other:?}"),
                        ))
                    }
                };
                let resolved = resolve_include(current_file, &target);
                let saved_aliases = self.aliases.clone();
                self.assemble_file(&resolved, program)?;
                self.aliases = saved_aliases;
                Ok(false)
            }
            other => Err(AssemblyError::structural(line, format!("unknown directive '.{other}'"))),
        }
    }

    fn handle_data(&mut self, cur: &mut TokenCursor, line: usize, program: &mut Program) -> Result<bool, AssemblyError> {
        let ident = take_ident(cur, line)?;
        if program.mode() == Mode::Harvard {
            program.harvard_data_unsupported(line)?;
            unreachable!("harvard_data_unsupported always returns Err");
        }
        program.set_pending_label(ident, line)?;
        loop {
            match cur.peek_kind() {
                Some(TokenKind::DqString(s)) => {
                    let s = s.clone();
                    cur.bump_kind();
                    for ch in s.chars() {
                        program.push_data_word(Expression::constant(ch as i64), line);
                    }
                }
                _ => {
                    let value = cur.take_expression()?;
                    program.push_data_word(value, line);
                }
            }
            if cur.peek_punct(",") {
                cur.expect_punct(",")?;
            } else {
                break;
            }
        }
        Ok(true)
    }

    fn handle_mnemonic(&mut self, name: &str, cur: &mut TokenCursor, line: usize, program: &mut Program) -> Result<bool, AssemblyError> {
        let upper = name.to_ascii_uppercase();
        match upper.as_str() {
            "INC" => {
                macros::inc(program, cur.take_register()?, line);
                return Ok(true);
            }
            "DEC" => {
                macros::dec(program, cur.take_register()?, line);
                return Ok(true);
            }
            "PUSH" => {
                macros::push(program, cur.take_register()?, line);
                return Ok(true);
            }
            "POP" => {
                macros::pop(program, cur.take_register()?, line);
                return Ok(true);
            }
            "CALL" => {
                macros::call(program, cur.take_expression()?, line);
                return Ok(true);
            }
            "_SCALL" => {
                macros::scall(program, cur.take_expression()?, line);
                return Ok(true);
            }
            "RET" => {
                let has_operand = match cur.peek_kind() {
                    None => false,
                    Some(TokenKind::LabelDef(_) | TokenKind::Directive(_) | TokenKind::Comment(_)) => false,
                    Some(TokenKind::Ident(next)) => !looks_like_statement_start(next),
                    _ => true,
                };
                if has_operand {
                    macros::ret_n(program, cur.take_expression()?, line);
                } else {
                    macros::ret(program, line);
                }
                return Ok(true);
            }
            "ENTER" => {
                macros::enter(program, cur.take_expression()?, line);
                return Ok(true);
            }
            "LEAVE" => {
                macros::leave(program, line);
                return Ok(true);
            }
            "ENTERI" => {
                macros::enteri(program, line);
                return Ok(true);
            }
            "LEAVEI" => {
                macros::leavei(program, line);
                return Ok(true);
            }
            _ => {}
        }

        let opcode = Opcode::parse_str(name)
            .ok_or_else(|| AssemblyError::structural(line, format!("unknown mnemonic '{name}'")))?;
        let mut builder = InstructionBuilder::new(opcode, line);
        mnemonic::arg_shape(opcode).parse(&mut builder, cur)?;
        program.push_instruction(builder.build());
        Ok(true)
    }
}

fn take_ident(cur: &mut TokenCursor, line: usize) -> Result<String, AssemblyError> {
    match cur.bump_kind() {
        Some(TokenKind::Ident(name)) => Ok(name),
        other => Err(AssemblyError::structural(line, format!("expected an identifier, found {other:?}"))),
    }
}

/// Parses `entry_path` (and everything it transitively `.include`s) into
/// `program`.
pub fn parse_program<F: FileReader>(reader: &F, entry_path: &Path, program: &mut Program) -> Result<(), AssemblyError> {
    let mut parser = Parser::new(reader);
    parser.assemble_file(entry_path, program)
}
