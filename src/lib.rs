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

pub mod emit;
pub mod errors;
pub mod expr;
pub mod file_reader;
pub mod instruction;
pub mod linker;
pub mod macros;
pub mod mnemonic;
pub mod opcode;
pub mod parser;
pub mod program;
pub mod register;

use std::path::Path;

use anyhow::{Context, Result};
use file_reader::FileReader;
use log::info;
use program::Program;

extern crate pest;
extern crate pest_derive;

/// Runs the full pipeline: tokenize, parse (recursing through `.include`),
/// then link to a fixed point. Returns the linked [`Program`], ready for
/// any emitter under [`emit`].
pub fn assemble<F: FileReader>(source_path: &Path, reader: &F) -> Result<Program> {
    let mut program = Program::new();
    parser::parse_program(reader, source_path, &mut program).context("Failed during parsing stage")?;
    info!("parsed {} items from {}", program.items.len(), source_path.display());

    linker::optimize_and_link(&mut program).context("Failed during symbol resolution and optimization")?;
    info!("linked {} items", program.items.len());

    Ok(program)
}
