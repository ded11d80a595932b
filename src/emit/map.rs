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

//! Address-to-source-line map emitter: a JSON array of `{"addr","line"}`.

use crate::errors::AssemblyError;
use crate::program::Program;
use serde::Serialize;

#[derive(Serialize)]
struct Entry {
    addr: i64,
    line: usize,
}

pub fn emit(program: &Program) -> Result<String, AssemblyError> {
    let mut entries: Vec<Entry> = program
        .items
        .iter()
        .map(|item| Entry {
            addr: item.address(),
            line: item.line(),
        })
        .collect();
    entries.sort_by_key(|e| e.addr);
    serde_json::to_string_pretty(&entries)
        .map_err(|e| AssemblyError::semantic_no_line(format!("failed to serialize address map: {e}")))
}
