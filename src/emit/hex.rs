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

//! `v2.0 raw` hex image emitter, with gap fill.

use crate::errors::AssemblyError;
use crate::linker::seed_context_for_emit;
use crate::program::Program;
use std::collections::HashMap;

/// Encodes every item into a sparse address-keyed buffer, then prints
/// `v2.0 raw` followed by one lowercase hex word per address from 0 up to
/// the highest address used, substituting `0` for any gap.
pub fn emit(program: &mut Program) -> Result<String, AssemblyError> {
    let mut words: HashMap<i64, u16> = HashMap::new();
    let mut max_addr: i64 = 0;

    for idx in 0..program.items.len() {
        seed_context_for_emit(&mut program.context, &program.items, idx);
        let addr = program.items[idx].address();
        let encoded = program.items[idx].encode(&program.context)?;
        for (offset, word) in encoded.into_iter().enumerate() {
            let a = addr + offset as i64;
            words.insert(a, word);
            max_addr = max_addr.max(a);
        }
    }

    let mut out = String::from("v2.0 raw\n");
    for addr in 0..=max_addr {
        let word = words.get(&addr).copied().unwrap_or(0);
        out.push_str(&format!("{word:x}\n"));
    }
    Ok(out)
}
