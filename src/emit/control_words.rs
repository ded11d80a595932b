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

//! Diagnostic control-word table dump, `--dump-control-words` (§6).

use crate::opcode::Opcode;

/// One packed control word per opcode, in declaration/ordinal order, after
/// a `v2.0 raw` header.
pub fn emit() -> String {
    let mut out = String::from("v2.0 raw\n");
    for &op in Opcode::ALL {
        out.push_str(&format!("{:x}\n", op.create_control_word()));
    }
    out
}
