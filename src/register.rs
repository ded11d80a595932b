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

/// The 16 general/special-purpose registers. Value equals the 4-bit encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Register {
    R0,
    R1,
    R2,
    R3,
    R4,
    R5,
    R6,
    R7,
    R8,
    R9,
    R10,
    R11,
    R12,
    BP,
    SP,
    RA,
}

impl Register {
    pub fn value(self) -> u8 {
        match self {
            Register::R0 => 0,
            Register::R1 => 1,
            Register::R2 => 2,
            Register::R3 => 3,
            Register::R4 => 4,
            Register::R5 => 5,
            Register::R6 => 6,
            Register::R7 => 7,
            Register::R8 => 8,
            Register::R9 => 9,
            Register::R10 => 10,
            Register::R11 => 11,
            Register::R12 => 12,
            Register::BP => 13,
            Register::SP => 14,
            Register::RA => 15,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Register::R0 => "R0",
            Register::R1 => "R1",
            Register::R2 => "R2",
            Register::R3 => "R3",
            Register::R4 => "R4",
            Register::R5 => "R5",
            Register::R6 => "R6",
            Register::R7 => "R7",
            Register::R8 => "R8",
            Register::R9 => "R9",
            Register::R10 => "R10",
            Register::R11 => "R11",
            Register::R12 => "R12",
            Register::BP => "BP",
            Register::SP => "SP",
            Register::RA => "RA",
        }
    }

    /// Case-insensitive lookup, mirroring `Opcode::parse_str`.
    pub fn parse_str(s: &str) -> Option<Register> {
        let upper = s.to_ascii_uppercase();
        Some(match upper.as_str() {
            "R0" => Register::R0,
            "R1" => Register::R1,
            "R2" => Register::R2,
            "R3" => Register::R3,
            "R4" => Register::R4,
            "R5" => Register::R5,
            "R6" => Register::R6,
            "R7" => Register::R7,
            "R8" => Register::R8,
            "R9" => Register::R9,
            "R10" => Register::R10,
            "R11" => Register::R11,
            "R12" => Register::R12,
            "BP" => Register::BP,
            "SP" => Register::SP,
            "RA" => Register::RA,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_match_index() {
        assert_eq!(Register::R0.value(), 0);
        assert_eq!(Register::R12.value(), 12);
        assert_eq!(Register::BP.value(), 13);
        assert_eq!(Register::SP.value(), 14);
        assert_eq!(Register::RA.value(), 15);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Register::parse_str("sp"), Some(Register::SP));
        assert_eq!(Register::parse_str("Ra"), Some(Register::RA));
        assert_eq!(Register::parse_str("r7"), Some(Register::R7));
        assert_eq!(Register::parse_str("r13"), None);
    }
}
