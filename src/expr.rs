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

//! Integer expression AST and the symbol table ("Context") it evaluates against.

use crate::errors::AssemblyError;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Or,
    And,
    Xor,
    Add,
    Sub,
    Mul,
    Div,
}

impl Operation {
    fn symbol(self) -> &'static str {
        match self {
            Operation::Or => "|",
            Operation::And => "&",
            Operation::Xor => "^",
            Operation::Add => "+",
            Operation::Sub => "-",
            Operation::Mul => "*",
            Operation::Div => "/",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Constant(i64),
    Identifier(String),
    Negate(Box<Expression>),
    BitNot(Box<Expression>),
    Binary(Box<Expression>, Operation, Box<Expression>),
}

impl Expression {
    pub fn constant(value: i64) -> Self {
        Expression::Constant(value)
    }

    pub fn identifier(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    pub fn negate(self) -> Self {
        Expression::Negate(Box::new(self))
    }

    pub fn binary(self, op: Operation, rhs: Expression) -> Self {
        Expression::Binary(Box::new(self), op, Box::new(rhs))
    }

    /// Evaluates to a plain integer. Identifiers require a populated `Context`.
    pub fn get_value(&self, context: &Context) -> Result<i64, AssemblyError> {
        match self {
            Expression::Constant(v) => Ok(*v),
            Expression::Identifier(name) => context.get(name),
            Expression::Negate(inner) => Ok(-inner.get_value(context)?),
            Expression::BitNot(inner) => Ok(!inner.get_value(context)?),
            Expression::Binary(a, op, b) => {
                let av = a.get_value(context)?;
                let bv = b.get_value(context)?;
                Ok(match op {
                    Operation::Or => av | bv,
                    Operation::And => av & bv,
                    Operation::Xor => av ^ bv,
                    Operation::Add => av + bv,
                    Operation::Sub => av - bv,
                    Operation::Mul => av * bv,
                    Operation::Div => {
                        if bv == 0 {
                            return Err(AssemblyError::semantic_no_line("Division by zero"));
                        }
                        let q = av / bv;
                        let r = av % bv;
                        if r != 0 && (r < 0) != (bv < 0) { q - 1 } else { q }
                    }
                })
            }
        }
    }

    fn check_brace(&self) -> String {
        match self {
            Expression::Binary(..) => format!("({self})"),
            other => other.to_string(),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Constant(v) => write!(f, "{v}"),
            Expression::Identifier(name) => write!(f, "{name}"),
            Expression::Negate(inner) => write!(f, "-{}", inner.check_brace()),
            Expression::BitNot(inner) => write!(f, "~{}", inner.check_brace()),
            Expression::Binary(a, op, b) => {
                write!(f, "{}{}{}", a.check_brace(), op.symbol(), b.check_brace())
            }
        }
    }
}

/// Case-insensitive symbol table plus the address of the instruction currently
/// being assembled, exposed to expressions under four special identifiers.
pub struct Context {
    identifiers: HashMap<String, i64>,
    instr_addr: i64,
}

impl Context {
    pub const ADDR: &'static str = "_ADDR_";
    pub const NEXT_ADDR: &'static str = "_NEXT_ADDR_";
    pub const SKIP_ADDR: &'static str = "_SKIP_ADDR_";
    pub const SKIP2_ADDR: &'static str = "_SKIP2_ADDR_";

    pub fn new() -> Self {
        let mut identifiers = HashMap::new();
        identifiers.insert(Self::ADDR.to_ascii_lowercase(), 0);
        Context {
            identifiers,
            instr_addr: 0,
        }
    }

    pub fn get(&self, name: &str) -> Result<i64, AssemblyError> {
        self.identifiers
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| AssemblyError::semantic_no_line(format!("'{name}' not found")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.identifiers.contains_key(&name.to_ascii_lowercase())
    }

    /// Rejects redefinition with a different value (case-insensitive label clash).
    pub fn add_identifier(&mut self, name: &str, value: i64) -> Result<(), AssemblyError> {
        let key = name.to_ascii_lowercase();
        if let Some(&existing) = self.identifiers.get(&key) {
            if existing != value {
                return Err(AssemblyError::semantic_no_line(format!(
                    "Label '{name}' defined twice (case-insensitive) with different values: {existing} and {value}"
                )));
            }
        }
        self.set_identifier(name, value);
        Ok(())
    }

    /// Silently overwrites; used during fixed-point convergence.
    pub fn set_identifier(&mut self, name: &str, value: i64) {
        self.identifiers.insert(name.to_ascii_lowercase(), value);
        if name == Self::ADDR {
            self.instr_addr = value;
        }
    }

    pub fn set_instr_addr(&mut self, addr: i64) {
        self.instr_addr = addr;
        self.set_identifier(Self::ADDR, addr);
    }

    pub fn instr_addr(&self) -> i64 {
        self.instr_addr
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> Context {
        Context::new()
    }

    #[test]
    fn constant_round_trips() {
        let e = Expression::constant(42);
        assert_eq!(e.get_value(&ctx()).unwrap(), 42);
    }

    #[test]
    fn nested_operations_match_arithmetic() {
        let e = Expression::constant(3)
            .binary(Operation::Add, Expression::constant(4))
            .binary(Operation::Mul, Expression::constant(2));
        assert_eq!(e.get_value(&ctx()).unwrap(), 14);
    }

    #[test]
    fn negate_and_bitnot() {
        let e = Expression::constant(5).negate();
        assert_eq!(e.get_value(&ctx()).unwrap(), -5);
        let e = Expression::BitNot(Box::new(Expression::constant(0)));
        assert_eq!(e.get_value(&ctx()).unwrap(), -1);
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let e = Expression::constant(1).binary(Operation::Div, Expression::constant(0));
        assert!(e.get_value(&ctx()).is_err());
    }

    #[test]
    fn division_floors_toward_negative_infinity() {
        let e = Expression::constant(-7).binary(Operation::Div, Expression::constant(2));
        assert_eq!(e.get_value(&ctx()).unwrap(), -4);
    }

    #[test]
    fn division_floors_with_negative_divisor() {
        let e = Expression::constant(7).binary(Operation::Div, Expression::constant(-2));
        assert_eq!(e.get_value(&ctx()).unwrap(), -4);
        let e = Expression::constant(-7).binary(Operation::Div, Expression::constant(-2));
        assert_eq!(e.get_value(&ctx()).unwrap(), 3);
    }

    #[test]
    fn identifier_lookup_is_case_insensitive() {
        let mut c = ctx();
        c.add_identifier("Label", 10).unwrap();
        assert_eq!(Expression::identifier("label").get_value(&c).unwrap(), 10);
    }

    #[test]
    fn add_identifier_rejects_conflicting_redefinition() {
        let mut c = ctx();
        c.add_identifier("L1", 10).unwrap();
        assert!(c.add_identifier("l1", 20).is_err());
        // Same value is fine.
        assert!(c.add_identifier("l1", 10).is_ok());
    }

    #[test]
    fn set_identifier_overwrites_silently() {
        let mut c = ctx();
        c.set_identifier("L1", 10);
        c.set_identifier("l1", 20);
        assert_eq!(Expression::identifier("L1").get_value(&c).unwrap(), 20);
    }

    #[test]
    fn unresolved_identifier_fails() {
        let e = Expression::identifier("missing");
        assert!(e.get_value(&ctx()).is_err());
    }
}
