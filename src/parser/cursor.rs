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

//! [`TokenCursor`]: drives `mnemonic::ArgShape::parse` over a token slice,
//! plus the recursive-descent expression parser (§4.2).

use super::{Token, TokenKind};
use crate::errors::AssemblyError;
use crate::expr::{Expression, Operation};
use crate::mnemonic::OperandSource;
use crate::register::Register;
use std::collections::HashMap;

pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
    aliases: &'a HashMap<String, Register>,
}

impl<'a> TokenCursor<'a> {
    pub fn new(tokens: &'a [Token], aliases: &'a HashMap<String, Register>) -> Self {
        TokenCursor {
            tokens,
            pos: 0,
            aliases,
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Tokens left unconsumed in this cursor's slice.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.pos
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn bump(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    pub fn bump_kind(&mut self) -> Option<TokenKind> {
        self.bump().map(|t| t.kind.clone())
    }

    fn fallback_line(&self) -> usize {
        self.tokens.last().map(|t| t.line).unwrap_or(1)
    }

    fn unexpected(&self, what: &str, found: Option<TokenKind>) -> AssemblyError {
        match found {
            Some(kind) => AssemblyError::structural(self.fallback_line(), format!("expected {what}, found {kind:?}")),
            None => AssemblyError::structural(self.fallback_line(), format!("expected {what}, found end of file")),
        }
    }
}

impl<'a> OperandSource for TokenCursor<'a> {
    fn current_line(&self) -> usize {
        self.peek().map(|t| t.line).unwrap_or_else(|| self.fallback_line())
    }

    fn take_register(&mut self) -> Result<Register, AssemblyError> {
        let line = self.current_line();
        match self.bump_kind() {
            Some(TokenKind::Ident(name)) => self
                .aliases
                .get(&name.to_ascii_lowercase())
                .copied()
                .or_else(|| Register::parse_str(&name))
                .ok_or_else(|| AssemblyError::structural(line, format!("'{name}' is not a register"))),
            other => Err(self.unexpected("a register", other)),
        }
    }

    fn take_expression(&mut self) -> Result<Expression, AssemblyError> {
        parse_expr(self, 0)
    }

    fn expect_punct(&mut self, punct: &str) -> Result<(), AssemblyError> {
        let want = punct.chars().next().expect("non-empty punct");
        let line = self.current_line();
        match self.bump_kind() {
            Some(TokenKind::Punct(c)) if c == want => Ok(()),
            other => Err(self.unexpected(&format!("'{punct}'"), other)),
        }
    }

    fn peek_punct(&mut self, punct: &str) -> bool {
        let want = punct.chars().next().expect("non-empty punct");
        matches!(self.peek_kind(), Some(TokenKind::Punct(c)) if *c == want)
    }
}

fn binop_prec(kind: &TokenKind) -> Option<(Operation, u8)> {
    match kind {
        TokenKind::Punct('|') => Some((Operation::Or, 1)),
        TokenKind::Punct('^') => Some((Operation::Xor, 2)),
        TokenKind::Punct('&') => Some((Operation::And, 3)),
        TokenKind::Punct('+') => Some((Operation::Add, 4)),
        TokenKind::Punct('-') => Some((Operation::Sub, 4)),
        TokenKind::Punct('*') => Some((Operation::Mul, 5)),
        TokenKind::Punct('/') => Some((Operation::Div, 5)),
        TokenKind::Ident(name) => match name.to_ascii_lowercase().as_str() {
            "or" => Some((Operation::Or, 1)),
            "xor" => Some((Operation::Xor, 2)),
            "and" => Some((Operation::And, 3)),
            _ => None,
        },
        _ => None,
    }
}

fn parse_unary(cur: &mut TokenCursor) -> Result<Expression, AssemblyError> {
    match cur.peek_kind() {
        Some(TokenKind::Punct('-')) => {
            cur.bump_kind();
            Ok(parse_unary(cur)?.negate())
        }
        Some(TokenKind::Punct('~')) => {
            cur.bump_kind();
            Ok(Expression::BitNot(Box::new(parse_unary(cur)?)))
        }
        _ => parse_primary(cur),
    }
}

fn parse_primary(cur: &mut TokenCursor) -> Result<Expression, AssemblyError> {
    let line = cur.current_line();
    match cur.bump_kind() {
        Some(TokenKind::Number(n)) => Ok(Expression::constant(n)),
        Some(TokenKind::Ident(name)) => Ok(Expression::identifier(name)),
        Some(TokenKind::Punct('(')) => {
            let inner = parse_expr(cur, 0)?;
            cur.expect_punct(")")?;
            Ok(inner)
        }
        other => Err(AssemblyError::structural(
            line,
            format!("expected an expression, found {other:?}"),
        )),
    }
}

pub fn parse_expr(cur: &mut TokenCursor, min_prec: u8) -> Result<Expression, AssemblyError> {
    let mut lhs = parse_unary(cur)?;
    loop {
        let Some(kind) = cur.peek_kind() else { break };
        let Some((op, prec)) = binop_prec(kind) else { break };
        if prec < min_prec {
            break;
        }
        cur.bump_kind();
        let rhs = parse_expr(cur, prec + 1)?;
        lhs = lhs.binary(op, rhs);
    }
    Ok(lhs)
}
