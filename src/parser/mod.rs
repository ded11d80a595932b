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

//! Tokenizer (pest-driven, see `grammar.pest`) plus the hand-written
//! recursive-descent structural and expression parsers built over its
//! output (§4.1, §4.2).

mod cursor;
mod statement;

pub use cursor::TokenCursor;
pub use statement::parse_program;

use crate::errors::AssemblyError;
use pest::Parser as _;

#[derive(pest_derive::Parser)]
#[grammar = "grammar.pest"]
pub struct AsmGrammar;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Comment(String),
    LabelDef(String),
    Directive(String),
    Ident(String),
    Number(i64),
    DqString(String),
    SqChar(char),
    Punct(char),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

fn unescape(body: &str, line: usize) -> Result<String, AssemblyError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = chars
            .next()
            .ok_or_else(|| AssemblyError::structural(line, "dangling escape at end of literal"))?;
        out.push(match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '0' => '\0',
            '\\' => '\\',
            '"' => '"',
            '\'' => '\'',
            other => other,
        });
    }
    Ok(out)
}

fn classify(pair: pest::iterators::Pair<Rule>, line: usize) -> Result<TokenKind, AssemblyError> {
    let text = pair.as_str();
    Ok(match pair.as_rule() {
        Rule::comment_tok => {
            let inner = text
                .strip_prefix("/*")
                .map(|s| s.strip_suffix("*/").unwrap_or(s))
                .unwrap_or_else(|| text.trim_start_matches(';'));
            TokenKind::Comment(inner.trim().to_string())
        }
        Rule::label_def => TokenKind::LabelDef(text.trim_end_matches(':').to_string()),
        Rule::directive => TokenKind::Directive(text.trim_start_matches('.').to_string()),
        Rule::ident => TokenKind::Ident(text.to_string()),
        Rule::hex_lit => TokenKind::Number(
            i64::from_str_radix(text.trim_start_matches("0x"), 16)
                .map_err(|e| AssemblyError::structural(line, format!("bad hex literal: {e}")))?,
        ),
        Rule::bin_lit => TokenKind::Number(
            i64::from_str_radix(text.trim_start_matches("0b"), 2)
                .map_err(|e| AssemblyError::structural(line, format!("bad binary literal: {e}")))?,
        ),
        Rule::dec_lit => TokenKind::Number(
            text.parse()
                .map_err(|e| AssemblyError::structural(line, format!("bad decimal literal: {e}")))?,
        ),
        Rule::dq_string => {
            let body = &text[1..text.len() - 1];
            TokenKind::DqString(unescape(body, line)?)
        }
        Rule::sq_char => {
            let body = &text[1..text.len() - 1];
            let unescaped = unescape(body, line)?;
            let mut chars = unescaped.chars();
            let c = chars
                .next()
                .ok_or_else(|| AssemblyError::structural(line, "empty character literal"))?;
            if chars.next().is_some() {
                return Err(AssemblyError::structural(
                    line,
                    "character literal must resolve to exactly one code unit",
                ));
            }
            TokenKind::SqChar(c)
        }
        Rule::punct => TokenKind::Punct(text.chars().next().unwrap()),
        other => unreachable!("token rule never yields {other:?} directly"),
    })
}

/// Lexes an entire source file into a flat token stream. Line numbers come
/// straight from pest's span position, independent of the silent
/// `WHITESPACE` rule that actually absorbs newlines.
pub fn tokenize(source: &str) -> Result<Vec<Token>, AssemblyError> {
    let mut tokens = Vec::new();
    let pairs = AsmGrammar::parse(Rule::file, source)?;
    for file_pair in pairs {
        for top in file_pair.into_inner() {
            if top.as_rule() == Rule::EOI {
                continue;
            }
            let line = top.as_span().start_pos().line_col().0;
            let inner = top
                .into_inner()
                .next()
                .expect("`token` rule always wraps exactly one alternative");
            tokens.push(Token {
                kind: classify(inner, line)?,
                line,
            });
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_a_simple_instruction_line() {
        let tokens = tokenize("start: mov r0,r1 ; comment\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::LabelDef("start".into()));
        assert_eq!(tokens[1].kind, TokenKind::Ident("mov".into()));
        assert_eq!(tokens[2].kind, TokenKind::Ident("r0".into()));
        assert_eq!(tokens[3].kind, TokenKind::Punct(','));
        assert_eq!(tokens[4].kind, TokenKind::Ident("r1".into()));
        assert_eq!(tokens[5].kind, TokenKind::Comment("comment".into()));
    }

    #[test]
    fn tokenizes_numeric_literal_bases() {
        let tokens = tokenize("0x1F 0b101 42").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number(0x1F));
        assert_eq!(tokens[1].kind, TokenKind::Number(0b101));
        assert_eq!(tokens[2].kind, TokenKind::Number(42));
    }

    #[test]
    fn unescapes_double_quoted_strings() {
        let tokens = tokenize(r#""a\nb""#).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::DqString("a\nb".to_string()));
    }

    #[test]
    fn directive_strips_the_leading_dot() {
        let tokens = tokenize(".org 0x8000").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Directive("org".into()));
    }

    #[test]
    fn block_comments_span_multiple_lines() {
        let tokens = tokenize("/* a\nb */ nop").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Comment("a\nb".into()));
        assert_eq!(tokens[1].line, 2);
    }
}
