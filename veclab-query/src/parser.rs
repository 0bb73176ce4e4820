// SPDX-License-Identifier: AGPL-3.0-or-later
// VecLab - Named Vector Data Engine
// Copyright (C) 2026 Sushanth Reddy Vanagala (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Vector Expression Parser
//!
//! Precedence-climbing parser producing an `Expr` tree. Every binary
//! operator is left-associative; unary operators bind tightest.
//!
//! ## Grammar
//!
//! ```text
//! expr(p)  → operand (binop[prec > p] expr(prec(binop)))*
//! operand  → '(' expr ')' | ('-' | '!') expr(14) | primary
//! primary  → NUMBER | VECTOR['(' range ')'] | FUNC '(' expr ')'
//!          | '$'VAR | '[' CMD ']' | '"' TEXT '"' | '{' TEXT '}'
//! ```
//!
//! ## Precedence
//!
//! | Level | Operators              |
//! |-------|------------------------|
//! | 14    | unary `-`, `!`         |
//! | 13    | `^`                    |
//! | 12    | `*` `/` `%`            |
//! | 11    | `+` `-`                |
//! | 10    | `<<` `>>`              |
//! | 9     | `<` `>` `<=` `>=`      |
//! | 8     | `==` `!=`              |
//! | 4     | `&&`                   |
//! | 3     | `\|\|`                 |

use std::fmt;

use crate::error::{ExprError, Result};
use crate::functions::{self, MathFunction};
use crate::substitute::SubstitutionKind;
use veclab_core::is_vector_char;

/// Precedence of unary operands
pub const UNARY_PRECEDENCE: u8 = 14;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Literal number
    Literal(f64),
    /// Vector reference with optional range suffix, e.g. `x(2:5)`
    Vector(String),
    /// Host substitution operand
    Substitution { kind: SubstitutionKind, text: String },
    /// Binary operation
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation
    UnaryOp { op: UnaryOp, expr: Box<Expr> },
    /// One-argument math function
    FnCall {
        function: &'static MathFunction,
        arg: Box<Expr>,
    },
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    Pow,
    And,
    Or,
}

impl BinaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Pow => 13,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 12,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Shl | BinaryOp::Shr => 10,
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => 9,
            BinaryOp::Eq | BinaryOp::Ne => 8,
            BinaryOp::And => 4,
            BinaryOp::Or => 3,
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Pow => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(symbol)
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

// ============================================================================
// Lexer
// ============================================================================

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Vector(String),
    Function(&'static MathFunction),
    Substitution(SubstitutionKind, String),
    Binary(BinaryOp),
    Not,
    LParen,
    RParen,
    Comma,
    /// Lone `=`, `&` or `|`
    Unknown(char),
    Eof,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{n}"),
            Token::Vector(text) => f.write_str(text),
            Token::Function(func) => f.write_str(func.name),
            Token::Substitution(_, text) => f.write_str(text),
            Token::Binary(op) => write!(f, "{op}"),
            Token::Not => f.write_str("!"),
            Token::LParen => f.write_str("("),
            Token::RParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Unknown(c) => write!(f, "{c}"),
            Token::Eof => f.write_str("end of expression"),
        }
    }
}

/// Tokenizer over the expression text
struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.rest().chars().nth(1)
    }

    fn bump(&mut self, bytes: usize) {
        self.pos += bytes;
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(Token::Eof);
        };
        let second = self.peek_second();

        let (token, width) = match c {
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            ',' => (Token::Comma, 1),
            '*' => (Token::Binary(BinaryOp::Mul), 1),
            '/' => (Token::Binary(BinaryOp::Div), 1),
            '%' => (Token::Binary(BinaryOp::Mod), 1),
            '+' => (Token::Binary(BinaryOp::Add), 1),
            '-' => (Token::Binary(BinaryOp::Sub), 1),
            '^' => (Token::Binary(BinaryOp::Pow), 1),
            '<' => match second {
                Some('<') => (Token::Binary(BinaryOp::Shl), 2),
                Some('=') => (Token::Binary(BinaryOp::Le), 2),
                _ => (Token::Binary(BinaryOp::Lt), 1),
            },
            '>' => match second {
                Some('>') => (Token::Binary(BinaryOp::Shr), 2),
                Some('=') => (Token::Binary(BinaryOp::Ge), 2),
                _ => (Token::Binary(BinaryOp::Gt), 1),
            },
            '=' => match second {
                Some('=') => (Token::Binary(BinaryOp::Eq), 2),
                _ => (Token::Unknown('='), 1),
            },
            '&' => match second {
                Some('&') => (Token::Binary(BinaryOp::And), 2),
                _ => (Token::Unknown('&'), 1),
            },
            '|' => match second {
                Some('|') => (Token::Binary(BinaryOp::Or), 2),
                _ => (Token::Unknown('|'), 1),
            },
            '!' => match second {
                Some('=') => (Token::Binary(BinaryOp::Ne), 2),
                _ => (Token::Not, 1),
            },
            '0'..='9' => return self.number(),
            '.' if second.is_some_and(|d| d.is_ascii_digit()) => return self.number(),
            '$' => return self.variable(),
            '[' => return self.delimited(SubstitutionKind::Command, '[', ']'),
            '{' => return self.delimited(SubstitutionKind::Braced, '{', '}'),
            '"' => return self.quoted(),
            c if is_vector_char(c) => return self.name(),
            c => return Err(ExprError::UnexpectedChar(c)),
        };
        self.bump(width);
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        let trimmed = self.rest().trim_start();
        self.pos = self.input.len() - trimmed.len();
    }

    fn digits(&self, from: usize) -> usize {
        self.input[from..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count()
    }

    fn number(&mut self) -> Result<Token> {
        let start = self.pos;
        let bytes = self.input.as_bytes();
        let mut end = start + self.digits(start);

        if bytes.get(end) == Some(&b'.') {
            end += 1;
            end += self.digits(end);
        }
        if let Some(b'e' | b'E') = bytes.get(end) {
            let mut exp = end + 1;
            if let Some(b'+' | b'-') = bytes.get(exp) {
                exp += 1;
            }
            let count = self.digits(exp);
            if count > 0 {
                end = exp + count;
            }
        }

        let text = &self.input[start..end];
        self.pos = end;
        let value = text
            .parse::<f64>()
            .map_err(|_| ExprError::InvalidNumber(text.to_string()))?;
        if value.is_infinite() {
            return Err(veclab_core::VectorError::from_non_finite(value).into());
        }
        if value == 0.0 && mantissa_nonzero(text) {
            return Err(veclab_core::VectorError::from_non_finite(0.0).into());
        }
        Ok(Token::Number(value))
    }

    /// Function name or vector reference with optional range suffix
    fn name(&mut self) -> Result<Token> {
        let rest = self.rest();

        let ident_len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        if rest[ident_len..].starts_with('(')
            && let Some(function) = functions::lookup(&rest[..ident_len])
        {
            self.bump(ident_len);
            return Ok(Token::Function(function));
        }

        let mut len = rest
            .find(|c: char| !is_vector_char(c))
            .unwrap_or(rest.len());
        if rest[len..].starts_with('(') {
            let close = matching(&rest[len..], '(', ')')
                .ok_or_else(|| ExprError::UnmatchedParen(self.input.to_string()))?;
            len += close + 1;
        }
        self.bump(len);
        Ok(Token::Vector(rest[..len].to_string()))
    }

    fn variable(&mut self) -> Result<Token> {
        let rest = &self.rest()[1..];
        let mut len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == ':'))
            .unwrap_or(rest.len());
        if len == 0 {
            return Err(ExprError::UnexpectedChar('$'));
        }
        if rest[len..].starts_with('(') {
            let close = matching(&rest[len..], '(', ')').ok_or(ExprError::Unterminated(')'))?;
            len += close + 1;
        }
        self.bump(1 + len);
        Ok(Token::Substitution(
            SubstitutionKind::Variable,
            rest[..len].to_string(),
        ))
    }

    fn delimited(&mut self, kind: SubstitutionKind, open: char, close: char) -> Result<Token> {
        let rest = self.rest();
        let end = matching(rest, open, close).ok_or(ExprError::Unterminated(close))?;
        self.bump(end + 1);
        Ok(Token::Substitution(kind, rest[1..end].to_string()))
    }

    fn quoted(&mut self) -> Result<Token> {
        let rest = self.rest();
        let mut escaped = false;
        for (i, c) in rest.char_indices().skip(1) {
            match c {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => {
                    self.bump(i + 1);
                    return Ok(Token::Substitution(
                        SubstitutionKind::Quoted,
                        rest[1..i].to_string(),
                    ));
                }
                _ => escaped = false,
            }
        }
        Err(ExprError::Unterminated('"'))
    }
}

/// Byte index of the delimiter closing the one at `text[0]`
fn matching(text: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        if c == open {
            depth += 1;
        } else if c == close {
            depth = depth.saturating_sub(1);
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// True when the digits before any exponent are not all zero
fn mantissa_nonzero(text: &str) -> bool {
    text.split(['e', 'E'])
        .next()
        .is_some_and(|m| m.bytes().any(|b| (b'1'..=b'9').contains(&b)))
}

// ============================================================================
// Parser
// ============================================================================

/// Expression parser
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    /// Create a new parser
    pub fn new(input: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// Parse the whole input
    pub fn parse(&mut self) -> Result<Expr> {
        let expr = self.expression(0)?;
        match self.current {
            Token::Eof => Ok(expr),
            Token::RParen => Err(ExprError::UnmatchedParen(self.lexer.input.to_string())),
            _ => Err(ExprError::Syntax(self.lexer.input.to_string())),
        }
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    /// Operand followed by operators binding tighter than `min_prec`
    fn expression(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.operand()?;

        loop {
            let op = match &self.current {
                Token::Binary(op) => *op,
                Token::Eof | Token::RParen | Token::Comma => break,
                other => return Err(ExprError::BadOperator(other.to_string())),
            };
            if op.precedence() <= min_prec {
                break;
            }
            self.advance()?;
            let right = self.expression(op.precedence())?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn operand(&mut self) -> Result<Expr> {
        match self.current.clone() {
            Token::LParen => {
                self.advance()?;
                let expr = self.expression(0)?;
                self.close_paren()?;
                Ok(expr)
            }
            Token::Binary(BinaryOp::Sub) => self.unary(UnaryOp::Neg),
            Token::Not => self.unary(UnaryOp::Not),
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Literal(n))
            }
            Token::Vector(text) => {
                self.advance()?;
                Ok(Expr::Vector(text))
            }
            Token::Substitution(kind, text) => {
                self.advance()?;
                Ok(Expr::Substitution { kind, text })
            }
            Token::Function(function) => {
                self.advance()?;
                if self.current != Token::LParen {
                    return Err(ExprError::Syntax(self.lexer.input.to_string()));
                }
                self.advance()?;
                let arg = self.expression(0)?;
                if self.current == Token::Comma {
                    return Err(ExprError::Arity(function.name.to_string()));
                }
                self.close_paren()?;
                Ok(Expr::FnCall {
                    function,
                    arg: Box::new(arg),
                })
            }
            Token::Binary(_) | Token::RParen | Token::Comma | Token::Unknown(_) | Token::Eof => {
                Err(ExprError::MissingOperand)
            }
        }
    }

    fn unary(&mut self, op: UnaryOp) -> Result<Expr> {
        self.advance()?;
        let expr = self.expression(UNARY_PRECEDENCE)?;
        Ok(Expr::UnaryOp {
            op,
            expr: Box::new(expr),
        })
    }

    fn close_paren(&mut self) -> Result<()> {
        if self.current != Token::RParen {
            return Err(ExprError::UnmatchedParen(self.lexer.input.to_string()));
        }
        self.advance()
    }
}

/// Parse an expression
pub fn parse(input: &str) -> Result<Expr> {
    Parser::new(input)?.parse()
}
