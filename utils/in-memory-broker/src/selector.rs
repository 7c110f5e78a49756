/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//! Minimal message selector: `ident = literal` / `ident <> literal` clauses joined by `AND`.
//!
//! Literals are `'quoted text'` (`''` escapes a quote), integers, decimals, `TRUE` and
//! `FALSE`. Identifiers name message properties or one of the `JMSType`, `JMSCorrelationID`,
//! `JMSMessageID` and `JMSPriority` headers. A clause over a missing identifier never matches.

use jms_source::{InboundMessage, PropertyValue};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SelectorError {
    #[error("selector is empty")]
    Empty,
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("expected {expected}, found {found}")]
    Unexpected {
        expected: &'static str,
        found: String,
    },
    #[error("invalid numeric literal '{0}'")]
    InvalidNumber(String),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Comparison {
    Equal,
    NotEqual,
}

#[derive(Clone, Debug, PartialEq)]
struct Clause {
    identifier: String,
    comparison: Comparison,
    literal: PropertyValue,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    clauses: Vec<Clause>,
}

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Text(String),
    Number(String),
    Equal,
    NotEqual,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(ident) => format!("identifier '{ident}'"),
            Token::Text(text) => format!("string '{text}'"),
            Token::Number(number) => format!("number {number}"),
            Token::Equal => "'='".to_string(),
            Token::NotEqual => "'<>'".to_string(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<Token>, SelectorError> {
    let mut chars = source.chars().peekable();
    let mut tokens = Vec::new();

    while let Some(&ch) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Equal);
            }
            '<' => {
                chars.next();
                match chars.next() {
                    Some('>') => tokens.push(Token::NotEqual),
                    Some(other) => return Err(SelectorError::UnexpectedChar(other)),
                    None => return Err(SelectorError::UnexpectedChar('<')),
                }
            }
            '\'' => {
                chars.next();
                tokens.push(Token::Text(read_quoted(&mut chars)?));
            }
            c if c.is_ascii_digit() || c == '-' => {
                tokens.push(Token::Number(read_while(&mut chars, |c| {
                    c.is_ascii_digit() || c == '.' || c == '-'
                })));
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                tokens.push(Token::Ident(read_while(&mut chars, |c| {
                    c.is_alphanumeric() || c == '_' || c == '$' || c == '.'
                })));
            }
            other => return Err(SelectorError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn read_quoted(chars: &mut Peekable<Chars<'_>>) -> Result<String, SelectorError> {
    let mut text = String::new();
    loop {
        match chars.next() {
            Some('\'') if chars.peek() == Some(&'\'') => {
                chars.next();
                text.push('\'');
            }
            Some('\'') => return Ok(text),
            Some(ch) => text.push(ch),
            None => return Err(SelectorError::UnterminatedString),
        }
    }
}

fn read_while(chars: &mut Peekable<Chars<'_>>, accept: impl Fn(char) -> bool) -> String {
    let mut text = String::new();
    while let Some(&ch) = chars.peek() {
        if !accept(ch) {
            break;
        }
        text.push(ch);
        chars.next();
    }
    text
}

fn parse_literal(token: Token) -> Result<PropertyValue, SelectorError> {
    match token {
        Token::Text(text) => Ok(PropertyValue::Text(text)),
        Token::Number(number) => {
            if let Ok(value) = number.parse::<i64>() {
                Ok(PropertyValue::Int(value))
            } else {
                number
                    .parse::<f64>()
                    .map(PropertyValue::Double)
                    .map_err(|_| SelectorError::InvalidNumber(number))
            }
        }
        Token::Ident(ident) if ident.eq_ignore_ascii_case("TRUE") => Ok(PropertyValue::Bool(true)),
        Token::Ident(ident) if ident.eq_ignore_ascii_case("FALSE") => {
            Ok(PropertyValue::Bool(false))
        }
        other => Err(SelectorError::Unexpected {
            expected: "literal",
            found: other.describe(),
        }),
    }
}

fn values_equal(left: &PropertyValue, right: &PropertyValue) -> bool {
    match (left, right) {
        (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a == b,
        (PropertyValue::Int(a), PropertyValue::Int(b)) => a == b,
        (PropertyValue::Double(a), PropertyValue::Double(b)) => a == b,
        (PropertyValue::Int(a), PropertyValue::Double(b))
        | (PropertyValue::Double(b), PropertyValue::Int(a)) => (*a as f64) == *b,
        (PropertyValue::Text(a), PropertyValue::Text(b)) => a == b,
        _ => false,
    }
}

fn resolve(message: &InboundMessage, identifier: &str) -> Option<PropertyValue> {
    match identifier {
        "JMSType" => message.message_type.clone().map(PropertyValue::Text),
        "JMSCorrelationID" => message.correlation_id.clone().map(PropertyValue::Text),
        "JMSMessageID" => Some(PropertyValue::Text(message.message_id.clone())),
        "JMSPriority" => Some(PropertyValue::Int(i64::from(message.priority))),
        property => message.properties.get(property).cloned(),
    }
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        let mut tokens = tokenize(source)?.into_iter();
        let mut clauses = Vec::new();

        loop {
            let identifier = match tokens.next() {
                Some(Token::Ident(ident)) => ident,
                Some(other) => {
                    return Err(SelectorError::Unexpected {
                        expected: "identifier",
                        found: other.describe(),
                    })
                }
                None if clauses.is_empty() => return Err(SelectorError::Empty),
                None => {
                    return Err(SelectorError::Unexpected {
                        expected: "identifier",
                        found: "end of selector".to_string(),
                    })
                }
            };
            let comparison = match tokens.next() {
                Some(Token::Equal) => Comparison::Equal,
                Some(Token::NotEqual) => Comparison::NotEqual,
                other => {
                    return Err(SelectorError::Unexpected {
                        expected: "'=' or '<>'",
                        found: other
                            .map(|token| token.describe())
                            .unwrap_or_else(|| "end of selector".to_string()),
                    })
                }
            };
            let literal = match tokens.next() {
                Some(token) => parse_literal(token)?,
                None => {
                    return Err(SelectorError::Unexpected {
                        expected: "literal",
                        found: "end of selector".to_string(),
                    })
                }
            };
            clauses.push(Clause {
                identifier,
                comparison,
                literal,
            });

            match tokens.next() {
                None => break,
                Some(Token::Ident(ident)) if ident.eq_ignore_ascii_case("AND") => continue,
                Some(other) => {
                    return Err(SelectorError::Unexpected {
                        expected: "AND",
                        found: other.describe(),
                    })
                }
            }
        }

        Ok(Self { clauses })
    }

    pub fn matches(&self, message: &InboundMessage) -> bool {
        self.clauses.iter().all(|clause| {
            resolve(message, &clause.identifier).is_some_and(|value| {
                let equal = values_equal(&value, &clause.literal);
                match clause.comparison {
                    Comparison::Equal => equal,
                    Comparison::NotEqual => !equal,
                }
            })
        })
    }
}
