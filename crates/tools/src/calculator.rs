//! Calculator tool for arithmetic expressions.
//!
//! Supports `+`, `-`, `*`, `/`, `%`, right-associative `^`, parentheses,
//! unary signs and decimal numbers, via a small recursive-descent parser.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::iter::Peekable;
use std::str::CharIndices;
use stepwise_core::{ParamSpec, ParamType, Tool, ToolArguments, ToolDefinition, ToolError};
use thiserror::Error;

pub struct CalculatorTool {
    definition: ToolDefinition,
}

impl CalculatorTool {
    pub fn new() -> Self {
        Self {
            definition: ToolDefinition {
                name: "calculator".into(),
                description: "Evaluate an arithmetic expression. Supports + - * / % ^, \
                              parentheses and decimal numbers."
                    .into(),
                parameters: vec![ParamSpec::new(
                    "expression",
                    ParamType::String,
                    "The expression to evaluate, e.g. '(2 + 3) * 4'",
                    true,
                )],
            },
        }
    }
}

impl Default for CalculatorTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    async fn execute(&self, arguments: ToolArguments) -> Result<Value, ToolError> {
        let expression = arguments
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'expression' argument".into()))?;

        let value = evaluate(expression)
            .map_err(|e| ToolError::InvalidArguments(format!("{expression}: {e}")))?;
        tracing::debug!(expression, value, "Evaluated expression");

        Ok(json!({ "expression": expression, "result": value }))
    }
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unexpected {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<f64, EvalError> {
    let mut parser = Parser {
        chars: expression.char_indices().peekable(),
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(&(offset, c)) = parser.chars.peek() {
        return Err(EvalError::UnexpectedChar(c, offset));
    }
    if !value.is_finite() {
        return Err(EvalError::NotFinite);
    }
    Ok(value)
}

struct Parser<'a> {
    chars: Peekable<CharIndices<'a>>,
}

impl Parser<'_> {
    fn skip_whitespace(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    /// Consume `op` if it is the next non-blank character.
    fn eat(&mut self, op: char) -> bool {
        self.skip_whitespace();
        self.chars.next_if(|&(_, c)| c == op).is_some()
    }

    // expr = term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.term()?;
        loop {
            if self.eat('+') {
                value += self.term()?;
            } else if self.eat('-') {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    // term = power (('*' | '/' | '%') power)*
    fn term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.power()?;
        loop {
            if self.eat('*') {
                value *= self.power()?;
            } else if self.eat('/') {
                let divisor = self.power()?;
                if divisor == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                value /= divisor;
            } else if self.eat('%') {
                let divisor = self.power()?;
                if divisor == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                value %= divisor;
            } else {
                return Ok(value);
            }
        }
    }

    // power = unary ('^' power)?
    fn power(&mut self) -> Result<f64, EvalError> {
        let base = self.unary()?;
        if self.eat('^') {
            return Ok(base.powf(self.power()?));
        }
        Ok(base)
    }

    // unary = ('-' | '+') unary | primary
    fn unary(&mut self) -> Result<f64, EvalError> {
        if self.eat('-') {
            return Ok(-self.unary()?);
        }
        if self.eat('+') {
            return self.unary();
        }
        self.primary()
    }

    // primary = NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<f64, EvalError> {
        self.skip_whitespace();
        match self.chars.peek().copied() {
            Some((_, '(')) => {
                self.chars.next();
                let value = self.expr()?;
                if self.eat(')') {
                    Ok(value)
                } else {
                    self.skip_whitespace();
                    match self.chars.peek() {
                        Some(&(_, c)) => Err(EvalError::UnexpectedToken(format!("'{c}'"))),
                        None => Err(EvalError::UnexpectedEnd),
                    }
                }
            }
            Some((_, c)) if c.is_ascii_digit() || c == '.' => self.number(),
            Some((offset, c)) => Err(EvalError::UnexpectedChar(c, offset)),
            None => Err(EvalError::UnexpectedEnd),
        }
    }

    fn number(&mut self) -> Result<f64, EvalError> {
        let mut literal = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| c.is_ascii_digit() || *c == '.') {
            literal.push(c);
        }
        literal
            .parse()
            .map_err(|_| EvalError::InvalidNumber(literal))
    }
}
