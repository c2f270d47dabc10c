//! Attribute conditions.
//!
//! A condition compares attribute values from a data record against
//! literals or against each other:
//!
//! ```text
//! ${age} > 18
//! ${country} == 'NL' && ${age} >= 16 || ${guardian} != null
//! ```
//!
//! `&&` binds tighter than `||`; there are no parentheses. Literals are
//! numbers, single- or double-quoted strings, `true`, `false` and `null`.
//! A comparison that mentions an attribute missing from the record is false.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};
use thiserror::Error;

/// Why a condition did not parse. Positions are byte offsets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConditionError {
    #[error("empty condition")]
    Empty,

    #[error("unexpected character {ch:?} at {pos}")]
    UnexpectedChar { pos: usize, ch: char },

    #[error("unterminated string starting at {0}")]
    UnterminatedString(usize),

    #[error("unterminated variable starting at {0}")]
    UnterminatedVariable(usize),

    #[error("expected a variable or literal at {0}")]
    ExpectedOperand(usize),

    #[error("expected a comparison operator at {0}")]
    ExpectedOperator(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Variable(String),
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: Operand,
    pub op: Operator,
    pub right: Operand,
}

/// A parsed condition in disjunctive form: any clause whose comparisons all
/// hold makes the condition true.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    clauses: Vec<Vec<Comparison>>,
}

impl Condition {
    pub fn parse(text: &str) -> Result<Self, ConditionError> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }

        let mut clauses = Vec::new();
        let mut clause = Vec::new();
        let mut iter = tokens.into_iter();
        loop {
            let left = operand(iter.next(), text.len())?;
            let op = match iter.next() {
                Some((_, Token::Op(op))) => op,
                Some((pos, _)) => return Err(ConditionError::ExpectedOperator(pos)),
                None => return Err(ConditionError::ExpectedOperator(text.len())),
            };
            let right = operand(iter.next(), text.len())?;
            clause.push(Comparison { left, op, right });

            match iter.next() {
                None => break,
                Some((_, Token::And)) => {}
                Some((_, Token::Or)) => clauses.push(std::mem::take(&mut clause)),
                Some((pos, _)) => return Err(ConditionError::ExpectedOperator(pos)),
            }
        }
        clauses.push(clause);
        Ok(Self { clauses })
    }

    /// Attribute names the condition reads.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.clauses
            .iter()
            .flatten()
            .flat_map(|c| [&c.left, &c.right])
            .filter_map(|operand| match operand {
                Operand::Variable(name) => Some(name.as_str()),
                Operand::Literal(_) => None,
            })
    }

    /// Evaluate against a data record.
    pub fn evaluate(&self, record: &Map<String, Value>) -> bool {
        self.clauses
            .iter()
            .any(|clause| clause.iter().all(|c| c.evaluate(record)))
    }
}

impl FromStr for Condition {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Comparison {
    fn evaluate(&self, record: &Map<String, Value>) -> bool {
        let resolve = |operand: &Operand| -> Option<Value> {
            match operand {
                Operand::Variable(name) => record.get(name).cloned(),
                Operand::Literal(value) => Some(value.clone()),
            }
        };
        let (Some(left), Some(right)) = (resolve(&self.left), resolve(&self.right)) else {
            return false;
        };

        match self.op {
            Operator::Eq => equal(&left, &right),
            Operator::Ne => !equal(&left, &right),
            op => match order(&left, &right) {
                Some(ordering) => match op {
                    Operator::Gt => ordering == Ordering::Greater,
                    Operator::Ge => ordering != Ordering::Less,
                    Operator::Lt => ordering == Ordering::Less,
                    _ => ordering != Ordering::Greater,
                },
                None => false,
            },
        }
    }
}

fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (a, b) => a == b,
    }
}

fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Variable(String),
    Literal(Value),
    Op(Operator),
    And,
    Or,
}

fn operand(token: Option<(usize, Token)>, end: usize) -> Result<Operand, ConditionError> {
    match token {
        Some((_, Token::Variable(name))) => Ok(Operand::Variable(name)),
        Some((_, Token::Literal(value))) => Ok(Operand::Literal(value)),
        Some((pos, _)) => Err(ConditionError::ExpectedOperand(pos)),
        None => Err(ConditionError::ExpectedOperand(end)),
    }
}

fn tokenize(text: &str) -> Result<Vec<(usize, Token)>, ConditionError> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(pos, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let rest = &text[pos..];

        let at = |s: &str| rest.starts_with(s);
        let (token, len) = if at("&&") {
            (Token::And, 2)
        } else if at("||") {
            (Token::Or, 2)
        } else if at("==") {
            (Token::Op(Operator::Eq), 2)
        } else if at("!=") {
            (Token::Op(Operator::Ne), 2)
        } else if at(">=") {
            (Token::Op(Operator::Ge), 2)
        } else if at("<=") {
            (Token::Op(Operator::Le), 2)
        } else if c == '>' {
            (Token::Op(Operator::Gt), 1)
        } else if c == '<' {
            (Token::Op(Operator::Lt), 1)
        } else if at("${") {
            let close = rest.find('}').ok_or(ConditionError::UnterminatedVariable(pos))?;
            let name = rest[2..close].trim();
            if name.is_empty() {
                return Err(ConditionError::UnterminatedVariable(pos));
            }
            (Token::Variable(name.to_string()), close + 1)
        } else if c == '\'' || c == '"' {
            let close = rest[1..]
                .find(c)
                .ok_or(ConditionError::UnterminatedString(pos))?;
            (Token::Literal(Value::String(rest[1..1 + close].to_string())), close + 2)
        } else if c.is_ascii_digit() || c == '-' || c == '.' {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E')))
                .unwrap_or(rest.len());
            let number: f64 = rest[..len]
                .parse()
                .map_err(|_| ConditionError::UnexpectedChar { pos, ch: c })?;
            let value = serde_json::Number::from_f64(number)
                .map(Value::Number)
                .ok_or(ConditionError::UnexpectedChar { pos, ch: c })?;
            (Token::Literal(value), len)
        } else if c.is_ascii_alphabetic() {
            let len = rest
                .find(|ch: char| !ch.is_ascii_alphanumeric())
                .unwrap_or(rest.len());
            let value = match &rest[..len] {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                _ => return Err(ConditionError::UnexpectedChar { pos, ch: c }),
            };
            (Token::Literal(value), len)
        } else {
            return Err(ConditionError::UnexpectedChar { pos, ch: c });
        };

        tokens.push((pos, token));
        while chars.peek().is_some_and(|&(p, _)| p < pos + len) {
            chars.next();
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_numeric_comparison() {
        let cond = Condition::parse("${age} > 18").unwrap();
        assert!(cond.evaluate(&record(json!({"age": 20}))));
        assert!(!cond.evaluate(&record(json!({"age": 18}))));
        assert!(!cond.evaluate(&record(json!({}))));
    }

    #[test]
    fn test_string_and_null_literals() {
        let cond = Condition::parse("${country} == 'NL'").unwrap();
        assert!(cond.evaluate(&record(json!({"country": "NL"}))));
        assert!(!cond.evaluate(&record(json!({"country": "BE"}))));

        let cond = Condition::parse("${guardian} != null").unwrap();
        assert!(cond.evaluate(&record(json!({"guardian": "Bob"}))));
        assert!(!cond.evaluate(&record(json!({"guardian": null}))));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let cond = Condition::parse("${a} == 1 && ${b} == 2 || ${c} == 3").unwrap();
        assert!(cond.evaluate(&record(json!({"a": 1, "b": 2}))));
        assert!(cond.evaluate(&record(json!({"c": 3}))));
        assert!(!cond.evaluate(&record(json!({"a": 1, "c": 4}))));
    }

    #[test]
    fn test_variable_to_variable() {
        let cond = Condition::parse("${end} >= ${start}").unwrap();
        assert!(cond.evaluate(&record(json!({"start": 1, "end": 1.0}))));
        assert!(!cond.evaluate(&record(json!({"start": "b", "end": "a"}))));
    }

    #[test]
    fn test_variables() {
        let cond = Condition::parse("${a} > 1 || 2 < ${b}").unwrap();
        assert_eq!(cond.variables().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Condition::parse("  "), Err(ConditionError::Empty));
        assert_eq!(Condition::parse("${age"), Err(ConditionError::UnterminatedVariable(0)));
        assert_eq!(Condition::parse("${a} > 'x"), Err(ConditionError::UnterminatedString(7)));
        assert_eq!(Condition::parse("${a} 18"), Err(ConditionError::ExpectedOperator(5)));
        assert_eq!(Condition::parse("${a} >"), Err(ConditionError::ExpectedOperand(6)));
        assert_eq!(
            Condition::parse("${a} > maybe"),
            Err(ConditionError::UnexpectedChar { pos: 7, ch: 'm' })
        );
    }
}
