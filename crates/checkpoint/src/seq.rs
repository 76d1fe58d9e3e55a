//! Change feed sequence values.
//!
//! A feed tags every change with a `seq`. Most feeds emit a plain token
//! (`"1337"` or `1337`), clustered ones emit a compound cursor such as
//! `[1337, "g1AAAA..."]`. Both shapes are modelled by [`Sequence`].

use std::fmt;
use std::str::FromStr;

use serde_json::{Number, Value};

/// A single element of a sequence: either a number or a text token.
#[derive(Debug, Clone, PartialEq)]
pub enum SeqScalar {
    Number(Number),
    Text(String),
}

impl SeqScalar {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self::Number(n.clone())),
            Value::String(s) => Some(Self::Text(s.clone())),
            _ => None,
        }
    }

    /// Render as a JSON literal: numbers bare, text double-quoted.
    pub(crate) fn to_json_literal(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => Value::String(s.clone()).to_string(),
        }
    }
}

impl fmt::Display for SeqScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Opaque checkpoint value of a change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum Sequence {
    /// Plain token.
    Scalar(SeqScalar),
    /// Ordered compound cursor.
    List(Vec<SeqScalar>),
}

impl Sequence {
    /// Interpret the `seq` field of a parsed change.
    ///
    /// Returns `None` for shapes a feed never emits as a cursor
    /// (null, booleans, objects, nested lists).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(SeqScalar::from_value)
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            other => SeqScalar::from_value(other).map(Self::Scalar),
        }
    }

    pub fn text(token: impl Into<String>) -> Self {
        Self::Scalar(SeqScalar::Text(token.into()))
    }

    pub fn number(n: impl Into<Number>) -> Self {
        Self::Scalar(SeqScalar::Number(n.into()))
    }

    /// Canonical persisted form of this sequence.
    ///
    /// Scalars are rendered unchanged. Lists are rendered as compact JSON:
    /// `[1337,"here goes the hash"]`.
    pub fn to_checkpoint_string(&self) -> String {
        match self {
            Self::Scalar(scalar) => scalar.to_string(),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(SeqScalar::to_json_literal).collect();
                format!("[{}]", rendered.join(","))
            }
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checkpoint_string())
    }
}

/// Parse a persisted checkpoint back into a sequence.
///
/// Anything that is not a JSON array of scalars or a JSON number is kept as
/// a text token, so parsing never fails.
impl FromStr for Sequence {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
                if let Some(seq @ Sequence::List(_)) = Sequence::from_value(&value) {
                    return Ok(seq);
                }
            }
        }
        if let Ok(n) = trimmed.parse::<Number>() {
            if n.to_string() == s {
                return Ok(Self::Scalar(SeqScalar::Number(n)));
            }
        }
        Ok(Self::text(s))
    }
}
