//! Screener conditions.
//!
//! The wire form (`Condition`) is what the API accepts: plain strings for
//! field and operator, and a value that is either a JSON number or a field
//! name. Compilation turns a whole condition set into the typed form
//! (`CompiledCondition`) in one pass, so every validation error surfaces
//! once per run - before any symbol is touched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fields::Field;

// ============================================================================
// Validation Errors
// ============================================================================

/// Request-level validation errors for a screener run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScreenerError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Unknown operator: {0}")]
    UnknownOperator(String),

    #[error("Operator {op} requires a field name as its value, got {value}")]
    InvalidValueType { op: Operator, value: String },

    #[error("Screener has no conditions")]
    EmptyConditionSet,
}

// ============================================================================
// Operators
// ============================================================================

/// Comparison and crossover operators.
///
/// Equality is exact: it is meant for discrete fields like
/// `supertrend_dir`. Callers comparing continuous fields with `=` own the
/// tolerance question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "crossed_above")]
    CrossedAbove,
    #[serde(rename = "crossed_below")]
    CrossedBelow,
}

impl Operator {
    /// Parse an operator from its wire form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            ">" => Some(Self::Gt),
            "<" => Some(Self::Lt),
            ">=" => Some(Self::Ge),
            "<=" => Some(Self::Le),
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "crossed_above" => Some(Self::CrossedAbove),
            "crossed_below" => Some(Self::CrossedBelow),
            _ => None,
        }
    }

    /// Wire form of the operator.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::CrossedAbove => "crossed_above",
            Self::CrossedBelow => "crossed_below",
        }
    }

    /// Whether this operator compares two bars instead of one.
    pub const fn is_crossover(&self) -> bool {
        matches!(self, Self::CrossedAbove | Self::CrossedBelow)
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Wire Form
// ============================================================================

/// The right-hand side of a condition as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    /// A literal number
    Number(f64),
    /// A field name to compare against
    Field(String),
}

/// One predicate as accepted by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub op: String,
    pub value: ConditionValue,
}

// ============================================================================
// Compiled Form
// ============================================================================

/// Resolved right-hand side of a condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Literal(f64),
    FieldRef(Field),
}

/// A fully validated condition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompiledCondition {
    pub field: Field,
    pub op: Operator,
    pub operand: Operand,
}

/// Compile and validate a whole condition set.
///
/// Fails on the first problem with a single descriptive error; nothing is
/// partially accepted.
pub fn compile(conditions: &[Condition]) -> Result<Vec<CompiledCondition>, ScreenerError> {
    if conditions.is_empty() {
        return Err(ScreenerError::EmptyConditionSet);
    }

    conditions.iter().map(compile_one).collect()
}

fn compile_one(condition: &Condition) -> Result<CompiledCondition, ScreenerError> {
    let field = Field::parse(&condition.field)
        .ok_or_else(|| ScreenerError::UnknownField(condition.field.clone()))?;

    let op = Operator::parse(&condition.op)
        .ok_or_else(|| ScreenerError::UnknownOperator(condition.op.clone()))?;

    let operand = match &condition.value {
        ConditionValue::Number(n) => {
            if op.is_crossover() {
                return Err(ScreenerError::InvalidValueType {
                    op,
                    value: n.to_string(),
                });
            }
            Operand::Literal(*n)
        }
        ConditionValue::Field(name) => {
            let other = Field::parse(name)
                .ok_or_else(|| ScreenerError::UnknownField(name.clone()))?;
            Operand::FieldRef(other)
        }
    };

    Ok(CompiledCondition { field, op, operand })
}

/// Whether any condition in the set needs a previous snapshot.
pub fn needs_previous(conditions: &[CompiledCondition]) -> bool {
    conditions.iter().any(|c| c.op.is_crossover())
}

// ============================================================================
// Tests
// ============================================================================
