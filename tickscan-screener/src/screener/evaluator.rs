//! Condition evaluation.
//!
//! A pure function over one compiled condition and the latest two
//! snapshots. Null operands make a condition false - never an error - so
//! short histories simply fail to match instead of breaking a run.

use super::condition::{CompiledCondition, Operand, Operator};
use crate::indicators::IndicatorSnapshot;

/// Evaluate one condition against the current snapshot, with the previous
/// snapshot available for crossover operators.
pub fn evaluate(
    condition: &CompiledCondition,
    current: &IndicatorSnapshot,
    previous: Option<&IndicatorSnapshot>,
) -> bool {
    if condition.op.is_crossover() {
        return evaluate_crossover(condition, current, previous);
    }

    let Some(left) = condition.field.resolve(current) else {
        return false;
    };
    let Some(right) = resolve_operand(&condition.operand, current) else {
        return false;
    };

    match condition.op {
        Operator::Gt => left > right,
        Operator::Lt => left < right,
        Operator::Ge => left >= right,
        Operator::Le => left <= right,
        Operator::Eq => left == right,
        Operator::Ne => left != right,
        Operator::CrossedAbove | Operator::CrossedBelow => unreachable!(),
    }
}

/// A crossover is a strict transition across the other field between the
/// previous and current bar. It requires both bars and all four values.
fn evaluate_crossover(
    condition: &CompiledCondition,
    current: &IndicatorSnapshot,
    previous: Option<&IndicatorSnapshot>,
) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    // Compilation rejects literal crossover values; an operand that is not
    // a field reference cannot match.
    let Operand::FieldRef(other) = condition.operand else {
        return false;
    };

    let values = (
        condition.field.resolve(previous),
        other.resolve(previous),
        condition.field.resolve(current),
        other.resolve(current),
    );
    let (Some(field_prev), Some(other_prev), Some(field_cur), Some(other_cur)) = values else {
        return false;
    };

    match condition.op {
        Operator::CrossedAbove => field_prev <= other_prev && field_cur > other_cur,
        Operator::CrossedBelow => field_prev >= other_prev && field_cur < other_cur,
        _ => unreachable!(),
    }
}

fn resolve_operand(operand: &Operand, snapshot: &IndicatorSnapshot) -> Option<f64> {
    match operand {
        Operand::Literal(value) => Some(*value),
        Operand::FieldRef(field) => field.resolve(snapshot),
    }
}

// ============================================================================
// Tests
// ============================================================================
