//! Pure condition evaluation.
//!
//! Evaluation algorithm:
//!
//! 1. Sort conditions by `order` (ties keep declaration order).
//! 2. Seed the running result with the first condition's truth value; its
//!    own logical operator is ignored.
//! 3. Fold the remaining conditions left to right, combining each
//!    condition's truth value into the running result with that condition's
//!    `logical` operator. There is no precedence grouping — the chain is a
//!    strictly sequential fold, and policy authors rely on exactly that.
//!
//! A condition referencing an unknown field or operator, or carrying a
//! value that cannot be coerced for the comparison, evaluates to **false**
//! (fails closed) and is reported as an `EvalIssue` rather than an error.
//! Evaluation is total and deterministic: no I/O, no clock reads (the
//! caller supplies `now` for `time_of_day` conditions).

use chrono::{DateTime, Timelike, Utc};

use sentra_contracts::{
    event::RiskSnapshot,
    policy::{Condition, LogicalOp},
};

/// The outcome of evaluating a condition chain.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// The chain's final truth value. An empty chain matches.
    pub matched: bool,
    /// Conditions that failed closed, with the reason. The caller decides
    /// whether and how to log these.
    pub issues: Vec<EvalIssue>,
}

/// A condition that could not be evaluated and was forced to non-match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalIssue {
    /// `order` of the offending condition.
    pub order: u32,
    /// The field the condition referenced.
    pub field: String,
    pub reason: String,
}

/// A snapshot field resolved for comparison.
enum FieldValue {
    Num(f64),
    Text(String),
}

/// Evaluate `conditions` against `snapshot` at instant `now`.
pub fn evaluate(conditions: &[Condition], snapshot: &RiskSnapshot, now: DateTime<Utc>) -> Evaluation {
    let mut ordered: Vec<&Condition> = conditions.iter().collect();
    ordered.sort_by_key(|c| c.order);

    let mut issues = Vec::new();
    let mut result = true;

    for (index, condition) in ordered.iter().enumerate() {
        let truth = match eval_one(condition, snapshot, now) {
            Ok(t) => t,
            Err(reason) => {
                issues.push(EvalIssue {
                    order: condition.order,
                    field: condition.field.clone(),
                    reason,
                });
                false
            }
        };

        if index == 0 {
            result = truth;
        } else {
            result = match condition.logical {
                LogicalOp::And => result && truth,
                LogicalOp::Or => result || truth,
            };
        }
    }

    Evaluation { matched: result, issues }
}

/// Compute one condition's truth value, or the reason it fails closed.
fn eval_one(
    condition: &Condition,
    snapshot: &RiskSnapshot,
    now: DateTime<Utc>,
) -> Result<bool, String> {
    let field = resolve_field(&condition.field, snapshot, now)
        .ok_or_else(|| format!("unknown condition field '{}'", condition.field))?;

    match condition.operator.as_str() {
        "greater_than" => {
            let (lhs, rhs) = numeric_pair(&field, &condition.value)?;
            Ok(lhs > rhs)
        }
        "less_than" => {
            let (lhs, rhs) = numeric_pair(&field, &condition.value)?;
            Ok(lhs < rhs)
        }
        "equals" => match &field {
            // Numeric fields compare numerically so `"90"` and `90` agree.
            FieldValue::Num(lhs) => {
                let rhs = coerce_number(&condition.value)
                    .ok_or_else(|| non_numeric_value(&condition.value))?;
                Ok(*lhs == rhs)
            }
            FieldValue::Text(lhs) => {
                let rhs = coerce_text(&condition.value);
                Ok(*lhs == rhs)
            }
        },
        "contains" => {
            let lhs = match &field {
                FieldValue::Num(n) => format_number(*n),
                FieldValue::Text(t) => t.clone(),
            };
            Ok(lhs.contains(&coerce_text(&condition.value)))
        }
        other => Err(format!("unknown operator '{}'", other)),
    }
}

/// Resolve a condition field name against the snapshot.
fn resolve_field(field: &str, snapshot: &RiskSnapshot, now: DateTime<Utc>) -> Option<FieldValue> {
    match field {
        "risk_score" => Some(FieldValue::Num(snapshot.risk_score)),
        "violation_count" => Some(FieldValue::Num(f64::from(snapshot.violation_count))),
        "department" => Some(FieldValue::Text(snapshot.department.clone())),
        // Joined so `contains` can test for a violation type; `equals`
        // against the joined form is permitted but rarely useful.
        "recent_violations" => Some(FieldValue::Text(snapshot.recent_violations.join(","))),
        // UTC hour of the evaluation instant, 0–23.
        "time_of_day" => Some(FieldValue::Num(f64::from(now.hour()))),
        _ => None,
    }
}

/// Coerce both sides of an ordering comparison to numbers.
fn numeric_pair(field: &FieldValue, value: &serde_json::Value) -> Result<(f64, f64), String> {
    let lhs = match field {
        FieldValue::Num(n) => *n,
        FieldValue::Text(t) => t
            .parse::<f64>()
            .map_err(|_| format!("field value '{}' is not numeric", t))?,
    };
    let rhs = coerce_number(value).ok_or_else(|| non_numeric_value(value))?;
    Ok((lhs, rhs))
}

/// Numeric coercion: JSON numbers directly, numeric strings parsed.
fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        _ => None,
    }
}

/// String coercion: strings verbatim, numbers formatted.
fn coerce_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(format_number)
            .unwrap_or_else(|| n.to_string()),
        other => other.to_string(),
    }
}

/// Format without a trailing `.0` for whole numbers, so `contains` over
/// numeric fields behaves as authors expect.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn non_numeric_value(value: &serde_json::Value) -> String {
    format!("condition value {} is not numeric", value)
}
