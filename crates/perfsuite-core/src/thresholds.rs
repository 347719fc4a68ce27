use crate::model::ThresholdSpec;
use serde::Serialize;
use std::collections::BTreeMap;

const EQ_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Measured value must not exceed the target.
    Max,
    /// Measured value must reach at least the target.
    Min,
    Eq,
}

impl ThresholdKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MAX" => Some(ThresholdKind::Max),
            "MIN" => Some(ThresholdKind::Min),
            "EQ" => Some(ThresholdKind::Eq),
            _ => None,
        }
    }

    pub fn holds(&self, value: f64, target: f64) -> bool {
        match self {
            ThresholdKind::Max => value <= target,
            ThresholdKind::Min => value >= target,
            ThresholdKind::Eq => (value - target).abs() <= EQ_TOLERANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub output_name: String,
    pub threshold_type: String,
    pub target_value: f64,
    pub actual: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdVerdict {
    pub passed: bool,
    pub violations: Vec<Violation>,
}

/// Checks measured outputs against every threshold.
///
/// A threshold whose output is missing, non-numeric or whose type is unknown
/// counts as violated. No thresholds means pass.
pub fn evaluate(thresholds: &[ThresholdSpec], outputs: &BTreeMap<String, String>) -> ThresholdVerdict {
    let mut violations = Vec::new();

    for t in thresholds {
        let actual = outputs.get(&t.output_name);
        let reason = match (ThresholdKind::parse(&t.threshold_type), actual) {
            (None, _) => Some(format!("unknown threshold type '{}'", t.threshold_type)),
            (Some(_), None) => Some("output not produced".to_string()),
            (Some(kind), Some(raw)) => match raw.trim().parse::<f64>() {
                Err(_) => Some(format!("'{}' is not numeric", raw)),
                Ok(v) if !kind.holds(v, t.target_value) => Some(format!(
                    "{} {} target {}",
                    v,
                    match kind {
                        ThresholdKind::Max => "exceeds",
                        ThresholdKind::Min => "is below",
                        ThresholdKind::Eq => "differs from",
                    },
                    t.target_value
                )),
                Ok(_) => None,
            },
        };

        if let Some(reason) = reason {
            violations.push(Violation {
                output_name: t.output_name.clone(),
                threshold_type: t.threshold_type.clone(),
                target_value: t.target_value,
                actual: actual.cloned(),
                reason,
            });
        }
    }

    ThresholdVerdict {
        passed: violations.is_empty(),
        violations,
    }
}
