use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const DEFAULT_AUTO_PASS_THRESHOLD: f64 = 0.75;
pub const DEFAULT_AUTO_FAIL_THRESHOLD: f64 = 0.30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    AutoPass,
    AutoFail,
    Review,
}

impl Decision {
    /// Wire form, also the form hashed into `score_hash`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::AutoPass => "auto_pass",
            Decision::AutoFail => "auto_fail",
            Decision::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_pass" => Some(Decision::AutoPass),
            "auto_fail" => Some(Decision::AutoFail),
            "review" => Some(Decision::Review),
            _ => None,
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a score to a decision. Boundaries resolve toward the decisive outcome.
pub fn classify(score: f64, auto_pass_threshold: f64, auto_fail_threshold: f64) -> Decision {
    if score >= auto_pass_threshold {
        Decision::AutoPass
    } else if score <= auto_fail_threshold {
        Decision::AutoFail
    } else {
        Decision::Review
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub auto_pass_threshold: f64,
    pub auto_fail_threshold: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            auto_pass_threshold: DEFAULT_AUTO_PASS_THRESHOLD,
            auto_fail_threshold: DEFAULT_AUTO_FAIL_THRESHOLD,
        }
    }
}

impl DecisionPolicy {
    pub fn new(auto_pass_threshold: f64, auto_fail_threshold: f64) -> Result<Self, AppError> {
        let in_range = |t: f64| (0.0..=1.0).contains(&t);
        if !in_range(auto_pass_threshold) || !in_range(auto_fail_threshold) {
            return Err(AppError::Validation(
                "decision thresholds must lie within [0, 1]".to_string(),
            ));
        }
        if auto_fail_threshold > auto_pass_threshold {
            return Err(AppError::Validation(format!(
                "auto-fail threshold {auto_fail_threshold} exceeds auto-pass threshold {auto_pass_threshold}"
            )));
        }
        Ok(Self {
            auto_pass_threshold,
            auto_fail_threshold,
        })
    }

    pub fn classify(&self, score: f64) -> Decision {
        classify(score, self.auto_pass_threshold, self.auto_fail_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_are_decisive() {
        assert_eq!(classify(0.75, 0.75, 0.30), Decision::AutoPass);
        assert_eq!(classify(0.30, 0.75, 0.30), Decision::AutoFail);
        assert_eq!(classify(0.5, 0.75, 0.30), Decision::Review);
    }

    #[test]
    fn test_default_policy() {
        let policy = DecisionPolicy::default();
        assert_eq!(policy.classify(0.99), Decision::AutoPass);
        assert_eq!(policy.classify(0.0), Decision::AutoFail);
        assert_eq!(policy.classify(0.7499), Decision::Review);
    }

    #[test]
    fn test_policy_rejects_inverted_thresholds() {
        assert!(DecisionPolicy::new(0.3, 0.75).is_err());
        assert!(DecisionPolicy::new(1.5, 0.2).is_err());
        assert!(DecisionPolicy::new(0.8, 0.8).is_ok());
    }

    #[test]
    fn test_wire_names() {
        for d in [Decision::AutoPass, Decision::AutoFail, Decision::Review] {
            assert_eq!(Decision::parse(d.as_str()), Some(d));
            assert_eq!(
                serde_json::to_string(&d).unwrap(),
                format!("\"{}\"", d.as_str())
            );
        }
        assert_eq!(Decision::parse("pending"), None);
    }
}
