use crate::grading::error::GradeError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Individual grade at or above which a student receives the whole cohort
/// base score without banding.
pub const FULL_CREDIT_THRESHOLD: f64 = 90.0;

/// Share of the engagement participation blend given to the review-and-
/// participation index; the sprint value gets the rest.
pub const RC_AND_P_SHARE: f64 = 0.25;
pub const SPRINT_SHARE: f64 = 0.75;

/// Weights and constants for one course offering.
///
/// Stored as a plain JSON object on disk:
/// ```json
/// {
///   "name": "engagement",
///   "task_weight": 34.0,
///   "pr_weight": 33.0,
///   "participation_weight": 33.0,
///   "minimum_load": 720.0,
///   "expected_rc_and_p": 8.0,
///   "cohort_task_weight": 50.0,
///   "cohort_pr_weight": 50.0,
///   "cohort_test_weight": 0.0,
///   "participation_model": { "model": "engagement" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradingPolicy {
    pub name: String,
    pub task_weight: f64,
    pub pr_weight: f64,
    pub participation_weight: f64,
    /// Floor for the cohort task average, in quarter-hour points.
    pub minimum_load: f64,
    pub expected_rc_and_p: f64,
    pub cohort_task_weight: f64,
    pub cohort_pr_weight: f64,
    pub cohort_test_weight: f64,
    pub participation_model: ParticipationModel,
}

/// How the participation component is computed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ParticipationModel {
    /// Review-and-participation index blended with a sprint value.
    Engagement,
    /// Attendance, discussion, and reviews relative to the cohort; the three
    /// shares sum to `participation_weight`.
    Attendance {
        expected_attendance: f64,
        expected_discussion: f64,
        attendance_share: f64,
        discussion_share: f64,
        review_share: f64,
    },
}

impl GradingPolicy {
    pub const PRESETS: [&'static str; 2] = ["engagement", "attendance"];

    /// 34/33/33 split with participation from rc_and_p and sprint values.
    pub fn engagement() -> Self {
        GradingPolicy {
            name: "engagement".to_string(),
            task_weight: 34.0,
            pr_weight: 33.0,
            participation_weight: 33.0,
            minimum_load: 720.0,
            expected_rc_and_p: 8.0,
            cohort_task_weight: 50.0,
            cohort_pr_weight: 50.0,
            cohort_test_weight: 0.0,
            participation_model: ParticipationModel::Engagement,
        }
    }

    /// 33/33 split with participation as 7 attendance + 7 discussion + 20
    /// reviews, and a cohort score that also weighs test results.
    pub fn attendance() -> Self {
        GradingPolicy {
            name: "attendance".to_string(),
            task_weight: 33.0,
            pr_weight: 33.0,
            participation_weight: 34.0,
            minimum_load: 720.0,
            expected_rc_and_p: 8.0,
            cohort_task_weight: 34.0,
            cohort_pr_weight: 33.0,
            cohort_test_weight: 33.0,
            participation_model: ParticipationModel::Attendance {
                expected_attendance: 4.0,
                expected_discussion: 4.0,
                attendance_share: 7.0,
                discussion_share: 7.0,
                review_share: 20.0,
            },
        }
    }

    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "engagement" => Some(Self::engagement()),
            "attendance" => Some(Self::attendance()),
            _ => None,
        }
    }

    /// Loads and validates a policy from a JSON file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading policy file {}", path.display()))?;
        let policy: GradingPolicy = serde_json::from_str(&content)
            .with_context(|| format!("parsing policy file {}", path.display()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), GradeError> {
        let invalid = |reason: String| GradeError::InvalidPolicy {
            policy: self.name.clone(),
            reason,
        };

        let weights = [
            ("task_weight", self.task_weight),
            ("pr_weight", self.pr_weight),
            ("participation_weight", self.participation_weight),
            ("cohort_task_weight", self.cohort_task_weight),
            ("cohort_pr_weight", self.cohort_pr_weight),
            ("cohort_test_weight", self.cohort_test_weight),
        ];
        for (field, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(invalid(format!("{field} must be a non-negative number, got {value}")));
            }
        }

        if !(self.individual_weight() > 0.0) {
            return Err(invalid("task, PR, and participation weights are all zero".to_string()));
        }

        if !(self.minimum_load > 0.0) {
            return Err(invalid(format!("minimum_load must be positive, got {}", self.minimum_load)));
        }

        match &self.participation_model {
            ParticipationModel::Engagement => {
                if !(self.expected_rc_and_p > 0.0) {
                    return Err(invalid(format!(
                        "expected_rc_and_p must be positive, got {}",
                        self.expected_rc_and_p
                    )));
                }
            }
            ParticipationModel::Attendance {
                expected_attendance,
                expected_discussion,
                attendance_share,
                discussion_share,
                review_share,
            } => {
                if !(*expected_attendance > 0.0) || !(*expected_discussion > 0.0) {
                    return Err(invalid(
                        "expected_attendance and expected_discussion must be positive".to_string(),
                    ));
                }
                let shares = attendance_share + discussion_share + review_share;
                if (shares - self.participation_weight).abs() > 1e-9 {
                    return Err(invalid(format!(
                        "attendance, discussion, and review shares sum to {shares}, not participation_weight {}",
                        self.participation_weight
                    )));
                }
            }
        }

        Ok(())
    }

    /// Sum of the three individual weights; a perfect student scores about this.
    pub fn individual_weight(&self) -> f64 {
        self.task_weight + self.pr_weight + self.participation_weight
    }
}
