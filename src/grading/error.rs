use thiserror::Error;

/// Structural failures that make a dataset ungradeable.
///
/// Row-level problems never surface here; the reducer logs them and
/// substitutes a default.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradeError {
    #[error("cohort has no students, so averages are undefined")]
    EmptyCohort,

    #[error("cohort {metric} is undefined: {denominator} is zero")]
    ZeroDenominator {
        metric: &'static str,
        denominator: &'static str,
    },

    #[error("policy `{policy}` weighs test results but none were supplied")]
    MissingTestResults { policy: String },

    #[error("invalid grading policy `{policy}`: {reason}")]
    InvalidPolicy { policy: String, reason: String },
}
