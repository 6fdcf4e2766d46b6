//! Grade aggregation and scoring.
//!
//! Rows from the three activity logs are grouped per person, reduced into
//! close and merge rates, weighted into an individual grade, and combined
//! with a cohort-wide base score that is shared out in ten-point bands.

pub mod analyzer;
pub mod burndown;
pub mod cohort;
pub mod error;
pub mod individual;
pub mod metrics;
pub mod policy;
pub mod reduce;
pub mod types;

pub use analyzer::grade_cohort;
pub use cohort::TestResults;
pub use error::GradeError;
pub use policy::{GradingPolicy, ParticipationModel};
